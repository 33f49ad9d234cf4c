mod api;
mod bulk;
mod cli;
mod config;
mod form;
mod history;
mod macros;
mod model;
mod sheet;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context};
use api::{
    files,
    models::{
        BulkCertificateRequest, BulkDelivery, BulkSource, CertificateData, CertificateRequest,
        CertificateResponse, DeliveryChannel, DeliveryInfo, SenderInfo, SingleCertificateRequest,
        TemplateType,
    },
    Webhook, WebhookClient,
};
use bulk::{BulkJob, CancellationToken, Orchestrator};
use clap::Parser;
use config::Config;
use form::{SlidesOptions, Source};
use history::{FileStorage, HistoryStore, NewCertificate, Status};
use log::{debug, warn};
use model::{Badge, FieldMapping, RecipientName, SenderName};

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(bin_name = env!("CARGO_BIN_NAME"))]
enum Cli {
    #[command(about = "Prints tool version")]
    #[command(long_about = None)]
    Version,

    #[command(about = "Generate one certificate")]
    #[command(long_about = None)]
    Single(SingleArgs),

    #[command(about = "Show the first rows of a spreadsheet")]
    #[command(long_about = None)]
    Preview(PreviewArgs),

    #[command(about = "Generate a certificate for every spreadsheet row")]
    #[command(long_about = None)]
    Bulk(BulkArgs),

    #[command(about = "Inspect or clean the generation history")]
    #[command(long_about = None)]
    History(HistoryArgs),
}

#[derive(clap::Args)]
struct ConfigArgs {
    #[arg(short='c', long, default_value=Some("./config.toml"))]
    config_path: PathBuf,
}

#[derive(clap::Args)]
struct SourceArgs {
    #[arg(long, conflicts_with = "sheets_url", help = "Local .xlsx, .xls, .ods or .csv file")]
    file: Option<PathBuf>,

    #[arg(long, help = "Share link of a publicly readable Google Sheet")]
    sheets_url: Option<String>,

    #[arg(long, default_value = "Sheet1")]
    sheet_name: String,
}

impl SourceArgs {
    fn source(&self) -> anyhow::Result<Source<'_>> {
        match (&self.file, &self.sheets_url) {
            (Some(path), _) => Ok(Source::File(path)),
            (None, Some(url)) => Ok(Source::GoogleSheets {
                url,
                sheet_name: &self.sheet_name,
            }),
            (None, None) => Err(anyhow!("either --file or --sheets-url is required")),
        }
    }
}

#[derive(clap::Args)]
struct TemplateArgs {
    #[arg(long, value_enum, default_value_t = TemplateType::Ai)]
    template_type: TemplateType,

    #[arg(long, help = "Background image for the custom template")]
    template_file: Option<PathBuf>,

    #[arg(long, help = "Comma separated colours for AI templates")]
    brand_colors: Option<String>,

    #[arg(long, help = "Logo image for AI templates")]
    logo: Option<PathBuf>,

    #[arg(long)]
    slides_url: Option<String>,

    #[arg(long)]
    slides_image_url: Option<String>,

    #[arg(long)]
    slides_image_width: Option<u64>,

    #[arg(long)]
    slides_image_height: Option<u64>,

    #[arg(long)]
    slides_position_x: Option<u64>,

    #[arg(long)]
    slides_position_y: Option<u64>,

    #[arg(long = "slides-placeholder", help = "Slide placeholder to column, as placeholder=Column")]
    slides_placeholders: Vec<String>,
}

impl TemplateArgs {
    fn parts(&self, cfg: &Config) -> anyhow::Result<form::TemplateParts> {
        let slides = SlidesOptions {
            url: self.slides_url.clone(),
            image_url: self.slides_image_url.clone(),
            image_width: self.slides_image_width,
            image_height: self.slides_image_height,
            position_x: self.slides_position_x,
            position_y: self.slides_position_y,
            placeholders: self.slides_placeholders.clone(),
        };

        form::template_parts(
            cfg,
            self.template_type,
            self.template_file.as_deref(),
            self.brand_colors.as_deref(),
            self.logo.as_deref(),
            &slides,
        )
    }
}

#[derive(clap::Args)]
struct DeliveryArgs {
    #[arg(long = "channel", value_enum, default_values_t = vec![DeliveryChannel::Gmail])]
    channels: Vec<DeliveryChannel>,

    #[arg(long)]
    sender_name: Option<String>,

    #[arg(long)]
    sender_email: Option<String>,
}

impl DeliveryArgs {
    fn sender(&self, cfg: &Config) -> anyhow::Result<SenderInfo> {
        let name = cli::value_or_ask(
            self.sender_name.clone().or(cfg.sender_name.clone()),
            "Sender name",
        )?;

        Ok(SenderInfo {
            name: SenderName::new(&name)?.into(),
            email: self.sender_email.clone().or(cfg.sender_email.clone()),
        })
    }
}

#[derive(clap::Args)]
struct SingleArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    badge: Option<String>,

    #[arg(long, help = "Defaults to today")]
    date: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long, help = "Defaults to the sender name")]
    issuer: Option<String>,

    #[arg(long)]
    certificate_title: Option<String>,

    #[arg(long)]
    award_purpose: Option<String>,

    #[arg(long)]
    program_name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    whatsapp: Option<String>,

    #[arg(long, help = "Where to write the returned preview image")]
    preview_out: Option<PathBuf>,

    #[command(flatten)]
    template: TemplateArgs,

    #[command(flatten)]
    delivery: DeliveryArgs,
}

#[derive(clap::Args)]
struct PreviewArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    source: SourceArgs,
}

#[derive(clap::Args)]
struct BulkArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    source: SourceArgs,

    #[arg(long = "map", help = "Column for a certificate field, as field=Column")]
    mappings: Vec<String>,

    #[arg(long, help = "Send the whole sheet in one request")]
    server_side: bool,

    #[command(flatten)]
    template: TemplateArgs,

    #[command(flatten)]
    delivery: DeliveryArgs,
}

impl BulkArgs {
    fn template_parts(&self, cfg: &Config) -> anyhow::Result<form::TemplateParts> {
        // Логотип в массовой рассылке не передаётся, только цвета.
        if self.template.logo.is_some() {
            bail!("--logo is only supported by the single command");
        }

        self.template.parts(cfg)
    }
}

#[derive(clap::Args)]
struct HistoryArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    action: HistoryAction,
}

#[derive(clap::Subcommand)]
enum HistoryAction {
    #[command(about = "List attempts, newest first")]
    List {
        #[arg(long)]
        json: bool,
    },

    #[command(about = "Delete one attempt")]
    Delete { id: String },

    #[command(about = "Delete every attempt")]
    Clear,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match Cli::parse() {
        Cli::Version => {
            println!(env!("CARGO_PKG_VERSION"));
        }
        Cli::Single(args) => single(args)?,
        Cli::Preview(args) => preview(args)?,
        Cli::Bulk(args) => {
            if args.server_side {
                bulk_server_side(args)?
            } else {
                bulk(args)?
            }
        }
        Cli::History(args) => history(args)?,
    };

    Ok(())
}

fn open_history(cfg: &Config) -> HistoryStore<FileStorage> {
    debug!("Подгружаем историю из {:?}", cfg.history_path);
    HistoryStore::new(FileStorage::new(&cfg.history_path))
}

fn single(args: SingleArgs) -> anyhow::Result<()> {
    let cfg = config::load(args.config.config_path)?;

    let name = RecipientName::new(&cli::value_or_ask(args.name, "Recipient name")?)?;
    let badge = Badge::new(&cli::value_or_ask(args.badge, "Badge / achievement")?)?;
    let date = args.date.unwrap_or_else(model::today);
    let sender = args.delivery.sender(&cfg)?;
    let parts = args.template.parts(&cfg)?;

    let request = SingleCertificateRequest {
        template_type: args.template.template_type,
        template: parts.custom,
        google_slides_template: parts.slides,
        data: CertificateData {
            certificate_title: args.certificate_title,
            name: name.into(),
            award_purpose: args.award_purpose,
            program_name: args.program_name,
            issuer: Some(args.issuer.unwrap_or_else(|| sender.name.clone())),
            date,
            badge: Some(badge.into()),
            description: Some(args.description.unwrap_or_default()),
        },
        branding: parts.branding,
        delivery: DeliveryInfo {
            email: args.email,
            whatsapp: args.whatsapp,
            channels: args.delivery.channels.clone(),
        },
        sender,
    };

    let client = WebhookClient::new(&cfg.webhook_url)?;
    let response = client.submit(&CertificateRequest::Single(request.clone()));

    let mut entry = NewCertificate {
        recipient_name: request.data.name.clone(),
        badge: request.data.badge.clone().unwrap_or_default(),
        date: request.data.date.clone(),
        description: request.data.description.clone().filter(|d| !d.is_empty()),
        delivery_channels: request.delivery.channels.clone(),
        template_type: request.template_type,
        status: Status::Failed,
        certificate_id: None,
        error_message: None,
    };

    let history = open_history(&cfg);

    match response {
        CertificateResponse::Single(resp) if resp.success && resp.certificate_id.is_some() => {
            let id = resp.certificate_id.unwrap_or_default();
            println!("Certificate generated successfully! ID: {}", id);

            if let Some(status) = &resp.delivery_status {
                debug!("Статус доставки: {:?}", status);
            }

            entry.status = Status::Success;
            entry.certificate_id = Some(id);
            history.add(entry);

            // Сертификат уже выпущен, так что превью не должно валить команду.
            if let (Some(preview), Some(path)) = (&resp.preview, &args.preview_out) {
                match write_preview(preview, path) {
                    Ok(()) => println!("Preview written to {:?}", path),
                    Err(e) => warn!("Failed to write preview to {:?}: {:#}", path, e),
                }
            }

            Ok(())
        }
        other => {
            debug!("Код ошибки вебхука: {:?}", other.code());
            let message = other
                .error()
                .unwrap_or("Failed to generate certificate")
                .to_owned();

            entry.error_message = Some(message.clone());
            history.add(entry);

            Err(anyhow!(message))
        }
    }
}

fn write_preview(preview: &str, path: &Path) -> anyhow::Result<()> {
    let bytes = files::from_base64(preview).context("decode preview")?;
    fs::write(path, bytes).with_context(|| format!("write {:?}", path))?;

    Ok(())
}

fn preview(args: PreviewArgs) -> anyhow::Result<()> {
    let cfg = config::load(args.config.config_path)?;

    let sheet = form::load_sheet(&cfg, &args.source.source()?)?;

    print!("{}", cli::render_preview(&sheet));
    println!("{} rows total", sheet.len());

    Ok(())
}

fn field_mapping(overrides: &[String]) -> anyhow::Result<FieldMapping> {
    let mut mapping = FieldMapping::default();
    for raw in overrides {
        mapping.apply_override(raw)?;
    }
    Ok(mapping)
}

fn bulk(args: BulkArgs) -> anyhow::Result<()> {
    let cfg = config::load(args.config.config_path.clone())?;

    let mapping = field_mapping(&args.mappings)?;
    let sender = args.delivery.sender(&cfg)?;
    let parts = args.template_parts(&cfg)?;
    let sheet = form::load_sheet(&cfg, &args.source.source()?)?;

    let job = BulkJob {
        template_type: args.template.template_type,
        mapping,
        brand_colors: parts.branding.and_then(|b| b.colors),
        custom_template: parts.custom,
        slides_template: parts.slides,
        channels: args.delivery.channels.clone(),
        sender,
    };

    let client = WebhookClient::new(&cfg.webhook_url)?;
    let history = open_history(&cfg);
    let mut orchestrator = Orchestrator::new(&client, &history)
        .with_row_delay(cfg.row_delay())
        .with_max_batch_size(cfg.max_batch_size);

    let cancel = CancellationToken::new();
    if !sheet.is_empty() {
        println!("Press Enter to stop after the current row");
        cancel.cancel_on_enter();
    }

    orchestrator.run(&sheet.rows, &job, &cancel)?;
    let progress = orchestrator.progress();

    for line in orchestrator.log() {
        println!("{}", line);
    }

    println!(
        "Processed: {}/{} | Successful: {} | Failed: {} | Remaining: {}",
        progress.processed,
        progress.total,
        progress.successful,
        progress.failed,
        progress.remaining()
    );
    if progress.cancelled {
        println!("Stopped by user");
    }
    println!("{}", progress.status);

    Ok(())
}

fn bulk_server_side(args: BulkArgs) -> anyhow::Result<()> {
    let cfg = config::load(args.config.config_path.clone())?;

    let mapping = field_mapping(&args.mappings)?;
    let sender = args.delivery.sender(&cfg)?;
    let parts = args.template_parts(&cfg)?;

    let mut request = BulkCertificateRequest {
        source: BulkSource::Excel,
        template_type: args.template.template_type,
        template: parts.custom,
        google_slides_template: parts.slides,
        excel_file: None,
        sheets_url: None,
        sheet_name: None,
        field_mapping: mapping,
        delivery: BulkDelivery {
            channels: args.delivery.channels.clone(),
        },
        sender,
        branding: parts.branding.filter(|b| b.colors.is_some()),
    };

    match args.source.source()? {
        Source::File(path) => {
            form::check_file(path, &cfg.supported_excel_formats, cfg.max_file_size)?;
            request.excel_file = Some(files::to_base64(path)?);
        }
        Source::GoogleSheets { url, sheet_name } => {
            sheet::google::extract_sheet_id(url).ok_or(sheet::SheetError::InvalidUrl)?;
            request.source = BulkSource::GoogleSheets;
            request.sheets_url = Some(url.to_owned());
            request.sheet_name = Some(sheet_name.to_owned());
        }
    }

    let client = WebhookClient::new(&cfg.webhook_url)?;

    match client.submit(&CertificateRequest::Bulk(request)) {
        CertificateResponse::Bulk(resp) if resp.success => {
            println!(
                "Processed: {}/{} | Successful: {} | Failed: {}",
                resp.processed.unwrap_or_default(),
                resp.total_records.unwrap_or_default(),
                resp.successful.unwrap_or_default(),
                resp.failed.unwrap_or_default()
            );
            if let Some(job_id) = resp.job_id {
                println!("Job: {}", job_id);
            }
            for e in resp.errors {
                println!("Row {}: {}", e.row, e.error);
            }
            Ok(())
        }
        other => Err(anyhow!(other
            .error()
            .unwrap_or("Failed to process certificates")
            .to_owned())),
    }
}

fn history(args: HistoryArgs) -> anyhow::Result<()> {
    let cfg = config::load(args.config.config_path)?;
    let history = open_history(&cfg);

    match args.action {
        HistoryAction::List { json } => {
            let all = history.get_all();

            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
                return Ok(());
            }

            for c in all {
                let outcome = match c.entry.status {
                    Status::Success => c.entry.certificate_id.unwrap_or_default(),
                    Status::Failed => c.entry.error_message.unwrap_or_default(),
                };
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    c.id,
                    c.generated_at.format("%Y-%m-%d %H:%M:%S"),
                    c.entry.status,
                    c.entry.recipient_name,
                    c.entry.badge,
                    outcome
                );
            }
        }
        HistoryAction::Delete { id } => history.delete(&id),
        HistoryAction::Clear => history.clear_all(),
    }

    Ok(())
}
