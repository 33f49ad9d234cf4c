use std::{fs, io, path::Path};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::debug;

/// Результат проверки файла. Текст `error` показывается пользователю.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub error: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(error: String) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

/// Сведения о локальном файле перед загрузкой.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub mime: String,
    pub size: u64,
}

impl FileInfo {
    /// Определяет MIME тип по расширению и читает размер с диска.
    pub fn inspect(path: &Path) -> io::Result<Self> {
        let size = fs::metadata(path)?.len();
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_owned();

        Ok(Self { mime, size })
    }
}

/// Проверяет MIME тип и ограничение на размер.
pub fn validate(file: &FileInfo, allowed_types: &[String], max_size: u64) -> Validation {
    if !allowed_types.iter().any(|t| t == &file.mime) {
        return Validation::invalid(format!(
            "Invalid file type. Allowed types: {}",
            allowed_types.join(", ")
        ));
    }

    if file.size > max_size {
        return Validation::invalid(format!(
            "File size exceeds maximum allowed size of {}MB",
            max_size / (1024 * 1024)
        ));
    }

    Validation::ok()
}

/// Читает файл и кодирует его в `data:<mime>;base64,` URL.
pub fn to_base64(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    debug!("Кодируем {:?} ({} байт) как {}", path, bytes.len(), mime);

    Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}

/// Декодирует data URL или просто base64.
pub fn from_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };

    BASE64.decode(payload.trim())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn allowed() -> Vec<String> {
        vec!["image/png".to_owned(), "image/jpeg".to_owned()]
    }

    #[test]
    fn validate_accepts_allowed_type() {
        let file = FileInfo {
            mime: "image/png".into(),
            size: 1024,
        };

        assert_eq!(Validation::ok(), validate(&file, &allowed(), 10 * 1024 * 1024));
    }

    #[test]
    fn validate_rejects_type() {
        let file = FileInfo {
            mime: "text/plain".into(),
            size: 1,
        };

        let res = validate(&file, &allowed(), 10);

        assert!(!res.valid);
        assert_eq!(
            Some("Invalid file type. Allowed types: image/png, image/jpeg".to_owned()),
            res.error
        );
    }

    #[test]
    fn validate_rejects_size() {
        let file = FileInfo {
            mime: "image/jpeg".into(),
            size: 10 * 1024 * 1024 + 1,
        };

        let res = validate(&file, &allowed(), 10 * 1024 * 1024);

        assert_eq!(
            Some("File size exceeds maximum allowed size of 10MB".to_owned()),
            res.error
        );
    }

    #[test]
    fn base64_round_trip_through_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        fs::File::create(&path)
            .unwrap()
            .write_all(&[0x89, b'P', b'N', b'G'])
            .unwrap();

        let encoded = to_base64(&path).unwrap();

        assert_eq!("data:image/png;base64,iVBORw==", encoded);
        assert_eq!(vec![0x89, b'P', b'N', b'G'], from_base64(&encoded).unwrap());
        assert_eq!(
            FileInfo {
                mime: "image/png".into(),
                size: 4
            },
            FileInfo::inspect(&path).unwrap()
        );
    }

    #[test]
    fn base64_missing_file() {
        assert!(to_base64(Path::new("/definitely/not/here.png")).is_err());
    }
}
