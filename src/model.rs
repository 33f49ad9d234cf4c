use std::{collections::BTreeMap, str::FromStr};

use anyhow::anyhow;
use chrono::Local;
use enum_iterator::all;
use serde::{Serialize, Serializer};

use crate::newtype;

newtype!(RecipientName, required_validate);
newtype!(Badge, required_validate);
newtype!(SenderName, required_validate);

fn required_validate(value: &str) -> anyhow::Result<()> {
    if value.is_empty() {
        return Err(anyhow!("shouldn't be empty"));
    }

    Ok(())
}

/// Сегодняшняя локальная дата в формате `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Поля сертификата, которые можно заполнить из колонки таблицы.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    std::hash::Hash,
    derive_more::Display,
    enum_iterator::Sequence,
)]
pub enum CertificateField {
    #[display(fmt = "name")]
    Name,
    #[display(fmt = "badge")]
    Badge,
    #[display(fmt = "date")]
    Date,
    #[display(fmt = "description")]
    Description,
    #[display(fmt = "issuer")]
    Issuer,
    #[display(fmt = "certificateTitle")]
    CertificateTitle,
    #[display(fmt = "awardPurpose")]
    AwardPurpose,
    #[display(fmt = "programName")]
    ProgramName,
    #[display(fmt = "email")]
    Email,
    #[display(fmt = "whatsapp")]
    Whatsapp,
}

impl FromStr for CertificateField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all::<CertificateField>()
            .find(|f| f.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown certificate field \"{}\"", s))
    }
}

impl Serialize for CertificateField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Соответствие полей сертификата колонкам таблицы.
///
/// Несколько полей могут указывать на одну колонку.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<CertificateField, String>);

impl Default for FieldMapping {
    fn default() -> Self {
        let mut m = BTreeMap::new();
        m.insert(CertificateField::Name, "Name".to_owned());
        m.insert(CertificateField::Badge, "Badge".to_owned());
        m.insert(CertificateField::Date, "Date".to_owned());
        m.insert(CertificateField::Description, "Description".to_owned());
        m.insert(CertificateField::Email, "Email".to_owned());
        m.insert(CertificateField::Whatsapp, "WhatsApp".to_owned());
        Self(m)
    }
}

impl FieldMapping {
    #[cfg(test)]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn column(&self, field: CertificateField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Связывает поле с колонкой. Пустая колонка убирает связь.
    pub fn set(&mut self, field: CertificateField, column: &str) {
        let column = column.trim();
        if column.is_empty() {
            self.0.remove(&field);
        } else {
            self.0.insert(field, column.to_owned());
        }
    }

    /// Применяет переопределение вида `field=Column`.
    pub fn apply_override(&mut self, raw: &str) -> anyhow::Result<()> {
        let (field, column) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("mapping \"{}\" should look like field=Column", raw))?;

        self.set(field.parse()?, column);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! from_str_tests {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (expected, input) = $value;
                assert_eq!(expected, input.parse::<CertificateField>().unwrap());
            }
        )*
        }
    }

    from_str_tests! {
        from_str_name: (CertificateField::Name, "name"),
        from_str_upper: (CertificateField::Whatsapp, "WhatsApp"),
        from_str_camel: (CertificateField::AwardPurpose, "awardPurpose"),
        from_str_padded: (CertificateField::Issuer, " issuer "),
    }

    #[test]
    fn from_str_unknown() {
        let err = "colour".parse::<CertificateField>().unwrap_err();

        assert_eq!("unknown certificate field \"colour\"", err.to_string());
    }

    #[test]
    fn default_mapping() {
        let m = FieldMapping::default();

        assert_eq!(Some("Name"), m.column(CertificateField::Name));
        assert_eq!(Some("WhatsApp"), m.column(CertificateField::Whatsapp));
        assert_eq!(None, m.column(CertificateField::Issuer));
    }

    #[test]
    fn override_mapping() {
        let mut m = FieldMapping::default();

        m.apply_override("issuer=Organisation").unwrap();
        m.apply_override("badge=").unwrap();
        m.apply_override("date=Name").unwrap();

        assert_eq!(Some("Organisation"), m.column(CertificateField::Issuer));
        assert_eq!(None, m.column(CertificateField::Badge));
        assert_eq!(Some("Name"), m.column(CertificateField::Date));
        assert!(m.apply_override("nonsense").is_err());
    }

    #[test]
    fn mapping_serializes_with_field_names() {
        let mut m = FieldMapping::empty();
        m.set(CertificateField::Name, "Full Name");

        let json = serde_json::to_string(&m).unwrap();

        assert_eq!(r#"{"name":"Full Name"}"#, json);
    }

    #[test]
    fn required_values() {
        assert!(RecipientName::new("   ").is_err());
        assert_eq!("Jane", RecipientName::new(" Jane ").unwrap().to_string());
    }
}
