/// Создаёт новый доменный тип.
#[macro_export]
macro_rules! newtype {
    ($tname:ident, $validate_fn:ident) => {
        #[derive(
            std::fmt::Debug,
            std::clone::Clone,
            serde::Serialize,
            serde::Deserialize,
            std::cmp::PartialEq,
            std::cmp::Eq,
            std::default::Default,
        )]
        #[serde(try_from = "String")]
        pub struct $tname(String);

        impl $tname {
            pub fn new(value: &str) -> anyhow::Result<Self> {
                let value = value.trim();
                Self::validate(value)?;
                Ok(Self(value.into()))
            }

            fn validate(value: &str) -> anyhow::Result<()> {
                $validate_fn(value)
            }
        }

        #[allow(clippy::from_over_into)]
        impl std::convert::Into<String> for $tname {
            fn into(self) -> String {
                self.0
            }
        }

        impl std::convert::TryFrom<String> for $tname {
            type Error = anyhow::Error;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                $tname::new(&value)
            }
        }

        impl std::fmt::Display for $tname {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
