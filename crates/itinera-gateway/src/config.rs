use std::fmt::{Display, Formatter};
use typed_builder::TypedBuilder;

/// Deployment environment the gateway runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    /// Whether internal error causes may be included in responses.
    pub fn exposes_error_detail(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct GatewayConfig {
    #[builder(default)]
    pub environment: Environment,
    /// Origin used in share links, e.g. `https://trips.example.com`. When
    /// unset it is derived from the request's `Host` header.
    #[builder(default, setter(strip_option, into))]
    pub public_base_url: Option<String>,
}
