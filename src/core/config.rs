use figment::providers::Env;
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Connection settings composed into a `mongodb://` URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Defaults to `localhost`.
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    /// Only used together with `username`.
    pub password: Option<String>,
    #[serde(default)]
    pub database: String,
}

impl Configuration {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Loads settings from `DOCBIND_*` environment variables (`DOCBIND_DATABASE`, `DOCBIND_HOST`, ...).
    pub fn from_env() -> Result<Self> {
        Self::from_figment(&Figment::new().merge(Env::prefixed("DOCBIND_")))
    }

    /// Extracts and validates settings from any figment.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Configuration = figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(Error::Configuration("a database name is required".into()));
        }
        Ok(())
    }

    /// `mongodb://[username[:password]@]host[:port]/database`
    pub fn url(&self) -> String {
        let mut url = String::from("mongodb://");

        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            url.push_str(username);
            if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
                url.push(':');
                url.push_str(password);
            }
            url.push('@');
        }

        url.push_str(
            self.host
                .as_deref()
                .filter(|h| !h.is_empty())
                .unwrap_or("localhost"),
        );
        if let Some(port) = self.port {
            url.push(':');
            url.push_str(&port.to_string());
        }

        url.push('/');
        url.push_str(&self.database);
        url
    }
}
