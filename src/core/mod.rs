//! Core - owns the store connection shared by every model.

mod config;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::cache::{Cache, NoOpCache};
use crate::connection::{Connection, Connector};
use crate::error::{Error, Result};
use crate::hooks::Hooks;

pub use config::Configuration;

/// Connection owner and source of defaults (cache, plugins) for models.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct Core {
    inner: Arc<CoreInner>,
}

struct CoreInner {
    url: String,
    settings: Option<Configuration>,
    connector: Option<Arc<dyn Connector>>,
    connection: RwLock<Option<Arc<dyn Connection>>>,
    cache: RwLock<Arc<dyn Cache>>,
    plugins: RwLock<Vec<Arc<dyn Hooks>>>,
}

impl Core {
    /// Starts building a core that connects to `url`.
    pub fn from_url(url: impl Into<String>) -> CoreBuilder {
        CoreBuilder::default().url(url)
    }

    /// Starts building a core whose URL is composed from `config`.
    pub fn from_config(config: Configuration) -> CoreBuilder {
        CoreBuilder::default().config(config)
    }

    pub fn builder() -> CoreBuilder {
        CoreBuilder::default()
    }

    /// URL used to connect to the store.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Configuration supplied at construction, if any.
    pub fn settings(&self) -> Option<&Configuration> {
        self.inner.settings.as_ref()
    }

    /// Opens the connection, or returns the one already open.
    pub fn connect(&self) -> Result<Arc<dyn Connection>> {
        let mut slot = self.inner.connection.write();
        if let Some(connection) = &*slot {
            if !connection.is_closed() {
                return Ok(Arc::clone(connection));
            }
        }

        let connector = self
            .inner
            .connector
            .as_ref()
            .ok_or_else(|| Error::Connection("no connector configured".into()))?;
        let connection = connector.connect(&self.inner.url)?;
        info!(url = %redact(&self.inner.url), "connected");
        *slot = Some(Arc::clone(&connection));
        Ok(connection)
    }

    /// The open connection. Fails fast when not connected or closed.
    pub fn connection(&self) -> Result<Arc<dyn Connection>> {
        match &*self.inner.connection.read() {
            Some(connection) if !connection.is_closed() => Ok(Arc::clone(connection)),
            Some(_) => Err(Error::Connection("connection is closed".into())),
            None => Err(Error::Connection("not connected".into())),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_ok()
    }

    /// Releases the connection. Safe to call repeatedly.
    pub fn close(&self) {
        if let Some(connection) = self.inner.connection.write().take() {
            connection.close();
            info!(url = %redact(&self.inner.url), "connection closed");
        }
    }

    /// Cache handed to models built without an explicit one.
    pub fn cache(&self) -> Arc<dyn Cache> {
        Arc::clone(&self.inner.cache.read())
    }

    /// Replaces the default cache. Models already built keep theirs.
    pub fn set_cache(&self, cache: Arc<dyn Cache>) {
        *self.inner.cache.write() = cache;
    }

    /// Registers a plugin whose hooks run before the model's own, for models built afterwards.
    pub fn register(&self, plugin: Arc<dyn Hooks>) -> &Self {
        self.inner.plugins.write().push(plugin);
        self
    }

    pub fn plugins(&self) -> Vec<Arc<dyn Hooks>> {
        self.inner.plugins.read().clone()
    }
}

/// Builder for [`Core`]. A URL or a configuration is required.
#[derive(Default)]
pub struct CoreBuilder {
    url: Option<String>,
    config: Option<Configuration>,
    connector: Option<Arc<dyn Connector>>,
    cache: Option<Arc<dyn Cache>>,
    plugins: Vec<Arc<dyn Hooks>>,
}

impl CoreBuilder {
    /// An explicit URL wins over one composed from the configuration.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn config(mut self, config: Configuration) -> Self {
        self.config = Some(config);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn plugin(mut self, plugin: Arc<dyn Hooks>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn build(self) -> Result<Core> {
        let url = match (self.url.filter(|url| !url.is_empty()), &self.config) {
            (Some(url), _) => url,
            (None, Some(config)) => {
                config.validate()?;
                config.url()
            }
            (None, None) => {
                return Err(Error::Configuration(
                    "expected either a connection url or a configuration".into(),
                ))
            }
        };

        Ok(Core {
            inner: Arc::new(CoreInner {
                url,
                settings: self.config,
                connector: self.connector,
                connection: RwLock::new(None),
                cache: RwLock::new(self.cache.unwrap_or_else(|| Arc::new(NoOpCache))),
                plugins: RwLock::new(self.plugins),
            }),
        })
    }
}

/// Hides the password part of a connection URL.
fn redact(url: &str) -> String {
    let Some(rest) = url.strip_prefix("mongodb://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let username = credentials.split(':').next().unwrap_or_default();
            if credentials.contains(':') {
                format!("mongodb://{username}:***@{host}")
            } else {
                format!("mongodb://{username}@{host}")
            }
        }
        None => url.to_string(),
    }
}
