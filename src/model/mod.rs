//! Models - the gateway between application code and one collection.
//!
//! A [`Model`] binds a collection name, a [`Schema`] and a cache policy to a
//! [`Core`]. Reads go through the model's [`ModelCache`] when the director
//! allows it, and every document comes back wrapped in an [`Instance`].
//!
//! ## Example
//!
//! ```ignore
//! use docbind::{doc, Core, InMemoryConnector, MemoryCache, Model, Schema};
//!
//! let core = Core::from_url("mongodb://localhost/app")
//!     .connector(Arc::new(InMemoryConnector::new()))
//!     .cache(Arc::new(MemoryCache::new(1024)))
//!     .build()?;
//! core.connect()?;
//!
//! let users = Model::builder(&core, "users")
//!     .schema(Schema::new().unique("email"))
//!     .build();
//! let ada = users.create(doc! { "name": "Ada", "email": "ada@example.com" })?;
//! let again = users.find_by_id(ada.id().cloned().unwrap_or_default())?;
//! ```

mod instance;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{Cache, CacheDirector, IdentityDirector, ModelCache};
use crate::connection::Connection;
use crate::core::Core;
use crate::document::{to_document, Changes, Document, Query};
use crate::error::Result;
use crate::hooks::{HookChain, Hooks};
use crate::schema::{Schema, Schematic};

pub use instance::{Instance, InstanceState};

/// Handle to one collection. Cheap to clone; clones share cache and hooks.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    core: Core,
    collection: String,
    schema: Schema,
    cache: ModelCache,
    hooks: HookChain,
}

impl Model {
    /// Starts building a model over `collection`.
    pub fn builder(core: &Core, collection: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            core: core.clone(),
            collection: collection.into(),
            schema: Schema::new(),
            hooks: Vec::new(),
            cache: None,
            director: None,
        }
    }

    /// Starts building a model for a typed document, taking its collection and schema.
    pub fn of<T: Schematic>(core: &Core) -> ModelBuilder {
        Self::builder(core, T::COLLECTION).schema(T::schema())
    }

    pub fn collection_name(&self) -> &str {
        &self.inner.collection
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn cache(&self) -> &ModelCache {
        &self.inner.cache
    }

    pub fn core(&self) -> &Core {
        &self.inner.core
    }

    pub(crate) fn hooks(&self) -> &HookChain {
        &self.inner.hooks
    }

    pub(crate) fn connection(&self) -> Result<Arc<dyn Connection>> {
        self.inner.core.connection()
    }

    /// Wraps a document that has not been persisted yet.
    pub fn new_instance(&self, document: Document) -> Result<Instance> {
        let mut instance = Instance::fresh(self.clone(), document);
        self.inner.hooks.ready(&mut instance)?;
        Ok(instance)
    }

    /// Wraps a document read from the store or the cache.
    pub(crate) fn hydrate(&self, raw: Document, partial: bool) -> Result<Instance> {
        let document = self.inner.hooks.retrieved(raw.clone())?;
        let mut instance = Instance::hydrated(self.clone(), raw, document, partial);
        self.inner.hooks.ready(&mut instance)?;
        Ok(instance)
    }

    /// First document matching the query, served from the cache when the director allows it.
    pub fn find_one(&self, query: impl Into<Query>) -> Result<Option<Instance>> {
        let query = query.into();
        let connection = self.connection()?;

        if let Some(cached) = self.inner.cache.fetch(&query) {
            return self.hydrate(cached, false).map(Some);
        }

        let Some(raw) = connection.find_one(&self.inner.collection, &query)? else {
            return Ok(None);
        };
        let partial = query.is_partial();
        let instance = self.hydrate(raw.clone(), partial)?;
        if !partial {
            self.inner.cache.store(&raw);
        }
        Ok(Some(instance))
    }

    pub fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<Instance>> {
        self.find_one(Query::by_id(id))
    }

    /// Every matching document. Never touches the cache.
    pub fn find(&self, query: impl Into<Query>) -> Result<Vec<Instance>> {
        let query = query.into();
        let partial = query.is_partial();
        self.connection()?
            .find(&self.inner.collection, &query)?
            .into_iter()
            .map(|raw| self.hydrate(raw, partial))
            .collect()
    }

    pub fn count(&self, conditions: &Document) -> Result<u64> {
        self.connection()?.count(&self.inner.collection, conditions)
    }

    /// Inserts a document through a new instance, running the create hooks.
    pub fn create(&self, document: Document) -> Result<Instance> {
        let mut instance = self.new_instance(document)?;
        instance.save()?;
        Ok(instance)
    }

    pub fn create_from<T: Serialize>(&self, value: &T) -> Result<Instance> {
        self.create(to_document(value)?)
    }

    /// Applies `changes` to every matching document. Returns the matched count.
    ///
    /// Only conditions the cache director accepts (an identity or unique-field
    /// equality) invalidate cached entries. Updating by any other filter leaves
    /// cached copies of the touched documents in place until they are evicted
    /// or written through an instance.
    pub fn update(&self, conditions: &Document, changes: &Changes) -> Result<u64> {
        let matched = self
            .connection()?
            .update(&self.inner.collection, conditions, changes, true)?;
        debug!(collection = %self.inner.collection, matched, "bulk update");
        self.inner.cache.invalidate(conditions);
        Ok(matched)
    }

    /// Deletes every matching document. Returns the removed count.
    ///
    /// Cache invalidation follows the same rule as [`Model::update`].
    pub fn remove(&self, conditions: &Document) -> Result<u64> {
        let removed = self
            .connection()?
            .delete(&self.inner.collection, conditions)?;
        debug!(collection = %self.inner.collection, removed, "bulk remove");
        self.inner.cache.invalidate(conditions);
        Ok(removed)
    }

    /// Asks the store to enforce every unique field the schema declares.
    pub fn ensure_indexes(&self) -> Result<()> {
        let connection = self.connection()?;
        for field in self.inner.schema.unique_fields() {
            connection.ensure_unique(&self.inner.collection, field)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("collection", &self.inner.collection)
            .field("schema", &self.inner.schema)
            .field("hooks", &self.inner.hooks.len())
            .finish()
    }
}

/// Builder for [`Model`].
pub struct ModelBuilder {
    core: Core,
    collection: String,
    schema: Schema,
    hooks: Vec<Arc<dyn Hooks>>,
    cache: Option<Arc<dyn Cache>>,
    director: Option<Arc<dyn CacheDirector>>,
}

impl ModelBuilder {
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Adds a hook. Model hooks run after the core's plugins, in the order added.
    pub fn hook<H: Hooks + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn shared_hook(mut self, hook: Arc<dyn Hooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Cache for this model. Defaults to the core's cache at build time.
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Key policy for this model. Defaults to an [`IdentityDirector`] over the schema.
    pub fn director(mut self, director: Arc<dyn CacheDirector>) -> Self {
        self.director = Some(director);
        self
    }

    pub fn build(self) -> Model {
        let mut hooks = self.core.plugins();
        hooks.extend(self.hooks);

        let cache = self.cache.unwrap_or_else(|| self.core.cache());
        let director = self.director.unwrap_or_else(|| {
            Arc::new(IdentityDirector::new(
                self.collection.clone(),
                self.schema.clone(),
            ))
        });

        Model {
            inner: Arc::new(ModelInner {
                core: self.core,
                collection: self.collection,
                schema: self.schema,
                cache: ModelCache::new(cache, director),
                hooks: HookChain::new(hooks),
            }),
        }
    }
}
