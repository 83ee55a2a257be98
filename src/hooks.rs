//! Lifecycle hooks invoked by models and instances at fixed points.
//!
//! Hooks run in registration order: plugins registered on the [`Core`](crate::Core)
//! first, then the model's own hooks. For transforming hooks the output of
//! one is the input of the next. The first hook to fail aborts the enclosing
//! operation.
//!
//! | Hook | Runs | Store already written? |
//! |---|---|---|
//! | `on_retrieved` | after a read (store or cache), before the instance exists | no write involved |
//! | `on_creating` | before an insert | no |
//! | `on_created` | after an insert is acknowledged, before the cache is updated | yes |
//! | `on_ready` | once an instance is constructed | no write involved |
//! | `on_saving` | before an update is sent | no |

use std::sync::Arc;

use tracing::warn;

use crate::document::{Changes, Document};
use crate::error::{Error, HookError, Result};
use crate::model::Instance;

/// Extension points of the document lifecycle. Every method is optional.
pub trait Hooks: Send + Sync {
    /// Name used in errors and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Transforms a raw document right after it was read.
    fn on_retrieved(&self, document: Document) -> std::result::Result<Document, HookError> {
        Ok(document)
    }

    /// Transforms a document right before it is inserted.
    fn on_creating(&self, document: Document) -> std::result::Result<Document, HookError> {
        Ok(document)
    }

    /// Observes an instance whose insert was acknowledged.
    fn on_created(&self, _instance: &Instance) -> std::result::Result<(), HookError> {
        Ok(())
    }

    /// Called once an instance is constructed and usable.
    fn on_ready(&self, _instance: &mut Instance) -> std::result::Result<(), HookError> {
        Ok(())
    }

    /// Transforms the change set right before it is sent to the store.
    fn on_saving(
        &self,
        _instance: &Instance,
        changes: Changes,
    ) -> std::result::Result<Changes, HookError> {
        Ok(changes)
    }
}

type Transform = Box<dyn Fn(Document) -> std::result::Result<Document, HookError> + Send + Sync>;
type Observe = Box<dyn Fn(&Instance) -> std::result::Result<(), HookError> + Send + Sync>;
type Prepare = Box<dyn Fn(&mut Instance) -> std::result::Result<(), HookError> + Send + Sync>;
type Rewrite =
    Box<dyn Fn(&Instance, Changes) -> std::result::Result<Changes, HookError> + Send + Sync>;

/// Hooks assembled from closures, one optional slot per lifecycle point.
///
/// ```ignore
/// let stamps = HookSet::new("timestamps")
///     .on_creating(|mut doc| {
///         doc.insert("created".into(), now().into());
///         Ok(doc)
///     })
///     .on_saving(|_, changes| Ok(changes.set("updated", now())));
/// ```
pub struct HookSet {
    name: String,
    retrieved: Option<Transform>,
    creating: Option<Transform>,
    created: Option<Observe>,
    ready: Option<Prepare>,
    saving: Option<Rewrite>,
}

impl HookSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retrieved: None,
            creating: None,
            created: None,
            ready: None,
            saving: None,
        }
    }

    pub fn on_retrieved<F>(mut self, f: F) -> Self
    where
        F: Fn(Document) -> std::result::Result<Document, HookError> + Send + Sync + 'static,
    {
        self.retrieved = Some(Box::new(f));
        self
    }

    pub fn on_creating<F>(mut self, f: F) -> Self
    where
        F: Fn(Document) -> std::result::Result<Document, HookError> + Send + Sync + 'static,
    {
        self.creating = Some(Box::new(f));
        self
    }

    pub fn on_created<F>(mut self, f: F) -> Self
    where
        F: Fn(&Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.created = Some(Box::new(f));
        self
    }

    pub fn on_ready<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Instance) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.ready = Some(Box::new(f));
        self
    }

    pub fn on_saving<F>(mut self, f: F) -> Self
    where
        F: Fn(&Instance, Changes) -> std::result::Result<Changes, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.saving = Some(Box::new(f));
        self
    }
}

impl Hooks for HookSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_retrieved(&self, document: Document) -> std::result::Result<Document, HookError> {
        match &self.retrieved {
            Some(f) => f(document),
            None => Ok(document),
        }
    }

    fn on_creating(&self, document: Document) -> std::result::Result<Document, HookError> {
        match &self.creating {
            Some(f) => f(document),
            None => Ok(document),
        }
    }

    fn on_created(&self, instance: &Instance) -> std::result::Result<(), HookError> {
        match &self.created {
            Some(f) => f(instance),
            None => Ok(()),
        }
    }

    fn on_ready(&self, instance: &mut Instance) -> std::result::Result<(), HookError> {
        match &self.ready {
            Some(f) => f(instance),
            None => Ok(()),
        }
    }

    fn on_saving(
        &self,
        instance: &Instance,
        changes: Changes,
    ) -> std::result::Result<Changes, HookError> {
        match &self.saving {
            Some(f) => f(instance, changes),
            None => Ok(changes),
        }
    }
}

/// Ordered hooks of one model.
#[derive(Clone, Default)]
pub(crate) struct HookChain {
    hooks: Vec<Arc<dyn Hooks>>,
}

impl HookChain {
    pub(crate) fn new(hooks: Vec<Arc<dyn Hooks>>) -> Self {
        Self { hooks }
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    pub(crate) fn retrieved(&self, document: Document) -> Result<Document> {
        self.hooks.iter().try_fold(document, |document, hook| {
            hook.on_retrieved(document)
                .map_err(|err| abort("on_retrieved", hook, err))
        })
    }

    pub(crate) fn creating(&self, document: Document) -> Result<Document> {
        self.hooks.iter().try_fold(document, |document, hook| {
            hook.on_creating(document)
                .map_err(|err| abort("on_creating", hook, err))
        })
    }

    pub(crate) fn created(&self, instance: &Instance) -> Result<()> {
        for hook in &self.hooks {
            hook.on_created(instance)
                .map_err(|err| abort("on_created", hook, err))?;
        }
        Ok(())
    }

    pub(crate) fn ready(&self, instance: &mut Instance) -> Result<()> {
        for hook in &self.hooks {
            hook.on_ready(instance)
                .map_err(|err| abort("on_ready", hook, err))?;
        }
        Ok(())
    }

    pub(crate) fn saving(&self, instance: &Instance, changes: Changes) -> Result<Changes> {
        self.hooks.iter().try_fold(changes, |changes, hook| {
            hook.on_saving(instance, changes)
                .map_err(|err| abort("on_saving", hook, err))
        })
    }
}

fn abort(stage: &'static str, hook: &Arc<dyn Hooks>, err: HookError) -> Error {
    warn!(stage, hook = hook.name(), error = %err, "hook aborted operation");
    err.into_error(stage, hook.name())
}
