//! Module resolution — the closed dispatch table from descriptor to tool.
//!
//! Tool implementations are registered up front as loader functions keyed by
//! `(category, id)`; a module's code is materialized lazily on first
//! resolution and cached for the rest of the process lifetime. Loading may
//! fail independently of lookup ("no such tool" vs "failed to load"), is
//! retried at most once through a registered fallback loader, and failed
//! loads are never cached, so the next navigation attempt loads fresh.

pub mod catalog;
pub mod params;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::ProcessingEngine;
use crate::instance::bindings::ElementSpec;
use crate::instance::input::MediaKind;
use crate::progress::PhasePlan;
use crate::types::{CategoryId, Error, Result, ToolId};
use params::ParamDef;

/// Identifies one tool in the catalog. `(category, id)` pairs are unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub category: CategoryId,
    pub id: ToolId,
}

impl ToolDescriptor {
    pub fn new(category: CategoryId, id: ToolId) -> Self {
        Self { category, id }
    }

    /// Parse a navigation path like `video/mp4`.
    ///
    /// Malformed paths are reported as not-found; the router renders the
    /// same "tool failed to load" page either way.
    pub fn parse(path: &str) -> Result<Self> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let (Some(category), Some(id), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::module_not_found(path, ""));
        };

        let category = CategoryId::from_string(category.to_string())
            .map_err(|_| Error::module_not_found(path, ""))?;
        let id = ToolId::from_string(id.to_string())
            .map_err(|_| Error::module_not_found(path, ""))?;
        Ok(Self { category, id })
    }

    /// Canonical `category/id` path, the registry cache key.
    pub fn path(&self) -> String {
        format!("{}/{}", self.category, self.id)
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.id)
    }
}

/// The loaded implementation unit for one descriptor.
///
/// Exposes the markup template, the declared element map, accepted inputs,
/// parameter definitions, the workload's phase plan, and the engine
/// constructor. Loaded at most once per process lifetime; never unloaded.
pub trait ToolModule: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Human-readable tool title for log lines.
    fn title(&self) -> &str;

    /// Markup injected by the router; consumed verbatim.
    fn template(&self) -> &str;

    /// Declared name→element-id map resolved at bind time.
    fn element_map(&self) -> &[ElementSpec];

    /// Input kinds this tool accepts.
    fn accepted_inputs(&self) -> &[MediaKind];

    /// Declared processing parameters.
    fn parameters(&self) -> &[ParamDef];

    /// Ordered phases of one run, caller-side preparation included.
    fn phase_plan(&self) -> PhasePlan;

    /// Whether the input must be decoded to fixed-shape audio before
    /// dispatch (the worker has no decode capability).
    fn requires_audio_decode(&self) -> bool {
        false
    }

    /// Construct a fresh engine for one task run.
    fn create_engine(&self) -> Box<dyn ProcessingEngine>;
}

/// Loader function materializing a tool module.
pub type ModuleLoader = Arc<dyn Fn() -> Result<Arc<dyn ToolModule>> + Send + Sync>;

/// Loading strategies for one registered tool.
#[derive(Clone)]
pub struct ModuleSource {
    primary: ModuleLoader,
    fallback: Option<ModuleLoader>,
}

impl ModuleSource {
    pub fn new(primary: ModuleLoader) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(primary: ModuleLoader, fallback: ModuleLoader) -> Self {
        Self {
            primary,
            fallback: Some(fallback),
        }
    }
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSource")
            .field("has_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

/// The dispatch table. Owns loader registrations and the load-once cache.
#[derive(Default)]
pub struct ModuleRegistry {
    sources: HashMap<String, ModuleSource>,
    loaded: RwLock<HashMap<String, Arc<dyn ToolModule>>>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("tools", &self.list_paths())
            .finish_non_exhaustive()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool's loading strategies.
    ///
    /// `(category, id)` pairs are unique across the catalog; duplicate
    /// registration is a configuration error.
    pub fn register(&mut self, descriptor: &ToolDescriptor, source: ModuleSource) -> Result<()> {
        let key = descriptor.path();
        if self.sources.contains_key(&key) {
            return Err(Error::module_load(format!(
                "duplicate tool registration: {key}"
            )));
        }
        self.sources.insert(key, source);
        Ok(())
    }

    /// Whether a tool is registered (loadable or not).
    pub fn has_tool(&self, descriptor: &ToolDescriptor) -> bool {
        self.sources.contains_key(&descriptor.path())
    }

    /// Sorted list of registered tool paths.
    pub fn list_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.sources.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Resolve a descriptor to its module, loading on first reference.
    ///
    /// Load failures surface as [`Error::ModuleLoad`] after at most one
    /// retry through the fallback loader; they are not cached, so a later
    /// `resolve` re-triggers a fresh load.
    pub async fn resolve(&self, descriptor: &ToolDescriptor) -> Result<Arc<dyn ToolModule>> {
        let key = descriptor.path();

        if let Some(module) = self.loaded.read().await.get(&key) {
            return Ok(module.clone());
        }

        let source = self.sources.get(&key).ok_or_else(|| {
            Error::module_not_found(descriptor.category.as_str(), descriptor.id.as_str())
        })?;

        // Write lock held across the load so concurrent resolutions of the
        // same tool cannot load twice.
        let mut loaded = self.loaded.write().await;
        if let Some(module) = loaded.get(&key) {
            return Ok(module.clone());
        }

        let module = match (source.primary)() {
            Ok(module) => module,
            Err(primary_err) => {
                let Some(fallback) = &source.fallback else {
                    return Err(Error::module_load(format!("{key}: {primary_err}")));
                };
                tracing::warn!(tool = %key, error = %primary_err, "primary load failed, retrying via fallback");
                (fallback)().map_err(|fallback_err| {
                    Error::module_load(format!(
                        "{key}: {primary_err}; fallback: {fallback_err}"
                    ))
                })?
            }
        };

        if module.descriptor() != descriptor {
            return Err(Error::module_load(format!(
                "{key}: loader produced module for {}",
                module.descriptor()
            )));
        }

        tracing::debug!(tool = %key, "module loaded");
        loaded.insert(key, module.clone());
        Ok(module)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
