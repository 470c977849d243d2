use std::{
  borrow::Cow,
  sync::{Arc, Mutex},
};

use arcstr::ArcStr;
use async_trait::async_trait;

use crate::{PluginCache, ScannedModule, TransformAsset};

/// What `resolve_id` may answer.
#[derive(Debug, Clone)]
pub enum HookResolveIdOutput {
  /// Hard external: the specifier is kept as the external id and no
  /// unresolved-import warning is emitted.
  External,
  /// A resolved id; whether it is external is decided by the external
  /// predicate afterwards.
  Id(ArcStr),
  /// Fully resolved, taken verbatim.
  Resolved { id: ArcStr, external: bool },
}

/// What `load` may answer. A return carrying neither code nor a scanned
/// module is a `BAD_LOADER` error.
#[derive(Debug, Clone, Default)]
pub struct HookLoadOutput {
  pub code: Option<ArcStr>,
  pub scanned: Option<ScannedModule>,
}

#[derive(Debug, Clone, Default)]
pub struct HookTransformOutput {
  pub code: Option<ArcStr>,
  /// A pre-scanned module, making the built-in scanner skip this module.
  pub scanned: Option<ScannedModule>,
  pub assets: Vec<TransformAsset>,
  /// Set when the plugin manages its own cache for this module; such
  /// modules are never reused from the persistent module cache.
  pub uses_custom_cache: bool,
}

#[derive(Debug, Clone)]
pub enum HookResolveDynamicImportOutput {
  Id(ArcStr),
  Resolved { id: ArcStr, external: bool },
  /// Replace the import expression; the site bypasses module resolution.
  Replacement(ArcStr),
}

/// Handle given to every hook invocation. Scopes the shared plugin cache
/// to the calling plugin's namespace.
#[derive(Debug, Clone)]
pub struct PluginContext {
  plugin_name: String,
  cache: Arc<Mutex<PluginCache>>,
}

impl PluginContext {
  pub fn new(plugin_name: impl Into<String>, cache: Arc<Mutex<PluginCache>>) -> Self {
    Self { plugin_name: plugin_name.into(), cache }
  }

  pub fn cache_get(&self, key: &str) -> Option<serde_json::Value> {
    self.cache.lock().unwrap().get(&self.plugin_name, key)
  }

  pub fn cache_set(&self, key: impl Into<String>, value: serde_json::Value) {
    self.cache.lock().unwrap().set(&self.plugin_name, key, value);
  }

  pub fn cache_has(&self, key: &str) -> bool {
    self.cache.lock().unwrap().has(&self.plugin_name, key)
  }
}

/// A build plugin. Hooks are dispatched first-wins in registration order;
/// the defaults answer "not handled".
#[async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> Cow<'static, str>;

  async fn resolve_id(
    &self,
    _ctx: &PluginContext,
    _specifier: &str,
    _importer: Option<&str>,
  ) -> anyhow::Result<Option<HookResolveIdOutput>> {
    Ok(None)
  }

  async fn load(
    &self,
    _ctx: &PluginContext,
    _id: &str,
  ) -> anyhow::Result<Option<HookLoadOutput>> {
    Ok(None)
  }

  async fn transform(
    &self,
    _ctx: &PluginContext,
    _code: &str,
    _id: &str,
  ) -> anyhow::Result<Option<HookTransformOutput>> {
    Ok(None)
  }

  async fn resolve_dynamic_import(
    &self,
    _ctx: &PluginContext,
    _specifier: &str,
    _importer: &str,
  ) -> anyhow::Result<Option<HookResolveDynamicImportOutput>> {
    Ok(None)
  }

  /// Best-effort notification; called on every plugin, not first-wins.
  async fn watch_change(&self, _ctx: &PluginContext, _id: &str) -> anyhow::Result<()> {
    Ok(())
  }
}

pub type SharedPlugin = Arc<dyn Plugin>;
