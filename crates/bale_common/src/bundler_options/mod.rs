pub mod input_item;
pub mod is_external;
pub mod treeshake;

use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::{
  bundler_options::{input_item::InputItem, is_external::IsExternal, treeshake::TreeshakeOptions},
  BuildCache, Warning,
};

pub type WarnHandler = Box<dyn Fn(&Warning) + Send + Sync>;

/// Whether to start from a previous build's cache.
#[derive(Debug, Default)]
pub enum CacheSetting {
  /// Cache enabled; `None` means a cold start.
  #[default]
  Cold,
  Warm(BuildCache),
  Disabled,
}

/// User-facing options. Everything optional except `input`; defaults are
/// applied by `normalize_options`.
#[derive(Default)]
pub struct GraphOptions {
  pub cwd: Option<PathBuf>,
  pub input: Vec<InputItem>,
  pub external: Option<IsExternal>,
  /// `Some(None)` is `treeshake: false`.
  pub treeshake: Option<Option<TreeshakeOptions>>,
  pub preserve_modules: Option<bool>,
  pub inline_dynamic_imports: Option<bool>,
  /// JS `this` for modules without a `module_context` entry.
  pub context: Option<String>,
  pub module_context: Option<FxHashMap<String, String>>,
  pub shim_missing_exports: Option<bool>,
  /// Allows `await` outside functions at module top level.
  pub experimental_top_level_await: Option<bool>,
  pub on_warn: Option<WarnHandler>,
  pub cache: Option<CacheSetting>,
  /// Builds a plugin-cache entry survives without being read.
  pub cache_expiry: Option<u32>,
}

/// Options after defaulting, as consumed by every stage.
pub struct NormalizedGraphOptions {
  pub cwd: PathBuf,
  pub input: Vec<InputItem>,
  pub external: IsExternal,
  /// `None` disables tree-shaking.
  pub treeshake: Option<TreeshakeOptions>,
  pub preserve_modules: bool,
  pub inline_dynamic_imports: bool,
  pub context: String,
  pub module_context: FxHashMap<String, String>,
  pub shim_missing_exports: bool,
  pub experimental_top_level_await: bool,
  pub on_warn: Option<WarnHandler>,
  pub cache_expiry: u32,
}

impl NormalizedGraphOptions {
  pub fn context_for(&self, id: &str) -> String {
    self.module_context.get(id).cloned().unwrap_or_else(|| self.context.clone())
  }

  pub fn treeshake_enabled(&self) -> bool {
    self.treeshake.is_some()
  }
}
