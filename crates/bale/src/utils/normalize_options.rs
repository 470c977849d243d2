use std::path::PathBuf;

use bale_common::{CacheSetting, GraphOptions, NormalizedGraphOptions, TreeshakeOptions};

pub struct NormalizeOptionsReturn {
  pub options: NormalizedGraphOptions,
  pub cache: CacheSetting,
}

pub fn normalize_options(options: GraphOptions) -> NormalizeOptionsReturn {
  let GraphOptions {
    cwd,
    input,
    external,
    treeshake,
    preserve_modules,
    inline_dynamic_imports,
    context,
    module_context,
    shim_missing_exports,
    experimental_top_level_await,
    on_warn,
    cache,
    cache_expiry,
  } = options;

  let options = NormalizedGraphOptions {
    cwd: cwd
      .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))),
    input,
    external: external.unwrap_or_default(),
    treeshake: treeshake.unwrap_or_else(|| Some(TreeshakeOptions::default())),
    preserve_modules: preserve_modules.unwrap_or(false),
    inline_dynamic_imports: inline_dynamic_imports.unwrap_or(false),
    context: context.unwrap_or_else(|| "undefined".to_string()),
    module_context: module_context.unwrap_or_default(),
    shim_missing_exports: shim_missing_exports.unwrap_or(false),
    experimental_top_level_await: experimental_top_level_await.unwrap_or(false),
    on_warn,
    cache_expiry: cache_expiry.unwrap_or(10),
  };

  NormalizeOptionsReturn { options, cache: cache.unwrap_or_default() }
}
