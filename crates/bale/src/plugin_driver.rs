use std::{
  path::PathBuf,
  sync::{Arc, Mutex},
};

use arcstr::ArcStr;
use bale_common::{
  HookLoadOutput, HookResolveDynamicImportOutput, HookResolveIdOutput, HookTransformOutput,
  PluginCache, PluginContext, SharedPlugin,
};

use crate::{types::SharedFs, utils::resolve_id::default_resolve};

/// Dispatches hooks across the registered plugins. Every hook except
/// `watch_change` is first-wins: plugins run in registration order and the
/// first non-`None` answer ends the chain. `resolve_id` and `load` fall
/// back to built-in path resolution and file reading when no plugin
/// answers.
pub struct PluginDriver {
  plugins: Vec<(SharedPlugin, PluginContext)>,
  fs: SharedFs,
  cwd: PathBuf,
}

impl PluginDriver {
  pub fn new(
    plugins: Vec<SharedPlugin>,
    cache: Arc<Mutex<PluginCache>>,
    fs: SharedFs,
    cwd: PathBuf,
  ) -> Self {
    let plugins = plugins
      .into_iter()
      .map(|plugin| {
        let ctx = PluginContext::new(plugin.name().into_owned(), Arc::clone(&cache));
        (plugin, ctx)
      })
      .collect();
    Self { plugins, fs, cwd }
  }

  pub async fn resolve_id(
    &self,
    specifier: &str,
    importer: Option<&str>,
  ) -> anyhow::Result<Option<HookResolveIdOutput>> {
    for (plugin, ctx) in &self.plugins {
      if let Some(resolved) = plugin.resolve_id(ctx, specifier, importer).await? {
        return Ok(Some(resolved));
      }
    }
    Ok(default_resolve(&*self.fs, &self.cwd, specifier, importer).map(HookResolveIdOutput::Id))
  }

  pub async fn load(&self, id: &str) -> anyhow::Result<Option<HookLoadOutput>> {
    for (plugin, ctx) in &self.plugins {
      if let Some(loaded) = plugin.load(ctx, id).await? {
        return Ok(Some(loaded));
      }
    }
    let code = self.fs.read_to_string(std::path::Path::new(id))?;
    Ok(Some(HookLoadOutput { code: Some(code.into()), scanned: None }))
  }

  pub async fn transform(
    &self,
    code: &str,
    id: &str,
  ) -> anyhow::Result<Option<HookTransformOutput>> {
    for (plugin, ctx) in &self.plugins {
      if let Some(transformed) = plugin.transform(ctx, code, id).await? {
        return Ok(Some(transformed));
      }
    }
    Ok(None)
  }

  /// First-wins over the plugins; a literal specifier that no plugin
  /// claims falls back to regular id resolution.
  pub async fn resolve_dynamic_import(
    &self,
    expression: &str,
    literal_specifier: Option<&str>,
    importer: &str,
  ) -> anyhow::Result<Option<HookResolveDynamicImportOutput>> {
    for (plugin, ctx) in &self.plugins {
      if let Some(resolved) = plugin.resolve_dynamic_import(ctx, expression, importer).await? {
        return Ok(Some(resolved));
      }
    }
    if let Some(specifier) = literal_specifier {
      return Ok(self.resolve_id(specifier, Some(importer)).await?.map(|resolved| {
        match resolved {
          HookResolveIdOutput::External => HookResolveDynamicImportOutput::Resolved {
            id: ArcStr::from(specifier),
            external: true,
          },
          HookResolveIdOutput::Id(id) => HookResolveDynamicImportOutput::Id(id),
          HookResolveIdOutput::Resolved { id, external } => {
            HookResolveDynamicImportOutput::Resolved { id, external }
          }
        }
      }));
    }
    Ok(None)
  }

  /// Sequential best-effort notification of every plugin.
  pub async fn watch_change(&self, id: &str) {
    for (plugin, ctx) in &self.plugins {
      if let Err(error) = plugin.watch_change(ctx, id).await {
        tracing::debug!(plugin = %plugin.name(), id, "watch_change hook failed: {error}");
      }
    }
  }
}
