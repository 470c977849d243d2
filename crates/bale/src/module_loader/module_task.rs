use std::{path::Path, sync::Arc};

use arcstr::ArcStr;
use bale_common::{
  HookResolveDynamicImportOutput, ImportRecordIdx, ModuleId, ModuleIdx, NormalModule, ResolvedId,
  ScannedModule, Warning,
};
use bale_error::{BuildDiagnostic, BuildResult};
use bale_utils::{ecmascript::legitimize_identifier_name, path_ext::PathExt};
use oxc_index::IndexVec;

use crate::{
  module_loader::{
    scanner::{scan_module, ScanOptions},
    ModuleLoaderMsg, ModuleTaskResult,
  },
  utils::resolve_id::resolve_dependency,
};

use super::task_context::TaskContext;

/// How one dynamic-import site resolved, as reported back to the loader.
#[derive(Debug)]
pub enum DynamicResolution {
  Unresolved,
  Resolved(ResolvedId),
  Replacement(ArcStr),
}

pub struct ModuleTaskOwner {
  importer_id: ArcStr,
}

impl ModuleTaskOwner {
  pub fn new(importer_id: ArcStr) -> Self {
    ModuleTaskOwner { importer_id }
  }
}

/// Loads, transforms and scans a single module, resolving its static and
/// dynamic dependencies before handing the result back over the channel.
pub struct ModuleTask {
  ctx: Arc<TaskContext>,
  idx: ModuleIdx,
  id: ArcStr,
  owner: Option<ModuleTaskOwner>,
  is_user_defined_entry: bool,
}

impl ModuleTask {
  pub fn new(
    ctx: Arc<TaskContext>,
    idx: ModuleIdx,
    id: ArcStr,
    owner: Option<ModuleTaskOwner>,
    is_user_defined_entry: bool,
  ) -> Self {
    Self { ctx, idx, id, owner, is_user_defined_entry }
  }

  pub async fn run(mut self) {
    let msg = match self.run_inner().await {
      Ok(result) => ModuleLoaderMsg::ModuleDone(Box::new(result)),
      Err(errs) => ModuleLoaderMsg::BuildErrors(errs.0),
    };
    // The loader dropping its receiver means the build already failed.
    let _ = self.ctx.tx.send(msg).await;
  }

  async fn run_inner(&mut self) -> BuildResult<ModuleTaskResult> {
    let mut warnings: Vec<Warning> = Vec::new();

    let (original_code, loaded_scan) = self.load_source().await?;

    let cached = self.ctx.cache.module(&self.id).filter(|cached| {
      cached.original_code == original_code && !cached.custom_transform_cache
    });

    let (source, scanned, transform_assets, custom_transform_cache) = match cached {
      Some(cached) => {
        tracing::debug!(id = %self.id, "reusing cached module, skipping transform");
        (cached.code.clone(), cached.scanned.clone(), cached.transform_assets.clone(), false)
      }
      None => self.transform_and_scan(&original_code, loaded_scan).await?,
    };

    let resolved_deps = self.resolve_static_dependencies(&scanned, &mut warnings).await?;
    let raw_import_records = scanned.import_records.clone();

    let id = ModuleId::new(self.id.clone());
    let stable_id = id.stabilize(&self.ctx.options.cwd);
    let repr_name =
      legitimize_identifier_name(&Path::new(self.id.as_str()).representative_file_name())
        .into_owned();
    let context = self.ctx.options.context_for(&self.id);

    let mut module = NormalModule::new(
      self.idx,
      id,
      stable_id,
      repr_name,
      self.is_user_defined_entry,
      original_code,
      source,
      context,
      scanned,
    );
    module.transform_assets = transform_assets;
    module.custom_transform_cache = custom_transform_cache;

    // Dynamic imports resolve after the static graph; their failures are
    // deliberately silent so a bad dynamic target can never abort a build.
    let dynamic_resolutions = self.resolve_dynamic_imports(&module).await;

    Ok(ModuleTaskResult {
      module_idx: self.idx,
      module,
      raw_import_records,
      resolved_deps,
      dynamic_resolutions,
      warnings,
    })
  }

  async fn load_source(&self) -> BuildResult<(ArcStr, Option<ScannedModule>)> {
    let loaded = self.ctx.plugin_driver.load(&self.id).await.map_err(|err| {
      BuildDiagnostic::Hook(anyhow::anyhow!(
        "Could not load {}{}: {err}",
        self.id,
        self
          .owner
          .as_ref()
          .map(|owner| format!(" (imported by {})", owner.importer_id))
          .unwrap_or_default(),
      ))
    })?;

    match loaded {
      Some(output) if output.code.is_some() || output.scanned.is_some() => {
        Ok((output.code.unwrap_or_default(), output.scanned))
      }
      _ => Err(BuildDiagnostic::BadLoader { id: self.id.to_string() }.into()),
    }
  }

  async fn transform_and_scan(
    &self,
    original_code: &ArcStr,
    loaded_scan: Option<ScannedModule>,
  ) -> BuildResult<(ArcStr, ScannedModule, Vec<bale_common::TransformAsset>, bool)> {
    let transformed = self
      .ctx
      .plugin_driver
      .transform(original_code, &self.id)
      .await
      .map_err(BuildDiagnostic::Hook)?;

    let (source, pre_scanned, assets, custom_cache) = match transformed {
      Some(output) => (
        output.code.unwrap_or_else(|| original_code.clone()),
        output.scanned,
        output.assets,
        output.uses_custom_cache,
      ),
      None => (original_code.clone(), None, Vec::new(), false),
    };

    let scanned = match pre_scanned.or(loaded_scan) {
      Some(scanned) => scanned,
      None => {
        let scan_options = ScanOptions {
          allow_top_level_await: self.ctx.options.experimental_top_level_await,
          annotations: self
            .ctx
            .options
            .treeshake
            .as_ref()
            .map_or(true, |treeshake| treeshake.annotations),
        };
        scan_module(&self.id, &source, &scan_options).map_err(|err| {
          BuildDiagnostic::ParseError {
            id: self.id.to_string(),
            reason: format!("{} (at position {})", err.reason, err.offset),
          }
        })?
      }
    };

    Ok((source, scanned, assets, custom_cache))
  }

  async fn resolve_static_dependencies(
    &self,
    scanned: &ScannedModule,
    warnings: &mut Vec<Warning>,
  ) -> BuildResult<IndexVec<ImportRecordIdx, ResolvedId>> {
    let mut resolved_deps = IndexVec::with_capacity(scanned.import_records.len());
    for record in scanned.import_records.iter() {
      let (resolved, warning) =
        resolve_dependency(&self.ctx.plugin_driver, &self.ctx.options, &record.specifier, &self.id)
          .await?;
      if let Some(warning) = warning {
        warnings.push(warning);
      }
      resolved_deps.push(resolved);
    }
    Ok(resolved_deps)
  }

  async fn resolve_dynamic_imports(&self, module: &NormalModule) -> Vec<DynamicResolution> {
    let mut resolutions = Vec::with_capacity(module.dynamic_imports.len());
    for dynamic_import in &module.dynamic_imports {
      let resolved = self
        .ctx
        .plugin_driver
        .resolve_dynamic_import(
          &dynamic_import.expression,
          dynamic_import.specifier.as_deref(),
          &self.id,
        )
        .await;

      let resolution = match resolved {
        Ok(Some(HookResolveDynamicImportOutput::Id(id))) => {
          let external = self.ctx.options.external.call(&id, Some(&self.id), true);
          DynamicResolution::Resolved(ResolvedId::new(id, external))
        }
        Ok(Some(HookResolveDynamicImportOutput::Resolved { id, external })) => {
          DynamicResolution::Resolved(ResolvedId::new(id, external))
        }
        Ok(Some(HookResolveDynamicImportOutput::Replacement(expression))) => {
          DynamicResolution::Replacement(expression)
        }
        Ok(None) => DynamicResolution::Unresolved,
        Err(error) => {
          // Swallowed on purpose; see the concurrency notes in the docs.
          tracing::debug!(
            importer = %self.id,
            expression = %dynamic_import.expression,
            "dynamic import resolution failed: {error}"
          );
          DynamicResolution::Unresolved
        }
      };
      resolutions.push(resolution);
    }
    resolutions
  }
}
