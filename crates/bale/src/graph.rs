use std::sync::{Arc, Mutex};

use arcstr::ArcStr;
use bale_common::{
  BuildCache, BuildOutput, CachedModule, CacheSetting, GraphOptions, Module, ModuleInfo,
  OutputChunk, PluginCache, RawImportRecord, ScannedModule, SharedPlugin, TransformAsset, Warning,
};
use bale_error::{BuildDiagnostic, BuildResult};
use bale_utils::indexmap::FxIndexMap;
use oxc_index::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
  generate_stage::{ChunkGraph, GenerateStage},
  link_stage::{LinkStage, LinkStageOutput},
  module_loader::ModuleLoader,
  plugin_driver::PluginDriver,
  types::{SharedFs, SharedOptions},
  utils::normalize_options::{normalize_options, NormalizeOptionsReturn},
};

/// Owns the module arena, the plugin driver and the caches, and runs the
/// four build phases: discovery, linking, marking and chunk generation.
///
/// A graph is single-use: `build` consumes it, so a second build needs a
/// new graph.
pub struct Graph {
  options: SharedOptions,
  fs: SharedFs,
  plugin_driver: Arc<PluginDriver>,
  module_cache: Arc<BuildCache>,
  plugin_cache: Arc<Mutex<PluginCache>>,
  cache_enabled: bool,
  finished: bool,
}

impl Graph {
  pub fn new(options: GraphOptions, plugins: Vec<SharedPlugin>, fs: SharedFs) -> BuildResult<Self> {
    let NormalizeOptionsReturn { options, cache } = normalize_options(options);

    if options.input.is_empty() {
      return Err(
        BuildDiagnostic::InvalidOptions { reason: "you must supply options.input".to_string() }
          .into(),
      );
    }

    let (module_cache, plugin_cache, cache_enabled) = match cache {
      CacheSetting::Cold => (BuildCache::default(), PluginCache::default(), true),
      CacheSetting::Warm(previous) => {
        let BuildCache { modules, plugins } = previous;
        (BuildCache { modules, plugins: PluginCache::default() }, plugins, true)
      }
      CacheSetting::Disabled => (BuildCache::default(), PluginCache::default(), false),
    };

    let options: SharedOptions = Arc::new(options);
    let plugin_cache = Arc::new(Mutex::new(plugin_cache));
    let plugin_driver = Arc::new(PluginDriver::new(
      plugins,
      Arc::clone(&plugin_cache),
      Arc::clone(&fs),
      options.cwd.clone(),
    ));

    Ok(Self {
      options,
      fs,
      plugin_driver,
      module_cache: Arc::new(module_cache),
      plugin_cache,
      cache_enabled,
      finished: false,
    })
  }

  /// Forwards a file-change notification to every plugin's `watch_change`
  /// hook.
  pub async fn on_change(&self, id: &str) {
    self.plugin_driver.watch_change(id).await;
  }

  pub async fn build(
    mut self,
    manual_chunks: Option<FxIndexMap<String, Vec<String>>>,
  ) -> BuildResult<BuildOutput> {
    assert!(!self.finished, "a graph is single-use; create a new graph for a new build");
    self.finished = true;

    // Phase 1: discovery.
    tracing::debug!(entries = self.options.input.len(), "build started");
    let mut loader = ModuleLoader::new(
      Arc::clone(&self.fs),
      Arc::clone(&self.options),
      Arc::clone(&self.plugin_driver),
      Arc::clone(&self.module_cache),
    );
    loader.add_entry_modules(&self.options.input).await;
    if let Some(manual_chunks) = &manual_chunks {
      loader.add_manual_chunks(manual_chunks).await;
    }
    let scan_output = loader.drive().await?;
    let manual_chunk_modules = scan_output.manual_chunk_modules.clone();

    // Phases 2 and 3: linking and marking.
    let mut link_output = LinkStage::new(scan_output, &self.options).link();

    // Phase 4: chunk generation.
    let chunk_graph =
      GenerateStage::new(&mut link_output, &self.options, &manual_chunk_modules).generate()?;

    let chunks = emit_output_chunks(&chunk_graph, &link_output);
    let module_infos = emit_module_infos(&link_output);
    let assets = collect_transform_assets(&link_output);
    let warnings = self.finalize_warnings(std::mem::take(&mut link_output.warnings));
    let cache = self.build_cache(&link_output);

    Ok(BuildOutput { chunks, module_infos, warnings, assets, cache })
  }

  /// Default handling deduplicates warnings by their rendered form; a
  /// user-supplied `on_warn` sees every warning and owns the reporting.
  fn finalize_warnings(&self, warnings: Vec<Warning>) -> Vec<Warning> {
    if let Some(on_warn) = &self.options.on_warn {
      for warning in &warnings {
        on_warn(warning);
      }
      return Vec::new();
    }
    let mut seen = FxHashSet::default();
    warnings.into_iter().filter(|warning| seen.insert(warning.to_string())).collect()
  }

  fn build_cache(&self, link_output: &LinkStageOutput) -> BuildCache {
    if !self.cache_enabled {
      return BuildCache::default();
    }
    let modules = link_output
      .modules
      .iter()
      .filter_map(Module::as_normal)
      .map(|module| CachedModule {
        id: module.id.inner().clone(),
        original_code: module.original_code.clone(),
        code: module.source.clone(),
        scanned: rebuild_scanned_module(module),
        transform_assets: module.transform_assets.clone(),
        custom_transform_cache: module.custom_transform_cache,
      })
      .collect();

    let mut plugins = {
      let mut guard = self.plugin_cache.lock().unwrap();
      std::mem::take(&mut *guard)
    };
    plugins.expire(self.options.cache_expiry);

    BuildCache { modules, plugins }
  }
}

/// Reassembles the scanner's view of a module from the linked arena so a
/// later build can reuse it without transforming again. Link-stage
/// artifacts (resolved references, inclusion flags, dynamic resolutions)
/// are scrubbed; the next build recomputes them.
fn rebuild_scanned_module(module: &bale_common::NormalModule) -> ScannedModule {
  let mut record_starts: FxHashMap<usize, u32> = FxHashMap::default();
  let mut stmt_infos = bale_common::StmtInfos::default();
  for (_, stmt) in module.stmt_infos.iter_enumerated() {
    if let Some(record_idx) = stmt.import_record {
      record_starts.insert(record_idx.index(), stmt.start);
    }
    let mut stmt = stmt.clone();
    stmt.referenced_symbols = Vec::new();
    stmt.is_included = false;
    stmt_infos.add_stmt_info(stmt);
  }

  let import_records = module
    .import_records
    .iter_enumerated()
    .map(|(record_idx, record)| RawImportRecord {
      state: record_starts.get(&record_idx.index()).copied().unwrap_or(0),
      specifier: record.specifier.clone(),
      kind: record.kind,
      meta: record.meta,
    })
    .collect::<IndexVec<_, _>>();

  let dynamic_imports = module
    .dynamic_imports
    .iter()
    .map(|dynamic| bale_common::DynamicImportDesc {
      expression: dynamic.expression.clone(),
      specifier: dynamic.specifier.clone(),
      stmt_idx: dynamic.stmt_idx,
      resolution: Default::default(),
    })
    .collect();

  ScannedModule {
    symbols: module.symbols.clone(),
    symbol_by_name: module.symbol_by_name.clone(),
    stmt_infos,
    named_imports: module.named_imports.clone(),
    named_exports: module.named_exports.clone(),
    reexports: module.reexports.clone(),
    import_records,
    dynamic_imports,
    namespace_ref: module.namespace_ref,
    has_top_level_await: module.has_top_level_await,
  }
}

/// Modules land in the arena in the order their fetches were issued, which
/// depends on task scheduling; the listing is sorted into execution order
/// so identical inputs report identically.
fn emit_module_infos(link_output: &LinkStageOutput) -> Vec<ModuleInfo> {
  let mut infos = link_output
    .modules
    .iter()
    .map(|module| match module {
      Module::Normal(module) => {
        let mut imported_ids = Vec::new();
        let mut dynamically_imported_ids = Vec::new();
        for record in module.import_records.iter() {
          imported_ids.push(ArcStr::from(link_output.modules[record.importee()].id()));
        }
        for dynamic in &module.dynamic_imports {
          if let Some(importee) = dynamic.resolution.importee() {
            dynamically_imported_ids.push(ArcStr::from(link_output.modules[importee].id()));
          }
        }
        let mut importers: Vec<ArcStr> =
          module.importers.iter().map(|id| id.inner().clone()).collect();
        importers.sort_unstable();
        let mut dynamic_importers: Vec<ArcStr> =
          module.dynamic_importers.iter().map(|id| id.inner().clone()).collect();
        dynamic_importers.sort_unstable();
        ModuleInfo {
          id: module.id.inner().clone(),
          is_entry: module.is_user_defined_entry,
          is_external: false,
          exports_namespace: false,
          is_included: module.is_included,
          importers,
          dynamic_importers,
          imported_ids,
          dynamically_imported_ids,
        }
      }
      Module::External(module) => ModuleInfo {
        id: module.name.clone(),
        is_entry: false,
        is_external: true,
        exports_namespace: module.exports_namespace,
        is_included: false,
        importers: Vec::new(),
        dynamic_importers: Vec::new(),
        imported_ids: Vec::new(),
        dynamically_imported_ids: Vec::new(),
      },
    })
    .collect::<Vec<_>>();

  let exec_orders: FxHashMap<ArcStr, u32> = link_output
    .modules
    .iter()
    .map(|module| (ArcStr::from(module.id()), module.exec_order()))
    .collect();
  infos.sort_by(|a, b| {
    (exec_orders[&a.id], &a.id).cmp(&(exec_orders[&b.id], &b.id))
  });
  infos
}

fn collect_transform_assets(link_output: &LinkStageOutput) -> Vec<TransformAsset> {
  let mut assets = Vec::new();
  for module in link_output.modules.iter().filter_map(Module::as_normal) {
    assets.extend(module.transform_assets.iter().cloned());
  }
  assets
}

/// Renders the chunk graph into its structural output listing. Chunk
/// names are uniqued in table order, facades included.
fn emit_output_chunks(chunk_graph: &ChunkGraph, link_output: &LinkStageOutput) -> Vec<OutputChunk> {
  let mut used_names: FxHashSet<ArcStr> = FxHashSet::default();
  let mut final_names: Vec<Option<ArcStr>> = Vec::with_capacity(chunk_graph.chunk_table.len());

  for chunk in chunk_graph.chunk_table.iter() {
    if !chunk.is_alive() {
      final_names.push(None);
      continue;
    }
    let base: ArcStr = chunk
      .name
      .clone()
      .or_else(|| {
        chunk.facade_module.and_then(|facade| {
          link_output.modules[facade]
            .as_normal()
            .map(|module| ArcStr::from(module.repr_name.as_str()))
        })
      })
      .unwrap_or_else(|| ArcStr::from("chunk"));
    let mut candidate = base.clone();
    let mut suffix = 1u32;
    while !used_names.insert(candidate.clone()) {
      suffix += 1;
      candidate = ArcStr::from(format!("{base}-{suffix}"));
    }
    final_names.push(Some(candidate));
  }

  chunk_graph
    .chunk_table
    .iter_enumerated()
    .filter_map(|(chunk_idx, chunk)| {
      let name = final_names[chunk_idx.index()].clone()?;

      let module_ids = chunk
        .modules
        .iter()
        .map(|&module_idx| ArcStr::from(link_output.modules[module_idx].id()))
        .collect::<Vec<_>>();

      let exports: Vec<ArcStr> = if chunk.is_entry() || chunk.is_facade {
        chunk.entry_exports.iter().map(|(export_name, _)| export_name.clone()).collect()
      } else {
        let mut exports =
          chunk.exports_to_other_chunks.values().cloned().collect::<Vec<_>>();
        exports.sort_unstable();
        exports
      };

      let mut imports: Vec<ArcStr> = chunk
        .imports_from_other_chunks
        .iter()
        .filter_map(|(importee, _)| final_names[importee.index()].clone())
        .collect();
      imports.extend(
        chunk
          .imports_from_external_modules
          .iter()
          .map(|(external_idx, _)| ArcStr::from(link_output.modules[*external_idx].id())),
      );
      // A facade imports everything it re-exports from the content chunks.
      if chunk.is_facade {
        let mut facade_sources = chunk
          .entry_exports
          .iter()
          .filter_map(|(_, symbol_ref)| {
            let owner_chunk = chunk_graph.module_to_chunk[symbol_ref.owner]?;
            final_names[owner_chunk.index()].clone()
          })
          .collect::<Vec<_>>();
        facade_sources.sort_unstable();
        facade_sources.dedup();
        imports.extend(facade_sources);
      }

      Some(OutputChunk {
        name,
        module_ids,
        is_entry: chunk.is_entry(),
        is_manual: chunk.is_manual,
        facade_module_id: chunk
          .is_facade
          .then(|| {
            chunk.facade_module.map(|facade| ArcStr::from(link_output.modules[facade].id()))
          })
          .flatten(),
        exports,
        imports,
      })
    })
    .collect()
}
