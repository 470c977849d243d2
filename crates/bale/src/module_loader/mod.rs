mod module_task;
pub mod scanner;
pub mod task_context;

use std::sync::Arc;

use arcstr::ArcStr;
use bale_common::{
  BuildCache, DynamicImportResolution, EntryPoint, EntryPointKind, ExternalModule,
  HookResolveIdOutput, ImportKind, ImportRecordIdx, ImporterRecord, IndexModules, InputItem,
  Module, ModuleIdx, NormalModule, RawImportRecord, ResolvedId, Warning, WarningCode,
};
use bale_error::{BuildDiagnostic, BuildResult};
use bale_utils::indexmap::FxIndexMap;
use module_task::{DynamicResolution, ModuleTask, ModuleTaskOwner};
use oxc_index::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};
use task_context::TaskContext;
use tokio::sync::mpsc::Receiver;

use crate::{
  plugin_driver::PluginDriver,
  types::{SharedFs, SharedOptions},
};

pub enum ModuleLoaderMsg {
  ModuleDone(Box<ModuleTaskResult>),
  BuildErrors(Vec<BuildDiagnostic>),
}

pub struct ModuleTaskResult {
  pub module_idx: ModuleIdx,
  pub module: NormalModule,
  pub raw_import_records: IndexVec<ImportRecordIdx, RawImportRecord>,
  pub resolved_deps: IndexVec<ImportRecordIdx, ResolvedId>,
  pub dynamic_resolutions: Vec<DynamicResolution>,
  pub warnings: Vec<Warning>,
}

/// Module arena while fetches are in flight. A slot is inserted *before*
/// its load starts, so re-entrant fetches of the same id (cycles included)
/// coalesce on the slot instead of issuing a second load.
struct IntermediateModules {
  modules: IndexVec<ModuleIdx, Option<Module>>,
  importers: IndexVec<ModuleIdx, Vec<ImporterRecord>>,
}

impl IntermediateModules {
  fn new() -> Self {
    Self { modules: IndexVec::new(), importers: IndexVec::new() }
  }

  fn alloc_module_idx(&mut self) -> ModuleIdx {
    self.importers.push(Vec::new());
    self.modules.push(None)
  }
}

/// Discovery phase: resolves the entries, fetches the module graph through
/// the plugin hooks and hands back a fully populated module arena.
///
/// `add_entry_modules` and `add_manual_chunks` may be called any number of
/// times before `drive`; all spawned fetches funnel into one channel, so
/// the single `drive().await` observes the completion of everything queued
/// before it.
pub struct ModuleLoader {
  options: SharedOptions,
  shared_context: Arc<TaskContext>,
  rx: Receiver<ModuleLoaderMsg>,
  remaining: u32,
  visited: FxHashMap<ArcStr, ModuleIdx>,
  inm: IntermediateModules,
  entry_points: Vec<EntryPoint>,
  user_defined_entry_ids: FxHashSet<ModuleIdx>,
  dynamic_import_entry_ids: FxHashSet<ModuleIdx>,
  manual_chunk_modules: FxIndexMap<ArcStr, Vec<ModuleIdx>>,
  errors: Vec<BuildDiagnostic>,
  warnings: Vec<Warning>,
}

pub struct ModuleLoaderOutput {
  pub modules: IndexModules,
  /// User entries in declaration order, then dynamic entries sorted by
  /// stable id.
  pub entry_points: Vec<EntryPoint>,
  pub manual_chunk_modules: FxIndexMap<ArcStr, Vec<ModuleIdx>>,
  pub warnings: Vec<Warning>,
}

impl ModuleLoader {
  pub fn new(
    fs: SharedFs,
    options: SharedOptions,
    plugin_driver: Arc<PluginDriver>,
    cache: Arc<BuildCache>,
  ) -> Self {
    let (tx, rx) = tokio::sync::mpsc::channel(1024);
    let shared_context =
      Arc::new(TaskContext { fs, options: options.clone(), plugin_driver, cache, tx });
    Self {
      options,
      shared_context,
      rx,
      remaining: 0,
      visited: FxHashMap::default(),
      inm: IntermediateModules::new(),
      entry_points: Vec::new(),
      user_defined_entry_ids: FxHashSet::default(),
      dynamic_import_entry_ids: FxHashSet::default(),
      manual_chunk_modules: FxIndexMap::default(),
      errors: Vec::new(),
      warnings: Vec::new(),
    }
  }

  pub async fn add_entry_modules(&mut self, items: &[InputItem]) {
    for item in items {
      let Some(resolved) = self.resolve_entry(&item.import).await else {
        continue;
      };
      if resolved.is_external {
        self.errors.push(BuildDiagnostic::EntryCannotBeExternal { id: item.import.clone() });
        continue;
      }
      let idx = self.try_spawn_new_task(resolved, None, true);
      if !self.user_defined_entry_ids.insert(idx) {
        self.errors.push(BuildDiagnostic::DuplicateEntryPoints {
          id: self.inm_id_of(idx).unwrap_or_else(|| item.import.clone()),
        });
        continue;
      }
      self.entry_points.push(EntryPoint {
        name: item.name.as_deref().map(ArcStr::from),
        id: idx,
        kind: EntryPointKind::UserDefined,
      });
    }
  }

  pub async fn add_manual_chunks(&mut self, chunks: &FxIndexMap<String, Vec<String>>) {
    for (alias, specifiers) in chunks {
      let mut module_ids = Vec::with_capacity(specifiers.len());
      for specifier in specifiers {
        let Some(resolved) = self.resolve_entry(specifier).await else {
          continue;
        };
        if resolved.is_external {
          self.errors.push(BuildDiagnostic::EntryCannotBeExternal { id: specifier.clone() });
          continue;
        }
        module_ids.push(self.try_spawn_new_task(resolved, None, false));
      }
      self
        .manual_chunk_modules
        .entry(ArcStr::from(alias.as_str()))
        .or_default()
        .extend(module_ids);
    }
  }

  async fn resolve_entry(&mut self, specifier: &str) -> Option<ResolvedId> {
    match self.shared_context.plugin_driver.resolve_id(specifier, None).await {
      Ok(Some(HookResolveIdOutput::External)) => Some(ResolvedId::external(specifier)),
      Ok(Some(HookResolveIdOutput::Id(id))) => Some(ResolvedId::new(id, false)),
      Ok(Some(HookResolveIdOutput::Resolved { id, external })) => {
        Some(ResolvedId::new(id, external))
      }
      Ok(None) => {
        self.errors.push(BuildDiagnostic::UnresolvedEntry { specifier: specifier.to_string() });
        None
      }
      Err(error) => {
        self.errors.push(BuildDiagnostic::Hook(error));
        None
      }
    }
  }

  fn inm_id_of(&self, idx: ModuleIdx) -> Option<String> {
    self
      .visited
      .iter()
      .find_map(|(id, &module_idx)| (module_idx == idx).then(|| id.to_string()))
  }

  /// Fetch coalescing: the `visited` map is consulted before anything else
  /// happens, and a fresh slot is allocated before the task is spawned, so
  /// a given id loads exactly once.
  fn try_spawn_new_task(
    &mut self,
    resolved_id: ResolvedId,
    owner: Option<ModuleTaskOwner>,
    is_user_defined_entry: bool,
  ) -> ModuleIdx {
    match self.visited.entry(resolved_id.id.clone()) {
      std::collections::hash_map::Entry::Occupied(visited) => {
        let idx = *visited.get();
        let slot_is_external = matches!(self.inm.modules[idx], Some(Module::External(_)));
        if resolved_id.is_external && !slot_is_external {
          self.errors.push(BuildDiagnostic::InvalidExternalId { id: resolved_id.id.to_string() });
        } else if !resolved_id.is_external && slot_is_external {
          self.errors.push(BuildDiagnostic::Hook(anyhow::anyhow!(
            "Cannot load {} as a module: it already exists in the graph as an external module",
            resolved_id.id,
          )));
        }
        idx
      }
      std::collections::hash_map::Entry::Vacant(not_visited) => {
        let idx = self.inm.alloc_module_idx();
        if resolved_id.is_external {
          self.inm.modules[idx] = Some(ExternalModule::new(idx, resolved_id.id.clone()).into());
        } else {
          self.remaining += 1;
          let task = ModuleTask::new(
            self.shared_context.clone(),
            idx,
            resolved_id.id.clone(),
            owner,
            is_user_defined_entry,
          );
          tokio::spawn(task.run());
        }
        *not_visited.insert(idx)
      }
    }
  }

  fn on_module_done(&mut self, result: ModuleTaskResult) {
    let ModuleTaskResult {
      module_idx,
      mut module,
      raw_import_records,
      resolved_deps,
      dynamic_resolutions,
      warnings,
    } = result;

    self.warnings.extend(warnings);

    let import_records = raw_import_records
      .into_iter()
      .zip(resolved_deps)
      .map(|(raw_record, resolved_id)| {
        module.resolved_ids.insert(raw_record.specifier.clone(), resolved_id.clone());
        let owner = ModuleTaskOwner::new(module.stable_id.as_str().into());
        let idx = self.try_spawn_new_task(resolved_id, Some(owner), false);
        self.inm.importers[idx]
          .push(ImporterRecord { kind: raw_record.kind, importer_path: module.id.clone() });
        raw_record.into_resolved(idx)
      })
      .collect::<IndexVec<ImportRecordIdx, _>>();
    module.import_records = import_records;

    for (site, resolution) in dynamic_resolutions.into_iter().enumerate() {
      match resolution {
        DynamicResolution::Unresolved => {}
        DynamicResolution::Replacement(expression) => {
          module.dynamic_imports[site].resolution =
            DynamicImportResolution::Replacement(expression);
        }
        DynamicResolution::Resolved(resolved_id) if resolved_id.is_external => {
          // The external module itself is registered under the external
          // id; the importer keeps its own slot.
          let idx = self.try_spawn_new_task(resolved_id, None, false);
          if let Some(Module::External(external)) = &mut self.inm.modules[idx] {
            external.exports_namespace = true;
          }
          self.inm.importers[idx].push(ImporterRecord {
            kind: ImportKind::DynamicImport,
            importer_path: module.id.clone(),
          });
          module.dynamic_imports[site].resolution = DynamicImportResolution::External(idx);
        }
        DynamicResolution::Resolved(resolved_id) => {
          let owner = ModuleTaskOwner::new(module.stable_id.as_str().into());
          let idx = self.try_spawn_new_task(resolved_id, Some(owner), false);
          self.inm.importers[idx].push(ImporterRecord {
            kind: ImportKind::DynamicImport,
            importer_path: module.id.clone(),
          });
          if !self.user_defined_entry_ids.contains(&idx) {
            self.dynamic_import_entry_ids.insert(idx);
          }
          module.dynamic_imports[site].resolution = DynamicImportResolution::Internal(idx);
        }
      }
    }

    self.inm.modules[module_idx] = Some(module.into());
    self.remaining -= 1;
  }

  /// Drains the channel until every queued fetch (and everything those
  /// fetches spawned) has finished.
  pub async fn drive(mut self) -> BuildResult<ModuleLoaderOutput> {
    while self.remaining > 0 {
      let Some(msg) = self.rx.recv().await else {
        break;
      };
      match msg {
        ModuleLoaderMsg::ModuleDone(result) => self.on_module_done(*result),
        ModuleLoaderMsg::BuildErrors(errors) => {
          self.errors.extend(errors);
          self.remaining -= 1;
        }
      }
    }

    if !self.errors.is_empty() {
      return Err(self.errors.into());
    }

    let mut modules: IndexModules = self
      .inm
      .modules
      .into_iter()
      .map(|module| module.expect("module tasks did not complete as expected"))
      .collect();

    for (idx, importer_records) in self.inm.importers.into_iter_enumerated() {
      if let Some(module) = modules[idx].as_normal_mut() {
        for importer in importer_records {
          if importer.kind.is_static() {
            module.importers.push(importer.importer_path);
          } else {
            module.dynamic_importers.push(importer.importer_path);
          }
        }
      }
    }

    for entry in &self.entry_points {
      if let Some(module) = modules[entry.id].as_normal_mut() {
        module.is_user_defined_entry = true;
      }
    }

    populate_exports_all(&mut modules, &mut self.warnings);

    if !self.options.inline_dynamic_imports {
      let mut dynamic_import_entry_ids =
        self.dynamic_import_entry_ids.into_iter().collect::<Vec<_>>();
      dynamic_import_entry_ids
        .sort_unstable_by(|a, b| modules[*a].stable_id().cmp(modules[*b].stable_id()));
      self.entry_points.extend(dynamic_import_entry_ids.into_iter().map(|id| EntryPoint {
        name: None,
        id,
        kind: EntryPointKind::DynamicImport,
      }));
    }

    Ok(ModuleLoaderOutput {
      modules,
      entry_points: self.entry_points,
      manual_chunk_modules: self.manual_chunk_modules,
      warnings: self.warnings,
    })
  }
}

/// Fills `exports_all` for every internal module by merging its own export
/// surface with each `export *` source's, in source order. A name arriving
/// from two distinct origins is reported once as a namespace conflict and
/// the first-seen binding wins.
fn populate_exports_all(modules: &mut IndexModules, warnings: &mut Vec<Warning>) {
  fn exports_all_of(
    idx: ModuleIdx,
    modules: &IndexModules,
    memo: &mut FxHashMap<ModuleIdx, FxIndexMap<ArcStr, ArcStr>>,
    visiting: &mut FxHashSet<ModuleIdx>,
    warnings: &mut Vec<Warning>,
  ) -> FxIndexMap<ArcStr, ArcStr> {
    if let Some(memoized) = memo.get(&idx) {
      return memoized.clone();
    }
    if !visiting.insert(idx) {
      // A star-export cycle contributes nothing new on re-entry.
      return FxIndexMap::default();
    }
    let Some(module) = modules[idx].as_normal() else {
      visiting.remove(&idx);
      return FxIndexMap::default();
    };

    let own_id: ArcStr = module.id.inner().clone();
    let mut result = FxIndexMap::default();
    for name in module.own_export_names() {
      result.insert(name.clone(), own_id.clone());
    }

    for star_source in module.star_export_module_ids().collect::<Vec<_>>() {
      let child = exports_all_of(star_source, modules, memo, visiting, warnings);
      for (name, origin) in child {
        if name == "default" {
          continue;
        }
        match result.get(&name) {
          Some(existing) if *existing != origin && *existing != own_id => {
            warnings.push(
              Warning::new(
                WarningCode::NamespaceConflict,
                format!(
                  "Conflicting namespaces: {} re-exports '{name}' from both {existing} and {origin} (will be ignored)",
                  module.id,
                ),
              )
              .with_id(module.id.to_string()),
            );
          }
          Some(_) => {}
          None => {
            result.insert(name, origin);
          }
        }
      }
    }

    visiting.remove(&idx);
    memo.insert(idx, result.clone());
    result
  }

  let mut memo = FxHashMap::default();
  let mut visiting = FxHashSet::default();
  let indices: Vec<ModuleIdx> =
    modules.iter_enumerated().filter(|(_, m)| m.is_normal()).map(|(idx, _)| idx).collect();
  for idx in &indices {
    exports_all_of(*idx, modules, &mut memo, &mut visiting, warnings);
  }
  for idx in indices {
    if let Some(module) = modules[idx].as_normal_mut() {
      module.exports_all = memo.remove(&idx).unwrap_or_default();
    }
  }
}
