use arcstr::ArcStr;
use bale_utils::{entry_hash::EntryHash, indexmap::FxIndexMap};
use oxc_index::IndexVec;
use rustc_hash::FxHashMap;

use crate::{
  DynamicImportDesc, ImportRecordIdx, ImportRecordMeta, LocalExport, ModuleId, ModuleIdx,
  NamedImport, ReExport, ResolvedId, ResolvedImportRecord, ScannedModule, StmtInfos, SymbolData,
  SymbolIdx, TransformAsset,
};

/// A parsed, loaded module. Created on first resolution of its id, mutated
/// through discovery, linking and marking, and owned by the graph until it
/// is dropped.
#[derive(Debug)]
pub struct NormalModule {
  pub idx: ModuleIdx,
  pub id: ModuleId,
  /// `id` relative to the cwd, stable across machines.
  pub stable_id: String,
  pub repr_name: String,
  pub exec_order: u32,

  pub is_user_defined_entry: bool,
  /// Reached from an entry during execution-order analysis.
  pub is_executed: bool,
  /// Any statement survived tree-shaking.
  pub is_included: bool,

  pub chunk_alias: Option<ArcStr>,
  pub entry_points_hash: EntryHash,

  /// Code as returned by `load`, before `transform` ran.
  pub original_code: ArcStr,
  /// Code after `transform`; what the scanner saw.
  pub source: ArcStr,
  pub custom_transform_cache: bool,
  pub transform_assets: Vec<TransformAsset>,
  /// JS `this` context for this module.
  pub context: String,

  /// Raw specifiers in source order.
  pub sources: Vec<ArcStr>,
  /// Populated for every entry in `sources` before linking begins.
  pub resolved_ids: FxHashMap<ArcStr, ResolvedId>,
  pub import_records: IndexVec<ImportRecordIdx, ResolvedImportRecord>,
  pub dynamic_imports: Vec<DynamicImportDesc>,

  pub symbols: IndexVec<SymbolIdx, SymbolData>,
  pub symbol_by_name: FxHashMap<ArcStr, SymbolIdx>,
  pub stmt_infos: StmtInfos,
  pub named_imports: FxHashMap<SymbolIdx, NamedImport>,
  pub named_exports: FxIndexMap<ArcStr, LocalExport>,
  pub reexports: FxIndexMap<ArcStr, ReExport>,
  /// Full export surface including `export *` sources, mapping each name
  /// to the id of the module that originally declares it.
  pub exports_all: FxIndexMap<ArcStr, ArcStr>,
  pub namespace_ref: SymbolIdx,
  pub has_top_level_await: bool,

  pub importers: Vec<ModuleId>,
  pub dynamic_importers: Vec<ModuleId>,
}

impl NormalModule {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    idx: ModuleIdx,
    id: ModuleId,
    stable_id: String,
    repr_name: String,
    is_user_defined_entry: bool,
    original_code: ArcStr,
    source: ArcStr,
    context: String,
    scanned: ScannedModule,
  ) -> Self {
    let ScannedModule {
      symbols,
      symbol_by_name,
      stmt_infos,
      named_imports,
      named_exports,
      reexports,
      import_records,
      dynamic_imports,
      namespace_ref,
      has_top_level_await,
    } = scanned;

    Self {
      idx,
      id,
      stable_id,
      repr_name,
      exec_order: u32::MAX,
      is_user_defined_entry,
      is_executed: false,
      is_included: false,
      chunk_alias: None,
      entry_points_hash: EntryHash::default(),
      original_code,
      source,
      custom_transform_cache: false,
      transform_assets: Vec::new(),
      context,
      sources: import_records.iter().map(|record| record.specifier.clone()).collect(),
      resolved_ids: FxHashMap::default(),
      // Replaced with resolved records once the loader finishes this
      // module's dependencies.
      import_records: IndexVec::default(),
      dynamic_imports,
      symbols,
      symbol_by_name,
      stmt_infos,
      named_imports,
      named_exports,
      reexports,
      exports_all: FxIndexMap::default(),
      namespace_ref,
      has_top_level_await,
      importers: Vec::new(),
      dynamic_importers: Vec::new(),
    }
  }

  pub fn symbol_name(&self, symbol: SymbolIdx) -> &ArcStr {
    &self.symbols[symbol].name
  }

  pub fn star_export_record_ids(&self) -> impl Iterator<Item = ImportRecordIdx> + '_ {
    self
      .import_records
      .iter_enumerated()
      .filter(|(_, record)| record.meta.contains(ImportRecordMeta::IS_EXPORT_STAR))
      .map(|(idx, _)| idx)
  }

  pub fn star_export_module_ids(&self) -> impl Iterator<Item = ModuleIdx> + '_ {
    self.star_export_record_ids().map(|idx| self.import_records[idx].importee())
  }

  pub fn has_star_export(&self) -> bool {
    self.star_export_record_ids().next().is_some()
  }

  /// Names this module exports directly (local exports and reexports,
  /// without `export *` expansion).
  pub fn own_export_names(&self) -> impl Iterator<Item = &ArcStr> {
    self.named_exports.keys().chain(self.reexports.keys())
  }
}
