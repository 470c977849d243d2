use arcstr::ArcStr;
use bale_utils::indexmap::FxIndexMap;
use oxc_index::IndexVec;
use rustc_hash::FxHashMap;

use crate::{
  DynamicImportDesc, ImportRecordIdx, LocalExport, NamedImport, RawImportRecord, ReExport,
  StmtInfos, SymbolData, SymbolIdx,
};

/// Everything the scanner extracts from one module's source: the statement
/// arena, the symbol table and the import/export surface. Plugins may hand
/// a pre-scanned module to the loader instead of source text, and cached
/// modules store one of these verbatim.
#[derive(Debug, Clone, Default)]
pub struct ScannedModule {
  pub symbols: IndexVec<SymbolIdx, SymbolData>,
  pub symbol_by_name: FxHashMap<ArcStr, SymbolIdx>,
  pub stmt_infos: StmtInfos,
  pub named_imports: FxHashMap<SymbolIdx, NamedImport>,
  pub named_exports: FxIndexMap<ArcStr, LocalExport>,
  pub reexports: FxIndexMap<ArcStr, ReExport>,
  /// Static records in source order; the specifiers here are the module's
  /// `sources` list.
  pub import_records: IndexVec<ImportRecordIdx, RawImportRecord>,
  pub dynamic_imports: Vec<DynamicImportDesc>,
  /// Synthetic symbol standing for the module namespace object.
  pub namespace_ref: SymbolIdx,
  pub has_top_level_await: bool,
}

impl ScannedModule {
  pub fn sources(&self) -> impl Iterator<Item = &ArcStr> {
    self.import_records.iter().map(|record| &record.specifier)
  }
}
