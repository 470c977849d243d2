use arcstr::ArcStr;
use oxc_index::IndexVec;
use rustc_hash::FxHashMap;

use crate::{ImportRecordIdx, StmtInfoIdx, SymbolIdx, SymbolRef};

/// One top-level statement as the tree-shaker sees it.
#[derive(Debug, Clone, Default)]
pub struct StmtInfo {
  /// Byte offset in the module source, for diagnostics.
  pub start: u32,
  /// Top-level bindings this statement declares.
  pub declared_symbols: Vec<SymbolIdx>,
  /// Identifiers referenced by this statement, as written. Resolved into
  /// `referenced_symbols` by the bind pass.
  pub referenced_names: Vec<ArcStr>,
  /// Filled during `bind_references`.
  pub referenced_symbols: Vec<SymbolRef>,
  /// Import/export-from statements carry the record they own.
  pub import_record: Option<ImportRecordIdx>,
  pub side_effect: bool,
  pub is_included: bool,
}

/// Statement arena of one module, with a reverse index from symbol to the
/// statements that declare it.
#[derive(Debug, Clone, Default)]
pub struct StmtInfos {
  infos: IndexVec<StmtInfoIdx, StmtInfo>,
  declared_stmts_by_symbol: FxHashMap<SymbolIdx, Vec<StmtInfoIdx>>,
}

impl StmtInfos {
  pub fn add_stmt_info(&mut self, info: StmtInfo) -> StmtInfoIdx {
    let declared = info.declared_symbols.clone();
    let idx = self.infos.push(info);
    for symbol in declared {
      self.declared_stmts_by_symbol.entry(symbol).or_default().push(idx);
    }
    idx
  }

  pub fn declared_stmts_by_symbol(&self, symbol: SymbolIdx) -> &[StmtInfoIdx] {
    self.declared_stmts_by_symbol.get(&symbol).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn get(&self, idx: StmtInfoIdx) -> &StmtInfo {
    &self.infos[idx]
  }

  pub fn get_mut(&mut self, idx: StmtInfoIdx) -> &mut StmtInfo {
    &mut self.infos[idx]
  }

  pub fn iter(&self) -> impl Iterator<Item = &StmtInfo> {
    self.infos.iter()
  }

  pub fn iter_enumerated(&self) -> impl Iterator<Item = (StmtInfoIdx, &StmtInfo)> {
    self.infos.iter_enumerated()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StmtInfo> {
    self.infos.iter_mut()
  }

  pub fn len(&self) -> usize {
    self.infos.len()
  }

  pub fn is_empty(&self) -> bool {
    self.infos.is_empty()
  }
}
