use arcstr::ArcStr;
use bale_utils::indexmap::FxIndexSet;
use oxc_index::IndexVec;

use crate::{ImportRecordIdx, ModuleIdx, ResolvedImportRecord};

/// A module whose contents are never loaded; every reference to it renders
/// as an import statement in the output.
#[derive(Debug)]
pub struct ExternalModule {
  pub idx: ModuleIdx,
  pub name: ArcStr,
  pub exec_order: u32,
  /// Set when the module is the target of a dynamic import; its consumer
  /// receives the whole namespace.
  pub exports_namespace: bool,
  /// Names imported from this module by included code, in first-use order.
  pub used_names: FxIndexSet<ArcStr>,
  pub import_records: IndexVec<ImportRecordIdx, ResolvedImportRecord>,
}

impl ExternalModule {
  pub fn new(idx: ModuleIdx, name: ArcStr) -> Self {
    Self {
      idx,
      name,
      exec_order: u32::MAX,
      exports_namespace: false,
      used_names: FxIndexSet::default(),
      import_records: IndexVec::default(),
    }
  }

  pub fn is_used(&self) -> bool {
    self.exports_namespace || !self.used_names.is_empty()
  }
}
