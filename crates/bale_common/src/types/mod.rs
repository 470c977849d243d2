pub mod dynamic_import;
pub mod entry_point;
pub mod import_record;
pub mod module_id;
pub mod module_info;
pub mod named_import;
pub mod output_chunk;
pub mod resolved_id;
pub mod scanned_module;
pub mod stmt_info;
pub mod symbol_ref;

use crate::types::module_id::ModuleId;

oxc_index::define_index_type! {
  /// Slot of a module inside the graph arena. Stable for the lifetime of
  /// the graph; cross-module references are expressed with this instead of
  /// owning pointers.
  pub struct ModuleIdx = u32;
}

oxc_index::define_index_type! {
  pub struct ImportRecordIdx = u32;
}

oxc_index::define_index_type! {
  pub struct StmtInfoIdx = u32;
}

oxc_index::define_index_type! {
  pub struct SymbolIdx = u32;
  DEFAULT = SymbolIdx::from_raw_unchecked(0);
}

oxc_index::define_index_type! {
  pub struct ChunkIdx = u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
  Import,
  DynamicImport,
}

impl ImportKind {
  pub fn is_static(self) -> bool {
    matches!(self, Self::Import)
  }
}

/// Reverse edge recorded while fetching: who imported a module, and how.
#[derive(Debug, Clone)]
pub struct ImporterRecord {
  pub kind: ImportKind,
  pub importer_path: ModuleId,
}
