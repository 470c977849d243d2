use std::fmt::Debug;

use arcstr::ArcStr;

use crate::{ImportKind, ModuleIdx};

/// Record as produced by the scanner; `state` is the byte offset of the
/// statement that owns it.
pub type RawImportRecord = ImportRecord<u32>;
/// Record after the loader resolved it; `state` is the importee's slot.
pub type ResolvedImportRecord = ImportRecord<ModuleIdx>;

bitflags::bitflags! {
  #[derive(Debug, Clone, Copy)]
  pub struct ImportRecordMeta: u8 {
    /// `import {} from '...'` or bare `import '...'`
    const IS_PLAIN_IMPORT = 1;
    /// `export * from '...'`
    const IS_EXPORT_STAR = 1 << 1;
  }
}

#[derive(Debug, Clone)]
pub struct ImportRecord<State: Debug> {
  pub state: State,
  /// `./lib.js` in `import { foo } from './lib.js';`
  pub specifier: ArcStr,
  pub kind: ImportKind,
  pub meta: ImportRecordMeta,
}

impl RawImportRecord {
  pub fn new(specifier: ArcStr, kind: ImportKind, start: u32) -> Self {
    Self { specifier, kind, meta: ImportRecordMeta::empty(), state: start }
  }

  pub fn with_meta(mut self, meta: ImportRecordMeta) -> Self {
    self.meta = meta;
    self
  }

  pub fn into_resolved(self, module_idx: ModuleIdx) -> ResolvedImportRecord {
    ResolvedImportRecord {
      state: module_idx,
      specifier: self.specifier,
      kind: self.kind,
      meta: self.meta,
    }
  }
}

impl ResolvedImportRecord {
  pub fn importee(&self) -> ModuleIdx {
    self.state
  }
}
