use arcstr::ArcStr;

use crate::{ModuleIdx, StmtInfoIdx};

/// One `import(...)` site.
#[derive(Debug, Clone)]
pub struct DynamicImportDesc {
  /// The argument text as written in the source.
  pub expression: ArcStr,
  /// The literal specifier, when the argument is a plain string literal.
  pub specifier: Option<ArcStr>,
  pub stmt_idx: StmtInfoIdx,
  pub resolution: DynamicImportResolution,
}

/// Resolution state of a dynamic-import site. `Unresolved` is legal; code
/// generation leaves such sites untouched.
#[derive(Debug, Clone, Default)]
pub enum DynamicImportResolution {
  #[default]
  Unresolved,
  External(ModuleIdx),
  Internal(ModuleIdx),
  /// A replacement expression supplied by `resolve_dynamic_import`.
  Replacement(ArcStr),
}

impl DynamicImportResolution {
  pub fn importee(&self) -> Option<ModuleIdx> {
    match self {
      Self::External(idx) | Self::Internal(idx) => Some(*idx),
      Self::Unresolved | Self::Replacement(_) => None,
    }
  }
}
