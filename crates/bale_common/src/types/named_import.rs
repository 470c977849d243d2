use arcstr::ArcStr;

use crate::{ImportRecordIdx, SymbolIdx};

/// What a binding imports from another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
  /// `import { name }` / `import name` (sugar for `{ default }`)
  Literal(ArcStr),
  /// `import * as ns`
  Star,
}

impl Specifier {
  pub fn literal(name: impl Into<ArcStr>) -> Self {
    Self::Literal(name.into())
  }
}

impl std::fmt::Display for Specifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Literal(name) => name.fmt(f),
      Self::Star => "*".fmt(f),
    }
  }
}

/// A local binding introduced by an import declaration.
#[derive(Debug, Clone)]
pub struct NamedImport {
  pub imported: Specifier,
  /// Binding name inside the importing module.
  pub imported_as: SymbolIdx,
  pub record_idx: ImportRecordIdx,
  /// Byte offset of the owning statement, for diagnostics.
  pub start: u32,
}

/// An export backed by a local declaration.
#[derive(Debug, Clone)]
pub struct LocalExport {
  pub referenced: SymbolIdx,
}

/// `export { a as b } from '...'` and `export * as ns from '...'`.
#[derive(Debug, Clone)]
pub struct ReExport {
  pub imported: Specifier,
  pub record_idx: ImportRecordIdx,
  pub start: u32,
}
