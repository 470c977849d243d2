use arcstr::ArcStr;

/// Outcome of resolving an import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
  pub id: ArcStr,
  pub is_external: bool,
}

impl ResolvedId {
  pub fn new(id: impl Into<ArcStr>, is_external: bool) -> Self {
    Self { id: id.into(), is_external }
  }

  pub fn external(id: impl Into<ArcStr>) -> Self {
    Self::new(id, true)
  }
}
