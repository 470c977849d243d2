use std::sync::Arc;

use rustc_hash::FxHashSet;

/// The user's `external` option: nothing, a list of ids, or a predicate
/// `(source, importer, is_resolved) -> bool`.
#[derive(Clone, Default)]
pub enum IsExternal {
  #[default]
  Disabled,
  List(FxHashSet<String>),
  Fn(Arc<dyn Fn(&str, Option<&str>, bool) -> bool + Send + Sync>),
}

impl IsExternal {
  pub fn from_list(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self::List(ids.into_iter().map(Into::into).collect())
  }

  pub fn call(&self, source: &str, importer: Option<&str>, is_resolved: bool) -> bool {
    match self {
      Self::Disabled => false,
      Self::List(ids) => ids.contains(source),
      Self::Fn(predicate) => predicate(source, importer, is_resolved),
    }
  }
}

impl std::fmt::Debug for IsExternal {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Disabled => f.write_str("IsExternal::Disabled"),
      Self::List(ids) => f.debug_tuple("IsExternal::List").field(ids).finish(),
      Self::Fn(_) => f.write_str("IsExternal::Fn(..)"),
    }
  }
}
