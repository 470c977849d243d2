use std::path::Path;

use arcstr::ArcStr;
use sugar_path::SugarPath;

/// The unique string identifier of a module, as produced by id resolution.
/// Used to key the graph's module arena and to report diagnostics.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct ModuleId(ArcStr);

impl ModuleId {
  pub fn new(value: impl Into<ArcStr>) -> Self {
    Self(value.into())
  }

  /// A form of the id that is stable across machines: absolute paths are
  /// rewritten relative to `cwd` with forward slashes.
  pub fn stabilize(&self, cwd: &Path) -> String {
    if self.as_path().is_absolute() {
      self.relative(cwd).as_path().to_slash_lossy().into_owned()
    } else {
      self.to_string()
    }
  }

  pub fn inner(&self) -> &ArcStr {
    &self.0
  }
}

impl std::ops::Deref for ModuleId {
  type Target = str;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl AsRef<str> for ModuleId {
  fn as_ref(&self) -> &str {
    self
  }
}

impl std::fmt::Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

impl From<ArcStr> for ModuleId {
  fn from(value: ArcStr) -> Self {
    Self::new(value)
  }
}

impl From<&str> for ModuleId {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}
