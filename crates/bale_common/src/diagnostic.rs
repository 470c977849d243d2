use std::fmt;

/// Warning codes surfaced through `on_warn`. Warnings never abort a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
  CircularDependency,
  NonExistentExport,
  NamespaceConflict,
  UnresolvedImport,
}

impl WarningCode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::CircularDependency => "CIRCULAR_DEPENDENCY",
      Self::NonExistentExport => "NON_EXISTENT_EXPORT",
      Self::NamespaceConflict => "NAMESPACE_CONFLICT",
      Self::UnresolvedImport => "UNRESOLVED_IMPORT",
    }
  }
}

/// Structured warning payload. The rendered form is
/// `(plugin) file (line:column) message`, with absent parts omitted; the
/// default handler deduplicates by that rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
  pub code: WarningCode,
  pub message: String,
  pub plugin: Option<String>,
  /// Module id the warning points at.
  pub id: Option<String>,
  /// 1-based line and column, when known.
  pub loc: Option<(u32, u32)>,
}

impl Warning {
  pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
    Self { code, message: message.into(), plugin: None, id: None, loc: None }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
    self.plugin = Some(plugin.into());
    self
  }

  pub fn with_loc(mut self, line: u32, column: u32) -> Self {
    self.loc = Some((line, column));
    self
  }
}

impl fmt::Display for Warning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(plugin) = &self.plugin {
      write!(f, "({plugin}) ")?;
    }
    if let Some(id) = &self.id {
      write!(f, "{id} ")?;
      if let Some((line, column)) = self.loc {
        write!(f, "({line}:{column}) ")?;
      }
    }
    f.write_str(&self.message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renders_all_parts() {
    let warning = Warning::new(WarningCode::NonExistentExport, "'foo' is not exported")
      .with_id("/src/b.js")
      .with_plugin("resolver")
      .with_loc(3, 14);
    assert_eq!(warning.to_string(), "(resolver) /src/b.js (3:14) 'foo' is not exported");
  }

  #[test]
  fn renders_bare_message() {
    let warning = Warning::new(WarningCode::CircularDependency, "Circular dependency: a -> a");
    assert_eq!(warning.to_string(), "Circular dependency: a -> a");
  }
}
