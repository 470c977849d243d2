use std::ops::{Deref, DerefMut};

/// A fatal build diagnostic. Every variant maps onto a stable,
/// user-visible code string so embedders can match on failures without
/// parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum BuildDiagnostic {
  #[error("Duplicate entry points detected: {id} is listed more than once")]
  DuplicateEntryPoints { id: String },

  #[error("Could not resolve entry module \"{specifier}\"")]
  UnresolvedEntry { specifier: String },

  #[error("Entry module cannot be external ({id})")]
  EntryCannotBeExternal { id: String },

  #[error("Could not resolve \"{specifier}\" from {importer}")]
  UnresolvedImport { specifier: String, importer: String },

  #[error("Error loading {id}: load hook returned no usable code")]
  BadLoader { id: String },

  #[error("{id} is imported as an external module, but is already an internal module of the graph")]
  InvalidExternalId { id: String },

  #[error("Invalid options: {reason}")]
  InvalidOptions { reason: String },

  #[error("Could not parse {id}: {reason}")]
  ParseError { id: String, reason: String },

  /// Errors surfaced by plugin hooks propagate as-is.
  #[error(transparent)]
  Hook(#[from] anyhow::Error),
}

impl BuildDiagnostic {
  pub fn code(&self) -> &'static str {
    match self {
      Self::DuplicateEntryPoints { .. } => "DUPLICATE_ENTRY_POINTS",
      Self::UnresolvedEntry { .. } => "UNRESOLVED_ENTRY",
      Self::EntryCannotBeExternal { .. } => "INVALID_EXTERNAL_ID",
      Self::UnresolvedImport { .. } => "UNRESOLVED_IMPORT",
      Self::BadLoader { .. } => "BAD_LOADER",
      Self::InvalidExternalId { .. } => "INVALID_EXTERNAL_ID",
      Self::InvalidOptions { .. } => "INVALID_OPTIONS",
      Self::ParseError { .. } => "PARSE_ERROR",
      Self::Hook(_) => "PLUGIN_ERROR",
    }
  }
}

/// Loads run concurrently, so a failed build can carry more than one
/// diagnostic.
#[derive(Debug)]
pub struct BuildError(pub Vec<BuildDiagnostic>);

impl BuildError {
  pub fn codes(&self) -> Vec<&'static str> {
    self.0.iter().map(BuildDiagnostic::code).collect()
  }
}

impl Deref for BuildError {
  type Target = Vec<BuildDiagnostic>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl DerefMut for BuildError {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.0
  }
}

impl std::fmt::Display for BuildError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for (index, diagnostic) in self.0.iter().enumerate() {
      if index > 0 {
        writeln!(f)?;
      }
      write!(f, "[{}] {diagnostic}", diagnostic.code())?;
    }
    Ok(())
  }
}

impl std::error::Error for BuildError {}

impl From<BuildDiagnostic> for BuildError {
  fn from(diagnostic: BuildDiagnostic) -> Self {
    Self(vec![diagnostic])
  }
}

impl From<Vec<BuildDiagnostic>> for BuildError {
  fn from(diagnostics: Vec<BuildDiagnostic>) -> Self {
    Self(diagnostics)
  }
}

impl From<anyhow::Error> for BuildError {
  fn from(error: anyhow::Error) -> Self {
    Self(vec![BuildDiagnostic::Hook(error)])
  }
}

pub type BuildResult<T> = anyhow::Result<T, BuildError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_are_stable() {
    let err = BuildError::from(vec![
      BuildDiagnostic::UnresolvedEntry { specifier: "./main.js".into() },
      BuildDiagnostic::BadLoader { id: "/a.js".into() },
      BuildDiagnostic::EntryCannotBeExternal { id: "lodash".into() },
    ]);
    assert_eq!(err.codes(), ["UNRESOLVED_ENTRY", "BAD_LOADER", "INVALID_EXTERNAL_ID"]);
  }

  #[test]
  fn display_includes_code_and_message() {
    let err = BuildError::from(BuildDiagnostic::InvalidExternalId { id: "lodash".into() });
    let rendered = err.to_string();
    assert!(rendered.contains("INVALID_EXTERNAL_ID"));
    assert!(rendered.contains("lodash"));
  }
}
