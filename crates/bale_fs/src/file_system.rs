use std::{io, path::Path};

/// The file operations the module loader needs. The default `load` hook
/// goes through this trait, so builds can run against the real disk or an
/// in-memory tree.
pub trait FileSystem: Send + Sync {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn read_to_string(&self, path: &Path) -> io::Result<String>;

  fn exists(&self, path: &Path) -> bool;
}
