use std::{
  io,
  path::{Path, PathBuf},
  sync::Mutex,
};

use rustc_hash::FxHashMap;

use crate::FileSystem;

/// An in-memory tree keyed by normalized slash paths. Used by the test
/// suites so builds never touch the real disk.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
  files: Mutex<FxHashMap<PathBuf, String>>,
}

impl MemoryFileSystem {
  pub fn new(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<String>)>) -> Self {
    Self {
      files: Mutex::new(files.into_iter().map(|(path, src)| (path.into(), src.into())).collect()),
    }
  }

  pub fn add_file(&self, path: impl Into<PathBuf>, source: impl Into<String>) {
    self.files.lock().unwrap().insert(path.into(), source.into());
  }
}

impl FileSystem for MemoryFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    self.read_to_string(path).map(String::into_bytes)
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    self.files.lock().unwrap().get(path).cloned().ok_or_else(|| {
      io::Error::new(io::ErrorKind::NotFound, format!("No such file: {}", path.display()))
    })
  }

  fn exists(&self, path: &Path) -> bool {
    self.files.lock().unwrap().contains_key(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn read_back_what_was_added() {
    let fs = MemoryFileSystem::default();
    fs.add_file("/src/main.js", "export const answer = 42;");

    assert!(fs.exists(Path::new("/src/main.js")));
    assert_eq!(fs.read_to_string(Path::new("/src/main.js")).unwrap(), "export const answer = 42;");
    assert!(fs.read_to_string(Path::new("/src/other.js")).is_err());
  }
}
