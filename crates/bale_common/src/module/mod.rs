pub mod external_module;
pub mod normal_module;

use oxc_index::IndexVec;

use crate::{
  ExternalModule, ImportRecordIdx, ModuleIdx, NormalModule, ResolvedImportRecord,
};

pub type IndexModules = IndexVec<ModuleIdx, Module>;

/// A graph node. A given id resolves to exactly one `Normal` or one
/// `External` module, never both.
#[derive(Debug)]
pub enum Module {
  Normal(Box<NormalModule>),
  External(Box<ExternalModule>),
}

impl Module {
  pub fn idx(&self) -> ModuleIdx {
    match self {
      Self::Normal(v) => v.idx,
      Self::External(v) => v.idx,
    }
  }

  pub fn exec_order(&self) -> u32 {
    match self {
      Self::Normal(v) => v.exec_order,
      Self::External(v) => v.exec_order,
    }
  }

  pub fn id(&self) -> &str {
    match self {
      Self::Normal(v) => &v.id,
      Self::External(v) => &v.name,
    }
  }

  pub fn stable_id(&self) -> &str {
    match self {
      Self::Normal(v) => &v.stable_id,
      Self::External(v) => &v.name,
    }
  }

  pub fn as_normal(&self) -> Option<&NormalModule> {
    match self {
      Self::Normal(v) => Some(v),
      Self::External(_) => None,
    }
  }

  pub fn as_normal_mut(&mut self) -> Option<&mut NormalModule> {
    match self {
      Self::Normal(v) => Some(v),
      Self::External(_) => None,
    }
  }

  pub fn as_external(&self) -> Option<&ExternalModule> {
    match self {
      Self::External(v) => Some(v),
      Self::Normal(_) => None,
    }
  }

  pub fn as_external_mut(&mut self) -> Option<&mut ExternalModule> {
    match self {
      Self::External(v) => Some(v),
      Self::Normal(_) => None,
    }
  }

  pub fn is_normal(&self) -> bool {
    matches!(self, Self::Normal(..))
  }

  pub fn is_external(&self) -> bool {
    matches!(self, Self::External(..))
  }

  pub fn import_records(&self) -> &IndexVec<ImportRecordIdx, ResolvedImportRecord> {
    match self {
      Self::Normal(v) => &v.import_records,
      Self::External(v) => &v.import_records,
    }
  }
}

impl From<NormalModule> for Module {
  fn from(module: NormalModule) -> Self {
    Self::Normal(Box::new(module))
  }
}

impl From<ExternalModule> for Module {
  fn from(module: ExternalModule) -> Self {
    Self::External(Box::new(module))
  }
}
