use arcstr::ArcStr;

use crate::{ModuleIdx, SymbolIdx};

/// A top-level binding of one module, addressed by arena slots so the
/// reference stays valid for the graph's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolRef {
  pub owner: ModuleIdx,
  pub symbol: SymbolIdx,
}

impl SymbolRef {
  pub fn new(owner: ModuleIdx, symbol: SymbolIdx) -> Self {
    Self { owner, symbol }
  }
}

impl From<(ModuleIdx, SymbolIdx)> for SymbolRef {
  fn from((owner, symbol): (ModuleIdx, SymbolIdx)) -> Self {
    Self { owner, symbol }
  }
}

#[derive(Debug, Clone)]
pub struct SymbolData {
  pub name: ArcStr,
}
