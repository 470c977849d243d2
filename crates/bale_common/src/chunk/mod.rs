use arcstr::ArcStr;
use bale_utils::{entry_hash::EntryHash, indexmap::FxIndexMap};

use crate::{ChunkIdx, ModuleIdx, SymbolRef};

/// How a chunk came to exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkKind {
  EntryPoint { module: ModuleIdx },
  #[default]
  Common,
}

/// A variable pulled in from another chunk.
#[derive(Debug, Clone)]
pub struct CrossChunkImportItem {
  pub import_ref: SymbolRef,
  pub export_name: ArcStr,
}

/// A set of modules emitted together as one output artifact.
#[derive(Debug, Default)]
pub struct Chunk {
  pub exec_order: u32,
  pub kind: ChunkKind,
  /// Execution order within the chunk.
  pub modules: Vec<ModuleIdx>,
  pub name: Option<ArcStr>,
  pub entry_hash: Option<EntryHash>,
  pub is_manual: bool,
  /// Entry modules living inside this chunk, in entry declaration order.
  pub entry_modules: Vec<ModuleIdx>,
  /// The entry module whose filename this chunk carries. For a chunk that
  /// contains several entries, only the first becomes the facade; the rest
  /// get facade chunks of their own.
  pub facade_module: Option<ModuleIdx>,
  /// True for synthesized facade chunks: no modules of their own, they
  /// only re-export `facade_module`'s surface.
  pub is_facade: bool,

  pub cross_chunk_imports: Vec<ChunkIdx>,
  pub imports_from_other_chunks: Vec<(ChunkIdx, Vec<CrossChunkImportItem>)>,
  /// External module and the names included code imports from it.
  pub imports_from_external_modules: Vec<(ModuleIdx, Vec<ArcStr>)>,
  pub exports_to_other_chunks: FxIndexMap<SymbolRef, ArcStr>,

  /// Renderable entry surface, when the chunk has an entry and its exports
  /// are not tainted.
  pub entry_exports: Vec<(ArcStr, SymbolRef)>,
  /// The entry's exports reach into other chunks, so the surface cannot be
  /// rendered verbatim and a facade is required.
  pub exports_tainted: bool,
}

impl Chunk {
  pub fn new(
    name: Option<ArcStr>,
    entry_hash: Option<EntryHash>,
    modules: Vec<ModuleIdx>,
    kind: ChunkKind,
  ) -> Self {
    Self { exec_order: u32::MAX, name, entry_hash, modules, kind, ..Self::default() }
  }

  pub fn facade(module: ModuleIdx, name: Option<ArcStr>) -> Self {
    Self {
      kind: ChunkKind::EntryPoint { module },
      name,
      facade_module: Some(module),
      is_facade: true,
      ..Self::default()
    }
  }

  pub fn entry_module_idx(&self) -> Option<ModuleIdx> {
    match self.kind {
      ChunkKind::EntryPoint { module } => Some(module),
      ChunkKind::Common => None,
    }
  }

  pub fn is_entry(&self) -> bool {
    matches!(self.kind, ChunkKind::EntryPoint { .. })
  }

  pub fn is_alive(&self) -> bool {
    !self.modules.is_empty() || self.is_entry() || self.is_manual
  }
}
