use arcstr::ArcStr;

use crate::{BuildCache, ModuleInfo, TransformAsset, Warning};

/// Structural description of one emitted chunk. Code generation is outside
/// this crate, so chunks are reported as ordered module listings plus their
/// cross-chunk surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
  pub name: ArcStr,
  /// Module ids in execution order.
  pub module_ids: Vec<ArcStr>,
  pub is_entry: bool,
  pub is_manual: bool,
  /// Set for facade chunks: the entry module this chunk re-exports.
  pub facade_module_id: Option<ArcStr>,
  pub exports: Vec<ArcStr>,
  /// Names of chunks and ids of external modules this chunk imports from.
  pub imports: Vec<ArcStr>,
}

#[derive(Debug)]
pub struct BuildOutput {
  pub chunks: Vec<OutputChunk>,
  /// One entry per graph module, in execution order.
  pub module_infos: Vec<ModuleInfo>,
  pub warnings: Vec<Warning>,
  pub assets: Vec<TransformAsset>,
  pub cache: BuildCache,
}

impl BuildOutput {
  pub fn module_info(&self, id: &str) -> Option<&ModuleInfo> {
    self.module_infos.iter().find(|info| info.id == id)
  }

  pub fn chunk(&self, name: &str) -> Option<&OutputChunk> {
    self.chunks.iter().find(|chunk| chunk.name == name)
  }
}
