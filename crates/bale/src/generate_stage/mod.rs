mod code_splitting;
mod compute_cross_chunk_links;
mod entry_exports;

use arcstr::ArcStr;
use bale_common::{Chunk, ChunkIdx, ModuleIdx, NormalizedGraphOptions};
use bale_error::BuildResult;
use bale_utils::indexmap::FxIndexMap;
use oxc_index::{index_vec, IndexVec};
use rustc_hash::FxHashMap;

use crate::link_stage::LinkStageOutput;

#[derive(Debug)]
pub struct ChunkGraph {
  pub chunk_table: IndexVec<ChunkIdx, Chunk>,
  pub module_to_chunk: IndexVec<ModuleIdx, Option<ChunkIdx>>,
  pub entry_module_to_entry_chunk: FxHashMap<ModuleIdx, ChunkIdx>,
}

impl ChunkGraph {
  pub fn new(module_count: usize) -> Self {
    Self {
      chunk_table: IndexVec::default(),
      module_to_chunk: index_vec![None; module_count],
      entry_module_to_entry_chunk: FxHashMap::default(),
    }
  }

  pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkIdx {
    self.chunk_table.push(chunk)
  }

  pub fn add_module_to_chunk(&mut self, module_idx: ModuleIdx, chunk_idx: ChunkIdx) {
    self.chunk_table[chunk_idx].modules.push(module_idx);
    self.module_to_chunk[module_idx] = Some(chunk_idx);
  }
}

/// Chunk generation: partitions the surviving modules into chunks, links
/// the chunks to each other and settles every entry's export surface.
pub struct GenerateStage<'a> {
  pub(crate) link_output: &'a mut LinkStageOutput,
  pub(crate) options: &'a NormalizedGraphOptions,
  pub(crate) manual_chunk_modules: &'a FxIndexMap<ArcStr, Vec<ModuleIdx>>,
}

impl<'a> GenerateStage<'a> {
  pub fn new(
    link_output: &'a mut LinkStageOutput,
    options: &'a NormalizedGraphOptions,
    manual_chunk_modules: &'a FxIndexMap<ArcStr, Vec<ModuleIdx>>,
  ) -> Self {
    Self { link_output, options, manual_chunk_modules }
  }

  pub fn generate(&mut self) -> BuildResult<ChunkGraph> {
    let mut chunk_graph = self.generate_chunks()?;
    self.compute_cross_chunk_links(&mut chunk_graph);
    self.generate_entry_exports_or_mark_as_tainted(&mut chunk_graph);

    tracing::debug!(
      chunks = chunk_graph.chunk_table.iter().filter(|chunk| chunk.is_alive()).count(),
      entry_chunks = chunk_graph.entry_module_to_entry_chunk.len(),
      "generate stage finished"
    );
    Ok(chunk_graph)
  }
}
