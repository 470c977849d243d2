use arcstr::ArcStr;
use bale_common::{Chunk, ChunkIdx, ChunkKind, Module, SymbolRef};
use rustc_hash::FxHashSet;

use crate::link_stage::{resolve_export, ExportResolution};

use super::{ChunkGraph, GenerateStage};

impl GenerateStage<'_> {
  /// Settles every entry chunk's export surface. An entry whose resolved
  /// exports all live inside its own chunk renders them verbatim; an
  /// export reaching into another chunk taints the surface, and the entry
  /// needs a facade chunk instead. Facade chunks themselves just take the
  /// full surface. With `preserve_modules`, every chunk is treated as an
  /// entry chunk.
  pub(crate) fn generate_entry_exports_or_mark_as_tainted(&mut self, chunk_graph: &mut ChunkGraph) {
    let chunk_ids = chunk_graph
      .chunk_table
      .iter_enumerated()
      .filter(|(_, chunk)| {
        chunk.is_entry() || (self.options.preserve_modules && chunk.is_alive())
      })
      .map(|(chunk_idx, _)| chunk_idx)
      .collect::<Vec<_>>();

    let mut tainted_entries: Vec<(ChunkIdx, bale_common::ModuleIdx)> = Vec::new();

    for chunk_idx in chunk_ids {
      let chunk = &chunk_graph.chunk_table[chunk_idx];
      // With preserve_modules, a common chunk's surface is its single
      // module's surface.
      let preserved_module =
        self.options.preserve_modules.then(|| chunk.modules.first().copied()).flatten();
      let Some(entry_id) = chunk.entry_module_idx().or(chunk.facade_module).or(preserved_module)
      else {
        continue;
      };
      let is_facade = chunk.is_facade;

      let exports = self.resolve_entry_surface(entry_id);

      let mut tainted = false;
      if !is_facade {
        for (_, symbol_ref) in &exports {
          match chunk_graph.module_to_chunk[symbol_ref.owner] {
            Some(owner_chunk) if owner_chunk != chunk_idx => {
              tainted = true;
              break;
            }
            _ => {}
          }
        }
      }

      let chunk = &mut chunk_graph.chunk_table[chunk_idx];
      if tainted {
        chunk.exports_tainted = true;
        chunk.entry_exports.clear();
        tainted_entries.push((chunk_idx, entry_id));
      } else {
        chunk.entry_exports = exports;
      }
    }

    // Tainted entries still need their surface under their own filename.
    for (chunk_idx, entry_id) in tainted_entries {
      let already_facaded = chunk_graph
        .chunk_table
        .iter()
        .any(|chunk| chunk.is_facade && chunk.facade_module == Some(entry_id));
      if already_facaded {
        continue;
      }
      let name = chunk_graph.chunk_table[chunk_idx].name.take();
      let mut facade = Chunk::facade(entry_id, name);
      facade.entry_exports = self.resolve_entry_surface(entry_id);
      let facade_idx = chunk_graph.add_chunk(facade);
      chunk_graph.entry_module_to_entry_chunk.insert(entry_id, facade_idx);

      // The content chunk loses the entry filename to the facade.
      let chunk = &mut chunk_graph.chunk_table[chunk_idx];
      if let ChunkKind::EntryPoint { module } = chunk.kind {
        if module == entry_id {
          chunk.facade_module = None;
        }
      }
    }

    // Facades synthesized before this pass get their surface too.
    let facade_ids = chunk_graph
      .chunk_table
      .iter_enumerated()
      .filter(|(_, chunk)| chunk.is_facade && chunk.entry_exports.is_empty())
      .map(|(chunk_idx, chunk)| (chunk_idx, chunk.facade_module))
      .collect::<Vec<_>>();
    for (chunk_idx, facade_module) in facade_ids {
      if let Some(entry_id) = facade_module {
        chunk_graph.chunk_table[chunk_idx].entry_exports = self.resolve_entry_surface(entry_id);
      }
    }
  }

  /// The entry's full export surface as `(exported name, resolved
  /// symbol)`, sorted by name for stable output.
  fn resolve_entry_surface(&self, entry_id: bale_common::ModuleIdx) -> Vec<(ArcStr, SymbolRef)> {
    let modules = &self.link_output.modules;
    let Module::Normal(module) = &modules[entry_id] else {
      return Vec::new();
    };
    let mut names: Vec<ArcStr> = module.exports_all.keys().cloned().collect();
    names.sort_unstable();

    let mut surface = Vec::with_capacity(names.len());
    for name in names {
      let mut seen = FxHashSet::default();
      if let ExportResolution::Found(symbol_ref) =
        resolve_export(modules, &self.link_output.modules_by_id, entry_id, &name, &mut seen)
      {
        surface.push((name, symbol_ref));
      }
    }
    surface
  }
}
