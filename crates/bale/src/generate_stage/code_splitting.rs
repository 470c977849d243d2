use arcstr::ArcStr;
use bale_common::{Chunk, ChunkKind, EntryPointKind, Module, ModuleIdx};
use bale_error::{BuildDiagnostic, BuildResult};
use bale_utils::{entry_hash::EntryHash, indexmap::FxIndexMap};
use rustc_hash::FxHashSet;

use super::{ChunkGraph, GenerateStage};

impl GenerateStage<'_> {
  /// Partitions the included modules into chunks. The normal path is
  /// entry-point colouring; `preserve_modules` and
  /// `inline_dynamic_imports` each short-circuit it with their own
  /// partition.
  pub(crate) fn generate_chunks(&mut self) -> BuildResult<ChunkGraph> {
    if self.options.inline_dynamic_imports {
      return self.generate_single_chunk();
    }
    if self.options.preserve_modules {
      return Ok(self.generate_chunk_per_module());
    }
    Ok(self.generate_coloured_chunks())
  }

  /// `inline_dynamic_imports`: the whole graph collapses into the one
  /// entry's chunk. More than one entry cannot be expressed this way.
  fn generate_single_chunk(&mut self) -> BuildResult<ChunkGraph> {
    let user_entries = self
      .link_output
      .entry_points
      .iter()
      .filter(|entry| entry.kind.is_user_defined())
      .collect::<Vec<_>>();
    if user_entries.len() != 1 {
      return Err(
        BuildDiagnostic::InvalidOptions {
          reason: format!(
            "inline_dynamic_imports requires exactly one entry point, got {}",
            user_entries.len()
          ),
        }
        .into(),
      );
    }
    let entry = user_entries[0];
    let entry_id = entry.id;
    let name = self.entry_chunk_name(entry_id, entry.name.clone());

    let mut chunk_graph = ChunkGraph::new(self.link_output.modules.len());
    let chunk_idx = chunk_graph.add_chunk(Chunk::new(
      Some(name),
      None,
      Vec::new(),
      ChunkKind::EntryPoint { module: entry_id },
    ));
    chunk_graph.chunk_table[chunk_idx].facade_module = Some(entry_id);
    chunk_graph.chunk_table[chunk_idx].entry_modules.push(entry_id);
    chunk_graph.chunk_table[chunk_idx].exec_order = 0;

    for &module_idx in &self.link_output.sorted_modules {
      if self.link_output.modules[module_idx].as_normal().is_some_and(|m| m.is_included) {
        chunk_graph.add_module_to_chunk(module_idx, chunk_idx);
      }
    }
    chunk_graph.entry_module_to_entry_chunk.insert(entry_id, chunk_idx);
    Ok(chunk_graph)
  }

  /// `preserve_modules`: every included module becomes its own chunk.
  fn generate_chunk_per_module(&mut self) -> ChunkGraph {
    let mut chunk_graph = ChunkGraph::new(self.link_output.modules.len());
    let entry_names = self
      .link_output
      .entry_points
      .iter()
      .map(|entry| (entry.id, entry.name.clone()))
      .collect::<FxIndexMap<_, _>>();

    for &module_idx in &self.link_output.sorted_modules {
      let Some(module) = self.link_output.modules[module_idx].as_normal() else {
        continue;
      };
      if !module.is_included {
        continue;
      }
      let kind = match entry_names.get(&module_idx) {
        Some(_) => ChunkKind::EntryPoint { module: module_idx },
        None => ChunkKind::Common,
      };
      let name: ArcStr = entry_names
        .get(&module_idx)
        .and_then(|name| name.clone())
        .or_else(|| module.chunk_alias.clone())
        .unwrap_or_else(|| ArcStr::from(module.repr_name.as_str()));

      let exec_order = module.exec_order;
      let chunk_idx = chunk_graph.add_chunk(Chunk::new(Some(name), None, Vec::new(), kind));
      chunk_graph.chunk_table[chunk_idx].exec_order = exec_order;
      if entry_names.contains_key(&module_idx) {
        chunk_graph.chunk_table[chunk_idx].facade_module = Some(module_idx);
        chunk_graph.chunk_table[chunk_idx].entry_modules.push(module_idx);
        chunk_graph.entry_module_to_entry_chunk.insert(module_idx, chunk_idx);
      }
      chunk_graph.add_module_to_chunk(module_idx, chunk_idx);
    }
    chunk_graph
  }

  /// Entry-point colouring. Every entry XORs a seed digest of its id into
  /// each module statically reachable from it; manual chunks override the
  /// listed modules with their alias seed. Modules with bit-identical
  /// hashes land in one chunk.
  fn generate_coloured_chunks(&mut self) -> ChunkGraph {
    self.assign_colouring_hashes();
    self.assign_entry_chunk_aliases();

    let mut chunk_graph = ChunkGraph::new(self.link_output.modules.len());

    let manual_modules =
      self.manual_chunk_modules.values().flatten().copied().collect::<FxHashSet<_>>();

    // `sorted_modules` is execution order, so each group comes out already
    // sorted and groups appear in first-use order.
    let mut groups: FxIndexMap<String, Vec<ModuleIdx>> = FxIndexMap::default();
    for &module_idx in &self.link_output.sorted_modules {
      let Some(module) = self.link_output.modules[module_idx].as_normal() else {
        continue;
      };
      if !module.is_included {
        continue;
      }
      groups.entry(module.entry_points_hash.to_hex()).or_default().push(module_idx);
    }

    for (_, group) in groups {
      let first = group[0];
      let module = self.link_output.modules[first].as_normal().expect("internal module");
      let is_manual = group.iter().any(|idx| manual_modules.contains(idx));
      let name = is_manual.then(|| module.chunk_alias.clone()).flatten();
      let exec_order = module.exec_order;

      let chunk_idx = chunk_graph.add_chunk(Chunk::new(
        name,
        Some(module.entry_points_hash),
        Vec::new(),
        ChunkKind::Common,
      ));
      chunk_graph.chunk_table[chunk_idx].is_manual = is_manual;
      chunk_graph.chunk_table[chunk_idx].exec_order = exec_order;
      for module_idx in group {
        chunk_graph.add_module_to_chunk(module_idx, chunk_idx);
      }
    }

    self.assign_entry_chunks(&mut chunk_graph);
    self.synthesize_facades(&mut chunk_graph);
    chunk_graph
  }

  fn assign_colouring_hashes(&mut self) {
    let modules = &mut self.link_output.modules;

    for entry in &self.link_output.entry_points {
      let seed = EntryHash::seed(modules[entry.id].id());
      // Static reachability from this entry.
      let mut visited = FxHashSet::default();
      let mut stack = vec![entry.id];
      while let Some(idx) = stack.pop() {
        if !visited.insert(idx) {
          continue;
        }
        let Some(module) = modules[idx].as_normal_mut() else {
          continue;
        };
        module.entry_points_hash.xor(seed);
        stack.extend(
          module
            .import_records
            .iter()
            .filter(|record| record.kind.is_static())
            .map(|record| record.importee()),
        );
      }
    }

    for (alias, manual_modules) in self.manual_chunk_modules {
      let seed = EntryHash::seed(alias);
      for &module_idx in manual_modules {
        if let Some(module) = modules[module_idx].as_normal_mut() {
          module.entry_points_hash.xor(seed);
          module.chunk_alias = Some(alias.clone());
        }
      }
    }
  }

  /// Reverse declaration order, so when several entries collapse into one
  /// chunk the first-declared entry's alias sticks.
  fn assign_entry_chunk_aliases(&mut self) {
    let entries = self
      .link_output
      .entry_points
      .iter()
      .filter(|entry| matches!(entry.kind, EntryPointKind::UserDefined))
      .rev()
      .map(|entry| (entry.id, entry.name.clone()))
      .collect::<Vec<_>>();
    for (module_idx, name) in entries {
      if let Some(name) = name {
        if let Some(module) = self.link_output.modules[module_idx].as_normal_mut() {
          module.chunk_alias = Some(name);
        }
      }
    }
  }

  fn assign_entry_chunks(&mut self, chunk_graph: &mut ChunkGraph) {
    for entry in &self.link_output.entry_points {
      let Some(chunk_idx) = chunk_graph.module_to_chunk[entry.id] else {
        continue;
      };
      let needs_name = {
        let chunk = &mut chunk_graph.chunk_table[chunk_idx];
        chunk.entry_modules.push(entry.id);
        if matches!(chunk.kind, ChunkKind::Common) {
          chunk.kind = ChunkKind::EntryPoint { module: entry.id };
          chunk.facade_module = Some(entry.id);
          chunk.name.is_none()
        } else {
          false
        }
      };
      if needs_name {
        let name = self.entry_chunk_name(entry.id, entry.name.clone());
        chunk_graph.chunk_table[chunk_idx].name = Some(name);
      }
      chunk_graph.entry_module_to_entry_chunk.entry(entry.id).or_insert(chunk_idx);
    }
  }

  /// An entry module that does not dominate its chunk still must exist
  /// under its own filename; an empty facade chunk re-exports it.
  fn synthesize_facades(&mut self, chunk_graph: &mut ChunkGraph) {
    let user_entries = self
      .link_output
      .entry_points
      .iter()
      .filter(|entry| entry.kind.is_user_defined())
      .map(|entry| (entry.id, entry.name.clone()))
      .collect::<Vec<_>>();

    for (entry_id, entry_name) in user_entries {
      let Some(chunk_idx) = chunk_graph.module_to_chunk[entry_id] else {
        continue;
      };
      if chunk_graph.chunk_table[chunk_idx].facade_module == Some(entry_id) {
        continue;
      }
      let name = self.entry_chunk_name(entry_id, entry_name);
      let facade_idx = chunk_graph.add_chunk(Chunk::facade(entry_id, Some(name)));
      chunk_graph.entry_module_to_entry_chunk.insert(entry_id, facade_idx);
    }
  }

  pub(crate) fn entry_chunk_name(&self, entry_id: ModuleIdx, alias: Option<ArcStr>) -> ArcStr {
    alias
      .or_else(|| match &self.link_output.modules[entry_id] {
        Module::Normal(module) => module.chunk_alias.clone(),
        Module::External(_) => None,
      })
      .unwrap_or_else(|| match &self.link_output.modules[entry_id] {
        Module::Normal(module) => ArcStr::from(module.repr_name.as_str()),
        Module::External(module) => module.name.clone(),
      })
  }
}
