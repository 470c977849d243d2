use arcstr::ArcStr;
use bale_common::{ChunkIdx, CrossChunkImportItem, Module, ModuleIdx, SymbolRef};
use bale_utils::indexmap::{FxIndexMap, FxIndexSet};
use itertools::{multizip, Itertools};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use super::{ChunkGraph, GenerateStage};

type ChunkDependedSymbols = Vec<FxIndexMap<ChunkIdx, FxIndexSet<SymbolRef>>>;
type ChunkExternalImports = Vec<FxIndexMap<ModuleIdx, FxIndexSet<ArcStr>>>;

impl GenerateStage<'_> {
  /// Links the chunks: every variable one chunk uses from another becomes
  /// an export on the owning chunk and an import item on the consuming
  /// one, and imports from external modules are recorded per chunk. All
  /// listings are deterministically ordered.
  pub(crate) fn compute_cross_chunk_links(&mut self, chunk_graph: &mut ChunkGraph) {
    let chunk_count = chunk_graph.chunk_table.len();
    let mut depended_symbols: ChunkDependedSymbols = vec![FxIndexMap::default(); chunk_count];
    let mut external_imports: ChunkExternalImports = vec![FxIndexMap::default(); chunk_count];

    self.collect_depended_symbols(chunk_graph, &mut depended_symbols, &mut external_imports);
    let export_names = self.assign_export_names(chunk_graph, &depended_symbols);

    let modules = &self.link_output.modules;

    // Consumer-side import lists, ordered by the exporting chunk's
    // execution order.
    let imports_from_other_chunks = depended_symbols
      .iter()
      .map(|depended| {
        depended
          .iter()
          .map(|(&owner_chunk, symbols)| {
            let items = symbols
              .iter()
              .map(|&symbol_ref| CrossChunkImportItem {
                import_ref: symbol_ref,
                export_name: export_names[owner_chunk.index()][&symbol_ref].clone(),
              })
              .collect::<Vec<_>>();
            (owner_chunk, items)
          })
          .sorted_by_key(|(owner_chunk, _)| chunk_graph.chunk_table[*owner_chunk].exec_order)
          .collect::<Vec<_>>()
      })
      .collect::<Vec<_>>();

    let cross_chunk_imports = depended_symbols
      .into_par_iter()
      .map(|depended| {
        let mut importees = depended.into_keys().collect::<Vec<_>>();
        importees.sort_by_cached_key(|importee| {
          let mut module_ids = chunk_graph.chunk_table[*importee]
            .modules
            .iter()
            .map(|idx| modules[*idx].id().to_string())
            .collect::<Vec<_>>();
          module_ids.sort_unstable();
          module_ids
        });
        importees
      })
      .collect::<Vec<_>>();

    let imports_from_external_modules = external_imports
      .into_iter()
      .map(|imports| {
        imports
          .into_iter()
          .map(|(external_idx, names)| (external_idx, names.into_iter().collect::<Vec<_>>()))
          .sorted_by_key(|(external_idx, _)| modules[*external_idx].exec_order())
          .collect::<Vec<_>>()
      })
      .collect::<Vec<_>>();

    for (chunk, imports, externals, cross_imports, exports) in multizip((
      chunk_graph.chunk_table.iter_mut(),
      imports_from_other_chunks,
      imports_from_external_modules,
      cross_chunk_imports,
      export_names,
    )) {
      chunk.imports_from_other_chunks = imports;
      chunk.imports_from_external_modules = externals;
      chunk.cross_chunk_imports = cross_imports;
      chunk.exports_to_other_chunks = exports;
    }

    self.apply_external_used_names(chunk_graph);
  }

  fn collect_depended_symbols(
    &self,
    chunk_graph: &ChunkGraph,
    depended_symbols: &mut ChunkDependedSymbols,
    external_imports: &mut ChunkExternalImports,
  ) {
    let modules = &self.link_output.modules;

    for (chunk_idx, chunk) in chunk_graph.chunk_table.iter_enumerated() {
      for &module_idx in &chunk.modules {
        let Some(module) = modules[module_idx].as_normal() else {
          continue;
        };

        for stmt in module.stmt_infos.iter().filter(|stmt| stmt.is_included) {
          for &symbol_ref in &stmt.referenced_symbols {
            let Some(owner_chunk) = chunk_graph.module_to_chunk[symbol_ref.owner] else {
              continue;
            };
            if owner_chunk != chunk_idx {
              depended_symbols[chunk_idx.index()]
                .entry(owner_chunk)
                .or_default()
                .insert(symbol_ref);
            }
          }
        }

        for (&symbol, import) in &module.named_imports {
          let importee = module.import_records[import.record_idx].importee();
          if !modules[importee].is_external() {
            continue;
          }
          // A binding to an external module resolves to itself, so the
          // included-symbol set tells whether live code observes it.
          let binding_used =
            self.link_output.included_symbols.contains(&SymbolRef::new(module_idx, symbol));
          if binding_used {
            external_imports[chunk_idx.index()]
              .entry(importee)
              .or_default()
              .insert(import.imported.to_string().into());
          }
        }
      }
    }
  }

  /// Every symbol some other chunk depends on gets a stable export name on
  /// its owning chunk, deconflicted within that chunk.
  fn assign_export_names(
    &self,
    _chunk_graph: &ChunkGraph,
    depended_symbols: &ChunkDependedSymbols,
  ) -> Vec<FxIndexMap<SymbolRef, ArcStr>> {
    let modules = &self.link_output.modules;
    let chunk_count = depended_symbols.len();
    let mut export_names: Vec<FxIndexMap<SymbolRef, ArcStr>> =
      vec![FxIndexMap::default(); chunk_count];
    let mut used_names: Vec<FxHashSet<ArcStr>> = vec![FxHashSet::default(); chunk_count];

    for depended in depended_symbols {
      for (&owner_chunk, symbols) in depended {
        for &symbol_ref in symbols {
          let names = &mut export_names[owner_chunk.index()];
          if names.contains_key(&symbol_ref) {
            continue;
          }
          let base = match &modules[symbol_ref.owner] {
            Module::Normal(owner) => owner.symbol_name(symbol_ref.symbol).clone(),
            Module::External(_) => continue,
          };
          let used = &mut used_names[owner_chunk.index()];
          let mut candidate = base.clone();
          let mut suffix = 1u32;
          while !used.insert(candidate.clone()) {
            suffix += 1;
            candidate = ArcStr::from(format!("{base}${suffix}"));
          }
          names.insert(symbol_ref, candidate);
        }
      }
    }
    export_names
  }

  /// Record, on each external module, the union of names imported from it
  /// by included code.
  fn apply_external_used_names(&mut self, chunk_graph: &ChunkGraph) {
    let mut used: Vec<(ModuleIdx, ArcStr)> = Vec::new();
    for chunk in chunk_graph.chunk_table.iter() {
      for (external_idx, names) in &chunk.imports_from_external_modules {
        for name in names {
          used.push((*external_idx, name.clone()));
        }
      }
    }
    for (external_idx, name) in used {
      if let Some(external) = self.link_output.modules[external_idx].as_external_mut() {
        external.used_names.insert(name);
      }
    }
  }
}
