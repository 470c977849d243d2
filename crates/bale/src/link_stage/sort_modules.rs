use std::iter;

use bale_common::{Module, ModuleIdx, Warning, WarningCode};
use bale_utils::indexmap::FxIndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

use super::LinkStage;

#[derive(PartialEq, Eq, Hash, Debug)]
enum Status {
  ToBeExecuted(ModuleIdx),
  WaitForExit(ModuleIdx),
}

impl LinkStage<'_> {
  /// Deterministic post-order over the static graph, seeded from the entry
  /// points in declaration order. Cycles are tolerated: each distinct
  /// back-edge records the chain from the revisited ancestor down to the
  /// current module and becomes one `CIRCULAR_DEPENDENCY` warning. Within
  /// a strongly connected component, ties break by insertion order, which
  /// is what the explicit stack yields.
  pub(crate) fn sort_modules(&mut self) {
    let mut execution_stack = self
      .entry_points
      .iter()
      .rev()
      .map(|entry| Status::ToBeExecuted(entry.id))
      .collect::<Vec<_>>();

    let mut executed_ids = FxHashSet::default();
    let mut executing_chain: Vec<ModuleIdx> = Vec::new();
    let mut chain_pos_of_id: FxHashMap<ModuleIdx, usize> = FxHashMap::default();

    let mut next_exec_order = 0u32;
    let mut circular_dependencies: FxIndexSet<Box<[ModuleIdx]>> = FxIndexSet::default();
    let mut sorted_modules = Vec::with_capacity(self.modules.len());

    while let Some(status) = execution_stack.pop() {
      match status {
        Status::ToBeExecuted(id) => {
          if executed_ids.contains(&id) {
            if let Some(&pos) = chain_pos_of_id.get(&id) {
              // Still on the executing chain: this edge closes a cycle.
              let cycle = executing_chain[pos..]
                .iter()
                .copied()
                .chain(iter::once(id))
                .collect::<Box<[_]>>();
              circular_dependencies.insert(cycle);
            }
          } else {
            executed_ids.insert(id);
            execution_stack.push(Status::WaitForExit(id));
            chain_pos_of_id.insert(id, executing_chain.len());
            executing_chain.push(id);

            execution_stack.extend(
              self.metadata[id].dependencies.iter().copied().rev().map(Status::ToBeExecuted),
            );
          }
        }
        Status::WaitForExit(id) => {
          match &mut self.modules[id] {
            Module::Normal(module) => {
              module.exec_order = next_exec_order;
              module.is_executed = true;
              sorted_modules.push(id);
            }
            Module::External(module) => {
              module.exec_order = next_exec_order;
            }
          }
          next_exec_order += 1;
          executing_chain.pop();
          chain_pos_of_id.remove(&id);
        }
      }
    }

    for cycle in circular_dependencies {
      let paths = cycle
        .iter()
        .copied()
        .filter_map(|id| self.modules[id].as_normal())
        .map(|module| module.stable_id.clone())
        .collect::<Vec<_>>();
      self.warnings.push(Warning::new(
        WarningCode::CircularDependency,
        format!("Circular dependency: {}", paths.join(" -> ")),
      ));
    }

    self.sorted_modules = sorted_modules;
  }
}
