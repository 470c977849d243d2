use arcstr::ArcStr;
use bale_common::{
  IndexModules, Module, ModuleIdx, NormalModule, StmtInfoIdx, SymbolRef,
};
use oxc_index::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{resolve_export, ExportResolution, LinkStage};

struct Context<'a> {
  modules: &'a IndexModules,
  modules_by_id: &'a FxHashMap<ArcStr, ModuleIdx>,
  is_included_vec: &'a mut IndexVec<ModuleIdx, IndexVec<StmtInfoIdx, bool>>,
  included_symbols: &'a mut FxHashSet<SymbolRef>,
  tree_shaking: bool,
  /// Set whenever anything new becomes live; drives the fixpoint loop.
  needs_treeshaking_pass: &'a mut bool,
}

/// One `include()` pass over a module: its side-effect statements (all
/// statements when tree-shaking is off) become live, and everything they
/// reference follows.
fn include_module(ctx: &mut Context, module: &NormalModule) {
  for (stmt_idx, stmt) in module.stmt_infos.iter_enumerated() {
    if !ctx.tree_shaking || stmt.side_effect {
      include_statement(ctx, module, stmt_idx);
    }
  }
}

fn include_statement(ctx: &mut Context, module: &NormalModule, stmt_idx: StmtInfoIdx) {
  if ctx.is_included_vec[module.idx][stmt_idx] {
    return;
  }
  ctx.is_included_vec[module.idx][stmt_idx] = true;
  *ctx.needs_treeshaking_pass = true;

  let referenced = module.stmt_infos.get(stmt_idx).referenced_symbols.clone();
  for symbol_ref in referenced {
    include_symbol(ctx, symbol_ref);
  }
}

fn include_symbol(ctx: &mut Context, symbol_ref: SymbolRef) {
  if ctx.included_symbols.insert(symbol_ref) {
    *ctx.needs_treeshaking_pass = true;

    // Touching a module's namespace object keeps its whole export surface
    // alive.
    if let Module::Normal(owner) = &ctx.modules[symbol_ref.owner] {
      if symbol_ref.symbol == owner.namespace_ref {
        include_all_exports(ctx, owner);
      }
    }
  }

  if let Module::Normal(owner) = &ctx.modules[symbol_ref.owner] {
    let declaring_stmts = owner.stmt_infos.declared_stmts_by_symbol(symbol_ref.symbol).to_vec();
    for stmt_idx in declaring_stmts {
      include_statement(ctx, owner, stmt_idx);
    }
  }
}

/// Marks every export of a module as live: the entry-point treatment, also
/// applied when a namespace object is observed.
fn include_all_exports(ctx: &mut Context, module: &NormalModule) {
  let export_names: Vec<ArcStr> = module.exports_all.keys().cloned().collect();
  for name in export_names {
    let mut seen = FxHashSet::default();
    match resolve_export(ctx.modules, ctx.modules_by_id, module.idx, &name, &mut seen) {
      ExportResolution::Found(symbol_ref) => include_symbol(ctx, symbol_ref),
      // External targets render as import statements; nothing to mark.
      ExportResolution::External(..) | ExportResolution::NotFound => {}
    }
  }
}

impl LinkStage<'_> {
  /// The marking phase: a monotone fixpoint over the included set. With
  /// tree-shaking enabled, entry modules first get all their exports
  /// included, then passes in execution order run until one completes
  /// without including anything new. A statement or symbol once included
  /// is never un-included. With tree-shaking disabled, a single
  /// all-inclusive pass still runs so namespace bindings resolve.
  pub(crate) fn include_marked(&mut self) {
    let tree_shaking = self.options.treeshake_enabled();

    let mut is_included_vec = self
      .modules
      .iter()
      .map(|module| {
        module.as_normal().map_or(IndexVec::default(), |module| {
          module.stmt_infos.iter().map(|_| false).collect::<IndexVec<StmtInfoIdx, _>>()
        })
      })
      .collect::<IndexVec<ModuleIdx, _>>();

    let mut included_symbols = std::mem::take(&mut self.included_symbols);
    let mut needs_treeshaking_pass = false;

    let mut ctx = Context {
      modules: &self.modules,
      modules_by_id: &self.modules_by_id,
      is_included_vec: &mut is_included_vec,
      included_symbols: &mut included_symbols,
      tree_shaking,
      needs_treeshaking_pass: &mut needs_treeshaking_pass,
    };

    if tree_shaking {
      for entry in &self.entry_points {
        if let Module::Normal(module) = &self.modules[entry.id] {
          include_all_exports(&mut ctx, module);
        }
      }

      loop {
        *ctx.needs_treeshaking_pass = false;
        for &idx in &self.sorted_modules {
          if let Module::Normal(module) = &self.modules[idx] {
            if module.is_executed {
              include_module(&mut ctx, module);
            }
          }
        }
        if !*ctx.needs_treeshaking_pass {
          break;
        }
      }
    } else {
      for &idx in &self.sorted_modules {
        if let Module::Normal(module) = &self.modules[idx] {
          include_module(&mut ctx, module);
        }
      }
    }

    let entry_ids = self.entry_points.iter().map(|entry| entry.id).collect::<FxHashSet<_>>();
    let mut module_count = 0usize;
    for (idx, module) in self.modules.iter_mut_enumerated() {
      if let Module::Normal(module) = module {
        let mut any_included = false;
        for (stmt, is_included) in module.stmt_infos.iter_mut().zip(is_included_vec[idx].iter()) {
          stmt.is_included = *is_included;
          any_included |= *is_included;
        }
        module.is_included = any_included
          || entry_ids.contains(&idx)
          || included_symbols.contains(&SymbolRef::new(idx, module.namespace_ref));
        if module.is_included {
          module_count += 1;
        }
      }
    }
    tracing::debug!(included_modules = module_count, "marking finished");

    self.included_symbols = included_symbols;
  }
}
