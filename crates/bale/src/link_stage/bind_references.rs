use arcstr::ArcStr;
use bale_common::{
  IndexModules, LocalExport, Module, ModuleIdx, Specifier, SymbolData, SymbolIdx, SymbolRef,
  Warning, WarningCode,
};
use rustc_hash::{FxHashMap, FxHashSet};

use super::LinkStage;

/// Binding synthesized for missing exports when shimming is enabled.
const MISSING_EXPORT_SHIM: &str = "_missing_export_";

pub(crate) enum ExportResolution {
  Found(SymbolRef),
  /// The name comes from an external module; the importer's own binding
  /// stands in for it.
  External(ModuleIdx, Specifier),
  NotFound,
}

/// Resolves `name` against `target`'s export surface, chasing reexport
/// chains, import-then-export hops and `export *` sources. `seen` guards
/// reexport cycles.
pub(crate) fn resolve_export(
  modules: &IndexModules,
  modules_by_id: &FxHashMap<ArcStr, ModuleIdx>,
  target: ModuleIdx,
  name: &str,
  seen: &mut FxHashSet<(ModuleIdx, ArcStr)>,
) -> ExportResolution {
  if !seen.insert((target, ArcStr::from(name))) {
    return ExportResolution::NotFound;
  }

  let module = match &modules[target] {
    Module::External(_) => return ExportResolution::External(target, Specifier::literal(name)),
    Module::Normal(module) => module,
  };

  if let Some(local) = module.named_exports.get(name) {
    // An exported binding may itself be imported (`import { x } from 'dep';
    // export { x }`), in which case the resolution continues there.
    if let Some(import) = module.named_imports.get(&local.referenced) {
      let importee = module.import_records[import.record_idx].importee();
      return match (&import.imported, modules[importee].is_external()) {
        (_, true) => ExportResolution::Found(SymbolRef::new(target, local.referenced)),
        (Specifier::Star, false) => {
          let namespace = modules[importee].as_normal().map(|m| m.namespace_ref);
          namespace
            .map(|symbol| ExportResolution::Found(SymbolRef::new(importee, symbol)))
            .unwrap_or(ExportResolution::NotFound)
        }
        (Specifier::Literal(imported), false) => {
          resolve_export(modules, modules_by_id, importee, imported, seen)
        }
      };
    }
    return ExportResolution::Found(SymbolRef::new(target, local.referenced));
  }

  if let Some(reexport) = module.reexports.get(name) {
    let importee = module.import_records[reexport.record_idx].importee();
    return match (&reexport.imported, &modules[importee]) {
      (Specifier::Star, Module::External(_)) => {
        ExportResolution::External(importee, Specifier::Star)
      }
      (Specifier::Star, Module::Normal(importee_module)) => {
        ExportResolution::Found(SymbolRef::new(importee, importee_module.namespace_ref))
      }
      (Specifier::Literal(imported), Module::External(_)) => {
        ExportResolution::External(importee, Specifier::literal(imported.clone()))
      }
      (Specifier::Literal(imported), Module::Normal(_)) => {
        resolve_export(modules, modules_by_id, importee, imported, seen)
      }
    };
  }

  // `export *` sources; the first-seen origin recorded at load time wins.
  if let Some(origin_id) = module.exports_all.get(name) {
    if origin_id != module.id.inner() {
      if let Some(&origin_idx) = modules_by_id.get(origin_id) {
        return resolve_export(modules, modules_by_id, origin_idx, name, seen);
      }
    }
  }

  ExportResolution::NotFound
}

/// Per-module results of the binding pass, gathered with the module table
/// borrowed immutably and applied afterwards.
struct BindOutcome {
  binding_resolutions: FxHashMap<SymbolIdx, SymbolRef>,
  stmt_resolutions: Vec<Vec<SymbolRef>>,
  external_namespaces: Vec<ModuleIdx>,
  /// Exporter, missing name, and the local binding to repoint (reexports
  /// have no local binding).
  shim_requests: Vec<(ModuleIdx, ArcStr, Option<SymbolIdx>)>,
  warnings: Vec<Warning>,
}

impl LinkStage<'_> {
  /// Second linker pass: point every statement-level reference at the
  /// declaration it resolves to, across modules where the name travels
  /// through imports. Emits one `NON_EXISTENT_EXPORT` warning per
  /// unresolved non-namespace import; namespace imports are always
  /// satisfied.
  pub(crate) fn bind_references(&mut self) {
    let module_ids: Vec<ModuleIdx> =
      self.modules.iter_enumerated().filter(|(_, m)| m.is_normal()).map(|(idx, _)| idx).collect();

    for idx in module_ids {
      let outcome = self.bind_module(idx);
      self.apply_outcome(idx, outcome);
    }
  }

  fn bind_module(&self, idx: ModuleIdx) -> BindOutcome {
    let module = self.modules[idx].as_normal().expect("binding an internal module");
    let mut outcome = BindOutcome {
      binding_resolutions: FxHashMap::default(),
      stmt_resolutions: Vec::with_capacity(module.stmt_infos.len()),
      external_namespaces: Vec::new(),
      shim_requests: Vec::new(),
      warnings: Vec::new(),
    };

    for (&symbol, import) in &module.named_imports {
      let importee = module.import_records[import.record_idx].importee();
      let local = SymbolRef::new(idx, symbol);
      let resolution = match &import.imported {
        Specifier::Star => match &self.modules[importee] {
          Module::External(_) => {
            outcome.external_namespaces.push(importee);
            local
          }
          Module::Normal(importee_module) => {
            SymbolRef::new(importee, importee_module.namespace_ref)
          }
        },
        Specifier::Literal(imported) => {
          if self.modules[importee].is_external() {
            local
          } else {
            let mut seen = FxHashSet::default();
            match resolve_export(&self.modules, &self.modules_by_id, importee, imported, &mut seen)
            {
              ExportResolution::Found(resolved) => resolved,
              ExportResolution::External(..) => local,
              ExportResolution::NotFound => {
                if self.options.shim_missing_exports {
                  outcome.shim_requests.push((importee, imported.clone(), Some(symbol)));
                  local
                } else {
                  let (line, column) = offset_to_line_col(&module.source, import.start);
                  outcome.warnings.push(
                    Warning::new(
                      WarningCode::NonExistentExport,
                      format!(
                        "'{imported}' is not exported by {}, imported by {}",
                        self.modules[importee].stable_id(),
                        module.stable_id,
                      ),
                    )
                    .with_id(module.id.to_string())
                    .with_loc(line, column),
                  );
                  local
                }
              }
            }
          }
        }
      };
      outcome.binding_resolutions.insert(symbol, resolution);
    }

    // Reexports are imports too: `export { missing } from './x'` gets the
    // same diagnostics as a named import of `missing`.
    for reexport in module.reexports.values() {
      let Specifier::Literal(imported) = &reexport.imported else {
        continue;
      };
      let importee = module.import_records[reexport.record_idx].importee();
      if self.modules[importee].is_external() {
        continue;
      }
      let mut seen = FxHashSet::default();
      if matches!(
        resolve_export(&self.modules, &self.modules_by_id, importee, imported, &mut seen),
        ExportResolution::NotFound
      ) {
        if self.options.shim_missing_exports {
          outcome.shim_requests.push((importee, imported.clone(), None));
        } else {
          let (line, column) = offset_to_line_col(&module.source, reexport.start);
          outcome.warnings.push(
            Warning::new(
              WarningCode::NonExistentExport,
              format!(
                "'{imported}' is not exported by {}, imported by {}",
                self.modules[importee].stable_id(),
                module.stable_id,
              ),
            )
            .with_id(module.id.to_string())
            .with_loc(line, column),
          );
        }
      }
    }

    for (_, stmt) in module.stmt_infos.iter_enumerated() {
      let mut refs: Vec<SymbolRef> = Vec::new();
      for name in &stmt.referenced_names {
        let Some(&symbol) = module.symbol_by_name.get(name) else {
          continue;
        };
        let resolved = outcome
          .binding_resolutions
          .get(&symbol)
          .copied()
          .unwrap_or_else(|| SymbolRef::new(idx, symbol));
        if !refs.contains(&resolved) {
          refs.push(resolved);
        }
      }
      outcome.stmt_resolutions.push(refs);
    }

    outcome
  }

  fn apply_outcome(&mut self, idx: ModuleIdx, outcome: BindOutcome) {
    let BindOutcome {
      mut binding_resolutions,
      stmt_resolutions,
      external_namespaces,
      shim_requests,
      warnings,
    } = outcome;

    self.warnings.extend(warnings);

    for external_idx in external_namespaces {
      if let Some(external) = self.modules[external_idx].as_external_mut() {
        external.exports_namespace = true;
      }
    }

    for (exporter_idx, name, binding) in shim_requests {
      if let Some(exporter) = self.modules[exporter_idx].as_normal_mut() {
        let shim = match exporter.symbol_by_name.get(MISSING_EXPORT_SHIM) {
          Some(&shim) => shim,
          None => {
            let shim = exporter.symbols.push(SymbolData { name: MISSING_EXPORT_SHIM.into() });
            exporter.symbol_by_name.insert(MISSING_EXPORT_SHIM.into(), shim);
            shim
          }
        };
        tracing::debug!(
          exporter = %exporter.id,
          %name,
          "shimming missing export"
        );
        exporter.named_exports.insert(name, LocalExport { referenced: shim });
        if let Some(binding) = binding {
          binding_resolutions.insert(binding, SymbolRef::new(exporter_idx, shim));
        }
      }
    }

    if let Some(module) = self.modules[idx].as_normal_mut() {
      for (stmt, refs) in module.stmt_infos.iter_mut().zip(stmt_resolutions) {
        stmt.referenced_symbols = refs;
      }
      // Shims resolved after the statement pass still need to land.
      for stmt in module.stmt_infos.iter_mut() {
        for reference in &mut stmt.referenced_symbols {
          if reference.owner == idx {
            if let Some(&resolved) = binding_resolutions.get(&reference.symbol) {
              *reference = resolved;
            }
          }
        }
      }
    }
  }
}

fn offset_to_line_col(source: &str, offset: u32) -> (u32, u32) {
  let offset = (offset as usize).min(source.len());
  let before = &source[..offset];
  let line = before.bytes().filter(|&b| b == b'\n').count() as u32 + 1;
  let column = before.rfind('\n').map_or(offset, |pos| offset - pos - 1) as u32;
  (line, column)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn offsets_map_to_lines_and_columns() {
    let source = "const a = 1;\nconst b = 2;\n";
    assert_eq!(offset_to_line_col(source, 0), (1, 0));
    assert_eq!(offset_to_line_col(source, 13), (2, 0));
    assert_eq!(offset_to_line_col(source, 19), (2, 6));
  }
}
