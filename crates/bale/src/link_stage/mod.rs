mod bind_references;
mod include_statements;
mod sort_modules;

use arcstr::ArcStr;
use bale_common::{
  EntryPoint, IndexModules, ModuleIdx, NormalizedGraphOptions, SymbolRef, Warning,
};
use oxc_index::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::module_loader::ModuleLoaderOutput;

pub(crate) use bind_references::{resolve_export, ExportResolution};

/// Cross-module facts cached per module during linking.
#[derive(Debug, Default)]
pub struct LinkingMetadata {
  /// Modules this one executes, in record order: static importees, plus
  /// dynamic importees when dynamic imports are being inlined.
  pub dependencies: Vec<ModuleIdx>,
}

pub type LinkingMetadataVec = IndexVec<ModuleIdx, LinkingMetadata>;

#[derive(Debug)]
pub struct LinkStageOutput {
  pub modules: IndexModules,
  pub entry_points: Vec<EntryPoint>,
  /// Internal modules in execution order.
  pub sorted_modules: Vec<ModuleIdx>,
  pub modules_by_id: FxHashMap<ArcStr, ModuleIdx>,
  pub included_symbols: FxHashSet<SymbolRef>,
  pub warnings: Vec<Warning>,
}

/// Linking, execution-order analysis and marking. Everything here is
/// synchronous; the loader already awaited all I/O.
pub struct LinkStage<'a> {
  pub modules: IndexModules,
  pub entry_points: Vec<EntryPoint>,
  pub sorted_modules: Vec<ModuleIdx>,
  pub modules_by_id: FxHashMap<ArcStr, ModuleIdx>,
  pub metadata: LinkingMetadataVec,
  pub included_symbols: FxHashSet<SymbolRef>,
  pub warnings: Vec<Warning>,
  pub options: &'a NormalizedGraphOptions,
}

impl<'a> LinkStage<'a> {
  pub fn new(scan_output: ModuleLoaderOutput, options: &'a NormalizedGraphOptions) -> Self {
    let ModuleLoaderOutput { modules, entry_points, warnings, .. } = scan_output;

    let modules_by_id = modules
      .iter_enumerated()
      .map(|(idx, module)| (ArcStr::from(module.id()), idx))
      .collect::<FxHashMap<_, _>>();

    // First linker pass: cache every import record's target module.
    let metadata = modules
      .iter()
      .map(|module| {
        let mut dependencies = module
          .import_records()
          .iter()
          .map(|record| record.importee())
          .collect::<Vec<_>>();
        if options.inline_dynamic_imports {
          if let Some(module) = module.as_normal() {
            dependencies.extend(
              module.dynamic_imports.iter().filter_map(|dynamic| dynamic.resolution.importee()),
            );
          }
        }
        LinkingMetadata { dependencies }
      })
      .collect::<LinkingMetadataVec>();

    Self {
      modules,
      entry_points,
      sorted_modules: Vec::new(),
      modules_by_id,
      metadata,
      included_symbols: FxHashSet::default(),
      warnings,
      options,
    }
  }

  pub fn link(mut self) -> LinkStageOutput {
    self.bind_references();
    self.sort_modules();
    self.include_marked();

    tracing::debug!(
      modules = self.modules.len(),
      sorted = self.sorted_modules.len(),
      "link stage finished"
    );

    LinkStageOutput {
      modules: self.modules,
      entry_points: self.entry_points,
      sorted_modules: self.sorted_modules,
      modules_by_id: self.modules_by_id,
      included_symbols: self.included_symbols,
      warnings: self.warnings,
    }
  }
}
