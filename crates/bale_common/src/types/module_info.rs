use arcstr::ArcStr;

/// Public per-module summary included in the build output, mirroring what
/// embedders and plugins are allowed to know about the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
  pub id: ArcStr,
  pub is_entry: bool,
  pub is_external: bool,
  /// External module consumed as a whole namespace (dynamic import or
  /// `import * as`).
  pub exports_namespace: bool,
  pub is_included: bool,
  pub importers: Vec<ArcStr>,
  pub dynamic_importers: Vec<ArcStr>,
  pub imported_ids: Vec<ArcStr>,
  pub dynamically_imported_ids: Vec<ArcStr>,
}
