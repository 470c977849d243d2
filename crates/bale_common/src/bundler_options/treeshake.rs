/// Tree-shaking knobs. `treeshake: false` maps to `None` at the
/// normalized level.
#[derive(Debug, Clone)]
pub struct TreeshakeOptions {
  /// Honor `/*#__PURE__*/` annotations when classifying side effects.
  pub annotations: bool,
  /// Treat bare property reads as side effects when `true`.
  pub property_read_side_effects: bool,
  /// External ids whose plain imports can be dropped entirely.
  pub pure_external_modules: Vec<String>,
}

impl Default for TreeshakeOptions {
  fn default() -> Self {
    Self { annotations: true, property_read_side_effects: true, pure_external_modules: Vec::new() }
  }
}
