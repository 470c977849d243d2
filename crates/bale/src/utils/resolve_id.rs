use std::path::Path;

use arcstr::ArcStr;
use bale_common::{HookResolveIdOutput, ResolvedId, Warning, WarningCode};
use bale_error::{BuildDiagnostic, BuildResult};
use bale_utils::path_ext::PathExt;
use sugar_path::SugarPath;

use crate::{plugin_driver::PluginDriver, types::SharedOptions};

pub fn is_relative_specifier(specifier: &str) -> bool {
  specifier.starts_with("./") || specifier.starts_with("../")
}

/// Path-based resolution used when no plugin claims a specifier: relative
/// specifiers join against the importer's directory (or the cwd for
/// entries), absolute specifiers stand alone, bare specifiers stay
/// unresolved. A candidate only resolves if the file exists.
pub fn default_resolve(
  fs: &dyn bale_fs::FileSystem,
  cwd: &Path,
  specifier: &str,
  importer: Option<&str>,
) -> Option<ArcStr> {
  let candidate = if is_relative_specifier(specifier) {
    let base = importer.and_then(|importer| Path::new(importer).parent()).unwrap_or(cwd);
    base.join(specifier).normalize()
  } else if Path::new(specifier).is_absolute() {
    Path::new(specifier).normalize()
  } else {
    return None;
  };

  fs.exists(&candidate).then(|| candidate.expect_to_slash().into())
}

/// Applies the resolution rules for one static dependency: the external
/// predicate runs on the raw specifier first, then the `resolve_id` hook
/// chain, then the default rule for whatever stays unresolved (fatal for
/// relative specifiers, external-with-warning for bare ones).
pub async fn resolve_dependency(
  plugin_driver: &PluginDriver,
  options: &SharedOptions,
  specifier: &ArcStr,
  importer: &str,
) -> BuildResult<(ResolvedId, Option<Warning>)> {
  if options.external.call(specifier, Some(importer), false) {
    return Ok((ResolvedId::external(specifier.clone()), None));
  }

  let resolved = plugin_driver
    .resolve_id(specifier, Some(importer))
    .await
    .map_err(BuildDiagnostic::from)?;

  match resolved {
    Some(HookResolveIdOutput::External) => Ok((ResolvedId::external(specifier.clone()), None)),
    Some(HookResolveIdOutput::Id(id)) => {
      let is_external = options.external.call(&id, Some(importer), true);
      Ok((ResolvedId::new(id, is_external), None))
    }
    Some(HookResolveIdOutput::Resolved { id, external }) => {
      Ok((ResolvedId::new(id, external), None))
    }
    None => {
      if is_relative_specifier(specifier) {
        Err(
          BuildDiagnostic::UnresolvedImport {
            specifier: specifier.to_string(),
            importer: importer.to_string(),
          }
          .into(),
        )
      } else {
        // Unresolvable bare specifier: assume the host environment
        // provides it and keep going.
        let warning = Warning::new(
          WarningCode::UnresolvedImport,
          format!("'{specifier}' is imported by {importer}, but could not be resolved - treating it as an external dependency"),
        )
        .with_id(importer.to_string());
        Ok((ResolvedId::external(specifier.clone()), Some(warning)))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bale_fs::MemoryFileSystem;

  #[test]
  fn relative_resolves_against_importer() {
    let fs = MemoryFileSystem::new([("/src/lib/util.js", "")]);
    let resolved = default_resolve(&fs, Path::new("/src"), "./lib/util.js", Some("/src/main.js"));
    assert_eq!(resolved.as_deref(), Some("/src/lib/util.js"));
  }

  #[test]
  fn missing_file_does_not_resolve() {
    let fs = MemoryFileSystem::default();
    assert!(default_resolve(&fs, Path::new("/src"), "./gone.js", Some("/src/main.js")).is_none());
  }

  #[test]
  fn bare_specifier_is_left_alone() {
    let fs = MemoryFileSystem::new([("/node_modules/lodash.js", "")]);
    assert!(default_resolve(&fs, Path::new("/src"), "lodash", Some("/src/main.js")).is_none());
  }
}
