//! End-to-end scenarios over the in-memory file system: graph shapes,
//! warnings, tree-shaking and chunk partitions.

mod common;

use bale::{Graph, GraphOptions, IsExternal, WarningCode};
use bale_utils::indexmap::FxIndexMap;
use common::{build, build_with, graph_options, memory_fs, named_entry};

#[tokio::test]
async fn linear_chain_produces_one_ordered_chunk() {
  let output = build(
    &[
      ("/a.js", "import { b } from './b.js';\nexport const a = b + 1;\nconsole.log(a);\n"),
      ("/b.js", "import { c } from './c.js';\nexport const b = c * 2;\n"),
      ("/c.js", "export const c = 1;\n"),
    ],
    vec![named_entry("main", "./a.js")],
  )
  .await
  .unwrap();

  assert!(output.warnings.is_empty(), "unexpected warnings: {:?}", output.warnings);
  assert_eq!(output.chunks.len(), 1);

  let chunk = &output.chunks[0];
  assert_eq!(chunk.name, "main");
  assert!(chunk.is_entry);
  assert_eq!(chunk.module_ids, ["/c.js", "/b.js", "/a.js"]);
}

#[tokio::test]
async fn diamond_splits_shared_code_into_its_own_chunk() {
  let output = build(
    &[
      ("/x.js", "import { shared } from './shared.js';\nexport const x = shared + 1;\n"),
      ("/y.js", "import { shared } from './shared.js';\nexport const y = shared + 2;\n"),
      ("/shared.js", "export const shared = 40;\n"),
    ],
    vec![named_entry("x", "./x.js"), named_entry("y", "./y.js")],
  )
  .await
  .unwrap();

  assert_eq!(output.chunks.len(), 3);

  let x = output.chunk("x").unwrap();
  let y = output.chunk("y").unwrap();
  assert_eq!(x.module_ids, ["/x.js"]);
  assert_eq!(y.module_ids, ["/y.js"]);

  let shared = output
    .chunks
    .iter()
    .find(|chunk| chunk.module_ids == ["/shared.js"])
    .expect("shared chunk exists");
  assert!(!shared.is_entry);
  assert!(shared.exports.iter().any(|name| name == "shared"));
  assert!(x.imports.contains(&shared.name));
  assert!(y.imports.contains(&shared.name));
}

#[tokio::test]
async fn cycle_warns_once_and_still_builds() {
  let output = build(
    &[
      ("/a.js", "import { b } from './b.js';\nexport const a = 1;\nconsole.log(b);\n"),
      ("/b.js", "import { a } from './a.js';\nexport const b = a + 1;\n"),
    ],
    vec![named_entry("main", "./a.js")],
  )
  .await
  .unwrap();

  let circular: Vec<_> = output
    .warnings
    .iter()
    .filter(|warning| warning.code == WarningCode::CircularDependency)
    .collect();
  assert_eq!(circular.len(), 1);
  assert_eq!(circular[0].message, "Circular dependency: a.js -> b.js -> a.js");

  assert_eq!(output.chunks.len(), 1);
  assert_eq!(output.chunks[0].module_ids.len(), 2);
}

#[tokio::test]
async fn missing_export_warns_and_builds() {
  let output = build(
    &[
      ("/a.js", "import { foo } from './b.js';\nexport const a = foo;\n"),
      ("/b.js", "export const bar = 1;\n"),
    ],
    vec![named_entry("main", "./a.js")],
  )
  .await
  .unwrap();

  let missing: Vec<_> = output
    .warnings
    .iter()
    .filter(|warning| warning.code == WarningCode::NonExistentExport)
    .collect();
  assert_eq!(missing.len(), 1);
  assert!(missing[0].message.contains("'foo'"));
  assert!(missing[0].message.contains("b.js"));
}

#[tokio::test]
async fn export_star_conflict_warns_and_first_source_wins() {
  let output = build(
    &[
      ("/a.js", "export * from './b.js';\nexport * from './c.js';\n"),
      ("/b.js", "export const x = 1;\n"),
      ("/c.js", "export const x = 2;\n"),
    ],
    vec![named_entry("main", "./a.js")],
  )
  .await
  .unwrap();

  let conflicts: Vec<_> = output
    .warnings
    .iter()
    .filter(|warning| warning.code == WarningCode::NamespaceConflict)
    .collect();
  assert_eq!(conflicts.len(), 1);
  assert!(conflicts[0].message.contains("'x'"));
  assert!(conflicts[0].message.contains("/b.js"));
  assert!(conflicts[0].message.contains("/c.js"));

  // First-seen binding wins: `x` resolves into b.js, so c.js contributes
  // nothing and is shaken away entirely.
  let chunk = &output.chunks[0];
  assert!(chunk.exports.iter().any(|name| name == "x"));
  assert!(chunk.module_ids.contains(&"/b.js".into()));
  assert!(!chunk.module_ids.contains(&"/c.js".into()));
}

#[tokio::test]
async fn unresolved_relative_import_is_fatal() {
  let error = build(
    &[("/a.js", "import { gone } from './missing.js';\nexport const a = gone;\n")],
    vec![named_entry("main", "./a.js")],
  )
  .await
  .unwrap_err();

  assert!(error.codes().contains(&"UNRESOLVED_IMPORT"));
}

#[tokio::test]
async fn unresolved_bare_import_warns_and_goes_external() {
  let output = build(
    &[("/a.js", "import { left } from 'leftpad';\nexport const a = left;\n")],
    vec![named_entry("main", "./a.js")],
  )
  .await
  .unwrap();

  let unresolved: Vec<_> = output
    .warnings
    .iter()
    .filter(|warning| warning.code == WarningCode::UnresolvedImport)
    .collect();
  assert_eq!(unresolved.len(), 1);
  assert!(unresolved[0].message.contains("leftpad"));

  let external = output.module_info("leftpad").unwrap();
  assert!(external.is_external);
  assert!(output.chunks[0].imports.contains(&"leftpad".into()));
}

#[tokio::test]
async fn external_list_suppresses_the_warning() {
  let options = GraphOptions {
    external: Some(IsExternal::from_list(["lodash"])),
    ..graph_options(vec![named_entry("main", "./a.js")])
  };
  let output = build_with(
    &[("/a.js", "import { map } from 'lodash';\nexport const a = map;\n")],
    options,
  )
  .await
  .unwrap();

  assert!(output.warnings.is_empty());
  assert!(output.module_info("lodash").unwrap().is_external);
}

#[tokio::test]
async fn tree_shaking_drops_unreferenced_pure_modules() {
  let output = build(
    &[
      ("/main.js", "import { used } from './util.js';\nexport const result = used();\n"),
      (
        "/util.js",
        "import { dead } from './dead.js';\nexport const used = () => 1;\nexport const other = dead;\n",
      ),
      ("/dead.js", "export const dead = 'never needed';\n"),
    ],
    vec![named_entry("main", "./main.js")],
  )
  .await
  .unwrap();

  let chunk = &output.chunks[0];
  assert!(chunk.module_ids.contains(&"/util.js".into()));
  assert!(!chunk.module_ids.contains(&"/dead.js".into()));
  assert!(!output.module_info("/dead.js").unwrap().is_included);
}

#[tokio::test]
async fn disabling_tree_shaking_keeps_everything() {
  let options = GraphOptions {
    treeshake: Some(None),
    ..graph_options(vec![named_entry("main", "./main.js")])
  };
  let output = build_with(
    &[
      ("/main.js", "import { used } from './util.js';\nexport const result = used();\n"),
      (
        "/util.js",
        "import { dead } from './dead.js';\nexport const used = () => 1;\nexport const other = dead;\n",
      ),
      ("/dead.js", "export const dead = 'never needed';\n"),
    ],
    options,
  )
  .await
  .unwrap();

  assert!(output.chunks[0].module_ids.contains(&"/dead.js".into()));
}

#[tokio::test]
async fn namespace_import_keeps_the_whole_surface() {
  let output = build(
    &[
      ("/main.js", "import * as lib from './lib.js';\nconsole.log(lib.x);\n"),
      ("/lib.js", "export const x = 1;\nexport const y = 2;\n"),
    ],
    vec![named_entry("main", "./main.js")],
  )
  .await
  .unwrap();

  assert!(output.module_info("/lib.js").unwrap().is_included);
  assert!(output.chunks[0].module_ids.contains(&"/lib.js".into()));
}

#[tokio::test]
async fn dynamic_import_becomes_its_own_entry_chunk() {
  let output = build(
    &[
      ("/a.js", "export const a = 1;\nimport('./lazy.js');\n"),
      ("/lazy.js", "export const lazy = 2;\nconsole.log('lazy');\n"),
    ],
    vec![named_entry("main", "./a.js")],
  )
  .await
  .unwrap();

  assert_eq!(output.chunks.len(), 2);
  let lazy = output.chunk("lazy").expect("dynamic entry chunk");
  assert!(lazy.is_entry);
  assert_eq!(lazy.module_ids, ["/lazy.js"]);

  let main = output.module_info("/a.js").unwrap();
  assert_eq!(main.dynamically_imported_ids, ["/lazy.js"]);
  assert_eq!(output.module_info("/lazy.js").unwrap().dynamic_importers, ["/a.js"]);
}

#[tokio::test]
async fn dynamic_import_of_external_registers_the_external_module() {
  let options = GraphOptions {
    external: Some(IsExternal::from_list(["lodash"])),
    ..graph_options(vec![named_entry("main", "./a.js")])
  };
  let output = build_with(
    &[("/a.js", "export const a = 1;\nconst p = import('lodash');\nconsole.log(p, a);\n")],
    options,
  )
  .await
  .unwrap();

  // The external id maps to the external module; the importer keeps its
  // own slot under its own id.
  let external = output.module_info("lodash").unwrap();
  assert!(external.is_external);
  assert!(external.exports_namespace);

  let importer = output.module_info("/a.js").unwrap();
  assert!(!importer.is_external);
  assert_eq!(importer.dynamically_imported_ids, ["lodash"]);
}

#[tokio::test]
async fn inline_dynamic_imports_collapses_to_a_single_chunk() {
  let options = GraphOptions {
    inline_dynamic_imports: Some(true),
    ..graph_options(vec![named_entry("main", "./a.js")])
  };
  let output = build_with(
    &[
      ("/a.js", "export const a = 1;\nimport('./lazy.js');\n"),
      ("/lazy.js", "console.log('lazy');\n"),
    ],
    options,
  )
  .await
  .unwrap();

  assert_eq!(output.chunks.len(), 1);
  assert!(output.chunks[0].module_ids.contains(&"/lazy.js".into()));
}

#[tokio::test]
async fn inline_dynamic_imports_rejects_multiple_entries() {
  let options = GraphOptions {
    inline_dynamic_imports: Some(true),
    ..graph_options(vec![named_entry("x", "./x.js"), named_entry("y", "./y.js")])
  };
  let error = build_with(
    &[("/x.js", "export const x = 1;\n"), ("/y.js", "export const y = 2;\n")],
    options,
  )
  .await
  .unwrap_err();

  assert!(error.codes().contains(&"INVALID_OPTIONS"));
}

#[tokio::test]
async fn preserve_modules_emits_one_chunk_per_module() {
  let options = GraphOptions {
    preserve_modules: Some(true),
    ..graph_options(vec![named_entry("main", "./a.js")])
  };
  let output = build_with(
    &[
      ("/a.js", "import { b } from './b.js';\nexport const a = b;\n"),
      ("/b.js", "export const b = 1;\n"),
    ],
    options,
  )
  .await
  .unwrap();

  assert_eq!(output.chunks.len(), 2);
  for chunk in &output.chunks {
    assert_eq!(chunk.module_ids.len(), 1);
  }
  assert!(output.chunk("main").unwrap().is_entry);
}

#[tokio::test]
async fn manual_chunks_override_colouring() {
  let mut manual = FxIndexMap::default();
  manual.insert("vendor".to_string(), vec!["./vendor.js".to_string()]);

  let files: &[(&str, &str)] = &[
    ("/main.js", "import { v } from './vendor.js';\nexport const main = v;\n"),
    ("/vendor.js", "export const v = 'lib';\n"),
  ];
  let output = Graph::new(
    graph_options(vec![named_entry("main", "./main.js")]),
    Vec::new(),
    memory_fs(files),
  )
  .unwrap()
  .build(Some(manual))
  .await
  .unwrap();

  assert_eq!(output.chunks.len(), 2);
  let vendor = output.chunk("vendor").expect("manual chunk");
  assert!(vendor.is_manual);
  assert_eq!(vendor.module_ids, ["/vendor.js"]);
  assert!(output.chunk("main").unwrap().imports.contains(&"vendor".into()));
}

#[tokio::test]
async fn entries_sharing_a_chunk_get_a_facade() {
  let output = build(
    &[
      ("/one.js", "import { two } from './two.js';\nexport const one = 1;\nconsole.log(two);\n"),
      ("/two.js", "import { one } from './one.js';\nexport const two = one + 1;\n"),
    ],
    vec![named_entry("one", "./one.js"), named_entry("two", "./two.js")],
  )
  .await
  .unwrap();

  // Both entries collapse into one chunk (mutual cycle, identical
  // colouring); the first-declared entry owns it, the second gets a
  // facade.
  let content = output.chunk("one").expect("dominant entry chunk");
  assert_eq!(content.module_ids.len(), 2);

  let facade = output.chunk("two").expect("facade chunk");
  assert!(facade.module_ids.is_empty());
  assert_eq!(facade.facade_module_id.as_deref(), Some("/two.js"));
  assert!(facade.exports.iter().any(|name| name == "two"));
}

#[tokio::test]
async fn tainted_entry_exports_get_a_facade() {
  let output = build(
    &[
      ("/x.js", "export { shared } from './shared.js';\nexport const x = 1;\n"),
      ("/y.js", "import { shared } from './shared.js';\nexport const y = shared;\n"),
      ("/shared.js", "export const shared = 40;\n"),
    ],
    vec![named_entry("x", "./x.js"), named_entry("y", "./y.js")],
  )
  .await
  .unwrap();

  // x re-exports a binding that lives in the shared chunk, so its surface
  // cannot render verbatim: the filename goes to a facade.
  let facade = output
    .chunks
    .iter()
    .find(|chunk| chunk.facade_module_id.as_deref() == Some("/x.js"))
    .expect("facade for tainted entry");
  assert_eq!(facade.name, "x");
  assert!(facade.module_ids.is_empty());
  assert!(facade.exports.iter().any(|name| name == "shared"));
  assert!(facade.exports.iter().any(|name| name == "x"));
}

#[tokio::test]
async fn duplicate_entry_points_are_fatal() {
  let error = build(
    &[("/a.js", "export const a = 1;\n")],
    vec![named_entry("main", "./a.js"), named_entry("admin", "./a.js")],
  )
  .await
  .unwrap_err();

  assert!(error.codes().contains(&"DUPLICATE_ENTRY_POINTS"));
}

#[tokio::test]
async fn unresolved_entry_is_fatal() {
  let error =
    build(&[], vec![named_entry("main", "./missing.js")]).await.unwrap_err();
  assert!(error.codes().contains(&"UNRESOLVED_ENTRY"));

  let error = build(&[], vec![named_entry("main", "react")]).await.unwrap_err();
  assert!(error.codes().contains(&"UNRESOLVED_ENTRY"));
}

#[tokio::test]
async fn empty_input_is_rejected_up_front() {
  let error = Graph::new(graph_options(Vec::new()), Vec::new(), memory_fs(&[]))
    .err()
    .expect("empty input must fail");
  assert!(error.codes().contains(&"INVALID_OPTIONS"));
}

#[tokio::test]
async fn builds_are_deterministic() {
  let files: &[(&str, &str)] = &[
    ("/x.js", "import { shared } from './shared.js';\nexport const x = shared + 1;\n"),
    ("/y.js", "import { shared } from './shared.js';\nexport const y = shared + 2;\n"),
    ("/shared.js", "export const shared = 40;\nexport const extra = 41;\n"),
  ];
  let input = vec![named_entry("x", "./x.js"), named_entry("y", "./y.js")];

  let first = build(files, input.clone()).await.unwrap();
  let second = build(files, input).await.unwrap();

  assert_eq!(first.chunks, second.chunks);
  assert_eq!(first.module_infos, second.module_infos);
}

#[tokio::test]
async fn reexport_chains_resolve_through_intermediate_modules() {
  let output = build(
    &[
      ("/main.js", "import { value } from './barrel.js';\nexport const out = value;\n"),
      ("/barrel.js", "export { value } from './impl.js';\n"),
      ("/impl.js", "export const value = 7;\n"),
    ],
    vec![named_entry("main", "./main.js")],
  )
  .await
  .unwrap();

  assert!(output.warnings.is_empty(), "unexpected warnings: {:?}", output.warnings);
  assert!(output.module_info("/impl.js").unwrap().is_included);
}
