//! Hook dispatch, plugin caches and the persistent module cache.

mod common;

use std::{
  borrow::Cow,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
};

use async_trait::async_trait;
use bale::{
  CacheSetting, Graph, GraphOptions, HookLoadOutput, HookResolveDynamicImportOutput,
  HookResolveIdOutput, HookTransformOutput, Plugin, PluginContext, SharedPlugin, TransformAsset,
  Warning,
};
use common::{build_with, graph_options, memory_fs, named_entry};

async fn build_with_plugins(
  files: &[(&str, &str)],
  options: GraphOptions,
  plugins: Vec<SharedPlugin>,
) -> bale::BuildResult<bale::BuildOutput> {
  Graph::new(options, plugins, memory_fs(files))?.build(None).await
}

#[derive(Debug)]
struct VirtualConfigPlugin;

#[async_trait]
impl Plugin for VirtualConfigPlugin {
  fn name(&self) -> Cow<'static, str> {
    "virtual-config".into()
  }

  async fn resolve_id(
    &self,
    _ctx: &PluginContext,
    specifier: &str,
    _importer: Option<&str>,
  ) -> anyhow::Result<Option<HookResolveIdOutput>> {
    Ok((specifier == "virtual:config").then(|| HookResolveIdOutput::Id("virtual:config".into())))
  }

  async fn load(
    &self,
    _ctx: &PluginContext,
    id: &str,
  ) -> anyhow::Result<Option<HookLoadOutput>> {
    Ok((id == "virtual:config").then(|| HookLoadOutput {
      code: Some("export const value = 42;".into()),
      scanned: None,
    }))
  }
}

#[tokio::test]
async fn plugins_can_serve_virtual_modules() {
  let output = build_with_plugins(
    &[("/main.js", "import { value } from 'virtual:config';\nexport const out = value;\n")],
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(VirtualConfigPlugin)],
  )
  .await
  .unwrap();

  assert!(output.warnings.is_empty());
  assert!(output.chunks[0].module_ids.contains(&"virtual:config".into()));
}

struct FixedResolver {
  answer: &'static str,
}

#[async_trait]
impl Plugin for FixedResolver {
  fn name(&self) -> Cow<'static, str> {
    "fixed-resolver".into()
  }

  async fn resolve_id(
    &self,
    _ctx: &PluginContext,
    specifier: &str,
    importer: Option<&str>,
  ) -> anyhow::Result<Option<HookResolveIdOutput>> {
    Ok(
      (importer.is_some() && specifier == "pick-me")
        .then(|| HookResolveIdOutput::Id(self.answer.into())),
    )
  }
}

#[tokio::test]
async fn resolve_id_is_first_wins_in_registration_order() {
  let output = build_with_plugins(
    &[
      ("/main.js", "import { v } from 'pick-me';\nexport const out = v;\n"),
      ("/first.js", "export const v = 'first';\n"),
      ("/second.js", "export const v = 'second';\n"),
    ],
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![
      Arc::new(FixedResolver { answer: "/first.js" }),
      Arc::new(FixedResolver { answer: "/second.js" }),
    ],
  )
  .await
  .unwrap();

  assert!(output.module_info("/first.js").is_some());
  assert!(output.module_info("/second.js").is_none());
}

#[derive(Debug)]
struct EmptyLoader;

#[async_trait]
impl Plugin for EmptyLoader {
  fn name(&self) -> Cow<'static, str> {
    "empty-loader".into()
  }

  async fn load(
    &self,
    _ctx: &PluginContext,
    _id: &str,
  ) -> anyhow::Result<Option<HookLoadOutput>> {
    Ok(Some(HookLoadOutput::default()))
  }
}

#[tokio::test]
async fn loader_without_code_is_bad_loader() {
  let error = build_with_plugins(
    &[("/main.js", "export const a = 1;\n")],
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(EmptyLoader)],
  )
  .await
  .unwrap_err();

  assert!(error.codes().contains(&"BAD_LOADER"));
}

#[derive(Debug)]
struct FailingLoader;

#[async_trait]
impl Plugin for FailingLoader {
  fn name(&self) -> Cow<'static, str> {
    "failing-loader".into()
  }

  async fn load(
    &self,
    _ctx: &PluginContext,
    id: &str,
  ) -> anyhow::Result<Option<HookLoadOutput>> {
    if id == "/dep.js" {
      anyhow::bail!("disk on fire");
    }
    Ok(None)
  }
}

#[tokio::test]
async fn load_failures_name_the_module_and_its_importer() {
  let error = build_with_plugins(
    &[
      ("/main.js", "import { d } from './dep.js';\nexport const out = d;\n"),
      ("/dep.js", "export const d = 1;\n"),
    ],
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(FailingLoader)],
  )
  .await
  .unwrap_err();

  let rendered = error.to_string();
  assert!(rendered.contains("Could not load /dep.js"));
  assert!(rendered.contains("imported by"));
  assert!(rendered.contains("disk on fire"));
}

struct CountingTransform {
  calls: Arc<AtomicUsize>,
  uses_custom_cache: bool,
}

#[async_trait]
impl Plugin for CountingTransform {
  fn name(&self) -> Cow<'static, str> {
    "counting-transform".into()
  }

  async fn transform(
    &self,
    _ctx: &PluginContext,
    _code: &str,
    id: &str,
  ) -> anyhow::Result<Option<HookTransformOutput>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(Some(HookTransformOutput {
      code: None,
      scanned: None,
      assets: vec![TransformAsset {
        name: format!("{id}.meta").into(),
        source: "{}".into(),
      }],
      uses_custom_cache: self.uses_custom_cache,
    }))
  }
}

#[tokio::test]
async fn warm_cache_skips_transform_and_reemits_assets() {
  let files: &[(&str, &str)] = &[("/main.js", "export const a = 1;\n")];
  let calls = Arc::new(AtomicUsize::new(0));

  let first = build_with_plugins(
    files,
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(CountingTransform { calls: Arc::clone(&calls), uses_custom_cache: false })],
  )
  .await
  .unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(first.assets.len(), 1);

  let warm = GraphOptions {
    cache: Some(CacheSetting::Warm(first.cache)),
    ..graph_options(vec![named_entry("main", "./main.js")])
  };
  let second = build_with_plugins(
    files,
    warm,
    vec![Arc::new(CountingTransform { calls: Arc::clone(&calls), uses_custom_cache: false })],
  )
  .await
  .unwrap();

  // Byte-identical source: the cached module is reused verbatim and its
  // transform assets re-emitted.
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(second.assets, first.assets);
  assert_eq!(second.chunks, first.chunks);
}

#[tokio::test]
async fn custom_transform_cache_disables_module_reuse() {
  let files: &[(&str, &str)] = &[("/main.js", "export const a = 1;\n")];
  let calls = Arc::new(AtomicUsize::new(0));

  let first = build_with_plugins(
    files,
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(CountingTransform { calls: Arc::clone(&calls), uses_custom_cache: true })],
  )
  .await
  .unwrap();

  let warm = GraphOptions {
    cache: Some(CacheSetting::Warm(first.cache)),
    ..graph_options(vec![named_entry("main", "./main.js")])
  };
  build_with_plugins(
    files,
    warm,
    vec![Arc::new(CountingTransform { calls: Arc::clone(&calls), uses_custom_cache: true })],
  )
  .await
  .unwrap();

  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

struct PluginCacheUser {
  observed: Arc<Mutex<Option<serde_json::Value>>>,
}

#[async_trait]
impl Plugin for PluginCacheUser {
  fn name(&self) -> Cow<'static, str> {
    "cache-user".into()
  }

  async fn transform(
    &self,
    ctx: &PluginContext,
    _code: &str,
    _id: &str,
  ) -> anyhow::Result<Option<HookTransformOutput>> {
    if let Some(previous) = ctx.cache_get("build-stamp") {
      *self.observed.lock().unwrap() = Some(previous);
    }
    ctx.cache_set("build-stamp", serde_json::json!("stamped"));
    Ok(None)
  }
}

#[tokio::test]
async fn plugin_cache_round_trips_between_builds() {
  let files: &[(&str, &str)] = &[("/main.js", "export const a = 1;\n")];
  let observed = Arc::new(Mutex::new(None));

  let first = build_with_plugins(
    files,
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(PluginCacheUser { observed: Arc::clone(&observed) })],
  )
  .await
  .unwrap();
  assert!(observed.lock().unwrap().is_none());

  // The cached module skips `transform` on the second build, so disable
  // the module cache path by changing the source a byte.
  let files_changed: &[(&str, &str)] = &[("/main.js", "export const a = 2;\n")];
  let warm = GraphOptions {
    cache: Some(CacheSetting::Warm(first.cache)),
    ..graph_options(vec![named_entry("main", "./main.js")])
  };
  build_with_plugins(
    files_changed,
    warm,
    vec![Arc::new(PluginCacheUser { observed: Arc::clone(&observed) })],
  )
  .await
  .unwrap();

  assert_eq!(*observed.lock().unwrap(), Some(serde_json::json!("stamped")));
}

#[derive(Debug)]
struct DynamicRouter;

#[async_trait]
impl Plugin for DynamicRouter {
  fn name(&self) -> Cow<'static, str> {
    "dynamic-router".into()
  }

  async fn resolve_dynamic_import(
    &self,
    _ctx: &PluginContext,
    specifier: &str,
    _importer: &str,
  ) -> anyhow::Result<Option<HookResolveDynamicImportOutput>> {
    match specifier {
      "routeTarget" => Ok(Some(HookResolveDynamicImportOutput::Id("/route.js".into()))),
      "remote" => Ok(Some(HookResolveDynamicImportOutput::Replacement(
        "loadRemote()".into(),
      ))),
      "explodes" => anyhow::bail!("resolver crashed"),
      _ => Ok(None),
    }
  }
}

#[tokio::test]
async fn dynamic_import_hooks_route_replace_and_swallow() {
  let output = build_with_plugins(
    &[
      (
        "/main.js",
        "export const m = 1;\nimport(routeTarget);\nimport(remote);\nimport(explodes);\n",
      ),
      ("/route.js", "export const route = 'found';\nconsole.log(route);\n"),
    ],
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(DynamicRouter)],
  )
  .await
  .unwrap();

  // Routed target becomes a dynamic entry chunk; the replacement and the
  // crashing site resolve to nothing, and the failure stays silent.
  assert!(output.chunk("route").is_some());
  assert_eq!(output.module_info("/main.js").unwrap().dynamically_imported_ids, ["/route.js"]);
}

#[derive(Debug)]
struct ExternalizingEntry;

#[async_trait]
impl Plugin for ExternalizingEntry {
  fn name(&self) -> Cow<'static, str> {
    "externalizing-entry".into()
  }

  async fn resolve_id(
    &self,
    _ctx: &PluginContext,
    _specifier: &str,
    importer: Option<&str>,
  ) -> anyhow::Result<Option<HookResolveIdOutput>> {
    Ok(importer.is_none().then_some(HookResolveIdOutput::External))
  }
}

#[tokio::test]
async fn external_entry_is_rejected() {
  let error = build_with_plugins(
    &[("/main.js", "export const a = 1;\n")],
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(ExternalizingEntry)],
  )
  .await
  .unwrap_err();

  assert!(error.codes().contains(&"INVALID_EXTERNAL_ID"));
}

#[derive(Debug)]
struct AliasToInternal;

#[async_trait]
impl Plugin for AliasToInternal {
  fn name(&self) -> Cow<'static, str> {
    "alias-to-internal".into()
  }

  async fn resolve_id(
    &self,
    _ctx: &PluginContext,
    specifier: &str,
    _importer: Option<&str>,
  ) -> anyhow::Result<Option<HookResolveIdOutput>> {
    Ok((specifier == "b-as-external").then_some(HookResolveIdOutput::Resolved {
      id: "/b.js".into(),
      external: true,
    }))
  }
}

#[tokio::test]
async fn marking_a_loaded_module_external_is_fatal() {
  let error = build_with_plugins(
    &[
      (
        "/main.js",
        "import { b } from './b.js';\nimport { c } from 'b-as-external';\nexport const out = b + c;\n",
      ),
      ("/b.js", "export const b = 1;\nexport const c = 2;\n"),
    ],
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::new(AliasToInternal)],
  )
  .await
  .unwrap_err();

  assert!(error.codes().contains(&"INVALID_EXTERNAL_ID"));
}

#[tokio::test]
async fn shim_missing_exports_substitutes_a_binding() {
  let options = GraphOptions {
    shim_missing_exports: Some(true),
    ..graph_options(vec![named_entry("main", "./main.js")])
  };
  let output = build_with(
    &[
      ("/main.js", "import { ghost } from './lib.js';\nexport const out = ghost;\n"),
      ("/lib.js", "export const real = 1;\n"),
    ],
    options,
  )
  .await
  .unwrap();

  assert!(output.warnings.is_empty(), "shimmed import must not warn: {:?}", output.warnings);
}

#[tokio::test]
async fn top_level_await_requires_the_experimental_flag() {
  let files: &[(&str, &str)] = &[("/main.js", "export const a = 1;\nawait setup();\n")];

  let error = build_with(files, graph_options(vec![named_entry("main", "./main.js")]))
    .await
    .unwrap_err();
  assert!(error.codes().contains(&"PARSE_ERROR"));

  let options = GraphOptions {
    experimental_top_level_await: Some(true),
    ..graph_options(vec![named_entry("main", "./main.js")])
  };
  assert!(build_with(files, options).await.is_ok());
}

#[tokio::test]
async fn on_warn_takes_over_warning_delivery() {
  let seen: Arc<Mutex<Vec<Warning>>> = Arc::new(Mutex::new(Vec::new()));
  let sink = Arc::clone(&seen);
  let options = GraphOptions {
    on_warn: Some(Box::new(move |warning| sink.lock().unwrap().push(warning.clone()))),
    ..graph_options(vec![named_entry("main", "./main.js")])
  };

  let output = build_with(
    &[
      ("/main.js", "import { nope } from './lib.js';\nexport const out = nope;\n"),
      ("/lib.js", "export const real = 1;\n"),
    ],
    options,
  )
  .await
  .unwrap();

  assert!(output.warnings.is_empty());
  assert_eq!(seen.lock().unwrap().len(), 1);
}

#[derive(Debug, Default)]
struct ChangeRecorder {
  changes: Mutex<Vec<String>>,
}

#[async_trait]
impl Plugin for ChangeRecorder {
  fn name(&self) -> Cow<'static, str> {
    "change-recorder".into()
  }

  async fn watch_change(&self, _ctx: &PluginContext, id: &str) -> anyhow::Result<()> {
    self.changes.lock().unwrap().push(id.to_string());
    Ok(())
  }
}

#[tokio::test]
async fn watch_change_reaches_every_plugin() {
  let recorder = Arc::new(ChangeRecorder::default());
  let graph = Graph::new(
    graph_options(vec![named_entry("main", "./main.js")]),
    vec![Arc::clone(&recorder) as SharedPlugin],
    memory_fs(&[("/main.js", "export const a = 1;\n")]),
  )
  .unwrap();

  graph.on_change("/main.js").await;
  assert_eq!(*recorder.changes.lock().unwrap(), ["/main.js"]);
}
