#![allow(dead_code)]

use std::sync::Arc;

use bale::{BuildOutput, BuildResult, Graph, GraphOptions, InputItem};
use bale_fs::MemoryFileSystem;

pub fn memory_fs(files: &[(&str, &str)]) -> Arc<MemoryFileSystem> {
  Arc::new(MemoryFileSystem::new(files.iter().map(|(path, source)| (*path, *source))))
}

pub fn graph_options(input: Vec<InputItem>) -> GraphOptions {
  GraphOptions { cwd: Some("/".into()), input, ..GraphOptions::default() }
}

pub async fn build(files: &[(&str, &str)], input: Vec<InputItem>) -> BuildResult<BuildOutput> {
  build_with(files, graph_options(input)).await
}

pub async fn build_with(files: &[(&str, &str)], options: GraphOptions) -> BuildResult<BuildOutput> {
  Graph::new(options, Vec::new(), memory_fs(files))?.build(None).await
}

#[allow(unused)]
pub fn entry(import: &str) -> Vec<InputItem> {
  vec![InputItem::from(import)]
}

#[allow(unused)]
pub fn named_entry(name: &str, import: &str) -> InputItem {
  InputItem::named(name, import)
}
