use std::sync::Arc;

use bale_common::BuildCache;
use tokio::sync::mpsc::Sender;

use crate::{
  module_loader::ModuleLoaderMsg,
  plugin_driver::PluginDriver,
  types::{SharedFs, SharedOptions},
};

/// State shared by every spawned module task.
pub struct TaskContext {
  pub fs: SharedFs,
  pub options: SharedOptions,
  pub plugin_driver: Arc<PluginDriver>,
  /// The previous build's module cache, if any. Read-only during a build.
  pub cache: Arc<BuildCache>,
  pub tx: Sender<ModuleLoaderMsg>,
}
