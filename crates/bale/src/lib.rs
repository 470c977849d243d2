mod generate_stage;
mod graph;
mod link_stage;
mod module_loader;
mod plugin_driver;
mod utils;

pub(crate) mod types;

pub use crate::{graph::Graph, plugin_driver::PluginDriver};
pub use bale_common::*;
pub use bale_error::{BuildDiagnostic, BuildError, BuildResult};
