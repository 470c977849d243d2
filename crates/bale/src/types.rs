use std::sync::Arc;

use bale_common::NormalizedGraphOptions;
use bale_fs::FileSystem;

pub type SharedOptions = Arc<NormalizedGraphOptions>;
pub type SharedFs = Arc<dyn FileSystem>;
