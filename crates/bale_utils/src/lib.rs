pub mod ecmascript;
pub mod entry_hash;
pub mod indexmap;
pub mod path_ext;
