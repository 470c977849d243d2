mod bundler_options;
mod cache;
mod chunk;
mod diagnostic;
mod module;
mod plugin;
mod types;

pub use crate::{
  bundler_options::{
    input_item::InputItem, is_external::IsExternal, treeshake::TreeshakeOptions, CacheSetting,
    GraphOptions, NormalizedGraphOptions, WarnHandler,
  },
  cache::{BuildCache, CachedModule, PluginCache, TransformAsset},
  chunk::{Chunk, ChunkKind, CrossChunkImportItem},
  diagnostic::{Warning, WarningCode},
  module::{external_module::ExternalModule, normal_module::NormalModule, IndexModules, Module},
  plugin::{
    HookLoadOutput, HookResolveDynamicImportOutput, HookResolveIdOutput, HookTransformOutput,
    Plugin, PluginContext, SharedPlugin,
  },
  types::{
    dynamic_import::{DynamicImportDesc, DynamicImportResolution},
    entry_point::{EntryPoint, EntryPointKind},
    import_record::{ImportRecord, ImportRecordMeta, RawImportRecord, ResolvedImportRecord},
    module_id::ModuleId,
    module_info::ModuleInfo,
    named_import::{LocalExport, NamedImport, ReExport, Specifier},
    output_chunk::{BuildOutput, OutputChunk},
    resolved_id::ResolvedId,
    scanned_module::ScannedModule,
    stmt_info::{StmtInfo, StmtInfos},
    symbol_ref::{SymbolData, SymbolRef},
    ChunkIdx, ImportKind, ImportRecordIdx, ImporterRecord, ModuleIdx, StmtInfoIdx, SymbolIdx,
  },
};
