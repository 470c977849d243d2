use arcstr::ArcStr;
use rustc_hash::FxHashMap;

use crate::ScannedModule;

/// An asset emitted while transforming a module. Re-emitted verbatim when
/// the module is served from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformAsset {
  pub name: ArcStr,
  pub source: ArcStr,
}

/// Saved state of one loaded module. Reused by a later build only when the
/// freshly loaded code is byte-identical to `original_code` and the module
/// was not transformed through a plugin-managed cache.
#[derive(Debug, Clone)]
pub struct CachedModule {
  pub id: ArcStr,
  pub original_code: ArcStr,
  pub code: ArcStr,
  pub scanned: ScannedModule,
  pub transform_assets: Vec<TransformAsset>,
  pub custom_transform_cache: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
  /// Builds since last access. Reset on every read, pre-incremented when
  /// the cache is handed back at end of build.
  pub access_count: u32,
  pub value: serde_json::Value,
}

/// Per-plugin key/value store carried between builds.
#[derive(Debug, Clone, Default)]
pub struct PluginCache {
  namespaces: FxHashMap<String, FxHashMap<String, CacheEntry>>,
}

impl PluginCache {
  pub fn get(&mut self, plugin: &str, key: &str) -> Option<serde_json::Value> {
    let entry = self.namespaces.get_mut(plugin)?.get_mut(key)?;
    entry.access_count = 0;
    Some(entry.value.clone())
  }

  pub fn set(&mut self, plugin: &str, key: impl Into<String>, value: serde_json::Value) {
    self
      .namespaces
      .entry(plugin.to_owned())
      .or_default()
      .insert(key.into(), CacheEntry { access_count: 0, value });
  }

  pub fn has(&self, plugin: &str, key: &str) -> bool {
    self.namespaces.get(plugin).is_some_and(|ns| ns.contains_key(key))
  }

  /// End-of-build sweep: every counter is incremented, entries that went
  /// `expiry` builds without a read are dropped, and plugin namespaces
  /// left empty disappear.
  pub fn expire(&mut self, expiry: u32) {
    for namespace in self.namespaces.values_mut() {
      namespace.retain(|_, entry| {
        entry.access_count += 1;
        entry.access_count < expiry
      });
    }
    self.namespaces.retain(|_, namespace| !namespace.is_empty());
  }

  pub fn is_empty(&self) -> bool {
    self.namespaces.is_empty()
  }
}

/// Everything a build hands to its successor: loaded modules plus the
/// plugin key/value stores.
#[derive(Debug, Clone, Default)]
pub struct BuildCache {
  pub modules: Vec<CachedModule>,
  pub plugins: PluginCache,
}

impl BuildCache {
  pub fn module(&self, id: &str) -> Option<&CachedModule> {
    self.modules.iter().find(|module| module.id == id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_resets_access_count() {
    let mut cache = PluginCache::default();
    cache.set("alpha", "k", serde_json::json!(1));

    cache.expire(10);
    assert!(cache.get("alpha", "k").is_some());

    // Untouched entries die after `expiry` sweeps.
    for _ in 0..10 {
      cache.expire(10);
    }
    assert!(cache.get("alpha", "k").is_none());
    assert!(cache.is_empty());
  }

  #[test]
  fn touched_entries_survive() {
    let mut cache = PluginCache::default();
    cache.set("alpha", "k", serde_json::json!("v"));
    for _ in 0..20 {
      cache.expire(2);
      assert!(cache.get("alpha", "k").is_some());
    }
  }
}
