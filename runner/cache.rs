// Copyright 2026 the user-code runner authors. MIT license.

//! Keyed storage for compilation results. Both outcomes are cached, so
//! recompiling a known-bad program is a pure lookup. Stores may be shared
//! across concurrent calls: entries are compute-once, and a racing double
//! compute is idempotent.

use parking_lot::Mutex;
use ring::digest;
use std::collections::HashMap;
use std::fmt::Write;
use std::time::Duration;
use std::time::Instant;

use crate::diagnostics::UserCodeError;
use crate::program::CompilationArtifacts;

/// A cached compilation: artifacts on success, the diagnostic list on
/// failure.
pub type CacheEntry = Result<CompilationArtifacts, Vec<UserCodeError>>;

const KEY_SEPARATOR: &[u8] = b"\x01";

/// SHA-1 over every input that can change the compilation outcome, as a
/// lowercase hex string.
pub fn cache_key(
  user_source: &str,
  return_type: &str,
  arg_types: &[String],
  aux_texts: &[&str],
) -> String {
  let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
  ctx.update(user_source.as_bytes());
  ctx.update(KEY_SEPARATOR);
  ctx.update(return_type.as_bytes());
  ctx.update(KEY_SEPARATOR);
  for (i, arg) in arg_types.iter().enumerate() {
    if i > 0 {
      ctx.update(KEY_SEPARATOR);
    }
    ctx.update(arg.as_bytes());
  }
  ctx.update(KEY_SEPARATOR);
  for (i, text) in aux_texts.iter().enumerate() {
    if i > 0 {
      ctx.update(KEY_SEPARATOR);
    }
    ctx.update(text.as_bytes());
  }
  let digest = ctx.finish();
  let mut out = String::new();
  for byte in digest.as_ref() {
    write!(&mut out, "{:02x}", byte).unwrap();
  }
  out
}

/// A pluggable key-to-result store.
pub trait CacheStore {
  fn has(&self, key: &str) -> bool;
  fn get(&self, key: &str) -> Option<CacheEntry>;
  fn set(&self, key: &str, entry: CacheEntry);
}

/// Unbounded store, suitable for tests and short-lived embedders.
#[derive(Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl CacheStore for MemoryCache {
  fn has(&self, key: &str) -> bool {
    self.entries.lock().contains_key(key)
  }

  fn get(&self, key: &str) -> Option<CacheEntry> {
    self.entries.lock().get(key).cloned()
  }

  fn set(&self, key: &str, entry: CacheEntry) {
    self.entries.lock().insert(key.to_string(), entry);
  }
}

struct Slot {
  entry: CacheEntry,
  stored: Instant,
  last_used: u64,
}

struct LruTtlInner {
  slots: HashMap<String, Slot>,
  tick: u64,
}

/// The default store: least-recently-used eviction bounded by `capacity`,
/// plus a per-entry time-to-live checked on probe.
pub struct LruTtlCache {
  capacity: usize,
  ttl: Duration,
  inner: Mutex<LruTtlInner>,
}

impl LruTtlCache {
  pub fn new(capacity: usize, ttl: Duration) -> Self {
    assert!(capacity > 0, "cache capacity must be non-zero");
    Self {
      capacity,
      ttl,
      inner: Mutex::new(LruTtlInner {
        slots: HashMap::new(),
        tick: 0,
      }),
    }
  }

  pub fn len(&self) -> usize {
    self.inner.lock().slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for LruTtlCache {
  fn default() -> Self {
    Self::new(64, Duration::from_secs(30 * 60))
  }
}

impl CacheStore for LruTtlCache {
  fn has(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  fn get(&self, key: &str) -> Option<CacheEntry> {
    let mut inner = self.inner.lock();
    let expired = match inner.slots.get(key) {
      None => return None,
      Some(slot) => slot.stored.elapsed() > self.ttl,
    };
    if expired {
      inner.slots.remove(key);
      return None;
    }
    inner.tick += 1;
    let tick = inner.tick;
    let slot = inner.slots.get_mut(key).unwrap();
    slot.last_used = tick;
    Some(slot.entry.clone())
  }

  fn set(&self, key: &str, entry: CacheEntry) {
    let mut inner = self.inner.lock();
    inner.tick += 1;
    let tick = inner.tick;
    if !inner.slots.contains_key(key) && inner.slots.len() >= self.capacity {
      if let Some(evict) = inner
        .slots
        .iter()
        .min_by_key(|(_, slot)| slot.last_used)
        .map(|(k, _)| k.clone())
      {
        inner.slots.remove(&evict);
      }
    }
    inner.slots.insert(
      key.to_string(),
      Slot {
        entry,
        stored: Instant::now(),
        last_used: tick,
      },
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::diagnostics::Location;

  fn failed(message: &str) -> CacheEntry {
    Err(vec![UserCodeError::new(
      message,
      "at (1:1)",
      Location::new(1, 1),
    )])
  }

  #[test]
  fn key_is_stable_and_input_sensitive() {
    let args = vec!["string".to_string()];
    let base = cache_key("export default 1;", "number", &args, &[]);
    assert_eq!(base, cache_key("export default 1;", "number", &args, &[]));
    assert_eq!(base.len(), 40);

    assert_ne!(base, cache_key("export default 2;", "number", &args, &[]));
    assert_ne!(base, cache_key("export default 1;", "string", &args, &[]));
    assert_ne!(base, cache_key("export default 1;", "number", &[], &[]));
    assert_ne!(
      base,
      cache_key("export default 1;", "number", &args, &["export {};"])
    );
  }

  #[test]
  fn key_separates_adjacent_segments() {
    // "ab" + "" must not collide with "a" + "b".
    let a = cache_key("ab", "", &[], &[]);
    let b = cache_key("a", "b", &[], &[]);
    assert_ne!(a, b);

    let c = cache_key("", "", &["ab".to_string(), "c".to_string()], &[]);
    let d = cache_key("", "", &["a".to_string(), "bc".to_string()], &[]);
    assert_ne!(c, d);
  }

  #[test]
  fn memory_cache_round_trips_failures() {
    let cache = MemoryCache::new();
    assert!(!cache.has("k"));
    cache.set("k", failed("TypeError: TS1192 No default export."));
    assert!(cache.has("k"));
    let entry = cache.get("k").unwrap();
    assert_eq!(
      entry.unwrap_err()[0].message,
      "TypeError: TS1192 No default export."
    );
  }

  #[test]
  fn lru_evicts_the_least_recently_used() {
    let cache = LruTtlCache::new(2, Duration::from_secs(60));
    cache.set("a", failed("a"));
    cache.set("b", failed("b"));
    // Touch "a" so "b" becomes the eviction candidate.
    assert!(cache.get("a").is_some());
    cache.set("c", failed("c"));
    assert_eq!(cache.len(), 2);
    assert!(cache.has("a"));
    assert!(!cache.has("b"));
    assert!(cache.has("c"));
  }

  #[test]
  fn ttl_expires_entries_on_probe() {
    let cache = LruTtlCache::new(4, Duration::from_millis(1));
    cache.set("k", failed("k"));
    std::thread::sleep(Duration::from_millis(10));
    assert!(cache.get("k").is_none());
    assert!(cache.is_empty());
  }
}
