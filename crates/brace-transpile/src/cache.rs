//! Fingerprint-keyed conversion cache.
//!
//! A [`Fingerprint`] is a BLAKE3 hash over the input bytes and a
//! [`ContextKey`], which itself hashes the configuration and the ordered
//! plugin identities. Equal fingerprints mean byte-identical output.
//!
//! Storage is a bounded LRU. [`ConversionCache::get_or_compute`] serializes
//! work per fingerprint through a fixed set of shard locks, so concurrent
//! requests for the same input compute once while unrelated inputs proceed
//! in parallel.
//!
//! The cache can be written to and reloaded from a JSON file, so repeated
//! command-line runs reuse earlier conversions.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::CacheFileError;
use crate::plugin::PluginChain;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

const SHARDS: usize = 16;

fn hash_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Hash of everything besides the input that affects output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextKey([u8; 32]);

impl ContextKey {
    pub fn compute(config: &Config, plugins: &PluginChain) -> Self {
        let mut hasher = blake3::Hasher::new();
        hash_field(&mut hasher, &config.fingerprint_bytes());
        let identity = plugins.identity();
        hasher.update(&(identity.len() as u64).to_le_bytes());
        for (name, version) in &identity {
            hash_field(&mut hasher, name.as_bytes());
            hash_field(&mut hasher, version.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }
}

/// Cache key for one conversion.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn compute(input: &[u8], context: &ContextKey) -> Self {
        let mut hasher = blake3::Hasher::new();
        hash_field(&mut hasher, input);
        hasher.update(&context.0);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    fn shard(&self) -> usize {
        self.0[0] as usize % SHARDS
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex()[..16])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// A stored conversion result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub text: String,
    pub diagnostics: Diagnostics,
    pub created_at: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
    /// Conversions run on misses, successful or not.
    pub computed: u64,
    /// Total time spent in those conversions.
    pub compute_time: Duration,
}

impl CacheStats {
    /// Share of lookups served from the cache, in `0.0..=1.0`.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    pub fn average_compute_time(&self) -> Duration {
        match u32::try_from(self.computed) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.compute_time / n,
            Err(_) => Duration::from_secs_f64(self.compute_time.as_secs_f64() / self.computed as f64),
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "conversions: {}", self.computed)?;
        writeln!(
            f,
            "average conversion time: {:.3} ms",
            self.average_compute_time().as_secs_f64() * 1000.0
        )?;
        writeln!(f, "cache hits: {}", self.hits)?;
        writeln!(f, "cache misses: {}", self.misses)?;
        writeln!(f, "hit rate: {:.1}%", self.hit_rate() * 100.0)?;
        write!(f, "entries: {}/{} ({} evicted)", self.len, self.capacity, self.evictions)
    }
}

/// On-disk form of a cache, most recently used entry first.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    context: Option<ContextKey>,
    entries: Vec<CacheEntry>,
}

/// LRU storage. Front of `order` is the most recently used.
#[derive(Debug, Default)]
struct Lru {
    entries: HashMap<Fingerprint, Arc<CacheEntry>>,
    order: VecDeque<Fingerprint>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    computed: u64,
    compute_time: Duration,
}

impl Lru {
    fn touch(&mut self, fingerprint: Fingerprint) {
        self.order.retain(|f| *f != fingerprint);
        self.order.push_front(fingerprint);
    }

    fn get(&mut self, fingerprint: &Fingerprint) -> Option<Arc<CacheEntry>> {
        match self.entries.get(fingerprint).cloned() {
            Some(entry) => {
                self.hits += 1;
                self.touch(*fingerprint);
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    fn put(&mut self, entry: CacheEntry) -> Arc<CacheEntry> {
        if let Some(existing) = self.entries.get(&entry.fingerprint) {
            return Arc::clone(existing);
        }
        let entry = Arc::new(entry);
        if self.capacity == 0 {
            return entry;
        }
        self.entries.insert(entry.fingerprint, Arc::clone(&entry));
        self.touch(entry.fingerprint);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_back() {
                self.entries.remove(&oldest);
                self.evictions += 1;
            }
        }
        entry
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Thread-safe conversion cache, shared through `Arc`.
#[derive(Debug)]
pub struct ConversionCache {
    lru: Mutex<Lru>,
    shards: [Mutex<()>; SHARDS],
    context: Mutex<Option<ContextKey>>,
}

impl ConversionCache {
    /// A cache holding at most `capacity` entries. Zero disables storage.
    pub fn new(capacity: usize) -> Self {
        Self {
            lru: Mutex::new(Lru {
                capacity,
                ..Lru::default()
            }),
            shards: std::array::from_fn(|_| Mutex::new(())),
            context: Mutex::new(None),
        }
    }

    fn lru(&self) -> MutexGuard<'_, Lru> {
        self.lru.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lru().capacity
    }

    pub fn len(&self) -> usize {
        self.lru().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an entry, refreshing its recency.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<CacheEntry>> {
        self.lru().get(fingerprint)
    }

    /// Store an entry. If the fingerprint is already present the existing
    /// entry is kept and returned.
    pub fn put(&self, entry: CacheEntry) -> Arc<CacheEntry> {
        self.lru().put(entry)
    }

    /// Return the cached entry for `fingerprint`, or run `compute` and store
    /// its result. The boolean is true on a hit.
    ///
    /// Holds the fingerprint's shard lock for the whole sequence, so `compute`
    /// runs at most once per fingerprint among concurrent callers. Errors are
    /// not cached.
    pub fn get_or_compute<E>(
        &self,
        fingerprint: Fingerprint,
        compute: impl FnOnce() -> Result<(String, Diagnostics), E>,
    ) -> Result<(Arc<CacheEntry>, bool), E> {
        let _shard = self.shards[fingerprint.shard()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = self.get(&fingerprint) {
            tracing::trace!(%fingerprint, "cache hit");
            return Ok((entry, true));
        }
        tracing::trace!(%fingerprint, "cache miss");
        let started = Instant::now();
        let computed = compute();
        {
            let mut lru = self.lru();
            lru.computed += 1;
            lru.compute_time += started.elapsed();
        }
        let (text, diagnostics) = computed?;
        let entry = self.put(CacheEntry {
            fingerprint,
            text,
            diagnostics,
            created_at: SystemTime::now(),
        });
        Ok((entry, false))
    }

    /// Record the context the next lookups belong to. Switching to a different
    /// context clears the cache; returns whether that happened.
    pub fn bind_context(&self, context: ContextKey) -> bool {
        let mut current = self.context.lock().unwrap_or_else(PoisonError::into_inner);
        match *current {
            Some(previous) if previous == context => false,
            Some(_) => {
                *current = Some(context);
                drop(current);
                tracing::debug!("conversion context changed, clearing cache");
                self.clear();
                true
            }
            None => {
                *current = Some(context);
                false
            }
        }
    }

    pub fn clear(&self) {
        self.lru().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let lru = self.lru();
        CacheStats {
            hits: lru.hits,
            misses: lru.misses,
            evictions: lru.evictions,
            len: lru.entries.len(),
            capacity: lru.capacity,
            computed: lru.computed,
            compute_time: lru.compute_time,
        }
    }

    /// Write every entry to `path` as JSON. Returns the number written.
    pub fn save(&self, path: &Path) -> Result<usize, CacheFileError> {
        let file = {
            let lru = self.lru();
            let context = *self.context.lock().unwrap_or_else(PoisonError::into_inner);
            CacheFile {
                context,
                entries: lru
                    .order
                    .iter()
                    .filter_map(|f| lru.entries.get(f))
                    .map(|entry| CacheEntry::clone(entry))
                    .collect(),
            }
        };
        let json = serde_json::to_string(&file)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), entries = file.entries.len(), "cache saved");
        Ok(file.entries.len())
    }

    /// Load entries written by [`save`](Self::save). The file's context is
    /// bound first, so entries from another configuration are dropped as
    /// soon as a pipeline with a different context uses the cache. Returns
    /// the number of entries stored.
    pub fn load(&self, path: &Path) -> Result<usize, CacheFileError> {
        let json = std::fs::read_to_string(path)?;
        let file: CacheFile = serde_json::from_str(&json)?;
        if let Some(context) = file.context {
            self.bind_context(context);
        }
        let mut lru = self.lru();
        // Oldest first, so the file's most recent entry ends up in front.
        for entry in file.entries.into_iter().rev() {
            lru.put(entry);
        }
        let stored = lru.entries.len();
        tracing::debug!(path = %path.display(), entries = stored, "cache loaded");
        Ok(stored)
    }
}

impl Default for ConversionCache {
    fn default() -> Self {
        Self::new(Config::default().cache_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn context() -> ContextKey {
        ContextKey::compute(&Config::default(), &PluginChain::empty())
    }

    fn fp(input: &str) -> Fingerprint {
        Fingerprint::compute(input.as_bytes(), &context())
    }

    fn entry(input: &str, text: &str) -> CacheEntry {
        CacheEntry {
            fingerprint: fp(input),
            text: text.to_string(),
            diagnostics: Diagnostics::new(),
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn test_fingerprint_depends_on_every_input() {
        let base = fp("x = 1");
        assert_eq!(base, fp("x = 1"));
        assert_ne!(base, fp("x = 2"));

        let config = Config {
            indent_size: 2,
            ..Config::default()
        };
        let other_config = ContextKey::compute(&config, &PluginChain::empty());
        assert_ne!(base, Fingerprint::compute(b"x = 1", &other_config));

        let mut builder = PluginChain::builder();
        builder.plugin(crate::plugin::PluginInfo::new("p", "1.0"));
        let with_plugin = ContextKey::compute(&Config::default(), &builder.build());
        assert_ne!(base, Fingerprint::compute(b"x = 1", &with_plugin));
    }

    #[test]
    fn test_get_after_put_is_identical() {
        let cache = ConversionCache::new(4);
        cache.put(entry("a", "class A {}\n"));
        let hit = cache.get(&fp("a")).unwrap();
        assert_eq!(hit.text, "class A {}\n");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_first_writer_wins() {
        let cache = ConversionCache::new(4);
        cache.put(entry("a", "first"));
        let kept = cache.put(entry("a", "second"));
        assert_eq!(kept.text, "first");
        assert_eq!(cache.get(&fp("a")).unwrap().text, "first");
    }

    #[test]
    fn test_capacity_zero_never_stores() {
        let cache = ConversionCache::new(0);
        let stored = cache.put(entry("a", "text"));
        assert_eq!(stored.text, "text");
        assert!(cache.is_empty());
        assert!(cache.get(&fp("a")).is_none());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ConversionCache::new(2);
        cache.put(entry("a", "A"));
        cache.put(entry("b", "B"));
        // Using `a` makes `b` the eviction candidate.
        assert!(cache.get(&fp("a")).is_some());
        cache.put(entry("c", "C"));
        assert!(cache.get(&fp("b")).is_none());
        assert!(cache.get(&fp("a")).is_some());
        assert!(cache.get(&fp("c")).is_some());
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_bind_context_clears_on_change() {
        let cache = ConversionCache::new(4);
        assert!(!cache.bind_context(context()));
        cache.put(entry("a", "A"));
        assert!(!cache.bind_context(context()));
        assert_eq!(cache.len(), 1);

        let config = Config {
            package_name: "other".into(),
            ..Config::default()
        };
        assert!(cache.bind_context(ContextKey::compute(&config, &PluginChain::empty())));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = ConversionCache::new(4);
        let result: Result<_, &str> = cache.get_or_compute(fp("a"), || Err("boom"));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_get_or_compute_runs_once() {
        let cache = ConversionCache::new(4);
        let runs = AtomicUsize::new(0);
        let key = fp("shared");
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let (entry, _) = cache
                        .get_or_compute::<()>(key, || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            Ok(("out".to_string(), Diagnostics::new()))
                        })
                        .unwrap();
                    assert_eq!(entry.text, "out");
                });
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
    }

    #[test]
    fn test_misses_are_timed() {
        let cache = ConversionCache::new(4);
        let _ = cache.get_or_compute::<()>(fp("a"), || {
            std::thread::sleep(Duration::from_millis(5));
            Ok(("A".to_string(), Diagnostics::new()))
        });
        let _ = cache.get_or_compute::<()>(fp("a"), || unreachable!());
        let stats = cache.stats();
        assert_eq!(stats.computed, 1);
        assert!(stats.compute_time >= Duration::from_millis(5));
        assert_eq!(stats.hit_rate(), 0.5);
        assert!(stats.to_string().contains("hit rate: 50.0%"));
    }

    #[test]
    fn test_save_and_load_keep_recency() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let cache = ConversionCache::new(4);
        cache.bind_context(context());
        cache.put(entry("a", "A"));
        cache.put(entry("b", "B"));
        assert!(cache.get(&fp("a")).is_some());
        assert_eq!(cache.save(&path).unwrap(), 2);

        // Room for one: only the most recently used entry survives.
        let restored = ConversionCache::new(1);
        assert_eq!(restored.load(&path).unwrap(), 1);
        assert_eq!(restored.get(&fp("a")).unwrap().text, "A");
        assert!(!restored.bind_context(context()));
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_load_rejects_corrupt_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        let cache = ConversionCache::new(4);
        assert!(matches!(cache.load(&path), Err(CacheFileError::Format(_))));
        assert!(matches!(
            cache.load(&dir.path().join("missing.json")),
            Err(CacheFileError::Io(_))
        ));
        assert!(cache.is_empty());
    }
}
