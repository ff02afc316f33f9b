//! Two-tier response cache for LLM extraction calls.
//!
//! Grounded on the original pipeline's `llm_cache.py`: an in-memory layer
//! backed by on-disk JSON files, keyed by `(prompt_type, prompt_version,
//! fingerprint-of-source-text)`, with a 30-day default TTL and basic
//! hit/miss/eviction accounting so a run can report how much LLM spend the
//! cache actually avoided.

use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Number of leading characters of source text folded into the cache key.
/// Matches the original implementation's fingerprinting window: enough to
/// disambiguate distinct papers without hashing the full (up to 25,000
/// character) extraction text on every lookup.
const FINGERPRINT_WINDOW: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    response: String,
    cached_at: DateTime<Local>,
}

/// Running cache statistics, reset when the process restarts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups that were served from cache, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Computes the cache key for an extraction call.
fn cache_key(prompt_type: &str, prompt_version: &str, text: &str) -> String {
    let window: String = text.chars().take(FINGERPRINT_WINDOW).collect();
    let mut hasher = Sha256::new();
    hasher.update(window.as_bytes());
    let fingerprint = format!("{:x}", hasher.finalize())[..16].to_string();
    format!("{prompt_type}_{prompt_version}_{fingerprint}")
}

/// Two-tier (memory + disk) cache for LLM extraction responses.
pub struct ResponseCache {
    dir: PathBuf,
    ttl_days: i64,
    memory: Mutex<HashMap<String, CacheRecord>>,
    stats: Mutex<CacheStats>,
}

impl ResponseCache {
    /// Create a cache rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, ttl_days: i64) -> AppResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            ttl_days,
            memory: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        })
    }

    fn disk_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn is_valid(&self, record: &CacheRecord) -> bool {
        let age = Local::now().signed_duration_since(record.cached_at);
        age.num_days() < self.ttl_days
    }

    /// Look up a cached response for `(prompt_type, prompt_version, text)`.
    pub fn get(&self, prompt_type: &str, prompt_version: &str, text: &str) -> Option<String> {
        let key = cache_key(prompt_type, prompt_version, text);

        if let Some(record) = self.memory.lock().unwrap().get(&key) {
            if self.is_valid(record) {
                self.stats.lock().unwrap().hits += 1;
                return Some(record.response.clone());
            }
        }

        let path = self.disk_path(&key);
        if let Ok(contents) = std::fs::read_to_string(&path)
            && let Ok(record) = serde_json::from_str::<CacheRecord>(&contents)
        {
            if self.is_valid(&record) {
                self.memory
                    .lock()
                    .unwrap()
                    .insert(key.clone(), record.clone());
                self.stats.lock().unwrap().hits += 1;
                return Some(record.response);
            }
            let _ = std::fs::remove_file(&path);
            self.stats.lock().unwrap().evictions += 1;
        }

        self.stats.lock().unwrap().misses += 1;
        None
    }

    /// Store a response for `(prompt_type, prompt_version, text)`.
    pub fn put(
        &self,
        prompt_type: &str,
        prompt_version: &str,
        text: &str,
        response: &str,
    ) -> AppResult<()> {
        let key = cache_key(prompt_type, prompt_version, text);
        let record = CacheRecord {
            response: response.to_string(),
            cached_at: Local::now(),
        };

        let serialized = serde_json::to_string_pretty(&record)?;
        std::fs::write(self.disk_path(&key), serialized)
            .map_err(|e| AppError::CacheError(format!("failed to write cache entry: {e}")))?;

        self.memory.lock().unwrap().insert(key, record);
        Ok(())
    }

    /// Drop every cached entry for a given prompt type (memory and disk).
    pub fn invalidate(&self, prompt_type: &str) -> AppResult<()> {
        let prefix = format!("{prompt_type}_");
        self.memory
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(&prefix));

        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| AppError::CacheError(format!("failed to list cache dir: {e}")))?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) {
                let _ = std::fs::remove_file(entry.path());
            }
        }
        Ok(())
    }

    /// Remove every expired entry from memory and disk, returning the count
    /// of entries removed.
    pub fn cleanup_expired(&self) -> AppResult<usize> {
        let mut removed = 0usize;

        self.memory.lock().unwrap().retain(|_, record| {
            let keep = self.is_valid(record);
            if !keep {
                removed += 1;
            }
            keep
        });

        if let Ok(entries) = std::fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Ok(contents) = std::fs::read_to_string(&path)
                    && let Ok(record) = serde_json::from_str::<CacheRecord>(&contents)
                    && !self.is_valid(&record)
                {
                    let _ = std::fs::remove_file(&path);
                    removed += 1;
                }
            }
        }

        self.stats.lock().unwrap().evictions += removed as u64;
        Ok(removed)
    }

    /// Snapshot of current cache statistics.
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap()
    }

    /// Directory backing this cache's on-disk tier.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("smj_pipeline_cache_test_{name}_{}", std::process::id()))
    }

    #[test]
    fn cache_key_is_stable_for_same_inputs() {
        let k1 = cache_key("theories", "2.0", "some paper text");
        let k2 = cache_key("theories", "2.0", "some paper text");
        assert_eq!(k1, k2);
        let k3 = cache_key("theories", "2.0", "different text");
        assert_ne!(k1, k3);
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = temp_dir("roundtrip");
        let cache = ResponseCache::new(&dir, 30).unwrap();
        assert!(cache.get("metadata", "2.0", "text").is_none());
        cache.put("metadata", "2.0", "text", "{\"ok\":true}").unwrap();
        assert_eq!(
            cache.get("metadata", "2.0", "text"),
            Some("{\"ok\":true}".to_string())
        );
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn invalidate_drops_only_matching_prompt_type() {
        let dir = temp_dir("invalidate");
        let cache = ResponseCache::new(&dir, 30).unwrap();
        cache.put("metadata", "2.0", "a", "x").unwrap();
        cache.put("theories", "2.0", "a", "y").unwrap();
        cache.invalidate("metadata").unwrap();
        assert!(cache.get("metadata", "2.0", "a").is_none());
        assert!(cache.get("theories", "2.0", "a").is_some());
        std::fs::remove_dir_all(&dir).ok();
    }
}
