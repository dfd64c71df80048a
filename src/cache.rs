use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::models::{Company, Template};

// 24 hours
pub const CACHE_VALIDITY: Duration = Duration::from_secs(86_400);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cache entry {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// Hex SHA-256 fingerprint of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

// Fields are declared in alphabetical order so the serialization is canonical
#[derive(Serialize)]
struct Fingerprint<'a> {
    company: CompanyFingerprint<'a>,
    template: TemplateFingerprint<'a>,
}

#[derive(Serialize)]
struct CompanyFingerprint<'a> {
    category: &'a str,
    name: &'a str,
    products: &'a str,
    website: &'a str,
}

#[derive(Serialize)]
struct TemplateFingerprint<'a> {
    content: &'a str,
    id: &'a str,
}

impl CacheKey {
    // Create a cache key (hash of the company and template fields that shape the prompt)
    pub fn compute(company: &Company, template: &Template) -> Self {
        let fingerprint = Fingerprint {
            company: CompanyFingerprint {
                category: company.category.as_deref().unwrap_or(""),
                name: &company.name,
                products: company.products.as_deref().unwrap_or(""),
                website: company.website.as_deref().unwrap_or(""),
            },
            template: TemplateFingerprint {
                content: &template.content,
                id: &template.id,
            },
        };
        let canonical = serde_json::to_vec(&fingerprint).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Cache entry with timestamp (epoch seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: f64,
    pub request: String,
}

impl CacheEntry {
    fn is_expired(&self, now: f64, ttl: Duration) -> bool {
        now - self.timestamp > ttl.as_secs_f64()
    }
}

// Outcome of a cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    Expired,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(dir: impl AsRef<Path>, ttl: Duration) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ttl,
        }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    async fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await.map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    pub async fn lookup(&self, key: &CacheKey) -> CacheLookup {
        match self.read_entry(key).await {
            Ok(None) => CacheLookup::Miss,
            Ok(Some(entry)) if entry.is_expired(now_secs(), self.ttl) => {
                debug!(key = %key, "cache entry expired");
                CacheLookup::Expired
            }
            Ok(Some(entry)) => CacheLookup::Hit(entry.request),
            Err(e) => CacheLookup::Error(e.to_string()),
        }
    }

    // Optional view of `lookup`: anything but a live entry is absent
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        match self.lookup(key).await {
            CacheLookup::Hit(text) => Some(text),
            CacheLookup::Error(reason) => {
                warn!(key = %key, %reason, "cache read failed");
                None
            }
            CacheLookup::Miss | CacheLookup::Expired => None,
        }
    }

    async fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        self.ensure_dir().await?;
        let path = self.entry_path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| CacheError::Format { path, source })
    }

    pub async fn try_put(&self, key: &CacheKey, text: &str) -> Result<(), CacheError> {
        let entry = CacheEntry {
            timestamp: now_secs(),
            request: text.to_string(),
        };
        self.write_entry(key, &entry).await
    }

    // Best effort: failures are logged, never returned
    pub async fn put(&self, key: &CacheKey, text: &str) {
        match self.try_put(key, text).await {
            Ok(()) => debug!(key = %key, "request cached"),
            Err(e) => warn!(key = %key, error = %e, "cache write failed"),
        }
    }

    async fn write_entry(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        self.ensure_dir().await?;
        let path = self.entry_path(key);
        let json = serde_json::to_string_pretty(entry).map_err(|source| CacheError::Format {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).await.map_err(|source| CacheError::Io { path, source })
    }

    // Delete expired or unreadable entries, returning how many were removed
    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        self.ensure_dir().await?;
        let io_err = |source| CacheError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.dir).await.map_err(io_err)?;
        let now = now_secs();
        let mut purged = 0;

        while let Some(dir_entry) = entries.next_entry().await.map_err(io_err)? {
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stale = match fs::read(&path).await {
                Ok(raw) => serde_json::from_slice::<CacheEntry>(&raw)
                    .map(|entry| entry.is_expired(now, self.ttl))
                    .unwrap_or(true),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable cache file");
                    false
                }
            };
            if stale {
                match fs::remove_file(&path).await {
                    Ok(()) => purged += 1,
                    Err(e) => warn!(path = %path.display(), error = %e, "could not remove cache file"),
                }
            }
        }

        debug!(purged, "cache purge finished");
        Ok(purged)
    }
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
