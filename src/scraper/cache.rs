//! File-based page cache with TTL support.
//!
//! Dry runs and repeated syncs against the same group shouldn't hammer the
//! portal; fetched HTML is kept on disk for a category-dependent TTL.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cache entry with timestamp
#[derive(Serialize, Deserialize)]
struct CacheEntry {
    html: String,
    cached_at: DateTime<Utc>,
}

/// Cache categories with different TTLs
#[derive(Debug, Clone, Copy)]
pub enum CacheCategory {
    GroupPage,     // 6 hours; standings move on match days
    ClubMeetings,  // 6 hours
    TeamPortrait,  // 7 days; rosters change rarely mid-season
    MeetingReport, // 30 days; finished meetings are immutable
}

impl CacheCategory {
    /// Get TTL duration
    pub fn ttl(&self) -> Duration {
        match self {
            CacheCategory::GroupPage => Duration::hours(6),
            CacheCategory::ClubMeetings => Duration::hours(6),
            CacheCategory::TeamPortrait => Duration::hours(24 * 7),
            CacheCategory::MeetingReport => Duration::hours(24 * 30),
        }
    }

    /// Get directory name for this category
    pub fn dir_name(&self) -> &str {
        match self {
            CacheCategory::GroupPage => "group",
            CacheCategory::ClubMeetings => "club",
            CacheCategory::TeamPortrait => "team",
            CacheCategory::MeetingReport => "meeting",
        }
    }
}

/// File-based HTML cache
pub struct Cache {
    base_dir: PathBuf,
}

impl Cache {
    /// Create a new cache with the given base directory
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn cache_path(&self, category: CacheCategory, key: &str) -> PathBuf {
        self.base_dir
            .join(category.dir_name())
            .join(format!("{}.json", sanitize_key(key)))
    }

    /// Get cached HTML if present and not expired
    pub fn get(&self, category: CacheCategory, key: &str) -> Option<String> {
        let path = self.cache_path(category, key);

        if !path.exists() {
            return None;
        }

        let content = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&content).ok()?;

        let elapsed = Utc::now() - entry.cached_at;
        if elapsed > category.ttl() {
            let _ = std::fs::remove_file(&path);
            return None;
        }

        Some(entry.html)
    }

    /// Store fetched HTML
    pub fn set(&self, category: CacheCategory, key: &str, html: &str) -> Result<()> {
        let path = self.cache_path(category, key);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let entry = CacheEntry {
            html: html.to_string(),
            cached_at: Utc::now(),
        };

        std::fs::write(&path, serde_json::to_string(&entry)?)?;
        Ok(())
    }
}

/// Keys come from URL query values; keep only filesystem-safe characters.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(name: &str) -> (Cache, PathBuf) {
        let dir = std::env::temp_dir().join(format!("nuliga-cache-{}-{}", name, std::process::id()));
        (Cache::new(dir.clone()), dir)
    }

    #[test]
    fn test_set_then_get() {
        let (cache, dir) = temp_cache("roundtrip");
        cache
            .set(CacheCategory::GroupPage, "035", "<html>x</html>")
            .unwrap();
        assert_eq!(
            cache.get(CacheCategory::GroupPage, "035").as_deref(),
            Some("<html>x</html>")
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let (cache, dir) = temp_cache("miss");
        assert!(cache.get(CacheCategory::MeetingReport, "no-such-key").is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("TVM Sommer 2026/035"), "TVM_Sommer_2026_035");
    }
}
