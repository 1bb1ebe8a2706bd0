//! Valid-Page Registry
//!
//! Persistent allow-list of slugs known to correspond to an approved topic.
//! Exists so the pipeline never pays a second LLM validation call for a
//! topic already proven acceptable, whether by direct generation or by
//! search-suggestion provenance.
//!
//! The whole set lives in memory behind an `RwLock` and is rewritten to a
//! single JSON file on every mutation. Persistence is write-through: a
//! mutation returns only after its disk write completes. Membership grows
//! monotonically; there is no removal operation, and a slug once marked
//! valid is never re-validated.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::slug::title_to_slug;
use crate::types::Result;

pub struct ValidPageRegistry {
    path: PathBuf,
    slugs: RwLock<BTreeSet<String>>,
}

impl ValidPageRegistry {
    /// Load the registry from disk; a missing file starts an empty set.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let slugs = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let list: Vec<String> = serde_json::from_str(&raw)?;
                list.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e.into()),
        };

        info!("Loaded valid-page registry ({} slugs)", slugs.len());
        Ok(Self {
            path,
            slugs: RwLock::new(slugs),
        })
    }

    pub async fn is_valid(&self, slug: &str) -> bool {
        self.slugs.read().await.contains(slug)
    }

    pub async fn len(&self) -> usize {
        self.slugs.read().await.len()
    }

    /// Register a title as valid. Returns true if the slug was newly
    /// inserted; the full set is persisted before this returns.
    pub async fn add(&self, title: &str) -> Result<bool> {
        let slug = title_to_slug(title);
        if slug.is_empty() {
            return Ok(false);
        }

        let mut slugs = self.slugs.write().await;
        if !slugs.insert(slug.clone()) {
            return Ok(false);
        }

        debug!("Registered valid page '{}'", slug);
        self.persist(&slugs).await?;
        Ok(true)
    }

    /// Batched insert for search suggestions. Persists once if any
    /// insertion occurred; returns the number of new slugs.
    pub async fn add_suggestions(&self, titles: &[String]) -> Result<usize> {
        let mut slugs = self.slugs.write().await;
        let mut inserted = 0;

        for title in titles {
            let slug = title_to_slug(title);
            if !slug.is_empty() && slugs.insert(slug) {
                inserted += 1;
            }
        }

        if inserted > 0 {
            debug!("Registered {} suggested pages", inserted);
            self.persist(&slugs).await?;
        }
        Ok(inserted)
    }

    /// Rewrite the full set as an ordered JSON array, atomically.
    async fn persist(&self, slugs: &BTreeSet<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let list: Vec<&String> = slugs.iter().collect();
        let serialized = serde_json::to_string_pretty(&list)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serialized.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_membership_after_add() {
        let dir = TempDir::new().unwrap();
        let registry = ValidPageRegistry::load(dir.path().join("valid.json"))
            .await
            .unwrap();

        assert!(!registry.is_valid("Roman_Empire").await);
        assert!(registry.add("Roman Empire").await.unwrap());
        assert!(registry.is_valid("Roman_Empire").await);

        // Second add is a no-op
        assert!(!registry.add("Roman Empire").await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("valid.json");

        {
            let registry = ValidPageRegistry::load(&path).await.unwrap();
            registry.add("Quantum Computing").await.unwrap();
        }

        let reloaded = ValidPageRegistry::load(&path).await.unwrap();
        assert!(reloaded.is_valid("Quantum_Computing").await);
        assert_eq!(reloaded.len().await, 1);
    }

    #[tokio::test]
    async fn test_batched_suggestions_persist_once() {
        let dir = TempDir::new().unwrap();
        let registry = ValidPageRegistry::load(dir.path().join("valid.json"))
            .await
            .unwrap();

        let titles = vec![
            "Eiffel Tower".to_string(),
            "Roman Empire".to_string(),
            "Eiffel Tower".to_string(),
        ];
        let inserted = registry.add_suggestions(&titles).await.unwrap();
        assert_eq!(inserted, 2);
        assert!(registry.is_valid("Eiffel_Tower").await);
        assert!(registry.is_valid("Roman_Empire").await);
    }

    #[tokio::test]
    async fn test_empty_title_ignored() {
        let dir = TempDir::new().unwrap();
        let registry = ValidPageRegistry::load(dir.path().join("valid.json"))
            .await
            .unwrap();

        assert!(!registry.add("   ").await.unwrap());
        assert_eq!(registry.len().await, 0);
    }
}
