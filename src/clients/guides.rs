//! Time-bounded cache of platform guides.
//!
//! Guides are ordinary knowledge documents with the id `guide-<topic>`.
//! Entries expire after a fixed freshness window and are refetched on the
//! next request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::error::ClientResult;
use super::knowledge::{KnowledgeApi, KnowledgeDocument};

struct CachedGuide {
    document: Arc<KnowledgeDocument>,
    fetched_at: Instant,
}

/// Guide documents keyed by topic.
pub struct GuideCache {
    knowledge: Arc<dyn KnowledgeApi>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedGuide>>,
}

impl GuideCache {
    pub fn new(knowledge: Arc<dyn KnowledgeApi>, ttl: Duration) -> Self {
        Self {
            knowledge,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Knowledge id of the guide for `topic`.
    pub fn document_id(topic: &str) -> String {
        format!("guide-{topic}")
    }

    /// Return the guide for `topic`, fetching it when absent or expired.
    ///
    /// The lock is never held while fetching; two concurrent misses may
    /// both fetch, and the later one wins.
    pub async fn get(&self, topic: &str) -> ClientResult<Arc<KnowledgeDocument>> {
        if let Some(document) = self.fresh(topic) {
            debug!(topic, "Guide served from cache");
            return Ok(document);
        }

        let document = Arc::new(self.knowledge.get(&Self::document_id(topic)).await?);
        self.entries.lock().insert(
            topic.to_string(),
            CachedGuide {
                document: Arc::clone(&document),
                fetched_at: Instant::now(),
            },
        );
        Ok(document)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh(&self, topic: &str) -> Option<Arc<KnowledgeDocument>> {
        let mut entries = self.entries.lock();
        match entries.get(topic) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                Some(Arc::clone(&entry.document))
            }
            Some(_) => {
                entries.remove(topic);
                None
            }
            None => None,
        }
    }
}
