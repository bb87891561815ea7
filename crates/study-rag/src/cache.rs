//! Answer cache with document-based invalidation
//!
//! Answers are keyed by the normalized question. An entry stops being served
//! once its TTL passes or any document it cites was re-ingested or deleted.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::config::PerformanceConfig;
use crate::types::AnswerResponse;

/// Cached answer with the document versions it was built from
#[derive(Debug, Clone)]
struct CachedAnswer {
    response: AnswerResponse,
    /// `ingested_at` of every cited document at cache time
    document_timestamps: HashMap<Uuid, DateTime<Utc>>,
    cached_at: DateTime<Utc>,
    hit_count: u32,
}

/// Bounded answer cache
pub struct AnswerCache {
    /// Entries keyed by question hash
    cache: RwLock<HashMap<String, CachedAnswer>>,
    /// Reverse index: document id -> question hashes citing it
    doc_to_questions: RwLock<HashMap<Uuid, HashSet<String>>>,
    max_entries: usize,
    ttl_seconds: u64,
}

impl AnswerCache {
    pub fn new(max_entries: usize, ttl_seconds: u64) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            doc_to_questions: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            ttl_seconds,
        }
    }

    pub fn from_config(config: &PerformanceConfig) -> Self {
        Self::new(config.cache_max_entries, config.cache_ttl_secs)
    }

    /// SHA-256 of the trimmed, lowercased question
    fn hash_question(question: &str) -> String {
        let normalized = question.trim().to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Cached response if fresh
    ///
    /// `current_timestamps` maps every registered document to its current
    /// `ingested_at`; a cited document that changed or vanished makes the
    /// entry stale.
    pub fn get(
        &self,
        question: &str,
        current_timestamps: &HashMap<Uuid, DateTime<Utc>>,
    ) -> Option<AnswerResponse> {
        let key = Self::hash_question(question);

        let dropped = {
            let mut cache = self.cache.write();
            let entry = cache.get_mut(&key)?;

            let age = Utc::now().signed_duration_since(entry.cached_at);
            let expired = age.num_seconds().max(0) as u64 >= self.ttl_seconds;
            let stale = entry
                .document_timestamps
                .iter()
                .any(|(doc_id, cached)| current_timestamps.get(doc_id) != Some(cached));

            if !expired && !stale {
                entry.hit_count += 1;
                tracing::debug!("Cache hit: {} (hits: {})", &key[..12], entry.hit_count);

                let mut response = entry.response.clone();
                response.cached = true;
                return Some(response);
            }

            tracing::debug!(
                "Cache miss ({}): {}",
                if expired { "TTL expired" } else { "cited document changed" },
                &key[..12]
            );
            cache.remove(&key)
        };

        if let Some(entry) = dropped {
            self.unindex(&key, entry.document_timestamps.keys());
        }
        None
    }

    /// Store a response
    ///
    /// `doc_timestamps` holds the current `ingested_at` of the documents the
    /// response cites.
    pub fn put(
        &self,
        question: &str,
        response: &AnswerResponse,
        doc_timestamps: HashMap<Uuid, DateTime<Utc>>,
    ) {
        let key = Self::hash_question(question);
        let doc_ids: Vec<Uuid> = doc_timestamps.keys().copied().collect();

        let entry = CachedAnswer {
            response: response.clone(),
            document_timestamps: doc_timestamps,
            cached_at: Utc::now(),
            hit_count: 0,
        };

        // entries pushed out here (evicted or overwritten) leave the index too
        let mut dropped: Vec<(String, CachedAnswer)> = Vec::new();
        {
            let mut cache = self.cache.write();
            if cache.len() >= self.max_entries && !cache.contains_key(&key) {
                let oldest_key = cache
                    .iter()
                    .min_by_key(|(_, v)| v.cached_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest_key) = oldest_key {
                    if let Some(old) = cache.remove(&oldest_key) {
                        dropped.push((oldest_key, old));
                    }
                }
            }
            if let Some(previous) = cache.insert(key.clone(), entry) {
                dropped.push((key.clone(), previous));
            }
        }

        for (old_key, old) in &dropped {
            self.unindex(old_key, old.document_timestamps.keys());
        }

        {
            let mut doc_to_q = self.doc_to_questions.write();
            for doc_id in doc_ids {
                doc_to_q.entry(doc_id).or_default().insert(key.clone());
            }
        }

        tracing::debug!("Cached answer: {}", &key[..12]);
    }

    /// Remove `key` from the reverse index of each document
    fn unindex<'a>(&self, key: &str, doc_ids: impl Iterator<Item = &'a Uuid>) {
        let mut doc_to_q = self.doc_to_questions.write();
        for doc_id in doc_ids {
            if let Some(keys) = doc_to_q.get_mut(doc_id) {
                keys.remove(key);
                if keys.is_empty() {
                    doc_to_q.remove(doc_id);
                }
            }
        }
    }

    /// Drop every entry citing a document; returns how many were removed
    pub fn invalidate_by_document(&self, doc_id: &Uuid) -> usize {
        let Some(keys) = self.doc_to_questions.write().remove(doc_id) else {
            return 0;
        };

        let mut cache = self.cache.write();
        let mut invalidated = 0;
        let mut others: Vec<(String, Vec<Uuid>)> = Vec::new();
        for key in keys {
            if let Some(entry) = cache.remove(&key) {
                invalidated += 1;
                let cited: Vec<Uuid> = entry
                    .document_timestamps
                    .into_keys()
                    .filter(|id| id != doc_id)
                    .collect();
                others.push((key, cited));
            }
        }
        drop(cache);
        for (key, cited) in &others {
            self.unindex(key, cited.iter());
        }

        if invalidated > 0 {
            tracing::info!(
                "Invalidated {} cached answers for document {}",
                invalidated,
                doc_id
            );
        }
        invalidated
    }

    pub fn clear(&self) {
        self.cache.write().clear();
        self.doc_to_questions.write().clear();
        tracing::info!("Answer cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.read();
        CacheStats {
            entries: cache.len(),
            indexed_documents: self.doc_to_questions.read().len(),
            total_hits: cache.values().map(|e| e.hit_count).sum(),
            max_entries: self.max_entries,
            ttl_seconds: self.ttl_seconds,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    /// Documents with at least one cached answer citing them
    pub indexed_documents: usize,
    pub total_hits: u32,
    pub max_entries: usize,
    pub ttl_seconds: u64,
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::from_config(&PerformanceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(answer: &str) -> AnswerResponse {
        AnswerResponse {
            answer: answer.to_string(),
            citations: Vec::new(),
            sources: String::new(),
            low_confidence: false,
            cached: false,
            followups: Vec::new(),
            chunks_retrieved: 0,
            processing_time_ms: 12,
        }
    }

    fn stamps(doc: Uuid, at: DateTime<Utc>) -> HashMap<Uuid, DateTime<Utc>> {
        HashMap::from([(doc, at)])
    }

    #[test]
    fn test_hit_on_normalized_question() {
        let cache = AnswerCache::default();
        let doc = Uuid::new_v4();
        let now = Utc::now();
        cache.put("What is DNA?", &response("A molecule."), stamps(doc, now));

        let hit = cache.get("  what is dna?", &stamps(doc, now)).unwrap();
        assert_eq!(hit.answer, "A molecule.");
        assert!(hit.cached);
        assert_eq!(cache.stats().total_hits, 1);
        assert!(cache.get("What is RNA?", &stamps(doc, now)).is_none());
    }

    #[test]
    fn test_modified_or_deleted_document_is_stale() {
        let cache = AnswerCache::default();
        let doc = Uuid::new_v4();
        let then = Utc::now() - chrono::Duration::seconds(60);
        cache.put("q", &response("a"), stamps(doc, then));

        assert!(cache.get("q", &stamps(doc, Utc::now())).is_none());
        assert_eq!(cache.stats().entries, 0);

        cache.put("q", &response("a"), stamps(doc, then));
        assert!(cache.get("q", &HashMap::new()).is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = AnswerCache::new(10, 0);
        cache.put("q", &response("a"), HashMap::new());
        assert!(cache.get("q", &HashMap::new()).is_none());
    }

    #[test]
    fn test_invalidate_by_document() {
        let cache = AnswerCache::default();
        let doc = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();
        cache.put("q1", &response("a1"), stamps(doc, now));
        cache.put("q2", &response("a2"), stamps(other, now));

        assert_eq!(cache.invalidate_by_document(&doc), 1);
        assert_eq!(cache.invalidate_by_document(&doc), 0);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = AnswerCache::new(2, 3600);
        cache.put("first", &response("1"), HashMap::new());
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put("second", &response("2"), HashMap::new());
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put("third", &response("3"), HashMap::new());

        assert_eq!(cache.stats().entries, 2);
        assert!(cache.get("first", &HashMap::new()).is_none());
        assert!(cache.get("third", &HashMap::new()).is_some());
    }

    #[test]
    fn test_dropped_entries_leave_reverse_index() {
        let now = Utc::now();
        let docs: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        let cache = AnswerCache::new(1, 3600);
        cache.put("q0", &response("a0"), stamps(docs[0], now));
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put("q1", &response("a1"), stamps(docs[1], now));
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.stats().indexed_documents, 1);

        // overwriting with other citations unindexes the old ones
        cache.put("q1", &response("a1"), stamps(docs[2], now));
        assert_eq!(cache.stats().indexed_documents, 1);
        assert_eq!(cache.invalidate_by_document(&docs[1]), 0);

        let expiring = AnswerCache::new(10, 0);
        expiring.put("q", &response("a"), stamps(docs[0], now));
        assert!(expiring.get("q", &stamps(docs[0], now)).is_none());
        assert_eq!(expiring.stats().indexed_documents, 0);

        let shared = AnswerCache::default();
        shared.put("q", &response("a"), HashMap::from([(docs[0], now), (docs[1], now)]));
        assert_eq!(shared.invalidate_by_document(&docs[0]), 1);
        assert_eq!(shared.stats().indexed_documents, 0);
    }
}
