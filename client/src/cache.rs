use bytes::Bytes;
use directory::Timestamp;
use lru::LruCache;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: Bytes,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Client-local file contents tagged with the timestamp they were fetched
/// or written at. With a capacity set, the least recently used entry is
/// dropped when a new name would overflow it.
#[derive(Debug)]
pub struct FileCache {
    entries: LruCache<String, CacheEntry>,
    stats: CacheStats,
}

impl FileCache {
    pub fn new(capacity: Option<usize>) -> Self {
        let entries = match capacity {
            Some(capacity) => LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            None => LruCache::unbounded(),
        };

        Self {
            entries,
            stats: CacheStats::default(),
        }
    }

    /// Returns the cached content if it is at least as new as `authoritative`.
    pub fn fresh(&mut self, docname: &str, authoritative: Timestamp) -> Option<Bytes> {
        match self.entries.get(docname) {
            Some(entry) if entry.timestamp >= authoritative => {
                self.stats.hits += 1;
                Some(entry.content.clone())
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, docname: &str, content: Bytes, timestamp: Timestamp) {
        let displaced = self
            .entries
            .push(docname.to_string(), CacheEntry { content, timestamp });

        if let Some((name, _)) = displaced {
            if name != docname {
                tracing::trace!("Evicting {} from cache", name);
                self.stats.evictions += 1;
            }
        }
    }

    pub fn remove(&mut self, docname: &str) -> Option<CacheEntry> {
        self.entries.pop(docname)
    }

    /// Looks at an entry without refreshing its recency.
    pub fn get(&self, docname: &str) -> Option<&CacheEntry> {
        self.entries.peek(docname)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
