//! TTL order book cache with single-flight REST refresh on expiry.
//!
//! Entries go Fresh -> Stale -> Expired as they age. Stale reads return
//! the cached snapshot immediately (callers treat the cost guard as the
//! authority on whether it's still safe to trust); an Expired read blocks
//! on a single refresh so concurrent readers for the same token don't
//! fan out duplicate REST calls.

use super::interfaces::HedgeVenueClient;
use super::types::{Freshness, OrderBookSnapshot, TaskErrorKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

struct CacheEntry {
    snapshot: OrderBookSnapshot,
    refresh_lock: Arc<AsyncMutex<()>>,
}

pub struct OrderBookCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    stale_after: Duration,
    expired_after: Duration,
}

impl OrderBookCache {
    pub fn new(stale_after_ms: u64, expired_after_ms: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_after: Duration::from_millis(stale_after_ms),
            expired_after: Duration::from_millis(expired_after_ms),
        }
    }

    fn classify(&self, snapshot: &OrderBookSnapshot) -> Freshness {
        let age = snapshot.age();
        if age >= self.expired_after {
            Freshness::Expired
        } else if age >= self.stale_after {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    /// Get the current snapshot for `token_id`, refreshing via `client`
    /// if the cached entry is missing or expired.
    pub async fn get(
        &self,
        client: &dyn HedgeVenueClient,
        token_id: &str,
    ) -> Result<OrderBookSnapshot, TaskErrorKind> {
        let existing = {
            let entries = self.entries.read();
            entries.get(token_id).map(|e| (e.snapshot.clone(), self.classify(&e.snapshot)))
        };

        match existing {
            Some((snapshot, Freshness::Fresh)) | Some((snapshot, Freshness::Stale)) => {
                Ok(snapshot)
            }
            _ => self.refresh(client, token_id).await,
        }
    }

    async fn refresh(
        &self,
        client: &dyn HedgeVenueClient,
        token_id: &str,
    ) -> Result<OrderBookSnapshot, TaskErrorKind> {
        let lock = {
            let mut entries = self.entries.write();
            entries
                .entry(token_id.to_string())
                .or_insert_with(|| CacheEntry {
                    snapshot: OrderBookSnapshot {
                        token_id: token_id.to_string(),
                        bids: Vec::new(),
                        asks: Vec::new(),
                        fetched_at: std::time::Instant::now() - self.expired_after,
                    },
                    refresh_lock: Arc::new(AsyncMutex::new(())),
                })
                .refresh_lock
                .clone()
        };

        let _guard = lock.lock().await;

        // Another waiter may have refreshed while we queued for the lock.
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.get(token_id) {
                if self.classify(&entry.snapshot) != Freshness::Expired {
                    return Ok(entry.snapshot.clone());
                }
            }
        }

        let snapshot = client.order_book(token_id).await?;

        let mut entries = self.entries.write();
        entries
            .entry(token_id.to_string())
            .and_modify(|e| e.snapshot = snapshot.clone())
            .or_insert_with(|| CacheEntry {
                snapshot: snapshot.clone(),
                refresh_lock: lock.clone(),
            });

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_thresholds_order_correctly() {
        let cache = OrderBookCache::new(100, 500);
        let fresh = OrderBookSnapshot {
            token_id: "t".into(),
            bids: vec![],
            asks: vec![],
            fetched_at: std::time::Instant::now(),
        };
        assert_eq!(cache.classify(&fresh), Freshness::Fresh);

        let stale = OrderBookSnapshot {
            fetched_at: std::time::Instant::now() - Duration::from_millis(200),
            ..fresh.clone()
        };
        assert_eq!(cache.classify(&stale), Freshness::Stale);

        let expired = OrderBookSnapshot {
            fetched_at: std::time::Instant::now() - Duration::from_millis(600),
            ..fresh
        };
        assert_eq!(cache.classify(&expired), Freshness::Expired);
    }
}
