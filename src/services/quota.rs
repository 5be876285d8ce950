/// Daily question quota
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::warn;

const MAX_TRACKED_IDENTITIES: usize = 10_000;

/// Per-identity daily usage counter
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Consume one unit for `identity` on `day`; `false` once the day's limit is spent
    async fn check_and_consume(&self, identity: &str, day: NaiveDate) -> bool;
}

/// Single-process quota store
pub struct InMemoryQuota {
    limit: u32,
    max_identities: usize,
    counts: Mutex<HashMap<(String, NaiveDate), u32>>,
}

impl InMemoryQuota {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            max_identities: MAX_TRACKED_IDENTITIES,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Identities beyond `max` are refused for the rest of the day
    pub fn with_max_identities(mut self, max: usize) -> Self {
        self.max_identities = max;
        self
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuota {
    async fn check_and_consume(&self, identity: &str, day: NaiveDate) -> bool {
        let mut counts = self.counts.lock();
        // Earlier days can no longer be consumed.
        counts.retain(|(_, d), _| *d >= day);

        let key = (identity.to_string(), day);
        if !counts.contains_key(&key) && counts.len() >= self.max_identities {
            warn!("Quota table full, refusing new identity {}", identity);
            return false;
        }
        let used = counts.entry(key).or_insert(0);
        if *used >= self.limit {
            return false;
        }
        *used += 1;
        true
    }
}
