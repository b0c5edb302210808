//! Available-data range lookups and a TTL cache over them.
//!
//! The storage query itself lives outside this crate; callers hand in an
//! [`AvailableRangeLookup`] and optionally wrap it in a [`CachedRangeLookup`].

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::network::NetworkDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RangeFilter {
    pub network_region: Option<String>,
    pub facilities: Vec<String>,
    pub energy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

pub trait AvailableRangeLookup: Send + Sync {
    fn available_range(&self, network: &NetworkDescriptor, filter: &RangeFilter)
        -> Option<DataRange>;
}

impl<F> AvailableRangeLookup for F
where
    F: Fn(&NetworkDescriptor, &RangeFilter) -> Option<DataRange> + Send + Sync,
{
    fn available_range(
        &self,
        network: &NetworkDescriptor,
        filter: &RangeFilter,
    ) -> Option<DataRange> {
        self(network, filter)
    }
}

/// Fixed ranges keyed by network code, ignoring filters.
#[derive(Debug, Default)]
pub struct InMemoryRangeLookup {
    ranges: RwLock<HashMap<String, DataRange>>,
}

impl InMemoryRangeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_range(&self, network_code: &str, range: DataRange) {
        self.ranges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(network_code.to_ascii_uppercase(), range);
    }
}

impl AvailableRangeLookup for InMemoryRangeLookup {
    fn available_range(
        &self,
        network: &NetworkDescriptor,
        _filter: &RangeFilter,
    ) -> Option<DataRange> {
        self.ranges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&network.code().to_ascii_uppercase())
            .copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RangeKey {
    network: String,
    filter: RangeFilter,
}

#[derive(Debug, Clone, Copy)]
struct CachedRange {
    fetched_at: Instant,
    range: Option<DataRange>,
}

/// Read-through cache with a per-entry TTL. The lock is held across a refresh, so
/// at most one refresh runs at a time.
pub struct CachedRangeLookup<L> {
    inner: L,
    ttl: Duration,
    entries: Mutex<HashMap<RangeKey, CachedRange>>,
}

impl<L: AvailableRangeLookup> CachedRangeLookup<L> {
    pub fn new(inner: L, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn invalidate(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<L: AvailableRangeLookup> AvailableRangeLookup for CachedRangeLookup<L> {
    fn available_range(
        &self,
        network: &NetworkDescriptor,
        filter: &RangeFilter,
    ) -> Option<DataRange> {
        let key = RangeKey {
            network: network.code().to_string(),
            filter: filter.clone(),
        };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = entries.get(&key) {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!(
                    component = "range",
                    event = "range.cache.hit",
                    network = network.code()
                );
                return cached.range;
            }
        }

        let range = self.inner.available_range(network, filter);
        debug!(
            component = "range",
            event = "range.cache.refresh",
            network = network.code(),
            found = range.is_some()
        );
        entries.insert(
            key,
            CachedRange {
                fetched_at: Instant::now(),
                range,
            },
        );
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{network_nem, network_wem};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_range() -> DataRange {
        DataRange {
            start: DateTime::parse_from_rfc3339("2021-01-01T00:00:00+10:00").unwrap(),
            end: DateTime::parse_from_rfc3339("2021-01-15T12:45:00+10:00").unwrap(),
        }
    }

    fn counting_lookup(calls: Arc<AtomicUsize>) -> impl AvailableRangeLookup {
        move |_network: &NetworkDescriptor, _filter: &RangeFilter| {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(sample_range())
        }
    }

    #[test]
    fn fresh_entries_are_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CachedRangeLookup::new(counting_lookup(calls.clone()), Duration::from_secs(60));
        let filter = RangeFilter::default();

        let first = cache.available_range(&network_nem(), &filter);
        let second = cache.available_range(&network_nem(), &filter);

        assert_eq!(first, Some(sample_range()));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keys_include_network_and_filter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CachedRangeLookup::new(counting_lookup(calls.clone()), Duration::from_secs(60));
        let energy = RangeFilter {
            energy: true,
            ..RangeFilter::default()
        };

        cache.available_range(&network_nem(), &RangeFilter::default());
        cache.available_range(&network_nem(), &energy);
        cache.available_range(&network_wem(), &RangeFilter::default());

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.cached_entries(), 3);
    }

    #[test]
    fn expired_or_invalidated_entries_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CachedRangeLookup::new(counting_lookup(calls.clone()), Duration::ZERO);
        let filter = RangeFilter::default();

        cache.available_range(&network_nem(), &filter);
        cache.available_range(&network_nem(), &filter);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let cache = CachedRangeLookup::new(counting_lookup(calls.clone()), Duration::from_secs(60));
        cache.available_range(&network_nem(), &filter);
        cache.invalidate();
        cache.available_range(&network_nem(), &filter);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn in_memory_lookup_is_keyed_by_network_code() {
        let lookup = InMemoryRangeLookup::new();
        lookup.set_range("nem", sample_range());

        assert_eq!(
            lookup.available_range(&network_nem(), &RangeFilter::default()),
            Some(sample_range())
        );
        assert_eq!(
            lookup.available_range(&network_wem(), &RangeFilter::default()),
            None
        );
    }
}
