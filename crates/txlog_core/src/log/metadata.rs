//! Transaction position lookup.

use crate::error::{CoreError, CoreResult};
use crate::log::position::LogPosition;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Where a transaction starts in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMetadata {
    /// Position of the transaction's first entry.
    pub start_position: LogPosition,
}

/// Bounded LRU map from transaction id to start position.
///
/// Inserting an unspecified position is rejected: a bad entry here would
/// send recovery to the wrong place.
pub struct TransactionMetadataCache {
    entries: Mutex<LruCache<u64, TransactionMetadata>>,
}

impl TransactionMetadataCache {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Records the start position of `tx_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLogPosition`] for an unspecified position.
    pub fn cache_transaction_metadata(&self, tx_id: u64, position: LogPosition) -> CoreResult<()> {
        if position.is_unspecified() {
            return Err(CoreError::InvalidLogPosition { tx_id, position });
        }
        self.entries.lock().put(
            tx_id,
            TransactionMetadata {
                start_position: position,
            },
        );
        Ok(())
    }

    /// Returns the cached metadata of `tx_id`.
    #[must_use]
    pub fn get_transaction_metadata(&self, tx_id: u64) -> Option<TransactionMetadata> {
        self.entries.lock().get(&tx_id).copied()
    }

    /// Empties the cache.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl std::fmt::Debug for TransactionMetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("TransactionMetadataCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

/// Scan visitor that finds the segment holding a transaction.
///
/// Fed one segment at a time, newest first, with the inclusive range of
/// transaction ids the segment holds.
#[derive(Debug, Clone)]
pub struct LogVersionLocator {
    tx_id: u64,
    found: Option<LogPosition>,
}

impl LogVersionLocator {
    /// Creates a locator for `tx_id`.
    #[must_use]
    pub fn new(tx_id: u64) -> Self {
        Self { tx_id, found: None }
    }

    /// Visits one segment.
    ///
    /// Returns `true` to keep scanning older segments, `false` once the
    /// segment holding the transaction was found.
    pub fn visit(&mut self, first_tx_id: u64, last_tx_id: u64, position: LogPosition) -> bool {
        if (first_tx_id..=last_tx_id).contains(&self.tx_id) {
            self.found = Some(position);
            return false;
        }
        true
    }

    /// Returns the position recorded by the scan.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSuchTransaction`] if no segment matched.
    pub fn log_position(&self) -> CoreResult<LogPosition> {
        self.found
            .ok_or(CoreError::NoSuchTransaction { tx_id: self.tx_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unspecified_position_rejected() {
        let cache = TransactionMetadataCache::new(4);
        let result = cache.cache_transaction_metadata(1, LogPosition::UNSPECIFIED);
        assert!(matches!(result, Err(CoreError::InvalidLogPosition { tx_id: 1, .. })));
        assert!(cache.get_transaction_metadata(1).is_none());
    }

    #[test]
    fn cache_round_trip_and_clear() {
        let cache = TransactionMetadataCache::new(4);
        cache
            .cache_transaction_metadata(10, LogPosition::new(2, 128))
            .unwrap();
        assert_eq!(
            cache.get_transaction_metadata(10).unwrap().start_position,
            LogPosition::new(2, 128)
        );

        cache.clear();
        assert!(cache.get_transaction_metadata(10).is_none());
    }

    #[test]
    fn cache_is_bounded() {
        let cache = TransactionMetadataCache::new(2);
        for tx in 1..=3 {
            cache
                .cache_transaction_metadata(tx, LogPosition::new(0, 64 + tx))
                .unwrap();
        }
        assert!(cache.get_transaction_metadata(1).is_none());
        assert!(cache.get_transaction_metadata(3).is_some());
    }

    #[test]
    fn locator_stops_at_matching_segment() {
        let mut locator = LogVersionLocator::new(15);
        assert!(locator.visit(21, 30, LogPosition::new(3, 64)));
        assert!(!locator.visit(11, 20, LogPosition::new(2, 64)));
        assert_eq!(locator.log_position().unwrap(), LogPosition::new(2, 64));
    }

    #[test]
    fn locator_without_match_fails() {
        let mut locator = LogVersionLocator::new(5);
        assert!(locator.visit(10, 20, LogPosition::new(1, 64)));
        assert!(matches!(
            locator.log_position(),
            Err(CoreError::NoSuchTransaction { tx_id: 5 })
        ));
    }

    proptest! {
        #[test]
        fn cached_position_is_returned_exactly(
            tx_id in any::<u64>(),
            version in 0u64..u64::MAX,
            offset in 0u64..u64::MAX,
        ) {
            let cache = TransactionMetadataCache::new(16);
            let position = LogPosition::new(version, offset);
            cache.cache_transaction_metadata(tx_id, position).unwrap();
            prop_assert_eq!(
                cache.get_transaction_metadata(tx_id).map(|m| m.start_position),
                Some(position)
            );
        }
    }
}
