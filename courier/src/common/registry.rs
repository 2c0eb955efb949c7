/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::common::{MessengerStats, Subscription};
use crate::message::RoutingKey;

/// Routing-key to subscription-record store.
///
/// All reads and writes go through one coarse lock. Lookups hand back a
/// snapshot, so handlers always run with the lock released and may freely
/// subscribe or unsubscribe. Records leaving the registry are disposed and
/// dropped after the lock is released, since dropping a record can drop a
/// strongly held delegate target and run arbitrary user code.
#[derive(Debug)]
pub(crate) struct SubscriptionRegistry {
    buckets: Mutex<HashMap<RoutingKey, Vec<Arc<Subscription>>>>,
    bucket_capacity: usize,
    prune_on_subscribe: bool,
    stats: Arc<MessengerStats>,
}

impl SubscriptionRegistry {
    pub(crate) fn new(bucket_capacity: usize, prune_on_subscribe: bool, stats: Arc<MessengerStats>) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            bucket_capacity,
            prune_on_subscribe,
            stats,
        }
    }

    /// Appends `record` to the bucket for `key`, creating the bucket if needed.
    ///
    /// Duplicates are allowed; registering the same handler twice delivers
    /// twice.
    pub(crate) fn add(&self, key: RoutingKey, record: Arc<Subscription>) {
        let pruned = {
            let mut buckets = self.buckets.lock();
            let bucket = buckets
                .entry(key.clone())
                .or_insert_with(|| Vec::with_capacity(self.bucket_capacity));
            let pruned = if self.prune_on_subscribe {
                drain_where(bucket, |existing| existing.is_prunable())
            } else {
                Vec::new()
            };
            bucket.push(record);
            pruned
        };
        self.stats.record_added();
        trace!(key = %key, "Subscription added");
        self.retire(&key, pruned);
    }

    /// Removes every record in the bucket for `key` matching `predicate`.
    ///
    /// The bucket is deleted once empty. Returns the number of records removed.
    pub(crate) fn remove_matching<F>(&self, key: &RoutingKey, predicate: F) -> usize
    where
        F: Fn(&Subscription) -> bool,
    {
        let removed = {
            let mut buckets = self.buckets.lock();
            let Some(bucket) = buckets.get_mut(key) else {
                return 0;
            };
            let removed = drain_where(bucket, |record| predicate(record));
            if bucket.is_empty() {
                buckets.remove(key);
            }
            removed
        };
        self.retire(key, removed)
    }

    /// Snapshots of two buckets taken under a single lock acquisition.
    ///
    /// Missing buckets yield empty snapshots.
    pub(crate) fn lookup_pair(
        &self,
        first: &RoutingKey,
        second: &RoutingKey,
    ) -> (Vec<Arc<Subscription>>, Vec<Arc<Subscription>>) {
        let buckets = self.buckets.lock();
        let snapshot = |key: &RoutingKey| buckets.get(key).cloned().unwrap_or_default();
        (snapshot(first), snapshot(second))
    }

    /// Removes prunable records from every bucket.
    pub(crate) fn sweep(&self) -> usize {
        let removed: Vec<Arc<Subscription>> = {
            let mut buckets = self.buckets.lock();
            let mut removed = Vec::new();
            buckets.retain(|_, bucket| {
                removed.extend(drain_where(bucket, |record| record.is_prunable()));
                !bucket.is_empty()
            });
            removed
        };
        let count = removed.len();
        for record in &removed {
            record.dispose();
        }
        drop(removed);
        if count > 0 {
            self.stats.record_removed(count);
            debug!(count, "Swept dead subscriptions");
        }
        count
    }

    /// Number of records across all buckets.
    pub(crate) fn len(&self) -> usize {
        self.buckets.lock().values().map(Vec::len).sum()
    }

    /// Number of records in the bucket for `key`.
    pub(crate) fn count_for(&self, key: &RoutingKey) -> usize {
        self.buckets.lock().get(key).map_or(0, Vec::len)
    }

    /// Number of non-empty buckets.
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buckets.lock().is_empty()
    }

    fn retire(&self, key: &RoutingKey, removed: Vec<Arc<Subscription>>) -> usize {
        let count = removed.len();
        if count == 0 {
            return 0;
        }
        for record in &removed {
            record.dispose();
        }
        drop(removed);
        self.stats.record_removed(count);
        debug!(key = %key, count, "Subscriptions removed");
        count
    }
}

/// Moves matching records out of `bucket`, keeping the order of the rest.
fn drain_where<F>(bucket: &mut Vec<Arc<Subscription>>, predicate: F) -> Vec<Arc<Subscription>>
where
    F: Fn(&Subscription) -> bool,
{
    let (removed, kept): (Vec<_>, Vec<_>) = bucket.drain(..).partition(|record| predicate(record));
    *bucket = kept;
    removed
}
