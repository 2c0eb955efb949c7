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

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters describing what a [`Messenger`](crate::common::Messenger) has done.
///
/// All counters are monotonic and updated with relaxed ordering; they are meant
/// for diagnostics and tests, not for synchronisation.
#[derive(Debug, Default)]
pub struct MessengerStats {
    subscriptions_added: AtomicUsize,
    subscriptions_removed: AtomicUsize,
    messages_sent: AtomicUsize,
    deliveries: AtomicUsize,
    async_scheduled: AtomicUsize,
    async_faults: AtomicUsize,
    skipped_dead: AtomicUsize,
}

impl MessengerStats {
    /// Subscription records added to the registry.
    #[must_use]
    pub fn subscriptions_added(&self) -> usize {
        self.subscriptions_added.load(Ordering::Relaxed)
    }

    /// Subscription records removed, by unsubscribe or by pruning.
    #[must_use]
    pub fn subscriptions_removed(&self) -> usize {
        self.subscriptions_removed.load(Ordering::Relaxed)
    }

    /// Calls to send that passed argument validation.
    #[must_use]
    pub fn messages_sent(&self) -> usize {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Handler invocations that ran inline or were scheduled.
    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Asynchronous handler invocations handed to the runtime.
    #[must_use]
    pub fn async_scheduled(&self) -> usize {
        self.async_scheduled.load(Ordering::Relaxed)
    }

    /// Asynchronous invocations that failed, panicked or could not be scheduled.
    #[must_use]
    pub fn async_faults(&self) -> usize {
        self.async_faults.load(Ordering::Relaxed)
    }

    /// Records skipped during dispatch because their subscriber or delegate
    /// target was gone.
    #[must_use]
    pub fn skipped_dead(&self) -> usize {
        self.skipped_dead.load(Ordering::Relaxed)
    }

    pub(crate) fn record_added(&self) {
        self.subscriptions_added.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_removed(&self, count: usize) {
        self.subscriptions_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scheduled(&self) {
        self.async_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_async_fault(&self) {
        self.async_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped_dead(&self) {
        self.skipped_dead.fetch_add(1, Ordering::Relaxed);
    }
}
