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

use std::sync::Arc;

use tracing::{error, trace};

use crate::common::registry::SubscriptionRegistry;
use crate::common::scheduler::Scheduler;
use crate::common::{InvokeOutcome, MessengerStats, Subscription};
use crate::message::{Envelope, MessagingError, RoutingKey};

/// Resolves a sent message to its subscription records and invokes them.
///
/// Exact records see the sender; generic records (registered against the
/// `Any` sender) see only the arguments. A send never modifies the registry.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    scheduler: Scheduler,
    stats: Arc<MessengerStats>,
}

impl Dispatcher {
    pub(crate) const fn new(scheduler: Scheduler, stats: Arc<MessengerStats>) -> Self {
        Self { scheduler, stats }
    }

    pub(crate) fn dispatch(
        &self,
        registry: &SubscriptionRegistry,
        key: &RoutingKey,
        envelope: &Envelope,
    ) -> Result<usize, MessagingError> {
        let generic = key.to_generic();
        let (exact, any) = registry.lookup_pair(key, &generic);
        self.stats.record_sent();
        trace!(key = %key, exact = exact.len(), generic = any.len(), "Dispatching message");

        let mut delivered = self.deliver(&exact, envelope, true)?;
        delivered += self.deliver(&any, envelope, false)?;
        Ok(delivered)
    }

    fn deliver(
        &self,
        records: &[Arc<Subscription>],
        envelope: &Envelope,
        deliver_sender: bool,
    ) -> Result<usize, MessagingError> {
        let mut delivered = 0;
        for record in records {
            if !record.is_subscriber_alive() {
                self.stats.record_skipped_dead();
                continue;
            }
            match record.invoke(envelope, deliver_sender, &self.scheduler) {
                Ok(InvokeOutcome::Delivered | InvokeOutcome::Scheduled) => {
                    self.stats.record_delivery();
                    delivered += 1;
                }
                Ok(InvokeOutcome::TargetDead) => self.stats.record_skipped_dead(),
                Ok(outcome) => trace!(?outcome, "Delivery skipped"),
                Err(source) => {
                    error!(message = envelope.message(), error = %source, "Handler failed");
                    return Err(MessagingError::HandlerFault {
                        message: envelope.message().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(delivered)
    }
}
