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

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use static_assertions::assert_impl_all;
use tokio::runtime::Handle;
use tracing::{instrument, trace};

use crate::common::dispatcher::Dispatcher;
use crate::common::registry::SubscriptionRegistry;
use crate::common::scheduler::Scheduler;
use crate::common::{MessengerConfig, MessengerStats, SubscribeRequest, Subscription};
use crate::message::{validate_message, Envelope, MessagingError, Payload, RoutingKey};
use crate::traits::Participant;

/// The message bus.
///
/// A `Messenger` is a cheap handle; clones share one subscription registry.
/// Create one at the composition root of the application and hand clones to
/// every component that needs to talk to the others.
///
/// Subscribers are only ever observed through weak handles, so subscribing
/// never keeps a component alive. Records of dropped subscribers are skipped
/// on send and removed by the next [`unsubscribe`](Self::unsubscribe) on the
/// same bucket, or by [`sweep`](Self::sweep).
#[derive(Clone)]
pub struct Messenger {
    inner: Arc<MessengerInner>,
}

struct MessengerInner {
    registry: SubscriptionRegistry,
    dispatcher: Dispatcher,
    config: MessengerConfig,
    stats: Arc<MessengerStats>,
}

assert_impl_all!(Messenger: Send, Sync, Clone);

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger {
    /// Creates a messenger using the configuration found on disk, or the
    /// defaults if there is none.
    ///
    /// Async handlers run on the tokio runtime current at this call, if any,
    /// otherwise on whichever runtime is current when a message is sent.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a messenger with an explicit configuration.
    #[must_use]
    pub fn with_config(config: MessengerConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Starts configuring a messenger.
    #[must_use]
    pub fn builder() -> MessengerBuilder {
        MessengerBuilder::default()
    }

    /// Sends `message` from `sender` with an argument payload.
    ///
    /// Delivered to subscriptions made for exactly this sender type and
    /// argument type, and to args-only subscriptions for the argument type.
    /// Synchronous handlers run before this returns; asynchronous ones are
    /// scheduled and never awaited.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    /// [`MessagingError::HandlerFault`] if a synchronous handler failed; the
    /// remaining deliveries of this send are skipped.
    #[instrument(skip(self, sender, args), fields(sender = type_name::<S>(), args = type_name::<A>()))]
    pub fn send<S, A>(&self, sender: &Arc<S>, message: &str, args: A) -> Result<(), MessagingError>
    where
        S: Participant,
        A: Participant,
    {
        let key = RoutingKey::typed::<S, A>(validate_message(message)?);
        let envelope = Envelope::new(
            key.message_arc(),
            Arc::clone(sender) as Payload,
            Some(Arc::new(args) as Payload),
        );
        self.dispatch(&key, &envelope)
    }

    /// Sends `message` from `sender` without arguments.
    ///
    /// # Errors
    ///
    /// As for [`send`](Self::send).
    #[instrument(skip(self, sender), fields(sender = type_name::<S>()))]
    pub fn send_from<S: Participant>(&self, sender: &Arc<S>, message: &str) -> Result<(), MessagingError> {
        let key = RoutingKey::typed_without_args::<S>(validate_message(message)?);
        let envelope = Envelope::new(key.message_arc(), Arc::clone(sender) as Payload, None);
        self.dispatch(&key, &envelope)
    }

    /// Starts a subscription of `subscriber` to `message`.
    ///
    /// The handler shape, and with it the routing key, is chosen by the
    /// terminal method of the returned request.
    pub fn subscribe<'m, T: Participant>(&'m self, subscriber: &Arc<T>, message: &str) -> SubscribeRequest<'m, T> {
        let subscriber = Arc::clone(subscriber) as Payload;
        SubscribeRequest::new(self, Arc::clone(&subscriber), subscriber, message)
    }

    /// Removes the sender-and-args subscriptions of `subscriber` for sender
    /// type `S` and argument type `A`.
    ///
    /// Dead subscriptions sharing the bucket are removed as well. Nothing to
    /// remove is not an error.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    #[instrument(skip(self, subscriber), fields(sender = type_name::<S>(), args = type_name::<A>()))]
    pub fn unsubscribe<S: Participant, A: Participant>(
        &self,
        subscriber: &Arc<impl Participant>,
        message: &str,
    ) -> Result<(), MessagingError> {
        let key = RoutingKey::typed::<S, A>(validate_message(message)?);
        self.remove_subscriber(&key, subscriber);
        Ok(())
    }

    /// Removes the sender-only subscriptions of `subscriber` for sender type `S`.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    #[instrument(skip(self, subscriber), fields(sender = type_name::<S>()))]
    pub fn unsubscribe_from<S: Participant>(
        &self,
        subscriber: &Arc<impl Participant>,
        message: &str,
    ) -> Result<(), MessagingError> {
        let key = RoutingKey::typed_without_args::<S>(validate_message(message)?);
        self.remove_subscriber(&key, subscriber);
        Ok(())
    }

    /// Removes the args-only subscriptions of `subscriber` for argument type `A`.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    #[instrument(skip(self, subscriber), fields(args = type_name::<A>()))]
    pub fn unsubscribe_args<A: Participant>(
        &self,
        subscriber: &Arc<impl Participant>,
        message: &str,
    ) -> Result<(), MessagingError> {
        let key = RoutingKey::generic::<A>(validate_message(message)?);
        self.remove_subscriber(&key, subscriber);
        Ok(())
    }

    /// Adds a prebuilt record under `key`.
    ///
    /// Returns the shared record, which can be [disposed](Subscription::dispose)
    /// directly to stop it without removing it.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the key's message name is empty.
    pub fn register(&self, key: RoutingKey, record: Subscription) -> Result<Arc<Subscription>, MessagingError> {
        validate_message(key.message())?;
        let record = Arc::new(record);
        self.inner.registry.add(key, Arc::clone(&record));
        Ok(record)
    }

    /// Removes every prunable record from every bucket, returning how many
    /// were removed.
    pub fn sweep(&self) -> usize {
        self.inner.registry.sweep()
    }

    /// Number of registered records, dead ones included until pruned.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of records registered under `key`.
    #[must_use]
    pub fn subscription_count_for(&self, key: &RoutingKey) -> usize {
        self.inner.registry.count_for(key)
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.inner.registry.bucket_count()
    }

    /// True if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Counters describing this messenger's activity.
    #[must_use]
    pub fn stats(&self) -> &MessengerStats {
        &self.inner.stats
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &MessengerConfig {
        &self.inner.config
    }

    fn dispatch(&self, key: &RoutingKey, envelope: &Envelope) -> Result<(), MessagingError> {
        let delivered = self.inner.dispatcher.dispatch(&self.inner.registry, key, envelope)?;
        trace!(key = %key, delivered, "Message sent");
        Ok(())
    }

    fn remove_subscriber(&self, key: &RoutingKey, subscriber: &Arc<impl Participant>) {
        let subscriber = Arc::as_ptr(subscriber).cast::<()>();
        let removed = self
            .inner
            .registry
            .remove_matching(key, |record| record.is_prunable() || record.is_subscribed_by(subscriber));
        trace!(key = %key, removed, "Unsubscribed");
    }
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("subscriptions", &self.subscription_count())
            .field("buckets", &self.bucket_count())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Configures and builds a [`Messenger`].
#[derive(Debug, Default)]
pub struct MessengerBuilder {
    config: Option<MessengerConfig>,
    runtime: Option<Handle>,
}

impl MessengerBuilder {
    /// Uses `config` instead of loading one from disk.
    #[must_use]
    pub fn config(mut self, config: MessengerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Runs async handlers on `runtime`.
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the messenger.
    #[must_use]
    pub fn build(self) -> Messenger {
        let config = self.config.unwrap_or_else(MessengerConfig::load);
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        let stats = Arc::new(MessengerStats::default());
        let scheduler = Scheduler::new(runtime, Arc::clone(&stats), config.behavior.log_async_faults);
        let registry = SubscriptionRegistry::new(
            config.limits.bucket_capacity,
            config.behavior.prune_on_subscribe,
            Arc::clone(&stats),
        );
        trace!(?config, "Messenger created");
        Messenger {
            inner: Arc::new(MessengerInner {
                registry,
                dispatcher: Dispatcher::new(scheduler, Arc::clone(&stats)),
                config,
                stats,
            }),
        }
    }
}
