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

//! The subscription record: one registered handler together with its liveness
//! and concurrency state.
//!
//! # Delegate holding
//!
//! A record keeps its subscriber through a `Weak` handle only. The delegate
//! target (the value the handler is bound to) is held the same way when it is
//! the subscriber itself; any other target is held strongly, on the assumption
//! that a handler bound to a different object should outlive the subscriber's
//! own references to it. Binding to a long-lived object other than the
//! subscriber therefore keeps that object alive until the record is removed.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::common::scheduler::Scheduler;
use crate::common::{AsyncHandlerFn, SyncHandlerFn};
use crate::message::{payload_addr, Envelope, MessagingError, Payload};

/// How many positional values a handler takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// One value: the sender when one is delivered, otherwise the arguments.
    Unary,
    /// Two values: sender and arguments, positionally.
    Binary,
}

impl Arity {
    fn select<'a>(
        self,
        sender: Option<&'a Payload>,
        args: Option<&'a Payload>,
    ) -> (Option<&'a Payload>, Option<&'a Payload>) {
        match self {
            Arity::Unary => (sender.or(args), None),
            Arity::Binary => (sender, args),
        }
    }
}

/// Which dispatch path a record uses. Fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    /// Runs inline on the sending thread.
    Sync,
    /// Runs as a detached task, serialised per record.
    Async,
}

#[derive(Clone)]
enum Handler {
    Sync(Arity, Arc<SyncHandlerFn>),
    Async(Arity, Arc<AsyncHandlerFn>),
}

/// Reference to the value a handler is bound to.
enum DelegateRef {
    Owning(Payload),
    NonOwning(Weak<dyn Any + Send + Sync>),
}

impl DelegateRef {
    fn new(subscriber: &Payload, target: Payload) -> Self {
        if payload_addr(subscriber) == payload_addr(&target) {
            DelegateRef::NonOwning(Arc::downgrade(&target))
        } else {
            DelegateRef::Owning(target)
        }
    }

    fn resolve(&self) -> Option<Payload> {
        match self {
            DelegateRef::Owning(target) => Some(Arc::clone(target)),
            DelegateRef::NonOwning(target) => target.upgrade(),
        }
    }

    fn is_dead(&self) -> bool {
        match self {
            DelegateRef::Owning(_) => false,
            DelegateRef::NonOwning(target) => target.strong_count() == 0,
        }
    }
}

/// Predicate deciding whether a record accepts a given sender.
#[derive(Clone, Default)]
pub enum SourceFilter {
    /// Accept every sender. Generic subscriptions always use this.
    #[default]
    Any,
    /// Accept only the sender that is this exact allocation.
    ///
    /// The source is observed weakly; once it is gone nothing matches.
    Instance(Weak<dyn Any + Send + Sync>),
    /// Accept senders for which the predicate returns true.
    Predicate(Arc<dyn Fn(&Payload) -> bool + Send + Sync>),
}

impl SourceFilter {
    /// Filter accepting only `source`.
    #[must_use]
    pub fn instance(source: &Payload) -> Self {
        SourceFilter::Instance(Arc::downgrade(source))
    }

    /// Evaluates the filter against the actual sender.
    #[must_use]
    pub fn passes(&self, sender: &Payload) -> bool {
        match self {
            SourceFilter::Any => true,
            SourceFilter::Instance(source) => source.as_ptr().cast::<()>() == payload_addr(sender),
            SourceFilter::Predicate(predicate) => predicate(sender),
        }
    }
}

impl fmt::Debug for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFilter::Any => f.write_str("Any"),
            SourceFilter::Instance(source) => f.debug_tuple("Instance").field(&source.as_ptr().cast::<()>()).finish(),
            SourceFilter::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

/// What happened when a record was offered a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The synchronous handler ran.
    Delivered,
    /// The asynchronous handler was handed to the runtime.
    Scheduled,
    /// The source filter rejected the sender.
    Filtered,
    /// The record has been disposed.
    Disposed,
    /// The weakly held delegate target is gone.
    TargetDead,
    /// No runtime was available to run the asynchronous handler.
    Unscheduled,
}

/// One registered handler plus its liveness and concurrency state.
pub struct Subscription {
    subscriber: Weak<dyn Any + Send + Sync>,
    delegate: DelegateRef,
    kind: HandlerKind,
    handler: RwLock<Option<Handler>>,
    filter: SourceFilter,
    gate: Option<Arc<Semaphore>>,
    disposed: AtomicBool,
}

impl Subscription {
    /// Starts building a record.
    #[must_use]
    pub fn builder() -> SubscriptionBuilder {
        SubscriptionBuilder::default()
    }

    /// The dispatch path of this record.
    #[must_use]
    pub const fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// True while the subscriber can still be reached.
    #[must_use]
    pub fn is_subscriber_alive(&self) -> bool {
        self.subscriber.strong_count() > 0
    }

    /// True if `subscriber` is the allocation this record was registered for.
    #[must_use]
    pub fn is_subscribed_by(&self, subscriber: *const ()) -> bool {
        self.is_subscriber_alive() && self.subscriber.as_ptr().cast::<()>() == subscriber
    }

    /// True iff the subscriber is gone, or the delegate target is held weakly
    /// and is gone.
    #[must_use]
    pub fn is_prunable(&self) -> bool {
        !self.is_subscriber_alive() || self.delegate.is_dead()
    }

    /// True once the record has been finalised.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Finalises the record: it will never invoke its handler again.
    ///
    /// Pending asynchronous invocations waiting on the gate are abandoned.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(gate) = &self.gate {
            gate.close();
        }
        let handler = self.handler.write().take();
        drop(handler);
    }

    /// Offers one message to this record.
    ///
    /// `deliver_sender` is false for generic records: the filter still sees
    /// the real sender but the handler does not receive it.
    ///
    /// # Errors
    ///
    /// Returns whatever error a synchronous handler returned. Asynchronous
    /// handlers never produce an error here.
    pub(crate) fn invoke(
        self: &Arc<Self>,
        envelope: &Envelope,
        deliver_sender: bool,
        scheduler: &Scheduler,
    ) -> anyhow::Result<InvokeOutcome> {
        if !self.filter.passes(envelope.sender()) {
            return Ok(InvokeOutcome::Filtered);
        }
        if self.is_disposed() {
            return Ok(InvokeOutcome::Disposed);
        }
        let Some(handler) = self.handler.read().clone() else {
            return Ok(InvokeOutcome::Disposed);
        };
        // Liveness is re-checked here, the snapshot may be stale.
        let Some(target) = self.delegate.resolve() else {
            return Ok(InvokeOutcome::TargetDead);
        };
        let sender = deliver_sender.then(|| envelope.sender());

        match handler {
            Handler::Sync(arity, call) => {
                let (first, second) = arity.select(sender, envelope.args());
                call(&target, first, second)?;
                Ok(InvokeOutcome::Delivered)
            }
            Handler::Async(arity, call) => {
                let (first, second) = arity.select(sender, envelope.args());
                let (first, second) = (first.cloned(), second.cloned());
                let record = Arc::clone(self);
                let message = envelope.message_arc();
                let task = async move {
                    let Some(gate) = record.gate.clone() else {
                        return Ok(());
                    };
                    let Ok(_permit) = gate.acquire_owned().await else {
                        trace!("Gate closed before acquisition, abandoning invocation");
                        return Ok(());
                    };
                    if record.is_disposed() {
                        return Ok(());
                    }
                    call(target, first, second).await
                };
                if scheduler.spawn(message, Box::pin(task)) {
                    Ok(InvokeOutcome::Scheduled)
                } else {
                    Ok(InvokeOutcome::Unscheduled)
                }
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber.as_ptr().cast::<()>())
            .field("owning_target", &matches!(self.delegate, DelegateRef::Owning(_)))
            .field("kind", &self.kind)
            .field("filter", &self.filter)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Builder for [`Subscription`] records.
///
/// Exactly one of [`sync_handler`](Self::sync_handler) and
/// [`async_handler`](Self::async_handler) must be supplied.
#[derive(Default)]
pub struct SubscriptionBuilder {
    subscriber: Option<Payload>,
    target: Option<Payload>,
    sync: Option<(Arity, Arc<SyncHandlerFn>)>,
    asynchronous: Option<(Arity, Arc<AsyncHandlerFn>)>,
    filter: SourceFilter,
}

impl SubscriptionBuilder {
    /// The subscribing component. Only a weak handle to it is kept.
    #[must_use]
    pub fn subscriber(mut self, subscriber: Payload) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// The value the handler is bound to. Defaults to the subscriber.
    #[must_use]
    pub fn target(mut self, target: Payload) -> Self {
        self.target = Some(target);
        self
    }

    /// A synchronous handler.
    #[must_use]
    pub fn sync_handler<F>(mut self, arity: Arity, handler: F) -> Self
    where
        F: Fn(&Payload, Option<&Payload>, Option<&Payload>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.sync = Some((arity, Arc::new(handler)));
        self
    }

    /// An asynchronous handler.
    #[must_use]
    pub fn async_handler<F>(mut self, arity: Arity, handler: F) -> Self
    where
        F: Fn(Payload, Option<Payload>, Option<Payload>) -> crate::common::HandlerFuture + Send + Sync + 'static,
    {
        self.asynchronous = Some((arity, Arc::new(handler)));
        self
    }

    /// Restricts delivery to senders accepted by `filter`.
    #[must_use]
    pub fn filter(mut self, filter: SourceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Builds the record.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the subscriber is missing, or if
    /// not exactly one handler was supplied.
    pub fn build(self) -> Result<Subscription, MessagingError> {
        let subscriber = self
            .subscriber
            .ok_or_else(|| MessagingError::invalid_argument("subscriber", "a subscriber is required"))?;

        let handler = match (self.sync, self.asynchronous) {
            (Some((arity, call)), None) => Handler::Sync(arity, call),
            (None, Some((arity, call))) => Handler::Async(arity, call),
            (None, None) => {
                return Err(MessagingError::invalid_argument("handler", "a handler is required"));
            }
            (Some(_), Some(_)) => {
                return Err(MessagingError::invalid_argument(
                    "handler",
                    "a handler must be either synchronous or asynchronous, not both",
                ));
            }
        };

        let (kind, gate) = match handler {
            Handler::Sync(..) => (HandlerKind::Sync, None),
            Handler::Async(..) => (HandlerKind::Async, Some(Arc::new(Semaphore::new(1)))),
        };
        let target = self.target.unwrap_or_else(|| Arc::clone(&subscriber));

        Ok(Subscription {
            subscriber: Arc::downgrade(&subscriber),
            delegate: DelegateRef::new(&subscriber, target),
            kind,
            handler: RwLock::new(Some(handler)),
            filter: self.filter,
            gate,
            disposed: AtomicBool::new(false),
        })
    }
}
