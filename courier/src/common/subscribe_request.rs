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

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;

use crate::common::{Arity, Messenger, SourceFilter, Subscription, SubscriptionBuilder};
use crate::message::{downcast_arc, downcast_ref, validate_message, MessagingError, Payload, RoutingKey};
use crate::traits::Participant;

/// A pending subscription, completed by one of the `on*` methods.
///
/// Created by [`Messenger::subscribe`]. `T` is the type of the delegate
/// target the handler receives as its first parameter; it starts out as the
/// subscriber's own type.
///
/// Sync terminals take handlers returning `anyhow::Result<()>`; an error is
/// surfaced from [`Messenger::send`] as a handler fault. Async terminals take
/// handlers returning a `Send + 'static` future; those run detached and are
/// serialised per subscription.
#[must_use = "a subscription is only registered by one of the `on*` methods"]
pub struct SubscribeRequest<'m, T> {
    messenger: &'m Messenger,
    message: String,
    subscriber: Payload,
    target: Payload,
    source: Option<Payload>,
    _target: PhantomData<fn() -> T>,
}

impl<'m, T: Participant> SubscribeRequest<'m, T> {
    pub(crate) fn new(messenger: &'m Messenger, subscriber: Payload, target: Payload, message: &str) -> Self {
        Self {
            messenger,
            message: message.to_owned(),
            subscriber,
            target,
            source: None,
            _target: PhantomData,
        }
    }

    /// Only deliver messages whose sender is this exact instance.
    ///
    /// Has no effect on args-only subscriptions, which accept every sender.
    pub fn from_source<S: Participant>(mut self, source: &Arc<S>) -> Self {
        self.source = Some(Arc::clone(source) as Payload);
        self
    }

    /// Binds the handler to `target` instead of the subscriber.
    ///
    /// A target other than the subscriber is held strongly for as long as
    /// the subscription exists.
    pub fn bind<U: Participant>(self, target: &Arc<U>) -> SubscribeRequest<'m, U> {
        SubscribeRequest {
            messenger: self.messenger,
            message: self.message,
            subscriber: self.subscriber,
            target: Arc::clone(target) as Payload,
            source: self.source,
            _target: PhantomData,
        }
    }

    /// Uses a handler that is not bound to any object.
    ///
    /// Such a subscription only goes away with its subscriber or through
    /// an explicit unsubscribe.
    pub fn unbound(self) -> SubscribeRequest<'m, ()> {
        self.bind(&Arc::new(()))
    }

    /// Sender and arguments, synchronously.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    pub fn on<S, A, F>(self, handler: F) -> Result<(), MessagingError>
    where
        S: Participant,
        A: Participant,
        F: Fn(&T, &S, &A) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let key = RoutingKey::typed::<S, A>(validate_message(&self.message)?);
        let filter = self.filter();
        self.register(key, filter, |builder| {
            builder.sync_handler(Arity::Binary, move |target, sender, args| {
                let (Some(target), Some(sender), Some(args)) = (
                    downcast_ref::<T>(target),
                    sender.and_then(downcast_ref::<S>),
                    args.and_then(downcast_ref::<A>),
                ) else {
                    return Ok(());
                };
                handler(target, sender, args)
            })
        })
    }

    /// Sender only, synchronously. Matches sends that carry no arguments.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    pub fn on_sender<S, F>(self, handler: F) -> Result<(), MessagingError>
    where
        S: Participant,
        F: Fn(&T, &S) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let key = RoutingKey::typed_without_args::<S>(validate_message(&self.message)?);
        let filter = self.filter();
        self.register(key, filter, |builder| {
            builder.sync_handler(Arity::Unary, move |target, sender, _| {
                let (Some(target), Some(sender)) = (downcast_ref::<T>(target), sender.and_then(downcast_ref::<S>))
                else {
                    return Ok(());
                };
                handler(target, sender)
            })
        })
    }

    /// Arguments only, from any sender, synchronously.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    pub fn on_args<A, F>(self, handler: F) -> Result<(), MessagingError>
    where
        A: Participant,
        F: Fn(&T, &A) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let key = RoutingKey::generic::<A>(validate_message(&self.message)?);
        self.register(key, SourceFilter::Any, |builder| {
            builder.sync_handler(Arity::Unary, move |target, args, _| {
                let (Some(target), Some(args)) = (downcast_ref::<T>(target), args.and_then(downcast_ref::<A>)) else {
                    return Ok(());
                };
                handler(target, args)
            })
        })
    }

    /// Sender and arguments, asynchronously.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    pub fn on_async<S, A, F, Fut>(self, handler: F) -> Result<(), MessagingError>
    where
        S: Participant,
        A: Participant,
        F: Fn(Arc<T>, Arc<S>, Arc<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let key = RoutingKey::typed::<S, A>(validate_message(&self.message)?);
        let filter = self.filter();
        self.register(key, filter, |builder| {
            builder.async_handler(Arity::Binary, move |target, sender, args| {
                match (
                    downcast_arc::<T>(target),
                    sender.and_then(downcast_arc::<S>),
                    args.and_then(downcast_arc::<A>),
                ) {
                    (Some(target), Some(sender), Some(args)) => handler(target, sender, args).boxed(),
                    _ => futures::future::ok(()).boxed(),
                }
            })
        })
    }

    /// Sender only, asynchronously. Matches sends that carry no arguments.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    pub fn on_sender_async<S, F, Fut>(self, handler: F) -> Result<(), MessagingError>
    where
        S: Participant,
        F: Fn(Arc<T>, Arc<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let key = RoutingKey::typed_without_args::<S>(validate_message(&self.message)?);
        let filter = self.filter();
        self.register(key, filter, |builder| {
            builder.async_handler(Arity::Unary, move |target, sender, _| {
                match (downcast_arc::<T>(target), sender.and_then(downcast_arc::<S>)) {
                    (Some(target), Some(sender)) => handler(target, sender).boxed(),
                    _ => futures::future::ok(()).boxed(),
                }
            })
        })
    }

    /// Arguments only, from any sender, asynchronously.
    ///
    /// # Errors
    ///
    /// [`MessagingError::InvalidArgument`] if the message name is empty.
    pub fn on_args_async<A, F, Fut>(self, handler: F) -> Result<(), MessagingError>
    where
        A: Participant,
        F: Fn(Arc<T>, Arc<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let key = RoutingKey::generic::<A>(validate_message(&self.message)?);
        self.register(key, SourceFilter::Any, |builder| {
            builder.async_handler(Arity::Unary, move |target, args, _| {
                match (downcast_arc::<T>(target), args.and_then(downcast_arc::<A>)) {
                    (Some(target), Some(args)) => handler(target, args).boxed(),
                    _ => futures::future::ok(()).boxed(),
                }
            })
        })
    }

    fn filter(&self) -> SourceFilter {
        self.source.as_ref().map_or(SourceFilter::Any, SourceFilter::instance)
    }

    fn register<B>(self, key: RoutingKey, filter: SourceFilter, with_handler: B) -> Result<(), MessagingError>
    where
        B: FnOnce(SubscriptionBuilder) -> SubscriptionBuilder,
    {
        let builder = Subscription::builder()
            .subscriber(self.subscriber)
            .target(self.target)
            .filter(filter);
        let record = with_handler(builder).build()?;
        self.messenger.register(key, record)?;
        Ok(())
    }
}
