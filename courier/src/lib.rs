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

#![forbid(unsafe_code)]
#![forbid(missing_docs)]

//! # Courier
//!
//! An in-process, type-routed publish/subscribe messenger. Components talk to
//! each other by message name without holding references to one another, and
//! a subscription never keeps its subscriber alive.
//!
//! ## Key Concepts
//!
//! - **Routing keys**: a message name plus the sender type and argument type.
//!   Sends are delivered to subscriptions for exactly those types, and to
//!   args-only subscriptions that accept any sender.
//! - **Weak subscribers**: subscribers are observed through `Weak` handles.
//!   Dropping a subscriber silences its subscriptions; the records are
//!   removed lazily.
//! - **Sync and async handlers**: synchronous handlers run inline during a
//!   send and may fail it; asynchronous handlers run detached on tokio,
//!   serialised per subscription.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use courier::prelude::*;
//!
//! struct Counter(AtomicUsize);
//! struct Model;
//!
//! let messenger = Messenger::with_config(MessengerConfig::default());
//! let counter = Arc::new(Counter(AtomicUsize::new(0)));
//! messenger
//!     .subscribe(&counter, "Ping")
//!     .on_args(|counter: &Counter, step: &usize| {
//!         counter.0.fetch_add(*step, Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! messenger.send(&Arc::new(Model), "Ping", 2_usize).unwrap();
//! assert_eq!(counter.0.load(Ordering::SeqCst), 2);
//! ```

/// The messenger facade, subscription records, registry and dispatch.
pub(crate) mod common;

/// Routing keys, payloads and error types.
pub(crate) mod message;

/// Traits shared across the crate.
pub(crate) mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Core Types
/// *   [`crate::common::Messenger`]: the bus handle.
/// *   [`crate::common::MessengerBuilder`]: configures a messenger.
/// *   [`crate::common::SubscribeRequest`]: fluent subscription request.
/// *   [`crate::common::Subscription`]: a registered handler record.
/// *   [`crate::common::SubscriptionBuilder`]: builds records by hand.
/// *   [`crate::common::MessengerConfig`]: messenger configuration.
/// *   [`crate::common::MessengerStats`]: activity counters.
/// *   [`crate::message::RoutingKey`]: message name plus sender and argument types.
/// *   [`crate::message::MessagingError`]: errors returned by messenger operations.
/// *   [`crate::traits::Participant`]: bound for every value that takes part in messaging.
pub mod prelude {
    pub use crate::common::{
        Arity, AsyncHandlerFn, BehaviorConfig, HandlerFuture, HandlerKind, InvokeOutcome, LimitsConfig, Messenger,
        MessengerBuilder, MessengerConfig, MessengerStats, SourceFilter, SubscribeRequest, Subscription,
        SubscriptionBuilder, SyncHandlerFn,
    };
    pub use crate::message::{Envelope, MessagingError, Payload, RoutingKey, SenderType, TypeDescriptor};
    pub use crate::traits::Participant;
}
