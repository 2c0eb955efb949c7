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

//! Runtime-facing components of the messenger.
//!
//! *   [`Messenger`]: the bus handle; send, subscribe and unsubscribe.
//! *   [`SubscribeRequest`]: fluent subscription, one terminal per handler shape.
//! *   [`Subscription`]: one registered handler plus its liveness state.
//! *   [`MessengerConfig`]: configuration loaded from XDG locations.
//! *   [`MessengerStats`]: activity counters.
//!
//! Registry, dispatch and scheduling live in private submodules.

// --- Public Re-exports ---
pub use config::{BehaviorConfig, LimitsConfig, MessengerConfig};
pub use messenger::{Messenger, MessengerBuilder};
pub use stats::MessengerStats;
pub use subscribe_request::SubscribeRequest;
pub use subscription::{Arity, HandlerKind, InvokeOutcome, SourceFilter, Subscription, SubscriptionBuilder};
pub use types::*;

// --- Submodules ---

/// Erased handler signatures.
mod types;

/// Configuration for the messenger.
mod config;
/// The `Dispatcher` resolving a send to subscription records.
mod dispatcher;
/// The `Messenger` facade and its builder.
mod messenger;
/// The routing-key to record store.
mod registry;
/// Detached execution of async handlers.
mod scheduler;
/// Activity counters.
mod stats;
/// The fluent subscription request.
mod subscribe_request;
/// The subscription record.
mod subscription;
