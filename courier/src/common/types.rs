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

//! Type aliases for the erased handler signatures stored in subscription
//! records.
//!
//! Typed closures supplied through the public API are wrapped into one of these
//! shapes at subscribe time, so the dispatch path never needs reflection.

use futures::future::BoxFuture;

use crate::message::Payload;

/// Future returned by an asynchronous handler.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Erased synchronous handler: `(target, first, second)`.
///
/// Which values arrive as `first` and `second` depends on the handler's
/// [`Arity`](crate::common::Arity).
pub type SyncHandlerFn =
    dyn Fn(&Payload, Option<&Payload>, Option<&Payload>) -> anyhow::Result<()> + Send + Sync + 'static;

/// Erased asynchronous handler: `(target, first, second)` by value, returning
/// the future to run on the runtime.
pub type AsyncHandlerFn =
    dyn Fn(Payload, Option<Payload>, Option<Payload>) -> HandlerFuture + Send + Sync + 'static;
