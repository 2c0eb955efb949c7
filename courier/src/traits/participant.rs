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

use std::any::Any;

/// Anything that can take part in messaging: subscribers, senders, explicit
/// sources, delegate targets and argument payloads.
///
/// Participants are identified by the address of their `Arc` allocation and
/// observed through `Weak` handles, so the messenger never has to know their
/// concrete types. The trait is implemented for every `Any + Send + Sync`
/// type; there is nothing to implement by hand.
pub trait Participant: Any + Send + Sync {}

impl<T: Any + Send + Sync> Participant for T {}
