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
use std::fmt;
use std::sync::Arc;

/// A type-erased, shareable value travelling through the messenger.
///
/// Senders, argument payloads and delegate targets are all carried this way
/// so that asynchronous handlers can keep them past the end of a send.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Borrows the concrete value behind a payload, if it is a `T`.
pub(crate) fn downcast_ref<T: Any>(payload: &Payload) -> Option<&T> {
    (**payload).downcast_ref::<T>()
}

/// Recovers a typed `Arc` from a payload, if it holds a `T`.
pub(crate) fn downcast_arc<T: Any + Send + Sync>(payload: Payload) -> Option<Arc<T>> {
    payload.downcast::<T>().ok()
}

/// Address of the allocation behind a payload, without the vtable.
pub(crate) fn payload_addr(payload: &Payload) -> *const () {
    Arc::as_ptr(payload).cast::<()>()
}

/// One message in flight: its name, the sender that produced it and the
/// optional argument payload.
#[derive(Clone)]
pub struct Envelope {
    message: Arc<str>,
    sender: Payload,
    args: Option<Payload>,
}

impl Envelope {
    pub(crate) fn new(message: Arc<str>, sender: Payload, args: Option<Payload>) -> Self {
        Self {
            message,
            sender,
            args,
        }
    }

    /// The message name.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn message_arc(&self) -> Arc<str> {
        Arc::clone(&self.message)
    }

    /// The actual sender. Source filters are always evaluated against this.
    #[must_use]
    pub const fn sender(&self) -> &Payload {
        &self.sender
    }

    /// The argument payload, if the send carried one.
    #[must_use]
    pub const fn args(&self) -> Option<&Payload> {
        self.args.as_ref()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("message", &self.message)
            .field("sender", &payload_addr(&self.sender))
            .field("has_args", &self.args.is_some())
            .finish()
    }
}
