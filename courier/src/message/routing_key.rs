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

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a Rust type as used for routing.
///
/// Equality and hashing use only the [`TypeId`]; the type name is carried
/// along for logging.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Describes the type `T`.
    #[must_use]
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The type name reported by `std::any::type_name`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The sender half of a routing key.
///
/// `Any` is the sentinel used by generic subscriptions, which ignore the
/// concrete type of whoever sent the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SenderType {
    /// Matches any sender; the handler never receives the sender value.
    Any,
    /// A specific sender type.
    Concrete(TypeDescriptor),
}

impl SenderType {
    /// The concrete sender type `S`.
    #[must_use]
    pub fn of<S: Any>() -> Self {
        Self::Concrete(TypeDescriptor::of::<S>())
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderType::Any => f.write_str("*"),
            SenderType::Concrete(descriptor) => f.write_str(descriptor.name()),
        }
    }
}

/// Composite identity that buckets subscriptions: message name, sender type
/// and (optional) argument type.
///
/// Two keys are equal iff all three components are equal. Keys are immutable
/// and cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    message: Arc<str>,
    sender: SenderType,
    args: Option<TypeDescriptor>,
}

impl RoutingKey {
    /// Builds a key from its three components.
    #[must_use]
    pub fn new(message: impl Into<Arc<str>>, sender: SenderType, args: Option<TypeDescriptor>) -> Self {
        Self {
            message: message.into(),
            sender,
            args,
        }
    }

    /// Key for sender type `S` carrying arguments of type `A`.
    #[must_use]
    pub fn typed<S: Any, A: Any>(message: &str) -> Self {
        Self::new(message, SenderType::of::<S>(), Some(TypeDescriptor::of::<A>()))
    }

    /// Key for sender type `S` with no argument payload.
    #[must_use]
    pub fn typed_without_args<S: Any>(message: &str) -> Self {
        Self::new(message, SenderType::of::<S>(), None)
    }

    /// Key for any sender carrying arguments of type `A`.
    #[must_use]
    pub fn generic<A: Any>(message: &str) -> Self {
        Self::new(message, SenderType::Any, Some(TypeDescriptor::of::<A>()))
    }

    /// The generic counterpart of this key: same message and argument type,
    /// sender replaced by the `Any` sentinel.
    #[must_use]
    pub fn to_generic(&self) -> Self {
        Self {
            message: Arc::clone(&self.message),
            sender: SenderType::Any,
            args: self.args,
        }
    }

    /// The message name.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The shared message name, for envelopes and log fields.
    pub(crate) fn message_arc(&self) -> Arc<str> {
        Arc::clone(&self.message)
    }

    /// The sender half of the key.
    #[must_use]
    pub const fn sender_type(&self) -> SenderType {
        self.sender
    }

    /// The argument type, if the key carries one.
    #[must_use]
    pub const fn arg_type(&self) -> Option<TypeDescriptor> {
        self.args
    }

    /// True for keys registered against the `Any` sender sentinel.
    #[must_use]
    pub const fn is_generic(&self) -> bool {
        matches!(self.sender, SenderType::Any)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.args {
            Some(args) => write!(f, "{}({} -> {})", self.message, self.sender, args.name()),
            None => write!(f, "{}({})", self.message, self.sender),
        }
    }
}
