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

use thiserror::Error;

/// Errors surfaced synchronously by messenger operations.
///
/// Faults raised by asynchronous handlers never appear here; they stay inside
/// the detached task that ran the handler.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MessagingError {
    /// A required parameter was absent or unusable.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A synchronous handler returned an error while a message was being sent.
    ///
    /// Deliveries that had not run yet for that send are skipped.
    #[error("handler for message `{message}` failed: {source}")]
    HandlerFault {
        /// The message being delivered.
        message: String,
        /// The error returned by the handler.
        #[source]
        source: anyhow::Error,
    },
}

impl MessagingError {
    pub(crate) const fn invalid_argument(name: &'static str, reason: &'static str) -> Self {
        Self::InvalidArgument { name, reason }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            MessagingError::InvalidArgument { .. } => "messaging_invalid_argument",
            MessagingError::HandlerFault { .. } => "messaging_handler_fault",
        }
    }

    /// True if the error came out of a handler body rather than from the
    /// arguments of the call.
    #[must_use]
    pub const fn is_handler_fault(&self) -> bool {
        matches!(self, MessagingError::HandlerFault { .. })
    }
}

/// Rejects empty message names.
pub(crate) fn validate_message(message: &str) -> Result<&str, MessagingError> {
    if message.is_empty() {
        Err(MessagingError::invalid_argument("message", "message name must not be empty"))
    } else {
        Ok(message)
    }
}
