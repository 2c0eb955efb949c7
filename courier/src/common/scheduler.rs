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
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::{trace, warn};

use crate::common::{HandlerFuture, MessengerStats};

/// Runs asynchronous handler invocations as detached tokio tasks.
///
/// Nothing is ever awaited on behalf of the sender: a task's failure or
/// panic is counted, optionally logged, and dropped.
#[derive(Debug, Clone)]
pub(crate) struct Scheduler {
    runtime: Option<Handle>,
    stats: Arc<MessengerStats>,
    log_faults: bool,
}

impl Scheduler {
    pub(crate) const fn new(runtime: Option<Handle>, stats: Arc<MessengerStats>, log_faults: bool) -> Self {
        Self {
            runtime,
            stats,
            log_faults,
        }
    }

    /// Spawns `task`, returning false if no runtime was available.
    pub(crate) fn spawn(&self, message: Arc<str>, task: HandlerFuture) -> bool {
        let Some(handle) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            self.stats.record_async_fault();
            warn!(message = %message, "No tokio runtime available, dropping async delivery");
            return false;
        };

        let stats = Arc::clone(&self.stats);
        let log_faults = self.log_faults;
        self.stats.record_scheduled();
        handle.spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => trace!(message = %message, "Async handler completed"),
                Ok(Err(error)) => {
                    stats.record_async_fault();
                    if log_faults {
                        warn!(message = %message, error = %error, "Async handler failed");
                    }
                }
                Err(panic) => {
                    stats.record_async_fault();
                    if log_faults {
                        warn!(message = %message, panic = panic_message(panic.as_ref()), "Async handler panicked");
                    }
                }
            }
        });
        true
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_task_is_counted() {
        let stats = Arc::new(MessengerStats::default());
        let scheduler = Scheduler::new(None, Arc::clone(&stats), false);

        let (tx, rx) = tokio::sync::oneshot::channel();
        let spawned = scheduler.spawn(
            "Ping".into(),
            async move {
                let _ = tx.send(());
                Err(anyhow::anyhow!("nope"))
            }
            .boxed(),
        );
        assert!(spawned);
        rx.await.unwrap();
        tokio::task::yield_now().await;
        for _ in 0..100 {
            if stats.async_faults() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(stats.async_scheduled(), 1);
        assert_eq!(stats.async_faults(), 1);
    }

    #[test]
    fn without_runtime_nothing_is_spawned() {
        let stats = Arc::new(MessengerStats::default());
        let scheduler = Scheduler::new(None, Arc::clone(&stats), true);
        assert!(!scheduler.spawn("Ping".into(), async { anyhow::Ok(()) }.boxed()));
        assert_eq!(stats.async_scheduled(), 0);
        assert_eq!(stats.async_faults(), 1);
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let text: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(text.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "<non-string panic payload>");
    }
}
