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

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A producer of messages.
#[derive(Debug, Default)]
pub struct Model {
    pub name: String,
}

impl Model {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

/// A second, unrelated producer type.
#[derive(Debug, Default)]
pub struct Timer;

/// A subscriber that records what it received.
#[derive(Debug, Default)]
pub struct View {
    hits: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl View {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.hit();
        self.log.lock().push(entry.into());
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

/// Argument payload carried by `Changed` messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changed {
    pub field: String,
}

impl Changed {
    pub fn field(field: &str) -> Self {
        Self { field: field.to_string() }
    }
}
