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

use std::sync::Arc;
use std::time::Duration;

use courier::prelude::*;
use parking_lot::Mutex;

// a model that announces its changes
#[derive(Debug)]
struct Document {
    title: Mutex<String>,
}

impl Document {
    fn new(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: Mutex::new(title.to_string()),
        })
    }

    fn rename(self: &Arc<Self>, messenger: &Messenger, title: &str) -> Result<(), MessagingError> {
        *self.title.lock() = title.to_string();
        messenger.send(self, "PropertyChanged", PropertyChanged("title"))
    }
}

// argument payload of `PropertyChanged`
#[derive(Debug, Clone, Copy)]
struct PropertyChanged(&'static str);

// listens to one document only
#[derive(Debug, Default)]
struct Editor;

// listens to every `PropertyChanged`, whoever sends it
#[derive(Debug, Default)]
struct StatusBar {
    changes: Mutex<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(true).without_time().init();

    // one messenger for the whole application, cloned into each component
    let messenger = Messenger::with_config(MessengerConfig::default());

    let draft = Document::new("draft");
    let notes = Document::new("notes");
    let editor = Arc::new(Editor);
    let status = Arc::new(StatusBar::default());

    messenger
        .subscribe(&editor, "PropertyChanged")
        .from_source(&draft)
        .on(|_: &Editor, document: &Document, change: &PropertyChanged| {
            println!("editor: draft {} is now {:?}", change.0, document.title.lock());
            Ok(())
        })?;

    messenger
        .subscribe(&status, "PropertyChanged")
        .on_args(|status: &StatusBar, change: &PropertyChanged| {
            *status.changes.lock() += 1;
            println!("status bar: {} changed ({} so far)", change.0, status.changes.lock());
            Ok(())
        })?;

    // autosave runs detached; renaming never waits for it
    messenger
        .subscribe(&editor, "PropertyChanged")
        .on_async(|_: Arc<Editor>, document: Arc<Document>, _: Arc<PropertyChanged>| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            println!("autosaved {:?}", document.title.lock());
            anyhow::Ok(())
        })?;

    draft.rename(&messenger, "chapter one")?;
    notes.rename(&messenger, "shopping")?;

    // the status bar goes away; its subscription goes quiet and is pruned later
    drop(status);
    notes.rename(&messenger, "groceries")?;
    println!("pruned {} dead subscription(s)", messenger.sweep());

    messenger.unsubscribe::<Document, PropertyChanged>(&editor, "PropertyChanged")?;
    draft.rename(&messenger, "chapter two")?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(
        "sent {} messages, {} deliveries",
        messenger.stats().messages_sent(),
        messenger.stats().deliveries()
    );
    Ok(())
}
