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

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use courier::prelude::*;

use crate::setup::*;

mod setup;

#[test]
fn test_args_subscription_counts_every_sender() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    messenger.subscribe(&view, "Ping").on_args(|view: &View, _: &u32| {
        view.hit();
        Ok(())
    })?;

    messenger.send(&Arc::new(Model::named("a")), "Ping", 1_u32)?;
    assert_eq!(view.hits(), 1);

    messenger.send(&Arc::new(Timer), "Ping", 2_u32)?;
    assert_eq!(view.hits(), 2);

    messenger.unsubscribe_args::<u32>(&view, "Ping")?;
    messenger.send(&Arc::new(Model::named("a")), "Ping", 3_u32)?;
    assert_eq!(view.hits(), 2);
    assert!(messenger.is_empty());
    Ok(())
}

#[test]
fn test_explicit_source_matches_identity() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    let source = Arc::new(Model::named("x"));
    let twin = Arc::new(Model::named("x"));

    messenger
        .subscribe(&view, "Changed")
        .from_source(&source)
        .on(|view: &View, model: &Model, change: &Changed| {
            view.record(format!("{}.{}", model.name, change.field));
            Ok(())
        })?;

    messenger.send(&source, "Changed", Changed::field("title"))?;
    messenger.send(&twin, "Changed", Changed::field("body"))?;
    assert_eq!(view.log(), vec!["x.title".to_string()]);
    Ok(())
}

#[test]
fn test_args_subscription_never_receives_the_sender() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    messenger.subscribe(&view, "Select").on_args(|view: &View, model: &Model| {
        view.record(model.name.clone());
        Ok(())
    })?;

    messenger.send(&Arc::new(Model::named("sender")), "Select", Model::named("args"))?;
    assert_eq!(view.log(), vec!["args".to_string()]);
    Ok(())
}

#[test]
fn test_typed_subscription_fires_once_per_send() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    let model = Arc::new(Model::named("doc"));
    messenger.subscribe(&view, "Changed").on(|view: &View, _: &Model, change: &Changed| {
        view.record(change.field.clone());
        Ok(())
    })?;

    for field in ["a", "b", "c"] {
        messenger.send(&model, "Changed", Changed::field(field))?;
    }
    assert_eq!(view.log(), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_typed_subscription_ignores_other_sender_types() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    messenger.subscribe(&view, "Changed").on(|view: &View, _: &Model, _: &Changed| {
        view.hit();
        Ok(())
    })?;

    messenger.send(&Arc::new(Timer), "Changed", Changed::field("tick"))?;
    messenger.send(&Arc::new(Model::default()), "Changed", 5_u32)?;
    messenger.send(&Arc::new(Model::default()), "Other", Changed::field("x"))?;
    assert_eq!(view.hits(), 0);
    Ok(())
}

#[test]
fn test_sender_only_subscription_matches_sends_without_args() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    let model = Arc::new(Model::named("doc"));
    messenger.subscribe(&view, "Saved").on_sender(|view: &View, model: &Model| {
        view.record(model.name.clone());
        Ok(())
    })?;

    messenger.send_from(&model, "Saved")?;
    messenger.send(&model, "Saved", 1_u32)?;
    assert_eq!(view.log(), vec!["doc".to_string()]);

    messenger.unsubscribe_from::<Model>(&view, "Saved")?;
    messenger.send_from(&model, "Saved")?;
    assert_eq!(view.hits(), 1);
    Ok(())
}

#[test]
fn test_duplicate_subscriptions_fire_independently() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    for _ in 0..2 {
        messenger.subscribe(&view, "Ping").on_args(|view: &View, _: &u32| {
            view.hit();
            Ok(())
        })?;
    }

    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    assert_eq!(view.hits(), 2);

    messenger.unsubscribe_args::<u32>(&view, "Ping")?;
    assert_eq!(messenger.subscription_count(), 0);
    Ok(())
}

#[test]
fn test_unsubscribe_without_subscription_is_a_no_op() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let stranger = Arc::new(View::default());
    let view = Arc::new(View::default());
    messenger.subscribe(&view, "Ping").on_args(|view: &View, _: &u32| {
        view.hit();
        Ok(())
    })?;

    messenger.unsubscribe_args::<u32>(&stranger, "Ping")?;
    messenger.unsubscribe::<Model, u32>(&stranger, "Nothing")?;
    assert_eq!(messenger.subscription_count(), 1);
    assert_eq!(messenger.stats().subscriptions_removed(), 0);

    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    assert_eq!(view.hits(), 1);
    Ok(())
}

#[test]
fn test_handler_error_stops_the_send() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let failing = Arc::new(View::default());
    let after = Arc::new(View::default());
    messenger.subscribe(&failing, "Ping").on_args(|view: &View, value: &u32| {
        view.hit();
        anyhow::bail!("cannot handle {value}")
    })?;
    messenger.subscribe(&after, "Ping").on_args(|view: &View, _: &u32| {
        view.hit();
        Ok(())
    })?;

    let err = messenger.send(&Arc::new(Timer), "Ping", 7_u32).unwrap_err();
    assert!(err.is_handler_fault());
    assert_eq!(err.as_label(), "messaging_handler_fault");
    assert_eq!(err.to_string(), "handler for message `Ping` failed: cannot handle 7");
    assert_eq!(failing.hits(), 1);
    assert_eq!(after.hits(), 0);
    Ok(())
}

#[test]
fn test_sync_handler_panic_unwinds_through_send() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    messenger.subscribe(&view, "Ping").on_args(|view: &View, value: &u32| {
        view.hit();
        assert_ne!(*value, 13, "unlucky value");
        Ok(())
    })?;

    let result = catch_unwind(AssertUnwindSafe(|| messenger.send(&Arc::new(Timer), "Ping", 13_u32)));
    assert!(result.is_err());
    assert_eq!(view.hits(), 1);

    messenger.send(&Arc::new(Timer), "Ping", 1_u32)?;
    assert_eq!(view.hits(), 2);

    messenger.unsubscribe_args::<u32>(&view, "Ping")?;
    assert!(messenger.is_empty());
    Ok(())
}

#[test]
fn test_handler_can_unsubscribe_itself_during_send() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    let inner = messenger.clone();
    let handle = Arc::clone(&view);
    messenger.subscribe(&view, "Ping").on_args(move |view: &View, _: &u32| {
        view.hit();
        inner.unsubscribe_args::<u32>(&handle, "Ping")?;
        Ok(())
    })?;

    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    assert_eq!(view.hits(), 1);
    assert!(messenger.is_empty());
    Ok(())
}

#[test]
fn test_subscription_added_during_send_waits_for_the_next_send() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let first = Arc::new(View::default());
    let late = Arc::new(View::default());
    let added = Arc::new(AtomicBool::new(false));

    let inner = messenger.clone();
    let late_handle = Arc::clone(&late);
    let flag = Arc::clone(&added);
    messenger.subscribe(&first, "Ping").on_args(move |view: &View, _: &u32| {
        view.hit();
        if !flag.swap(true, Ordering::SeqCst) {
            inner.subscribe(&late_handle, "Ping").on_args(|view: &View, _: &u32| {
                view.hit();
                Ok(())
            })?;
        }
        Ok(())
    })?;

    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    assert_eq!((first.hits(), late.hits()), (1, 0));
    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    assert_eq!((first.hits(), late.hits()), (2, 1));
    Ok(())
}

#[test]
fn test_bound_target_receives_the_call() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    let presenter = Arc::new(View::default());
    messenger.subscribe(&view, "Ping").bind(&presenter).on_args(|target: &View, _: &u32| {
        target.hit();
        Ok(())
    })?;

    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    assert_eq!((view.hits(), presenter.hits()), (0, 1));
    Ok(())
}

#[test]
fn test_empty_message_names_are_rejected() {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());

    let err = messenger.send(&Arc::new(Timer), "", 0_u32).unwrap_err();
    assert!(matches!(err, MessagingError::InvalidArgument { name: "message", .. }));

    let err = messenger
        .subscribe(&view, "")
        .on_args(|_: &View, _: &u32| Ok(()))
        .unwrap_err();
    assert_eq!(err.as_label(), "messaging_invalid_argument");

    assert!(messenger.unsubscribe_args::<u32>(&view, "").is_err());
    assert!(messenger.send_from(&view, "").is_err());
    assert!(messenger.is_empty());
    assert_eq!(messenger.stats().messages_sent(), 0);
}

#[test]
fn test_stats_track_sends_and_deliveries() -> anyhow::Result<()> {
    initialize_tracing();
    let messenger = messenger();
    let view = Arc::new(View::default());
    messenger.subscribe(&view, "Ping").on_args(|view: &View, _: &u32| {
        view.hit();
        Ok(())
    })?;
    messenger.subscribe(&view, "Ping").on(|view: &View, _: &Timer, _: &u32| {
        view.hit();
        Ok(())
    })?;

    messenger.send(&Arc::new(Timer), "Ping", 0_u32)?;
    messenger.send(&Arc::new(Model::default()), "Ping", 0_u32)?;

    let stats = messenger.stats();
    assert_eq!(stats.subscriptions_added(), 2);
    assert_eq!(stats.messages_sent(), 2);
    assert_eq!(stats.deliveries(), 3);
    assert_eq!(messenger.bucket_count(), 2);
    assert_eq!(messenger.subscription_count_for(&RoutingKey::generic::<u32>("Ping")), 1);
    Ok(())
}
