//! Integration tests for the event pump: dispatch from inbound messages,
//! directory upkeep, and cooperative shutdown.

mod common;

use adjutant::platform::Event;
use common::*;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn control_loop_dispatches_and_shuts_down() {
    let mut fixture = test_bot().await;
    let (events_tx, events_rx) = mpsc::channel(16);

    let bot = fixture.bot.clone();
    let pump = tokio::spawn(async move { bot.run(events_rx).await });

    // Private-channel text is a command without any mention prefix.
    events_tx
        .send(Event::Message(message(MALLORY, DM, "help")))
        .await
        .expect("send event");
    let reply = next_reply(&mut fixture.outbox).await;
    assert!(reply.text.contains("`help"));

    events_tx
        .send(Event::Message(message(OWNER, DM, "quit")))
        .await
        .expect("send event");
    assert_eq!(next_reply(&mut fixture.outbox).await.text, "Shutting down.");

    timeout(Duration::from_secs(2), pump)
        .await
        .expect("loop did not stop")
        .expect("loop task failed");
    assert!(!fixture.bot.alive());
}

#[tokio::test]
async fn shared_channel_text_without_a_mention_is_ignored() {
    let fixture = test_bot().await;
    let (events_tx, events_rx) = mpsc::channel(16);

    let bot = fixture.bot.clone();
    let pump = tokio::spawn(async move { bot.run(events_rx).await });

    events_tx
        .send(Event::Message(message(MALLORY, HALL, "help")))
        .await
        .expect("send event");
    // Give the pump a moment; no reply may appear.
    sleep(Duration::from_millis(100)).await;
    let mut outbox = fixture.outbox;
    assert!(outbox.try_recv().is_err());

    fixture.bot.shutdown();
    timeout(Duration::from_secs(2), pump)
        .await
        .expect("loop did not stop")
        .expect("loop task failed");
}

#[tokio::test]
async fn membership_events_keep_the_directory_current() {
    let fixture = test_bot().await;
    let (events_tx, events_rx) = mpsc::channel(16);

    let bot = fixture.bot.clone();
    let pump = tokio::spawn(async move { bot.run(events_rx).await });

    events_tx
        .send(Event::MemberJoin {
            guild: HAVEN,
            user: OUTSIDER,
        })
        .await
        .expect("send event");

    // The pump applies events in order; poll until the roster catches up.
    let mut joined = false;
    for _ in 0..50 {
        if fixture.bot.directory.is_member(HAVEN, OUTSIDER) {
            joined = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(joined, "join event never reached the directory");

    events_tx
        .send(Event::MemberRemove {
            guild: HAVEN,
            user: OUTSIDER,
        })
        .await
        .expect("send event");
    let mut removed = false;
    for _ in 0..50 {
        if !fixture.bot.directory.is_member(HAVEN, OUTSIDER) {
            removed = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(removed, "remove event never reached the directory");

    fixture.bot.shutdown();
    timeout(Duration::from_secs(2), pump)
        .await
        .expect("loop did not stop")
        .expect("loop task failed");
}
