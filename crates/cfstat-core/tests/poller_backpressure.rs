use cfstat_core::command::CommandGuard;
use cfstat_core::poll::{PollError, PollEvent, Poller};
use cfstat_core::scale::ScaleTrigger;
use cfstat_core::testing::{stats_body, ScriptedChannel};
use std::time::Duration;

fn three_snapshots_then_failure() -> ScriptedChannel {
    let one = stats_body(&[("0", 0.1, 10, 100)]);
    let two = stats_body(&[("0", 0.1, 10, 100), ("1", 0.2, 20, 100)]);
    let three = stats_body(&[("0", 0.1, 10, 100), ("1", 0.2, 20, 100), ("2", 0.3, 30, 100)]);
    ScriptedChannel::new()
        .respond(&[one.as_str()])
        .respond(&[two.as_str()])
        .respond(&[three.as_str()])
        .fail(&["FAILED", "Error performing request"])
}

#[tokio::test(start_paused = true)]
async fn poller_fetches_only_into_an_empty_slot() {
    let channel = three_snapshots_then_failure();
    let log = channel.calls();
    let (handle, mut rx) = Poller::new(CommandGuard::new(channel), "guid-1").spawn();

    tokio::time::sleep(Duration::from_secs(10)).await;
    // The first snapshot sits in the channel; no fetch starts until it is taken.
    assert_eq!(log.lock().unwrap().len(), 1);

    let mut counts = Vec::new();
    match rx.recv().await.expect("first event") {
        PollEvent::Snapshot(stats) => counts.push(stats.len()),
        PollEvent::Failed(err) => panic!("unexpected failure: {err}"),
    }
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(log.lock().unwrap().len(), 2);

    let mut failure = None;
    while let Some(event) = rx.recv().await {
        match event {
            PollEvent::Snapshot(stats) => counts.push(stats.len()),
            PollEvent::Failed(err) => failure = Some(err),
        }
    }
    assert_eq!(counts, vec![1, 2, 3]);
    let failure = failure.expect("terminal error");
    assert!(matches!(failure, PollError::Command(_)));
    assert_eq!(failure.output(), ["FAILED", "Error performing request"]);
    handle.await.expect("poller task");
}

#[tokio::test(start_paused = true)]
async fn poller_stops_when_consumer_goes_away() {
    let channel = three_snapshots_then_failure();
    let log = channel.calls();
    let (handle, rx) = Poller::new(CommandGuard::new(channel), "guid-1").spawn();
    drop(rx);

    handle.await.expect("poller task");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scale_and_poll_share_one_guard() {
    let body = stats_body(&[("0", 0.1, 10, 100)]);
    let channel = ScriptedChannel::new()
        .respond(&[body.as_str()])
        .respond(&["Scaling app web"])
        .respond(&[body.as_str()])
        .with_latency(Duration::from_millis(300));
    let log = channel.calls();
    let guard = CommandGuard::new(channel);
    let trigger = ScaleTrigger::new(guard.clone(), "web");
    let (_handle, mut rx) = Poller::new(guard, "guid-1").spawn();

    let first = rx.recv().await.expect("first event");
    assert!(matches!(first, PollEvent::Snapshot(_)));
    trigger.scale(2).await.expect("scale");
    let second = rx.recv().await.expect("second event");
    assert!(matches!(second, PollEvent::Snapshot(_)));

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls[0][0], "curl");
    assert_eq!(calls[1], vec!["scale", "web", "-i", "2"]);
    assert_eq!(calls[2][0], "curl");
}
