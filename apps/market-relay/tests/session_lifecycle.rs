//! Session Lifecycle Integration Tests
//!
//! Exercises the supervisor's retry loop under a paused clock and the
//! re-authentication path after an upstream session revocation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{
    FakeTransport, RecordingStore, ScriptedSessions, fast_connection_config, scripted_stream,
    wait_until,
};
use market_relay::{
    AuthError, ConnectionManager, FeedCommand, FeedMessage, MemoryCommandBus, RelaySupervisor,
    SessionToken, SubscriptionRegistry, TickStore,
};

const WAIT: Duration = Duration::from_secs(2);

struct Rig {
    supervisor: RelaySupervisor,
    connection: Arc<ConnectionManager>,
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<FakeTransport>,
    offers: tokio::sync::mpsc::Sender<common::FakeConnection>,
    sessions: Arc<ScriptedSessions>,
    bus: MemoryCommandBus,
    cancel: CancellationToken,
}

fn rig(script: Vec<Result<SessionToken, AuthError>>, auth_retry: Duration) -> Rig {
    let (transport, offers) = FakeTransport::new();
    let registry = Arc::new(SubscriptionRegistry::new());
    let sessions = ScriptedSessions::new(script);
    let cancel = CancellationToken::new();

    let connection = Arc::new(ConnectionManager::new(
        Arc::clone(&transport) as Arc<dyn market_relay::FeedTransport>,
        Arc::new(RecordingStore::default()) as Arc<dyn TickStore>,
        Arc::clone(&registry),
        fast_connection_config(),
        cancel.clone(),
    ));

    let supervisor = RelaySupervisor::new(
        Arc::clone(&sessions) as Arc<dyn market_relay::SessionSource>,
        Arc::clone(&connection),
        Arc::clone(&registry),
        auth_retry,
        cancel.clone(),
    );

    Rig {
        supervisor,
        connection,
        registry,
        transport,
        offers,
        sessions,
        bus: MemoryCommandBus::new(16),
        cancel,
    }
}

#[tokio::test(start_paused = true)]
async fn supervisor_sleeps_fixed_backoff_between_auth_failures() {
    let rig = rig(
        vec![
            Err(AuthError::Login("bad one-time code".to_string())),
            Err(AuthError::Login("bad one-time code".to_string())),
            Err(AuthError::Exchange("code rejected".to_string())),
            Ok(SessionToken::new("fresh")),
        ],
        Duration::from_secs(30),
    );

    // Hold the eventual connection open.
    let (stream1, _handle1) = scripted_stream();
    rig.offers.send(stream1).await.unwrap();

    let source = Box::new(rig.bus.source());
    let start = tokio::time::Instant::now();
    tokio::spawn(rig.supervisor.run(source));

    wait_until(Duration::from_secs(300), || rig.transport.connect_count() == 1).await;

    assert_eq!(rig.sessions.acquire_count(), 4);

    // Three failures, each followed by a ~30s sleep.
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_secs(90),
        "expected three 30s backoffs, elapsed only {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(120),
        "backoff took too long: {elapsed:?}"
    );

    rig.cancel.cancel();
}

#[tokio::test]
async fn session_revocation_triggers_reauthentication_and_resubscribe() {
    let rig = rig(
        vec![
            Ok(SessionToken::new("first")),
            Ok(SessionToken::new("second")),
        ],
        Duration::from_secs(30),
    );
    rig.registry.add(&[256265]);

    let (stream1, handle1) = scripted_stream();
    rig.offers.send(stream1).await.unwrap();
    let (stream2, handle2) = scripted_stream();
    rig.offers.send(stream2).await.unwrap();

    let source = Box::new(rig.bus.source());
    tokio::spawn(rig.supervisor.run(source));

    wait_until(WAIT, || rig.transport.connect_count() == 1).await;
    assert_eq!(rig.sessions.acquire_count(), 1);

    // The vendor revokes the session mid-stream.
    handle1
        .messages
        .send(Ok(FeedMessage::Error {
            code: 403,
            message: "session expired".to_string(),
        }))
        .await
        .unwrap();

    // The supervisor observes the rejection, re-authenticates, and the
    // connection manager replays the registry on the new connection.
    wait_until(WAIT, || rig.transport.connect_count() == 2).await;
    assert_eq!(rig.sessions.acquire_count(), 2);

    wait_until(WAIT, || handle2.sent.lock().len() >= 2).await;
    let resubscribed: HashSet<u64> = handle2
        .sent
        .lock()
        .iter()
        .filter_map(|command| match command {
            FeedCommand::Subscribe(tokens) => Some(tokens.iter().copied()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(resubscribed, HashSet::from([256265]));

    rig.cancel.cancel();
}

#[tokio::test]
async fn command_listener_survives_reauthentication() {
    let rig = rig(
        vec![
            Ok(SessionToken::new("first")),
            Ok(SessionToken::new("second")),
        ],
        Duration::from_secs(30),
    );

    let (stream1, handle1) = scripted_stream();
    rig.offers.send(stream1).await.unwrap();
    let (stream2, handle2) = scripted_stream();
    rig.offers.send(stream2).await.unwrap();

    let source = Box::new(rig.bus.source());
    let supervisor = rig.supervisor;
    tokio::spawn(supervisor.run(source));

    wait_until(WAIT, || rig.connection.is_live()).await;

    rig.bus
        .publish(r#"{"action":"SUBSCRIBE","tokens":[256265]}"#);
    wait_until(WAIT, || rig.registry.contains(256265)).await;

    handle1
        .messages
        .send(Ok(FeedMessage::Error {
            code: 403,
            message: "session expired".to_string(),
        }))
        .await
        .unwrap();
    wait_until(WAIT, || {
        rig.transport.connect_count() == 2 && rig.connection.is_live()
    })
    .await;

    // The same listener instance still feeds the registry after re-auth.
    rig.bus
        .publish(r#"{"action":"SUBSCRIBE","tokens":[408065]}"#);
    wait_until(WAIT, || rig.registry.contains(408065)).await;

    wait_until(WAIT, || {
        handle2
            .sent
            .lock()
            .iter()
            .any(|command| matches!(command, FeedCommand::Subscribe(tokens) if tokens.contains(&408065)))
    })
    .await;

    rig.cancel.cancel();
}
