//! Websocket tests against a served router: join authorization, event
//! delivery, and a client store synced over HTTP and the websocket.

mod common;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;

use chatsync::backend::routes::create_router;
use chatsync::client::{
    ApplyOutcome, ChatSyncStore, ClientError, ClientNotice, HttpPageFetcher, LoadOutcome, RealtimeClient,
    SyncRouter, TopicLink,
};
use chatsync::shared::{EventKind, MemberRole, Topic};
use common::{contents, TestApp};

async fn serve(app: &TestApp) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(app.state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn next_event(notices: &mut UnboundedReceiver<ClientNotice>) -> ClientNotice {
    tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .expect("notice within timeout")
        .expect("notice channel open")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition within timeout");
}

#[tokio::test]
async fn test_upgrade_requires_token() {
    let app = TestApp::new(10);
    let base = serve(&app).await;

    let result = RealtimeClient::connect(&base, "not-a-token").await;
    assert_matches!(result, Err(ClientError::Transport(_)));
}

#[tokio::test]
async fn test_join_requires_membership() {
    let app = TestApp::new(10);
    let eve = app.outsider("eve");
    let ana = app.member("ana", MemberRole::Guest).await;
    let base = serve(&app).await;
    let topic = Topic::for_surface(&app.channel);

    let (outsider, _notices) = RealtimeClient::connect(&base, &eve.token).await.unwrap();
    assert_matches!(outsider.join(&topic).await, Err(ClientError::Rejected(_)));

    let (member, _notices) = RealtimeClient::connect(&base, &ana.token).await.unwrap();
    member.join(&topic).await.unwrap();
    assert_eq!(app.state.bus.registry().subscriber_count(&topic), 1);

    member.leave(&topic).await.unwrap();
    assert_eq!(app.state.bus.registry().subscriber_count(&topic), 0);
}

#[tokio::test]
async fn test_published_events_reach_joined_clients_in_order() {
    let app = TestApp::new(10);
    let ana = app.member("ana", MemberRole::Guest).await;
    let base = serve(&app).await;
    let topic = Topic::for_surface(&app.channel);

    let (client, mut notices) = RealtimeClient::connect(&base, &ana.token).await.unwrap();
    client.join(&topic).await.unwrap();

    let first = app.post(&ana, "one").await;
    let second = app.post(&ana, "two").await;

    let mut seqs = Vec::new();
    for expected in [&first, &second] {
        match next_event(&mut notices).await {
            ClientNotice::Event(event) => {
                assert_eq!(event.kind, EventKind::Created);
                assert_eq!(event.topic, topic);
                assert_eq!(event.payload.id, expected.id);
                seqs.push(event.seq);
            }
            other => panic!("unexpected notice {:?}", other),
        }
    }
    assert!(seqs[0] < seqs[1]);
}

#[tokio::test]
async fn test_disconnect_deregisters_connection() {
    let app = TestApp::new(10);
    let ana = app.member("ana", MemberRole::Guest).await;
    let base = serve(&app).await;
    let topic = Topic::for_surface(&app.channel);
    let registry = app.state.bus.registry().clone();

    let (client, _notices) = RealtimeClient::connect(&base, &ana.token).await.unwrap();
    client.join(&topic).await.unwrap();
    assert_eq!(registry.connection_count(), 1);

    client.close();
    wait_until(|| registry.connection_count() == 0).await;
    assert_eq!(registry.subscriber_count(&topic), 0);
}

#[tokio::test]
async fn test_store_syncs_over_http_and_websocket() {
    let app = TestApp::new(10);
    let ana = app.member("ana", MemberRole::Guest).await;
    let bob = app.member("bob", MemberRole::Guest).await;
    app.post(&ana, "before").await;
    let base = serve(&app).await;

    let (client, mut notices) = RealtimeClient::connect(&base, &bob.token).await.unwrap();
    let client = Arc::new(client);
    let fetcher = Arc::new(HttpPageFetcher::new(&base).with_token(&bob.token));
    let store = Arc::new(ChatSyncStore::new(app.channel, fetcher, client.clone()));
    let router = SyncRouter::new();
    router.attach(store.clone());

    assert_eq!(store.mount().await, Ok(LoadOutcome::Loaded { added: 1 }));

    app.post(&ana, "live").await;
    match next_event(&mut notices).await {
        ClientNotice::Event(event) => {
            assert_eq!(router.dispatch(event), Some(Ok(ApplyOutcome::Inserted)));
        }
        other => panic!("unexpected notice {:?}", other),
    }
    assert_eq!(contents(&store.view()), vec!["before", "live"]);

    // drop the socket, miss a message, come back
    client.reconnect().await.unwrap();
    wait_until(|| app.state.bus.registry().connection_count() == 1).await;
    app.post(&ana, "missed").await;

    let results = router.resync_all().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, Ok(LoadOutcome::Loaded { added: 1 }));
    assert_eq!(contents(&store.view()), vec!["before", "live", "missed"]);

    store.unmount().await;
    wait_until(|| app.state.bus.registry().subscriber_count(store.topic()) == 0).await;
}
