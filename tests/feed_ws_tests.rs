//! Live feed subscriber against a real WebSocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::json;
use sitewatch::feed::{ConnectionState, Dispatcher, FixedDelay, Subscriber, WebSocketTransport};
use sitewatch_common::{Envelope, Topic, TopicBuffer};
use tokio::sync::mpsc;
use url::Url;

/// What the mock feed does for every connection.
struct Script {
    frames: Vec<String>,
    /// Close the socket after sending, instead of holding it open.
    hang_up: bool,
    connections: AtomicUsize,
}

async fn ws_handler(ws: WebSocketUpgrade, State(script): State<Arc<Script>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, script))
}

async fn serve_socket(mut socket: WebSocket, script: Arc<Script>) {
    script.connections.fetch_add(1, Ordering::SeqCst);
    for frame in &script.frames {
        if socket.send(Message::Text(frame.clone().into())).await.is_err() {
            return;
        }
    }
    if script.hang_up {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }
}

async fn spawn_feed(frames: Vec<String>, hang_up: bool) -> (Url, Arc<Script>) {
    let script = Arc::new(Script {
        frames,
        hang_up,
        connections: AtomicUsize::new(0),
    });
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(script.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (Url::parse(&format!("ws://{}/ws", addr)).unwrap(), script)
}

fn frame(topic: &str, domain: &str, n: u32) -> String {
    json!({ "topic": topic, "data": { "projectDomain": domain, "n": n } }).to_string()
}

fn subscriber(delay: Duration) -> Subscriber {
    Subscriber::new(
        Arc::new(WebSocketTransport::default()),
        Arc::new(FixedDelay::new(delay)),
    )
}

async fn wait_for_state(feed: &Subscriber, want: ConnectionState) {
    let mut states = feed.state_changes();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| *s == want))
        .await
        .expect("timed out waiting for state")
        .unwrap();
}

#[tokio::test]
async fn test_envelopes_arrive_in_order() {
    let frames = (0..5).map(|n| frame("leads", "a.com", n)).collect();
    let (url, _script) = spawn_feed(frames, false).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let feed = subscriber(Duration::from_millis(50));
    let handle = feed
        .start(url, move |env| {
            let _ = tx.send(env);
        }, |_| {})
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..5 {
        let env = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(env.topic, Topic::Leads);
        seen.push(env.data["n"].as_u64().unwrap());
    }
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert_eq!(feed.state(), ConnectionState::Open);

    feed.stop(handle);
    assert_eq!(feed.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_malformed_frames_do_not_drop_the_connection() {
    let frames = vec![
        "not json".to_string(),
        json!({ "topic": "leads" }).to_string(),
        frame("visits", "a.com", 1),
    ];
    let (url, script) = spawn_feed(frames, false).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel::<String>();
    let feed = subscriber(Duration::from_millis(50));
    let handle = feed
        .start(
            url,
            move |env| {
                let _ = tx.send(env);
            },
            move |err| {
                let _ = err_tx.send(err.to_string());
            },
        )
        .unwrap();

    let env = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(env.topic, Topic::Visits);
    assert_eq!(err_rx.recv().await.unwrap().split(':').next(), Some("Malformed envelope"));
    assert_eq!(err_rx.recv().await.unwrap().split(':').next(), Some("Malformed envelope"));
    assert_eq!(script.connections.load(Ordering::SeqCst), 1);

    feed.stop(handle);
}

#[tokio::test]
async fn test_reconnects_after_server_hangs_up() {
    let (url, script) = spawn_feed(vec![frame("deployments", "a.com", 1)], true).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let feed = subscriber(Duration::from_millis(50));
    let handle = feed
        .start(url, move |env| {
            let _ = tx.send(env);
        }, |_| {})
        .unwrap();

    // One delivery per connection.
    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
    }
    assert!(script.connections.load(Ordering::SeqCst) >= 3);

    feed.stop(handle);
    let after_stop = script.connections.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(script.connections.load(Ordering::SeqCst), after_stop);
}

#[tokio::test]
async fn test_unreachable_endpoint_keeps_retrying() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();

    let (err_tx, mut err_rx) = mpsc::unbounded_channel::<String>();
    let feed = subscriber(Duration::from_millis(20));
    let handle = feed
        .start(url, |_| {}, move |err| {
            let _ = err_tx.send(err.to_string());
        })
        .unwrap();

    for _ in 0..3 {
        let msg = tokio::time::timeout(Duration::from_secs(5), err_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(msg.starts_with("Failed to connect"), "{}", msg);
    }
    assert!(feed.is_running());

    feed.stop(handle);
    assert!(!feed.is_running());
}

#[tokio::test]
async fn test_dispatcher_fills_dashboard_buffer_for_one_domain() {
    let frames = vec![
        frame("deployments", "a.com", 1),
        frame("deployments", "b.com", 2),
        frame("deployments", "a.com", 3),
        frame("bogus", "a.com", 4),
        frame("leads", "a.com", 5),
    ];
    let (url, _script) = spawn_feed(frames, false).await;

    let buffer = TopicBuffer::bounded(50).shared();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
    let mut dispatcher = Dispatcher::new();
    dispatcher.attach_filtered_buffer(
        Topic::Deployments,
        sitewatch::feed::domain_filter("a.com"),
        buffer.clone(),
    );
    dispatcher.subscribe(Topic::Leads, "done", move |_| {
        let _ = done_tx.send(());
        Ok(())
    });

    let feed = subscriber(Duration::from_millis(50));
    let handle = feed.start(url, dispatcher.into_handler(), |_| {}).unwrap();
    wait_for_state(&feed, ConnectionState::Open).await;
    tokio::time::timeout(Duration::from_secs(5), done_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let rows: Vec<u64> = buffer
        .lock()
        .unwrap()
        .snapshot()
        .iter()
        .map(|v| v["n"].as_u64().unwrap())
        .collect();
    assert_eq!(rows, vec![3, 1]);

    feed.stop(handle);
}
