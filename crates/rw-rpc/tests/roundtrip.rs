use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rw_core::{Collector, Durations, ManualClock, SharedClock};
use rw_rpc::{CollectorClient, RpcError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

struct Server {
    addr: SocketAddr,
    clock: Arc<ManualClock>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

async fn start_server() -> Server {
    let clock = Arc::new(ManualClock::new(t0()));
    let collector = Arc::new(Collector::with_clock(
        SharedClock::new(Durations::default()),
        clock.clone(),
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(rw_rpc::serve(listener, collector, async move {
        stopped.await.ok();
    }));
    Server {
        addr,
        clock,
        stop,
        handle,
    }
}

fn client(addr: SocketAddr) -> CollectorClient {
    CollectorClient::new(&addr.to_string(), StdDuration::from_secs(2), "test-client").unwrap()
}

#[tokio::test]
async fn health_and_fresh_clock() {
    let server = start_server().await;
    let client = client(server.addr);

    client.health().await.unwrap();
    let snapshot = client.get().await.unwrap();
    assert!(!snapshot.has_activity());
    assert_eq!(snapshot.durations, Durations::default());
    assert_eq!(snapshot.now, t0());

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn tick_is_visible_to_other_clients() {
    let server = start_server().await;
    let first = client(server.addr);
    let second = client(server.addr);

    server.clock.advance(Duration::seconds(30));
    first.tick().await.unwrap();
    server.clock.advance(Duration::seconds(5));

    let snapshot = second.get().await.unwrap();
    assert_eq!(snapshot.last_activity, t0() + Duration::seconds(30));
    assert_eq!(snapshot.idle(), Duration::seconds(5));
}

#[tokio::test]
async fn put_round_trips() {
    let server = start_server().await;
    let client = client(server.addr);

    let durations = Durations::new(50.0, 10.0).unwrap();
    client.put(durations).await.unwrap();
    assert_eq!(client.get().await.unwrap().durations, durations);
}

#[tokio::test]
async fn invalid_put_is_rejected_with_message() {
    let server = start_server().await;
    let client = client(server.addr);

    let err = client
        .put(Durations {
            work_minutes: 20.0,
            rest_minutes: -2.0,
        })
        .await
        .unwrap_err();
    assert!(err.is_rejection(), "unexpected error: {err}");
    let RpcError::Status { status, message } = err else {
        unreachable!();
    };
    assert_eq!(status, 422);
    assert_eq!(
        message,
        "rest_minutes must be a positive number of minutes up to 10080, got -2"
    );
    assert_eq!(client.get().await.unwrap().durations, Durations::default());
}

#[tokio::test]
async fn oversized_put_is_rejected() {
    let server = start_server().await;
    let client = client(server.addr);

    let err = client
        .put(Durations {
            work_minutes: 1e12,
            rest_minutes: 3.0,
        })
        .await
        .unwrap_err();
    assert!(err.is_rejection(), "unexpected error: {err}");
    assert_eq!(client.get().await.unwrap().durations, Durations::default());
}

#[tokio::test]
async fn raw_http_surface() {
    let server = start_server().await;
    let base = format!("http://{}", server.addr);
    let http = reqwest::Client::new();

    let health: serde_json::Value = http
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, serde_json::json!({"status": "ok"}));

    let tick = http.post(format!("{base}/tick")).send().await.unwrap();
    assert_eq!(tick.status().as_u16(), 204);

    let clock: serde_json::Value = http
        .get(format!("{base}/clock"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(clock["work_minutes"], 20.0);
    assert_eq!(clock["rest_minutes"], 3.0);
    assert!(clock["last_activity"].is_string());
    assert!(clock["now"].is_string());
}

#[tokio::test]
async fn unreachable_collector_is_a_request_error() {
    // Grab a free port, then release it so nothing is listening.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let client = CollectorClient::new(&addr.to_string(), StdDuration::from_millis(300), "t").unwrap();

    let err = client.get().await.unwrap_err();
    assert!(matches!(err, RpcError::Request(_)), "unexpected error: {err}");
    assert!(!err.is_rejection());
}
