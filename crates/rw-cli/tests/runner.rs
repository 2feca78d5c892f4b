//! Tick loop behavior against local and remote collectors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rw_cli::{CollectorLink, Config, Intent, Runner, Sensors};
use rw_core::{
    Collector, Durations, LidMonitor, NoPointer, Recorder, SchedulerSettings, State,
    SuspendTracker,
};
use rw_core::probe::PointerProbe;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

/// Sensors that never see activity, reading files under `dir`.
fn quiet_sensors(dir: &TempDir) -> Sensors {
    let now = chrono::Utc::now();
    Sensors {
        probe: Box::new(PointerProbe::new(NoPointer)),
        suspend: SuspendTracker::new(dir.path().join("suspensions"), now),
        lid: LidMonitor::new(dir.path().join("lid"), now),
    }
}

/// A port with nothing listening on it.
async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().to_string()
}

#[tokio::test]
async fn unreachable_collector_still_starts_working() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        collector: dead_address().await,
        spawn_collector: false,
        rpc_timeout_ms: 200,
        ..Config::default()
    };

    let link = CollectorLink::connect(&config).await;
    assert!(!link.is_remote());

    let settings = config.scheduler_settings().unwrap();
    let runner = Runner::start(settings, link, quiet_sensors(&dir), Recorder::default())
        .await
        .unwrap();
    assert_eq!(runner.presenter().states(), vec![State::Working]);
    assert_eq!(runner.scheduler().state(), State::Working);
}

/// Starts a runner against a collector address that accepts connections but
/// never answers, and returns how long the first work event took.
async fn start_against_silent_collector(config: Config) -> Duration {
    let dir = TempDir::new().unwrap();
    let started = Instant::now();
    let link = CollectorLink::connect(&config).await;
    assert!(!link.is_remote());
    assert!(!link.spawned());

    let settings = config.scheduler_settings().unwrap();
    let runner = Runner::start(settings, link, quiet_sensors(&dir), Recorder::default())
        .await
        .unwrap();
    assert_eq!(runner.presenter().states(), vec![State::Working]);
    started.elapsed()
}

#[tokio::test]
async fn silent_collector_with_spawn_starts_within_a_tick() {
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        collector: silent.local_addr().unwrap().to_string(),
        spawn_collector: true,
        ..Config::default()
    };
    let elapsed = start_against_silent_collector(config.clone()).await;
    assert!(
        elapsed < config.connect_budget() + Duration::from_millis(250),
        "first work event after {elapsed:?}"
    );
}

#[tokio::test]
async fn slow_rpc_timeout_is_cut_to_one_tick() {
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        collector: silent.local_addr().unwrap().to_string(),
        spawn_collector: true,
        rpc_timeout_ms: 5000,
        tick_ms: 300,
        ..Config::default()
    };
    let elapsed = start_against_silent_collector(config).await;
    assert!(elapsed < Duration::from_secs(1), "first work event after {elapsed:?}");
}

#[tokio::test]
async fn intents_apply_between_ticks() {
    let dir = TempDir::new().unwrap();
    let collector = Arc::new(Collector::new(Durations::default()));
    collector.tick();
    let link = CollectorLink::local(Arc::clone(&collector));

    let runner = Runner::start(
        SchedulerSettings::default(),
        link,
        quiet_sensors(&dir),
        Recorder::default(),
    )
    .await
    .unwrap();

    let (tx, rx) = mpsc::channel(4);
    tx.send(Intent::ForceRest).await.unwrap();
    tx.send(Intent::CancelRest).await.unwrap();
    tx.send(Intent::AdjustDurations(Durations::new(30.0, 4.0).unwrap()))
        .await
        .unwrap();
    drop(tx);

    let recorder = runner
        .run(rx, tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(recorder.states(), vec![State::Working, State::Resting]);
    assert_eq!(
        recorder.notices,
        vec!["rests can't be cancelled in fascist mode".to_string()]
    );
    assert_eq!(
        collector.get().durations,
        Durations::new(30.0, 4.0).unwrap()
    );
}

#[tokio::test]
async fn lost_collector_falls_back_with_last_clock() {
    let collector = Arc::new(Collector::new(Durations::new(40.0, 6.0).unwrap()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(rw_rpc::serve(listener, Arc::clone(&collector), async move {
        stopped.await.ok();
    }));

    let config = Config {
        collector: addr,
        spawn_collector: false,
        rpc_timeout_ms: 500,
        ..Config::default()
    };
    let mut link = CollectorLink::connect(&config).await;
    assert!(link.is_remote());

    link.tick().await;
    let before = link.get().await;
    assert!(before.has_activity());

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();

    let after = link.get().await;
    assert!(!link.is_remote());
    assert_eq!(after.last_activity, before.last_activity);
    assert_eq!(after.durations, Durations::new(40.0, 6.0).unwrap());
}
