//! The client's connection to a collector.
//!
//! A [`CollectorLink`] talks to a remote collector while it answers and
//! otherwise keeps a private in-process one. The scheduler loop never sees an
//! RPC error: every failure is logged and absorbed by falling back.
//!
//! Connection policy at startup:
//! 1. `standalone`: private collector, no network.
//! 2. The configured collector answers: use it.
//! 3. Nothing listens on a loopback address and `spawn_collector` is set:
//!    start `restwatch serve` as a child and wait for it to come up. The
//!    child is killed when the link is dropped.
//! 4. Otherwise: private collector.
//!
//! Steps 2 and 3 together get one tick interval
//! ([`Config::connect_budget`]); past that the link starts private.
//!
//! Once fallen back, a link stays local for the rest of the run.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use rw_core::{Collector, Durations, SharedClock, Snapshot, SystemClock};
use rw_rpc::{CollectorClient, RpcError};
use tokio::process::{Child, Command};

use crate::Config;

/// Delay before the first probe of a freshly spawned server.
const SPAWN_GRACE: Duration = Duration::from_millis(200);
/// Probes of a spawned server before giving up on it.
const SPAWN_ATTEMPTS: u32 = 10;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(100);

enum Backend {
    Remote(CollectorClient),
    Local(Arc<Collector>),
}

/// A collector that is always available.
pub struct CollectorLink {
    backend: Backend,
    durations: Durations,
    last: Option<Snapshot>,
    server: Option<Child>,
}

impl std::fmt::Debug for CollectorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorLink")
            .field("remote", &self.is_remote())
            .field("spawned", &self.spawned())
            .finish_non_exhaustive()
    }
}

impl CollectorLink {
    /// Connects per the startup policy. Never fails.
    pub async fn connect(config: &Config) -> Self {
        let durations = config.durations().unwrap_or_default();
        if config.standalone {
            tracing::info!("standalone, using a private collector");
            return Self::private(durations);
        }

        let client = match CollectorClient::new(&config.collector, config.rpc_timeout(), client_label()) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "cannot build collector client, using a private collector");
                return Self::private(durations);
            }
        };

        let budget = config.connect_budget();
        match tokio::time::timeout(budget, Self::reach(config, client, durations)).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                tracing::warn!(collector = %config.collector, "collector unreachable, using a private collector");
                Self::private(durations)
            }
            Err(_) => {
                tracing::warn!(
                    collector = %config.collector,
                    budget_ms = budget.as_millis(),
                    "collector not ready in time, using a private collector"
                );
                Self::private(durations)
            }
        }
    }

    /// Tries the configured collector, then a spawned one.
    async fn reach(config: &Config, client: CollectorClient, durations: Durations) -> Option<Self> {
        let refused = match client.get().await {
            Ok(snapshot) => {
                tracing::info!(collector = client.addr(), "connected to collector");
                return Some(Self::remote(client, durations, Some(snapshot), None));
            }
            Err(e) => {
                tracing::debug!(collector = client.addr(), error = %e, "collector not answering");
                e.is_connect()
            }
        };

        if !(config.spawn_collector && is_loopback(&config.collector)) {
            return None;
        }
        if !refused {
            tracing::debug!(collector = client.addr(), "address in use, not starting a collector");
            return None;
        }
        let (server, snapshot) = spawn_server(&client).await?;
        tracing::info!(collector = client.addr(), "started collector server");
        Some(Self::remote(client, durations, Some(snapshot), Some(server)))
    }

    /// A link to an in-process collector.
    pub fn local(collector: Arc<Collector>) -> Self {
        let durations = collector.get().durations;
        Self {
            backend: Backend::Local(collector),
            durations,
            last: None,
            server: None,
        }
    }

    fn private(durations: Durations) -> Self {
        Self::local(Arc::new(Collector::new(durations)))
    }

    fn remote(
        client: CollectorClient,
        durations: Durations,
        last: Option<Snapshot>,
        server: Option<Child>,
    ) -> Self {
        Self {
            backend: Backend::Remote(client),
            durations,
            last,
            server,
        }
    }

    pub const fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote(_))
    }

    /// Whether this link started the server it talks to.
    pub const fn spawned(&self) -> bool {
        self.server.is_some()
    }

    pub async fn get(&mut self) -> Snapshot {
        let snapshot = match &self.backend {
            Backend::Local(collector) => collector.get(),
            Backend::Remote(client) => match client.get().await {
                Ok(snapshot) => snapshot,
                Err(e) => self.fall_back(&e).get(),
            },
        };
        self.last = Some(snapshot);
        snapshot
    }

    pub async fn tick(&mut self) {
        match &self.backend {
            Backend::Local(collector) => {
                collector.tick();
            }
            Backend::Remote(client) => {
                if let Err(e) = client.tick().await {
                    self.fall_back(&e).tick();
                }
            }
        }
    }

    /// Publishes new durations. A refusal is logged, not returned.
    pub async fn put(&mut self, durations: Durations) {
        self.durations = durations;
        match &self.backend {
            Backend::Local(collector) => {
                if let Err(e) = collector.put(durations) {
                    tracing::warn!(error = %e, "durations rejected");
                }
            }
            Backend::Remote(client) => match client.put(durations).await {
                Ok(()) => {}
                Err(e) if e.is_rejection() => {
                    tracing::warn!(error = %e, "collector rejected durations");
                }
                Err(e) => {
                    if let Err(e) = self.fall_back(&e).put(durations) {
                        tracing::warn!(error = %e, "durations rejected");
                    }
                }
            },
        }
    }

    /// Switches to a private collector continuing from the last snapshot.
    fn fall_back(&mut self, error: &RpcError) -> Arc<Collector> {
        tracing::warn!(error = %error, "lost collector, continuing with a private clock");
        let shared = self
            .last
            .map_or_else(|| SharedClock::new(self.durations), |snapshot| snapshot.shared());
        let collector = Arc::new(Collector::with_clock(shared, Arc::new(SystemClock)));
        self.backend = Backend::Local(Arc::clone(&collector));
        self.server = None;
        collector
    }
}

/// Label sent with every request so server logs can tell clients apart.
fn client_label() -> String {
    format!("restwatch-{}", std::process::id())
}

/// Whether `addr` (`host:port`) names this machine.
pub fn is_loopback(addr: &str) -> bool {
    let host = addr
        .rsplit_once(':')
        .map_or(addr, |(host, _port)| host)
        .trim_start_matches('[')
        .trim_end_matches(']');
    host == "localhost" || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Starts `restwatch serve` on the client's address and waits for it.
async fn spawn_server(client: &CollectorClient) -> Option<(Child, Snapshot)> {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            tracing::warn!(error = %e, "cannot locate own executable to start a collector");
            return None;
        }
    };
    let child = Command::new(exe)
        .args(["serve", "--listen", client.addr()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();
    let child = match child {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(error = %e, "failed to start collector server");
            return None;
        }
    };

    tokio::time::sleep(SPAWN_GRACE).await;
    for attempt in 1..=SPAWN_ATTEMPTS {
        match client.get().await {
            Ok(snapshot) => return Some((child, snapshot)),
            Err(e) => tracing::debug!(attempt, error = %e, "spawned collector not up yet"),
        }
        tokio::time::sleep(SPAWN_RETRY_DELAY).await;
    }
    tracing::warn!("spawned collector never answered");
    None
}
