//! Scripted connector and transport shared by the integration tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hostwatch_core::auth::Credential;
use hostwatch_core::error::ConnectionError;
use hostwatch_core::models::{AuthMethod, SavedServerProfile, ServerProfile};
use hostwatch_core::monitoring::{SYSTEM_INFO_COMMAND, SamplerSettings};
use hostwatch_core::session::{SessionSettings, SessionStatus};
use hostwatch_core::transport::{ConnectTarget, Connector, Transport, TransportError};
use tokio::sync::watch;

/// One run of the metrics command with the given counters
pub fn metrics_output(busy: u64, idle: u64, mem_available_kb: u64, rx: u64, tx: u64) -> String {
    format!(
        "---HOSTWATCH_PROC_STAT---\n\
         cpu  {busy} 0 0 {idle} 0 0 0 0\n\
         ---HOSTWATCH_MEMINFO---\n\
         MemTotal: 1000 kB\n\
         MemAvailable: {mem_available_kb} kB\n\
         ---HOSTWATCH_LOADAVG---\n\
         0.50 0.40 0.30 1/100 4242\n\
         ---HOSTWATCH_UPTIME---\n\
         3600.00 7000.00\n\
         ---HOSTWATCH_PROCS---\n\
         97\n\
         ---HOSTWATCH_NET_DEV---\n\
         lo: 5 5 0 0 0 0 0 0 5 5 0 0 0 0 0 0\n\
         eth0: {rx} 1 0 0 0 0 0 0 {tx} 1 0 0 0 0 0 0\n\
         ---HOSTWATCH_DF---\n\
         /dev/sda1 1000 250 750 25% /\n\
         ---HOSTWATCH_END---\n"
    )
}

/// In-memory transport answering from a script
pub struct ScriptedTransport {
    target: ConnectTarget,
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    fallback: Result<String, TransportError>,
    exec_delay: Duration,
    execs: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedTransport {
    pub fn execs(&self) -> usize {
        self.execs.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exec(&self, command: &str) -> Result<String, TransportError> {
        if command == SYSTEM_INFO_COMMAND {
            return Err(TransportError::Failed("uname not scripted".to_string()));
        }
        self.execs.fetch_add(1, Ordering::SeqCst);
        if !self.exec_delay.is_zero() {
            tokio::time::sleep(self.exec_delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn target(&self) -> &ConnectTarget {
        &self.target
    }
}

/// How a scripted host behaves
#[derive(Clone)]
pub struct HostScript {
    pub open_delay: Duration,
    pub open_error: Option<ConnectionError>,
    pub responses: Vec<Result<String, TransportError>>,
    pub fallback: Result<String, TransportError>,
    pub exec_delay: Duration,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            open_delay: Duration::ZERO,
            open_error: None,
            responses: Vec::new(),
            fallback: Ok(metrics_output(100, 900, 500, 1_000, 2_000)),
            exec_delay: Duration::ZERO,
        }
    }
}

impl HostScript {
    pub fn failing(error: ConnectionError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }

    pub fn slow(open_delay: Duration) -> Self {
        Self {
            open_delay,
            ..Self::default()
        }
    }
}

/// Connector that opens [`ScriptedTransport`]s per host
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: Mutex<HashMap<String, HostScript>>,
    opened: Mutex<Vec<Arc<ScriptedTransport>>>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, host: &str, script: HostScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.to_string(), script);
    }

    /// Hosts `open` was called for, in order
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Transports opened for `host`, oldest first
    pub fn transports(&self, host: &str) -> Vec<Arc<ScriptedTransport>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.target.host == host)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(
        &self,
        target: &ConnectTarget,
        _credential: Credential,
    ) -> Result<Arc<dyn Transport>, ConnectionError> {
        self.attempts.lock().unwrap().push(target.host.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&target.host)
            .cloned()
            .unwrap_or_default();

        if !script.open_delay.is_zero() {
            tokio::time::sleep(script.open_delay).await;
        }
        if let Some(error) = script.open_error {
            return Err(error);
        }

        let transport = Arc::new(ScriptedTransport {
            target: target.clone(),
            responses: Mutex::new(script.responses.into()),
            fallback: script.fallback,
            exec_delay: script.exec_delay,
            execs: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        });
        self.opened.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}

/// Password profile whose id and name are `id` and host is `host`
pub fn profile(id: &str, host: &str) -> SavedServerProfile {
    SavedServerProfile::new(
        ServerProfile::new(
            id,
            host,
            22,
            "root",
            AuthMethod::Password {
                password: "pw".to_string(),
            },
        )
        .with_id(id),
    )
}

/// Fast sampler settings for tests
pub fn settings(interval_ms: u64, history_capacity: usize, failure_threshold: u32) -> SessionSettings {
    SessionSettings {
        connect_timeout: Duration::from_secs(5),
        sampler: SamplerSettings::new(
            Duration::from_millis(interval_ms),
            history_capacity,
            failure_threshold,
        ),
    }
}

/// Waits until `pred` holds for the published status
pub async fn wait_for_status(
    rx: &mut watch::Receiver<SessionStatus>,
    pred: impl FnMut(&SessionStatus) -> bool,
) -> SessionStatus {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for status")
        .expect("status channel closed")
        .clone()
}

/// Polls `pred` until it holds
pub async fn eventually(mut pred: impl FnMut() -> bool) {
    for _ in 0..500 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
