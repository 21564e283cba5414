//! Connection lifecycle controller.
//!
//! # State Machine
//! ```text
//! Idle → Connecting → PipelineInstalled → SendingPayload → Interactive
//!            │                │                   │              │
//!            └────────────────┴───────────────────┴──────────────┴→ Failed
//!
//! Interactive → ShuttingDown → Closed
//! Failed      → ShuttingDown → Closed
//! ```
//!
//! `start()` moves the configured client onto a dedicated driver thread that
//! walks the states in order. Transport I/O runs on the run's own resource
//! group; the driver only blocks on connect, on the console, and on the final
//! drain. Release of the group happens exactly once, whether the driver gets
//! there first or an external `disconnect()` does.

use std::io::BufReader;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::config::{ClientConfig, InboundUnit};
use crate::error::{ClientError, ClientResult};
use crate::lifecycle::io_group::IoGroup;
use crate::lifecycle::report::{RunReport, SignalReport};
use crate::lifecycle::signal::{CompletionSignal, SignalView, Signals};
use crate::net::connection::{ClientId, LifecycleState, SecurityMode, StateTracker, Target};
use crate::net::inbound::{counter_for, ThresholdWatch};
use crate::net::outbound::Outbound;
use crate::net::pipeline::{Pipeline, PipelineContext, TlsSettings};
use crate::observability::metrics;
use crate::phases::{Console, InteractiveForwarder, PayloadLoader, PayloadSource, DEFAULT_SENTINEL};

/// Tunables that are not part of the client's identity.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub sentinel: String,
    pub connect_timeout: Duration,
    pub shutdown_grace: Duration,
    pub worker_threads: usize,
    pub unit: InboundUnit,
    pub tls: TlsSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            connect_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(2),
            worker_threads: 2,
            unit: InboundUnit::default(),
            tls: TlsSettings::default(),
        }
    }
}

impl From<&ClientConfig> for ClientSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            sentinel: config.session.sentinel.clone(),
            connect_timeout: Duration::from_millis(config.session.connect_timeout_ms),
            shutdown_grace: Duration::from_millis(config.session.shutdown_grace_ms),
            worker_threads: config.session.worker_threads,
            unit: config.receive.unit,
            tls: TlsSettings {
                server_name: config.security.server_name.clone(),
                ca_cert_path: config.security.ca_cert_path.clone(),
            },
        }
    }
}

/// A configured, not yet started client.
pub struct ScriptedClient {
    id: ClientId,
    target: Target,
    payload: Option<PayloadSource>,
    security: SecurityMode,
    threshold: usize,
    console: Option<Console>,
    settings: ClientSettings,
    signals: Signals,
}

impl ScriptedClient {
    pub fn new(target: Target, payload: Option<PayloadSource>) -> Self {
        Self {
            id: ClientId::new(),
            target,
            payload,
            security: SecurityMode::Plain,
            threshold: 0,
            console: None,
            settings: ClientSettings::default(),
            signals: Signals::new(),
        }
    }

    /// Like [`ScriptedClient::new`], opening the payload from a file.
    ///
    /// An unreadable file is logged and the client runs without a payload.
    pub fn with_payload_path(target: Target, path: Option<&std::path::Path>) -> Self {
        let payload = path.and_then(|path| match PayloadSource::open(path) {
            Ok(source) => Some(source),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Cannot open payload file");
                None
            }
        });
        Self::new(target, payload)
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let target = Target::new(config.target.host.clone(), config.target.port);
        let mut client = Self::with_payload_path(target, config.payload.path.as_deref());
        client.set_secured(config.security.secured);
        client.set_threshold(config.receive.threshold);
        client.set_settings(ClientSettings::from(config));
        client
    }

    pub fn set_secured(&mut self, secured: bool) {
        self.security = SecurityMode::from(secured);
    }

    /// Inbound units to wait for before `threshold_received` settles.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    pub fn set_payload(&mut self, payload: Option<PayloadSource>) {
        self.payload = payload;
    }

    /// Replace stdin as the interactive input.
    pub fn set_console(&mut self, console: impl std::io::BufRead + Send + 'static) {
        self.console = Some(Box::new(console));
    }

    pub fn set_settings(&mut self, settings: ClientSettings) {
        self.settings = settings;
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn connected(&self) -> SignalView<()> {
        self.signals.connected.view()
    }

    pub fn payload_sent(&self) -> SignalView<()> {
        self.signals.payload_sent.view()
    }

    pub fn threshold_received(&self) -> SignalView<()> {
        self.signals.threshold_received.view()
    }

    /// Begin the run on a dedicated driver thread.
    pub fn start(self) -> ClientResult<ClientHandle> {
        let id = self.id;
        let target = self.target.clone();
        let signals = self.signals.clone();
        let resources = Arc::new(ResourceSlot::new());
        let state = StateTracker::new(id);

        let run = Run {
            client: self,
            resources: Arc::clone(&resources),
            state: state.clone(),
        };

        let thread = std::thread::Builder::new()
            .name(format!("{id}-driver"))
            .spawn(move || run.execute())
            .map_err(|e| ClientError::Resource(e.into()))?;

        Ok(ClientHandle {
            id,
            target,
            signals,
            resources,
            state,
            thread: Some(thread),
        })
    }
}

impl std::fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("payload", &self.payload)
            .field("security", &self.security)
            .field("threshold", &self.threshold)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Handle to a started client.
#[derive(Debug)]
pub struct ClientHandle {
    id: ClientId,
    target: Target,
    signals: Signals,
    resources: Arc<ResourceSlot>,
    state: StateTracker,
    thread: Option<JoinHandle<ClientResult<()>>>,
}

impl ClientHandle {
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn connected(&self) -> SignalView<()> {
        self.signals.connected.view()
    }

    pub fn payload_sent(&self) -> SignalView<()> {
        self.signals.payload_sent.view()
    }

    pub fn threshold_received(&self) -> SignalView<()> {
        self.signals.threshold_received.view()
    }

    pub fn state(&self) -> LifecycleState {
        self.state.current()
    }

    /// Wait until the run reaches `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(LifecycleState::is_terminal).await;
    }

    /// Release the resource group and fail whatever is still pending.
    ///
    /// Safe to call at any time and any number of times; the returned view
    /// settles once the release has completed.
    pub fn disconnect(&self) -> SignalView<()> {
        tracing::debug!(client_id = %self.id, "Disconnecting client");
        let released = self.resources.release();
        self.signals.fail_pending(ClientError::Disconnected);
        released
    }

    /// Block until the driver thread finishes and return the run's result.
    pub fn join(mut self) -> ClientResult<()> {
        match self.thread.take() {
            Some(thread) => thread.join().unwrap_or(Err(ClientError::DriverPanicked)),
            None => Ok(()),
        }
    }

    /// Join the driver thread and summarise every signal.
    pub fn join_with_report(self) -> (ClientResult<()>, RunReport) {
        let views = [self.connected(), self.payload_sent(), self.threshold_received()];
        let client_id = self.id.as_u64();
        let target = self.target.to_string();

        let result = self.join();
        let [connected, payload_sent, threshold_received] =
            views.map(|view| SignalReport::from_view(&view));
        let report = RunReport {
            client_id,
            target,
            connected,
            payload_sent,
            threshold_received,
            error: None,
        }
        .with_result(&result);
        (result, report)
    }
}

enum Slot {
    Pending,
    Active(Arc<IoGroup>),
    Releasing,
    Released,
}

/// Where the run's resource group lives, so `disconnect()` can reach it.
#[derive(Debug)]
struct ResourceSlot {
    slot: Mutex<Slot>,
    settled: Condvar,
    released: CompletionSignal<()>,
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Slot::Pending => "Pending",
            Slot::Active(_) => "Active",
            Slot::Releasing => "Releasing",
            Slot::Released => "Released",
        })
    }
}

impl ResourceSlot {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            settled: Condvar::new(),
            released: CompletionSignal::new("released"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the acquired group. Fails if a release already happened.
    fn install(&self, group: Arc<IoGroup>) -> ClientResult<()> {
        let mut slot = self.lock();
        match *slot {
            Slot::Pending => {
                *slot = Slot::Active(group);
                Ok(())
            }
            _ => Err(ClientError::Disconnected),
        }
    }

    /// Release the group unless someone already started to.
    fn release(&self) -> SignalView<()> {
        let previous = {
            let mut slot = self.lock();
            match *slot {
                Slot::Pending | Slot::Active(_) => std::mem::replace(&mut *slot, Slot::Releasing),
                // Whoever took the group settles `released` when done.
                Slot::Releasing | Slot::Released => return self.released.view(),
            }
        };

        if let Slot::Active(group) = previous {
            group.release();
        }
        self.finish_release();
        self.released.view()
    }

    fn finish_release(&self) {
        self.released.fulfill(());
        *self.lock() = Slot::Released;
        self.settled.notify_all();
    }

    /// Block until a release started on another thread has completed.
    fn wait_released(&self) {
        let mut slot = self.lock();
        while matches!(*slot, Slot::Releasing) {
            slot = self.settled.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// State moved onto the driver thread.
struct Run {
    client: ScriptedClient,
    resources: Arc<ResourceSlot>,
    state: StateTracker,
}

impl Run {
    fn execute(mut self) -> ClientResult<()> {
        let span = tracing::info_span!(
            "client",
            client_id = %self.client.id,
            target = %self.client.target
        );
        let _entered = span.enter();

        tracing::info!(
            security = ?self.client.security,
            threshold = self.client.threshold,
            "Client starting"
        );
        let result = self.run_sequence();

        if let Err(e) = &result {
            tracing::error!(error = %e, "Client run failed");
            self.state.set(LifecycleState::Failed);
        }
        self.state.set(LifecycleState::ShuttingDown);
        self.resources.release();
        self.resources.wait_released();
        self.client.signals.fail_pending(ClientError::Disconnected);
        self.state.set(LifecycleState::Closed);

        metrics::record_run(if result.is_ok() { "closed" } else { "failed" });
        tracing::info!("Client closed");
        result
    }

    fn run_sequence(&mut self) -> ClientResult<()> {
        self.state.set(LifecycleState::Connecting);
        let settings = &self.client.settings;
        let group = Arc::new(IoGroup::acquire(
            self.client.id,
            settings.worker_threads,
            settings.shutdown_grace,
        )?);
        if let Err(e) = self.resources.install(Arc::clone(&group)) {
            group.release();
            self.client.signals.connected.fail(e.clone());
            return Err(e);
        }

        let outbound = self.connect(&group)?;
        self.state.set(LifecycleState::PipelineInstalled);

        let result = self.send(&outbound);
        self.drain(&group, outbound);
        result
    }

    /// Select the pipeline, connect and install it. Settles `connected` on failure.
    fn connect(&self, group: &IoGroup) -> ClientResult<Outbound> {
        let result = self.try_connect(group);
        if let Err(e) = &result {
            self.client.signals.connected.fail(e.clone());
        }
        result
    }

    fn try_connect(&self, group: &IoGroup) -> ClientResult<Outbound> {
        let client = &self.client;
        let pipeline = Pipeline::select(client.security, &client.settings.tls, &client.target)?;
        tracing::debug!(pipeline = ?pipeline, "Pipeline selected");

        let ctx = PipelineContext {
            client_id: client.id,
            target: client.target.clone(),
            connected: client.signals.connected.clone(),
            threshold: ThresholdWatch::new(
                client.threshold,
                client.signals.threshold_received.clone(),
            ),
            counter: counter_for(client.settings.unit),
            shutdown: group.shutdown_listener(),
        };
        let target = client.target.clone();
        let timeout = client.settings.connect_timeout;

        group.run(async move {
            let connect = TcpStream::connect((target.host(), target.port()));
            let stream = match tokio::time::timeout(timeout, connect).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(ClientError::connect(&target, e)),
                Err(_) => {
                    return Err(ClientError::ConnectTimeout {
                        target: target.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    })
                }
            };
            pipeline.install(stream, ctx).await
        })?
    }

    /// Payload phase, then the interactive phase.
    fn send(&mut self, outbound: &Outbound) -> ClientResult<()> {
        self.state.set(LifecycleState::SendingPayload);
        PayloadLoader::new(self.client.payload.take())
            .run(outbound, &self.client.signals.payload_sent)?;

        self.state.set(LifecycleState::Interactive);
        let console = self
            .client
            .console
            .take()
            .unwrap_or_else(|| Box::new(BufReader::new(std::io::stdin())));
        let end = InteractiveForwarder::new(console, self.client.settings.sentinel.as_str())
            .run(outbound)?;
        tracing::debug!(end = ?end, "Interactive phase finished");
        Ok(())
    }

    /// Let queued writes reach the wire before the group is released.
    fn drain(&self, group: &IoGroup, outbound: Outbound) {
        let writer = outbound.close();
        let grace = self.client.settings.shutdown_grace;

        match group.run(async move { tokio::time::timeout(grace, writer).await }) {
            Ok(Ok(Ok(()))) => tracing::debug!("Outbound queue drained"),
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "Writer task ended abnormally"),
            Ok(Err(_)) => tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "Outbound drain exceeded grace period"
            ),
            Err(_) => tracing::debug!("Resource group released before drain"),
        }
    }
}
