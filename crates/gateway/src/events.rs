//! Background drain of the scoreboard's publish feed into an in-memory queue.
//!
//! The subscriber is the only producer. Consumers pop or drain at their own
//! pace; the queue is unbounded and never waits for them.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    chainball_config::EventsConfig,
    chainball_protocol::SUBSCRIBE_ALL,
    tokio::{
        net::TcpStream,
        sync::Notify,
        task::JoinHandle,
        time::MissedTickBehavior,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    zeromq::{Socket, SocketRecv, SubSocket},
};

use crate::error::{Error, Result};

// ── Events ───────────────────────────────────────────────────────────────────

/// One published message, frames kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    frames: Vec<Bytes>,
}

impl Event {
    pub fn new(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }

    /// Parse one frame as JSON, if it is JSON.
    pub fn json(&self, index: usize) -> Option<serde_json::Value> {
        self.frames
            .get(index)
            .and_then(|f| serde_json::from_slice(f).ok())
    }
}

// ── Queue ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct QueueInner {
    events: Mutex<VecDeque<Event>>,
    notify: Notify,
}

/// Shared FIFO of received events. Cloning shares the same queue.
#[derive(Clone, Default)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> std::sync::MutexGuard<'_, VecDeque<Event>> {
        // A poisoned queue still holds valid events.
        self.inner.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn push(&self, event: Event) {
        self.events().push_back(event);
        self.inner.notify.notify_waiters();
    }

    /// Take the oldest event, if any.
    pub fn pop(&self) -> Option<Event> {
        self.events().pop_front()
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        self.events().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }

    /// Wait for the next event and take it.
    pub async fn next(&self) -> Event {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(event) = self.pop() {
                return event;
            }
            notified.await;
        }
    }
}

// ── Feed ─────────────────────────────────────────────────────────────────────

/// A connected subscription.
#[async_trait]
pub trait EventFeed: Send {
    /// Block until the next multi-frame message arrives.
    async fn recv(&mut self) -> Result<Vec<Bytes>>;
}

/// Opens subscriptions; called again after every feed fault.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn EventFeed>>;
}

/// ZeroMQ SUB connector subscribed to every topic.
///
/// A `zeromq` SUB socket drops a vanished publisher without surfacing an
/// error, so the feed also probes the publisher's TCP address while idle
/// and reports a fault once it stops accepting connections.
#[derive(Debug, Clone)]
pub struct ZmqFeedConnector {
    endpoint: String,
    liveness_interval: Option<Duration>,
}

impl ZmqFeedConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            liveness_interval: None,
        }
    }

    /// Probe the publisher every `interval` while no event arrives.
    #[must_use]
    pub fn with_liveness(mut self, interval: Option<Duration>) -> Self {
        self.liveness_interval = interval;
        self
    }
}

/// Address a raw TCP probe can dial, for `tcp://host:port` endpoints only.
fn probe_addr(endpoint: &str) -> Option<&str> {
    endpoint
        .strip_prefix("tcp://")
        .filter(|addr| !addr.is_empty() && !addr.starts_with('*'))
}

struct Liveness {
    addr: String,
    period: Duration,
    ticker: tokio::time::Interval,
}

impl Liveness {
    fn new(addr: &str, period: Duration) -> Self {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            addr: addr.to_string(),
            period,
            ticker,
        }
    }

    async fn check(&self) -> Result<()> {
        match tokio::time::timeout(self.period, TcpStream::connect(self.addr.as_str())).await {
            Ok(Ok(_probe)) => Ok(()),
            Ok(Err(e)) => Err(Error::transport("event feed disconnected", e)),
            Err(e) => Err(Error::transport("event feed disconnected", e)),
        }
    }
}

struct ZmqFeed {
    socket: SubSocket,
    liveness: Option<Liveness>,
}

#[async_trait]
impl EventFeed for ZmqFeed {
    async fn recv(&mut self) -> Result<Vec<Bytes>> {
        let Self { socket, liveness } = self;
        loop {
            let received = match liveness.as_mut() {
                None => socket.recv().await,
                Some(probe) => tokio::select! {
                    received = socket.recv() => received,
                    _ = probe.ticker.tick() => {
                        probe.check().await?;
                        continue;
                    },
                },
            };
            let msg = received.map_err(|e| Error::transport("could not receive event", e))?;
            if let Some(probe) = liveness.as_mut() {
                probe.ticker.reset();
            }
            return Ok(msg.into_vec());
        }
    }
}

#[async_trait]
impl FeedConnector for ZmqFeedConnector {
    async fn connect(&self) -> Result<Box<dyn EventFeed>> {
        let mut socket = SubSocket::new();
        socket
            .connect(&self.endpoint)
            .await
            .map_err(|e| Error::transport("could not connect to event feed", e))?;
        socket
            .subscribe(SUBSCRIBE_ALL)
            .await
            .map_err(|e| Error::transport("could not subscribe to event feed", e))?;

        let liveness = match (self.liveness_interval, probe_addr(&self.endpoint)) {
            (Some(period), Some(addr)) => Some(Liveness::new(addr, period)),
            (Some(_), None) => {
                debug!(endpoint = %self.endpoint, "liveness probe unsupported for endpoint");
                None
            },
            (None, _) => None,
        };
        Ok(Box::new(ZmqFeed { socket, liveness }))
    }
}

// ── Reconnect policy ─────────────────────────────────────────────────────────

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following one doubles, up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Publisher probe period for ZeroMQ feeds; `None` disables probing.
    pub liveness_interval: Option<Duration>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&EventsConfig::default())
    }
}

impl From<&EventsConfig> for ReconnectPolicy {
    fn from(cfg: &EventsConfig) -> Self {
        Self {
            enabled: cfg.reconnect,
            initial_backoff: cfg.initial_backoff(),
            max_backoff: cfg.max_backoff(),
            liveness_interval: cfg.liveness_interval(),
        }
    }
}

// ── Subscriber ───────────────────────────────────────────────────────────────

/// Long-running task draining the publish feed into an [`EventQueue`].
pub struct EventSubscriber {
    connector: Arc<dyn FeedConnector>,
    policy: ReconnectPolicy,
    queue: EventQueue,
}

impl EventSubscriber {
    pub fn new(connector: Arc<dyn FeedConnector>, policy: ReconnectPolicy) -> Self {
        Self {
            connector,
            policy,
            queue: EventQueue::new(),
        }
    }

    /// Subscriber for a ZeroMQ publish endpoint.
    pub fn zmq(endpoint: impl Into<String>, policy: ReconnectPolicy) -> Self {
        let connector = ZmqFeedConnector::new(endpoint).with_liveness(policy.liveness_interval);
        Self::new(Arc::new(connector), policy)
    }

    pub fn queue(&self) -> EventQueue {
        self.queue.clone()
    }

    /// Start the subscriber on the tokio runtime.
    pub fn spawn(self) -> SubscriberHandle {
        let cancel = CancellationToken::new();
        let queue = self.queue();
        let task = tokio::spawn(self.run(cancel.clone()));
        SubscriberHandle {
            queue,
            cancel,
            task,
        }
    }

    /// Receive until cancelled.
    ///
    /// Returns `Ok(())` on cancellation. With reconnect disabled, the first
    /// feed fault is returned as the error.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut backoff = Backoff::new(self.policy.initial_backoff, self.policy.max_backoff);

        loop {
            let fault = tokio::select! {
                () = cancel.cancelled() => break,
                fault = self.pump(&mut backoff) => fault,
            };

            if !self.policy.enabled {
                error!(error = %fault, "event feed failed, reconnect disabled");
                return Err(fault);
            }

            let delay = backoff.next_delay();
            warn!(error = %fault, retry_in = ?delay, "event feed failed, reconnecting");
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {},
            }
        }

        info!(queued = self.queue.len(), "event subscriber stopped");
        Ok(())
    }

    /// Connect and append events until the feed faults.
    async fn pump(&self, backoff: &mut Backoff) -> Error {
        let mut feed = match self.connector.connect().await {
            Ok(feed) => feed,
            Err(e) => return e,
        };
        info!("event feed connected");

        loop {
            match feed.recv().await {
                Ok(frames) => {
                    backoff.reset();
                    debug!(frames = frames.len(), "event received");
                    self.queue.push(Event::new(frames));
                },
                Err(e) => return e,
            }
        }
    }
}

/// Handle to a spawned [`EventSubscriber`].
pub struct SubscriberHandle {
    queue: EventQueue,
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl SubscriberHandle {
    pub fn queue(&self) -> EventQueue {
        self.queue.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to end and return its outcome.
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::transport("event subscriber task failed", e))?
    }

    /// Cancel and wait for the task to end.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel();
        self.join().await
    }
}
