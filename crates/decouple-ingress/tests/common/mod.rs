// crates/decouple-ingress/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for decouple-ingress tests.
// Purpose: Provide recording collaborators, gates, and fixtures.
// Dependencies: decouple-core, async-trait, tokio
// ============================================================================

//! ## Overview
//! Provides a recording [`TopicHandleFactory`] whose handles count publishes
//! and closes, optional publish gates for drain and timeout scenarios, and
//! event and routing fixtures.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use decouple_core::BrokerIdentity;
use decouple_core::BrokerRoute;
use decouple_core::Event;
use decouple_core::EventData;
use decouple_core::HandleOpenError;
use decouple_core::Message;
use decouple_core::PublishAck;
use decouple_core::PublishError;
use decouple_core::TopicHandle;
use decouple_core::TopicHandleFactory;
use decouple_core::TopicId;
use decouple_ingress::InMemoryRoutingTable;
use serde_json::json;
use tokio::sync::Notify;
use tokio::sync::Semaphore;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Broker used by most tests.
pub fn broker() -> BrokerIdentity {
    BrokerIdentity::new("ns", "b1")
}

/// Creates a valid JSON event.
pub fn sample_event(id: &str) -> Event {
    Event::new(id, "//ingress/tests", "com.example.test")
        .with_data("application/json", EventData::Json(json!({"id": id})))
}

/// Creates a routing table with `broker()` ready on `topic`.
pub fn table_with_ready(topic: &str) -> Arc<InMemoryRoutingTable> {
    Arc::new(InMemoryRoutingTable::from_routes([(broker(), BrokerRoute::ready(topic))]))
}

/// Parses a topic id fixture.
pub fn topic(raw: &str) -> TopicId {
    TopicId::parse(raw).unwrap()
}

/// Returns true when both handles are the same allocation.
pub fn same_handle(left: &Arc<dyn TopicHandle>, right: &Arc<dyn TopicHandle>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}

// ============================================================================
// SECTION: Publish Gate
// ============================================================================

/// Holds publishes until released.
pub struct PublishGate {
    /// Signalled when a publish reaches the gate.
    pub entered: Notify,
    /// Permits released to waiting publishes.
    pub release: Semaphore,
}

impl PublishGate {
    /// Creates a closed gate.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        })
    }

    /// Lets one waiting publish continue.
    pub fn open_one(&self) {
        self.release.add_permits(1);
    }
}

// ============================================================================
// SECTION: Recording Handle
// ============================================================================

/// Topic handle that records publishes and closes.
pub struct RecordingHandle {
    /// Bound topic.
    topic: TopicId,
    /// Messages accepted.
    published: Mutex<Vec<Message>>,
    /// Number of `close` calls.
    closes: AtomicUsize,
    /// Close state.
    closed: AtomicBool,
    /// Optional gate applied to every publish.
    gate: Option<Arc<PublishGate>>,
    /// Error returned by every publish.
    publish_error: Option<PublishError>,
    /// Message id counter.
    seq: AtomicU64,
}

impl RecordingHandle {
    /// Returns the number of accepted messages.
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Returns a copy of the accepted messages.
    pub fn published(&self) -> Vec<Message> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Returns the bound topic.
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }
}

#[async_trait]
impl TopicHandle for RecordingHandle {
    fn topic_id(&self) -> &TopicId {
        &self.topic
    }

    async fn publish(&self, message: Message) -> Result<PublishAck, PublishError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Closed(self.topic.clone()));
        }
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }
        if let Some(err) = &self.publish_error {
            return Err(err.clone());
        }
        self.published.lock().unwrap().push(message);
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PublishAck {
            message_id: format!("{}-{seq}", self.topic),
            topic_id: self.topic.clone(),
        })
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// SECTION: Recording Factory
// ============================================================================

/// Factory that records every handle it opens.
#[derive(Default)]
pub struct RecordingFactory {
    /// Number of `open` calls.
    opens: AtomicUsize,
    /// Handles opened so far.
    handles: Mutex<Vec<Arc<RecordingHandle>>>,
    /// Error returned by `open` while set.
    open_error: Mutex<Option<HandleOpenError>>,
    /// Gate attached to the next opened handle.
    next_gate: Mutex<Option<Arc<PublishGate>>>,
    /// Error every opened handle returns from `publish`.
    publish_error: Option<PublishError>,
    /// Delay inside `open` to widen race windows.
    open_delay: Option<Duration>,
}

impl RecordingFactory {
    /// Creates a factory.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a factory that sleeps inside `open`.
    pub fn with_open_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            open_delay: Some(delay),
            ..Self::default()
        })
    }

    /// Creates a factory whose handles fail every publish.
    pub fn with_publish_error(err: PublishError) -> Arc<Self> {
        Arc::new(Self {
            publish_error: Some(err),
            ..Self::default()
        })
    }

    /// Returns the number of `open` calls.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Returns every handle opened so far.
    pub fn handles(&self) -> Vec<Arc<RecordingHandle>> {
        self.handles.lock().unwrap().clone()
    }

    /// Returns the handle opened for `raw` topic.
    pub fn handle_for(&self, raw: &str) -> Arc<RecordingHandle> {
        self.handles().into_iter().find(|handle| handle.topic().as_str() == raw).unwrap()
    }

    /// Makes `open` fail with `err` until cleared.
    pub fn fail_opens(&self, err: Option<HandleOpenError>) {
        *self.open_error.lock().unwrap() = err;
    }

    /// Attaches `gate` to the next opened handle.
    pub fn gate_next(&self, gate: Arc<PublishGate>) {
        *self.next_gate.lock().unwrap() = Some(gate);
    }
}

impl TopicHandleFactory for RecordingFactory {
    fn open(&self, topic: &TopicId) -> Result<Arc<dyn TopicHandle>, HandleOpenError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            std::thread::sleep(delay);
        }
        if let Some(err) = self.open_error.lock().unwrap().clone() {
            return Err(err);
        }
        let handle = Arc::new(RecordingHandle {
            topic: topic.clone(),
            published: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            gate: self.next_gate.lock().unwrap().take(),
            publish_error: self.publish_error.clone(),
            seq: AtomicU64::new(0),
        });
        self.handles.lock().unwrap().push(Arc::clone(&handle));
        Ok(handle)
    }
}

// ============================================================================
// SECTION: Shared Buffer for Write Testing
// ============================================================================

/// A thread-safe buffer for testing Write implementations.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Returns the contents as a string.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().expect("buffer lock")).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A writer that always fails, for testing error paths.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("simulated write failure"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
