// crates/activity-feed-core/src/runtime/lazy.rs
// ============================================================================
// Module: Lazy Extracted Field
// Description: Text value produced by a background extraction task.
// Purpose: Block readers until extraction publishes, then release them together.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`LazyTextField`] submits one extraction task to a [`WorkQueue`] when it is
//! constructed. Readers block on a condition variable until the task
//! publishes; the completion flag and the content are published together
//! under one lock.
//!
//! Invariants:
//! - A value is always published: extraction errors, panics, and tasks the
//!   queue drops without running all publish the empty string.
//! - The binary source is discarded exactly once, whether or not extraction
//!   ran or succeeded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Cursor;
use std::io::Read;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::interfaces::BinarySource;
use crate::interfaces::ExtractError;
use crate::interfaces::TextExtractor;
use crate::interfaces::WorkQueue;
use crate::interfaces::WorkQueueError;
use crate::interfaces::WorkTask;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Published result of an extraction.
#[derive(Debug, Default)]
struct FieldState {
    /// Content; `Some` once published.
    content: Option<String>,
    /// Failure description when the published value is a fallback.
    failure: Option<String>,
}

/// State shared between the field and its producer.
#[derive(Debug, Default)]
struct Shared {
    /// Published state.
    state: Mutex<FieldState>,
    /// Signalled once on publication.
    published: Condvar,
}

impl Shared {
    /// Locks the state, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, FieldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes the content unless a value is already present.
    fn publish(&self, content: String, failure: Option<String>) {
        let mut state = self.lock();
        if state.content.is_none() {
            state.content = Some(content);
            state.failure = failure;
        }
        drop(state);
        self.published.notify_all();
    }

    /// Overrides the failure description of a fallback value.
    fn note_failure(&self, failure: String) {
        let mut state = self.lock();
        if state.failure.is_some() {
            state.failure = Some(failure);
        }
    }
}

// ============================================================================
// SECTION: Lazy Field
// ============================================================================

/// Text value extracted in the background.
#[derive(Debug, Clone)]
pub struct LazyTextField {
    /// State shared with the producer task.
    shared: Arc<Shared>,
}

impl LazyTextField {
    /// Creates the field and submits its extraction task to `queue`.
    ///
    /// A rejected submission publishes the empty value immediately.
    #[must_use]
    pub fn new(
        queue: &dyn WorkQueue,
        extractor: Arc<dyn TextExtractor>,
        source: Box<dyn BinarySource>,
    ) -> Self {
        let shared = Arc::new(Shared::default());
        let job = ExtractionJob {
            publisher: Publisher {
                shared: Arc::clone(&shared),
                done: false,
            },
            source: SourceGuard {
                source,
                discarded: false,
            },
            extractor,
        };
        if let Err(err) = queue.execute(Box::new(move || job.run())) {
            shared.note_failure(err.to_string());
        }
        Self {
            shared,
        }
    }

    /// Blocks until the content is published and returns it.
    #[must_use]
    pub fn read(&self) -> String {
        let state = self
            .shared
            .published
            .wait_while(self.shared.lock(), |state| state.content.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.content.clone().unwrap_or_default()
    }

    /// Blocks up to `timeout`; returns `None` when nothing was published in time.
    #[must_use]
    pub fn read_timeout(&self, timeout: Duration) -> Option<String> {
        let (state, _) = self
            .shared
            .published
            .wait_timeout_while(self.shared.lock(), timeout, |state| state.content.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.content.clone()
    }

    /// Returns true once a value has been published.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shared.lock().content.is_some()
    }

    /// Returns the failure description when the published value is a fallback.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        self.shared.lock().failure.clone()
    }
}

// ============================================================================
// SECTION: Producer
// ============================================================================

/// Publishes the fallback value if dropped before publishing.
struct Publisher {
    /// State shared with the field.
    shared: Arc<Shared>,
    /// True once a value was published.
    done: bool,
}

impl Publisher {
    /// Publishes the extraction outcome.
    fn publish(&mut self, outcome: Result<String, String>) {
        self.done = true;
        match outcome {
            Ok(content) => self.shared.publish(content, None),
            Err(failure) => self.shared.publish(String::new(), Some(failure)),
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        if !self.done {
            self.shared.publish(String::new(), Some("extraction task did not run".to_string()));
        }
    }
}

/// Discards the binary source exactly once.
struct SourceGuard {
    /// Consumed source.
    source: Box<dyn BinarySource>,
    /// True once discarded.
    discarded: bool,
}

impl SourceGuard {
    /// Discards the source if not already discarded.
    fn discard(&mut self) {
        if !self.discarded {
            self.discarded = true;
            self.source.discard();
        }
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.discard();
    }
}

/// Extraction task submitted to the work queue.
struct ExtractionJob {
    /// Result publisher.
    publisher: Publisher,
    /// Source guard.
    source: SourceGuard,
    /// Text extractor.
    extractor: Arc<dyn TextExtractor>,
}

impl ExtractionJob {
    /// Runs the extraction, releases the source, then publishes.
    fn run(mut self) {
        let extractor = Arc::clone(&self.extractor);
        let source = &mut self.source;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut reader = source.source.open()?;
            extractor.extract(&mut reader)
        }));
        let description = self.source.source.describe();
        self.source.discard();
        let outcome = match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(err)) => Err(format!("{description}: {err}")),
            Err(_) => Err(format!("{description}: extractor panicked")),
        };
        self.publisher.publish(outcome);
    }
}

// ============================================================================
// SECTION: Work Queues
// ============================================================================

/// Runs every task on a new named thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadWorkQueue;

impl WorkQueue for ThreadWorkQueue {
    fn execute(&self, task: WorkTask) -> Result<(), WorkQueueError> {
        thread::Builder::new()
            .name("activity-feed-extract".to_string())
            .spawn(task)
            .map(|_| ())
            .map_err(|err| WorkQueueError::Rejected(err.to_string()))
    }
}

/// Runs every task on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineWorkQueue;

impl WorkQueue for InlineWorkQueue {
    fn execute(&self, task: WorkTask) -> Result<(), WorkQueueError> {
        task();
        Ok(())
    }
}

// ============================================================================
// SECTION: Reference Extraction
// ============================================================================

/// Extracts UTF-8 text verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8TextExtractor;

impl TextExtractor for Utf8TextExtractor {
    fn extract(&self, reader: &mut dyn Read) -> Result<String, ExtractError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|err| ExtractError::Unsupported(format!("not utf-8: {err}")))
    }
}

/// Binary source backed by an in-memory buffer.
#[derive(Debug, Clone)]
pub struct InMemoryBinarySource {
    /// Content bytes.
    bytes: Vec<u8>,
    /// When true, opening fails.
    unreadable: bool,
    /// Discard counter shared with observers.
    discards: Arc<AtomicUsize>,
}

impl InMemoryBinarySource {
    /// Creates a readable source.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            unreadable: false,
            discards: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a source whose content cannot be opened.
    #[must_use]
    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::new(Vec::new())
        }
    }

    /// Returns a handle to the discard counter.
    #[must_use]
    pub fn discard_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.discards)
    }
}

impl BinarySource for InMemoryBinarySource {
    fn open(&mut self) -> io::Result<Box<dyn Read + Send>> {
        if self.unreadable {
            return Err(io::Error::new(io::ErrorKind::NotFound, "binary content unavailable"));
        }
        Ok(Box::new(Cursor::new(self.bytes.clone())))
    }

    fn describe(&self) -> String {
        format!("in-memory binary ({} bytes)", self.bytes.len())
    }

    fn discard(&mut self) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }
}
