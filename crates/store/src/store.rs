//! File-backed key -> timestamp store
//!
//! The mapping is loaded once when the store is opened and kept in memory.
//! Every mutation schedules a save; with a non-zero `write_delay` saves are
//! coalesced by the [`FlushScheduler`], otherwise they happen synchronously.
//!
//! [`FlushScheduler`]: crate::flush::FlushScheduler

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::expr::{ExpressionParser, NaturalParser};
use crate::flush::FlushScheduler;
use crate::fsutil::{ensure_dir, write_private};
use crate::options::StoreOptions;
use crate::timestamp::parse_timestamp;
use crate::Dates;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, warn};

/// State shared between the store handle and its flush worker
struct Shared {
    path: PathBuf,
    indent: usize,
    dates: Mutex<Dates>,
    /// Serializes writers of the backing file
    write_lock: Mutex<()>,
    /// Completed writes of the backing file
    flushes: AtomicU64,
    /// Failure of a deferred flush, reported by the next save
    deferred_error: Mutex<Option<StoreError>>,
}

impl Shared {
    fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock();

        let json = {
            let dates = self.dates.lock();
            render_json(&dates, self.indent)?
        };

        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        write_private(&self.path, json.as_bytes())?;

        let count = self.flushes.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        debug!("Flushed {} ({} bytes, write #{})", self.path.display(), json.len(), count);
        Ok(())
    }
}

/// Persistent record of when things last happened
pub struct DateStore {
    options: StoreOptions,
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    parser: Arc<dyn ExpressionParser>,
    /// Present only when saves are deferred
    scheduler: Option<FlushScheduler>,
}

impl DateStore {
    /// Open (or start) the store described by `options`
    ///
    /// The backing file is read here, once. A missing or corrupt file gives
    /// an empty store; an unreadable one is an error.
    pub fn open(options: StoreOptions) -> Result<Self> {
        let path = options.resolve_path()?;
        let dates = load(&path)?;
        debug!("Opened {} with {} entries", path.display(), dates.len());

        let shared = Arc::new(Shared {
            path: path.clone(),
            indent: options.indent,
            dates: Mutex::new(dates),
            write_lock: Mutex::new(()),
            flushes: AtomicU64::new(0),
            deferred_error: Mutex::new(None),
        });

        let scheduler = if options.write_delay.is_zero() {
            None
        } else {
            let worker_shared = Arc::clone(&shared);
            let scheduler = FlushScheduler::spawn(options.write_delay, move || {
                if let Err(e) = worker_shared.flush() {
                    warn!("Deferred save of {} failed: {}", worker_shared.path.display(), e);
                    *worker_shared.deferred_error.lock() = Some(e);
                }
            })
            .map_err(|e| StoreError::Io { path, source: e })?;
            Some(scheduler)
        };

        Ok(Self {
            options,
            shared,
            clock: Arc::new(SystemClock),
            parser: Arc::new(NaturalParser),
            scheduler,
        })
    }

    /// Open a store by name with default options
    pub fn named(name: impl Into<String>) -> Result<Self> {
        Self::open(StoreOptions::named(name))
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different expression parser
    pub fn with_parser(mut self, parser: Arc<dyn ExpressionParser>) -> Self {
        self.parser = parser;
        self
    }

    // --- Recording ---

    /// Store the current instant for `key`, replacing any previous value
    pub fn record(&self, key: &str) -> Result<&Self> {
        self.record_at(key, self.clock.now())
    }

    /// Store a specific instant for `key`
    pub fn record_at(&self, key: &str, instant: DateTime<Local>) -> Result<&Self> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        let rendered = self.options.format.render(instant);
        self.shared.dates.lock().insert(key.to_string(), rendered);
        self.save()?;
        Ok(self)
    }

    /// Remove `key`; removing a missing key is not an error
    pub fn delete(&self, key: &str) -> Result<&Self> {
        self.shared.dates.lock().shift_remove(key);
        self.save()?;
        Ok(self)
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<()> {
        self.shared.dates.lock().clear();
        self.save()
    }

    /// Swap the whole mapping
    pub fn replace(&self, dates: Dates) -> Result<()> {
        *self.shared.dates.lock() = dates;
        self.save()
    }

    // --- Lookup ---

    /// The stored instant for `key`
    ///
    /// `None` when nothing is stored or the stored string is not a date.
    /// The raw value is parsed on every call.
    pub fn lookup(&self, key: &str) -> Option<DateTime<Local>> {
        let dates = self.shared.dates.lock();
        parse_timestamp(dates.get(key)?)
    }

    /// The stored string for `key`, unparsed
    pub fn raw_value(&self, key: &str) -> Option<String> {
        self.shared.dates.lock().get(key).cloned()
    }

    /// Milliseconds since the Unix epoch of the stored instant
    pub fn epoch_of(&self, key: &str) -> Result<i64> {
        self.lookup(key)
            .map(|instant| instant.timestamp_millis())
            .ok_or_else(|| StoreError::NotADate {
                key: key.to_string(),
            })
    }

    /// True if a valid date is stored for `key`
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Start a comparison against the stored instant of `key`
    ///
    /// ```no_run
    /// # use date_store::DateStore;
    /// # let store = DateStore::named("example").unwrap();
    /// if store.last_saved("backup").more_than("1 week ago") {
    ///     // the last backup is older than a week
    /// }
    /// ```
    pub fn last_saved(&self, key: &str) -> LastSaved<'_> {
        LastSaved {
            store: self,
            key: key.to_string(),
            instant: self.lookup(key),
        }
    }

    // --- Expressions ---

    /// Resolve a natural-language expression against the store's clock
    pub fn resolve_expression(&self, text: &str) -> Option<DateTime<Local>> {
        self.parser.parse(text, self.clock.now())
    }

    /// Epoch milliseconds of a resolved expression
    pub fn time(&self, text: &str) -> Option<i64> {
        self.resolve_expression(text)
            .map(|instant| instant.timestamp_millis())
    }

    /// Seconds from the resolved expression to the stored instant of `key`
    ///
    /// Positive when the stored instant is later. `None` if either side is
    /// not a valid instant.
    pub fn difference_seconds(&self, key: &str, text: &str) -> Option<f64> {
        let stored = self.lookup(key)?.timestamp_millis();
        let target = self.time(text)?;
        Some((stored - target) as f64 / 1000.0)
    }

    /// Keys stored strictly after the resolved expression, in insertion order
    pub fn entries_since(&self, text: &str) -> Vec<String> {
        let Some(since) = self.time(text) else {
            return Vec::new();
        };

        self.shared
            .dates
            .lock()
            .iter()
            .filter(|(_, raw)| {
                parse_timestamp(raw).is_some_and(|at| at.timestamp_millis() > since)
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    // --- Persistence ---

    /// The mapping as JSON text; `None` uses the configured indent
    pub fn serialize(&self, indent: Option<usize>) -> Result<String> {
        let dates = self.shared.dates.lock();
        render_json(&dates, indent.unwrap_or(self.options.indent))
    }

    /// Schedule a write of the mapping
    ///
    /// Writes immediately when no delay is configured. A failure of an
    /// earlier deferred write is returned here.
    pub fn save(&self) -> Result<()> {
        match &self.scheduler {
            Some(scheduler) => {
                scheduler.schedule();
                match self.shared.deferred_error.lock().take() {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }
            None => self.shared.flush(),
        }
    }

    /// Write the mapping now, dropping any pending deferred write
    pub fn flush_now(&self) -> Result<()> {
        if let Some(scheduler) = &self.scheduler {
            scheduler.cancel();
        }
        self.shared.flush()?;
        self.shared.deferred_error.lock().take();
        Ok(())
    }

    /// Re-read the backing file, replacing the in-memory mapping
    pub fn reload(&self) -> Result<()> {
        let dates = load(&self.shared.path)?;
        *self.shared.dates.lock() = dates;
        Ok(())
    }

    // --- Introspection ---

    /// Snapshot of the mapping
    pub fn dates(&self) -> Dates {
        self.shared.dates.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.shared.dates.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shared.dates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.dates.lock().is_empty()
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn name(&self) -> &str {
        self.options.store_name()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Number of completed writes of the backing file by this store
    pub fn flush_count(&self) -> u64 {
        self.shared.flushes.load(AtomicOrdering::SeqCst)
    }

    /// True while a deferred write is waiting for its deadline
    pub fn is_flush_pending(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(|scheduler| scheduler.is_pending())
    }
}

impl fmt::Debug for DateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateStore")
            .field("path", &self.shared.path)
            .field("entries", &self.len())
            .field("write_delay", &self.options.write_delay)
            .finish()
    }
}

/// Why a comparison could not be made
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("no valid date stored for key {key:?}")]
    NoStoredValue { key: String },

    #[error("could not resolve time expression {expression:?}")]
    InvalidExpression { expression: String },
}

/// The stored instant of one key, ready to be compared
///
/// The stored instant is always the left operand: `more_than("1 hour ago")`
/// asks whether the key was last saved *more than* an hour ago, i.e. whether
/// the stored instant is earlier than the resolved expression.
#[derive(Clone)]
pub struct LastSaved<'a> {
    store: &'a DateStore,
    key: String,
    instant: Option<DateTime<Local>>,
}

impl LastSaved<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The captured instant, `None` if nothing valid was stored
    pub fn instant(&self) -> Option<DateTime<Local>> {
        self.instant
    }

    pub fn epoch_ms(&self) -> Option<i64> {
        self.instant.map(|instant| instant.timestamp_millis())
    }

    /// Order of the stored instant relative to the resolved expression
    pub fn compare(&self, text: &str) -> std::result::Result<Ordering, CompareError> {
        let stored = self.epoch_ms().ok_or_else(|| CompareError::NoStoredValue {
            key: self.key.clone(),
        })?;
        let target = self
            .store
            .time(text)
            .ok_or_else(|| CompareError::InvalidExpression {
                expression: text.to_string(),
            })?;
        Ok(stored.cmp(&target))
    }

    /// Stored instant is earlier than the expression
    pub fn more_than(&self, text: &str) -> bool {
        self.holds(text, Ordering::is_lt)
    }

    /// Stored instant is earlier than or equal to the expression
    pub fn is_older_than_or_equal(&self, text: &str) -> bool {
        self.holds(text, Ordering::is_le)
    }

    /// Stored instant is later than or equal to the expression
    pub fn is_newer_than_or_equal(&self, text: &str) -> bool {
        self.holds(text, Ordering::is_ge)
    }

    /// Stored instant is later than the expression
    pub fn less_than(&self, text: &str) -> bool {
        self.holds(text, Ordering::is_gt)
    }

    fn holds(&self, text: &str, test: fn(Ordering) -> bool) -> bool {
        self.compare(text).map(test).unwrap_or(false)
    }
}

impl fmt::Debug for LastSaved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LastSaved")
            .field("key", &self.key)
            .field("instant", &self.instant)
            .finish()
    }
}

/// Read the backing file
///
/// Missing content, or content that is not a JSON object, gives an empty
/// mapping. Non-string values are dropped one key at a time. Other read
/// failures (permissions in particular) are errors.
fn load(path: &Path) -> Result<Dates> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Dates::new()),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            warn!("Discarding {}: not UTF-8", path.display());
            return Ok(Dates::new());
        }
        Err(e) => return Err(StoreError::from_io(path, e)),
    };

    let entries = match serde_json::from_str::<IndexMap<String, serde_json::Value>>(&text) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Discarding corrupt store {}: {}", path.display(), e);
            return Ok(Dates::new());
        }
    };

    let mut dates = Dates::with_capacity(entries.len());
    for (key, value) in entries {
        match value {
            serde_json::Value::String(stamp) => {
                dates.insert(key, stamp);
            }
            other => warn!(
                "Dropping non-string value for '{}' in {}: {}",
                key,
                path.display(),
                other
            ),
        }
    }
    Ok(dates)
}

fn render_json(dates: &Dates, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(dates)?);
    }

    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    dates.serialize(&mut serializer)?;

    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}
