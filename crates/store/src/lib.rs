//! Persist "the last time something happened" for a set of keys
//!
//! This crate provides:
//! - A JSON-file backed key -> timestamp store with coalesced writes
//! - Natural-language time expressions ("10 minutes ago", "in 2 days")
//! - Comparison helpers between stored instants and expressions
//!
//! ```no_run
//! use date_store::{DateStore, StoreOptions};
//!
//! # fn main() -> date_store::Result<()> {
//! let store = DateStore::open(StoreOptions::named("my-tool"))?;
//! store.record("update-check")?;
//!
//! if store.last_saved("update-check").more_than("1 day ago") {
//!     println!("time to check for updates again");
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod expr;
pub mod flush;
pub mod fsutil;
pub mod options;
pub mod store;
pub mod timestamp;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StoreError};
pub use expr::{ExpressionParser, NaturalParser};
pub use options::StoreOptions;
pub use store::{CompareError, DateStore, LastSaved};
pub use timestamp::{parse_timestamp, TimestampFormat};

/// In-memory mapping of key -> stored timestamp string, in insertion order
pub type Dates = indexmap::IndexMap<String, String>;
