//! Counts the publications listed on a convention-publications site.
//!
//! The site is a tree of hand-edited pages: a root index of convention
//! series, one page per series listing its conventions, and one page per
//! convention listing its files. Pages come in two generations: an older
//! one that embeds its data as JSON in a `<fanac-json>` block, and the
//! current pure-HTML one. Both are decoded into the same entities and
//! folded bottom-up into [`Counts`].
//!
//! ```text
//! fetch page ─► parser::version::classify ─┬─► parser::legacy  (JSON block)
//!                                          └─► parser::markup  (tags + rows)
//!                                                   │
//!                    aggregate::Aggregator ◄────────┘  Counts, failures
//! ```

pub mod aggregate;
pub mod config;
pub mod counts;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod text;

pub use aggregate::{Aggregate, Aggregator, Report};
pub use counts::Counts;
pub use error::{DecodeError, FetchError, NodeError};
pub use fetch::{DirFetcher, Fetch, HttpFetcher, MemoryFetcher};
pub use model::{EntryKind, FileEntry, InstanceRef, SeriesRef};
