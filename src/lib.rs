//! # ripple-rs
//!
//! `ripple-rs` is a small time tracker. Every activity is an entry with a start time, an optional
//! end time and some free text, stored one per line in a plain text file:
//!
//! ```text
//! 2014-08-22 17:10:00 2014-08-22 18:00:00: write the report +work
//! 2014-08-22 18:05:00 running: review +work +code
//! ```
//!
//! Words of the text starting with `+` are tags. Entries can be listed through filters on tags,
//! days and timeframes.
//!
//! Usage example:
//!
//! ```no_run
//! use ripple_rs::{data::Store, filter::Pipeline, formatter};
//! let store = Store::open(std::path::Path::new("/tmp/ripple.txt")).unwrap();
//! let now = ripple_rs::data::now();
//! let pipeline = Pipeline::parse(&["+work".to_string()], now.date()).unwrap();
//! let entries = pipeline.apply(store.entries());
//! formatter::list(&mut std::io::stdout(), &entries, now).unwrap();
//! ```

/// Entries, their storage format and the store holding them
pub mod data;

/// Filters selecting entries by tag, day or timeframe
pub mod filter;

/// Format entries for humans
pub mod formatter;

pub mod cli;
pub mod config;
pub mod editor;
pub mod error;

pub use config::Config;
pub use data::{Entry, Store};
pub use error::Error;
