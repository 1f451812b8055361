use thiserror::Error as ThisError;

/// Conditions callers may want to tell apart from plain I/O failures.
///
/// They usually travel inside an `anyhow::Error` and can be recovered with
/// `err.downcast_ref::<Error>()`.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// A storage line does not follow the entry grammar.
    #[error("unable to parse the entry {0:?}")]
    Parse(String),

    /// A filter token looks like a date but is not one.
    #[error("unable to parse the given date {0}")]
    InvalidDate(String),

    /// `stop` on an empty store.
    #[error("nothing to end (no previous entries found)")]
    NoEntries,

    /// `stop` when the most recent entry is already finished.
    #[error("nothing to end!")]
    AlreadyStopped,

    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}
