//! Unified error types for the greenhouse controller.
//!
//! Transient errors ([`ParseError`], [`LinkError`], [`BrokerError`],
//! [`StorageError`]) are absorbed by the component that owns the
//! resource and only ever surface as state.  [`Error`] is what reaches
//! `main`: configuration and rule-table problems that stop the process
//! before any loop starts.

use core::fmt;

use crate::sensors::frame::{Field, Section};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Startup-fatal errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A fuzzy rule table failed load-time validation.
    RuleTable(FuzzyError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::RuleTable(e) => write!(f, "rule table: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<FuzzyError> for Error {
    fn from(e: FuzzyError) -> Self {
        Self::RuleTable(e)
    }
}

// ---------------------------------------------------------------------------
// Frame parse errors
// ---------------------------------------------------------------------------

/// Why a sensor line was rejected.  The line is discarded and the
/// previous frame pair stays current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing left after trimming.
    EmptyLine,
    /// Expected exactly two `;`-separated segments.
    SegmentCount(usize),
    /// Segment has no `|` between label and values.
    MissingLabel { segment: usize },
    /// Label is neither `Controlled` nor `Control`.
    UnknownLabel(String),
    /// The same section appeared twice.
    DuplicateSection(Section),
    /// Expected exactly five `,`-separated values.
    FieldCount { section: Section, found: usize },
    /// A value token is not a decimal number.
    NotNumeric {
        section: Section,
        field: Field,
        token: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLine => write!(f, "empty line"),
            Self::SegmentCount(n) => write!(f, "expected 2 segments, found {n}"),
            Self::MissingLabel { segment } => {
                write!(f, "segment {segment} has no '|' label separator")
            }
            Self::UnknownLabel(label) => write!(f, "unknown section label '{label}'"),
            Self::DuplicateSection(s) => write!(f, "section {s} appears twice"),
            Self::FieldCount { section, found } => {
                write!(f, "{section}: expected 5 fields, found {found}")
            }
            Self::NotNumeric {
                section,
                field,
                token,
            } => write!(f, "{section}/{field}: '{token}' is not a number"),
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Serial link errors
// ---------------------------------------------------------------------------

/// Transport-level failures.  Every variant sends the link manager into
/// backoff; a malformed line never produces one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// No port could be opened.
    Open(String),
    /// Zero-byte read: the peer closed or the device vanished.
    Closed,
    /// Any other I/O failure (broken pipe, device removed, ...).
    Io(std::io::ErrorKind),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "open failed: {msg}"),
            Self::Closed => write!(f, "end of stream"),
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

// ---------------------------------------------------------------------------
// Broker errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Could not set up a session.
    Connect(String),
    /// The broker refused the connection (CONNACK code).
    Refused(String),
    /// The session dropped.
    ConnectionLost(String),
    /// The outgoing request queue rejected a publish.
    PublishFailed(String),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "connect failed: {msg}"),
            Self::Refused(code) => write!(f, "connection refused: {code}"),
            Self::ConnectionLost(msg) => write!(f, "connection lost: {msg}"),
            Self::PublishFailed(msg) => write!(f, "publish failed: {msg}"),
        }
    }
}

impl std::error::Error for BrokerError {}

// ---------------------------------------------------------------------------
// Fuzzy rule-table errors
// ---------------------------------------------------------------------------

/// Load-time validation failures of a controller definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyError {
    /// Controller has no inputs or more than the engine supports.
    InputCount { controller: &'static str },
    /// Variable universe is empty or inverted.
    Universe { variable: &'static str },
    /// Variable has no terms or more than the engine supports.
    TermCount { variable: &'static str },
    /// Membership shape parameters are not ordered.
    Shape { variable: &'static str },
    /// Rule table is empty.
    NoRules { controller: &'static str },
    /// Rule has no clauses or too many.
    ClauseCount { controller: &'static str, rule: usize },
    /// Clause references an input index that does not exist.
    UnknownInput { controller: &'static str, rule: usize },
    /// Clause or consequent references a term the variable lacks.
    UnknownTerm { controller: &'static str, rule: usize },
}

impl fmt::Display for FuzzyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputCount { controller } => write!(f, "{controller}: bad input count"),
            Self::Universe { variable } => write!(f, "{variable}: empty universe"),
            Self::TermCount { variable } => write!(f, "{variable}: bad term count"),
            Self::Shape { variable } => write!(f, "{variable}: unordered membership shape"),
            Self::NoRules { controller } => write!(f, "{controller}: no rules"),
            Self::ClauseCount { controller, rule } => {
                write!(f, "{controller} rule {rule}: bad clause count")
            }
            Self::UnknownInput { controller, rule } => {
                write!(f, "{controller} rule {rule}: unknown input")
            }
            Self::UnknownTerm { controller, rule } => {
                write!(f, "{controller} rule {rule}: unknown term")
            }
        }
    }
}

impl std::error::Error for FuzzyError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Io(String),
    /// The file is not valid JSON for [`GreenhouseConfig`](crate::config::GreenhouseConfig).
    Malformed(String),
    /// A field failed range validation.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Io(std::io::ErrorKind),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
