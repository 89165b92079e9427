//! Error types and result handling for kafka-log-writer.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use kafka_log_writer::{Error, Result};
//!
//! fn apply_setting() -> Result<()> {
//!     // Simulating a rejected broker setting
//!     Err(Error::Config {
//!         key: "batch.size".to_string(),
//!         value: "lots".to_string(),
//!         message: "expected integer".to_string(),
//!     })
//! }
//!
//! match apply_setting() {
//!     Ok(()) => println!("Applied"),
//!     Err(Error::Config { key, .. }) => eprintln!("Bad setting: {}", key),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for kafka-log-writer operations.
///
/// This enum represents all possible errors that can occur in the
/// writer backend, from rejected broker settings to shutdown failures.
#[derive(Error, Debug)]
pub enum Error {
    /// A broker-client setting was rejected during setup.
    ///
    /// Fatal: the backend never reaches the ready state.
    #[error("failed to set '{key}'='{value}': {message}")]
    Config {
        /// The rejected setting name
        key: String,
        /// The rejected setting value
        value: String,
        /// The underlying library error text
        message: String,
    },

    /// Kafka client or producer error.
    ///
    /// Fatal when raised during client construction; non-fatal when a
    /// single publish is rejected (the record stream continues).
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON serialization error when encoding a record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Messages were still undelivered when the shutdown drain gave up.
    ///
    /// Reported as a shutdown failure; resource teardown still runs.
    #[error("unable to deliver {undelivered} message(s)")]
    DrainTimeout {
        /// Number of messages abandoned in the outbound queue
        undelivered: usize,
    },

    /// An operation was invoked in a lifecycle state that does not
    /// permit it (e.g. a write before setup or after shutdown).
    #[error("invalid writer state: {0}")]
    InvalidState(&'static str),
}

/// A convenient Result type alias for kafka-log-writer operations.
///
/// This is equivalent to `std::result::Result<T, kafka_log_writer::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
