pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod record;
pub mod serializer;
pub mod writer;

pub mod kafka;

pub use backend::LogWriter;
pub use client::DeliveryClient;
pub use config::WriterConfig;
pub use error::{Error, Result};
pub use kafka::KafkaProducer;
pub use record::{Field, Value};
pub use serializer::{JsonFormatter, TimestampFormat, STREAM_TAG_KEY};
pub use writer::KafkaWriter;
