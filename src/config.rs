use crate::serializer::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration snapshot for one writer instance.
///
/// Captured once at construction and owned by the writer. The writer
/// never reads shared configuration state after construction; each
/// instance runs on its own worker context and must not touch storage
/// that other instances may be mutating.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriterConfig {
    /// Broker-client settings applied verbatim to the producer
    /// configuration, in key order.
    #[serde(default)]
    pub librdkafka: BTreeMap<String, String>,
    /// Destination topic. Empty means fall back to the log stream's
    /// path at initialization time.
    #[serde(default)]
    pub topic_name: String,
    /// Wrap each document with the origin stream name so multiple
    /// streams multiplexed onto one topic stay distinguishable.
    #[serde(default)]
    pub tag_json: bool,
    /// librdkafka debug-context selector (e.g. "broker,topic,msg").
    /// Empty disables debug output.
    #[serde(default)]
    pub debug: String,
    /// How long to keep pumping for undelivered messages at shutdown
    /// before abandoning them.
    #[serde(default = "default_max_wait_on_shutdown_ms")]
    pub max_wait_on_shutdown_ms: u64,
    /// Timestamp rendering convention for serialized records.
    #[serde(default)]
    pub timestamps: TimestampFormat,
}

impl WriterConfig {
    /// Whether the debug selector is enabled.
    pub fn is_debug(&self) -> bool {
        !self.debug.is_empty()
    }

    /// The shutdown drain bound as a [`Duration`].
    pub fn max_wait_on_shutdown(&self) -> Duration {
        Duration::from_millis(self.max_wait_on_shutdown_ms)
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            librdkafka: BTreeMap::new(),
            topic_name: String::new(),
            tag_json: false,
            debug: String::new(),
            max_wait_on_shutdown_ms: default_max_wait_on_shutdown_ms(),
            timestamps: TimestampFormat::default(),
        }
    }
}

fn default_max_wait_on_shutdown_ms() -> u64 {
    3000
}
