//! The Kafka writer backend: orchestrates serialization and delivery
//! across the record lifecycle.
//!
//! One instance serves one log stream on one dedicated worker context;
//! the host serializes all calls against it. The lifecycle is a strict
//! one-way state machine: `Unconfigured → Ready → ShuttingDown →
//! Closed`, with no re-entry and no publish once shutdown begins.

use crate::backend::LogWriter;
use crate::client::DeliveryClient;
use crate::config::WriterConfig;
use crate::kafka::KafkaProducer;
use crate::record::{Field, Value};
use crate::serializer::JsonFormatter;
use crate::{Error, Result};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Unconfigured,
    Ready,
    ShuttingDown,
    Closed,
}

/// A logging writer that sends records to a Kafka topic.
///
/// Generic over the [`DeliveryClient`] so the delivery pipeline can be
/// exercised against a mock client; hosts use the default
/// [`KafkaProducer`].
///
/// # Example
///
/// ```rust,no_run
/// use kafka_log_writer::{Field, KafkaWriter, LogWriter, Value, WriterConfig};
///
/// let mut config = WriterConfig::default();
/// config
///     .librdkafka
///     .insert("metadata.broker.list".to_string(), "localhost:9092".to_string());
/// config.topic_name = "events".to_string();
///
/// let schema = vec![Field::new("a"), Field::new("b")];
/// let mut writer: KafkaWriter = KafkaWriter::new(config);
///
/// assert!(writer.initialize("conn", &schema));
/// assert!(writer.write(&schema, &[Value::Int(1), Value::from("x")]));
/// assert!(writer.finish(0.0));
/// ```
pub struct KafkaWriter<C: DeliveryClient = KafkaProducer> {
    config: WriterConfig,
    state: WriterState,
    formatter: Option<JsonFormatter>,
    client: Option<C>,
}

impl<C: DeliveryClient> KafkaWriter<C> {
    /// Create a writer owning its configuration snapshot. No broker
    /// resources are allocated until [`LogWriter::initialize`].
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            state: WriterState::Unconfigured,
            formatter: None,
            client: None,
        }
    }

    /// Whether setup succeeded and the writer accepts records.
    pub fn is_ready(&self) -> bool {
        self.state == WriterState::Ready
    }

    fn do_initialize(&mut self, stream_path: &str) -> Result<()> {
        if self.state != WriterState::Unconfigured {
            return Err(Error::InvalidState("initialize is only valid once"));
        }

        // if no topic is configured, use the log stream's path
        let topic = if self.config.topic_name.is_empty() {
            stream_path.to_string()
        } else {
            self.config.topic_name.clone()
        };

        let formatter = if self.config.tag_json {
            JsonFormatter::tagged(stream_path, self.config.timestamps)
        } else {
            JsonFormatter::plain(self.config.timestamps)
        };

        let client = C::setup(&self.config, &topic)?;

        self.formatter = Some(formatter);
        self.client = Some(client);
        self.state = WriterState::Ready;

        info!(stream = stream_path, topic = %topic, "Kafka writer ready");
        Ok(())
    }

    fn do_write(&mut self, schema: &[Field], values: &[Value]) -> Result<()> {
        if self.state != WriterState::Ready {
            return Err(Error::InvalidState("write requires a ready writer"));
        }
        let (Some(formatter), Some(client)) = (self.formatter.as_ref(), self.client.as_mut())
        else {
            return Err(Error::InvalidState("write requires a ready writer"));
        };

        let payload = formatter.encode(schema, values)?;

        // fire and forget: a rejected enqueue loses this record but
        // must not stall the host's record-production path
        if let Err(err) = client.publish(payload.as_bytes()) {
            error!(error = %err, "Kafka send failed");
        }

        // keep the client's event loop live whatever the outcome
        client.pump(Duration::ZERO);
        Ok(())
    }

    fn do_finish(&mut self) -> Result<()> {
        if self.state != WriterState::Ready {
            debug!("finish on a writer that was never ready; nothing to drain");
            self.state = WriterState::Closed;
            return Ok(());
        }
        self.state = WriterState::ShuttingDown;

        let max_wait = self.config.max_wait_on_shutdown();
        let mut drained = true;
        let mut undelivered = 0;
        if let Some(client) = self.client.as_mut() {
            drained = client.drain(max_wait);
            undelivered = client.outstanding();
        }

        // teardown is unconditional: client (topic handle and producer)
        // first, then the formatter
        self.client = None;
        self.formatter = None;
        self.state = WriterState::Closed;

        if drained {
            info!("All queued messages delivered");
            Ok(())
        } else {
            Err(Error::DrainTimeout { undelivered })
        }
    }

    fn pump_once(&mut self) {
        if let Some(client) = self.client.as_mut() {
            client.pump(Duration::ZERO);
        }
    }

    #[cfg(test)]
    fn client_ref(&self) -> Option<&C> {
        self.client.as_ref()
    }
}

impl<C: DeliveryClient> LogWriter for KafkaWriter<C> {
    fn initialize(&mut self, stream_path: &str, _schema: &[Field]) -> bool {
        match self.do_initialize(stream_path) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, stream = stream_path, "Failed to initialize Kafka writer");
                self.client = None;
                self.formatter = None;
                self.state = WriterState::Closed;
                false
            }
        }
    }

    fn write(&mut self, schema: &[Field], values: &[Value]) -> bool {
        match self.do_write(schema, values) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "Failed to write record");
                false
            }
        }
    }

    fn set_buffering(&mut self, _enabled: bool) -> bool {
        // always attempts immediate delivery; the toggle is accepted
        // without effect
        true
    }

    fn flush(&mut self, _network_time: f64) -> bool {
        self.pump_once();
        true
    }

    fn rotate(
        &mut self,
        _rotated_path: &str,
        _open_time: f64,
        _close_time: f64,
        _terminating: bool,
    ) -> bool {
        // message sink, nothing to rotate; acknowledge immediately
        true
    }

    fn heartbeat(&mut self, _network_time: f64, _wall_clock: f64) -> bool {
        self.pump_once();
        true
    }

    fn finish(&mut self, _network_time: f64) -> bool {
        match self.do_finish() {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "Kafka writer shutdown incomplete");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::error::KafkaError;
    use rdkafka::types::RDKafkaErrorCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema(names: &[&str]) -> Vec<Field> {
        names.iter().copied().map(Field::new).collect()
    }

    fn config_with_topic(topic: &str) -> WriterConfig {
        WriterConfig {
            topic_name: topic.to_string(),
            ..Default::default()
        }
    }

    /// Records publishes and delivers one queued message per pump.
    struct MockClient {
        topic: String,
        published: Vec<String>,
        queued: usize,
        pumps: usize,
    }

    impl DeliveryClient for MockClient {
        fn setup(config: &WriterConfig, topic: &str) -> Result<Self> {
            for (key, value) in &config.librdkafka {
                if key.starts_with("bad.") {
                    return Err(Error::Config {
                        key: key.clone(),
                        value: value.clone(),
                        message: "No such configuration property".to_string(),
                    });
                }
            }
            Ok(Self {
                topic: topic.to_string(),
                published: Vec::new(),
                queued: 0,
                pumps: 0,
            })
        }

        fn publish(&mut self, payload: &[u8]) -> Result<()> {
            self.published
                .push(String::from_utf8(payload.to_vec()).unwrap());
            self.queued += 1;
            Ok(())
        }

        fn pump(&mut self, _timeout: Duration) {
            self.pumps += 1;
            self.queued = self.queued.saturating_sub(1);
        }

        fn outstanding(&self) -> usize {
            self.queued
        }
    }

    /// Rejects every publish, as a client with a full queue would.
    struct RejectingClient {
        pumps: usize,
    }

    impl DeliveryClient for RejectingClient {
        fn setup(_config: &WriterConfig, _topic: &str) -> Result<Self> {
            Ok(Self { pumps: 0 })
        }

        fn publish(&mut self, _payload: &[u8]) -> Result<()> {
            Err(Error::Kafka(KafkaError::MessageProduction(
                RDKafkaErrorCode::QueueFull,
            )))
        }

        fn pump(&mut self, _timeout: Duration) {
            self.pumps += 1;
        }

        fn outstanding(&self) -> usize {
            0
        }
    }

    /// Accepts everything, never delivers anything.
    struct StuckClient {
        queued: usize,
    }

    impl DeliveryClient for StuckClient {
        fn setup(_config: &WriterConfig, _topic: &str) -> Result<Self> {
            Ok(Self { queued: 0 })
        }

        fn publish(&mut self, _payload: &[u8]) -> Result<()> {
            self.queued += 1;
            Ok(())
        }

        fn pump(&mut self, _timeout: Duration) {}

        fn outstanding(&self) -> usize {
            self.queued.max(1)
        }
    }

    static TRACKED_DROPS: AtomicUsize = AtomicUsize::new(0);

    /// Counts drops so teardown can be observed from the outside.
    struct TrackedClient;

    impl Drop for TrackedClient {
        fn drop(&mut self) {
            TRACKED_DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl DeliveryClient for TrackedClient {
        fn setup(_config: &WriterConfig, _topic: &str) -> Result<Self> {
            Ok(Self)
        }

        fn publish(&mut self, _payload: &[u8]) -> Result<()> {
            Ok(())
        }

        fn pump(&mut self, _timeout: Duration) {}

        fn outstanding(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_initialize_reaches_ready() {
        let mut writer = KafkaWriter::<MockClient>::new(config_with_topic("events"));
        assert!(writer.initialize("conn", &schema(&["a"])));
        assert!(writer.is_ready());
    }

    #[test]
    fn test_initialize_rejected_setting_never_reaches_ready() {
        let mut config = config_with_topic("events");
        config
            .librdkafka
            .insert("bad.setting".to_string(), "oops".to_string());

        let mut writer = KafkaWriter::<MockClient>::new(config);
        let fields = schema(&["a"]);
        assert!(!writer.initialize("conn", &fields));
        assert!(!writer.is_ready());
        assert!(writer.client_ref().is_none());

        // a failed writer accepts nothing
        assert!(!writer.write(&fields, &[Value::Int(1)]));
    }

    #[test]
    fn test_write_publishes_serialized_record() {
        let mut writer = KafkaWriter::<MockClient>::new(config_with_topic("events"));
        let fields = schema(&["a", "b"]);
        assert!(writer.initialize("conn", &fields));
        assert!(writer.write(&fields, &[Value::Int(1), Value::from("x")]));

        let client = writer.client_ref().unwrap();
        assert_eq!(client.published, vec![r#"{"a":1,"b":"x"}"#.to_string()]);
        assert_eq!(client.topic, "events");
        // every write pumps once
        assert_eq!(client.pumps, 1);
    }

    #[test]
    fn test_tagged_write_appends_stream_path() {
        let mut config = config_with_topic("events");
        config.tag_json = true;

        let mut writer = KafkaWriter::<MockClient>::new(config);
        let fields = schema(&["a", "b"]);
        assert!(writer.initialize("conn", &fields));
        assert!(writer.write(&fields, &[Value::Int(1), Value::from("x")]));

        let client = writer.client_ref().unwrap();
        assert_eq!(
            client.published,
            vec![r#"{"a":1,"b":"x","_path":"conn"}"#.to_string()]
        );
    }

    #[test]
    fn test_topic_falls_back_to_stream_path() {
        let mut writer = KafkaWriter::<MockClient>::new(WriterConfig::default());
        assert!(writer.initialize("conn", &schema(&["a"])));
        assert_eq!(writer.client_ref().unwrap().topic, "conn");
    }

    #[test]
    fn test_rejected_publish_keeps_stream_going() {
        let mut writer = KafkaWriter::<RejectingClient>::new(config_with_topic("events"));
        let fields = schema(&["a"]);
        assert!(writer.initialize("conn", &fields));

        // rejection is reported but the write call still succeeds,
        // and the event loop is pumped anyway
        assert!(writer.write(&fields, &[Value::Int(1)]));
        assert_eq!(writer.client_ref().unwrap().pumps, 1);
        assert!(writer.is_ready());
    }

    #[test]
    fn test_heartbeat_and_flush_are_idempotent() {
        let mut writer = KafkaWriter::<MockClient>::new(config_with_topic("events"));
        assert!(writer.initialize("conn", &schema(&["a"])));

        for tick in 0..10 {
            assert!(writer.heartbeat(tick as f64, tick as f64));
            assert!(writer.flush(tick as f64));
        }
        assert!(writer.is_ready());
        assert_eq!(writer.client_ref().unwrap().pumps, 20);
    }

    #[test]
    fn test_write_before_initialize_fails() {
        let mut writer = KafkaWriter::<MockClient>::new(config_with_topic("events"));
        let fields = schema(&["a"]);
        assert!(!writer.write(&fields, &[Value::Int(1)]));
    }

    #[test]
    fn test_finish_drains_and_tears_down() {
        let mut writer = KafkaWriter::<MockClient>::new(config_with_topic("events"));
        let fields = schema(&["a"]);
        assert!(writer.initialize("conn", &fields));
        assert!(writer.write(&fields, &[Value::Int(1)]));
        assert!(writer.write(&fields, &[Value::Int(2)]));

        assert!(writer.finish(0.0));
        assert!(!writer.is_ready());
        assert!(writer.client_ref().is_none());

        // no re-entry after shutdown
        assert!(!writer.write(&fields, &[Value::Int(3)]));
        // heartbeats after shutdown stay harmless
        assert!(writer.heartbeat(0.0, 0.0));
    }

    #[test]
    fn test_finish_reports_undelivered_but_still_tears_down() {
        let mut config = config_with_topic("events");
        config.max_wait_on_shutdown_ms = 10;

        let mut writer = KafkaWriter::<StuckClient>::new(config);
        let fields = schema(&["a"]);
        assert!(writer.initialize("conn", &fields));
        assert!(writer.write(&fields, &[Value::Int(1)]));

        assert!(!writer.finish(0.0));
        assert!(writer.client_ref().is_none());
        assert!(!writer.is_ready());
    }

    #[test]
    fn test_finish_without_initialize_is_noop() {
        let mut writer = KafkaWriter::<MockClient>::new(config_with_topic("events"));
        assert!(writer.finish(0.0));
        assert!(!writer.is_ready());
    }

    #[test]
    fn test_no_client_leak_across_setup_finish_cycles() {
        let mut config = config_with_topic("events");
        config.max_wait_on_shutdown_ms = 5;

        let before = TRACKED_DROPS.load(Ordering::SeqCst);
        for _ in 0..3 {
            let mut writer = KafkaWriter::<TrackedClient>::new(config.clone());
            assert!(writer.initialize("conn", &schema(&["a"])));
            // drain never succeeds, teardown must happen regardless
            assert!(!writer.finish(0.0));
            assert!(writer.client_ref().is_none());
        }
        assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst) - before, 3);
    }

    #[test]
    fn test_buffering_toggle_and_rotation_are_accepted() {
        let mut writer = KafkaWriter::<MockClient>::new(config_with_topic("events"));
        assert!(writer.initialize("conn", &schema(&["a"])));

        assert!(writer.set_buffering(false));
        assert!(writer.set_buffering(true));
        assert!(writer.rotate("conn-23-42.log", 0.0, 1.0, false));
        assert!(writer.is_ready());
    }
}
