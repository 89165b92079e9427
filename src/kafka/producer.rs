use crate::{client::DeliveryClient, config::WriterConfig, Error, Result};
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use rdkafka::util::get_rdkafka_version;
use std::time::Duration;
use tracing::{debug, info};

/// rdkafka-backed [`DeliveryClient`] bound to one destination topic.
///
/// Publishes keyless payloads to the unassigned partition, so the
/// broker spreads records across partitions. The producer's event loop
/// is only driven by [`pump`](DeliveryClient::pump) calls from the
/// owning worker context.
pub struct KafkaProducer {
    topic: String,
    producer: BaseProducer,
}

impl std::fmt::Debug for KafkaProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaProducer")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl DeliveryClient for KafkaProducer {
    fn setup(config: &WriterConfig, topic: &str) -> Result<Self> {
        let mut client_config = ClientConfig::new();
        for (key, value) in &config.librdkafka {
            client_config.set(key, value);
        }

        // the debug selector goes in after all user settings
        if config.is_debug() {
            let (_, version) = get_rdkafka_version();
            info!(
                debug = %config.debug,
                librdkafka = %version,
                "Debug is turned on"
            );
            client_config.set("debug", &config.debug);
        } else {
            info!("Debug is turned off");
        }

        // every setting is validated here; a rejected one carries its
        // key and value back out in the error
        let producer: BaseProducer = client_config.create().map_err(into_setup_error)?;

        debug!(topic, "Successfully created producer");

        Ok(Self {
            topic: topic.to_string(),
            producer,
        })
    }

    fn publish(&mut self, payload: &[u8]) -> Result<()> {
        let record = BaseRecord::<(), [u8]>::to(&self.topic).payload(payload);
        self.producer
            .send(record)
            .map_err(|(err, _)| Error::Kafka(err))
    }

    fn pump(&mut self, timeout: Duration) {
        self.producer.poll(timeout);
    }

    fn outstanding(&self) -> usize {
        self.producer.in_flight_count() as usize
    }
}

fn into_setup_error(err: KafkaError) -> Error {
    match err {
        KafkaError::ClientConfig(_, message, key, value) => Error::Config { key, value, message },
        other => Error::Kafka(other),
    }
}
