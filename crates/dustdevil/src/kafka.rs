//! Kafka consumer adapter
//!
//! Bridges the external message log into the engine: polls messages into
//! Transport envelopes, dispatches them with backpressure, and translates
//! the Commits coming back from the workers into stored offsets for the
//! broker's periodic auto-commit.
//!
//! Offset discipline: `enable.auto.offset.store` is off, so only offsets
//! explicitly stored here - after a worker confirmed the downstream POST -
//! are ever committed. That is what keeps delivery at-least-once end to
//! end.

use std::sync::Arc;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as _, StreamConsumer};
use rdkafka::Message;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dustdevil_config::Config;
use dustdevil_engine::{Commit, Consumer, Dispatcher, EngineError, Transport};

/// Commits buffered between the workers and the offset store
const COMMIT_QUEUE: usize = 1024;

/// The upstream log consumer
pub struct KafkaConsumer {
    config: Arc<Config>,
}

impl KafkaConsumer {
    /// Create a consumer over the `[consumer]` config section
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn client(&self) -> Result<StreamConsumer, EngineError> {
        let consumer_config = &self.config.consumer;

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", consumer_config.brokers.join(","))
            .set("group.id", &consumer_config.group_id)
            .set(
                "session.timeout.ms",
                consumer_config.session_timeout.to_string(),
            )
            // offsets are stored manually once the downstream write is
            // confirmed; the broker's auto-commit persists them
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false");

        client_config
            .create()
            .map_err(|e| EngineError::consumer(e.to_string()))
    }

    fn store(&self, consumer: &StreamConsumer, commit: &Commit) {
        if let Err(e) = consumer.store_offset(&commit.topic, commit.partition, commit.offset) {
            warn!(
                topic = %commit.topic,
                partition = commit.partition,
                offset = commit.offset,
                error = %e,
                "failed to store offset"
            );
        }
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    async fn run(
        self,
        dispatcher: Dispatcher,
        shutdown: CancellationToken,
        death: mpsc::Sender<EngineError>,
    ) {
        let consumer = match self.client() {
            Ok(consumer) => consumer,
            Err(e) => {
                let _ = death.send(e).await;
                shutdown.cancelled().await;
                return;
            }
        };

        let topics: Vec<&str> = self
            .config
            .consumer
            .topics
            .iter()
            .map(String::as_str)
            .collect();
        if let Err(e) = consumer.subscribe(&topics) {
            let _ = death.send(EngineError::consumer(e.to_string())).await;
            shutdown.cancelled().await;
            return;
        }

        info!(
            topics = ?topics,
            group = %self.config.consumer.group_id,
            "kafka consumer subscribed"
        );

        let (commit_tx, mut commit_rx) = mpsc::channel::<Commit>(COMMIT_QUEUE);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(commit) = commit_rx.recv() => {
                    self.store(&consumer, &commit);
                }
                polled = consumer.recv() => match polled {
                    Ok(message) => {
                        let transport = Transport::new(
                            message.topic(),
                            message.partition(),
                            message.offset(),
                            host_id_from_key(message.key()),
                            message.payload().map(|p| p.to_vec()),
                            commit_tx.clone(),
                        );
                        if dispatcher.dispatch(transport).await.is_err() {
                            // workers gone; teardown is underway
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = death.send(EngineError::consumer(e.to_string())).await;
                        shutdown.cancelled().await;
                        break;
                    }
                }
            }
        }

        // store acknowledgements that are already queued
        while let Ok(commit) = commit_rx.try_recv() {
            self.store(&consumer, &commit);
        }

        info!("kafka consumer stopped");
    }
}

/// The message key carries the originating host id
fn host_id_from_key(key: Option<&[u8]>) -> i64 {
    let Some(key) = key else {
        return 0;
    };

    match std::str::from_utf8(key).ok().and_then(|s| s.trim().parse().ok()) {
        Some(host_id) => host_id,
        None => {
            debug!("unparseable message key, defaulting host id to 0");
            0
        }
    }
}
