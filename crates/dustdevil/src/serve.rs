//! Serve loop - wire the pool to the Kafka consumer and run until a
//! shutdown signal or the first fault.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use dustdevil_config::Config;
use dustdevil_engine::{Pool, Result};

use crate::kafka::KafkaConsumer;

/// Run the forwarder until shutdown
pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);

    let pool = Pool::new(Arc::clone(&config));
    let consumer = KafkaConsumer::new(Arc::clone(&config));

    // the pool itself listens for SIGINT/SIGTERM; the token is the seam
    // for embedding and tests
    pool.run(consumer, CancellationToken::new()).await
}
