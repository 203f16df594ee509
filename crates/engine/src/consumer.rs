//! Consumer boundary
//!
//! The upstream message log is an external collaborator; the engine only
//! defines the seam. A consumer delivers [`Transport`] envelopes through the
//! [`Dispatcher`], wires its own commit channel into them, and translates
//! the [`Commit`]s it receives back into offset acknowledgement against the
//! log. The binary supplies a Kafka-backed implementation; tests feed the
//! pool from channel-backed stubs.
//!
//! [`Transport`]: crate::Transport
//! [`Commit`]: crate::Commit

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::error::EngineError;

/// Upstream message log consumer
#[async_trait]
pub trait Consumer: Send + 'static {
    /// Deliver messages until shutdown
    ///
    /// Contract:
    /// - every delivered Transport carries this consumer's commit channel;
    /// - delivery stops when `shutdown` is cancelled, and `run` returns
    ///   once the consumer has fully stopped - the supervisor will not
    ///   close worker inputs before then;
    /// - fatal consumer conditions are reported on `death`.
    async fn run(
        self,
        dispatcher: Dispatcher,
        shutdown: CancellationToken,
        death: mpsc::Sender<EngineError>,
    );
}
