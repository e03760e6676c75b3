//! Storage drivers.
//!
//! A [`Driver`] executes decoded [`Operation`]s against some backend and
//! produces [`OperationResult`]s. Drivers are shared across tasks, so the
//! trait returns boxed futures rather than using `async fn`.
//!
//! Three execution shapes are offered: one operation, an ordered batch, and
//! an open-ended sequence fed through a channel.
//!
//! [`execute_encoded`] runs the full wire loop for one request: decode the
//! operation, execute it, encode the result. Failures at any step before
//! encoding are reported to the peer as an error result.
//!
//! Currently implemented:
//! - [`memory`] - In-process reference backend

pub mod memory;

pub use memory::MemoryStore;

use crate::core::config::CodecConfig;
use crate::core::error::DattyResult;
use crate::io::{Operation, OperationResult};
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Boxed future returned by [`Driver`] methods.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Common interface for storage backends.
pub trait Driver: Send + Sync {
    /// Driver name (e.g., "memory").
    fn name(&self) -> &'static str;

    /// Execute one operation.
    fn execute(&self, operation: Operation) -> DriverFuture<'_, DattyResult<OperationResult>>;

    /// Execute operations in order. Each failure becomes an error result in
    /// its slot; later operations still run.
    fn execute_batch(&self, operations: Vec<Operation>) -> DriverFuture<'_, Vec<OperationResult>> {
        Box::pin(async move {
            let mut results = Vec::with_capacity(operations.len());
            for operation in operations {
                let result = match self.execute(operation).await {
                    Ok(result) => result,
                    Err(err) => OperationResult::from_error(&err),
                };
                results.push(result);
            }
            results
        })
    }

    /// Execute operations as they arrive, sending one result per operation
    /// in arrival order. Failures become error results. Stops when the
    /// input closes or the result receiver is dropped, and resolves to the
    /// number of results delivered.
    fn execute_sequence(
        &self,
        mut operations: mpsc::Receiver<Operation>,
        results: mpsc::Sender<OperationResult>,
    ) -> DriverFuture<'_, usize> {
        Box::pin(async move {
            let mut delivered = 0;
            while let Some(operation) = operations.recv().await {
                let result = self
                    .execute(operation)
                    .await
                    .unwrap_or_else(|err| OperationResult::from_error(&err));
                if results.send(result).await.is_err() {
                    tracing::debug!(driver = self.name(), delivered, "result receiver dropped");
                    break;
                }
                delivered += 1;
            }
            delivered
        })
    }
}

/// Decode `request`, execute it on `driver`, and encode the result.
///
/// Only a failure to encode the result is returned as an error.
pub async fn execute_encoded<D>(driver: &D, request: Bytes, config: &CodecConfig) -> DattyResult<Bytes>
where
    D: Driver + ?Sized,
{
    let result = match Operation::decode(request, config.limits(), config.read_mode()) {
        Ok(operation) => {
            let opcode = operation.opcode();
            tracing::debug!(driver = driver.name(), opcode = %opcode, "executing operation");
            match driver.execute(operation).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::debug!(driver = driver.name(), opcode = %opcode, error = %err, "operation failed");
                    OperationResult::from_error(&err)
                }
            }
        }
        Err(err) => {
            tracing::debug!(driver = driver.name(), error = %err, "rejecting malformed operation");
            OperationResult::from_error(&err)
        }
    };
    result.to_bytes(config.numeric_keys)
}
