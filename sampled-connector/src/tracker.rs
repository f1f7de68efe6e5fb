//! Deploy submission and asynchronous completion tracking.
//!
//! After submission the node only answers "what happened to hash X" on
//! request, and it has answered in two different shapes over time. The
//! watcher polls at a fixed interval, funnels both response schemas through
//! one translation function and reports a single terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;

use crate::config::TrackingConfig;
use crate::deploy::Deploy;
use crate::error::ConnectorError;
use crate::rpc::NodeRpc;

/// Terminal result of a tracked deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    /// The ledger rejected the business logic; the node's message verbatim.
    Failed(String),
    /// No terminal result inside the window. Ambiguous: execution may still
    /// land on-chain later.
    TimedOut,
    /// The caller abandoned the watch.
    Cancelled,
}

/// Submits signed deploys and polls for their execution result.
pub struct DeployWatcher<R: ?Sized> {
    rpc: Arc<R>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl<R: NodeRpc + ?Sized> DeployWatcher<R> {
    pub fn new(rpc: Arc<R>, tracking: &TrackingConfig) -> Self {
        Self {
            rpc,
            poll_interval: Duration::from_secs(tracking.poll_interval_secs),
            poll_timeout: Duration::from_secs(tracking.poll_timeout_secs),
        }
    }

    /// Hands the signed deploy to the node and returns its hash.
    pub async fn submit(&self, deploy: &Deploy) -> Result<String, ConnectorError> {
        let hash = self.rpc.put_deploy(&deploy.to_json()?).await?;
        tracing::info!(deploy_hash = %hash, "deploy submitted");
        Ok(hash)
    }

    /// Polls until a terminal outcome or the timeout.
    pub async fn wait(&self, deploy_hash: &str) -> Result<ExecutionOutcome, ConnectorError> {
        // never-signalled channel; the sender lives as long as the watch
        let (_tx, rx) = watch::channel(());
        self.wait_with_cancel(deploy_hash, rx).await
    }

    /// Like [`wait`](Self::wait), but abandons the watch as soon as the
    /// `cancel` channel is signalled or its sender is dropped.
    pub async fn wait_with_cancel(
        &self,
        deploy_hash: &str,
        mut cancel: watch::Receiver<()>,
    ) -> Result<ExecutionOutcome, ConnectorError> {
        let deadline = tokio::time::Instant::now() + self.poll_timeout;

        loop {
            match self.rpc.deploy_info(deploy_hash).await {
                Ok(info) => match parse_execution_result(&info) {
                    Some(Ok(())) => {
                        tracing::info!(deploy_hash, "execution succeeded");
                        return Ok(ExecutionOutcome::Succeeded);
                    }
                    Some(Err(message)) => {
                        tracing::warn!(deploy_hash, %message, "execution failed");
                        return Ok(ExecutionOutcome::Failed(message));
                    }
                    None => {}
                },
                // The node may simply not know the deploy yet; "not found"
                // means still pending, not failed.
                Err(err) => {
                    tracing::debug!(deploy_hash, error = %err, "poll attempt inconclusive")
                }
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                tracing::warn!(deploy_hash, "no terminal result within the polling window");
                return Ok(ExecutionOutcome::TimedOut);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.changed() => {
                    tracing::info!(deploy_hash, "watch abandoned by caller");
                    return Ok(ExecutionOutcome::Cancelled);
                }
            }
        }
    }
}

/// Normalizes both known execution-result schemas.
///
/// Returns `None` while no terminal result is visible, `Some(Ok(()))` on
/// success and `Some(Err(message))` on a ledger-reported failure. All
/// schema sniffing is confined to this function.
pub fn parse_execution_result(info: &Value) -> Option<Result<(), String>> {
    // Newer schema: an execution_info envelope with a versioned result.
    if let Some(result) = info.pointer("/execution_info/execution_result") {
        if let Some(v2) = result.get("Version2") {
            return Some(match v2.get("error_message") {
                Some(Value::String(message)) => Err(message.clone()),
                _ => Ok(()),
            });
        }
        if let Some(v1) = result.get("Version1") {
            return parse_result_variant(v1);
        }
        return parse_result_variant(result);
    }

    // Older schema: an array of per-block execution results.
    if let Some(results) = info.get("execution_results").and_then(Value::as_array) {
        let entry = results.first()?;
        return parse_result_variant(entry.get("result")?);
    }

    None
}

fn parse_result_variant(variant: &Value) -> Option<Result<(), String>> {
    if variant.get("Success").is_some() {
        return Some(Ok(()));
    }
    if let Some(failure) = variant.get("Failure") {
        let message = failure
            .get("error_message")
            .and_then(Value::as_str)
            .unwrap_or("execution failed")
            .to_string();
        return Some(Err(message));
    }
    None
}
