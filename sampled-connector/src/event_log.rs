//! Read access to the contract's append-only event log.
//!
//! The log lives in two well-known places under the marketplace contract:
//! the `__events_length` named key (the count) and the `__events`
//! dictionary (one byte record per ordinal index, starting at 0).
//!
//! Both lookups need a current state root. The root is cached with a short
//! freshness window so a burst of view queries costs roughly one state-root
//! RPC, and the cache takes its notion of time from an injectable [`Clock`]
//! so tests control expiry deterministically.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::ConnectorError;
use crate::rpc::NodeRpc;

pub const EVENTS_DICTIONARY: &str = "__events";
pub const EVENTS_LENGTH_KEY: &str = "__events_length";

/// Source of time for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock backed [`Clock`] used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Cached chain state-root reference with time-based invalidation.
///
/// Concurrent refreshes past the TTL are not deduplicated; refreshing is
/// idempotent and side-effect-free, so the race is harmless.
pub struct StateRootCache<C = SystemClock> {
    ttl: Duration,
    clock: C,
    slot: Mutex<Option<(String, Instant)>>,
}

impl<C: Clock> StateRootCache<C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached root if fresh, otherwise fetches a new one.
    pub async fn get_or_refresh<R: NodeRpc + ?Sized>(
        &self,
        rpc: &R,
    ) -> Result<String, ConnectorError> {
        let now = self.clock.now();
        if let Some((root, fetched_at)) = self.slot.lock().expect("state root lock").as_ref() {
            if now.duration_since(*fetched_at) < self.ttl {
                return Ok(root.clone());
            }
        }

        let root = rpc.state_root_hash().await?;
        *self.slot.lock().expect("state root lock") = Some((root.clone(), self.clock.now()));
        Ok(root)
    }
}

/// Fetches event count and individual event buffers from the node.
pub struct EventLog<R: ?Sized, C = SystemClock> {
    rpc: Arc<R>,
    /// Formatted contract key, e.g. `hash-…`, that owns the event storage.
    contract_hash: String,
    cache: StateRootCache<C>,
}

impl<R: NodeRpc + ?Sized> EventLog<R, SystemClock> {
    pub fn new(rpc: Arc<R>, contract_hash: String, state_root_ttl: Duration) -> Self {
        Self::with_clock(rpc, contract_hash, state_root_ttl, SystemClock)
    }
}

impl<R: NodeRpc + ?Sized, C: Clock> EventLog<R, C> {
    pub fn with_clock(
        rpc: Arc<R>,
        contract_hash: String,
        state_root_ttl: Duration,
        clock: C,
    ) -> Self {
        Self {
            rpc,
            contract_hash,
            cache: StateRootCache::new(state_root_ttl, clock),
        }
    }

    /// Current number of events in the log.
    ///
    /// Transport and format problems degrade to 0: the node may be lagging,
    /// so callers must treat the answer as "at least this many right now",
    /// never as confirmed emptiness.
    pub async fn event_count(&self) -> u64 {
        match self.try_event_count().await {
            Ok(count) => count,
            Err(err) => {
                tracing::debug!(error = %err, "event count unavailable, reporting empty log");
                0
            }
        }
    }

    /// Raw bytes of the event at `index`, or `None` if it cannot be fetched.
    pub async fn event(&self, index: u64) -> Option<Vec<u8>> {
        match self.try_event(index).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::debug!(index, error = %err, "event unavailable");
                None
            }
        }
    }

    async fn try_event_count(&self) -> Result<u64, ConnectorError> {
        let root = self.cache.get_or_refresh(&*self.rpc).await?;
        let value = self
            .rpc
            .query_global_state(&root, &self.contract_hash, &[EVENTS_LENGTH_KEY])
            .await?;
        let bytes = clvalue_bytes(&value)?;
        if bytes.len() < 4 {
            return Err(ConnectorError::Format("events length is not a u32".into()));
        }
        Ok(u64::from(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))
    }

    async fn try_event(&self, index: u64) -> Result<Vec<u8>, ConnectorError> {
        let root = self.cache.get_or_refresh(&*self.rpc).await?;
        let value = self
            .rpc
            .dictionary_item(
                &root,
                &self.contract_hash,
                EVENTS_DICTIONARY,
                &index.to_string(),
            )
            .await?;
        let bytes = clvalue_bytes(&value)?;
        unwrap_nested_bytes(&bytes)
    }
}

/// Extracts the hex `bytes` field of a stored CLValue response.
fn clvalue_bytes(value: &Value) -> Result<Vec<u8>, ConnectorError> {
    let hex_bytes = value
        .pointer("/stored_value/CLValue/bytes")
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectorError::Format("stored value is not a CLValue".into()))?;
    hex::decode(hex_bytes).map_err(|_| ConnectorError::Format("CLValue bytes are not hex".into()))
}

/// Dictionary entries wrap the event record in one more length-prefixed
/// byte-array layer; peel it off.
fn unwrap_nested_bytes(bytes: &[u8]) -> Result<Vec<u8>, ConnectorError> {
    if bytes.len() < 4 {
        return Err(ConnectorError::Format("event entry too short".into()));
    }
    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let body = &bytes[4..];
    if body.len() < len {
        return Err(ConnectorError::Format("event entry truncated".into()));
    }
    Ok(body[..len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_bytes_unwrap() {
        let mut entry = 3u32.to_le_bytes().to_vec();
        entry.extend_from_slice(&[9, 8, 7]);
        assert_eq!(unwrap_nested_bytes(&entry).unwrap(), vec![9, 8, 7]);

        assert!(unwrap_nested_bytes(&[1, 0]).is_err());
        assert!(unwrap_nested_bytes(&10u32.to_le_bytes()).is_err());
    }

    #[test]
    fn clvalue_bytes_requires_the_expected_shape() {
        let ok = serde_json::json!({
            "stored_value": { "CLValue": { "bytes": "0a000000", "cl_type": "U32" } }
        });
        assert_eq!(clvalue_bytes(&ok).unwrap(), vec![0x0a, 0, 0, 0]);

        let missing = serde_json::json!({ "stored_value": { "Contract": {} } });
        assert!(clvalue_bytes(&missing).is_err());

        let bad_hex = serde_json::json!({
            "stored_value": { "CLValue": { "bytes": "zz" } }
        });
        assert!(clvalue_bytes(&bad_hex).is_err());
    }
}
