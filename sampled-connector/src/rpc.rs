//! JSON-RPC access to the ledger node.
//!
//! The node speaks JSON-RPC 2.0 over a single HTTP POST endpoint. The
//! [`NodeRpc`] trait abstracts over the transport so the query and
//! submission layers can be exercised against an in-memory double in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ConnectorError;

/// A generic client for the node's JSON-RPC surface.
///
/// Only the methods the connector actually consumes are modeled: state-root
/// lookup, global-state query, dictionary lookup, deploy-info lookup and
/// deploy submission.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Returns the current state root hash as a hex string.
    async fn state_root_hash(&self) -> Result<String, ConnectorError>;

    /// Queries global state under `key`, following `path` through named keys.
    async fn query_global_state(
        &self,
        state_root: &str,
        key: &str,
        path: &[&str],
    ) -> Result<Value, ConnectorError>;

    /// Looks up one item of a contract-owned dictionary.
    async fn dictionary_item(
        &self,
        state_root: &str,
        contract_hash: &str,
        dictionary_name: &str,
        item_key: &str,
    ) -> Result<Value, ConnectorError>;

    /// Fetches the submission/execution record of a deploy.
    async fn deploy_info(&self, deploy_hash: &str) -> Result<Value, ConnectorError>;

    /// Submits a signed deploy and returns its hash.
    async fn put_deploy(&self, deploy: &Value) -> Result<String, ConnectorError>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// The production [`NodeRpc`] implementation over HTTPS.
pub struct HttpNodeRpc {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpNodeRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Issues one JSON-RPC call and unwraps the response envelope.
    ///
    /// A structured `error` member is always surfaced to the caller; it is
    /// never swallowed here.
    async fn call(&self, method: &str, params: Value) -> Result<Value, ConnectorError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ConnectorError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response
            .result
            .ok_or_else(|| ConnectorError::Format("response carries neither result nor error".into()))
    }
}

#[async_trait]
impl NodeRpc for HttpNodeRpc {
    async fn state_root_hash(&self) -> Result<String, ConnectorError> {
        let result = self.call("chain_get_state_root_hash", json!([])).await?;
        result
            .get("state_root_hash")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ConnectorError::Format("missing state_root_hash".into()))
    }

    async fn query_global_state(
        &self,
        state_root: &str,
        key: &str,
        path: &[&str],
    ) -> Result<Value, ConnectorError> {
        self.call(
            "query_global_state",
            json!({
                "state_identifier": { "StateRootHash": state_root },
                "key": key,
                "path": path,
            }),
        )
        .await
    }

    async fn dictionary_item(
        &self,
        state_root: &str,
        contract_hash: &str,
        dictionary_name: &str,
        item_key: &str,
    ) -> Result<Value, ConnectorError> {
        self.call(
            "state_get_dictionary_item",
            json!({
                "state_root_hash": state_root,
                "dictionary_identifier": {
                    "ContractNamedKey": {
                        "key": contract_hash,
                        "dictionary_name": dictionary_name,
                        "dictionary_item_key": item_key,
                    }
                },
            }),
        )
        .await
    }

    async fn deploy_info(&self, deploy_hash: &str) -> Result<Value, ConnectorError> {
        self.call("info_get_deploy", json!({ "deploy_hash": deploy_hash }))
            .await
    }

    async fn put_deploy(&self, deploy: &Value) -> Result<String, ConnectorError> {
        let result = self
            .call("account_put_deploy", json!({ "deploy": deploy }))
            .await?;
        result
            .get("deploy_hash")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ConnectorError::Format("missing deploy_hash".into()))
    }
}
