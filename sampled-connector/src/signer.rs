//! Capability interface of the external signer.
//!
//! Key storage and the signing cryptography live in the user's wallet; the
//! connector only ever sees transaction JSON going out and a signature (or
//! a cancellation) coming back. The trait seam also lets tests sign with a
//! scripted double.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ConnectorError;

/// The signer's answer to a signature request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureResponse {
    /// The user declined in the wallet UI. Never retried by the connector.
    pub cancelled: bool,
    /// Algorithm-tagged hex signature, present when not cancelled.
    pub signature_hex: Option<String>,
}

/// External wallet capability consumed by the submission pipeline.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn is_connected(&self) -> bool;

    /// Asks the wallet to connect; `false` means the user declined.
    async fn request_connection(&self) -> Result<bool, ConnectorError>;

    /// Hex public key of the wallet's active account.
    async fn active_public_key(&self) -> Result<String, ConnectorError>;

    /// Requests a signature over the deploy JSON for the given key.
    async fn sign(
        &self,
        deploy_json: &Value,
        public_key_hex: &str,
    ) -> Result<SignatureResponse, ConnectorError>;
}
