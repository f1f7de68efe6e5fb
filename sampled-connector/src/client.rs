//! High-level marketplace facade.
//!
//! Bundles the read path (event-log views) and the write path (build, sign,
//! submit, track) behind one handle. Every mutation follows the same
//! pipeline: ensure the wallet is connected, prepare an unsigned deploy,
//! hand it to the signer, attach the approval, submit, then poll for the
//! execution result.

use std::sync::Arc;
use std::time::Duration;

use ethereum_types::U512;

use crate::builder::{TransactionBuilder, UploadSample};
use crate::config::ConnectorConfig;
use crate::deploy::Deploy;
use crate::error::ConnectorError;
use crate::event_log::EventLog;
use crate::pricing::{LicensePricing, LicenseType};
use crate::rpc::{HttpNodeRpc, NodeRpc};
use crate::signer::TransactionSigner;
use crate::tracker::{DeployWatcher, ExecutionOutcome};
use crate::views::MarketView;

/// What happened to a submitted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub deploy_hash: String,
    pub outcome: ExecutionOutcome,
}

/// One connected marketplace session: a node, a wallet, a contract.
pub struct MarketplaceClient<R: ?Sized, S: ?Sized> {
    signer: Arc<S>,
    builder: TransactionBuilder,
    watcher: DeployWatcher<R>,
    /// Built once so the state-root cache spans the client's lifetime.
    /// Absent when no marketplace hash is configured.
    view: Option<MarketView<R>>,
}

impl<S: TransactionSigner + ?Sized> MarketplaceClient<HttpNodeRpc, S> {
    /// Connects over HTTP to the configured node.
    pub fn connect(config: ConnectorConfig, signer: Arc<S>) -> Self {
        let rpc = Arc::new(HttpNodeRpc::new(config.node.rpc_url.clone()));
        Self::with_rpc(config, rpc, signer)
    }
}

impl<R: NodeRpc + ?Sized, S: TransactionSigner + ?Sized> MarketplaceClient<R, S> {
    pub fn with_rpc(config: ConnectorConfig, rpc: Arc<R>, signer: Arc<S>) -> Self {
        let watcher = DeployWatcher::new(rpc.clone(), &config.tracking);
        let view = config.contracts.marketplace_hash.clone().map(|hash| {
            MarketView::new(EventLog::new(
                rpc,
                hash,
                Duration::from_secs(config.node.state_root_ttl_secs),
            ))
        });
        let builder = TransactionBuilder::new(config);
        Self {
            signer,
            builder,
            watcher,
            view,
        }
    }

    /// Read-only views over the marketplace event log.
    ///
    /// Needs the marketplace contract hash; everything else about the read
    /// path is infallible by construction.
    pub fn views(&self) -> Result<&MarketView<R>, ConnectorError> {
        self.view
            .as_ref()
            .ok_or(ConnectorError::MissingConfig("contracts.marketplace-hash"))
    }

    /// Connects the wallet if needed and returns the active public key.
    async fn ensure_connected(&self) -> Result<String, ConnectorError> {
        if !self.signer.is_connected().await && !self.signer.request_connection().await? {
            return Err(ConnectorError::SigningCancelled);
        }
        self.signer.active_public_key().await
    }

    /// Signs, submits and tracks a prepared deploy.
    async fn sign_and_submit(
        &self,
        mut deploy: Deploy,
        public_key: &str,
    ) -> Result<Submission, ConnectorError> {
        let response = self.signer.sign(&deploy.to_json()?, public_key).await?;
        if response.cancelled {
            return Err(ConnectorError::SigningCancelled);
        }
        let signature = response
            .signature_hex
            .ok_or_else(|| ConnectorError::Format("signer returned no signature".to_string()))?;
        deploy.attach_approval(public_key, &signature);

        let deploy_hash = self.watcher.submit(&deploy).await?;
        let outcome = self.watcher.wait(&deploy_hash).await?;
        Ok(Submission {
            deploy_hash,
            outcome,
        })
    }

    /// Lists a new sample for sale.
    pub async fn upload_sample(&self, sample: &UploadSample) -> Result<Submission, ConnectorError> {
        let account = self.ensure_connected().await?;
        let deploy = self.builder.prepare_upload_sample(&account, sample)?;
        self.sign_and_submit(deploy, &account).await
    }

    /// Buys a sample at its current catalog price.
    ///
    /// The price is read from the log first; buying an unknown or
    /// deactivated sample fails before anything is signed.
    pub async fn purchase_sample(&self, sample_id: u64) -> Result<Submission, ConnectorError> {
        let account = self.ensure_connected().await?;
        let sample = self
            .views()?
            .sample(sample_id)
            .await
            .ok_or_else(|| ConnectorError::Format(format!("unknown sample {sample_id}")))?;
        if !sample.is_active {
            return Err(ConnectorError::Execution(format!(
                "sample {sample_id} is no longer for sale"
            )));
        }
        let deploy = self
            .builder
            .prepare_purchase_sample(&account, sample_id, sample.price)
            .await?;
        self.sign_and_submit(deploy, &account).await
    }

    /// Buys a license of the given tier, priced off the sample's base price.
    pub async fn purchase_license(
        &self,
        sample_id: u64,
        license_type: LicenseType,
    ) -> Result<Submission, ConnectorError> {
        let account = self.ensure_connected().await?;
        let sample = self
            .views()?
            .sample(sample_id)
            .await
            .ok_or_else(|| ConnectorError::Format(format!("unknown sample {sample_id}")))?;
        let amount = LicensePricing::default().price(sample.price, license_type);
        let deploy = self
            .builder
            .prepare_purchase_license(&account, sample_id, license_type, amount)
            .await?;
        self.sign_and_submit(deploy, &account).await
    }

    pub async fn update_price(
        &self,
        sample_id: u64,
        new_price: U512,
    ) -> Result<Submission, ConnectorError> {
        let account = self.ensure_connected().await?;
        let deploy = self
            .builder
            .prepare_update_price(&account, sample_id, new_price)?;
        self.sign_and_submit(deploy, &account).await
    }

    pub async fn deactivate_sample(&self, sample_id: u64) -> Result<Submission, ConnectorError> {
        let account = self.ensure_connected().await?;
        let deploy = self.builder.prepare_deactivate_sample(&account, sample_id)?;
        self.sign_and_submit(deploy, &account).await
    }

    /// Sweeps the caller's accumulated sale proceeds to their purse.
    pub async fn withdraw_earnings(&self) -> Result<Submission, ConnectorError> {
        let account = self.ensure_connected().await?;
        let deploy = self.builder.prepare_withdraw_earnings(&account)?;
        self.sign_and_submit(deploy, &account).await
    }

    /// Overrides the license multipliers of one of the caller's samples.
    pub async fn set_license_pricing(
        &self,
        sample_id: u64,
        pricing: &LicensePricing,
    ) -> Result<Submission, ConnectorError> {
        let account = self.ensure_connected().await?;
        let deploy = self
            .builder
            .prepare_set_license_pricing(&account, sample_id, pricing)?;
        self.sign_and_submit(deploy, &account).await
    }
}
