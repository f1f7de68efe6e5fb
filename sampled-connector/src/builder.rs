//! Unsigned-transaction construction for every marketplace entry point.
//!
//! Two session shapes exist. Entry points that move no value target the
//! stored contract package directly; the two purchase flows must attach a
//! motes payment and therefore wrap their arguments and the attached value
//! inside the proxy-caller wasm session.

use chrono::Utc;
use ethereum_types::U512;

use crate::config::ConnectorConfig;
use crate::deploy::{parse_hash32, ClValue, Deploy, ExecutableItem, RuntimeArgs};
use crate::error::ConnectorError;
use crate::pricing::{LicensePricing, LicenseType};
use crate::wasm::ProxyWasm;

pub const EP_UPLOAD_SAMPLE: &str = "upload_sample";
pub const EP_PURCHASE_SAMPLE: &str = "purchase_sample";
pub const EP_PURCHASE_LICENSE: &str = "purchase_license";
pub const EP_UPDATE_PRICE: &str = "update_price";
pub const EP_DEACTIVATE_SAMPLE: &str = "deactivate_sample";
pub const EP_WITHDRAW_EARNINGS: &str = "withdraw_earnings";
pub const EP_SET_LICENSE_PRICING: &str = "set_license_pricing";

/// Listing metadata for a new sample.
#[derive(Debug, Clone)]
pub struct UploadSample {
    pub price: U512,
    pub ipfs_link: String,
    pub title: String,
    pub bpm: u64,
    pub genre: String,
    pub cover_image: String,
    pub video_preview_link: String,
}

/// Prepares unsigned deploys for remote signing.
///
/// The private key never enters this process: a caller prepares a deploy
/// here, hands it to the external signer, and submits the signed result
/// through the tracker.
pub struct TransactionBuilder {
    config: ConnectorConfig,
    proxy_wasm: ProxyWasm,
}

impl TransactionBuilder {
    pub fn new(config: ConnectorConfig) -> Self {
        let proxy_wasm = ProxyWasm::new(config.contracts.proxy_wasm_path.clone());
        Self { config, proxy_wasm }
    }

    fn package_hash(&self) -> Result<&str, ConnectorError> {
        self.config
            .contracts
            .marketplace_package_hash
            .as_deref()
            .ok_or(ConnectorError::MissingConfig(
                "contracts.marketplace-package-hash",
            ))
    }

    /// Builds a direct session against the stored contract package.
    fn direct(
        &self,
        account: &str,
        entry_point: &str,
        args: RuntimeArgs,
        payment: u64,
    ) -> Result<Deploy, ConnectorError> {
        let package = self.package_hash()?;
        Deploy::new(
            account,
            &self.config.node.chain_name,
            U512::from(payment),
            ExecutableItem::stored_contract(package, entry_point, args),
            Utc::now(),
        )
    }

    /// Builds a value-carrying session through the proxy-caller wasm.
    ///
    /// All configuration is validated before the wasm is touched, so an
    /// unconfigured builder fails without any I/O.
    async fn proxied(
        &self,
        account: &str,
        entry_point: &str,
        args: RuntimeArgs,
        attached_value: U512,
        payment: u64,
    ) -> Result<Deploy, ConnectorError> {
        let package = parse_hash32(self.package_hash()?)?;
        let wasm = self.proxy_wasm.load().await?;

        let proxy_args = RuntimeArgs::new()
            .with("contract_package_hash", ClValue::byte_array32(package))
            .with("entry_point", ClValue::string(entry_point))
            .with("args", ClValue::bytes(&args.to_bytes()))
            .with("attached_value", ClValue::u512(attached_value));

        Deploy::new(
            account,
            &self.config.node.chain_name,
            U512::from(payment),
            ExecutableItem::module_bytes(wasm, proxy_args),
            Utc::now(),
        )
    }

    pub fn prepare_upload_sample(
        &self,
        account: &str,
        sample: &UploadSample,
    ) -> Result<Deploy, ConnectorError> {
        let args = RuntimeArgs::new()
            .with("price", ClValue::u512(sample.price))
            .with("ipfs_link", ClValue::string(&sample.ipfs_link))
            .with("title", ClValue::string(&sample.title))
            .with("bpm", ClValue::u64(sample.bpm))
            .with("genre", ClValue::string(&sample.genre))
            .with("cover_image", ClValue::string(&sample.cover_image))
            .with(
                "video_preview_link",
                ClValue::string(&sample.video_preview_link),
            );
        self.direct(account, EP_UPLOAD_SAMPLE, args, self.config.gas.upload_sample)
    }

    pub async fn prepare_purchase_sample(
        &self,
        account: &str,
        sample_id: u64,
        amount: U512,
    ) -> Result<Deploy, ConnectorError> {
        let args = RuntimeArgs::new().with("sample_id", ClValue::u64(sample_id));
        self.proxied(
            account,
            EP_PURCHASE_SAMPLE,
            args,
            amount,
            self.config.gas.purchase_sample,
        )
        .await
    }

    pub async fn prepare_purchase_license(
        &self,
        account: &str,
        sample_id: u64,
        license_type: LicenseType,
        amount: U512,
    ) -> Result<Deploy, ConnectorError> {
        let args = RuntimeArgs::new()
            .with("sample_id", ClValue::u64(sample_id))
            .with("license_type", ClValue::u8(license_type.to_u8()));
        self.proxied(
            account,
            EP_PURCHASE_LICENSE,
            args,
            amount,
            self.config.gas.purchase_license,
        )
        .await
    }

    pub fn prepare_update_price(
        &self,
        account: &str,
        sample_id: u64,
        new_price: U512,
    ) -> Result<Deploy, ConnectorError> {
        let args = RuntimeArgs::new()
            .with("sample_id", ClValue::u64(sample_id))
            .with("new_price", ClValue::u512(new_price));
        self.direct(account, EP_UPDATE_PRICE, args, self.config.gas.update_price)
    }

    pub fn prepare_deactivate_sample(
        &self,
        account: &str,
        sample_id: u64,
    ) -> Result<Deploy, ConnectorError> {
        let args = RuntimeArgs::new().with("sample_id", ClValue::u64(sample_id));
        self.direct(
            account,
            EP_DEACTIVATE_SAMPLE,
            args,
            self.config.gas.deactivate_sample,
        )
    }

    pub fn prepare_withdraw_earnings(&self, account: &str) -> Result<Deploy, ConnectorError> {
        self.direct(
            account,
            EP_WITHDRAW_EARNINGS,
            RuntimeArgs::new(),
            self.config.gas.withdraw_earnings,
        )
    }

    pub fn prepare_set_license_pricing(
        &self,
        account: &str,
        sample_id: u64,
        pricing: &LicensePricing,
    ) -> Result<Deploy, ConnectorError> {
        let args = RuntimeArgs::new()
            .with("sample_id", ClValue::u64(sample_id))
            .with(
                "personal_multiplier",
                ClValue::u64(pricing.personal_multiplier),
            )
            .with(
                "commercial_multiplier",
                ClValue::u64(pricing.commercial_multiplier),
            )
            .with(
                "broadcast_multiplier",
                ClValue::u64(pricing.broadcast_multiplier),
            )
            .with(
                "exclusive_multiplier",
                ClValue::u64(pricing.exclusive_multiplier),
            );
        self.direct(
            account,
            EP_SET_LICENSE_PRICING,
            args,
            self.config.gas.set_license_pricing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractsConfig;

    fn pubkey() -> String {
        format!("01{}", "33".repeat(32))
    }

    fn configured() -> ConnectorConfig {
        ConnectorConfig {
            contracts: ContractsConfig {
                marketplace_hash: Some(format!("hash-{}", "aa".repeat(32))),
                marketplace_package_hash: Some(format!("hash-{}", "bb".repeat(32))),
                proxy_wasm_path: None,
            },
            ..ConnectorConfig::default()
        }
    }

    #[test]
    fn direct_calls_target_the_stored_package() {
        let builder = TransactionBuilder::new(configured());
        let deploy = builder
            .prepare_deactivate_sample(&pubkey(), 4)
            .expect("deploy");
        match deploy.session {
            ExecutableItem::StoredVersionedContractByHash {
                ref entry_point, ..
            } => assert_eq!(entry_point, EP_DEACTIVATE_SAMPLE),
            ref other => panic!("unexpected session: {other:?}"),
        }
    }

    #[test]
    fn missing_package_hash_fails_fast() {
        let builder = TransactionBuilder::new(ConnectorConfig::default());
        assert!(matches!(
            builder.prepare_withdraw_earnings(&pubkey()),
            Err(ConnectorError::MissingConfig(
                "contracts.marketplace-package-hash"
            ))
        ));
    }

    #[tokio::test]
    async fn proxied_call_without_wasm_path_fails_before_io() {
        let builder = TransactionBuilder::new(configured());
        let result = builder
            .prepare_purchase_sample(&pubkey(), 1, U512::from(1_000_000_000u64))
            .await;
        assert!(matches!(
            result,
            Err(ConnectorError::MissingConfig("contracts.proxy-wasm-path"))
        ));
    }

    #[test]
    fn budgets_differ_per_entry_point() {
        let config = configured();
        assert!(config.gas.upload_sample < config.gas.purchase_license);
        assert!(config.gas.update_price < config.gas.purchase_sample);
    }
}
