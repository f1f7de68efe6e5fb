use serde::Deserialize;

/// The top-level configuration for the `sampled-connector` library.
///
/// Aggregates node connection settings, on-chain contract identifiers and
/// the tuning knobs of the query/submission layers. Typically deserialized
/// from a TOML file and passed to [`crate::client::MarketplaceClient`].
///
/// Contract identifiers are validated lazily: a missing value fails the
/// specific operation that needs it, not configuration loading.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectorConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Connection settings for the ledger node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeConfig {
    /// JSON-RPC HTTP endpoint.
    pub rpc_url: String,
    /// Network name carried in every deploy header.
    pub chain_name: String,
    /// Freshness window for the cached state root, in seconds.
    pub state_root_ttl_secs: u64,
}

/// On-chain identifiers the builder and event log need.
///
/// All optional: the connector can serve read-only traffic against the
/// marketplace contract alone, and proxied calls are only possible once the
/// forwarding wasm path is present.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ContractsConfig {
    /// Hash of the marketplace contract (events + direct calls).
    pub marketplace_hash: Option<String>,
    /// Package hash of the marketplace, targeted by sessions.
    pub marketplace_package_hash: Option<String>,
    /// Filesystem path of the compiled proxy-caller wasm.
    pub proxy_wasm_path: Option<String>,
}

/// Per-entry-point payment budgets in motes.
///
/// Entry points have independently tuned budgets reflecting their typical
/// execution cost; a license purchase crosses two contracts and pays the
/// most.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GasConfig {
    pub upload_sample: u64,
    pub purchase_sample: u64,
    pub purchase_license: u64,
    pub update_price: u64,
    pub deactivate_sample: u64,
    pub withdraw_earnings: u64,
    pub set_license_pricing: u64,
}

/// Behavior of the submission tracker's polling loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackingConfig {
    /// Seconds between two execution-status polls.
    pub poll_interval_secs: u64,
    /// Overall deadline for observing a terminal result, in seconds.
    pub poll_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:7777/rpc".to_string(),
            chain_name: "casper-test".to_string(),
            state_root_ttl_secs: 30,
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            upload_sample: 5_000_000_000,
            purchase_sample: 15_000_000_000,
            purchase_license: 20_000_000_000,
            update_price: 3_000_000_000,
            deactivate_sample: 3_000_000_000,
            withdraw_earnings: 5_000_000_000,
            set_license_pricing: 4_000_000_000,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            poll_timeout_secs: 120,
        }
    }
}
