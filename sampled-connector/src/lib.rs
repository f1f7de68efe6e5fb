//! Client library for an on-chain audio-sample marketplace.
//!
//! The marketplace contract keeps an append-only event log in its global
//! state; this crate rebuilds every user-facing view (catalog, purchases,
//! licenses, stats) by replaying that log over JSON-RPC, and drives the
//! write path by preparing unsigned deploys, collecting a signature from an
//! external wallet and tracking execution to a terminal outcome.
//!
//! Entry point for most callers is [`client::MarketplaceClient`]; the
//! lower-level pieces (the [`rpc::NodeRpc`] seam, [`event_log::EventLog`],
//! [`builder::TransactionBuilder`], [`tracker::DeployWatcher`]) are public
//! for callers that need finer control or test doubles.

pub mod account;
pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod deploy;
pub mod error;
pub mod event_log;
pub mod events;
pub mod pricing;
pub mod rpc;
pub mod signer;
pub mod tracker;
pub mod views;
pub mod wasm;

pub use account::AccountId;
pub use builder::{TransactionBuilder, UploadSample};
pub use client::{MarketplaceClient, Submission};
pub use config::ConnectorConfig;
pub use error::ConnectorError;
pub use event_log::EventLog;
pub use events::{parse_event_data, MarketEvent};
pub use pricing::{AllLicensePrices, LicensePricing, LicenseType};
pub use rpc::{HttpNodeRpc, NodeRpc};
pub use signer::{SignatureResponse, TransactionSigner};
pub use tracker::{DeployWatcher, ExecutionOutcome};
pub use views::{MarketStats, MarketView, SampleRecord};
