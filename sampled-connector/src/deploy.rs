//! Unsigned transaction (deploy) model.
//!
//! A deploy is `{ header, payment, session }`. The JSON shape mirrors what
//! the node's submission RPC and the wallet signer expect; the byte shape
//! feeds the body and deploy hashes. Runtime arguments therefore serialize
//! both ways: to the node's JSON argument list and to the wire bytes also
//! used for the proxied-call argument blob.

use chrono::{DateTime, SecondsFormat, Utc};
use ethereum_types::U512;
use serde::ser::{SerializeMap, SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};

use crate::account::blake2b256;
use crate::codec::ByteWriter;
use crate::error::ConnectorError;

/// Validity window stamped into every header.
pub const DEPLOY_TTL_MINUTES: u64 = 30;

/// Value types an argument can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClType {
    U8,
    U64,
    U512,
    String,
    ByteArray(u32),
    /// `List(U8)`, the type of an opaque byte blob.
    Bytes,
}

impl ClType {
    fn tag_bytes(&self) -> Vec<u8> {
        match self {
            ClType::U8 => vec![3],
            ClType::U64 => vec![5],
            ClType::U512 => vec![8],
            ClType::String => vec![10],
            ClType::ByteArray(size) => {
                let mut out = vec![15];
                out.extend_from_slice(&size.to_le_bytes());
                out
            }
            ClType::Bytes => vec![14, 3],
        }
    }
}

impl Serialize for ClType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClType::U8 => serializer.serialize_str("U8"),
            ClType::U64 => serializer.serialize_str("U64"),
            ClType::U512 => serializer.serialize_str("U512"),
            ClType::String => serializer.serialize_str("String"),
            ClType::ByteArray(size) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ByteArray", size)?;
                map.end()
            }
            ClType::Bytes => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("List", "U8")?;
                map.end()
            }
        }
    }
}

/// A typed value in its wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClValue {
    pub cl_type: ClType,
    pub bytes: Vec<u8>,
}

impl ClValue {
    pub fn u8(value: u8) -> Self {
        Self {
            cl_type: ClType::U8,
            bytes: vec![value],
        }
    }

    pub fn u64(value: u64) -> Self {
        let mut w = ByteWriter::new();
        w.write_u64(value);
        Self {
            cl_type: ClType::U64,
            bytes: w.into_bytes(),
        }
    }

    pub fn u512(value: U512) -> Self {
        let mut w = ByteWriter::new();
        w.write_u512(value);
        Self {
            cl_type: ClType::U512,
            bytes: w.into_bytes(),
        }
    }

    pub fn string(value: &str) -> Self {
        let mut w = ByteWriter::new();
        w.write_string(value);
        Self {
            cl_type: ClType::String,
            bytes: w.into_bytes(),
        }
    }

    pub fn byte_array32(value: [u8; 32]) -> Self {
        Self {
            cl_type: ClType::ByteArray(32),
            bytes: value.to_vec(),
        }
    }

    /// An opaque byte blob (length-prefixed on the wire).
    pub fn bytes(raw: &[u8]) -> Self {
        let mut w = ByteWriter::new();
        w.write_u32(raw.len() as u32);
        w.write_raw(raw);
        Self {
            cl_type: ClType::Bytes,
            bytes: w.into_bytes(),
        }
    }
}

impl Serialize for ClValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("cl_type", &self.cl_type)?;
        map.serialize_entry("bytes", &hex::encode(&self.bytes))?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NamedArg(String, ClValue);

impl Serialize for NamedArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.0)?;
        tuple.serialize_element(&self.1)?;
        tuple.end()
    }
}

/// Ordered named arguments of an entry-point call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuntimeArgs(Vec<NamedArg>);

impl RuntimeArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: ClValue) {
        self.0.push(NamedArg(name.to_string(), value));
    }

    pub fn with(mut self, name: &str, value: ClValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Wire encoding: arg count, then per arg its name, the value's byte
    /// length and bytes, and the type tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_u32(self.0.len() as u32);
        for NamedArg(name, value) in &self.0 {
            w.write_string(name);
            w.write_u32(value.bytes.len() as u32);
            w.write_raw(&value.bytes);
            w.write_raw(&value.cl_type.tag_bytes());
        }
        w.into_bytes()
    }
}

impl Serialize for RuntimeArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for arg in &self.0 {
            seq.serialize_element(arg)?;
        }
        seq.end()
    }
}

/// Execution target of the payment or session slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExecutableItem {
    /// Inline wasm (empty bytes select the standard payment code).
    ModuleBytes {
        module_bytes: String,
        args: RuntimeArgs,
    },
    /// Direct call into the stored contract package.
    StoredVersionedContractByHash {
        hash: String,
        version: Option<u32>,
        entry_point: String,
        args: RuntimeArgs,
    },
}

impl ExecutableItem {
    pub fn module_bytes(wasm: &[u8], args: RuntimeArgs) -> Self {
        ExecutableItem::ModuleBytes {
            module_bytes: hex::encode(wasm),
            args,
        }
    }

    pub fn stored_contract(package_hash: &str, entry_point: &str, args: RuntimeArgs) -> Self {
        ExecutableItem::StoredVersionedContractByHash {
            hash: package_hash.to_string(),
            version: None,
            entry_point: entry_point.to_string(),
            args,
        }
    }

    /// Byte form feeding the body hash. The JSON and byte forms must agree,
    /// so a hash or module blob that cannot be decoded is a hard error here
    /// rather than a silent zero substitution.
    fn to_bytes(&self) -> Result<Vec<u8>, ConnectorError> {
        let mut w = ByteWriter::new();
        match self {
            ExecutableItem::ModuleBytes { module_bytes, args } => {
                w.write_u8(0);
                let wasm = hex::decode(module_bytes)
                    .map_err(|_| ConnectorError::Format("module bytes are not hex".into()))?;
                w.write_u32(wasm.len() as u32);
                w.write_raw(&wasm);
                w.write_raw(&args.to_bytes());
            }
            ExecutableItem::StoredVersionedContractByHash {
                hash,
                version,
                entry_point,
                args,
            } => {
                w.write_u8(3);
                w.write_raw(&parse_hash32(hash)?);
                match version {
                    Some(v) => {
                        w.write_u8(1);
                        w.write_u32(*v);
                    }
                    None => w.write_u8(0),
                }
                w.write_string(entry_point);
                w.write_raw(&args.to_bytes());
            }
        }
        Ok(w.into_bytes())
    }
}

/// Fixed-validity header carried by every deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployHeader {
    /// Hex public key of the submitting account.
    pub account: String,
    /// ISO-8601 construction time.
    pub timestamp: String,
    /// Validity window, e.g. "30m".
    pub ttl: String,
    pub gas_price: u64,
    /// Hex blake2b-256 of payment ++ session bytes.
    pub body_hash: String,
    pub dependencies: Vec<String>,
    pub chain_name: String,
}

impl DeployHeader {
    fn to_bytes(&self, timestamp_ms: u64) -> Result<Vec<u8>, ConnectorError> {
        let mut w = ByteWriter::new();
        let account = hex::decode(&self.account)
            .map_err(|_| ConnectorError::Format(format!("invalid public key: {}", self.account)))?;
        w.write_raw(&account);
        w.write_u64(timestamp_ms);
        w.write_u64(DEPLOY_TTL_MINUTES * 60 * 1_000);
        w.write_u64(self.gas_price);
        // body_hash is hex::encode output, the decode cannot fail
        w.write_raw(&hex::decode(&self.body_hash).unwrap_or_default());
        w.write_u32(self.dependencies.len() as u32);
        w.write_string(&self.chain_name);
        Ok(w.into_bytes())
    }
}

/// A signature attached by the external signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approval {
    pub signer: String,
    pub signature: String,
}

/// An unsigned (or signed, once approvals arrive) transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deploy {
    pub hash: String,
    pub header: DeployHeader,
    pub payment: ExecutableItem,
    pub session: ExecutableItem,
    pub approvals: Vec<Approval>,
}

impl Deploy {
    /// Assembles a deploy: standard payment with the given motes budget,
    /// the supplied session, and a 30-minute validity window from `now`.
    ///
    /// Fails with `Format` when the public key or the session's contract
    /// hash is not valid hex, so a bad identifier never reaches the node.
    pub fn new(
        account_public_key_hex: &str,
        chain_name: &str,
        payment_amount: U512,
        session: ExecutableItem,
        now: DateTime<Utc>,
    ) -> Result<Self, ConnectorError> {
        let payment = ExecutableItem::module_bytes(
            &[],
            RuntimeArgs::new().with("amount", ClValue::u512(payment_amount)),
        );

        let mut body = payment.to_bytes()?;
        body.extend_from_slice(&session.to_bytes()?);
        let body_hash = hex::encode(blake2b256(&[&body]));

        let header = DeployHeader {
            account: account_public_key_hex.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ttl: format!("{DEPLOY_TTL_MINUTES}m"),
            gas_price: 1,
            body_hash,
            dependencies: Vec::new(),
            chain_name: chain_name.to_string(),
        };
        let header_bytes = header.to_bytes(now.timestamp_millis() as u64)?;
        let hash = hex::encode(blake2b256(&[&header_bytes]));

        Ok(Self {
            hash,
            header,
            payment,
            session,
            approvals: Vec::new(),
        })
    }

    pub fn attach_approval(&mut self, signer: &str, signature: &str) {
        self.approvals.push(Approval {
            signer: signer.to_string(),
            signature: signature.to_string(),
        });
    }

    /// JSON form consumed by the signer and the submission RPC.
    pub fn to_json(&self) -> Result<serde_json::Value, ConnectorError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Parses a 32-byte hex hash, tolerating a `hash-` prefix.
pub fn parse_hash32(s: &str) -> Result<[u8; 32], ConnectorError> {
    let trimmed = s.strip_prefix("hash-").unwrap_or(s);
    hex::decode(trimmed)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| ConnectorError::Format(format!("invalid contract hash: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn pubkey() -> String {
        format!("01{}", "22".repeat(32))
    }

    #[test]
    fn header_carries_ttl_chain_and_account() {
        let session = ExecutableItem::stored_contract(
            &format!("hash-{}", "ab".repeat(32)),
            "withdraw_earnings",
            RuntimeArgs::new(),
        );
        let deploy = Deploy::new(
            &pubkey(),
            "casper-test",
            U512::from(5_000_000_000u64),
            session,
            fixed_now(),
        )
        .expect("deploy");

        assert_eq!(deploy.header.ttl, "30m");
        assert_eq!(deploy.header.chain_name, "casper-test");
        assert_eq!(deploy.header.account, pubkey());
        assert_eq!(deploy.header.gas_price, 1);
        assert_eq!(deploy.hash.len(), 64);
        assert!(deploy.approvals.is_empty());
    }

    #[test]
    fn deploy_hash_is_deterministic_for_identical_inputs() {
        let make = || {
            Deploy::new(
                &pubkey(),
                "casper-test",
                U512::from(1u64),
                ExecutableItem::stored_contract(
                    &"cd".repeat(32),
                    "deactivate_sample",
                    RuntimeArgs::new().with("sample_id", ClValue::u64(9)),
                ),
                fixed_now(),
            )
            .expect("deploy")
        };
        assert_eq!(make().hash, make().hash);
    }

    #[test]
    fn malformed_identifiers_fail_deploy_construction() {
        let bad_hash = Deploy::new(
            &pubkey(),
            "casper-test",
            U512::from(1u64),
            ExecutableItem::stored_contract("hash-zz", "upload_sample", RuntimeArgs::new()),
            fixed_now(),
        );
        assert!(matches!(bad_hash, Err(ConnectorError::Format(_))));

        let bad_key = Deploy::new(
            "not-hex",
            "casper-test",
            U512::from(1u64),
            ExecutableItem::stored_contract(&"ab".repeat(32), "upload_sample", RuntimeArgs::new()),
            fixed_now(),
        );
        assert!(matches!(bad_key, Err(ConnectorError::Format(_))));
    }

    #[test]
    fn args_serialize_to_the_node_json_shape() {
        let args = RuntimeArgs::new()
            .with("sample_id", ClValue::u64(7))
            .with("attached_value", ClValue::u512(U512::from(256u64)));
        let json = serde_json::to_value(&args).unwrap();

        assert_eq!(json[0][0], "sample_id");
        assert_eq!(json[0][1]["cl_type"], "U64");
        assert_eq!(json[0][1]["bytes"], "0700000000000000");
        assert_eq!(json[1][1]["cl_type"], "U512");
        assert_eq!(json[1][1]["bytes"], "020001");
    }

    #[test]
    fn arg_bytes_are_length_prefixed_and_type_tagged() {
        let args = RuntimeArgs::new().with("sample_id", ClValue::u64(1));
        let bytes = args.to_bytes();

        // count
        assert_eq!(&bytes[..4], &1u32.to_le_bytes());
        // name
        assert_eq!(&bytes[4..8], &9u32.to_le_bytes());
        assert_eq!(&bytes[8..17], b"sample_id");
        // value length + value + U64 tag
        assert_eq!(&bytes[17..21], &8u32.to_le_bytes());
        assert_eq!(&bytes[21..29], &1u64.to_le_bytes());
        assert_eq!(bytes[29], 5);
        assert_eq!(bytes.len(), 30);
    }

    #[test]
    fn session_enum_serializes_externally_tagged() {
        let session = ExecutableItem::stored_contract(
            &"ab".repeat(32),
            "upload_sample",
            RuntimeArgs::new(),
        );
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("StoredVersionedContractByHash").is_some());
        assert_eq!(
            json["StoredVersionedContractByHash"]["entry_point"],
            "upload_sample"
        );
        assert_eq!(json["StoredVersionedContractByHash"]["version"], serde_json::Value::Null);
    }

    #[test]
    fn hash_prefix_is_tolerated() {
        let plain = "ef".repeat(32);
        assert_eq!(
            parse_hash32(&plain).unwrap(),
            parse_hash32(&format!("hash-{plain}")).unwrap()
        );
        assert!(parse_hash32("hash-zz").is_err());
    }
}
