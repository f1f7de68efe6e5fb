//! Typed domain events decoded from the on-chain log.
//!
//! The log is heterogeneous: records of every kind are interleaved and only
//! distinguishable by the embedded type tag. [`parse_event_data`] dispatches
//! on that tag and returns [`MarketEvent::Unknown`] for unrecognized or
//! malformed records, so one bad buffer can never abort a replay.

use ethereum_types::U512;
use serde::Serialize;

use crate::account::AccountId;
use crate::codec::{ByteReader, ByteWriter};
use crate::pricing::LicenseType;

pub const SAMPLE_UPLOADED_TAG: &str = "event_SampleUploaded";
pub const SAMPLE_PURCHASED_TAG: &str = "event_SamplePurchased";
pub const LICENSE_MINTED_TAG: &str = "event_LicenseMinted";
pub const SAMPLE_DEACTIVATED_TAG: &str = "event_SampleDeactivated";
pub const PRICE_UPDATED_TAG: &str = "event_PriceUpdated";
pub const EARNINGS_WITHDRAWN_TAG: &str = "event_EarningsWithdrawn";

/// Emitted when a new sample is listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleUploaded {
    pub sample_id: u64,
    pub seller: AccountId,
    pub price: U512,
    pub ipfs_link: String,
    pub title: String,
    pub bpm: u64,
    pub genre: String,
    pub cover_image: String,
    pub video_preview_link: String,
    pub timestamp: u64,
}

/// Emitted once per sale; a buyer may appear repeatedly across samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplePurchased {
    pub sample_id: u64,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub price: U512,
    pub platform_fee: U512,
    pub timestamp: u64,
}

/// Emitted when a license NFT is minted for a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseMinted {
    pub license_id: u64,
    pub sample_id: u64,
    pub license_type: LicenseType,
    pub buyer: AccountId,
    pub creator: AccountId,
    pub price: U512,
    pub timestamp: u64,
}

/// Emitted when a seller takes a sample off the market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleDeactivated {
    pub sample_id: u64,
    pub seller: AccountId,
    pub timestamp: u64,
}

/// Emitted when a seller re-prices a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceUpdated {
    pub sample_id: u64,
    pub old_price: U512,
    pub new_price: U512,
    pub timestamp: u64,
}

/// Emitted when a seller withdraws accumulated earnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarningsWithdrawn {
    pub user: AccountId,
    pub amount: U512,
    pub timestamp: u64,
}

/// One decoded record of the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    SampleUploaded(SampleUploaded),
    SamplePurchased(SamplePurchased),
    LicenseMinted(LicenseMinted),
    SampleDeactivated(SampleDeactivated),
    PriceUpdated(PriceUpdated),
    EarningsWithdrawn(EarningsWithdrawn),
    Unknown,
}

/// Decodes a raw event buffer into its typed record.
///
/// Dispatches on the embedded type tag; anything unrecognized, truncated or
/// otherwise malformed comes back as [`MarketEvent::Unknown`].
pub fn parse_event_data(data: &[u8]) -> MarketEvent {
    let mut reader = ByteReader::new(data);
    let Some(tag) = reader.read_tag() else {
        return MarketEvent::Unknown;
    };

    let event = match tag.as_str() {
        SAMPLE_UPLOADED_TAG => SampleUploaded::decode(&mut reader).map(MarketEvent::SampleUploaded),
        SAMPLE_PURCHASED_TAG => {
            SamplePurchased::decode(&mut reader).map(MarketEvent::SamplePurchased)
        }
        LICENSE_MINTED_TAG => LicenseMinted::decode(&mut reader).map(MarketEvent::LicenseMinted),
        SAMPLE_DEACTIVATED_TAG => {
            SampleDeactivated::decode(&mut reader).map(MarketEvent::SampleDeactivated)
        }
        PRICE_UPDATED_TAG => PriceUpdated::decode(&mut reader).map(MarketEvent::PriceUpdated),
        EARNINGS_WITHDRAWN_TAG => {
            EarningsWithdrawn::decode(&mut reader).map(MarketEvent::EarningsWithdrawn)
        }
        _ => None,
    };
    event.unwrap_or(MarketEvent::Unknown)
}

impl SampleUploaded {
    fn decode(r: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            sample_id: r.read_u64()?,
            seller: AccountId::from_bytes(r.read_account()?),
            price: r.read_u512()?,
            ipfs_link: r.read_string()?,
            title: r.read_string()?,
            bpm: r.read_u64()?,
            genre: r.read_string()?,
            cover_image: r.read_string()?,
            video_preview_link: r.read_string()?,
            timestamp: r.read_u64()?,
        })
    }

    /// Wire encoding, used to build fixtures and assert round trips.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_tag(SAMPLE_UPLOADED_TAG);
        w.write_u64(self.sample_id);
        w.write_account(self.seller.as_bytes());
        w.write_u512(self.price);
        w.write_string(&self.ipfs_link);
        w.write_string(&self.title);
        w.write_u64(self.bpm);
        w.write_string(&self.genre);
        w.write_string(&self.cover_image);
        w.write_string(&self.video_preview_link);
        w.write_u64(self.timestamp);
        w.into_bytes()
    }
}

impl SamplePurchased {
    fn decode(r: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            sample_id: r.read_u64()?,
            buyer: AccountId::from_bytes(r.read_account()?),
            seller: AccountId::from_bytes(r.read_account()?),
            price: r.read_u512()?,
            platform_fee: r.read_u512()?,
            timestamp: r.read_u64()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_tag(SAMPLE_PURCHASED_TAG);
        w.write_u64(self.sample_id);
        w.write_account(self.buyer.as_bytes());
        w.write_account(self.seller.as_bytes());
        w.write_u512(self.price);
        w.write_u512(self.platform_fee);
        w.write_u64(self.timestamp);
        w.into_bytes()
    }
}

impl LicenseMinted {
    fn decode(r: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            license_id: r.read_u64()?,
            sample_id: r.read_u64()?,
            license_type: LicenseType::from_u8(r.read_u8()?)?,
            buyer: AccountId::from_bytes(r.read_account()?),
            creator: AccountId::from_bytes(r.read_account()?),
            price: r.read_u512()?,
            timestamp: r.read_u64()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_tag(LICENSE_MINTED_TAG);
        w.write_u64(self.license_id);
        w.write_u64(self.sample_id);
        w.write_u8(self.license_type.to_u8());
        w.write_account(self.buyer.as_bytes());
        w.write_account(self.creator.as_bytes());
        w.write_u512(self.price);
        w.write_u64(self.timestamp);
        w.into_bytes()
    }
}

impl SampleDeactivated {
    fn decode(r: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            sample_id: r.read_u64()?,
            seller: AccountId::from_bytes(r.read_account()?),
            timestamp: r.read_u64()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_tag(SAMPLE_DEACTIVATED_TAG);
        w.write_u64(self.sample_id);
        w.write_account(self.seller.as_bytes());
        w.write_u64(self.timestamp);
        w.into_bytes()
    }
}

impl PriceUpdated {
    fn decode(r: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            sample_id: r.read_u64()?,
            old_price: r.read_u512()?,
            new_price: r.read_u512()?,
            timestamp: r.read_u64()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_tag(PRICE_UPDATED_TAG);
        w.write_u64(self.sample_id);
        w.write_u512(self.old_price);
        w.write_u512(self.new_price);
        w.write_u64(self.timestamp);
        w.into_bytes()
    }
}

impl EarningsWithdrawn {
    fn decode(r: &mut ByteReader<'_>) -> Option<Self> {
        Some(Self {
            user: AccountId::from_bytes(r.read_account()?),
            amount: r.read_u512()?,
            timestamp: r.read_u64()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_tag(EARNINGS_WITHDRAWN_TAG);
        w.write_account(self.user.as_bytes());
        w.write_u512(self.amount);
        w.write_u64(self.timestamp);
        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 32])
    }

    fn upload_fixture() -> SampleUploaded {
        SampleUploaded {
            sample_id: 7,
            seller: account(0xaa),
            price: U512::from(1_000_000_000u64),
            ipfs_link: "ipfs://QmAudio".into(),
            title: "Night Drive".into(),
            bpm: 124,
            genre: "Electronic".into(),
            cover_image: "ipfs://QmCover".into(),
            video_preview_link: String::new(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn sample_uploaded_decode_is_idempotent() {
        let event = upload_fixture();
        let bytes = event.to_bytes();

        let first = parse_event_data(&bytes);
        let second = parse_event_data(&bytes);
        assert_eq!(first, MarketEvent::SampleUploaded(event));
        assert_eq!(first, second);
    }

    #[test]
    fn purchase_and_license_round_trip() {
        let purchase = SamplePurchased {
            sample_id: 7,
            buyer: account(0xbb),
            seller: account(0xaa),
            price: U512::from(1_000_000_000u64),
            platform_fee: U512::from(100_000_000u64),
            timestamp: 1_700_000_100_000,
        };
        assert_eq!(
            parse_event_data(&purchase.to_bytes()),
            MarketEvent::SamplePurchased(purchase)
        );

        let license = LicenseMinted {
            license_id: 3,
            sample_id: 7,
            license_type: LicenseType::Broadcast,
            buyer: account(0xbb),
            creator: account(0xaa),
            price: U512::from(5_000_000_000u64),
            timestamp: 1_700_000_200_000,
        };
        assert_eq!(
            parse_event_data(&license.to_bytes()),
            MarketEvent::LicenseMinted(license)
        );
    }

    #[test]
    fn timestamps_above_32_bits_survive_decoding() {
        let event = upload_fixture();
        let decoded = match parse_event_data(&event.to_bytes()) {
            MarketEvent::SampleUploaded(e) => e,
            other => panic!("unexpected event: {other:?}"),
        };
        assert!(decoded.timestamp > u64::from(u32::MAX));
        assert_eq!(decoded.timestamp, event.timestamp);
    }

    #[test]
    fn unknown_tag_yields_unknown() {
        let mut w = ByteWriter::new();
        w.write_tag("event_SomethingElse");
        w.write_u64(1);
        assert_eq!(parse_event_data(&w.into_bytes()), MarketEvent::Unknown);
    }

    #[test]
    fn truncated_record_yields_unknown() {
        let bytes = upload_fixture().to_bytes();
        for cut in [0, 2, 10, bytes.len() - 1] {
            assert_eq!(parse_event_data(&bytes[..cut]), MarketEvent::Unknown);
        }
    }

    #[test]
    fn invalid_license_type_yields_unknown() {
        let mut bytes = LicenseMinted {
            license_id: 1,
            sample_id: 1,
            license_type: LicenseType::Personal,
            buyer: account(1),
            creator: account(2),
            price: U512::from(10u64),
            timestamp: 0,
        }
        .to_bytes();
        // license_type byte sits right after the tag and the two u64 ids
        let offset = 4 + LICENSE_MINTED_TAG.len() + 8 + 8;
        bytes[offset] = 9;
        assert_eq!(parse_event_data(&bytes), MarketEvent::Unknown);
    }
}
