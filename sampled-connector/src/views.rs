//! Derived marketplace views, rebuilt from the event log on every query.
//!
//! The log is the only authoritative source: each view replays every event
//! from ordinal 0 and folds the matches. O(n) per query, acceptable at the
//! marketplace's expected scale. The folds are pure functions over decoded
//! events so they can be tested without a node.
//!
//! Read paths never fail: an unreachable node shows up as an empty log and
//! therefore empty views.

use std::collections::BTreeMap;

use ethereum_types::U512;
use serde::Serialize;

use crate::account::AccountId;
use crate::event_log::{Clock, EventLog, SystemClock};
use crate::events::{parse_event_data, MarketEvent};
use crate::pricing::LicenseType;
use crate::rpc::NodeRpc;

/// A listed sample, as reconstructed from the log.
///
/// Seeded by the first `SampleUploaded` event for the id (later duplicates
/// are ignored); price, active flag and sales count track the subsequent
/// mutation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    pub sample_id: u64,
    pub seller: AccountId,
    pub price: U512,
    pub ipfs_link: String,
    pub title: String,
    pub bpm: u64,
    pub genre: String,
    pub cover_image: String,
    pub video_preview_link: String,
    pub total_sales: u64,
    pub is_active: bool,
    pub created_at: u64,
}

/// One sale. No deduplication: a buyer appears once per purchase event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseRecord {
    pub sample_id: u64,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub price: U512,
    pub platform_fee: U512,
    pub timestamp: u64,
}

/// One minted license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseRecord {
    pub license_id: u64,
    pub sample_id: u64,
    pub license_type: LicenseType,
    pub buyer: AccountId,
    pub creator: AccountId,
    pub price: U512,
    pub timestamp: u64,
}

/// A user's license together with its catalog sample, when still known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserLicense {
    pub license: LicenseRecord,
    pub sample: Option<SampleRecord>,
}

/// Marketplace-wide totals. Sums are exact U512 arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MarketStats {
    pub total_uploads: u64,
    pub total_purchases: u64,
    pub total_volume: U512,
    pub platform_fee_collected: U512,
}

/// Folds the log into the catalog, ordered by descending sample id.
pub fn fold_catalog(events: &[MarketEvent]) -> Vec<SampleRecord> {
    let mut catalog: BTreeMap<u64, SampleRecord> = BTreeMap::new();

    for event in events {
        match event {
            MarketEvent::SampleUploaded(e) => {
                // first-seen wins
                catalog.entry(e.sample_id).or_insert_with(|| SampleRecord {
                    sample_id: e.sample_id,
                    seller: e.seller,
                    price: e.price,
                    ipfs_link: e.ipfs_link.clone(),
                    title: e.title.clone(),
                    bpm: e.bpm,
                    genre: e.genre.clone(),
                    cover_image: e.cover_image.clone(),
                    video_preview_link: e.video_preview_link.clone(),
                    total_sales: 0,
                    is_active: true,
                    created_at: e.timestamp,
                });
            }
            MarketEvent::SamplePurchased(e) => {
                if let Some(sample) = catalog.get_mut(&e.sample_id) {
                    sample.total_sales += 1;
                }
            }
            MarketEvent::PriceUpdated(e) => {
                if let Some(sample) = catalog.get_mut(&e.sample_id) {
                    sample.price = e.new_price;
                }
            }
            MarketEvent::SampleDeactivated(e) => {
                if let Some(sample) = catalog.get_mut(&e.sample_id) {
                    sample.is_active = false;
                }
            }
            _ => {}
        }
    }

    catalog.into_values().rev().collect()
}

pub fn fold_purchases(events: &[MarketEvent]) -> Vec<PurchaseRecord> {
    events
        .iter()
        .filter_map(|event| match event {
            MarketEvent::SamplePurchased(e) => Some(PurchaseRecord {
                sample_id: e.sample_id,
                buyer: e.buyer,
                seller: e.seller,
                price: e.price,
                platform_fee: e.platform_fee,
                timestamp: e.timestamp,
            }),
            _ => None,
        })
        .collect()
}

pub fn fold_licenses(events: &[MarketEvent]) -> Vec<LicenseRecord> {
    events
        .iter()
        .filter_map(|event| match event {
            MarketEvent::LicenseMinted(e) => Some(LicenseRecord {
                license_id: e.license_id,
                sample_id: e.sample_id,
                license_type: e.license_type,
                buyer: e.buyer,
                creator: e.creator,
                price: e.price,
                timestamp: e.timestamp,
            }),
            _ => None,
        })
        .collect()
}

pub fn fold_stats(events: &[MarketEvent]) -> MarketStats {
    let mut stats = MarketStats::default();
    for event in events {
        match event {
            MarketEvent::SampleUploaded(_) => stats.total_uploads += 1,
            MarketEvent::SamplePurchased(e) => {
                stats.total_purchases += 1;
                stats.total_volume += e.price;
                stats.platform_fee_collected += e.platform_fee;
            }
            _ => {}
        }
    }
    stats
}

/// Net earnings of `seller`: Σ (price − platform_fee) over their sales.
///
/// A record whose fee exceeds its price is inconsistent; it contributes
/// nothing instead of aborting the fold.
pub fn fold_earnings(events: &[MarketEvent], seller: &AccountId) -> U512 {
    events
        .iter()
        .filter_map(|event| match event {
            MarketEvent::SamplePurchased(e) if e.seller == *seller => {
                e.price.checked_sub(e.platform_fee)
            }
            _ => None,
        })
        .fold(U512::zero(), |acc, amount| acc + amount)
}

/// Queryable marketplace views over an [`EventLog`].
pub struct MarketView<R: ?Sized, C = SystemClock> {
    log: EventLog<R, C>,
}

impl<R: NodeRpc + ?Sized, C: Clock> MarketView<R, C> {
    pub fn new(log: EventLog<R, C>) -> Self {
        Self { log }
    }

    /// Replays the full log into decoded events.
    ///
    /// Indices that cannot be fetched are skipped (the node may lag);
    /// unrecognized records decode to `Unknown` and fall through the folds.
    pub async fn replay(&self) -> Vec<MarketEvent> {
        let count = self.log.event_count().await;
        let mut events = Vec::with_capacity(count as usize);
        for index in 0..count {
            if let Some(bytes) = self.log.event(index).await {
                events.push(parse_event_data(&bytes));
            }
        }
        events
    }

    /// All known samples, newest id first.
    pub async fn catalog(&self) -> Vec<SampleRecord> {
        fold_catalog(&self.replay().await)
    }

    /// A single sample by id.
    pub async fn sample(&self, sample_id: u64) -> Option<SampleRecord> {
        self.catalog()
            .await
            .into_iter()
            .find(|s| s.sample_id == sample_id)
    }

    /// Samples uploaded by `seller`.
    pub async fn uploads_of(&self, seller: &AccountId) -> Vec<SampleRecord> {
        self.catalog()
            .await
            .into_iter()
            .filter(|s| s.seller == *seller)
            .collect()
    }

    /// Catalog entries `buyer` has purchased at least once.
    pub async fn purchases_of(&self, buyer: &AccountId) -> Vec<SampleRecord> {
        let events = self.replay().await;
        let purchased: Vec<u64> = fold_purchases(&events)
            .into_iter()
            .filter(|p| p.buyer == *buyer)
            .map(|p| p.sample_id)
            .collect();
        fold_catalog(&events)
            .into_iter()
            .filter(|s| purchased.contains(&s.sample_id))
            .collect()
    }

    /// `buyer`'s licenses, newest license id first, enriched with the
    /// matching catalog sample when present.
    pub async fn licenses_of(&self, buyer: &AccountId) -> Vec<UserLicense> {
        let events = self.replay().await;
        let catalog = fold_catalog(&events);
        let mut licenses: Vec<UserLicense> = fold_licenses(&events)
            .into_iter()
            .filter(|l| l.buyer == *buyer)
            .map(|license| {
                let sample = catalog
                    .iter()
                    .find(|s| s.sample_id == license.sample_id)
                    .cloned();
                UserLicense { license, sample }
            })
            .collect();
        licenses.sort_by(|a, b| b.license.license_id.cmp(&a.license.license_id));
        licenses
    }

    /// Marketplace-wide totals.
    pub async fn stats(&self) -> MarketStats {
        fold_stats(&self.replay().await)
    }

    /// Net earnings accumulated by `seller`.
    pub async fn earnings_of(&self, seller: &AccountId) -> U512 {
        fold_earnings(&self.replay().await, seller)
    }

    /// Whether `buyer` bought `sample_id` at least once.
    pub async fn has_purchased(&self, buyer: &AccountId, sample_id: u64) -> bool {
        self.replay().await.iter().any(|event| {
            matches!(event, MarketEvent::SamplePurchased(e)
                if e.buyer == *buyer && e.sample_id == sample_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{SampleDeactivated, SamplePurchased, SampleUploaded};

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 32])
    }

    fn upload(sample_id: u64, seller: AccountId, price: u64) -> MarketEvent {
        MarketEvent::SampleUploaded(SampleUploaded {
            sample_id,
            seller,
            price: U512::from(price),
            ipfs_link: format!("ipfs://audio-{sample_id}"),
            title: format!("Sample {sample_id}"),
            bpm: 120,
            genre: "Techno".into(),
            cover_image: format!("ipfs://cover-{sample_id}"),
            video_preview_link: String::new(),
            timestamp: 1_000 + sample_id,
        })
    }

    fn purchase(sample_id: u64, buyer: AccountId, seller: AccountId, price: u64) -> MarketEvent {
        MarketEvent::SamplePurchased(SamplePurchased {
            sample_id,
            buyer,
            seller,
            price: U512::from(price),
            platform_fee: U512::from(price / 10),
            timestamp: 2_000,
        })
    }

    #[test]
    fn duplicate_upload_ids_keep_the_first_record() {
        let seller = account(1);
        let imposter = account(2);
        let events = vec![upload(5, seller, 100), upload(5, imposter, 999)];

        let catalog = fold_catalog(&events);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].seller, seller);
        assert_eq!(catalog[0].price, U512::from(100u64));
    }

    #[test]
    fn catalog_is_ordered_by_descending_id_and_tracks_mutations() {
        let seller = account(1);
        let buyer = account(2);
        let mut events = vec![upload(1, seller, 100), upload(2, seller, 200)];
        events.push(purchase(1, buyer, seller, 100));
        events.push(MarketEvent::SampleDeactivated(SampleDeactivated {
            sample_id: 2,
            seller,
            timestamp: 3_000,
        }));

        let catalog = fold_catalog(&events);
        assert_eq!(
            catalog.iter().map(|s| s.sample_id).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert!(!catalog[0].is_active);
        assert_eq!(catalog[1].total_sales, 1);
    }

    #[test]
    fn empty_log_folds_to_empty_views() {
        let events: Vec<MarketEvent> = Vec::new();
        assert!(fold_catalog(&events).is_empty());
        assert!(fold_purchases(&events).is_empty());
        assert!(fold_licenses(&events).is_empty());
        assert_eq!(fold_stats(&events), MarketStats::default());
        assert_eq!(fold_earnings(&events, &account(1)), U512::zero());
    }

    #[test]
    fn stats_sum_exactly_past_float_precision() {
        let seller = account(1);
        let buyer = account(2);
        // each purchase is 2^60 motes; ten of them blow past 2^53
        let price = 1u64 << 60;
        let events: Vec<MarketEvent> = (0..10)
            .map(|i| {
                MarketEvent::SamplePurchased(SamplePurchased {
                    sample_id: i,
                    buyer,
                    seller,
                    price: U512::from(price),
                    platform_fee: U512::from(price / 10),
                    timestamp: 0,
                })
            })
            .collect();

        let stats = fold_stats(&events);
        assert_eq!(stats.total_purchases, 10);
        assert_eq!(stats.total_volume, U512::from(price) * U512::from(10u64));
        assert_eq!(
            stats.platform_fee_collected,
            U512::from(price / 10) * U512::from(10u64)
        );
    }

    #[test]
    fn earnings_are_price_minus_fee_for_the_matching_seller() {
        let seller = account(1);
        let other = account(3);
        let buyer = account(2);
        let events = vec![
            purchase(1, buyer, seller, 1_000),
            purchase(2, buyer, other, 5_000),
            purchase(3, buyer, seller, 1_000),
        ];

        assert_eq!(fold_earnings(&events, &seller), U512::from(1_800u64));
        assert_eq!(fold_earnings(&events, &other), U512::from(4_500u64));
    }

    #[test]
    fn fee_above_price_is_skipped_instead_of_underflowing() {
        let seller = account(1);
        let buyer = account(2);
        let events = vec![
            MarketEvent::SamplePurchased(SamplePurchased {
                sample_id: 1,
                buyer,
                seller,
                price: U512::from(100u64),
                platform_fee: U512::from(101u64),
                timestamp: 0,
            }),
            purchase(2, buyer, seller, 1_000),
        ];

        assert_eq!(fold_earnings(&events, &seller), U512::from(900u64));
    }
}
