//! License types and their pricing rules.
//!
//! Pure arithmetic, no I/O. Prices are motes and every computation is exact
//! integer math; floating point would round ledger-unit amounts.

use ethereum_types::U512;
use serde::{Deserialize, Serialize};

/// Usage rights tiers for a sample license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseType {
    /// Personal use only.
    #[default]
    Personal = 0,
    /// Commercial releases, buyer keeps royalties.
    Commercial = 1,
    /// TV, radio, streaming and advertisement use.
    Broadcast = 2,
    /// Exclusive rights; the sample leaves the marketplace.
    Exclusive = 3,
}

impl LicenseType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LicenseType::Personal),
            1 => Some(LicenseType::Commercial),
            2 => Some(LicenseType::Broadcast),
            3 => Some(LicenseType::Exclusive),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Percentage multipliers per license type, 100 = 1x the base price.
///
/// Sellers may override these per sample on-chain; the defaults mirror the
/// contract's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LicensePricing {
    pub personal_multiplier: u64,
    pub commercial_multiplier: u64,
    pub broadcast_multiplier: u64,
    pub exclusive_multiplier: u64,
}

impl Default for LicensePricing {
    fn default() -> Self {
        Self {
            personal_multiplier: 100,
            commercial_multiplier: 250,
            broadcast_multiplier: 500,
            exclusive_multiplier: 2000,
        }
    }
}

impl LicensePricing {
    pub fn multiplier(&self, license_type: LicenseType) -> u64 {
        match license_type {
            LicenseType::Personal => self.personal_multiplier,
            LicenseType::Commercial => self.commercial_multiplier,
            LicenseType::Broadcast => self.broadcast_multiplier,
            LicenseType::Exclusive => self.exclusive_multiplier,
        }
    }

    /// `floor(base_price * multiplier / 100)` in exact integer arithmetic.
    pub fn price(&self, base_price: U512, license_type: LicenseType) -> U512 {
        base_price * U512::from(self.multiplier(license_type)) / U512::from(100u64)
    }

    /// All four license prices for one sample.
    pub fn all_prices(&self, base_price: U512) -> AllLicensePrices {
        AllLicensePrices {
            personal: self.price(base_price, LicenseType::Personal),
            commercial: self.price(base_price, LicenseType::Commercial),
            broadcast: self.price(base_price, LicenseType::Broadcast),
            exclusive: self.price(base_price, LicenseType::Exclusive),
        }
    }
}

/// Convenience bundle of every license price for a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllLicensePrices {
    pub personal: U512,
    pub commercial: U512,
    pub broadcast: U512,
    pub exclusive: U512,
}
