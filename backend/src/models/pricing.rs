//! Tour pricing configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TourId;

/// One band of seat-based pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatTier {
    pub min_seats: u32,
    /// Open-ended when absent.
    #[serde(default)]
    pub max_seats: Option<u32>,
    pub price_per_seat: i64,
}

impl SeatTier {
    pub fn contains(&self, seats: u32) -> bool {
        seats >= self.min_seats && self.max_seats.map_or(true, |max| seats <= max)
    }
}

/// How a tour's base price is computed. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PricingConfig {
    FlatPerPerson { price_per_person: i64 },
    AdultChild { adult_price: i64, child_price: i64 },
    SeatTiers { tiers: Vec<SeatTier> },
}

impl PricingConfig {
    /// Lowest price per participant, shown as "from" on listings.
    pub fn starting_price(&self) -> Option<i64> {
        match self {
            PricingConfig::FlatPerPerson { price_per_person } => Some(*price_per_person),
            PricingConfig::AdultChild {
                adult_price,
                child_price,
            } => Some((*adult_price).min(*child_price)),
            PricingConfig::SeatTiers { tiers } => tiers.iter().map(|t| t.price_per_seat).min(),
        }
    }

    /// Structural checks run before the configuration is stored.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            PricingConfig::FlatPerPerson { price_per_person } => {
                if *price_per_person < 0 {
                    return Err("price_per_person must not be negative".to_string());
                }
            }
            PricingConfig::AdultChild {
                adult_price,
                child_price,
            } => {
                if *adult_price < 0 || *child_price < 0 {
                    return Err("adult and child prices must not be negative".to_string());
                }
            }
            PricingConfig::SeatTiers { tiers } => {
                if tiers.is_empty() {
                    return Err("seat pricing needs at least one tier".to_string());
                }
                for tier in tiers {
                    if tier.price_per_seat < 0 {
                        return Err("price_per_seat must not be negative".to_string());
                    }
                    if tier.min_seats == 0 {
                        return Err("min_seats must be at least 1".to_string());
                    }
                    if let Some(max) = tier.max_seats {
                        if max < tier.min_seats {
                            return Err(format!(
                                "tier max_seats {} is below min_seats {}",
                                max, tier.min_seats
                            ));
                        }
                    }
                }
                let mut sorted: Vec<&SeatTier> = tiers.iter().collect();
                sorted.sort_by_key(|t| t.min_seats);
                for pair in sorted.windows(2) {
                    let overlaps = pair[0].max_seats.map_or(true, |max| max >= pair[1].min_seats);
                    if overlaps {
                        return Err(format!(
                            "seat tiers starting at {} and {} overlap",
                            pair[0].min_seats, pair[1].min_seats
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Stored pricing for a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourPricing {
    pub tour_id: TourId,
    pub config: PricingConfig,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(min: u32, max: Option<u32>, price: i64) -> SeatTier {
        SeatTier {
            min_seats: min,
            max_seats: max,
            price_per_seat: price,
        }
    }

    #[test]
    fn test_pricing_config_tagged_json() {
        let json = r#"{"type":"adult_child","adult_price":5000,"child_price":2500}"#;
        let config: PricingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            PricingConfig::AdultChild {
                adult_price: 5000,
                child_price: 2500
            }
        );
        assert_eq!(config.starting_price(), Some(2500));
    }

    #[test]
    fn test_seat_tiers_validation_detects_overlap() {
        let ok = PricingConfig::SeatTiers {
            tiers: vec![tier(1, Some(3), 4000), tier(4, None, 3000)],
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.starting_price(), Some(3000));

        let overlapping = PricingConfig::SeatTiers {
            tiers: vec![tier(1, Some(4), 4000), tier(4, None, 3000)],
        };
        assert!(overlapping.validate().is_err());

        let open_first = PricingConfig::SeatTiers {
            tiers: vec![tier(1, None, 4000), tier(5, None, 3000)],
        };
        assert!(open_first.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_and_empty() {
        assert!(PricingConfig::FlatPerPerson {
            price_per_person: -1
        }
        .validate()
        .is_err());
        assert!(PricingConfig::SeatTiers { tiers: vec![] }.validate().is_err());
        assert!(PricingConfig::SeatTiers {
            tiers: vec![tier(0, None, 100)]
        }
        .validate()
        .is_err());
    }
}
