//! Price quotes for a booking request.
//!
//! A quote is a list of line items plus their total, all in minor currency
//! units. The same quote is shown on the tour page and persisted as the
//! booking's line items at checkout.

use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::models::{
    BookingItem, BookingItemKind, Package, PackageId, PricingConfig, Upsell, UpsellId,
};

/// Largest head count a single booking may carry.
pub const MAX_PARTICIPANTS: u32 = 500;

/// Head count of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Participants {
    #[serde(default)]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
}

impl Participants {
    /// Total head count, rejecting sums above [`MAX_PARTICIPANTS`].
    pub fn total(&self) -> ServiceResult<u32> {
        self.adults
            .checked_add(self.children)
            .filter(|total| *total <= MAX_PARTICIPANTS)
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "At most {} participants per booking",
                    MAX_PARTICIPANTS
                ))
            })
    }
}

/// An upsell chosen by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellSelection {
    pub upsell_id: UpsellId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// What the customer asked for, as submitted by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub participants: Participants,
    #[serde(default)]
    pub package_id: Option<PackageId>,
    #[serde(default)]
    pub upsells: Vec<UpsellSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub lines: Vec<BookingItem>,
    pub subtotal: i64,
    pub total: i64,
    pub currency: String,
}

fn amount_overflow() -> ServiceError {
    ServiceError::validation("Order amount is too large")
}

fn line(
    kind: BookingItemKind,
    description: impl Into<String>,
    quantity: u32,
    unit: i64,
) -> ServiceResult<BookingItem> {
    let total = unit
        .checked_mul(i64::from(quantity))
        .ok_or_else(amount_overflow)?;
    Ok(BookingItem {
        kind,
        description: description.into(),
        quantity,
        unit_price: unit,
        total,
    })
}

fn base_lines(pricing: &PricingConfig, participants: Participants) -> ServiceResult<Vec<BookingItem>> {
    let seats = participants.total()?;
    match pricing {
        PricingConfig::FlatPerPerson { price_per_person } => Ok(vec![line(
            BookingItemKind::Base,
            "Participants",
            seats,
            *price_per_person,
        )?]),
        PricingConfig::AdultChild {
            adult_price,
            child_price,
        } => {
            if participants.adults == 0 {
                return Err(ServiceError::validation(
                    "At least one adult is required",
                ));
            }
            let mut lines = vec![line(
                BookingItemKind::Adult,
                "Adults",
                participants.adults,
                *adult_price,
            )?];
            if participants.children > 0 {
                lines.push(line(
                    BookingItemKind::Child,
                    "Children",
                    participants.children,
                    *child_price,
                )?);
            }
            Ok(lines)
        }
        PricingConfig::SeatTiers { tiers } => {
            let tier = tiers.iter().find(|t| t.contains(seats)).ok_or_else(|| {
                ServiceError::validation(format!("No price tier for {} seats", seats))
            })?;
            Ok(vec![line(
                BookingItemKind::Seat,
                "Seats",
                seats,
                tier.price_per_seat,
            )?])
        }
    }
}

/// Price a booking request.
///
/// `package` and `upsells` are the tour's stored records; the selections in
/// `request` must refer to them.
pub fn quote(
    pricing: &PricingConfig,
    request: &QuoteRequest,
    package: Option<&Package>,
    upsells: &[Upsell],
    currency: &str,
) -> ServiceResult<PriceQuote> {
    let participants = request.participants;
    let seats = participants.total()?;
    if seats == 0 {
        return Err(ServiceError::validation(
            "At least one participant is required",
        ));
    }

    let mut lines = match (request.package_id, package) {
        (Some(requested), Some(package)) if package.id == requested => {
            if !package.active {
                return Err(ServiceError::validation(format!(
                    "Package '{}' is not available",
                    package.name
                )));
            }
            if let Some(max) = package.max_participants {
                if seats > max {
                    return Err(ServiceError::validation(format!(
                        "Package '{}' allows at most {} participants",
                        package.name, max
                    )));
                }
            }
            vec![line(BookingItemKind::Package, package.name.clone(), 1, package.price)?]
        }
        (Some(requested), _) => {
            return Err(ServiceError::validation(format!(
                "Package {} does not belong to this tour",
                requested
            )))
        }
        (None, _) => base_lines(pricing, participants)?,
    };

    for selection in &request.upsells {
        if selection.quantity == 0 {
            continue;
        }
        let upsell = upsells
            .iter()
            .find(|u| u.id == selection.upsell_id)
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "Upsell {} does not belong to this tour",
                    selection.upsell_id
                ))
            })?;
        if !upsell.active {
            return Err(ServiceError::validation(format!(
                "Upsell '{}' is not available",
                upsell.name
            )));
        }
        let quantity = if upsell.per_person {
            selection.quantity.checked_mul(seats)
        } else {
            Some(selection.quantity)
        }
        .ok_or_else(amount_overflow)?;
        lines.push(line(
            BookingItemKind::Upsell,
            upsell.name.clone(),
            quantity,
            upsell.price,
        )?);
    }

    let subtotal = lines
        .iter()
        .try_fold(0i64, |sum, l| sum.checked_add(l.total))
        .ok_or_else(amount_overflow)?;
    Ok(PriceQuote {
        lines,
        subtotal,
        total: subtotal,
        currency: currency.to_uppercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeatTier, TourId};

    fn request(adults: u32, children: u32) -> QuoteRequest {
        QuoteRequest {
            participants: Participants { adults, children },
            ..Default::default()
        }
    }

    fn upsell(id: i64, price: i64, per_person: bool, active: bool) -> Upsell {
        Upsell {
            id: UpsellId(id),
            tour_id: TourId(1),
            name: format!("Extra {}", id),
            description: String::new(),
            price,
            per_person,
            active,
        }
    }

    fn package(max: Option<u32>, active: bool) -> Package {
        Package {
            id: PackageId(9),
            tour_id: TourId(1),
            name: "Family".to_string(),
            description: String::new(),
            price: 12000,
            max_participants: max,
            active,
        }
    }

    #[test]
    fn test_flat_per_person() {
        let pricing = PricingConfig::FlatPerPerson {
            price_per_person: 3500,
        };
        let quote = quote(&pricing, &request(2, 1), None, &[], "eur").unwrap();
        assert_eq!(quote.total, 10500);
        assert_eq!(quote.currency, "EUR");
        assert_eq!(quote.lines.len(), 1);
        assert_eq!(quote.lines[0].quantity, 3);
    }

    #[test]
    fn test_adult_child_requires_adult() {
        let pricing = PricingConfig::AdultChild {
            adult_price: 5000,
            child_price: 2500,
        };
        let quote = quote(&pricing, &request(2, 2), None, &[], "EUR").unwrap();
        assert_eq!(quote.total, 15000);
        assert_eq!(quote.lines[1].kind, BookingItemKind::Child);

        let err = super::quote(&pricing, &request(0, 2), None, &[], "EUR").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_seat_tiers_pick_matching_band() {
        let pricing = PricingConfig::SeatTiers {
            tiers: vec![
                SeatTier {
                    min_seats: 1,
                    max_seats: Some(3),
                    price_per_seat: 4000,
                },
                SeatTier {
                    min_seats: 4,
                    max_seats: Some(8),
                    price_per_seat: 3000,
                },
            ],
        };
        assert_eq!(quote(&pricing, &request(2, 0), None, &[], "EUR").unwrap().total, 8000);
        assert_eq!(quote(&pricing, &request(3, 2), None, &[], "EUR").unwrap().total, 15000);
        assert!(quote(&pricing, &request(9, 0), None, &[], "EUR").is_err());
    }

    #[test]
    fn test_package_replaces_base_price() {
        let pricing = PricingConfig::FlatPerPerson {
            price_per_person: 3500,
        };
        let mut req = request(2, 2);
        req.package_id = Some(PackageId(9));

        let q = quote(&pricing, &req, Some(&package(Some(4), true)), &[], "EUR").unwrap();
        assert_eq!(q.total, 12000);
        assert_eq!(q.lines[0].kind, BookingItemKind::Package);

        assert!(quote(&pricing, &req, Some(&package(Some(3), true)), &[], "EUR").is_err());
        assert!(quote(&pricing, &req, Some(&package(None, false)), &[], "EUR").is_err());
        assert!(quote(&pricing, &req, None, &[], "EUR").is_err());
    }

    #[test]
    fn test_upsells_per_person_and_per_booking() {
        let pricing = PricingConfig::FlatPerPerson {
            price_per_person: 1000,
        };
        let upsells = vec![upsell(1, 500, true, true), upsell(2, 2000, false, true)];
        let mut req = request(2, 1);
        req.upsells = vec![
            UpsellSelection {
                upsell_id: UpsellId(1),
                quantity: 1,
            },
            UpsellSelection {
                upsell_id: UpsellId(2),
                quantity: 2,
            },
        ];
        let q = quote(&pricing, &req, None, &upsells, "EUR").unwrap();
        // 3 * 1000 + 3 * 500 + 2 * 2000
        assert_eq!(q.total, 8500);
        assert_eq!(q.lines.len(), 3);
    }

    #[test]
    fn test_rejects_inactive_or_foreign_upsell_and_zero_participants() {
        let pricing = PricingConfig::FlatPerPerson {
            price_per_person: 1000,
        };
        let upsells = vec![upsell(1, 500, false, false)];
        let mut req = request(1, 0);
        req.upsells = vec![UpsellSelection {
            upsell_id: UpsellId(1),
            quantity: 1,
        }];
        assert!(quote(&pricing, &req, None, &upsells, "EUR").is_err());

        req.upsells[0].upsell_id = UpsellId(77);
        assert!(quote(&pricing, &req, None, &upsells, "EUR").is_err());

        req.upsells[0].quantity = 0;
        assert!(quote(&pricing, &req, None, &upsells, "EUR").is_ok());

        assert!(quote(&pricing, &request(0, 0), None, &[], "EUR").is_err());
    }

    #[test]
    fn test_huge_head_counts_are_rejected_not_overflowed() {
        let pricing = PricingConfig::FlatPerPerson {
            price_per_person: 1000,
        };
        let err = quote(&pricing, &request(u32::MAX, 1), None, &[], "EUR").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = quote(&pricing, &request(MAX_PARTICIPANTS + 1, 0), None, &[], "EUR").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(quote(&pricing, &request(MAX_PARTICIPANTS, 0), None, &[], "EUR").is_ok());
    }

    #[test]
    fn test_amount_overflow_is_a_validation_error() {
        let pricing = PricingConfig::FlatPerPerson {
            price_per_person: i64::MAX / 2,
        };
        let err = quote(&pricing, &request(3, 0), None, &[], "EUR").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let pricing = PricingConfig::FlatPerPerson {
            price_per_person: 1000,
        };
        let upsells = vec![upsell(1, 500, true, true)];
        let mut req = request(2, 0);
        req.upsells = vec![UpsellSelection {
            upsell_id: UpsellId(1),
            quantity: u32::MAX,
        }];
        let err = quote(&pricing, &req, None, &upsells, "EUR").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let upsells = vec![upsell(1, i64::MAX, false, true)];
        req.upsells[0].quantity = 1;
        let err = quote(&pricing, &req, None, &upsells, "EUR").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
