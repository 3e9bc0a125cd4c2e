//! Price breakdown for a booking draft.
//!
//! The breakdown is a pure function of the draft, the vertical's pricing
//! profile and its add-on catalog. Forms call [`price`] again after every
//! relevant edit instead of patching a previous result.

use serde::{Deserialize, Serialize};

use crate::models::{AddOnCatalog, BookingDraft, BookingFlag, Money, ServiceLocation};

/// What the unit price is multiplied by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityDimension {
    /// Room bookings: price per guest per hour.
    GuestsTimesHours,
    /// Sitting: hourly rate.
    Hours,
    Guests,
    /// Service packages: one flat price.
    Flat,
}

impl QuantityDimension {
    /// Multiplier for the draft's unit price. Missing or non-positive
    /// quantities count as zero so a partial draft never prices negative.
    pub fn multiplier(self, draft: &BookingDraft) -> i64 {
        let guests = draft.quantity.map(i64::from).unwrap_or(0);
        let hours = draft.duration_hours().unwrap_or(0).max(0);
        match self {
            QuantityDimension::GuestsTimesHours => guests * hours,
            QuantityDimension::Hours => hours,
            QuantityDimension::Guests => guests,
            QuantityDimension::Flat => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", content = "value", rename_all = "snake_case")]
pub enum FeeCondition {
    Flag(BookingFlag),
    Location(ServiceLocation),
}

impl FeeCondition {
    pub fn matches(&self, draft: &BookingDraft) -> bool {
        match self {
            FeeCondition::Flag(flag) => draft.has_flag(*flag),
            FeeCondition::Location(location) => draft.location == Some(*location),
        }
    }
}

/// A flat surcharge applied when its condition holds for the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRule {
    pub label: String,
    pub condition: FeeCondition,
    pub amount: Money,
}

impl FeeRule {
    pub fn new(label: &str, condition: FeeCondition, amount: Money) -> Self {
        Self {
            label: label.to_string(),
            condition,
            amount,
        }
    }
}

/// Per-vertical pricing rules, supplied as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingProfile {
    pub dimension: QuantityDimension,
    pub fee_rules: Vec<FeeRule>,
}

impl PricingProfile {
    pub fn new(dimension: QuantityDimension) -> Self {
        Self {
            dimension,
            fee_rules: Vec::new(),
        }
    }

    pub fn with_fee(mut self, rule: FeeRule) -> Self {
        self.fee_rules.push(rule);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_price: Money,
    pub quantity_multiplier: i64,
    pub add_ons_total: Money,
    pub flat_fees: Money,
    pub applied_fees: Vec<String>,
    pub discount_amount: Money,
    pub total: Money,
}

impl PriceBreakdown {
    pub fn base_total(&self) -> Money {
        self.base_price * self.quantity_multiplier
    }

    pub fn subtotal(&self) -> Money {
        self.base_total() + self.add_ons_total + self.flat_fees
    }
}

pub fn price(draft: &BookingDraft, profile: &PricingProfile, add_ons: &AddOnCatalog) -> PriceBreakdown {
    let base_price = draft.unit_price.unwrap_or(Money::ZERO);
    let quantity_multiplier = profile.dimension.multiplier(draft);
    let add_ons_total = add_ons.total_for(&draft.add_on_ids);

    let matched: Vec<&FeeRule> = profile
        .fee_rules
        .iter()
        .filter(|rule| rule.condition.matches(draft))
        .collect();
    let flat_fees: Money = matched.iter().map(|rule| rule.amount).sum();
    let applied_fees: Vec<String> = matched.iter().map(|rule| rule.label.clone()).collect();

    let subtotal = base_price * quantity_multiplier + add_ons_total + flat_fees;
    let discount_amount = draft.discount.amount_of(subtotal);

    PriceBreakdown {
        base_price,
        quantity_multiplier,
        add_ons_total,
        flat_fees,
        applied_fees,
        discount_amount,
        total: subtotal - discount_amount,
    }
}

// ── Tests ──
