use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{AddOn, AddOnCatalog, BookingFlag, Money, ResourceKind, ServiceLocation};
use crate::pricing::{FeeCondition, FeeRule, PricingProfile, QuantityDimension};
use crate::slots::SlotCatalog;
use crate::validation::Schema;

/// Surcharge for sitting that runs overnight.
pub const OVERNIGHT_FEE: Money = Money::from_units(50);
/// Surcharge when the service happens at the owner's home.
pub const HOME_VISIT_FEE: Money = Money::from_units(10);

/// Line of business a booking form belongs to. Everything that differs
/// between the forms is data hanging off this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Clinic,
    Grooming,
    Sitting,
    Training,
    Cafe,
}

impl Vertical {
    pub const ALL: [Vertical; 5] = [
        Vertical::Clinic,
        Vertical::Grooming,
        Vertical::Sitting,
        Vertical::Training,
        Vertical::Cafe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Vertical::Clinic => "clinic",
            Vertical::Grooming => "grooming",
            Vertical::Sitting => "sitting",
            Vertical::Training => "training",
            Vertical::Cafe => "cafe",
        }
    }

    /// How many days ahead the date picker allows.
    pub fn horizon_days(self) -> u32 {
        match self {
            Vertical::Clinic => 30,
            Vertical::Grooming => 21,
            Vertical::Sitting => 30,
            Vertical::Training => 30,
            Vertical::Cafe => 14,
        }
    }

    pub fn slot_catalog(self) -> SlotCatalog {
        match self {
            Vertical::Clinic => SlotCatalog::preset(9, 17, 60),
            Vertical::Grooming | Vertical::Training => SlotCatalog::preset(9, 18, 60),
            Vertical::Sitting => SlotCatalog::default(),
            Vertical::Cafe => SlotCatalog::preset(10, 22, 60),
        }
    }

    pub fn pricing_profile(self) -> PricingProfile {
        let home_visit = FeeRule::new(
            "Home visit",
            FeeCondition::Location(ServiceLocation::OwnersHome),
            HOME_VISIT_FEE,
        );
        match self {
            Vertical::Clinic => PricingProfile::new(QuantityDimension::Flat),
            Vertical::Grooming | Vertical::Training => {
                PricingProfile::new(QuantityDimension::Flat).with_fee(home_visit)
            }
            Vertical::Sitting => PricingProfile::new(QuantityDimension::Hours)
                .with_fee(FeeRule::new(
                    "Overnight",
                    FeeCondition::Flag(BookingFlag::Overnight),
                    OVERNIGHT_FEE,
                ))
                .with_fee(home_visit),
            Vertical::Cafe => PricingProfile::new(QuantityDimension::GuestsTimesHours),
        }
    }

    /// Built-in add-ons, used until the API supplies a catalog.
    pub fn add_on_catalog(self) -> AddOnCatalog {
        let items = match self {
            Vertical::Clinic => vec![
                AddOn::new("vaccination", "Vaccination", Money::from_units(30)),
                AddOn::new("microchip", "Microchipping", Money::from_units(25)),
            ],
            Vertical::Grooming => vec![
                AddOn::new("nailTrim", "Nail trim", Money::from_units(10)),
                AddOn::new("teethBrushing", "Teeth brushing", Money::from_units(12)),
                AddOn::new("earCleaning", "Ear cleaning", Money::from_units(8)),
                AddOn::new("fleaTreatment", "Flea treatment", Money::from_units(15)),
            ],
            Vertical::Sitting => vec![
                AddOn::new("extraWalk", "Extra walk", Money::from_units(8)),
                AddOn::new("medication", "Medication", Money::from_units(5)),
                AddOn::new("petTaxi", "Pet taxi", Money::from_units(20)),
            ],
            Vertical::Training => vec![
                AddOn::new("progressReport", "Progress report", Money::from_units(10)),
            ],
            Vertical::Cafe => vec![
                AddOn::new("snackPlatter", "Snack platter", Money::from_units(12)),
                AddOn::new("petTreats", "Pet treats", Money::from_units(5)),
            ],
        };
        AddOnCatalog::new(items)
    }

    pub fn schema(self) -> Schema {
        match self {
            Vertical::Clinic => Schema {
                resource_kind: Some(ResourceKind::Doctor),
                requires_location: false,
                max_quantity: 1,
            },
            Vertical::Grooming => Schema {
                resource_kind: None,
                requires_location: true,
                max_quantity: 3,
            },
            Vertical::Sitting => Schema {
                resource_kind: Some(ResourceKind::Sitter),
                requires_location: true,
                max_quantity: 3,
            },
            Vertical::Training => Schema {
                resource_kind: None,
                requires_location: true,
                max_quantity: 1,
            },
            Vertical::Cafe => Schema {
                resource_kind: Some(ResourceKind::Room),
                requires_location: false,
                max_quantity: 8,
            },
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
