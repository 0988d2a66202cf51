use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(McNumber);
string_id!(PhoneNumber);
string_id!(LogEntryId);

impl PhoneNumber {
    /// A number the dialer can act on: non-blank and not the placeholder `"0"`
    /// that scrape results use for carriers without a listed phone.
    pub fn is_dialable(&self) -> bool {
        let trimmed = self.0.trim();
        !trimmed.is_empty() && trimmed != "0"
    }
}

/// One regulatory entity. All fields are kept as the service sends them
/// (numeric columns included), keyed by MC number; parsing happens at the
/// point of comparison, not at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierRecord {
    #[serde(rename = "MC Number")]
    pub mc_number: McNumber,
    #[serde(rename = "Mailing Address")]
    pub mailing_address: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Phone")]
    pub phone: PhoneNumber,
    #[serde(rename = "Drivers")]
    pub drivers: String,
    #[serde(rename = "Power Units")]
    pub power_units: String,
    #[serde(rename = "MC Age")]
    pub mc_age: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "Carrier Operation")]
    pub carrier_operation: String,
    #[serde(rename = "Straight Trucks")]
    pub straight_trucks: String,
    #[serde(rename = "Truck Tractors")]
    pub truck_tractors: String,
    #[serde(rename = "Trailers")]
    pub trailers: String,
}

/// The numeric columns a filter predicate can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Drivers,
    PowerUnits,
    McAge,
    StraightTrucks,
    TruckTractors,
    Trailers,
}

impl CarrierRecord {
    pub fn numeric_value(&self, field: NumericField) -> &str {
        match field {
            NumericField::Drivers => &self.drivers,
            NumericField::PowerUnits => &self.power_units,
            NumericField::McAge => &self.mc_age,
            NumericField::StraightTrucks => &self.straight_trucks,
            NumericField::TruckTractors => &self.truck_tractors,
            NumericField::Trailers => &self.trailers,
        }
    }
}

/// One entry per distinct phone number called this session, not one per call.
/// `carrier_name` is the MC number active at the time of the first call and is
/// never re-derived on later calls to the same number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogEntry {
    pub id: LogEntryId,
    pub phone_number: PhoneNumber,
    pub carrier_name: McNumber,
    pub call_count: u32,
    pub last_called: DateTime<Utc>,
}
