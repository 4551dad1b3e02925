//! The trip record and its schema.
//!
//! Reports walk the fields generically through [FIELDS](static.FIELDS.html),
//! a table of (name, column, kind, accessor) entries.

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Text written in place of a blank numeric column. Parses to `f32::NAN`.
pub const MISSING_SENTINEL: &str = "NaN";

/// Number of columns of the input CSV.
pub const COLUMN_COUNT: usize = 7;

/// Fare paid for [sample_trip](fn.sample_trip.html). Reported next to the
/// prediction, never checked against it.
pub const SAMPLE_ACTUAL_FARE: f32 = 15.5;

/// One taxi trip, as read from the CSV by column position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub vendor_id: String,
    pub rate_code: f32,
    pub passenger_count: f32,
    /// Trip duration in seconds.
    pub trip_time: f32,
    pub trip_distance: f32,
    pub payment_type: String,
    pub fare_amount: f32,
}

impl TripRecord {
    /// Whether every field holds a value.
    pub fn is_complete(&self) -> bool {
        FIELDS.iter().all(|field| !field.is_missing(self))
    }
}

/// The trip used to try out a reloaded model.
pub fn sample_trip() -> TripRecord {
    TripRecord {
        vendor_id: String::from("VTS"),
        rate_code: 1.0,
        passenger_count: 1.0,
        trip_time: 1140.0,
        trip_distance: 3.75,
        payment_type: String::from("CRD"),
        fare_amount: 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Number,
}

/// The value of one field of a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f32),
}

impl<'a> FieldValue<'a> {
    /// NaN for numbers, blank or whitespace for text.
    pub fn is_missing(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(n) => n.is_nan(),
        }
    }

    /// Key used to group equal values together.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl<'a> fmt::Display for FieldValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Description of one column of the input.
pub struct FieldSpec {
    pub name: &'static str,
    pub column: usize,
    pub kind: FieldKind,
    accessor: for<'r> fn(&'r TripRecord) -> FieldValue<'r>,
}

impl FieldSpec {
    pub fn value<'r>(&self, record: &'r TripRecord) -> FieldValue<'r> {
        (self.accessor)(record)
    }

    pub fn is_missing(&self, record: &TripRecord) -> bool {
        self.value(record).is_missing()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Every field of [TripRecord](struct.TripRecord.html), in column order.
pub static FIELDS: [FieldSpec; COLUMN_COUNT] = [
    FieldSpec {
        name: "VendorId",
        column: 0,
        kind: FieldKind::Text,
        accessor: |r| FieldValue::Text(&r.vendor_id),
    },
    FieldSpec {
        name: "RateCode",
        column: 1,
        kind: FieldKind::Number,
        accessor: |r| FieldValue::Number(r.rate_code),
    },
    FieldSpec {
        name: "PassengerCount",
        column: 2,
        kind: FieldKind::Number,
        accessor: |r| FieldValue::Number(r.passenger_count),
    },
    FieldSpec {
        name: "TripTime",
        column: 3,
        kind: FieldKind::Number,
        accessor: |r| FieldValue::Number(r.trip_time),
    },
    FieldSpec {
        name: "TripDistance",
        column: 4,
        kind: FieldKind::Number,
        accessor: |r| FieldValue::Number(r.trip_distance),
    },
    FieldSpec {
        name: "PaymentType",
        column: 5,
        kind: FieldKind::Text,
        accessor: |r| FieldValue::Text(&r.payment_type),
    },
    FieldSpec {
        name: "FareAmount",
        column: 6,
        kind: FieldKind::Number,
        accessor: |r| FieldValue::Number(r.fare_amount),
    },
];

/// Look a field up by name.
///
/// # Example
/// ```rust
/// use taxi_fare::record::field;
/// assert_eq!(field("TripTime").unwrap().column, 3);
/// assert!(field("Tip").is_none());
/// ```
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Whether the column at `index` holds a number.
pub fn is_numeric_column(index: usize) -> bool {
    FIELDS
        .get(index)
        .map_or(false, |f| f.kind == FieldKind::Number)
}

/// Column names and kinds, stored with a trained model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<(String, FieldKind)>,
}

impl Schema {
    /// Schema of [TripRecord](struct.TripRecord.html).
    pub fn trip() -> Schema {
        Schema {
            columns: FIELDS
                .iter()
                .map(|f| (f.name.to_string(), f.kind))
                .collect(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|(name, kind)| format!("{}:{:?}", name, kind))
            .collect();
        write!(f, "{}", cols.join(", "))
    }
}
