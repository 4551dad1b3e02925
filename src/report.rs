//! Dataset statistics printed before training.
//!
//! Each report is computed by a pure function over the loaded records and
//! rendered through `Display`.

use crate::errors::{FareError, Result};
use crate::record::{field, TripRecord, FIELDS};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// How many distinct values are shown inline per field.
pub const MAX_EXAMPLES: usize = 7;

/// Number of missing values per field.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingValuesReport {
    pub counts: Vec<(&'static str, usize)>,
}

pub fn missing_values(records: &[TripRecord]) -> MissingValuesReport {
    let counts = FIELDS
        .iter()
        .map(|f| (f.name, records.iter().filter(|r| f.is_missing(r)).count()))
        .collect();
    MissingValuesReport { counts }
}

impl fmt::Display for MissingValuesReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Missing values per field:")?;
        for (name, count) in self.counts.iter() {
            writeln!(f, "  {:<16}{}", name, count)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistinctValues {
    pub field: &'static str,
    /// Distinct present values, in the order they were first seen.
    pub values: Vec<String>,
}

impl DistinctValues {
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// At most [MAX_EXAMPLES](constant.MAX_EXAMPLES.html) values, followed by
    /// `...` when some were left out.
    pub fn examples(&self) -> String {
        let shown: Vec<&str> = self
            .values
            .iter()
            .take(MAX_EXAMPLES)
            .map(|s| s.as_str())
            .collect();
        let mut s = shown.join(", ");
        if self.values.len() > MAX_EXAMPLES {
            s.push_str(", ...");
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistinctValuesReport {
    pub fields: Vec<DistinctValues>,
}

pub fn distinct_values(records: &[TripRecord]) -> DistinctValuesReport {
    let fields = FIELDS
        .iter()
        .map(|f| {
            let mut seen: HashSet<String> = HashSet::new();
            let mut values = Vec::new();
            for r in records {
                let value = f.value(r);
                if value.is_missing() {
                    continue;
                }
                let key = value.key();
                if seen.insert(key.clone()) {
                    values.push(key);
                }
            }
            DistinctValues {
                field: f.name,
                values,
            }
        })
        .collect();
    DistinctValuesReport { fields }
}

impl fmt::Display for DistinctValuesReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Distinct values per field:")?;
        for d in self.fields.iter() {
            writeln!(f, "  {:<16}{:<8}[{}]", d.field, d.count(), d.examples())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRow {
    pub value: String,
    pub count: usize,
    pub percent: f64,
}

/// Distribution of one field over the complete records.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyReport {
    pub field: &'static str,
    /// Number of complete records.
    pub total: usize,
    pub rows: Vec<FrequencyRow>,
}

/// Share of `count` in `total`, in percent. 0 when `total` is 0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Group the records where every field is present by the value of `field_name`.
///
/// # Example
/// ```rust
/// use taxi_fare::record::sample_trip;
/// use taxi_fare::report::frequencies;
/// let report = frequencies(&[sample_trip(), sample_trip()], "PaymentType").unwrap();
/// assert_eq!(report.total, 2);
/// assert_eq!(report.rows[0].value, "CRD");
/// assert_eq!(report.rows[0].percent, 100.0);
/// ```
///
/// # Error
/// Raise error if no field is named `field_name`.
pub fn frequencies(records: &[TripRecord], field_name: &str) -> Result<FrequencyReport> {
    let spec = field(field_name).ok_or_else(|| FareError::UnknownField(field_name.to_string()))?;

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0;
    for r in records.iter().filter(|r| r.is_complete()) {
        total += 1;
        let key = spec.value(r).key();
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let rows = order
        .into_iter()
        .map(|value| {
            let count = counts.get(&value).copied().unwrap_or(0);
            FrequencyRow {
                percent: percentage(count, total),
                value,
                count,
            }
        })
        .collect();
    Ok(FrequencyReport {
        field: spec.name,
        total,
        rows,
    })
}

impl fmt::Display for FrequencyReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Frequency of {} over {} complete records:", self.field, self.total)?;
        if self.total == 0 {
            return writeln!(f, "  (none)          0       0.000%");
        }
        for row in self.rows.iter() {
            writeln!(f, "  {:<16}{:<8}{:.5}%", row.value, row.count, row.percent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample_trip;

    fn trip(vendor: &str, payment: &str, passengers: f32) -> TripRecord {
        TripRecord {
            vendor_id: vendor.to_string(),
            payment_type: payment.to_string(),
            passenger_count: passengers,
            ..sample_trip()
        }
    }

    #[test]
    fn counts_missing_per_field() {
        let records = vec![
            trip("VTS", "CRD", 1.0),
            trip(" ", "CRD", f32::NAN),
            trip("CMT", "", f32::NAN),
        ];
        let report = missing_values(&records);
        let counts: HashMap<&str, usize> = report.counts.iter().cloned().collect();
        assert_eq!(counts["VendorId"], 1);
        assert_eq!(counts["PassengerCount"], 2);
        assert_eq!(counts["PaymentType"], 1);
        assert_eq!(counts["FareAmount"], 0);
        assert!(report.to_string().contains("PassengerCount  2\n"));
    }

    #[test]
    fn distinct_keeps_first_seen_order_and_skips_missing() {
        let records = vec![
            trip("VTS", "CRD", 2.0),
            trip("CMT", "CSH", f32::NAN),
            trip("VTS", "CRD", 1.0),
        ];
        let report = distinct_values(&records);
        let vendor = &report.fields[0];
        assert_eq!(vendor.values, vec!["VTS", "CMT"]);
        let passengers = &report.fields[2];
        assert_eq!(passengers.field, "PassengerCount");
        assert_eq!(passengers.values, vec!["2", "1"]);
    }

    #[test]
    fn at_most_seven_examples() {
        let seven: Vec<TripRecord> = (0..7).map(|i| trip("VTS", "CRD", i as f32)).collect();
        let report = distinct_values(&seven);
        assert_eq!(report.fields[2].examples(), "0, 1, 2, 3, 4, 5, 6");

        let nine: Vec<TripRecord> = (0..9).map(|i| trip("VTS", "CRD", i as f32)).collect();
        let report = distinct_values(&nine);
        let examples = report.fields[2].examples();
        assert_eq!(report.fields[2].count(), 9);
        assert_eq!(examples, "0, 1, 2, 3, 4, 5, 6, ...");
        assert_eq!(examples.split(", ").filter(|s| *s != "...").count(), MAX_EXAMPLES);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let records = vec![
            trip("VTS", "CRD", 1.0),
            trip("VTS", "CSH", 1.0),
            trip("CMT", "CRD", 1.0),
            trip("CMT", "NOC", f32::NAN),
        ];
        let report = frequencies(&records, "PaymentType").unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].count, 2);
        let sum: f64 = report.rows.iter().map(|r| r.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert!(report.to_string().contains("66.66667%"));
    }

    #[test]
    fn empty_restriction_reports_zero() {
        let records = vec![trip("VTS", "CRD", f32::NAN)];
        let report = frequencies(&records, "VendorId").unwrap();
        assert_eq!(report.total, 0);
        assert!(report.rows.is_empty());
        assert!(report.to_string().contains("0.000%"));
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn unknown_field() {
        match frequencies(&[], "Tip").unwrap_err() {
            FareError::UnknownField(name) => assert_eq!(name, "Tip"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
