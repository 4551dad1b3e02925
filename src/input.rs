//! This module implements the data loader.
//!
//! Loading is done in two passes over delimited text files:
//! 1. [clean_csv](fn.clean_csv.html) rewrites the raw file, replacing blank
//!    numeric columns with the `NaN` sentinel and blank text columns with
//!    an empty string.
//! 2. [load_records](fn.load_records.html) parses the cleaned file into
//!    [TripRecord](../record/struct.TripRecord.html)s by column position.
//!
//! # Example
//! ```rust
//! use taxi_fare::input::{self, InputFormat};
//! let dir = tempfile::tempdir().unwrap();
//! let raw = dir.path().join("raw.csv");
//! let clean = dir.path().join("clean.csv");
//! let header = "vendor_id,rate_code,passenger_count,trip_time_in_secs,trip_distance,\
//!               payment_type,fare_amount";
//! std::fs::write(&raw, format!("{}\nVTS,1,,1140,3.75,CRD,15.5\n", header)).unwrap();
//!
//! let fmt = InputFormat::csv_format();
//! input::clean_csv(&raw, &clean, &fmt).unwrap();
//! let records = input::load_records(&clean, &fmt).unwrap();
//! assert_eq!(records.len(), 1);
//! assert!(records[0].passenger_count.is_nan());
//! ```

use crate::errors::{FareError, Result};
use crate::record::{is_numeric_column, TripRecord, COLUMN_COUNT, MISSING_SENTINEL};
use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// The input file format.
#[derive(Copy, Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InputFormat {
    /// Whether the first line is a header. It is copied verbatim by the
    /// cleaner and skipped by the loader.
    pub header: bool,

    /// Delimeter of the data file.
    pub delimeter: char,
}

impl Default for InputFormat {
    fn default() -> Self {
        InputFormat::csv_format()
    }
}

impl InputFormat {
    /// Comma separated with a header line.
    pub fn csv_format() -> InputFormat {
        InputFormat {
            header: true,
            delimeter: ',',
        }
    }

    pub fn set_header(&mut self, header: bool) {
        self.header = header;
    }

    pub fn set_delimeter(&mut self, delim: char) {
        self.delimeter = delim;
    }

    /// Transform the input format to human readable string.
    /// # Example
    /// ```rust
    /// use taxi_fare::input::InputFormat;
    /// let fmt = InputFormat::csv_format();
    /// assert_eq!(fmt.to_string(), "Has header: true\nDelemeter: [,]");
    /// ```
    pub fn to_string(&self) -> String {
        format!("Has header: {}\nDelemeter: [{}]", self.header, self.delimeter)
    }
}

/// Replace blank columns of one data line.
///
/// # Example
/// ```rust
/// use taxi_fare::input::clean_line;
/// assert_eq!(clean_line(" ,1,, ,2.5,CRD,", ','), ",1,NaN,NaN,2.5,CRD,NaN");
/// ```
pub fn clean_line(line: &str, delimeter: char) -> String {
    let columns: Vec<&str> = line
        .split(delimeter)
        .enumerate()
        .map(|(index, value)| {
            if !value.trim().is_empty() {
                value
            } else if is_numeric_column(index) {
                MISSING_SENTINEL
            } else {
                ""
            }
        })
        .collect();
    columns.join(&delimeter.to_string())
}

/// Write a cleaned copy of `source` to `dest`. Return the number of data lines.
///
/// Line order and line terminators (`\n` or `\r\n`) are preserved and the
/// header is copied byte for byte. A last line without terminator gets `\n`,
/// so cleaning an already cleaned file reproduces it byte for byte.
///
/// # Error
/// Raise error if `source` cannot be read or `dest` cannot be written.
pub fn clean_csv<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    dest: Q,
    input_format: &InputFormat,
) -> Result<usize> {
    let source = source.as_ref();
    let dest = dest.as_ref();
    let mut reader = BufReader::new(File::open(source)?);
    let mut writer = BufWriter::new(File::create(dest)?);

    let mut count = 0;
    let mut buf = String::new();
    for index in 0.. {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        let (content, ending) = split_line_ending(&buf);
        if index == 0 && input_format.header {
            write!(writer, "{}{}", content, ending)?;
            continue;
        }
        write!(writer, "{}{}", clean_line(content, input_format.delimeter), ending)?;
        count += 1;
    }
    writer.flush()?;

    info!(
        source = %source.display(),
        dest = %dest.display(),
        lines = count,
        "Cleaned data file"
    );
    Ok(count)
}

/// Split off the line terminator. A missing one is reported as `\n`.
fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "\n")
    }
}

/// Parse a numeric column. `NaN` is the missing sentinel; infinities are
/// rejected like any other text.
fn parse_number(value: &str, line: usize, column: usize) -> Result<f32> {
    let v = value
        .trim()
        .parse::<f32>()
        .map_err(|e| FareError::MalformedRecord {
            line,
            reason: format!("column {}: {:?} is not a number ({})", column, value, e),
        })?;
    if v.is_infinite() {
        return Err(FareError::MalformedRecord {
            line,
            reason: format!("column {}: {:?} is not a finite number", column, value),
        });
    }
    Ok(v)
}

/// Parse one cleaned data line. `line` is the 1-based line number used in errors.
pub fn parse_record(content: &str, delimeter: char, line: usize) -> Result<TripRecord> {
    let v: Vec<&str> = content.split(delimeter).collect();
    if v.len() != COLUMN_COUNT {
        return Err(FareError::MalformedRecord {
            line,
            reason: format!("expected {} columns, found {}", COLUMN_COUNT, v.len()),
        });
    }
    Ok(TripRecord {
        vendor_id: v[0].to_string(),
        rate_code: parse_number(v[1], line, 1)?,
        passenger_count: parse_number(v[2], line, 2)?,
        trip_time: parse_number(v[3], line, 3)?,
        trip_distance: parse_number(v[4], line, 4)?,
        payment_type: v[5].to_string(),
        fare_amount: parse_number(v[6], line, 6)?,
    })
}

/// Load the records of a cleaned file. Empty lines are skipped.
///
/// # Error
/// Raise error if the file cannot be read, or a line is not a valid record.
pub fn load_records<P: AsRef<Path>>(
    path: P,
    input_format: &InputFormat,
) -> Result<Vec<TripRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut dv = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let content = line?;
        if index == 0 && input_format.header {
            continue;
        }
        if content.trim().is_empty() {
            continue;
        }
        dv.push(parse_record(&content, input_format.delimeter, index + 1)?);
    }
    info!(path = %path.display(), records = dv.len(), "Loaded records");
    Ok(dv)
}
