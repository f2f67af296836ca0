use std::path::Path;

use chrono::{Duration, NaiveDate};
use rand::Rng;
use tracing::info;

use crate::data::reader::open_csv;
use crate::error::{FraudError, Result};

/// Day format used by the `date` column, e.g. `01062025` for 1 June 2025.
pub const DAY_FORMAT: &str = "%d%m%Y";

pub fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DAY_FORMAT)
        .map_err(|e| FraudError::InvalidConfig(format!("bad day '{s}' (expected ddmmyyyy): {e}")))
}

/// Uniformly random day in the inclusive range `[start, end]`.
pub fn random_day<R: Rng + ?Sized>(start: NaiveDate, end: NaiveDate, rng: &mut R) -> NaiveDate {
    let span = (end - start).num_days();
    start + Duration::days(rng.gen_range(0..=span))
}

/// Copies `input` to `output`, assigning every row a random day in
/// `[start, end]` in a `column` column (appended, or overwritten if present).
///
/// Returns the number of data rows written.
pub fn add_dates<R: Rng + ?Sized>(
    input: &Path,
    output: &Path,
    column: &str,
    start: NaiveDate,
    end: NaiveDate,
    rng: &mut R,
) -> Result<usize> {
    if end < start {
        return Err(FraudError::InvalidConfig(format!("end day {end} is before start day {start}")));
    }

    let mut rdr = open_csv(input)?;
    let mut headers = rdr.headers()?.clone();
    let existing = headers.iter().position(|h| h.trim() == column);
    if existing.is_none() {
        headers.push_field(column);
    }

    let mut wtr = csv::Writer::from_path(output)?;
    wtr.write_record(&headers)?;

    let mut written = 0;
    for record in rdr.records() {
        let record = record?;
        let day = random_day(start, end, rng).format(DAY_FORMAT).to_string();
        let out: csv::StringRecord = match existing {
            Some(idx) => record.iter().enumerate()
                .map(|(i, cell)| if i == idx { day.as_str() } else { cell })
                .collect(),
            None => {
                let mut r = record.clone();
                r.push_field(&day);
                r
            }
        };
        wtr.write_record(&out)?;
        written += 1;
    }
    wtr.flush()?;

    info!(input = %input.display(), output = %output.display(), rows = written, "dates added");
    Ok(written)
}
