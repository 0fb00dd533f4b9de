use chrono::NaiveDate;

/// Normalizes a `MM/DD/YYYY` date to `YYYY-MM-DD`
///
/// Anything that does not parse is returned trimmed but otherwise unchanged,
/// so odd values like "TBD" survive into the output.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    match NaiveDate::parse_from_str(trimmed, "%m/%d/%Y") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => trimmed.to_string(),
    }
}
