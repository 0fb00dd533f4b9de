use super::BillRecord;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Reasons a merged record is left out of the output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing or empty field '{0}'")]
    EmptyField(&'static str),

    #[error("detail_url '{0}' is not an absolute URL")]
    RelativeUrl(String),

    #[error("no sponsors listed")]
    NoSponsors,

    #[error("status entry {0} has an empty status")]
    EmptyStatus(usize),
}

/// Checks the invariants every output record must hold
pub fn validate_record(record: &BillRecord) -> Result<(), ValidationError> {
    if record.doc_number.trim().is_empty() {
        return Err(ValidationError::EmptyField("doc_number"));
    }
    if record.caption.trim().is_empty() {
        return Err(ValidationError::EmptyField("caption"));
    }
    if record.detail_url.trim().is_empty() {
        return Err(ValidationError::EmptyField("detail_url"));
    }
    if Url::parse(&record.detail_url).is_err() {
        return Err(ValidationError::RelativeUrl(record.detail_url.clone()));
    }
    if record.sponsors.iter().all(|s| s.trim().is_empty()) {
        return Err(ValidationError::NoSponsors);
    }
    if let Some(index) = record
        .status_history
        .iter()
        .position(|entry| entry.status.trim().is_empty())
    {
        return Err(ValidationError::EmptyStatus(index));
    }
    Ok(())
}

/// Removes later records whose `doc_number` was already seen
///
/// Returns the surviving records in their original order and the number removed.
pub fn dedup_by_doc_number(records: Vec<BillRecord>) -> (Vec<BillRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<BillRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.doc_number.clone()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}
