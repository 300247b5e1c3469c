//! Document-merge pass: raise already-built records from secondary document
//! sources (shortlist/select spreadsheets, job-description text) without
//! regressing chat-derived values. Decoding is external; this pass consumes
//! the decoder's manifest of row counts and text blobs.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::extract::patterns;
use crate::extract::rules::CompiledRules;
use crate::record::CompanyRecord;

static DOC_CGPA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:cgpa|%)").unwrap());

/// Plausible CGPA cutoff window; figures outside it are unrelated numbers.
const CGPA_RANGE: (f64, f64) = (5.0, 10.0);
/// Plausible annual CTC window for document text, in LPA.
const CTC_RANGE: (f64, f64) = (2.0, 50.0);

/// One decoded secondary document, as emitted by the external decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
    pub filename: String,
    #[serde(flatten)]
    pub payload: MediaPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaPayload {
    /// Spreadsheet-like file: the row count is a proxy for student count.
    RowCount { rows: u32 },
    /// Document file: free text.
    Text { text: String },
    /// The decoder could not read the file.
    Failed { error: String },
}

#[derive(Debug, Default)]
pub struct EnrichStats {
    pub applied: usize,
    pub unmatched: usize,
    pub failed: usize,
}

/// Apply every manifest item to its matching record. Items that match no
/// company or fail to decode are skipped; the batch always completes.
pub fn apply_manifest(
    companies: &mut [CompanyRecord],
    items: &[MediaItem],
    rules: &CompiledRules,
) -> EnrichStats {
    let mut stats = EnrichStats::default();

    for item in items {
        let fname = item.filename.to_lowercase();

        if let MediaPayload::Failed { error } = &item.payload {
            warn!("skipping {}: decode failed: {}", item.filename, error);
            stats.failed += 1;
            continue;
        }

        let Some(record) = match_company(companies, &fname, rules) else {
            debug!("no company match for {}", item.filename);
            stats.unmatched += 1;
            continue;
        };

        match &item.payload {
            MediaPayload::RowCount { rows } => apply_row_count(record, &fname, *rows),
            MediaPayload::Text { text } => apply_text(record, text, rules),
            MediaPayload::Failed { .. } => unreachable!(),
        }
        stats.applied += 1;
    }

    stats
}

/// Associate a filename with at most one company: the lowercased company
/// name as a substring, else the alias table for files named after a drive
/// or program rather than the company.
fn match_company<'a>(
    companies: &'a mut [CompanyRecord],
    fname: &str,
    rules: &CompiledRules,
) -> Option<&'a mut CompanyRecord> {
    let idx = companies
        .iter()
        .position(|c| fname.contains(&c.company_name.to_lowercase()))
        .or_else(|| {
            rules
                .filename_aliases
                .iter()
                .find(|(substr, _)| fname.contains(substr.as_str()))
                .and_then(|(_, name)| {
                    companies.iter().position(|c| c.company_name == *name)
                })
        })?;
    Some(&mut companies[idx])
}

fn apply_row_count(record: &mut CompanyRecord, fname: &str, rows: u32) {
    if rows == 0 {
        return;
    }
    if fname.contains("shortlist") {
        let current = record.selection_stats.students_shortlisted.unwrap_or(0);
        record.selection_stats.students_shortlisted = Some(current.max(rows));
    } else if fname.contains("select") || fname.contains("final") {
        let current = record.selection_stats.students_selected.unwrap_or(0);
        record.selection_stats.students_selected = Some(current.max(rows));
        record.flags.is_result_confirmed = true;
    }
}

fn apply_text(record: &mut CompanyRecord, text: &str, rules: &CompiledRules) {
    let lower = text.to_lowercase();
    let tokens: std::collections::HashSet<&str> = lower.split_whitespace().collect();

    // CGPA cutoffs, windowed to believable values.
    let best_cgpa = DOC_CGPA_RE
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .filter(|v| (CGPA_RANGE.0..=CGPA_RANGE.1).contains(v))
        .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))));
    if let Some(v) = best_cgpa {
        let current = record.eligibility.cgpa_cutoff.unwrap_or(0.0);
        record.eligibility.cgpa_cutoff = Some(current.max(v));
    }

    // Job descriptions spell branches out in full.
    for t in &rules.document_branch_triggers {
        if t.matches(&lower, &tokens) {
            record.eligibility.allowed_branches.insert(t.label.clone());
        }
    }

    // A better top-line CTC, only ever upward.
    let best_ctc = patterns::all_lpa_mentions(text)
        .into_iter()
        .filter(|v| (CTC_RANGE.0..=CTC_RANGE.1).contains(v))
        .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))));
    if let Some(v) = best_ctc {
        match record.compensation.ctc_lpa {
            Some(current) if v <= current => {}
            _ => record.compensation.ctc_lpa = Some(v),
        }
    }
}
