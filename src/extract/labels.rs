// =============================================================================
// extract/labels.rs — WHAT THE COLUMN HEADERS MEAN
// =============================================================================
//
// Row titles name a term, header cells name a loan-to-value band. Both are
// looked up in fixed tables that belong to one site's layout. These are
// business facts, so we never derive a band from the digits in a label:
// an unknown label fails.
// =============================================================================

use crate::error::CrawlError;
use crate::extract::text::squash_whitespace;
use crate::models::{RatioDiscountBoundary, Term};

/// Maps a row-title label (whitespace removed) to a term.
pub type TermLabels = &'static [(&'static str, Term)];

/// Maps a header label (whitespace removed) to a discount band.
pub type BoundaryLabels = &'static [(&'static str, RatioDiscountBoundary)];

/// Swedish term labels as banks print them.
pub const SWEDISH_TERM_LABELS: &[(&str, Term)] = &[
    ("3mån", Term::ThreeMonths),
    ("1år", Term::OneYear),
    ("2år", Term::TwoYears),
    ("3år", Term::ThreeYears),
    ("4år", Term::FourYears),
    ("5år", Term::FiveYears),
    ("6år", Term::SixYears),
    ("7år", Term::SevenYears),
    ("8år", Term::EightYears),
    ("9år", Term::NineYears),
    ("10år", Term::TenYears),
];

/// Danske Bank's belåningsgrad columns.
pub const DANSKE_BANK_BOUNDARY_LABELS: &[(&str, RatioDiscountBoundary)] = &[
    ("60%", RatioDiscountBoundary::UP_TO_60),
    ("61-74%", RatioDiscountBoundary::FROM_60_TO_75),
    ("75-79%", RatioDiscountBoundary::FROM_75_TO_80),
    ("80-85%", RatioDiscountBoundary::FROM_80_TO_85),
];

pub fn parse_term(title: &str, labels: TermLabels) -> Result<Term, CrawlError> {
    let key = squash_whitespace(title);
    labels
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, term)| *term)
        .ok_or_else(|| {
            CrawlError::structural(format!(
                "unknown term label '{}' (sanitized: '{}')",
                title, key
            ))
        })
}

pub fn parse_boundary(
    header: &str,
    labels: BoundaryLabels,
) -> Result<RatioDiscountBoundary, CrawlError> {
    let key = squash_whitespace(header);
    let boundary = labels
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, boundary)| *boundary)
        .ok_or_else(|| {
            CrawlError::structural(format!(
                "unknown discount boundary label '{}' (sanitized: '{}')",
                header, key
            ))
        })?;

    // A label table that points outside the canonical bands is a bug in the
    // table, and it must not reach the store either way.
    if !boundary.is_canonical() {
        return Err(CrawlError::structural(format!(
            "label '{}' maps to non-canonical band {}",
            header, boundary
        )));
    }
    Ok(boundary)
}

/// Parse every header cell, left to right. The first bad label fails them all.
pub fn parse_boundaries(
    headers: &[String],
    labels: BoundaryLabels,
) -> Result<Vec<RatioDiscountBoundary>, CrawlError> {
    headers
        .iter()
        .map(|header| parse_boundary(header, labels))
        .collect()
}
