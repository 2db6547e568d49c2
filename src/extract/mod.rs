// =============================================================================
// extract/mod.rs — FROM A BANK'S RATE PAGE TO RECORDS
// =============================================================================
//
// The shaky part of the whole crawler. Banks don't publish rates as data, they
// publish them as a visual grid:
//
//   | Belåningsgrad | 60 %   | 61-74 % | 75-79 % | 80-85 % |
//   | 3 mån         | 3,45 % | 3,60 %  | 3,70 %  | 3,85 %  |
//   | 1 år          | ...                                   |
//
// We find the grids by an anchor (a header cell containing a known phrase),
// read the header row as loan-to-value bands and every other row as a term,
// and emit one record per cell. Every assumption about the shape of the page
// is checked. When one fails the table is thrown away whole, because a
// half-read rate table is worse than none.
// =============================================================================

pub mod labels;
pub mod rates;
pub mod text;

use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::CrawlError;
use crate::models::{Bank, InterestRateRecord, RateType};
use labels::{BoundaryLabels, TermLabels};
use rates::RateCellFormat;

/// What a located table holds. Sets the record's union-discount flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Standard,
    UnionDiscounted,
}

impl TableRole {
    fn union_discount(self) -> bool {
        matches!(self, TableRole::UnionDiscounted)
    }
}

/// Everything site-specific about reading a rate page.
#[derive(Debug, Clone)]
pub struct TableLayout {
    /// CSS selector for anchor candidates, e.g. `"table tbody tr td b"`.
    pub anchor_selector: &'static str,

    /// Phrase an anchor's text must contain. The header row's title cell must
    /// contain it too.
    pub ratio_phrase: &'static str,

    /// Expected tables in document order. Its length is the exact number of
    /// anchors the page must have.
    pub tables: &'static [TableRole],

    pub term_labels: TermLabels,

    pub boundary_labels: BoundaryLabels,

    pub cell_format: RateCellFormat,
}

/// Per-crawl values stamped on every record.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub bank: Bank,
    pub changed_on: NaiveDate,
    pub crawled_at: DateTime<Utc>,
}

/// Result of reading one located table.
#[derive(Debug)]
pub struct TableExtraction {
    pub role: TableRole,
    pub outcome: Result<Vec<InterestRateRecord>, CrawlError>,
}

/// One `<tr>`: first cell is the title, the rest are fields.
#[derive(Debug, Clone, PartialEq)]
struct Row {
    title: String,
    fields: Vec<String>,
}

fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css)
        .map_err(|e| CrawlError::structural(format!("invalid selector '{}': {}", css, e)))
}

/// Parse `html` and read every table the layout expects.
///
/// Fails as a whole only when the tables can't be located (selector error or
/// anchor count mismatch). Each located table then succeeds or fails on its
/// own, in locate order.
pub fn extract_tables(
    html: &str,
    layout: &TableLayout,
    ctx: &ExtractContext,
) -> Result<Vec<TableExtraction>, CrawlError> {
    let document = Html::parse_document(html);
    let tables = locate_tables(&document, layout)?;
    debug!(tables = tables.len(), bank = %ctx.bank, "located rate tables");

    Ok(tables
        .into_iter()
        .zip(layout.tables.iter().copied())
        .map(|(table, role)| TableExtraction {
            role,
            outcome: parse_table(table, role, layout, ctx),
        })
        .collect())
}

/// Find anchors and resolve each to its nearest enclosing `<table>`.
fn locate_tables<'a>(
    document: &'a Html,
    layout: &TableLayout,
) -> Result<Vec<ElementRef<'a>>, CrawlError> {
    let anchor = selector(layout.anchor_selector)?;

    let anchors: Vec<ElementRef<'a>> = document
        .select(&anchor)
        .filter(|el| text::element_text(*el).contains(layout.ratio_phrase))
        .collect();

    if anchors.len() != layout.tables.len() {
        return Err(CrawlError::structural(format!(
            "expected {} table anchors matching '{}' containing '{}', found {}",
            layout.tables.len(),
            layout.anchor_selector,
            layout.ratio_phrase,
            anchors.len()
        )));
    }

    anchors
        .into_iter()
        .map(|el| {
            el.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|ancestor| ancestor.value().name() == "table")
                .ok_or_else(|| {
                    CrawlError::structural(format!(
                        "anchor '{}' is not inside a table",
                        text::element_text(el)
                    ))
                })
        })
        .collect()
}

fn read_rows(table: ElementRef<'_>) -> Result<Vec<Row>, CrawlError> {
    let tr = selector("tr")?;
    let cell = selector("td, th")?;

    table
        .select(&tr)
        .enumerate()
        .map(|(index, row)| -> Result<Row, CrawlError> {
            let mut cells = row.select(&cell).map(text::element_text);
            let title = cells
                .next()
                .ok_or_else(|| CrawlError::structural(format!("row {} has no cells", index)))?;
            Ok(Row {
                title,
                fields: cells.collect(),
            })
        })
        .collect()
}

fn parse_table(
    table: ElementRef<'_>,
    role: TableRole,
    layout: &TableLayout,
    ctx: &ExtractContext,
) -> Result<Vec<InterestRateRecord>, CrawlError> {
    let rows = read_rows(table)?;

    let Some((header, body)) = rows.split_first() else {
        return Err(CrawlError::structural("table has no rows"));
    };

    if !header.title.contains(layout.ratio_phrase) {
        return Err(CrawlError::structural(format!(
            "header title '{}' does not mention '{}'",
            header.title, layout.ratio_phrase
        )));
    }

    let boundaries = labels::parse_boundaries(&header.fields, layout.boundary_labels)?;

    let mut records = Vec::with_capacity(body.len() * boundaries.len());
    for row in body {
        let term = labels::parse_term(&row.title, layout.term_labels)?;

        if row.fields.len() != boundaries.len() {
            return Err(CrawlError::structural(format!(
                "row '{}' has {} rate cells but the header has {} bands",
                row.title,
                row.fields.len(),
                boundaries.len()
            )));
        }

        for (cell, boundary) in row.fields.iter().zip(&boundaries) {
            let (nominal_rate, effective_rate) = rates::parse_rate_cell(cell, layout.cell_format)?;
            let record = InterestRateRecord {
                bank: ctx.bank.clone(),
                nominal_rate,
                effective_rate,
                term,
                rate_type: RateType::RatioDiscounted,
                discount_boundary: Some(*boundary),
                union_discount: role.union_discount(),
                changed_on: ctx.changed_on,
                last_crawled_at: ctx.crawled_at,
            };
            record.validate()?;
            records.push(record);
        }
    }

    Ok(records)
}
