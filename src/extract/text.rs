// =============================================================================
// extract/text.rs — GETTING WORDS OUT OF TAG SOUP
// =============================================================================
//
// Bank CMSes wrap every number in a <span>, a <b>, a <p>, sometimes all three,
// and sprinkle non-breaking spaces between the digits and the percent sign.
// These helpers flatten a cell to one plain, single-spaced string.
// =============================================================================

use scraper::ElementRef;

/// All text under `element`, depth first, normalized by [`normalize_whitespace`].
///
/// Text nodes are joined with a space so `<b>3,45</b><i>%</i>` reads as
/// `"3,45 %"` rather than gluing separate nodes together.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for chunk in element.text() {
        raw.push(' ');
        raw.push_str(chunk);
    }
    normalize_whitespace(&raw)
}

/// Collapse every run of whitespace (including U+00A0 and other Unicode
/// spaces) into one ordinary space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// `text` with all whitespace removed. Label tables are keyed on this form,
/// so "3 mån", "3mån" and "3\u{a0}mån" all look the same.
pub fn squash_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
