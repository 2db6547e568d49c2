// =============================================================================
// extract/rates.rs — "3,45 %*" INTO A NUMBER
// =============================================================================
//
// Swedish pages write decimals with a comma, decorate figures with percent
// signs, footnote asterisks and parentheses, and sometimes print the effective
// rate next to the nominal one. How a site lays out its cells is part of that
// site's layout, so the cell format is a parameter, never a global rule.
// =============================================================================

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::CrawlError;

/// How one rate cell is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCellFormat {
    /// One figure per cell; it is used as both nominal and effective rate.
    /// Anything after the first figure is ignored.
    NominalOnly,

    /// `nominal (effective)`. The effective rate must be the only figure in
    /// parentheses and can't be below the nominal one; without parentheses
    /// the nominal is used for both. Any other extra figure is an error.
    NominalThenEffective,
}

/// Characters that decorate a figure without being part of it.
const DECORATIONS: [char; 4] = ['%', '*', '(', ')'];

/// Parse a cell into `(nominal, effective)` percent figures.
pub fn parse_rate_cell(
    cell: &str,
    format: RateCellFormat,
) -> Result<(Decimal, Decimal), CrawlError> {
    match format {
        RateCellFormat::NominalOnly => {
            let sanitized = strip_decorations(cell);
            let Some(first) = sanitized.split_whitespace().next() else {
                return Err(CrawlError::parse("nominal rate", cell, "cell has no figure"));
            };
            let nominal = parse_locale_decimal(first)
                .map_err(|reason| CrawlError::parse("nominal rate", cell, reason))?;
            Ok((nominal, nominal))
        }
        RateCellFormat::NominalThenEffective => {
            let (head, bracketed) = match cell.split_once('(') {
                Some((head, rest)) => (head, Some(rest)),
                None => (cell, None),
            };
            let nominal = single_figure(head, "nominal rate", cell)?;

            let Some(rest) = bracketed else {
                return Ok((nominal, nominal));
            };
            let Some((inner, tail)) = rest.split_once(')') else {
                return Err(CrawlError::parse("effective rate", cell, "unclosed parenthesis"));
            };
            if strip_decorations(tail).split_whitespace().next().is_some() {
                return Err(CrawlError::parse(
                    "effective rate",
                    cell,
                    "unexpected text after the effective rate",
                ));
            }

            let effective = single_figure(inner, "effective rate", cell)?;
            if effective < nominal {
                return Err(CrawlError::parse(
                    "effective rate",
                    cell,
                    format!("effective {} is below nominal {}", effective, nominal),
                ));
            }
            Ok((nominal, effective))
        }
    }
}

fn strip_decorations(text: &str) -> String {
    text.chars().filter(|c| !DECORATIONS.contains(c)).collect()
}

/// Exactly one figure in `part`; a stray footnote number is refused.
fn single_figure(part: &str, what: &'static str, cell: &str) -> Result<Decimal, CrawlError> {
    let sanitized = strip_decorations(part);
    let tokens: Vec<&str> = sanitized.split_whitespace().collect();
    match tokens.as_slice() {
        [figure] => {
            parse_locale_decimal(figure).map_err(|reason| CrawlError::parse(what, cell, reason))
        }
        [] => Err(CrawlError::parse(what, cell, "no figure")),
        _ => Err(CrawlError::parse(
            what,
            cell,
            format!("expected one figure, found {}", tokens.len()),
        )),
    }
}

/// Parse a non-negative decimal written with either `,` or `.` as separator.
fn parse_locale_decimal(token: &str) -> Result<Decimal, String> {
    let normalized = token.replace(',', ".");
    let value = Decimal::from_str(&normalized).map_err(|e| e.to_string())?;
    if value < Decimal::ZERO {
        return Err(format!("negative rate {}", value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_comma_decimal() {
        let (n, e) = parse_rate_cell("3,45 %", RateCellFormat::NominalOnly).unwrap();
        assert_eq!(n, dec!(3.45));
        assert_eq!(e, dec!(3.45));
    }

    #[test]
    fn test_decorations_and_spacing_do_not_change_the_result() {
        let expected = parse_rate_cell("3,45", RateCellFormat::NominalOnly).unwrap();
        for variant in [
            "3,45%",
            "  3,45 %  ",
            "3,45\u{a0}%",
            "3,45 %*",
            "(3,45 %)",
            "*3,45\u{a0}\u{a0} % ",
            "\n3,45\t%",
        ] {
            assert_eq!(
                parse_rate_cell(variant, RateCellFormat::NominalOnly).unwrap(),
                expected,
                "variant {variant:?}"
            );
        }
    }

    #[test]
    fn test_nominal_only_ignores_second_figure() {
        let (n, e) = parse_rate_cell("3,45 % (3,51 %)", RateCellFormat::NominalOnly).unwrap();
        assert_eq!((n, e), (dec!(3.45), dec!(3.45)));
    }

    #[test]
    fn test_nominal_then_effective_reads_both_figures() {
        let (n, e) =
            parse_rate_cell("3,45 % (3,51 %)", RateCellFormat::NominalThenEffective).unwrap();
        assert_eq!((n, e), (dec!(3.45), dec!(3.51)));
    }

    #[test]
    fn test_nominal_then_effective_falls_back_to_single_figure() {
        let (n, e) = parse_rate_cell("4,10 %", RateCellFormat::NominalThenEffective).unwrap();
        assert_eq!((n, e), (dec!(4.10), dec!(4.10)));
    }

    #[test]
    fn test_nominal_then_effective_refuses_three_figures() {
        assert!(matches!(
            parse_rate_cell("1,0 2,0 3,0", RateCellFormat::NominalThenEffective),
            Err(CrawlError::Parse { .. })
        ));
    }

    #[test]
    fn test_nominal_then_effective_refuses_unbracketed_second_figure() {
        // A footnote marker rendered next to the rate, e.g. `3,45 %<sup>1</sup>`.
        assert!(matches!(
            parse_rate_cell("3,45 % 1", RateCellFormat::NominalThenEffective),
            Err(CrawlError::Parse { .. })
        ));
    }

    #[test]
    fn test_nominal_then_effective_refuses_effective_below_nominal() {
        assert!(matches!(
            parse_rate_cell("3,45 % (1)", RateCellFormat::NominalThenEffective),
            Err(CrawlError::Parse { .. })
        ));
    }

    #[test]
    fn test_nominal_then_effective_refuses_malformed_brackets() {
        for cell in ["3,45 % (3,51 %", "3,45 % (3,51 %) 2", "3,45 % (3,51 3,60)", "3,45 % ()"] {
            assert!(
                parse_rate_cell(cell, RateCellFormat::NominalThenEffective).is_err(),
                "cell {cell:?}"
            );
        }
    }

    #[test]
    fn test_nominal_then_effective_allows_trailing_footnote_star() {
        let (n, e) =
            parse_rate_cell("3,45\u{a0}% (3,51 %)*", RateCellFormat::NominalThenEffective).unwrap();
        assert_eq!((n, e), (dec!(3.45), dec!(3.51)));
    }

    #[test]
    fn test_empty_and_garbage_cells_fail() {
        for cell in ["", "  % ", "n/a", "3,4,5 %", "-"] {
            assert!(
                parse_rate_cell(cell, RateCellFormat::NominalOnly).is_err(),
                "cell {cell:?}"
            );
        }
    }

    #[test]
    fn test_negative_rate_fails() {
        assert!(parse_rate_cell("-0,10 %", RateCellFormat::NominalOnly).is_err());
        assert!(parse_rate_cell("3,45 (-1,00)", RateCellFormat::NominalThenEffective).is_err());
    }

    #[test]
    fn test_dot_decimal_is_accepted() {
        let (n, _) = parse_rate_cell("3.45%", RateCellFormat::NominalOnly).unwrap();
        assert_eq!(n, dec!(3.45));
    }
}
