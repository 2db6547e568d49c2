// =============================================================================
// models.rs — THE RATE SHEET, TYPED
// =============================================================================
//
// Everything a crawler produces and a store consumes lives here. A bank prints
// its mortgage rates as a grid of "term x loan-to-value band" cells; each cell
// becomes one InterestRateRecord.
//
// Terms and discount bands are closed sets. A label we don't recognise is a
// sign the bank redesigned its page, so nothing in here guesses.
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CrawlError;

/// Name of the institution a record was crawled from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Bank(String);

impl Bank {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-rate period of a mortgage offer. Banks publish three months and
/// every whole year from one to ten. Nothing else exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Term {
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "3y")]
    ThreeYears,
    #[serde(rename = "4y")]
    FourYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "6y")]
    SixYears,
    #[serde(rename = "7y")]
    SevenYears,
    #[serde(rename = "8y")]
    EightYears,
    #[serde(rename = "9y")]
    NineYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Term {
    /// All terms, shortest first.
    pub const ALL: [Term; 11] = [
        Term::ThreeMonths,
        Term::OneYear,
        Term::TwoYears,
        Term::ThreeYears,
        Term::FourYears,
        Term::FiveYears,
        Term::SixYears,
        Term::SevenYears,
        Term::EightYears,
        Term::NineYears,
        Term::TenYears,
    ];

    /// Stable short code, also used in store keys.
    pub fn code(self) -> &'static str {
        match self {
            Term::ThreeMonths => "3m",
            Term::OneYear => "1y",
            Term::TwoYears => "2y",
            Term::ThreeYears => "3y",
            Term::FourYears => "4y",
            Term::FiveYears => "5y",
            Term::SixYears => "6y",
            Term::SevenYears => "7y",
            Term::EightYears => "8y",
            Term::NineYears => "9y",
            Term::TenYears => "10y",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What kind of rate a record carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RateType {
    /// The bank's advertised list rate.
    #[serde(rename = "list")]
    List,
    /// Average rate actually paid by customers over a past period.
    #[serde(rename = "average")]
    AverageHistorical,
    /// Rate that depends on the borrower's loan-to-value band.
    #[serde(rename = "ratioDiscounted")]
    RatioDiscounted,
}

impl RateType {
    pub fn code(self) -> &'static str {
        match self {
            RateType::List => "list",
            RateType::AverageHistorical => "average",
            RateType::RatioDiscounted => "ratioDiscounted",
        }
    }
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Loan-to-value interval `[min_ratio, max_ratio)` that a ratio-discounted
/// rate applies to. Ratios are fractions, so 60% is `0.60`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RatioDiscountBoundary {
    pub min_ratio: Decimal,
    pub max_ratio: Decimal,
}

impl RatioDiscountBoundary {
    pub const UP_TO_60: RatioDiscountBoundary = RatioDiscountBoundary {
        min_ratio: dec!(0),
        max_ratio: dec!(0.60),
    };
    pub const FROM_60_TO_75: RatioDiscountBoundary = RatioDiscountBoundary {
        min_ratio: dec!(0.60),
        max_ratio: dec!(0.75),
    };
    pub const FROM_75_TO_80: RatioDiscountBoundary = RatioDiscountBoundary {
        min_ratio: dec!(0.75),
        max_ratio: dec!(0.80),
    };
    pub const FROM_80_TO_85: RatioDiscountBoundary = RatioDiscountBoundary {
        min_ratio: dec!(0.80),
        max_ratio: dec!(0.85),
    };

    /// The only bands a record may carry. They don't overlap.
    pub const CANONICAL: [RatioDiscountBoundary; 4] = [
        Self::UP_TO_60,
        Self::FROM_60_TO_75,
        Self::FROM_75_TO_80,
        Self::FROM_80_TO_85,
    ];

    pub fn is_canonical(&self) -> bool {
        Self::CANONICAL.contains(self)
    }
}

impl fmt::Display for RatioDiscountBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min_ratio, self.max_ratio)
    }
}

/// One published rate: a single cell of a bank's rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRateRecord {
    pub bank: Bank,

    /// Nominal annual rate in percent (`3.45` means 3.45%).
    pub nominal_rate: Decimal,

    /// Effective annual rate in percent.
    pub effective_rate: Decimal,

    pub term: Term,

    pub rate_type: RateType,

    /// Set exactly when `rate_type` is `RatioDiscounted`.
    pub discount_boundary: Option<RatioDiscountBoundary>,

    /// Rate offered through a union or cooperative membership deal.
    pub union_discount: bool,

    /// When the bank last changed this rate. Business date, not crawl time.
    pub changed_on: NaiveDate,

    /// When the crawl run that produced this record started. Shared by every
    /// record of the run.
    pub last_crawled_at: DateTime<Utc>,
}

impl InterestRateRecord {
    /// Check the invariants every stored record must satisfy.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.nominal_rate < Decimal::ZERO || self.effective_rate < Decimal::ZERO {
            return Err(CrawlError::InvalidRecord(format!(
                "negative rate (nominal {}, effective {}) for {} {}",
                self.nominal_rate, self.effective_rate, self.bank, self.term
            )));
        }

        match (self.rate_type, &self.discount_boundary) {
            (RateType::RatioDiscounted, None) => Err(CrawlError::InvalidRecord(format!(
                "ratio-discounted rate for {} {} has no discount boundary",
                self.bank, self.term
            ))),
            (RateType::RatioDiscounted, Some(boundary)) if !boundary.is_canonical() => {
                Err(CrawlError::InvalidRecord(format!(
                    "discount boundary {} is not one of the canonical bands",
                    boundary
                )))
            }
            (RateType::List | RateType::AverageHistorical, Some(boundary)) => {
                Err(CrawlError::InvalidRecord(format!(
                    "{} rate for {} {} carries discount boundary {}",
                    self.rate_type, self.bank, self.term, boundary
                )))
            }
            _ => Ok(()),
        }
    }

    /// Semantic key the store upserts on. Two crawls of the same table cell
    /// produce the same key.
    pub fn upsert_key(&self) -> String {
        let boundary = match &self.discount_boundary {
            Some(b) => format!("{}-{}", b.min_ratio, b.max_ratio),
            None => "-".to_string(),
        };
        format!(
            "{}:{}:{}:{}:{}",
            self.bank.as_str().to_lowercase().trim(),
            self.term,
            self.rate_type,
            boundary,
            if self.union_discount { "union" } else { "standard" }
        )
    }
}

impl fmt::Display for InterestRateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}% (eff. {}%)",
            self.bank, self.term, self.rate_type, self.nominal_rate, self.effective_rate
        )?;
        if let Some(boundary) = &self.discount_boundary {
            write!(f, " LTV {}", boundary)?;
        }
        if self.union_discount {
            f.write_str(" [union]")?;
        }
        Ok(())
    }
}
