//! Date-dimension builder.
//!
//! Parses the distinct date-like values of a fact column with the
//! dimension's date extractor and generates the per-language period
//! lookup: code, description, hierarchy, period type, start and end.
//! The widest observed range feeds the cube's `start_date`/`end_date`
//! metadata.

use chrono::{Months, NaiveDate};

use crate::builder::BuildContext;
use crate::engine::CellValue;
use crate::error::{BuildError, BuildResult};
use crate::ident::lookup_table_name;
use crate::locale::SUPPORTED_LOCALES;
use crate::model::dimension::{
    DateExtractor, Dimension, MonthFormat, QuarterFormat, YearFormat,
};
use crate::model::types::DataType;
use crate::sql::ddl::{ColumnDef, CreateTable};
use crate::sql::expr::{cast_text, col, ExprExt};
use crate::sql::query::{OrderByExpr, Query};
use crate::translation::translate;

/// The category of a parsed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodType {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Total,
}

impl PeriodType {
    pub fn translation_key(&self) -> &'static str {
        match self {
            PeriodType::Year => "period_type.year",
            PeriodType::Quarter => "period_type.quarter",
            PeriodType::Month => "period_type.month",
            PeriodType::Week => "period_type.week",
            PeriodType::Day => "period_type.day",
            PeriodType::Total => "period_type.total",
        }
    }
}

/// A parsed date period.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub period_type: PeriodType,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Code of the containing year, for sub-year periods.
    pub hierarchy: Option<String>,
}

/// Widest observed range across one date dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateBounds {
    pub fn widen(self, other: DateBounds) -> DateBounds {
        DateBounds {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse one raw fact value into a period.
///
/// Attempts, in order: point-in-time, bare year, year+quarter,
/// year+month. A value that fits none is a non-match for the validator,
/// not an error here.
pub fn parse_period(raw: &str, extractor: &DateExtractor) -> Option<Period> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(format) = extractor.date_format {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format.chrono_pattern()) {
            return Some(Period {
                period_type: PeriodType::Day,
                start: date,
                end: date,
                hierarchy: None,
            });
        }
    }

    let year_format = extractor.year_format?;
    let (year_code, year, rest) = split_year(raw, year_format)?;
    let year_start = year_start(year, extractor)?;
    let year_end = year_start
        .checked_add_months(Months::new(12))?
        .pred_opt()?;

    if rest.is_empty() {
        return Some(Period {
            period_type: PeriodType::Year,
            start: year_start,
            end: year_end,
            hierarchy: None,
        });
    }

    if let Some(format) = extractor.quarter_format {
        if let Some(quarter) = parse_quarter(rest, format) {
            if quarter == 5 && extractor.quarter_total_is_fifth {
                return Some(Period {
                    period_type: PeriodType::Total,
                    start: year_start,
                    end: year_end,
                    hierarchy: Some(year_code),
                });
            }
            if (1..=4).contains(&quarter) {
                let start = year_start.checked_add_months(Months::new(3 * (quarter - 1)))?;
                let end = start.checked_add_months(Months::new(3))?.pred_opt()?;
                return Some(Period {
                    period_type: PeriodType::Quarter,
                    start,
                    end,
                    hierarchy: Some(year_code),
                });
            }
            return None;
        }
    }

    if let Some(format) = extractor.month_format {
        if let Some(month) = parse_month(rest, format) {
            let (_, start_month) = extractor_start(extractor);
            // A split year covers months from its start month onwards in
            // the first calendar year and the rest in the second.
            let calendar_year = if month >= start_month {
                year
            } else {
                year + 1
            };
            let start = NaiveDate::from_ymd_opt(calendar_year, month, 1)?;
            let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
            return Some(Period {
                period_type: PeriodType::Month,
                start,
                end,
                hierarchy: Some(year_code),
            });
        }
    }

    None
}

fn extractor_start(extractor: &DateExtractor) -> (u32, u32) {
    let (default_day, default_month) = extractor.year_type.start();
    (
        extractor.start_day.unwrap_or(default_day),
        extractor.start_month.unwrap_or(default_month),
    )
}

fn year_start(year: i32, extractor: &DateExtractor) -> Option<NaiveDate> {
    let (day, month) = extractor_start(extractor);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Split the leading year segment off a raw value. Returns the year
/// code as written, the starting calendar year, and the remainder.
fn split_year(raw: &str, format: YearFormat) -> Option<(String, i32, &str)> {
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    match format {
        YearFormat::Full => {
            let (head, rest) = raw.split_at_checked(4)?;
            if !digits(head) {
                return None;
            }
            Some((head.to_string(), head.parse().ok()?, rest))
        }
        YearFormat::HyphenSplit | YearFormat::SlashSplit => {
            let sep = if format == YearFormat::HyphenSplit {
                '-'
            } else {
                '/'
            };
            let (head, rest) = raw.split_at_checked(7)?;
            let (first, second) = head.split_at_checked(4)?;
            let second = second.strip_prefix(sep)?;
            if !digits(first) || !digits(second) {
                return None;
            }
            let year: i32 = first.parse().ok()?;
            if (year + 1).rem_euclid(100) != second.parse::<i32>().ok()? {
                return None;
            }
            Some((head.to_string(), year, rest))
        }
        YearFormat::JoinedSplit => {
            let (head, rest) = raw.split_at_checked(6)?;
            if !digits(head) {
                return None;
            }
            let year: i32 = head[..4].parse().ok()?;
            if (year + 1).rem_euclid(100) != head[4..].parse::<i32>().ok()? {
                return None;
            }
            Some((head.to_string(), year, rest))
        }
    }
}

fn parse_quarter(rest: &str, format: QuarterFormat) -> Option<u32> {
    let (separator, has_q) = format.separator();
    let rest = rest.strip_prefix(separator)?;
    let rest = if has_q {
        rest.strip_prefix(['Q', 'q'])?
    } else {
        rest
    };
    if rest.len() != 1 {
        return None;
    }
    rest.parse().ok()
}

fn parse_month(rest: &str, format: MonthFormat) -> Option<u32> {
    match format {
        MonthFormat::Abbrev => {
            const MONTHS: [&str; 12] = [
                "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov",
                "dec",
            ];
            let lower = rest.to_lowercase();
            MONTHS
                .iter()
                .position(|m| *m == lower)
                .map(|i| i as u32 + 1)
        }
        MonthFormat::Prefixed => {
            let rest = rest.strip_prefix(['m', 'M'])?;
            let month: u32 = rest.parse().ok()?;
            (rest.len() == 2 && (1..=12).contains(&month)).then_some(month)
        }
        MonthFormat::Numeric => {
            let month: u32 = rest.parse().ok()?;
            (rest.len() == 2 && (1..=12).contains(&month)).then_some(month)
        }
    }
}

// ============================================================================
// Table emission
// ============================================================================

/// Build the period lookup for one date dimension and return the
/// observed bounds (None when no fact value parsed).
pub async fn build_date_lookup(
    ctx: &BuildContext,
    dimension: &Dimension,
    extractor: &DateExtractor,
) -> BuildResult<Option<DateBounds>> {
    let column = &dimension.fact_table_column;
    let fact_column = ctx
        .dataset
        .columns
        .iter()
        .find(|c| &c.name == column)
        .ok_or_else(|| BuildError::FactTableColumnMissing(column.clone()))?;

    let table_name = lookup_table_name(column);
    let create = CreateTable::new(&table_name)
        .schema(&ctx.schema)
        .column(ColumnDef::new(column, fact_column.data_type).not_null())
        .column(ColumnDef::new("language", DataType::Text).not_null())
        .column(ColumnDef::new("description", DataType::Text).not_null())
        .column(ColumnDef::new("hierarchy", DataType::Text))
        .column(ColumnDef::new("date_type", DataType::Text).not_null())
        // ISO text: appendable as-is and ordered the same as DATE
        .column(ColumnDef::new("start_date", DataType::Text).not_null())
        .column(ColumnDef::new("end_date", DataType::Text).not_null());
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;

    let distinct = Query::new()
        .select(vec![cast_text(col(column))])
        .distinct()
        .from(ctx.table(super::tables::FACT_TABLE))
        .filter(col(column).is_not_null())
        .order_by(vec![OrderByExpr::asc(cast_text(col(column)))]);
    let values = ctx.engine.query(&distinct.to_sql(ctx.dialect())).await?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut bounds: Option<DateBounds> = None;
    let mut matched = 0usize;

    for value_row in &values.rows {
        let raw = value_row[0].render();
        let Some(period) = parse_period(&raw, extractor) else {
            continue;
        };
        matched += 1;
        let observed = DateBounds {
            start: period.start,
            end: period.end,
        };
        bounds = Some(match bounds {
            Some(b) => b.widen(observed),
            None => observed,
        });

        for locale in SUPPORTED_LOCALES {
            rows.push(vec![
                CellValue::Text(raw.clone()),
                CellValue::Text(locale.tag().into()),
                CellValue::Text(raw.clone()),
                period
                    .hierarchy
                    .clone()
                    .map(CellValue::Text)
                    .unwrap_or(CellValue::Null),
                CellValue::Text(translate(period.period_type.translation_key(), locale).into()),
                CellValue::Text(period.start.format("%Y-%m-%d").to_string()),
                CellValue::Text(period.end.format("%Y-%m-%d").to_string()),
            ]);
        }
    }

    tracing::info!(
        dimension = %column,
        distinct = values.rows.len(),
        matched,
        "built date period lookup"
    );

    if !rows.is_empty() {
        ctx.engine.append_rows(&ctx.schema, &table_name, rows).await?;
    }

    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dimension::{DayFormat, YearType};

    fn extractor() -> DateExtractor {
        DateExtractor {
            year_type: YearType::Calendar,
            year_format: Some(YearFormat::Full),
            quarter_format: Some(QuarterFormat::Plain),
            month_format: Some(MonthFormat::Abbrev),
            date_format: None,
            quarter_total_is_fifth: false,
            start_day: None,
            start_month: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_calendar_year() {
        let p = parse_period("2019", &extractor()).unwrap();
        assert_eq!(p.period_type, PeriodType::Year);
        assert_eq!(p.start, date(2019, 1, 1));
        assert_eq!(p.end, date(2019, 12, 31));
        assert_eq!(p.hierarchy, None);
    }

    #[test]
    fn test_parse_calendar_quarters() {
        let p = parse_period("2019Q1", &extractor()).unwrap();
        assert_eq!(p.period_type, PeriodType::Quarter);
        assert_eq!(p.start, date(2019, 1, 1));
        assert_eq!(p.end, date(2019, 3, 31));
        assert_eq!(p.hierarchy.as_deref(), Some("2019"));

        let p = parse_period("2020Q1", &extractor()).unwrap();
        assert_eq!(p.end, date(2020, 3, 31));
    }

    #[test]
    fn test_parse_financial_year_quarter() {
        let ex = DateExtractor {
            year_type: YearType::Financial,
            year_format: Some(YearFormat::HyphenSplit),
            ..extractor()
        };
        let p = parse_period("2023-24Q1", &ex).unwrap();
        assert_eq!(p.start, date(2023, 4, 1));
        assert_eq!(p.end, date(2023, 6, 30));
        assert_eq!(p.hierarchy.as_deref(), Some("2023-24"));

        let year = parse_period("2023-24", &ex).unwrap();
        assert_eq!(year.start, date(2023, 4, 1));
        assert_eq!(year.end, date(2024, 3, 31));
    }

    #[test]
    fn test_parse_rejects_bad_split_continuation() {
        let ex = DateExtractor {
            year_format: Some(YearFormat::HyphenSplit),
            ..extractor()
        };
        assert!(parse_period("2023-25", &ex).is_none());
    }

    #[test]
    fn test_quarter_five_total() {
        let ex = DateExtractor {
            quarter_total_is_fifth: true,
            ..extractor()
        };
        let p = parse_period("2019Q5", &ex).unwrap();
        assert_eq!(p.period_type, PeriodType::Total);
        assert_eq!(p.start, date(2019, 1, 1));
        assert_eq!(p.end, date(2019, 12, 31));

        // Without the flag a fifth quarter is a non-match
        assert!(parse_period("2019Q5", &extractor()).is_none());
    }

    #[test]
    fn test_parse_named_month() {
        let p = parse_period("2019Feb", &extractor()).unwrap();
        assert_eq!(p.period_type, PeriodType::Month);
        assert_eq!(p.start, date(2019, 2, 1));
        assert_eq!(p.end, date(2019, 2, 28));
    }

    #[test]
    fn test_parse_financial_month_wraps_year() {
        let ex = DateExtractor {
            year_type: YearType::Financial,
            year_format: Some(YearFormat::HyphenSplit),
            month_format: Some(MonthFormat::Prefixed),
            ..extractor()
        };
        // January of financial year 2023-24 is January 2024
        let p = parse_period("2023-24m01", &ex).unwrap();
        assert_eq!(p.start, date(2024, 1, 1));
        // April stays in 2023
        let p = parse_period("2023-24m04", &ex).unwrap();
        assert_eq!(p.start, date(2023, 4, 1));
    }

    #[test]
    fn test_parse_point_in_time() {
        let ex = DateExtractor {
            date_format: Some(DayFormat::SlashDmy),
            ..extractor()
        };
        let p = parse_period("31/01/2020", &ex).unwrap();
        assert_eq!(p.period_type, PeriodType::Day);
        assert_eq!(p.start, date(2020, 1, 31));
        assert_eq!(p.end, date(2020, 1, 31));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_period("", &extractor()).is_none());
        assert!(parse_period("banana", &extractor()).is_none());
        assert!(parse_period("2019Q9", &extractor()).is_none());
        assert!(parse_period("19", &extractor()).is_none());
    }

    #[test]
    fn test_bounds_widen() {
        let a = DateBounds {
            start: date(2019, 1, 1),
            end: date(2019, 12, 31),
        };
        let b = DateBounds {
            start: date(2020, 1, 1),
            end: date(2020, 3, 31),
        };
        let w = a.widen(b);
        assert_eq!(w.start, date(2019, 1, 1));
        assert_eq!(w.end, date(2020, 3, 31));
    }
}
