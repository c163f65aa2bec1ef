use chrono::NaiveDate;
use cubewright::builder::date_period::{parse_period, PeriodType};
use cubewright::model::dimension::{
    DateExtractor, DayFormat, MonthFormat, QuarterFormat, YearFormat, YearType,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn quarterly_calendar() -> DateExtractor {
    DateExtractor {
        year_type: YearType::Calendar,
        year_format: Some(YearFormat::Full),
        quarter_format: Some(QuarterFormat::Plain),
        month_format: None,
        date_format: None,
        quarter_total_is_fifth: false,
        start_day: None,
        start_month: None,
    }
}

#[test]
fn test_quarterly_coverage_scenario() {
    // Values ["2019Q1", "2019Q2", "2020Q1"]: the widest range runs
    // 2019-01-01 to 2020-03-31.
    let extractor = quarterly_calendar();
    let periods: Vec<_> = ["2019Q1", "2019Q2", "2020Q1"]
        .iter()
        .map(|v| parse_period(v, &extractor).unwrap())
        .collect();

    assert!(periods.iter().all(|p| p.period_type == PeriodType::Quarter));
    let min_start = periods.iter().map(|p| p.start).min().unwrap();
    let max_end = periods.iter().map(|p| p.end).max().unwrap();
    assert_eq!(min_start, date(2019, 1, 1));
    assert_eq!(max_end, date(2020, 3, 31));
}

#[test]
fn test_each_value_maps_to_one_period() {
    let extractor = quarterly_calendar();
    // A quarter value parses as a quarter, never also as a year
    let period = parse_period("2019Q4", &extractor).unwrap();
    assert_eq!(period.period_type, PeriodType::Quarter);
    assert_eq!(period.start, date(2019, 10, 1));
    assert_eq!(period.end, date(2019, 12, 31));
}

#[test]
fn test_quarter_formats() {
    let base = quarterly_calendar();

    let underscore = DateExtractor {
        quarter_format: Some(QuarterFormat::Underscore),
        ..base.clone()
    };
    assert!(parse_period("2019_Q1", &underscore).is_some());
    assert!(parse_period("2019Q1", &underscore).is_none());

    let hyphen = DateExtractor {
        quarter_format: Some(QuarterFormat::Hyphen),
        ..base.clone()
    };
    assert!(parse_period("2019-Q3", &hyphen).is_some());

    let bare = DateExtractor {
        quarter_format: Some(QuarterFormat::Bare),
        ..base
    };
    let period = parse_period("20192", &bare).unwrap();
    assert_eq!(period.start, date(2019, 4, 1));
}

#[test]
fn test_tax_year_start() {
    let extractor = DateExtractor {
        year_type: YearType::Tax,
        year_format: Some(YearFormat::SlashSplit),
        quarter_format: None,
        month_format: None,
        date_format: None,
        quarter_total_is_fifth: false,
        start_day: None,
        start_month: None,
    };
    let period = parse_period("2023/24", &extractor).unwrap();
    assert_eq!(period.start, date(2023, 4, 6));
    assert_eq!(period.end, date(2024, 4, 5));
}

#[test]
fn test_academic_year_with_joined_format() {
    let extractor = DateExtractor {
        year_type: YearType::Academic,
        year_format: Some(YearFormat::JoinedSplit),
        quarter_format: None,
        month_format: None,
        date_format: None,
        quarter_total_is_fifth: false,
        start_day: None,
        start_month: None,
    };
    let period = parse_period("202324", &extractor).unwrap();
    assert_eq!(period.period_type, PeriodType::Year);
    assert_eq!(period.start, date(2023, 9, 1));
    assert_eq!(period.end, date(2024, 8, 31));
    // A mismatched continuation is rejected
    assert!(parse_period("202325", &extractor).is_none());
}

#[test]
fn test_start_overrides() {
    let extractor = DateExtractor {
        year_type: YearType::Calendar,
        year_format: Some(YearFormat::Full),
        quarter_format: None,
        month_format: None,
        date_format: None,
        quarter_total_is_fifth: false,
        start_day: Some(15),
        start_month: Some(7),
    };
    let period = parse_period("2020", &extractor).unwrap();
    assert_eq!(period.start, date(2020, 7, 15));
    assert_eq!(period.end, date(2021, 7, 14));
}

#[test]
fn test_month_formats() {
    let named = DateExtractor {
        month_format: Some(MonthFormat::Abbrev),
        quarter_format: None,
        ..quarterly_calendar()
    };
    let period = parse_period("2019Dec", &named).unwrap();
    assert_eq!(period.period_type, PeriodType::Month);
    assert_eq!(period.end, date(2019, 12, 31));

    let numeric = DateExtractor {
        month_format: Some(MonthFormat::Numeric),
        quarter_format: None,
        ..quarterly_calendar()
    };
    let period = parse_period("201902", &numeric).unwrap();
    assert_eq!(period.start, date(2019, 2, 1));
    assert!(parse_period("201913", &numeric).is_none());
}

#[test]
fn test_quarter_and_month_disambiguation() {
    // Both formats configured: quarters win for Q-values, months for
    // month-shaped remainders.
    let extractor = DateExtractor {
        month_format: Some(MonthFormat::Abbrev),
        ..quarterly_calendar()
    };
    assert_eq!(
        parse_period("2019Q1", &extractor).unwrap().period_type,
        PeriodType::Quarter
    );
    assert_eq!(
        parse_period("2019Jan", &extractor).unwrap().period_type,
        PeriodType::Month
    );
}

#[test]
fn test_point_in_time_formats() {
    for (format, raw) in [
        (DayFormat::Iso, "2020-06-30"),
        (DayFormat::Compact, "20200630"),
        (DayFormat::SlashDmy, "30/06/2020"),
        (DayFormat::HyphenDmy, "30-06-2020"),
    ] {
        let extractor = DateExtractor {
            date_format: Some(format),
            ..quarterly_calendar()
        };
        let period = parse_period(raw, &extractor).unwrap();
        assert_eq!(period.period_type, PeriodType::Day, "{raw}");
        assert_eq!(period.start, date(2020, 6, 30), "{raw}");
        assert_eq!(period.end, date(2020, 6, 30), "{raw}");
    }
}

#[test]
fn test_leap_quarter() {
    let extractor = quarterly_calendar();
    let period = parse_period("2020Q1", &extractor).unwrap();
    // 2020 is a leap year; Q1 still ends on 31 March
    assert_eq!(period.end, date(2020, 3, 31));

    let monthly = DateExtractor {
        month_format: Some(MonthFormat::Abbrev),
        quarter_format: None,
        ..quarterly_calendar()
    };
    assert_eq!(
        parse_period("2020Feb", &monthly).unwrap().end,
        date(2020, 2, 29)
    );
}
