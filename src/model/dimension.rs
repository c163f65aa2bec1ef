//! Dimensions and their extractors.
//!
//! A dimension is a categorical axis of the fact table. The extractor is
//! the caller-supplied configuration telling the builder how to interpret
//! the column: a date grammar, a lookup file layout, a reference-data
//! category set, or a plain numeric rendering. Extractors are stored as
//! tagged JSON; an unknown tag fails deserialisation outright.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::locale::Locale;

/// A categorical axis of the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: Uuid,
    pub dataset_id: Uuid,
    /// Name of the fact-table column this dimension describes.
    pub fact_table_column: String,
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    pub extractor: Option<Extractor>,
    /// Filename of the uploaded lookup table, when one exists.
    pub lookup_table: Option<String>,
    /// Explicit join column; inferred from the lookup header otherwise.
    pub join_column: Option<String>,
    /// Display name per locale, falling back to the column name.
    #[serde(default)]
    pub names: Vec<DimensionName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionName {
    pub language: Locale,
    pub name: String,
}

impl Dimension {
    /// Display name for a locale, falling back to the column name.
    pub fn name_for(&self, locale: Locale) -> &str {
        self.names
            .iter()
            .find(|n| n.language == locale)
            .map(|n| n.name.as_str())
            .unwrap_or(&self.fact_table_column)
    }
}

/// How the dimension column is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    /// No interpretation; the raw value is the description.
    Raw,
    Numeric,
    Text,
    Symbol,
    Date,
    DatePeriod,
    LookupTable,
    ReferenceData,
}

/// Tagged extractor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Extractor {
    Date(DateExtractor),
    LookupTable(LookupTableExtractor),
    ReferenceData(ReferenceDataExtractor),
    Number(NumberExtractor),
}

// ============================================================================
// Date extractor
// ============================================================================

/// Grammar for date-like fact values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateExtractor {
    pub year_type: YearType,
    /// How the year component is written, e.g. `2023` or `2023-24`.
    pub year_format: Option<YearFormat>,
    pub quarter_format: Option<QuarterFormat>,
    pub month_format: Option<MonthFormat>,
    /// Format for point-in-time values.
    pub date_format: Option<DayFormat>,
    /// Treat a fifth quarter as the year total.
    #[serde(default)]
    pub quarter_total_is_fifth: bool,
    /// Override the year start day (defaults per `year_type`).
    pub start_day: Option<u32>,
    /// Override the year start month (defaults per `year_type`).
    pub start_month: Option<u32>,
}

/// The kind of year the dataset is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearType {
    /// 1 January - 31 December
    Calendar,
    /// 1 March - end of February
    Meteorological,
    /// 1 April - 31 March
    Financial,
    /// 6 April - 5 April
    Tax,
    /// 1 September - 31 August
    Academic,
}

impl YearType {
    /// Default (day, month) the year starts on.
    pub fn start(&self) -> (u32, u32) {
        match self {
            YearType::Calendar => (1, 1),
            YearType::Meteorological => (1, 3),
            YearType::Financial => (1, 4),
            YearType::Tax => (6, 4),
            YearType::Academic => (1, 9),
        }
    }
}

/// How the year component is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearFormat {
    /// `2023`
    #[serde(rename = "YYYY")]
    Full,
    /// `2023-24`
    #[serde(rename = "YYYY-YY")]
    HyphenSplit,
    /// `2023/24`
    #[serde(rename = "YYYY/YY")]
    SlashSplit,
    /// `202324`
    #[serde(rename = "YYYYYY")]
    JoinedSplit,
}

/// How the quarter component is appended to the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarterFormat {
    /// `2023Q1`
    #[serde(rename = "QX")]
    Plain,
    /// `2023_Q1`
    #[serde(rename = "_QX")]
    Underscore,
    /// `2023-Q1`
    #[serde(rename = "-QX")]
    Hyphen,
    /// `20231` - a bare trailing digit
    #[serde(rename = "X")]
    Bare,
}

impl QuarterFormat {
    /// The characters between year and quarter number, and whether a
    /// literal `Q` precedes the number.
    pub fn separator(&self) -> (&'static str, bool) {
        match self {
            QuarterFormat::Plain => ("", true),
            QuarterFormat::Underscore => ("_", true),
            QuarterFormat::Hyphen => ("-", true),
            QuarterFormat::Bare => ("", false),
        }
    }
}

/// How the month component is appended to the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthFormat {
    /// `2023Jan`
    #[serde(rename = "MMM")]
    Abbrev,
    /// `2023m01`
    #[serde(rename = "mMM")]
    Prefixed,
    /// `202301`
    #[serde(rename = "MM")]
    Numeric,
}

/// Format of point-in-time values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayFormat {
    #[serde(rename = "yyyy-MM-dd")]
    Iso,
    #[serde(rename = "yyyyMMdd")]
    Compact,
    #[serde(rename = "dd/MM/yyyy")]
    SlashDmy,
    #[serde(rename = "dd-MM-yyyy")]
    HyphenDmy,
}

impl DayFormat {
    /// chrono strftime pattern.
    pub fn chrono_pattern(&self) -> &'static str {
        match self {
            DayFormat::Iso => "%Y-%m-%d",
            DayFormat::Compact => "%Y%m%d",
            DayFormat::SlashDmy => "%d/%m/%Y",
            DayFormat::HyphenDmy => "%d-%m-%Y",
        }
    }
}

// ============================================================================
// Lookup-table extractor
// ============================================================================

/// Layout of an uploaded lookup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTableExtractor {
    /// Language of a single-language file; `None` for multilingual files.
    pub table_language: Option<Locale>,
    /// Wide form carries one description column per language; long form
    /// one description column plus a language column.
    #[serde(default)]
    pub is_wide_form: bool,
    pub description_columns: Vec<LanguageColumn>,
    pub sort_column: Option<String>,
    pub hierarchy_column: Option<String>,
    #[serde(default)]
    pub notes_columns: Option<Vec<LanguageColumn>>,
    pub language_column: Option<String>,
}

/// A file column carrying values for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageColumn {
    pub lang: Locale,
    pub name: String,
}

impl LookupTableExtractor {
    /// Description column for a locale; wide form requires one per
    /// locale, long form repeats the single column.
    pub fn description_column_for(&self, locale: Locale) -> Option<&str> {
        if self.is_wide_form {
            self.description_columns
                .iter()
                .find(|c| c.lang == locale)
                .map(|c| c.name.as_str())
        } else {
            self.description_columns.first().map(|c| c.name.as_str())
        }
    }

    pub fn notes_column_for(&self, locale: Locale) -> Option<&str> {
        let cols = self.notes_columns.as_ref()?;
        if self.is_wide_form {
            cols.iter().find(|c| c.lang == locale).map(|c| c.name.as_str())
        } else {
            cols.first().map(|c| c.name.as_str())
        }
    }
}

// ============================================================================
// Reference-data extractor
// ============================================================================

/// Restriction of the embedded reference-data catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDataExtractor {
    /// Category keys this dimension draws from.
    pub categories: Vec<String>,
}

// ============================================================================
// Number extractor
// ============================================================================

/// Plain numeric rendering for `Numeric` dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberExtractor {
    pub kind: NumberKind,
    pub decimal_places: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    Integer,
    Decimal,
}
