//! Embedded translation store.
//!
//! Every string a cube publishes (note-code descriptions, date-period
//! type names, validation messages) and every keyword the builders match
//! against uploaded headers is resolved here, keyed by a dotted tag and
//! a locale. Metadata import pipelines live outside this crate; the
//! store ships the closed key set the engine itself needs.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::locale::Locale;

/// (key, en-GB, cy-GB)
const TRANSLATIONS: &[(&str, &str, &str)] = &[
    // --- note codes ---
    ("note_codes.a", "Average", "Cyfartaledd"),
    ("note_codes.b", "Break in series", "Toriad yn y gyfres"),
    ("note_codes.c", "Confidential", "Cyfrinachol"),
    ("note_codes.e", "Estimated", "Amcangyfrif"),
    ("note_codes.f", "Forecast", "Rhagolwg"),
    ("note_codes.k", "Low figure", "Ffigur isel"),
    (
        "note_codes.ns",
        "Not statistically significant",
        "Ddim yn ystadegol arwyddocaol",
    ),
    ("note_codes.p", "Provisional", "Dros dro"),
    ("note_codes.r", "Revised", "Diwygiwyd"),
    (
        "note_codes.s",
        "Statistically significant",
        "Ystadegol arwyddocaol",
    ),
    ("note_codes.t", "Total", "Cyfanswm"),
    ("note_codes.u", "Low reliability", "Dibynadwyedd isel"),
    (
        "note_codes.w",
        "None recorded in survey",
        "Dim wedi'i gofnodi yn yr arolwg",
    ),
    ("note_codes.x", "Not applicable", "Ddim yn berthnasol"),
    ("note_codes.z", "Not available", "Ddim ar gael"),
    ("note_codes.nr", "Not recorded", "Heb ei gofnodi"),
    ("note_codes.m", "Missing data", "Data ar goll"),
    // --- date period types ---
    ("period_type.year", "Year", "Blwyddyn"),
    ("period_type.quarter", "Quarter", "Chwarter"),
    ("period_type.month", "Month", "Mis"),
    ("period_type.week", "Week", "Wythnos"),
    ("period_type.day", "Day", "Dydd"),
    ("period_type.total", "Total", "Cyfanswm"),
    // --- lookup header keywords (join-column inference) ---
    ("keywords.description", "description", "disgrifiad"),
    ("keywords.sort", "sort", "trefn"),
    ("keywords.hierarchy", "hierarchy", "hierarchaeth"),
    ("keywords.note", "note", "nodiadau"),
    ("keywords.language", "lang", "iaith"),
    // --- column headings in published views ---
    ("headings.description", "Description", "Disgrifiad"),
    ("headings.measure", "Measure", "Mesur"),
    ("headings.notes", "Notes", "Nodiadau"),
    // --- validation messages ---
    (
        "errors.cube.no_first_revision",
        "No published revision exists to build from",
        "Nid oes diwygiad cyhoeddedig yn bodoli i adeiladu ohono",
    ),
    (
        "errors.cube.no_data_table",
        "The revision has no data table attached",
        "Nid oes tabl data ynghlwm wrth y diwygiad",
    ),
    (
        "errors.cube.unknown_file_type",
        "The uploaded file is not a supported format",
        "Nid yw'r ffeil a uwchlwythwyd mewn fformat a gefnogir",
    ),
    (
        "errors.cube.fact_table_creation_failed",
        "The fact table could not be created",
        "Nid oedd modd creu'r tabl ffeithiau",
    ),
    (
        "errors.cube.failed_to_load_data",
        "The data file could not be loaded",
        "Nid oedd modd llwytho'r ffeil ddata",
    ),
    (
        "errors.cube.duplicate_fact",
        "The data contains duplicate facts",
        "Mae'r data'n cynnwys ffeithiau dyblyg",
    ),
    (
        "errors.cube.incomplete_fact",
        "The data contains incomplete facts",
        "Mae'r data'n cynnwys ffeithiau anghyflawn",
    ),
    (
        "errors.cube.unknown_fact_error",
        "The fact table failed validation",
        "Methodd y tabl ffeithiau ei ddilysu",
    ),
    (
        "errors.cube.fact_table_column_missing",
        "A column named by the data table is missing",
        "Mae colofn a enwyd gan y tabl data ar goll",
    ),
    (
        "errors.cube.unmatched_columns",
        "The file columns do not match the dataset columns",
        "Nid yw colofnau'r ffeil yn cyfateb i golofnau'r set ddata",
    ),
    (
        "errors.cube.dimension_non_matched_rows",
        "Some values are missing from the dimension lookup",
        "Mae rhai gwerthoedd ar goll o dabl chwilio'r dimensiwn",
    ),
    (
        "errors.cube.measure_non_matched_rows",
        "Some values are missing from the measure table",
        "Mae rhai gwerthoedd ar goll o'r tabl mesur",
    ),
    (
        "errors.cube.invalid_csv",
        "The lookup file is not in a supported layout",
        "Nid yw'r ffeil chwilio mewn cynllun a gefnogir",
    ),
    (
        "errors.cube.no_join_column",
        "The lookup file has no unambiguous join column",
        "Nid oes gan y ffeil chwilio golofn uno ddiamwys",
    ),
    (
        "errors.cube.no_note_codes",
        "The note code column contains no codes",
        "Nid yw'r golofn codau nodiadau yn cynnwys unrhyw godau",
    ),
    (
        "errors.cube.bad_note_codes",
        "The note code column contains unrecognised codes",
        "Mae'r golofn codau nodiadau yn cynnwys codau anhysbys",
    ),
    (
        "errors.cube.no_data_value_column",
        "The dataset has no data value column",
        "Nid oes gan y set ddata golofn gwerth data",
    ),
    (
        "errors.cube.non_numeric_data_value",
        "The data value column contains non-numeric values",
        "Mae'r golofn gwerth data yn cynnwys gwerthoedd nad ydynt yn rhifau",
    ),
    (
        "errors.cube.cube_creation_failed",
        "The cube views could not be created",
        "Nid oedd modd creu golygfeydd y ciwb",
    ),
    (
        "errors.cube.unknown_error",
        "An unexpected error occurred while building the cube",
        "Digwyddodd gwall annisgwyl wrth adeiladu'r ciwb",
    ),
];

static STORE: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    TRANSLATIONS
        .iter()
        .map(|(key, en, cy)| (*key, (*en, *cy)))
        .collect()
});

/// Resolve a key for a locale, falling back to the key itself.
///
/// Untranslated keys rendering as their tag is deliberate: a missing
/// translation must be visible, not silently English.
pub fn translate(key: &str, locale: Locale) -> &str {
    match STORE.get(key) {
        Some((en, cy)) => match locale {
            Locale::En => en,
            Locale::Cy => cy,
        },
        None => key,
    }
}

/// Whether a key exists in the store.
pub fn has_key(key: &str) -> bool {
    STORE.contains_key(key)
}

/// The closed set of note codes, in display order.
pub const NOTE_CODES: &[&str] = &[
    "a", "b", "c", "e", "f", "k", "m", "nr", "ns", "p", "r", "s", "t", "u", "w", "x", "z",
];

/// Header keywords that disqualify a lookup column from being the join
/// column, across every supported locale.
pub fn reserved_header_keywords() -> Vec<String> {
    let mut keywords = Vec::new();
    for key in [
        "keywords.description",
        "keywords.sort",
        "keywords.hierarchy",
        "keywords.note",
        "keywords.language",
    ] {
        for locale in crate::locale::SUPPORTED_LOCALES {
            keywords.push(translate(key, locale).to_string());
        }
    }
    // "language" headers in English files usually spell it out
    keywords.push("language".to_string());
    keywords
}
