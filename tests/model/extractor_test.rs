use cubewright::locale::Locale;
use cubewright::model::dimension::{
    DateExtractor, Extractor, LanguageColumn, LookupTableExtractor, NumberExtractor, NumberKind,
    QuarterFormat, ReferenceDataExtractor, YearFormat, YearType,
};

#[test]
fn test_date_extractor_json_tag() {
    let extractor = Extractor::Date(DateExtractor {
        year_type: YearType::Calendar,
        year_format: Some(YearFormat::Full),
        quarter_format: Some(QuarterFormat::Plain),
        month_format: None,
        date_format: None,
        quarter_total_is_fifth: false,
        start_day: None,
        start_month: None,
    });
    let json = serde_json::to_value(&extractor).unwrap();
    assert_eq!(json["type"], "date");
    assert_eq!(json["year_type"], "calendar");
    assert_eq!(json["year_format"], "YYYY");
    assert_eq!(json["quarter_format"], "QX");
}

#[test]
fn test_lookup_extractor_roundtrip() {
    let extractor = Extractor::LookupTable(LookupTableExtractor {
        table_language: None,
        is_wide_form: true,
        description_columns: vec![
            LanguageColumn {
                lang: Locale::En,
                name: "Description_en".into(),
            },
            LanguageColumn {
                lang: Locale::Cy,
                name: "Disgrifiad_cy".into(),
            },
        ],
        sort_column: Some("Sort_order".into()),
        hierarchy_column: None,
        notes_columns: None,
        language_column: None,
    });
    let json = serde_json::to_string(&extractor).unwrap();
    let back: Extractor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, extractor);
}

#[test]
fn test_reference_data_extractor() {
    let json = r#"{"type":"reference_data","categories":["AgeBands","Gender"]}"#;
    let extractor: Extractor = serde_json::from_str(json).unwrap();
    match extractor {
        Extractor::ReferenceData(ReferenceDataExtractor { categories }) => {
            assert_eq!(categories, vec!["AgeBands", "Gender"]);
        }
        other => panic!("wrong variant: {other:?}"),
    }
}

#[test]
fn test_number_extractor() {
    let json = r#"{"type":"number","kind":"decimal","decimal_places":2}"#;
    let extractor: Extractor = serde_json::from_str(json).unwrap();
    match extractor {
        Extractor::Number(NumberExtractor {
            kind,
            decimal_places,
        }) => {
            assert_eq!(kind, NumberKind::Decimal);
            assert_eq!(decimal_places, Some(2));
        }
        other => panic!("wrong variant: {other:?}"),
    }
}

#[test]
fn test_unknown_tag_fails_fast() {
    let json = r#"{"type":"telepathy"}"#;
    assert!(serde_json::from_str::<Extractor>(json).is_err());
}

#[test]
fn test_long_form_description_column_is_shared() {
    let extractor = LookupTableExtractor {
        table_language: None,
        is_wide_form: false,
        description_columns: vec![LanguageColumn {
            lang: Locale::En,
            name: "Description".into(),
        }],
        sort_column: None,
        hierarchy_column: None,
        notes_columns: None,
        language_column: Some("Language".into()),
    };
    // Long form: the one description column serves every locale
    assert_eq!(extractor.description_column_for(Locale::En), Some("Description"));
    assert_eq!(extractor.description_column_for(Locale::Cy), Some("Description"));
}
