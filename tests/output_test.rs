//! Output service tests: exports, previews and the pivot over a real
//! built cube.

use std::io::Cursor;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use cubewright::builder::controller::CubeBuilder;
use cubewright::config::BuildSettings;
use cubewright::engine::{DuckDbEngine, SqlEngine};
use cubewright::filestore::{FileStore, LocalFileStore};
use cubewright::locale::Locale;
use cubewright::model::dimension::{
    Dimension, DimensionName, DimensionType, Extractor, LanguageColumn, LookupTableExtractor,
};
use cubewright::model::measure::{Measure, MeasureFormat, MeasureRow};
use cubewright::model::types::{ColumnRole, CubeState, DataTableAction, DataType, FileType};
use cubewright::model::{ColumnDescriptor, DataTable, Dataset, FactTableColumn, Revision};
use cubewright::output::{
    self, csv as csv_out, json as json_out, preview::preview, xlsx, FilterBy, SelectOptions,
    SortBy, ViewCursor,
};

const AREA_LOOKUP: &str = "\
AreaCode,Description_en,Description_cy,Sort
EN,England,Lloegr,1
WL,Wales,Cymru,2
";

const DATA: &str = "\
Area,Year,Measure,Data,Notes
EN,2019,1,10,
EN,2020,1,30,
WL,2019,1,20,
WL,2020,1,40,
";

/// Build one cube and hand back the engine plus the schema name.
async fn built_cube() -> (Arc<dyn SqlEngine>, Uuid, tempfile::TempDir) {
    let root = tempfile::tempdir().expect("tempdir");
    let engine: Arc<dyn SqlEngine> = Arc::new(DuckDbEngine::open_in_memory().expect("duckdb"));
    let store: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(root.path()));

    let dataset_id = Uuid::new_v4();
    let uploaded = Utc.timestamp_opt(100, 0).unwrap();
    let revision_id = Uuid::new_v4();

    let dataset = Dataset {
        id: dataset_id,
        group_id: Uuid::new_v4(),
        columns: vec![
            FactTableColumn::new("area", DataType::Text, 0, ColumnRole::Dimension),
            FactTableColumn::new("year", DataType::Text, 1, ColumnRole::Time),
            FactTableColumn::new("measure", DataType::BigInt, 2, ColumnRole::Measure),
            FactTableColumn::new("data_value", DataType::Double, 3, ColumnRole::DataValues),
            FactTableColumn::new("note_codes", DataType::Text, 4, ColumnRole::NoteCodes),
        ],
        measure: Some(Measure {
            id: Uuid::new_v4(),
            dataset_id,
            fact_table_column: "measure".into(),
            join_column: None,
            measure_table: [Locale::En, Locale::Cy]
                .into_iter()
                .map(|language| MeasureRow {
                    reference: "1".into(),
                    language,
                    description: "Amount".into(),
                    notes: None,
                    sort_order: None,
                    format: MeasureFormat::Integer,
                    decimals: None,
                    measure_type: None,
                    hierarchy: None,
                })
                .collect(),
        }),
        dimensions: vec![Dimension {
            id: Uuid::new_v4(),
            dataset_id,
            fact_table_column: "area".into(),
            dimension_type: DimensionType::LookupTable,
            extractor: Some(Extractor::LookupTable(LookupTableExtractor {
                table_language: None,
                is_wide_form: true,
                description_columns: vec![
                    LanguageColumn {
                        lang: Locale::En,
                        name: "Description_en".into(),
                    },
                    LanguageColumn {
                        lang: Locale::Cy,
                        name: "Description_cy".into(),
                    },
                ],
                sort_column: Some("Sort".into()),
                hierarchy_column: None,
                notes_columns: None,
                language_column: None,
            })),
            lookup_table: Some("area_lookup.csv".into()),
            join_column: None,
            names: vec![DimensionName {
                language: Locale::En,
                name: "Area".into(),
            }],
        }],
        revisions: vec![Revision {
            id: revision_id,
            dataset_id,
            index: Some(1),
            created_at: uploaded,
            approved_at: None,
            publish_at: None,
            unpublished_at: None,
            previous_revision_id: None,
            data_table: Some(DataTable {
                id: Uuid::new_v4(),
                file_type: FileType::Csv,
                filename: "r1.csv".into(),
                original_filename: "r1.csv".into(),
                mime_type: "text/csv".into(),
                file_hash: cubewright::filestore::content_hash(DATA.as_bytes()),
                uploaded_at: uploaded,
                action: DataTableAction::Add,
                column_descriptions: [
                    ("Area", "area"),
                    ("Year", "year"),
                    ("Measure", "measure"),
                    ("Data", "data_value"),
                    ("Notes", "note_codes"),
                ]
                .iter()
                .enumerate()
                .map(|(i, (file_column, fact_column))| ColumnDescriptor {
                    column_name: (*file_column).into(),
                    fact_table_column: (*fact_column).into(),
                    column_index: i as u32,
                })
                .collect(),
            }),
            tasks: None,
            cube_state: CubeState::Absent,
        }],
        info: vec![],
    };

    store
        .save(&dataset_id.to_string(), "area_lookup.csv", AREA_LOOKUP.as_bytes())
        .await
        .expect("save lookup");
    store
        .save(&dataset_id.to_string(), "r1.csv", DATA.as_bytes())
        .await
        .expect("save data");

    let builder = CubeBuilder::new(engine.clone(), store, BuildSettings::default());
    let outcome = builder
        .build_cube(Arc::new(dataset), revision_id)
        .await
        .expect("build");
    assert_eq!(outcome.state, CubeState::AwaitingMaterialisation);

    (engine, revision_id, root)
}

async fn cursor_for(
    engine: &Arc<dyn SqlEngine>,
    schema: &Uuid,
    options: &SelectOptions,
    page_size: u64,
) -> ViewCursor {
    let base = output::resolve_view_query(engine, &schema.to_string(), Locale::En, options)
        .await
        .expect("resolve");
    ViewCursor::new(engine.clone(), base, page_size)
}

#[tokio::test]
async fn test_csv_export_streams_all_rows() {
    let (engine, schema, _root) = built_cube().await;
    let options = SelectOptions {
        sort_by: Some(SortBy {
            column: "Area".into(),
            descending: false,
        }),
        filters: vec![],
    };
    // A page size smaller than the row count exercises the cursor
    let mut cursor = cursor_for(&engine, &schema, &options, 3).await;

    let mut out = Vec::new();
    let written = csv_out::write_csv(&mut cursor, &mut out).await.expect("csv");
    assert_eq!(written, 4);

    let text = String::from_utf8(out).expect("utf8");
    let mut lines = text.lines();
    let header = lines.next().expect("header");
    assert!(header.contains("Area"));
    assert!(header.contains("data_value"));
    assert_eq!(lines.count(), 4);
    assert!(text.contains("England"));
    assert!(text.contains("Wales"));
}

#[tokio::test]
async fn test_json_export_is_one_array() {
    let (engine, schema, _root) = built_cube().await;
    let mut cursor = cursor_for(&engine, &schema, &SelectOptions::default(), 3).await;

    let mut out = Vec::new();
    let written = json_out::write_json(&mut cursor, &mut out).await.expect("json");
    assert_eq!(written, 4);

    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid json");
    let rows = value.as_array().expect("array");
    assert_eq!(rows.len(), 4);
    assert!(rows[0].get("Area").is_some());
    assert!(rows[0].get("data_value").is_some());
}

#[tokio::test]
async fn test_workbook_export() {
    let (engine, schema, _root) = built_cube().await;
    let mut cursor = cursor_for(&engine, &schema, &SelectOptions::default(), 2).await;

    let mut buffer = Cursor::new(Vec::new());
    let written = xlsx::write_workbook(&mut cursor, &mut buffer)
        .await
        .expect("workbook");
    assert_eq!(written, 4);

    let out = buffer.into_inner();
    assert_eq!(&out[0..2], b"PK");
}

#[tokio::test]
async fn test_parquet_export() {
    let (engine, schema, root) = built_cube().await;
    let path = root.path().join("out.parquet");
    output::export_parquet(
        &engine,
        &schema.to_string(),
        Locale::En,
        path.to_str().expect("utf8 path"),
    )
    .await
    .expect("parquet");

    // The engine can read its own output back
    let rows = engine
        .query(&format!(
            "SELECT COUNT(*) FROM read_parquet('{}')",
            path.display()
        ))
        .await
        .expect("read back");
    assert_eq!(rows.scalar().and_then(|c| c.as_i64()), Some(4));
}

#[tokio::test]
async fn test_preview_pagination() {
    let (engine, schema, _root) = built_cube().await;
    let options = SelectOptions {
        sort_by: Some(SortBy {
            column: "year".into(),
            descending: false,
        }),
        filters: vec![],
    };

    let page = preview(&engine, &schema.to_string(), Locale::En, &options, 1, 3)
        .await
        .expect("preview");
    assert_eq!(page.total_lines, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.data.len(), 3);
    assert_eq!(page.start_record, 1);
    assert_eq!(page.end_record, 3);

    let page2 = preview(&engine, &schema.to_string(), Locale::En, &options, 2, 3)
        .await
        .expect("preview");
    assert_eq!(page2.data.len(), 1);
    assert_eq!(page2.start_record, 4);
    assert_eq!(page2.end_record, 4);
}

#[tokio::test]
async fn test_empty_preview_is_a_page_not_an_error() {
    let (engine, schema, _root) = built_cube().await;
    let options = SelectOptions {
        sort_by: None,
        filters: vec![FilterBy {
            fact_table_column: "area".into(),
            references: vec!["XX".into()],
        }],
    };

    let page = preview(&engine, &schema.to_string(), Locale::En, &options, 1, 10)
        .await
        .expect("empty preview");
    assert_eq!(page.total_lines, 0);
    assert!(page.data.is_empty());
    assert_eq!(page.start_record, 0);
    assert_eq!(page.end_record, 0);
}

#[tokio::test]
async fn test_filter_by_reference() {
    let (engine, schema, _root) = built_cube().await;
    let options = SelectOptions {
        sort_by: None,
        filters: vec![FilterBy {
            fact_table_column: "area".into(),
            references: vec!["EN".into()],
        }],
    };

    let page = preview(&engine, &schema.to_string(), Locale::En, &options, 1, 10)
        .await
        .expect("preview");
    assert_eq!(page.total_lines, 2);
    let area_index = page.headers.iter().position(|h| h == "Area").expect("Area");
    for row in &page.data {
        assert_eq!(row[area_index], "England");
    }
}

#[tokio::test]
async fn test_sort_by_unknown_column_rejected() {
    let (engine, schema, _root) = built_cube().await;
    let options = SelectOptions {
        sort_by: Some(SortBy {
            column: "nonsense".into(),
            descending: true,
        }),
        filters: vec![],
    };
    assert!(
        output::resolve_view_query(&engine, &schema.to_string(), Locale::En, &options)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_pivot() {
    let (engine, schema, _root) = built_cube().await;
    let rows = output::pivot(
        &engine,
        &schema.to_string(),
        "data_value",
        "year",
        "area",
        &[],
    )
    .await
    .expect("pivot");

    // One row per area, one aggregated column per distinct year
    assert_eq!(rows.columns, vec!["area", "2019", "2020"]);
    assert_eq!(rows.rows.len(), 2);

    let filtered = output::pivot(
        &engine,
        &schema.to_string(),
        "data_value",
        "year",
        "area",
        &[("area".into(), "EN".into())],
    )
    .await
    .expect("pivot filtered");
    assert_eq!(filtered.rows.len(), 1);
}
