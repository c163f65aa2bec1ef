use cubewright::model::types::DataType;
use cubewright::sql::ddl::{
    ColumnDef, CreateSchema, CreateTable, CreateView, DropSchema, DropTable, DropView,
    RenameTable, TableConstraint,
};
use cubewright::sql::dml::{Delete, Insert, Update};
use cubewright::sql::expr::{col, lit_str, table_col, ExprExt};
use cubewright::sql::query::{Query, TableRef};
use cubewright::sql::Dialect;

#[test]
fn test_create_schema() {
    let sql = CreateSchema::new("0b7ad368-3151-4a17-8bb3-1c7e0e1c5c0f")
        .if_not_exists()
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "CREATE SCHEMA IF NOT EXISTS \"0b7ad368-3151-4a17-8bb3-1c7e0e1c5c0f\""
    );
}

#[test]
fn test_drop_schema_cascade() {
    let sql = DropSchema::new("rev").if_exists().cascade().to_sql(Dialect::Postgres);
    assert_eq!(sql, "DROP SCHEMA IF EXISTS \"rev\" CASCADE");
}

#[test]
fn test_create_table_with_grain_key() {
    let sql = CreateTable::new("fact_table_keyed")
        .schema("rev")
        .column(ColumnDef::new("area", DataType::Text).not_null())
        .column(ColumnDef::new("year", DataType::Text).not_null())
        .column(ColumnDef::new("data_value", DataType::Double))
        .constraint(TableConstraint::primary_key(["area", "year"]))
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "CREATE TABLE \"rev\".\"fact_table_keyed\" (\
         \"area\" TEXT NOT NULL, \
         \"year\" TEXT NOT NULL, \
         \"data_value\" DOUBLE PRECISION, \
         PRIMARY KEY (\"area\", \"year\"))"
    );
}

#[test]
fn test_create_table_as_select() {
    let sql = CreateTable::new("update_table")
        .schema("rev")
        .as_select(Query::new().select_star().from(TableRef::new("load_0").with_schema("rev")))
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "CREATE TABLE \"rev\".\"update_table\" AS SELECT * FROM \"rev\".\"load_0\""
    );
}

#[test]
fn test_rename_table() {
    let sql = RenameTable::new("fact_table_keyed", "fact_table")
        .schema("rev")
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "ALTER TABLE \"rev\".\"fact_table_keyed\" RENAME TO \"fact_table\""
    );
}

#[test]
fn test_drop_table_if_exists() {
    let sql = DropTable::new("load_0").schema("rev").if_exists().to_sql(Dialect::DuckDb);
    assert_eq!(sql, "DROP TABLE IF EXISTS \"rev\".\"load_0\"");
}

#[test]
fn test_create_view_or_replace() {
    let body = Query::new().select_star().from(TableRef::new("fact_table").with_schema("rev"));
    let sql = CreateView::new("default_view_en", body)
        .schema("rev")
        .or_replace()
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "CREATE OR REPLACE VIEW \"rev\".\"default_view_en\" AS \
         SELECT * FROM \"rev\".\"fact_table\""
    );
}

#[test]
fn test_materialized_view_postgres() {
    let body = Query::new().select_star().from(TableRef::new("default_view_en").with_schema("rev"));
    let sql = CreateView::new("default_mat_view_en", body)
        .schema("rev")
        .materialized()
        .to_sql(Dialect::Postgres);
    assert!(sql.starts_with("CREATE MATERIALIZED VIEW \"rev\".\"default_mat_view_en\" AS"));
}

#[test]
fn test_drop_view() {
    let sql = DropView::new("raw_view_cy").schema("rev").if_exists().to_sql(Dialect::DuckDb);
    assert_eq!(sql, "DROP VIEW IF EXISTS \"rev\".\"raw_view_cy\"");
}

#[test]
fn test_insert_select_roundtrip_shape() {
    let sql = Insert::into("fact_table")
        .schema("rev")
        .columns(["area", "year"])
        .from_select(
            Query::new()
                .select(vec![col("AreaCode"), col("Year")])
                .from(TableRef::new("load_0").with_schema("rev")),
        )
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "INSERT INTO \"rev\".\"fact_table\" (\"area\", \"year\") \
         SELECT \"AreaCode\", \"Year\" FROM \"rev\".\"load_0\""
    );
}

#[test]
fn test_update_from_where() {
    let sql = Update::table("fact_table")
        .schema("rev")
        .set("data_value", table_col("update_table", "data_value"))
        .from(TableRef::new("update_table").with_schema("rev"))
        .filter(table_col("fact_table", "area").eq(table_col("update_table", "area")))
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "UPDATE \"rev\".\"fact_table\" SET \"data_value\" = \"update_table\".\"data_value\" \
         FROM \"rev\".\"update_table\" \
         WHERE \"fact_table\".\"area\" = \"update_table\".\"area\""
    );
}

#[test]
fn test_delete_using() {
    let sql = Delete::from("update_table")
        .schema("rev")
        .using(TableRef::new("fact_table").with_schema("rev"))
        .filter(table_col("update_table", "area").eq(table_col("fact_table", "area")))
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        sql,
        "DELETE FROM \"rev\".\"update_table\" USING \"rev\".\"fact_table\" \
         WHERE \"update_table\".\"area\" = \"fact_table\".\"area\""
    );
}

#[test]
fn test_metadata_upsert_pair() {
    let delete = Delete::from("metadata")
        .schema("rev")
        .filter(col("key").eq(lit_str("build_status")))
        .to_sql(Dialect::DuckDb);
    let insert = Insert::into("metadata")
        .schema("rev")
        .columns(["key", "value"])
        .values([lit_str("build_status"), lit_str("complete")])
        .to_sql(Dialect::DuckDb);
    assert_eq!(
        delete,
        "DELETE FROM \"rev\".\"metadata\" WHERE \"key\" = 'build_status'"
    );
    assert_eq!(
        insert,
        "INSERT INTO \"rev\".\"metadata\" (\"key\", \"value\") VALUES ('build_status', 'complete')"
    );
}
