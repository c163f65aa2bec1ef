//! Paginated previews.
//!
//! Computes `total_lines` by wrapping the base query in a COUNT(*) and
//! returns the requested page. An empty result set is a valid page with
//! `end_record = 0`, never an error.

use std::sync::Arc;

use serde::Serialize;

use crate::engine::SqlEngine;
use crate::error::BuildResult;
use crate::locale::Locale;
use crate::output::{resolve_view_query, SelectOptions};
use crate::sql::expr::count_star;
use crate::sql::query::Query;

/// One preview page of a cube view.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewPage {
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
    pub current_page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub total_lines: u64,
    /// 1-based index of the first row on this page; 0 when empty.
    pub start_record: u64,
    /// 1-based index of the last row on this page; 0 when empty.
    pub end_record: u64,
}

/// Fetch one page of `default_view_{lang}`.
pub async fn preview(
    engine: &Arc<dyn SqlEngine>,
    schema: &str,
    locale: Locale,
    options: &SelectOptions,
    page_number: u64,
    page_size: u64,
) -> BuildResult<PreviewPage> {
    let page_number = page_number.max(1);
    let page_size = page_size.max(1);
    let base = resolve_view_query(engine, schema, locale, options).await?;

    let total_lines = count_rows(engine, base.clone()).await?;
    let total_pages = total_lines.div_ceil(page_size);

    let offset = (page_number - 1) * page_size;
    let page_query = base.limit(page_size).offset(offset);
    let rows = engine.query(&page_query.to_sql(engine.dialect())).await?;

    let fetched = rows.len() as u64;
    let (start_record, end_record) = if fetched == 0 {
        (0, 0)
    } else {
        (offset + 1, offset + fetched)
    };

    Ok(PreviewPage {
        headers: rows.columns.clone(),
        data: rows
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.render()).collect())
            .collect(),
        current_page: page_number,
        page_size,
        total_pages,
        total_lines,
        start_record,
        end_record,
    })
}

/// `SELECT COUNT(*) FROM (<base>) AS preview_count`
async fn count_rows(engine: &Arc<dyn SqlEngine>, base: Query) -> BuildResult<u64> {
    let count = Query::new()
        .select(vec![count_star()])
        .from_subquery(base, "preview_count");
    let rows = engine.query(&count.to_sql(engine.dialect())).await?;
    Ok(rows.scalar().and_then(|c| c.as_i64()).unwrap_or(0) as u64)
}
