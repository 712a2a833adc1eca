use dbstmt::{
    backend::memory::{MemoryBackend, MemoryDataSet, MemorySession},
    catalog::ty::ColumnType,
    exec::{Extraction, Value},
    Statement,
};

/// Sets up tracing subscriber.
#[allow(dead_code)]
pub fn setup_tracing(level: Option<&str>) {
    use tracing_subscriber::{
        fmt::{format::FmtSpan, layer},
        layer::SubscriberExt,
        util::SubscriberInitExt,
        EnvFilter,
    };

    let filter_layer = level
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or("warn".into()));
    let fmt_layer = layer().with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

/// A single `id INT32` column holding `1..=count`.
#[allow(dead_code)]
pub fn id_rows(count: i32) -> MemoryDataSet {
    (1..=count).fold(
        MemoryDataSet::new().column("id", ColumnType::Int32),
        |dataset, id| dataset.row(vec![Value::Int32(id)]),
    )
}

/// A dataset with no result columns, affecting `rows` rows per execution.
#[allow(dead_code)]
pub fn command(rows: u32) -> MemoryDataSet {
    MemoryDataSet::new().affected(rows)
}

/// Creates a statement over the given datasets with `sql` as its text.
#[allow(dead_code)]
pub fn statement<'s>(
    session: &'s MemorySession,
    sql: &str,
    datasets: Vec<MemoryDataSet>,
) -> Statement<'s, MemoryBackend> {
    let mut stmt = Statement::new(session, MemoryBackend::new(datasets));
    stmt.append_sql(sql);
    stmt
}

/// Collects the values extracted by the first extraction of `dataset`.
#[allow(dead_code)]
pub fn extracted(stmt: &Statement<'_, MemoryBackend>, dataset: usize) -> Vec<Value> {
    let Some(extraction) = stmt.extractions_at(dataset).first() else {
        return Vec::new();
    };
    (0..extraction.rows_handled())
        .map(|row| extraction.value(row).unwrap())
        .collect()
}
