use chrono::{NaiveDate, NaiveTime};
use dbstmt::{
    backend::memory::{MemoryBackend, MemoryDataSet, MemorySession},
    catalog::ty::ColumnType,
    config::{EMPTY_STRING_IS_NULL, FORCE_EMPTY_STRING},
    error::{Error, StmtResult},
    exec::{Extract, Extraction, Storage, Value},
    Statement,
};

mod test_utils;

fn sample(ty: ColumnType) -> Value {
    let date = NaiveDate::from_ymd_opt(2023, 3, 14).unwrap();
    let time = NaiveTime::from_hms_opt(15, 9, 26).unwrap();
    match ty {
        ColumnType::Bool => Value::Bool(true),
        ColumnType::Int8 => Value::Int8(-8),
        ColumnType::UInt8 => Value::UInt8(8),
        ColumnType::Int16 => Value::Int16(-16),
        ColumnType::UInt16 => Value::UInt16(16),
        ColumnType::Int32 => Value::Int32(-32),
        ColumnType::UInt32 => Value::UInt32(32),
        ColumnType::Int64 => Value::Int64(-64),
        ColumnType::UInt64 => Value::UInt64(64),
        ColumnType::Float => Value::Float(1.5),
        ColumnType::Double => Value::Double(2.25),
        ColumnType::String => Value::from("text"),
        ColumnType::Blob => Value::Blob(vec![0xde, 0xad]),
        ColumnType::Date => Value::Date(date),
        ColumnType::Time => Value::Time(time),
        ColumnType::Timestamp => Value::Timestamp(date.and_time(time)),
        ColumnType::Unknown => Value::Null,
    }
}

#[test]
fn test_generated_extractions_for_every_supported_type() -> StmtResult<()> {
    let mut dataset = MemoryDataSet::new();
    for ty in ColumnType::SUPPORTED {
        dataset = dataset.column(&format!("c_{ty}"), ty);
    }
    let row: Vec<_> = ColumnType::SUPPORTED.into_iter().map(sample).collect();
    let nulls = vec![Value::Null; row.len()];
    let dataset = dataset.row(row.clone()).row(nulls);

    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT * FROM everything", vec![dataset]);
    assert_eq!(stmt.execute()?, 2);
    assert_eq!(stmt.columns_extracted(None), ColumnType::SUPPORTED.len());

    let extractions = stmt.extractions();
    assert_eq!(extractions.len(), ColumnType::SUPPORTED.len());
    for (pos, extraction) in extractions.iter().enumerate() {
        let column = extraction.column().unwrap();
        assert_eq!(column.position, pos);
        assert_eq!(column.ty, ColumnType::SUPPORTED[pos]);
        assert_eq!(extraction.value(0), Some(row[pos].clone()), "column {}", column.name);
        assert_eq!(extraction.value(1), Some(Value::Null), "column {}", column.name);
    }
    Ok(())
}

#[test]
fn test_unknown_column_type_registers_nothing() {
    let dataset = MemoryDataSet::new()
        .column("id", ColumnType::Int32)
        .column("geometry", ColumnType::Unknown)
        .row(vec![Value::Int32(1), Value::Null]);

    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT * FROM shapes", vec![dataset]);

    let err = stmt.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedType { column, ty: ColumnType::Unknown } if column == "geometry"
    ));
    assert!(stmt.extractions().is_empty());
}

#[test]
fn test_stored_procedure_has_no_generated_extractions() -> StmtResult<()> {
    let session = MemorySession::new();
    let backend = MemoryBackend::new(vec![test_utils::id_rows(3)]).stored_procedure();
    let mut stmt = Statement::new(&session, backend);
    stmt.append_sql("CALL refresh()");

    stmt.execute()?;
    assert!(stmt.extractions().is_empty());
    assert_eq!(stmt.rows_extracted(None), 0);
    Ok(())
}

#[test]
fn test_explicit_extraction_into_caller_sink() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(3)]);

    let extract = Extract::<i32>::new();
    let sink = extract.sink();
    stmt.add_extract(Box::new(extract))?;

    assert_eq!(stmt.execute()?, 3);
    assert_eq!(stmt.extractions().len(), 1);
    assert_eq!(sink.borrow().to_vec(), vec![Some(1), Some(2), Some(3)]);
    Ok(())
}

#[test]
fn test_mismatched_extraction_type() {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(1)]);
    stmt.add_extract(Box::new(Extract::<String>::new())).unwrap();

    let err = stmt.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::BadCast {
            expected: "string",
            found: "int32"
        }
    ));
}

#[test]
fn test_storage_mode() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(3)]);
    assert_eq!(stmt.storage(), Storage::Unknown);

    stmt.set_storage("LIST")?;
    assert_eq!(stmt.storage(), Storage::List);

    let err = stmt.set_storage("map").unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    assert_eq!(stmt.storage(), Storage::List);

    assert_eq!(stmt.execute()?, 3);
    let expected: Vec<_> = (1..=3).map(Value::Int32).collect();
    assert_eq!(test_utils::extracted(&stmt, 0), expected);
    Ok(())
}

fn strings() -> MemoryDataSet {
    MemoryDataSet::new()
        .column("name", ColumnType::String)
        .row(vec![Value::from("")])
        .row(vec![Value::Null])
        .row(vec![Value::from("x")])
}

#[test]
fn test_empty_string_is_null() -> StmtResult<()> {
    let mut session = MemorySession::new();
    session.set_feature(EMPTY_STRING_IS_NULL, true)?;
    let mut stmt = test_utils::statement(&session, "SELECT name FROM t", vec![strings()]);

    assert_eq!(stmt.execute()?, 3);
    assert_eq!(
        test_utils::extracted(&stmt, 0),
        vec![Value::Null, Value::Null, Value::from("x")]
    );
    Ok(())
}

#[test]
fn test_force_empty_string() -> StmtResult<()> {
    let mut session = MemorySession::new();
    session.set_feature(FORCE_EMPTY_STRING, true)?;
    let mut stmt = test_utils::statement(&session, "SELECT name FROM t", vec![strings()]);

    assert_eq!(stmt.execute()?, 3);
    assert_eq!(
        test_utils::extracted(&stmt, 0),
        vec![Value::from(""), Value::from(""), Value::from("x")]
    );
    Ok(())
}

#[test]
fn test_unknown_session_feature() {
    let mut session = MemorySession::new();
    let err = session.set_feature("autoCommit", true).unwrap_err();
    assert!(matches!(err, Error::FeatureNotSupported(name) if name == "autoCommit"));
}
