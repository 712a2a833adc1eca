use dbstmt::{
    backend::memory::MemorySession,
    error::{Error, StmtResult},
    exec::{Bind, Value},
    limit::{Bulk, Limit},
    State,
};

mod test_utils;

#[test]
fn test_soft_limit_pages_through_rows() -> StmtResult<()> {
    // test_utils::setup_tracing(Some("debug"));

    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(10)]);
    stmt.set_extraction_limit(Limit::upper(4, false));

    assert_eq!(stmt.execute()?, 4);
    assert_eq!(stmt.state(), State::Paused);
    assert_eq!(stmt.execute()?, 4);
    assert_eq!(stmt.state(), State::Paused);
    assert_eq!(stmt.execute()?, 2);
    assert!(stmt.is_done());

    assert_eq!(stmt.rows_extracted(None), 10);
    let expected: Vec<_> = (1..=10).map(Value::Int32).collect();
    assert_eq!(test_utils::extracted(&stmt, 0), expected);

    // Nothing left once done.
    assert_eq!(stmt.execute()?, 0);
    assert_eq!(stmt.rows_extracted(None), 10);
    Ok(())
}

#[test]
fn test_unlimited_extracts_everything() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(10)]);

    assert_eq!(stmt.execute()?, 10);
    assert!(stmt.is_done());
    assert_eq!(stmt.columns_extracted(None), 1);
    Ok(())
}

#[test]
fn test_hard_limit_exceeded() {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(10)]);
    stmt.set_extraction_limit(Limit::upper(4, true));

    let err = stmt.execute().unwrap_err();
    assert!(matches!(err, Error::HardLimitExceeded { limit: 4 }));
    assert_eq!(stmt.rows_extracted(None), 4);
    assert_eq!(stmt.columns_extracted(None), 1);
    assert!(!stmt.is_done());
}

#[test]
fn test_hard_limit_with_exact_row_count() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(4)]);
    stmt.set_extraction_limit(Limit::upper(4, true));

    assert_eq!(stmt.execute()?, 4);
    assert!(stmt.is_done());
    Ok(())
}

#[test]
fn test_zero_limit_is_done_immediately() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(3)]);
    stmt.set_extraction_limit(Limit::upper(0, false));

    assert_eq!(stmt.execute()?, 0);
    assert!(stmt.is_done());
    assert_eq!(stmt.rows_extracted(None), 0);
    Ok(())
}

#[test]
fn test_lower_limit_above_upper_limit() {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(10)]);
    stmt.set_extraction_limit(Limit::upper(3, false));
    stmt.set_extraction_limit(Limit::lower(5));

    let err = stmt.execute().unwrap_err();
    assert!(matches!(err, Error::LimitViolation { lower: 5, upper: 3 }));
    assert_eq!(stmt.backend().compile_count(), 0);
    assert_eq!(stmt.state(), State::Initialized);
}

#[test]
fn test_lower_limit_not_reached() {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(3)]);
    stmt.set_extraction_limit(Limit::lower(5));

    let err = stmt.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientData {
            expected: 5,
            actual: 3
        }
    ));
    assert!(stmt.is_done());
}

#[test]
fn test_lower_and_upper_limits_are_independent() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(3)]);
    stmt.set_extraction_limit(Limit::lower(3));
    stmt.set_extraction_limit(Limit::upper(5, false));
    assert_eq!(stmt.lower_limit(), 3);
    assert_eq!(stmt.extraction_limit(), 5);

    assert_eq!(stmt.execute()?, 3);
    assert!(stmt.is_done());
    Ok(())
}

#[test]
fn test_bulk_size_conflicting_with_limit() {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(3)]);
    stmt.set_extraction_limit(Limit::upper(4, false));

    let err = stmt.set_bulk_extraction(Bulk::new(5)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    assert!(!stmt.is_bulk_extraction());
    assert_eq!(stmt.extraction_limit(), 4);

    stmt.set_bulk_extraction(Bulk::new(4)).unwrap();
    assert!(stmt.is_bulk_extraction());
}

#[test]
fn test_bulk_extraction_pages() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(&session, "SELECT id FROM t", vec![test_utils::id_rows(12)]);
    stmt.set_bulk_extraction(Bulk::new(5))?;
    assert_eq!(stmt.extraction_limit(), 5);

    let pages: Vec<u32> = (0..3).map(|_| stmt.execute()).collect::<StmtResult<_>>()?;
    assert_eq!(pages, vec![5, 5, 2]);
    assert!(stmt.is_done());
    assert_eq!(stmt.rows_extracted(None), 12);
    Ok(())
}

#[test]
fn test_limit_pages_across_parameter_batches() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(
        &session,
        "SELECT id FROM t WHERE grp = ?",
        vec![test_utils::id_rows(2)],
    );
    stmt.add_bind(Box::new(Bind::batch("grp", vec![1_i32, 2, 3])));
    stmt.set_extraction_limit(Limit::upper(3, false));

    assert_eq!(stmt.execute()?, 3);
    assert_eq!(stmt.state(), State::Paused);
    assert_eq!(stmt.execute()?, 3);
    assert!(stmt.is_done());

    assert_eq!(stmt.rows_extracted(None), 6);
    assert_eq!(stmt.backend().bound_rows().len(), 3);
    Ok(())
}

#[test]
fn test_hard_limit_with_pending_parameter_batches() -> StmtResult<()> {
    let session = MemorySession::new();
    let mut stmt = test_utils::statement(
        &session,
        "SELECT id FROM t WHERE grp = ?",
        vec![test_utils::id_rows(2)],
    );
    stmt.add_bind(Box::new(Bind::batch("grp", vec![1_i32, 2])));
    stmt.set_extraction_limit(Limit::upper(2, true));

    // Every batch fits the limit, so the remaining batch is the next page.
    assert_eq!(stmt.execute()?, 2);
    assert_eq!(stmt.state(), State::Paused);
    assert_eq!(stmt.execute()?, 2);
    assert!(stmt.is_done());

    let mut stmt = test_utils::statement(
        &session,
        "SELECT id FROM t WHERE grp = ?",
        vec![test_utils::id_rows(3)],
    );
    stmt.add_bind(Box::new(Bind::batch("grp", vec![1_i32, 2])));
    stmt.set_extraction_limit(Limit::upper(2, true));

    let err = stmt.execute().unwrap_err();
    assert!(matches!(err, Error::HardLimitExceeded { limit: 2 }));
    assert_eq!(stmt.backend().bound_rows().len(), 1);
    Ok(())
}

#[test]
fn test_limit_over_multiple_sql_units() -> StmtResult<()> {
    let session = MemorySession::new();
    let datasets = || vec![test_utils::id_rows(2), test_utils::id_rows(3)];

    let mut stmt = test_utils::statement(&session, "SELECT a FROM t; SELECT b FROM u", datasets());
    stmt.set_extraction_limit(Limit::upper(100, false));
    assert_eq!(stmt.execute()?, 5);
    assert!(stmt.is_done());
    assert_eq!(stmt.backend().compile_count(), 2);

    // A page may span units.
    let mut stmt = test_utils::statement(&session, "SELECT a FROM t; SELECT b FROM u", datasets());
    stmt.set_extraction_limit(Limit::upper(4, false));
    assert_eq!(stmt.execute()?, 4);
    assert_eq!(stmt.state(), State::Paused);
    assert_eq!(stmt.current_dataset(), 1);
    assert_eq!(stmt.execute()?, 1);
    assert!(stmt.is_done());
    assert_eq!(stmt.rows_extracted(Some(0)), 2);
    assert_eq!(stmt.rows_extracted(Some(1)), 3);

    // Nothing left to compile once done.
    assert_eq!(stmt.execute()?, 0);
    assert_eq!(stmt.backend().compile_count(), 2);
    Ok(())
}
