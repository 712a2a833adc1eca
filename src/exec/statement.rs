use std::{fmt, rc::Rc};

use tracing::{debug, error, instrument, trace, warn};

use crate::{
    backend::{BindCtx, FetchCtx, Session, StatementBackend},
    catalog::{column::ColumnDescriptor, ty::ColumnType},
    config::{EMPTY_STRING_IS_NULL, FORCE_EMPTY_STRING},
    error::{Direction, Error, StmtResult},
    exec::{
        binding::Binding,
        extraction::{Extract, Extraction, Storage},
        value::{FromValue, IntoValue},
    },
    limit::{Bulk, BulkMode, Limit},
};

/// Statement lifecycle state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Initialized,
    Compiled,
    Bound,
    Paused,
    Done,
    Reset,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Initialized => "initialized",
            State::Compiled => "compiled",
            State::Bound => "bound",
            State::Paused => "paused",
            State::Done => "done",
            State::Reset => "reset",
        })
    }
}

/// The statement execution engine.
///
/// A statement drives one SQL text through compile, bind and extract cycles
/// against a [`StatementBackend`], without any knowledge of how the backend
/// talks to its database. Callers register bindings and extractions, set the
/// limits, then call [`execute`](Statement::execute) until the statement is
/// [`State::Done`]. A limited statement returns one page per call.
///
/// The statement references its [`Session`] without owning it, so the
/// session must outlive the statement.
pub struct Statement<'s, B> {
    session: &'s dyn Session,
    backend: B,
    state: State,
    extr_limit: Limit,
    lower_limit: u32,
    storage: Storage,
    bulk_binding: BulkMode,
    bulk_extraction: BulkMode,
    bindings: Vec<Box<dyn Binding>>,
    /// Extractions, indexed by dataset.
    extractions: Vec<Vec<Box<dyn Extraction>>>,
    /// Extracted column counts, in lockstep with `extractions`.
    columns_extracted: Vec<usize>,
    cur_dataset: usize,
    sql: String,
}

impl<'s, B: StatementBackend> Statement<'s, B> {
    /// Creates a new statement on the given session.
    pub fn new(session: &'s dyn Session, backend: B) -> Statement<'s, B> {
        Statement {
            session,
            backend,
            state: State::Initialized,
            extr_limit: Limit::unlimited(),
            lower_limit: 0,
            storage: Storage::Unknown,
            bulk_binding: BulkMode::Undefined,
            bulk_extraction: BulkMode::Undefined,
            bindings: Vec::new(),
            extractions: vec![Vec::new()],
            columns_extracted: vec![0],
            cur_dataset: 0,
            sql: String::new(),
        }
    }

    /// Executes the statement, returning the number of rows extracted or, if
    /// none, the number of rows affected.
    ///
    /// With a finite upper limit, each call returns at most one page and
    /// leaves the statement [`State::Paused`] until the data is exhausted.
    /// Without a limit, the statement is always [`State::Done`] afterwards.
    ///
    /// SQL text with several units runs them in order, each unit returning
    /// into the next dataset. A page may span units.
    #[instrument(level = "debug", skip_all, fields(state = %self.state))]
    pub fn execute(&mut self) -> StmtResult<u32> {
        // An explicit `compile` already counted this run's columns.
        if self.state != State::Compiled {
            self.reset_columns_extracted();
        }

        if self.lower_limit > self.extr_limit.value() {
            warn!(
                lower = self.lower_limit,
                upper = self.extr_limit.value(),
                "lower limit exceeds upper limit"
            );
            return Err(Error::LimitViolation {
                lower: self.lower_limit,
                upper: self.extr_limit.value(),
            });
        }

        let limited = !self.extr_limit.is_unlimited();
        let limit = self.extr_limit.value();
        let mut total: u32 = 0;

        self.compile()?;
        loop {
            let count = if limited {
                self.execute_with_limit(limit.saturating_sub(total))?
            } else {
                self.execute_without_limit()?
            };
            total = total.saturating_add(count);

            // A limited unit that paused resumes on the next call.
            if !self.backend.can_compile() || (limited && self.state != State::Done) {
                break;
            }
            self.compile_next_unit()?;
            if limited && total >= limit {
                break;
            }
        }

        if self.extr_limit.is_unlimited() {
            self.set_state(State::Done);
        }

        if total < self.lower_limit {
            warn!(expected = self.lower_limit, actual = total, "not enough data");
            return Err(Error::InsufficientData {
                expected: self.lower_limit,
                actual: total,
            });
        }

        debug!(total, state = %self.state, "executed");
        Ok(total)
    }

    /// Runs the current unit until `limit` rows are extracted or it is
    /// exhausted.
    fn execute_with_limit(&mut self, limit: u32) -> StmtResult<u32> {
        if self.state == State::Done {
            debug!("statement already done");
            return Ok(0);
        }
        let mut count: u32 = 0;

        loop {
            self.bind()?;
            while count < limit && self.backend.has_next()? {
                count += self.fetch_next()?;
            }
            if !(count < limit && self.can_bind()) {
                break;
            }
        }

        if !self.can_bind() && (limit == 0 || !self.backend.has_next()?) {
            self.set_state(State::Done);
        } else if count == limit && self.extr_limit.is_hard() && self.backend.has_next()? {
            let limit = self.extr_limit.value();
            warn!(limit, "hard limit reached with rows still pending");
            return Err(Error::HardLimitExceeded { limit });
        } else {
            self.set_state(State::Paused);
        }

        Ok(self.count_or_affected(count))
    }

    fn execute_without_limit(&mut self) -> StmtResult<u32> {
        if self.state == State::Done {
            debug!("statement already done");
            return Ok(0);
        }
        let mut count: u32 = 0;

        loop {
            self.bind()?;
            while self.backend.has_next()? {
                count += self.fetch_next()?;
            }
            if !self.can_bind() {
                break;
            }
        }

        Ok(self.count_or_affected(count))
    }

    fn count_or_affected(&self, count: u32) -> u32 {
        if count != 0 {
            count
        } else {
            self.backend.affected_row_count()
        }
    }

    /// Extracts the next row group into the active dataset's extractions.
    fn fetch_next(&mut self) -> StmtResult<u32> {
        let dataset = self.cur_dataset;
        self.ensure_dataset(dataset);
        let ctx = FetchCtx {
            extractions: &mut self.extractions[dataset],
            dataset,
            bulk: self.bulk_extraction,
        };
        let rows = self.backend.next(ctx)?;
        trace!(rows, dataset, "fetched row group");
        Ok(rows)
    }

    /// Compiles the statement if it is initialized, reset or bound; does
    /// nothing in any other state.
    ///
    /// If no extraction is registered for the active dataset (and the
    /// statement isn't a stored procedure call), one default extraction per
    /// returned column is generated. The backend binder and extractor are then
    /// attached to every binding and extraction.
    #[instrument(level = "debug", skip_all, fields(state = %self.state))]
    pub fn compile(&mut self) -> StmtResult<()> {
        if !matches!(self.state, State::Initialized | State::Reset | State::Bound) {
            return Ok(());
        }
        self.compile_unit()
    }

    fn compile_unit(&mut self) -> StmtResult<()> {
        self.backend.compile_impl(&self.sql)?;
        self.set_state(State::Compiled);

        if self.extractions().is_empty() && !self.backend.is_stored_procedure() {
            let columns = self.backend.columns_returned(self.cur_dataset);
            if columns > 0 {
                self.make_extractors(columns)?;
            }
        }

        self.fixup_extraction();
        self.fixup_binding();
        Ok(())
    }

    /// Compiles the next SQL unit. Its rows go to the next dataset, if the
    /// backend returns one.
    fn compile_next_unit(&mut self) -> StmtResult<()> {
        if self.cur_dataset + 1 < self.dataset_count() {
            self.cur_dataset += 1;
            self.reset_columns_extracted();
            debug!(dataset = self.cur_dataset, "next unit");
        }
        self.compile_unit()
    }

    /// Binds the next parameter batch.
    ///
    /// A compiled statement binds its first batch. A bound or paused
    /// statement with no pending rows binds the next batch, or becomes done
    /// if there is none.
    pub fn bind(&mut self) -> StmtResult<()> {
        match self.state {
            State::Compiled => {
                self.bind_impl()?;
                self.set_state(State::Bound);
            }
            State::Bound | State::Paused if !self.backend.has_next()? => {
                if self.can_bind() {
                    self.bind_impl()?;
                    self.set_state(State::Bound);
                } else {
                    self.set_state(State::Done);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn bind_impl(&mut self) -> StmtResult<()> {
        let ctx = BindCtx {
            bindings: &mut self.bindings,
            bulk: self.bulk_binding,
        };
        self.backend.bind_impl(ctx)
    }

    fn can_bind(&self) -> bool {
        self.backend.can_bind(&self.bindings)
    }

    /// Rewinds all bindings and extractions so the statement can run again,
    /// starting over from the first SQL unit and dataset.
    #[instrument(level = "debug", skip_all, fields(state = %self.state))]
    pub fn reset(&mut self) {
        self.backend.reset_impl();
        for binding in &mut self.bindings {
            binding.reset();
        }
        for extraction in self.extractions.iter_mut().flatten() {
            extraction.reset();
        }
        self.columns_extracted.iter_mut().for_each(|columns| *columns = 0);
        self.cur_dataset = 0;
        self.set_state(State::Reset);
    }

    fn reset_columns_extracted(&mut self) {
        self.ensure_dataset(self.cur_dataset);
        self.columns_extracted[self.cur_dataset] = 0;
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "state transition");
            self.state = state;
        }
    }

    /// Grows the extraction registry and the column counters to cover
    /// `dataset`.
    fn ensure_dataset(&mut self, dataset: usize) {
        if dataset >= self.extractions.len() {
            self.extractions.resize_with(dataset + 1, Vec::new);
            self.columns_extracted.resize(dataset + 1, 0);
        }
    }

    /// Attaches the backend extractor and the current limit to the active
    /// dataset's extractions, counting the columns they handle.
    fn fixup_extraction(&mut self) {
        let dataset = self.cur_dataset;
        self.ensure_dataset(dataset);
        let extractor = self.backend.extractor();
        let limit = self.extr_limit.value();

        let mut columns = 0;
        for extraction in &mut self.extractions[dataset] {
            extraction.set_extractor(Rc::clone(&extractor));
            extraction.set_limit(limit);
            columns += extraction.columns_handled();
        }
        self.columns_extracted[dataset] += columns;
    }

    /// Attaches the backend binder to every binding. The binder may be
    /// recreated by the backend, so this runs on every compile.
    fn fixup_binding(&mut self) {
        let binder = self.backend.binder();
        for binding in &mut self.bindings {
            binding.set_binder(Rc::clone(&binder));
        }
    }

    /// Registers one default extraction per result column of the active
    /// dataset, typed after each column's declared type.
    ///
    /// Nothing is registered if any column has an unsupported type.
    pub fn make_extractors(&mut self, count: usize) -> StmtResult<()> {
        let mut generated = Vec::with_capacity(count);
        for pos in 0..count {
            let column = self.backend.meta_column(self.cur_dataset, pos)?.clone();
            generated.push(self.default_extraction(column)?);
        }
        for extraction in generated {
            self.add_extract(extraction)?;
        }
        Ok(())
    }

    fn default_extraction(&self, column: ColumnDescriptor) -> StmtResult<Box<dyn Extraction>> {
        fn internal<T>(column: ColumnDescriptor, storage: Storage, dataset: usize) -> Box<dyn Extraction>
        where
            T: FromValue + IntoValue + Clone + 'static,
        {
            Box::new(Extract::<T>::internal(column, storage).at(dataset))
        }

        let (storage, dataset) = (self.storage, self.cur_dataset);
        let extraction = match column.ty {
            ColumnType::Bool => internal::<bool>(column, storage, dataset),
            ColumnType::Int8 => internal::<i8>(column, storage, dataset),
            ColumnType::UInt8 => internal::<u8>(column, storage, dataset),
            ColumnType::Int16 => internal::<i16>(column, storage, dataset),
            ColumnType::UInt16 => internal::<u16>(column, storage, dataset),
            ColumnType::Int32 => internal::<i32>(column, storage, dataset),
            ColumnType::UInt32 => internal::<u32>(column, storage, dataset),
            ColumnType::Int64 => internal::<i64>(column, storage, dataset),
            ColumnType::UInt64 => internal::<u64>(column, storage, dataset),
            ColumnType::Float => internal::<f32>(column, storage, dataset),
            ColumnType::Double => internal::<f64>(column, storage, dataset),
            ColumnType::String => internal::<String>(column, storage, dataset),
            ColumnType::Blob => internal::<Vec<u8>>(column, storage, dataset),
            ColumnType::Date => internal::<chrono::NaiveDate>(column, storage, dataset),
            ColumnType::Time => internal::<chrono::NaiveTime>(column, storage, dataset),
            ColumnType::Timestamp => internal::<chrono::NaiveDateTime>(column, storage, dataset),
            ColumnType::Unknown => {
                error!(column = %column.name, "data type not supported");
                return Err(Error::UnsupportedType {
                    column: column.name,
                    ty: column.ty,
                });
            }
        };
        Ok(extraction)
    }

    /// Registers an extraction at its dataset position.
    ///
    /// The session's string-null features are applied to the extraction now;
    /// later feature changes don't affect it.
    pub fn add_extract(&mut self, mut extraction: Box<dyn Extraction>) -> StmtResult<()> {
        let empty_string_is_null = self.session.feature(EMPTY_STRING_IS_NULL)?;
        let force_empty_string = self.session.feature(FORCE_EMPTY_STRING)?;
        extraction.set_empty_string_is_null(empty_string_is_null);
        extraction.set_force_empty_string(force_empty_string);

        let pos = extraction.position();
        self.ensure_dataset(pos);
        self.extractions[pos].push(extraction);
        Ok(())
    }

    /// Registers a binding. Registration order is the positional bind order.
    pub fn add_bind(&mut self, binding: Box<dyn Binding>) {
        self.bindings.push(binding);
    }

    /// Removes every binding named `name`.
    pub fn remove_bind(&mut self, name: &str) -> StmtResult<()> {
        let before = self.bindings.len();
        self.bindings.retain(|binding| binding.name() != name);
        if self.bindings.len() == before {
            return Err(Error::BindingNotFound(name.to_owned()));
        }
        Ok(())
    }

    /// Sets the extraction limit. A lower limit only replaces the minimum row
    /// count; an upper limit replaces the previous upper limit.
    pub fn set_extraction_limit(&mut self, limit: Limit) {
        if limit.is_lower() {
            self.lower_limit = limit.value();
        } else {
            self.extr_limit = limit;
        }
    }

    /// Switches extraction to bulk mode with the given batch size.
    ///
    /// Fails if a finite upper limit different from the batch size is
    /// already set, leaving the configuration unchanged.
    pub fn set_bulk_extraction(&mut self, bulk: Bulk) -> StmtResult<()> {
        let limit = self.extr_limit.value();
        if !self.extr_limit.is_unlimited() && bulk.size() != limit {
            error!(limit, bulk = bulk.size(), "bulk size conflicts with limit");
            return Err(Error::InvalidConfiguration(
                format!("can not set bulk size {} for a statement limited to {limit} rows", bulk.size()).into(),
            ));
        }
        self.set_extraction_limit(bulk.limit());
        self.bulk_extraction = BulkMode::Bulk;
        Ok(())
    }

    /// Switches parameter binding to bulk mode.
    pub fn set_bulk_binding(&mut self) {
        self.bulk_binding = BulkMode::Bulk;
    }

    /// Sets the storage mode by name (`vector`, `list`, `deque` or
    /// `unknown`, in any case).
    pub fn set_storage(&mut self, storage: &str) -> StmtResult<()> {
        self.storage = storage.parse()?;
        Ok(())
    }

    pub fn set_storage_mode(&mut self, storage: Storage) {
        self.storage = storage;
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// The upper extraction limit value.
    pub fn extraction_limit(&self) -> u32 {
        self.extr_limit.value()
    }

    pub fn lower_limit(&self) -> u32 {
        self.lower_limit
    }

    pub fn is_bulk_binding(&self) -> bool {
        self.bulk_binding.is_bulk()
    }

    pub fn is_bulk_extraction(&self) -> bool {
        self.bulk_extraction.is_bulk()
    }

    pub fn bindings(&self) -> &[Box<dyn Binding>] {
        &self.bindings
    }

    /// Extractions of the active dataset.
    pub fn extractions(&self) -> &[Box<dyn Extraction>] {
        self.extractions_at(self.cur_dataset)
    }

    /// Extractions registered at the given dataset position.
    pub fn extractions_at(&self, dataset: usize) -> &[Box<dyn Extraction>] {
        self.extractions
            .get(dataset)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of columns extracted for `dataset`, or for the active dataset
    /// if `None`. Unknown datasets report zero.
    pub fn columns_extracted(&self, dataset: Option<usize>) -> usize {
        let dataset = dataset.unwrap_or(self.cur_dataset);
        self.columns_extracted.get(dataset).copied().unwrap_or(0)
    }

    /// Number of rows extracted for `dataset`, or for the active dataset if
    /// `None`, as seen by the first extraction registered there.
    pub fn rows_extracted(&self, dataset: Option<usize>) -> usize {
        let dataset = dataset.unwrap_or(self.cur_dataset);
        self.extractions_at(dataset)
            .first()
            .map_or(0, |extraction| extraction.rows_handled())
    }

    /// Rows affected by the last execution.
    pub fn affected_row_count(&self) -> u32 {
        self.backend.affected_row_count()
    }

    pub fn columns_returned(&self) -> usize {
        self.backend.columns_returned(self.cur_dataset)
    }

    /// Column metadata at position `pos` of the active dataset.
    pub fn meta_column(&self, pos: usize) -> StmtResult<&ColumnDescriptor> {
        self.backend.meta_column(self.cur_dataset, pos)
    }

    /// Finds a column of the active dataset by name, ignoring case. The
    /// first match wins.
    pub fn meta_column_named(&self, name: &str) -> StmtResult<&ColumnDescriptor> {
        for pos in 0..self.columns_returned() {
            let column = self.meta_column(pos)?;
            if column.is_named(name) {
                return Ok(column);
            }
        }
        Err(Error::ColumnNotFound(name.to_owned()))
    }

    pub fn current_dataset(&self) -> usize {
        self.cur_dataset
    }

    pub fn dataset_count(&self) -> usize {
        self.backend.dataset_count()
    }

    /// Activates the next dataset, returning its index.
    ///
    /// Fixup is not re-run; recompile if the new dataset needs it.
    pub fn activate_next_dataset(&mut self) -> StmtResult<usize> {
        if self.cur_dataset + 1 < self.dataset_count() {
            self.cur_dataset += 1;
            Ok(self.cur_dataset)
        } else {
            Err(Error::NoMoreDataSets(Direction::Next))
        }
    }

    /// Activates the previous dataset, returning its index.
    pub fn activate_previous_dataset(&mut self) -> StmtResult<usize> {
        if self.cur_dataset > 0 {
            self.cur_dataset -= 1;
            Ok(self.cur_dataset)
        } else {
            Err(Error::NoMoreDataSets(Direction::Previous))
        }
    }

    /// The statement's SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Appends to the SQL text.
    pub fn append_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Replaces the SQL text with the result of substituting its
    /// `%`-placeholders with `args`, in order.
    pub fn format_sql(&mut self, args: &[sqlfmt::Arg]) {
        self.sql = sqlfmt::format(&self.sql, args);
    }

    pub fn session(&self) -> &'s dyn Session {
        self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: StatementBackend> fmt::Write for Statement<'_, B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sql.push_str(s);
        Ok(())
    }
}

impl<B> fmt::Debug for Statement<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("extr_limit", &self.extr_limit)
            .field("lower_limit", &self.lower_limit)
            .field("storage", &self.storage)
            .field("bindings", &self.bindings.len())
            .field("cur_dataset", &self.cur_dataset)
            .field("columns_extracted", &self.columns_extracted)
            .finish()
    }
}
