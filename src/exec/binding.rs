use std::fmt;

use tracing::error;

use crate::{
    backend::BinderHandle,
    error::{Error, StmtResult},
    exec::value::{IntoValue, Value},
};

/// Backend adapter that transmits one parameter value.
pub trait Binder {
    /// Binds `value` to the parameter at the given position.
    fn bind(&mut self, pos: usize, value: &Value) -> StmtResult<()>;
}

/// A registered parameter handler.
///
/// A binding owns one or more rows of values for a single parameter. Each
/// [`bind`](Binding::bind) call transmits the next row through the attached
/// [`Binder`]; [`can_bind`](Binding::can_bind) reports whether rows remain,
/// which drives batch (array) execution.
pub trait Binding {
    /// The parameter name. Names may repeat within a statement.
    fn name(&self) -> &str;

    /// Number of parameter positions this binding occupies.
    fn columns_handled(&self) -> usize;

    /// Total number of rows this binding supplies.
    fn rows_handled(&self) -> usize;

    /// Whether another row is available.
    fn can_bind(&self) -> bool;

    /// Attaches the backend binder. Called on every compile.
    fn set_binder(&mut self, binder: BinderHandle);

    fn binder(&self) -> Option<&BinderHandle>;

    /// Binds the next row, starting at parameter position `pos`.
    fn bind(&mut self, pos: usize) -> StmtResult<()>;

    /// Rewinds to the first row.
    fn reset(&mut self);
}

/// Default binding for a batch of values of type `T`.
pub struct Bind<T> {
    name: String,
    values: Vec<T>,
    cursor: usize,
    binder: Option<BinderHandle>,
}

impl<T: IntoValue + Clone> Bind<T> {
    /// A binding supplying a single value.
    pub fn new(name: impl Into<String>, value: T) -> Bind<T> {
        Bind::batch(name, vec![value])
    }

    /// A binding supplying one row per element of `values`.
    pub fn batch(name: impl Into<String>, values: Vec<T>) -> Bind<T> {
        Bind {
            name: name.into(),
            values,
            cursor: 0,
            binder: None,
        }
    }
}

impl<T: IntoValue + Clone> Binding for Bind<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns_handled(&self) -> usize {
        1
    }

    fn rows_handled(&self) -> usize {
        self.values.len()
    }

    fn can_bind(&self) -> bool {
        self.cursor < self.values.len()
    }

    fn set_binder(&mut self, binder: BinderHandle) {
        self.binder = Some(binder);
    }

    fn binder(&self) -> Option<&BinderHandle> {
        self.binder.as_ref()
    }

    fn bind(&mut self, pos: usize) -> StmtResult<()> {
        let Some(binder) = &self.binder else {
            error!(name = %self.name, "bind without an attached binder");
            return Err(Error::InvalidConfiguration(
                format!("binding `{}` has no binder attached", self.name).into(),
            ));
        };
        let Some(value) = self.values.get(self.cursor) else {
            return Err(Error::InvalidConfiguration(
                format!("binding `{}` has no more values", self.name).into(),
            ));
        };
        binder.borrow_mut().bind(pos, &value.clone().into_value())?;
        self.cursor += 1;
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

impl<T> fmt::Debug for Bind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bind")
            .field("name", &self.name)
            .field("rows", &self.values.len())
            .field("cursor", &self.cursor)
            .field("has_binder", &self.binder.is_some())
            .finish()
    }
}
