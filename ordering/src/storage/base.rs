use crate::error::{OrderError, Result};
use crate::model::ModelId;
use crate::ui_model::Predicate;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, PgConnection};
use std::marker::PhantomData;
use tracing::debug;

/// Maps one table onto a model type.
pub trait Persistable: Sized + Send + Unpin {
    fn get_table_name() -> &'static str;
    /// Name used in `NotFound` errors.
    fn get_entity_name() -> &'static str;
    /// Select list, also used for `RETURNING`. May contain casts with aliases.
    fn get_select_columns() -> &'static str;
    fn from_row(row: &PgRow) -> std::result::Result<Self, sqlx::Error>;
}

/// Value written by an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    IdList(Option<Vec<ModelId>>),
    Timestamp(Option<DateTime<Utc>>),
    /// Range literal such as `[2024-01-01 10:00:00,2024-01-01 12:00:00)`.
    TimeRange(String),
}

impl ColumnValue {
    pub fn text(value: impl Into<String>) -> Self {
        ColumnValue::Text(Some(value.into()))
    }

    fn placeholder(&self, index: usize) -> String {
        match self {
            ColumnValue::TimeRange(_) => format!("${}::tsrange", index),
            _ => format!("${}", index),
        }
    }

    fn bind(&self, args: &mut PgArguments) -> std::result::Result<(), sqlx::Error> {
        match self {
            ColumnValue::Int(v) => args.add(*v),
            ColumnValue::Float(v) => args.add(*v),
            ColumnValue::Text(v) => args.add(v.clone()),
            ColumnValue::IdList(v) => args.add(v.clone()),
            ColumnValue::Timestamp(v) => args.add(*v),
            ColumnValue::TimeRange(v) => args.add(v.clone()),
        }
        .map_err(sqlx::Error::Encode)
    }
}

pub type ColumnValues = Vec<(&'static str, ColumnValue)>;

/// Generic data access over one table. Every statement takes the connection
/// to run on, so callers decide between a pooled connection and an open
/// transaction.
pub struct BaseRepository<M: Persistable> {
    _marker: PhantomData<fn() -> M>,
}

impl<M: Persistable> Default for BaseRepository<M> {
    fn default() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<M: Persistable> Clone for BaseRepository<M> {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<M: Persistable> BaseRepository<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn select(&self, conn: &mut PgConnection, predicate: &Predicate) -> Result<Vec<M>> {
        let mut query = format!("SELECT {} FROM {}", M::get_select_columns(), M::get_table_name());
        if !predicate.is_empty() {
            query = format!("{} {}", query, predicate.clause);
        }
        query = format!("{} ORDER BY id", query);

        debug!("Executing select: {}", query);

        let mut args = PgArguments::default();
        predicate.bind(&mut args)?;

        let rows = sqlx::query_with(&query, args).fetch_all(&mut *conn).await?;
        rows.iter()
            .map(M::from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(OrderError::from)
    }

    pub async fn select_by_id(&self, conn: &mut PgConnection, id: ModelId) -> Result<M> {
        self.fetch_by_id(conn, id, "").await
    }

    /// Same as `select_by_id` but takes a row lock until the transaction ends.
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: ModelId) -> Result<M> {
        self.fetch_by_id(conn, id, " FOR UPDATE").await
    }

    async fn fetch_by_id(&self, conn: &mut PgConnection, id: ModelId, suffix: &str) -> Result<M> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1{}",
            M::get_select_columns(),
            M::get_table_name(),
            suffix
        );

        match sqlx::query(&query).bind(id).fetch_optional(&mut *conn).await? {
            Some(row) => Ok(M::from_row(&row)?),
            None => Err(OrderError::not_found(M::get_entity_name(), id)),
        }
    }

    pub async fn insert(&self, conn: &mut PgConnection, values: &[(&'static str, ColumnValue)]) -> Result<M> {
        let mut args = PgArguments::default();
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());

        for (index, (column, value)) in values.iter().enumerate() {
            columns.push(*column);
            placeholders.push(value.placeholder(index + 1));
            value.bind(&mut args)?;
        }

        let query = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            M::get_table_name(),
            columns.join(", "),
            placeholders.join(", "),
            M::get_select_columns()
        );

        debug!("Executing insert: {}", query);

        let row = sqlx::query_with(&query, args).fetch_one(&mut *conn).await?;
        Ok(M::from_row(&row)?)
    }

    /// Updates the given columns only; an empty set just reads the row back.
    pub async fn update_by_id(
        &self,
        conn: &mut PgConnection,
        id: ModelId,
        values: &[(&'static str, ColumnValue)],
    ) -> Result<M> {
        if values.is_empty() {
            return self.select_by_id(conn, id).await;
        }

        let mut args = PgArguments::default();
        let mut assignments = Vec::with_capacity(values.len());

        for (index, (column, value)) in values.iter().enumerate() {
            assignments.push(format!("{} = {}", column, value.placeholder(index + 1)));
            value.bind(&mut args)?;
        }
        args.add(id).map_err(sqlx::Error::Encode)?;

        let query = format!(
            "UPDATE {} SET {} WHERE id = ${} RETURNING {}",
            M::get_table_name(),
            assignments.join(", "),
            values.len() + 1,
            M::get_select_columns()
        );

        debug!("Executing update: {}", query);

        match sqlx::query_with(&query, args).fetch_optional(&mut *conn).await? {
            Some(row) => Ok(M::from_row(&row)?),
            None => Err(OrderError::not_found(M::get_entity_name(), id)),
        }
    }
}

/// Reads a text column holding one of the snake_case enum values.
pub(crate) fn try_get_enum<T>(row: &PgRow, column: &str) -> std::result::Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    use sqlx::Row;

    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
