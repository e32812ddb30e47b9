use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, MySql, MySqlPool, prelude::FromRow};

use super::{
    EmployeeDirectory, RecordFilter, RecordQuery, SortDirection, SortKey, StatRow, StatusPatch,
    StoreError, TimeOffStore,
};
use crate::model::{
    employee::{Employee, LeaveBalance},
    time_off::{DateRange, NewTimeOff, TimeOffRequest, TimeOffStatus, TimeOffType},
};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, status, \
     annual_balance, sick_balance, casual_balance";

const TIME_OFF_COLUMNS: &str = "id, employee_id, time_off_type, status, starts_at, ends_at, \
     reason, reviewed_by, reviewed_at, review_note, created_at, updated_at";

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    employee_code: String,
    first_name: String,
    last_name: String,
    email: String,
    status: String,
    annual_balance: u32,
    sick_balance: u32,
    casual_balance: u32,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            employee_code: row.employee_code,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            status: row.status,
            leave_balance: LeaveBalance {
                annual: row.annual_balance,
                sick: row.sick_balance,
                casual: row.casual_balance,
            },
        }
    }
}

#[derive(FromRow)]
struct TimeOffRow {
    id: u64,
    employee_id: u64,
    time_off_type: String,
    status: String,
    starts_at: NaiveDate,
    ends_at: NaiveDate,
    reason: Option<String>,
    reviewed_by: Option<u64>,
    reviewed_at: Option<DateTime<Utc>>,
    review_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<TimeOffStatus, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Decode(format!("unknown status '{raw}'")))
}

fn parse_type(raw: &str) -> Result<TimeOffType, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Decode(format!("unknown time_off_type '{raw}'")))
}

impl TryFrom<TimeOffRow> for TimeOffRequest {
    type Error = StoreError;

    fn try_from(row: TimeOffRow) -> Result<Self, Self::Error> {
        Ok(TimeOffRequest {
            id: row.id,
            employee_id: row.employee_id,
            time_off_type: parse_type(&row.time_off_type)?,
            status: parse_status(&row.status)?,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            reason: row.reason,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            review_note: row.review_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Helper enum for typed SQLx binding
#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    U64(u64),
    Str(&'static str),
    Date(NaiveDate),
}

fn balance_column(time_off_type: TimeOffType) -> &'static str {
    match time_off_type {
        TimeOffType::Annual => "annual_balance",
        TimeOffType::Sick => "sick_balance",
        TimeOffType::Casual => "casual_balance",
    }
}

fn where_clause(filter: &RecordFilter) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(status) = filter.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.into()));
    }
    if let Some(time_off_type) = filter.time_off_type {
        where_sql.push_str(" AND time_off_type = ?");
        args.push(FilterValue::Str(time_off_type.into()));
    }
    if let Some(employee_id) = filter.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }
    for (column, bounds) in [("starts_at", filter.starts_at), ("ends_at", filter.ends_at)] {
        if let Some(from) = bounds.from {
            where_sql.push_str(&format!(" AND {column} >= ?"));
            args.push(FilterValue::Date(from));
        }
        if let Some(before) = bounds.before {
            where_sql.push_str(&format!(" AND {column} < ?"));
            args.push(FilterValue::Date(before));
        }
    }

    (where_sql, args)
}

fn order_clause(sort: &[SortKey]) -> String {
    let mut keys: Vec<String> = sort
        .iter()
        .map(|key| {
            let direction = match key.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} {}", key.field.column(), direction)
        })
        .collect();
    keys.push("id DESC".to_string());
    format!(" ORDER BY {}", keys.join(", "))
}

async fn fetch_employee<'e, E>(executor: E, id: u64) -> Result<Option<Employee>, StoreError>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    let row = sqlx::query_as::<_, EmployeeRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Employee::from))
}

async fn fetch_time_off<'e, E>(executor: E, id: u64) -> Result<Option<TimeOffRequest>, StoreError>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {TIME_OFF_COLUMNS} FROM time_offs WHERE id = ?");
    sqlx::query_as::<_, TimeOffRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(TimeOffRequest::try_from)
        .transpose()
}

async fn count_overlapping<'e, E>(
    executor: E,
    employee_id: u64,
    range: DateRange,
    exclude_id: Option<u64>,
) -> Result<i64, StoreError>
where
    E: Executor<'e, Database = MySql>,
{
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM time_offs
        WHERE employee_id = ?
        AND status <> 'Rejected'
        AND starts_at <= ?
        AND ends_at >= ?
        AND (? IS NULL OR id <> ?)
        "#,
    )
    .bind(employee_id)
    .bind(range.end())
    .bind(range.start())
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// sqlx/MySQL backend for both the employee directory and the time-off store.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlStore {
    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        fetch_employee(&self.pool, id).await
    }

    async fn find_employee_by_code(&self, code: &str) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE employee_code = ?");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn update_balance(
        &self,
        id: u64,
        time_off_type: TimeOffType,
        delta: i64,
    ) -> Result<Employee, StoreError> {
        let column = balance_column(time_off_type);
        let mut tx = self.pool.begin().await?;

        // signed arithmetic so a debit past zero fails the guard instead of underflowing
        let sql = format!(
            "UPDATE employees SET {column} = CAST({column} AS SIGNED) + ? \
             WHERE id = ? AND CAST({column} AS SIGNED) + ? >= 0"
        );
        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(id)
            .bind(delta)
            .execute(&mut *tx)
            .await?;

        let employee = fetch_employee(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("Employee"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NegativeBalance);
        }

        tx.commit().await?;
        tracing::debug!(employee_id = id, %time_off_type, delta, "Leave balance updated");
        Ok(employee)
    }
}

#[async_trait]
impl TimeOffStore for MySqlStore {
    async fn insert(&self, new: NewTimeOff) -> Result<TimeOffRequest, StoreError> {
        let mut tx = self.pool.begin().await?;

        // the employee row lock serializes overlap check + insert per employee
        let locked = sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(new.employee_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::NotFound("Employee"));
        }

        if count_overlapping(&mut *tx, new.employee_id, new.range, None).await? > 0 {
            return Err(StoreError::Overlap);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO time_offs
                (employee_id, time_off_type, status, starts_at, ends_at, reason, created_at, updated_at)
            VALUES (?, ?, 'Pending', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.time_off_type.as_ref())
        .bind(new.range.start())
        .bind(new.range.end())
        .bind(&new.reason)
        .bind(new.created_at)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await?;

        let record = fetch_time_off(&mut *tx, result.last_insert_id())
            .await?
            .ok_or(StoreError::NotFound("Time off request"))?;
        tx.commit().await?;
        Ok(record)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<TimeOffRequest>, StoreError> {
        fetch_time_off(&self.pool, id).await
    }

    async fn find_overlapping(
        &self,
        employee_id: u64,
        range: DateRange,
        exclude_id: Option<u64>,
    ) -> Result<bool, StoreError> {
        Ok(count_overlapping(&self.pool, employee_id, range, exclude_id).await? > 0)
    }

    async fn query(&self, query: &RecordQuery) -> Result<(Vec<TimeOffRequest>, u64), StoreError> {
        let (where_sql, args) = where_clause(&query.filter);

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM time_offs{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
                FilterValue::Date(d) => count_q.bind(*d),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "SELECT {TIME_OFF_COLUMNS} FROM time_offs{where_sql}{} LIMIT ? OFFSET ?",
            order_clause(&query.sort)
        );
        tracing::debug!(sql = %data_sql, args = ?args, "Fetching time-off records");

        let mut data_q = sqlx::query_as::<_, TimeOffRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
                FilterValue::Date(d) => data_q.bind(d),
            };
        }
        let rows = data_q
            .bind(query.limit)
            .bind(query.skip)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .map(TimeOffRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total.max(0) as u64))
    }

    async fn aggregate(&self, employee_id: Option<u64>) -> Result<Vec<StatRow>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, i64, i64)>(
            r#"
            SELECT
                status,
                time_off_type,
                COUNT(*),
                CAST(SUM(DATEDIFF(ends_at, starts_at) + 1) AS SIGNED)
            FROM time_offs
            WHERE (? IS NULL OR employee_id = ?)
            GROUP BY status, time_off_type
            "#,
        )
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, time_off_type, count, total_days)| {
                Ok(StatRow {
                    status: parse_status(&status)?,
                    time_off_type: parse_type(&time_off_type)?,
                    count: count.max(0) as u64,
                    total_days: total_days.max(0) as u64,
                })
            })
            .collect()
    }

    async fn update(&self, id: u64, patch: StatusPatch) -> Result<TimeOffRequest, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, String>("SELECT status FROM time_offs WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound("Time off request"))?;
        let current = parse_status(&current)?;
        if current != patch.expected {
            return Err(StoreError::StaleState(current));
        }

        match &patch.review {
            Some(review) => {
                sqlx::query(
                    r#"
                    UPDATE time_offs
                    SET status = ?, reviewed_by = ?, reviewed_at = ?, review_note = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(patch.status.as_ref())
                .bind(review.reviewed_by)
                .bind(review.reviewed_at)
                .bind(&review.review_note)
                .bind(patch.updated_at)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("UPDATE time_offs SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(patch.status.as_ref())
                    .bind(patch.updated_at)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let record = fetch_time_off(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("Time off request"))?;
        tx.commit().await?;
        Ok(record)
    }
}
