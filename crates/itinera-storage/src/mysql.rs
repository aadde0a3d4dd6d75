use async_trait::async_trait;
use itinera_core::repository::{
    ItineraryRepository, ListQuery, Page, PatchOutcome, Result, SortField,
};
use itinera_core::{Activity, Itinerary, ItineraryId, ItineraryPatch, StorageError, UserId};
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::info;

const SCHEMA: &str = include_str!("../ddl/mysql/itineraries.sql");

const SELECT_COLUMNS: &str = "id, user_id, title, destination, start_date, end_date, \
                              activities, created_at, updated_at";

/// MySQL implementation of the repository contract.
///
/// Timestamps are stored as unix milliseconds and activities as a JSON
/// document, so a row maps one-to-one onto an [`Itinerary`].
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `itineraries` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        info!("itineraries schema is in place");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn encode_activities(activities: &[Activity]) -> Result<String> {
    serde_json::to_string(activities)
        .map_err(|e| StorageError::InvalidData(format!("failed to encode activities: {e}")))
}

fn order_by(sort: SortField) -> &'static str {
    match sort {
        SortField::CreatedAt => "created_at DESC, id ASC",
        SortField::StartDate => "start_date ASC, id ASC",
        SortField::Title => "title ASC, id ASC",
    }
}

/// Builds a `LIKE` operand matching `needle` anywhere, with the wildcard
/// characters of the needle itself escaped.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn row_to_itinerary(row: &MySqlRow) -> Result<Itinerary> {
    let id: String = row.try_get("id").map_err(map_sqlx_error)?;
    let user_id: String = row.try_get("user_id").map_err(map_sqlx_error)?;
    let activities: String = row.try_get("activities").map_err(map_sqlx_error)?;
    let start_date: i64 = row.try_get("start_date").map_err(map_sqlx_error)?;
    let end_date: i64 = row.try_get("end_date").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;

    let activities: Vec<Activity> = serde_json::from_str(&activities).map_err(|e| {
        StorageError::InvalidData(format!("invalid activities for itinerary '{id}': {e}"))
    })?;

    Ok(Itinerary {
        id: ItineraryId::new(id).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        owner: UserId::new(user_id).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        title: row.try_get("title").map_err(map_sqlx_error)?,
        destination: row.try_get("destination").map_err(map_sqlx_error)?,
        start_date: parse_timestamp("start_date", start_date)?,
        end_date: parse_timestamp("end_date", end_date)?,
        activities,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ItineraryRepository for MySqlRepository {
    async fn insert(&self, itinerary: Itinerary) -> Result<()> {
        let activities = encode_activities(&itinerary.activities)?;

        let result = sqlx::query(
            r#"
            INSERT INTO itineraries
                (id, user_id, title, destination, start_date, end_date,
                 activities, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(itinerary.id.as_str())
        .bind(itinerary.owner.as_str())
        .bind(&itinerary.title)
        .bind(&itinerary.destination)
        .bind(itinerary.start_date.as_millisecond())
        .bind(itinerary.end_date.as_millisecond())
        .bind(activities)
        .bind(itinerary.created_at.as_millisecond())
        .bind(itinerary.updated_at.as_millisecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(itinerary.id.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM itineraries WHERE id = ? LIMIT 1");

        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_itinerary).transpose()
    }

    async fn update(
        &self,
        id: &ItineraryId,
        patch: &ItineraryPatch,
        updated_at: Timestamp,
    ) -> Result<PatchOutcome> {
        let activities = patch
            .activities
            .as_deref()
            .map(encode_activities)
            .transpose()?;
        let start_date = patch.start_date.map(|t| t.as_millisecond());
        let end_date = patch.end_date.map(|t| t.as_millisecond());

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Unset fields bind NULL and keep the stored column. The WHERE clause
        // sees the row before the SET, so the date check uses merged values.
        let result = sqlx::query(
            r#"
            UPDATE itineraries
            SET title = COALESCE(?, title),
                destination = COALESCE(?, destination),
                start_date = COALESCE(?, start_date),
                end_date = COALESCE(?, end_date),
                activities = COALESCE(?, activities),
                updated_at = ?
            WHERE id = ?
              AND COALESCE(?, end_date) > COALESCE(?, start_date)
            "#,
        )
        .bind(patch.title.as_deref())
        .bind(patch.destination.as_deref())
        .bind(start_date)
        .bind(end_date)
        .bind(activities)
        .bind(updated_at.as_millisecond())
        .bind(id.as_str())
        .bind(end_date)
        .bind(start_date)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let sql = format!("SELECT {SELECT_COLUMNS} FROM itineraries WHERE id = ? FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        let Some(stored) = row.as_ref().map(row_to_itinerary).transpose()? else {
            return Ok(PatchOutcome::Missing);
        };
        // MySQL reports changed rows, not matched rows, so a patch that
        // rewrites identical values reports zero as well.
        if result.rows_affected() == 0 && !patch.keeps_dates_ordered(&stored) {
            return Ok(PatchOutcome::DatesOutOfOrder);
        }
        Ok(PatchOutcome::Applied(stored))
    }

    async fn delete(&self, id: &ItineraryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM itineraries WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Itinerary>> {
        let filter = match &query.destination {
            Some(_) => "WHERE user_id = ? AND LOWER(destination) LIKE ?",
            None => "WHERE user_id = ?",
        };
        let pattern = query.destination.as_deref().map(contains_pattern);

        let count_sql = format!("SELECT COUNT(*) AS total FROM itineraries {filter}");
        let mut count = sqlx::query(&count_sql).bind(query.owner.as_str());
        if let Some(pattern) = &pattern {
            count = count.bind(pattern);
        }
        let total: i64 = count
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .try_get("total")
            .map_err(map_sqlx_error)?;

        let page_sql = format!(
            "SELECT {SELECT_COLUMNS} FROM itineraries {filter} ORDER BY {} LIMIT ? OFFSET ?",
            order_by(query.sort)
        );
        let mut select = sqlx::query(&page_sql).bind(query.owner.as_str());
        if let Some(pattern) = &pattern {
            select = select.bind(pattern);
        }
        let rows = select
            .bind(u64::from(query.limit))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = rows
            .iter()
            .map(row_to_itinerary)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}
