use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use const_format::concatcp;
use sqlx::{
    query, query_as, sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Executor, Pool, Sqlite, SqliteConnection, SqlitePool
};
use tracing::{debug, instrument};
use trip_planner_lib::{AnyItem, ItemId, Trip, TripId};

use crate::RecordStoreError;

use super::{constants::*, RecordStore, WriteBatch, WriteOp};

const SELECT_TRIP: &str = concatcp!(
    "SELECT ", TRIP_ID, ", ", NAME, ", ", START_DATE, ", ", END_DATE, ", ", DESTINATION, ", ",
    LATITUDE, ", ", LONGITUDE, ", ", COLLECTIONS, " FROM ", TRIPS_TABLE_NAME
);

const SELECT_ITEM: &str = concatcp!(
    "SELECT ", ITEM_ID, ", ", KIND, ", ", TRIP_ID, ", ", BODY, " FROM ", ITEMS_TABLE_NAME
);

/// [`RecordStore`] on top of a SQLite database. Trip collections and item bodies
/// are stored as bincode blobs.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    /// Opens (and creates if missing) the database file at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, RecordStoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| backend("Failed to connect to database", e))?;

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, RecordStoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| backend("Invalid database url", e))?
            .foreign_keys(true);

        // Every connection to `sqlite::memory:` is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| backend("Failed to open in-memory database", e))?;

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    pub async fn init(&self) -> Result<(), RecordStoreError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", TRIPS_TABLE_NAME, "(",
                TRIP_ID,     " TEXT PRIMARY KEY NOT NULL,",
                NAME,        " TEXT NOT NULL,",
                START_DATE,  " DATE NOT NULL,",
                END_DATE,    " DATE NOT NULL,",
                DESTINATION, " TEXT NOT NULL,",
                LATITUDE,    " REAL NOT NULL,",
                LONGITUDE,   " REAL NOT NULL,",
                COLLECTIONS, " BLOB NOT NULL);

            CREATE TABLE IF NOT EXISTS ", ITEMS_TABLE_NAME, "(",
                ITEM_ID, " TEXT PRIMARY KEY NOT NULL,",
                KIND,    " TEXT NOT NULL,",
                TRIP_ID, " TEXT,",
                BODY,    " BLOB NOT NULL,
                FOREIGN KEY(", TRIP_ID, ") REFERENCES ", TRIPS_TABLE_NAME, "(", TRIP_ID, ") ON DELETE CASCADE);

            CREATE INDEX IF NOT EXISTS ", ITEMS_BY_TRIP_INDEX, " ON ", ITEMS_TABLE_NAME, "(", TRIP_ID, ");
            ")).await
            .map_err(|e| backend("Failed to create tables", e))
            .map(|_| ())
    }

    async fn apply(conn: &mut SqliteConnection, op: WriteOp) -> Result<(), RecordStoreError> {
        match op {
            WriteOp::InsertTrip(trip) => {
                let trip_id = trip.trip_id;
                query(concatcp!("
                    INSERT INTO ", TRIPS_TABLE_NAME, "(",
                    TRIP_ID, ", ", NAME, ", ", START_DATE, ", ", END_DATE, ", ", DESTINATION, ", ",
                    LATITUDE, ", ", LONGITUDE, ", ", COLLECTIONS, ")
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"))
                    .bind(trip.trip_id.to_string())
                    .bind(&trip.name)
                    .bind(trip.start_date)
                    .bind(trip.end_date)
                    .bind(&trip.destination)
                    .bind(trip.latitude)
                    .bind(trip.longitude)
                    .bind(encode(&trip.collections)?)
                    .execute(&mut *conn).await
                    .map_err(|e| write_error(format!("trip {trip_id}"), "Failed to insert trip", e))?;
            }
            WriteOp::PutTrip(trip) => {
                let trip_id = trip.trip_id;
                let result = query(concatcp!("
                    UPDATE ", TRIPS_TABLE_NAME, " SET ",
                    NAME, " = ?1, ", START_DATE, " = ?2, ", END_DATE, " = ?3, ", DESTINATION, " = ?4, ",
                    LATITUDE, " = ?5, ", LONGITUDE, " = ?6, ", COLLECTIONS, " = ?7
                    WHERE ", TRIP_ID, " = ?8"))
                    .bind(&trip.name)
                    .bind(trip.start_date)
                    .bind(trip.end_date)
                    .bind(&trip.destination)
                    .bind(trip.latitude)
                    .bind(trip.longitude)
                    .bind(encode(&trip.collections)?)
                    .bind(trip.trip_id.to_string())
                    .execute(&mut *conn).await
                    .map_err(|e| backend("Failed to update trip", e))?;

                if result.rows_affected() == 0 {
                    return Err(RecordStoreError::Missing(format!("trip {trip_id}")));
                }
            }
            WriteOp::DeleteTrip(trip_id) => {
                let result = query(concatcp!("DELETE FROM ", TRIPS_TABLE_NAME, " WHERE ", TRIP_ID, " = ?1"))
                    .bind(trip_id.to_string())
                    .execute(&mut *conn).await
                    .map_err(|e| backend("Failed to delete trip", e))?;

                if result.rows_affected() == 0 {
                    return Err(RecordStoreError::Missing(format!("trip {trip_id}")));
                }
            }
            WriteOp::InsertItem(item) => {
                let item_id = item.item_id();
                query(concatcp!("
                    INSERT INTO ", ITEMS_TABLE_NAME, "(", ITEM_ID, ", ", KIND, ", ", TRIP_ID, ", ", BODY, ")
                    VALUES (?1, ?2, ?3, ?4)"))
                    .bind(item_id.to_string())
                    .bind(item.kind().as_str())
                    .bind(item.trip().map(|id| id.to_string()))
                    .bind(encode(&item)?)
                    .execute(&mut *conn).await
                    .map_err(|e| write_error(format!("item {item_id}"), "Failed to insert item", e))?;
            }
            WriteOp::PutItem(item) => {
                let item_id = item.item_id();
                let result = query(concatcp!("
                    UPDATE ", ITEMS_TABLE_NAME, " SET ", KIND, " = ?1, ", TRIP_ID, " = ?2, ", BODY, " = ?3
                    WHERE ", ITEM_ID, " = ?4"))
                    .bind(item.kind().as_str())
                    .bind(item.trip().map(|id| id.to_string()))
                    .bind(encode(&item)?)
                    .bind(item_id.to_string())
                    .execute(&mut *conn).await
                    .map_err(|e| write_error(format!("item {item_id}"), "Failed to update item", e))?;

                if result.rows_affected() == 0 {
                    return Err(RecordStoreError::Missing(format!("item {item_id}")));
                }
            }
            WriteOp::DeleteItem(item_id) => {
                let result = query(concatcp!("DELETE FROM ", ITEMS_TABLE_NAME, " WHERE ", ITEM_ID, " = ?1"))
                    .bind(item_id.to_string())
                    .execute(&mut *conn).await
                    .map_err(|e| backend("Failed to delete item", e))?;

                if result.rows_affected() == 0 {
                    return Err(RecordStoreError::Missing(format!("item {item_id}")));
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get_trip(&self, trip_id: TripId) -> Result<Option<Trip>, RecordStoreError> {
        query_as::<_, Trip>(concatcp!(SELECT_TRIP, " WHERE ", TRIP_ID, " = ?1"))
            .bind(trip_id.to_string())
            .fetch_optional(&self.pool).await
            .map_err(|e| backend("Failed to get trip", e))
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, RecordStoreError> {
        query_as::<_, Trip>(concatcp!(SELECT_TRIP, " ORDER BY ", START_DATE, ", ", NAME))
            .fetch_all(&self.pool).await
            .map_err(|e| backend("Failed to get trips", e))
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<AnyItem>, RecordStoreError> {
        query_as::<_, AnyItem>(concatcp!(SELECT_ITEM, " WHERE ", ITEM_ID, " = ?1"))
            .bind(item_id.to_string())
            .fetch_optional(&self.pool).await
            .map_err(|e| backend("Failed to get item", e))
    }

    async fn get_items(&self, item_ids: &[ItemId]) -> Result<Vec<AnyItem>, RecordStoreError> {
        let mut conn = self.pool.acquire().await.map_err(|e| backend("Failed to acquire connection", e))?;

        let mut items = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            let item = query_as::<_, AnyItem>(concatcp!(SELECT_ITEM, " WHERE ", ITEM_ID, " = ?1"))
                .bind(item_id.to_string())
                .fetch_optional(&mut *conn).await
                .map_err(|e| backend("Failed to get item", e))?;
            items.extend(item);
        }

        Ok(items)
    }

    async fn items_referencing(&self, trip_id: TripId) -> Result<Vec<ItemId>, RecordStoreError> {
        let rows = query_as::<_, (String,)>(concatcp!("SELECT ", ITEM_ID, " FROM ", ITEMS_TABLE_NAME, " WHERE ", TRIP_ID, " = ?1"))
            .bind(trip_id.to_string())
            .fetch_all(&self.pool).await
            .map_err(|e| backend("Failed to get trip items", e))?;

        rows.into_iter()
            .map(|(item_id,)| item_id.parse::<ItemId>().map_err(|e| backend("Corrupt item id", e)))
            .collect()
    }

    #[instrument(skip_all, fields(ops = batch.len()))]
    async fn commit(&self, batch: WriteBatch) -> Result<(), RecordStoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| backend("Failed to begin transaction", e))?;

        for op in batch {
            // Dropping the transaction on error rolls it back.
            Self::apply(&mut *tx, op).await?;
        }

        tx.commit().await.map_err(|e| backend("Failed to commit transaction", e))?;
        debug!("Committed batch");

        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, RecordStoreError> {
    bincode::serialize(value).map_err(|e| backend("Failed to encode record", e))
}

fn backend(context: &str, error: impl std::fmt::Display) -> RecordStoreError {
    RecordStoreError::Backend(format!("{context}: {error}"))
}

/// Classifies constraint failures on writes: a duplicate key is a conflict and a
/// dangling trip reference is a missing record.
fn write_error(key: String, context: &str, error: sqlx::Error) -> RecordStoreError {
    match error.as_database_error() {
        Some(db) if db.is_unique_violation() => RecordStoreError::Conflict(key),
        Some(db) if db.is_foreign_key_violation() => RecordStoreError::Missing(format!("trip referenced by {key}")),
        _ => backend(context, error),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use trip_planner_lib::{
        items::{Activity, Item, PoiCategory, PointOfInterest},
        Location, NewTrip,
    };

    use super::*;

    fn trip(name: &str, start_day: u32) -> Trip {
        Trip::new(NewTrip {
            name: name.into(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, start_day).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, start_day + 3).unwrap(),
            destination: "Copenhagen, Denmark".into(),
            latitude: 55.6761,
            longitude: 12.5683,
        })
    }

    fn poi(trip_id: TripId) -> AnyItem {
        let mut item = PointOfInterest::new("Rundetaarn", Location::new("Købmagergade 52A", 55.6814, 12.5757), PoiCategory::Historical, 45);
        item.set_trip(Some(trip_id));
        item.into_any()
    }

    #[tokio::test]
    async fn trips_round_trip_through_sqlite() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let mut stored = trip("Copenhagen", 10);
        stored.collections.points_of_interest.push(ItemId::new());

        db.commit(WriteBatch::new().insert_trip(stored.clone())).await.unwrap();

        assert_eq!(db.get_trip(stored.trip_id).await.unwrap(), Some(stored));
        assert_eq!(db.get_trip(TripId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn trips_are_listed_by_start_date() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let late = trip("Late", 20);
        let early = trip("Early", 2);
        db.commit(WriteBatch::new().insert_trip(late).insert_trip(early)).await.unwrap();

        let names: Vec<_> = db.list_trips().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["Early", "Late"]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let stored = trip("Copenhagen", 10);
        db.commit(WriteBatch::new().insert_trip(stored.clone())).await.unwrap();

        let result = db.commit(WriteBatch::new().insert_trip(stored)).await;
        assert!(matches!(result, Err(RecordStoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn put_of_unknown_trip_is_missing() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let result = db.commit(WriteBatch::new().put_trip(trip("Nowhere", 1))).await;
        assert!(matches!(result, Err(RecordStoreError::Missing(_))));
    }

    #[tokio::test]
    async fn failed_batch_leaves_nothing_behind() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let first = trip("First", 1);
        let item = poi(first.trip_id);

        let batch = WriteBatch::new()
            .insert_trip(first.clone())
            .insert_item(item.clone())
            .delete_item(ItemId::new());
        assert!(db.commit(batch).await.is_err());

        assert_eq!(db.get_trip(first.trip_id).await.unwrap(), None);
        assert_eq!(db.get_item(item.item_id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn items_keep_their_trip_and_kind() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let stored = trip("Copenhagen", 10);
        let item = poi(stored.trip_id);
        let loose = Activity::new(
            "Kayak tour",
            Location::new("Nyhavn", 55.6797, 12.5907),
            NaiveDate::from_ymd_opt(2025, 6, 11).unwrap().and_hms_opt(10, 0, 0).unwrap().and_utc(),
            120,
            45.0,
        )
        .into_any();

        db.commit(WriteBatch::new().insert_trip(stored.clone()).insert_item(item.clone()).insert_item(loose.clone()))
            .await
            .unwrap();

        assert_eq!(db.get_item(item.item_id()).await.unwrap(), Some(item.clone()));
        assert_eq!(db.items_referencing(stored.trip_id).await.unwrap(), vec![item.item_id()]);

        let fetched = db.get_items(&[loose.item_id(), ItemId::new(), item.item_id()]).await.unwrap();
        assert_eq!(fetched, vec![loose, item]);
    }

    #[tokio::test]
    async fn item_pointing_at_unknown_trip_is_rejected() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let result = db.commit(WriteBatch::new().insert_item(poi(TripId::new()))).await;
        assert!(matches!(result, Err(RecordStoreError::Missing(_))));
    }

    #[tokio::test]
    async fn deleting_a_trip_cascades_to_its_items() {
        let db = SqliteRecordStore::in_memory().await.unwrap();
        let stored = trip("Copenhagen", 10);
        let item = poi(stored.trip_id);
        db.commit(WriteBatch::new().insert_trip(stored.clone()).insert_item(item.clone())).await.unwrap();

        db.commit(WriteBatch::new().delete_trip(stored.trip_id)).await.unwrap();

        assert_eq!(db.get_item(item.item_id()).await.unwrap(), None);
        assert!(db.items_referencing(stored.trip_id).await.unwrap().is_empty());
    }
}
