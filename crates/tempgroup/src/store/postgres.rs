use crate::{ChunkTransaction, Error, NewRecord, Record, RecordId, RecordStore, Result, TempId};
use sqlx::{
    PgPool, Postgres, QueryBuilder, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::collections::HashSet;

/// Rows per multi-value `INSERT` statement; keeps bind counts well under the
/// protocol limit of 65535 parameters.
const INSERT_BATCH: usize = 1000;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS address (
    id BIGSERIAL PRIMARY KEY,
    org_id TEXT NOT NULL DEFAULT '',
    group_key TEXT NOT NULL DEFAULT '',
    account_id TEXT NOT NULL,
    temp_id TEXT NULL
)";

const ACCOUNT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS address_account_id_idx ON address (account_id)";

/// A [`RecordStore`] over the `address` table in PostgreSQL.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects a pool of at most `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Error::store("connect", e))?;
        Ok(Self { pool })
    }

    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `address` table and its account index if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::store("ensure_schema", e))?;
        sqlx::query(ACCOUNT_INDEX)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::store("ensure_schema", e))?;
        Ok(())
    }

    /// Inserts records in order, letting the database assign keys.
    pub async fn insert_all(&self, records: &[NewRecord]) -> Result<u64> {
        let mut inserted = 0;
        for batch in records.chunks(INSERT_BATCH) {
            let mut builder =
                QueryBuilder::<Postgres>::new("INSERT INTO address (org_id, group_key, account_id) ");
            builder.push_values(batch, |mut b, r| {
                b.push_bind(&r.org_id)
                    .push_bind(&r.group_key)
                    .push_bind(&r.account_id);
            });
            inserted += builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| Error::store("insert_all", e))?
                .rows_affected();
        }
        Ok(inserted)
    }

    /// Snapshot of every record in ascending key order.
    pub async fn records(&self) -> Result<Vec<Record>> {
        sqlx::query("SELECT id, org_id, group_key, account_id, temp_id FROM address ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("records", e))?
            .iter()
            .map(record_from_row)
            .collect()
    }
}

fn record_from_row(row: &PgRow) -> Result<Record> {
    let temp_id = row
        .try_get::<Option<String>, _>("temp_id")?
        .map(|raw| raw.parse::<TempId>())
        .transpose()
        .map_err(|e| Error::store("decode temp_id", e))?;
    Ok(Record {
        id: RecordId(row.try_get("id")?),
        org_id: row.try_get("org_id")?,
        group_key: row.try_get("group_key")?,
        account_id: row.try_get("account_id")?,
        temp_id,
    })
}

impl RecordStore for PgStore {
    type Transaction = PgTransaction;

    async fn scan_page(&self, after: Option<RecordId>, limit: usize) -> Result<Vec<Record>> {
        let after = after.map_or(i64::MIN, |id| id.0);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query(
            "SELECT id, org_id, group_key, account_id, temp_id FROM address \
             WHERE id > $1 ORDER BY id ASC LIMIT $2",
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::store("scan_page", e))?
        .iter()
        .map(record_from_row)
        .collect()
    }

    async fn distinct_account_ids(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query_scalar::<_, String>("SELECT DISTINCT account_id FROM address")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("distinct_account_ids", e))?;
        Ok(rows.into_iter().collect())
    }

    async fn update_temp_id_for_accounts(
        &self,
        temp_id: TempId,
        accounts: &HashSet<String>,
    ) -> Result<u64> {
        let accounts: Vec<String> = accounts.iter().cloned().collect();
        let result = sqlx::query("UPDATE address SET temp_id = $1 WHERE account_id = ANY($2)")
            .bind(temp_id.to_string())
            .bind(accounts)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::store("update_temp_id_for_accounts", e))?;
        Ok(result.rows_affected())
    }

    async fn begin(&self) -> Result<PgTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::store("begin", e))?;
        Ok(PgTransaction { tx })
    }
}

/// One chunk's database transaction. Dropping it uncommitted rolls back.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl ChunkTransaction for PgTransaction {
    async fn update_temp_ids(&mut self, records: &[Record]) -> Result<u64> {
        let ids: Vec<i64> = records.iter().map(|r| r.id.0).collect();
        let temp_ids: Vec<Option<String>> = records
            .iter()
            .map(|r| r.temp_id.map(|id| id.to_string()))
            .collect();
        let result = sqlx::query(
            "UPDATE address AS a SET temp_id = u.temp_id \
             FROM UNNEST($1::BIGINT[], $2::TEXT[]) AS u(id, temp_id) \
             WHERE a.id = u.id",
        )
        .bind(ids)
        .bind(temp_ids)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| Error::store("update_temp_ids", e))?;
        Ok(result.rows_affected())
    }

    async fn upsert_records(&mut self, records: &[Record]) -> Result<u64> {
        let mut written = 0;
        for batch in records.chunks(INSERT_BATCH) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO address (id, org_id, group_key, account_id, temp_id) ",
            );
            builder.push_values(batch, |mut b, r| {
                b.push_bind(r.id.0)
                    .push_bind(&r.org_id)
                    .push_bind(&r.group_key)
                    .push_bind(&r.account_id)
                    .push_bind(r.temp_id.map(|id| id.to_string()));
            });
            builder.push(
                " ON CONFLICT (id) DO UPDATE SET org_id = EXCLUDED.org_id, \
                 group_key = EXCLUDED.group_key, account_id = EXCLUDED.account_id, \
                 temp_id = EXCLUDED.temp_id",
            );
            written += builder
                .build()
                .execute(&mut *self.tx)
                .await
                .map_err(|e| Error::store("upsert_records", e))?
                .rows_affected();
        }
        Ok(written)
    }

    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| Error::store("commit", e))
    }

    async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| Error::store("rollback", e))
    }
}
