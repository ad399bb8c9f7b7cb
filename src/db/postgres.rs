// PgDatabase — PostgreSQL backend implementing the Database trait.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.
//
// Differences from SQLite:
// - JSONB instead of TEXT for the policy document
// - TIMESTAMPTZ instead of TEXT for timestamps
// - $1/$2 parameter syntax (handled by sqlx)

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx_core::pool::Pool;
use sqlx_core::row::Row;
use sqlx_postgres::Postgres;

use super::traits::Database;
use super::{decode_policy, encode_policy, version_to_i64};
use crate::policy::Policy;

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect to PostgreSQL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations.
    ///
    /// Holds a session-level advisory lock on a dedicated connection for the
    /// whole sequence so two instances starting together don't race to apply
    /// the same migration. The unlock runs even when a migration fails; the
    /// migration error is surfaced first.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "EDUGATE!" as a big-endian i64.
        const MIGRATION_LOCK_KEY: i64 = 0x4544_5547_4154_4521;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [(
                1,
                include_str!("../../migrations/postgres/0001_initial.sql"),
            )];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .unwrap_or(false);

                if !applied {
                    // Schema change and schema_version insert commit together.
                    let mut tx = self.pool.begin().await?;
                    sqlx_core::raw_sql::raw_sql(sql).execute(&mut *tx).await?;
                    tx.commit().await?;
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        migration_result?;
        unlock_result?;

        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn table_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query(
            "SELECT COUNT(*)::bigint FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn load_policy(&self) -> Result<Option<Policy>> {
        let row = sqlx_core::query::query(
            "SELECT version, policy_json::text FROM moderation_policy WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let version: i64 = r.get(0);
                let json: String = r.get(1);
                Ok(Some(decode_policy(&json, version)?))
            }
            None => Ok(None),
        }
    }

    async fn insert_policy_if_absent(&self, policy: &Policy) -> Result<Policy> {
        sqlx_core::query::query(
            "INSERT INTO moderation_policy (id, version, policy_json, updated_at)
             VALUES (1, $1, $2::jsonb, NOW())
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(version_to_i64(policy.version)?)
        .bind(encode_policy(policy)?)
        .execute(&self.pool)
        .await?;

        self.load_policy()
            .await?
            .context("Policy row missing immediately after insert")
    }

    async fn compare_and_swap_policy(
        &self,
        expected_version: u64,
        policy: &Policy,
    ) -> Result<bool> {
        let result = sqlx_core::query::query(
            "UPDATE moderation_policy
             SET version = $1, policy_json = $2::jsonb, updated_at = NOW()
             WHERE id = 1 AND version = $3",
        )
        .bind(version_to_i64(policy.version)?)
        .bind(encode_policy(policy)?)
        .bind(version_to_i64(expected_version)?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
