//! PostgreSQL implementation of [`AllocationStore`].
//!
//! Each unit of work is one transaction. Pool locks are transaction-scoped
//! advisory locks, so commit, rollback, and a dropped connection all
//! release them.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use seatpool_core::error::{AppError, ErrorKind};
use seatpool_core::result::AppResult;
use seatpool_core::traits::{AllocationStore, UnitOfWork};
use seatpool_core::types::{PoolId, PoolLockKey, RequesterId};

/// SQLSTATE `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Allocation store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgAllocationStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PgAllocationStore {
    /// Create a store. With `lock_timeout` unset, lock waits are unbounded.
    pub fn new(pool: PgPool, lock_timeout: Option<Duration>) -> Self {
        Self { pool, lock_timeout }
    }

    async fn open(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))
    }
}

#[async_trait]
impl AllocationStore for PgAllocationStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let mut tx = self.open().await?;

        if let Some(timeout) = self.lock_timeout {
            sqlx::query("SELECT set_config('lock_timeout', $1, true)")
                .bind(lock_timeout_setting(timeout))
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to set lock timeout", e))?;
        }

        Ok(Box::new(PgUnitOfWork {
            tx,
            read_only: false,
        }))
    }

    async fn begin_read_snapshot(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let mut tx = self.open().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to start read snapshot", e))?;

        Ok(Box::new(PgUnitOfWork {
            tx,
            read_only: true,
        }))
    }
}

/// One open transaction.
///
/// Dropping it without commit returns the connection to the pool, which
/// rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    read_only: bool,
}

impl fmt::Debug for PgUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgUnitOfWork")
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_pool(&mut self, key: PoolLockKey) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to acquire pool lock", e))?;
        debug!(key = %key, "Advisory pool lock acquired");
        Ok(())
    }

    async fn sum_active_seat_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(seat_count), 0)::BIGINT FROM grants \
             WHERE tenant_id = $1 AND resource_id = $2 AND expires_at > $3",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to sum active seats", e))?;

        seat_total(total, pool)
    }

    async fn distinct_live_holder_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let holders = self.live_holder_ids(pool, now).await?;
        Ok(holders.len() as u64)
    }

    async fn active_capacity(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<(u64, u64)> {
        // One statement, one snapshot. Every grant has seat_count > 0, so
        // a positive total means some grant is active and all rows are live.
        let (total, holders): (i64, Vec<Uuid>) = sqlx::query_as(
            "WITH active AS ( \
                 SELECT COALESCE(SUM(seat_count), 0)::BIGINT AS total FROM grants \
                 WHERE tenant_id = $1 AND resource_id = $2 AND expires_at > $3 \
             ) \
             SELECT active.total, \
                    ARRAY(SELECT a.requester_id FROM assignments a \
                          WHERE a.tenant_id = $1 AND a.resource_id = $2 \
                            AND active.total > 0) \
             FROM active",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to read pool capacity", e))?;

        let total = seat_total(total, pool)?;
        let used = holders.into_iter().collect::<HashSet<Uuid>>().len() as u64;
        Ok((total, used))
    }

    async fn live_holder_ids(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<HashSet<RequesterId>> {
        let rows: Vec<Uuid> = sqlx::query_scalar(
            "SELECT a.requester_id FROM assignments a \
             WHERE a.tenant_id = $1 AND a.resource_id = $2 \
               AND EXISTS (SELECT 1 FROM grants g \
                           WHERE g.tenant_id = a.tenant_id \
                             AND g.resource_id = a.resource_id \
                             AND g.expires_at > $3)",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .bind(now)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to load seat holders", e))?;

        Ok(rows.into_iter().map(RequesterId::from_uuid).collect())
    }

    async fn insert_assignments(
        &mut self,
        pool: &PoolId,
        requesters: &[RequesterId],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.read_only {
            return Err(AppError::validation(
                "Cannot write assignments in a read-only unit of work",
            ));
        }
        if requesters.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = requesters.iter().map(|_| Uuid::now_v7()).collect();
        let holders: Vec<Uuid> = requesters.iter().map(|r| r.into_uuid()).collect();

        let result = sqlx::query(
            "INSERT INTO assignments (id, tenant_id, resource_id, requester_id, assigned_at) \
             SELECT u.id, $1, $2, u.requester_id, $3 \
             FROM UNNEST($4::uuid[], $5::uuid[]) AS u(id, requester_id) \
             ON CONFLICT (tenant_id, resource_id, requester_id) DO NOTHING",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .bind(now)
        .bind(&ids)
        .bind(&holders)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to insert assignments", e))?;

        let inserted = result.rows_affected();
        if inserted < requesters.len() as u64 {
            warn!(
                pool = %pool,
                requested = requesters.len(),
                inserted,
                "Some assignments already existed; another writer touched the pool"
            );
        } else {
            debug!(pool = %pool, inserted, "Assignments inserted");
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("Failed to commit allocation", e))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_error("Failed to roll back allocation", e))
    }
}

fn seat_total(total: i64, pool: &PoolId) -> AppResult<u64> {
    u64::try_from(total)
        .map_err(|_| AppError::internal(format!("Negative seat total {total} for pool {pool}")))
}

/// Map a sqlx error, keeping lock timeouts distinguishable.
fn db_error(context: &str, err: sqlx::Error) -> AppError {
    let lock_timed_out = matches!(
        &err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE)
    );
    if lock_timed_out {
        return AppError::with_source(
            ErrorKind::LockUnavailable,
            format!("{context}: lock wait timed out"),
            err,
        );
    }
    AppError::with_source(ErrorKind::Database, context, err)
}

/// Value for PostgreSQL's `lock_timeout` setting. Zero would disable the
/// timeout, so it is raised to one millisecond.
fn lock_timeout_setting(timeout: Duration) -> String {
    format!("{}ms", timeout.as_millis().max(1))
}
