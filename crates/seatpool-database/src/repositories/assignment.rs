//! Assignment repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use seatpool_core::error::{AppError, ErrorKind};
use seatpool_core::result::AppResult;
use seatpool_core::types::{PoolId, RequesterId};
use seatpool_entity::assignment::Assignment;

/// Repository for assignment rows outside the allocator.
///
/// Inserts go through [`super::PgAllocationStore`] so they are capacity
/// checked. Deletes free seats and need no lock.
#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    /// Create a new assignment repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every assignment row of a pool, live or dormant, oldest first.
    pub async fn list_for_pool(&self, pool: &PoolId) -> AppResult<Vec<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments WHERE tenant_id = $1 AND resource_id = $2 \
             ORDER BY assigned_at, requester_id",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list assignments", e)
        })
    }

    /// Number of assignment rows of a pool, live or dormant.
    pub async fn count_for_pool(&self, pool: &PoolId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments WHERE tenant_id = $1 AND resource_id = $2",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count assignments", e)
        })?;
        Ok(count.max(0) as u64)
    }

    /// Remove the given requesters' seats. Returns rows removed.
    pub async fn unassign(&self, pool: &PoolId, requesters: &[RequesterId]) -> AppResult<u64> {
        if requesters.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = requesters.iter().map(|r| r.into_uuid()).collect();

        let result = sqlx::query(
            "DELETE FROM assignments \
             WHERE tenant_id = $1 AND resource_id = $2 AND requester_id = ANY($3::uuid[])",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .bind(&ids)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unassign seats", e))?;
        Ok(result.rows_affected())
    }

    /// Remove every seat of a pool. Returns rows removed.
    pub async fn unassign_all(&self, pool: &PoolId) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM assignments WHERE tenant_id = $1 AND resource_id = $2")
                .bind(pool.tenant_id)
                .bind(pool.resource_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to clear pool", e)
                })?;
        Ok(result.rows_affected())
    }
}
