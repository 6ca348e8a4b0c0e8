//! Grant repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use seatpool_core::error::{AppError, ErrorKind};
use seatpool_core::result::AppResult;
use seatpool_core::types::PoolId;
use seatpool_entity::grant::Grant;

/// Repository for seat grants.
///
/// The allocator only reads grants; rows are written here by operators.
#[derive(Debug, Clone)]
pub struct GrantRepository {
    pool: PgPool,
}

impl GrantRepository {
    /// Create a new grant repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All grants of a pool, newest expiry first.
    pub async fn list_for_pool(&self, pool: &PoolId) -> AppResult<Vec<Grant>> {
        sqlx::query_as::<_, Grant>(
            "SELECT * FROM grants WHERE tenant_id = $1 AND resource_id = $2 \
             ORDER BY expires_at DESC",
        )
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list grants", e))
    }

    /// Issue a grant of `seat_count` seats valid for `[issued_at, expires_at)`.
    pub async fn create(
        &self,
        pool: &PoolId,
        seat_count: i32,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Grant> {
        if seat_count <= 0 {
            return Err(AppError::validation(format!(
                "Seat count must be positive, got {seat_count}"
            )));
        }
        if expires_at <= issued_at {
            return Err(AppError::validation("Grant must expire after it is issued"));
        }

        sqlx::query_as::<_, Grant>(
            "INSERT INTO grants (id, tenant_id, resource_id, seat_count, issued_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(pool.tenant_id)
        .bind(pool.resource_id)
        .bind(seat_count)
        .bind(issued_at)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create grant", e))
    }
}
