//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres and the data access
//! operations for every persisted resource. All statements are static SQL
//! with positional parameters; partial updates use `COALESCE` so absent
//! fields keep their stored value.

use crate::error::{has_sql_state, ApiError, ApiResult};
use crate::telemetry::METRICS;
use crate::types::*;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use parking_core::{
    occupancy_from_column, occupancy_to_column, Camera, CameraId, Coordinates,
    FavoriteParkingSummary, Occupancy, Parking, ParkingId, ParkingSpace,
    ParkingSpaceId, StorageError, User, UserId, UserStats, ValidationError,
};
use parking_storage::OccupancyStore;
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full connection URL; takes precedence over the discrete fields
    pub database_url: Option<String>,
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "localhost".to_string(),
            port: 5432,
            dbname: "parkings_db".to_string(),
            user: "parkings_db_user".to_string(),
            password: "".to_string(),
            max_size: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            host: std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("DB_NAME").unwrap_or_else(|_| "parkings_db".to_string()),
            user: std::env::var("DB_USER").unwrap_or_else(|_| "parkings_db_user".to_string()),
            password: std::env::var("DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            timeout: Duration::from_secs(
                std::env::var("DB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the first checkout.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        match &self.database_url {
            Some(url) => cfg.url = Some(url.clone()),
            None => {
                cfg.host = Some(self.host.clone());
                cfg.port = Some(self.port);
                cfg.dbname = Some(self.dbname.clone());
                cfg.user = Some(self.user.clone());
                cfg.password = Some(self.password.clone());
            }
        }

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(self.max_size);
        pool_config.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn malformed_row(err: ValidationError) -> ApiError {
    tracing::error!(error = %err, "Malformed row");
    ApiError::internal_error(format!("Malformed row: {}", err))
}

fn decode_coordinates(row: &Row, column: &str) -> ApiResult<Coordinates> {
    let raw: JsonValue = row.try_get(column)?;
    Coordinates::from_json(&raw).map_err(malformed_row)
}

fn decode_occupancy(row: &Row, column: &str) -> ApiResult<Option<Occupancy>> {
    let raw: Option<i32> = row.try_get(column)?;
    raw.map(occupancy_from_column)
        .transpose()
        .map_err(malformed_row)
}

fn parking_from_row(row: &Row) -> ApiResult<Parking> {
    Ok(Parking {
        id: row.try_get("id")?,
        description: row.try_get("description")?,
        coordinates: decode_coordinates(row, "coordinates")?,
        name: row.try_get("name")?,
        name_obj: row.try_get("name_obj")?,
        adm_area: row.try_get("adm_area")?,
        district: row.try_get("district")?,
        occupancy: decode_occupancy(row, "occupancy")?,
    })
}

fn parking_space_from_row(row: &Row) -> ApiResult<ParkingSpace> {
    Ok(ParkingSpace {
        id: row.try_get("id")?,
        id_parking: row.try_get("id_parking")?,
        coordinates: decode_coordinates(row, "coordinates")?,
    })
}

fn camera_from_row(row: &Row) -> ApiResult<Camera> {
    Ok(Camera {
        id: row.try_get("id")?,
        description: row.try_get("description")?,
        cv_data: row.try_get("cv_data")?,
    })
}

/// Users are read without their password hash.
fn user_from_row(row: &Row) -> ApiResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        password_hash: String::new(),
        subscription_status: row.try_get("subscription_status")?,
    })
}

fn column_occupancy(value: Option<Occupancy>) -> ApiResult<Option<i32>> {
    Ok(value.map(occupancy_to_column).transpose()?)
}

const PARKING_COLUMNS: &str =
    "id, description, coordinates, name, name_obj, adm_area, district, occupancy";
const USER_COLUMNS: &str = "id, email, phone_number, subscription_status";

fn observe(operation: &str, entity: &str, started: Instant, success: bool) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_db_operation(operation, entity, success, started.elapsed().as_secs_f64());
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool and provides the
/// resource-level operations used by the route handlers.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl std::fmt::Debug for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbClient")
            .field("pool_size", &self.pool_size())
            .finish()
    }
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Round-trip check used by the readiness probe.
    pub async fn health_check(&self) -> ApiResult<()> {
        let started = Instant::now();
        let result = async {
            let conn = self.get_conn().await?;
            conn.query_one("SELECT 1", &[]).await?;
            Ok::<(), ApiError>(())
        }
        .await;
        observe("health_check", "database", started, result.is_ok());
        result
    }

    // ========================================================================
    // PARKING OPERATIONS
    // ========================================================================

    pub async fn parking_list(&self) -> ApiResult<Vec<Parking>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM parkings ORDER BY id", PARKING_COLUMNS);
        let rows = conn.query(sql.as_str(), &[]).await?;
        rows.iter().map(parking_from_row).collect()
    }

    /// Parkings whose coordinates fall inside the box, bounds inclusive.
    pub async fn parking_list_in_area(&self, query: &AreaQuery) -> ApiResult<Vec<Parking>> {
        let bbox = query.bounding_box()?;
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM parkings \
             WHERE (coordinates->>'lat')::float8 BETWEEN $1 AND $2 \
               AND (coordinates->>'lon')::float8 BETWEEN $3 AND $4 \
             ORDER BY id",
            PARKING_COLUMNS
        );
        let rows = conn
            .query(
                sql.as_str(),
                &[&bbox.lat_min, &bbox.lat_max, &bbox.lon_min, &bbox.lon_max],
            )
            .await?;
        rows.iter().map(parking_from_row).collect()
    }

    pub async fn parking_get(&self, id: ParkingId) -> ApiResult<Option<Parking>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM parkings WHERE id = $1", PARKING_COLUMNS);
        let row = conn.query_opt(sql.as_str(), &[&id]).await?;
        row.as_ref().map(parking_from_row).transpose()
    }

    pub async fn parking_create(&self, req: &CreateParkingRequest) -> ApiResult<ParkingCreatedResponse> {
        let conn = self.get_conn().await?;
        let occupancy = column_occupancy(req.occupancy)?;
        let row = conn
            .query_one(
                "INSERT INTO parkings \
                 (description, coordinates, name, name_obj, adm_area, district, occupancy) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING id, name, coordinates",
                &[
                    &req.description,
                    &req.coordinates.to_json(),
                    &req.name,
                    &req.name_obj,
                    &req.adm_area,
                    &req.district,
                    &occupancy,
                ],
            )
            .await?;

        Ok(ParkingCreatedResponse {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            coordinates: decode_coordinates(&row, "coordinates")?,
        })
    }

    /// Apply the supplied fields; `None` when the parking does not exist.
    pub async fn parking_update(
        &self,
        id: ParkingId,
        req: &UpdateParkingRequest,
    ) -> ApiResult<Option<ParkingUpdatedResponse>> {
        if req.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }

        let conn = self.get_conn().await?;
        let coordinates = req.coordinates.as_ref().map(Coordinates::to_json);
        let occupancy = column_occupancy(req.occupancy)?;
        let row = conn
            .query_opt(
                "UPDATE parkings SET \
                   description = COALESCE($1, description), \
                   coordinates = COALESCE($2, coordinates), \
                   name = COALESCE($3, name), \
                   name_obj = COALESCE($4, name_obj), \
                   adm_area = COALESCE($5, adm_area), \
                   district = COALESCE($6, district), \
                   occupancy = COALESCE($7, occupancy) \
                 WHERE id = $8 \
                 RETURNING id, name, occupancy",
                &[
                    &req.description,
                    &coordinates,
                    &req.name,
                    &req.name_obj,
                    &req.adm_area,
                    &req.district,
                    &occupancy,
                    &id,
                ],
            )
            .await?;

        row.map(|row| {
            Ok(ParkingUpdatedResponse {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                occupancy: decode_occupancy(&row, "occupancy")?,
            })
        })
        .transpose()
    }

    /// Delete a parking; `None` when it does not exist.
    pub async fn parking_delete(&self, id: ParkingId) -> ApiResult<Option<ParkingId>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt("DELETE FROM parkings WHERE id = $1 RETURNING id", &[&id])
            .await
            .map_err(|e| {
                if has_sql_state(&e, &SqlState::FOREIGN_KEY_VIOLATION) {
                    ApiError::invalid_input("Parking is still referenced by spaces or favorites")
                } else {
                    ApiError::from(e)
                }
            })?;
        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }

    // ========================================================================
    // PARKING SPACE OPERATIONS
    // ========================================================================

    pub async fn parking_space_list(&self) -> ApiResult<Vec<ParkingSpace>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT id, id_parking, coordinates FROM parking_spaces ORDER BY id_parking, id",
                &[],
            )
            .await?;
        rows.iter().map(parking_space_from_row).collect()
    }

    pub async fn parking_space_list_by_parking(&self, id_parking: ParkingId) -> ApiResult<Vec<ParkingSpace>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT id, id_parking, coordinates FROM parking_spaces \
                 WHERE id_parking = $1 ORDER BY id",
                &[&id_parking],
            )
            .await?;
        rows.iter().map(parking_space_from_row).collect()
    }

    pub async fn parking_space_get(&self, id: ParkingSpaceId) -> ApiResult<Option<ParkingSpace>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, id_parking, coordinates FROM parking_spaces WHERE id = $1",
                &[&id],
            )
            .await?;
        row.as_ref().map(parking_space_from_row).transpose()
    }

    pub async fn parking_space_create(&self, req: &CreateParkingSpaceRequest) -> ApiResult<ParkingSpaceRef> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO parking_spaces (coordinates, id_parking) \
                 VALUES ($1, $2) RETURNING id, id_parking",
                &[&req.coordinates.to_json(), &req.id_parking],
            )
            .await
            .map_err(|e| {
                if has_sql_state(&e, &SqlState::FOREIGN_KEY_VIOLATION) {
                    ApiError::not_found("Parent Parking ID not found")
                } else {
                    ApiError::from(e)
                }
            })?;

        Ok(ParkingSpaceRef {
            id: row.try_get("id")?,
            id_parking: row.try_get("id_parking")?,
        })
    }

    pub async fn parking_space_update(
        &self,
        id: ParkingSpaceId,
        coordinates: &Coordinates,
    ) -> ApiResult<Option<ParkingSpaceRef>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "UPDATE parking_spaces SET coordinates = $1 WHERE id = $2 \
                 RETURNING id, id_parking",
                &[&coordinates.to_json(), &id],
            )
            .await?;

        row.map(|row| {
            Ok(ParkingSpaceRef {
                id: row.try_get("id")?,
                id_parking: row.try_get("id_parking")?,
            })
        })
        .transpose()
    }

    pub async fn parking_space_delete(&self, id: ParkingSpaceId) -> ApiResult<Option<ParkingSpaceId>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt("DELETE FROM parking_spaces WHERE id = $1 RETURNING id", &[&id])
            .await?;
        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }

    // ========================================================================
    // CAMERA OPERATIONS
    // ========================================================================

    pub async fn camera_list(&self) -> ApiResult<Vec<Camera>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query("SELECT id, description, cv_data FROM cameras ORDER BY id", &[])
            .await?;
        rows.iter().map(camera_from_row).collect()
    }

    pub async fn camera_get(&self, id: CameraId) -> ApiResult<Option<Camera>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt("SELECT id, description, cv_data FROM cameras WHERE id = $1", &[&id])
            .await?;
        row.as_ref().map(camera_from_row).transpose()
    }

    pub async fn camera_create(&self, req: &CreateCameraRequest) -> ApiResult<Camera> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO cameras (description, cv_data) VALUES ($1, $2) \
                 RETURNING id, description, cv_data",
                &[&req.description, &req.cv_data],
            )
            .await?;
        camera_from_row(&row)
    }

    pub async fn camera_update(&self, id: CameraId, req: &UpdateCameraRequest) -> ApiResult<Option<Camera>> {
        if req.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }

        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "UPDATE cameras SET \
                   description = COALESCE($1, description), \
                   cv_data = COALESCE($2, cv_data) \
                 WHERE id = $3 \
                 RETURNING id, description, cv_data",
                &[&req.description, &req.cv_data, &id],
            )
            .await?;
        row.as_ref().map(camera_from_row).transpose()
    }

    pub async fn camera_delete(&self, id: CameraId) -> ApiResult<Option<CameraId>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt("DELETE FROM cameras WHERE id = $1 RETURNING id", &[&id])
            .await?;
        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }

    /// The computer-vision payload last reported by a camera.
    pub async fn camera_cv_data(&self, id: CameraId) -> ApiResult<Option<JsonValue>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt("SELECT cv_data FROM cameras WHERE id = $1", &[&id])
            .await?;
        Ok(row.map(|r| r.try_get("cv_data")).transpose()?)
    }

    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    pub async fn user_list(&self) -> ApiResult<Vec<User>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = conn.query(sql.as_str(), &[]).await?;
        rows.iter().map(user_from_row).collect()
    }

    pub async fn user_get(&self, id: UserId) -> ApiResult<Option<User>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = conn.query_opt(sql.as_str(), &[&id]).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// Id and password hash for a login attempt.
    pub async fn user_auth_data(&self, email: &str) -> ApiResult<Option<(UserId, String)>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt("SELECT id, password_hash FROM users WHERE email = $1", &[&email])
            .await?;

        row.map(|row| Ok((row.try_get("id")?, row.try_get("password_hash")?)))
            .transpose()
    }

    /// Insert a user whose password has already been hashed.
    pub async fn user_create(&self, req: &CreateUserRequest, password_hash: &str) -> ApiResult<User> {
        let conn = self.get_conn().await?;

        let existing = conn
            .query_opt("SELECT id FROM users WHERE email = $1", &[&req.email])
            .await?;
        if existing.is_some() {
            return Err(ApiError::invalid_input("Email already exists"));
        }

        let sql = format!(
            "INSERT INTO users (email, phone_number, password_hash, subscription_status) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[&req.email, &req.phone_number, &password_hash, &req.subscription_status],
            )
            .await
            .map_err(|e| {
                if has_sql_state(&e, &SqlState::UNIQUE_VIOLATION) {
                    ApiError::invalid_input("Email already exists")
                } else {
                    ApiError::from(e)
                }
            })?;
        user_from_row(&row)
    }

    pub async fn user_update(&self, id: UserId, req: &UpdateUserRequest) -> ApiResult<Option<User>> {
        if req.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }

        let conn = self.get_conn().await?;
        let sql = format!(
            "UPDATE users SET \
               phone_number = COALESCE($1, phone_number), \
               subscription_status = COALESCE($2, subscription_status) \
             WHERE id = $3 RETURNING {}",
            USER_COLUMNS
        );
        let row = conn
            .query_opt(sql.as_str(), &[&req.phone_number, &req.subscription_status, &id])
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// Delete a user; false when absent.
    pub async fn user_delete(&self, id: UserId) -> ApiResult<bool> {
        let conn = self.get_conn().await?;
        let deleted = conn.execute("DELETE FROM users WHERE id = $1", &[&id]).await?;
        Ok(deleted > 0)
    }

    pub async fn user_stats(&self) -> ApiResult<UserStats> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "SELECT COUNT(*) AS total, \
                        COUNT(*) FILTER (WHERE subscription_status) AS subscribers \
                 FROM users",
                &[],
            )
            .await?;
        Ok(UserStats::new(row.try_get("total")?, row.try_get("subscribers")?))
    }

    // ========================================================================
    // FAVORITE OPERATIONS
    // ========================================================================

    pub async fn favorite_list(&self, id_user: UserId) -> ApiResult<Vec<FavoriteParkingSummary>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT p.id, p.name, p.coordinates \
                 FROM favorite_parkings fp \
                 JOIN parkings p ON p.id = fp.id_parking \
                 WHERE fp.id_user = $1 \
                 ORDER BY fp.id",
                &[&id_user],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(FavoriteParkingSummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    coordinates: decode_coordinates(row, "coordinates")?,
                })
            })
            .collect()
    }

    /// Link a parking to a user; returns the link id.
    pub async fn favorite_add(&self, req: &FavoriteRequest) -> ApiResult<i32> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO favorite_parkings (id_user, id_parking) VALUES ($1, $2) RETURNING id",
                &[&req.id_user, &req.id_parking],
            )
            .await
            .map_err(|e| {
                if has_sql_state(&e, &SqlState::UNIQUE_VIOLATION) {
                    ApiError::already_exists("Parking is already in user's favorites")
                } else if has_sql_state(&e, &SqlState::FOREIGN_KEY_VIOLATION) {
                    ApiError::not_found("User or Parking not found")
                } else {
                    tracing::error!(error = %e, "Favorite insert failed");
                    ApiError::write_rejected("Failed to add favorite")
                }
            })?;
        Ok(row.try_get("id")?)
    }

    /// Remove a favorite link; `None` when it does not exist.
    pub async fn favorite_remove(&self, req: &FavoriteRequest) -> ApiResult<Option<i32>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "DELETE FROM favorite_parkings WHERE id_user = $1 AND id_parking = $2 RETURNING id",
                &[&req.id_user, &req.id_parking],
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Favorite delete failed");
                ApiError::write_rejected("Failed to delete favorite")
            })?;
        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }
}

// ============================================================================
// OCCUPANCY STORE
// ============================================================================

#[async_trait]
impl OccupancyStore for DbClient {
    async fn update_occupancy(&self, id: ParkingId, occupancy: Occupancy) -> Result<u64, StorageError> {
        let started = Instant::now();
        let result = async {
            let column = occupancy_to_column(occupancy)
                .map_err(|e| StorageError::store("update_occupancy", e))?;
            let conn = self
                .get_conn()
                .await
                .map_err(|e| StorageError::store("update_occupancy", e.message))?;
            conn.execute(
                "UPDATE parkings SET occupancy = $1 WHERE id = $2",
                &[&column, &id],
            )
            .await
            .map_err(|e| StorageError::store("update_occupancy", e))
        }
        .await;

        observe("update_occupancy", "parking", started, result.is_ok());
        result
    }

    async fn get_occupancy(&self, id: ParkingId) -> Result<Option<Occupancy>, StorageError> {
        let started = Instant::now();
        let result = async {
            let conn = self
                .get_conn()
                .await
                .map_err(|e| StorageError::store("get_occupancy", e.message))?;
            let row = conn
                .query_opt("SELECT occupancy FROM parkings WHERE id = $1", &[&id])
                .await
                .map_err(|e| StorageError::store("get_occupancy", e))?;

            let raw: Option<i32> = match row {
                Some(row) => row
                    .try_get("occupancy")
                    .map_err(|e| StorageError::store("get_occupancy", e))?,
                None => None,
            };

            raw.map(occupancy_from_column)
                .transpose()
                .map_err(|e| StorageError::store("get_occupancy", e))
        }
        .await;

        observe("get_occupancy", "parking", started, result.is_ok());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "parkings_db");
        assert_eq!(config.user, "parkings_db_user");
        assert_eq!(config.max_size, 10);
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() -> Result<(), String> {
        let config = DbConfig {
            port: 1,
            ..Default::default()
        };
        let client = DbClient::from_config(&config).map_err(|e| e.message)?;
        assert_eq!(client.pool_size(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_pool_accepts_database_url() -> Result<(), String> {
        let config = DbConfig {
            database_url: Some("postgres://user:pw@localhost:5432/parkings_db".to_string()),
            ..Default::default()
        };
        DbClient::from_config(&config).map_err(|e| e.message)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_updates_rejected_before_io() -> Result<(), String> {
        let client = DbClient::from_config(&DbConfig::default()).map_err(|e| e.message)?;

        let err = client
            .parking_update(1, &UpdateParkingRequest::default())
            .await
            .err();
        assert_eq!(err.map(|e| e.message), Some("No fields to update".to_string()));

        let err = client.user_update(1, &UpdateUserRequest::default()).await.err();
        assert_eq!(err.map(|e| e.message), Some("No fields to update".to_string()));

        let err = client
            .camera_update(1, &UpdateCameraRequest::default())
            .await
            .err();
        assert_eq!(err.map(|e| e.message), Some("No fields to update".to_string()));
        Ok(())
    }
}
