use crate::config::AppConfig;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    sea_query::Expr, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, QuerySelect, SqlErr, TransactionError,
    TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("autoshop_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        ServiceError::db_error(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs `f` inside a database transaction, committing on `Ok` and rolling
/// back on `Err`. Every query in `f` must go through the supplied
/// transaction handle.
pub async fn transaction<F, T>(db: &DbPool, f: F) -> Result<T, ServiceError>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, ServiceError>> + Send,
    T: Send + 'static,
{
    let transaction_id = Uuid::new_v4();
    let start = std::time::Instant::now();

    debug!(transaction_id = %transaction_id, "Starting database transaction");
    counter!("autoshop_db.transaction.started", 1);

    let result = db.transaction::<_, T, ServiceError>(f).await;

    let elapsed = start.elapsed();
    histogram!("autoshop_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("autoshop_db.transaction.committed", 1);
            debug!(transaction_id = %transaction_id, "Transaction committed in {:?}", elapsed);
        }
        Err(_) => {
            counter!("autoshop_db.transaction.rolled_back", 1);
            warn!(transaction_id = %transaction_id, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result.map_err(|e| match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    })
}

/// Next value of a per-table running number: `max(column) + 1`, starting at 1.
pub async fn next_seq<E, C>(conn: &C, column: E::Column) -> Result<i32, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let max: Option<Option<i32>> = E::find()
        .select_only()
        .column_as(Expr::col(column).max(), "max_seq")
        .into_tuple()
        .one(conn)
        .await?;

    Ok(max.flatten().unwrap_or(0) + 1)
}

/// Runs database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::db_error);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!("Database migrations completed successfully in {:?}", elapsed),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();
    let result = pool.ping().await.map_err(ServiceError::db_error);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("autoshop_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!("Database connection check failed after {:?}: {}", elapsed, e);
            counter!("autoshop_db.connection_failures", 1);
        }
    }

    result
}

/// Convenience for services that look up a row by id and treat absence as 404.
pub fn not_found(kind: &str, id: impl std::fmt::Display) -> ServiceError {
    ServiceError::NotFound(format!("{} {} not found", kind, id))
}

/// Unique and foreign-key violations become `Conflict` with `message`; any
/// other failure stays a database error.
pub fn constraint_conflict(err: DbErr, message: impl FnOnce() -> String) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_))
        | Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            debug!(error = %err, "constraint violation");
            ServiceError::Conflict(message())
        }
        _ => ServiceError::db_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::part;
    use sea_orm::{ActiveModelTrait, PaginatorTrait, Set};

    async fn memory_pool() -> DbPool {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn part_model(name: &str) -> part::ActiveModel {
        let now = chrono::Utc::now();
        part::ActiveModel {
            id: Set(Uuid::new_v4()),
            part_name: Set(name.to_string()),
            brand_name: Set("Bosch".to_string()),
            qty_left: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    #[tokio::test]
    async fn failed_transaction_rolls_back() {
        let pool = memory_pool().await;

        let result: Result<(), ServiceError> = transaction(&pool, |txn| {
            Box::pin(async move {
                part_model("Oil Filter").insert(txn).await?;
                Err(ServiceError::BadRequest("abort".into()))
            })
        })
        .await;

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
        assert_eq!(part::Entity::find().count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn committed_transaction_persists() {
        let pool = memory_pool().await;

        transaction(&pool, |txn| {
            Box::pin(async move {
                part_model("Spark Plug").insert(txn).await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        assert_eq!(part::Entity::find().count(&pool).await.unwrap(), 1);
        check_connection(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_insert_maps_to_conflict() {
        let pool = memory_pool().await;
        part_model("Wiper").insert(&pool).await.unwrap();

        let err = part_model("Wiper").insert(&pool).await.unwrap_err();
        let mapped = constraint_conflict(err, || "part exists".to_string());
        assert!(matches!(mapped, ServiceError::Conflict(ref m) if m == "part exists"));

        let other = constraint_conflict(DbErr::Custom("boom".into()), || unreachable!());
        assert!(matches!(other, ServiceError::DatabaseError(_)));
    }
}
