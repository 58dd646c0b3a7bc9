//! Postgres repository implementation using Diesel.
//!
//! Implements every repository trait against the booking schema created by
//! the embedded migrations. Seat reservation is a single conditional
//! `UPDATE`, so concurrent checkouts cannot oversell a slot.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::BigInt;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::db::repository::*;
use crate::models::*;

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of idle connections kept open
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds, doubled on each retry
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from the `DATABASE_URL` and `PG_*` environment
    /// variables listed in the module docs.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_parse("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_parse("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_parse(
                "PG_CONN_TIMEOUT_SEC",
                defaults.connection_timeout_sec,
            ),
            idle_timeout_sec: env_parse("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_parse("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_parse("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    pub total_queries: u64,
    pub failed_queries: u64,
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        log::info!(
            "Postgres repository ready (pool max={}, min idle={})",
            config.max_pool_size,
            config.min_pool_size
        );

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        Ok(())
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        log::warn!("Retrying database operation after error: {}", e);
                        last_error = Some(e);
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Current pool state and query counters.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn missing(entity: &str, id: impl ToString, operation: &str) -> RepositoryError {
    let id = id.to_string();
    RepositoryError::not_found_with_context(
        format!("{} {} not found", entity, id),
        ErrorContext::new(operation)
            .with_entity(entity)
            .with_entity_id(id),
    )
}

fn tour_exists(conn: &mut PgConnection, tour_id: i64) -> RepositoryResult<bool> {
    diesel::select(diesel::dsl::exists(
        tours::table.filter(tours::tour_id.eq(tour_id)),
    ))
    .get_result(conn)
    .map_err(map_diesel_error)
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn load_booking_items(
    conn: &mut PgConnection,
    booking_ids: &[i64],
) -> RepositoryResult<HashMap<i64, Vec<BookingItemRow>>> {
    let rows: Vec<BookingItemRow> = booking_items::table
        .filter(booking_items::booking_id.eq_any(booking_ids))
        .order(booking_items::item_id.asc())
        .select(BookingItemRow::as_select())
        .load(conn)
        .map_err(map_diesel_error)?;

    let mut grouped: HashMap<i64, Vec<BookingItemRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.booking_id).or_default().push(row);
    }
    Ok(grouped)
}

fn assemble_bookings(
    conn: &mut PgConnection,
    rows: Vec<BookingRow>,
) -> RepositoryResult<Vec<Booking>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.booking_id).collect();
    let mut items = load_booking_items(conn, &ids)?;
    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.booking_id).unwrap_or_default();
            row.into_booking(lines)
        })
        .collect()
}

fn load_booking(
    conn: &mut PgConnection,
    filter_id: Option<i64>,
    filter_token: Option<&str>,
    operation: &str,
) -> RepositoryResult<Booking> {
    let mut query = bookings::table.into_boxed();
    if let Some(id) = filter_id {
        query = query.filter(bookings::booking_id.eq(id));
    }
    if let Some(token) = filter_token {
        query = query.filter(bookings::voucher_token.eq(token.to_string()));
    }
    let row = query
        .select(BookingRow::as_select())
        .first::<BookingRow>(conn)
        .optional()
        .map_err(map_diesel_error)?
        .ok_or_else(|| match filter_id {
            Some(id) => missing("booking", id, operation),
            None => missing("booking", filter_token.unwrap_or_default(), operation),
        })?;
    assemble_bookings(conn, vec![row])?
        .pop()
        .ok_or_else(|| RepositoryError::internal("Booking vanished while loading items"))
}

// ==================== Tours ====================

#[async_trait]
impl TourRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_tours(&self, filter: TourFilter) -> RepositoryResult<Vec<Tour>> {
        self.with_conn(move |conn| {
            let mut query = tours::table.into_boxed();
            if filter.published_only {
                query = query.filter(tours::published.eq(true));
            }
            if let Some(category) = filter.category_id {
                query = query.filter(tours::category_id.eq(category.0));
            }
            if let Some(label) = filter.label_id {
                query = query.filter(tours::label_ids.contains(vec![label.0]));
            }
            query
                .order(tours::tour_id.asc())
                .select(TourRow::as_select())
                .load::<TourRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(TourRow::into_tour)
                .collect()
        })
        .await
    }

    async fn get_tour(&self, tour_id: TourId) -> RepositoryResult<Tour> {
        self.with_conn(move |conn| {
            tours::table
                .find(tour_id.0)
                .select(TourRow::as_select())
                .first::<TourRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("tour", tour_id, "get_tour"))?
                .into_tour()
        })
        .await
    }

    async fn get_tour_by_slug(&self, slug: &str) -> RepositoryResult<Tour> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            tours::table
                .filter(tours::slug.eq(&slug))
                .select(TourRow::as_select())
                .first::<TourRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("tour", &slug, "get_tour_by_slug"))?
                .into_tour()
        })
        .await
    }

    async fn create_tour(&self, input: &TourInput) -> RepositoryResult<Tour> {
        let changes = TourChanges::from_input(input)?;
        self.with_conn(move |conn| {
            diesel::insert_into(tours::table)
                .values(&changes)
                .returning(TourRow::as_returning())
                .get_result::<TourRow>(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_tour"))?
                .into_tour()
        })
        .await
    }

    async fn update_tour(&self, tour_id: TourId, input: &TourInput) -> RepositoryResult<Tour> {
        let changes = TourChanges::from_input(input)?;
        self.with_conn(move |conn| {
            diesel::update(tours::table.find(tour_id.0))
                .set(&changes)
                .returning(TourRow::as_returning())
                .get_result::<TourRow>(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_tour"))?
                .ok_or_else(|| missing("tour", tour_id, "update_tour"))?
                .into_tour()
        })
        .await
    }

    async fn delete_tour(&self, tour_id: TourId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                if !tour_exists(tx, tour_id.0)? {
                    return Err(missing("tour", tour_id, "delete_tour"));
                }
                let booked: i64 = bookings::table
                    .filter(bookings::tour_id.eq(tour_id.0))
                    .count()
                    .get_result(tx)?;
                if booked > 0 {
                    return Err(RepositoryError::conflict_with_context(
                        "Tour has bookings and cannot be deleted",
                        ErrorContext::new("delete_tour")
                            .with_entity("tour")
                            .with_entity_id(tour_id),
                    ));
                }
                diesel::delete(tours::table.find(tour_id.0)).execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn list_blocks(&self, tour_id: TourId) -> RepositoryResult<Vec<TourBlock>> {
        self.with_conn(move |conn| {
            tour_blocks::table
                .filter(tour_blocks::tour_id.eq(tour_id.0))
                .order((tour_blocks::position.asc(), tour_blocks::block_id.asc()))
                .select(BlockRow::as_select())
                .load::<BlockRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(BlockRow::into_block)
                .collect()
        })
        .await
    }

    async fn get_block(&self, block_id: BlockId) -> RepositoryResult<TourBlock> {
        self.with_conn(move |conn| {
            tour_blocks::table
                .find(block_id.0)
                .select(BlockRow::as_select())
                .first::<BlockRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("block", block_id, "get_block"))?
                .into_block()
        })
        .await
    }

    async fn upsert_block(
        &self,
        tour_id: TourId,
        input: &TourBlockInput,
    ) -> RepositoryResult<TourBlock> {
        let block_id = input.id;
        let changes = BlockChanges {
            tour_id: tour_id.0,
            kind: input.kind.as_str().to_string(),
            position: input.position,
            translations: models::to_json(&input.translations)?,
        };
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                if !tour_exists(tx, tour_id.0)? {
                    return Err(missing("tour", tour_id, "upsert_block"));
                }
                let row: BlockRow = match block_id {
                    Some(id) => {
                        let owner: i64 = tour_blocks::table
                            .find(id.0)
                            .select(tour_blocks::tour_id)
                            .first(tx)
                            .optional()?
                            .ok_or_else(|| missing("block", id, "upsert_block"))?;
                        if owner != tour_id.0 {
                            return Err(RepositoryError::validation(format!(
                                "Block {} belongs to another tour",
                                id
                            )));
                        }
                        diesel::update(tour_blocks::table.find(id.0))
                            .set(&changes)
                            .returning(BlockRow::as_returning())
                            .get_result(tx)?
                    }
                    None => diesel::insert_into(tour_blocks::table)
                        .values(&changes)
                        .returning(BlockRow::as_returning())
                        .get_result(tx)?,
                };
                row.into_block()
            })
        })
        .await
    }

    async fn delete_block(&self, block_id: BlockId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(tour_blocks::table.find(block_id.0))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(missing("block", block_id, "delete_block"));
            }
            Ok(())
        })
        .await
    }

    async fn get_pricing(&self, tour_id: TourId) -> RepositoryResult<Option<TourPricing>> {
        self.with_conn(move |conn| {
            tour_pricing::table
                .find(tour_id.0)
                .select(PricingRow::as_select())
                .first::<PricingRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(PricingRow::into_pricing)
                .transpose()
        })
        .await
    }

    async fn set_pricing(
        &self,
        tour_id: TourId,
        config: &PricingConfig,
    ) -> RepositoryResult<TourPricing> {
        let row = PricingRow {
            tour_id: tour_id.0,
            config: models::to_json(config)?,
            updated_at: Utc::now(),
        };
        self.with_conn(move |conn| {
            if !tour_exists(conn, tour_id.0)? {
                return Err(missing("tour", tour_id, "set_pricing"));
            }
            diesel::insert_into(tour_pricing::table)
                .values(&row)
                .on_conflict(tour_pricing::tour_id)
                .do_update()
                .set((
                    tour_pricing::config.eq(excluded(tour_pricing::config)),
                    tour_pricing::updated_at.eq(excluded(tour_pricing::updated_at)),
                ))
                .returning(PricingRow::as_returning())
                .get_result::<PricingRow>(conn)
                .map_err(map_diesel_error)?
                .into_pricing()
        })
        .await
    }

    async fn list_upsells(&self, tour_id: TourId) -> RepositoryResult<Vec<Upsell>> {
        self.with_conn(move |conn| {
            let rows = upsells::table
                .filter(upsells::tour_id.eq(tour_id.0))
                .order(upsells::upsell_id.asc())
                .select(UpsellRow::as_select())
                .load::<UpsellRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Upsell::from).collect())
        })
        .await
    }

    async fn create_upsell(
        &self,
        tour_id: TourId,
        input: &UpsellInput,
    ) -> RepositoryResult<Upsell> {
        let changes = UpsellChanges::new(tour_id, input);
        self.with_conn(move |conn| {
            if !tour_exists(conn, tour_id.0)? {
                return Err(missing("tour", tour_id, "create_upsell"));
            }
            diesel::insert_into(upsells::table)
                .values(&changes)
                .returning(UpsellRow::as_returning())
                .get_result::<UpsellRow>(conn)
                .map(Upsell::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_upsell(
        &self,
        upsell_id: UpsellId,
        input: &UpsellInput,
    ) -> RepositoryResult<Upsell> {
        let input = input.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let owner: i64 = upsells::table
                    .find(upsell_id.0)
                    .select(upsells::tour_id)
                    .first(tx)
                    .optional()?
                    .ok_or_else(|| missing("upsell", upsell_id, "update_upsell"))?;
                let changes = UpsellChanges::new(TourId(owner), &input);
                let row: UpsellRow = diesel::update(upsells::table.find(upsell_id.0))
                    .set(&changes)
                    .returning(UpsellRow::as_returning())
                    .get_result(tx)?;
                Ok(Upsell::from(row))
            })
        })
        .await
    }

    async fn delete_upsell(&self, upsell_id: UpsellId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(upsells::table.find(upsell_id.0))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(missing("upsell", upsell_id, "delete_upsell"));
            }
            Ok(())
        })
        .await
    }

    async fn list_packages(&self, tour_id: TourId) -> RepositoryResult<Vec<Package>> {
        self.with_conn(move |conn| {
            let rows = packages::table
                .filter(packages::tour_id.eq(tour_id.0))
                .order(packages::package_id.asc())
                .select(PackageRow::as_select())
                .load::<PackageRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Package::from).collect())
        })
        .await
    }

    async fn create_package(
        &self,
        tour_id: TourId,
        input: &PackageInput,
    ) -> RepositoryResult<Package> {
        let row = NewPackageRow::new(tour_id, input)?;
        self.with_conn(move |conn| {
            if !tour_exists(conn, tour_id.0)? {
                return Err(missing("tour", tour_id, "create_package"));
            }
            diesel::insert_into(packages::table)
                .values(&row)
                .returning(PackageRow::as_returning())
                .get_result::<PackageRow>(conn)
                .map(Package::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn delete_package(&self, package_id: PackageId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(packages::table.find(package_id.0))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(missing("package", package_id, "delete_package"));
            }
            Ok(())
        })
        .await
    }
}

// ==================== Availability ====================

#[async_trait]
impl AvailabilityRepository for PostgresRepository {
    async fn list_slots(
        &self,
        tour_id: TourId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<AvailabilitySlot>> {
        self.with_conn(move |conn| {
            let rows = availability_slots::table
                .filter(availability_slots::tour_id.eq(tour_id.0))
                .filter(availability_slots::slot_date.ge(from))
                .filter(availability_slots::slot_date.le(to))
                .order((
                    availability_slots::slot_date.asc(),
                    availability_slots::start_time.asc(),
                ))
                .select(SlotRow::as_select())
                .load::<SlotRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(AvailabilitySlot::from).collect())
        })
        .await
    }

    async fn get_slot(&self, slot_id: SlotId) -> RepositoryResult<AvailabilitySlot> {
        self.with_conn(move |conn| {
            availability_slots::table
                .find(slot_id.0)
                .select(SlotRow::as_select())
                .first::<SlotRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(AvailabilitySlot::from)
                .ok_or_else(|| missing("slot", slot_id, "get_slot"))
        })
        .await
    }

    async fn create_slot(
        &self,
        tour_id: TourId,
        input: &SlotInput,
    ) -> RepositoryResult<AvailabilitySlot> {
        let row = NewSlotRow::new(tour_id, input)?;
        self.with_conn(move |conn| {
            if !tour_exists(conn, tour_id.0)? {
                return Err(missing("tour", tour_id, "create_slot"));
            }
            diesel::insert_into(availability_slots::table)
                .values(&row)
                .returning(SlotRow::as_returning())
                .get_result::<SlotRow>(conn)
                .map(AvailabilitySlot::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_slot"))
        })
        .await
    }

    async fn delete_slot(&self, slot_id: SlotId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let deleted = diesel::delete(availability_slots::table.find(slot_id.0))
                    .execute(tx)
                    .map_err(|e| match map_diesel_error(e) {
                        err if err.is_conflict() => RepositoryError::conflict_with_context(
                            "Slot has bookings and cannot be deleted",
                            ErrorContext::new("delete_slot")
                                .with_entity("slot")
                                .with_entity_id(slot_id),
                        ),
                        err => err,
                    })?;
                if deleted == 0 {
                    return Err(missing("slot", slot_id, "delete_slot"));
                }
                Ok(())
            })
        })
        .await
    }

    async fn reserve_seats(
        &self,
        slot_id: SlotId,
        seats: u32,
    ) -> RepositoryResult<AvailabilitySlot> {
        let seats = i32::try_from(seats)
            .map_err(|_| RepositoryError::validation("Seat count is out of range"))?;
        self.with_conn(move |conn| {
            // Check-and-increment in one statement; the row lock serializes
            // concurrent reservations on the same slot.
            let updated = diesel::update(
                availability_slots::table
                    .find(slot_id.0)
                    .filter(availability_slots::booked.le(availability_slots::capacity - seats)),
            )
            .set(availability_slots::booked.eq(availability_slots::booked + seats))
            .returning(SlotRow::as_returning())
            .get_result::<SlotRow>(conn)
            .optional()
            .map_err(map_diesel_error)?;

            if let Some(row) = updated {
                return Ok(AvailabilitySlot::from(row));
            }

            let current = availability_slots::table
                .find(slot_id.0)
                .select(SlotRow::as_select())
                .first::<SlotRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(AvailabilitySlot::from)
                .ok_or_else(|| missing("slot", slot_id, "reserve_seats"))?;
            Err(RepositoryError::conflict_with_context(
                format!(
                    "Only {} seats left, {} requested",
                    current.remaining(),
                    seats
                ),
                ErrorContext::new("reserve_seats")
                    .with_entity("slot")
                    .with_entity_id(slot_id),
            ))
        })
        .await
    }

    async fn release_seats(
        &self,
        slot_id: SlotId,
        seats: u32,
    ) -> RepositoryResult<AvailabilitySlot> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = availability_slots::table
                    .find(slot_id.0)
                    .select(SlotRow::as_select())
                    .for_update()
                    .first::<SlotRow>(tx)
                    .optional()?
                    .ok_or_else(|| missing("slot", slot_id, "release_seats"))?;
                let released = i32::try_from(seats).unwrap_or(i32::MAX);
                let booked = row.booked.saturating_sub(released).max(0);
                let row: SlotRow = diesel::update(availability_slots::table.find(slot_id.0))
                    .set(availability_slots::booked.eq(booked))
                    .returning(SlotRow::as_returning())
                    .get_result(tx)?;
                Ok(AvailabilitySlot::from(row))
            })
        })
        .await
    }
}

// ==================== Bookings ====================

#[async_trait]
impl BookingRepository for PostgresRepository {
    async fn create_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking> {
        let row = NewBookingRow::new(booking)?;
        let items = booking.items.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let slot_exists: bool = diesel::select(diesel::dsl::exists(
                    availability_slots::table.filter(availability_slots::slot_id.eq(row.slot_id)),
                ))
                .get_result(tx)?;
                if !slot_exists {
                    return Err(missing("slot", row.slot_id, "create_booking"));
                }

                let inserted: BookingRow = diesel::insert_into(bookings::table)
                    .values(&row)
                    .returning(BookingRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("create_booking"))?;

                let item_rows = items
                    .iter()
                    .map(|item| NewBookingItemRow::new(inserted.booking_id, item))
                    .collect::<RepositoryResult<Vec<_>>>()?;
                if !item_rows.is_empty() {
                    diesel::insert_into(booking_items::table)
                        .values(&item_rows)
                        .execute(tx)?;
                }

                let booking_id = inserted.booking_id;
                load_booking(tx, Some(booking_id), None, "create_booking")
            })
        })
        .await
    }

    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking> {
        self.with_conn(move |conn| load_booking(conn, Some(booking_id.0), None, "get_booking"))
            .await
    }

    async fn get_booking_by_token(&self, token: &str) -> RepositoryResult<Booking> {
        let token = token.to_string();
        self.with_conn(move |conn| load_booking(conn, None, Some(&token), "get_booking_by_token"))
            .await
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Vec<Booking>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut query = bookings::table.into_boxed();
            if let Some(status) = filter.status {
                query = query.filter(bookings::status.eq(status.as_str()));
            }
            if let Some(tour_id) = filter.tour_id {
                query = query.filter(bookings::tour_id.eq(tour_id.0));
            }
            if let Some(from) = filter.from {
                query = query.filter(bookings::created_at.ge(day_start(from)));
            }
            if let Some(to) = filter.to {
                let end = day_start(to) + ChronoDuration::days(1);
                query = query.filter(bookings::created_at.lt(end));
            }
            let rows = query
                .order((bookings::created_at.desc(), bookings::booking_id.desc()))
                .select(BookingRow::as_select())
                .load::<BookingRow>(conn)
                .map_err(map_diesel_error)?;
            assemble_bookings(conn, rows)
        })
        .await
    }

    async fn update_booking_status(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking> {
        self.with_conn(move |conn| {
            let updated = diesel::update(bookings::table.find(booking_id.0))
                .set((
                    bookings::status.eq(status.as_str()),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if updated == 0 {
                return Err(missing("booking", booking_id, "update_booking_status"));
            }
            load_booking(conn, Some(booking_id.0), None, "update_booking_status")
        })
        .await
    }

    async fn transition_booking_status(
        &self,
        booking_id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> RepositoryResult<Option<Booking>> {
        self.with_conn(move |conn| {
            let updated = diesel::update(
                bookings::table
                    .filter(bookings::booking_id.eq(booking_id.0))
                    .filter(bookings::status.eq(from.as_str())),
            )
            .set((
                bookings::status.eq(to.as_str()),
                bookings::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(map_diesel_error)?;
            if updated == 0 {
                let exists = bookings::table
                    .find(booking_id.0)
                    .select(bookings::booking_id)
                    .first::<i64>(conn)
                    .optional()
                    .map_err(map_diesel_error)?;
                return match exists {
                    Some(_) => Ok(None),
                    None => Err(missing("booking", booking_id, "transition_booking_status")),
                };
            }
            load_booking(conn, Some(booking_id.0), None, "transition_booking_status").map(Some)
        })
        .await
    }

    async fn set_payment_intent(
        &self,
        booking_id: BookingId,
        payment_intent_id: &str,
    ) -> RepositoryResult<Booking> {
        let intent = payment_intent_id.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(bookings::table.find(booking_id.0))
                .set((
                    bookings::payment_intent_id.eq(Some(intent.as_str())),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if updated == 0 {
                return Err(missing("booking", booking_id, "set_payment_intent"));
            }
            load_booking(conn, Some(booking_id.0), None, "set_payment_intent")
        })
        .await
    }

    async fn update_booking_notes(
        &self,
        booking_id: BookingId,
        notes: Option<String>,
    ) -> RepositoryResult<Booking> {
        self.with_conn(move |conn| {
            let updated = diesel::update(bookings::table.find(booking_id.0))
                .set((
                    bookings::notes.eq(notes.as_deref()),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if updated == 0 {
                return Err(missing("booking", booking_id, "update_booking_notes"));
            }
            load_booking(conn, Some(booking_id.0), None, "update_booking_notes")
        })
        .await
    }
}

// ==================== Content ====================

#[async_trait]
impl ContentRepository for PostgresRepository {
    async fn list_pages(&self) -> RepositoryResult<Vec<StaticPage>> {
        self.with_conn(|conn| {
            static_pages::table
                .order(static_pages::page_id.asc())
                .select(PageRow::as_select())
                .load::<PageRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(PageRow::into_page)
                .collect()
        })
        .await
    }

    async fn get_page(&self, page_id: PageId) -> RepositoryResult<StaticPage> {
        self.with_conn(move |conn| {
            static_pages::table
                .find(page_id.0)
                .select(PageRow::as_select())
                .first::<PageRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("page", page_id, "get_page"))?
                .into_page()
        })
        .await
    }

    async fn get_page_by_slug(&self, slug: &str) -> RepositoryResult<StaticPage> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            static_pages::table
                .filter(static_pages::slug.eq(&slug))
                .select(PageRow::as_select())
                .first::<PageRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("page", &slug, "get_page_by_slug"))?
                .into_page()
        })
        .await
    }

    async fn create_page(&self, input: &PageInput) -> RepositoryResult<StaticPage> {
        let changes = PageChanges::from_input(input)?;
        self.with_conn(move |conn| {
            diesel::insert_into(static_pages::table)
                .values(&changes)
                .returning(PageRow::as_returning())
                .get_result::<PageRow>(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_page"))?
                .into_page()
        })
        .await
    }

    async fn update_page(&self, page_id: PageId, input: &PageInput) -> RepositoryResult<StaticPage> {
        let changes = PageChanges::from_input(input)?;
        self.with_conn(move |conn| {
            diesel::update(static_pages::table.find(page_id.0))
                .set(&changes)
                .returning(PageRow::as_returning())
                .get_result::<PageRow>(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_page"))?
                .ok_or_else(|| missing("page", page_id, "update_page"))?
                .into_page()
        })
        .await
    }

    async fn delete_page(&self, page_id: PageId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(static_pages::table.find(page_id.0))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(missing("page", page_id, "delete_page"));
            }
            Ok(())
        })
        .await
    }

    async fn upsert_page_translation(
        &self,
        page_id: PageId,
        language: Language,
        content: &PageContent,
    ) -> RepositoryResult<StaticPage> {
        let content = content.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let mut page = static_pages::table
                    .find(page_id.0)
                    .select(PageRow::as_select())
                    .for_update()
                    .first::<PageRow>(tx)
                    .optional()?
                    .ok_or_else(|| missing("page", page_id, "upsert_page_translation"))?
                    .into_page()?;
                page.translations.insert(language, content);
                diesel::update(static_pages::table.find(page_id.0))
                    .set((
                        static_pages::translations.eq(models::to_json(&page.translations)?),
                        static_pages::updated_at.eq(Utc::now()),
                    ))
                    .returning(PageRow::as_returning())
                    .get_result::<PageRow>(tx)?
                    .into_page()
            })
        })
        .await
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        self.with_conn(|conn| {
            let rows = categories::table
                .order((categories::position.asc(), categories::category_id.asc()))
                .select(CategoryRow::as_select())
                .load::<CategoryRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Category::from).collect())
        })
        .await
    }

    async fn create_category(&self, input: &CategoryInput) -> RepositoryResult<Category> {
        let input = input.clone();
        self.with_conn(move |conn| {
            diesel::insert_into(categories::table)
                .values(CategoryChanges {
                    slug: &input.slug,
                    name: &input.name,
                    position: input.position,
                })
                .returning(CategoryRow::as_returning())
                .get_result::<CategoryRow>(conn)
                .map(Category::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_category"))
        })
        .await
    }

    async fn update_category(
        &self,
        category_id: CategoryId,
        input: &CategoryInput,
    ) -> RepositoryResult<Category> {
        let input = input.clone();
        self.with_conn(move |conn| {
            diesel::update(categories::table.find(category_id.0))
                .set(CategoryChanges {
                    slug: &input.slug,
                    name: &input.name,
                    position: input.position,
                })
                .returning(CategoryRow::as_returning())
                .get_result::<CategoryRow>(conn)
                .optional()
                .map_err(|e| map_diesel_error(e).with_operation("update_category"))?
                .map(Category::from)
                .ok_or_else(|| missing("category", category_id, "update_category"))
        })
        .await
    }

    async fn delete_category(&self, category_id: CategoryId) -> RepositoryResult<()> {
        // Tours referencing the category fall back to NULL via the foreign key.
        self.with_conn(move |conn| {
            let deleted = diesel::delete(categories::table.find(category_id.0))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(missing("category", category_id, "delete_category"));
            }
            Ok(())
        })
        .await
    }

    async fn list_labels(&self) -> RepositoryResult<Vec<SpecialLabel>> {
        self.with_conn(|conn| {
            let rows = special_labels::table
                .order(special_labels::label_id.asc())
                .select(LabelRow::as_select())
                .load::<LabelRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(SpecialLabel::from).collect())
        })
        .await
    }

    async fn create_label(&self, input: &LabelInput) -> RepositoryResult<SpecialLabel> {
        let input = input.clone();
        self.with_conn(move |conn| {
            diesel::insert_into(special_labels::table)
                .values(LabelChanges {
                    name: &input.name,
                    color: &input.color,
                })
                .returning(LabelRow::as_returning())
                .get_result::<LabelRow>(conn)
                .map(SpecialLabel::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_label(
        &self,
        label_id: LabelId,
        input: &LabelInput,
    ) -> RepositoryResult<SpecialLabel> {
        let input = input.clone();
        self.with_conn(move |conn| {
            diesel::update(special_labels::table.find(label_id.0))
                .set(LabelChanges {
                    name: &input.name,
                    color: &input.color,
                })
                .returning(LabelRow::as_returning())
                .get_result::<LabelRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(SpecialLabel::from)
                .ok_or_else(|| missing("label", label_id, "update_label"))
        })
        .await
    }

    async fn delete_label(&self, label_id: LabelId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                sql_query("UPDATE tours SET label_ids = array_remove(label_ids, $1)")
                    .bind::<BigInt, _>(label_id.0)
                    .execute(tx)?;
                let deleted = diesel::delete(special_labels::table.find(label_id.0)).execute(tx)?;
                if deleted == 0 {
                    return Err(missing("label", label_id, "delete_label"));
                }
                Ok(())
            })
        })
        .await
    }
}

// ==================== Analytics ====================

#[async_trait]
impl AnalyticsRepository for PostgresRepository {
    async fn record_visit(&self, visit: &NewPageVisit) -> RepositoryResult<PageVisit> {
        let visit = visit.clone();
        self.with_conn(move |conn| {
            diesel::insert_into(page_visits::table)
                .values(NewVisitRow {
                    path: &visit.path,
                    tour_id: visit.tour_id.map(|t| t.0),
                    session_id: &visit.session_id,
                    language: visit.language.code(),
                    referrer: visit.referrer.as_deref(),
                    visited_at: visit.visited_at,
                })
                .returning(VisitRow::as_returning())
                .get_result::<VisitRow>(conn)
                .map_err(map_diesel_error)?
                .into_visit()
        })
        .await
    }

    async fn list_visits(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<PageVisit>> {
        self.with_conn(move |conn| {
            page_visits::table
                .filter(page_visits::visited_at.ge(from))
                .filter(page_visits::visited_at.lt(to))
                .order((page_visits::visited_at.asc(), page_visits::visit_id.asc()))
                .select(VisitRow::as_select())
                .load::<VisitRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(VisitRow::into_visit)
                .collect()
        })
        .await
    }
}

// ==================== Users ====================

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn get_user(&self, user_id: &str) -> RepositoryResult<Option<UserProfile>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            user_profiles::table
                .find(&user_id)
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(UserRow::into_profile)
                .transpose()
        })
        .await
    }

    async fn upsert_user(&self, profile: &UserProfile) -> RepositoryResult<UserProfile> {
        let row = UserRow::from(profile);
        self.with_conn(move |conn| {
            diesel::insert_into(user_profiles::table)
                .values(&row)
                .on_conflict(user_profiles::user_id)
                .do_update()
                .set(&row)
                .returning(UserRow::as_returning())
                .get_result::<UserRow>(conn)
                .map_err(map_diesel_error)?
                .into_profile()
        })
        .await
    }
}
