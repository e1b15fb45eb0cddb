//! Postgres implementation of [`StoragePort`]: a `deadpool`-managed
//! `diesel-async` connection pool with one `async_trait` impl block per
//! stored aggregate.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool::managed::{Object, Pool};
use diesel::prelude::*;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use jiff::Timestamp as JiffTimestamp;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use focus_core::focus::FocusRecord;
use focus_core::provider_entity::ProviderEntity;
use focus_core::raw_blob::RawBlob;
use focus_core::run::Run;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::{BillingDataRow, NewBillingData, NewPipelineRun, NewProvider, NewRawBlob, PipelineRunRow, Provider, RawBlobRow, UpdatePipelineRun, UpdateRawBlob};
use crate::port::{StoragePort, UpsertOutcome};
use crate::schema;

pub(crate) const MIGRATIONS: diesel_migrations::EmbeddedMigrations = diesel_migrations::embed_migrations!();

/// Connection pool type alias.
pub type ConnectionPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type PooledConnection = Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Postgres-backed [`StoragePort`]. Cheap to clone; the pool is reference-counted.
#[derive(Clone)]
pub struct PostgresStore {
    inner: Arc<Inner>,
}

struct Inner {
    pool: ConnectionPool,
    batch_size: usize,
}

impl PostgresStore {
    /// Builds a connection pool from `config` without touching the network.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate().map_err(|e| StoreError::Config(e.to_string()))?;

        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections as usize)
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        Ok(Self { inner: Arc::new(Inner { pool, batch_size: config.batch_size }) })
    }

    /// Runs embedded migrations synchronously against a blocking connection.
    /// Intended for `focus-cli`'s setup path, not the async hot path.
    pub fn run_pending_migrations(database_url: &str) -> Result<()> {
        use diesel::Connection;
        use diesel_migrations::MigrationHarness;

        let mut conn = diesel::pg::PgConnection::establish(database_url)
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e))?;
        Ok(())
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch_size
    }

    async fn conn(&self) -> Result<PooledConnection> {
        self.inner.pool.get().await.map_err(StoreError::from)
    }
}

#[async_trait]
impl StoragePort for PostgresStore {
    async fn save_raw_blob(&self, blob: &RawBlob) -> Result<()> {
        use schema::raw_billing_data;

        let mut conn = self.conn().await?;
        diesel::insert_into(raw_billing_data::table)
            .values(NewRawBlob::from(blob))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn mark_processed(&self, blob_id: Uuid, outcome: std::result::Result<JiffTimestamp, String>) -> Result<()> {
        use schema::raw_billing_data::dsl;

        let update = match outcome {
            Ok(at) => UpdateRawBlob::mark_processed(at),
            Err(message) => UpdateRawBlob::mark_failed(message),
        };

        let mut conn = self.conn().await?;
        diesel::update(dsl::raw_billing_data.filter(dsl::id.eq(blob_id)))
            .set(update)
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn get_unprocessed_raw_blobs(&self, run_id: Uuid) -> Result<Vec<RawBlob>> {
        use schema::raw_billing_data::dsl;

        let mut conn = self.conn().await?;
        let rows: Vec<RawBlobRow> = dsl::raw_billing_data
            .filter(dsl::run_id.eq(run_id))
            .filter(dsl::processed.eq(false))
            .select(RawBlobRow::as_select())
            .load(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(rows.into_iter().map(RawBlob::from).collect())
    }

    async fn upsert_focus(&self, records: &[FocusRecord]) -> Result<UpsertOutcome> {
        use schema::billing_data;
        use schema::billing_data::dsl;

        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut conn = self.conn().await?;
        let new_rows: Vec<NewBillingData> = records.iter().map(NewBillingData::from).collect();

        let mut outcome = UpsertOutcome::default();
        for chunk in new_rows.chunks(self.inner.batch_size) {
            // `x_max(xmax::text::bigint, 0) = 0` distinguishes a freshly
            // inserted row (xmax 0) from one the ON CONFLICT arm rewrote, so
            // a single batched upsert can still report inserted vs merged.
            let rows: Vec<(Uuid, bool)> = diesel::insert_into(billing_data::table)
                .values(chunk)
                .on_conflict((
                    dsl::x_provider_id,
                    dsl::charge_period_start,
                    dsl::charge_period_end,
                    dsl::merge_sku_key,
                    dsl::id,
                ))
                .do_update()
                .set(billing_data_excluded_changeset())
                .returning((dsl::id, diesel::dsl::sql::<diesel::sql_types::Bool>("(xmax = 0)")))
                .get_results(&mut conn)
                .await
                .map_err(StoreError::from)?;

            for (_, was_insert) in rows {
                if was_insert {
                    outcome.inserted += 1;
                } else {
                    outcome.merged += 1;
                }
            }
        }
        Ok(outcome)
    }

    async fn create_run(&self, run: &Run) -> Result<Run> {
        use schema::pipeline_runs;

        let mut conn = self.conn().await?;
        let row: PipelineRunRow = diesel::insert_into(pipeline_runs::table)
            .values(NewPipelineRun::from(run))
            .returning(PipelineRunRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(row.into())
    }

    async fn update_run(&self, run: &Run) -> Result<Run> {
        use schema::pipeline_runs::dsl;

        let update = UpdatePipelineRun {
            status: Some(run.status.into()),
            last_completed_stage: Some(run.last_completed_stage.map(Into::into)),
            records_extracted: Some(run.counters.records_extracted as i64),
            records_transformed: Some(run.counters.records_transformed as i64),
            records_loaded: Some(run.counters.records_loaded as i64),
            records_failed: Some(run.counters.records_failed as i64),
            started_at: Some(run.started_at.map(Timestamp::from)),
            completed_at: Some(run.completed_at.map(Timestamp::from)),
            error_message: Some(run.error_message.clone()),
        };

        let mut conn = self.conn().await?;
        let row: PipelineRunRow = diesel::update(dsl::pipeline_runs.filter(dsl::id.eq(run.id)))
            .set(update)
            .returning(PipelineRunRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(row.into())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>> {
        use schema::pipeline_runs::dsl;

        let mut conn = self.conn().await?;
        let row: Option<PipelineRunRow> = dsl::pipeline_runs
            .filter(dsl::id.eq(run_id))
            .select(PipelineRunRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(StoreError::from)?;
        Ok(row.map(Into::into))
    }

    async fn list_runs(&self, provider_id: Uuid, limit: i64) -> Result<Vec<Run>> {
        use schema::pipeline_runs::dsl;

        let mut conn = self.conn().await?;
        let rows: Vec<PipelineRunRow> = dsl::pipeline_runs
            .filter(dsl::provider_id.eq(provider_id))
            .order(dsl::created_at.desc())
            .limit(limit)
            .select(PipelineRunRow::as_select())
            .load(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<ProviderEntity>> {
        use schema::providers::dsl;

        let mut conn = self.conn().await?;
        let row: Option<Provider> = dsl::providers
            .filter(dsl::id.eq(provider_id))
            .select(Provider::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(StoreError::from)?;
        Ok(row.map(Into::into))
    }

    async fn create_provider(&self, provider: &ProviderEntity) -> Result<ProviderEntity> {
        use schema::providers;

        let mut conn = self.conn().await?;
        let row: Provider = diesel::insert_into(providers::table)
            .values(NewProvider::from(provider))
            .returning(Provider::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(row.into())
    }

    async fn list_active_providers(&self) -> Result<Vec<ProviderEntity>> {
        use schema::providers::dsl;

        let mut conn = self.conn().await?;
        let rows: Vec<Provider> = dsl::providers
            .filter(dsl::active.eq(true))
            .select(Provider::as_select())
            .load(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// The `ON CONFLICT ... DO UPDATE SET col = excluded.col` changeset applied
/// to every row in a batched insert: each conflicting row is overwritten
/// with its own incoming values (`excluded.*` refers per-row to the values
/// that row tried to insert), not a value shared across the whole batch.
fn billing_data_excluded_changeset() -> impl AsChangeset<Target = schema::billing_data::table> {
    use diesel::upsert::excluded;
    use schema::billing_data::dsl::*;

    (
        billed_cost.eq(excluded(billed_cost)),
        effective_cost.eq(excluded(effective_cost)),
        list_cost.eq(excluded(list_cost)),
        contracted_cost.eq(excluded(contracted_cost)),
        billing_account_id.eq(excluded(billing_account_id)),
        billing_account_name.eq(excluded(billing_account_name)),
        billing_account_type.eq(excluded(billing_account_type)),
        sub_account_id.eq(excluded(sub_account_id)),
        sub_account_name.eq(excluded(sub_account_name)),
        sub_account_type.eq(excluded(sub_account_type)),
        billing_period_start.eq(excluded(billing_period_start)),
        billing_period_end.eq(excluded(billing_period_end)),
        billing_currency.eq(excluded(billing_currency)),
        pricing_currency.eq(excluded(pricing_currency)),
        service_name.eq(excluded(service_name)),
        service_category.eq(excluded(service_category)),
        service_subcategory.eq(excluded(service_subcategory)),
        provider_name.eq(excluded(provider_name)),
        publisher_name.eq(excluded(publisher_name)),
        invoice_issuer_name.eq(excluded(invoice_issuer_name)),
        charge_category.eq(excluded(charge_category)),
        charge_description.eq(excluded(charge_description)),
        charge_class.eq(excluded(charge_class)),
        charge_frequency.eq(excluded(charge_frequency)),
        pricing_quantity.eq(excluded(pricing_quantity)),
        pricing_unit.eq(excluded(pricing_unit)),
        resource_id.eq(excluded(resource_id)),
        resource_name.eq(excluded(resource_name)),
        resource_type.eq(excluded(resource_type)),
        region_id.eq(excluded(region_id)),
        region_name.eq(excluded(region_name)),
        availability_zone.eq(excluded(availability_zone)),
        sku_price_id.eq(excluded(sku_price_id)),
        sku_meter.eq(excluded(sku_meter)),
        sku_price_details.eq(excluded(sku_price_details)),
        list_unit_price.eq(excluded(list_unit_price)),
        contracted_unit_price.eq(excluded(contracted_unit_price)),
        commitment_discount_id.eq(excluded(commitment_discount_id)),
        commitment_discount_type.eq(excluded(commitment_discount_type)),
        commitment_discount_category.eq(excluded(commitment_discount_category)),
        commitment_discount_name.eq(excluded(commitment_discount_name)),
        commitment_discount_status.eq(excluded(commitment_discount_status)),
        commitment_discount_quantity.eq(excluded(commitment_discount_quantity)),
        commitment_discount_unit.eq(excluded(commitment_discount_unit)),
        consumed_quantity.eq(excluded(consumed_quantity)),
        consumed_unit.eq(excluded(consumed_unit)),
        tags.eq(excluded(tags)),
        x_provider_data.eq(excluded(x_provider_data)),
        x_raw_billing_data_id.eq(excluded(x_raw_billing_data_id)),
        x_updated_at.eq(excluded(x_updated_at)),
    )
}
