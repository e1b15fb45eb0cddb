// @generated manually; kept in sync with migrations/2024-01-01-000000_init.

pub mod sql_types {
    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "run_status"))]
    pub struct RunStatus;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "run_type"))]
    pub struct RunType;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "stage_name"))]
    pub struct StageName;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "last_sync_status"))]
    pub struct LastSyncStatus;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "service_category"))]
    pub struct ServiceCategory;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "charge_category"))]
    pub struct ChargeCategory;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "charge_class"))]
    pub struct ChargeClass;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "commitment_discount_status"))]
    pub struct CommitmentDiscountStatus;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "charge_frequency"))]
    pub struct ChargeFrequency;
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::LastSyncStatus;

    providers (id) {
        id -> Uuid,
        name -> Text,
        type_tag -> Text,
        display_name -> Text,
        endpoint -> Nullable<Text>,
        params -> Jsonb,
        additional_config -> Jsonb,
        auth -> Jsonb,
        active -> Bool,
        validated -> Bool,
        last_synced_at -> Nullable<Timestamptz>,
        last_sync_status -> LastSyncStatus,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::{RunStatus, RunType, StageName};

    pipeline_runs (id) {
        id -> Uuid,
        provider_id -> Uuid,
        run_type -> RunType,
        status -> RunStatus,
        window_start -> Timestamptz,
        window_end -> Timestamptz,
        last_completed_stage -> Nullable<StageName>,
        records_extracted -> Int8,
        records_transformed -> Int8,
        records_loaded -> Int8,
        records_failed -> Int8,
        retry_of -> Nullable<Uuid>,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
        error_message -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    raw_billing_data (id) {
        id -> Uuid,
        provider_id -> Uuid,
        run_id -> Uuid,
        source_name -> Text,
        source_type -> Text,
        window_start -> Timestamptz,
        window_end -> Timestamptz,
        payload -> Jsonb,
        record_count -> Int4,
        captured_at -> Timestamptz,
        processed -> Bool,
        processed_at -> Nullable<Timestamptz>,
        error -> Nullable<Text>,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::{ServiceCategory, ChargeCategory, ChargeClass, CommitmentDiscountStatus, ChargeFrequency};

    billing_data (id) {
        id -> Uuid,

        billed_cost -> Numeric,
        effective_cost -> Numeric,
        list_cost -> Numeric,
        contracted_cost -> Numeric,

        billing_account_id -> Text,
        billing_account_name -> Text,
        billing_account_type -> Text,
        sub_account_id -> Nullable<Text>,
        sub_account_name -> Nullable<Text>,
        sub_account_type -> Nullable<Text>,

        billing_period_start -> Timestamptz,
        billing_period_end -> Timestamptz,
        charge_period_start -> Timestamptz,
        charge_period_end -> Timestamptz,

        billing_currency -> Text,
        pricing_currency -> Nullable<Text>,

        service_name -> Text,
        service_category -> ServiceCategory,
        service_subcategory -> Nullable<Text>,
        provider_name -> Text,
        publisher_name -> Text,
        invoice_issuer_name -> Text,

        charge_category -> ChargeCategory,
        charge_description -> Text,
        charge_class -> Nullable<ChargeClass>,
        charge_frequency -> Nullable<ChargeFrequency>,
        pricing_quantity -> Nullable<Numeric>,
        pricing_unit -> Nullable<Text>,

        resource_id -> Nullable<Text>,
        resource_name -> Nullable<Text>,
        resource_type -> Nullable<Text>,

        region_id -> Nullable<Text>,
        region_name -> Nullable<Text>,
        availability_zone -> Nullable<Text>,

        sku_id -> Nullable<Text>,
        sku_price_id -> Nullable<Text>,
        sku_meter -> Nullable<Text>,
        sku_price_details -> Nullable<Jsonb>,
        list_unit_price -> Nullable<Numeric>,
        contracted_unit_price -> Nullable<Numeric>,

        commitment_discount_id -> Nullable<Text>,
        commitment_discount_type -> Nullable<Text>,
        commitment_discount_category -> Nullable<Text>,
        commitment_discount_name -> Nullable<Text>,
        commitment_discount_status -> Nullable<CommitmentDiscountStatus>,
        commitment_discount_quantity -> Nullable<Numeric>,
        commitment_discount_unit -> Nullable<Text>,

        consumed_quantity -> Nullable<Numeric>,
        consumed_unit -> Nullable<Text>,

        tags -> Jsonb,

        x_provider_id -> Uuid,
        x_provider_data -> Jsonb,
        x_raw_billing_data_id -> Uuid,
        x_created_at -> Timestamptz,
        x_updated_at -> Timestamptz,

        /// Generated column (`coalesce(sku_id, '')`), used together with
        /// `id` as the `ON CONFLICT` target for the merge-key unique index;
        /// never set directly by this crate.
        merge_sku_key -> Text,
    }
}

diesel::joinable!(pipeline_runs -> providers (provider_id));
diesel::joinable!(raw_billing_data -> providers (provider_id));
diesel::joinable!(raw_billing_data -> pipeline_runs (run_id));
diesel::joinable!(billing_data -> providers (x_provider_id));

diesel::allow_tables_to_appear_in_same_query!(providers, pipeline_runs, raw_billing_data, billing_data,);
