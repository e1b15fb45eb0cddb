//! The provider registry.
//!
//! Plugins are stateless: a provider type's [`Extractor`]/[`FocusMapper`]/
//! [`SourceDescriptor`] hold no per-instance configuration of their own,
//! reading whatever they need from the [`focus_core::provider_entity::ProviderEntity`]
//! and [`crate::auth_resolver::ResolvedAuth`] passed in at call time. This is
//! the Rust counterpart of the source repo's class-registry-plus-decorator
//! pattern: one explicit `register` call per plugin at process init, rather
//! than import-time side effects populating a hidden global dict.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use focus_core::error::{Error, Result};

use crate::metadata::ProviderMetadata;
use crate::traits::{Extractor, FocusMapper, SourceDescriptor};

struct ProviderEntry {
    metadata: ProviderMetadata,
    source: Arc<dyn SourceDescriptor>,
    extractor: Arc<dyn Extractor>,
    mapper: Arc<dyn FocusMapper>,
}

/// Maps a provider type tag (`"openai"`, `"aws"`, ...) to the bound plugin
/// implementing it. Registration is explicit and happens once per process,
/// typically from each provider crate's own init function called at
/// `focus-cli` startup.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: RwLock<HashMap<String, ProviderEntry>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Registers a provider type's plugin trio under `metadata.type_tag`.
    ///
    /// Idempotent: registering the same tag again (a plugin crate's init
    /// function running twice, or two call sites registering the same
    /// built-in) replaces the prior entry rather than erroring, since
    /// ordering across plugin crates' init functions is not guaranteed.
    pub fn register(
        &self,
        metadata: ProviderMetadata,
        source: Arc<dyn SourceDescriptor>,
        extractor: Arc<dyn Extractor>,
        mapper: Arc<dyn FocusMapper>,
    ) {
        let tag = metadata.type_tag.clone();
        let mut entries = self.entries.write().expect("provider registry lock poisoned");
        if entries.contains_key(&tag) {
            tracing::debug!(target: TRACING_TARGET, type_tag = %tag, "replacing already-registered provider type");
        }
        entries.insert(tag, ProviderEntry { metadata, source, extractor, mapper });
    }

    /// Returns the registered type tags, sorted for deterministic output.
    pub fn type_tags(&self) -> Vec<String> {
        let entries = self.entries.read().expect("provider registry lock poisoned");
        let mut tags: Vec<String> = entries.keys().cloned().collect();
        tags.sort();
        tags
    }

    pub fn get_metadata(&self, type_tag: &str) -> Result<ProviderMetadata> {
        let entries = self.entries.read().expect("provider registry lock poisoned");
        entries
            .get(type_tag)
            .map(|entry| entry.metadata.clone())
            .ok_or_else(|| Error::provider_not_found(type_tag))
    }

    pub fn list_metadata(&self) -> Vec<ProviderMetadata> {
        let entries = self.entries.read().expect("provider registry lock poisoned");
        let mut list: Vec<ProviderMetadata> = entries.values().map(|entry| entry.metadata.clone()).collect();
        list.sort_by(|a, b| a.type_tag.cmp(&b.type_tag));
        list
    }

    pub fn new_source(&self, type_tag: &str) -> Result<Arc<dyn SourceDescriptor>> {
        let entries = self.entries.read().expect("provider registry lock poisoned");
        entries
            .get(type_tag)
            .map(|entry| entry.source.clone())
            .ok_or_else(|| Error::provider_not_found(type_tag))
    }

    pub fn new_extractor(&self, type_tag: &str) -> Result<Arc<dyn Extractor>> {
        let entries = self.entries.read().expect("provider registry lock poisoned");
        entries
            .get(type_tag)
            .map(|entry| entry.extractor.clone())
            .ok_or_else(|| Error::provider_not_found(type_tag))
    }

    pub fn new_mapper(&self, type_tag: &str) -> Result<Arc<dyn FocusMapper>> {
        let entries = self.entries.read().expect("provider registry lock poisoned");
        entries
            .get(type_tag)
            .map(|entry| entry.mapper.clone())
            .ok_or_else(|| Error::provider_not_found(type_tag))
    }
}

const TRACING_TARGET: &str = "focus_registry::registry";

static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();

/// The process-wide registry. `focus-cli` and provider plugin crates call
/// [`ProviderRegistry::register`] against this instance at startup; the
/// pipeline coordinator looks providers up here by tag at run time.
pub fn global() -> &'static ProviderRegistry {
    GLOBAL.get_or_init(ProviderRegistry::new)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use focus_core::auth::AuthMethod;
    use focus_core::provider_entity::ProviderEntity;

    use crate::source::SourceSpec;
    use crate::traits::{ExtractContext, ExtractedBatch};

    use super::*;

    struct NoopSource;
    impl SourceDescriptor for NoopSource {
        fn describe(&self, _provider: &ProviderEntity) -> Result<Vec<SourceSpec>> {
            Ok(vec![])
        }
    }

    struct NoopExtractor;
    #[async_trait]
    impl Extractor for NoopExtractor {
        async fn extract(&self, _ctx: &ExtractContext<'_>, _source: &SourceSpec) -> Result<Vec<ExtractedBatch>> {
            Ok(vec![])
        }
    }

    struct NoopMapper;
    #[async_trait]
    impl FocusMapper for NoopMapper {
        fn build_record(
            &self,
            _raw: &serde_json::Value,
            _provider_id: uuid::Uuid,
            _raw_blob_id: uuid::Uuid,
            _mapped_at: jiff::Timestamp,
        ) -> Result<focus_core::focus::FocusRecord> {
            Err(Error::internal_bug("noop mapper never builds a record"))
        }
    }

    fn sample_metadata(tag: &str) -> ProviderMetadata {
        ProviderMetadata {
            type_tag: tag.into(),
            display_name: tag.into(),
            description: String::new(),
            supported_auth_methods: vec![AuthMethod::ApiKey],
            default_auth_method: AuthMethod::ApiKey,
            default_source_type: "rest_api".into(),
            required_config: vec![],
            optional_config: vec![],
            fields: vec![],
        }
    }

    #[test]
    fn test_register_then_lookup_round_trips() {
        let registry = ProviderRegistry::new();
        registry.register(sample_metadata("openai"), Arc::new(NoopSource), Arc::new(NoopExtractor), Arc::new(NoopMapper));

        assert_eq!(registry.type_tags(), vec!["openai".to_string()]);
        assert!(registry.get_metadata("openai").is_ok());
        assert!(registry.new_extractor("openai").is_ok());
        assert!(registry.new_mapper("openai").is_ok());
        assert!(registry.new_source("openai").is_ok());
    }

    #[test]
    fn test_unknown_type_tag_is_provider_not_found() {
        let registry = ProviderRegistry::new();
        let err = registry.get_metadata("does-not-exist").unwrap_err();
        assert_eq!(err.kind, focus_core::error::ErrorKind::ProviderNotFound);
    }

    #[test]
    fn test_re_registering_same_tag_replaces_entry() {
        let registry = ProviderRegistry::new();
        registry.register(sample_metadata("aws"), Arc::new(NoopSource), Arc::new(NoopExtractor), Arc::new(NoopMapper));
        registry.register(sample_metadata("aws"), Arc::new(NoopSource), Arc::new(NoopExtractor), Arc::new(NoopMapper));
        assert_eq!(registry.type_tags(), vec!["aws".to_string()]);
    }
}
