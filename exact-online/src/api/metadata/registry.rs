//! Registry of compiled entity metadata
//!
//! Owned by the application root and passed by reference. Reads after the
//! first compile are lock-free.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{debug, warn};
use sha2::{Digest, Sha256};

use super::models::{EntityDescriptor, EntityMetadata};
use crate::api::cache::Cache;
use crate::api::constants::METADATA_CACHE_PREFIX;
use crate::api::errors::{Error, Result};

pub struct MetadataRegistry {
    descriptors: HashMap<String, EntityDescriptor>,
    compiled: ArcSwap<HashMap<String, Arc<EntityMetadata>>>,
    cache: Option<Arc<dyn Cache>>,
}

impl MetadataRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
            compiled: ArcSwap::from_pointee(HashMap::new()),
            cache: None,
        }
    }

    /// A registry preloaded with the crate's built-in schemas
    pub fn with_builtin_schemas() -> Self {
        crate::schemas::all()
            .into_iter()
            .fold(Self::new(), Self::register)
    }

    /// Persist compiled metadata in an external cache
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Add or replace a descriptor; done while building, before sharing
    pub fn register(mut self, descriptor: EntityDescriptor) -> Self {
        self.descriptors.insert(descriptor.tag.clone(), descriptor);
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.descriptors.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    /// Compiled metadata for `tag`, compiling on first use
    pub fn metadata(&self, tag: &str) -> Result<Arc<EntityMetadata>> {
        if let Some(metadata) = self.compiled.load().get(tag) {
            return Ok(Arc::clone(metadata));
        }

        let descriptor = self
            .descriptors
            .get(tag)
            .ok_or_else(|| Error::UnknownEntity(tag.to_string()))?;

        let key = Self::cache_key(descriptor);
        let metadata = match key.as_deref().and_then(|key| self.load_cached(key, tag)) {
            Some(metadata) => metadata,
            None => {
                let metadata = EntityMetadata::compile(descriptor)?;
                debug!("Compiled metadata for {} ({} fields)", tag, metadata.fields().len());
                if let Some(key) = &key {
                    self.store_cached(key, &metadata);
                }
                metadata
            }
        };

        // A concurrent first compile may have won; keep whichever landed first
        let metadata = Arc::new(metadata);
        self.compiled.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.entry(tag.to_string())
                .or_insert_with(|| Arc::clone(&metadata));
            next
        });
        Ok(self
            .compiled
            .load()
            .get(tag)
            .map(Arc::clone)
            .unwrap_or(metadata))
    }

    /// `<prefix>.<crate version>.<tag>.<descriptor fingerprint>`
    ///
    /// The fingerprint changes with any edit to the descriptor, so a table
    /// compiled from an older shape is never served.
    fn cache_key(descriptor: &EntityDescriptor) -> Option<String> {
        let shape = match serde_json::to_vec(descriptor) {
            Ok(shape) => shape,
            Err(e) => {
                warn!("Not caching metadata for {}: {}", descriptor.tag, e);
                return None;
            }
        };
        let digest = Sha256::digest(&shape);
        Some(format!(
            "{}.{}.{}.{}",
            METADATA_CACHE_PREFIX,
            env!("CARGO_PKG_VERSION"),
            descriptor.tag,
            hex::encode(&digest[..8])
        ))
    }

    fn load_cached(&self, key: &str, tag: &str) -> Option<EntityMetadata> {
        let raw = self.cache.as_ref()?.get(key)?;
        match serde_json::from_str::<EntityMetadata>(&raw) {
            Ok(metadata) if metadata.tag() == tag => {
                debug!("Loaded metadata for {} from cache", tag);
                Some(metadata)
            }
            Ok(_) | Err(_) => {
                warn!("Ignoring unreadable cached metadata for {}", tag);
                None
            }
        }
    }

    fn store_cached(&self, key: &str, metadata: &EntityMetadata) {
        let Some(cache) = &self.cache else {
            return;
        };
        match serde_json::to_string(metadata) {
            Ok(raw) => cache.set(key, raw),
            Err(e) => warn!("Failed to serialize metadata for {}: {}", metadata.tag(), e),
        }
    }
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRegistry")
            .field("descriptors", &self.descriptors.len())
            .field("compiled", &self.compiled.load().len())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
