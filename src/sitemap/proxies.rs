//! Proxy injection stage
//!
//! Holds declared proxy configurations and appends one proxy resource per
//! declaration on every recompute. Self-proxies are rejected when the
//! descriptor is created; missing or chained targets surface at resolution
//! time via [`crate::sitemap::Store::resolve_target`].

use std::sync::{Mutex, PoisonError};

use crate::error::{SitemillError, SitemillResult};
use crate::sitemap::resource::{addressable, Metadata, Resource};
use crate::sitemap::store::Manipulator;

/// One declared proxy: a new path whose content comes from `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyDescriptor {
    path: String,
    target: String,
    metadata: Metadata,
}

impl ProxyDescriptor {
    pub fn new(path: &str, target: &str, metadata: Metadata) -> SitemillResult<Self> {
        let path = addressable(path);
        let target = addressable(target);
        if path == target {
            return Err(SitemillError::SelfProxy { path });
        }
        Ok(Self {
            path,
            target,
            metadata,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn to_resource(&self) -> Resource {
        let mut resource = Resource::proxy_validated(&self.path, &self.target);
        resource.add_metadata(&self.metadata);
        resource
    }
}

/// The set of declared proxies, shared between the declaring surface and
/// the registered manipulator.
#[derive(Default)]
pub struct Proxies {
    configs: Mutex<Vec<ProxyDescriptor>>,
}

impl Proxies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a proxy. The caller is responsible for invalidating the
    /// store afterwards.
    pub fn add(&self, descriptor: ProxyDescriptor) {
        self.configs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.configs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Manipulator for Proxies {
    fn manipulate(&self, mut resources: Vec<Resource>) -> Vec<Resource> {
        let configs = self.configs.lock().unwrap_or_else(PoisonError::into_inner);
        for config in configs.iter() {
            resources.push(config.to_resource());
        }
        resources
    }
}
