//! The resource pipeline: store, resources, and transform stages
//!
//! The [`Store`] folds registered [`Manipulator`]s over an empty list to
//! derive the authoritative set of [`Resource`]s, on demand and exactly
//! once per effective change.

mod on_disk;
mod proxies;
mod resource;
mod store;

pub use on_disk::OnDisk;
pub use proxies::{Proxies, ProxyDescriptor};
pub use resource::{deep_merge, JsonMap, Metadata, Resource, ResourceKind};
pub use store::{Manipulator, PathMatcher, Store, DEFAULT_PRIORITY};
