//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the scheduling core and the outside world. Adapters implement them.
//!
//! - `SessionsStore` - session persistence boundary
//! - `GroupCatalog` - read-only class/group/schedule snapshots
//! - `AccessChecker` - tenant and group authorization
//! - `EventPublisher` - outbound lifecycle events

mod access_checker;
mod event_publisher;
mod group_catalog;
mod sessions_store;

pub use access_checker::{AccessChecker, AccessDeniedReason, AccessResult};
pub use event_publisher::EventPublisher;
pub use group_catalog::GroupCatalog;
pub use sessions_store::{ConflictKey, SessionsStore};
