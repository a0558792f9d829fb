//! Host application: catalog, persistence, progress, and quiz bookkeeping

pub mod catalog;
pub mod dashboard;
pub mod lab_host;
pub mod reference;
pub mod storage;

pub use catalog::{Catalog, CatalogEntry};
pub use dashboard::{summarize, Clearance, DashboardStats, TierProgress};
pub use lab_host::{LabHost, ModuleView, Progress};
pub use reference::{Lookup, QuickReference};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Namespace};
