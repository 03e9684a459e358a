// Configuration Tree Module
// In-memory forest of unit descriptors and per-run reporting

pub mod descriptor;
pub mod summary;

// Re-export key types
pub use descriptor::{ConfigurationTree, Descriptors, DependentGroup, UnitDescriptor};
pub use summary::{RunSummary, UnitReport};
