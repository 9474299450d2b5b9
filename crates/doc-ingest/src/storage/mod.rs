//! Persistence of registered file records

mod registry;

pub use registry::FileRegistry;
