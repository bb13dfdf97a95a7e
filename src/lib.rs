pub mod adapters;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod format;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod storage;
pub mod sync;
