//! Shared building blocks: configuration, errors, and the pure JSON helpers
//! (dot-notation access, tree normalize/denormalize) used alongside the
//! dispatch engine.

pub mod array;
pub mod config;
pub mod error;
pub mod tree;

pub use config::{load_config, CascadeConfig, EngineConfig, TreeKeys};
pub use error::{CommonError, CommonResult};
