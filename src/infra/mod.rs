//! Infrastructure adapters and runtime bootstrap.

pub mod cache;
pub mod cms;
pub mod error;
pub mod http;
pub mod telemetry;
