pub use jigo_core;

pub mod config;
pub mod engine;
pub mod error;
pub mod gtp;
pub mod intercept;
pub mod raw;
pub mod router;
pub mod server;
