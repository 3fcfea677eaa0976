pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod server;

pub use config::{IndexConfig, ServerConfig};
pub use engine::TopicIndex;
pub use error::{Result, TagdexError};
pub use query::{Expr, SliceOptions, SliceResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
