pub mod api;
pub mod error;
pub mod handlers;
pub mod service;
pub mod store;

pub use api::{RpcServer, DEFAULT_BIND};
pub use error::{RpcError, RpcResult};
pub use service::DocumentService;
pub use store::{ResultStore, DEFAULT_RESULT_TTL};

// Re-export the engine for clients
pub use hyperion_engine;
