//! Executor adapters: named tokio pools behind the quiescing executor port.

mod builder;
mod named_pool;
mod pooled;
mod quiescence;

pub use builder::TokioExecutorBuilder;
pub use named_pool::NamedPool;
pub use pooled::PooledExecutor;
