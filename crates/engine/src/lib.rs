pub mod adapter;
pub mod adapters;
pub mod cost;
pub mod dispatch;
pub mod registry;
pub mod render;
pub mod types;

pub use adapter::{EngineAdapter, EngineError, EngineResult};
pub use dispatch::{DispatchResult, ExecutionDispatcher};
pub use registry::{build_registry, EngineRegistry};
pub use render::render;
pub use types::*;
