pub mod any_pool;
pub mod container;
pub mod error;
pub mod phase;

pub use any_pool::{AnyGuard, AnyPool};
pub use container::ServiceContainer;
pub use error::ServiceError;
pub use phase::ContainerPhase;
