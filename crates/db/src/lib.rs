mod error;
pub mod models;
mod pool;
pub mod repositories;

pub use error::*;
pub use models::{CapabilityRecord, CapabilityRow, SessionRow};
pub use pool::*;
pub use repositories::*;
