mod capability;
mod session;

pub use capability::{CapabilityRecord, CapabilityRow};
pub use session::SessionRow;
