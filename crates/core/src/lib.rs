mod error;

pub mod domain;

pub use domain::*;
pub use error::CoreError;
