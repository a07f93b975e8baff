//! o3dexport Core Library
//!
//! This crate provides the types shared by every o3dexport crate: the unified
//! error, small math types, the on-disk document schemas and logging setup.

pub mod document;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::document::*;
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::types::*;
}
