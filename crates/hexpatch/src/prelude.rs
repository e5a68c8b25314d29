//! Prelude module for convenient imports
//!
//! ```ignore
//! use hexpatch::prelude::*;
//! ```

// Engine and configuration
pub use crate::config::{BuildTarget, EngineConfig};
pub use crate::engine::{PatchEngine, PatchView};

// Error handling
pub use crate::error::{Error, PatchFault, Result};

// Patches
pub use crate::patch::{PatchDescriptor, PatchStatus, PatchType};

// Image access
pub use crate::memory::{AccessMode, ImageAccess};
