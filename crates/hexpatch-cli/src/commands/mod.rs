//! CLI command implementations.

pub mod hard_apply;
pub mod identify;
pub mod import;
pub mod scan;
pub mod status;
pub mod toggle;
