//! Module discovery: on-disk files, loaded images and section tables.

mod host;
mod locator;
pub mod pe;

pub use host::{LoadedModule, ModuleHost, SystemHost};
pub use locator::{ModuleInfo, ModuleLocator};
pub use pe::{ImageStamp, Section, SectionMap, image_identifier};
