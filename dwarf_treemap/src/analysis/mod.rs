pub mod attribute;
pub mod image;
pub mod loader;
pub mod types;
pub mod variables;

pub use attribute::decode_integer;
pub use image::{AttrValue, CompileUnit, DebugEntry, DebugImage, DebugImageBuilder};
pub use loader::{load_image, read_image_bytes};
pub use types::{TypeResolver, array_dimensions};
pub use variables::{UnitVariables, collect_image, collect_variables, demangle_symbol};
