pub mod camera;
pub mod host;
pub mod picking;
pub mod selection;

pub use camera::*;
pub use host::*;
pub use picking::*;
pub use selection::*;
