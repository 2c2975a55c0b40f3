pub mod cache;
pub mod config;
pub mod interpolate;
pub mod reconcile;
pub mod snapshot;
pub mod view;

pub use cache::*;
pub use config::*;
pub use interpolate::*;
pub use reconcile::*;
pub use snapshot::*;
pub use view::*;
