pub mod interval;
pub mod time_grid;
pub mod config_validator;
pub mod occupancy;
pub mod backend;
pub mod cache;
pub mod normalize;
pub mod lifecycle;

pub use interval::*;
pub use time_grid::*;
pub use config_validator::*;
pub use occupancy::*;
pub use backend::*;
pub use cache::*;
pub use normalize::*;
pub use lifecycle::*;
