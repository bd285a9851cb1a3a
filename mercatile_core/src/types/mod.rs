pub mod blob;
pub mod constants;
pub mod geo_bbox;
pub mod merc_bbox;
pub mod projection;
pub mod tile_grid;

pub use blob::*;
pub use constants::*;
pub use geo_bbox::*;
pub use merc_bbox::*;
pub use projection::*;
pub use tile_grid::*;
