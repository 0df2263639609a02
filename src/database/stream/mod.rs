mod model;
mod resolution_cache;
mod season_locks;

pub use model::*;
pub use resolution_cache::*;
pub use season_locks::*;
