mod lookup_table;
mod model;

pub use lookup_table::*;
pub use model::*;
