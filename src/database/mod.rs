pub mod catalog;
pub mod stream;

pub use catalog::*;
pub use stream::*;
