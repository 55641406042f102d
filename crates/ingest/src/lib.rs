mod splitter;
mod utils;

pub use splitter::*;
pub use utils::*;
