pub mod health;
pub mod yql;

pub use health::*;
pub use yql::*;
