pub mod dbvalue;
pub mod error;
pub mod span;

pub use dbvalue::*;
pub use error::*;
pub use span::*;
