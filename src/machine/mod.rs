mod error;
mod machine;

pub use error::*;
pub use machine::*;
