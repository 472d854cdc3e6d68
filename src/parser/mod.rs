mod cursor;
mod error;
mod parser;
mod tree;

pub use cursor::*;
pub use error::*;
pub use parser::*;
pub use tree::*;
