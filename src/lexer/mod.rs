mod error;
mod lexer;
mod source;
mod token;

pub use error::*;
pub use lexer::*;
pub use source::*;
pub use token::*;
