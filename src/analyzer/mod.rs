mod scope;

pub use scope::*;
