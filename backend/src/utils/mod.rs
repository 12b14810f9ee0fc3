pub mod links;
pub mod time;
pub mod token;

pub use links::*;
pub use time::*;
pub use token::*;
