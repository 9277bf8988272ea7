pub mod account;
pub mod order;

pub use account::*;
pub use order::*;
