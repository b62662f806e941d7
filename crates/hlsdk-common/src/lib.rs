pub mod shared;
pub mod token;
