pub mod seed;
pub mod overview;
