pub mod constants;
pub mod grid;
pub mod maze;
pub mod protocol;
pub mod rng;
pub mod session;
pub mod types;
