// This file makes `texturer` into a rust library crate.

// The file `main.rs` still exists to make `texturer` into an executable.

pub mod export;
pub mod replay;
pub mod session;
pub mod texture;

pub use base;
