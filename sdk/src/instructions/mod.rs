/// Instruction builders for the escrow program
pub mod builder;
pub mod escrow;

pub use builder::*;
pub use escrow::*;
