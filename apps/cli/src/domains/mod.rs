pub mod daemon;
pub mod reset;
