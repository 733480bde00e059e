//! Infrastructure layer - external interfaces

pub mod daemon;
pub mod event;
