//! Client-agnostic daemon infrastructure

pub mod bootstrap;
pub mod client;
pub mod dispatch;
pub mod rpc;
pub mod types;
