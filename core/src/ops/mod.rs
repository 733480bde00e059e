//! Operations exposed over the daemon's RPC surface

pub mod reset;
