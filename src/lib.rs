//! Copies rectangular regions of chunks from one world into another, a
//! chunk at a time on a tick timer, so a big transfer never stalls the
//! thread that drives it.
//!
//! The pieces, bottom up:
//! - [`region`] turns two corners into bounds and a row-major work queue
//! - [`timer`] runs recurring tasks on a virtual tick clock
//! - [`transfer`] drains a work queue through a [`world::ChunkCopier`]
//! - [`world`] is an in-memory chunk store that snapshots and pastes chunks
//! - [`Server`] and [`Network`] put a line-based admin console in front of it
mod collections;
mod commands;
pub mod config;
pub mod error;
pub mod network;
pub mod region;
pub mod server;
pub mod session;
pub mod timer;
pub mod transfer;
pub mod types;
pub mod world;

pub use config::Config;
pub use network::Network;
pub use server::Server;
pub use world::World;

mod prelude {
    pub(crate) use crate::collections::*;
    pub(crate) use crate::types::*;
    pub(crate) use std::{io, time};
    pub(crate) use std::net::TcpStream;
}
