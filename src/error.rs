use crate::prelude::*;

/// Why a single chunk could not be copied. Never fatal to a transfer.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("no world with id {0:?}")]
    UnknownWorld(WorldId),
    #[error("could not snapshot chunk {}: {source}", .chunk.pos)]
    Snapshot {
        chunk: ChunkHandle,
        #[source]
        source: fastnbt::error::Error,
    },
    #[error("snapshot of chunk {} is corrupt: {reason}", .chunk.pos)]
    Corrupt {
        chunk: ChunkHandle,
        reason: &'static str,
    },
    /// For copiers that are not backed by [`crate::world::Worlds`]
    #[error("{0}")]
    Other(String),
}

/// A command that was refused. The message is shown to the actor as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command {0:?}. Try help.")]
    UnknownCommand(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Log in first using login [name].")]
    NotLoggedIn,
    #[error("Names are 1 to 16 characters without spaces.")]
    BadName,
    #[error("Move somewhere first using goto [world] [x] [y] [z].")]
    NoPosition,
    #[error("You need to select a region first using select [a/b].")]
    NoSelection,
    #[error("Both selection points a/b must be defined.")]
    IncompleteSelection,
    #[error("World {0} doesn't exist.")]
    UnknownWorld(String),
    /// `chunks` is `None` when the region is too big to even count
    #[error("That region has {} chunks, the limit is {limit}.", .chunks.map_or("too many".to_string(), |n| n.to_string()))]
    RegionTooLarge { chunks: Option<u64>, limit: u64 },
    #[error("You have no running transfers.")]
    NothingToCancel,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
