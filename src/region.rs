//! Selections, their normalised bounds, and the work queue built from them.
use std::collections::VecDeque;

use crate::prelude::*;

/// Most chunks a single transfer may queue, whatever the config says.
pub const MAX_REGION_CHUNKS: u64 = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    A,
    B,
}

/// Two corners picked by an actor, in whatever order they were set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub a: Option<ChunkPos>,
    pub b: Option<ChunkPos>,
}
impl Region {
    pub fn set(&mut self, corner: Corner, pos: ChunkPos) {
        match corner {
            Corner::A => self.a = Some(pos),
            Corner::B => self.b = Some(pos),
        }
    }
    /// `None` until both corners are set.
    pub fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::normalize(self.a?, self.b?))
    }
}

/// An inclusive rectangle of chunks. `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}
impl Bounds {
    pub fn normalize(a: ChunkPos, b: ChunkPos) -> Self {
        Self {
            min_x: a.x.min(b.x),
            max_x: a.x.max(b.x),
            min_z: a.z.min(b.z),
            max_z: a.z.max(b.z),
        }
    }
    pub fn width(&self) -> u64 {
        (self.max_x as i64 - self.min_x as i64 + 1) as u64
    }
    pub fn depth(&self) -> u64 {
        (self.max_z as i64 - self.min_z as i64 + 1) as u64
    }
    /// `None` if the count doesn't fit in a u64.
    pub fn chunk_count(&self) -> Option<u64> {
        self.width().checked_mul(self.depth())
    }
    pub fn contains(&self, pos: ChunkPos) -> bool {
        (self.min_x..=self.max_x).contains(&pos.x) && (self.min_z..=self.max_z).contains(&pos.z)
    }
    /// Every chunk, x outer and z inner, both increasing.
    pub fn iter(&self) -> impl Iterator<Item = ChunkPos> {
        let Self { min_x, max_x, min_z, max_z } = *self;
        (min_x..=max_x).flat_map(move |x| (min_z..=max_z).map(move |z| ChunkPos { x, z }))
    }
}

/// One chunk to move. Both handles share a grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub source: ChunkHandle,
    pub destination: ChunkHandle,
}
impl WorkItem {
    pub fn pos(&self) -> ChunkPos {
        self.source.pos
    }
}

/// Enumerates every chunk in `bounds`, so callers check
/// [`Bounds::chunk_count`] against [`MAX_REGION_CHUNKS`] first.
pub fn build_queue(source: WorldId, destination: WorldId, bounds: Bounds) -> VecDeque<WorkItem> {
    let capacity = bounds.chunk_count().unwrap_or(u64::MAX).min(1 << 16);
    let mut queue = VecDeque::with_capacity(capacity as usize);
    queue.extend(bounds.iter().map(|pos| WorkItem {
        source: source.resolve(pos),
        destination: destination.resolve(pos),
    }));
    queue
}
