use std::fmt;

/// Side length of a chunk in blocks.
pub const CHUNK_WIDTH: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}
impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}
impl From<(i32, i32)> for ChunkPos {
    fn from((x, z): (i32, i32)) -> Self {
        Self { x, z }
    }
}
impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Where an actor is standing, in block space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
impl BlockPos {
    pub fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x / CHUNK_WIDTH as f64).floor() as i32,
            z: (self.z / CHUNK_WIDTH as f64).floor() as i32,
        }
    }
}

/// Index of a world in [`crate::world::Worlds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(pub(crate) u32);
impl WorldId {
    /// Chunk handles are lazy: nothing is loaded until a copier touches them.
    pub fn resolve(self, pos: ChunkPos) -> ChunkHandle {
        ChunkHandle { world: self, pos }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    pub world: WorldId,
    pub pos: ChunkPos,
}

/// An actor's login name. Up to 16 bytes of utf8, padded with 0xFF.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name([u8; 16]);
impl Name {
    pub fn new(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > 16 || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return None;
        }
        let mut buf = [0xFF; 16];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self(buf))
    }
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0xFF).unwrap_or(16);
        // 0xFF never appears in utf8, and `new` only accepts whole strings
        core::str::from_utf8(&self.0[..len]).unwrap_or_default()
    }
}
impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
