use std::collections::HashMap;

use fastnbt::{ByteArray, LongArray};
use serde::{Deserialize, Serialize};

use crate::error::CopyError;
use crate::prelude::*;

// Chunks span y -64..320 as 24 sections of 16.
// Block states are 15 bits, packed 4 to a long.
pub const MIN_Y: i32 = -64;
pub const HEIGHT: i32 = 384;
const SECTIONS: usize = (HEIGHT / 16) as usize;
const BLOCKS_PER_LONG: usize = 4;
const LONGS: usize = (16 * 16 * HEIGHT as usize) / BLOCKS_PER_LONG;
const LONGS_PER_SECTION: usize = LONGS / SECTIONS;
const STATE_MASK: u64 = 0b11111_11111_11111;
// Biomes are stored per 4x4x4 cell
const BIOME_CELLS: usize = 4 * 4 * (HEIGHT as usize / 4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u16);
impl BlockId {
    pub const AIR: Self = Self(0);
    pub const STONE: Self = Self(1);
    pub const GRASS: Self = Self(8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BiomeId(pub u8);
impl BiomeId {
    pub const VOID: Self = Self(0);
    pub const PLAINS: Self = Self(1);
}

/// How missing chunks get filled in when something first touches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Void,
    /// Stone up to y=-2, `surface` on y=-1
    Flat { surface: BlockId },
}

pub struct Chunk {
    pub content: ChunkContent,
    biomes: Box<[u8; BIOME_CELLS]>,
}
pub enum ChunkContent {
    OneToOne {
        nonaircounts: [u16; SECTIONS],
        blocks: Box<[u64; LONGS]>,
    }
}
impl Chunk {
    fn generate(generator: Generator) -> Self {
        let mut blocks = vec![0u64; LONGS];
        let mut nonaircounts = [0; SECTIONS];
        let biome = match generator {
            Generator::Void => BiomeId::VOID,
            Generator::Flat { .. } => BiomeId::PLAINS,
        };
        if let Generator::Flat { surface } = generator {
            let stone = BlockId::STONE.0 as u64;
            blocks[..4 * LONGS_PER_SECTION].iter_mut()
                .for_each(|s| *s = stone | stone << 15 | stone << 30 | stone << 45);
            nonaircounts[..4].iter_mut().for_each(|v| *v = 4096);
            let surface = surface.0 as u64 & STATE_MASK;
            blocks[4 * LONGS_PER_SECTION - 16 * 16 / BLOCKS_PER_LONG..4 * LONGS_PER_SECTION].iter_mut()
                .for_each(|s| *s = surface | surface << 15 | surface << 30 | surface << 45);
            if surface == 0 {
                nonaircounts[3] -= 16 * 16;
            }
        }
        Self {
            content: ChunkContent::OneToOne {
                nonaircounts,
                blocks: blocks.into_boxed_slice().try_into().unwrap_or_else(|_| unreachable!()),
            },
            biomes: Box::new([biome.0; BIOME_CELLS]),
        }
    }
    fn block_index(x: i32, y: i32, z: i32) -> usize {
        debug_assert!((0..16).contains(&x) && (0..16).contains(&z) && (MIN_Y..MIN_Y + HEIGHT).contains(&y));
        ((y - MIN_Y) * 16 * 16 + z * 16 + x) as usize
    }
    /// `x` and `z` are chunk-local.
    pub fn block(&self, x: i32, y: i32, z: i32) -> BlockId {
        let idx = Self::block_index(x, y, z);
        match &self.content {
            ChunkContent::OneToOne { blocks, .. } => {
                let subidx = idx % BLOCKS_PER_LONG;
                BlockId(((blocks[idx / BLOCKS_PER_LONG] >> (subidx * 15)) & STATE_MASK) as u16)
            }
        }
    }
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) {
        let idx = Self::block_index(x, y, z);
        match &mut self.content {
            ChunkContent::OneToOne { nonaircounts, blocks } => {
                let id = block.0 as u64 & STATE_MASK;
                let long = &mut blocks[idx / BLOCKS_PER_LONG];
                let subidx = idx % BLOCKS_PER_LONG;
                let old = (*long >> (subidx * 15)) & STATE_MASK;
                *long = (*long & !(STATE_MASK << (subidx * 15))) | id << (subidx * 15);
                let section = ((y - MIN_Y) / 16) as usize;
                if old == 0 && id != 0 {
                    nonaircounts[section] += 1;
                } else if old != 0 && id == 0 {
                    nonaircounts[section] -= 1;
                }
            }
        }
    }
    fn biome_index(x: i32, y: i32, z: i32) -> usize {
        (((y - MIN_Y) / 4) * 16 + (z / 4) * 4 + x / 4) as usize
    }
    pub fn biome(&self, x: i32, y: i32, z: i32) -> BiomeId {
        BiomeId(self.biomes[Self::biome_index(x, y, z)])
    }
    pub fn set_biome(&mut self, x: i32, y: i32, z: i32, biome: BiomeId) {
        self.biomes[Self::biome_index(x, y, z)] = biome.0;
    }
    pub fn nonair_count(&self) -> u32 {
        match &self.content {
            ChunkContent::OneToOne { nonaircounts, .. } => nonaircounts.iter().map(|&n| n as u32).sum(),
        }
    }
    /// Encodes the whole chunk. The snapshot owns its bytes, so later edits
    /// to this chunk don't show up in it.
    pub fn snapshot(&self) -> Result<ChunkSnapshot, fastnbt::error::Error> {
        let ChunkContent::OneToOne { blocks, .. } = &self.content;
        let data = ChunkData {
            blocks: LongArray::new(blocks.iter().map(|&l| l as i64).collect()),
            biomes: ByteArray::new(self.biomes.iter().map(|&b| b as i8).collect()),
        };
        fastnbt::to_bytes(&data).map(ChunkSnapshot)
    }
    /// Overwrites every block and biome cell.
    fn restore(&mut self, data: ChunkData) -> Result<(), &'static str> {
        if data.blocks.len() != LONGS {
            return Err("wrong number of block longs");
        }
        if data.biomes.len() != BIOME_CELLS {
            return Err("wrong number of biome cells");
        }
        let ChunkContent::OneToOne { nonaircounts, blocks } = &mut self.content;
        for (dst, &src) in blocks.iter_mut().zip(data.blocks.iter()) {
            *dst = src as u64;
        }
        for (count, section) in nonaircounts.iter_mut().zip(blocks.chunks(LONGS_PER_SECTION)) {
            *count = section.iter()
                .map(|long| (0..BLOCKS_PER_LONG).filter(|i| (long >> (i * 15)) & STATE_MASK != 0).count() as u16)
                .sum();
        }
        for (dst, &src) in self.biomes.iter_mut().zip(data.biomes.iter()) {
            *dst = src as u8;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct ChunkData {
    #[serde(rename = "Blocks")]
    blocks: LongArray,
    #[serde(rename = "Biomes")]
    biomes: ByteArray,
}

/// A point-in-time copy of a chunk, NBT encoded.
#[derive(Debug, Clone)]
pub struct ChunkSnapshot(Vec<u8>);
impl ChunkSnapshot {
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    fn decode(&self) -> Result<ChunkData, fastnbt::error::Error> {
        fastnbt::from_bytes(&self.0)
    }
}

pub struct World {
    name: String,
    generator: Generator,
    chunks: Vec<Chunk>,
    index: HashMap<(i32, i32), u32>,
}
impl World {
    pub fn new(name: impl Into<String>, generator: Generator) -> Self {
        Self {
            name: name.into(),
            generator,
            chunks: vec![],
            index: Default::default(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn loaded_chunks(&self) -> usize {
        self.chunks.len()
    }
    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.index.get(&(pos.x, pos.z)).map(|&idx| &self.chunks[idx as usize])
    }
    /// Generates the chunk if nothing has touched it yet.
    pub fn chunk_mut(&mut self, pos: ChunkPos) -> &mut Chunk {
        let generator = self.generator;
        let chunks = &mut self.chunks;
        let idx = *self.index.entry((pos.x, pos.z)).or_insert_with(|| {
            log::trace!("generating chunk {pos}");
            chunks.push(Chunk::generate(generator));
            (chunks.len() - 1) as u32
        });
        &mut self.chunks[idx as usize]
    }
    /// Block coordinates, not chunk-local ones.
    pub fn block(&mut self, x: i32, y: i32, z: i32) -> BlockId {
        let chunk = self.chunk_mut(ChunkPos::new(x.div_euclid(CHUNK_WIDTH), z.div_euclid(CHUNK_WIDTH)));
        chunk.block(x.rem_euclid(CHUNK_WIDTH), y, z.rem_euclid(CHUNK_WIDTH))
    }
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) {
        let chunk = self.chunk_mut(ChunkPos::new(x.div_euclid(CHUNK_WIDTH), z.div_euclid(CHUNK_WIDTH)));
        chunk.set_block(x.rem_euclid(CHUNK_WIDTH), y, z.rem_euclid(CHUNK_WIDTH), block);
    }
}

/// Moves one chunk's contents onto another, one call per drain step.
pub trait ChunkCopier {
    fn copy(&mut self, source: ChunkHandle, destination: ChunkHandle) -> Result<(), CopyError>;
}

/// Every world on the server, looked up by case-insensitive name.
#[derive(Default)]
pub struct Worlds {
    worlds: Vec<World>,
}
impl Worlds {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, world: World) -> WorldId {
        if let Some(id) = self.id(world.name()) {
            log::warn!("replacing world {}", world.name());
            self.worlds[id.0 as usize] = world;
            return id;
        }
        self.worlds.push(world);
        WorldId((self.worlds.len() - 1) as u32)
    }
    pub fn id(&self, name: &str) -> Option<WorldId> {
        self.worlds.iter()
            .position(|w| w.name.eq_ignore_ascii_case(name))
            .map(|i| WorldId(i as u32))
    }
    pub fn get(&self, id: WorldId) -> Option<&World> {
        self.worlds.get(id.0 as usize)
    }
    pub fn get_mut(&mut self, id: WorldId) -> Option<&mut World> {
        self.worlds.get_mut(id.0 as usize)
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.worlds.iter().map(World::name)
    }
    fn chunk_mut(&mut self, chunk: ChunkHandle) -> Result<&mut Chunk, CopyError> {
        self.get_mut(chunk.world)
            .map(|world| world.chunk_mut(chunk.pos))
            .ok_or(CopyError::UnknownWorld(chunk.world))
    }
}
impl ChunkCopier for Worlds {
    fn copy(&mut self, source: ChunkHandle, destination: ChunkHandle) -> Result<(), CopyError> {
        // check up front so a bad destination doesn't generate the source for nothing
        self.get(destination.world).ok_or(CopyError::UnknownWorld(destination.world))?;
        let snapshot = self.chunk_mut(source)?.snapshot()
            .map_err(|source_err| CopyError::Snapshot { chunk: source, source: source_err })?;
        log::trace!("snapshot of {:?} {} is {}kb", source.world, source.pos, snapshot.len() / 1024);
        let data = snapshot.decode()
            .map_err(|source_err| CopyError::Snapshot { chunk: source, source: source_err })?;
        self.chunk_mut(destination)?.restore(data)
            .map_err(|reason| CopyError::Corrupt { chunk: source, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_worlds() -> (Worlds, WorldId, WorldId) {
        let mut worlds = Worlds::new();
        let a = worlds.add(World::new("world", Generator::Flat { surface: BlockId::GRASS }));
        let b = worlds.add(World::new("Nether", Generator::Void));
        (worlds, a, b)
    }

    #[test]
    fn flat_generation() {
        let mut world = World::new("w", Generator::Flat { surface: BlockId::GRASS });
        assert_eq!(world.block(3, -64, -3), BlockId::STONE);
        assert_eq!(world.block(3, -2, -3), BlockId::STONE);
        assert_eq!(world.block(3, -1, -3), BlockId::GRASS);
        assert_eq!(world.block(3, 0, -3), BlockId::AIR);
        assert_eq!(world.chunk(ChunkPos::new(0, -1)).unwrap().nonair_count(), 4 * 4096);
        assert_eq!(world.loaded_chunks(), 1);
    }

    #[test]
    fn set_block_tracks_counts() {
        let mut world = World::new("w", Generator::Void);
        world.set_block(-1, 100, 17, BlockId(42));
        assert_eq!(world.block(-1, 100, 17), BlockId(42));
        let chunk = world.chunk(ChunkPos::new(-1, 1)).unwrap();
        assert_eq!(chunk.block(15, 100, 1), BlockId(42));
        assert_eq!(chunk.nonair_count(), 1);
        world.set_block(-1, 100, 17, BlockId::AIR);
        assert_eq!(world.chunk(ChunkPos::new(-1, 1)).unwrap().nonair_count(), 0);
    }

    #[test]
    fn lookup_ignores_case() {
        let (worlds, a, b) = two_worlds();
        assert_eq!(worlds.id("WORLD"), Some(a));
        assert_eq!(worlds.id("nether"), Some(b));
        assert_eq!(worlds.id("the_end"), None);
        assert_eq!(worlds.names().collect::<Vec<_>>(), ["world", "Nether"]);
    }

    #[test]
    fn copy_overwrites_blocks_and_biomes() {
        let (mut worlds, src, dst) = two_worlds();
        let pos = ChunkPos::new(2, -5);
        {
            let chunk = worlds.get_mut(src).unwrap().chunk_mut(pos);
            chunk.set_block(1, 70, 2, BlockId(300));
            chunk.set_biome(8, 8, 8, BiomeId(7));
        }
        worlds.get_mut(dst).unwrap().chunk_mut(pos).set_block(0, 200, 0, BlockId(5));

        worlds.copy(src.resolve(pos), dst.resolve(pos)).unwrap();

        let copied = worlds.get(dst).unwrap().chunk(pos).unwrap();
        assert_eq!(copied.block(1, 70, 2), BlockId(300));
        assert_eq!(copied.block(0, -1, 0), BlockId::GRASS);
        assert_eq!(copied.block(0, 200, 0), BlockId::AIR);
        assert_eq!(copied.biome(9, 9, 9), BiomeId(7));
        assert_eq!(copied.biome(0, 0, 0), BiomeId::PLAINS);
        assert_eq!(copied.nonair_count(), 4 * 4096 + 1);
        // neighbours are untouched
        assert!(worlds.get(dst).unwrap().chunk(ChunkPos::new(2, -4)).is_none());
    }

    #[test]
    fn snapshots_are_point_in_time() {
        let mut chunk = Chunk::generate(Generator::Void);
        chunk.set_block(4, 4, 4, BlockId(9));
        let snapshot = chunk.snapshot().unwrap();
        chunk.set_block(4, 4, 4, BlockId(10));

        let mut target = Chunk::generate(Generator::Void);
        target.restore(snapshot.decode().unwrap()).unwrap();
        assert_eq!(target.block(4, 4, 4), BlockId(9));
        assert_eq!(chunk.block(4, 4, 4), BlockId(10));
    }

    #[test]
    fn unknown_worlds_fail_without_generating() {
        let (mut worlds, src, _) = two_worlds();
        let pos = ChunkPos::new(0, 0);
        let err = worlds.copy(src.resolve(pos), WorldId(9).resolve(pos)).unwrap_err();
        assert!(matches!(err, CopyError::UnknownWorld(WorldId(9))));
        assert_eq!(worlds.get(src).unwrap().loaded_chunks(), 0);
        let err = worlds.copy(WorldId(9).resolve(pos), src.resolve(pos)).unwrap_err();
        assert!(matches!(err, CopyError::UnknownWorld(WorldId(9))));
    }

    #[test]
    fn copying_onto_itself_is_harmless() {
        let (mut worlds, src, _) = two_worlds();
        let pos = ChunkPos::new(1, 1);
        worlds.get_mut(src).unwrap().set_block(20, 5, 20, BlockId(77));
        worlds.copy(src.resolve(pos), src.resolve(pos)).unwrap();
        assert_eq!(worlds.get_mut(src).unwrap().block(20, 5, 20), BlockId(77));
    }
}
