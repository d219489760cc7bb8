//! Environment block
//!
//! The loader leaves a small block of 64-bit words at a fixed physical
//! address. Word 0 identifies the platform (zero on gem5), word 1 holds the
//! tile/chip identifier used for line prefixes.

use crate::bus::Bus;

/// Physical address of the environment block
pub const ENV_START: usize = 0x1000_1000;

/// Platform the code is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Cycle-accurate simulator
    Gem5,
    /// FPGA or silicon
    Hardware,
}

/// Combined chip/tile identifier (low byte tile, remaining bits chip)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileId(u64);

impl TileId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn new(chip: u64, tile: u8) -> Self {
        Self((chip << 8) | tile as u64)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    pub const fn tile(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub const fn chip(&self) -> u64 {
        self.0 >> 8
    }
}

/// Something that knows which tile we run on
pub trait Identity {
    fn tile_id(&self) -> TileId;
}

impl Identity for TileId {
    fn tile_id(&self) -> TileId {
        *self
    }
}

/// Environment block window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvBlock {
    base: usize,
}

impl EnvBlock {
    pub const DEFAULT: Self = Self::new(ENV_START);

    const PLATFORM_WORD: usize = 0;
    const TILE_ID_WORD: usize = 1;

    pub const fn new(base: usize) -> Self {
        Self { base }
    }

    pub const fn word_addr(&self, index: usize) -> usize {
        self.base + index * 8
    }

    pub fn platform<B: Bus>(&self, bus: &B) -> Platform {
        match bus.read64(self.word_addr(Self::PLATFORM_WORD)) {
            0 => Platform::Gem5,
            _ => Platform::Hardware,
        }
    }

    pub fn tile_id<B: Bus>(&self, bus: &B) -> TileId {
        TileId::from_raw(bus.read64(self.word_addr(Self::TILE_ID_WORD)))
    }
}

impl Default for EnvBlock {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reads the tile identifier from the environment block on demand
#[derive(Clone, Copy)]
pub struct EnvReader<B> {
    bus: B,
    block: EnvBlock,
}

impl<B: Bus> EnvReader<B> {
    pub const fn new(bus: B, block: EnvBlock) -> Self {
        Self { bus, block }
    }

    pub fn platform(&self) -> Platform {
        self.block.platform(&self.bus)
    }
}

impl<B: Bus> Identity for EnvReader<B> {
    fn tile_id(&self) -> TileId {
        self.block.tile_id(&self.bus)
    }
}
