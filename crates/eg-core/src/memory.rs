//! Game state extraction from Pokemon Emerald work RAM
//!
//! The layout below is fixed by the game (EWRAM addresses of the save block
//! and party array). Reads are single bytes; multi-byte fields are assembled
//! little-endian.

use serde::{Deserialize, Serialize};

/// Obtained badges, one bit per badge
pub const ADDR_BADGES: u32 = 0x0202_420C;
/// Money, 4 bytes little-endian
pub const ADDR_MONEY: u32 = 0x0202_4490;
/// Party member count
pub const ADDR_PARTY_COUNT: u32 = 0x0202_4284;
/// Start of the party array, right after the count word
pub const ADDR_PARTY_DATA: u32 = ADDR_PARTY_COUNT + 4;
/// Current map number
pub const ADDR_MAP_ID: u32 = 0x0203_6DFD;

/// Size of one party member record
pub const POKEMON_SIZE: u32 = 100;
/// Offset of current HP (u16) inside a party member record
pub const POKEMON_HP: u32 = 0x56;
/// Largest valid party
pub const MAX_PARTY: u8 = 6;

/// Byte-addressable emulator memory
pub trait MemoryBus {
    type Error;

    fn read_byte(&mut self, addr: u32) -> Result<u8, Self::Error>;
}

impl<B: MemoryBus + ?Sized> MemoryBus for &mut B {
    type Error = B::Error;

    fn read_byte(&mut self, addr: u32) -> Result<u8, Self::Error> {
        (**self).read_byte(addr)
    }
}

/// Game state at one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub badge_bitmask: u8,
    pub money: u32,
    pub party_hp_total: u32,
    pub map_id: u8,
    pub frame_index: u64,
}

impl Snapshot {
    /// Number of badges obtained
    pub fn badge_count(&self) -> u32 {
        self.badge_bitmask.count_ones()
    }
}

fn read_u16_le<B: MemoryBus>(bus: &mut B, addr: u32) -> Result<u16, B::Error> {
    let lo = bus.read_byte(addr)?;
    let hi = bus.read_byte(addr + 1)?;
    Ok(u16::from_le_bytes([lo, hi]))
}

fn read_u32_le<B: MemoryBus>(bus: &mut B, addr: u32) -> Result<u32, B::Error> {
    let mut bytes = [0u8; 4];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = bus.read_byte(addr + i as u32)?;
    }
    Ok(u32::from_le_bytes(bytes))
}

/// Address of the current HP of party member `slot`
pub fn party_hp_addr(slot: u8) -> u32 {
    ADDR_PARTY_DATA + u32::from(slot) * POKEMON_SIZE + POKEMON_HP
}

/// Sum of current HP over the party. A count outside `1..=6` means no party data.
pub fn read_party_hp<B: MemoryBus>(bus: &mut B) -> Result<u32, B::Error> {
    let count = bus.read_byte(ADDR_PARTY_COUNT)?;
    if !(1..=MAX_PARTY).contains(&count) {
        return Ok(0);
    }

    let mut total = 0u32;
    for slot in 0..count {
        total += u32::from(read_u16_le(bus, party_hp_addr(slot))?);
    }
    Ok(total)
}

/// Read a full snapshot, tagging it with `frame_index`
pub fn read_snapshot<B: MemoryBus>(bus: &mut B, frame_index: u64) -> Result<Snapshot, B::Error> {
    Ok(Snapshot {
        badge_bitmask: bus.read_byte(ADDR_BADGES)?,
        money: read_u32_le(bus, ADDR_MONEY)?,
        party_hp_total: read_party_hp(bus)?,
        map_id: bus.read_byte(ADDR_MAP_ID)?,
        frame_index,
    })
}
