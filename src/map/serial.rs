//! Versioned binary map format.
//!
//! A map file is a little-endian header (format version, width, height)
//! followed by one fixed-size record per cell in arena order. The current
//! format is version 2; version 1 files, which predate roads, walls, and
//! feature levels, still load with defaults for the missing fields.
//! Decoding never touches a live map: [`read_map`] either returns a fully
//! decoded [`MapFile`] or an error, so a bad file cannot leave a map half
//! replaced.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::coords::HexDirection;

use super::cell::HexCell;
use super::grid::HexMap;

/// Format version written by [`write_map`].
pub const MAP_FORMAT_VERSION: u32 = 2;

/// Oldest format version [`read_map`] still accepts.
const MIN_FORMAT_VERSION: u32 = 1;

/// Upper bound on cells per file, to reject absurd headers early.
const MAX_CELLS: i64 = 1 << 20;

/// River edge bytes are the direction index with the high bit set;
/// zero means no river.
const RIVER_FLAG: u8 = 0x80;

/// Only the low six bits of the roads byte carry edges.
const ROADS_MASK: u8 = 0x3F;

/// Why a map file failed to decode.
#[derive(Debug, Error)]
pub enum MapLoadError {
    /// The header names a version this build cannot read.
    #[error("unsupported map format version {0}")]
    UnsupportedVersion(u32),
    /// The header dimensions are non-positive or implausibly large.
    #[error("invalid map dimensions {width}x{height}")]
    InvalidDimensions {
        /// Offset width from the header.
        width: i32,
        /// Offset height from the header.
        height: i32,
    },
    /// A river edge byte is neither zero nor a flagged direction index.
    #[error("invalid river edge byte {0:#04x}")]
    InvalidRiverByte(u8),
    /// The underlying reader failed; includes files that end early.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One cell's persisted state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellRecord {
    /// Palette index of the terrain type.
    pub terrain_type_index: u8,
    /// Elevation level, clamped to a byte on save.
    pub elevation: u8,
    /// Water level.
    pub water_level: u8,
    /// Urban feature level.
    pub urban_level: u8,
    /// Farm feature level.
    pub farm_level: u8,
    /// Plant feature level.
    pub plant_level: u8,
    /// Special feature index, zero for none.
    pub special_index: u8,
    /// Whether the cell is walled.
    pub walled: bool,
    /// Incoming river edge, if any.
    pub incoming_river: Option<HexDirection>,
    /// Outgoing river edge, if any.
    pub outgoing_river: Option<HexDirection>,
    /// Road edges as a six-bit mask, bit `d` for direction index `d`.
    pub roads: u8,
}

impl CellRecord {
    /// Snapshots a live cell. Elevations outside `0..=255` clamp.
    pub fn from_cell(cell: &HexCell) -> Self {
        let mut roads = 0u8;
        for d in HexDirection::ALL {
            if cell.has_road_through_edge(d) {
                roads |= 1 << d.index();
            }
        }
        Self {
            terrain_type_index: cell.terrain_type_index(),
            elevation: cell.elevation().clamp(0, 255) as u8,
            water_level: cell.water_level().clamp(0, 255) as u8,
            urban_level: cell.urban_level(),
            farm_level: cell.farm_level(),
            plant_level: cell.plant_level(),
            special_index: cell.special_index(),
            walled: cell.walled(),
            incoming_river: cell.has_incoming_river().then(|| cell.incoming_river()),
            outgoing_river: cell.has_outgoing_river().then(|| cell.outgoing_river()),
            roads: roads & ROADS_MASK,
        }
    }

    fn write(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&[
            self.terrain_type_index,
            self.elevation,
            self.water_level,
            self.urban_level,
            self.farm_level,
            self.plant_level,
            self.special_index,
            u8::from(self.walled),
            encode_river(self.incoming_river),
            encode_river(self.outgoing_river),
            self.roads & ROADS_MASK,
        ])
    }

    fn read(r: &mut impl Read, version: u32) -> Result<Self, MapLoadError> {
        if version == 1 {
            // Version 1 records carried terrain, levels, and rivers only.
            return Ok(Self {
                terrain_type_index: read_u8(r)?,
                elevation: read_u8(r)?,
                water_level: read_u8(r)?,
                incoming_river: decode_river(read_u8(r)?)?,
                outgoing_river: decode_river(read_u8(r)?)?,
                ..Self::default()
            });
        }
        Ok(Self {
            terrain_type_index: read_u8(r)?,
            elevation: read_u8(r)?,
            water_level: read_u8(r)?,
            urban_level: read_u8(r)?,
            farm_level: read_u8(r)?,
            plant_level: read_u8(r)?,
            special_index: read_u8(r)?,
            walled: read_u8(r)? != 0,
            incoming_river: decode_river(read_u8(r)?)?,
            outgoing_river: decode_river(read_u8(r)?)?,
            roads: read_u8(r)? & ROADS_MASK,
        })
    }
}

/// A fully decoded map file, not yet turned into a live map.
#[derive(Debug)]
pub struct MapFile {
    /// Format version the file was written with.
    pub version: u32,
    /// Offset width.
    pub width: i32,
    /// Offset height.
    pub height: i32,
    /// One record per cell, arena order.
    pub records: Vec<CellRecord>,
}

/// Writes a map in the current format version.
pub fn write_map(map: &HexMap, w: &mut impl Write) -> io::Result<()> {
    w.write_all(&MAP_FORMAT_VERSION.to_le_bytes())?;
    w.write_all(&map.width().to_le_bytes())?;
    w.write_all(&map.height().to_le_bytes())?;
    for i in 0..map.len() {
        CellRecord::from_cell(map.cell(i)).write(w)?;
    }
    Ok(())
}

/// Decodes a whole map file, validating the header and every record
/// before anything is returned.
pub fn read_map(r: &mut impl Read) -> Result<MapFile, MapLoadError> {
    let version = read_u32(r)?;
    if !(MIN_FORMAT_VERSION..=MAP_FORMAT_VERSION).contains(&version) {
        return Err(MapLoadError::UnsupportedVersion(version));
    }
    let width = read_i32(r)?;
    let height = read_i32(r)?;
    if width <= 0 || height <= 0 || i64::from(width) * i64::from(height) > MAX_CELLS {
        return Err(MapLoadError::InvalidDimensions { width, height });
    }
    let count = (width as usize) * (height as usize);
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(CellRecord::read(r, version)?);
    }
    Ok(MapFile {
        version,
        width,
        height,
        records,
    })
}

fn encode_river(river: Option<HexDirection>) -> u8 {
    match river {
        Some(d) => RIVER_FLAG | d.index() as u8,
        None => 0,
    }
}

fn decode_river(byte: u8) -> Result<Option<HexDirection>, MapLoadError> {
    if byte == 0 {
        return Ok(None);
    }
    if byte & RIVER_FLAG != 0
        && let Some(d) = HexDirection::from_index(byte & !RIVER_FLAG)
    {
        return Ok(Some(d));
    }
    Err(MapLoadError::InvalidRiverByte(byte))
}

fn read_u8(r: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}
