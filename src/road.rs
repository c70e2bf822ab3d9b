use crate::config::ROAD_ATLAS_DIM;
use crate::tile::{Direction, TileType};
use crate::tile_grid::TileGrid;

pub const NORTH_BIT: u8 = 1;
pub const EAST_BIT: u8 = 2;
pub const SOUTH_BIT: u8 = 4;
pub const WEST_BIT: u8 = 8;

/// Road pieces in atlas order; the ordinal is the atlas cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoadVariant {
    #[default]
    StraightVertical,
    StraightHorizontal,
    CornerNorthEast,
    CornerNorthWest,
    CornerSouthEast,
    CornerSouthWest,
    TeeNorth,
    TeeEast,
    TeeSouth,
    TeeWest,
    Cross,
}

// Indexed by the 4-bit neighbor mask.
const VARIANT_TABLE: [RoadVariant; 16] = [
    RoadVariant::StraightVertical,   // 0, isolated
    RoadVariant::StraightVertical,   // N
    RoadVariant::StraightHorizontal, // E
    RoadVariant::CornerNorthEast,    // N E
    RoadVariant::StraightVertical,   // S
    RoadVariant::StraightVertical,   // N S
    RoadVariant::CornerSouthEast,    // E S
    RoadVariant::TeeEast,            // N E S
    RoadVariant::StraightHorizontal, // W
    RoadVariant::CornerNorthWest,    // N W
    RoadVariant::StraightHorizontal, // E W
    RoadVariant::TeeNorth,           // N E W
    RoadVariant::CornerSouthWest,    // S W
    RoadVariant::TeeWest,            // N S W
    RoadVariant::TeeSouth,           // E S W
    RoadVariant::Cross,              // N E S W
];

impl RoadVariant {
    pub const ALL: [RoadVariant; 11] = [
        RoadVariant::StraightVertical,
        RoadVariant::StraightHorizontal,
        RoadVariant::CornerNorthEast,
        RoadVariant::CornerNorthWest,
        RoadVariant::CornerSouthEast,
        RoadVariant::CornerSouthWest,
        RoadVariant::TeeNorth,
        RoadVariant::TeeEast,
        RoadVariant::TeeSouth,
        RoadVariant::TeeWest,
        RoadVariant::Cross,
    ];

    /// Anything above 15 has no meaning and falls back to the default piece.
    pub fn from_mask(mask: u8) -> Self {
        VARIANT_TABLE
            .get(mask as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn ordinal(self) -> u32 {
        self as u32
    }

    /// (column, row) of this variant's cell on the road atlas.
    pub fn atlas_cell(self) -> (u32, u32) {
        let v = self.ordinal();
        (v % ROAD_ATLAS_DIM, v / ROAD_ATLAS_DIM)
    }

    /// Maps a tile-local uv in [0,1] into this variant's atlas cell.
    pub fn atlas_uv(self, local: [f32; 2]) -> [f32; 2] {
        let (column, row) = self.atlas_cell();
        let scale = 1.0 / ROAD_ATLAS_DIM as f32;
        [
            (column as f32 + local[0]) * scale,
            (row as f32 + local[1]) * scale,
        ]
    }

    /// Sides the road piece opens towards, as a neighbor mask. Isolated and dead-end
    /// pieces draw as a full straight.
    pub fn arms(self) -> u8 {
        match self {
            RoadVariant::StraightVertical => NORTH_BIT | SOUTH_BIT,
            RoadVariant::StraightHorizontal => EAST_BIT | WEST_BIT,
            RoadVariant::CornerNorthEast => NORTH_BIT | EAST_BIT,
            RoadVariant::CornerNorthWest => NORTH_BIT | WEST_BIT,
            RoadVariant::CornerSouthEast => SOUTH_BIT | EAST_BIT,
            RoadVariant::CornerSouthWest => SOUTH_BIT | WEST_BIT,
            RoadVariant::TeeNorth => NORTH_BIT | EAST_BIT | WEST_BIT,
            RoadVariant::TeeEast => NORTH_BIT | EAST_BIT | SOUTH_BIT,
            RoadVariant::TeeSouth => EAST_BIT | SOUTH_BIT | WEST_BIT,
            RoadVariant::TeeWest => NORTH_BIT | SOUTH_BIT | WEST_BIT,
            RoadVariant::Cross => NORTH_BIT | EAST_BIT | SOUTH_BIT | WEST_BIT,
        }
    }
}

fn direction_bit(dir: Direction) -> u8 {
    match dir {
        Direction::North => NORTH_BIT,
        Direction::East => EAST_BIT,
        Direction::South => SOUTH_BIT,
        Direction::West => WEST_BIT,
        _ => 0,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RoadAutotiler;

impl RoadAutotiler {
    /// Which orthogonal neighbors of `index` are roads. Out-of-range indices have none.
    pub fn traffic_mask(&self, grid: &TileGrid, index: usize) -> u8 {
        let tile = match grid.tile(index) {
            Ok(tile) => tile,
            Err(_) => return 0,
        };

        Direction::ORTHOGONAL
            .iter()
            .filter_map(|dir| tile.neighbor(*dir).map(|n| (*dir, n)))
            .filter(|(_, n)| grid[*n].tile_type() == TileType::Traffic)
            .fold(0, |mask, (dir, _)| mask | direction_bit(dir))
    }

    /// Recomputes the variant of a single road tile. Returns the variant, or `None` when
    /// the tile is not a road.
    pub fn retile(&self, grid: &mut TileGrid, index: usize) -> Option<RoadVariant> {
        if grid.tile(index).ok()?.tile_type() != TileType::Traffic {
            return None;
        }

        let variant = RoadVariant::from_mask(self.traffic_mask(grid, index));
        grid.set_road_variant(index, variant);
        Some(variant)
    }

    /// Call after the type of `index` changed: retiles the tile itself and every
    /// orthogonal road next to it, whose masks changed too.
    pub fn refresh_around(&self, grid: &mut TileGrid, index: usize) {
        let neighbors: Vec<usize> = match grid.tile(index) {
            Ok(tile) => Direction::ORTHOGONAL
                .iter()
                .filter_map(|dir| tile.neighbor(*dir))
                .collect(),
            Err(_) => return,
        };

        self.retile(grid, index);
        for neighbor in neighbors {
            self.retile(grid, neighbor);
        }
    }
}
