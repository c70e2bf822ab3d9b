use std::ops::{Index, IndexMut};

use rand::Rng;

use crate::error::EditorError;
use crate::road::RoadVariant;
use crate::tile::{Direction, Tile, TileType, BYTES_PER_TILE, VERTICES_PER_TILE};

/// Square arena of tiles addressed by `z * size + x`. Neighbor links are plain indices into
/// the arena and are fixed at construction.
#[derive(Debug, Clone)]
pub struct TileGrid {
    size: usize,
    tile_size: f32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(size: usize, tile_size: f32) -> Self {
        assert!(size > 0, "tile grid size must be positive");

        let mut tiles: Vec<Tile> = (0..size * size)
            .map(|index| Tile::new(index, index % size, index / size, tile_size))
            .collect();

        for tile in tiles.iter_mut() {
            let (x, z) = (tile.grid_x() as i64, tile.grid_z() as i64);
            for dir in Direction::ALL {
                let (dx, dz) = dir.offset();
                tile.set_neighbor(dir, Self::checked_index(size, x + dx, z + dz));
            }
        }

        log::info!("created {}x{} tile grid", size, size);

        Self {
            size,
            tile_size,
            tiles,
        }
    }

    fn checked_index(size: usize, x: i64, z: i64) -> Option<usize> {
        let size = size as i64;
        if (0..size).contains(&x) && (0..size).contains(&z) {
            Some((z * size + x) as usize)
        } else {
            None
        }
    }

    /// Tiles per side.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn vertex_count(&self) -> u32 {
        (self.tiles.len() * VERTICES_PER_TILE) as u32
    }

    pub fn tile(&self, index: usize) -> Result<&Tile, EditorError> {
        let len = self.tiles.len();
        self.tiles
            .get(index)
            .ok_or(EditorError::TileOutOfRange { index, len })
    }

    pub fn tile_mut(&mut self, index: usize) -> Result<&mut Tile, EditorError> {
        let len = self.tiles.len();
        self.tiles
            .get_mut(index)
            .ok_or(EditorError::TileOutOfRange { index, len })
    }

    pub fn index_of(&self, x: usize, z: usize) -> Result<usize, EditorError> {
        Self::checked_index(self.size, x as i64, z as i64).ok_or(EditorError::CoordsOutOfRange {
            x: x as i64,
            z: z as i64,
            size: self.size,
        })
    }

    pub fn coords_of(&self, index: usize) -> Result<(usize, usize), EditorError> {
        self.tile(index).map(|t| (t.grid_x(), t.grid_z()))
    }

    pub fn neighbor(&self, index: usize, dir: Direction) -> Result<Option<usize>, EditorError> {
        self.tile(index).map(|t| t.neighbor(dir))
    }

    pub fn set_type(&mut self, index: usize, tile_type: TileType) -> Result<(), EditorError> {
        self.tile_mut(index)?.set_type(tile_type);
        Ok(())
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) -> Result<(), EditorError> {
        self.tile_mut(index)?.set_selected(selected);
        Ok(())
    }

    pub(crate) fn set_road_variant(&mut self, index: usize, variant: RoadVariant) {
        if let Some(tile) = self.tiles.get_mut(index) {
            tile.set_road_variant(variant);
        }
    }

    /// Indices of every tile changed since the last call, in index order. Clears the marks.
    pub fn take_dirty(&mut self) -> Vec<usize> {
        self.tiles
            .iter_mut()
            .filter(|t| t.is_dirty())
            .map(|t| {
                t.clear_dirty();
                t.index()
            })
            .collect()
    }

    pub fn tile_byte_offset(index: usize) -> u64 {
        (index * BYTES_PER_TILE) as u64
    }

    pub fn tile_bytes(&self, index: usize) -> Result<&[u8], EditorError> {
        self.tile(index).map(Tile::as_bytes)
    }

    /// The whole mesh as one contiguous buffer, tile `i` at `tile_byte_offset(i)`.
    pub fn mesh_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.tiles.len() * BYTES_PER_TILE);
        for tile in &self.tiles {
            bytes.extend_from_slice(tile.as_bytes());
        }
        bytes
    }

    /// Turns roughly `density` of the empty tiles into plants. Returns how many were planted.
    pub fn scatter_plants<R: Rng>(&mut self, rng: &mut R, density: f64) -> usize {
        let density = density.clamp(0.0, 1.0);
        let mut planted = 0;
        for tile in self.tiles.iter_mut() {
            if tile.tile_type() == TileType::None && rng.gen_bool(density) {
                tile.set_type(TileType::Plants);
                planted += 1;
            }
        }
        planted
    }
}

impl Index<usize> for TileGrid {
    type Output = Tile;

    fn index(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }
}

impl IndexMut<usize> for TileGrid {
    fn index_mut(&mut self, index: usize) -> &mut Tile {
        &mut self.tiles[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn indices_follow_row_major_layout() {
        let grid = TileGrid::new(4, 1.0);
        assert_eq!(grid.len(), 16);
        for (i, tile) in grid.tiles().iter().enumerate() {
            assert_eq!(tile.index(), i);
            assert_eq!(i, tile.grid_z() * 4 + tile.grid_x());
        }
        assert_eq!(grid.index_of(3, 2).unwrap(), 11);
        assert_eq!(grid.coords_of(11).unwrap(), (3, 2));
    }

    #[test]
    fn neighbors_are_symmetric() {
        for size in [1, 2, 5] {
            let grid = TileGrid::new(size, 1.0);
            for tile in grid.tiles() {
                for dir in Direction::ALL {
                    if let Some(other) = tile.neighbor(dir) {
                        assert_eq!(
                            grid[other].neighbor(dir.opposite()),
                            Some(tile.index()),
                            "{:?} of {}",
                            dir,
                            tile.index()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn border_tiles_have_absent_neighbors() {
        let grid = TileGrid::new(3, 1.0);
        assert_eq!(grid[0].neighbors().count(), 3);
        assert_eq!(grid[1].neighbors().count(), 5);
        assert_eq!(grid[4].neighbors().count(), 8);
        assert_eq!(grid.neighbor(0, Direction::North).unwrap(), None);
        assert_eq!(grid.neighbor(0, Direction::SouthEast).unwrap(), Some(4));
        assert_eq!(grid.neighbor(4, Direction::NorthWest).unwrap(), Some(0));

        let single = TileGrid::new(1, 1.0);
        assert_eq!(single[0].neighbors().count(), 0);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn empty_grid_is_fatal() {
        TileGrid::new(0, 1.0);
    }

    #[test]
    fn out_of_range_access_is_an_error() {
        let mut grid = TileGrid::new(2, 1.0);
        assert_eq!(
            grid.tile(4).unwrap_err(),
            EditorError::TileOutOfRange { index: 4, len: 4 }
        );
        assert!(grid.set_type(9, TileType::Traffic).is_err());
        assert!(grid.index_of(2, 0).is_err());
        assert!(grid.neighbor(7, Direction::East).is_err());
    }

    #[test]
    fn mesh_bytes_match_tile_offsets() {
        let mut grid = TileGrid::new(3, 1.0);
        grid.set_type(5, TileType::Commercial).unwrap();

        let mesh = grid.mesh_bytes();
        assert_eq!(mesh.len(), 9 * 6 * 13 * 4);

        let offset = TileGrid::tile_byte_offset(5) as usize;
        assert_eq!(offset, 5 * 312);
        assert_eq!(&mesh[offset..offset + BYTES_PER_TILE], grid.tile_bytes(5).unwrap());
    }

    #[test]
    fn dirty_tiles_are_drained_once() {
        let mut grid = TileGrid::new(3, 1.0);
        assert!(grid.take_dirty().is_empty());

        grid.set_type(7, TileType::Plants).unwrap();
        grid.set_selected(2, true).unwrap();
        assert_eq!(grid.take_dirty(), vec![2, 7]);
        assert!(grid.take_dirty().is_empty());
    }

    #[test]
    fn scatter_plants_only_fills_empty_tiles() {
        let mut grid = TileGrid::new(8, 1.0);
        grid.set_type(0, TileType::Residential).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let planted = grid.scatter_plants(&mut rng, 1.0);

        assert_eq!(planted, 63);
        assert_eq!(grid[0].tile_type(), TileType::Residential);

        let mut rng = StdRng::seed_from_u64(7);
        let mut empty = TileGrid::new(8, 1.0);
        assert_eq!(empty.scatter_plants(&mut rng, 0.0), 0);
    }
}
