use crate::config::DEFAULT_HEIGHT_STEP;
use crate::error::EditorError;
use crate::tile::Direction;
use crate::tile_grid::TileGrid;

/// Raises and lowers whole tiles while keeping every shared mesh corner in agreement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightEditor {
    step: f32,
}

impl Default for HeightEditor {
    fn default() -> Self {
        Self::new(DEFAULT_HEIGHT_STEP)
    }
}

impl HeightEditor {
    pub fn new(step: f32) -> Self {
        Self { step }
    }

    pub fn raise(&self, grid: &mut TileGrid, index: usize) -> Result<(), EditorError> {
        self.shift(grid, index, self.step)
    }

    pub fn lower(&self, grid: &mut TileGrid, index: usize) -> Result<(), EditorError> {
        self.shift(grid, index, -self.step)
    }

    fn shift(&self, grid: &mut TileGrid, index: usize, dy: f32) -> Result<(), EditorError> {
        let tile = grid.tile_mut(index)?;
        tile.shift_height(dy);
        tile.recompute_normal();
        log::debug!(
            "tile {} ({}, {}) moved by {} to {:?}",
            index,
            tile.grid_x(),
            tile.grid_z(),
            dy,
            tile.corner_heights()
        );

        self.propagate(grid, index);
        Ok(())
    }

    /// Copies the edited tile's corners onto every neighbor sharing them. Orthogonal
    /// neighbors share an edge, diagonal neighbors a single corner. The source is never
    /// averaged, so a raise followed by a lower restores the neighbors bit for bit.
    fn propagate(&self, grid: &mut TileGrid, index: usize) {
        let source = grid[index].clone();

        for dir in Direction::ORTHOGONAL.iter().chain(Direction::DIAGONAL.iter()) {
            let neighbor = match source.neighbor(*dir) {
                Some(neighbor) => neighbor,
                None => continue,
            };

            let target = &mut grid[neighbor];
            for (own, theirs) in dir.shared_corners() {
                target.set_corner_height(*theirs, source.corner_height(*own));
            }
            target.recompute_normal();
        }
    }
}
