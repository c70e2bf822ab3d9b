use std::fmt;

use crate::error::EditorError;
use crate::height_editor::HeightEditor;
use crate::road::{RoadAutotiler, RoadVariant};
use crate::tile::{Corner, TileType};
use crate::tile_grid::TileGrid;

crate::macros::parallel_enum_values! {
    (
        EditAction,
        EDIT_ACTION_LABELS,
        str,
    )
    Inspect -> "inspect",
    Raise -> "raise",
    Lower -> "lower",
    Residential -> "zone residential",
    Commercial -> "zone commercial",
    Industrial -> "zone industrial",
    Road -> "build road",
    Plant -> "plant",
    Demolish -> "demolish",
}

impl Default for EditAction {
    fn default() -> Self {
        EditAction::Raise
    }
}

impl EditAction {
    pub fn label(self) -> &'static str {
        self.paired_value()
    }

    /// Actions bound to the number keys, `1` being the first.
    pub fn from_digit(digit: u32) -> Option<Self> {
        let slot = (digit as usize).checked_sub(1)?;
        Self::ALL.get(slot).copied()
    }

    /// Type a tile takes when this action is applied to it.
    pub fn target_type(self) -> Option<TileType> {
        match self {
            EditAction::Residential => Some(TileType::Residential),
            EditAction::Commercial => Some(TileType::Commercial),
            EditAction::Industrial => Some(TileType::Industrial),
            EditAction::Road => Some(TileType::Traffic),
            EditAction::Plant => Some(TileType::Plants),
            EditAction::Demolish => Some(TileType::None),
            EditAction::Inspect | EditAction::Raise | EditAction::Lower => None,
        }
    }

    /// Whether a tile of `tile_type` can be selected, and so edited, by this action.
    /// Only demolition works on occupied tiles.
    pub fn selects(self, tile_type: TileType) -> bool {
        match self {
            EditAction::Inspect => false,
            EditAction::Demolish => tile_type.is_occupied(),
            _ => !tile_type.is_occupied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { start: usize },
}

/// A finished gesture waiting for the update phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCommit {
    pub action: EditAction,
    pub targets: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub edited: usize,
    pub types_changed: bool,
}

impl EditCommit {
    /// Applies the action to every target that still accepts it. Targets that went out of
    /// range or became occupied since the gesture are skipped silently.
    pub fn apply(
        &self,
        grid: &mut TileGrid,
        heights: &HeightEditor,
        roads: &RoadAutotiler,
    ) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();

        for &index in &self.targets {
            let current = match grid.tile(index) {
                Ok(tile) => tile.tile_type(),
                Err(e) => {
                    log::warn!("skipping edit: {}", e);
                    continue;
                }
            };
            if !self.action.selects(current) {
                continue;
            }

            let applied = match (self.action, self.action.target_type()) {
                (EditAction::Raise, _) => heights.raise(grid, index),
                (EditAction::Lower, _) => heights.lower(grid, index),
                (_, Some(tile_type)) => {
                    let result = grid.set_type(index, tile_type);
                    if result.is_ok() {
                        outcome.types_changed = true;
                        if tile_type == TileType::Traffic || current == TileType::Traffic {
                            roads.refresh_around(grid, index);
                        }
                    }
                    result
                }
                (_, None) => continue,
            };

            match applied {
                Ok(()) => outcome.edited += 1,
                Err(e) => log::warn!("skipping edit: {}", e),
            }
        }

        log::info!(
            "{} applied to {} of {} tiles",
            self.action.label(),
            outcome.edited,
            self.targets.len()
        );
        outcome
    }
}

/// Inspectable state of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileReport {
    pub index: usize,
    pub grid_x: usize,
    pub grid_z: usize,
    pub tile_type: TileType,
    pub region: Option<u32>,
    pub road: Option<RoadVariant>,
    pub heights: [f32; 4],
}

impl TileReport {
    pub fn of(grid: &TileGrid, index: usize) -> Result<Self, EditorError> {
        let tile = grid.tile(index)?;
        Ok(Self {
            index,
            grid_x: tile.grid_x(),
            grid_z: tile.grid_z(),
            tile_type: tile.tile_type(),
            region: tile.region(),
            road: tile.road_variant(),
            heights: tile.corner_heights(),
        })
    }

    pub fn mean_height(&self) -> f32 {
        self.heights.iter().sum::<f32>() / Corner::ALL.len() as f32
    }
}

impl fmt::Display for TileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tile ({}, {}) {:?} h={:.2}",
            self.grid_x,
            self.grid_z,
            self.tile_type,
            self.mean_height()
        )?;
        if let Some(region) = self.region {
            write!(f, " region {}", region)?;
        }
        if let Some(road) = self.road {
            write!(f, " {:?}", road)?;
        }
        Ok(())
    }
}

/// Turns press, move and release over picked tiles into a rectangular selection and, on
/// release, an edit commit.
#[derive(Debug, Clone)]
pub struct SelectionController {
    state: DragState,
    action: EditAction,
    hovered: Option<usize>,
    inspected: Option<usize>,
    selected: Vec<usize>,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self {
            state: DragState::Idle,
            action: EditAction::default(),
            hovered: None,
            inspected: None,
            selected: Vec::new(),
        }
    }
}

impl SelectionController {
    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn action(&self) -> EditAction {
        self.action
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn inspected(&self) -> Option<usize> {
        self.inspected
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    /// Switching action mid-drag re-filters the current rectangle.
    pub fn set_action(&mut self, grid: &mut TileGrid, action: EditAction) {
        if action == self.action {
            return;
        }
        self.action = action;
        log::info!("edit action: {}", action.label());

        if let DragState::Dragging { start } = self.state {
            if action == EditAction::Inspect {
                self.clear_selection(grid);
                self.state = DragState::Idle;
            } else {
                let current = self.hovered.unwrap_or(start);
                self.select_rect(grid, start, current);
            }
        }
    }

    pub fn press(&mut self, grid: &mut TileGrid, hovered: Option<usize>) {
        self.hovered = hovered;
        let index = match (self.state, hovered) {
            (DragState::Idle, Some(index)) => index,
            _ => return,
        };

        if self.action == EditAction::Inspect {
            self.inspected = Some(index);
            return;
        }

        self.state = DragState::Dragging { start: index };
        self.select_rect(grid, index, index);
    }

    /// Off-grid hovers keep the last rectangle.
    pub fn cursor_moved(&mut self, grid: &mut TileGrid, hovered: Option<usize>) {
        self.hovered = hovered;
        if let (DragState::Dragging { start }, Some(current)) = (self.state, hovered) {
            self.select_rect(grid, start, current);
        }
    }

    pub fn release(&mut self, grid: &mut TileGrid, hovered: Option<usize>) -> Option<EditCommit> {
        self.cursor_moved(grid, hovered);
        if self.state == DragState::Idle {
            return None;
        }

        let targets = if self.selected.is_empty() {
            hovered.into_iter().collect()
        } else {
            self.selected.clone()
        };

        self.clear_selection(grid);
        self.state = DragState::Idle;

        if targets.is_empty() {
            return None;
        }
        Some(EditCommit {
            action: self.action,
            targets,
        })
    }

    fn select_rect(&mut self, grid: &mut TileGrid, from: usize, to: usize) {
        self.clear_selection(grid);

        let (Ok((x0, z0)), Ok((x1, z1))) = (grid.coords_of(from), grid.coords_of(to)) else {
            return;
        };
        let last = grid.size() - 1;
        let (min_x, max_x) = (x0.min(x1), x0.max(x1).min(last));
        let (min_z, max_z) = (z0.min(z1), z0.max(z1).min(last));

        for z in min_z..=max_z {
            for x in min_x..=max_x {
                let Ok(index) = grid.index_of(x, z) else {
                    continue;
                };
                if self.action.selects(grid[index].tile_type()) {
                    grid[index].set_selected(true);
                    self.selected.push(index);
                }
            }
        }
    }

    fn clear_selection(&mut self, grid: &mut TileGrid) {
        for index in self.selected.drain(..) {
            if let Ok(tile) = grid.tile_mut(index) {
                tile.set_selected(false);
            }
        }
    }
}
