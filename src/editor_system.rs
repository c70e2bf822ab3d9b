use bevy_ecs::{
    prelude::With,
    system::{Query, Res, ResMut},
};

use crate::common_component::{Camera, CameraRig, MainCamera, Transform};
use crate::config::{EditorSettings, WINDOW_TITLE};
use crate::height_editor::HeightEditor;
use crate::input::PointerInput;
use crate::picking::{IdTarget, PickingIndex};
use crate::region::{RegionAnalyzer, RegionSummary};
use crate::road::RoadAutotiler;
use crate::selection::{EditAction, EditCommit, SelectionController, TileReport};
use crate::tile_grid::TileGrid;

/// Receives tile vertex data for the shared mesh buffer.
pub trait MeshSink {
    fn write_tile(&mut self, index: usize, bytes: &[u8]);
}

#[derive(Debug, Default)]
pub struct EditorTools {
    pub heights: HeightEditor,
    pub roads: RoadAutotiler,
    pub regions: RegionAnalyzer,
}

impl EditorTools {
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            heights: HeightEditor::new(settings.height_step),
            ..Self::default()
        }
    }
}

/// Commits released during input, applied by the next fixed update.
#[derive(Debug, Default)]
pub struct EditQueue {
    pub commits: Vec<EditCommit>,
}

/// Tile under the cursor as of the last id pass. `stale` is set when an edit moved the
/// mesh under a still cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoveredTile {
    pub index: Option<usize>,
    pub stale: bool,
}

#[derive(Debug, Default)]
pub struct StatusLine {
    pub text: String,
    pub changed: bool,
}

pub fn camera_control(
    input: Res<PointerInput>,
    mut cameras: Query<(&mut CameraRig, &mut Transform), With<MainCamera>>,
) {
    if !input.has_camera_motion() {
        return;
    }
    for (mut rig, mut transform) in cameras.iter_mut() {
        rig.pan(input.pan.0, input.pan.1);
        rig.zoom(input.zoom);
        rig.orbit(input.orbit);
        *transform = rig.transform();
    }
}

/// One id pass and one readback, only when the cursor, the camera or the mesh moved since
/// the last one.
pub fn pick_hovered_tile<T: IdTarget + Send + Sync + 'static>(
    mut target: ResMut<T>,
    picking: Res<PickingIndex>,
    input: Res<PointerInput>,
    camera: Query<(&Camera, &Transform, &MainCamera)>,
    mut hovered: ResMut<HoveredTile>,
) {
    if !input.has_pointer_activity() && !input.has_camera_motion() && !hovered.stale {
        return;
    }

    hovered.stale = false;
    hovered.index = match (input.cursor, camera.get_single()) {
        (Some(cursor), Ok((cam, cam_pos, _))) => {
            picking.pick(&mut *target, &cam.view_projection(cam_pos), cursor)
        }
        (None, _) => None,
        (Some(_), Err(e)) => {
            log::error!("failed to access main camera entity for picking: {}", e);
            None
        }
    };
}

pub fn drive_selection(
    input: Res<PointerInput>,
    hovered: Res<HoveredTile>,
    mut grid: ResMut<TileGrid>,
    mut selection: ResMut<SelectionController>,
    mut queue: ResMut<EditQueue>,
) {
    if let Some(action) = input.requested_action {
        selection.set_action(&mut grid, action);
    }

    if input.pressed {
        selection.press(&mut grid, hovered.index);
        if selection.action() == EditAction::Inspect {
            if let Some(index) = hovered.index {
                match TileReport::of(&grid, index) {
                    Ok(report) => log::info!("{}", report),
                    Err(e) => log::warn!("inspect failed: {}", e),
                }
            }
        }
    } else if input.moved || selection.hovered() != hovered.index {
        selection.cursor_moved(&mut grid, hovered.index);
    }

    if input.released {
        if let Some(commit) = selection.release(&mut grid, hovered.index) {
            log::debug!("queued {} over {} tiles", commit.action.label(), commit.targets.len());
            queue.commits.push(commit);
        }
    }
}

/// Fixed update step. A full region rescan follows any commit that changed a tile type.
pub fn apply_edit_commits(
    mut queue: ResMut<EditQueue>,
    mut grid: ResMut<TileGrid>,
    mut tools: ResMut<EditorTools>,
    mut summary: ResMut<RegionSummary>,
    mut hovered: ResMut<HoveredTile>,
) {
    if queue.commits.is_empty() {
        return;
    }

    let tools = &mut *tools;
    let mut types_changed = false;
    for commit in queue.commits.drain(..) {
        let outcome = commit.apply(&mut grid, &tools.heights, &tools.roads);
        types_changed |= outcome.types_changed;
        if outcome.edited > 0 {
            hovered.stale = true;
        }
    }

    if types_changed {
        *summary = tools.regions.recompute(&mut grid);
    }
}

/// Each dirty tile is its own buffer write.
pub fn push_dirty_tiles<S: MeshSink + Send + Sync + 'static>(
    mut sink: ResMut<S>,
    mut grid: ResMut<TileGrid>,
) {
    let dirty = grid.take_dirty();
    if !dirty.is_empty() {
        log::debug!("uploading {} dirty tiles", dirty.len());
    }
    for index in dirty {
        match grid.tile_bytes(index) {
            Ok(bytes) => sink.write_tile(index, bytes),
            Err(e) => log::warn!("dropping tile upload: {}", e),
        }
    }
}

pub fn update_status(
    selection: Res<SelectionController>,
    grid: Res<TileGrid>,
    summary: Res<RegionSummary>,
    mut status: ResMut<StatusLine>,
) {
    let text = status_text(&selection, &grid, &summary);
    if text != status.text {
        status.text = text;
        status.changed = true;
    }
}

fn status_text(selection: &SelectionController, grid: &TileGrid, summary: &RegionSummary) -> String {
    let mut text = format!("{} | {}", WINDOW_TITLE, selection.action().label());

    if let Some(Ok(tile)) = selection.hovered().map(|index| grid.tile(index)) {
        text += &format!(" | hover ({}, {})", tile.grid_x(), tile.grid_z());
    }
    text += &format!(" | {} regions", summary.region_count());
    if let Some(largest) = summary.largest() {
        text += &format!(" (largest {})", largest);
    }
    if let Some(Ok(report)) = selection.inspected().map(|index| TileReport::of(grid, index)) {
        text += &format!(" | {}", report);
    }
    text
}

pub fn clear_input_edges(mut input: ResMut<PointerInput>) {
    input.end_step();
}

#[cfg(test)]
mod tests {
    use super::*;

    use bevy_ecs::{
        schedule::{Stage, SystemStage},
        world::World,
    };
    use nalgebra::Matrix4;

    use crate::picking::{encode_id, quantize, ImageOrigin};
    use crate::tile::TileType;

    struct FakeTarget {
        under_cursor: Option<usize>,
        passes: usize,
    }

    impl IdTarget for FakeTarget {
        fn viewport(&self) -> (u32, u32) {
            (64, 64)
        }

        fn image_origin(&self) -> ImageOrigin {
            ImageOrigin::TopLeft
        }

        fn render_id_pass(&mut self, _view_projection: &Matrix4<f32>) {
            self.passes += 1;
        }

        fn read_pixel(&mut self, _x: u32, _row: u32) -> [u8; 4] {
            match self.under_cursor {
                Some(index) => quantize(encode_id(index)),
                None => [255; 4],
            }
        }
    }

    #[derive(Default)]
    struct FakeSink {
        writes: Vec<(usize, usize)>,
    }

    impl MeshSink for FakeSink {
        fn write_tile(&mut self, index: usize, bytes: &[u8]) {
            self.writes.push((index, bytes.len()));
        }
    }

    fn editor_world(size: usize) -> World {
        let mut world = World::new();
        let grid = TileGrid::new(size, 1.0);
        world.insert_resource(PickingIndex::new(grid.len()));
        world.insert_resource(grid);
        world.insert_resource(SelectionController::default());
        world.insert_resource(PointerInput::default());
        world.insert_resource(HoveredTile::default());
        world.insert_resource(EditQueue::default());
        world.insert_resource(EditorTools::default());
        world.insert_resource(RegionSummary::default());
        world.insert_resource(StatusLine::default());

        let rig = CameraRig::overlooking(size as f32);
        world
            .spawn()
            .insert(rig.transform())
            .insert(Camera::new(1.0))
            .insert(rig)
            .insert(MainCamera);
        world
    }

    fn step(world: &mut World, input: PointerInput, hovered: Option<usize>) {
        *world.resource_mut::<PointerInput>() = input;
        world.resource_mut::<HoveredTile>().index = hovered;
        SystemStage::single_threaded()
            .with_system(drive_selection)
            .run(world);
    }

    fn at(size: usize, x: usize, z: usize) -> usize {
        z * size + x
    }

    #[test]
    fn drag_commits_on_release_and_applies_in_update() {
        let mut world = editor_world(4);
        step(
            &mut world,
            PointerInput {
                requested_action: Some(EditAction::Residential),
                pressed: true,
                ..Default::default()
            },
            Some(at(4, 0, 0)),
        );
        step(&mut world, PointerInput { moved: true, ..Default::default() }, Some(at(4, 1, 1)));
        assert_eq!(world.resource::<SelectionController>().selected().len(), 4);

        step(&mut world, PointerInput { released: true, ..Default::default() }, Some(at(4, 1, 1)));
        assert_eq!(world.resource::<EditQueue>().commits.len(), 1);
        // nothing changes until the update phase
        assert_eq!(world.resource::<TileGrid>()[0].tile_type(), TileType::None);

        SystemStage::single_threaded()
            .with_system(apply_edit_commits)
            .run(&mut world);

        let grid = world.resource::<TileGrid>();
        for index in [at(4, 0, 0), at(4, 1, 0), at(4, 0, 1), at(4, 1, 1)] {
            assert_eq!(grid[index].tile_type(), TileType::Residential);
            assert!(!grid[index].is_selected());
        }
        assert!(world.resource::<EditQueue>().commits.is_empty());
        assert_eq!(world.resource::<RegionSummary>().sizes, vec![4]);
    }

    #[test]
    fn height_commits_skip_region_scan() {
        let mut world = editor_world(3);
        world.resource_mut::<RegionSummary>().sizes = vec![7];
        world.resource_mut::<EditQueue>().commits.push(EditCommit {
            action: EditAction::Raise,
            targets: vec![4],
        });

        SystemStage::single_threaded()
            .with_system(apply_edit_commits)
            .run(&mut world);

        assert_eq!(world.resource::<TileGrid>()[4].corner_heights(), [0.5; 4]);
        assert_eq!(world.resource::<RegionSummary>().sizes, vec![7]);
    }

    #[test]
    fn picking_runs_only_on_activity() {
        let mut world = editor_world(4);
        world.insert_resource(FakeTarget {
            under_cursor: Some(9),
            passes: 0,
        });
        let mut stage = SystemStage::single_threaded().with_system(pick_hovered_tile::<FakeTarget>);

        world.resource_mut::<PointerInput>().cursor = Some((10.0, 10.0));
        stage.run(&mut world);
        assert_eq!(world.resource::<FakeTarget>().passes, 0);
        assert_eq!(world.resource::<HoveredTile>().index, None);

        world.resource_mut::<PointerInput>().moved = true;
        stage.run(&mut world);
        assert_eq!(world.resource::<FakeTarget>().passes, 1);
        assert_eq!(world.resource::<HoveredTile>().index, Some(9));

        world.resource_mut::<FakeTarget>().under_cursor = None;
        stage.run(&mut world);
        assert_eq!(world.resource::<HoveredTile>().index, None);
    }

    #[test]
    fn applied_edits_repick_under_a_still_cursor() {
        let mut world = editor_world(4);
        world.insert_resource(FakeTarget {
            under_cursor: Some(5),
            passes: 0,
        });
        world.resource_mut::<PointerInput>().cursor = Some((10.0, 10.0));
        world.resource_mut::<HoveredTile>().index = Some(9);
        world.resource_mut::<EditQueue>().commits.push(EditCommit {
            action: EditAction::Raise,
            targets: vec![9],
        });

        SystemStage::single_threaded()
            .with_system(apply_edit_commits)
            .run(&mut world);
        assert!(world.resource::<HoveredTile>().stale);

        let mut pick_stage =
            SystemStage::single_threaded().with_system(pick_hovered_tile::<FakeTarget>);
        let mut select_stage = SystemStage::single_threaded().with_system(drive_selection);
        pick_stage.run(&mut world);
        select_stage.run(&mut world);

        assert_eq!(world.resource::<FakeTarget>().passes, 1);
        assert_eq!(
            *world.resource::<HoveredTile>(),
            HoveredTile {
                index: Some(5),
                stale: false
            }
        );
        assert_eq!(world.resource::<SelectionController>().hovered(), Some(5));

        pick_stage.run(&mut world);
        assert_eq!(world.resource::<FakeTarget>().passes, 1);
    }

    #[test]
    fn rejected_edits_do_not_repick() {
        let mut world = editor_world(3);
        world.resource_mut::<TileGrid>().set_type(4, TileType::Plants).unwrap();
        world.resource_mut::<EditQueue>().commits.push(EditCommit {
            action: EditAction::Raise,
            targets: vec![4],
        });

        SystemStage::single_threaded()
            .with_system(apply_edit_commits)
            .run(&mut world);
        assert!(!world.resource::<HoveredTile>().stale);
    }

    #[test]
    fn dirty_tiles_are_pushed_individually() {
        let mut world = editor_world(3);
        world.insert_resource(FakeSink::default());
        world.resource_mut::<TileGrid>().take_dirty();
        world
            .resource_mut::<TileGrid>()
            .set_type(2, TileType::Plants)
            .unwrap();
        world
            .resource_mut::<TileGrid>()
            .set_selected(7, true)
            .unwrap();

        let mut stage = SystemStage::single_threaded().with_system(push_dirty_tiles::<FakeSink>);
        stage.run(&mut world);
        assert_eq!(world.resource::<FakeSink>().writes, vec![(2, 312), (7, 312)]);

        stage.run(&mut world);
        assert_eq!(world.resource::<FakeSink>().writes.len(), 2);
    }

    #[test]
    fn camera_motion_moves_the_rig() {
        let mut world = editor_world(8);
        world.resource_mut::<PointerInput>().zoom = 2.0;
        let before = world
            .query::<&CameraRig>()
            .iter(&world)
            .next()
            .unwrap()
            .distance;

        SystemStage::single_threaded()
            .with_system(camera_control)
            .run(&mut world);

        let mut query = world.query::<(&CameraRig, &Transform)>();
        let (rig, transform) = query.iter(&world).next().unwrap();
        assert!(rig.distance < before);
        let eye = transform.isometry.translation.vector;
        assert!((eye - rig.eye().coords).norm() < 1e-4);
    }

    #[test]
    fn status_flags_changes_once() {
        let mut world = editor_world(3);
        let mut stage = SystemStage::single_threaded().with_system(update_status);

        stage.run(&mut world);
        assert!(world.resource::<StatusLine>().changed);
        assert!(world.resource::<StatusLine>().text.contains("raise"));
        world.resource_mut::<StatusLine>().changed = false;

        stage.run(&mut world);
        assert!(!world.resource::<StatusLine>().changed);

        step(
            &mut world,
            PointerInput {
                requested_action: Some(EditAction::Inspect),
                pressed: true,
                ..Default::default()
            },
            Some(4),
        );
        stage.run(&mut world);
        let status = world.resource::<StatusLine>();
        assert!(status.changed);
        assert!(status.text.contains("tile (1, 1) None"));
    }
}
