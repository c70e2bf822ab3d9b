use bevy_ecs::{
    schedule::{Schedule, Stage, SystemStage},
    world::World,
};
use rand::{rngs::StdRng, SeedableRng};
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use crate::{
    common_component::{Camera, CameraRig, MainCamera},
    config::{EditorSettings, TILE_SIZE, WINDOW_TITLE},
    editor_system::{
        apply_edit_commits, camera_control, clear_input_edges, drive_selection,
        pick_hovered_tile, push_dirty_tiles, update_status, EditQueue, EditorTools, HoveredTile,
        StatusLine,
    },
    input::PointerInput,
    picking::PickingIndex,
    region::RegionSummary,
    render_system::{self, RenderState},
    selection::SelectionController,
    tile_grid::TileGrid,
    time::{advance_clock, update_criteria, TimeResource},
};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = EditorSettings::from_env();
    log::info!("starting with {:?}", settings);

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(LogicalSize::new(1280.0, 800.0))
        .build(&event_loop)?;

    let mut game = Game::new(window, settings);

    event_loop.run(move |event, _, control_flow| {
        *control_flow = game.handle_event(&event);
    });
}

struct Game {
    window: Window,
    world: World,
    input_sch: Schedule,
    update_sch: Schedule,
    frame_sch: Schedule,
}

impl Game {
    fn new(window: Window, settings: EditorSettings) -> Self {
        let mut world = World::new();

        let mut grid = TileGrid::new(settings.grid_size, TILE_SIZE);
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let planted = grid.scatter_plants(&mut rng, settings.plant_density);
        log::info!("scattered {} plants", planted);

        let render_state = RenderState::init(&window, &grid);
        // the initial mesh upload already holds every tile
        grid.take_dirty();

        world.insert_resource(render_state);
        world.insert_resource(PickingIndex::new(grid.len()));
        world.insert_resource(TimeResource::new(settings.update_dt()));
        world.insert_resource(PointerInput::default());
        world.insert_resource(HoveredTile::default());
        world.insert_resource(SelectionController::default());
        world.insert_resource(EditQueue::default());
        world.insert_resource(EditorTools::new(&settings));
        world.insert_resource(RegionSummary::default());
        world.insert_resource(StatusLine::default());

        let size = window.inner_size();
        let mut camera = Camera::new(1.0);
        camera.set_aspect(size.width, size.height);
        let rig = CameraRig::overlooking(grid.size() as f32 * grid.tile_size());
        world
            .spawn()
            .insert(rig.transform())
            .insert(camera)
            .insert(rig)
            .insert(MainCamera);

        world.insert_resource(grid);
        world.insert_resource(settings);

        let mut input_sch = Schedule::default();
        let mut update_sch = Schedule::default();
        let mut frame_sch = Schedule::default();

        input_sch
            .add_stage("camera", SystemStage::single_threaded().with_system(camera_control))
            .add_stage(
                "pick",
                SystemStage::single_threaded().with_system(pick_hovered_tile::<RenderState>),
            )
            .add_stage("select", SystemStage::single_threaded().with_system(drive_selection))
            .add_stage(
                "upload",
                SystemStage::single_threaded().with_system(push_dirty_tiles::<RenderState>),
            )
            .add_stage(
                "finish",
                SystemStage::single_threaded()
                    .with_system(update_status)
                    .with_system(clear_input_edges),
            );

        update_sch
            .add_stage("clock", SystemStage::single_threaded().with_system(advance_clock))
            .add_stage(
                "fixed",
                SystemStage::single_threaded()
                    .with_run_criteria(update_criteria)
                    .with_system(apply_edit_commits),
            )
            .add_stage(
                "upload",
                SystemStage::single_threaded().with_system(push_dirty_tiles::<RenderState>),
            )
            .add_stage("status", SystemStage::single_threaded().with_system(update_status));

        frame_sch.add_stage(
            "draw",
            SystemStage::single_threaded().with_system(render_system::render),
        );

        Self {
            window,
            world,
            input_sch,
            update_sch,
            frame_sch,
        }
    }

    fn do_input(&mut self) {
        self.input_sch.run(&mut self.world);
    }

    fn do_update(&mut self) {
        self.update_sch.run(&mut self.world);
    }

    fn do_frame(&mut self) {
        self.frame_sch.run(&mut self.world);
    }

    fn sync_title(&mut self) {
        let mut status = self.world.resource_mut::<StatusLine>();
        if status.changed {
            self.window.set_title(&status.text);
            status.changed = false;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.world
            .resource_mut::<RenderState>()
            .resize(width, height);

        let mut cameras = self.world.query::<&mut Camera>();
        for mut camera in cameras.iter_mut(&mut self.world) {
            camera.set_aspect(width, height);
        }
        // the tile under the cursor moved with the projection
        self.world.resource_mut::<PointerInput>().moved = true;
        self.window.request_redraw();
    }

    fn handle_event<E>(&mut self, event: &Event<E>) -> ControlFlow {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.window.id() => {
                if self
                    .world
                    .resource_mut::<PointerInput>()
                    .handle_window_event(event)
                {
                    return ControlFlow::Poll;
                }
                match event {
                    WindowEvent::Resized(size) => self.resize(size.width, size.height),
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.resize(new_inner_size.width, new_inner_size.height)
                    }
                    WindowEvent::CloseRequested => return ControlFlow::Exit,
                    _ => (),
                }
            }
            Event::MainEventsCleared => {
                self.do_input();
                self.do_update();
                self.sync_title();
                self.window.request_redraw();
            }
            Event::RedrawRequested(window_id) if *window_id == self.window.id() => {
                self.do_frame()
            }
            _ => (),
        }

        ControlFlow::Poll
    }
}
