mod common_component;
mod config;
mod data_types;
mod editor_system;
mod error;
mod game;
mod height_editor;
mod input;
mod macros;
mod picking;
mod region;
mod render_system;
mod road;
mod selection;
mod shader_library;
mod texture_library;
mod tile;
mod tile_grid;
mod time;
mod util;

use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("wgpu_core", LevelFilter::Warn)
        .with_module_level("wgpu_hal", LevelFilter::Warn)
        .with_module_level("naga", LevelFilter::Warn)
        .env()
        .init()?;

    game::run()
}
