use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::{Device, ShaderModule};

pub type ShaderId = usize;

pub const SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shader");

pub fn shader_path(file_name: &str) -> PathBuf {
    Path::new(SHADER_DIR).join(file_name)
}

#[derive(Debug, Clone)]
pub struct Shader {
    name: String,

    vertex_entry: String,
    fragment_entry: String,

    handle: Arc<ShaderModule>,
}

impl Shader {
    pub fn handle(&self) -> &ShaderModule {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }
}

fn read_source(source_path: &Path) -> String {
    match fs::read_to_string(source_path) {
        Ok(source) => source,
        Err(why) => panic!(
            "failed to read shader file {}: {}",
            source_path.display(),
            why
        ),
    }
}

pub struct ShaderBuilder {
    name: String,
    source_path: PathBuf,

    vertex_entry: String,
    fragment_entry: String,
}

impl ShaderBuilder {
    pub fn new(source_path: &Path) -> Self {
        let name = source_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("shader")
            .to_string();
        Self {
            name,
            source_path: source_path.to_owned(),
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn build(self, device: &Device) -> Shader {
        let ShaderBuilder {
            name,
            source_path,
            vertex_entry,
            fragment_entry,
        } = self;

        let source = read_source(&source_path);
        let handle = Arc::new(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name.as_str()),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        }));
        log::debug!("compiled shader {}", name);

        Shader {
            name,
            vertex_entry,
            fragment_entry,
            handle,
        }
    }
}

#[derive(Default)]
pub struct ShaderLibrary {
    shaders: Vec<Shader>,
}

impl ShaderLibrary {
    pub fn get(&self, id: ShaderId) -> &Shader {
        self.shaders
            .get(id)
            .expect("tried to access shader with bad id")
    }
}

#[derive(Default)]
pub struct ShaderLibraryBuilder {
    builders: Vec<ShaderBuilder>,
}

impl ShaderLibraryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // the id is the index in the library, so it has to be handed back before building
    pub fn add_builder(&mut self, builder: ShaderBuilder) -> ShaderId {
        self.builders.push(builder);
        self.builders.len() - 1
    }

    pub fn build(self, device: &Device) -> ShaderLibrary {
        ShaderLibrary {
            shaders: self.builders.into_iter().map(|b| b.build(device)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_file_name_and_wgsl_entries() {
        let builder = ShaderBuilder::new(&shader_path("terrain.wgsl"));
        assert_eq!(builder.name, "terrain.wgsl");
        assert_eq!(builder.vertex_entry, "vs_main");
        assert_eq!(builder.fragment_entry, "fs_main");

        let builder = builder.name("terrain");
        assert_eq!(builder.name, "terrain");
    }

    #[test]
    fn library_ids_follow_insertion_order() {
        let mut builder = ShaderLibraryBuilder::new();
        let terrain = builder.add_builder(ShaderBuilder::new(&shader_path("terrain.wgsl")));
        let id = builder.add_builder(ShaderBuilder::new(&shader_path("id.wgsl")).name("tile id"));
        assert_eq!((terrain, id), (0, 1));
    }

    #[test]
    fn shader_sources_declare_their_entry_points() {
        for file in ["terrain.wgsl", "id.wgsl"] {
            let source = read_source(&shader_path(file));
            assert!(source.contains("fn vs_main"), "{} lacks vs_main", file);
            assert!(source.contains("fn fs_main"), "{} lacks fs_main", file);
        }
    }
}
