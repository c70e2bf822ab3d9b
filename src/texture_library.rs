use ktx2::Reader;
use std::{
    collections::HashMap,
    fs,
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
};
use wgpu::{Device, Queue};

use crate::{
    config::ROAD_ATLAS_DIM,
    error::EditorError,
    road::{RoadVariant, EAST_BIT, NORTH_BIT, SOUTH_BIT, WEST_BIT},
    tile::TileType,
};

crate::macros::parallel_enum_values! {
    (
        TextureId,
        TEXTURE_PATH_PAIRS,
        str,
    )
    TileLayers -> "texture/tile_layers.ktx2",
}

impl TextureId {
    pub fn path(self) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(self.paired_value())
    }
}

/// Edge length of each generated layer in texels.
pub const GENERATED_LAYER_SIZE: u32 = 256;

const BYTES_PER_TEXEL: usize = 4;

/// Every layer of a tile texture array, tightly packed RGBA8 in layer order.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerImage {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<u8>,
}

impl TileLayerImage {
    pub fn layer_count() -> u32 {
        TileType::ALL.len() as u32
    }

    /// Bytes of a full array of `width` by `height` layers.
    fn packed_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_TEXEL * Self::layer_count() as usize
    }

    /// Reads an uncompressed RGBA8 array texture. Extra layers past the tile types are ignored.
    pub fn load_ktx2(path: &Path) -> Result<Self, EditorError> {
        let fail = |reason: String| EditorError::TextureLoad {
            path: path.display().to_string(),
            reason,
        };

        let contents = fs::read(path).map_err(|e| fail(e.to_string()))?;
        let reader = Reader::new(contents).map_err(|e| fail(format!("{:?}", e)))?;
        let header = reader.header();

        match header.format {
            Some(ktx2::Format::R8G8B8A8_SRGB) | Some(ktx2::Format::R8G8B8A8_UNORM) => (),
            other => return Err(fail(format!("unsupported format {:?}", other))),
        }
        if header.supercompression_scheme.is_some() {
            return Err(fail("supercompressed textures are not supported".to_string()));
        }
        if header.pixel_depth > 1 || header.face_count > 1 {
            return Err(fail("expected a 2d array texture".to_string()));
        }
        if header.layer_count < Self::layer_count() {
            return Err(fail(format!(
                "{} layers present, {} needed",
                header.layer_count,
                Self::layer_count()
            )));
        }

        let width = header.pixel_width;
        let height = header.pixel_height.max(1);
        let needed = Self::packed_len(width, height);

        let level = reader
            .levels()
            .next()
            .ok_or_else(|| fail("no mip levels".to_string()))?;
        if level.len() < needed {
            return Err(fail(format!("level holds {} bytes, {} needed", level.len(), needed)));
        }

        Ok(Self {
            width,
            height,
            layers: level[..needed].to_vec(),
        })
    }

    /// Flat colored layers with light texture, plus the road atlas on the traffic layer.
    pub fn generate(size: u32) -> Self {
        let mut image = Self {
            width: size,
            height: size,
            layers: Vec::with_capacity(Self::packed_len(size, size)),
        };

        for &tile_type in TileType::ALL {
            for y in 0..size {
                for x in 0..size {
                    let texel = match tile_type {
                        TileType::Traffic => road_atlas_texel(x, y, size),
                        TileType::Plants => plant_texel(x, y, size),
                        _ => shade(base_color(tile_type), grain(x, y)),
                    };
                    image.layers.extend_from_slice(&texel);
                }
            }
        }
        image
    }

    /// The ktx2 file when it exists and parses, generated layers otherwise.
    pub fn load_or_generate(path: &Path) -> Self {
        if !path.exists() {
            log::info!(
                "{} not found, generating tile layers",
                path.display()
            );
            return Self::generate(GENERATED_LAYER_SIZE);
        }
        match Self::load_ktx2(path) {
            Ok(image) => {
                log::info!("loaded tile layers from {}", path.display());
                image
            }
            Err(e) => {
                log::warn!("{}, generating tile layers", e);
                Self::generate(GENERATED_LAYER_SIZE)
            }
        }
    }
}

fn base_color(tile_type: TileType) -> [u8; 3] {
    match tile_type {
        TileType::None => [104, 150, 72],
        TileType::Residential => [92, 168, 96],
        TileType::Commercial => [84, 128, 200],
        TileType::Industrial => [204, 178, 72],
        TileType::Traffic => [120, 140, 96],
        TileType::Plants => [58, 110, 50],
    }
}

const ASPHALT: [u8; 3] = [64, 64, 68];
const LANE_MARK: [u8; 3] = [220, 214, 170];

// cheap deterministic noise in [0, 1]
fn grain(x: u32, y: u32) -> f32 {
    let mut h = x.wrapping_mul(0x27d4_eb2d) ^ y.wrapping_mul(0x1656_67b1);
    h ^= h >> 15;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    (h & 0xff) as f32 / 255.0
}

fn shade(color: [u8; 3], noise: f32) -> [u8; 4] {
    let factor = 0.9 + noise * 0.2;
    let c = |v: u8| (v as f32 * factor).min(255.0) as u8;
    [c(color[0]), c(color[1]), c(color[2]), 255]
}

fn plant_texel(x: u32, y: u32, size: u32) -> [u8; 4] {
    let cell = (size / 8).max(1);
    let (cx, cy) = (x % cell, y % cell);
    let half = cell as i64 / 2;
    let (dx, dy) = (cx as i64 - half, cy as i64 - half);
    if dx * dx + dy * dy <= half * half / 2 {
        shade([34, 82, 34], grain(x, y))
    } else {
        shade(base_color(TileType::Plants), grain(x, y))
    }
}

// Atlas cell (column, row) holds the variant with ordinal row * dim + column. Texel rows grow
// to the south, matching the tile uv layout.
fn road_atlas_texel(x: u32, y: u32, size: u32) -> [u8; 4] {
    let cell = (size / ROAD_ATLAS_DIM).max(1);
    let ordinal = (y / cell) * ROAD_ATLAS_DIM + x / cell;
    let background = shade(base_color(TileType::Traffic), grain(x, y));

    let variant = match RoadVariant::ALL.get(ordinal as usize) {
        Some(variant) => *variant,
        None => return background,
    };

    let (lx, ly) = (x % cell, y % cell);
    let lo = cell * 3 / 10;
    let hi = cell - lo;
    let arms = variant.arms();

    let across_ns = (lo..hi).contains(&lx);
    let across_ew = (lo..hi).contains(&ly);
    let on_road = (across_ns && across_ew)
        || (across_ns && ly < lo && arms & NORTH_BIT != 0)
        || (across_ns && ly >= hi && arms & SOUTH_BIT != 0)
        || (across_ew && lx >= hi && arms & EAST_BIT != 0)
        || (across_ew && lx < lo && arms & WEST_BIT != 0);
    if !on_road {
        return background;
    }

    let mid = cell / 2;
    let on_mark = (lx == mid && arms & (NORTH_BIT | SOUTH_BIT) != 0 && !across_ew && ly % 8 < 4)
        || (ly == mid && arms & (EAST_BIT | WEST_BIT) != 0 && !across_ns && lx % 8 < 4);
    if on_mark {
        shade(LANE_MARK, 0.5)
    } else {
        shade(ASPHALT, grain(x, y))
    }
}

/// One sampled texture array with its own view, sampler and bind group.
pub struct TextureArray {
    texture: wgpu::Texture,
    size: wgpu::Extent3d,
    bind_group: wgpu::BindGroup,
}

impl TextureArray {
    pub fn bind_group_layout(device: &Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture array bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    pub fn from_image(
        device: &Device,
        queue: &Queue,
        layout: &wgpu::BindGroupLayout,
        image: &TileLayerImage,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: TileLayerImage::layer_count(),
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tile layers"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.layers,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: NonZeroU32::new(BYTES_PER_TEXEL as u32 * image.width),
                rows_per_image: NonZeroU32::new(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("tile layers view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture array bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            texture,
            size,
            bind_group,
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn size(&self) -> wgpu::Extent3d {
        self.size
    }
}

impl Drop for TextureArray {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

pub struct TextureLibrary {
    textures: HashMap<TextureId, Arc<TextureArray>>,
}

impl TextureLibrary {
    pub fn load_all(device: &Device, queue: &Queue, layout: &wgpu::BindGroupLayout) -> Self {
        let textures = TextureId::ALL
            .iter()
            .map(|&id| {
                let image = TileLayerImage::load_or_generate(&id.path());
                let array = TextureArray::from_image(device, queue, layout, &image);
                log::debug!("texture {:?} is {:?}", id, array.size());
                (id, Arc::new(array))
            })
            .collect();
        Self { textures }
    }

    pub fn get(&self, id: TextureId) -> &TextureArray {
        self.textures
            .get(&id)
            .expect("tried to access texture with bad id")
    }
}
