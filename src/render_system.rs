use std::num::NonZeroU32;
use std::sync::mpsc;

use bevy_ecs::system::{Query, ResMut};
use nalgebra::{Matrix4, Vector4};
use wgpu::{util::DeviceExt, Adapter, Device, Instance, Queue, Surface};

use winit::window::Window;

use crate::common_component::{Camera, MainCamera, Transform};
use crate::data_types::{CameraUniform, TileVertex};
use crate::editor_system::MeshSink;
use crate::picking::{IdTarget, ImageOrigin};
use crate::shader_library::{shader_path, ShaderBuilder, ShaderLibraryBuilder};
use crate::texture_library::{TextureArray, TextureId, TextureLibrary};
use crate::tile_grid::TileGrid;
use crate::util::{padded_bytes_per_row, BlockOn};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const ID_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.1,
    b: 0.13,
    a: 1.0,
};

// Render System
pub fn render(mut state: ResMut<RenderState>, camera: Query<(&Camera, &Transform, &MainCamera)>) {
    match camera.get_single() {
        Ok((cam, cam_pos, _)) => {
            let view_projection = cam.view_projection(cam_pos);
            state.render(&view_projection, eye_position(cam_pos));
        }
        Err(e) => log::error!("failed to access main camera entity for render call: {}", e),
    }
}

fn eye_position(transform: &Transform) -> Vector4<f32> {
    let eye = transform.isometry.translation.vector;
    Vector4::new(eye.x, eye.y, eye.z, 1.0)
}

struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
        }
    }
}

/// Off-screen id image and its depth buffer, sized to the window.
struct IdBuffers {
    color: RenderTarget,
    depth: RenderTarget,
}

impl IdBuffers {
    fn new(device: &Device, width: u32, height: u32) -> Self {
        let color = RenderTarget::new(
            device,
            "id target",
            width,
            height,
            ID_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let depth = RenderTarget::new(
            device,
            "id depth",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        Self { color, depth }
    }
}

pub struct RenderState {
    _instance: Instance,
    surface: Surface,
    surface_config: wgpu::SurfaceConfiguration,
    _adapter: Adapter,
    device: Device,
    queue: Queue,

    render_pipeline: wgpu::RenderPipeline,
    id_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    depth_target: RenderTarget,
    id_buffers: IdBuffers,
    readback_buffer: wgpu::Buffer,

    texture_library: TextureLibrary,
}

impl RenderState {
    pub fn init(window: &Window, grid: &TileGrid) -> Self {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(&window) };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .block_on()
            .expect("failed to find appropriate adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                },
                None,
            )
            .block_on()
            .expect("failed to create appropriate device");
        log::info!("rendering with {:?}", adapter.get_info());

        let mut builder = ShaderLibraryBuilder::new();
        let terrain_shader_id =
            builder.add_builder(ShaderBuilder::new(&shader_path("terrain.wgsl")).name("terrain"));
        let id_shader_id =
            builder.add_builder(ShaderBuilder::new(&shader_path("id.wgsl")).name("tile id"));
        let shader_library = builder.build(&device);
        let terrain_shader = shader_library.get(terrain_shader_id);
        let id_shader = shader_library.get(id_shader_id);

        let swapchain_format = *surface
            .get_supported_formats(&adapter)
            .first()
            .expect("surface is incompatible with the adapter");

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: swapchain_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
        };
        surface.configure(&device, &surface_config);

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("camera bind group layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: CameraUniform::BINDING_SIZE,
                    },
                    count: None,
                }],
            });
        let texture_bind_group_layout = TextureArray::bind_group_layout(&device);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera uniform"),
            contents: bytemuck::bytes_of(&CameraUniform::new(
                Matrix4::identity(),
                Vector4::zeros(),
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera bind group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let texture_library = TextureLibrary::load_all(&device, &queue, &texture_bind_group_layout);

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain pipeline layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });
        let id_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("id pipeline layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let primitive = wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // steep edits can flip a triangle towards the camera either way
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        };
        let depth_stencil = wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(terrain_shader.name()),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: terrain_shader.handle(),
                entry_point: terrain_shader.vertex_entry(),
                buffers: &[TileVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: terrain_shader.handle(),
                entry_point: terrain_shader.fragment_entry(),
                targets: &[Some(swapchain_format.into())],
            }),
            primitive,
            depth_stencil: Some(depth_stencil.clone()),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let id_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(id_shader.name()),
            layout: Some(&id_pipeline_layout),
            vertex: wgpu::VertexState {
                module: id_shader.handle(),
                entry_point: id_shader.vertex_entry(),
                buffers: &[TileVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: id_shader.handle(),
                entry_point: id_shader.fragment_entry(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ID_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive,
            depth_stencil: Some(depth_stencil),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tile vertices"),
            contents: &grid.mesh_bytes(),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let depth_target = RenderTarget::new(
            &device,
            "depth",
            surface_config.width,
            surface_config.height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let id_buffers = IdBuffers::new(&device, surface_config.width, surface_config.height);
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("id readback"),
            size: padded_bytes_per_row(4) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            _instance: instance,
            surface,
            surface_config,
            _adapter: adapter,
            device,
            queue,

            render_pipeline,
            id_pipeline,

            vertex_buffer,
            vertex_count: grid.vertex_count(),
            camera_buffer,
            camera_bind_group,

            depth_target,
            id_buffers,
            readback_buffer,

            texture_library,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Reconfigures the surface and rebuilds every window sized target.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);

        self.depth_target = RenderTarget::new(
            &self.device,
            "depth",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        self.id_buffers = IdBuffers::new(&self.device, width, height);
        log::debug!("resized render targets to {}x{}", width, height);
    }

    fn write_camera(&self, view_projection: &Matrix4<f32>, eye: Vector4<f32>) {
        let uniform = CameraUniform::new(*view_projection, eye);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn render(&mut self, view_projection: &Matrix4<f32>, eye: Vector4<f32>) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                // redraw is sometimes sent before resize
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(e) => {
                log::error!("failed to acquire next swap chain texture: {}", e);
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.write_camera(view_projection, eye);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("terrain pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_target.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            rpass.set_pipeline(&self.render_pipeline);
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);
            rpass.set_bind_group(
                1,
                self.texture_library.get(TextureId::TileLayers).bind_group(),
                &[],
            );
            rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            rpass.draw(0..self.vertex_count, 0..1);
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
    }
}

impl MeshSink for RenderState {
    fn write_tile(&mut self, index: usize, bytes: &[u8]) {
        self.queue.write_buffer(
            &self.vertex_buffer,
            TileGrid::tile_byte_offset(index),
            bytes,
        );
    }
}

impl IdTarget for RenderState {
    fn viewport(&self) -> (u32, u32) {
        self.size()
    }

    fn image_origin(&self) -> ImageOrigin {
        ImageOrigin::TopLeft
    }

    fn render_id_pass(&mut self, view_projection: &Matrix4<f32>) {
        self.write_camera(view_projection, Vector4::zeros());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("id pass"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("id pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.id_buffers.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // decodes past the end of any grid that fits in 24 bits
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.id_buffers.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: false,
                    }),
                    stencil_ops: None,
                }),
            });

            rpass.set_pipeline(&self.id_pipeline);
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);
            rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            rpass.draw(0..self.vertex_count, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn read_pixel(&mut self, x: u32, row: u32) -> [u8; 4] {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("id readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.id_buffers.color.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y: row, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: NonZeroU32::new(padded_bytes_per_row(4)),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = self.readback_buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        let mut pixel = [255; 4];
        match receiver.recv() {
            Ok(Ok(())) => {
                pixel.copy_from_slice(&slice.get_mapped_range()[..4]);
                self.readback_buffer.unmap();
            }
            Ok(Err(e)) => log::error!("failed to map id readback buffer: {}", e),
            Err(e) => log::error!("id readback was dropped: {}", e),
        }
        pixel
    }
}
