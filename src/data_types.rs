use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Vector4};
use std::{mem::size_of, num::NonZeroU64};

/// One terrain vertex exactly as the shaders consume it: 13 tightly packed floats.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub id_color: [f32; 3],
    pub normal: [f32; 3],
    pub texture_layer: f32,
    pub selected: f32,
}

impl TileVertex {
    pub const SIZE: usize = size_of::<Self>();

    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32,
        5 => Float32
    ];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_projection: Matrix4<f32>,
    pub position: Vector4<f32>,
    // xyz is the direction towards the light, w is ambient strength
    pub light: Vector4<f32>,
}

impl CameraUniform {
    pub const BINDING_SIZE: Option<NonZeroU64> = NonZeroU64::new(size_of::<Self>() as u64);

    pub fn new(view_projection: Matrix4<f32>, position: Vector4<f32>) -> Self {
        Self {
            view_projection,
            position,
            light: Vector4::new(0.4, 1.0, 0.3, 0.35),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_thirteen_packed_floats() {
        assert_eq!(TileVertex::SIZE, 13 * size_of::<f32>());

        let vertex = TileVertex {
            position: [1.0, 2.0, 3.0],
            uv: [4.0, 5.0],
            id_color: [6.0, 7.0, 8.0],
            normal: [9.0, 10.0, 11.0],
            texture_layer: 12.0,
            selected: 13.0,
        };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&vertex));
        let expected: Vec<f32> = (1..=13).map(|v| v as f32).collect();
        assert_eq!(floats, expected.as_slice());
    }

    #[test]
    fn camera_uniform_is_std140_sized() {
        assert_eq!(size_of::<CameraUniform>() % 16, 0);
        assert_eq!(CameraUniform::BINDING_SIZE.unwrap().get(), 96);
    }
}
