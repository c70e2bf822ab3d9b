//! Tile picking through an id-color render.
//!
//! Every tile carries its index packed into 24 bits of vertex color. Rendering the grid with
//! those colors into an off-screen target and reading back the pixel under the cursor
//! recovers the index of the visible tile.

use nalgebra::Matrix4;

/// Largest index representable in an id-color.
pub const MAX_ENCODABLE_INDEX: usize = 0xFF_FFFF;

/// Id-color for a tile index, normalized for an 8-bit unorm target.
pub fn encode_id(index: usize) -> [f32; 3] {
    debug_assert!(index <= MAX_ENCODABLE_INDEX, "tile index {} overflows 24 bits", index);
    let r = index & 0xFF;
    let g = (index >> 8) & 0xFF;
    let b = (index >> 16) & 0xFF;
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// Reverses `encode_id` on a read-back pixel. Anything outside `0..tile_count`, such as the
/// clear color, is no tile.
pub fn decode_id(pixel: [u8; 4], tile_count: usize) -> Option<usize> {
    let index = pixel[0] as usize | (pixel[1] as usize) << 8 | (pixel[2] as usize) << 16;
    (index < tile_count).then(|| index)
}

/// Quantizes an encoded color the way the id target stores it.
#[cfg(test)]
pub fn quantize(color: [f32; 3]) -> [u8; 4] {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [channel(color[0]), channel(color[1]), channel(color[2]), 255]
}

/// Where row zero of the id image sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    TopLeft,
    /// Row zero is the bottom of the window, as with GL-style framebuffers. No target in
    /// this crate reads that way; a port to such a backend plugs in here.
    #[cfg_attr(not(test), allow(dead_code))]
    BottomLeft,
}

/// Off-screen target the id pass renders into.
pub trait IdTarget {
    fn viewport(&self) -> (u32, u32);

    fn image_origin(&self) -> ImageOrigin;

    /// Renders the grid mesh with id-colors instead of textures, depth tested.
    fn render_id_pass(&mut self, view_projection: &Matrix4<f32>);

    /// Blocking read of one pixel of the id image, in image rows.
    fn read_pixel(&mut self, x: u32, row: u32) -> [u8; 4];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickingIndex {
    tile_count: usize,
}

impl PickingIndex {
    pub fn new(tile_count: usize) -> Self {
        assert!(
            tile_count <= MAX_ENCODABLE_INDEX + 1,
            "{} tiles cannot be told apart by a 24 bit id",
            tile_count
        );
        Self { tile_count }
    }

    pub fn render_id_pass<T: IdTarget>(&self, target: &mut T, view_projection: &Matrix4<f32>) {
        target.render_id_pass(view_projection);
    }

    /// Index of the tile drawn at window coordinate `(x, y)` by the last id pass.
    /// Coordinates outside the viewport resolve to no tile without touching the target.
    pub fn read_index_at<T: IdTarget>(&self, target: &mut T, x: f64, y: f64) -> Option<usize> {
        let (width, height) = target.viewport();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= width || y >= height {
            return None;
        }

        let row = match target.image_origin() {
            ImageOrigin::TopLeft => y,
            ImageOrigin::BottomLeft => height - y - 1,
        };
        decode_id(target.read_pixel(x, row), self.tile_count)
    }

    /// One id pass followed by one read. This is the only GPU stall of an input step.
    pub fn pick<T: IdTarget>(
        &self,
        target: &mut T,
        view_projection: &Matrix4<f32>,
        cursor: (f64, f64),
    ) -> Option<usize> {
        self.render_id_pass(target, view_projection);
        self.read_index_at(target, cursor.0, cursor.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Image filled with scripted ids, rows stored in the configured origin.
    struct FakeTarget {
        width: u32,
        height: u32,
        origin: ImageOrigin,
        pixels: Vec<[u8; 4]>,
        passes: usize,
        reads: Vec<(u32, u32)>,
    }

    impl FakeTarget {
        fn new(width: u32, height: u32, origin: ImageOrigin) -> Self {
            Self {
                width,
                height,
                origin,
                pixels: vec![[255; 4]; (width * height) as usize],
                passes: 0,
                reads: Vec::new(),
            }
        }

        fn paint(&mut self, x: u32, row: u32, index: usize) {
            self.pixels[(row * self.width + x) as usize] = quantize(encode_id(index));
        }
    }

    impl IdTarget for FakeTarget {
        fn viewport(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn image_origin(&self) -> ImageOrigin {
            self.origin
        }

        fn render_id_pass(&mut self, _view_projection: &Matrix4<f32>) {
            self.passes += 1;
        }

        fn read_pixel(&mut self, x: u32, row: u32) -> [u8; 4] {
            self.reads.push((x, row));
            self.pixels[(row * self.width + x) as usize]
        }
    }

    #[test]
    fn id_round_trip() {
        let tile_count = 300 * 300;
        for index in (0..tile_count).step_by(7).chain([0, 255, 256, 65535, 65536, tile_count - 1]) {
            assert_eq!(decode_id(quantize(encode_id(index)), tile_count), Some(index));
        }
    }

    #[test]
    fn channels_follow_byte_layout() {
        assert_eq!(quantize(encode_id(0x0A0B0C)), [0x0C, 0x0B, 0x0A, 255]);
    }

    #[test]
    fn ids_past_the_grid_are_invalid() {
        assert_eq!(decode_id(quantize(encode_id(9)), 9), None);
        assert_eq!(decode_id([255, 255, 255, 255], 1 << 20), None);
        assert_eq!(decode_id([8, 0, 0, 255], 9), Some(8));
    }

    #[test]
    fn bottom_left_images_flip_rows() {
        let mut target = FakeTarget::new(4, 3, ImageOrigin::BottomLeft);
        target.paint(1, 2, 5);
        let picking = PickingIndex::new(16);

        // window row 0 is image row 2
        assert_eq!(picking.read_index_at(&mut target, 1.0, 0.0), Some(5));
        assert_eq!(target.reads, vec![(1, 2)]);
    }

    #[test]
    fn top_left_images_read_rows_directly() {
        let mut target = FakeTarget::new(4, 3, ImageOrigin::TopLeft);
        target.paint(3, 1, 11);
        let picking = PickingIndex::new(16);

        assert_eq!(picking.read_index_at(&mut target, 3.7, 1.2), Some(11));
        assert_eq!(picking.read_index_at(&mut target, 0.0, 0.0), None);
    }

    #[test]
    fn outside_viewport_never_reads() {
        let mut target = FakeTarget::new(4, 3, ImageOrigin::TopLeft);
        let picking = PickingIndex::new(16);

        assert_eq!(picking.read_index_at(&mut target, -1.0, 0.0), None);
        assert_eq!(picking.read_index_at(&mut target, 4.0, 0.0), None);
        assert_eq!(picking.read_index_at(&mut target, 0.0, 3.0), None);
        assert!(target.reads.is_empty());
    }

    #[test]
    fn pick_renders_once_and_reads_once() {
        let mut target = FakeTarget::new(2, 2, ImageOrigin::TopLeft);
        target.paint(0, 1, 3);
        let picking = PickingIndex::new(4);

        let hit = picking.pick(&mut target, &Matrix4::identity(), (0.0, 1.0));
        assert_eq!(hit, Some(3));
        assert_eq!(target.passes, 1);
        assert_eq!(target.reads.len(), 1);
    }
}
