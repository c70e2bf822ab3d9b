use nalgebra::{Point3, Vector3};

use crate::data_types::TileVertex;
use crate::picking;
use crate::road::RoadVariant;

pub const VERTICES_PER_TILE: usize = 6;
pub const BYTES_PER_TILE: usize = VERTICES_PER_TILE * TileVertex::SIZE;

crate::macros::parallel_enum_values! {
    (
        TileType,
        TILE_TEXTURE_LAYERS,
        u32,
    )
    None -> &0,
    Residential -> &1,
    Commercial -> &2,
    Industrial -> &3,
    Traffic -> &4,
    Plants -> &5,
}

impl Default for TileType {
    fn default() -> Self {
        TileType::None
    }
}

impl TileType {
    pub fn texture_layer(self) -> u32 {
        *self.paired_value()
    }

    pub fn is_occupied(self) -> bool {
        self != TileType::None
    }
}

/// Neighbor slots, in the order they are stored on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    pub const ORTHOGONAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub const DIAGONAL: [Direction; 4] = [
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    pub fn slot(self) -> usize {
        self as usize
    }

    /// Grid step towards this neighbor. North is towards smaller `grid_z`.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }

    #[cfg(test)]
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
        }
    }

    /// Pairs of (own corner, neighbor corner) that sit on the same mesh point.
    pub fn shared_corners(self) -> &'static [(Corner, Corner)] {
        use Corner::*;
        match self {
            Direction::North => &[(TopLeft, BottomLeft), (TopRight, BottomRight)],
            Direction::South => &[(BottomLeft, TopLeft), (BottomRight, TopRight)],
            Direction::East => &[(TopRight, TopLeft), (BottomRight, BottomLeft)],
            Direction::West => &[(TopLeft, TopRight), (BottomLeft, BottomRight)],
            Direction::NorthEast => &[(TopRight, BottomLeft)],
            Direction::NorthWest => &[(TopLeft, BottomRight)],
            Direction::SouthEast => &[(BottomRight, TopLeft)],
            Direction::SouthWest => &[(BottomLeft, TopRight)],
        }
    }
}

/// Logical quad corners. TL sits at the tile's minimum x and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    BottomLeft,
    BottomRight,
    TopRight,
}

impl Corner {
    // Perimeter order, used for the normal.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::BottomLeft,
        Corner::BottomRight,
        Corner::TopRight,
    ];

    /// Vertex slots holding this corner. Triangles are (TL, BL, BR) and (TL, BR, TR).
    pub fn slots(self) -> &'static [usize] {
        match self {
            Corner::TopLeft => &[0, 3],
            Corner::BottomLeft => &[1],
            Corner::BottomRight => &[2, 4],
            Corner::TopRight => &[5],
        }
    }

    pub fn offset(self) -> (f32, f32) {
        match self {
            Corner::TopLeft => (0.0, 0.0),
            Corner::BottomLeft => (0.0, 1.0),
            Corner::BottomRight => (1.0, 1.0),
            Corner::TopRight => (1.0, 0.0),
        }
    }

    pub fn base_uv(self) -> [f32; 2] {
        let (u, v) = self.offset();
        [u, v]
    }
}

const SLOT_CORNERS: [Corner; VERTICES_PER_TILE] = [
    Corner::TopLeft,
    Corner::BottomLeft,
    Corner::BottomRight,
    Corner::TopLeft,
    Corner::BottomRight,
    Corner::TopRight,
];

#[derive(Debug, Clone)]
pub struct Tile {
    index: usize,
    grid_x: usize,
    grid_z: usize,
    vertices: [TileVertex; VERTICES_PER_TILE],
    tile_type: TileType,
    region: Option<u32>,
    road: Option<RoadVariant>,
    neighbors: [Option<usize>; 8],
    selected: bool,
    dirty: bool,
}

impl Tile {
    pub fn new(index: usize, grid_x: usize, grid_z: usize, tile_size: f32) -> Self {
        let id_color = picking::encode_id(index);
        let layer = TileType::None.texture_layer() as f32;

        let mut vertices = [TileVertex::default(); VERTICES_PER_TILE];
        for (vertex, corner) in vertices.iter_mut().zip(SLOT_CORNERS) {
            let (dx, dz) = corner.offset();
            *vertex = TileVertex {
                position: [
                    (grid_x as f32 + dx) * tile_size,
                    0.0,
                    (grid_z as f32 + dz) * tile_size,
                ],
                uv: corner.base_uv(),
                id_color,
                normal: [0.0, 1.0, 0.0],
                texture_layer: layer,
                selected: 0.0,
            };
        }

        Self {
            index,
            grid_x,
            grid_z,
            vertices,
            tile_type: TileType::None,
            region: None,
            road: None,
            neighbors: [None; 8],
            selected: false,
            dirty: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn grid_x(&self) -> usize {
        self.grid_x
    }

    pub fn grid_z(&self) -> usize {
        self.grid_z
    }

    pub fn tile_type(&self) -> TileType {
        self.tile_type
    }

    pub fn region(&self) -> Option<u32> {
        self.region
    }

    pub fn road_variant(&self) -> Option<RoadVariant> {
        self.road
    }

    pub fn neighbor(&self, dir: Direction) -> Option<usize> {
        self.neighbors[dir.slot()]
    }

    /// Present neighbors. The iterator owns a copy of the links, so the grid stays free to
    /// mutate while it runs.
    pub fn neighbors(&self) -> impl Iterator<Item = usize> {
        self.neighbors.into_iter().flatten()
    }

    #[cfg(test)]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn vertices(&self) -> &[TileVertex; VERTICES_PER_TILE] {
        &self.vertices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn corner_height(&self, corner: Corner) -> f32 {
        self.vertices[corner.slots()[0]].position[1]
    }

    pub fn corner_heights(&self) -> [f32; 4] {
        Corner::ALL.map(|c| self.corner_height(c))
    }

    pub fn set_corner_height(&mut self, corner: Corner, y: f32) {
        for slot in corner.slots() {
            self.vertices[*slot].position[1] = y;
        }
        self.dirty = true;
    }

    /// Moves all six vertices vertically by `dy`.
    pub fn shift_height(&mut self, dy: f32) {
        for vertex in self.vertices.iter_mut() {
            vertex.position[1] += dy;
        }
        self.dirty = true;
    }

    pub fn corner_position(&self, corner: Corner) -> Point3<f32> {
        let [x, y, z] = self.vertices[corner.slots()[0]].position;
        Point3::new(x, y, z)
    }

    /// Newell's method over the four logical corners. Flat tiles point up.
    pub fn face_normal(&self) -> Vector3<f32> {
        let corners = Corner::ALL.map(|c| self.corner_position(c));
        let mut normal = Vector3::zeros();

        for (i, current) in corners.iter().enumerate() {
            let next = &corners[(i + 1) % corners.len()];
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }

        normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y)
    }

    pub fn recompute_normal(&mut self) {
        let normal: [f32; 3] = self.face_normal().into();
        for vertex in self.vertices.iter_mut() {
            vertex.normal = normal;
        }
        self.dirty = true;
    }

    pub fn set_selected(&mut self, selected: bool) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        let flag = if selected { 1.0 } else { 0.0 };
        for vertex in self.vertices.iter_mut() {
            vertex.selected = flag;
        }
        self.dirty = true;
    }

    /// Changes the type and keeps the texture layer and road payload consistent with it.
    /// A new road starts as the default variant until it is autotiled.
    pub fn set_type(&mut self, tile_type: TileType) {
        self.tile_type = tile_type;
        let layer = tile_type.texture_layer() as f32;
        for vertex in self.vertices.iter_mut() {
            vertex.texture_layer = layer;
        }

        if tile_type == TileType::Traffic {
            let variant = self.road.unwrap_or_default();
            self.set_road_variant(variant);
        } else {
            self.road = None;
            self.write_uvs(|corner| corner.base_uv());
        }
        self.dirty = true;
    }

    /// No-op unless the tile is a road.
    pub fn set_road_variant(&mut self, variant: RoadVariant) {
        if self.tile_type != TileType::Traffic {
            return;
        }
        self.road = Some(variant);
        self.write_uvs(|corner| variant.atlas_uv(corner.base_uv()));
        self.dirty = true;
    }

    pub(crate) fn set_region(&mut self, region: Option<u32>) {
        self.region = region;
    }

    pub(crate) fn set_neighbor(&mut self, dir: Direction, index: Option<usize>) {
        self.neighbors[dir.slot()] = index;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn write_uvs<F: Fn(Corner) -> [f32; 2]>(&mut self, uv_of: F) {
        for (vertex, corner) in self.vertices.iter_mut().zip(SLOT_CORNERS) {
            vertex.uv = uv_of(corner);
        }
    }
}
