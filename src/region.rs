use crate::tile::TileType;
use crate::tile_grid::TileGrid;

/// Types that form connected regions.
pub const REGION_TILE_TYPES: [TileType; 3] = [
    TileType::Residential,
    TileType::Commercial,
    TileType::Industrial,
];

pub fn is_zoneable(tile_type: TileType) -> bool {
    REGION_TILE_TYPES.contains(&tile_type)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSummary {
    /// Tile count per region, indexed by region id.
    pub sizes: Vec<usize>,
}

impl RegionSummary {
    pub fn region_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn largest(&self) -> Option<usize> {
        self.sizes.iter().copied().max()
    }
}

#[derive(Debug, Default)]
pub struct RegionAnalyzer {
    // reused between scans
    stack: Vec<usize>,
}

impl RegionAnalyzer {
    /// Full rescan. Every zoneable tile ends up with the id of its 8-connected cluster;
    /// ids are handed out in order of each cluster's lowest tile index.
    pub fn recompute(&mut self, grid: &mut TileGrid) -> RegionSummary {
        for index in 0..grid.len() {
            grid[index].set_region(None);
        }

        let mut summary = RegionSummary::default();
        for start in 0..grid.len() {
            let tile = &grid[start];
            if !is_zoneable(tile.tile_type()) || tile.region().is_some() {
                continue;
            }

            let region = summary.sizes.len() as u32;
            let size = self.flood(grid, start, region);
            summary.sizes.push(size);
        }

        log::info!(
            "region scan found {} regions over {} tiles",
            summary.region_count(),
            summary.sizes.iter().sum::<usize>()
        );
        summary
    }

    fn flood(&mut self, grid: &mut TileGrid, start: usize, region: u32) -> usize {
        self.stack.clear();
        self.stack.push(start);
        grid[start].set_region(Some(region));
        let mut size = 0;

        while let Some(index) = self.stack.pop() {
            size += 1;
            for neighbor in grid[index].neighbors() {
                let tile = &mut grid[neighbor];
                if is_zoneable(tile.tile_type()) && tile.region().is_none() {
                    tile.set_region(Some(region));
                    self.stack.push(neighbor);
                }
            }
        }

        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(grid: &mut TileGrid, cells: &[(usize, usize)], tile_type: TileType) {
        for (x, z) in cells {
            let index = grid.index_of(*x, *z).unwrap();
            grid.set_type(index, tile_type).unwrap();
        }
    }

    fn region_at(grid: &TileGrid, x: usize, z: usize) -> Option<u32> {
        grid[grid.index_of(x, z).unwrap()].region()
    }

    #[test]
    fn diagonal_contact_joins_regions() {
        let mut grid = TileGrid::new(4, 1.0);
        zone(&mut grid, &[(0, 0)], TileType::Residential);
        zone(&mut grid, &[(1, 1)], TileType::Industrial);
        zone(&mut grid, &[(3, 3)], TileType::Commercial);

        let summary = RegionAnalyzer::default().recompute(&mut grid);

        assert_eq!(summary.sizes, vec![2, 1]);
        assert_eq!(region_at(&grid, 0, 0), Some(0));
        assert_eq!(region_at(&grid, 1, 1), Some(0));
        assert_eq!(region_at(&grid, 3, 3), Some(1));
    }

    #[test]
    fn roads_and_plants_split_regions() {
        let mut grid = TileGrid::new(5, 1.0);
        let wall: Vec<(usize, usize)> = (0..5).map(|z| (2, z)).collect();
        zone(&mut grid, &wall, TileType::Traffic);
        zone(&mut grid, &[(1, 0), (1, 4)], TileType::Plants);
        zone(&mut grid, &[(0, 0), (0, 1), (1, 2), (0, 4)], TileType::Residential);
        zone(&mut grid, &[(3, 2), (4, 3)], TileType::Commercial);

        let summary = RegionAnalyzer::default().recompute(&mut grid);

        assert_eq!(summary.region_count(), 3);
        assert_eq!(region_at(&grid, 0, 0), region_at(&grid, 1, 2));
        assert_ne!(region_at(&grid, 0, 0), region_at(&grid, 0, 4));
        assert_ne!(region_at(&grid, 1, 2), region_at(&grid, 3, 2));
        assert_eq!(region_at(&grid, 3, 2), region_at(&grid, 4, 3));
        assert_eq!(region_at(&grid, 2, 2), None);
        assert_eq!(region_at(&grid, 1, 0), None);
    }

    #[test]
    fn rescan_clears_stale_ids() {
        let mut grid = TileGrid::new(3, 1.0);
        zone(&mut grid, &[(0, 0), (2, 2)], TileType::Residential);
        let mut analyzer = RegionAnalyzer::default();
        assert_eq!(analyzer.recompute(&mut grid).region_count(), 2);

        zone(&mut grid, &[(2, 2)], TileType::None);
        let summary = analyzer.recompute(&mut grid);
        assert_eq!(summary.region_count(), 1);
        assert_eq!(region_at(&grid, 2, 2), None);
    }

    #[test]
    fn connectivity_matches_brute_force() {
        let mut grid = TileGrid::new(7, 1.0);
        let pattern = [
            "RR..C..", "...CC..", "I......", "I.TTTT.", ".I.....", "......R", "RC...RR",
        ];
        for (z, row) in pattern.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let tile_type = match c {
                    'R' => TileType::Residential,
                    'C' => TileType::Commercial,
                    'I' => TileType::Industrial,
                    'T' => TileType::Traffic,
                    _ => TileType::None,
                };
                let index = grid.index_of(x, z).unwrap();
                grid.set_type(index, tile_type).unwrap();
            }
        }
        RegionAnalyzer::default().recompute(&mut grid);

        // reachability by repeated relaxation, independent of the analyzer
        let n = grid.len();
        let mut reach = vec![vec![false; n]; n];
        for a in 0..n {
            if !is_zoneable(grid[a].tile_type()) {
                continue;
            }
            reach[a][a] = true;
            let mut changed = true;
            while changed {
                changed = false;
                for b in 0..n {
                    if !reach[a][b] {
                        continue;
                    }
                    for c in grid[b].neighbors() {
                        if is_zoneable(grid[c].tile_type()) && !reach[a][c] {
                            reach[a][c] = true;
                            changed = true;
                        }
                    }
                }
            }
        }

        for a in 0..n {
            for b in 0..n {
                if !is_zoneable(grid[a].tile_type()) || !is_zoneable(grid[b].tile_type()) {
                    continue;
                }
                assert_eq!(
                    grid[a].region() == grid[b].region(),
                    reach[a][b],
                    "tiles {} and {}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn large_single_region_does_not_recurse() {
        let mut grid = TileGrid::new(200, 1.0);
        for index in 0..grid.len() {
            grid.set_type(index, TileType::Residential).unwrap();
        }
        let summary = RegionAnalyzer::default().recompute(&mut grid);
        assert_eq!(summary.sizes, vec![40_000]);
        assert_eq!(summary.largest(), Some(40_000));
    }
}
