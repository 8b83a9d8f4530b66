//! Occupancy map of the explored world.
//!
//! A square grid of cells, each holding one saturating hit counter per
//! terrain layer.  Perception reports the cells it classified this frame as
//! a [`MapDelta`]; [`WorldMap::apply`] folds it in.

use scout_types::{GridCell, MapDelta};

use crate::transform::DEFAULT_WORLD_SIZE;

/// Terrain layer of the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Obstacle,
    Rock,
    Navigable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellCounts {
    obstacle: u8,
    rock: u8,
    navigable: u8,
}

/// Square world map with per-layer hit counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMap {
    size: u16,
    cells: Vec<CellCounts>,
}

impl Default for WorldMap {
    fn default() -> Self {
        Self::new(DEFAULT_WORLD_SIZE)
    }
}

impl WorldMap {
    pub fn new(size: u16) -> Self {
        Self {
            size,
            cells: vec![CellCounts::default(); usize::from(size) * usize::from(size)],
        }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    /// Fold one frame's classified cells into the map.  Cells outside the
    /// map are ignored.
    pub fn apply(&mut self, delta: &MapDelta) {
        for cell in &delta.obstacles {
            self.bump(*cell, Layer::Obstacle);
        }
        for cell in &delta.rocks {
            self.bump(*cell, Layer::Rock);
        }
        for cell in &delta.navigable {
            self.bump(*cell, Layer::Navigable);
        }
    }

    /// Hit count of `layer` at `cell`; zero outside the map.
    pub fn count(&self, cell: GridCell, layer: Layer) -> u8 {
        self.index(cell).map_or(0, |i| {
            let c = &self.cells[i];
            match layer {
                Layer::Obstacle => c.obstacle,
                Layer::Rock => c.rock,
                Layer::Navigable => c.navigable,
            }
        })
    }

    /// The layer with the most hits at `cell`, if any.  Rock wins ties.
    pub fn dominant(&self, cell: GridCell) -> Option<Layer> {
        let i = self.index(cell)?;
        let c = self.cells[i];
        if c.rock > 0 {
            return Some(Layer::Rock);
        }
        match (c.navigable, c.obstacle) {
            (0, 0) => None,
            (n, o) if n >= o => Some(Layer::Navigable),
            _ => Some(Layer::Obstacle),
        }
    }

    /// Number of cells that have been seen at least once.
    pub fn explored_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.obstacle > 0 || c.rock > 0 || c.navigable > 0)
            .count()
    }

    fn bump(&mut self, cell: GridCell, layer: Layer) {
        if let Some(i) = self.index(cell) {
            let c = &mut self.cells[i];
            let counter = match layer {
                Layer::Obstacle => &mut c.obstacle,
                Layer::Rock => &mut c.rock,
                Layer::Navigable => &mut c.navigable,
            };
            *counter = counter.saturating_add(1);
        }
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        (cell.x < self.size && cell.y < self.size)
            .then(|| usize::from(cell.y) * usize::from(self.size) + usize::from(cell.x))
    }
}
