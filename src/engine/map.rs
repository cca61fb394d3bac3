use std::collections::BTreeMap;

use thiserror::Error;

use super::position::Cell;

/// Classification of a single grid cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellKind {
    Blocked,
    Open,
    Room(String),
}

/// Where an item currently is: on the floor at a cell, or in the
/// robot's gripper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemLocation {
    At(Cell),
    Held,
}

#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("layout has no rows or no columns")]
    EmptyLayout,
    #[error("layout row {row} has {len} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("layout has no open cells")]
    NoOpenCells,
    #[error("item `{item}` placed on a blocked or out-of-bounds cell {cell:?}")]
    ItemOffFloor { item: String, cell: Cell },
}

/// Immutable rectangular classification of the home, plus the one mutable
/// piece of state it owns: the item location table.
///
/// Bounds and cell kinds never change after construction. Room tags form a
/// small closed set collected from the layout in row-major discovery order.
pub struct HomeMap {
    width: usize,
    height: usize,
    cells: Vec<Vec<CellKind>>,
    items: BTreeMap<String, ItemLocation>,
    room_tags: Vec<String>,
}

impl HomeMap {
    /// Build a map from a row-major layout (rows top-to-bottom, columns
    /// left-to-right) and the initial item placement.
    pub fn new(
        layout: Vec<Vec<CellKind>>,
        items: BTreeMap<String, Cell>,
    ) -> Result<Self, MapError> {
        let height = layout.len();
        let width = layout.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(MapError::EmptyLayout);
        }
        for (row, cells) in layout.iter().enumerate() {
            if cells.len() != width {
                return Err(MapError::RaggedRow {
                    row,
                    len: cells.len(),
                    expected: width,
                });
            }
        }

        let mut room_tags = Vec::new();
        for row in &layout {
            for cell in row {
                if let CellKind::Room(tag) = cell {
                    if !room_tags.iter().any(|t| t == tag) {
                        room_tags.push(tag.clone());
                    }
                }
            }
        }

        let mut map = Self {
            width,
            height,
            cells: layout,
            items: BTreeMap::new(),
            room_tags,
        };
        if map.open_cells().is_empty() {
            return Err(MapError::NoOpenCells);
        }
        for (name, cell) in items {
            if map.is_obstacle(cell) {
                return Err(MapError::ItemOffFloor { item: name, cell });
            }
            map.items.insert(name, ItemLocation::At(cell));
        }
        Ok(map)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, c: Cell) -> bool {
        c.x < self.width && c.y < self.height
    }

    /// Whether `c` cannot be occupied. Out-of-bounds counts as an obstacle.
    pub fn is_obstacle(&self, c: Cell) -> bool {
        if !self.in_bounds(c) {
            return true;
        }
        self.cells[c.y][c.x] == CellKind::Blocked
    }

    /// The room tag at `c`, or `None` for untagged or blocked cells.
    pub fn room_of(&self, c: Cell) -> Option<&str> {
        if !self.in_bounds(c) {
            return None;
        }
        match &self.cells[c.y][c.x] {
            CellKind::Room(tag) => Some(tag),
            _ => None,
        }
    }

    /// Open 4-neighbours of `c`, in east, west, south, north order.
    /// The order is fixed; path search and the belief filter rely on it
    /// for reproducible results.
    pub fn neighbours(&self, c: Cell) -> Vec<Cell> {
        let mut out = Vec::with_capacity(4);
        for delta in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            if let Some(n) = c.offset(delta) {
                if !self.is_obstacle(n) {
                    out.push(n);
                }
            }
        }
        out
    }

    /// All open cells in row-major order.
    pub fn open_cells(&self) -> Vec<Cell> {
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let c = Cell::new(x, y);
                if !self.is_obstacle(c) {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Room tags present in the layout, in discovery order.
    pub fn room_tags(&self) -> &[String] {
        &self.room_tags
    }

    /// Open cells tagged with `tag`, in row-major order.
    pub fn cells_in_room(&self, tag: &str) -> Vec<Cell> {
        self.open_cells()
            .into_iter()
            .filter(|c| self.room_of(*c) == Some(tag))
            .collect()
    }

    /// Room tags with at least one cell 4-adjacent to an untagged open
    /// cell, i.e. rooms the robot can enter directly from the corridor.
    pub fn rooms_touching_corridor(&self) -> Vec<String> {
        let mut out = Vec::new();
        'tags: for tag in &self.room_tags {
            for cell in self.cells_in_room(tag) {
                for n in self.neighbours(cell) {
                    if self.room_of(n).is_none() {
                        out.push(tag.clone());
                        continue 'tags;
                    }
                }
            }
        }
        out
    }

    pub fn item_location(&self, name: &str) -> Option<ItemLocation> {
        self.items.get(name).copied()
    }

    pub fn set_item_location(&mut self, name: &str, location: ItemLocation) {
        self.items.insert(name.to_string(), location);
    }

    /// All items with their current locations, in name order.
    pub fn items(&self) -> impl Iterator<Item = (&str, ItemLocation)> {
        self.items.iter().map(|(name, loc)| (name.as_str(), *loc))
    }
}
