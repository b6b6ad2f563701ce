//! The connectivity grid — a spatial index over interface positions.
//!
//! # Why this exists
//!
//! Every scan tick each interface must answer "which interfaces might be
//! near me?".  A naive all-pairs check is O(N²) per tick.  The grid
//! partitions the bounded world into square cells whose side is at least the
//! maximum transmit range registered for the interface type, so any pair
//! that can possibly be in range sits in the same cell or in one of its 8
//! neighbors.  The candidate set is then the 3×3 cell neighborhood — small
//! and independent of N.
//!
//! # Edge policy
//!
//! Cells are half-open: a position exactly on a cell boundary belongs to the
//! cell whose lower-bound coordinates it meets (`floor(coord / cell_size)`).
//! The world is bounded and does not wrap; positions outside it are clamped
//! into the border cells.

use rustc_hash::FxHashMap;

use dtn_core::{Coord, InterfaceId};

// ── ConnectivityGrid ──────────────────────────────────────────────────────────

/// Dense cell grid for one interface type.
pub struct ConnectivityGrid {
    cell_size: f64,
    rows:      usize,
    cols:      usize,
    /// Interface membership per cell, indexed `row * cols + col`.
    cells:     Vec<Vec<InterfaceId>>,
    /// Last known position of every registered interface.  Source of truth
    /// for O(1) cell moves and for re-binning when the cell size grows.
    positions: FxHashMap<InterfaceId, Coord>,
}

impl ConnectivityGrid {
    /// Grid over a `width` × `height` world with the given cell side.
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        let cols = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            rows,
            cols,
            cells: vec![Vec::new(); rows * cols],
            positions: FxHashMap::default(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Row/column of a position, clamped into the grid bounds.
    fn cell_of(&self, loc: Coord) -> (usize, usize) {
        let col = ((loc.x / self.cell_size).floor() as isize).clamp(0, self.cols as isize - 1);
        let row = ((loc.y / self.cell_size).floor() as isize).clamp(0, self.rows as isize - 1);
        (row as usize, col as usize)
    }

    fn cell_index(&self, loc: Coord) -> usize {
        let (row, col) = self.cell_of(loc);
        row * self.cols + col
    }

    /// Register an interface at `loc`.  No-op if already present.
    pub fn add_interface(&mut self, iface: InterfaceId, loc: Coord) {
        if self.positions.contains_key(&iface) {
            return;
        }
        let idx = self.cell_index(loc);
        self.cells[idx].push(iface);
        self.positions.insert(iface, loc);
    }

    /// Remove an interface from the index.
    pub fn remove_interface(&mut self, iface: InterfaceId) {
        let Some(loc) = self.positions.remove(&iface) else {
            return;
        };
        let idx = self.cell_index(loc);
        let cell = &mut self.cells[idx];
        if let Some(pos) = cell.iter().position(|&i| i == iface) {
            cell.swap_remove(pos);
        }
    }

    /// Record that `iface` has moved to `loc`, migrating it between cells
    /// when the move crosses a boundary.  O(1) amortized.
    pub fn update_location(&mut self, iface: InterfaceId, loc: Coord) {
        let Some(&prev) = self.positions.get(&iface) else {
            return;
        };
        let old_idx = self.cell_index(prev);
        let new_idx = self.cell_index(loc);
        self.positions.insert(iface, loc);
        if old_idx == new_idx {
            return;
        }
        let cell = &mut self.cells[old_idx];
        if let Some(pos) = cell.iter().position(|&i| i == iface) {
            cell.swap_remove(pos);
        }
        self.cells[new_idx].push(iface);
    }

    /// All interfaces in `iface`'s cell and its 8 neighbors, excluding
    /// `iface` itself.  Empty if `iface` is not registered.
    pub fn near_interfaces(&self, iface: InterfaceId) -> Vec<InterfaceId> {
        let Some(&loc) = self.positions.get(&iface) else {
            return Vec::new();
        };
        let (row, col) = self.cell_of(loc);
        let mut near = Vec::new();
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                let r = row as i64 + dr;
                let c = col as i64 + dc;
                if r < 0 || c < 0 || r >= self.rows as i64 || c >= self.cols as i64 {
                    continue;
                }
                near.extend(
                    self.cells[r as usize * self.cols + c as usize]
                        .iter()
                        .copied()
                        .filter(|&i| i != iface),
                );
            }
        }
        near
    }

    /// Number of registered interfaces.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Rebuild the grid with a larger cell side, re-binning every member.
    fn grow_cell_size(&mut self, width: f64, height: f64, cell_size: f64) {
        let mut grown = ConnectivityGrid::new(width, height, cell_size);
        for (&iface, &loc) in &self.positions {
            grown.add_interface(iface, loc);
        }
        *self = grown;
    }
}

// ── GridFactory ───────────────────────────────────────────────────────────────

/// One grid per interface type, cell side = the largest transmit range
/// registered for that type so far.
///
/// Registering an interface whose range exceeds the current cell side grows
/// the grid (a full re-bin).  In practice all interfaces are registered at
/// world construction, so the cell size settles before stepping begins.
pub struct GridFactory {
    width:  f64,
    height: f64,
    grids:  FxHashMap<String, ConnectivityGrid>,
}

impl GridFactory {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            grids: FxHashMap::default(),
        }
    }

    /// Register `iface` of `interface_type` with the given transmit range.
    ///
    /// Callers must not register zero-range interfaces; they have no
    /// optimizer by contract.
    pub fn register(&mut self, interface_type: &str, range: f64, iface: InterfaceId, loc: Coord) {
        debug_assert!(range > 0.0, "zero-range interfaces are never indexed");
        match self.grids.get_mut(interface_type) {
            Some(grid) => {
                if range > grid.cell_size() {
                    grid.grow_cell_size(self.width, self.height, range);
                }
                grid.add_interface(iface, loc);
            }
            None => {
                let mut grid = ConnectivityGrid::new(self.width, self.height, range);
                grid.add_interface(iface, loc);
                self.grids.insert(interface_type.to_owned(), grid);
            }
        }
    }

    pub fn grid(&self, interface_type: &str) -> Option<&ConnectivityGrid> {
        self.grids.get(interface_type)
    }

    pub fn grid_mut(&mut self, interface_type: &str) -> Option<&mut ConnectivityGrid> {
        self.grids.get_mut(interface_type)
    }
}
