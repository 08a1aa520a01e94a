//! Two-profile actuation matrix mirrored from the device

use crate::actuation::{ActuationConfig, TravelDistance};

/// Number of actuation profiles stored by firmware
pub const PROFILE_COUNT: u8 = 2;

/// Profile used on every layer except the special layer
pub const DEFAULT_PROFILE: u8 = 0;

/// Profile used on the special layer
pub const SPECIAL_PROFILE: u8 = 1;

/// Address of one matrix cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub profile: u8,
    pub row: u8,
    pub col: u8,
}

/// `profiles[2][rows][cols]` of actuation configs, stored flat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationMatrix {
    rows: u8,
    cols: u8,
    cells: Vec<ActuationConfig>,
}

impl ActuationMatrix {
    /// A matrix with every cell set to `config`
    pub fn filled(rows: u8, cols: u8, config: ActuationConfig) -> Self {
        let len = PROFILE_COUNT as usize * rows as usize * cols as usize;
        Self {
            rows,
            cols,
            cells: vec![config; len],
        }
    }

    /// Build from cells in profile, row, col order
    ///
    /// Returns `None` if the cell count does not match the geometry.
    pub fn from_cells(rows: u8, cols: u8, cells: Vec<ActuationConfig>) -> Option<Self> {
        let len = PROFILE_COUNT as usize * rows as usize * cols as usize;
        (cells.len() == len).then_some(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    fn index(&self, profile: u8, row: u8, col: u8) -> Option<usize> {
        if profile >= PROFILE_COUNT || row >= self.rows || col >= self.cols {
            return None;
        }
        let (rows, cols) = (self.rows as usize, self.cols as usize);
        Some((profile as usize * rows + row as usize) * cols + col as usize)
    }

    pub fn contains(&self, profile: u8, row: u8, col: u8) -> bool {
        self.index(profile, row, col).is_some()
    }

    pub fn get(&self, profile: u8, row: u8, col: u8) -> Option<&ActuationConfig> {
        self.index(profile, row, col).map(|i| &self.cells[i])
    }

    /// Replace a cell, returning the previous value
    pub fn set(
        &mut self,
        profile: u8,
        row: u8,
        col: u8,
        config: ActuationConfig,
    ) -> Option<ActuationConfig> {
        let i = self.index(profile, row, col)?;
        Some(std::mem::replace(&mut self.cells[i], config))
    }

    /// Every cell address of one profile, row-major
    pub fn profile_cells(&self, profile: u8) -> impl Iterator<Item = CellAddress> {
        let (rows, cols) = (self.rows, self.cols);
        (0..rows).flat_map(move |row| (0..cols).map(move |col| CellAddress { profile, row, col }))
    }

    /// Every cell address of both profiles, profile-major then row-major
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (0..PROFILE_COUNT).flat_map(move |p| self.profile_cells(p))
    }

    /// One profile as nested rows
    pub fn profile_rows(&self, profile: u8) -> Vec<Vec<ActuationConfig>> {
        let cols = self.cols as usize;
        let start = profile as usize * self.rows as usize * cols;
        let end = start + self.rows as usize * cols;
        self.cells
            .get(start..end)
            .map(|cells| cells.chunks(cols.max(1)).map(<[_]>::to_vec).collect())
            .unwrap_or_default()
    }

    /// Cells whose value changes when the total travel moves from `from` to `to`
    pub fn requantized(
        &self,
        from: TravelDistance,
        to: TravelDistance,
    ) -> Vec<(CellAddress, ActuationConfig)> {
        self.cells()
            .filter_map(|addr| {
                let old = *self.get(addr.profile, addr.row, addr.col)?;
                let new = old.requantize(from, to);
                (new != old).then_some((addr, new))
            })
            .collect()
    }
}
