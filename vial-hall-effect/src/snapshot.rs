//! Backup document for the whole Hall Effect state
//!
//! ```json
//! {
//!   "actuation_matrix": [[[{"actuation_point": 128, "rt_mode": 0, "rt_press": 0, "rt_release": 0}]]],
//!   "input_priority_pairs": [[0, 1, 2, 1, 3, 0]],
//!   "switch_option": 2,
//!   "special_layer": 0
//! }
//! ```
//!
//! `actuation_matrix` is indexed profile, row, col. Unknown keys are ignored.

use serde::{Deserialize, Serialize};

use crate::actuation::ActuationConfig;
use crate::error::HallEffectError;
use crate::matrix::{ActuationMatrix, PROFILE_COUNT};
use crate::priority::{InputPriorityPair, InputPriorityTable};
use crate::settings::{MatrixGeometry, SwitchOptions};

/// Serializable copy of the mirrored device state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallEffectSnapshot {
    pub actuation_matrix: Vec<Vec<Vec<ActuationConfig>>>,
    pub input_priority_pairs: Vec<InputPriorityPair>,
    pub switch_option: u8,
    pub special_layer: u8,
}

/// A snapshot checked against a keyboard, ready to be applied
#[derive(Debug, Clone)]
pub(crate) struct ValidatedSnapshot {
    pub matrix: ActuationMatrix,
    pub pairs: InputPriorityTable,
    pub switch_option: u8,
    pub special_layer: u8,
}

impl HallEffectSnapshot {
    pub(crate) fn capture(
        matrix: &ActuationMatrix,
        pairs: &InputPriorityTable,
        switch_option: u8,
        special_layer: u8,
    ) -> Self {
        Self {
            actuation_matrix: (0..PROFILE_COUNT).map(|p| matrix.profile_rows(p)).collect(),
            input_priority_pairs: pairs.as_slice().to_vec(),
            switch_option,
            special_layer,
        }
    }

    pub fn to_json(&self) -> Result<String, HallEffectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, HallEffectError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check shape and ranges against the target keyboard
    pub(crate) fn validate(
        &self,
        geometry: &MatrixGeometry,
        switch_options: &SwitchOptions,
    ) -> Result<ValidatedSnapshot, HallEffectError> {
        if self.actuation_matrix.len() != PROFILE_COUNT as usize {
            return Err(HallEffectError::Snapshot(format!(
                "expected {} profiles, found {}",
                PROFILE_COUNT,
                self.actuation_matrix.len()
            )));
        }

        let mut cells = Vec::with_capacity(PROFILE_COUNT as usize * geometry.cells_per_profile());
        for (p, profile) in self.actuation_matrix.iter().enumerate() {
            if profile.len() != geometry.rows as usize {
                return Err(HallEffectError::Snapshot(format!(
                    "profile {} has {} rows, keyboard has {}",
                    p,
                    profile.len(),
                    geometry.rows
                )));
            }
            for (r, row) in profile.iter().enumerate() {
                if row.len() != geometry.cols as usize {
                    return Err(HallEffectError::Snapshot(format!(
                        "profile {} row {} has {} columns, keyboard has {}",
                        p,
                        r,
                        row.len(),
                        geometry.cols
                    )));
                }
                cells.extend(row.iter().map(|c| c.normalized()));
            }
        }
        let matrix = ActuationMatrix::from_cells(geometry.rows, geometry.cols, cells)
            .ok_or_else(|| HallEffectError::Snapshot("actuation matrix size mismatch".into()))?;

        let pairs = InputPriorityTable::from_pairs(self.input_priority_pairs.clone())
            .map_err(|e| HallEffectError::Snapshot(e.to_string()))?;

        if switch_options.travel(self.switch_option).is_none() {
            return Err(HallEffectError::Snapshot(format!(
                "switch option {} not in travel table ({} entries)",
                self.switch_option,
                switch_options.len()
            )));
        }
        if self.special_layer > geometry.layers {
            return Err(HallEffectError::Snapshot(format!(
                "special layer {} exceeds {} layers",
                self.special_layer, geometry.layers
            )));
        }

        Ok(ValidatedSnapshot {
            matrix,
            pairs,
            switch_option: self.switch_option,
            special_layer: self.special_layer,
        })
    }
}
