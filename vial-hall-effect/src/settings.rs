//! Device geometry, switch travel options and profile selection

use serde::{Deserialize, Serialize};

use crate::actuation::TravelDistance;
use crate::error::HallEffectError;
use crate::matrix::{DEFAULT_PROFILE, SPECIAL_PROFILE};

/// Total travel distances selectable by the switch option, in order
pub const DEFAULT_TRAVEL_OPTIONS: [u16; 5] = [320, 340, 350, 380, 390];

/// Physical key matrix and layer count of a keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixGeometry {
    pub rows: u8,
    pub cols: u8,
    /// Number of keymap layers (bounds the special layer)
    pub layers: u8,
}

impl MatrixGeometry {
    pub fn new(rows: u8, cols: u8, layers: u8) -> Self {
        Self { rows, cols, layers }
    }

    /// Cells in one profile
    pub fn cells_per_profile(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn contains(&self, row: u8, col: u8) -> bool {
        row < self.rows && col < self.cols
    }
}

/// Ordered table of total travel distances indexed by the switch option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TravelDistance>", into = "Vec<TravelDistance>")]
pub struct SwitchOptions {
    travels: Vec<TravelDistance>,
}

impl Default for SwitchOptions {
    fn default() -> Self {
        Self {
            travels: DEFAULT_TRAVEL_OPTIONS
                .iter()
                .map(|&t| TravelDistance::from_hundredths(t))
                .collect(),
        }
    }
}

impl SwitchOptions {
    /// Build a custom table; must be non-empty, fit a `u8` index and
    /// leave room for the minimum actuation point
    pub fn new(travels: Vec<TravelDistance>) -> Result<Self, HallEffectError> {
        if travels.is_empty() || travels.len() > u8::MAX as usize {
            return Err(HallEffectError::InvalidParameter(format!(
                "switch option table needs 1..=255 entries, got {}",
                travels.len()
            )));
        }
        if let Some(t) = travels.iter().find(|t| t.hundredths() < 20) {
            return Err(HallEffectError::InvalidParameter(format!(
                "total travel {t} is too short"
            )));
        }
        Ok(Self { travels })
    }

    pub fn len(&self) -> usize {
        self.travels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.travels.is_empty()
    }

    /// Total travel selected by `option`
    pub fn travel(&self, option: u8) -> Option<TravelDistance> {
        self.travels.get(option as usize).copied()
    }

    /// Option index selecting `travel`
    pub fn option_for(&self, travel: TravelDistance) -> Option<u8> {
        self.travels.iter().position(|&t| t == travel).map(|i| i as u8)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, TravelDistance)> + '_ {
        self.travels.iter().enumerate().map(|(i, &t)| (i as u8, t))
    }
}

impl TryFrom<Vec<TravelDistance>> for SwitchOptions {
    type Error = HallEffectError;

    fn try_from(travels: Vec<TravelDistance>) -> Result<Self, Self::Error> {
        Self::new(travels)
    }
}

impl From<SwitchOptions> for Vec<TravelDistance> {
    fn from(options: SwitchOptions) -> Self {
        options.travels
    }
}

/// Profile in effect on `current_layer`
///
/// `special_layer` 0 means none; `N > 0` selects the special profile on
/// layer `N - 1`.
pub fn active_profile(special_layer: u8, current_layer: u8) -> u8 {
    if special_layer > 0 && current_layer == special_layer - 1 {
        SPECIAL_PROFILE
    } else {
        DEFAULT_PROFILE
    }
}
