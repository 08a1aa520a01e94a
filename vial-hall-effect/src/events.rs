//! Change notifications for presentation layers

/// Broadcast channel capacity for change events
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Emitted after an operation has changed the mirrored state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HallEffectEvent {
    /// A full reload completed
    Reloaded,
    /// One cell was written
    ActuationChanged { profile: u8, row: u8, col: u8 },
    /// Every cell of a profile was reset to the default
    ProfileReset { profile: u8 },
    /// The priority pair list changed (append, replace or remove)
    PriorityPairsChanged,
    /// The total travel changed; `requantized` cells were rewritten
    SwitchOptionChanged { option: u8, requantized: usize },
    SpecialLayerChanged { layer: u8 },
    /// A backup was written to the device
    Restored,
}
