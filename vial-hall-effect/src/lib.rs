//! Hall Effect actuation protocol for Vial magnetic keyboards
//!
//! [`HallEffectKeyboard`] owns an in-memory mirror of the keyboard's analog
//! configuration (per-key actuation in two profiles, input priority pairs,
//! switch travel and special layer) and keeps it in step with firmware over a
//! [`RetryTransport`]. Mutators update the mirror, then write the device; the
//! mirror stays the source of truth for reads until the next reload.

pub mod actuation;
pub mod error;
pub mod events;
pub mod matrix;
pub mod priority;
pub mod settings;
pub mod snapshot;

pub use actuation::{
    to_millimeters10, to_millimeters5, to_raw, ActuationConfig, ActuationSettings, RtMode,
    TravelDistance,
};
pub use error::{HallEffectError, ReloadSection};
pub use events::HallEffectEvent;
pub use matrix::{ActuationMatrix, CellAddress, PROFILE_COUNT};
pub use priority::{InputPriorityPair, InputPriorityTable, Resolution, SlotWrite};
pub use settings::{active_profile, MatrixGeometry, SwitchOptions};
pub use snapshot::HallEffectSnapshot;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use vial_transport::protocol::{self, PRIORITY_SLOTS};
use vial_transport::{
    ActuationRecord, ByteResponse, GetActuation, GetPriorityPair, HidCommand,
    PriorityPairResponse, QuerySpecialLayer, QuerySwitchOption, RetryTransport, SetActuation,
    SetPriorityPair, SetSpecialLayer, SetSwitchOption, StatusResponse, TransportDeviceInfo,
};

use matrix::SPECIAL_PROFILE;

/// Sync engine: device mirror plus every operation that reads or writes it
pub struct HallEffectKeyboard {
    transport: Arc<RetryTransport>,
    geometry: MatrixGeometry,
    switch_options: SwitchOptions,
    matrix: Option<ActuationMatrix>,
    pairs: Option<InputPriorityTable>,
    switch_option: Option<u8>,
    special_layer: Option<u8>,
    events: broadcast::Sender<HallEffectEvent>,
}

impl HallEffectKeyboard {
    /// Create an interface with nothing loaded; call [`reload`](Self::reload) next
    pub fn new(transport: Arc<RetryTransport>, geometry: MatrixGeometry) -> Self {
        let (events, _) = broadcast::channel(events::EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            geometry,
            switch_options: SwitchOptions::default(),
            matrix: None,
            pairs: None,
            switch_option: None,
            special_layer: None,
            events,
        }
    }

    /// Use a custom total-travel table
    pub fn with_switch_options(mut self, switch_options: SwitchOptions) -> Self {
        self.switch_options = switch_options;
        self
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &Arc<RetryTransport> {
        &self.transport
    }

    pub fn device_info(&self) -> &TransportDeviceInfo {
        self.transport.device_info()
    }

    pub fn geometry(&self) -> MatrixGeometry {
        self.geometry
    }

    pub fn switch_options(&self) -> &SwitchOptions {
        &self.switch_options
    }

    /// Receive a [`HallEffectEvent`] after every successful change
    pub fn subscribe(&self) -> broadcast::Receiver<HallEffectEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: HallEffectEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn send_set<C: HidCommand>(&self, command: &C) -> Result<(), HallEffectError> {
        let _: StatusResponse = self.transport.query(command)?;
        Ok(())
    }

    fn read_byte<C: HidCommand + Default>(&self) -> Result<u8, HallEffectError> {
        let resp: ByteResponse = self.transport.query(&C::default())?;
        Ok(resp.value)
    }

    // === Reload ===

    /// Read the whole Hall Effect state from the device.
    ///
    /// Each section (matrix, pairs, switch option, special layer) is either
    /// fully loaded or marked not loaded; a partial section is never kept.
    /// If any section failed, returns [`HallEffectError::PartialReload`]
    /// naming them, with the loaded sections still usable.
    pub fn reload(&mut self) -> Result<(), HallEffectError> {
        let mut failed = Vec::new();

        self.matrix = match self.read_matrix() {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                warn!("Actuation matrix not loaded: {}", e);
                failed.push(ReloadSection::ActuationMatrix);
                None
            }
        };

        self.pairs = match self.read_priority_pairs() {
            Ok(pairs) => Some(pairs),
            Err(e) => {
                warn!("Input priority pairs not loaded: {}", e);
                failed.push(ReloadSection::PriorityPairs);
                None
            }
        };

        self.switch_option = match self.read_byte::<QuerySwitchOption>() {
            Ok(option) => Some(option),
            Err(e) => {
                warn!("Switch option not loaded: {}", e);
                failed.push(ReloadSection::SwitchOption);
                None
            }
        };

        self.special_layer = match self.read_byte::<QuerySpecialLayer>() {
            Ok(layer) => Some(layer),
            Err(e) => {
                warn!("Special layer not loaded: {}", e);
                failed.push(ReloadSection::SpecialLayer);
                None
            }
        };

        if !failed.is_empty() {
            return Err(HallEffectError::PartialReload { failed });
        }

        info!(
            "Loaded {} actuation cells, {} priority pairs",
            PROFILE_COUNT as usize * self.geometry.cells_per_profile(),
            self.pairs.as_ref().map_or(0, InputPriorityTable::len)
        );
        self.emit(HallEffectEvent::Reloaded);
        Ok(())
    }

    fn read_matrix(&self) -> Result<ActuationMatrix, HallEffectError> {
        let MatrixGeometry { rows, cols, .. } = self.geometry;
        let mut cells = Vec::with_capacity(PROFILE_COUNT as usize * self.geometry.cells_per_profile());
        for profile in 0..PROFILE_COUNT {
            for row in 0..rows {
                for col in 0..cols {
                    let record: ActuationRecord =
                        self.transport.query(&GetActuation { profile, row, col })?;
                    cells.push(ActuationConfig::from(record));
                }
            }
        }
        ActuationMatrix::from_cells(rows, cols, cells)
            .ok_or_else(|| HallEffectError::UnexpectedResponse("actuation cell count".into()))
    }

    fn read_priority_pairs(&self) -> Result<InputPriorityTable, HallEffectError> {
        let mut pairs = Vec::new();
        for index in 0..PRIORITY_SLOTS as u8 {
            let resp: PriorityPairResponse = self.transport.query(&GetPriorityPair { index })?;
            if protocol::is_empty_priority_slot(&resp.slot) {
                debug!("Priority slot {} empty, {} pairs stored", index, pairs.len());
                break;
            }
            pairs.push(InputPriorityPair::from_slot(resp.slot));
        }
        InputPriorityTable::from_pairs(pairs)
    }

    /// Whether the last reload loaded the matrix and both scalar settings,
    /// i.e. the firmware speaks the Hall Effect protocol
    pub fn is_supported(&self) -> bool {
        self.matrix.is_some() && self.switch_option.is_some() && self.special_layer.is_some()
    }

    // === Getters ===

    pub fn matrix(&self) -> Option<&ActuationMatrix> {
        self.matrix.as_ref()
    }

    pub fn priority_pairs(&self) -> Option<&InputPriorityTable> {
        self.pairs.as_ref()
    }

    pub fn switch_option(&self) -> Option<u8> {
        self.switch_option
    }

    pub fn special_layer(&self) -> Option<u8> {
        self.special_layer
    }

    fn loaded_matrix(&self) -> Result<&ActuationMatrix, HallEffectError> {
        self.matrix
            .as_ref()
            .ok_or(HallEffectError::NotLoaded(ReloadSection::ActuationMatrix))
    }

    fn loaded_pairs_mut(&mut self) -> Result<&mut InputPriorityTable, HallEffectError> {
        self.pairs
            .as_mut()
            .ok_or(HallEffectError::NotLoaded(ReloadSection::PriorityPairs))
    }

    /// Mirrored actuation config of one cell
    pub fn actuation(&self, profile: u8, row: u8, col: u8) -> Result<ActuationConfig, HallEffectError> {
        self.loaded_matrix()?
            .get(profile, row, col)
            .copied()
            .ok_or_else(|| cell_out_of_range(profile, row, col))
    }

    /// Total travel selected by the current switch option
    pub fn total_travel(&self) -> Result<TravelDistance, HallEffectError> {
        let option = self
            .switch_option
            .ok_or(HallEffectError::NotLoaded(ReloadSection::SwitchOption))?;
        self.switch_options.travel(option).ok_or_else(|| {
            HallEffectError::UnexpectedResponse(format!(
                "switch option {} outside travel table ({} entries)",
                option,
                self.switch_options.len()
            ))
        })
    }

    /// Mirrored actuation of one cell in millimetres
    pub fn actuation_mm(&self, profile: u8, row: u8, col: u8) -> Result<ActuationSettings, HallEffectError> {
        let config = self.actuation(profile, row, col)?;
        Ok(ActuationSettings::decode(&config, self.total_travel()?))
    }

    // === Actuation ===

    /// Write one cell's mirrored value to the device
    pub fn write_cell(&self, profile: u8, row: u8, col: u8) -> Result<(), HallEffectError> {
        let config = self.actuation(profile, row, col)?;
        self.send_set(&SetActuation {
            profile,
            row,
            col,
            record: config.into(),
        })
    }

    /// Update the mirror, write it, and restore the old value if the write fails
    fn store_cell(&mut self, addr: CellAddress, config: ActuationConfig) -> Result<(), HallEffectError> {
        let CellAddress { profile, row, col } = addr;
        let matrix = self
            .matrix
            .as_mut()
            .ok_or(HallEffectError::NotLoaded(ReloadSection::ActuationMatrix))?;
        let old = matrix
            .set(profile, row, col, config)
            .ok_or_else(|| cell_out_of_range(profile, row, col))?;

        if let Err(e) = self.write_cell(profile, row, col) {
            if let Some(matrix) = self.matrix.as_mut() {
                matrix.set(profile, row, col, old);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Set one cell in raw units
    pub fn set_actuation(
        &mut self,
        profile: u8,
        row: u8,
        col: u8,
        config: ActuationConfig,
    ) -> Result<(), HallEffectError> {
        self.store_cell(CellAddress { profile, row, col }, config.normalized())?;
        self.emit(HallEffectEvent::ActuationChanged { profile, row, col });
        Ok(())
    }

    /// Set one cell in millimetres against the current total travel
    pub fn set_actuation_mm(
        &mut self,
        profile: u8,
        row: u8,
        col: u8,
        settings: &ActuationSettings,
    ) -> Result<(), HallEffectError> {
        let config = settings.encode(self.total_travel()?)?;
        self.set_actuation(profile, row, col, config)
    }

    /// Rewrite every cell of `profile` to the default, one write per cell.
    ///
    /// Stops at the first failed write; earlier cells stay reset.
    pub fn reset_profile(&mut self, profile: u8) -> Result<(), HallEffectError> {
        if profile >= PROFILE_COUNT {
            return Err(HallEffectError::InvalidParameter(format!(
                "profile {} out of range (0-{})",
                profile,
                PROFILE_COUNT - 1
            )));
        }
        let cells: Vec<CellAddress> = self.loaded_matrix()?.profile_cells(profile).collect();
        for addr in cells {
            if let Err(e) = self.store_cell(addr, ActuationConfig::DEFAULT) {
                warn!(
                    "Profile {} reset aborted at row {} col {}: {}",
                    profile, addr.row, addr.col, e
                );
                return Err(e);
            }
        }
        info!("Reset profile {}", profile);
        self.emit(HallEffectEvent::ProfileReset { profile });
        Ok(())
    }

    // === Input priority pairs ===

    /// Append a pair in slot `len()`, returning its index
    pub fn append_priority_pair(&mut self, pair: InputPriorityPair) -> Result<u8, HallEffectError> {
        let index = self.loaded_pairs_mut()?.push(pair)?;
        let write = SlotWrite::Pair { index, pair };
        if let Err(e) = self.send_set(&write.to_command()) {
            if let Some(pairs) = self.pairs.as_mut() {
                pairs.pop();
            }
            return Err(e);
        }
        self.emit(HallEffectEvent::PriorityPairsChanged);
        Ok(index)
    }

    /// Overwrite the pair at `index` in place
    pub fn replace_priority_pair(
        &mut self,
        index: usize,
        pair: InputPriorityPair,
    ) -> Result<(), HallEffectError> {
        let old = self.loaded_pairs_mut()?.replace(index, pair)?;
        let write = SlotWrite::Pair {
            index: index as u8,
            pair,
        };
        if let Err(e) = self.send_set(&write.to_command()) {
            if let Some(pairs) = self.pairs.as_mut() {
                let _ = pairs.replace(index, old);
            }
            return Err(e);
        }
        self.emit(HallEffectEvent::PriorityPairsChanged);
        Ok(())
    }

    /// Remove the pair at `index` and compact the device array.
    ///
    /// Successors are rewritten one slot lower and every slot from the new
    /// length to 7 gets the sentinel. Stops at the first failed write; the
    /// local list already reflects the removal.
    pub fn remove_priority_pair(&mut self, index: usize) -> Result<InputPriorityPair, HallEffectError> {
        let table = self.loaded_pairs_mut()?;
        let removed = table.remove(index)?;
        let writes = table.dense_writes(index);

        for write in writes {
            if let Err(e) = self.send_set(&write.to_command()) {
                warn!(
                    "Priority pair compaction aborted at slot {}: {}",
                    write.index(),
                    e
                );
                return Err(e);
            }
        }
        self.emit(HallEffectEvent::PriorityPairsChanged);
        Ok(removed)
    }

    // === Device settings ===

    /// Select a total-travel option and re-quantize the whole matrix.
    ///
    /// Writes the option first, then every cell whose raw value changes.
    /// Re-selecting the current travel rewrites only the option, as does
    /// replacing a device option that is outside the travel table.
    /// A failed cell write keeps that cell's old raw value in the mirror
    /// (which is what the device still holds) and stops.
    pub fn set_switch_option(&mut self, option: u8) -> Result<(), HallEffectError> {
        let new_travel = self.switch_options.travel(option).ok_or_else(|| {
            HallEffectError::InvalidParameter(format!(
                "switch option {} out of range (0-{})",
                option,
                self.switch_options.len() - 1
            ))
        })?;
        let old_travel = match self.total_travel() {
            Ok(travel) => Some(travel),
            Err(HallEffectError::UnexpectedResponse(reason)) => {
                warn!("{}; selecting {} without re-quantization", reason, new_travel);
                None
            }
            Err(e) => return Err(e),
        };
        let changes = match old_travel {
            Some(old) if old != new_travel => self.loaded_matrix()?.requantized(old, new_travel),
            _ => Vec::new(),
        };

        let previous = self.switch_option.replace(option);
        if let Err(e) = self.send_set(&SetSwitchOption { option }) {
            self.switch_option = previous;
            return Err(e);
        }

        for &(addr, config) in &changes {
            if let Err(e) = self.store_cell(addr, config) {
                warn!(
                    "Re-quantization for {} aborted at profile {} row {} col {}: {}",
                    new_travel, addr.profile, addr.row, addr.col, e
                );
                return Err(e);
            }
        }
        info!(
            "Total travel -> {}, {} cells re-quantized",
            new_travel,
            changes.len()
        );
        self.emit(HallEffectEvent::SwitchOptionChanged {
            option,
            requantized: changes.len(),
        });
        Ok(())
    }

    /// Select the special layer (0 = none, N = layer N-1 uses profile 1).
    ///
    /// Selecting 0 also resets profile 1, which is no longer reachable.
    pub fn set_special_layer(&mut self, layer: u8) -> Result<(), HallEffectError> {
        if layer > self.geometry.layers {
            return Err(HallEffectError::InvalidParameter(format!(
                "special layer {} out of range (0-{})",
                layer, self.geometry.layers
            )));
        }
        if layer == 0 {
            self.loaded_matrix()?;
        }

        let previous = self.special_layer.replace(layer);
        if let Err(e) = self.send_set(&SetSpecialLayer { layer }) {
            self.special_layer = previous;
            return Err(e);
        }
        self.emit(HallEffectEvent::SpecialLayerChanged { layer });

        if layer == 0 {
            self.reset_profile(SPECIAL_PROFILE)?;
        }
        Ok(())
    }

    /// Profile in effect on `current_layer` under the mirrored special layer,
    /// or `None` while the special layer is not loaded
    pub fn active_profile(&self, current_layer: u8) -> Option<u8> {
        self.special_layer
            .map(|special| active_profile(special, current_layer))
    }

    // === Backup / restore ===

    /// Copy of the whole mirrored state; every section must be loaded
    pub fn snapshot(&self) -> Result<HallEffectSnapshot, HallEffectError> {
        let matrix = self.loaded_matrix()?;
        let pairs = self
            .pairs
            .as_ref()
            .ok_or(HallEffectError::NotLoaded(ReloadSection::PriorityPairs))?;
        let switch_option = self
            .switch_option
            .ok_or(HallEffectError::NotLoaded(ReloadSection::SwitchOption))?;
        let special_layer = self
            .special_layer
            .ok_or(HallEffectError::NotLoaded(ReloadSection::SpecialLayer))?;
        Ok(HallEffectSnapshot::capture(
            matrix,
            pairs,
            switch_option,
            special_layer,
        ))
    }

    /// Load a snapshot into the mirror and write all of it to the device.
    ///
    /// Writes every matrix cell, every pair slot (padding to 8 with
    /// sentinels), the switch option and the special layer, in that order.
    /// The snapshot is validated first; after that nothing is rolled back,
    /// so a failed write leaves the device part old, part new.
    pub fn restore(&mut self, snapshot: &HallEffectSnapshot) -> Result<(), HallEffectError> {
        let valid = snapshot.validate(&self.geometry, &self.switch_options)?;
        let cells: Vec<CellAddress> = valid.matrix.cells().collect();
        let slot_writes = valid.pairs.dense_writes(0);

        self.matrix = Some(valid.matrix);
        self.pairs = Some(valid.pairs);
        self.switch_option = Some(valid.switch_option);
        self.special_layer = Some(valid.special_layer);

        if let Err(e) = self.write_restored(&cells, &slot_writes) {
            warn!("Restore aborted, device holds mixed old and new values: {}", e);
            return Err(e);
        }
        info!(
            "Restored {} cells, {} priority pairs",
            cells.len(),
            snapshot.input_priority_pairs.len()
        );
        self.emit(HallEffectEvent::Restored);
        Ok(())
    }

    fn write_restored(
        &self,
        cells: &[CellAddress],
        slot_writes: &[SlotWrite],
    ) -> Result<(), HallEffectError> {
        for addr in cells {
            self.write_cell(addr.profile, addr.row, addr.col)?;
        }
        for write in slot_writes {
            self.send_set::<SetPriorityPair>(&write.to_command())?;
        }
        if let Some(option) = self.switch_option {
            self.send_set(&SetSwitchOption { option })?;
        }
        if let Some(layer) = self.special_layer {
            self.send_set(&SetSpecialLayer { layer })?;
        }
        Ok(())
    }
}

fn cell_out_of_range(profile: u8, row: u8, col: u8) -> HallEffectError {
    HallEffectError::InvalidParameter(format!(
        "cell profile {} row {} col {} out of range",
        profile, row, col
    ))
}
