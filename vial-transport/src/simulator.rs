//! In-memory Hall Effect firmware model
//!
//! `SimulatedKeyboard` implements the raw [`Transport`] trait and answers
//! every Hall Effect command the way firmware does: a two-profile actuation
//! table, eight dense priority slots, and the two scalar settings. It keeps a
//! log of every request and can inject failures, which makes it the test
//! double for everything above the transport.

use parking_lot::Mutex;

use crate::command::{try_parse_command, ActuationRecord, ParsedCommand};
use crate::error::TransportError;
use crate::protocol::{self, PRIORITY_SLOTS, REPORT_SIZE};
use crate::types::{TransportDeviceInfo, TransportType};
use crate::Transport;

/// Status byte returned for out-of-range arguments and unknown operations
const STATUS_INVALID: u8 = 0x01;

/// Factory default for every actuation cell
pub const DEFAULT_ACTUATION: ActuationRecord = ActuationRecord {
    actuation_point: 128,
    rt_mode: 0,
    rt_press: 0,
    rt_release: 0,
};

struct SimState {
    actuation: Vec<ActuationRecord>,
    priority_slots: [[u8; 6]; PRIORITY_SLOTS],
    switch_option: u8,
    special_layer: u8,
    requests: Vec<Vec<u8>>,
    pending: Option<Vec<u8>>,
    offline: bool,
    transient_failures: usize,
    failing_prefixes: Vec<Vec<u8>>,
    rejected_ops: Vec<(u8, u8)>,
}

/// Simulated keyboard answering Hall Effect commands from memory
pub struct SimulatedKeyboard {
    rows: u8,
    cols: u8,
    info: TransportDeviceInfo,
    state: Mutex<SimState>,
}

impl SimulatedKeyboard {
    /// Create a simulated keyboard with factory defaults for the given geometry
    pub fn new(rows: u8, cols: u8) -> Self {
        let cells = 2 * rows as usize * cols as usize;
        Self {
            rows,
            cols,
            info: TransportDeviceInfo {
                vid: 0,
                pid: 0,
                transport_type: TransportType::Simulated,
                device_path: "simulated".into(),
                product_name: Some(format!("Simulated HE keyboard ({rows}x{cols})")),
            },
            state: Mutex::new(SimState {
                actuation: vec![DEFAULT_ACTUATION; cells],
                priority_slots: [protocol::EMPTY_PRIORITY_PAIR; PRIORITY_SLOTS],
                switch_option: 0,
                special_layer: 0,
                requests: Vec::new(),
                pending: None,
                offline: false,
                transient_failures: 0,
                failing_prefixes: Vec::new(),
                rejected_ops: Vec::new(),
            }),
        }
    }

    fn cell_index(&self, profile: u8, row: u8, col: u8) -> Option<usize> {
        if profile > 1 || row >= self.rows || col >= self.cols {
            return None;
        }
        let (rows, cols) = (self.rows as usize, self.cols as usize);
        Some((profile as usize * rows + row as usize) * cols + col as usize)
    }

    // === Inspection / seeding ===

    /// Stored actuation record of a cell
    pub fn actuation(&self, profile: u8, row: u8, col: u8) -> Option<ActuationRecord> {
        let idx = self.cell_index(profile, row, col)?;
        Some(self.state.lock().actuation[idx])
    }

    /// Overwrite a cell without going through the protocol
    pub fn set_actuation(&self, profile: u8, row: u8, col: u8, record: ActuationRecord) {
        if let Some(idx) = self.cell_index(profile, row, col) {
            self.state.lock().actuation[idx] = record;
        }
    }

    /// Raw contents of all eight priority slots
    pub fn priority_slots(&self) -> [[u8; 6]; PRIORITY_SLOTS] {
        self.state.lock().priority_slots
    }

    /// Overwrite a priority slot without going through the protocol
    pub fn set_priority_slot(&self, index: usize, slot: [u8; 6]) {
        if index < PRIORITY_SLOTS {
            self.state.lock().priority_slots[index] = slot;
        }
    }

    pub fn switch_option(&self) -> u8 {
        self.state.lock().switch_option
    }

    pub fn set_switch_option(&self, option: u8) {
        self.state.lock().switch_option = option;
    }

    pub fn special_layer(&self) -> u8 {
        self.state.lock().special_layer
    }

    pub fn set_special_layer(&self, layer: u8) {
        self.state.lock().special_layer = layer;
    }

    /// Every request buffer received so far, in order
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.state.lock().requests.clone()
    }

    /// Decoded requests received so far
    pub fn parsed_requests(&self) -> Vec<ParsedCommand> {
        self.state
            .lock()
            .requests
            .iter()
            .filter_map(|r| try_parse_command(r))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    // === Failure injection ===

    /// Stop answering (every send fails) until set back to `false`
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Drop the next `count` requests without applying or answering them
    pub fn fail_next(&self, count: usize) {
        self.state.lock().transient_failures = count;
    }

    /// Never answer requests starting with `prefix`
    pub fn fail_matching(&self, prefix: &[u8]) {
        self.state.lock().failing_prefixes.push(prefix.to_vec());
    }

    /// Answer every request for `op` with a non-zero `status`
    pub fn reject_op(&self, op: u8, status: u8) {
        self.state.lock().rejected_ops.push((op, status));
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.offline = false;
        state.transient_failures = 0;
        state.failing_prefixes.clear();
        state.rejected_ops.clear();
    }

    fn respond(&self, state: &mut SimState, command: ParsedCommand) -> Vec<u8> {
        let mut resp = vec![0u8; REPORT_SIZE];
        let payload: Option<Vec<u8>> = match command {
            ParsedCommand::GetActuation(c) => self
                .cell_index(c.profile, c.row, c.col)
                .map(|idx| {
                    let r = state.actuation[idx];
                    vec![r.actuation_point, r.rt_mode, r.rt_press, r.rt_release]
                }),
            ParsedCommand::SetActuation(c) => {
                self.cell_index(c.profile, c.row, c.col).map(|idx| {
                    state.actuation[idx] = c.record;
                    Vec::new()
                })
            }
            ParsedCommand::GetPriorityPair(c) => state
                .priority_slots
                .get(c.index as usize)
                .map(|slot| slot.to_vec()),
            ParsedCommand::SetPriorityPair(c) => state
                .priority_slots
                .get_mut(c.index as usize)
                .map(|slot| {
                    *slot = c.slot;
                    Vec::new()
                }),
            ParsedCommand::GetSwitchOption => Some(vec![state.switch_option]),
            ParsedCommand::SetSwitchOption(c) => {
                state.switch_option = c.option;
                Some(Vec::new())
            }
            ParsedCommand::GetSpecialLayer => Some(vec![state.special_layer]),
            ParsedCommand::SetSpecialLayer(c) => {
                state.special_layer = c.layer;
                Some(Vec::new())
            }
            ParsedCommand::Unknown { .. } => None,
        };

        match payload {
            Some(payload) => {
                resp[0] = protocol::STATUS_OK;
                resp[1..1 + payload.len()].copy_from_slice(&payload);
            }
            None => resp[0] = STATUS_INVALID,
        }
        resp
    }
}

impl Transport for SimulatedKeyboard {
    fn send_report(&self, report: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.requests.push(report.to_vec());
        state.pending = None;

        if state.offline {
            return Err(TransportError::Disconnected);
        }
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Ok(());
        }
        if state
            .failing_prefixes
            .iter()
            .any(|prefix| report.starts_with(prefix))
        {
            return Ok(());
        }

        let Some(command) = try_parse_command(report) else {
            return Ok(());
        };
        let op = report[1];
        let rejected = state
            .rejected_ops
            .iter()
            .find(|(rejected_op, _)| *rejected_op == op)
            .map(|&(_, status)| status);

        let resp = match rejected {
            Some(status) => {
                let mut resp = vec![0u8; REPORT_SIZE];
                resp[0] = status;
                resp
            }
            None => self.respond(&mut state, command),
        };
        state.pending = Some(resp);
        Ok(())
    }

    fn read_report(&self) -> Result<Vec<u8>, TransportError> {
        self.state.lock().pending.take().ok_or(TransportError::Timeout)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn is_connected(&self) -> bool {
        !self.state.lock().offline
    }

    fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{GetActuation, GetPriorityPair, HidCommand, SetActuation, SetPriorityPair};
    use crate::protocol::cmd;

    fn exchange(sim: &SimulatedKeyboard, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        sim.send_report(request)?;
        sim.read_report()
    }

    #[test]
    fn test_factory_defaults() {
        let sim = SimulatedKeyboard::new(2, 2);
        let resp = exchange(
            &sim,
            &GetActuation {
                profile: 1,
                row: 1,
                col: 1,
            }
            .build(),
        )
        .unwrap();
        assert_eq!(&resp[..5], &[0, 128, 0, 0, 0]);
        assert_eq!(sim.priority_slots(), [[255; 6]; 8]);
    }

    #[test]
    fn test_set_then_get_actuation() {
        let sim = SimulatedKeyboard::new(2, 2);
        let record = ActuationRecord {
            actuation_point: 60,
            rt_mode: 2,
            rt_press: 5,
            rt_release: 9,
        };
        let set = SetActuation {
            profile: 0,
            row: 1,
            col: 0,
            record,
        };
        assert_eq!(exchange(&sim, &set.build()).unwrap()[0], 0);
        assert_eq!(sim.actuation(0, 1, 0), Some(record));
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let sim = SimulatedKeyboard::new(2, 2);
        let resp = exchange(
            &sim,
            &GetActuation {
                profile: 2,
                row: 0,
                col: 0,
            }
            .build(),
        )
        .unwrap();
        assert_eq!(resp[0], STATUS_INVALID);

        let resp = exchange(&sim, &GetPriorityPair { index: 8 }.build()).unwrap();
        assert_eq!(resp[0], STATUS_INVALID);
    }

    #[test]
    fn test_priority_slot_roundtrip() {
        let sim = SimulatedKeyboard::new(1, 1);
        let set = SetPriorityPair {
            index: 2,
            slot: [0, 0, 1, 0, 2, 3],
        };
        exchange(&sim, &set.build()).unwrap();
        let resp = exchange(&sim, &GetPriorityPair { index: 2 }.build()).unwrap();
        assert_eq!(&resp[..7], &[0, 0, 0, 1, 0, 2, 3]);
    }

    #[test]
    fn test_failure_injection() {
        let sim = SimulatedKeyboard::new(1, 1);
        let request = GetPriorityPair { index: 0 }.build();

        sim.fail_next(1);
        assert!(matches!(exchange(&sim, &request), Err(TransportError::Timeout)));
        assert!(exchange(&sim, &request).is_ok());

        sim.fail_matching(&request[..3]);
        assert!(exchange(&sim, &request).is_err());
        assert!(exchange(&sim, &GetPriorityPair { index: 1 }.build()).is_ok());

        sim.clear_failures();
        sim.reject_op(cmd::GET_HE_PRIORITY_PAIR, 0x05);
        assert_eq!(exchange(&sim, &request).unwrap()[0], 0x05);

        sim.clear_failures();
        sim.set_offline(true);
        assert!(!sim.is_connected());
        assert!(matches!(
            exchange(&sim, &request),
            Err(TransportError::Disconnected)
        ));
        assert_eq!(sim.requests().len(), 6);
    }
}
