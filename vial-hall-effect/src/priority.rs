//! Input priority pairs
//!
//! Firmware stores up to eight pairs in a dense slot array: slots `[0, N)`
//! hold pairs and slots `[N, 8)` hold the all-0xFF sentinel. There is no
//! delete command, so removing a pair shifts its successors down one slot and
//! re-pads the tail with sentinels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vial_transport::protocol::{self, EMPTY_PRIORITY_PAIR, PRIORITY_SLOTS};
use vial_transport::SetPriorityPair;

use crate::error::HallEffectError;

/// How simultaneous activation of both keys of a pair resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// The most recently pressed key wins
    #[default]
    LastWins,
    /// Key A always wins
    AbsoluteA,
    /// Key B always wins
    AbsoluteB,
    /// Neither key is sent while both are held
    Neutral,
    /// The deeper-pressed key wins
    DepthPriority,
    /// Value not known to this client
    Unknown(u8),
}

impl Resolution {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::LastWins,
            1 => Self::AbsoluteA,
            2 => Self::AbsoluteB,
            3 => Self::Neutral,
            4 => Self::DepthPriority,
            v => Self::Unknown(v),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::LastWins => 0,
            Self::AbsoluteA => 1,
            Self::AbsoluteB => 2,
            Self::Neutral => 3,
            Self::DepthPriority => 4,
            Self::Unknown(v) => v,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastWins => f.write_str("last-wins"),
            Self::AbsoluteA => f.write_str("absolute-a"),
            Self::AbsoluteB => f.write_str("absolute-b"),
            Self::Neutral => f.write_str("neutral"),
            Self::DepthPriority => f.write_str("depth"),
            Self::Unknown(v) => write!(f, "unknown({v})"),
        }
    }
}

impl FromStr for Resolution {
    type Err = HallEffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last-wins" | "last" | "0" => Ok(Self::LastWins),
            "absolute-a" | "a" | "1" => Ok(Self::AbsoluteA),
            "absolute-b" | "b" | "2" => Ok(Self::AbsoluteB),
            "neutral" | "3" => Ok(Self::Neutral),
            "depth" | "depth-priority" | "4" => Ok(Self::DepthPriority),
            _ => Err(HallEffectError::InvalidParameter(format!(
                "unknown resolution: {s}"
            ))),
        }
    }
}

/// A priority rule between two key positions on one layer
///
/// Serialized as the raw six-byte tuple
/// `[layer, row_a, col_a, row_b, col_b, resolution]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 6]", into = "[u8; 6]")]
pub struct InputPriorityPair {
    pub layer: u8,
    pub row_a: u8,
    pub col_a: u8,
    pub row_b: u8,
    pub col_b: u8,
    pub resolution: Resolution,
}

impl InputPriorityPair {
    pub fn from_slot(slot: [u8; 6]) -> Self {
        let [layer, row_a, col_a, row_b, col_b, resolution] = slot;
        Self {
            layer,
            row_a,
            col_a,
            row_b,
            col_b,
            resolution: Resolution::from_u8(resolution),
        }
    }

    pub fn to_slot(self) -> [u8; 6] {
        [
            self.layer,
            self.row_a,
            self.col_a,
            self.row_b,
            self.col_b,
            self.resolution.to_u8(),
        ]
    }

    /// Whether the device would read this pair back as an empty slot
    pub fn is_sentinel(&self) -> bool {
        protocol::is_empty_priority_slot(&self.to_slot())
    }
}

impl From<[u8; 6]> for InputPriorityPair {
    fn from(slot: [u8; 6]) -> Self {
        Self::from_slot(slot)
    }
}

impl From<InputPriorityPair> for [u8; 6] {
    fn from(pair: InputPriorityPair) -> Self {
        pair.to_slot()
    }
}

impl fmt::Display for InputPriorityPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "layer {}: ({},{}) vs ({},{}) {}",
            self.layer, self.row_a, self.col_a, self.row_b, self.col_b, self.resolution
        )
    }
}

/// One slot write needed to bring the device in line with the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWrite {
    Pair { index: u8, pair: InputPriorityPair },
    Empty { index: u8 },
}

impl SlotWrite {
    pub fn index(&self) -> u8 {
        match self {
            Self::Pair { index, .. } | Self::Empty { index } => *index,
        }
    }

    pub fn to_command(self) -> SetPriorityPair {
        match self {
            Self::Pair { index, pair } => SetPriorityPair {
                index,
                slot: pair.to_slot(),
            },
            Self::Empty { index } => SetPriorityPair {
                index,
                slot: EMPTY_PRIORITY_PAIR,
            },
        }
    }
}

/// Ordered, bounded list of priority pairs (capacity 8)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputPriorityTable {
    pairs: Vec<InputPriorityPair>,
}

impl InputPriorityTable {
    pub const CAPACITY: usize = PRIORITY_SLOTS;

    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a pair list, rejecting overfull lists and sentinel pairs
    pub fn from_pairs(pairs: Vec<InputPriorityPair>) -> Result<Self, HallEffectError> {
        if pairs.len() > Self::CAPACITY {
            return Err(HallEffectError::InvalidParameter(format!(
                "{} priority pairs exceed capacity {}",
                pairs.len(),
                Self::CAPACITY
            )));
        }
        if let Some(pair) = pairs.iter().find(|p| p.is_sentinel()) {
            return Err(HallEffectError::InvalidParameter(format!(
                "pair {pair} encodes as an empty slot"
            )));
        }
        Ok(Self { pairs })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pairs.len() >= Self::CAPACITY
    }

    pub fn get(&self, index: usize) -> Option<&InputPriorityPair> {
        self.pairs.get(index)
    }

    pub fn as_slice(&self) -> &[InputPriorityPair] {
        &self.pairs
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputPriorityPair> {
        self.pairs.iter()
    }

    /// Append at the end; the pair lands in slot `len()`
    pub(crate) fn push(&mut self, pair: InputPriorityPair) -> Result<u8, HallEffectError> {
        if self.is_full() {
            return Err(HallEffectError::InvalidParameter(format!(
                "priority pair table is full ({} pairs)",
                Self::CAPACITY
            )));
        }
        check_not_sentinel(&pair)?;
        self.pairs.push(pair);
        Ok((self.pairs.len() - 1) as u8)
    }

    /// Replace in place, returning the previous pair
    pub(crate) fn replace(
        &mut self,
        index: usize,
        pair: InputPriorityPair,
    ) -> Result<InputPriorityPair, HallEffectError> {
        check_not_sentinel(&pair)?;
        let len = self.pairs.len();
        let slot = self
            .pairs
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))?;
        Ok(std::mem::replace(slot, pair))
    }

    /// Remove locally, returning the removed pair
    pub(crate) fn remove(&mut self, index: usize) -> Result<InputPriorityPair, HallEffectError> {
        if index >= self.pairs.len() {
            return Err(out_of_range(index, self.pairs.len()));
        }
        Ok(self.pairs.remove(index))
    }

    pub(crate) fn pop(&mut self) -> Option<InputPriorityPair> {
        self.pairs.pop()
    }

    /// Slot writes that make device slots `[from, 8)` match this table
    ///
    /// Slots below `len()` get their pair, the rest get the sentinel. After
    /// removing index `i`, `dense_writes(i)` is the compaction sequence;
    /// `dense_writes(0)` rewrites the whole array.
    pub fn dense_writes(&self, from: usize) -> Vec<SlotWrite> {
        (from..Self::CAPACITY)
            .map(|i| match self.pairs.get(i) {
                Some(&pair) => SlotWrite::Pair {
                    index: i as u8,
                    pair,
                },
                None => SlotWrite::Empty { index: i as u8 },
            })
            .collect()
    }
}

fn check_not_sentinel(pair: &InputPriorityPair) -> Result<(), HallEffectError> {
    if pair.is_sentinel() {
        return Err(HallEffectError::InvalidParameter(format!(
            "pair {pair} encodes as an empty slot"
        )));
    }
    Ok(())
}

fn out_of_range(index: usize, len: usize) -> HallEffectError {
    HallEffectError::InvalidParameter(format!(
        "priority pair index {index} out of range (table holds {len})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(layer: u8, b: u8) -> InputPriorityPair {
        InputPriorityPair {
            layer,
            row_a: 0,
            col_a: 1,
            row_b: 0,
            col_b: b,
            resolution: Resolution::Neutral,
        }
    }

    #[test]
    fn test_slot_layout() {
        let p = pair(2, 3);
        assert_eq!(p.to_slot(), [2, 0, 1, 0, 3, 3]);
        assert_eq!(InputPriorityPair::from_slot([2, 0, 1, 0, 3, 3]), p);
        assert_eq!(
            InputPriorityPair::from_slot([0, 0, 0, 0, 0, 9]).resolution,
            Resolution::Unknown(9)
        );
    }

    #[test]
    fn test_sentinel_pairs_rejected() {
        let mut table = InputPriorityTable::new();
        let bad = InputPriorityPair::from_slot([255, 0, 0, 0, 1, 0]);
        assert!(bad.is_sentinel());
        assert!(table.push(bad).is_err());
        assert!(InputPriorityTable::from_pairs(vec![bad]).is_err());
    }

    #[test]
    fn test_capacity() {
        let mut table = InputPriorityTable::new();
        for i in 0..8 {
            assert_eq!(table.push(pair(0, i)).unwrap(), i);
        }
        assert!(table.is_full());
        assert!(table.push(pair(0, 9)).is_err());
        assert!(InputPriorityTable::from_pairs(vec![pair(0, 0); 9]).is_err());
    }

    #[test]
    fn test_remove_middle_compaction_plan() {
        let mut table = InputPriorityTable::from_pairs(vec![pair(0, 0), pair(0, 1), pair(0, 2)]).unwrap();
        let removed = table.remove(1).unwrap();
        assert_eq!(removed, pair(0, 1));
        assert_eq!(table.as_slice(), &[pair(0, 0), pair(0, 2)]);

        let writes = table.dense_writes(1);
        assert_eq!(writes.len(), 7);
        assert_eq!(
            writes[0],
            SlotWrite::Pair {
                index: 1,
                pair: pair(0, 2)
            }
        );
        for (w, index) in writes[1..].iter().zip(2u8..) {
            assert_eq!(*w, SlotWrite::Empty { index });
        }
    }

    #[test]
    fn test_remove_last_pads_only() {
        let mut table = InputPriorityTable::from_pairs(vec![pair(0, 0), pair(0, 1)]).unwrap();
        table.remove(1).unwrap();
        let writes = table.dense_writes(1);
        assert_eq!(writes.len(), 7);
        assert!(writes.iter().all(|w| matches!(w, SlotWrite::Empty { .. })));
        assert_eq!(writes[0].index(), 1);
    }

    #[test]
    fn test_remove_from_full_table() {
        let pairs: Vec<_> = (0..8).map(|i| pair(1, i)).collect();
        let mut table = InputPriorityTable::from_pairs(pairs.clone()).unwrap();
        table.remove(0).unwrap();
        let writes = table.dense_writes(0);
        assert_eq!(writes.len(), 8);
        for i in 0..7 {
            assert_eq!(
                writes[i],
                SlotWrite::Pair {
                    index: i as u8,
                    pair: pairs[i + 1]
                }
            );
        }
        assert_eq!(writes[7], SlotWrite::Empty { index: 7 });
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut table = InputPriorityTable::from_pairs(vec![pair(0, 0)]).unwrap();
        assert!(table.remove(1).is_err());
        assert!(table.replace(3, pair(0, 1)).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_slot_write_command() {
        let cmd = SlotWrite::Empty { index: 5 }.to_command();
        assert_eq!(cmd.index, 5);
        assert_eq!(cmd.slot, [255; 6]);
        let cmd = SlotWrite::Pair {
            index: 0,
            pair: pair(3, 4),
        }
        .to_command();
        assert_eq!(cmd.slot, [3, 0, 1, 0, 4, 3]);
    }

    #[test]
    fn test_pair_json_is_tuple() {
        let json = serde_json::to_string(&pair(1, 2)).unwrap();
        assert_eq!(json, "[1,0,1,0,2,3]");
        let back: InputPriorityPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair(1, 2));
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!("depth".parse::<Resolution>().unwrap(), Resolution::DepthPriority);
        assert_eq!("B".parse::<Resolution>().unwrap(), Resolution::AbsoluteB);
        assert!("x".parse::<Resolution>().is_err());
    }
}
