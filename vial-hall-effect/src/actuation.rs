//! Per-key actuation configuration and physical-unit conversion
//!
//! Raw device values are a linear fraction (0..=255) of the selected total
//! travel distance. All conversions use exact integer arithmetic with
//! round-half-to-even, so every result is reproducible bit for bit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vial_transport::ActuationRecord;

use crate::error::HallEffectError;

/// Actuation point written by a profile reset
pub const DEFAULT_ACTUATION_POINT: u8 = 128;

/// Granularity of the actuation point (hundredths of a millimetre)
pub const POINT_STEP: u16 = 10;

/// Granularity of rapid-trigger sensitivities (hundredths of a millimetre)
pub const SENSITIVITY_STEP: u16 = 5;

/// Headroom kept between the actuation point and full travel
pub const POINT_HEADROOM: u16 = 10;

/// Smallest accepted actuation point
pub const MIN_POINT: u16 = 10;

/// Accepted rapid-trigger sensitivity range
pub const MIN_SENSITIVITY: u16 = 10;
pub const MAX_SENSITIVITY: u16 = 100;

// =============================================================================
// Rounding and conversion
// =============================================================================

/// `num / den` rounded to nearest, ties to even
fn div_round_half_even(num: u32, den: u32) -> u32 {
    let (q, r) = (num / den, num % den);
    match (2 * r).cmp(&den) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q & 1),
    }
}

/// Snap a value to the nearest multiple of `step`, ties to even
pub fn snap(value: u16, step: u16) -> u16 {
    (div_round_half_even(value as u32, step as u32) * step as u32) as u16
}

/// Raw units to hundredths of a millimetre, without snapping
pub fn raw_to_hundredths(raw: u8, total_travel: u16) -> u16 {
    div_round_half_even(raw as u32 * total_travel as u32, 255) as u16
}

/// Raw units to hundredths of a millimetre, snapped to 0.10 mm
pub fn to_millimeters10(raw: u8, total_travel: u16) -> u16 {
    snap(raw_to_hundredths(raw, total_travel), POINT_STEP)
}

/// Raw units to hundredths of a millimetre, snapped to 0.05 mm
pub fn to_millimeters5(raw: u8, total_travel: u16) -> u16 {
    snap(raw_to_hundredths(raw, total_travel), SENSITIVITY_STEP)
}

/// Hundredths of a millimetre to raw units (saturates at 255)
pub fn to_raw(hundredths: u16, total_travel: u16) -> u8 {
    if total_travel == 0 {
        return 0;
    }
    div_round_half_even(hundredths as u32 * 255, total_travel as u32).min(255) as u8
}

// =============================================================================
// Travel distance
// =============================================================================

/// A distance in hundredths of a millimetre
///
/// Displays as `"1.80mm"`; parses `"1.8"`, `"1.80mm"` or `"1.8 mm"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct TravelDistance(u16);

impl TravelDistance {
    pub const fn from_hundredths(hundredths: u16) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(&self) -> u16 {
        self.0
    }

    /// Decode a raw device value against `total_travel`, snapped to `step`
    pub fn from_raw(raw: u8, total_travel: TravelDistance, step: u16) -> Self {
        Self(snap(raw_to_hundredths(raw, total_travel.0), step))
    }

    /// Encode to a raw device value against `total_travel`
    pub fn to_raw(&self, total_travel: TravelDistance) -> u8 {
        to_raw(self.0, total_travel.0)
    }
}

impl fmt::Display for TravelDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}mm", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for TravelDistance {
    type Err = HallEffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HallEffectError::InvalidParameter(format!("invalid distance: {s:?}"));
        let text = s.trim();
        let text = text.strip_suffix("mm").unwrap_or(text).trim_end();

        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u16 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: u16 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u16>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }
}

// =============================================================================
// Actuation configuration
// =============================================================================

/// Rapid-trigger mode of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum RtMode {
    /// Fixed actuation point only
    #[default]
    Off,
    /// Press/release follow direction of travel
    RapidTrigger,
    /// Rapid trigger that stays active until the key fully resets
    ContinuousRapidTrigger,
    /// Value not known to this client
    Unknown(u8),
}

impl RtMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Off,
            1 => Self::RapidTrigger,
            2 => Self::ContinuousRapidTrigger,
            v => Self::Unknown(v),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::RapidTrigger => 1,
            Self::ContinuousRapidTrigger => 2,
            Self::Unknown(v) => v,
        }
    }

    pub fn is_off(self) -> bool {
        self == Self::Off
    }
}

impl From<u8> for RtMode {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

impl From<RtMode> for u8 {
    fn from(mode: RtMode) -> Self {
        mode.to_u8()
    }
}

impl fmt::Display for RtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::RapidTrigger => f.write_str("rapid-trigger"),
            Self::ContinuousRapidTrigger => f.write_str("continuous"),
            Self::Unknown(v) => write!(f, "unknown({v})"),
        }
    }
}

impl FromStr for RtMode {
    type Err = HallEffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Ok(Self::Off),
            "rt" | "rapid-trigger" | "1" => Ok(Self::RapidTrigger),
            "crt" | "continuous" | "2" => Ok(Self::ContinuousRapidTrigger),
            _ => Err(HallEffectError::InvalidParameter(format!(
                "unknown rapid-trigger mode: {s}"
            ))),
        }
    }
}

/// One key's analog behaviour, in raw device units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuationConfig {
    pub actuation_point: u8,
    pub rt_mode: RtMode,
    pub rt_press: u8,
    pub rt_release: u8,
}

impl Default for ActuationConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ActuationConfig {
    /// Value every cell takes after a profile reset
    pub const DEFAULT: Self = Self {
        actuation_point: DEFAULT_ACTUATION_POINT,
        rt_mode: RtMode::Off,
        rt_press: 0,
        rt_release: 0,
    };

    /// Clear sensitivities when rapid trigger is off
    pub fn normalized(self) -> Self {
        if self.rt_mode.is_off() {
            Self {
                rt_press: 0,
                rt_release: 0,
                ..self
            }
        } else {
            self
        }
    }

    /// Re-derive raw values after the total travel changes from `from` to `to`.
    ///
    /// Values are decoded to millimetres on the old scale, snapped, the point
    /// clamped to `to - 0.10 mm`, and encoded on the new scale.
    pub fn requantize(self, from: TravelDistance, to: TravelDistance) -> Self {
        let (from, to) = (from.hundredths(), to.hundredths());
        let point = to_millimeters10(self.actuation_point, from).min(to.saturating_sub(POINT_HEADROOM));
        Self {
            actuation_point: to_raw(point, to),
            rt_mode: self.rt_mode,
            rt_press: to_raw(to_millimeters5(self.rt_press, from), to),
            rt_release: to_raw(to_millimeters5(self.rt_release, from), to),
        }
        .normalized()
    }
}

impl From<ActuationRecord> for ActuationConfig {
    fn from(r: ActuationRecord) -> Self {
        Self {
            actuation_point: r.actuation_point,
            rt_mode: RtMode::from_u8(r.rt_mode),
            rt_press: r.rt_press,
            rt_release: r.rt_release,
        }
    }
}

impl From<ActuationConfig> for ActuationRecord {
    fn from(c: ActuationConfig) -> Self {
        Self {
            actuation_point: c.actuation_point,
            rt_mode: c.rt_mode.to_u8(),
            rt_press: c.rt_press,
            rt_release: c.rt_release,
        }
    }
}

/// A key's actuation expressed in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuationSettings {
    pub actuation_point: TravelDistance,
    pub rt_mode: RtMode,
    /// Press sensitivity (required unless rapid trigger is off)
    pub rt_press: Option<TravelDistance>,
    /// Release sensitivity; `None` releases with the press sensitivity
    pub rt_release: Option<TravelDistance>,
}

impl ActuationSettings {
    /// Decode a raw config against the selected total travel
    pub fn decode(config: &ActuationConfig, total_travel: TravelDistance) -> Self {
        let sensitivity = |raw: u8| TravelDistance::from_raw(raw, total_travel, SENSITIVITY_STEP);
        let rt_on = !config.rt_mode.is_off();
        Self {
            actuation_point: TravelDistance::from_raw(
                config.actuation_point,
                total_travel,
                POINT_STEP,
            ),
            rt_mode: config.rt_mode,
            rt_press: rt_on.then(|| sensitivity(config.rt_press)),
            rt_release: (rt_on && config.rt_release != 0).then(|| sensitivity(config.rt_release)),
        }
    }

    /// Validate, snap and encode against the selected total travel
    pub fn encode(&self, total_travel: TravelDistance) -> Result<ActuationConfig, HallEffectError> {
        let travel = total_travel.hundredths();
        let max_point = travel.saturating_sub(POINT_HEADROOM);
        let point = self.actuation_point.hundredths();
        if point < MIN_POINT || point > max_point {
            return Err(HallEffectError::InvalidParameter(format!(
                "actuation point {} outside {}..={} for {} travel",
                self.actuation_point,
                TravelDistance(MIN_POINT),
                TravelDistance(max_point),
                total_travel
            )));
        }
        // Snapping may overshoot when the travel is not a multiple of 0.10 mm
        let point = snap(point, POINT_STEP).min(max_point - max_point % POINT_STEP);

        let (rt_press, rt_release) = match self.rt_mode {
            RtMode::Off => (0, 0),
            RtMode::Unknown(v) => {
                return Err(HallEffectError::InvalidParameter(format!(
                    "unknown rapid-trigger mode {v}"
                )))
            }
            RtMode::RapidTrigger | RtMode::ContinuousRapidTrigger => {
                let press = self.rt_press.ok_or_else(|| {
                    HallEffectError::InvalidParameter(
                        "rapid trigger needs a press sensitivity".into(),
                    )
                })?;
                let press = encode_sensitivity(press, travel)?;
                let release = match self.rt_release {
                    Some(release) => encode_sensitivity(release, travel)?,
                    None => 0,
                };
                (press, release)
            }
        };

        Ok(ActuationConfig {
            actuation_point: to_raw(point, travel),
            rt_mode: self.rt_mode,
            rt_press,
            rt_release,
        })
    }
}

fn encode_sensitivity(value: TravelDistance, travel: u16) -> Result<u8, HallEffectError> {
    let v = value.hundredths();
    if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&v) {
        return Err(HallEffectError::InvalidParameter(format!(
            "sensitivity {} outside {}..={}",
            value,
            TravelDistance(MIN_SENSITIVITY),
            TravelDistance(MAX_SENSITIVITY)
        )));
    }
    Ok(to_raw(snap(v, SENSITIVITY_STEP), travel))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAVELS: [u16; 5] = [320, 340, 350, 380, 390];

    #[test]
    fn test_documented_example() {
        // 128/255 * 3.50mm = 1.757mm -> 1.76 -> 1.80
        assert_eq!(raw_to_hundredths(128, 350), 176);
        assert_eq!(to_millimeters10(128, 350), 180);
        assert_eq!(to_millimeters5(128, 350), 175);
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(div_round_half_even(5, 2), 2);
        assert_eq!(div_round_half_even(7, 2), 4);
        assert_eq!(div_round_half_even(6, 4), 2);
        assert_eq!(div_round_half_even(10, 4), 2);
        assert_eq!(div_round_half_even(11, 4), 3);
        assert_eq!(snap(175, 10), 180);
        assert_eq!(snap(165, 10), 160);
        assert_eq!(snap(172, 5), 170);
        assert_eq!(snap(173, 5), 175);
        assert_eq!(snap(5, 10), 0);
        assert_eq!(snap(15, 10), 20);
    }

    #[test]
    fn test_raw_boundaries() {
        for travel in TRAVELS {
            assert_eq!(to_millimeters10(0, travel), 0);
            assert_eq!(raw_to_hundredths(255, travel), travel);
            assert_eq!(to_raw(travel, travel), 255);
            assert_eq!(to_raw(0, travel), 0);
        }
        assert_eq!(to_raw(1000, 350), 255);
        assert_eq!(to_raw(100, 0), 0);
    }

    #[test]
    fn test_unsnapped_roundtrip_within_one() {
        for travel in TRAVELS {
            for raw in 0..=255u8 {
                let back = to_raw(raw_to_hundredths(raw, travel), travel);
                assert!(
                    (back as i16 - raw as i16).abs() <= 1,
                    "raw {raw} travel {travel} -> {back}"
                );
            }
        }
    }

    #[test]
    fn test_snapped_conversion_is_idempotent() {
        for travel in TRAVELS {
            for raw in 0..=255u8 {
                let mm10 = to_millimeters10(raw, travel);
                assert_eq!(to_millimeters10(to_raw(mm10, travel), travel), mm10);
                let mm5 = to_millimeters5(raw, travel);
                assert_eq!(to_millimeters5(to_raw(mm5, travel), travel), mm5);
            }
        }
    }

    #[test]
    fn test_requantize_there_and_back() {
        for from in TRAVELS {
            for to in TRAVELS {
                let (a, b) = (TravelDistance(from), TravelDistance(to));
                let limit = from.min(to) - POINT_HEADROOM;
                for raw in 0..=255u8 {
                    if to_millimeters10(raw, from) > limit {
                        continue;
                    }
                    let cfg = ActuationConfig {
                        actuation_point: raw,
                        ..ActuationConfig::DEFAULT
                    };
                    let back = cfg.requantize(a, b).requantize(b, a);
                    let before = raw_to_hundredths(raw, from) as i32;
                    let after = raw_to_hundredths(back.actuation_point, from) as i32;
                    assert!((before - after).abs() <= 10, "raw {raw} {from}->{to}");
                    assert_eq!(
                        to_millimeters10(back.actuation_point, from),
                        to_millimeters10(raw, from)
                    );
                }
            }
        }
    }

    #[test]
    fn test_requantize_clamps_point() {
        let cfg = ActuationConfig {
            actuation_point: 255,
            ..ActuationConfig::DEFAULT
        };
        let out = cfg.requantize(TravelDistance(390), TravelDistance(320));
        assert_eq!(to_millimeters10(out.actuation_point, 320), 310);
    }

    #[test]
    fn test_requantize_sensitivities() {
        let cfg = ActuationConfig {
            actuation_point: 128,
            rt_mode: RtMode::RapidTrigger,
            rt_press: to_raw(30, 350),
            rt_release: to_raw(50, 350),
        };
        let out = cfg.requantize(TravelDistance(350), TravelDistance(390));
        assert_eq!(out.rt_mode, RtMode::RapidTrigger);
        assert_eq!(to_millimeters5(out.rt_press, 390), 30);
        assert_eq!(to_millimeters5(out.rt_release, 390), 50);
    }

    #[test]
    fn test_normalized_clears_sensitivities() {
        let cfg = ActuationConfig {
            actuation_point: 100,
            rt_mode: RtMode::Off,
            rt_press: 9,
            rt_release: 9,
        };
        assert_eq!(cfg.normalized().rt_press, 0);
        assert_eq!(cfg.normalized().rt_release, 0);
    }

    #[test]
    fn test_rt_mode_values() {
        assert_eq!(RtMode::from_u8(2), RtMode::ContinuousRapidTrigger);
        assert_eq!(RtMode::from_u8(9), RtMode::Unknown(9));
        assert_eq!(RtMode::Unknown(9).to_u8(), 9);
        assert_eq!("rt".parse::<RtMode>().unwrap(), RtMode::RapidTrigger);
        assert!("fast".parse::<RtMode>().is_err());
    }

    #[test]
    fn test_travel_distance_format_and_parse() {
        assert_eq!(TravelDistance(180).to_string(), "1.80mm");
        assert_eq!(TravelDistance(5).to_string(), "0.05mm");
        assert_eq!("1.8".parse::<TravelDistance>().unwrap(), TravelDistance(180));
        assert_eq!("1.80mm".parse::<TravelDistance>().unwrap(), TravelDistance(180));
        assert_eq!(" 0.05 mm".parse::<TravelDistance>().unwrap(), TravelDistance(5));
        assert_eq!("2".parse::<TravelDistance>().unwrap(), TravelDistance(200));
        assert_eq!(".5".parse::<TravelDistance>().unwrap(), TravelDistance(50));
        assert!("1.805".parse::<TravelDistance>().is_err());
        assert!("abc".parse::<TravelDistance>().is_err());
        assert!("".parse::<TravelDistance>().is_err());
        assert!("-1".parse::<TravelDistance>().is_err());
    }

    #[test]
    fn test_settings_encode() {
        let travel = TravelDistance(350);
        let settings = ActuationSettings {
            actuation_point: TravelDistance(180),
            rt_mode: RtMode::RapidTrigger,
            rt_press: Some(TravelDistance(30)),
            rt_release: None,
        };
        let cfg = settings.encode(travel).unwrap();
        assert_eq!(cfg.actuation_point, to_raw(180, 350));
        assert_eq!(cfg.rt_press, to_raw(30, 350));
        assert_eq!(cfg.rt_release, 0);
        assert_eq!(ActuationSettings::decode(&cfg, travel), settings);
    }

    #[test]
    fn test_settings_encode_snaps() {
        let settings = ActuationSettings {
            actuation_point: TravelDistance(175),
            rt_mode: RtMode::ContinuousRapidTrigger,
            rt_press: Some(TravelDistance(12)),
            rt_release: Some(TravelDistance(98)),
        };
        let cfg = settings.encode(TravelDistance(350)).unwrap();
        assert_eq!(to_millimeters10(cfg.actuation_point, 350), 180);
        assert_eq!(to_millimeters5(cfg.rt_press, 350), 10);
        assert_eq!(to_millimeters5(cfg.rt_release, 350), 100);
    }

    #[test]
    fn test_settings_encode_rejects_out_of_range() {
        let travel = TravelDistance(350);
        let base = ActuationSettings {
            actuation_point: TravelDistance(180),
            rt_mode: RtMode::Off,
            rt_press: None,
            rt_release: None,
        };
        let too_deep = ActuationSettings {
            actuation_point: TravelDistance(345),
            ..base
        };
        assert!(too_deep.encode(travel).is_err());
        let too_shallow = ActuationSettings {
            actuation_point: TravelDistance(5),
            ..base
        };
        assert!(too_shallow.encode(travel).is_err());
        let missing_press = ActuationSettings {
            rt_mode: RtMode::RapidTrigger,
            ..base
        };
        assert!(missing_press.encode(travel).is_err());
        let coarse = ActuationSettings {
            rt_mode: RtMode::RapidTrigger,
            rt_press: Some(TravelDistance(150)),
            ..base
        };
        assert!(coarse.encode(travel).is_err());
        assert!(base.encode(travel).is_ok());
    }

    #[test]
    fn test_off_mode_ignores_sensitivities() {
        let settings = ActuationSettings {
            actuation_point: TravelDistance(200),
            rt_mode: RtMode::Off,
            rt_press: Some(TravelDistance(500)),
            rt_release: Some(TravelDistance(500)),
        };
        let cfg = settings.encode(TravelDistance(400)).unwrap();
        assert_eq!((cfg.rt_press, cfg.rt_release), (0, 0));
    }

    #[test]
    fn test_config_json_field_names() {
        let json = serde_json::to_value(ActuationConfig::DEFAULT).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "actuation_point": 128,
                "rt_mode": 0,
                "rt_press": 0,
                "rt_release": 0
            })
        );
    }
}
