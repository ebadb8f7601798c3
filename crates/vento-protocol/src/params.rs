//! Mapping between raw parameter bytes and unit state.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::constants::*;
use crate::packet::ParameterEntry;

// ============================================================================
// Ventilation Mode
// ============================================================================

/// Airflow mode of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VentilationMode {
    /// Extract only.
    Ventilation,
    /// Reversing operation with heat recovery.
    HeatRecovery,
    /// Supply only.
    Supply,
    /// Mode byte outside the known range.
    Unknown(u8),
}

impl From<u8> for VentilationMode {
    fn from(raw: u8) -> Self {
        match raw {
            0 => VentilationMode::Ventilation,
            1 => VentilationMode::HeatRecovery,
            2 => VentilationMode::Supply,
            other => VentilationMode::Unknown(other),
        }
    }
}

impl From<VentilationMode> for u8 {
    fn from(mode: VentilationMode) -> Self {
        match mode {
            VentilationMode::Ventilation => 0,
            VentilationMode::HeatRecovery => 1,
            VentilationMode::Supply => 2,
            VentilationMode::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for VentilationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VentilationMode::Ventilation => write!(f, "Ventilation"),
            VentilationMode::HeatRecovery => write!(f, "Heat Recovery"),
            VentilationMode::Supply => write!(f, "Supply"),
            VentilationMode::Unknown(raw) => write!(f, "Unknown({})", raw),
        }
    }
}

impl FromStr for VentilationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "ventilation" => Ok(VentilationMode::Ventilation),
            "heat-recovery" | "recovery" => Ok(VentilationMode::HeatRecovery),
            "supply" => Ok(VentilationMode::Supply),
            other => other
                .parse::<u8>()
                .map(VentilationMode::from)
                .map_err(|_| format!("unknown ventilation mode '{}'", s)),
        }
    }
}

// ============================================================================
// Speed
// ============================================================================

/// Convert a raw speed number to a percentage (`level * 33`).
///
/// Any byte is accepted; out-of-range levels scale the same way.
pub fn speed_percentage(raw: u8) -> u16 {
    u16::from(raw) * PERCENT_PER_LEVEL
}

/// Pick the speed level for a requested percentage.
///
/// `0..=33` is level 1, `34..=66` level 2, anything higher level 3.
pub fn percentage_to_level(percentage: u16) -> u8 {
    if percentage <= PERCENT_PER_LEVEL {
        1
    } else if percentage <= 2 * PERCENT_PER_LEVEL {
        2
    } else {
        3
    }
}

/// One of the three discrete fan speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeedLevel(u8);

impl SpeedLevel {
    /// Lowest speed.
    pub const LOW: SpeedLevel = SpeedLevel(1);
    /// Middle speed.
    pub const MEDIUM: SpeedLevel = SpeedLevel(2);
    /// Highest speed.
    pub const HIGH: SpeedLevel = SpeedLevel(3);

    /// Create a level from 1..=3.
    pub fn new(level: u8) -> Option<Self> {
        (MIN_SPEED_LEVEL..=MAX_SPEED_LEVEL)
            .contains(&level)
            .then_some(SpeedLevel(level))
    }

    /// The level bucket a percentage falls into.
    pub fn from_percentage(percentage: u16) -> Self {
        SpeedLevel(percentage_to_level(percentage))
    }

    /// Raw level byte.
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Percentage reported for this level.
    pub fn percentage(&self) -> u16 {
        speed_percentage(self.0)
    }
}

// ============================================================================
// Parsed Parameters
// ============================================================================

/// Key of an interpreted parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// `unit_on_off`
    UnitOnOff,
    /// `speed_number`
    SpeedNumber,
    /// `ventilation_mode`
    VentilationMode,
    /// Any parameter without a semantic mapping, keyed by id.
    Raw(u8),
}

impl ParamKey {
    /// Semantic name, if the key has one.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            ParamKey::UnitOnOff => Some("unit_on_off"),
            ParamKey::SpeedNumber => Some("speed_number"),
            ParamKey::VentilationMode => Some("ventilation_mode"),
            ParamKey::Raw(_) => None,
        }
    }
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKey::Raw(id) => write!(f, "0x{:02X}", id),
            other => f.write_str(other.name().unwrap_or_default()),
        }
    }
}

/// Interpreted parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// On/off flag.
    Bool(bool),
    /// Speed as a percentage.
    Percentage(u16),
    /// Ventilation mode.
    Mode(VentilationMode),
    /// Raw byte of an unmapped parameter.
    Byte(u8),
    /// Raw data of a SIZE block.
    Bytes(Vec<u8>),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(on) => write!(f, "{}", on),
            ParamValue::Percentage(p) => write!(f, "{}%", p),
            ParamValue::Mode(mode) => write!(f, "{}", mode),
            ParamValue::Byte(b) => write!(f, "0x{:02X}", b),
            ParamValue::Bytes(data) => {
                write!(f, "[")?;
                for (i, b) in data.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Parameters interpreted from one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedParameters {
    values: BTreeMap<ParamKey, ParamValue>,
}

impl ParsedParameters {
    /// Look up a parameter.
    pub fn get(&self, key: ParamKey) -> Option<&ParamValue> {
        self.values.get(&key)
    }

    /// Look up an unmapped parameter by id.
    pub fn raw(&self, id: u8) -> Option<&ParamValue> {
        self.values.get(&ParamKey::Raw(id))
    }

    /// Unit power state.
    pub fn unit_on(&self) -> Option<bool> {
        match self.values.get(&ParamKey::UnitOnOff) {
            Some(ParamValue::Bool(on)) => Some(*on),
            _ => None,
        }
    }

    /// Speed as a percentage.
    pub fn speed_percentage(&self) -> Option<u16> {
        match self.values.get(&ParamKey::SpeedNumber) {
            Some(ParamValue::Percentage(p)) => Some(*p),
            _ => None,
        }
    }

    /// Ventilation mode.
    pub fn ventilation_mode(&self) -> Option<VentilationMode> {
        match self.values.get(&ParamKey::VentilationMode) {
            Some(ParamValue::Mode(mode)) => Some(*mode),
            _ => None,
        }
    }

    /// Iterate all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &ParamValue)> {
        self.values.iter()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was interpreted.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Typed view of the known unit parameters.
    pub fn status(&self) -> FanStatus {
        FanStatus {
            is_on: self.unit_on(),
            percentage: self.speed_percentage(),
            ventilation_mode: self.ventilation_mode(),
        }
    }
}

impl std::fmt::Display for ParsedParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Interpret decoded parameter entries.
///
/// Known ids map to semantic keys; everything else passes through under its
/// raw id. Markers carry no parameter and are skipped. Later entries for the
/// same key replace earlier ones.
pub fn interpret(entries: &[ParameterEntry]) -> ParsedParameters {
    let mut values = BTreeMap::new();
    for entry in entries {
        match entry {
            ParameterEntry::Value { id, value } => {
                let (key, value) = interpret_value(*id, *value);
                values.insert(key, value);
            }
            ParameterEntry::Block { id, data } => {
                values.insert(ParamKey::Raw(*id), ParamValue::Bytes(data.clone()));
            }
            ParameterEntry::Page(_)
            | ParameterEntry::Function(_)
            | ParameterEntry::NotSupported(_) => {}
        }
    }
    let parsed = ParsedParameters { values };
    log::debug!("parsed parameters: {}", parsed);
    parsed
}

/// Interpret a single plain pair.
pub fn interpret_value(id: u8, value: u8) -> (ParamKey, ParamValue) {
    match id {
        PARAM_UNIT_ON_OFF => (ParamKey::UnitOnOff, ParamValue::Bool(value != 0)),
        PARAM_SPEED_NUMBER => (
            ParamKey::SpeedNumber,
            ParamValue::Percentage(speed_percentage(value)),
        ),
        PARAM_VENTILATION_MODE => (
            ParamKey::VentilationMode,
            ParamValue::Mode(VentilationMode::from(value)),
        ),
        other => (ParamKey::Raw(other), ParamValue::Byte(value)),
    }
}

// ============================================================================
// Fan Status
// ============================================================================

/// Known unit state reported in one reply. Fields the reply did not carry
/// are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanStatus {
    /// Power state.
    pub is_on: Option<bool>,
    /// Speed percentage.
    pub percentage: Option<u16>,
    /// Ventilation mode.
    pub ventilation_mode: Option<VentilationMode>,
}

impl FanStatus {
    /// Speed level derived from the percentage.
    pub fn speed_level(&self) -> Option<u16> {
        self.percentage.map(|p| p / PERCENT_PER_LEVEL)
    }

    /// Heat recovery is the unit's reversing ("oscillating") mode.
    pub fn heat_recovery(&self) -> Option<bool> {
        self.ventilation_mode
            .map(|mode| mode == VentilationMode::HeatRecovery)
    }

    /// Returns true if the reply carried none of the known parameters.
    pub fn is_empty(&self) -> bool {
        self.is_on.is_none() && self.percentage.is_none() && self.ventilation_mode.is_none()
    }

    /// One-line human summary, e.g.
    /// `Unit status [On], Speed number [2], Ventilation mode [Supply]`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(on) = self.is_on {
            parts.push(format!("Unit status [{}]", if on { "On" } else { "Off" }));
        }
        if let Some(level) = self.speed_level() {
            parts.push(format!("Speed number [{}]", level));
        }
        if let Some(mode) = self.ventilation_mode {
            parts.push(format!("Ventilation mode [{}]", mode));
        }
        if parts.is_empty() {
            "No known param".to_string()
        } else {
            parts.join(", ")
        }
    }
}
