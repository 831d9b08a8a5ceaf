use std::fmt;

use core_types::TelemetryRecord;
use serde::Serialize;

/// Record key of the attitude control mode.
pub const ADCS_MODE: &str = "adcs_mode";

/// Attitude determination and control mode reported in the beacon.
///
/// Values outside 0..=7 cannot come from the 3-bit field but may show up in
/// custom formats; they map to `Unknown` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdcsMode {
    SunPoint,
    FineReferencePoint,
    SearchInit,
    Searching,
    Waiting,
    Converging,
    OnSun,
    NotActive,
    Unknown(u8),
}

impl AdcsMode {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::SunPoint,
            1 => Self::FineReferencePoint,
            2 => Self::SearchInit,
            3 => Self::Searching,
            4 => Self::Waiting,
            5 => Self::Converging,
            6 => Self::OnSun,
            7 => Self::NotActive,
            other => Self::Unknown(other),
        }
    }

    /// Mode carried by a decoded record, if its revision has one.
    pub fn from_record(record: &TelemetryRecord) -> Option<Self> {
        let value = record.get(ADCS_MODE)?;
        if value.fract() != 0.0 || !(0.0..=255.0).contains(&value) {
            return Some(Self::Unknown(u8::MAX));
        }
        Some(Self::from_raw(value as u8))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for AdcsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SunPoint => write!(f, "Sun Point"),
            Self::FineReferencePoint => write!(f, "Fine Reference Point"),
            Self::SearchInit => write!(f, "Search Init"),
            Self::Searching => write!(f, "Searching"),
            Self::Waiting => write!(f, "Waiting"),
            Self::Converging => write!(f, "Converging"),
            Self::OnSun => write!(f, "On Sun"),
            Self::NotActive => write!(f, "Not Active"),
            Self::Unknown(raw) => write!(f, "Unknown ({raw})"),
        }
    }
}
