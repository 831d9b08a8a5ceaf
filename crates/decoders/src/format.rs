//! Versioned frame formats: sync marker plus field table.

use std::borrow::Cow;
use std::path::Path;

use framing::{SyncPattern, MIN_FRAME_LENGTH};
use serde::{Deserialize, Serialize};

use crate::field_table::{ConfigurationError, FieldDescriptor, FieldTable};
use crate::mode::ADCS_MODE;

/// Beacon housekeeping marker. `0x081D` on the same link is the real-time
/// log stream and is not decoded here.
pub const BEACON_SYNC: SyncPattern = SyncPattern::from_u16(0x083F);

pub const DEFAULT_REVISION: &str = "beacon-v2";

/// Names accepted by [`FrameFormat::by_name`].
pub const BUILTIN_REVISIONS: &[&str] = &["beacon-v2", "beacon-v1"];

/// Everything needed to frame and decode one protocol revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFormat {
    revision: Cow<'static, str>,
    sync: SyncPattern,
    #[serde(default = "default_min_frame_length")]
    min_frame_length: usize,
    fields: FieldTable,
}

fn default_min_frame_length() -> usize {
    MIN_FRAME_LENGTH
}

impl FrameFormat {
    pub fn new(
        revision: impl Into<Cow<'static, str>>,
        sync: SyncPattern,
        min_frame_length: usize,
        fields: FieldTable,
    ) -> Self {
        Self {
            revision: revision.into(),
            sync,
            min_frame_length,
            fields,
        }
    }

    /// Look up a built-in revision.
    pub fn by_name(name: &str) -> Result<Self, ConfigurationError> {
        match name {
            "beacon-v2" => Self::beacon_v2(),
            "beacon-v1" => Self::beacon_v1(),
            other => Err(ConfigurationError::UnknownRevision(other.to_string())),
        }
    }

    /// Built-in revision by name, or a JSON format file when `name_or_path`
    /// ends in `.json`.
    pub fn resolve(name_or_path: &str) -> Result<Self, ConfigurationError> {
        if name_or_path.ends_with(".json") {
            Self::load(name_or_path)
        } else {
            Self::by_name(name_or_path)
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Current beacon layout.
    pub fn beacon_v2() -> Result<Self, ConfigurationError> {
        let fields = FieldTable::new(vec![
            FieldDescriptor::unsigned(ADCS_MODE, 165, 1, 1.0).with_mask(0x07),
            FieldDescriptor::signed("q_body_wrt_eci1", 115, 4, 5e-10),
            FieldDescriptor::signed("q_body_wrt_eci2", 119, 4, 5e-10),
            FieldDescriptor::signed("q_body_wrt_eci3", 123, 4, 5e-10),
            FieldDescriptor::signed("q_body_wrt_eci4", 127, 4, 5e-10),
            FieldDescriptor::signed("wheel_speed_rpm1", 168, 2, 0.4),
            FieldDescriptor::signed("wheel_speed_rpm2", 170, 2, 0.4),
            FieldDescriptor::signed("wheel_speed_rpm3", 172, 2, 0.4),
            FieldDescriptor::signed("position_error1", 183, 4, 2e-9),
            FieldDescriptor::signed("position_error2", 187, 4, 2e-9),
            FieldDescriptor::signed("position_error3", 191, 4, 2e-9),
            FieldDescriptor::signed("mag_vector_body1", 232, 2, 5e-9),
            FieldDescriptor::signed("mag_vector_body2", 234, 2, 5e-9),
            FieldDescriptor::signed("mag_vector_body3", 236, 2, 5e-9),
            FieldDescriptor::unsigned("voltage_12v", 299, 1, 0.1),
            FieldDescriptor::signed("box1_temp", 305, 2, 5e-3),
            FieldDescriptor::signed("bus_voltage", 315, 2, 1e-3),
            FieldDescriptor::signed("battery_voltage", 317, 2, 2e-3),
            FieldDescriptor::signed("battery_current", 319, 2, 2e-3),
            FieldDescriptor::signed("battery1_temp", 321, 2, 5e-3),
            FieldDescriptor::signed("battery2_temp", 323, 2, 5e-3),
        ])?;
        Ok(Self::new("beacon-v2", BEACON_SYNC, MIN_FRAME_LENGTH, fields))
    }

    /// Earlier layout: wheels and magnetometer sit 12 bytes later and the
    /// attitude estimator outputs are not downlinked.
    pub fn beacon_v1() -> Result<Self, ConfigurationError> {
        let fields = FieldTable::new(vec![
            FieldDescriptor::unsigned(ADCS_MODE, 165, 1, 1.0).with_mask(0x07),
            FieldDescriptor::signed("wheel_speed_rpm1", 180, 2, 0.4),
            FieldDescriptor::signed("wheel_speed_rpm2", 182, 2, 0.4),
            FieldDescriptor::signed("wheel_speed_rpm3", 184, 2, 0.4),
            FieldDescriptor::signed("mag_vector_body1", 244, 2, 5e-9),
            FieldDescriptor::signed("mag_vector_body2", 246, 2, 5e-9),
            FieldDescriptor::signed("mag_vector_body3", 248, 2, 5e-9),
            FieldDescriptor::signed("box1_temp", 305, 2, 5e-3),
            FieldDescriptor::signed("bus_voltage", 315, 2, 1e-3),
            FieldDescriptor::signed("battery_voltage", 317, 2, 2e-3),
            FieldDescriptor::signed("battery_current", 319, 2, 2e-3),
        ])?;
        Ok(Self::new("beacon-v1", BEACON_SYNC, MIN_FRAME_LENGTH, fields))
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub(crate) fn revision_cow(&self) -> Cow<'static, str> {
        self.revision.clone()
    }

    pub fn sync(&self) -> SyncPattern {
        self.sync
    }

    pub fn min_frame_length(&self) -> usize {
        self.min_frame_length
    }

    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Bytes the framer must collect from the marker before handing a frame
    /// to the decoder.
    pub fn required_length(&self) -> usize {
        self.min_frame_length
            .max(MIN_FRAME_LENGTH)
            .max(self.fields.extent())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_revisions() {
        for name in BUILTIN_REVISIONS {
            let format = FrameFormat::by_name(name).unwrap();
            assert_eq!(format.revision(), *name);
            assert_eq!(format.sync(), BEACON_SYNC);
        }
        assert_eq!(FrameFormat::by_name(DEFAULT_REVISION).unwrap().fields().len(), 21);
    }

    #[test]
    fn test_required_length_covers_table() {
        let v2 = FrameFormat::beacon_v2().unwrap();
        assert_eq!(v2.fields().extent(), 325);
        assert_eq!(v2.required_length(), 325);

        let v1 = FrameFormat::beacon_v1().unwrap();
        assert_eq!(v1.required_length(), 321);
    }

    #[test]
    fn test_required_length_never_below_minimum() {
        let fields = FieldTable::new(vec![FieldDescriptor::signed("x", 2, 2, 1.0)]).unwrap();
        let format = FrameFormat::new("tiny", BEACON_SYNC, 16, fields);
        assert_eq!(format.required_length(), MIN_FRAME_LENGTH);
    }

    #[test]
    fn test_unknown_revision() {
        assert_eq!(
            FrameFormat::by_name("beacon-v9"),
            Err(ConfigurationError::UnknownRevision("beacon-v9".into()))
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "revision": "lab-bench",
            "sync": "0x081D",
            "fields": [
                {"name": "counter", "byte_offset": 2, "width_bytes": 4},
                {"name": "temp", "byte_offset": 300, "width_bytes": 2, "signed": true, "scale": 0.01}
            ]
        }"#;
        let format = FrameFormat::from_json(json).unwrap();
        assert_eq!(format.revision(), "lab-bench");
        assert_eq!(format.sync(), SyncPattern::from_u16(0x081D));
        assert_eq!(format.min_frame_length(), MIN_FRAME_LENGTH);
        assert_eq!(format.required_length(), 302);
    }

    #[test]
    fn test_from_json_rejects_bad_width() {
        let json = r#"{"revision": "x", "sync": 2111,
            "fields": [{"name": "odd", "byte_offset": 2, "width_bytes": 3}]}"#;
        let err = FrameFormat::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(ref msg) if msg.contains("width 3")));
    }

    #[test]
    fn test_builtin_serializes_for_editing() {
        let v1 = FrameFormat::beacon_v1().unwrap();
        let json = serde_json::to_value(&v1).unwrap();
        assert_eq!(json["sync"], 0x083F);
        assert_eq!(json["fields"][0]["name"], ADCS_MODE);
        assert_eq!(json["fields"][0]["bit_mask"], 7);

        let reloaded = FrameFormat::from_json(&json.to_string()).unwrap();
        assert_eq!(reloaded.revision(), "beacon-v1");
        assert_eq!(reloaded.required_length(), v1.required_length());
    }

    #[test]
    fn test_load_missing_file() {
        let err = FrameFormat::resolve("/nonexistent/format.json").unwrap_err();
        assert!(matches!(err, ConfigurationError::Io { .. }));
    }
}
