//! Offset/width/sign/scale descriptions of telemetry fields.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use thiserror::Error;

/// Largest frame any table may address. Guards against typos in format
/// files (an offset of 30000 instead of 300) making the framer wait forever.
pub const MAX_FRAME_LENGTH: usize = 4096;

/// A field table or frame format that cannot be used.
///
/// Raised while loading, before any frame is decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Field '{field}': width {width} is not one of 1, 2, 4, 8")]
    InvalidWidth { field: String, width: usize },
    #[error("Field '{field}': bytes {offset}..{offset}+{width} exceed the {limit}-byte frame limit")]
    FieldOutOfRange {
        field: String,
        offset: usize,
        width: usize,
        limit: usize,
    },
    #[error("Field '{0}' is defined twice")]
    DuplicateField(String),
    #[error("Field '{0}': scale must be a finite number")]
    InvalidScale(String),
    #[error("Field '{0}': a bit mask only applies to unsigned fields")]
    SignedBitField(String),
    #[error("Field table is empty")]
    EmptyTable,
    #[error("Unknown frame format revision '{0}'")]
    UnknownRevision(String),
    #[error("Invalid frame format: {0}")]
    Parse(String),
    #[error("Cannot read frame format {path}: {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Where one named value lives in a frame and how to scale it.
///
/// Offsets count from the first byte of the sync marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: Cow<'static, str>,
    pub byte_offset: usize,
    pub width_bytes: usize,
    #[serde(default)]
    pub signed: bool,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_mask: Option<u64>,
}

fn unit_scale() -> f64 {
    1.0
}

impl FieldDescriptor {
    /// Big-endian two's complement field.
    pub const fn signed(name: &'static str, byte_offset: usize, width_bytes: usize, scale: f64) -> Self {
        Self {
            name: Cow::Borrowed(name),
            byte_offset,
            width_bytes,
            signed: true,
            scale,
            byte_order: ByteOrder::Big,
            bit_mask: None,
        }
    }

    /// Big-endian unsigned field.
    pub const fn unsigned(name: &'static str, byte_offset: usize, width_bytes: usize, scale: f64) -> Self {
        Self {
            name: Cow::Borrowed(name),
            byte_offset,
            width_bytes,
            signed: false,
            scale,
            byte_order: ByteOrder::Big,
            bit_mask: None,
        }
    }

    pub fn with_mask(mut self, mask: u64) -> Self {
        self.bit_mask = Some(mask);
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// One past the last byte this field reads.
    pub fn end(&self) -> Option<usize> {
        self.byte_offset.checked_add(self.width_bytes)
    }

    /// Extract and scale the value from a marker-aligned frame.
    ///
    /// `None` when the frame is too short for this field.
    pub fn read(&self, frame: &[u8]) -> Option<f64> {
        let raw = frame.get(self.byte_offset..self.end()?)?;
        let accumulate = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
        let mut value = match self.byte_order {
            ByteOrder::Big => raw.iter().fold(0, accumulate),
            ByteOrder::Little => raw.iter().rev().fold(0, accumulate),
        };
        if let Some(mask) = self.bit_mask {
            value &= mask;
        }

        let number = if self.signed {
            sign_extend(value, self.width_bytes) as f64
        } else {
            value as f64
        };
        Some(number * self.scale)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let field = || self.name.to_string();
        if !matches!(self.width_bytes, 1 | 2 | 4 | 8) {
            return Err(ConfigurationError::InvalidWidth {
                field: field(),
                width: self.width_bytes,
            });
        }
        match self.end() {
            Some(end) if end <= MAX_FRAME_LENGTH => {}
            _ => {
                return Err(ConfigurationError::FieldOutOfRange {
                    field: field(),
                    offset: self.byte_offset,
                    width: self.width_bytes,
                    limit: MAX_FRAME_LENGTH,
                })
            }
        }
        if !self.scale.is_finite() {
            return Err(ConfigurationError::InvalidScale(field()));
        }
        if self.signed && self.bit_mask.is_some() {
            return Err(ConfigurationError::SignedBitField(field()));
        }
        Ok(())
    }
}

fn sign_extend(value: u64, width_bytes: usize) -> i64 {
    match width_bytes {
        0 => 0,
        w if w >= 8 => value as i64,
        w => {
            let unused = 64 - (w as u32) * 8;
            ((value << unused) as i64) >> unused
        }
    }
}

/// Validated, ordered set of field descriptors for one protocol revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldDescriptor>", into = "Vec<FieldDescriptor>")]
pub struct FieldTable {
    fields: Vec<FieldDescriptor>,
    extent: usize,
}

impl FieldTable {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, ConfigurationError> {
        if fields.is_empty() {
            return Err(ConfigurationError::EmptyTable);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        let mut extent = 0;
        for field in &fields {
            field.validate()?;
            if !seen.insert(field.name.as_ref()) {
                return Err(ConfigurationError::DuplicateField(field.name.to_string()));
            }
            extent = extent.max(field.end().unwrap_or(MAX_FRAME_LENGTH));
        }

        Ok(Self { fields, extent })
    }

    /// Bytes from the marker a frame needs for every field to be readable.
    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Vec<FieldDescriptor>> for FieldTable {
    type Error = ConfigurationError;

    fn try_from(fields: Vec<FieldDescriptor>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<FieldTable> for Vec<FieldDescriptor> {
    fn from(table: FieldTable) -> Self {
        table.fields
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_read_signed_big_endian() {
        let frame = [0x00, 0xFF, 0xFE, 0x00, 0x19];
        let field = FieldDescriptor::signed("neg", 1, 2, 1.0);
        assert_eq!(field.read(&frame), Some(-2.0));

        let wheel = FieldDescriptor::signed("wheel", 3, 2, 0.4);
        assert!((wheel.read(&frame).unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_read_unsigned_and_mask() {
        let frame = [0xFA];
        assert_eq!(FieldDescriptor::unsigned("raw", 0, 1, 1.0).read(&frame), Some(250.0));
        let mode = FieldDescriptor::unsigned("mode", 0, 1, 1.0).with_mask(0x07);
        assert_eq!(mode.read(&frame), Some(2.0));
    }

    #[test]
    fn test_read_little_endian_and_wide() {
        let frame = [0x19, 0x00];
        let field = FieldDescriptor::unsigned("le", 0, 2, 1.0).with_byte_order(ByteOrder::Little);
        assert_eq!(field.read(&frame), Some(25.0));

        let wide = [0xFF; 8];
        assert_eq!(FieldDescriptor::signed("i64", 0, 8, 1.0).read(&wide), Some(-1.0));
    }

    #[test]
    fn test_read_out_of_bounds() {
        let field = FieldDescriptor::signed("late", 3, 4, 1.0);
        assert_eq!(field.read(&[0u8; 6]), None);
        assert_eq!(field.read(&[0u8; 7]), Some(0.0));
    }

    #[test]
    fn test_width_three_rejected() {
        let err = FieldTable::new(vec![FieldDescriptor::signed("odd", 10, 3, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidWidth {
                field: "odd".into(),
                width: 3
            }
        );
    }

    #[test]
    fn test_table_validation() {
        assert_eq!(FieldTable::new(vec![]), Err(ConfigurationError::EmptyTable));

        let dup = FieldTable::new(vec![
            FieldDescriptor::signed("a", 0, 2, 1.0),
            FieldDescriptor::signed("a", 2, 2, 1.0),
        ]);
        assert_eq!(dup, Err(ConfigurationError::DuplicateField("a".into())));

        let far = FieldTable::new(vec![FieldDescriptor::signed("far", MAX_FRAME_LENGTH, 1, 1.0)]);
        assert!(matches!(far, Err(ConfigurationError::FieldOutOfRange { .. })));

        let nan = FieldTable::new(vec![FieldDescriptor::signed("nan", 0, 1, f64::NAN)]);
        assert_eq!(nan, Err(ConfigurationError::InvalidScale("nan".into())));

        let masked = FieldTable::new(vec![FieldDescriptor::signed("m", 0, 1, 1.0).with_mask(0x07)]);
        assert_eq!(masked, Err(ConfigurationError::SignedBitField("m".into())));
    }

    #[test]
    fn test_table_extent() {
        let table = FieldTable::new(vec![
            FieldDescriptor::signed("b", 315, 2, 1e-3),
            FieldDescriptor::unsigned("a", 165, 1, 1.0),
        ])
        .unwrap();
        assert_eq!(table.extent(), 317);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a").unwrap().byte_offset, 165);
    }

    #[test]
    fn test_table_deserialize_validates() {
        let json = r#"[{"name": "x", "byte_offset": 4, "width_bytes": 3}]"#;
        let err = serde_json::from_str::<FieldTable>(json).unwrap_err();
        assert!(err.to_string().contains("width 3"));

        let json = r#"[{"name": "x", "byte_offset": 4, "width_bytes": 2, "signed": true, "scale": 0.5}]"#;
        let table: FieldTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.extent(), 6);
        assert_eq!(table.get("x").unwrap().byte_order, ByteOrder::Big);
    }
}
