//! Plot buffer metadata.

use bytes::Bytes;
use serde::Serialize;

use crate::error::SchemaError;

/// Element type of a plot buffer's pixels.
///
/// Code 1 is unassigned on the wire and decodes as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum BufferType {
    UnsignedByte = 0,
    UnsignedShort = 2,
    Short = 3,
    Int32 = 4,
    Float32 = 5,
    Float64 = 6,
}

impl BufferType {
    pub const ALL: [BufferType; 6] = [
        BufferType::UnsignedByte,
        BufferType::UnsignedShort,
        BufferType::Short,
        BufferType::Int32,
        BufferType::Float32,
        BufferType::Float64,
    ];

    /// The raw wire value.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Size of one element in bytes.
    pub fn type_size(self) -> usize {
        match self {
            BufferType::UnsignedByte => 1,
            BufferType::UnsignedShort | BufferType::Short => 2,
            BufferType::Int32 | BufferType::Float32 => 4,
            BufferType::Float64 => 8,
        }
    }

    /// Short label, e.g. `float32`.
    pub fn label(self) -> &'static str {
        match self {
            BufferType::UnsignedByte => "uint8",
            BufferType::UnsignedShort => "uint16",
            BufferType::Short => "int16",
            BufferType::Int32 => "int32",
            BufferType::Float32 => "float32",
            BufferType::Float64 => "float64",
        }
    }
}

impl TryFrom<i32> for BufferType {
    type Error = SchemaError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_raw() == raw)
            .ok_or(SchemaError::UnknownBufferType(raw))
    }
}

impl std::fmt::Display for BufferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything about a plot buffer except its pixels.
///
/// `stride` counts elements per row, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferDescriptor {
    pub name: String,
    pub display_name: String,
    pub pixel_layout: String,
    pub transpose: bool,
    pub width: i32,
    pub height: i32,
    pub channels: i32,
    pub stride: i32,
    pub buffer_type: BufferType,
}

impl BufferDescriptor {
    /// Descriptor for a tightly packed, untransposed buffer.
    pub fn packed(
        name: impl Into<String>,
        width: i32,
        height: i32,
        channels: i32,
        buffer_type: BufferType,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            pixel_layout: "rgba".to_string(),
            transpose: false,
            width,
            height,
            channels,
            stride: width,
            buffer_type,
        }
    }

    /// Minimum byte length of the pixel data this descriptor refers to.
    ///
    /// Negative dimensions count as zero.
    pub fn expected_len(&self) -> usize {
        [self.stride, self.height, self.channels]
            .into_iter()
            .map(|v| usize::try_from(v).unwrap_or(0))
            .fold(self.buffer_type.type_size(), usize::saturating_mul)
    }

    /// Width and height as displayed, swapped when transposed.
    pub fn visualized_dimensions(&self) -> (i32, i32) {
        if self.transpose {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Element type and channel count, e.g. `float32x3`.
    pub fn type_label(&self) -> String {
        format!("{}x{}", self.buffer_type.label(), self.channels)
    }
}

/// Decoded `PlotBufferContents` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotBuffer {
    pub descriptor: BufferDescriptor,
    pub pixels: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_and_labels() {
        let expected = [
            (0, 1, "uint8"),
            (2, 2, "uint16"),
            (3, 2, "int16"),
            (4, 4, "int32"),
            (5, 4, "float32"),
            (6, 8, "float64"),
        ];
        for (raw, size, label) in expected {
            let ty = BufferType::try_from(raw).unwrap();
            assert_eq!(ty.type_size(), size);
            assert_eq!(ty.label(), label);
            assert_eq!(ty.as_raw(), raw);
        }
    }

    #[test]
    fn unassigned_codes_are_rejected() {
        for raw in [1, 7, -1, i32::MAX] {
            let err = BufferType::try_from(raw).unwrap_err();
            assert!(matches!(err, SchemaError::UnknownBufferType(r) if r == raw));
        }
    }

    #[test]
    fn expected_len_uses_stride() {
        let mut desc = BufferDescriptor::packed("img", 3, 2, 3, BufferType::Float32);
        assert_eq!(desc.expected_len(), 3 * 2 * 3 * 4);
        desc.stride = 4;
        assert_eq!(desc.expected_len(), 4 * 2 * 3 * 4);
    }

    #[test]
    fn negative_dimensions_yield_zero() {
        let mut desc = BufferDescriptor::packed("img", 3, 2, 1, BufferType::UnsignedByte);
        desc.height = -5;
        assert_eq!(desc.expected_len(), 0);
    }

    #[test]
    fn transpose_swaps_visualized_dimensions() {
        let mut desc = BufferDescriptor::packed("img", 640, 480, 1, BufferType::UnsignedByte);
        assert_eq!(desc.visualized_dimensions(), (640, 480));
        desc.transpose = true;
        assert_eq!(desc.visualized_dimensions(), (480, 640));
    }

    #[test]
    fn type_label_includes_channels() {
        let desc = BufferDescriptor::packed("img", 1, 1, 3, BufferType::Float32);
        assert_eq!(desc.type_label(), "float32x3");
    }
}
