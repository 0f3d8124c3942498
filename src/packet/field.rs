//! Field codec: typed values to wire bytes and back.
//!
//! Every integer field is stored most-significant byte first:
//! ```text
//! word 0x1234        ──▶ [0x12, 0x34]
//! long 0x0A0B0C0D    ──▶ [0x0A, 0x0B, 0x0C, 0x0D]
//! string "AB" (w=4)  ──▶ [0x41, 0x42, 0x00, 0x00]
//! words [1, 2] (w=4) ──▶ [0x00, 0x01, 0x00, 0x02]
//! ```
//!
//! Values wider than their field are truncated to the low-order bytes;
//! values narrower than their field are zero-extended with a warning.

use core::fmt;
use core::str::FromStr;

use log::warn;

use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Field type
// ---------------------------------------------------------------------------

/// The closed set of field encodings a schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bitfield,
    Byte,
    Word,
    SignedWord,
    Long,
    LongLong,
    Text,
    Bytes,
    Words,
}

impl FieldType {
    pub const ALL: [Self; 9] = [
        Self::Bitfield,
        Self::Byte,
        Self::Word,
        Self::SignedWord,
        Self::Long,
        Self::LongLong,
        Self::Text,
        Self::Bytes,
        Self::Words,
    ];

    /// Name used by schema documents.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bitfield => "bitfield",
            Self::Byte => "byte",
            Self::Word => "word",
            Self::SignedWord => "signed word",
            Self::Long => "long",
            Self::LongLong => "long long",
            Self::Text => "string",
            Self::Bytes => "bytes",
            Self::Words => "words",
        }
    }

    /// Width of the scalar types; `None` for the variable-width ones.
    pub const fn natural_width(self) -> Option<usize> {
        match self {
            Self::Bitfield | Self::Byte => Some(1),
            Self::Word | Self::SignedWord => Some(2),
            Self::Long => Some(4),
            Self::LongLong => Some(8),
            Self::Text | Self::Bytes | Self::Words => None,
        }
    }

}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitfield" => Ok(Self::Bitfield),
            "byte" => Ok(Self::Byte),
            "word" => Ok(Self::Word),
            "signed word" | "signedword" => Ok(Self::SignedWord),
            "long" => Ok(Self::Long),
            "long long" | "longlong" => Ok(Self::LongLong),
            "string" => Ok(Self::Text),
            "bytes" => Ok(Self::Bytes),
            "words" => Ok(Self::Words),
            _ => Err(SchemaError::UnknownFieldType),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Field definition
// ---------------------------------------------------------------------------

/// Immutable description of one field inside a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    name: String,
    ty: FieldType,
    width: usize,
    details: Vec<String>,
    default: Vec<u8>,
}

impl FieldDefinition {
    /// Build a definition. Default bytes are zero-padded or truncated to
    /// `width`; without defaults the field starts zeroed.
    pub fn new(
        name: impl Into<String>,
        ty: FieldType,
        width: usize,
        details: Vec<String>,
        default: Option<Vec<u8>>,
    ) -> Self {
        let default = encode_text(default.as_deref().unwrap_or_default(), width);
        Self {
            name: name.into(),
            ty,
            width,
            details,
            default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub fn default_bytes(&self) -> &[u8] {
        &self.default
    }
}

// ---------------------------------------------------------------------------
// Codec primitives
// ---------------------------------------------------------------------------

/// Interpret `bytes` as a big-endian unsigned integer.
/// Inputs longer than 8 bytes keep their low-order 8.
pub fn decode_integer(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Produce exactly `width` bytes of `value`, most significant first.
///
/// `source_width` is the byte width of the caller's value. When the field
/// is wider, the extra high-order bytes are zero and a warning is logged.
pub fn encode_integer(value: u64, source_width: usize, width: usize) -> Vec<u8> {
    if width > source_width {
        warn!(
            "requested {} bytes but value only has {}; zero-filling",
            width, source_width
        );
    }
    (0..width)
        .map(|i| {
            let significance = width - 1 - i;
            if significance < source_width.min(8) {
                (value >> (8 * significance)) as u8
            } else {
                0
            }
        })
        .collect()
}

/// Copy `bytes` in order, truncating or zero-padding to `width`.
pub fn encode_text(bytes: &[u8], width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width];
    let n = bytes.len().min(width);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Regroup bytes into big-endian `u16`s. A trailing odd byte is ignored.
pub fn decode_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn encode_words(words: &[u16], width: usize) -> Vec<u8> {
    let flat: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    encode_text(&flat, width)
}

/// Two's-complement big-endian integer, sign-extended from its width.
pub fn decode_signed(bytes: &[u8]) -> i64 {
    let width = bytes.len().min(8);
    if width == 0 {
        return 0;
    }
    let shift = 64 - 8 * width as u32;
    ((decode_integer(bytes) << shift) as i64) >> shift
}

/// Text bytes in wire order. Fields are NUL padded on the wire; the
/// padding is not part of the value, and invalid UTF-8 is replaced.
/// Read the field as `Vec<u8>` for the exact wire bytes.
pub fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ---------------------------------------------------------------------------
// Dynamic values
// ---------------------------------------------------------------------------

/// A decoded field value, tagged with its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bitfield(u8),
    Byte(u8),
    Word(u16),
    SignedWord(i16),
    Long(u32),
    LongLong(u64),
    Text(String),
    Bytes(Vec<u8>),
    Words(Vec<u16>),
}

impl FieldValue {
    /// Decode raw field bytes according to `ty`.
    pub fn decode(ty: FieldType, bytes: &[u8]) -> Self {
        match ty {
            FieldType::Bitfield => Self::Bitfield(decode_integer(bytes) as u8),
            FieldType::Byte => Self::Byte(decode_integer(bytes) as u8),
            FieldType::Word => Self::Word(decode_integer(bytes) as u16),
            FieldType::SignedWord => Self::SignedWord(decode_signed(bytes) as i16),
            FieldType::Long => Self::Long(decode_integer(bytes) as u32),
            FieldType::LongLong => Self::LongLong(decode_integer(bytes)),
            FieldType::Text => Self::Text(decode_text(bytes)),
            FieldType::Bytes => Self::Bytes(bytes.to_vec()),
            FieldType::Words => Self::Words(decode_words(bytes)),
        }
    }

    /// Encode into exactly `width` bytes.
    pub fn encode(&self, width: usize) -> Vec<u8> {
        match self {
            Self::Bitfield(v) | Self::Byte(v) => v.to_field(width),
            Self::Word(v) => v.to_field(width),
            Self::SignedWord(v) => v.to_field(width),
            Self::Long(v) => v.to_field(width),
            Self::LongLong(v) => v.to_field(width),
            Self::Text(v) => v.to_field(width),
            Self::Bytes(v) => v.to_field(width),
            Self::Words(v) => v.to_field(width),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Bitfield(_) => FieldType::Bitfield,
            Self::Byte(_) => FieldType::Byte,
            Self::Word(_) => FieldType::Word,
            Self::SignedWord(_) => FieldType::SignedWord,
            Self::Long(_) => FieldType::Long,
            Self::LongLong(_) => FieldType::LongLong,
            Self::Text(_) => FieldType::Text,
            Self::Bytes(_) => FieldType::Bytes,
            Self::Words(_) => FieldType::Words,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitfield(v) => write!(f, "0b{v:08b}"),
            Self::Byte(v) => write!(f, "0x{v:02X}"),
            Self::Word(v) => write!(f, "{v} (0x{v:04X})"),
            Self::SignedWord(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v} (0x{v:08X})"),
            Self::LongLong(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "0x{}", hex::encode_upper(v)),
            Self::Words(v) => write!(f, "{v:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed accessors
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for i16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for String {}
    impl Sealed for Vec<u8> {}
    impl Sealed for Vec<u16> {}
}

/// Rust types that can be read from and written to a field.
///
/// Backs [`PacketSchema::get_field`](super::schema::PacketSchema::get_field)
/// and [`PacketSchema::set_field`](super::schema::PacketSchema::set_field).
pub trait FieldAccess: sealed::Sealed + Sized {
    fn from_field(bytes: &[u8]) -> Self;
    fn to_field(&self, width: usize) -> Vec<u8>;
}

macro_rules! integer_access {
    ($($t:ty),*) => {$(
        impl FieldAccess for $t {
            fn from_field(bytes: &[u8]) -> Self {
                decode_integer(bytes) as $t
            }

            fn to_field(&self, width: usize) -> Vec<u8> {
                encode_integer(u64::from(*self), core::mem::size_of::<$t>(), width)
            }
        }
    )*};
}

integer_access!(u8, u16, u32, u64);

impl FieldAccess for i16 {
    fn from_field(bytes: &[u8]) -> Self {
        decode_integer(bytes) as u16 as i16
    }

    fn to_field(&self, width: usize) -> Vec<u8> {
        encode_integer(u64::from(*self as u16), 2, width)
    }
}

impl FieldAccess for String {
    fn from_field(bytes: &[u8]) -> Self {
        decode_text(bytes)
    }

    fn to_field(&self, width: usize) -> Vec<u8> {
        encode_text(self.as_bytes(), width)
    }
}

impl FieldAccess for Vec<u8> {
    fn from_field(bytes: &[u8]) -> Self {
        bytes.to_vec()
    }

    fn to_field(&self, width: usize) -> Vec<u8> {
        encode_text(self, width)
    }
}

impl FieldAccess for Vec<u16> {
    fn from_field(bytes: &[u8]) -> Self {
        decode_words(bytes)
    }

    fn to_field(&self, width: usize) -> Vec<u8> {
        encode_words(self, width)
    }
}
