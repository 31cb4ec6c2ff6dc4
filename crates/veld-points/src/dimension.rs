//! Dimension value types
//!
//! Every point attribute is a fixed-width scalar. The type carries its byte
//! size and its base kind (signed, unsigned or floating); both are part of
//! the contract enforced when values cross into and out of the scripting
//! bridge.

use serde::{Serialize, Serializer};
use std::fmt;

/// The storage type of one point attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

/// Base kind of a dimension type, independent of its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Signed,
    Unsigned,
    Floating,
}

impl DimType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            DimType::I8 | DimType::U8 => 1,
            DimType::I16 | DimType::U16 => 2,
            DimType::I32 | DimType::U32 | DimType::F32 => 4,
            DimType::I64 | DimType::U64 | DimType::F64 => 8,
        }
    }

    /// Base kind of the type.
    pub fn kind(self) -> BaseKind {
        match self {
            DimType::I8 | DimType::I16 | DimType::I32 | DimType::I64 => BaseKind::Signed,
            DimType::U8 | DimType::U16 | DimType::U32 | DimType::U64 => BaseKind::Unsigned,
            DimType::F32 | DimType::F64 => BaseKind::Floating,
        }
    }

    /// Canonical name used in schema documents.
    pub fn name(self) -> &'static str {
        match self {
            DimType::I8 => "int8",
            DimType::I16 => "int16",
            DimType::I32 => "int32",
            DimType::I64 => "int64",
            DimType::U8 => "uint8",
            DimType::U16 => "uint16",
            DimType::U32 => "uint32",
            DimType::U64 => "uint64",
            DimType::F32 => "float",
            DimType::F64 => "double",
        }
    }

    /// Parse a schema type name back into a `DimType`.
    pub fn from_name(name: &str) -> Option<DimType> {
        match name {
            "int8" => Some(DimType::I8),
            "int16" => Some(DimType::I16),
            "int32" => Some(DimType::I32),
            "int64" => Some(DimType::I64),
            "uint8" => Some(DimType::U8),
            "uint16" => Some(DimType::U16),
            "uint32" => Some(DimType::U32),
            "uint64" => Some(DimType::U64),
            "float" => Some(DimType::F32),
            "double" => Some(DimType::F64),
            _ => None,
        }
    }

    /// All supported dimension types.
    pub fn all() -> [DimType; 10] {
        [
            DimType::I8,
            DimType::I16,
            DimType::I32,
            DimType::I64,
            DimType::U8,
            DimType::U16,
            DimType::U32,
            DimType::U64,
            DimType::F32,
            DimType::F64,
        ]
    }
}

impl fmt::Display for DimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for DimType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaseKind::Signed => "signed integer",
            BaseKind::Unsigned => "unsigned integer",
            BaseKind::Floating => "floating point",
        };
        f.write_str(name)
    }
}

/// A Rust scalar that maps onto exactly one [`DimType`].
///
/// Used by the typed accessors on [`crate::PointView`]; raw byte access does
/// not go through this trait.
pub trait Scalar: Copy {
    const DIM: DimType;

    /// Write the native-endian byte representation into `out`.
    fn write_ne(self, out: &mut [u8]) -> Option<()>;

    /// Read a value from its native-endian byte representation.
    ///
    /// Returns `None` if `bytes` is not exactly `Self::DIM.size()` long.
    fn read_ne(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $dim:expr),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DIM: DimType = $dim;

                fn write_ne(self, out: &mut [u8]) -> Option<()> {
                    let bytes = self.to_ne_bytes();
                    if out.len() != bytes.len() {
                        return None;
                    }
                    out.copy_from_slice(&bytes);
                    Some(())
                }

                fn read_ne(bytes: &[u8]) -> Option<Self> {
                    Some(<$ty>::from_ne_bytes(bytes.try_into().ok()?))
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => DimType::I8,
    i16 => DimType::I16,
    i32 => DimType::I32,
    i64 => DimType::I64,
    u8 => DimType::U8,
    u16 => DimType::U16,
    u32 => DimType::U32,
    u64 => DimType::U64,
    f32 => DimType::F32,
    f64 => DimType::F64,
}
