//! MessagePack format byte classification.

pub const NIL: u8 = 0xc0;
pub const FALSE: u8 = 0xc2;
pub const TRUE: u8 = 0xc3;
pub const BIN8: u8 = 0xc4;
pub const BIN16: u8 = 0xc5;
pub const BIN32: u8 = 0xc6;
pub const EXT8: u8 = 0xc7;
pub const EXT16: u8 = 0xc8;
pub const EXT32: u8 = 0xc9;
pub const FLOAT32: u8 = 0xca;
pub const FLOAT64: u8 = 0xcb;
pub const UINT8: u8 = 0xcc;
pub const UINT16: u8 = 0xcd;
pub const UINT32: u8 = 0xce;
pub const UINT64: u8 = 0xcf;
pub const INT8: u8 = 0xd0;
pub const INT16: u8 = 0xd1;
pub const INT32: u8 = 0xd2;
pub const INT64: u8 = 0xd3;
pub const FIXEXT1: u8 = 0xd4;
pub const FIXEXT2: u8 = 0xd5;
pub const FIXEXT4: u8 = 0xd6;
pub const FIXEXT8: u8 = 0xd7;
pub const FIXEXT16: u8 = 0xd8;
pub const STR8: u8 = 0xd9;
pub const STR16: u8 = 0xda;
pub const STR32: u8 = 0xdb;
pub const ARRAY16: u8 = 0xdc;
pub const ARRAY32: u8 = 0xdd;
pub const MAP16: u8 = 0xde;
pub const MAP32: u8 = 0xdf;

pub const FIXMAP_PREFIX: u8 = 0x80;
pub const FIXARRAY_PREFIX: u8 = 0x90;
pub const FIXSTR_PREFIX: u8 = 0xa0;

/// Largest length carried inline by a fixmap or fixarray.
pub const FIX_CONTAINER_MAX: usize = 15;
/// Largest length carried inline by a fixstr.
pub const FIXSTR_MAX: usize = 31;

/// Format of the next value, decided by its leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    PositiveFixInt(u8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    /// 0xc1 is never used.
    NeverUsed,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    Float32,
    Float64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    NegativeFixInt(i8),
}

/// Coarse value family of a [`Format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Binary,
    Array,
    Map,
    Extension,
    Invalid,
}

impl Format {
    /// Classify a leading byte.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00..=0x7f => Format::PositiveFixInt(b),
            0x80..=0x8f => Format::FixMap(b & 0x0f),
            0x90..=0x9f => Format::FixArray(b & 0x0f),
            0xa0..=0xbf => Format::FixStr(b & 0x1f),
            NIL => Format::Nil,
            0xc1 => Format::NeverUsed,
            FALSE => Format::False,
            TRUE => Format::True,
            BIN8 => Format::Bin8,
            BIN16 => Format::Bin16,
            BIN32 => Format::Bin32,
            EXT8 => Format::Ext8,
            EXT16 => Format::Ext16,
            EXT32 => Format::Ext32,
            FLOAT32 => Format::Float32,
            FLOAT64 => Format::Float64,
            UINT8 => Format::Uint8,
            UINT16 => Format::Uint16,
            UINT32 => Format::Uint32,
            UINT64 => Format::Uint64,
            INT8 => Format::Int8,
            INT16 => Format::Int16,
            INT32 => Format::Int32,
            INT64 => Format::Int64,
            FIXEXT1 => Format::FixExt1,
            FIXEXT2 => Format::FixExt2,
            FIXEXT4 => Format::FixExt4,
            FIXEXT8 => Format::FixExt8,
            FIXEXT16 => Format::FixExt16,
            STR8 => Format::Str8,
            STR16 => Format::Str16,
            STR32 => Format::Str32,
            ARRAY16 => Format::Array16,
            ARRAY32 => Format::Array32,
            MAP16 => Format::Map16,
            MAP32 => Format::Map32,
            0xe0..=0xff => Format::NegativeFixInt(b as i8),
        }
    }

    /// Value family.
    pub fn value_type(self) -> ValueType {
        match self {
            Format::Nil => ValueType::Nil,
            Format::False | Format::True => ValueType::Boolean,
            Format::PositiveFixInt(_)
            | Format::NegativeFixInt(_)
            | Format::Uint8
            | Format::Uint16
            | Format::Uint32
            | Format::Uint64
            | Format::Int8
            | Format::Int16
            | Format::Int32
            | Format::Int64 => ValueType::Integer,
            Format::Float32 | Format::Float64 => ValueType::Float,
            Format::FixStr(_) | Format::Str8 | Format::Str16 | Format::Str32 => ValueType::String,
            Format::Bin8 | Format::Bin16 | Format::Bin32 => ValueType::Binary,
            Format::FixArray(_) | Format::Array16 | Format::Array32 => ValueType::Array,
            Format::FixMap(_) | Format::Map16 | Format::Map32 => ValueType::Map,
            Format::Ext8
            | Format::Ext16
            | Format::Ext32
            | Format::FixExt1
            | Format::FixExt2
            | Format::FixExt4
            | Format::FixExt8
            | Format::FixExt16 => ValueType::Extension,
            Format::NeverUsed => ValueType::Invalid,
        }
    }

    pub fn is_nil(self) -> bool {
        self == Format::Nil
    }

    pub fn is_integer(self) -> bool {
        self.value_type() == ValueType::Integer
    }

    pub fn is_float(self) -> bool {
        self.value_type() == ValueType::Float
    }

    pub fn is_str(self) -> bool {
        self.value_type() == ValueType::String
    }

    pub fn is_bin(self) -> bool {
        self.value_type() == ValueType::Binary
    }

    pub fn is_array(self) -> bool {
        self.value_type() == ValueType::Array
    }

    pub fn is_map(self) -> bool {
        self.value_type() == ValueType::Map
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::PositiveFixInt(_) => write!(f, "POSFIXINT"),
            Format::NegativeFixInt(_) => write!(f, "NEGFIXINT"),
            Format::FixMap(_) => write!(f, "FIXMAP"),
            Format::FixArray(_) => write!(f, "FIXARRAY"),
            Format::FixStr(_) => write!(f, "FIXSTR"),
            other => write!(f, "{}", format!("{:?}", other).to_uppercase()),
        }
    }
}
