//! Server-side type tags, column flag bits and character-set ids.

/// Character-set id the server reports for binary columns.
pub const BINARY_CHARSET: u16 = 63;

/// Column definition flag bits.
pub mod flags {
    pub const NOT_NULL: u16 = 0x0001;
    pub const PRI_KEY: u16 = 0x0002;
    pub const UNSIGNED: u16 = 0x0020;
}

/// Wire type of a column or parameter.
///
/// Codes the crate does not know are kept in `Unknown` so decoding can report
/// the raw code instead of failing while metadata is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Decimal,
    Tiny,
    Short,
    Long,
    Float,
    Double,
    Null,
    Timestamp,
    LongLong,
    Int24,
    Date,
    Time,
    DateTime,
    Year,
    NewDate,
    VarChar,
    Bit,
    Json,
    NewDecimal,
    Enum,
    Set,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Blob,
    VarString,
    String,
    Geometry,
    Unknown(u8),
}

impl WireType {
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => WireType::Decimal,
            1 => WireType::Tiny,
            2 => WireType::Short,
            3 => WireType::Long,
            4 => WireType::Float,
            5 => WireType::Double,
            6 => WireType::Null,
            7 => WireType::Timestamp,
            8 => WireType::LongLong,
            9 => WireType::Int24,
            10 => WireType::Date,
            11 => WireType::Time,
            12 => WireType::DateTime,
            13 => WireType::Year,
            14 => WireType::NewDate,
            15 => WireType::VarChar,
            16 => WireType::Bit,
            245 => WireType::Json,
            246 => WireType::NewDecimal,
            247 => WireType::Enum,
            248 => WireType::Set,
            249 => WireType::TinyBlob,
            250 => WireType::MediumBlob,
            251 => WireType::LongBlob,
            252 => WireType::Blob,
            253 => WireType::VarString,
            254 => WireType::String,
            255 => WireType::Geometry,
            other => WireType::Unknown(other),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            WireType::Decimal => 0,
            WireType::Tiny => 1,
            WireType::Short => 2,
            WireType::Long => 3,
            WireType::Float => 4,
            WireType::Double => 5,
            WireType::Null => 6,
            WireType::Timestamp => 7,
            WireType::LongLong => 8,
            WireType::Int24 => 9,
            WireType::Date => 10,
            WireType::Time => 11,
            WireType::DateTime => 12,
            WireType::Year => 13,
            WireType::NewDate => 14,
            WireType::VarChar => 15,
            WireType::Bit => 16,
            WireType::Json => 245,
            WireType::NewDecimal => 246,
            WireType::Enum => 247,
            WireType::Set => 248,
            WireType::TinyBlob => 249,
            WireType::MediumBlob => 250,
            WireType::LongBlob => 251,
            WireType::Blob => 252,
            WireType::VarString => 253,
            WireType::String => 254,
            WireType::Geometry => 255,
            WireType::Unknown(code) => code,
        }
    }

    /// Byte width of fixed-size kinds; `None` for variable-length and unknown kinds.
    #[must_use]
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::Null => Some(0),
            WireType::Tiny => Some(1),
            WireType::Short | WireType::Year => Some(2),
            WireType::Long | WireType::Int24 | WireType::Float => Some(4),
            WireType::LongLong | WireType::Double => Some(8),
            WireType::Date
            | WireType::Time
            | WireType::DateTime
            | WireType::Timestamp
            | WireType::NewDate => Some(crate::binding::MYSQL_TIME_LEN),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            WireType::Tiny
                | WireType::Short
                | WireType::Long
                | WireType::Int24
                | WireType::LongLong
                | WireType::Year
        )
    }

    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            WireType::Date
                | WireType::Time
                | WireType::DateTime
                | WireType::Timestamp
                | WireType::NewDate
        )
    }
}
