use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::wire::WireType;

/// Size of a serialized [`MysqlTime`] inside a slot buffer.
pub const MYSQL_TIME_LEN: usize = 15;

/// Structured date/time exchanged with the native layer.
///
/// For TIME values `hour` may exceed 23 and `negative` marks a negative
/// interval; date fields are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MysqlTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u32,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
    pub negative: bool,
}

/// Date that TIME-only values are anchored to when decoded.
#[must_use]
pub fn time_anchor() -> NaiveDateTime {
    NaiveDateTime::default()
}

impl MysqlTime {
    /// Whole-second representation of `value`; sub-second precision is dropped.
    /// `None` when the year falls outside what the server can store (0..=9999).
    #[must_use]
    pub fn from_datetime(value: &NaiveDateTime) -> Option<Self> {
        let year = u16::try_from(value.year()).ok().filter(|y| *y <= 9999)?;
        Some(Self {
            year,
            month: value.month() as u8,
            day: value.day() as u8,
            hour: value.hour(),
            minute: value.minute() as u8,
            second: value.second() as u8,
            microsecond: 0,
            negative: false,
        })
    }

    #[must_use]
    pub fn is_zero_date(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    /// DATE / DATETIME / TIMESTAMP reading. `None` for the zero date or an
    /// out-of-range component.
    #[must_use]
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        if self.is_zero_date() {
            return None;
        }
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?
        .and_hms_micro_opt(
            self.hour,
            u32::from(self.minute),
            u32::from(self.second),
            self.microsecond,
        )
    }

    /// TIME reading, anchored to [`time_anchor`].
    #[must_use]
    pub fn to_anchored_time(&self) -> Option<NaiveDateTime> {
        let span = Duration::hours(i64::from(self.hour))
            + Duration::minutes(i64::from(self.minute))
            + Duration::seconds(i64::from(self.second))
            + Duration::microseconds(i64::from(self.microsecond));
        let span = if self.negative { -span } else { span };
        time_anchor().checked_add_signed(span)
    }

    /// Parse the server's text form of a `kind` value: `[-]H:MM:SS[.ffffff]`
    /// for TIME, `YYYY-MM-DD[ HH:MM:SS[.ffffff]]` for the date kinds. The zero
    /// date is accepted; other impossible dates are not.
    #[must_use]
    pub fn parse_text(text: &str, kind: WireType) -> Option<Self> {
        if kind == WireType::Time {
            let (negative, clock) = match text.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, text),
            };
            let (hour, minute, second, microsecond) = parse_clock(clock)?;
            return Some(Self {
                hour,
                minute,
                second,
                microsecond,
                negative,
                ..Self::default()
            });
        }

        let (date, clock) = match text.split_once(' ') {
            Some((date, clock)) => (date, Some(clock)),
            None => (text, None),
        };
        let mut parts = date.splitn(3, '-');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        let (hour, minute, second, microsecond) = clock.map_or(Some((0, 0, 0, 0)), parse_clock)?;
        let time = Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond,
            negative: false,
        };
        (time.is_zero_date() || time.to_datetime().is_some()).then_some(time)
    }

    pub(crate) fn write_to(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.year.to_le_bytes());
        out[2] = self.month;
        out[3] = self.day;
        out[4..8].copy_from_slice(&self.hour.to_le_bytes());
        out[8] = self.minute;
        out[9] = self.second;
        out[10..14].copy_from_slice(&self.microsecond.to_le_bytes());
        out[14] = u8::from(self.negative);
    }

    pub(crate) fn read_from(buf: &[u8]) -> Option<Self> {
        if buf.len() < MYSQL_TIME_LEN {
            return None;
        }
        Some(Self {
            year: u16::from_le_bytes([buf[0], buf[1]]),
            month: buf[2],
            day: buf[3],
            hour: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            minute: buf[8],
            second: buf[9],
            microsecond: u32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]),
            negative: buf[14] != 0,
        })
    }
}

/// `H:MM:SS[.ffffff]` into hour, minute, second and microsecond.
fn parse_clock(text: &str) -> Option<(u32, u8, u8, u32)> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    let mut parts = whole.splitn(3, ':');
    let hour = parts.next()?.parse().ok()?;
    let minute: u8 = parts.next()?.parse().ok()?;
    let second: u8 = parts.next()?.parse().ok()?;
    if minute > 59 || second > 59 {
        return None;
    }
    let microsecond = match fraction {
        None => 0,
        Some(digits) if (1..=6).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{digits:0<6}").parse().ok()?
        }
        Some(_) => return None,
    };
    Some((hour, minute, second, microsecond))
}
