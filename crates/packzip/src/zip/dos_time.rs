//! MS-DOS packed date and time.
//!
//! Time: bits 0-4 = seconds/2, bits 5-10 = minutes, bits 11-15 = hours.
//! Date: bits 0-4 = day, bits 5-8 = month, bits 9-15 = years since 1980.
//!
//! Packing and unpacking are exact inverses for every field value the bit
//! widths can hold, so timestamps of entries passed through unchanged survive
//! bit for bit even when they do not name a valid calendar date.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// First year representable in a DOS date.
pub const DOS_EPOCH_YEAR: u16 = 1980;

/// Last year representable in a DOS date.
pub const DOS_MAX_YEAR: u16 = DOS_EPOCH_YEAR + 0x7F;

/// Packed DOS time of day with two-second resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DosTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DosTime {
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self { hour, minute, second }
    }

    /// Unpack a 16-bit DOS time.
    pub const fn from_packed(packed: u16) -> Self {
        Self {
            hour: (packed >> 11) as u8,
            minute: ((packed >> 5) & 0x3F) as u8,
            second: ((packed & 0x1F) * 2) as u8,
        }
    }

    /// Pack into 16 bits. Odd seconds round down.
    pub const fn packed(&self) -> u16 {
        ((self.hour as u16 & 0x1F) << 11)
            | ((self.minute as u16 & 0x3F) << 5)
            | ((self.second as u16 / 2) & 0x1F)
    }
}

/// Packed DOS calendar date. `year` is the full calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DosDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Default for DosDate {
    fn default() -> Self {
        Self::new(DOS_EPOCH_YEAR, 1, 1)
    }
}

impl DosDate {
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Unpack a 16-bit DOS date.
    pub const fn from_packed(packed: u16) -> Self {
        Self {
            year: DOS_EPOCH_YEAR + (packed >> 9),
            month: ((packed >> 5) & 0x0F) as u8,
            day: (packed & 0x1F) as u8,
        }
    }

    /// Pack into 16 bits. Years before 1980 pack as 1980.
    pub const fn packed(&self) -> u16 {
        let offset = self.year.saturating_sub(DOS_EPOCH_YEAR);
        ((offset & 0x7F) << 9) | ((self.month as u16 & 0x0F) << 5) | (self.day as u16 & 0x1F)
    }
}

/// A DOS timestamp as stored in ZIP headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DosDateTime {
    pub date: DosDate,
    pub time: DosTime,
}

impl DosDateTime {
    pub const fn new(date: DosDate, time: DosTime) -> Self {
        Self { date, time }
    }

    /// Unpack the header date and time fields.
    pub const fn from_packed(date: u16, time: u16) -> Self {
        Self {
            date: DosDate::from_packed(date),
            time: DosTime::from_packed(time),
        }
    }

    /// Packed `(date, time)` pair.
    pub const fn packed(&self) -> (u16, u16) {
        (self.date.packed(), self.time.packed())
    }

    /// The current time, clamped to the DOS range.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Convert a system time, treating DOS fields as UTC.
    ///
    /// Times before 1980 clamp to 1980-01-01 00:00:00 and times after 2107
    /// clamp to the last representable instant.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let days = secs.div_euclid(86_400);
        let day_secs = secs.rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);

        if year < DOS_EPOCH_YEAR as i64 {
            return Self::default();
        }
        if year > DOS_MAX_YEAR as i64 {
            return Self::new(DosDate::new(DOS_MAX_YEAR, 12, 31), DosTime::new(23, 59, 58));
        }

        Self {
            date: DosDate::new(year as u16, month as u8, day as u8),
            time: DosTime::new(
                (day_secs / 3600) as u8,
                ((day_secs / 60) % 60) as u8,
                ((day_secs % 60) & !1) as u8,
            ),
        }
    }

    /// Convert to a system time, treating DOS fields as UTC.
    ///
    /// Returns `None` when the fields do not name a valid date and time.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let DosDate { year, month, day } = self.date;
        let DosTime { hour, minute, second } = self.time;

        if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
            return None;
        }
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }

        let days = days_from_civil(year as i64, month as i64, day as i64);
        let secs = days * 86_400 + hour as i64 * 3600 + minute as i64 * 60 + second as i64;

        UNIX_EPOCH.checked_add(Duration::from_secs(u64::try_from(secs).ok()?))
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Proleptic Gregorian `(year, month, day)` for days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

impl fmt::Display for DosDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.date.year,
            self.date.month,
            self.date.day,
            self.time.hour,
            self.time.minute,
            self.time.second
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_fields_are_bit_exact() {
        for packed in [0u16, 0x0001, 0x07E0, 0xF800, 0xBF7D, 0xFFFF] {
            assert_eq!(DosTime::from_packed(packed).packed(), packed);
        }

        let time = DosTime::new(13, 37, 42);
        assert_eq!(DosTime::from_packed(time.packed()), time);
    }

    #[test]
    fn test_date_fields_are_bit_exact() {
        for packed in [0u16, 0x0021, 0x5A6F, 0xFE00, 0xFFFF] {
            assert_eq!(DosDate::from_packed(packed).packed(), packed);
        }

        for year in [DOS_EPOCH_YEAR, 2000, 2024, DOS_MAX_YEAR] {
            let date = DosDate::new(year, 2, 29);
            assert_eq!(DosDate::from_packed(date.packed()), date);
        }
    }

    #[test]
    fn test_two_second_resolution() {
        let time = DosTime::new(10, 0, 59);
        assert_eq!(DosTime::from_packed(time.packed()).second, 58);
    }

    #[test]
    fn test_known_packing() {
        // 2009-05-23 14:30:10
        let dt = DosDateTime::new(DosDate::new(2009, 5, 23), DosTime::new(14, 30, 10));
        let (date, time) = dt.packed();
        assert_eq!(date, (29 << 9) | (5 << 5) | 23);
        assert_eq!(time, (14 << 11) | (30 << 5) | 5);
        assert_eq!(DosDateTime::from_packed(date, time), dt);
    }

    #[test]
    fn test_system_time_round_trip() {
        let dt = DosDateTime::new(DosDate::new(2024, 2, 29), DosTime::new(23, 59, 58));
        let system = dt.to_system_time().unwrap();
        assert_eq!(DosDateTime::from_system_time(system), dt);

        // 2024-02-29T23:59:58Z
        let secs = system.duration_since(UNIX_EPOCH).unwrap().as_secs();
        assert_eq!(secs, 1_709_251_198);
    }

    #[test]
    fn test_system_time_clamping() {
        assert_eq!(DosDateTime::from_system_time(UNIX_EPOCH), DosDateTime::default());

        let far = UNIX_EPOCH + Duration::from_secs(200 * 366 * 86_400);
        let clamped = DosDateTime::from_system_time(far);
        assert_eq!(clamped.date.year, DOS_MAX_YEAR);
        assert_eq!(clamped.date, DosDate::new(DOS_MAX_YEAR, 12, 31));
    }

    #[test]
    fn test_invalid_fields_have_no_system_time() {
        assert!(DosDateTime::from_packed(0, 0).to_system_time().is_none());

        let feb30 = DosDateTime::new(DosDate::new(2023, 2, 29), DosTime::default());
        assert!(feb30.to_system_time().is_none());
    }

    #[test]
    fn test_display() {
        let stamp = DosDateTime::new(DosDate::new(2009, 5, 23), DosTime::new(14, 30, 10));
        assert_eq!(stamp.to_string(), "2009-05-23 14:30:10");
    }
}
