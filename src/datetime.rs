//! Calendar value types
//!
//! Plain decimal representations of what the RTC stores in BCD. A value is a
//! snapshot: reading the calendar creates a fresh one each time, writing one
//! copies it into the hardware and forgets it.

/// Day of the week, using the hardware encoding (`0b000` is reserved).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Weekday {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl Weekday {
    /// Decodes the three-bit weekday field of the date register.
    ///
    /// The reserved `0b000` pattern never appears once the calendar has been
    /// written; it is mapped to `Monday` rather than widening every read to
    /// an `Option`.
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits {
            2 => Weekday::Tuesday,
            3 => Weekday::Wednesday,
            4 => Weekday::Thursday,
            5 => Weekday::Friday,
            6 => Weekday::Saturday,
            7 => Weekday::Sunday,
            _ => Weekday::Monday,
        }
    }
}

/// A calendar date.
///
/// `year` is the two-digit year counter the hardware keeps (0..=99),
/// conventionally offset from 2000.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub weekday: Weekday,
    /// Day of month, 1..=31
    pub day: u8,
    /// Month, 1..=12
    pub month: u8,
    /// Year counter, 0..=99
    pub year: u8,
}

impl Date {
    pub(crate) fn in_range(&self) -> bool {
        (1..=31).contains(&self.day) && (1..=12).contains(&self.month) && self.year <= 99
    }
}

/// A time of day. Hours are always expressed as 0..=23; the driver converts
/// to the AM/PM representation itself when the RTC runs in 12-hour mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Time {
    /// Hours, 0..=23
    pub hours: u8,
    /// Minutes, 0..=59
    pub minutes: u8,
    /// Seconds, 0..=59
    pub seconds: u8,
}

impl Time {
    pub(crate) fn in_range(&self) -> bool {
        self.hours <= 23 && self.minutes <= 59 && self.seconds <= 59
    }
}

/// A full calendar snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub date: Date,
    pub time: Time,
}
