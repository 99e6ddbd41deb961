//! Binary-coded decimal conversion
//!
//! The RTC calendar registers store every date and time field as a pair of
//! decimal digits, one per nibble: tens in the high nibble, units in the low
//! nibble. These two functions are the only place the crate translates
//! between the two representations.

/// Packs a decimal value in `0..=99` into its BCD representation.
///
/// `encode(45)` is `0x45`. Values above 99 spill the tens digit into bit 7
/// and produce a nibble pattern the hardware does not accept; callers must
/// validate ranges first.
pub const fn encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Unpacks a BCD value into the decimal quantity it encodes.
///
/// `decode(0x45)` is `45`. Assumes both nibbles are valid digits; the RTC
/// never stores anything else once it has been initialized.
pub const fn decode(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}
