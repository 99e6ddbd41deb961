//! RTC calendar peripheral abstraction
//!
//! The calendar lives in the backup domain, behind two layers of protection:
//! a write-protection key register (WPR) and an initialization mode that
//! stops the counters while the date and time registers are written. Every
//! configuration access follows the same bracket:
//!
//! 1. write the 0xCA/0x53 key sequence to WPR
//! 2. request init mode and wait for the INITF flag to confirm entry
//! 3. store the packed calendar/prescaler words
//! 4. leave init mode, clear RSF and wait for hardware to re-assert it,
//!    confirming the shadow registers caught up with the new values
//! 5. re-lock by writing any other byte to WPR
//!
//! Each wait polls a status flag a bounded number of times and reports a
//! distinct [`Error`] when the budget runs out; a dead oscillator or a
//! non-responding peripheral surfaces as a `Result` instead of hanging the
//! caller.
//!
//! The driver is generic over [`RegisterBank`], a typed whole-word view of
//! the RTC register block. The PAC `RTC` peripheral implements it for real
//! hardware; the unit tests drive the same sequencing logic against a
//! simulated bank.

use crate::backup_domain::BackupDomain;
use crate::bcd;
use crate::datetime::{Date, DateTime, Time, Weekday};
use crate::pac::{RCC, RTC};

// RTC_TR field offsets (RM0383 section 17.6.1). Tens and units nibbles of a
// field are not adjacent; each has its own position.
const TR_PM: u32 = 1 << 22;
const TR_HT_POS: u8 = 20;
const TR_HU_POS: u8 = 16;
const TR_MNT_POS: u8 = 12;
const TR_MNU_POS: u8 = 8;
const TR_ST_POS: u8 = 4;
const TR_SU_POS: u8 = 0;

// RTC_DR field offsets (RM0383 section 17.6.2).
const DR_YT_POS: u8 = 20;
const DR_YU_POS: u8 = 16;
const DR_WDU_POS: u8 = 13;
const DR_MT_POS: u8 = 12;
const DR_MU_POS: u8 = 8;
const DR_DT_POS: u8 = 4;
const DR_DU_POS: u8 = 0;

const ISR_INIT: u32 = 1 << 7;
const ISR_INITF: u32 = 1 << 6;
const ISR_RSF: u32 = 1 << 5;

const CR_FMT: u32 = 1 << 6;

const PRER_PREDIV_A_POS: u8 = 16;

// Write-protection key sequence; any other byte re-arms the protection.
const WPR_KEY_1: u8 = 0xCA;
const WPR_KEY_2: u8 = 0x53;
const WPR_LOCK: u8 = 0xFF;

/// RTC error type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The selected oscillator never reported ready
    ClockSourceTimeout,
    /// Init mode was requested but INITF never confirmed entry
    InitModeTimeout,
    /// The shadow registers never re-synchronized after leaving init mode
    SyncTimeout,
    /// A date or time field was outside its valid range
    InvalidInput,
}

/// Clock fed to the RTC through the backup-domain mux.
///
/// The HSE/32 path additionally involves the RTCPRE divider in `RCC_CFGR`,
/// which belongs to the system clock tree; it is not offered here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcClockSource {
    /// Low-speed internal RC oscillator, roughly 32 kHz
    Lsi,
    /// Low-speed external 32.768 kHz crystal
    Lse,
}

impl RtcClockSource {
    /// RTCSEL mux encoding: 00 no clock, 01 LSE, 10 LSI, 11 HSE.
    fn mux_bits(self) -> u8 {
        match self {
            RtcClockSource::Lse => 0b01,
            RtcClockSource::Lsi => 0b10,
        }
    }
}

/// Hour representation in the time register.
///
/// The public API always deals in 0..=23; in 12-hour mode the driver packs
/// and unpacks the PM bit itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HourFormat {
    H24,
    H12,
}

/// Configuration for the RTC.
///
/// The default prescalers divide the ~32 kHz LSI down to the 1 Hz calendar
/// tick: (127 + 1) * (249 + 1) = 32000.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcConfig {
    pub clock_source: RtcClockSource,
    pub hour_format: HourFormat,
    /// Asynchronous prescaler PREDIV_A, 7 bits
    pub async_prescaler: u8,
    /// Synchronous prescaler PREDIV_S, 15 bits
    pub sync_prescaler: u16,
    /// How many times each hardware wait polls its status flag before giving
    /// up. The default is generous: LSI start-up is specified in the tens of
    /// microseconds and init-mode entry takes up to two RTC clock cycles.
    pub poll_retries: u32,
}

impl Default for RtcConfig {
    fn default() -> Self {
        RtcConfig {
            clock_source: RtcClockSource::Lsi,
            hour_format: HourFormat::H24,
            async_prescaler: 127,
            sync_prescaler: 249,
            poll_retries: 1 << 20,
        }
    }
}

impl RtcConfig {
    #[inline(always)]
    pub fn clock_source(mut self, source: RtcClockSource) -> Self {
        self.clock_source = source;
        self
    }

    #[inline(always)]
    pub fn hour_format(mut self, format: HourFormat) -> Self {
        self.hour_format = format;
        self
    }

    /// Sets PREDIV_A and PREDIV_S. The calendar ticks at
    /// `f_rtcclk / ((async + 1) * (sync + 1))`.
    #[inline(always)]
    pub fn prescalers(mut self, async_prescaler: u8, sync_prescaler: u16) -> Self {
        self.async_prescaler = async_prescaler;
        self.sync_prescaler = sync_prescaler;
        self
    }

    #[inline(always)]
    pub fn poll_retries(mut self, retries: u32) -> Self {
        self.poll_retries = retries;
        self
    }
}

/// Typed whole-word access to the RTC register block.
///
/// One trait method per register the driver touches. Implementations must
/// perform exactly one load or store per call; the sequencing logic relies
/// on register stores being atomic.
pub trait RegisterBank {
    fn tr(&self) -> u32;
    fn set_tr(&mut self, word: u32);
    fn dr(&self) -> u32;
    fn set_dr(&mut self, word: u32);
    fn cr(&self) -> u32;
    fn set_cr(&mut self, word: u32);
    fn isr(&self) -> u32;
    fn set_isr(&mut self, word: u32);
    fn prer(&self) -> u32;
    fn set_prer(&mut self, word: u32);
    fn set_wpr(&mut self, key: u8);
}

impl RegisterBank for RTC {
    fn tr(&self) -> u32 {
        self.tr.read().bits()
    }
    fn set_tr(&mut self, word: u32) {
        self.tr.write(|w| unsafe { w.bits(word) });
    }
    fn dr(&self) -> u32 {
        self.dr.read().bits()
    }
    fn set_dr(&mut self, word: u32) {
        self.dr.write(|w| unsafe { w.bits(word) });
    }
    fn cr(&self) -> u32 {
        self.cr.read().bits()
    }
    fn set_cr(&mut self, word: u32) {
        self.cr.write(|w| unsafe { w.bits(word) });
    }
    fn isr(&self) -> u32 {
        self.isr.read().bits()
    }
    fn set_isr(&mut self, word: u32) {
        self.isr.write(|w| unsafe { w.bits(word) });
    }
    fn prer(&self) -> u32 {
        self.prer.read().bits()
    }
    fn set_prer(&mut self, word: u32) {
        self.prer.write(|w| unsafe { w.bits(word) });
    }
    fn set_wpr(&mut self, key: u8) {
        self.wpr.write(|w| unsafe { w.bits(u32::from(key)) });
    }
}

/// RTC calendar driver.
///
/// Owns the register bank for the lifetime of the driver; together with the
/// `&mut BackupDomain` required by [`Rtc::new`] this encodes the exclusive,
/// single-context access the peripheral demands.
pub struct Rtc<R = RTC> {
    regs: R,
    config: RtcConfig,
}

impl Rtc {
    /// Starts the configured oscillator, routes it to the RTC and programs
    /// prescalers and hour format.
    ///
    /// This pulses the backup-domain reset, so any previously running
    /// calendar is wiped; call it once per power cycle and follow up with
    /// [`set_datetime`](Rtc::set_datetime).
    pub fn new(regs: RTC, _bkp: &mut BackupDomain, config: RtcConfig) -> Result<Self, Error> {
        let rcc = unsafe { &(*RCC::ptr()) };
        let retries = config.poll_retries;

        // The reset wipes BDCR, so it comes first: starting the LSE and then
        // resetting the domain would stop the oscillator again.
        rcc.bdcr.modify(|_, w| w.bdrst().set_bit());
        rcc.bdcr.modify(|_, w| w.bdrst().clear_bit());

        match config.clock_source {
            RtcClockSource::Lsi => {
                rcc.csr.modify(|_, w| w.lsion().set_bit());
                if !poll_with_retry(retries, || rcc.csr.read().lsirdy().bit_is_set()) {
                    return Err(Error::ClockSourceTimeout);
                }
            }
            RtcClockSource::Lse => {
                rcc.bdcr.modify(|_, w| w.lseon().set_bit());
                if !poll_with_retry(retries, || rcc.bdcr.read().lserdy().bit_is_set()) {
                    return Err(Error::ClockSourceTimeout);
                }
            }
        }

        // Select the source and open the RTC clock gate. RTCSEL can only be
        // written once per backup-domain reset.
        rcc.bdcr.modify(|_, w| {
            unsafe { w.rtcsel().bits(config.clock_source.mux_bits()) };
            w.rtcen().set_bit()
        });

        Rtc::with_register_bank(regs, config)
    }
}

impl<R: RegisterBank> Rtc<R> {
    /// Programs prescalers and hour format on a register bank that is
    /// already clocked, leaving the calendar counting and write protected.
    ///
    /// [`Rtc::new`] ends up here after the clock bring-up; it is public so
    /// the driver can be run against an alternative [`RegisterBank`].
    pub fn with_register_bank(regs: R, config: RtcConfig) -> Result<Self, Error> {
        let mut rtc = Rtc { regs, config };
        rtc.perform_write(|rtc| {
            let prediv_s = u32::from(rtc.config.sync_prescaler) & 0x7FFF;
            let prediv_a = (u32::from(rtc.config.async_prescaler) & 0x7F) << PRER_PREDIV_A_POS;
            // The reference manual requires two separate accesses, the
            // synchronous divider first.
            rtc.regs.set_prer(prediv_s);
            rtc.regs.set_prer(prediv_s | prediv_a);

            let cr = rtc.regs.cr();
            match rtc.config.hour_format {
                HourFormat::H24 => rtc.regs.set_cr(cr & !CR_FMT),
                HourFormat::H12 => rtc.regs.set_cr(cr | CR_FMT),
            }
            Ok(())
        })?;
        Ok(rtc)
    }

    /// Sets date and time in one init-mode bracket.
    pub fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), Error> {
        if !datetime.date.in_range() || !datetime.time.in_range() {
            return Err(Error::InvalidInput);
        }
        let tr = time_to_word(&datetime.time, self.config.hour_format);
        let dr = date_to_word(&datetime.date);
        self.perform_write(|rtc| {
            rtc.regs.set_tr(tr);
            rtc.regs.set_dr(dr);
            Ok(())
        })
    }

    /// Sets the date, leaving the time of day untouched.
    pub fn set_date(&mut self, date: &Date) -> Result<(), Error> {
        if !date.in_range() {
            return Err(Error::InvalidInput);
        }
        let dr = date_to_word(date);
        self.perform_write(|rtc| {
            rtc.regs.set_dr(dr);
            Ok(())
        })
    }

    /// Sets the time of day, leaving the date untouched.
    pub fn set_time(&mut self, time: &Time) -> Result<(), Error> {
        if !time.in_range() {
            return Err(Error::InvalidInput);
        }
        let tr = time_to_word(time, self.config.hour_format);
        self.perform_write(|rtc| {
            rtc.regs.set_tr(tr);
            Ok(())
        })
    }

    /// Current seconds, 0..=59.
    pub fn seconds(&self) -> u8 {
        bcd::decode(((self.regs.tr() >> TR_SU_POS) & 0x7F) as u8)
    }

    /// Current minutes, 0..=59.
    pub fn minutes(&self) -> u8 {
        bcd::decode(((self.regs.tr() >> TR_MNU_POS) & 0x7F) as u8)
    }

    /// Current hour, 0..=23 regardless of the configured register format.
    pub fn hours(&self) -> u8 {
        hours_from_word(self.regs.tr(), self.config.hour_format)
    }

    /// Current day of the week.
    pub fn weekday(&self) -> Weekday {
        Weekday::from_bits(((self.regs.dr() >> DR_WDU_POS) & 0x7) as u8)
    }

    /// Current day of month, 1..=31.
    pub fn day(&self) -> u8 {
        bcd::decode(((self.regs.dr() >> DR_DU_POS) & 0x3F) as u8)
    }

    /// Current month, 1..=12.
    pub fn month(&self) -> u8 {
        bcd::decode(((self.regs.dr() >> DR_MU_POS) & 0x1F) as u8)
    }

    /// Current year counter, 0..=99.
    pub fn year(&self) -> u8 {
        bcd::decode(((self.regs.dr() >> DR_YU_POS) & 0xFF) as u8)
    }

    /// Snapshot of the time registers.
    pub fn time(&self) -> Time {
        time_from_word(self.regs.tr(), self.config.hour_format)
    }

    /// Snapshot of the date registers.
    pub fn date(&self) -> Date {
        date_from_word(self.regs.dr())
    }

    /// Coherent date/time snapshot.
    ///
    /// TR is read before DR: the hardware freezes the DR shadow copy on a TR
    /// read until DR is read, so the pair cannot straddle a tick.
    pub fn datetime(&self) -> DateTime {
        let tr = self.regs.tr();
        let dr = self.regs.dr();
        DateTime {
            date: date_from_word(dr),
            time: time_from_word(tr, self.config.hour_format),
        }
    }

    /// Releases the register bank.
    pub fn release(self) -> R {
        self.regs
    }

    /// Runs `f` with write protection lifted and the calendar stopped in
    /// init mode. Protection is restored even when a bounded wait inside the
    /// bracket fails.
    fn perform_write<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        self.regs.set_wpr(WPR_KEY_1);
        self.regs.set_wpr(WPR_KEY_2);
        let result = self.write_sequence(f);
        self.regs.set_wpr(WPR_LOCK);
        result
    }

    fn write_sequence<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        self.enter_init_mode()?;
        f(self)?;
        self.exit_init_mode()
    }

    fn enter_init_mode(&mut self) -> Result<(), Error> {
        if self.regs.isr() & ISR_INITF == 0 {
            let isr = self.regs.isr();
            self.regs.set_isr(isr | ISR_INIT);
            self.wait_for(|regs| regs.isr() & ISR_INITF != 0, Error::InitModeTimeout)?;
        }
        Ok(())
    }

    fn exit_init_mode(&mut self) -> Result<(), Error> {
        let isr = self.regs.isr();
        self.regs.set_isr(isr & !ISR_INIT);

        // The shadow registers are only consistent with what was just
        // written once hardware re-asserts RSF after we clear it.
        let isr = self.regs.isr();
        self.regs.set_isr(isr & !ISR_RSF);
        self.wait_for(|regs| regs.isr() & ISR_RSF != 0, Error::SyncTimeout)
    }

    fn wait_for(&self, mut done: impl FnMut(&R) -> bool, error: Error) -> Result<(), Error> {
        if poll_with_retry(self.config.poll_retries, || done(&self.regs)) {
            Ok(())
        } else {
            Err(error)
        }
    }
}

/// Polls `done` up to `retries + 1` times, reporting failure instead of
/// spinning forever.
fn poll_with_retry(retries: u32, mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..=retries {
        if done() {
            return true;
        }
    }
    false
}

fn date_to_word(date: &Date) -> u32 {
    let day = u32::from(bcd::encode(date.day));
    let month = u32::from(bcd::encode(date.month));
    let year = u32::from(bcd::encode(date.year));

    (u32::from(date.weekday as u8) << DR_WDU_POS)
        | ((year >> 4) << DR_YT_POS)
        | ((year & 0xF) << DR_YU_POS)
        | ((month >> 4) << DR_MT_POS)
        | ((month & 0xF) << DR_MU_POS)
        | ((day >> 4) << DR_DT_POS)
        | ((day & 0xF) << DR_DU_POS)
}

fn date_from_word(word: u32) -> Date {
    Date {
        weekday: Weekday::from_bits(((word >> DR_WDU_POS) & 0x7) as u8),
        day: bcd::decode(((word >> DR_DU_POS) & 0x3F) as u8),
        month: bcd::decode(((word >> DR_MU_POS) & 0x1F) as u8),
        year: bcd::decode(((word >> DR_YU_POS) & 0xFF) as u8),
    }
}

fn time_to_word(time: &Time, format: HourFormat) -> u32 {
    let (pm, hours) = match format {
        HourFormat::H24 => (false, time.hours),
        HourFormat::H12 => to_12h(time.hours),
    };
    let hours = u32::from(bcd::encode(hours));
    let minutes = u32::from(bcd::encode(time.minutes));
    let seconds = u32::from(bcd::encode(time.seconds));

    let mut word = ((hours >> 4) << TR_HT_POS)
        | ((hours & 0xF) << TR_HU_POS)
        | ((minutes >> 4) << TR_MNT_POS)
        | ((minutes & 0xF) << TR_MNU_POS)
        | ((seconds >> 4) << TR_ST_POS)
        | ((seconds & 0xF) << TR_SU_POS);
    if pm {
        word |= TR_PM;
    }
    word
}

fn time_from_word(word: u32, format: HourFormat) -> Time {
    Time {
        hours: hours_from_word(word, format),
        minutes: bcd::decode(((word >> TR_MNU_POS) & 0x7F) as u8),
        seconds: bcd::decode(((word >> TR_SU_POS) & 0x7F) as u8),
    }
}

fn hours_from_word(word: u32, format: HourFormat) -> u8 {
    let hours = bcd::decode(((word >> TR_HU_POS) & 0x3F) as u8);
    match format {
        HourFormat::H24 => hours,
        HourFormat::H12 => from_12h(word & TR_PM != 0, hours),
    }
}

fn to_12h(hours: u8) -> (bool, u8) {
    match hours {
        0 => (false, 12),
        1..=11 => (false, hours),
        12 => (true, 12),
        _ => (true, hours - 12),
    }
}

fn from_12h(pm: bool, hours: u8) -> u8 {
    match (pm, hours) {
        (false, 12) => 0,
        (false, h) => h,
        (true, 12) => 12,
        (true, h) => h + 12,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    /// Register bank standing in for the hardware block.
    ///
    /// Models the protection rules the driver has to respect: calendar and
    /// prescaler stores only land while the bank is unlocked and INITF is
    /// set, INITF follows an INIT request after `init_latency` status reads,
    /// and RSF re-asserts `sync_latency` status reads after being cleared
    /// outside init mode.
    struct SimBank {
        tr: u32,
        dr: u32,
        cr: u32,
        prer: u32,
        prer_stores: u32,
        isr: Cell<u32>,
        // 0 = locked, 1 = first key seen, 2 = unlocked
        wpr_stage: Cell<u8>,
        init_latency: u32,
        sync_latency: u32,
        init_countdown: Cell<u32>,
        sync_countdown: Cell<u32>,
    }

    impl SimBank {
        fn new() -> Self {
            SimBank {
                tr: 0,
                dr: 0,
                cr: 0,
                prer: 0,
                prer_stores: 0,
                isr: Cell::new(0),
                wpr_stage: Cell::new(0),
                init_latency: 0,
                sync_latency: 0,
                init_countdown: Cell::new(0),
                sync_countdown: Cell::new(0),
            }
        }

        fn with_latencies(init: u32, sync: u32) -> Self {
            let bank = SimBank::new();
            SimBank {
                init_latency: init,
                sync_latency: sync,
                init_countdown: Cell::new(init),
                sync_countdown: Cell::new(sync),
                ..bank
            }
        }

        fn unlocked(&self) -> bool {
            self.wpr_stage.get() == 2
        }

        fn writable(&self) -> bool {
            self.unlocked() && self.isr.get() & ISR_INITF != 0
        }
    }

    impl RegisterBank for SimBank {
        fn tr(&self) -> u32 {
            self.tr
        }
        fn set_tr(&mut self, word: u32) {
            if self.writable() {
                self.tr = word;
            }
        }
        fn dr(&self) -> u32 {
            self.dr
        }
        fn set_dr(&mut self, word: u32) {
            if self.writable() {
                self.dr = word;
            }
        }
        fn cr(&self) -> u32 {
            self.cr
        }
        fn set_cr(&mut self, word: u32) {
            if self.writable() {
                self.cr = word;
            }
        }
        fn isr(&self) -> u32 {
            let mut isr = self.isr.get();
            if isr & ISR_INIT != 0 && isr & ISR_INITF == 0 {
                if self.init_countdown.get() == 0 {
                    isr |= ISR_INITF;
                    self.isr.set(isr);
                } else {
                    self.init_countdown.set(self.init_countdown.get() - 1);
                }
            }
            if isr & ISR_INIT == 0 && isr & ISR_RSF == 0 {
                if self.sync_countdown.get() == 0 {
                    isr |= ISR_RSF;
                    self.isr.set(isr);
                } else {
                    self.sync_countdown.set(self.sync_countdown.get() - 1);
                }
            }
            isr
        }
        fn set_isr(&mut self, word: u32) {
            if !self.unlocked() {
                return;
            }
            let previous = self.isr.get();
            let mut isr = word;
            if isr & ISR_INIT == 0 {
                // Leaving init mode drops the confirmation flag
                isr &= !ISR_INITF;
            } else if previous & ISR_INIT == 0 {
                self.init_countdown.set(self.init_latency);
            }
            if previous & ISR_RSF != 0 && isr & ISR_RSF == 0 {
                self.sync_countdown.set(self.sync_latency);
            }
            self.isr.set(isr);
        }
        fn prer(&self) -> u32 {
            self.prer
        }
        fn set_prer(&mut self, word: u32) {
            if self.writable() {
                self.prer = word;
                self.prer_stores += 1;
            }
        }
        fn set_wpr(&mut self, key: u8) {
            let stage = match (self.wpr_stage.get(), key) {
                (0, 0xCA) => 1,
                (1, 0x53) => 2,
                (2, _) => 0,
                _ => 0,
            };
            self.wpr_stage.set(stage);
        }
    }

    fn friday_29_12_16() -> DateTime {
        DateTime {
            date: Date {
                weekday: Weekday::Friday,
                day: 29,
                month: 12,
                year: 16,
            },
            time: Time {
                hours: 23,
                minutes: 59,
                seconds: 55,
            },
        }
    }

    fn config() -> RtcConfig {
        RtcConfig::default().poll_retries(16)
    }

    #[test]
    fn date_word_matches_register_layout() {
        let word = date_to_word(&Date {
            weekday: Weekday::Friday,
            day: 29,
            month: 12,
            year: 16,
        });

        assert_eq!((word >> 13) & 0x7, 5);
        assert_eq!(word & 0x3F, 0x29);
        assert_eq!((word >> 8) & 0x1F, 0x12);
        assert_eq!((word >> 16) & 0xFF, 0x16);
        assert_eq!(
            word,
            (5 << 13) | (1 << 20) | (6 << 16) | (1 << 12) | (2 << 8) | (2 << 4) | 9
        );
    }

    #[test]
    fn time_word_matches_register_layout() {
        let time = Time {
            hours: 23,
            minutes: 59,
            seconds: 55,
        };

        let word = time_to_word(&time, HourFormat::H24);
        assert_eq!((word >> 16) & 0x3F, 0x23);
        assert_eq!((word >> 8) & 0x7F, 0x59);
        assert_eq!(word & 0x7F, 0x55);
        assert_eq!(word & TR_PM, 0);

        // 23:59:55 in 12-hour mode is 11:59:55 PM
        let word = time_to_word(&time, HourFormat::H12);
        assert_eq!((word >> 16) & 0x3F, 0x11);
        assert_ne!(word & TR_PM, 0);
        assert_eq!(hours_from_word(word, HourFormat::H12), 23);
    }

    #[test]
    fn hour_conversion_round_trips_in_12h_mode() {
        for hours in 0..=23 {
            let (pm, h12) = to_12h(hours);
            assert!((1..=12).contains(&h12));
            assert_eq!(from_12h(pm, h12), hours);
        }
    }

    #[test]
    fn configuration_lands_and_relocks() {
        let rtc = Rtc::with_register_bank(SimBank::new(), config()).unwrap();
        let bank = rtc.release();

        // PREDIV_S first, then PREDIV_A merged in with a second store
        assert_eq!(bank.prer_stores, 2);
        assert_eq!(bank.prer, (127 << 16) | 249);
        assert_eq!(bank.cr & CR_FMT, 0);
        // Out of init mode, shadow registers synchronized, protection armed
        assert_eq!(bank.isr.get() & ISR_INIT, 0);
        assert_ne!(bank.isr.get() & ISR_RSF, 0);
        assert_eq!(bank.wpr_stage.get(), 0);
    }

    #[test]
    fn configuration_survives_slow_flag_response() {
        let bank = SimBank::with_latencies(5, 7);
        let rtc = Rtc::with_register_bank(bank, config()).unwrap();
        assert_eq!(rtc.release().prer, (127 << 16) | 249);
    }

    #[test]
    fn twelve_hour_format_sets_fmt() {
        let cfg = config().hour_format(HourFormat::H12);
        let rtc = Rtc::with_register_bank(SimBank::new(), cfg).unwrap();
        assert_ne!(rtc.release().cr & CR_FMT, 0);
    }

    #[test]
    fn datetime_round_trips_through_the_registers() {
        let mut rtc = Rtc::with_register_bank(SimBank::new(), config()).unwrap();
        rtc.set_datetime(&friday_29_12_16()).unwrap();

        assert_eq!(rtc.seconds(), 55);
        assert_eq!(rtc.minutes(), 59);
        assert_eq!(rtc.hours(), 23);
        assert_eq!(rtc.weekday(), Weekday::Friday);
        assert_eq!(rtc.day(), 29);
        assert_eq!(rtc.month(), 12);
        assert_eq!(rtc.year(), 16);
        assert_eq!(rtc.datetime(), friday_29_12_16());
    }

    #[test]
    fn accessors_are_idempotent_between_ticks() {
        let mut rtc = Rtc::with_register_bank(SimBank::new(), config()).unwrap();
        rtc.set_datetime(&friday_29_12_16()).unwrap();

        assert_eq!(rtc.seconds(), rtc.seconds());
        assert_eq!(rtc.datetime(), rtc.datetime());
    }

    #[test]
    fn datetime_round_trips_in_12h_mode() {
        let cfg = config().hour_format(HourFormat::H12);
        let mut rtc = Rtc::with_register_bank(SimBank::new(), cfg).unwrap();
        rtc.set_datetime(&friday_29_12_16()).unwrap();

        assert_eq!(rtc.hours(), 23);

        rtc.set_time(&Time {
            hours: 0,
            minutes: 5,
            seconds: 0,
        })
        .unwrap();
        assert_eq!(rtc.hours(), 0);
        assert_eq!(rtc.minutes(), 5);
    }

    #[test]
    fn set_date_leaves_time_alone() {
        let mut rtc = Rtc::with_register_bank(SimBank::new(), config()).unwrap();
        rtc.set_datetime(&friday_29_12_16()).unwrap();

        rtc.set_date(&Date {
            weekday: Weekday::Saturday,
            day: 30,
            month: 12,
            year: 16,
        })
        .unwrap();

        assert_eq!(rtc.day(), 30);
        assert_eq!(rtc.weekday(), Weekday::Saturday);
        assert_eq!(rtc.time(), friday_29_12_16().time);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut rtc = Rtc::with_register_bank(SimBank::new(), config()).unwrap();

        let mut datetime = friday_29_12_16();
        datetime.date.day = 32;
        assert_eq!(rtc.set_datetime(&datetime), Err(Error::InvalidInput));

        let bad_time = Time {
            hours: 24,
            minutes: 0,
            seconds: 0,
        };
        assert_eq!(rtc.set_time(&bad_time), Err(Error::InvalidInput));
    }

    #[test]
    fn init_mode_entry_times_out() {
        let bank = SimBank::with_latencies(1000, 0);
        let result = Rtc::with_register_bank(bank, config());
        assert!(matches!(result, Err(Error::InitModeTimeout)));
    }

    #[test]
    fn resynchronization_timeout_still_relocks() {
        let mut rtc = Rtc::with_register_bank(SimBank::new(), config()).unwrap();

        rtc.regs.sync_latency = 1000;
        assert_eq!(rtc.set_datetime(&friday_29_12_16()), Err(Error::SyncTimeout));
        assert_eq!(rtc.regs.wpr_stage.get(), 0);
    }

    #[test]
    fn stores_are_ignored_while_protected() {
        let mut bank = SimBank::new();
        bank.set_tr(0x0023_5955);
        bank.set_prer(0xFFFF);
        assert_eq!(bank.tr, 0);
        assert_eq!(bank.prer, 0);
    }

    #[test]
    fn poll_budget_boundaries() {
        let mut calls = 0;
        assert!(poll_with_retry(3, || {
            calls += 1;
            calls == 4
        }));

        let mut calls = 0;
        assert!(!poll_with_retry(3, || {
            calls += 1;
            calls == 5
        }));
    }
}
