//! # RTC calendar driver for the STM32F401/F411 microcontrollers
//!
//! Brings the real-time clock peripheral up from a cold backup domain,
//! programs the calendar and reads it back, with every hardware wait bounded
//! by a retry budget instead of an open-ended busy loop.
//!
//! Select the microcontroller with the corresponding feature (`stm32f411` is
//! the default):
//!
//! ```toml
//! [dependencies.stm32f4x1-rtc-hal]
//! version = "0.1.0"
//! features = ["stm32f411"]
//! ```
//!
//! # Usage example
//!
//! ```no_run
//! use stm32f4x1_rtc_hal::{
//!     datetime::{Date, DateTime, Time, Weekday},
//!     pac,
//!     prelude::*,
//!     rtc::{Rtc, RtcConfig},
//! };
//!
//! let dp = pac::Peripherals::take().unwrap();
//!
//! let mut pwr = dp.PWR;
//! let mut rcc = dp.RCC.constrain();
//!
//! // Enable writes to the backup domain, then start the RTC from the LSI
//! // oscillator. This resets the backup domain and wipes any previously
//! // running calendar.
//! let mut backup_domain = rcc.bkp.constrain(&mut pwr);
//! let mut rtc = Rtc::new(dp.RTC, &mut backup_domain, RtcConfig::default()).unwrap();
//!
//! rtc.set_datetime(&DateTime {
//!     date: Date {
//!         weekday: Weekday::Friday,
//!         day: 29,
//!         month: 12,
//!         year: 16,
//!     },
//!     time: Time {
//!         hours: 23,
//!         minutes: 59,
//!         seconds: 55,
//!     },
//! })
//! .unwrap();
//!
//! loop {
//!     let now = rtc.datetime();
//!     let _ = now;
//! }
//! ```

#![no_std]

#[cfg(feature = "stm32f401")]
pub use stm32f4::stm32f401 as pac;

#[cfg(feature = "stm32f411")]
pub use stm32f4::stm32f411 as pac;

pub use crate::pac as device;

pub mod backup_domain;
pub mod bcd;
pub mod datetime;
pub mod prelude;
pub mod rcc;
pub mod rtc;
