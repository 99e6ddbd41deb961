//! # Reset & Control Clock
//!
//! Only the slice of RCC the calendar needs: the power interface clock and
//! backup-domain write access. The RTC clock mux and gate themselves live in
//! the backup domain and are driven by [`rtc::Rtc::new`](crate::rtc::Rtc::new).

use crate::backup_domain::BackupDomain;
use crate::pac::{PWR, RCC};

/// Extension trait that constrains the `RCC` peripheral
pub trait RccExt {
    /// Constrains the `RCC` peripheral so it plays nicely with the other abstractions
    fn constrain(self) -> Rcc;
}

impl RccExt for RCC {
    fn constrain(self) -> Rcc {
        Rcc {
            bkp: BKP { _0: () },
        }
    }
}

/// Constrained RCC peripheral
///
/// Acquired by calling the [constrain](RccExt::constrain) method on the `RCC`
/// peripheral from the `PAC`
///
/// ```no_run
/// # use stm32f4x1_rtc_hal::{pac, prelude::*};
/// let dp = pac::Peripherals::take().unwrap();
/// let mut rcc = dp.RCC.constrain();
/// ```
pub struct Rcc {
    pub bkp: BKP,
}

/// Opaque handle for enabling backup-domain write access
pub struct BKP {
    pub(crate) _0: (),
}

impl BKP {
    /// Enables write access to the registers in the backup domain
    pub fn constrain(self, pwr: &mut PWR) -> BackupDomain {
        let rcc = unsafe { &(*RCC::ptr()) };

        // Enable the power interface clock
        rcc.apb1enr.modify(|_, w| w.pwren().set_bit());
        // The interface needs one cycle before PWR_CR accepts writes
        let _ = pwr.cr.read();

        // Enable access to the backup registers
        pwr.cr.modify(|_, w| w.dbp().set_bit());

        BackupDomain { _0: () }
    }
}
