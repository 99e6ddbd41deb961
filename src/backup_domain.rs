/*!
  Registers that are not reset as long as Vbat or Vdd has power.

  On the STM32F4x1 the backup domain contains the RTC, its clock mux and the
  backup registers. It retains its state across system resets and, with V_BAT
  powered, across removal of Vdd, which is what keeps the calendar counting
  while the rest of the chip is off.

  The domain is write protected after reset. Write access is enabled by
  calling `constrain` on [`rcc::Rcc::bkp`](crate::rcc::BKP), which turns on
  the power interface clock and sets the DBP bit in `PWR_CR`.
*/

/**
  The existence of this struct indicates that writing to the backup domain
  has been enabled. It is acquired by calling `constrain` on
  [`rcc::Rcc::bkp`](crate::rcc::BKP).
*/
pub struct BackupDomain {
    pub(crate) _0: (),
}
