pub use crate::rcc::RccExt as _stm32f4x1_rtc_hal_rcc_RccExt;
