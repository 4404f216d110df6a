//! Print-job model and printer-driver default handling shared by the
//! pdfbatch components.

pub mod driver;
pub mod job;
pub mod pages;
#[cfg(target_os = "windows")]
pub mod windows;

pub use driver::{
    DriverDefaults, DriverError, DriverGuard, PrinterConfig, UnsupportedPrinterConfig,
    DEFAULT_RESTORE_DELAY,
};
pub use job::{BatchState, ColorMode, DriverOverrides, DuplexMode, PrintJobSpec};
pub use pages::{PageRangeError, PageSelection, PageSpan};
