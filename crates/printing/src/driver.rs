//! Printer-driver default handling: the narrow configuration seam and the
//! set/restore bracket wrapped around a whole batch.
//! 印表機驅動預設值處理：窄設定介面，以及包住整個批次的套用／還原括號。

use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::job::{ColorMode, DriverOverrides, DuplexMode};

/// Default wait before restoring the captured defaults, long enough for the
/// spooler to pick up already-submitted jobs under the temporary values.
pub const DEFAULT_RESTORE_DELAY: Duration = Duration::from_millis(1500);

/// Errors raised while reading or writing driver defaults.
/// 讀寫驅動預設值時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to read defaults of printer `{printer}`: {detail}")]
    Read { printer: String, detail: String },
    #[error("failed to write defaults of printer `{printer}`: {detail}")]
    Write { printer: String, detail: String },
    #[error("failed to determine the default printer: {0}")]
    DefaultPrinter(String),
    #[error("printer driver defaults are not supported on this platform")]
    Unsupported,
}

/// The duplex and colour default fields of a printer's driver configuration
/// structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverDefaults {
    pub duplex: DuplexMode,
    pub color: ColorMode,
}

impl DriverDefaults {
    /// Returns these defaults with the requested overrides applied on top;
    /// fields left at `None` keep their captured value.
    pub fn with_overrides(self, overrides: DriverOverrides) -> Self {
        Self {
            duplex: overrides.duplex.unwrap_or(self.duplex),
            color: overrides.color.unwrap_or(self.color),
        }
    }
}

/// Narrow seam over the platform printer-configuration API. Implementations
/// touch only the duplex and colour fields and leave the rest of the driver
/// structure untouched.
/// 平台印表機設定 API 的窄介面：只操作雙面與色彩兩個欄位。
pub trait PrinterConfig {
    fn read_defaults(&self, printer: &str) -> Result<DriverDefaults, DriverError>;
    fn write_defaults(&self, printer: &str, defaults: DriverDefaults)
        -> Result<(), DriverError>;
}

/// Placeholder for platforms without a supported printer-configuration API;
/// every operation fails with [`DriverError::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPrinterConfig;

impl PrinterConfig for UnsupportedPrinterConfig {
    fn read_defaults(&self, _printer: &str) -> Result<DriverDefaults, DriverError> {
        Err(DriverError::Unsupported)
    }

    fn write_defaults(
        &self,
        _printer: &str,
        _defaults: DriverDefaults,
    ) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }
}

/// Scoped driver-defaults change around one batch. [`DriverGuard::apply`]
/// captures the current defaults and writes the requested merge as the new
/// printer default; [`DriverGuard::restore`] writes the captured values
/// back. With no overrides requested the guard holds no snapshot and both
/// directions perform zero driver I/O.
/// 暫時性的驅動預設值變更：建立時擷取並覆寫，restore 時還原。
#[must_use = "captured driver defaults are lost unless restore() is called"]
pub struct DriverGuard<'c> {
    config: &'c dyn PrinterConfig,
    printer: String,
    snapshot: Option<DriverDefaults>,
}

impl std::fmt::Debug for DriverGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverGuard")
            .field("printer", &self.printer)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl<'c> DriverGuard<'c> {
    /// Opens the bracket: reads the current defaults and commits the merge
    /// of defaults and overrides. The bracket spans the whole batch, never a
    /// single file; drivers may reject rapid toggling.
    pub fn apply(
        config: &'c dyn PrinterConfig,
        printer: &str,
        overrides: DriverOverrides,
    ) -> Result<Self, DriverError> {
        if overrides.is_empty() {
            return Ok(Self {
                config,
                printer: printer.to_string(),
                snapshot: None,
            });
        }
        let current = config.read_defaults(printer)?;
        config.write_defaults(printer, current.with_overrides(overrides))?;
        Ok(Self {
            config,
            printer: printer.to_string(),
            snapshot: Some(current),
        })
    }

    /// True when the bracket actually changed the driver defaults.
    pub fn overridden(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Closes the bracket: waits `delay` so the spooler picks up submitted
    /// jobs under the temporary defaults, then writes the captured values
    /// back. A guard that changed nothing skips both the delay and the
    /// write.
    pub fn restore(self, delay: Duration) -> Result<(), DriverError> {
        let Some(snapshot) = self.snapshot else {
            return Ok(());
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.config.write_defaults(&self.printer, snapshot)
    }
}
