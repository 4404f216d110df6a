//! Win32 marshaling behind [`PrinterConfig`]: reads and writes the duplex
//! and colour fields of the printer's default `DEVMODEW` through the
//! winspool surface, and resolves the system default printer.
//! [`PrinterConfig`] 的 Win32 實作：透過 winspool 讀寫印表機預設
//! `DEVMODEW` 的雙面與色彩欄位，並解析系統預設印表機。

use std::ptr;

use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, HANDLE};
use windows::Win32::Graphics::Gdi::{
    DEVMODEW, DEVMODE_COLOR, DEVMODE_DUPLEX, DMCOLOR_COLOR, DMCOLOR_MONOCHROME, DMDUP_HORIZONTAL,
    DMDUP_SIMPLEX, DMDUP_VERTICAL, DM_COLOR, DM_DUPLEX,
};
use windows::Win32::Graphics::Printing::{
    ClosePrinter, GetDefaultPrinterW, GetPrinterW, OpenPrinterW, SetPrinterW,
    PRINTER_ACCESS_ADMINISTER, PRINTER_ACCESS_USE, PRINTER_DEFAULTSW, PRINTER_INFO_2W,
};
use windows::Win32::Security::PSECURITY_DESCRIPTOR;

use crate::driver::{DriverDefaults, DriverError, PrinterConfig};
use crate::job::{ColorMode, DuplexMode};

/// [`PrinterConfig`] backed by the Windows print spooler.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPrinterConfig;

impl PrinterConfig for WindowsPrinterConfig {
    fn read_defaults(&self, printer: &str) -> Result<DriverDefaults, DriverError> {
        let result = (|| {
            let handle = PrinterHandle::open(printer, PRINTER_ACCESS_USE)?;
            let mut buffer = printer_info_2(&handle)?;
            let devmode = devmode_mut(&mut buffer)?;
            Ok(DriverDefaults {
                duplex: duplex_from_devmode(devmode),
                color: color_from_devmode(devmode),
            })
        })();
        result.map_err(|detail| DriverError::Read {
            printer: printer.to_string(),
            detail,
        })
    }

    fn write_defaults(
        &self,
        printer: &str,
        defaults: DriverDefaults,
    ) -> Result<(), DriverError> {
        let result = (|| {
            let handle = PrinterHandle::open(printer, PRINTER_ACCESS_ADMINISTER)?;
            let mut buffer = printer_info_2(&handle)?;
            {
                let devmode = devmode_mut(&mut buffer)?;
                devmode.dmDuplex = duplex_to_devmode(defaults.duplex);
                devmode.dmColor = color_to_devmode(defaults.color);
                devmode.dmFields |= DM_DUPLEX | DM_COLOR;
            }
            // SetPrinter rejects a level-2 write that also carries the
            // security descriptor; clear it before committing.
            let info = buffer.as_mut_ptr() as *mut PRINTER_INFO_2W;
            unsafe {
                (*info).pSecurityDescriptor = PSECURITY_DESCRIPTOR::default();
                SetPrinterW(handle.0, 2, Some(&buffer), 0)
            }
            .map_err(|err| err.to_string())
        })();
        result.map_err(|detail| DriverError::Write {
            printer: printer.to_string(),
            detail,
        })
    }
}

/// Resolves the name of the system default printer.
pub fn default_printer() -> Result<String, DriverError> {
    let mut len = 0u32;
    if let Err(err) = unsafe { GetDefaultPrinterW(PWSTR::null(), &mut len) } {
        if err.code() != ERROR_INSUFFICIENT_BUFFER.to_hresult() {
            return Err(DriverError::DefaultPrinter(err.to_string()));
        }
    }
    if len == 0 {
        return Err(DriverError::DefaultPrinter(
            "no default printer is configured".into(),
        ));
    }
    let mut buffer = vec![0u16; len as usize];
    unsafe { GetDefaultPrinterW(PWSTR(buffer.as_mut_ptr()), &mut len) }
        .map_err(|err| DriverError::DefaultPrinter(err.to_string()))?;
    Ok(from_wide(&buffer))
}

/// Open spooler handle, closed on every exit path.
struct PrinterHandle(HANDLE);

impl PrinterHandle {
    fn open(printer: &str, access: u32) -> Result<Self, String> {
        let name = to_wide(printer);
        let defaults = PRINTER_DEFAULTSW {
            pDatatype: PWSTR::null(),
            pDevMode: ptr::null_mut(),
            DesiredAccess: access,
        };
        let mut handle = HANDLE::default();
        unsafe { OpenPrinterW(PCWSTR(name.as_ptr()), &mut handle, Some(&defaults)) }
            .map_err(|err| err.to_string())?;
        Ok(Self(handle))
    }
}

impl Drop for PrinterHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = ClosePrinter(self.0);
        }
    }
}

/// Fetches the level-2 printer information block, sized by a probe call.
fn printer_info_2(handle: &PrinterHandle) -> Result<Vec<u8>, String> {
    let mut needed = 0u32;
    if let Err(err) = unsafe { GetPrinterW(handle.0, 2, None, &mut needed) } {
        if err.code() != ERROR_INSUFFICIENT_BUFFER.to_hresult() {
            return Err(err.to_string());
        }
    }
    if needed == 0 {
        return Err("printer reported an empty configuration block".into());
    }
    let mut buffer = vec![0u8; needed as usize];
    unsafe { GetPrinterW(handle.0, 2, Some(&mut buffer), &mut needed) }
        .map_err(|err| err.to_string())?;
    Ok(buffer)
}

fn devmode_mut(buffer: &mut [u8]) -> Result<&mut DEVMODEW, String> {
    let info = buffer.as_ptr() as *const PRINTER_INFO_2W;
    let devmode = unsafe { (*info).pDevMode };
    if devmode.is_null() {
        return Err("printer driver exposes no DEVMODE".into());
    }
    Ok(unsafe { &mut *devmode })
}

fn duplex_from_devmode(devmode: &DEVMODEW) -> DuplexMode {
    if devmode.dmDuplex == DMDUP_VERTICAL {
        DuplexMode::LongEdge
    } else if devmode.dmDuplex == DMDUP_HORIZONTAL {
        DuplexMode::ShortEdge
    } else {
        DuplexMode::Simplex
    }
}

fn duplex_to_devmode(mode: DuplexMode) -> DEVMODE_DUPLEX {
    match mode {
        DuplexMode::Simplex => DMDUP_SIMPLEX,
        DuplexMode::LongEdge => DMDUP_VERTICAL,
        DuplexMode::ShortEdge => DMDUP_HORIZONTAL,
    }
}

fn color_from_devmode(devmode: &DEVMODEW) -> ColorMode {
    if devmode.dmColor == DMCOLOR_COLOR {
        ColorMode::Color
    } else {
        ColorMode::Monochrome
    }
}

fn color_to_devmode(mode: ColorMode) -> DEVMODE_COLOR {
    match mode {
        ColorMode::Color => DMCOLOR_COLOR,
        ColorMode::Monochrome => DMCOLOR_MONOCHROME,
    }
}

fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}
