use std::fmt;
use std::path::PathBuf;

use crate::pages::PageSelection;

/// Duplex (two-sided) printing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexMode {
    Simplex,
    LongEdge,
    ShortEdge,
}

impl fmt::Display for DuplexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DuplexMode::Simplex => "simplex",
            DuplexMode::LongEdge => "long-edge",
            DuplexMode::ShortEdge => "short-edge",
        };
        f.write_str(label)
    }
}

/// Colour mode for the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Color,
    Monochrome,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColorMode::Color => "color",
            ColorMode::Monochrome => "mono",
        };
        f.write_str(label)
    }
}

/// Requested duplex/colour overrides for a batch. `None` keeps the
/// printer's current default for that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverOverrides {
    pub duplex: Option<DuplexMode>,
    pub color: Option<ColorMode>,
}

impl DriverOverrides {
    /// True when no field is overridden and the batch prints under the
    /// printer's existing defaults.
    pub fn is_empty(&self) -> bool {
        self.duplex.is_none() && self.color.is_none()
    }
}

/// One print job: a single document handed to the viewer.
#[derive(Debug, Clone)]
pub struct PrintJobSpec {
    pub path: PathBuf,
    pub overrides: DriverOverrides,
    pub pages: PageSelection,
    pub copies: u32,
}

/// Phases of a batch run, in execution order. `Failed` is the terminal
/// state for a run aborted before its summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Selecting,
    AwaitingTransaction,
    Printing,
    Restoring,
    Done,
    Failed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchState::Idle => "idle",
            BatchState::Selecting => "selecting",
            BatchState::AwaitingTransaction => "awaiting-transaction",
            BatchState::Printing => "printing",
            BatchState::Restoring => "restoring",
            BatchState::Done => "done",
            BatchState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_default_to_empty() {
        let overrides = DriverOverrides::default();
        assert!(overrides.is_empty());
        assert!(!DriverOverrides {
            duplex: Some(DuplexMode::Simplex),
            ..Default::default()
        }
        .is_empty());
        assert!(!DriverOverrides {
            color: Some(ColorMode::Monochrome),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn display_labels_match_cli_spellings() {
        assert_eq!(DuplexMode::LongEdge.to_string(), "long-edge");
        assert_eq!(DuplexMode::ShortEdge.to_string(), "short-edge");
        assert_eq!(DuplexMode::Simplex.to_string(), "simplex");
        assert_eq!(ColorMode::Monochrome.to_string(), "mono");
        assert_eq!(ColorMode::Color.to_string(), "color");
    }
}
