//! Batch orchestration: file selection, the driver-defaults bracket, the
//! per-file print loop, and the final summary.
//! 批次流程：選檔、驅動預設值括號、逐檔列印迴圈與結果摘要。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

use pdfbatch_printing::{
    BatchState, DriverError, DriverGuard, DriverOverrides, PageSelection, PrintJobSpec,
    PrinterConfig,
};
use pdfbatch_select::{select_pdfs, SelectError, SelectOptions};
use pdfbatch_sumatra::{find_sumatra, print_settings, run_job, JobResult, JobStatus};

/// Errors that abort a batch before its summary.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no matching PDF files found in {0}")]
    NoFilesFound(PathBuf),
    #[error("SumatraPDF.exe not found; install SumatraPDF or pass --sumatra PATH")]
    ToolNotFound,
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Everything a batch run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub folder: PathBuf,
    pub printer: String,
    pub sumatra: Option<PathBuf>,
    pub overrides: DriverOverrides,
    pub pages: PageSelection,
    pub copies: u32,
    pub select: SelectOptions,
    pub dry_run: bool,
    pub restore_delay: Duration,
    pub job_timeout: Duration,
    /// Suppresses progress output; used by `--json`.
    pub quiet: bool,
}

/// Aggregated result of a batch run.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    #[serde(serialize_with = "state_label")]
    pub state: BatchState,
    pub printer: String,
    pub tool: PathBuf,
    pub dry_run: bool,
    pub jobs: Vec<JobResult>,
    pub restore_warning: Option<String>,
}

fn state_label<S: Serializer>(state: &BatchState, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(state)
}

impl BatchSummary {
    pub fn spooled_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| matches!(job.status, JobStatus::Spooled))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.jobs.iter().filter(|job| job.status.is_failure()).count()
    }
}

/// Runs the whole batch. The walk is `Idle → Selecting →
/// AwaitingTransaction → Printing → Restoring → Done`; every early return
/// is the `Failed` terminal. Once the driver bracket opened, restore runs
/// on every path out of the print loop, per-file failures included.
pub fn run_batch(
    config: &BatchConfig,
    driver: &dyn PrinterConfig,
) -> Result<BatchSummary, BatchError> {
    // Selecting.
    let files = select_pdfs(&config.folder, &config.select)?;
    if files.is_empty() {
        return Err(BatchError::NoFilesFound(config.folder.clone()));
    }

    // AwaitingTransaction. The viewer is located before any driver mutation
    // so a missing tool can never leave the defaults altered with nothing
    // printed.
    let tool = find_sumatra(config.sumatra.as_deref()).ok_or(BatchError::ToolNotFound)?;

    if !config.quiet {
        print_header(config, files.len(), &tool);
    }

    // A dry run previews the batch and must not touch the driver defaults.
    let guard = if config.dry_run {
        None
    } else {
        Some(DriverGuard::apply(driver, &config.printer, config.overrides)?)
    };

    // Printing.
    let total = files.len();
    let mut jobs = Vec::with_capacity(total);
    for (index, file) in files.into_iter().enumerate() {
        let job = PrintJobSpec {
            path: file,
            overrides: config.overrides,
            pages: config.pages.clone(),
            copies: config.copies,
        };
        let result = run_job(&tool, &config.printer, &job, config.job_timeout, config.dry_run);
        if !config.quiet {
            report_job(index + 1, total, &result);
        }
        jobs.push(result);
    }

    // Restoring. A failed restore is surfaced, not fatal: the documents are
    // already on their way to the printer.
    let mut restore_warning = None;
    if let Some(guard) = guard {
        if let Err(err) = guard.restore(config.restore_delay) {
            eprintln!("warning: printer defaults were not restored: {err}");
            restore_warning = Some(err.to_string());
        }
    }

    Ok(BatchSummary {
        state: BatchState::Done,
        printer: config.printer.clone(),
        tool,
        dry_run: config.dry_run,
        jobs,
        restore_warning,
    })
}

fn print_header(config: &BatchConfig, count: usize, tool: &Path) {
    let duplex = config
        .overrides
        .duplex
        .map(|mode| mode.to_string())
        .unwrap_or_else(|| "default".into());
    let color = config
        .overrides
        .color
        .map(|mode| mode.to_string())
        .unwrap_or_else(|| "default".into());
    let settings = print_settings(config.overrides, &config.pages, config.copies)
        .unwrap_or_else(|| "-".into());
    println!("Folder:   {}", config.folder.display());
    println!("Files:    {count}");
    println!("Printer:  {}", config.printer);
    println!("Viewer:   {}", tool.display());
    println!("Duplex:   {duplex}");
    println!("Color:    {color}");
    println!(
        "Pages:    {}",
        config.pages.directive().unwrap_or_else(|| "all".into())
    );
    println!("Copies:   {}", config.copies);
    println!("Settings: {settings}");
    println!("Dry run:  {}", if config.dry_run { "yes" } else { "no" });
    println!();
}

fn report_job(index: usize, total: usize, result: &JobResult) {
    let name = result
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.file.display().to_string());
    println!("[{index}/{total}] {name}");
    match &result.status {
        JobStatus::Spooled => println!("  -> handed to the print spooler"),
        JobStatus::SkippedDryRun => {
            println!("  -> would run: {}", result.command.display_line())
        }
        JobStatus::Failed { detail } => eprintln!("  !! {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    use pdfbatch_printing::{ColorMode, DriverDefaults, DuplexMode};

    struct RecordingConfig {
        defaults: RefCell<DriverDefaults>,
        writes: RefCell<Vec<DriverDefaults>>,
        fail_writes_after: Option<usize>,
    }

    impl RecordingConfig {
        fn new() -> Self {
            Self {
                defaults: RefCell::new(DriverDefaults {
                    duplex: DuplexMode::Simplex,
                    color: ColorMode::Color,
                }),
                writes: RefCell::new(Vec::new()),
                fail_writes_after: None,
            }
        }
    }

    impl PrinterConfig for RecordingConfig {
        fn read_defaults(&self, _printer: &str) -> Result<DriverDefaults, DriverError> {
            Ok(*self.defaults.borrow())
        }

        fn write_defaults(
            &self,
            printer: &str,
            defaults: DriverDefaults,
        ) -> Result<(), DriverError> {
            if let Some(limit) = self.fail_writes_after {
                if self.writes.borrow().len() >= limit {
                    return Err(DriverError::Write {
                        printer: printer.to_string(),
                        detail: "printer disconnected".into(),
                    });
                }
            }
            *self.defaults.borrow_mut() = defaults;
            self.writes.borrow_mut().push(defaults);
            Ok(())
        }
    }

    fn pdf_fixture(names: &[&str]) -> TempDir {
        let dir = tempdir().expect("tempdir");
        for name in names {
            fs::write(dir.path().join(name), b"%PDF-1.4\n").expect("fixture pdf");
        }
        dir
    }

    fn stub_tool(dir: &TempDir, executable: bool, script: &str) -> PathBuf {
        let tool = dir.path().join("SumatraPDF.exe");
        fs::write(&tool, script).expect("stub tool");
        if executable {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&tool, fs::Permissions::from_mode(0o755))
                    .expect("chmod stub tool");
            }
        }
        tool
    }

    fn base_config(folder: &Path, tool: &Path) -> BatchConfig {
        BatchConfig {
            folder: folder.to_path_buf(),
            printer: "Office Laser".into(),
            sumatra: Some(tool.to_path_buf()),
            overrides: DriverOverrides {
                duplex: Some(DuplexMode::LongEdge),
                color: Some(ColorMode::Monochrome),
            },
            pages: PageSelection::All,
            copies: 1,
            select: SelectOptions::default(),
            dry_run: false,
            restore_delay: Duration::ZERO,
            job_timeout: Duration::from_secs(5),
            quiet: true,
        }
    }

    #[test]
    fn empty_folder_is_a_clean_no_files_stop() {
        let dir = tempdir().expect("tempdir");
        let tool_dir = pdf_fixture(&[]);
        let tool = stub_tool(&tool_dir, false, "");
        let driver = RecordingConfig::new();
        let err = run_batch(&base_config(dir.path(), &tool), &driver)
            .expect_err("must stop without files");
        assert!(matches!(err, BatchError::NoFilesFound(_)));
        assert!(driver.writes.borrow().is_empty());
    }

    #[test]
    fn missing_tool_fails_before_any_driver_mutation() {
        let dir = pdf_fixture(&["a.pdf"]);
        let driver = RecordingConfig::new();
        let config = base_config(dir.path(), Path::new("/nonexistent/SumatraPDF.exe"));
        let err = run_batch(&config, &driver).expect_err("tool must be missing");
        assert!(matches!(err, BatchError::ToolNotFound));
        assert!(driver.writes.borrow().is_empty());
    }

    #[test]
    fn dry_run_spawns_nothing_and_skips_the_bracket() {
        let dir = pdf_fixture(&["a.pdf", "b.pdf"]);
        let tool = stub_tool(&dir, false, "");
        let driver = RecordingConfig::new();
        let mut config = base_config(dir.path(), &tool);
        config.dry_run = true;
        let summary = run_batch(&config, &driver).expect("dry run completes");
        assert!(summary.dry_run);
        assert_eq!(summary.jobs.len(), 2);
        assert!(summary
            .jobs
            .iter()
            .all(|job| matches!(job.status, JobStatus::SkippedDryRun)));
        assert!(driver.writes.borrow().is_empty());
    }

    #[test]
    fn per_file_failures_do_not_stop_the_batch_and_restore_still_runs() {
        let dir = pdf_fixture(&["a.pdf", "b.pdf", "c.pdf"]);
        // Not executable: every spawn fails, the loop must keep going.
        let tool = stub_tool(&dir, false, "plain file");
        let driver = RecordingConfig::new();
        let summary =
            run_batch(&base_config(dir.path(), &tool), &driver).expect("batch completes");
        assert_eq!(summary.failed_count(), 3);
        assert_eq!(summary.spooled_count(), 0);
        // Override write plus restore write: the bracket closed anyway.
        assert_eq!(driver.writes.borrow().len(), 2);
        assert!(summary.restore_warning.is_none());
        assert_eq!(
            *driver.defaults.borrow(),
            DriverDefaults {
                duplex: DuplexMode::Simplex,
                color: ColorMode::Color,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn successful_batch_spools_every_file_in_order() {
        let dir = pdf_fixture(&["b.pdf", "a.pdf"]);
        let tool = stub_tool(&dir, true, "#!/bin/sh\nexit 0\n");
        let driver = RecordingConfig::new();
        let summary =
            run_batch(&base_config(dir.path(), &tool), &driver).expect("batch completes");
        assert_eq!(summary.spooled_count(), 2);
        assert_eq!(summary.failed_count(), 0);
        let order: Vec<_> = summary
            .jobs
            .iter()
            .map(|job| job.file.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(order, vec!["a.pdf", "b.pdf"]);
    }

    #[cfg(unix)]
    #[test]
    fn one_bad_file_leaves_the_rest_of_the_batch_untouched() {
        let dir = pdf_fixture(&["a.pdf", "b.pdf", "c.pdf"]);
        // Fails only for b.pdf; the files after it must still be attempted.
        let tool = stub_tool(
            &dir,
            true,
            "#!/bin/sh\ncase \"$*\" in *b.pdf*) exit 1 ;; esac\nexit 0\n",
        );
        let driver = RecordingConfig::new();
        let summary =
            run_batch(&base_config(dir.path(), &tool), &driver).expect("batch completes");
        assert_eq!(summary.jobs.len(), 3);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.spooled_count(), 2);
        assert!(summary.jobs[1].status.is_failure());
        assert!(matches!(summary.jobs[2].status, JobStatus::Spooled));
    }

    #[cfg(unix)]
    #[test]
    fn failing_viewer_exit_code_lands_in_the_job_detail() {
        let dir = pdf_fixture(&["a.pdf"]);
        let tool = stub_tool(&dir, true, "#!/bin/sh\nexit 3\n");
        let driver = RecordingConfig::new();
        let summary =
            run_batch(&base_config(dir.path(), &tool), &driver).expect("batch completes");
        assert_eq!(summary.failed_count(), 1);
        match &summary.jobs[0].status {
            JobStatus::Failed { detail } => assert!(detail.contains("code 3")),
            status => panic!("unexpected status: {status:?}"),
        }
    }

    #[test]
    fn restore_failure_is_a_warning_not_an_error() {
        let dir = pdf_fixture(&["a.pdf"]);
        let tool = stub_tool(&dir, false, "plain file");
        let mut driver = RecordingConfig::new();
        driver.fail_writes_after = Some(1);
        let summary =
            run_batch(&base_config(dir.path(), &tool), &driver).expect("batch completes");
        assert!(summary.restore_warning.is_some());
        assert_eq!(driver.writes.borrow().len(), 1);
    }
}
