//! SumatraPDF integration: locating the viewer, building `-print-settings`
//! directives, and running one silent-print invocation per file.
//! SumatraPDF 整合：尋找檢視器、組合 -print-settings 設定字串，
//! 並對每個檔案執行一次靜默列印。

use std::borrow::Cow;
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pdfbatch_printing::{ColorMode, DriverOverrides, DuplexMode, PageSelection, PrintJobSpec};

/// Executable name of the viewer.
pub const TOOL_EXE: &str = "SumatraPDF.exe";

/// Default wait for a single invocation. Silent printing returns once the
/// job is spooled, so a viewer still alive after this long is stuck.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while invoking the viewer for one file.
/// 為單一檔案啟動檢視器時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("failed to spawn `{program}`: {detail}")]
    Spawn { program: String, detail: String },
    #[error("failed to poll the viewer process: {0}")]
    Poll(String),
    #[error("failed to collect viewer output: {0}")]
    Output(String),
    #[error("failed to terminate the viewer: {0}")]
    Kill(String),
}

/// Locates `SumatraPDF.exe`: an explicit path wins, then a `PATH` scan for
/// the given name, then the usual install locations.
/// 依序尋找 SumatraPDF.exe：明確路徑、PATH、常見安裝位置。
pub fn find_sumatra(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        return search_path(path.as_os_str());
    }
    search_path(OsStr::new(TOOL_EXE)).or_else(install_candidates)
}

fn search_path(name: &OsStr) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn install_candidates() -> Option<PathBuf> {
    ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"]
        .iter()
        .filter_map(|var| env::var_os(var))
        .map(|root| PathBuf::from(root).join("SumatraPDF").join(TOOL_EXE))
        .find(|candidate| candidate.is_file())
}

/// Builds the `-print-settings` directive: serialized page list, duplex and
/// colour tokens, and an `{n}x` copy count when more than one copy is
/// requested. `None` when every field is left at the viewer default.
pub fn print_settings(
    overrides: DriverOverrides,
    pages: &PageSelection,
    copies: u32,
) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(list) = pages.directive() {
        parts.push(list);
    }
    if let Some(duplex) = overrides.duplex {
        parts.push(duplex_token(duplex).to_string());
    }
    if let Some(color) = overrides.color {
        parts.push(color_token(color).to_string());
    }
    if copies > 1 {
        parts.push(format!("{copies}x"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}

fn duplex_token(mode: DuplexMode) -> &'static str {
    match mode {
        DuplexMode::Simplex => "simplex",
        DuplexMode::LongEdge => "duplexlong",
        DuplexMode::ShortEdge => "duplexshort",
    }
}

fn color_token(mode: ColorMode) -> &'static str {
    match mode {
        ColorMode::Color => "color",
        ColorMode::Monochrome => "monochrome",
    }
}

/// One fully-assembled viewer invocation, serializable so a dry run can
/// emit the exact plan.
/// 組裝完成的檢視器呼叫；可序列化，dry run 時輸出完整計畫。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PrintCommand {
    /// Assembles the silent-print invocation for one file.
    pub fn for_job(tool: &Path, printer: &str, settings: Option<&str>, file: &Path) -> Self {
        let mut args = vec![
            "-print-to".to_string(),
            printer.to_string(),
            "-silent".to_string(),
            "-exit-on-print".to_string(),
        ];
        if let Some(settings) = settings {
            args.push("-print-settings".to_string());
            args.push(settings.to_string());
        }
        args.push(file.display().to_string());
        Self {
            program: tool.to_path_buf(),
            args,
        }
    }

    /// Rendered command line for logs and dry-run output.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Result of one blocking invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolOutcome {
    pub exit_code: Option<i32>,
    pub stderr: Vec<u8>,
    pub duration_ms: u128,
    pub timed_out: bool,
}

impl SpoolOutcome {
    /// True when the viewer exited with code `0` inside the timeout.
    pub fn success(&self) -> bool {
        !self.timed_out && matches!(self.exit_code, Some(0))
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Runs the invocation and blocks until the viewer exits or `timeout`
/// elapses; a timed-out viewer is killed.
/// 執行呼叫並等待檢視器結束；逾時即強制終止。
pub fn spool(command: &PrintCommand, timeout: Duration) -> Result<SpoolOutcome, SpoolError> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| SpoolError::Spawn {
            program: command.program.display().to_string(),
            detail: err.to_string(),
        })?;

    let start = Instant::now();
    let mut timed_out = false;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) => {}
            Err(err) => return Err(SpoolError::Poll(err.to_string())),
        }
        if start.elapsed() >= timeout {
            child.kill().map_err(|err| SpoolError::Kill(err.to_string()))?;
            timed_out = true;
            break;
        }
        thread::sleep(Duration::from_millis(25));
    }

    let output = child
        .wait_with_output()
        .map_err(|err| SpoolError::Output(err.to_string()))?;
    Ok(SpoolOutcome {
        exit_code: output.status.code(),
        stderr: output.stderr,
        duration_ms: start.elapsed().as_millis(),
        timed_out,
    })
}

/// Per-file outcome recorded by the runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// Handed to the print spooler.
    Spooled,
    /// Dry run: nothing was invoked.
    SkippedDryRun,
    /// The viewer failed, timed out, or could not be started.
    Failed { detail: String },
}

impl JobStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed { .. })
    }
}

/// Result of one job: the exact command together with what became of it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResult {
    pub file: PathBuf,
    pub command: PrintCommand,
    pub status: JobStatus,
}

/// Runs one job: builds the settings directive and invokes the viewer, or
/// records the planned invocation untouched in dry-run mode. Invocation
/// failures land in the result; they never abort the surrounding batch.
pub fn run_job(
    tool: &Path,
    printer: &str,
    job: &PrintJobSpec,
    timeout: Duration,
    dry_run: bool,
) -> JobResult {
    let settings = print_settings(job.overrides, &job.pages, job.copies);
    let command = PrintCommand::for_job(tool, printer, settings.as_deref(), &job.path);

    if dry_run {
        return JobResult {
            file: job.path.clone(),
            command,
            status: JobStatus::SkippedDryRun,
        };
    }

    let status = match spool(&command, timeout) {
        Ok(outcome) if outcome.success() => JobStatus::Spooled,
        Ok(outcome) if outcome.timed_out => JobStatus::Failed {
            detail: format!("viewer timed out after {} ms", outcome.duration_ms),
        },
        Ok(outcome) => JobStatus::Failed {
            detail: exit_detail(&outcome),
        },
        Err(err) => JobStatus::Failed {
            detail: err.to_string(),
        },
    };
    JobResult {
        file: job.path.clone(),
        command,
        status,
    }
}

fn exit_detail(outcome: &SpoolOutcome) -> String {
    let code = outcome
        .exit_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "signal".to_string());
    let stderr = outcome.stderr_text();
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("viewer exited with code {code}")
    } else {
        format!("viewer exited with code {code}: {stderr}")
    }
}
