use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use pdfbatch_printing::{
    ColorMode, DriverOverrides, DuplexMode, PageSelection, DEFAULT_RESTORE_DELAY,
};
use pdfbatch_select::SelectOptions;
use pdfbatch_sumatra::DEFAULT_JOB_TIMEOUT;

mod batch;
mod exit_codes;

use batch::{run_batch, BatchConfig, BatchError, BatchSummary};

#[cfg(target_os = "windows")]
use pdfbatch_printing::windows::WindowsPrinterConfig as PlatformPrinterConfig;
#[cfg(not(target_os = "windows"))]
use pdfbatch_printing::UnsupportedPrinterConfig as PlatformPrinterConfig;

#[derive(Parser)]
#[command(
    name = "pdfbatch",
    about = "Prints every PDF in a folder through SumatraPDF silent printing",
    author,
    version
)]
struct Cli {
    /// 要列印的 PDF 資料夾。 / Folder containing the PDFs to print.
    #[arg(value_name = "FOLDER")]
    folder: PathBuf,

    /// 包含子資料夾。 / Include subdirectories.
    #[arg(long)]
    recursive: bool,

    /// 印表機名稱；預設使用系統預設印表機。 / Printer name; defaults to the system default printer.
    #[arg(long, value_name = "NAME")]
    printer: Option<String>,

    /// SumatraPDF.exe 路徑；省略時搜尋 PATH 與常見安裝位置。 / Path to SumatraPDF.exe; searched on PATH and known install locations when omitted.
    #[arg(long, value_name = "PATH")]
    sumatra: Option<PathBuf>,

    /// 這批文件的雙面列印模式。 / Duplex mode for the batch.
    #[arg(long, value_enum, default_value_t = DuplexChoice::Default)]
    duplex: DuplexChoice,

    /// 這批文件的色彩模式。 / Colour mode for the batch.
    #[arg(long, value_enum, default_value_t = ColorChoice::Default)]
    color: ColorChoice,

    /// 頁面選擇，例如 "1-3,5,7-"（1 起算）。 / Page selection such as "1-3,5,7-" (1-based).
    #[arg(long, value_name = "EXPR")]
    pages: Option<String>,

    /// 每份文件的列印份數。 / Copies per document.
    #[arg(long, value_name = "N", default_value_t = 1)]
    copies: u32,

    /// 只列印檔名符合此 glob 的檔案（可重複）。 / Only print files whose name matches this glob (repeatable).
    #[arg(long = "filter", value_name = "GLOB")]
    filter: Vec<String>,

    /// 排除檔名符合此 glob 的檔案（可重複）。 / Exclude files whose name matches this glob (repeatable).
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// 反轉列印順序。 / Print in reverse order.
    #[arg(long)]
    reverse: bool,

    /// 只顯示將執行的動作，不啟動任何程式。 / Show what would run without invoking anything.
    #[arg(long)]
    dry_run: bool,

    /// 還原驅動預設值前的等待秒數。 / Seconds to wait before restoring the driver defaults.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_RESTORE_DELAY.as_secs_f64())]
    restore_delay: f64,

    /// 單一檔案列印的逾時秒數。 / Timeout in seconds for a single invocation.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_JOB_TIMEOUT.as_secs_f64())]
    timeout: f64,

    /// 以 JSON 輸出計畫與結果摘要。 / Emit the plan and summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DuplexChoice {
    /// Keep the printer's current duplex default.
    Default,
    Simplex,
    /// Two-sided along the long edge; `duplex` is accepted as a spelling.
    #[value(name = "long-edge", alias = "duplex")]
    LongEdge,
    /// Two-sided along the short edge; `tumble` is accepted as a spelling.
    #[value(name = "short-edge", alias = "tumble")]
    ShortEdge,
}

impl From<DuplexChoice> for Option<DuplexMode> {
    fn from(choice: DuplexChoice) -> Self {
        match choice {
            DuplexChoice::Default => None,
            DuplexChoice::Simplex => Some(DuplexMode::Simplex),
            DuplexChoice::LongEdge => Some(DuplexMode::LongEdge),
            DuplexChoice::ShortEdge => Some(DuplexMode::ShortEdge),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorChoice {
    /// Keep the printer's current colour default.
    Default,
    Color,
    #[value(name = "mono", alias = "monochrome")]
    Mono,
}

impl From<ColorChoice> for Option<ColorMode> {
    fn from(choice: ColorChoice) -> Self {
        match choice {
            ColorChoice::Default => None,
            ColorChoice::Color => Some(ColorMode::Color),
            ColorChoice::Mono => Some(ColorMode::Monochrome),
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_codes::INVALID_INPUT)
        }
    }
}

fn run() -> Result<u8> {
    let cli = Cli::parse();

    if !cli.folder.is_dir() {
        bail!("folder does not exist: {}", cli.folder.display());
    }
    if cli.copies == 0 {
        bail!("--copies must be at least 1");
    }
    let pages = match cli.pages.as_deref() {
        Some(expr) => PageSelection::parse(expr)
            .with_context(|| format!("invalid --pages expression `{expr}`"))?,
        None => PageSelection::All,
    };
    let printer = resolve_printer(cli.printer.clone())?;

    let config = BatchConfig {
        folder: cli.folder.clone(),
        printer,
        sumatra: cli.sumatra.clone(),
        overrides: DriverOverrides {
            duplex: cli.duplex.into(),
            color: cli.color.into(),
        },
        pages,
        copies: cli.copies,
        select: SelectOptions {
            recursive: cli.recursive,
            include: cli.filter.clone(),
            exclude: cli.exclude.clone(),
            reverse: cli.reverse,
        },
        dry_run: cli.dry_run,
        restore_delay: Duration::from_secs_f64(cli.restore_delay.max(0.0)),
        job_timeout: Duration::from_secs_f64(cli.timeout.max(0.001)),
        quiet: cli.json,
    };

    let driver = PlatformPrinterConfig::default();
    let summary = match run_batch(&config, &driver) {
        Ok(summary) => summary,
        Err(err) => return Ok(report_batch_error(&err)),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_outcome(&summary);
    }

    Ok(if summary.failed_count() > 0 {
        exit_codes::PRINT_FAILURES
    } else if summary.restore_warning.is_some() {
        exit_codes::RESTORE_FAILED
    } else {
        exit_codes::SUCCESS
    })
}

fn resolve_printer(requested: Option<String>) -> Result<String> {
    if let Some(name) = requested {
        return Ok(name);
    }
    #[cfg(target_os = "windows")]
    {
        pdfbatch_printing::windows::default_printer()
            .context("could not determine the default printer; pass --printer NAME")
    }
    #[cfg(not(target_os = "windows"))]
    {
        bail!("no default-printer lookup on this platform; pass --printer NAME")
    }
}

fn report_batch_error(err: &BatchError) -> u8 {
    eprintln!("Error: {err}");
    match err {
        BatchError::NoFilesFound(_) => exit_codes::NO_FILES,
        BatchError::ToolNotFound => exit_codes::TOOL_NOT_FOUND,
        BatchError::Driver(_) => exit_codes::DRIVER_SETTINGS,
        BatchError::Select(_) => exit_codes::INVALID_INPUT,
    }
}

fn print_outcome(summary: &BatchSummary) {
    println!();
    if summary.dry_run {
        println!(
            "Dry run only; {} file(s) would be printed.",
            summary.jobs.len()
        );
        return;
    }
    let failed = summary.failed_count();
    let spooled = summary.spooled_count();
    if failed == 0 {
        println!("Done. {spooled} file(s) handed to the spooler.");
    } else {
        println!("Done with errors: {spooled} spooled, {failed} failed.");
    }
    if summary.restore_warning.is_some() {
        println!("Printer defaults may still be altered; see the warning above.");
    }
}
