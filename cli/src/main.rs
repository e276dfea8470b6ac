//! sheetpipe CLI - streaming XLSX/CSV conversion tool
//!
//! Converts between XLSX workbooks and delimited text in either direction
//! with memory bounded by row width, not file size.

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sheetpipe::{csv_to_xlsx, xlsx_to_csv, ConvertStats};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Streaming conversion between XLSX workbooks and delimited text
#[derive(Parser)]
#[command(
    name = "sheetpipe",
    version,
    about = "Convert between XLSX and CSV",
    long_about = "sheetpipe - streaming XLSX/CSV conversion.\n\n\
                  Converts files of any size in bounded memory: worksheet rows are\n\
                  streamed straight from the archive and shared strings are resolved\n\
                  through a disk-backed index."
)]
struct Cli {
    /// Input file path
    #[arg(default_value = "./test.csv")]
    input: PathBuf,

    /// Output file path
    #[arg(default_value = "./output.xlsx")]
    output: PathBuf,

    /// Conversion direction
    #[arg(value_enum, default_value_t = Mode::CsvToXlsx)]
    mode: Mode,
}

/// Conversion direction
#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum Mode {
    /// Build an XLSX workbook from delimited text
    CsvToXlsx,
    /// Extract the first worksheet of a workbook to CSV
    XlsxToCsv,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => std::process::exit(0),
                _ => std::process::exit(1),
            }
        }
    };

    if !cli.input.exists() {
        eprintln!(
            "{}: input not found: {}",
            "error".red().bold(),
            cli.input.display()
        );
        std::process::exit(1);
    }

    let pb = create_spinner("Converting...");
    let started = Instant::now();

    let result = match cli.mode {
        Mode::CsvToXlsx => csv_to_xlsx(&cli.input, &cli.output),
        Mode::XlsxToCsv => xlsx_to_csv(&cli.input, &cli.output),
    };

    pb.finish_and_clear();
    let elapsed = started.elapsed();

    match result {
        Ok(stats) => {
            println!("{}", "SUCCESS".green().bold());
            print_report(&stats, elapsed);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            println!("{}", "FAILED".red().bold());
        }
    }
}

fn print_report(stats: &ConvertStats, elapsed: Duration) {
    println!("\n{}", "Conversion Report".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("{}: {}", "Rows".bold(), stats.rows);
    println!("{}: {}", "Cells".bold(), stats.cells);
    println!("{}: {:.3}s", "Elapsed".bold(), elapsed.as_secs_f64());
    match peak_rss_kb() {
        Some(kb) => println!("{}: {} KB", "Peak memory".bold(), kb),
        None => println!("{}: n/a", "Peak memory".bold()),
    }
}

/// Peak resident set size in kilobytes, from the kernel's accounting.
#[cfg(target_os = "linux")]
fn peak_rss_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmHWM:"))?;
    line.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(not(target_os = "linux"))]
fn peak_rss_kb() -> Option<u64> {
    None
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
