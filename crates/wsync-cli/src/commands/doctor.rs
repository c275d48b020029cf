//! Doctor command implementation

use std::path::Path;

use colored::Colorize;

use wsync_core::{
    CheckItem, CheckStatus, Doctor, DoctorOptions, DoctorReport, SyncContext, SyncOptions,
};

use crate::error::Result;

/// Run the doctor command and print its report.
///
/// Returns the process exit status: 0 when nothing failed.
pub async fn run_doctor(
    path: &Path,
    options: SyncOptions,
    doctor: DoctorOptions,
) -> Result<i32> {
    println!("{} Checking workspaces...", "=>".blue().bold());

    let ctx = SyncContext::new(path, options)?;
    let report = Doctor::new(&ctx, doctor).run().await?;
    print_report(&report, doctor);
    Ok(report.exit_code())
}

fn marker(status: CheckStatus) -> colored::ColoredString {
    match status {
        CheckStatus::Passed => "OK".green().bold(),
        CheckStatus::Fixed => "FIXED".cyan().bold(),
        CheckStatus::Failed => "FAILED".red().bold(),
        CheckStatus::Advisory => "NOTE".yellow().bold(),
    }
}

fn print_item(item: &CheckItem) {
    match &item.detail {
        Some(detail) => println!(
            "   {} {} {}: {}",
            marker(item.status),
            item.subject.cyan(),
            item.kind.as_str().dimmed(),
            detail
        ),
        None => println!(
            "   {} {} {}",
            marker(item.status),
            item.subject.cyan(),
            item.kind.as_str().dimmed()
        ),
    }
}

fn print_report(report: &DoctorReport, options: DoctorOptions) {
    for item in &report.items {
        print_item(item);
    }
    println!();

    if !report.root_manifest_found {
        println!(
            "{} No root package.json found. Run wsync from the project root or pass {}.",
            "FAILED".red().bold(),
            "--root".cyan()
        );
        return;
    }

    let failed = report.count(CheckStatus::Failed);
    let fixed = report.count(CheckStatus::Fixed);
    if failed == 0 {
        println!(
            "{} All checks passed ({} fixed).",
            "OK".green().bold(),
            fixed
        );
    } else {
        println!("{} {} check(s) failed.", "FAILED".red().bold(), failed);
        if !options.fix {
            println!("Run {} to repair.", "wsync doctor --fix".cyan());
        }
    }
}
