// ============================================================================
// main.rs — am2cmake CLI entry point
// ============================================================================

use std::process;

use clap::Parser;
use colored::Colorize;

use am2cmake::{convert, ConvertOptions};

fn main() {
    let options = ConvertOptions::parse();
    let settings = options.into_settings();
    let quiet = settings.quiet;

    match convert(settings) {
        Ok(report) => {
            if !quiet {
                println!();
                println!("Generated {} file(s):", report.files_written.len());
                for file in &report.files_written {
                    println!("  {}", file.display());
                }
                if !report.warnings.is_empty() {
                    println!(
                        "{}",
                        format!(
                            "{} warning(s); search the generated files for \"Fix manually\"",
                            report.warnings.len()
                        )
                        .yellow()
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red(), e);
            process::exit(e.exit_code());
        }
    }
}
