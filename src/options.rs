// ============================================================================
// options.rs — Command-line arguments (CLI)
// ============================================================================

use clap::Parser;
use std::path::PathBuf;

use crate::model::Settings;

#[derive(Parser, Debug)]
#[command(name = "am2cmake")]
#[command(about = "am2cmake - converts Autotools projects (configure.ac + Makefile.am) to CMake", long_about = None)]
pub struct ConvertOptions {
    /// Project directory to convert (default: current directory)
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Colon-separated list of directory prefixes to skip
    #[arg(short = 'e', long = "exclude", value_name = "DIRS")]
    pub exclude: Option<String>,

    /// Quick mode: skip Autotools parsing, dump the source tree directly
    #[arg(short = 'q', long = "quick")]
    pub quick: bool,

    /// Recurse into subdirectories (quick and fallback modes)
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Use CMake AUTOMOC instead of manual qt source wrapping
    #[arg(short = 'a', long = "automoc")]
    pub automoc: bool,

    /// Do not write explanatory comments into the generated files
    #[arg(long = "no-comments")]
    pub no_comments: bool,

    /// Do not write extra blank lines into the generated files
    #[arg(long = "no-newlines")]
    pub no_newlines: bool,

    /// Quiet mode: suppress warnings on the console (they are still counted)
    #[arg(long)]
    pub quiet: bool,
}

impl ConvertOptions {
    /// Turns the raw arguments into run settings. The exclude list is split
    /// on `:` the way PATH-style variables are.
    pub fn into_settings(self) -> Settings {
        let working_directory = self
            .directory
            .unwrap_or_else(|| PathBuf::from("."));
        let exclude_directories = self
            .exclude
            .map(|e| {
                e.split(':')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Settings {
            working_directory,
            exclude_directories,
            quick: self.quick,
            recursive: self.recursive,
            cmake_automoc: self.automoc,
            generate_comments: !self.no_comments,
            more_newlines: !self.no_newlines,
            quiet: self.quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ConvertOptions::parse_from(["am2cmake"]);
        let settings = opts.into_settings();
        assert_eq!(settings.working_directory, PathBuf::from("."));
        assert!(settings.exclude_directories.is_empty());
        assert!(!settings.quick);
        assert!(settings.generate_comments);
        assert!(settings.more_newlines);
    }

    #[test]
    fn test_exclude_list_splits_on_colon() {
        let opts =
            ConvertOptions::parse_from(["am2cmake", "-e", "vendor:third_party", "-d", "/tmp/p"]);
        let settings = opts.into_settings();
        assert_eq!(settings.working_directory, PathBuf::from("/tmp/p"));
        assert_eq!(
            settings.exclude_directories,
            vec!["vendor".to_string(), "third_party".to_string()]
        );
    }

    #[test]
    fn test_flags() {
        let opts = ConvertOptions::parse_from([
            "am2cmake",
            "-q",
            "-r",
            "-a",
            "--no-comments",
            "--no-newlines",
        ]);
        let settings = opts.into_settings();
        assert!(settings.quick);
        assert!(settings.recursive);
        assert!(settings.cmake_automoc);
        assert!(!settings.generate_comments);
        assert!(!settings.more_newlines);
    }
}
