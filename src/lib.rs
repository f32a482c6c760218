// ============================================================================
// lib.rs — Library API (conversion driver)
// ============================================================================

pub mod configure;
pub mod diag;
pub mod error;
pub mod generator;
pub mod lexutil;
pub mod makefile;
pub mod model;
pub mod options;
pub mod treescan;

pub use error::ConvertError;
pub use generator::GenerationPlan;
pub use model::{Session, Settings};
pub use options::ConvertOptions;

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Outcome of a conversion run, for reporting.
#[derive(Debug)]
pub struct ConvertReport {
    pub files_written: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Converts the project in the configured working directory.
///
/// The full pipeline runs when a `configure.ac` is found: parse it and every
/// referenced `Makefile.am`, then emit CMakeLists.txt files from the
/// gathered model. Without one, a `*.pro` file means an (unimplemented)
/// qmake project; otherwise the run degrades to a plain source-tree dump.
/// Quick mode goes straight to the dump.
pub fn convert(settings: Settings) -> Result<ConvertReport, ConvertError> {
    let mut session = Session::new(settings);

    if session.settings.quick {
        let plan = treescan::scan(&session.settings, &mut session.diagnostics)?;
        return finish(plan, session);
    }

    let configure_ac = find_file("configure.ac", &session.settings.working_directory);
    let plan = match configure_ac {
        Some(path) => {
            configure::process_configure_ac(&mut session, &path)?;
            generator::generate(&mut session)
        }
        None => {
            if let Some(pro) = find_qmake_project(&session.settings.working_directory) {
                return Err(ConvertError::UnsupportedFormat(pro));
            }
            session.diagnostics.warn(format!(
                "{}/configure.ac not found. Performing {}recursive source dump in: {}",
                session.settings.working_directory.display(),
                if session.settings.recursive { "" } else { "non " },
                session.settings.working_directory.display()
            ));
            treescan::scan(&session.settings, &mut session.diagnostics)?
        }
    };
    finish(plan, session)
}

fn finish(plan: GenerationPlan, session: Session) -> Result<ConvertReport, ConvertError> {
    // Stale files from an earlier run go first, so nothing is ever appended
    // to old content. The top-level file is overwritten in place.
    let root_file = session.settings.working_directory.join("CMakeLists.txt");
    for path in plan.files.keys() {
        if *path != root_file && path.is_file() {
            fs::remove_file(path)?;
        }
    }
    let mut files_written = Vec::new();
    for (path, content) in &plan.files {
        fs::write(path, content)?;
        files_written.push(path.clone());
    }
    Ok(ConvertReport {
        files_written,
        warnings: session.diagnostics.warnings().to_vec(),
    })
}

/// First file with the given name anywhere under `directory`.
fn find_file(name: &str, directory: &Path) -> Option<PathBuf> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name() == std::ffi::OsStr::new(name))
        .map(|e| e.into_path())
}

/// A `*.pro` file directly in the working directory marks a qmake project.
fn find_qmake_project(directory: &Path) -> Option<PathBuf> {
    let pattern = format!("{}/*.pro", directory.display());
    glob::glob(&pattern)
        .ok()?
        .filter_map(Result::ok)
        .next()
}
