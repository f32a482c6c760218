// ============================================================================
// treescan.rs — Quick mode: dump a source tree straight to CMake
// ============================================================================
//
// No Autotools input is consulted here. Every directory becomes a static
// library built from whatever sources it contains, with Qt moc headers
// split out and wrapped.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::diag::Diagnostics;
use crate::error::ConvertError;
use crate::generator::GenerationPlan;
use crate::lexutil::{is_header_file, is_resource_file, is_source_file};
use crate::model::Settings;

/// Scans the working directory (recursively when configured so) and plans a
/// CMakeLists.txt for every visited directory.
pub fn scan(settings: &Settings, diags: &mut Diagnostics) -> Result<GenerationPlan, ConvertError> {
    let root = settings.working_directory.clone();
    let max_depth = if settings.recursive { usize::MAX } else { 0 };

    let mut directories: Vec<PathBuf> = Vec::new();
    let walker = WalkDir::new(&root)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| !e.path().to_string_lossy().contains(".git"));
    for entry in walker {
        let entry = entry.map_err(|e| ConvertError::Io(e.into()))?;
        if entry.file_type().is_dir() && !settings.is_excluded(entry.path()) {
            directories.push(entry.into_path());
        }
    }
    directories.sort();

    let mut plan = GenerationPlan::default();
    let mut modules: Vec<String> = Vec::new();
    for directory in &directories {
        diags.note(format!("Converting: {}", directory.display()));
        let children: Vec<String> = if settings.recursive {
            let mut names: Vec<String> = directories
                .iter()
                .filter(|d| d.parent() == Some(directory.as_path()))
                .filter_map(|d| d.file_name().and_then(|n| n.to_str()).map(String::from))
                .collect();
            names.sort();
            names
        } else {
            Vec::new()
        };
        let (content, module) = emit_directory(directory, &root, &children, settings, diags)?;
        if *directory != root {
            modules.push(module);
        }
        plan.files.insert(directory.join("CMakeLists.txt"), content);
    }

    // The root target links against every module found below it.
    if !modules.is_empty() {
        if let Some(root_content) = plan.files.get_mut(&root.join("CMakeLists.txt")) {
            modules.sort();
            root_content.push_str("\ntarget_link_libraries (${project}\n");
            for module in &modules {
                root_content.push_str(&format!("    {}\n", module));
            }
            root_content.push_str(")\n");
        }
    }

    Ok(plan)
}

/// One directory's CMakeLists.txt content plus its module name. The module
/// name is the path relative to the scan root with separators flattened to
/// underscores; the root itself falls back to its base name.
fn emit_directory(
    directory: &Path,
    root: &Path,
    children: &[String],
    settings: &Settings,
    diags: &mut Diagnostics,
) -> Result<(String, String), ConvertError> {
    let module = directory
        .strip_prefix(root)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(|rel| rel.to_string_lossy().replace(['/', '\\'], "_"))
        .or_else(|| {
            directory
                .file_name()
                .and_then(|n| n.to_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "project".to_string());

    let mut sources: Vec<String> = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut resources: Vec<String> = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if is_source_file(&name) {
            sources.push(name);
        } else if is_header_file(&name) {
            headers.push(name);
        } else if is_resource_file(&name) {
            resources.push(name);
        }
    }
    sources.sort();
    headers.sort();
    resources.sort();

    let mut moc_headers: Vec<String> = Vec::new();
    let mut plain_headers: Vec<String> = Vec::new();
    for header in headers {
        if is_moc_header(&directory.join(&header), diags) {
            moc_headers.push(header);
        } else {
            plain_headers.push(header);
        }
    }

    let mut out = String::new();
    out.push_str("cmake_minimum_required(VERSION 2.8)\n");
    out.push_str(&format!("set (project {})\n\n", module));

    if !sources.is_empty() {
        out.push_str("set(${project}_SOURCES\n");
        for file in &sources {
            out.push_str(&format!("    ${{CMAKE_CURRENT_SOURCE_DIR}}/{}\n", file));
        }
        out.push_str(")\n\n");
    }
    if !plain_headers.is_empty() {
        out.push_str("set(${project}_HEADERS\n");
        for file in &plain_headers {
            out.push_str(&format!("    ${{CMAKE_CURRENT_SOURCE_DIR}}/{}\n", file));
        }
        out.push_str(")\n\n");
    }
    if !moc_headers.is_empty() {
        out.push_str("set(${project}_MOC_HEADERS\n");
        for file in &moc_headers {
            out.push_str(&format!("    ${{CMAKE_CURRENT_SOURCE_DIR}}/{}\n", file));
        }
        out.push_str(")\n\n");
    }
    if !resources.is_empty() {
        out.push_str("set(${project}_RESOURCES\n");
        for file in &resources {
            out.push_str(&format!("    ${{CMAKE_CURRENT_SOURCE_DIR}}/{}\n", file));
        }
        out.push_str(")\n\n");
    }

    for child in children {
        out.push_str(&format!("add_subdirectory({})\n", child));
    }

    if !moc_headers.is_empty() {
        if settings.cmake_automoc {
            out.push_str("set(CMAKE_INCLUDE_CURRENT_DIR ON)\n");
            out.push_str("set(CMAKE_AUTOMOC ON)\n");
        } else {
            out.push_str("qt_wrap_cpp(${project}_MOC_SOURCES ${${project}_MOC_HEADERS})\n");
        }
    }

    if !sources.is_empty() || !plain_headers.is_empty() || !moc_headers.is_empty() {
        out.push_str("add_library(${project} STATIC ");
        if !sources.is_empty() {
            out.push_str("${${project}_SOURCES} ");
        }
        if !plain_headers.is_empty() {
            out.push_str("${${project}_HEADERS} ");
        }
        if !moc_headers.is_empty() {
            if settings.cmake_automoc {
                out.push_str("${${project}_MOC_HEADERS}");
            } else {
                out.push_str("${${project}_MOC_SOURCES} ");
            }
        }
        out.push_str(")\n");
    }

    Ok((out, module))
}

/// A header is a moc header when some line of it is exactly `Q_OBJECT`.
/// Unreadable headers are treated as plain ones.
fn is_moc_header(path: &Path, diags: &mut Diagnostics) -> bool {
    match fs::read_to_string(path) {
        Ok(content) => content.lines().any(|line| line.trim() == "Q_OBJECT"),
        Err(_) => {
            diags.warn(format!("Cannot read header {}", path.display()));
            false
        }
    }
}
