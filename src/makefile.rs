// ============================================================================
// makefile.rs — Parser for per-directory Makefile.am files
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::lexutil;
use crate::model::{Session, Target, TargetKind};

/// Parses one Makefile.am from disk. A missing or unreadable file is a
/// diagnostic, never an abort: the referenced directory is simply skipped.
pub fn process_makefile_am(session: &mut Session, path: &Path) {
    if !path.is_file() {
        session
            .diagnostics
            .warn(format!("File not found: {}", path.display()));
        return;
    }
    let directory = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    if session.should_exclude(&directory) {
        return;
    }
    match fs::read_to_string(path) {
        Ok(content) => process_makefile_content(session, &content, &directory),
        Err(e) => session
            .diagnostics
            .warn(format!("Cannot read {}: {}", path.display(), e)),
    }
}

/// Parses one directory's Makefile.am content in two passes: target
/// discovery first, then attribute gathering with single-level condition
/// tracking and a final `$(name)` indirection resolution.
pub fn process_makefile_content(session: &mut Session, content: &str, directory: &Path) {
    discover_targets(session, content, directory);
    gather_attributes(session, content, directory);
}

/// Pass 1: any non-comment line mentioning `_LIBRARIES` or `_PROGRAMS`
/// declares targets. Duplicate canonical names merge into the first sighting.
fn discover_targets(session: &mut Session, content: &str, directory: &Path) {
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if !line.contains("_LIBRARIES") && !line.contains("_PROGRAMS") {
            continue;
        }
        let elements: Vec<&str> = line.split_whitespace().collect();
        if elements.len() < 3 {
            continue;
        }
        let kind = if line.contains("_PROGRAMS") {
            TargetKind::Program
        } else {
            TargetKind::Library
        };
        for raw_name in &elements[2..] {
            let target = Target::new(raw_name, directory, kind);
            if !session.has_target(&target.canonic_name) {
                session.targets.push(target);
            }
        }
    }
}

/// Pass 2: assignment dispatch by variable-name suffix, with backslash
/// continuation joining and `if`/`endif` condition tracking. Only one
/// condition level is modeled; a nested `if` is reported and replaces the
/// outer condition rather than being combined with it.
fn gather_attributes(session: &mut Session, content: &str, directory: &Path) {
    let lines: Vec<&str> = content.lines().collect();
    let mut if_condition = String::new();
    let mut defined_variables: BTreeMap<String, Vec<(String, Vec<String>)>> = BTreeMap::new();
    let mut targets_in_file: BTreeSet<String> = BTreeSet::new();
    let mut subdirs_line = String::new();

    let mut i = 0;
    while i < lines.len() {
        let mut line = lines[i].trim().to_string();
        i += 1;
        if line.starts_with('#') {
            continue;
        }
        if line == "if" || line.starts_with("if ") || line.starts_with("if\t") {
            let elements: Vec<&str> = line.split_whitespace().collect();
            if elements.len() > 1 {
                if !if_condition.is_empty() {
                    session.diagnostics.warn(format!(
                        "Nested condition '{}' inside '{}' in {} is not modeled, \
                         the outer condition is dropped",
                        elements[1],
                        if_condition,
                        directory.display()
                    ));
                }
                if_condition = elements[1].to_string();
            }
            continue;
        }
        if line.starts_with("endif") {
            if_condition.clear();
            continue;
        }
        if !line.contains('=') {
            continue;
        }

        // Join backslash-continued lines into one logical line.
        while line.ends_with('\\') && i < lines.len() {
            line.pop();
            line.push(' ');
            line.push_str(lines[i].trim());
            i += 1;
        }
        let line = line.replace('\\', "");

        let Some((raw_variable, raw_value)) = line.split_once('=') else {
            continue;
        };
        let mut variable = raw_variable.trim().to_string();
        let is_append = variable.ends_with('+');
        if is_append {
            variable.pop();
            variable = variable.trim().to_string();
        }
        let value = raw_value.trim();
        let tokens: Vec<String> = value.split_whitespace().map(String::from).collect();

        let mut used = false;
        if let Some(stem) = variable.strip_suffix("_SOURCES") {
            if let Some(target) = session.target_mut(stem) {
                if !if_condition.is_empty() && !target.conditions.contains(&if_condition) {
                    target.conditions.push(if_condition.clone());
                }
                if is_append {
                    target.sources.extend(tokens.clone());
                } else {
                    target.sources = tokens.clone();
                }
                targets_in_file.insert(stem.to_string());
                used = true;
            }
        } else if let Some(stem) = variable.strip_suffix("_LDADD") {
            if let Some(target) = session.target_mut(stem) {
                if !if_condition.is_empty() && !target.conditions.contains(&if_condition) {
                    target.conditions.push(if_condition.clone());
                }
                if is_append {
                    target.link_libs.extend(tokens.clone());
                } else {
                    target.link_libs = tokens.clone();
                }
                targets_in_file.insert(stem.to_string());
                used = true;
            }
        } else if let Some(stem) = compiler_flag_stem(&variable) {
            if let Some(target) = session.target_mut(stem) {
                if !if_condition.is_empty() && !target.conditions.contains(&if_condition) {
                    target.conditions.push(if_condition.clone());
                }
                if !is_append {
                    target.compiler_flags.clear();
                }
                target.compiler_flags.push(value.to_string());
                targets_in_file.insert(stem.to_string());
                used = true;
            }
        } else if let Some(stem) = variable.strip_suffix("_LDFLAGS") {
            if let Some(target) = session.target_mut(stem) {
                if !if_condition.is_empty() && !target.conditions.contains(&if_condition) {
                    target.conditions.push(if_condition.clone());
                }
                if is_append {
                    target.linker_flags.extend(tokens.clone());
                } else {
                    target.linker_flags = tokens.clone();
                }
                targets_in_file.insert(stem.to_string());
                used = true;
            }
        }

        if !used {
            if variable == "SUBDIRS" {
                subdirs_line = value.to_string();
            } else if !variable.contains("_LIBRARIES") && !variable.contains("_PROGRAMS") {
                // Plain variable, likely referenced later via $(name).
                defined_variables
                    .entry(variable)
                    .or_default()
                    .push((if_condition.clone(), tokens));
            }
        }
    }

    resolve_indirections(session, &defined_variables, &targets_in_file);

    if !subdirs_line.is_empty() {
        let mut extra = String::new();
        for subdir in subdirs_line.split_whitespace() {
            let child = directory.join(subdir);
            if !session.should_exclude(&child) {
                extra.push_str(&format!("\nadd_subdirectory( {} )", subdir));
                session.required_directories.push(child);
            }
        }
        session
            .extra_content
            .insert(directory.to_path_buf(), extra);
    }
}

/// `_CXXFLAGS`, `_CPPFLAGS` and `_CFLAGS` all feed the same compiler flag
/// list on the target.
fn compiler_flag_stem(variable: &str) -> Option<&str> {
    variable
        .strip_suffix("_CXXFLAGS")
        .or_else(|| variable.strip_suffix("_CPPFLAGS"))
        .or_else(|| variable.strip_suffix("_CFLAGS"))
}

/// For every plain variable defined in this file, either fold its value
/// lists into the conditional source groups of the targets whose source
/// lists reference `$(name)`, or retain it as a named variable on the
/// target for flag/link indirection at generation time.
fn resolve_indirections(
    session: &mut Session,
    defined_variables: &BTreeMap<String, Vec<(String, Vec<String>)>>,
    targets_in_file: &BTreeSet<String>,
) {
    for (var_name, entries) in defined_variables {
        let needle = format!("$({})", var_name);
        for target_name in targets_in_file {
            let Some(target) = session.target_mut(target_name) else {
                continue;
            };
            let referenced = target.sources.iter().any(|f| f.contains(&needle));
            if referenced {
                for (condition, value) in entries {
                    let condition_name = lexutil::strip_garbage(condition);
                    target
                        .conditional_sources
                        .entry(condition_name)
                        .or_default()
                        .extend(value.iter().cloned());
                }
            } else {
                target.variables.insert(
                    var_name.clone(),
                    entries.iter().map(|(_, v)| v.clone()).collect(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkKind, Settings};
    use std::path::PathBuf;

    fn session() -> Session {
        Session::new(Settings {
            quiet: true,
            ..Settings::default()
        })
    }

    #[test]
    fn test_library_and_program_discovery() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\nbin_PROGRAMS = frob\n",
            Path::new("src"),
        );
        assert_eq!(s.targets.len(), 2);
        assert_eq!(s.targets[0].kind, TargetKind::Library);
        assert_eq!(s.targets[0].link, LinkKind::Static);
        assert_eq!(s.targets[1].kind, TargetKind::Program);
    }

    #[test]
    fn test_duplicate_declaration_merges() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\nnoinst_LIBRARIES += libx.a\n",
            Path::new("src"),
        );
        assert_eq!(s.targets.len(), 1);
    }

    #[test]
    fn test_sources_and_continuations() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\n\
             libx_a_SOURCES = a.c \\\n\
                 b.c c.c\n",
            Path::new("src"),
        );
        let t = &s.targets[0];
        assert_eq!(t.sources, vec!["a.c", "b.c", "c.c"]);
    }

    #[test]
    fn test_append_extends_sources() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\n\
             libx_a_SOURCES = a.c\n\
             libx_a_SOURCES += b.c\n",
            Path::new("src"),
        );
        assert_eq!(s.targets[0].sources, vec!["a.c", "b.c"]);
    }

    #[test]
    fn test_condition_tracking() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\n\
             if WITH_FOO\n\
             libx_a_SOURCES = a.c\n\
             endif\n",
            Path::new("src"),
        );
        assert_eq!(s.targets[0].conditions, vec!["WITH_FOO"]);
    }

    #[test]
    fn test_condition_cleared_by_endif() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a liby.a\n\
             if WITH_FOO\n\
             libx_a_SOURCES = a.c\n\
             endif\n\
             liby_a_SOURCES = y.c\n",
            Path::new("src"),
        );
        assert!(s.targets[1].conditions.is_empty());
    }

    #[test]
    fn test_nested_condition_is_flagged() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\n\
             if A\n\
             if B\n\
             libx_a_SOURCES = a.c\n\
             endif\n\
             endif\n",
            Path::new("src"),
        );
        assert_eq!(s.targets[0].conditions, vec!["B"]);
        assert!(s
            .diagnostics
            .warnings()
            .iter()
            .any(|w| w.contains("Nested condition")));
    }

    #[test]
    fn test_ldadd_and_flags() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "bin_PROGRAMS = frob\n\
             frob_SOURCES = main.c\n\
             frob_LDADD = libx.a -lz\n\
             frob_CFLAGS = -DFOO -I$(top_srcdir)/include\n\
             frob_LDFLAGS = -export-dynamic\n",
            Path::new("src"),
        );
        let t = &s.targets[0];
        assert_eq!(t.link_libs, vec!["libx.a", "-lz"]);
        assert_eq!(t.compiler_flags, vec!["-DFOO -I$(top_srcdir)/include"]);
        assert_eq!(t.linker_flags, vec!["-export-dynamic"]);
    }

    #[test]
    fn test_subdirs_recorded_and_required() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "SUBDIRS = sub other\nnoinst_LIBRARIES = libx.a\n",
            Path::new("top"),
        );
        let extra = &s.extra_content[&PathBuf::from("top")];
        assert!(extra.contains("add_subdirectory( sub )"));
        assert!(extra.contains("add_subdirectory( other )"));
        assert_eq!(
            s.required_directories,
            vec![PathBuf::from("top/sub"), PathBuf::from("top/other")]
        );
    }

    #[test]
    fn test_excluded_subdir_is_skipped() {
        let mut s = Session::new(Settings {
            quiet: true,
            exclude_directories: vec!["top/sub".to_string()],
            ..Settings::default()
        });
        process_makefile_content(&mut s, "SUBDIRS = sub keep\n", Path::new("top"));
        let extra = &s.extra_content[&PathBuf::from("top")];
        assert!(!extra.contains("add_subdirectory( sub )"));
        assert!(extra.contains("add_subdirectory( keep )"));
        assert_eq!(s.required_directories, vec![PathBuf::from("top/keep")]);
    }

    #[test]
    fn test_variable_indirection_into_conditional_sources() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\n\
             if WITH_EXTRA\n\
             extra_files = e1.c e2.c\n\
             endif\n\
             libx_a_SOURCES = a.c $(extra_files)\n",
            Path::new("src"),
        );
        let t = &s.targets[0];
        assert_eq!(
            t.conditional_sources["WITH_EXTRA"],
            vec!["e1.c".to_string(), "e2.c".to_string()]
        );
    }

    #[test]
    fn test_conditional_entries_merge_for_same_condition() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\n\
             if WITH_EXTRA\n\
             extra_files = e1.c\n\
             extra_files += e2.c\n\
             endif\n\
             libx_a_SOURCES = a.c $(extra_files)\n",
            Path::new("src"),
        );
        let t = &s.targets[0];
        assert_eq!(
            t.conditional_sources["WITH_EXTRA"],
            vec!["e1.c".to_string(), "e2.c".to_string()]
        );
    }

    #[test]
    fn test_unreferenced_variable_is_retained() {
        let mut s = session();
        process_makefile_content(
            &mut s,
            "noinst_LIBRARIES = libx.a\n\
             libx_a_SOURCES = a.c\n\
             helper_libs = ../z/libz.a\n",
            Path::new("src"),
        );
        let t = &s.targets[0];
        assert!(t.conditional_sources.is_empty());
        assert_eq!(t.variables["helper_libs"], vec![vec!["../z/libz.a".to_string()]]);
    }

    #[test]
    fn test_excluded_directory_gets_no_targets() {
        let mut s = Session::new(Settings {
            quiet: true,
            exclude_directories: vec!["vendor".to_string()],
            ..Settings::default()
        });
        // Driven through the disk-less entry point on an excluded directory:
        // discovery itself is reached only via process_makefile_am, which
        // checks the exclude set first.
        let dir = Path::new("vendor/zlib");
        assert!(s.should_exclude(dir));
        // No Makefile.am on disk for it either way.
        process_makefile_am(&mut s, &dir.join("Makefile.am"));
        assert!(s.targets.is_empty());
    }
}
