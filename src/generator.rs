// ============================================================================
// generator.rs — Emits the CMake project from the parsed build model
// ============================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::diag::Diagnostics;
use crate::lexutil::{escape_quotes, strip_garbage};
use crate::model::{BuildOption, Define, Session, Settings, Target, TargetKind};

/// Substitution passes before an indirect flag is declared unresolvable.
const MAX_SUBSTITUTION_PASSES: usize = 10;

/// The files to be written, keyed by full output path. Generation is a pure
/// function of the session registries; writing happens elsewhere.
#[derive(Debug, Default)]
pub struct GenerationPlan {
    pub files: BTreeMap<PathBuf, String>,
}

/// Walks the build model and the option/define registries and produces the
/// complete set of CMakeLists.txt contents: the root file, one file per
/// directory that holds targets or subdirectory references, and fallback
/// files for required directories that were never otherwise populated.
pub fn generate(session: &mut Session) -> GenerationPlan {
    for option in session.options.values_mut() {
        option.finalize();
    }
    session.outputs.clear();

    let Session {
        settings,
        options,
        defines,
        targets,
        config_variables,
        extra_content,
        required_directories,
        outputs,
        diagnostics,
        started_at,
    } = session;

    let mut root_content = generate_root(options, defines, settings, started_at);

    for target in targets.iter() {
        let body = emit_target(target, options, config_variables, diagnostics);
        let output = outputs.entry(target.directory.clone()).or_default();
        output.target_content.push(body);
        output.target_names.push(target.name.clone());
    }
    for (directory, extra) in extra_content.iter() {
        outputs.entry(directory.clone()).or_default().extra_content = extra.clone();
    }

    let mut plan = GenerationPlan::default();
    let root_dir = settings.working_directory.clone();
    for (directory, output) in outputs.iter() {
        let mut content = String::new();
        content.push_str(&output.extra_content);
        for body in &output.target_content {
            content.push_str(body);
        }
        if *directory == root_dir {
            root_content.push_str("\n\n");
            root_content.push_str(&content);
        } else {
            plan.files.insert(directory.join("CMakeLists.txt"), content);
        }
    }
    plan.files.insert(root_dir.join("CMakeLists.txt"), root_content);

    // Required directories that never got a directory output fall back to a
    // best-effort static library built from whatever sources are in there.
    let mut fallback_dirs: Vec<PathBuf> = required_directories
        .iter()
        .filter(|d| !outputs.contains_key(*d) && !settings.is_excluded(d))
        .cloned()
        .collect();
    fallback_dirs.sort();
    fallback_dirs.dedup();
    for directory in fallback_dirs {
        diagnostics.warn(format!(
            "Creating a default CMakeLists.txt in {}. Don't forget to fix it later",
            directory.display()
        ));
        plan.files.insert(
            directory.join("CMakeLists.txt"),
            generate_default_cmake(&directory),
        );
    }

    plan
}

/// The root CMakeLists.txt: options sorted by canonical name, then the CMake
/// code that writes the generated config header, then the leftover defines
/// no option claimed.
fn generate_root(
    options: &BTreeMap<String, BuildOption>,
    defines: &BTreeMap<String, Define>,
    settings: &Settings,
    started_at: &str,
) -> String {
    let mut out = String::new();
    if settings.generate_comments {
        out.push_str(&format!(
            "# Autogenerated by am2cmake on {}\n\n# Options\n\n",
            started_at
        ));
    }
    out.push_str("cmake_minimum_required(VERSION 2.8)\n");

    for option in options.values() {
        if settings.generate_comments {
            out.push_str(&format!("# Option to {}\n", option.description));
        }
        out.push_str(&format!(
            "option( {} \"{}\" {} )\n",
            option.name,
            escape_quotes(&option.description),
            option.status
        ));
        if settings.more_newlines {
            out.push('\n');
        }
    }

    if settings.generate_comments {
        out.push_str(
            "# The lines below will generate the config.h based on the options above\n\
             # The file will be in the ${CMAKE_BINARY_DIR} location\n",
        );
    }
    out.push_str("set(CONFIG_H ${CMAKE_BINARY_DIR}/config.h)\n");
    out.push_str("string(TIMESTAMP CURRENT_TIMESTAMP)\n");
    out.push_str(
        "file(WRITE ${CONFIG_H} \"/* WARNING: This file is auto-generated by CMake on \
         ${CURRENT_TIMESTAMP}. DO NOT EDIT!!! */\\n\\n\")\n",
    );

    for option in options.values() {
        out.push_str(&format!("if( {} )\n", option.name));
        out.push_str(&format!("    message(\" {} Enabled\")\n", option.name));
        out.push_str(&format!(
            "    file(APPEND ${{CONFIG_H}} \"/* {} */\\n\")\n",
            strip_garbage(&option.define_description)
        ));
        if !option.define.is_empty() {
            out.push_str(&format!(
                "    file(APPEND ${{CONFIG_H}} \"#define {} {}\\n\\n\")\n",
                option.define,
                escape_quotes(&strip_garbage(&option.define_value))
            ));
        } else {
            // No symbol was ever bound; synthesize a HAVE_ fallback so the
            // header still records the choice.
            out.push_str(&format!(
                "    file(APPEND ${{CONFIG_H}} \"#define HAVE_{} \\n\\n\")\n",
                option.name
            ));
        }
        for extra in &option.extra_defines {
            let extra_value = strip_garbage(extra);
            out.push_str(&format!(
                "## !!! WARNING {} identified with some pattern matching magic.\n\
                 ## Remove if not relevant!\n",
                extra_value
            ));
            out.push_str(&format!(
                "    file(APPEND ${{CONFIG_H}} \"#define {}\\n\\n\")\n",
                extra_value
            ));
        }
        out.push_str(&format!("endif( {} )\n", option.name));
    }

    out.push('\n');
    out.push_str(
        "## !!! WARNING These are the defines that were defined regardless of an option.\n\
         ## !!! Or the script couldn't match them. Match them accordingly, delete them or keep them\n",
    );
    for define in defines.values().filter(|d| !d.used) {
        out.push_str(&format!(
            "file(APPEND ${{CONFIG_H}} \"/* {} */\\n\")\n",
            strip_garbage(&define.description)
        ));
        out.push_str(&format!(
            "file(APPEND ${{CONFIG_H}} \"#define {} {} \\n\\n \")\n",
            define.name,
            escape_quotes(&strip_garbage(&define.value))
        ));
    }

    out.push('\n');
    if settings.generate_comments {
        out.push_str("# Setting the include directory for the application to find config.h\n");
    }
    out.push_str("include_directories( ${CMAKE_BINARY_DIR} )\n");
    if settings.generate_comments {
        out.push_str("# Since we have created a config.h add a global define for it\n");
    }
    out.push_str("add_definitions( \"-DHAVE_CONFIG_H\" )\n");

    out
}

/// Emits the CMake body for a single target: conditional source groups,
/// the library/executable command, compiler flags, include directories and
/// link libraries.
fn emit_target(
    target: &Target,
    options: &BTreeMap<String, BuildOption>,
    config_variables: &BTreeMap<String, Vec<String>>,
    diags: &mut Diagnostics,
) -> String {
    let mut out = String::new();
    let mut added_any = false;
    out.push_str(&format!("# Generating the target {}\n", target.name));
    out.push_str(&format!("set(project \"{}\")\n\n", target.referred_name));
    out.push_str("set(${project}, \"\")\n");
    let mut condition_required = String::new();

    for (condition, group) in &target.conditional_sources {
        let files = expand_sources(target, group, diags);
        let filelist = filelist_to_string(&files, &target.directory, 8, diags);
        if !condition.is_empty() {
            let guard = guard_for_condition(condition, options, target, &mut out, diags);
            condition_required = guard.clone();
            out.push_str(&format!("\nif({})\n", guard));
            out.push_str(&format!("    list(APPEND ${{project}}_SOURCES{}", filelist));
            out.push_str("\n    )\nendif()\n");
        } else {
            out.push_str(&format!("list(APPEND ${{project}}_SOURCES{}\n)\n", filelist));
        }
        if !filelist.is_empty() {
            added_any = true;
        }
    }

    let files = expand_sources(target, &target.sources, diags);
    let filelist = filelist_to_string(&files, &target.directory, 4, diags);
    if let Some(condition) = target.conditions.first() {
        if target.conditions.len() > 1 {
            diags.warn(format!(
                "Target {} is guarded by multiple stacked conditions, only '{}' is modeled",
                target.name, condition
            ));
        }
        let guard = guard_for_condition(condition, options, target, &mut out, diags);
        condition_required = guard.clone();
        out.push_str(&format!("if ({})\n", guard));
        out.push_str(&format!(
            "    list(APPEND ${{project}}_SOURCES{}\n    )\nendif()\n\n",
            filelist
        ));
    } else {
        out.push_str(&format!(
            "list(APPEND ${{project}}_SOURCES{}\n)\n",
            filelist
        ));
    }
    if !filelist.is_empty() {
        added_any = true;
    }

    if !condition_required.is_empty() {
        out.push_str(&format!("if ({})\n", condition_required));
    }
    match target.kind {
        TargetKind::Library => out.push_str(&format!(
            "add_library ( {} {} ${{${{project}}_SOURCES}} )\n",
            target.referred_name,
            target.link.cmake_keyword()
        )),
        TargetKind::Program => out.push_str(&format!(
            "add_executable( {} ${{${{project}}_SOURCES}} )\n",
            target.name
        )),
    }
    if !added_any {
        diags.warn(format!("No source files found for {}", target.name));
    }

    emit_compiler_flags(target, config_variables, &mut out, diags);
    emit_link_libraries(target, config_variables, &mut out, diags);

    if !condition_required.is_empty() {
        out.push_str(&format!("\nendif( {} )\n", condition_required));
    }

    out
}

/// Maps a raw build condition to the option whose bound symbol matches it.
/// An unmatched condition is emitted as-is with a fix-manually marker.
fn guard_for_condition(
    condition: &str,
    options: &BTreeMap<String, BuildOption>,
    target: &Target,
    out: &mut String,
    diags: &mut Diagnostics,
) -> String {
    if let Some(option) = options.values().find(|o| o.define == condition) {
        option.name.clone()
    } else {
        out.push_str(&format!(
            "# WARNING: condition {} unmatched to any configure option. Fix manually\n",
            condition
        ));
        diags.warn(format!(
            "Condition {} on target {} does not match any configure option",
            condition, target.name
        ));
        condition.to_string()
    }
}

/// Substitutes `$(name)` references in a source list through the target's
/// variable map. References that were already folded into a conditional
/// source group have no entry left and are simply dropped here.
fn expand_sources(target: &Target, entries: &[String], diags: &mut Diagnostics) -> Vec<String> {
    let mut resolved = Vec::new();
    for entry in entries {
        if entry.contains('$') {
            let name = strip_garbage(entry);
            if let Some(lists) = target.variables.get(&name) {
                resolved.extend(lists.iter().flatten().cloned());
            } else if target.conditional_sources.is_empty() {
                diags.warn(format!(
                    "Unresolved reference {} in the source list of {}",
                    entry, target.name
                ));
            }
        } else {
            resolved.push(entry.clone());
        }
    }
    resolved
}

/// Sorted file list with per-file existence checks. Missing files stay in
/// the output as commented lines so a human can spot and fix them.
fn filelist_to_string(
    files: &[String],
    directory: &Path,
    indent: usize,
    diags: &mut Diagnostics,
) -> String {
    let mut sorted: Vec<&String> = files.iter().collect();
    sorted.sort();
    let pad = " ".repeat(indent);
    let mut out = String::new();
    for file in sorted {
        if directory.join(file).is_file() {
            out.push_str(&format!("\n{pad}${{CMAKE_CURRENT_SOURCE_DIR}}/{file}"));
        } else {
            out.push_str(&format!(
                "\n#{pad}${{CMAKE_CURRENT_SOURCE_DIR}}/{file} # File not found. Fix manually"
            ));
            diags.warn(format!(
                "The file {}/{} is named in the Makefile.am but cannot be found in the filesystem",
                directory.display(),
                file
            ));
        }
    }
    out
}

/// Direct flags become one COMPILE_FLAGS string; indirect flags go through
/// fixed-point substitution and any surviving `-I` tokens become include
/// directories.
fn emit_compiler_flags(
    target: &Target,
    config_variables: &BTreeMap<String, Vec<String>>,
    out: &mut String,
    diags: &mut Diagnostics,
) {
    let raw = target.compiler_flags.join(" ");
    let mut direct = String::new();
    let mut indirect: Vec<String> = Vec::new();
    for flag in raw.split_whitespace() {
        if !flag.contains('$') && !flag.contains('@') {
            direct.push_str(&escape_quotes(flag));
            direct.push(' ');
        } else {
            indirect.push(flag.to_string());
        }
    }

    if !direct.is_empty() {
        out.push_str(&format!(
            "set_target_properties( {}\n    PROPERTIES COMPILE_FLAGS \"{}\"\n)\n",
            target.referred_name,
            direct.trim_end()
        ));
    }

    let resolved = resolve_indirect_flags(&indirect, target, config_variables, diags);

    let mut include_directories: Vec<String> = Vec::new();
    for flag in &resolved {
        let flag = flag.replace('\'', "");
        for token in flag.split_whitespace() {
            if token.starts_with("-I") {
                include_directories.push(token.replacen("-I", "", 1));
            }
        }
    }
    if !include_directories.is_empty() {
        out.push_str(&format!(
            "\ntarget_include_directories( {} PRIVATE",
            target.referred_name
        ));
        for directory in &include_directories {
            out.push_str(&format!("\n    {}", directory));
        }
        out.push_str("\n)\n");
    }
}

/// Worklist substitution of indirect flag tokens. Each pass substitutes one
/// reference per token via the target's variable map or the configure
/// variable table; `top_srcdir` maps to the CMake source directory. The loop
/// ends when no indirect tokens remain, when a pass makes no progress, or
/// after a bounded number of passes (self-referential definitions would
/// otherwise substitute forever). Whatever is still indirect at that point
/// is reported as unresolved and dropped.
fn resolve_indirect_flags(
    flags: &[String],
    target: &Target,
    config_variables: &BTreeMap<String, Vec<String>>,
    diags: &mut Diagnostics,
) -> Vec<String> {
    let dollar_ref = Regex::new(r"\$\([^)]*\)").expect("static pattern");
    let at_ref = Regex::new(r"@[A-Za-z0-9_]+@").expect("static pattern");

    let mut resolved: Vec<String> = Vec::new();
    let mut work: Vec<String> = flags.to_vec();
    let mut passes = 0;
    while !work.is_empty() {
        passes += 1;
        let mut progressed = false;
        let mut next: Vec<String> = Vec::new();
        for flag in work.drain(..) {
            if let Some(found) = dollar_ref.find(&flag).map(|m| m.as_str().to_string()) {
                let name = strip_garbage(&found);
                let replacement = if name == "top_srcdir" {
                    Some("${CMAKE_SOURCE_DIR}".to_string())
                } else if let Some(lists) = target.variables.get(&name) {
                    Some(
                        lists
                            .iter()
                            .flatten()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(" "),
                    )
                } else {
                    config_variables.get(&name).map(|values| values.join(" "))
                };
                match replacement {
                    Some(value) => {
                        next.push(flag.replacen(&found, value.trim(), 1));
                        progressed = true;
                    }
                    None => diags.warn(format!(
                        "Unresolved reference {} in the compiler flags of {}",
                        found, target.name
                    )),
                }
            } else if let Some(found) = at_ref.find(&flag).map(|m| m.as_str().to_string()) {
                let name = found.trim_matches('@');
                match config_variables.get(name) {
                    Some(values) => {
                        next.push(flag.replacen(&found, values.join(" ").trim(), 1));
                        progressed = true;
                    }
                    None => diags.warn(format!(
                        "Unresolved reference {} in the compiler flags of {}",
                        found, target.name
                    )),
                }
            } else {
                resolved.push(flag);
            }
        }
        work = next;
        if !progressed || passes >= MAX_SUBSTITUTION_PASSES {
            for flag in &work {
                diags.warn(format!(
                    "Unresolved reference {} in the compiler flags of {}",
                    flag, target.name
                ));
            }
            break;
        }
    }
    resolved
}

/// Resolves each link-library reference to a bare CMake library name.
/// `$(var)` references go through the target's variable map, `@var@`
/// references through the configure variable table (dropping `-L` path
/// flags); anything unresolvable is kept as a fix-manually comment.
fn emit_link_libraries(
    target: &Target,
    config_variables: &BTreeMap<String, Vec<String>>,
    out: &mut String,
    diags: &mut Diagnostics,
) {
    if target.link_libs.is_empty() {
        return;
    }
    let mut list = format!("\ntarget_link_libraries( {}", target.referred_name);
    for link_name in &target.link_libs {
        let nice = nice_library_name(link_name);
        if nice.starts_with('$') {
            let clean = strip_garbage(&nice);
            if let Some(lists) = target.variables.get(&clean) {
                for value_list in lists {
                    for real_link in value_list {
                        list.push_str(&format!("\n    {}", nice_library_name(real_link)));
                    }
                }
            } else {
                list.push_str(&format!("\n#    {} # <-- FIX THIS", nice));
                diags.warn(format!(
                    "{} in {}/CMakeLists.txt was not identifiable, fix it manually",
                    nice,
                    target.directory.display()
                ));
            }
        } else if nice.starts_with('@') {
            let name = nice.replace('@', "");
            if let Some(values) = config_variables.get(&name) {
                for lib in values.join(" ").split_whitespace() {
                    let lib_name = nice_library_name(lib);
                    if !lib_name.starts_with("-L") {
                        list.push_str(&format!("\n    {}", lib_name));
                    }
                }
            } else {
                list.push_str(&format!("\n#    {} # <-- FIX THIS", nice));
                diags.warn(format!(
                    "{} in {}/CMakeLists.txt was not identifiable, fix it manually",
                    nice,
                    target.directory.display()
                ));
            }
        } else {
            list.push_str(&format!("\n    {}", nice));
        }
    }
    list.push_str("\n)\n");
    out.push_str(&list);
}

/// Reduces a link reference to a bare library name: the path prefix, the
/// extension, and a leading `lib` or `-l` are dropped. `-L` path flags pass
/// through untouched.
pub fn nice_library_name(link_name: &str) -> String {
    let link_name = link_name.replace('\'', "");
    if link_name.starts_with("-L") {
        return link_name;
    }
    let mut name = link_name
        .rsplit('/')
        .next()
        .unwrap_or(link_name.as_str())
        .to_string();
    if name.contains('.') {
        name = name.split('.').next().unwrap_or("").to_string();
        if let Some(stripped) = name.strip_prefix("lib") {
            name = stripped.to_string();
        }
    }
    if let Some(stripped) = name.strip_prefix("-l") {
        name = stripped.to_string();
    }
    name
}

/// Fallback content for a required directory the parser never visited: a
/// static library from every source and header file found in there.
pub fn generate_default_cmake(directory: &Path) -> String {
    let base = directory
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project");
    let mut sources = format!("set (project {})\nset(${{project}}_SOURCES\n", base);
    for pattern in ["*.c*", "*.h*"] {
        if let Ok(paths) = glob::glob(&format!("{}/{}", directory.display(), pattern)) {
            let mut names: Vec<String> = paths
                .filter_map(Result::ok)
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
                .collect();
            names.sort();
            for name in names {
                sources.push_str(&format!("\t${{CMAKE_CURRENT_SOURCE_DIR}}/{}\n", name));
            }
        }
    }
    sources.push_str(")\n");
    format!(
        "cmake_minimum_required(VERSION 2.8)\n{}add_library(${{project}} STATIC ${{${{project}}_SOURCES}} )\n",
        sources
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkKind, Session};
    use std::fs;

    fn session_in(dir: &Path) -> Session {
        Session::new(Settings {
            working_directory: dir.to_path_buf(),
            quiet: true,
            ..Settings::default()
        })
    }

    #[test]
    fn test_nice_library_name() {
        assert_eq!(nice_library_name("libfoo.a"), "foo");
        assert_eq!(nice_library_name("../z/libz.so.1"), "z");
        assert_eq!(nice_library_name("-lm"), "m");
        assert_eq!(nice_library_name("-L/usr/lib"), "-L/usr/lib");
        assert_eq!(nice_library_name("plain"), "plain");
    }

    #[test]
    fn test_options_sorted_alphabetically() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = session_in(tmp.path());
        s.option_entry("ZULU");
        s.option_entry("ALPHA");
        let plan = generate(&mut s);
        let root = &plan.files[&tmp.path().join("CMakeLists.txt")];
        let alpha = root.find("option( ALPHA").unwrap();
        let zulu = root.find("option( ZULU").unwrap();
        assert!(alpha < zulu);
    }

    #[test]
    fn test_option_without_define_gets_have_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = session_in(tmp.path());
        s.option_entry("BARE");
        let plan = generate(&mut s);
        let root = &plan.files[&tmp.path().join("CMakeLists.txt")];
        assert!(root.contains("#define HAVE_BARE"));
    }

    #[test]
    fn test_unused_define_emitted_unconditionally() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = session_in(tmp.path());
        s.defines.insert(
            "VERSION".to_string(),
            Define {
                name: "VERSION".to_string(),
                option_name: String::new(),
                description: "the version".to_string(),
                value: "\"1.0\"".to_string(),
                used: false,
            },
        );
        let plan = generate(&mut s);
        let root = &plan.files[&tmp.path().join("CMakeLists.txt")];
        assert!(root.contains("defined regardless of an option"));
        assert!(root.contains("#define VERSION"));
        // not inside any if() guard: the define appears after the last endif
        let last_endif = root.rfind("endif").unwrap_or(0);
        assert!(root.find("#define VERSION").unwrap() > last_endif);
    }

    #[test]
    fn test_missing_source_is_commented() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "int a;\n").unwrap();
        let mut s = session_in(tmp.path());
        let mut target = Target::new("libx.a", &src, TargetKind::Library);
        target.sources = vec!["a.c".to_string(), "b.c".to_string()];
        s.targets.push(target);
        let plan = generate(&mut s);
        let content = &plan.files[&src.join("CMakeLists.txt")];
        assert!(content.contains("${CMAKE_CURRENT_SOURCE_DIR}/a.c"));
        assert!(content.contains("#    ${CMAKE_CURRENT_SOURCE_DIR}/b.c # File not found"));
        assert!(content.contains("add_library ( x STATIC"));
        assert!(s.diagnostics.warnings().iter().any(|w| w.contains("b.c")));
    }

    #[test]
    fn test_program_target_emits_add_executable() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("tools");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.c"), "int main;\n").unwrap();
        let mut s = session_in(tmp.path());
        let mut target = Target::new("frob", &src, TargetKind::Program);
        target.sources = vec!["main.c".to_string()];
        s.targets.push(target);
        let plan = generate(&mut s);
        let content = &plan.files[&src.join("CMakeLists.txt")];
        assert!(content.contains("add_executable( frob"));
    }

    #[test]
    fn test_matched_condition_uses_option_name() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "").unwrap();
        let mut s = session_in(tmp.path());
        s.option_entry("FOO").merge_define("WITH_FOO");
        let mut target = Target::new("libx.a", &src, TargetKind::Library);
        target.sources = vec!["a.c".to_string()];
        target.conditions = vec!["WITH_FOO".to_string()];
        s.targets.push(target);
        let plan = generate(&mut s);
        let content = &plan.files[&src.join("CMakeLists.txt")];
        assert!(content.contains("if (FOO)"));
        assert!(content.contains("endif( FOO )"));
        assert!(!content.contains("Fix manually\nif (WITH_FOO)"));
    }

    #[test]
    fn test_unmatched_condition_gets_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "").unwrap();
        let mut s = session_in(tmp.path());
        let mut target = Target::new("libx.a", &src, TargetKind::Library);
        target.sources = vec!["a.c".to_string()];
        target.conditions = vec!["MYSTERY".to_string()];
        s.targets.push(target);
        let plan = generate(&mut s);
        let content = &plan.files[&src.join("CMakeLists.txt")];
        assert!(content.contains("if (MYSTERY)"));
        assert!(content.contains("unmatched to any configure option. Fix manually"));
    }

    #[test]
    fn test_conditional_source_group_emission() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "").unwrap();
        fs::write(src.join("e1.c"), "").unwrap();
        let mut s = session_in(tmp.path());
        s.option_entry("EXTRA").merge_define("WITH_EXTRA");
        let mut target = Target::new("libx.a", &src, TargetKind::Library);
        target.sources = vec!["a.c".to_string(), "$(extra_files)".to_string()];
        target
            .conditional_sources
            .insert("WITH_EXTRA".to_string(), vec!["e1.c".to_string()]);
        s.targets.push(target);
        let plan = generate(&mut s);
        let content = &plan.files[&src.join("CMakeLists.txt")];
        assert!(content.contains("if(EXTRA)"));
        assert!(content.contains("${CMAKE_CURRENT_SOURCE_DIR}/e1.c"));
        // the raw $(extra_files) token must not leak into the output
        assert!(!content.contains("$(extra_files)"));
    }

    #[test]
    fn test_compile_flags_and_include_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "").unwrap();
        let mut s = session_in(tmp.path());
        s.config_variables
            .insert("FOO_CFLAGS".to_string(), vec!["-I/usr/include/foo".to_string()]);
        let mut target = Target::new("libx.a", &src, TargetKind::Library);
        target.sources = vec!["a.c".to_string()];
        target.compiler_flags = vec![
            "-DBAR -Wall -I$(top_srcdir)/include $(FOO_CFLAGS)".to_string(),
        ];
        s.targets.push(target);
        let plan = generate(&mut s);
        let content = &plan.files[&src.join("CMakeLists.txt")];
        assert!(content.contains("COMPILE_FLAGS \"-DBAR -Wall\""));
        assert!(content.contains("target_include_directories( x PRIVATE"));
        assert!(content.contains("${CMAKE_SOURCE_DIR}/include"));
        assert!(content.contains("/usr/include/foo"));
    }

    #[test]
    fn test_self_referential_flag_terminates() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let mut s = session_in(tmp.path());
        s.config_variables
            .insert("LOOP".to_string(), vec!["$(LOOP)".to_string()]);
        let mut target = Target::new("libx.a", &src, TargetKind::Library);
        target.compiler_flags = vec!["$(LOOP)".to_string()];
        s.targets.push(target);
        let plan = generate(&mut s);
        assert!(plan.files.contains_key(&src.join("CMakeLists.txt")));
        assert!(s
            .diagnostics
            .warnings()
            .iter()
            .any(|w| w.contains("Unresolved reference")));
    }

    #[test]
    fn test_link_library_resolution() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "").unwrap();
        let mut s = session_in(tmp.path());
        s.config_variables.insert(
            "ZLIBS".to_string(),
            vec!["-L/opt/z/lib -lz".to_string()],
        );
        let mut target = Target::new("frob", &src, TargetKind::Program);
        target.sources = vec!["a.c".to_string()];
        target.link_libs = vec![
            "../x/libx.a".to_string(),
            "@ZLIBS@".to_string(),
            "@NOPE@".to_string(),
        ];
        s.targets.push(target);
        let plan = generate(&mut s);
        let content = &plan.files[&src.join("CMakeLists.txt")];
        assert!(content.contains("target_link_libraries( frob"));
        assert!(content.contains("\n    x"));
        assert!(content.contains("\n    z"));
        assert!(!content.contains("-L/opt/z/lib"));
        assert!(content.contains("#    @NOPE@ # <-- FIX THIS"));
    }

    #[test]
    fn test_subdirectory_extra_content_and_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("s.c"), "").unwrap();
        fs::write(sub.join("s.h"), "").unwrap();
        let mut s = session_in(tmp.path());
        s.extra_content.insert(
            tmp.path().to_path_buf(),
            "\nadd_subdirectory( sub )".to_string(),
        );
        s.required_directories.push(sub.clone());
        let plan = generate(&mut s);
        let root = &plan.files[&tmp.path().join("CMakeLists.txt")];
        assert!(root.contains("add_subdirectory( sub )"));
        let fallback = &plan.files[&sub.join("CMakeLists.txt")];
        assert!(fallback.contains("set (project sub)"));
        assert!(fallback.contains("${CMAKE_CURRENT_SOURCE_DIR}/s.c"));
        assert!(fallback.contains("${CMAKE_CURRENT_SOURCE_DIR}/s.h"));
        assert!(fallback.contains("add_library(${project} STATIC"));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.c"), "").unwrap();
        let mut s = session_in(tmp.path());
        s.option_entry("FOO").merge_define("WITH_FOO");
        let mut target = Target::new("libx.a", &src, TargetKind::Library);
        target.sources = vec!["a.c".to_string()];
        s.targets.push(target);
        let first = generate(&mut s);
        let second = generate(&mut s);
        assert_eq!(first.files, second.files);
    }

    #[test]
    fn test_static_and_shared_keywords() {
        assert_eq!(LinkKind::Static.cmake_keyword(), "STATIC");
        assert_eq!(LinkKind::Dynamic.cmake_keyword(), "SHARED");
    }
}
