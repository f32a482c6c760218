// ============================================================================
// model.rs — Normalized build model and the conversion session state
// ============================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::diag::Diagnostics;
use crate::lexutil;

/// Canonical form of an option or shell-variable name: `-` becomes `_`,
/// everything uppercased. All option registry keys use this form.
pub fn canonical_option_name(name: &str) -> String {
    name.trim().replace('-', "_").to_uppercase()
}

/// A configurable build switch gathered from `configure.ac`, emitted as a
/// CMake `option()` plus, when a preprocessor symbol is bound, a conditional
/// `#define` block in the generated config header.
#[derive(Debug, Clone, Default)]
pub struct BuildOption {
    pub name: String,
    pub description: String,
    /// "ON" or "OFF"; empty until a declaration supplies it or finalize runs.
    pub status: String,
    /// Bound preprocessor symbol, empty until resolved.
    pub define: String,
    pub define_value: String,
    pub define_description: String,
    /// Symbols weakly associated with this option by fuzzy matching.
    pub extra_defines: Vec<String>,
}

impl BuildOption {
    pub fn new(canonical_name: &str) -> Self {
        Self {
            name: canonical_name.to_string(),
            ..Self::default()
        }
    }

    // Later sightings of the same option fill in missing fields. A populated
    // field is never overwritten with an empty value.

    pub fn merge_description(&mut self, description: &str) {
        if !description.is_empty() {
            self.description = description.to_string();
        }
    }

    pub fn merge_status(&mut self, status: &str) {
        if !status.is_empty() {
            self.status = status.to_string();
        }
    }

    pub fn merge_define(&mut self, define: &str) {
        if !define.is_empty() {
            self.define = define.to_string();
        }
    }

    pub fn merge_define_value(&mut self, value: &str) {
        if !value.is_empty() {
            self.define_value = value.replace(['[', ']'], "");
        }
    }

    pub fn merge_define_description(&mut self, description: &str) {
        if !description.is_empty() {
            self.define_description = description.to_string();
        }
    }

    /// Applies the emission defaults. Called exactly once, right before the
    /// option is written out.
    pub fn finalize(&mut self) {
        if self.description.len() <= 1 {
            self.description = format!("Enable {}", self.name);
        }
        if self.status.len() <= 1 {
            self.status = "OFF".to_string();
        }
        if self.define_description.len() <= 1 {
            self.define_description = self.description.clone();
        }
    }
}

/// A raw `AC_DEFINE` directive. Defines are keyed by symbol name with
/// last-write-wins semantics; the `used` flag is set when the define is
/// bound to an option, exactly or fuzzily.
#[derive(Debug, Clone)]
pub struct Define {
    pub name: String,
    /// Uppercased shell/option variable the define was derived from.
    pub option_name: String,
    pub description: String,
    pub value: String,
    pub used: bool,
}

/// Library vs. executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Library,
    Program,
}

/// Static vs. dynamic linkage, derived from the raw target name's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Static,
    Dynamic,
}

impl LinkKind {
    pub fn cmake_keyword(self) -> &'static str {
        match self {
            LinkKind::Static => "STATIC",
            LinkKind::Dynamic => "SHARED",
        }
    }
}

/// A buildable unit recovered from a `Makefile.am`. The canonical name is
/// the unique key in the global target set; a second declaration with the
/// same canonical name merges into the first.
#[derive(Debug, Clone)]
pub struct Target {
    /// Raw declared name with any `$`, `(`, `)` stripped.
    pub name: String,
    pub canonic_name: String,
    /// Name used in generated `add_library`/`target_*` commands.
    pub referred_name: String,
    /// Directory of origin; fixed at creation.
    pub directory: PathBuf,
    pub kind: TargetKind,
    pub link: LinkKind,
    /// Name contained a `$(...)` reference when declared.
    pub dependent: bool,
    pub sources: Vec<String>,
    pub link_libs: Vec<String>,
    /// Raw flag text chunks; tokenized only at emission time.
    pub compiler_flags: Vec<String>,
    pub linker_flags: Vec<String>,
    /// Guarding conditions seen on this target's assignments. Only a single
    /// level is modeled; see the makefile parser.
    pub conditions: Vec<String>,
    /// Condition name → source files gated by it.
    pub conditional_sources: BTreeMap<String, Vec<String>>,
    /// Locally defined plain variables, for `$(name)` indirection at
    /// emission time. Each assignment contributes one value list.
    pub variables: BTreeMap<String, Vec<Vec<String>>>,
}

impl Target {
    pub fn new(raw_name: &str, directory: &Path, kind: TargetKind) -> Self {
        let dependent = raw_name.contains('$');
        let name: String = if dependent {
            raw_name
                .chars()
                .filter(|c| !matches!(c, '$' | '(' | ')'))
                .collect()
        } else {
            raw_name.to_string()
        };
        let canonic_name = lexutil::canonicalize(&name);

        let (link, referred_name) = if kind == TargetKind::Program {
            (LinkKind::Dynamic, canonic_name.clone())
        } else if dependent {
            (LinkKind::Static, name.clone())
        } else if name.ends_with(".a") {
            (LinkKind::Static, strip_lib_affixes(&name, 2))
        } else {
            (LinkKind::Dynamic, strip_lib_affixes(&name, 3))
        };

        Self {
            name,
            canonic_name,
            referred_name,
            directory: directory.to_path_buf(),
            kind,
            link,
            dependent,
            sources: Vec::new(),
            link_libs: Vec::new(),
            compiler_flags: Vec::new(),
            linker_flags: Vec::new(),
            conditions: Vec::new(),
            conditional_sources: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }
}

/// Drops the `lib` prefix and the trailing extension (".a" or ".so") from a
/// library file name. Names too short to carry either are left alone.
fn strip_lib_affixes(name: &str, ext_len: usize) -> String {
    let trimmed = name.strip_prefix("lib").unwrap_or(name);
    let end = trimmed.len().saturating_sub(ext_len);
    if end == 0 {
        trimmed.to_string()
    } else {
        trimmed[..end].to_string()
    }
}

/// Accumulated generation state for one directory: the textual bodies of the
/// targets declared there plus any extra emitted content, such as
/// `add_subdirectory` directives. Written exactly once at the end of a run.
#[derive(Debug, Default)]
pub struct DirectoryOutput {
    pub target_content: Vec<String>,
    pub target_names: Vec<String>,
    pub extra_content: String,
}

/// Run configuration, set from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub working_directory: PathBuf,
    /// Directory prefixes excluded from all processing.
    pub exclude_directories: Vec<String>,
    /// Quick mode: skip Autotools parsing, dump the source tree directly.
    pub quick: bool,
    /// Recurse into subdirectories in quick/fallback mode.
    pub recursive: bool,
    /// Use CMake AUTOMOC instead of manual qt source wrapping.
    pub cmake_automoc: bool,
    pub generate_comments: bool,
    pub more_newlines: bool,
    pub quiet: bool,
}

impl Settings {
    /// Whether the directory matches one of the configured exclude prefixes.
    pub fn is_excluded(&self, dir: &Path) -> bool {
        let dir = dir.to_string_lossy();
        self.exclude_directories
            .iter()
            .any(|prefix| !prefix.is_empty() && dir.starts_with(prefix.as_str()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            exclude_directories: Vec::new(),
            quick: false,
            recursive: false,
            cmake_automoc: false,
            generate_comments: true,
            more_newlines: true,
            quiet: false,
        }
    }
}

/// All state of one conversion run. The parsers populate the registries, the
/// generator only reads them (apart from marking defines used); the whole
/// session is discarded when the run ends.
#[derive(Debug)]
pub struct Session {
    pub settings: Settings,
    /// Canonical name → option. BTreeMap keeps emission order sorted.
    pub options: BTreeMap<String, BuildOption>,
    /// Symbol name → define.
    pub defines: BTreeMap<String, Define>,
    pub targets: Vec<Target>,
    /// Shell-style variables captured from configure.ac assignments.
    pub config_variables: BTreeMap<String, Vec<String>>,
    /// Directory → pending extra content (subdirectory directives).
    pub extra_content: BTreeMap<PathBuf, String>,
    /// Directories that must end up with generated output.
    pub required_directories: Vec<PathBuf>,
    pub outputs: BTreeMap<PathBuf, DirectoryOutput>,
    pub diagnostics: Diagnostics,
    /// Timestamp written into the generated root file. Fixed at session
    /// creation so repeated generation over the same model is byte-identical.
    pub started_at: String,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        let quiet = settings.quiet;
        Self {
            settings,
            options: BTreeMap::new(),
            defines: BTreeMap::new(),
            targets: Vec::new(),
            config_variables: BTreeMap::new(),
            extra_content: BTreeMap::new(),
            required_directories: Vec::new(),
            outputs: BTreeMap::new(),
            diagnostics: Diagnostics::new(quiet),
            started_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Looks up or creates the option for the given canonical name.
    pub fn option_entry(&mut self, canonical_name: &str) -> &mut BuildOption {
        self.options
            .entry(canonical_name.to_string())
            .or_insert_with(|| BuildOption::new(canonical_name))
    }

    pub fn has_target(&self, canonic_name: &str) -> bool {
        self.targets.iter().any(|t| t.canonic_name == canonic_name)
    }

    pub fn target_mut(&mut self, canonic_name: &str) -> Option<&mut Target> {
        self.targets
            .iter_mut()
            .find(|t| t.canonic_name == canonic_name)
    }

    /// Whether the directory matches one of the configured exclude prefixes.
    pub fn should_exclude(&self, dir: &Path) -> bool {
        self.settings.is_excluded(dir)
    }
}
