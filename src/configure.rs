// ============================================================================
// configure.rs — Parser for configure.ac macro invocations
// ============================================================================

use std::fs;
use std::path::Path;

use crate::error::ConvertError;
use crate::lexutil;
use crate::makefile;
use crate::model::{canonical_option_name, Define, Session};

/// The four macro heads this parser recognizes. Everything else is either a
/// plain `name=value` assignment or ignored.
const MACRO_HEADS: &[&str] = &[
    "AC_ARG_ENABLE(",
    "AM_CONDITIONAL(",
    "AC_DEFINE(",
    "AC_CONFIG_FILES(",
];

/// How many lines a remembered `$`-carrying context line stays usable for an
/// `AC_DEFINE` before it goes stale.
const LOOKBACK_WINDOW: usize = 3;

/// Remembers the most recent line that referenced a shell variable. The
/// line preceding an `AC_DEFINE` often carries the `if test "$var"` guard
/// that names the variable the define belongs to; anything older than the
/// lookback window is too far away to be trusted.
#[derive(Debug, Default)]
struct ContextWindow {
    line: Option<String>,
    staleness: usize,
}

impl ContextWindow {
    fn observe(&mut self, line: &str) {
        if line.len() > 1 && line.contains('$') {
            self.line = Some(line.to_string());
            self.staleness = 0;
        } else {
            self.staleness += 1;
            if self.staleness >= LOOKBACK_WINDOW {
                self.line = None;
            }
        }
    }

    fn context(&self) -> Option<&str> {
        self.line.as_deref()
    }
}

/// Parses a configure.ac from disk, then runs the define-to-option
/// resolution. Referenced Makefile.am files (via `AC_CONFIG_FILES`) are
/// handed to the makefile parser as they are encountered.
pub fn process_configure_ac(session: &mut Session, path: &Path) -> Result<(), ConvertError> {
    let content = fs::read_to_string(path)?;
    scan_content(session, &content);
    resolve_defines(session);
    Ok(())
}

/// Scans configure.ac content line by line. Macro invocations may span
/// several lines; lines are accumulated until the parenthesis balance of the
/// invocation returns to zero.
pub fn scan_content(session: &mut Session, content: &str) {
    let lines: Vec<&str> = content.lines().collect();
    let mut window = ContextWindow::default();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with('#') {
            window.observe(line);
            i += 1;
            continue;
        }

        if line.contains('=') {
            capture_variable(session, line);
        }

        if let Some(head) = MACRO_HEADS.iter().find(|h| line.starts_with(*h)) {
            let mut invocation = String::new();
            loop {
                invocation.push_str(lines[i].trim());
                invocation.push(' ');
                if lexutil::paren_balance(&invocation) == 0 || i + 1 >= lines.len() {
                    break;
                }
                i += 1;
            }
            let body = invocation[head.len()..].to_string();
            match *head {
                "AC_ARG_ENABLE(" => process_argument(session, &body),
                "AM_CONDITIONAL(" => process_conditional(session, &body),
                "AC_DEFINE(" => process_a_define(session, &body, window.context()),
                _ => process_config_files(session, &body),
            }
            window.observe(&invocation);
        } else {
            window.observe(line);
        }
        i += 1;
    }
}

/// Captures a plain `name=value` assignment into the configure variable
/// table. Repeated names append, never overwrite.
fn capture_variable(session: &mut Session, line: &str) {
    let chars: Vec<char> = line.chars().collect();
    if !chars[0].is_ascii_alphabetic() {
        return;
    }
    let mut name = String::new();
    let mut j = 0;
    while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
        name.push(chars[j]);
        j += 1;
    }
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    if j < chars.len() && chars[j] == '=' {
        let value: String = chars[j + 1..].iter().collect();
        session.config_variables.entry(name).or_default().push(value);
    }
}

/// `AC_ARG_ENABLE(name, [  --enable-name   description], ...)`: the argument
/// name runs to the first comma; the description sits in the first bracketed
/// block after the option-name column. Default is ON only on an `=yes`.
fn process_argument(session: &mut Session, body: &str) {
    let body = body.trim();
    let arg_name: String = body.chars().take_while(|c| *c != ',').collect();
    let canonical = canonical_option_name(&arg_name);
    if canonical.is_empty() {
        return;
    }

    let mut description = String::new();
    if let Some(pos) = body.find('[') {
        let rest: Vec<char> = body[pos + 1..].chars().collect();
        let mut k = 0;
        while k < rest.len() && rest[k] == ' ' {
            k += 1;
        }
        while k < rest.len() && rest[k] != ' ' {
            k += 1;
        }
        while k < rest.len() && rest[k] == ' ' {
            k += 1;
        }
        while k < rest.len() && rest[k] != ']' {
            description.push(rest[k]);
            k += 1;
        }
    }

    let status = if body.contains("=yes") { "ON" } else { "OFF" };
    let option = session.option_entry(&canonical);
    option.merge_description(description.trim());
    option.merge_status(status);
}

/// `AM_CONDITIONAL(SYMBOL, test "x$var" = xyes)`: binds SYMBOL to the option
/// derived from the referenced shell variable, creating it if needed.
fn process_conditional(session: &mut Session, body: &str) {
    let body = body.trim();
    let symbol: String = body.chars().take_while(|c| *c != ',').collect();
    let mut bound = String::new();
    let mut adding = false;
    for c in body.chars() {
        if adding && (c == '"' || c == ' ' || c == '=') {
            break;
        }
        if adding {
            bound.push(c);
        }
        if c == '$' {
            adding = true;
        }
    }
    let canonical = canonical_option_name(&bound);
    if canonical.is_empty() {
        session
            .diagnostics
            .warn(format!("AM_CONDITIONAL without a variable reference: {}", symbol.trim()));
        return;
    }
    session.option_entry(&canonical).merge_define(symbol.trim());
}

/// `AC_DEFINE(SYMBOL, value, [description])`: a three-stage scan where
/// bracket depth suppresses comma splitting inside bracketed text. The
/// associated shell variable is taken from a `$` reference in the invocation
/// itself or, failing that, from the remembered context line.
fn process_a_define(session: &mut Session, body: &str, context: Option<&str>) {
    let body = body.trim();
    let mut name = String::new();
    let mut value = String::new();
    let mut description = String::new();
    let mut stage = 1;
    let mut brackets = 0i32;
    let mut parens = 1i32;
    for c in body.chars() {
        match c {
            '[' => brackets += 1,
            ']' => brackets -= 1,
            '(' => parens += 1,
            ')' => {
                parens -= 1;
                // closed the AC_DEFINE( itself?
                if parens == 0 {
                    break;
                }
            }
            _ => {}
        }
        if c == ',' && brackets == 0 {
            stage += 1;
            if stage == 4 {
                break;
            }
        }
        match stage {
            1 if c != ',' => name.push(c),
            2 if c != ',' => value.push(c),
            3 => description.push(c),
            _ => {}
        }
    }

    let name = name.trim().to_string();
    if name.is_empty() {
        session.diagnostics.warn("AC_DEFINE with no symbol name, skipped");
        return;
    }

    let scan = match context {
        Some(ctx) => format!("{body} {ctx}"),
        None => body.to_string(),
    };
    let mut variable = String::new();
    let mut adding = false;
    for c in scan.chars() {
        if adding && c == '"' {
            break;
        }
        if adding {
            variable.push(c);
        }
        if c == '$' {
            adding = true;
        }
    }

    // Last write wins for repeated symbol names.
    session.defines.insert(
        name.clone(),
        Define {
            name,
            option_name: variable.trim().to_uppercase(),
            description,
            value: value.trim().to_string(),
            used: false,
        },
    );
}

/// `AC_CONFIG_FILES(Makefile src/Makefile ...)`: every listed stem with an
/// existing `<stem>.am` next to it is handed to the makefile parser.
fn process_config_files(session: &mut Session, body: &str) {
    let cleaned = lexutil::strip_garbage(body);
    for stem in cleaned.split_whitespace() {
        let path = session
            .settings
            .working_directory
            .join(format!("{stem}.am"));
        if path.is_file() {
            makefile::process_makefile_am(session, &path);
        }
    }
}

/// Two-pass define-to-option resolution. The exact pass binds each define to
/// the first option whose bound symbol or canonical name matches; the fuzzy
/// pass offers every still-unused define to the options by case-insensitive
/// similarity or substring containment. Defines left unused after both
/// passes are emitted unconditionally by the generator.
pub fn resolve_defines(session: &mut Session) {
    let Session {
        options, defines, ..
    } = session;

    for option in options.values_mut() {
        for define in defines.values_mut() {
            let mut matched = false;
            if !option.define.is_empty() && option.define == define.name {
                option.merge_define_description(&define.description);
                option.merge_define_value(&define.value);
                define.used = true;
                matched = true;
            }
            if option.name == define.option_name {
                option.merge_define(&define.name);
                option.merge_define_description(&define.description);
                option.merge_define_value(&define.value);
                define.used = true;
                matched = true;
            }
            if matched {
                break;
            }
        }
    }

    for define in defines.values_mut() {
        if define.used {
            continue;
        }
        let define_upper = define.name.to_uppercase();
        for option in options.values_mut() {
            let option_upper = option.name.to_uppercase();
            let score = lexutil::similarity(&define_upper, &option_upper);
            if score > lexutil::SIMILARITY_THRESHOLD
                || option_upper.contains(&define_upper)
                || define_upper.contains(&option_upper)
            {
                option.extra_defines.push(define.name.clone());
                define.used = true;
                break;
            }
        }
    }
}
