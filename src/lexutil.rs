// ============================================================================
// lexutil.rs — Lexical helpers for the loosely structured Autotools grammar
// ============================================================================

/// Similarity score above which a preprocessor define is attached to an
/// option even though no exact binding exists. Tune with care: lowering it
/// produces more false associations in the generated config header.
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Running balance of `(` against `)` in the given text. A macro invocation
/// is complete once the balance of all its accumulated lines returns to zero.
pub fn paren_balance(line: &str) -> i32 {
    let mut balance = 0;
    for c in line.chars() {
        match c {
            '(' => balance += 1,
            ')' => balance -= 1,
            _ => {}
        }
    }
    balance
}

/// Escapes double quotes so the value can be embedded in a CMake string.
pub fn escape_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Strips the M4/shell punctuation (`[ ] , $ ( )`) that macro arguments
/// drag along, leaving the bare value.
pub fn strip_garbage(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '[' | ']' | ',' | '$' | '(' | ')'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Collapses every character except letters, digits and `_` to `_`.
/// Target names canonicalized this way are unique keys in the target set.
pub fn canonicalize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Ratio-style string similarity in `[0.0, 1.0]`: twice the number of
/// matching characters over the total length of both inputs, where matches
/// are counted by recursively splitting around the longest common substring.
pub fn similarity(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a.as_bytes(), b.as_bytes()) as f64 / total as f64
}

fn matching_chars(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Longest common substring via a rolling DP row.
    let mut best_len = 0;
    let mut best_a = 0;
    let mut best_b = 0;
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut row = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                let len = prev[j] + 1;
                row[j + 1] = len;
                if len > best_len {
                    best_len = len;
                    best_a = i + 1 - len;
                    best_b = j + 1 - len;
                }
            }
        }
        prev = row;
    }
    if best_len == 0 {
        return 0;
    }
    best_len
        + matching_chars(&a[..best_a], &b[..best_b])
        + matching_chars(&a[best_a + best_len..], &b[best_b + best_len..])
}

/// Recognized C/C++ source file extensions (lowercase, without the dot).
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "cxx", "c++", "cc"];
/// Recognized header file extensions.
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hxx", "h++", "hh"];
/// Recognized resource file extensions.
pub const RESOURCE_EXTENSIONS: &[&str] = &["qrc"];

fn extension_of(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

pub fn is_source_file(name: &str) -> bool {
    extension_of(name).is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_header_file(name: &str) -> bool {
    extension_of(name).is_some_and(|e| HEADER_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_resource_file(name: &str) -> bool {
    extension_of(name).is_some_and(|e| RESOURCE_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paren_balance() {
        assert_eq!(paren_balance("AC_DEFINE(FOO, 1, [desc])"), 0);
        assert_eq!(paren_balance("AC_ARG_ENABLE(foo,"), 1);
        assert_eq!(paren_balance("[test $x = yes])"), -1);
        assert_eq!(paren_balance("no parens here"), 0);
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_quotes("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_quotes("plain"), "plain");
    }

    #[test]
    fn test_strip_garbage() {
        assert_eq!(strip_garbage("[$(FOO)],"), "FOO");
        assert_eq!(strip_garbage("  bare  "), "bare");
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("libx.a"), "libx_a");
        assert_eq!(canonicalize("my-prog"), "my_prog");
        assert_eq!(canonicalize("ok_123"), "ok_123");
    }

    #[test]
    fn test_similarity_identical() {
        assert!((similarity("ABC", "ABC") - 1.0).abs() < 1e-9);
        assert!((similarity("", "") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_disjoint() {
        assert_eq!(similarity("AAA", "BBB"), 0.0);
    }

    #[test]
    fn test_similarity_partial() {
        // "HAVE_ZLIB" vs "ZLIB" share the ZLIB block: 2*4 / (9+4)
        let s = similarity("HAVE_ZLIB", "ZLIB");
        assert!(s > SIMILARITY_THRESHOLD, "score was {s}");
    }

    #[test]
    fn test_extension_tables() {
        assert!(is_source_file("a.c"));
        assert!(is_source_file("b.CPP"));
        assert!(is_header_file("c.hpp"));
        assert!(is_resource_file("icons.qrc"));
        assert!(!is_source_file("notes.txt"));
        assert!(!is_header_file("a.c"));
    }
}
