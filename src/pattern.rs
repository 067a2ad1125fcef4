use regex::Regex;

use crate::error::EpssError;

/// A set of shell-style glob patterns (`*`, `?`, `[seq]`, `[!seq]`) compiled
/// once and matched against whole identifiers.
#[derive(Debug, Clone)]
pub struct PatternSet {
    regexes: Vec<Regex>,
    case_sensitive: bool,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I, case_sensitive: bool) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let regexes = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&translate(&fold_case(pattern, case_sensitive))).map_err(|source| {
                    EpssError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self {
            regexes,
            case_sensitive,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty()
    }

    pub fn is_match(&self, value: &str) -> bool {
        let value = fold_case(value, self.case_sensitive);
        self.regexes.iter().any(|regex| regex.is_match(&value))
    }
}

/// Case-insensitive glob match of `value` against a single `pattern`.
pub fn matches(value: &str, pattern: &str) -> crate::Result<bool> {
    matches_with_case(value, pattern, false)
}

pub fn matches_with_case(value: &str, pattern: &str, case_sensitive: bool) -> crate::Result<bool> {
    Ok(PatternSet::new([pattern], case_sensitive)?.is_match(value))
}

/// Case-insensitive glob match of `value` against any of `patterns`.
pub fn matches_any<I, S>(value: &str, patterns: I) -> crate::Result<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(PatternSet::new(patterns, false)?.is_match(value))
}

fn fold_case(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

// Matches no character at all.
const EMPTY_CLASS: &str = r"[^\x00-\x{10FFFF}]";

/// Glob to anchored regex, following `fnmatch` rules: an unterminated `[` is a
/// literal, `]` directly after `[` or `[!` belongs to the class.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                // Collapse runs of stars
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str(r"\[");
                    continue;
                }

                let class = &chars[i..j];
                i = j + 1;
                let (negated, body) = match class.split_first() {
                    Some(('!', rest)) => (true, rest),
                    _ => (false, class),
                };
                translate_class(body, negated, &mut out);
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push('$');
    out
}

/// Emit one bracket class. Reversed ranges such as `z-a` are empty and get
/// dropped; a class left with no members matches nothing, or any single
/// character when negated.
fn translate_class(body: &[char], negated: bool, out: &mut String) {
    let mut members = String::new();
    let mut k = 0;
    while k < body.len() {
        let lo = body[k];
        if k + 2 < body.len() && body[k + 1] == '-' {
            let hi = body[k + 2];
            k += 3;
            if lo <= hi {
                push_class_char(&mut members, lo);
                members.push('-');
                push_class_char(&mut members, hi);
            }
        } else {
            k += 1;
            push_class_char(&mut members, lo);
        }
    }

    match (members.is_empty(), negated) {
        (true, true) => out.push('.'),
        (true, false) => out.push_str(EMPTY_CLASS),
        (false, negated) => {
            out.push('[');
            if negated {
                out.push('^');
            }
            out.push_str(&members);
            out.push(']');
        }
    }
}

fn push_class_char(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^' | '-') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is(value: &str, pattern: &str) -> bool {
        matches(value, pattern).unwrap()
    }

    #[test]
    fn wildcards_match_identifier_prefixes() {
        assert!(matches_any("CVE-2023-0001", ["cve-2023-*", "CVE-1999-*"]).unwrap());
        assert!(!matches_any("CVE-2023-0001", ["CVE-1999-*"]).unwrap());
        assert!(is("CVE-2023-0001", "CVE-2023-000?"));
        assert!(!is("CVE-2023-00011", "CVE-2023-000?"));
    }

    #[test]
    fn matching_ignores_case_by_default() {
        assert!(is("CVE-2023-0001", "cve-2023-0001"));
        assert!(!matches_with_case("CVE-2023-0001", "cve-2023-0001", true).unwrap());
        assert!(matches_with_case("CVE-2023-0001", "CVE-2023-0001", true).unwrap());
    }

    #[test]
    fn literal_patterns_require_exact_match() {
        assert!(!is("CVE-2023-0001", "CVE-2023-000"));
        assert!(!is("CVE-2023-0001", "VE-2023-0001"));
        assert!(is("CVE-2023.0001", "CVE-2023.0001"));
        assert!(!is("CVE-2023x0001", "CVE-2023.0001"));
    }

    #[test]
    fn bracket_classes() {
        assert!(is("CVE-2023-0001", "CVE-202[0-3]-*"));
        assert!(!is("CVE-2024-0001", "CVE-202[0-3]-*"));
        assert!(is("CVE-2024-0001", "CVE-202[!0-3]-*"));
        assert!(is("a]b", "a[]]b"));
        assert!(is("a^b", "a[\\^]b"));
    }

    #[test]
    fn dash_at_class_edges_is_literal() {
        assert!(is("a-b", "a[-x]b"));
        assert!(is("a-b", "a[x-]b"));
        assert!(!is("a-b", "a[x]b"));
    }

    #[test]
    fn reversed_ranges_are_dropped() {
        assert!(is("cve-1", "cve-[z-a1]"));
        assert!(!is("cve-m", "cve-[z-a1]"));
        assert!(is("q", "[!z-a]"));
        assert!(!is("qq", "[!z-a]"));
        assert!(!is("q", "[z-a]"));
        assert!(!is("", "[z-a]"));
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        assert!(is("CVE-[2023", "CVE-[2023"));
        assert!(!is("CVE-2023", "CVE-[2023"));
    }

    #[test]
    fn empty_pattern_set_matches_nothing() {
        let set = PatternSet::new(Vec::<String>::new(), false).unwrap();
        assert!(set.is_empty());
        assert!(!set.is_match("CVE-2023-0001"));
    }
}
