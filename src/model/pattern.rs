// Safe compilation of user-supplied search patterns, match extraction and
// HTML-safe highlighting.
//
// `compile` is the only place an untrusted pattern string becomes a matcher.
// It never panics: construction failures come back as `Compiled::Invalid`.
// The regex engine matches in linear time; the builder's size limit bounds
// the compiled program, so a hostile pattern costs at most a compile error.

use regex::{Regex, RegexBuilder};
use std::fmt;
use std::str::FromStr;

/// Upper bound on the compiled program size for user patterns.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// JS-style flag set: `g`, `i`, `m`, `s`.
///
/// Scanning is always global regardless of `global`; the flag is accepted so
/// flag strings coming from saved searches round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternFlags {
    pub global: bool,
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_all: bool,
}

impl Default for PatternFlags {
    fn default() -> Self {
        Self {
            global: true,
            case_insensitive: true,
            multi_line: false,
            dot_all: false,
        }
    }
}

impl PatternFlags {
    /// Global scan, case handling chosen by the caller's search setting.
    pub fn for_search(case_sensitive: bool) -> Self {
        Self {
            case_insensitive: !case_sensitive,
            ..Self::default()
        }
    }
}

impl FromStr for PatternFlags {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = Self {
            global: false,
            case_insensitive: false,
            multi_line: false,
            dot_all: false,
        };
        for c in s.chars() {
            let slot = match c {
                'g' => &mut flags.global,
                'i' => &mut flags.case_insensitive,
                'm' => &mut flags.multi_line,
                's' => &mut flags.dot_all,
                other => return Err(format!("Invalid flag '{}'", other)),
            };
            if *slot {
                return Err(format!("Duplicate flag '{}'", c));
            }
            *slot = true;
        }
        Ok(flags)
    }
}

impl fmt::Display for PatternFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            write!(f, "g")?;
        }
        if self.case_insensitive {
            write!(f, "i")?;
        }
        if self.multi_line {
            write!(f, "m")?;
        }
        if self.dot_all {
            write!(f, "s")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    flags: PatternFlags,
}

impl CompiledPattern {
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The source pattern as typed.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    pub fn is_case_sensitive(&self) -> bool {
        !self.flags.case_insensitive
    }
}

/// Outcome of compiling a user pattern.
///
/// `Empty` ("no pattern") is deliberately distinct from `Invalid` ("bad
/// pattern"): the first means "do not filter", the second "show the error".
#[derive(Debug, Clone)]
pub enum Compiled {
    Empty,
    Ready(CompiledPattern),
    Invalid(String),
}

impl Compiled {
    pub fn pattern(&self) -> Option<&CompiledPattern> {
        match self {
            Compiled::Ready(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_pattern(self) -> Option<CompiledPattern> {
        match self {
            Compiled::Ready(p) => Some(p),
            _ => None,
        }
    }

    /// Empty string for `Empty` and `Ready`, the compiler message otherwise.
    pub fn error(&self) -> &str {
        match self {
            Compiled::Invalid(msg) => msg,
            _ => "",
        }
    }
}

/// Compiles `pattern` with `flags`, catching every construction failure.
pub fn compile(pattern: &str, flags: PatternFlags) -> Compiled {
    if pattern.is_empty() {
        return Compiled::Empty;
    }

    let built = RegexBuilder::new(pattern)
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_all)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build();

    match built {
        Ok(regex) => {
            log::debug!("Compiled search pattern /{}/{}", pattern, flags);
            Compiled::Ready(CompiledPattern { regex, flags })
        }
        Err(e) => {
            log::debug!("Rejected search pattern /{}/: {}", pattern, e);
            Compiled::Invalid(format!("Invalid regular expression: {}", e))
        }
    }
}

/// Like [`compile`] but takes a JS-style flag string (`"gi"`).
pub fn compile_with_flag_str(pattern: &str, flags: &str) -> Compiled {
    match flags.parse::<PatternFlags>() {
        Ok(parsed) => compile(pattern, parsed),
        Err(e) if pattern.is_empty() => {
            log::debug!("Ignoring flags for empty pattern: {}", e);
            Compiled::Empty
        }
        Err(e) => Compiled::Invalid(format!("Invalid regular expression flags: {}", e)),
    }
}

/// A located match, byte offsets into the searched string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    pub text: String,
    pub index: usize,
    pub length: usize,
}

/// Every non-overlapping match, left to right.
pub fn find_matches(text: &str, pattern: Option<&CompiledPattern>) -> Vec<MatchSpan> {
    let Some(pattern) = pattern else {
        return Vec::new();
    };
    if text.is_empty() {
        return Vec::new();
    }

    pattern
        .regex
        .find_iter(text)
        .map(|m| MatchSpan {
            text: m.as_str().to_string(),
            index: m.start(),
            length: m.len(),
        })
        .collect()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Escapes `text` and wraps each non-empty match in `<mark>` tags.
///
/// Matched text is escaped as well, so markup inside a task title can never
/// reach the renderer unescaped.
pub fn highlight(text: &str, pattern: Option<&CompiledPattern>) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut cursor = 0;

    for span in find_matches(text, pattern) {
        if span.length == 0 {
            continue;
        }
        push_escaped(&mut out, &text[cursor..span.index]);
        out.push_str(MARK_OPEN);
        push_escaped(&mut out, &span.text);
        out.push_str(MARK_CLOSE);
        cursor = span.index + span.length;
    }
    push_escaped(&mut out, &text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_distinguishes_empty_from_invalid() {
        let empty = compile("", PatternFlags::default());
        assert!(matches!(empty, Compiled::Empty));
        assert!(empty.pattern().is_none());
        assert_eq!(empty.error(), "");

        let bad = compile("[", PatternFlags::default());
        assert!(bad.pattern().is_none());
        assert!(!bad.error().is_empty());

        let unbalanced = compile("(exam", PatternFlags::default());
        assert!(matches!(unbalanced, Compiled::Invalid(_)));
    }

    #[test]
    fn test_default_flags_are_case_insensitive() {
        let compiled = compile("exam", PatternFlags::default());
        let p = compiled.pattern().unwrap();
        assert!(p.is_match("Final EXAM"));
        assert!(!p.is_case_sensitive());

        let strict = compile("exam", PatternFlags::for_search(true));
        assert!(!strict.pattern().unwrap().is_match("Final EXAM"));
    }

    #[test]
    fn test_flag_strings() {
        let flags: PatternFlags = "gi".parse().unwrap();
        assert!(flags.global && flags.case_insensitive);
        assert_eq!(flags.to_string(), "gi");
        assert!("gx".parse::<PatternFlags>().is_err());
        assert!("gg".parse::<PatternFlags>().is_err());

        assert!(matches!(
            compile_with_flag_str("a", "q"),
            Compiled::Invalid(_)
        ));
        assert!(matches!(compile_with_flag_str("", "q"), Compiled::Empty));
        assert!(compile_with_flag_str("A", "i").pattern().unwrap().is_match("a"));
    }

    #[test]
    fn test_unsupported_syntax_is_reported_not_raised() {
        // Backreferences and look-around are outside the linear-time engine.
        assert!(matches!(
            compile(r"(\w+)\s+\1", PatternFlags::default()),
            Compiled::Invalid(_)
        ));
        assert!(matches!(
            compile(r"foo(?=bar)", PatternFlags::default()),
            Compiled::Invalid(_)
        ));
    }

    #[test]
    fn test_find_matches_scans_globally() {
        let compiled = compile("a", PatternFlags::default());
        let spans = find_matches("banana", compiled.pattern());
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].index, 1);
        assert_eq!(spans[2].index, 5);
        assert!(spans.iter().all(|s| s.length == 1 && s.text == "a"));

        assert!(find_matches("", compiled.pattern()).is_empty());
        assert!(find_matches("banana", None).is_empty());
    }

    #[test]
    fn test_highlight_escapes_everything() {
        let compiled = compile("b", PatternFlags::default());
        assert_eq!(
            highlight("<b>bold</b>", compiled.pattern()),
            "&lt;<mark>b</mark>&gt;<mark>b</mark>old&lt;/<mark>b</mark>&gt;"
        );

        let markup = compile("<script>", PatternFlags::default());
        assert_eq!(
            highlight("x<script>y", markup.pattern()),
            "x<mark>&lt;script&gt;</mark>y"
        );

        assert_eq!(highlight("a & 'b'", None), "a &amp; &#39;b&#39;");
    }

    #[test]
    fn test_highlight_skips_empty_matches() {
        let compiled = compile("x*", PatternFlags::default());
        assert_eq!(highlight("abxxc", compiled.pattern()), "ab<mark>xx</mark>c");
    }

    #[test]
    fn test_recompiling_is_equivalent() {
        let a = compile("fin(ish)?", PatternFlags::default());
        let b = compile("fin(ish)?", PatternFlags::default());
        let text = "Finish the final draft";
        assert_eq!(
            find_matches(text, a.pattern()),
            find_matches(text, b.pattern())
        );
    }
}
