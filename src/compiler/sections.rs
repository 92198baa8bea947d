//! Splitting generated code into named sections.
//!
//! A template names a section with a block of the form
//!
//! ```text
//! section head {
//!     ...
//! }
//! ```
//!
//! The extractor works on the rendered statement text, one trimmed line at a
//! time. Everything outside a section belongs to the reserved `body` section.

use indexmap::IndexMap;

/// Name of the section holding everything outside named sections.
pub const BODY: &str = "body";

/// Ordered section name → lines. `body` is always present and always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    entries: IndexMap<String, Vec<String>>,
}

impl Sections {
    /// Splits `text` into the body and its named sections.
    pub fn extract(text: &str) -> Self {
        let mut body = Vec::new();
        let mut named: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut open: Option<(String, Vec<String>)> = None;
        let mut depth: i32 = 0;

        for line in text.lines().map(str::trim) {
            match open.take() {
                None => match section_name(line) {
                    Some(name) => {
                        open = Some((name.to_string(), Vec::new()));
                        depth = 1;
                    }
                    None => body.push(line.to_string()),
                },
                Some((name, mut lines)) => {
                    depth += BraceBalance::of(line);
                    if depth <= 0 {
                        named.insert(name, lines);
                        depth = 0;
                    } else {
                        lines.push(line.to_string());
                        open = Some((name, lines));
                    }
                }
            }
        }

        if let Some((name, lines)) = open {
            log::warn!("section `{name}` is not closed; keeping {} line(s)", lines.len());
            named.insert(name, lines);
        }

        let mut entries = IndexMap::with_capacity(named.len() + 1);
        entries.insert(BODY.to_string(), body);
        for (name, lines) in named {
            if name != BODY {
                entries.insert(name, lines);
            }
        }
        Self { entries }
    }

    pub fn body(&self) -> &[String] {
        self.get(BODY).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the template declared no named sections.
    pub fn only_body(&self) -> bool {
        self.entries.len() == 1
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, lines)| (name.as_str(), lines.as_slice()))
    }
}

/// The name of a `section <name> {` opener, if `line` is one.
fn section_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("section")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.strip_suffix('{')?.trim();
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(name)
}

/// Net change in brace depth over a line of Rust code.
struct BraceBalance;

impl BraceBalance {
    /// Counts `{` minus `}`, ignoring braces inside string and char literals.
    fn of(line: &str) -> i32 {
        let mut depth = 0;
        let mut chars = line.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '"' => {
                    while let Some(c) = chars.next() {
                        match c {
                            '\\' => {
                                chars.next();
                            }
                            '"' => break,
                            _ => {}
                        }
                    }
                }
                '\'' => {
                    // Either a char literal or a lifetime.
                    let mut probe = chars.clone();
                    match probe.next() {
                        Some('\\') => {
                            chars.next();
                            chars.next();
                            for c in chars.by_ref() {
                                if c == '\'' {
                                    break;
                                }
                            }
                        }
                        Some(_) if probe.next() == Some('\'') => {
                            chars.next();
                            chars.next();
                        }
                        _ => {}
                    }
                }
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }

        depth
    }
}
