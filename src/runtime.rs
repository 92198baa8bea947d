//! Helpers called by generated template code.
//!
//! Generated writers take a `&mut dyn io::Write` sink. Layout sections are
//! passed around as [`Section`] closures over that sink.

use std::fmt::Display;
use std::io;

/// A named piece of output that writes itself to a sink.
pub type Section<'a> = &'a dyn Fn(&mut dyn io::Write) -> io::Result<()>;

/// A section that writes nothing.
pub fn empty_section(_w: &mut dyn io::Write) -> io::Result<()> {
    Ok(())
}

/// Renders a section into a string.
pub fn section_string(section: Section<'_>) -> String {
    let mut buffer = Vec::new();
    let _ = section(&mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// HTML-escapes the displayed form of `value`.
pub fn html_escape<T: Display + ?Sized>(value: &T) -> String {
    let text = value.to_string();
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match escaped(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Writes the HTML-escaped displayed form of `value` to `w`.
pub fn html_escape_writer<T: Display + ?Sized>(w: &mut dyn io::Write, value: &T) -> io::Result<()> {
    let text = value.to_string();
    let mut last = 0;
    for (idx, c) in text.char_indices() {
        if let Some(entity) = escaped(c) {
            w.write_all(text[last..idx].as_bytes())?;
            w.write_all(entity.as_bytes())?;
            last = idx + c.len_utf8();
        }
    }
    w.write_all(text[last..].as_bytes())
}

fn escaped(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '\'' => Some("&#39;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&#34;"),
        '\0' => Some("\u{FFFD}"),
        _ => None,
    }
}
