//! Typed output segments produced by the code emitter.
//!
//! Segments are appended in walk order. Appending a segment of the same kind as
//! the last one extends it in place; nothing else is ever merged or reordered.

/// Kind of generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal output, written to the sink as a string literal.
    Markup,
    /// Embedded code copied verbatim.
    Raw,
    /// Generated statements (expression writes).
    Statement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

/// Ordered segment list with adjacency merging.
#[derive(Debug, Default, Clone)]
pub struct Segments {
    parts: Vec<Segment>,
}

impl Segments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text`, merging it into the last segment when the kinds match.
    pub fn push(&mut self, kind: SegmentKind, text: &str) {
        if let Some(last) = self.parts.last_mut()
            && last.kind == kind
        {
            // Code tokens keep to their own lines.
            if kind == SegmentKind::Raw
                && !last.text.is_empty()
                && !last.text.ends_with('\n')
                && !text.starts_with('\n')
            {
                last.text.push('\n');
            }
            last.text.push_str(text);
            return;
        }
        self.parts.push(Segment {
            kind,
            text: text.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.parts.iter()
    }

    /// Renders every segment to Rust statements writing to `w`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part.kind {
                SegmentKind::Markup => {
                    let text = part.text.trim_end_matches('\n');
                    if !text.is_empty() {
                        out.push_str(&markup_write(text));
                        out.push('\n');
                    }
                }
                SegmentKind::Raw => {
                    out.push_str(&part.text);
                    out.push('\n');
                }
                SegmentKind::Statement => out.push_str(&part.text),
            }
        }
        out
    }
}

/// A direct write of `text` as a string literal.
pub(crate) fn markup_write(text: &str) -> String {
    format!("w.write_all({text:?}.as_bytes())?;")
}
