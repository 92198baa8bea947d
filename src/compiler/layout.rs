//! Composition of a template's writer body from its sections.
//!
//! A template without a layout and without named sections keeps its body
//! inline. Otherwise every section becomes a closure over the sink, and the
//! writer either runs `body` or delegates to the layout's writer function,
//! handing it the sections and parameters it declares.

use super::directive::{Param, ParamKind};
use super::sections::{BODY, Sections};

/// Argument passed for a layout section the template does not provide.
const EMPTY_SECTION: &str = "&razorc::runtime::empty_section";

/// Argument passed for a layout value the template does not provide.
const EMPTY_VALUE: &str = "\"\"";

/// The delegating call into a parent layout.
#[derive(Debug, Clone)]
pub struct LayoutCall<'a> {
    /// Module path of the layout's generated code, `layout::base`.
    pub module: String,
    /// The layout's writer function, `WriteBase`.
    pub function: String,
    /// The layout's declared parameters; empty when unknown.
    pub params: &'a [Param],
}

impl LayoutCall<'_> {
    pub fn target(&self) -> String {
        format!("{}::{}", self.module, self.function)
    }
}

/// Renders the writer body for `sections`.
pub fn compose(sections: &Sections, params: &[Param], call: Option<&LayoutCall<'_>>) -> String {
    let mut out = String::new();

    if call.is_none() && sections.only_body() {
        for line in sections.body() {
            out.push_str(line);
            out.push('\n');
        }
        return out;
    }

    for (name, lines) in sections.iter() {
        out.push_str(&format!(
            "let {name} = |w: &mut dyn io::Write| -> io::Result<()> {{\n"
        ));
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("Ok(())\n};\n");
    }

    match call {
        None => out.push_str(&format!("{BODY}(w)?;\n")),
        Some(call) => {
            let mut args = vec!["w".to_string()];
            args.extend(layout_arguments(sections, params, call.params));
            out.push_str(&format!("{}({})?;\n", call.target(), args.join(", ")));
        }
    }

    out
}

/// Arguments for the layout's writer, after the sink.
///
/// Each layout parameter takes the same-named section, else the same-named
/// template parameter, else an empty value. A layout with no known parameters
/// receives every section, body first.
pub fn layout_arguments(sections: &Sections, params: &[Param], layout: &[Param]) -> Vec<String> {
    if layout.is_empty() {
        return sections.names().map(|name| format!("&{name}")).collect();
    }

    layout
        .iter()
        .map(|wanted| {
            if sections.contains(&wanted.name) {
                format!("&{}", wanted.name)
            } else if params.iter().any(|p| p.name == wanted.name) {
                wanted.name.clone()
            } else if wanted.kind == ParamKind::Section {
                EMPTY_SECTION.to_string()
            } else {
                EMPTY_VALUE.to_string()
            }
        })
        .collect()
}
