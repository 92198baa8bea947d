//! Auto-escaping decisions for top-level expressions.

use super::directive::{LAYOUT_MODULE, Param, ParamKind};

/// Leading values that are never escaped.
const UNESCAPED: [&str; 3] = ["helper", "html", "raw"];

/// Leading marker that is dropped from the emitted expression.
pub const RAW_MARKER: &str = "raw";

/// Import the escaping call needs.
pub const RUNTIME_IMPORT: &str = "razorc::runtime";

/// How an expression's value reaches the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// HTML-escaped write.
    Escape,
    /// Plain write of the displayed value.
    Raw,
    /// The value is a section closure; it is handed the sink.
    Section,
}

impl Emission {
    /// Code placed before the expression.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Escape => "runtime::html_escape_writer(w, &(",
            Self::Raw => "write!(w, \"{}\", ",
            Self::Section => "(",
        }
    }

    /// Code placed after the expression.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Escape => "))?;\n",
            Self::Raw => ")?;\n",
            Self::Section => ")(w)?;\n",
        }
    }
}

/// Decides the [`Emission`] for leading expression values of one template.
#[derive(Debug, Clone, Copy)]
pub struct EscapeAnalyzer<'a> {
    enabled: bool,
    module: &'a str,
    params: &'a [Param],
}

impl<'a> EscapeAnalyzer<'a> {
    /// `module` is the output module name; `params` the template's declared parameters.
    pub fn new(enabled: bool, module: &'a str, params: &'a [Param]) -> Self {
        Self {
            enabled,
            module,
            params,
        }
    }

    /// Emission for an expression whose leading value is `leading`.
    pub fn decide(&self, leading: &str) -> Emission {
        if self.module == LAYOUT_MODULE
            && let Some(param) = self.params.iter().find(|p| p.name == leading)
            && param.kind == ParamKind::Section
        {
            return Emission::Section;
        }
        if !self.enabled || UNESCAPED.contains(&leading) {
            return Emission::Raw;
        }
        Emission::Escape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<Param> {
        vec![
            Param::new("body", "Section", ParamKind::Section),
            Param::new("title", "&str", ParamKind::Value),
        ]
    }

    #[test]
    fn test_markers_are_never_escaped() {
        let params = params();
        for module in ["views", "layout"] {
            let analyzer = EscapeAnalyzer::new(true, module, &params);
            for leading in ["helper", "html", "raw"] {
                assert_eq!(analyzer.decide(leading), Emission::Raw, "{module}/{leading}");
            }
        }
    }

    #[test]
    fn test_plain_values_are_escaped() {
        let params = params();
        let analyzer = EscapeAnalyzer::new(true, "views", &params);
        assert_eq!(analyzer.decide("name"), Emission::Escape);
        // Section params only matter inside layouts.
        assert_eq!(analyzer.decide("body"), Emission::Escape);
    }

    #[test]
    fn test_layout_section_params_are_writable() {
        let params = params();
        let analyzer = EscapeAnalyzer::new(true, "layout", &params);
        assert_eq!(analyzer.decide("body"), Emission::Section);
        assert_eq!(analyzer.decide("title"), Emission::Escape);
        assert_eq!(analyzer.decide("other"), Emission::Escape);
    }

    #[test]
    fn test_disabled_escaping() {
        let params = params();
        let analyzer = EscapeAnalyzer::new(false, "layout", &params);
        assert_eq!(analyzer.decide("name"), Emission::Raw);
        assert_eq!(analyzer.decide("title"), Emission::Raw);
        // Sections are handed the sink whether or not escaping is on.
        assert_eq!(analyzer.decide("body"), Emission::Section);
    }

    #[test]
    fn test_emission_wrapping() {
        let wrap = |e: Emission| format!("{}x{}", e.prefix(), e.suffix());
        assert_eq!(wrap(Emission::Escape), "runtime::html_escape_writer(w, &(x))?;\n");
        assert_eq!(wrap(Emission::Raw), "write!(w, \"{}\", x)?;\n");
        assert_eq!(wrap(Emission::Section), "(x)(w)?;\n");
    }
}
