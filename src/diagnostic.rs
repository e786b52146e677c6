use crate::span::Span;

/// A compiler diagnostic, fatal at the stage that produced it.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

/// The pipeline stage a diagnostic originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Lexical,
    Syntax,
    Semantic,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Lexical => "lexical error",
            Stage::Syntax => "syntax error",
            Stage::Semantic => "semantic error",
        }
    }
}

impl Diagnostic {
    pub fn lexical(message: String, span: Span) -> Self {
        Self::new(Stage::Lexical, message, span)
    }

    pub fn syntax(message: String, span: Span) -> Self {
        Self::new(Stage::Syntax, message, span)
    }

    pub fn semantic(message: String, span: Span) -> Self {
        Self::new(Stage::Semantic, message, span)
    }

    fn new(stage: Stage, message: String, span: Span) -> Self {
        Self {
            stage,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = ReportKind::Custom(self.stage.label(), Color::Red);

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report
            .finish()
            .eprint((filename, Source::from(source)))
            .ok();
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(10, 15);
        let d = Diagnostic::semantic("use of undeclared variable 'x'".to_string(), span);
        assert_eq!(d.stage, Stage::Semantic);
        assert_eq!(d.message, "use of undeclared variable 'x'");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::syntax("expected ';'".to_string(), Span::new(0, 5))
            .with_note("statements end with a semicolon".to_string())
            .with_help("add ';' after the expression".to_string());
        assert_eq!(d.notes.len(), 1);
        assert!(d.help.is_some());
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "int main() {\n    return x;\n}\n";
        let d = Diagnostic::semantic("use of undeclared variable 'x'".to_string(), Span::new(24, 25));
        // Render to stderr, just verify it doesn't panic
        d.render("test.c", source);
    }
}
