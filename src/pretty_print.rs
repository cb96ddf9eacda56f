use crate::Outcome;
use crate::environment::BindingError;
use crate::evaluator::{CheckResult, DefinitionResult, FormResult};
use crate::source::Span;
use crate::value::ValueError;
use ariadne::{Color, Label, Report, ReportKind, Source};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    FailedTest,
}

/// A failing top-level form, located in the source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Span of the whole top-level form.
    pub span: Span,
    /// The line the printer shows for this form.
    pub message: String,
    /// The sub-form the failure was reported against, rendered.
    pub form: Option<String>,
}

fn context(error: &ValueError) -> Option<String> {
    error.context.as_ref().map(|expr| expr.to_string())
}

impl Diagnostic {
    /// `None` when the form succeeded.
    pub fn from_outcome(outcome: &Outcome) -> Option<Self> {
        let (severity, form) = match &outcome.result {
            FormResult::Definition(DefinitionResult::Binding { .. }) => return None,
            FormResult::Expr(Ok(_)) => return None,
            FormResult::Check(CheckResult::Success) => return None,
            FormResult::Definition(DefinitionResult::Error(BindingError::AlreadyDefined(
                name,
            ))) => (Severity::Error, Some(name.clone())),
            FormResult::Definition(DefinitionResult::Error(BindingError::Value(error)))
            | FormResult::Expr(Err(error)) => (Severity::Error, context(error)),
            FormResult::Syntax(error) => (Severity::Error, error.found().map(|s| s.to_string())),
            FormResult::Check(
                CheckResult::ActualError { error, .. }
                | CheckResult::ExpectedError(error)
                | CheckResult::WrongError { error, .. },
            ) => (Severity::FailedTest, context(error)),
            FormResult::Check(_) => (Severity::FailedTest, None),
        };
        Some(Diagnostic {
            severity,
            span: outcome.span,
            message: outcome.result.to_string(),
            form,
        })
    }

    /// Writes an annotated report to stderr. `name` labels the source,
    /// usually its file name.
    pub fn report(&self, name: &str, source: &str) -> std::io::Result<()> {
        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::FailedTest => ReportKind::Custom("Test failed", Color::Yellow),
        };
        let label = match &self.form {
            Some(form) => format!("in {}", form),
            None => "in this form".to_string(),
        };
        Report::build(kind, (name, self.span.to_range()))
            .with_message(&self.message)
            .with_label(Label::new((name, self.span.to_range())).with_message(label))
            .finish()
            .eprint((name, Source::from(source)))
    }
}
