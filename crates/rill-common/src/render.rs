//! Ariadne-based rendering of [`Diagnostic`] records.
//!
//! The compiler itself never prints; this module is the convenience layer
//! for callers that want human-readable output. Rendering is colorless so
//! output is stable in snapshots and logs.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::diagnostics::{Diagnostic, Severity};
use crate::span::Span;

fn span_range(span: &Span) -> Range<usize> {
    span.start.offset as usize..span.end.offset as usize
}

fn report_kind(severity: Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
    }
}

/// Render a diagnostic against its source text.
///
/// `source` must be the text of the file the diagnostic's span refers to.
/// Spans are clamped to the source bounds so a stale diagnostic renders
/// degraded rather than panicking.
pub fn render_diagnostic(diagnostic: &Diagnostic, source: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        // Ariadne needs at least a 1-char span.
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let primary = clamp(span_range(&diagnostic.span));

    let mut builder = Report::build(report_kind(diagnostic.severity), primary.clone())
        .with_code(diagnostic.code.as_str())
        .with_message(&diagnostic.message)
        .with_config(config);

    builder.add_label(
        Label::new(primary)
            .with_message(&diagnostic.message)
            .with_color(Color::Red),
    );

    for related in &diagnostic.related {
        builder.add_label(
            Label::new(clamp(span_range(&related.span)))
                .with_message(&related.message)
                .with_color(Color::Blue),
        );
    }

    if let Some(hint) = diagnostic.hints.first() {
        builder.set_help(hint.clone());
    }

    let report = builder.finish();

    let mut buf = Vec::new();
    let cache = Source::from(source);
    report.write(cache, &mut buf).expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}
