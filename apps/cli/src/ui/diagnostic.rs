use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Invalid catalog: {message}")]
#[diagnostic(
    code(devpath::catalog::parse),
    help("Each [[tool]] needs `name` and `executable`; each [[profile]] needs `tool`.")
)]
pub struct CatalogDiagnostic {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: SourceSpan,
}

/// Builds the diagnostic for a catalog file that failed to parse. Without a
/// span from the parser the label points at the start of the file.
pub fn catalog_diagnostic(
    file_path: &str,
    file_content: &str,
    message: &str,
    span: Option<std::ops::Range<usize>>,
) -> CatalogDiagnostic {
    let span = match span {
        Some(range) => SourceSpan::new(range.start.into(), range.len()),
        None => SourceSpan::new(SourceOffset::from(0), 0),
    };

    CatalogDiagnostic {
        message: message.to_string(),
        src: NamedSource::new(file_path, file_content.to_string()),
        span,
    }
}

pub fn report_catalog_error(
    file_path: &str,
    file_content: &str,
    message: &str,
    span: Option<std::ops::Range<usize>>,
) {
    let diagnostic = catalog_diagnostic(file_path, file_content, message, span);
    eprintln!("{:?}", miette::Report::new(diagnostic));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_is_carried_over() {
        let content = "[[tool]]\nname = 3\n";
        let diagnostic = catalog_diagnostic("user.toml", content, "invalid type", Some(16..17));

        assert_eq!(diagnostic.span.offset(), 16);
        assert_eq!(diagnostic.span.len(), 1);
        assert!(diagnostic.to_string().contains("invalid type"));
    }

    #[test]
    fn missing_span_points_at_start() {
        let diagnostic = catalog_diagnostic("user.toml", "", "duplicate tool", None);
        assert_eq!(diagnostic.span.offset(), 0);
    }
}
