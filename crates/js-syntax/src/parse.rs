//! Parser adapter over swc.

use crate::error::{ParseError, ParseErrorKind};
use source_range::{LineIndex, Range, Span};
use swc_common::{sync::Lrc, BytePos, FileName, SourceMap, Spanned};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_parser::{parse_file_as_program, EsSyntax, Syntax};
use text_size::TextSize;

/// Source text with a line index for range computation.
#[derive(Debug, Clone)]
pub struct SourceFile {
    text: String,
    index: LineIndex,
}

impl SourceFile {
    /// Indexes `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        Self { text, index }
    }

    /// Returns the source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the line index.
    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Resolves `span` to a reportable range.
    ///
    /// Offsets past the end are clamped to the end, so spans produced by the
    /// parser for this text always resolve.
    pub fn range(&self, span: Span) -> Range {
        let len = self.index.text_len();
        let end = span.end.min(len);
        let start = span.start.min(end);
        Range::from_index(&self.index, Span::new(start, end)).unwrap_or_default()
    }
}

/// A parsed program together with its source.
#[derive(Debug)]
pub struct ParsedProgram {
    program: Program,
    file: SourceFile,
    file_start: BytePos,
}

impl ParsedProgram {
    /// Returns the AST.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Returns the indexed source file.
    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    /// Returns the source text the program was parsed from.
    pub fn source(&self) -> &str {
        self.file.text()
    }

    /// Converts an swc span into a span local to the source text.
    pub fn span(&self, span: swc_common::Span) -> Span {
        local_span(self.file_start, span)
    }

    /// Resolves an swc span to a reportable range.
    pub fn range(&self, span: swc_common::Span) -> Range {
        self.file.range(self.span(span))
    }

    /// Returns the source text covered by an swc span.
    pub fn text(&self, span: swc_common::Span) -> &str {
        self.span(span).text(self.source()).unwrap_or_default()
    }

    /// Returns the swc position of the first byte of the source.
    pub fn file_start(&self) -> BytePos {
        self.file_start
    }
}

/// Converts an swc span to a local span given the start position of its file.
pub fn local_span(file_start: BytePos, span: swc_common::Span) -> Span {
    let start = span.lo.0.saturating_sub(file_start.0);
    let end = span.hi.0.saturating_sub(file_start.0);
    Span::new(TextSize::from(start), TextSize::from(end))
}

/// Parses a JavaScript program (script or module).
///
/// Errors the parser recovered from are treated as fatal as well: a program
/// that only parses leniently cannot be instrumented or mutated reliably.
pub fn parse(source: &str) -> Result<ParsedProgram, ParseError> {
    if u32::try_from(source.len()).is_err() {
        return Err(ParseError::new(
            ParseErrorKind::SourceTooLarge { len: source.len() },
            Span::default(),
            Range::default(),
        ));
    }

    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom("program.js".into())),
        source.to_string(),
    );
    let file_start = fm.start_pos;
    let file = SourceFile::new(source);

    let syntax = Syntax::Es(EsSyntax {
        jsx: false,
        ..Default::default()
    });

    let mut recovered = Vec::new();
    let result = parse_file_as_program(&fm, syntax, EsVersion::EsNext, None, &mut recovered);

    let error = match result {
        Ok(program) => match recovered.into_iter().next() {
            None => {
                return Ok(ParsedProgram {
                    program,
                    file,
                    file_start,
                })
            }
            Some(error) => error,
        },
        Err(error) => error,
    };

    let span = local_span(file_start, error.span());
    Err(ParseError::new(
        ParseErrorKind::SyntaxError {
            message: error.kind().msg().to_string(),
        },
        span,
        file.range(span),
    ))
}
