//! JavaScript punctuator lexer using logos.
//!
//! The swc AST records spans for nodes but not for the operator tokens
//! between them (`a + b`, `case x:`, `a?.b`). This lexer recovers them: it is
//! started at a node boundary and scans forward over whitespace, comments and
//! closing parentheses until it reaches the token being looked for.
//!
//! It is not a full JavaScript tokenizer. Regular expressions, template
//! contents and the `/` ambiguity are never scanned, because lookups only
//! ever cross the gap between two sibling nodes.

use logos::Logos;
use source_range::Span;
use text_size::TextSize;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span of the token in the source.
    pub span: Span,
}

/// Token kinds for JavaScript punctuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos, Default)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum TokenKind {
    // === Grouping ===
    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `{`
    #[token("{")]
    LBrace,

    /// `}`
    #[token("}")]
    RBrace,

    /// `[`
    #[token("[")]
    LBracket,

    /// `]`
    #[token("]")]
    RBracket,

    // === Separators ===
    /// `;`
    #[token(";")]
    Semi,

    /// `,`
    #[token(",")]
    Comma,

    /// `:`
    #[token(":")]
    Colon,

    /// `.`
    #[token(".")]
    Dot,

    /// `...`
    #[token("...")]
    Spread,

    /// `?`
    #[token("?")]
    Question,

    /// `?.`
    #[token("?.")]
    QuestionDot,

    /// `=>`
    #[token("=>")]
    Arrow,

    // === Arithmetic ===
    /// `+`
    #[token("+")]
    Plus,

    /// `-`
    #[token("-")]
    Minus,

    /// `*`
    #[token("*")]
    Star,

    /// `/`
    #[token("/")]
    Slash,

    /// `%`
    #[token("%")]
    Percent,

    /// `**`
    #[token("**")]
    StarStar,

    /// `++`
    #[token("++")]
    PlusPlus,

    /// `--`
    #[token("--")]
    MinusMinus,

    // === Comparison ===
    /// `<`
    #[token("<")]
    Lt,

    /// `>`
    #[token(">")]
    Gt,

    /// `<=`
    #[token("<=")]
    LtEq,

    /// `>=`
    #[token(">=")]
    GtEq,

    /// `==`
    #[token("==")]
    EqEq,

    /// `!=`
    #[token("!=")]
    NotEq,

    /// `===`
    #[token("===")]
    EqEqEq,

    /// `!==`
    #[token("!==")]
    NotEqEq,

    // === Bitwise and logical ===
    /// `<<`
    #[token("<<")]
    Shl,

    /// `>>`
    #[token(">>")]
    Shr,

    /// `>>>`
    #[token(">>>")]
    UShr,

    /// `&`
    #[token("&")]
    Amp,

    /// `|`
    #[token("|")]
    Pipe,

    /// `^`
    #[token("^")]
    Caret,

    /// `~`
    #[token("~")]
    Tilde,

    /// `!`
    #[token("!")]
    Bang,

    /// `&&`
    #[token("&&")]
    AmpAmp,

    /// `||`
    #[token("||")]
    PipePipe,

    /// `??`
    #[token("??")]
    QuestionQuestion,

    // === Assignment ===
    /// `=`
    #[token("=")]
    Eq,

    /// `+=`, `-=`, `*=`, `/=`, `%=`, `**=`, `<<=`, `>>=`, `>>>=`, `&=`, `|=`,
    /// `^=`, `&&=`, `||=`, `??=`
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("**=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token(">>>=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("&&=")]
    #[token("||=")]
    #[token("??=")]
    CompoundAssign,

    // === Atoms ===
    /// `#`
    #[token("#")]
    Hash,

    /// `` ` ``
    #[token("`")]
    Backtick,

    /// An identifier or keyword.
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Ident,

    /// A numeric literal.
    #[regex(r"[0-9][0-9a-zA-Z_.]*")]
    Number,

    /// A quoted string literal.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    String,

    /// End of file
    Eof,

    /// Invalid/unknown token
    #[default]
    Error,
}

impl TokenKind {
    /// Returns true for the tokens a lookup steps over to reach the operator
    /// that follows a parenthesized operand.
    pub fn is_closing_paren(&self) -> bool {
        matches!(self, TokenKind::RParen)
    }
}

/// A lexer over JavaScript source, optionally started mid-file.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    base: u32,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            base: 0,
            finished: false,
        }
    }

    /// Creates a lexer that starts at byte `offset` of `source`.
    ///
    /// Token spans stay relative to the whole of `source`. Returns `None`
    /// when `offset` is not a character boundary.
    pub fn at(source: &'src str, offset: usize) -> Option<Self> {
        let rest = source.get(offset..)?;
        Some(Self {
            inner: TokenKind::lexer(rest),
            source,
            base: offset as u32,
            finished: false,
        })
    }

    /// Returns the source string being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Returns the text of the current token.
    pub fn slice(&self) -> &'src str {
        self.inner.slice()
    }

    fn span(&self) -> Span {
        let span = self.inner.span();
        Span::new(
            TextSize::from(self.base + span.start as u32),
            TextSize::from(self.base + span.end as u32),
        )
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(Ok(kind)) => Some(Token {
                kind,
                span: self.span(),
            }),
            Some(Err(())) => Some(Token {
                kind: TokenKind::Error,
                span: self.span(),
            }),
            None => {
                self.finished = true;
                let end = TextSize::from(self.source.len() as u32);
                Some(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(end, end),
                })
            }
        }
    }
}

/// Finds the token spelled `expected` that follows `offset`.
///
/// Whitespace, comments and closing parentheses are skipped. Any other token
/// in between means the lookup failed and `None` is returned.
pub fn find_token(source: &str, offset: usize, expected: &str) -> Option<Span> {
    let mut lexer = Lexer::at(source, offset)?;
    loop {
        let token = lexer.next()?;
        if token.kind == TokenKind::Eof {
            return None;
        }
        if token.span.text(source) == Some(expected) {
            return Some(token.span);
        }
        if !token.kind.is_closing_paren() {
            return None;
        }
    }
}
