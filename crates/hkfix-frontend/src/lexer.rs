//! Tokenizer for the Scala subset the engine understands
//!
//! Produces a flat token stream with byte spans. Comments and whitespace are
//! dropped; literals are kept as opaque tokens so that brackets inside them
//! never unbalance the parser.

use crate::error::ParseError;
use serde::Serialize;

/// Half-open byte range `[start, end)` into the unit's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a span
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering both
    #[inline]
    #[must_use]
    pub fn to(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Check if `offset` lies inside
    #[inline]
    #[must_use]
    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Slice of `text` covered by the span
    #[inline]
    #[must_use]
    pub fn text(self, text: &str) -> &str {
        text.get(self.start..self.end).unwrap_or_default()
    }
}

/// Reserved words that shape declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Keyword {
    Package,
    Import,
    Trait,
    Object,
    Class,
    Case,
    Def,
    Val,
    Var,
    Type,
    Extends,
    With,
    Implicit,
    Override,
    Sealed,
    Abstract,
    Final,
    Private,
    Protected,
    Lazy,
    New,
    Enum,
    Given,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "package" => Self::Package,
            "import" => Self::Import,
            "trait" => Self::Trait,
            "object" => Self::Object,
            "class" => Self::Class,
            "case" => Self::Case,
            "def" => Self::Def,
            "val" => Self::Val,
            "var" => Self::Var,
            "type" => Self::Type,
            "extends" => Self::Extends,
            "with" => Self::With,
            "implicit" => Self::Implicit,
            "override" => Self::Override,
            "sealed" => Self::Sealed,
            "abstract" => Self::Abstract,
            "final" => Self::Final,
            "private" => Self::Private,
            "protected" => Self::Protected,
            "lazy" => Self::Lazy,
            "new" => Self::New,
            "enum" => Self::Enum,
            "given" => Self::Given,
            _ => return None,
        })
    }

    /// Keywords that introduce a named definition
    #[must_use]
    pub const fn is_definition(self) -> bool {
        matches!(
            self,
            Self::Trait
                | Self::Object
                | Self::Class
                | Self::Def
                | Self::Val
                | Self::Var
                | Self::Type
                | Self::Enum
                | Self::Given
        )
    }

    /// Keywords that may only start a statement
    #[must_use]
    pub const fn starts_statement(self) -> bool {
        !matches!(self, Self::Extends | Self::With | Self::New)
    }
}

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TokenKind {
    Ident,
    Keyword(Keyword),
    Literal,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Dot,
    Colon,
    Eq,
    Arrow,
    At,
    Underscore,
    Op,
}

impl TokenKind {
    /// Matching closer for an opening bracket
    #[must_use]
    pub const fn closer(self) -> Option<Self> {
        match self {
            Self::LParen => Some(Self::RParen),
            Self::LBracket => Some(Self::RBracket),
            Self::LBrace => Some(Self::RBrace),
            _ => None,
        }
    }

    /// Check if this is a closing bracket
    #[must_use]
    pub const fn is_closer(self) -> bool {
        matches!(self, Self::RParen | Self::RBracket | Self::RBrace)
    }
}

/// One token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Classification
    pub kind: TokenKind,
    /// Byte range in the source
    pub span: Span,
}

impl Token {
    /// Source text of the token (backticks stripped from quoted identifiers)
    #[must_use]
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        let raw = self.span.text(src);
        raw.strip_prefix('`')
            .and_then(|r| r.strip_suffix('`'))
            .unwrap_or(raw)
    }

    /// Check for a keyword
    #[inline]
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

const OP_CHARS: &str = "!#%&*+-/:<=>?@\\^|~";

fn is_op_char(c: char) -> bool {
    OP_CHARS.contains(c) || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Tokenize a unit
///
/// # Errors
/// Returns [`ParseError`] for unterminated comments, strings or quoted
/// identifiers and for characters outside the language.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer { src, pos: 0 }.run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn error(&self, offset: usize, message: &str) -> ParseError {
        ParseError::at(self.src, offset, message)
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let Some(c) = self.peek() else {
                break;
            };
            let kind = self.next_kind(c, tokens.last())?;
            tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
            });
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            self.eat_while(char::is_whitespace);
            if self.rest().starts_with("//") {
                self.eat_while(|c| c != '\n');
            } else if self.rest().starts_with("/*") {
                self.block_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            if self.rest().starts_with("/*") {
                depth += 1;
                self.pos += 2;
            } else if self.rest().starts_with("*/") {
                depth -= 1;
                self.pos += 2;
                if depth == 0 {
                    return Ok(());
                }
            } else if self.bump().is_none() {
                return Err(self.error(start, "unterminated block comment"));
            }
        }
    }

    fn next_kind(&mut self, c: char, prev: Option<&Token>) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let single = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semi),
            '.' if !self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => Some(TokenKind::Dot),
            _ => None,
        };
        if let Some(kind) = single {
            self.bump();
            return Ok(kind);
        }

        if c == '"' {
            // s"..." and friends: the interpolator is the identifier right before
            let interpolated = prev.is_some_and(|t| t.kind == TokenKind::Ident && t.span.end == start);
            self.string(interpolated)?;
            return Ok(TokenKind::Literal);
        }
        if c == '\'' {
            self.quote()?;
            return Ok(TokenKind::Literal);
        }
        if c == '`' {
            self.bump();
            self.eat_while(|c| c != '`' && c != '\n');
            if self.bump() != Some('`') {
                return Err(self.error(start, "unterminated quoted identifier"));
            }
            return Ok(TokenKind::Ident);
        }
        if c.is_ascii_digit() || c == '.' {
            self.number();
            return Ok(TokenKind::Literal);
        }
        if is_ident_start(c) {
            self.eat_while(is_ident_part);
            // operator suffix: `foo_=`, `unary_!`
            if self.src[..self.pos].ends_with('_') && self.peek().is_some_and(is_op_char) {
                self.eat_while(is_op_char);
            }
            let text = &self.src[start..self.pos];
            return Ok(match text {
                "_" => TokenKind::Underscore,
                _ => Keyword::from_ident(text).map_or(TokenKind::Ident, TokenKind::Keyword),
            });
        }
        if is_op_char(c) {
            self.eat_while(is_op_char);
            return Ok(match &self.src[start..self.pos] {
                "=" => TokenKind::Eq,
                "=>" | "\u{21D2}" => TokenKind::Arrow,
                ":" => TokenKind::Colon,
                "@" => TokenKind::At,
                _ => TokenKind::Op,
            });
        }
        Err(self.error(start, &format!("unexpected character {c:?}")))
    }

    fn string(&mut self, interpolated: bool) -> Result<(), ParseError> {
        let start = self.pos;
        if self.rest().starts_with("\"\"\"") {
            self.pos += 3;
            loop {
                if self.rest().starts_with("\"\"\"") {
                    self.pos += 3;
                    // closing quotes may be followed by more quotes: """a""""
                    self.eat_while(|c| c == '"');
                    return Ok(());
                }
                if interpolated && self.rest().starts_with("${") {
                    self.splice()?;
                    continue;
                }
                if self.bump().is_none() {
                    return Err(self.error(start, "unterminated string literal"));
                }
            }
        }

        self.bump();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error(start, "unterminated string literal")),
                Some('"') => {
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('$') if interpolated && self.peek_at(1) == Some('{') => self.splice()?,
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Skip a `${ ... }` splice inside an interpolated string
    fn splice(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 2;
        let mut depth = 1usize;
        while depth > 0 {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error(start, "unterminated string splice")),
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    self.bump();
                }
                Some('"') => {
                    let interpolated = self.src[..self.pos].ends_with(is_ident_part);
                    self.string(interpolated)?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    fn quote(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.bump();
        match (self.peek(), self.peek_at(1)) {
            (Some('\\'), _) => {
                self.eat_while(|c| c != '\'' && c != '\n');
                if self.bump() != Some('\'') {
                    return Err(self.error(start, "unterminated character literal"));
                }
            }
            (Some(_), Some('\'')) => {
                self.bump();
                self.bump();
            }
            // symbol literal: 'name
            (Some(c), _) if is_ident_start(c) => self.eat_while(is_ident_part),
            _ => return Err(self.error(start, "malformed character literal")),
        }
        Ok(())
    }

    fn number(&mut self) {
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+') && matches!(prev, 'e' | 'E');
            let fraction = c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit());
            if !(c.is_ascii_alphanumeric() || c == '_' || exponent_sign || fraction) {
                break;
            }
            prev = c;
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_trait_header() {
        use TokenKind::*;
        assert_eq!(
            kinds("trait Foo[F[_]] extends Bar"),
            vec![
                Keyword(super::Keyword::Trait),
                Ident,
                LBracket,
                Ident,
                LBracket,
                Underscore,
                RBracket,
                RBracket,
                Keyword(super::Keyword::Extends),
                Ident,
            ]
        );
    }

    #[test]
    fn lex_operators() {
        use TokenKind::*;
        assert_eq!(kinds("a: F ~> G = x => y"), vec![Ident, Colon, Ident, Op, Ident, Eq, Ident, Arrow, Ident]);
        assert_eq!(kinds("A <: B"), vec![Ident, Op, Ident]);
    }

    #[test]
    fn lex_skips_comments_and_keeps_literals_opaque() {
        let src = "/* a /* nested */ { */ val s = \"}\" // ]\nval c = '['";
        let toks = tokenize(src).unwrap();
        assert!(toks.iter().all(|t| !t.kind.is_closer() && t.kind.closer().is_none()));
    }

    #[test]
    fn lex_interpolated_splice() {
        let src = r#"s"${m("}")}" + x"#;
        let toks = tokenize(src).unwrap();
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[1].kind, TokenKind::Literal);
    }

    #[test]
    fn lex_quoted_identifier_text() {
        let src = "val `type` = 1";
        let toks = tokenize(src).unwrap();
        assert_eq!(toks[1].kind, TokenKind::Ident);
        assert_eq!(toks[1].text(src), "type");
    }

    #[test]
    fn lex_numbers_and_symbols() {
        use TokenKind::*;
        assert_eq!(kinds("1.5e-3 0xFF 'sym 'a' x.y"), vec![Literal, Literal, Literal, Literal, Ident, Dot, Ident]);
    }

    #[test]
    fn lex_reports_unterminated_string() {
        let err = tokenize("val x = \"abc\nval y").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unterminated"));
    }
}
