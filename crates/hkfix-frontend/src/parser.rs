//! Recursive-descent parser
//!
//! Parses the top level of a unit into [`ParsedUnit`]. Bodies of anything
//! other than traits and objects are skipped by bracket matching, so the
//! parser accepts far more than it models.

use crate::ast::{
    Body, Declaration, Import, ImportSelector, Interface, MemberBinding, MemberKind,
    MetadataHolder, MethodSig, OtherDecl, PackageClause, Param, ParamList, ParentRef, ReturnType,
    TypeParam, TypeRef,
};
use crate::error::ParseError;
use crate::lexer::{tokenize, Keyword, Span, Token, TokenKind};
use hkfix_source::QualifiedName;
use hkfix_symbol::{SymbolKind, TypeParamKind};

/// Syntax of one unit, before resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUnit {
    pub package: Option<PackageClause>,
    pub imports: Vec<Import>,
    pub decls: Vec<Declaration>,
    pub type_refs: Vec<TypeRef>,
}

/// Parse a whole unit
///
/// # Errors
/// Returns [`ParseError`] on lexical errors, unbalanced brackets and
/// top-level statements that are not declarations.
pub fn parse(src: &str) -> Result<ParsedUnit, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(src, &tokens);
    let mut unit = parser.unit()?;
    unit.type_refs = collect_type_refs(src, &tokens, &unit.decls);
    Ok(unit)
}

/// Parse only the package clause and top-level imports
///
/// Used to build the dependency graph before any unit is resolved. Stops at
/// the first declaration.
///
/// # Errors
/// Returns [`ParseError`] on lexical errors or a malformed header.
pub fn parse_header(src: &str) -> Result<(Option<PackageClause>, Vec<Import>), ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(src, &tokens);
    let mut package = None;
    let mut imports = Vec::new();
    loop {
        while parser.eat(TokenKind::Semi).is_some() {}
        match parser.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Package))
                if parser.nth_kind(1) != Some(TokenKind::Keyword(Keyword::Object)) =>
            {
                parser.package_clause(&mut package)?;
            }
            Some(TokenKind::Keyword(Keyword::Import)) => imports.extend(parser.import()?),
            _ => break,
        }
    }
    Ok((package, imports))
}

struct Parser<'a> {
    src: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

#[derive(Debug, Default)]
struct Modifiers {
    implicit: bool,
    case: bool,
}

const SOFT_MODIFIERS: [&str; 6] = ["inline", "opaque", "open", "transparent", "infix", "erased"];

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
        }
    }

    // ---- token access -------------------------------------------------

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_kw(&self, keyword: Keyword) -> bool {
        self.at(TokenKind::Keyword(keyword))
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            self.bump()
        } else {
            None
        }
    }

    fn text(&self, tok: Token) -> &'a str {
        tok.text(self.src)
    }

    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let offset = self.peek().map_or(self.src.len(), |t| t.span.start);
        ParseError::at(self.src, offset, message)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        self.eat(kind).ok_or_else(|| self.error(format!("expected {what}")))
    }

    fn ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(tok) if matches!(tok.kind, TokenKind::Ident | TokenKind::Op) => {
                self.bump();
                Ok((self.text(tok).to_string(), tok.span))
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    // ---- skipping -----------------------------------------------------

    /// Skip a bracketed group starting at the current opener
    fn skip_group(&mut self) -> Result<Span, ParseError> {
        let Some(open) = self.peek() else {
            return Err(self.error("expected bracket"));
        };
        let end = matching_close(self.tokens, self.pos)
            .ok_or_else(|| ParseError::at(self.src, open.span.start, "unbalanced brackets"))?;
        self.pos = end + 1;
        Ok(open.span.to(self.tokens[end].span))
    }

    /// Skip tokens up to the next statement boundary at this depth
    fn skip_rest(&mut self) -> Result<(), ParseError> {
        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::RBrace => return Ok(()),
                TokenKind::RParen | TokenKind::RBracket => {
                    return Err(self.error("unbalanced brackets"))
                }
                TokenKind::Semi => {
                    self.bump();
                    return Ok(());
                }
                TokenKind::Keyword(k) if k.starts_statement() => return Ok(()),
                TokenKind::At => return Ok(()),
                kind if kind.closer().is_some() => {
                    self.skip_group()?;
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    /// Skip one whole statement, whatever its first token
    fn skip_statement(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            Some(kind) if kind.closer().is_some() => {
                self.skip_group()?;
            }
            Some(kind) if kind.is_closer() => return Err(self.error("unbalanced brackets")),
            Some(_) => {
                self.bump();
            }
            None => return Ok(()),
        }
        self.skip_rest()
    }

    /// Consume tokens (skipping groups) until `stop` matches at this depth
    fn scan_until(&mut self, stop: impl Fn(TokenKind) -> bool) -> Result<Option<Span>, ParseError> {
        let mut span: Option<Span> = None;
        while let Some(tok) = self.peek() {
            if stop(tok.kind) {
                break;
            }
            let consumed = if tok.kind.closer().is_some() {
                self.skip_group()?
            } else if tok.kind.is_closer() {
                break;
            } else {
                self.bump();
                tok.span
            };
            span = Some(span.map_or(consumed, |s| s.to(consumed)));
        }
        Ok(span)
    }

    /// Skip a self-type (`self =>`, `this: Foo =>`) at the start of a body
    fn skip_self_type(&mut self) {
        if !matches!(self.peek_kind(), Some(TokenKind::Ident | TokenKind::Underscore)) {
            return;
        }
        match self.nth_kind(1) {
            Some(TokenKind::Arrow) => self.pos += 2,
            Some(TokenKind::Colon) => {
                let mut i = self.pos + 2;
                while let Some(tok) = self.tokens.get(i) {
                    match tok.kind {
                        TokenKind::Arrow => {
                            self.pos = i + 1;
                            return;
                        }
                        TokenKind::Keyword(k) if k.starts_statement() => return,
                        TokenKind::Semi | TokenKind::RBrace | TokenKind::Eq => return,
                        kind if kind.closer().is_some() => match matching_close(self.tokens, i) {
                            Some(end) => i = end + 1,
                            None => return,
                        },
                        _ => i += 1,
                    }
                }
            }
            _ => {}
        }
    }

    // ---- top level ----------------------------------------------------

    fn unit(&mut self) -> Result<ParsedUnit, ParseError> {
        let mut unit = ParsedUnit::default();
        loop {
            while self.eat(TokenKind::Semi).is_some() {}
            match self.peek_kind() {
                None => break,
                Some(TokenKind::Keyword(Keyword::Package))
                    if self.nth_kind(1) != Some(TokenKind::Keyword(Keyword::Object)) =>
                {
                    if !unit.decls.is_empty() {
                        return Err(self.error("package clause after declarations"));
                    }
                    self.package_clause(&mut unit.package)?;
                }
                Some(TokenKind::Keyword(Keyword::Import)) => unit.imports.extend(self.import()?),
                Some(_) => unit.decls.push(self.top_level_decl()?),
            }
        }
        Ok(unit)
    }

    fn package_clause(&mut self, package: &mut Option<PackageClause>) -> Result<(), ParseError> {
        let kw = self.bump().ok_or_else(|| self.error("expected package"))?;
        let (name, span) = self.qualid("package name")?;
        if self.at(TokenKind::LBrace) {
            return Err(self.error("package blocks are not supported"));
        }
        let span = kw.span.to(span);
        *package = Some(match package.take() {
            Some(outer) => PackageClause {
                name: QualifiedName::new(
                    outer
                        .name
                        .segments()
                        .iter()
                        .chain(name.segments())
                        .cloned()
                        .collect(),
                ),
                span: outer.span.to(span),
            },
            None => PackageClause { name, span },
        });
        Ok(())
    }

    fn qualid(&mut self, what: &str) -> Result<(QualifiedName, Span), ParseError> {
        let (first, mut span) = self.ident(what)?;
        let mut segments = vec![first];
        while self.at(TokenKind::Dot) && self.nth_kind(1) == Some(TokenKind::Ident) {
            self.bump();
            let (seg, seg_span) = self.ident(what)?;
            segments.push(seg);
            span = span.to(seg_span);
        }
        Ok((QualifiedName::new(segments), span))
    }

    fn import(&mut self) -> Result<Vec<Import>, ParseError> {
        let kw = self.expect(TokenKind::Keyword(Keyword::Import), "import")?;
        let mut imports = Vec::new();
        let mut start = kw.span.start;
        loop {
            imports.push(self.import_clause(start)?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
            start = self.peek().map_or(self.src.len(), |t| t.span.start);
        }
        Ok(imports)
    }

    fn import_clause(&mut self, start: usize) -> Result<Import, ParseError> {
        let (first, _) = self.ident("import path")?;
        let mut segments = vec![first];
        let mut selectors = Vec::new();
        loop {
            if self.eat(TokenKind::Dot).is_none() {
                // `import a.b.C`: the last segment is the selector
                let name = segments.pop().unwrap_or_default();
                let rename = self.import_rename()?;
                selectors.push(ImportSelector::Name { name, rename });
                break;
            }
            match self.peek() {
                Some(tok) if tok.kind == TokenKind::Ident => {
                    self.bump();
                    segments.push(self.text(tok).to_string());
                }
                Some(tok)
                    if tok.kind == TokenKind::Underscore
                        || (tok.kind == TokenKind::Op && self.text(tok) == "*")
                        || tok.is_keyword(Keyword::Given) =>
                {
                    self.bump();
                    selectors.push(ImportSelector::Wildcard);
                    break;
                }
                Some(tok) if tok.kind == TokenKind::Op => {
                    // `import cats.~>`: symbolic names only end a path
                    self.bump();
                    let name = self.text(tok).to_string();
                    let rename = self.import_rename()?;
                    selectors.push(ImportSelector::Name { name, rename });
                    break;
                }
                Some(tok) if tok.kind == TokenKind::LBrace => {
                    self.bump();
                    selectors = self.import_selectors()?;
                    break;
                }
                _ => return Err(self.error("expected import selector")),
            }
        }
        Ok(Import {
            prefix: QualifiedName::new(segments),
            selectors,
            span: Span::new(start, self.last_end()),
        })
    }

    fn import_rename(&mut self) -> Result<Option<String>, ParseError> {
        let arrow = self.at(TokenKind::Arrow)
            || self
                .peek()
                .is_some_and(|t| t.kind == TokenKind::Ident && self.text(t) == "as");
        if !arrow {
            return Ok(None);
        }
        self.bump();
        match self.bump() {
            Some(tok) if matches!(tok.kind, TokenKind::Ident | TokenKind::Underscore) => {
                Ok(Some(self.text(tok).to_string()))
            }
            _ => Err(self.error("expected import alias")),
        }
    }

    fn import_selectors(&mut self) -> Result<Vec<ImportSelector>, ParseError> {
        let mut selectors = Vec::new();
        loop {
            match self.peek() {
                Some(tok) if tok.kind == TokenKind::RBrace => {
                    self.bump();
                    return Ok(selectors);
                }
                Some(tok)
                    if tok.kind == TokenKind::Underscore
                        || (tok.kind == TokenKind::Op && self.text(tok) == "*")
                        || tok.is_keyword(Keyword::Given) =>
                {
                    self.bump();
                    selectors.push(ImportSelector::Wildcard);
                }
                Some(tok) if matches!(tok.kind, TokenKind::Ident | TokenKind::Op) => {
                    self.bump();
                    let name = self.text(tok).to_string();
                    let rename = self.import_rename()?;
                    selectors.push(ImportSelector::Name { name, rename });
                }
                _ => return Err(self.error("expected import selector")),
            }
            if self.eat(TokenKind::Comma).is_none() && !self.at(TokenKind::RBrace) {
                return Err(self.error("expected `,` or `}` in import selectors"));
            }
        }
    }

    fn modifiers(&mut self) -> Result<Modifiers, ParseError> {
        let mut mods = Modifiers::default();
        loop {
            let Some(tok) = self.peek() else {
                return Ok(mods);
            };
            match tok.kind {
                TokenKind::At => {
                    self.bump();
                    self.qualid("annotation")?;
                    if self.at(TokenKind::LBracket) {
                        self.skip_group()?;
                    }
                    while self.at(TokenKind::LParen) {
                        self.skip_group()?;
                    }
                }
                TokenKind::Keyword(
                    Keyword::Override
                    | Keyword::Sealed
                    | Keyword::Abstract
                    | Keyword::Final
                    | Keyword::Lazy,
                ) => {
                    self.bump();
                }
                TokenKind::Keyword(Keyword::Implicit) => {
                    self.bump();
                    mods.implicit = true;
                }
                TokenKind::Keyword(Keyword::Private | Keyword::Protected) => {
                    self.bump();
                    if self.at(TokenKind::LBracket) {
                        self.skip_group()?;
                    }
                }
                TokenKind::Keyword(Keyword::Case)
                    if matches!(
                        self.nth_kind(1),
                        Some(TokenKind::Keyword(Keyword::Class | Keyword::Object))
                    ) =>
                {
                    self.bump();
                    mods.case = true;
                }
                TokenKind::Ident
                    if SOFT_MODIFIERS.contains(&self.text(tok))
                        && matches!(self.nth_kind(1), Some(TokenKind::Keyword(k)) if k.is_definition()) =>
                {
                    self.bump();
                }
                _ => return Ok(mods),
            }
        }
    }

    fn top_level_decl(&mut self) -> Result<Declaration, ParseError> {
        if self.at_kw(Keyword::Package) {
            // package object
            let kw = self.bump().ok_or_else(|| self.error("expected package"))?;
            self.bump();
            let name = self.ident("package object name").ok().map(|(n, _)| n);
            self.skip_rest()?;
            return Ok(Declaration::Other(OtherDecl {
                keyword: "package object".into(),
                name,
                symbol_kind: None,
                span: Span::new(kw.span.start, self.last_end()),
            }));
        }

        let mods = self.modifiers()?;
        match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Trait)) => Ok(Declaration::Interface(self.interface()?)),
            Some(TokenKind::Keyword(Keyword::Object)) if !mods.case => {
                Ok(Declaration::MetadataHolder(self.holder()?))
            }
            Some(TokenKind::Keyword(k)) if k.is_definition() => Ok(Declaration::Other(self.other_decl(k, &mods)?)),
            _ => Err(self.error("expected declaration")),
        }
    }

    fn other_decl(&mut self, keyword: Keyword, mods: &Modifiers) -> Result<OtherDecl, ParseError> {
        let kw = self.bump().ok_or_else(|| self.error("expected declaration"))?;
        let name = match self.peek() {
            Some(tok) if matches!(tok.kind, TokenKind::Ident | TokenKind::Op) => {
                self.bump();
                Some(self.text(tok).to_string())
            }
            _ => None,
        };
        self.skip_rest()?;

        let symbol_kind = match keyword {
            Keyword::Class | Keyword::Enum => Some(SymbolKind::Class),
            Keyword::Type => Some(SymbolKind::TypeAlias),
            _ => Some(SymbolKind::Value),
        };
        let text = self.text(kw);
        Ok(OtherDecl {
            keyword: if mods.case { format!("case {text}") } else { text.to_string() },
            name,
            symbol_kind,
            span: Span::new(kw.span.start, self.last_end()),
        })
    }

    // ---- traits -------------------------------------------------------

    fn interface(&mut self) -> Result<Interface, ParseError> {
        let kw = self.expect(TokenKind::Keyword(Keyword::Trait), "trait")?;
        let (name, name_span) = self.ident("trait name")?;

        let (type_params, type_params_span) = if self.at(TokenKind::LBracket) {
            let (params, span) = self.type_params()?;
            (params, Some(span))
        } else {
            (Vec::new(), None)
        };
        while self.at(TokenKind::LParen) {
            self.skip_group()?;
        }

        let parents = if self.eat(TokenKind::Keyword(Keyword::Extends)).is_some() {
            self.parents()?
        } else {
            Vec::new()
        };

        let mut methods = Vec::new();
        let mut has_concrete_members = false;
        let body = if self.at(TokenKind::LBrace) {
            Some(self.trait_body(&mut methods, &mut has_concrete_members)?)
        } else {
            None
        };

        Ok(Interface {
            name,
            name_span,
            span: Span::new(kw.span.start, self.last_end()),
            type_params,
            type_params_span,
            parents,
            methods,
            has_concrete_members,
            body,
        })
    }

    fn type_params(&mut self) -> Result<(Vec<TypeParam>, Span), ParseError> {
        let open = self.expect(TokenKind::LBracket, "`[`")?;
        let mut params = Vec::new();
        loop {
            if let Some(tok) = self.peek() {
                if tok.kind == TokenKind::Op && matches!(self.text(tok), "+" | "-") {
                    self.bump();
                }
            }
            let start = self.peek().map_or(self.src.len(), |t| t.span.start);
            let name = match self.peek() {
                Some(tok) if matches!(tok.kind, TokenKind::Ident | TokenKind::Underscore) => {
                    self.bump();
                    self.text(tok).to_string()
                }
                _ => return Err(self.error("expected type parameter")),
            };
            let kind = if self.at(TokenKind::LBracket) {
                self.skip_group()?;
                TypeParamKind::HigherKinded
            } else {
                TypeParamKind::Proper
            };
            // bounds: `<: A`, `: Monad`
            self.scan_until(|k| matches!(k, TokenKind::Comma | TokenKind::RBracket))?;
            params.push(TypeParam {
                name,
                kind,
                span: Span::new(start, self.last_end()),
            });

            if self.eat(TokenKind::Comma).is_none() {
                let close = self.expect(TokenKind::RBracket, "`]`")?;
                return Ok((params, open.span.to(close.span)));
            }
        }
    }

    fn parents(&mut self) -> Result<Vec<ParentRef>, ParseError> {
        let mut parents = Vec::new();
        loop {
            let (name, mut span) = self.qualid("parent type")?;
            let mut type_args = None;
            if self.at(TokenKind::LBracket) {
                let group = self.skip_group()?;
                type_args = Some(Span::new(group.start + 1, group.end - 1).text(self.src).trim().to_string());
                span = span.to(group);
            }
            while self.at(TokenKind::LParen) {
                span = span.to(self.skip_group()?);
            }
            parents.push(ParentRef {
                name,
                type_args,
                span,
            });
            if self.eat(TokenKind::Keyword(Keyword::With)).is_none() && self.eat(TokenKind::Comma).is_none() {
                return Ok(parents);
            }
        }
    }

    fn open_body(&mut self) -> Result<usize, ParseError> {
        let open = self.expect(TokenKind::LBrace, "`{`")?;
        self.skip_self_type();
        Ok(open.span.start)
    }

    fn close_body(&mut self, open: usize) -> Result<Option<Body>, ParseError> {
        while self.eat(TokenKind::Semi).is_some() {}
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::RBrace => {
                self.bump();
                Ok(Some(Body {
                    open,
                    close: tok.span.start,
                }))
            }
            Some(_) => Ok(None),
            None => Err(ParseError::at(self.src, open, "unclosed body")),
        }
    }

    fn trait_body(&mut self, methods: &mut Vec<MethodSig>, concrete: &mut bool) -> Result<Body, ParseError> {
        let open = self.open_body()?;
        loop {
            if let Some(body) = self.close_body(open)? {
                return Ok(body);
            }
            self.modifiers()?;
            match self.peek_kind() {
                Some(TokenKind::Keyword(Keyword::Def)) => {
                    let (sig, is_abstract) = self.method()?;
                    if is_abstract {
                        methods.push(sig);
                    } else {
                        *concrete = true;
                    }
                }
                Some(TokenKind::Keyword(Keyword::Import)) => {
                    self.import()?;
                }
                _ => {
                    *concrete = true;
                    self.skip_statement()?;
                }
            }
        }
    }

    fn method(&mut self) -> Result<(MethodSig, bool), ParseError> {
        let kw = self.expect(TokenKind::Keyword(Keyword::Def), "def")?;
        let (name, _) = self.ident("method name")?;

        let (type_params, type_params_text) = if self.at(TokenKind::LBracket) {
            let (params, span) = self.type_params()?;
            let inner = Span::new(span.start + 1, span.end - 1).text(self.src).trim().to_string();
            (params, Some(inner))
        } else {
            (Vec::new(), None)
        };

        let mut params = Vec::new();
        while self.at(TokenKind::LParen) {
            params.push(self.param_list()?);
        }

        let ret = if self.eat(TokenKind::Colon).is_some() {
            Some(self.return_type()?)
        } else {
            None
        };
        let span = Span::new(kw.span.start, self.last_end());

        let is_abstract = match self.peek_kind() {
            Some(TokenKind::Eq) => {
                self.bump();
                self.skip_statement()?;
                false
            }
            Some(TokenKind::LBrace) => {
                self.skip_group()?;
                false
            }
            _ => true,
        };

        Ok((
            MethodSig {
                name,
                span,
                type_params,
                type_params_text,
                params,
                ret,
            },
            is_abstract,
        ))
    }

    fn param_list(&mut self) -> Result<ParamList, ParseError> {
        let open = self.expect(TokenKind::LParen, "`(`")?;
        let using = match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident && self.text(tok) == "using" => {
                self.bump();
                true
            }
            _ => false,
        };
        let implicit = using || self.eat(TokenKind::Keyword(Keyword::Implicit)).is_some();

        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            self.modifiers()?;
            if self.at_kw(Keyword::Val) || self.at_kw(Keyword::Var) {
                self.bump();
            }
            let name = match self.peek() {
                Some(tok)
                    if matches!(tok.kind, TokenKind::Ident | TokenKind::Underscore)
                        && self.nth_kind(1) == Some(TokenKind::Colon) =>
                {
                    self.pos += 2;
                    self.text(tok).to_string()
                }
                // anonymous context parameter: `(using Foo)`
                _ => "_".to_string(),
            };
            let ty = self
                .scan_until(|k| matches!(k, TokenKind::Comma | TokenKind::RParen | TokenKind::Eq))?
                .ok_or_else(|| self.error("expected parameter type"))?;
            if self.eat(TokenKind::Eq).is_some() {
                self.scan_until(|k| matches!(k, TokenKind::Comma | TokenKind::RParen))?;
            }
            params.push(Param {
                name,
                ty: ty.text(self.src).trim().to_string(),
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::RParen, "`)`")?;

        Ok(ParamList {
            implicit,
            using,
            params,
            span: open.span.to(close.span),
        })
    }

    fn return_type(&mut self) -> Result<ReturnType, ParseError> {
        let stop = |k: TokenKind| match k {
            TokenKind::Eq | TokenKind::LBrace | TokenKind::Semi | TokenKind::At => true,
            TokenKind::Keyword(k) => k.starts_statement(),
            _ => false,
        };

        let start = self.peek().map_or(self.src.len(), |t| t.span.start);
        let (head_name, head_span) = match self.peek_kind() {
            Some(TokenKind::Ident) => self.qualid("return type")?,
            _ => {
                let span = self
                    .scan_until(stop)?
                    .ok_or_else(|| self.error("expected return type"))?;
                return Ok(ReturnType {
                    text: span.text(self.src).trim().to_string(),
                    span,
                    head: String::new(),
                    head_span: Span::new(start, start),
                    arg: None,
                });
            }
        };

        let mut arg = None;
        if self.at(TokenKind::LBracket) {
            let group = self.skip_group()?;
            arg = Some(Span::new(group.start + 1, group.end - 1).text(self.src).trim().to_string());
        }
        if self.scan_until(stop)?.is_some() {
            arg = None;
        }

        let span = Span::new(start, self.last_end());
        Ok(ReturnType {
            text: span.text(self.src).to_string(),
            span,
            head: head_name.last().unwrap_or_default().to_string(),
            head_span,
            arg,
        })
    }

    // ---- objects ------------------------------------------------------

    fn holder(&mut self) -> Result<MetadataHolder, ParseError> {
        let kw = self.expect(TokenKind::Keyword(Keyword::Object), "object")?;
        let (name, name_span) = self.ident("object name")?;
        if self.eat(TokenKind::Keyword(Keyword::Extends)).is_some() {
            self.parents()?;
        }

        let mut members = Vec::new();
        let mut nested = Vec::new();
        let body = if self.at(TokenKind::LBrace) {
            Some(self.holder_body(&mut members, &mut nested)?)
        } else {
            None
        };

        Ok(MetadataHolder {
            name,
            name_span,
            span: Span::new(kw.span.start, self.last_end()),
            members,
            nested,
            body,
        })
    }

    fn holder_body(
        &mut self,
        members: &mut Vec<MemberBinding>,
        nested: &mut Vec<Interface>,
    ) -> Result<Body, ParseError> {
        let open = self.open_body()?;
        loop {
            if let Some(body) = self.close_body(open)? {
                return Ok(body);
            }
            let start = self.peek().map_or(self.src.len(), |t| t.span.start);
            let mods = self.modifiers()?;

            let kind = match self.peek_kind() {
                Some(TokenKind::Keyword(Keyword::Trait)) => {
                    let interface = self.interface()?;
                    members.push(MemberBinding {
                        name: interface.name.clone(),
                        kind: MemberKind::Trait,
                        implicit: mods.implicit,
                        span: Span::new(start, self.last_end()),
                    });
                    nested.push(interface);
                    continue;
                }
                Some(TokenKind::Keyword(Keyword::Import)) => {
                    self.import()?;
                    continue;
                }
                Some(TokenKind::Keyword(Keyword::Def)) => MemberKind::Def,
                Some(TokenKind::Keyword(Keyword::Val)) => MemberKind::Val,
                Some(TokenKind::Keyword(Keyword::Var)) => MemberKind::Var,
                Some(TokenKind::Keyword(Keyword::Type)) => MemberKind::Type,
                Some(TokenKind::Keyword(Keyword::Object)) => MemberKind::Object,
                Some(TokenKind::Keyword(Keyword::Class | Keyword::Enum)) => MemberKind::Class,
                _ => {
                    self.skip_statement()?;
                    continue;
                }
            };

            self.bump();
            let name = match self.peek() {
                Some(tok) if matches!(tok.kind, TokenKind::Ident | TokenKind::Op) => {
                    self.bump();
                    Some(self.text(tok).to_string())
                }
                _ => None,
            };
            self.skip_rest()?;
            if let Some(name) = name {
                members.push(MemberBinding {
                    name,
                    kind,
                    implicit: mods.implicit,
                    span: Span::new(start, self.last_end()),
                });
            }
        }
    }
}

/// Index of the token closing the group opened at `open`
pub(crate) fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut stack = vec![tokens.get(open)?.kind.closer()?];
    for (i, tok) in tokens.iter().enumerate().skip(open + 1) {
        if let Some(closer) = tok.kind.closer() {
            stack.push(closer);
        } else if tok.kind.is_closer() {
            if stack.pop() != Some(tok.kind) {
                return None;
            }
            if stack.is_empty() {
                return Some(i);
            }
        }
    }
    None
}

/// Collect `Name[` references outside definition positions
fn collect_type_refs(src: &str, tokens: &[Token], decls: &[Declaration]) -> Vec<TypeRef> {
    let holders: Vec<(&str, Span)> = decls
        .iter()
        .filter_map(Declaration::as_holder)
        .filter_map(|h| h.body.map(|b| (h.name.as_str(), b.span())))
        .collect();

    let mut skip = vec![false; tokens.len()];
    for (i, tok) in tokens.iter().enumerate() {
        let TokenKind::Keyword(k) = tok.kind else {
            continue;
        };
        let is_name = |j: usize| {
            tokens
                .get(j)
                .is_some_and(|t| matches!(t.kind, TokenKind::Ident | TokenKind::Op))
        };
        if !k.is_definition() || !is_name(i + 1) {
            continue;
        }
        skip[i + 1] = true;
        if tokens.get(i + 2).map(|t| t.kind) == Some(TokenKind::LBracket) {
            if let Some(end) = matching_close(tokens, i + 2) {
                skip[i + 2..=end].iter_mut().for_each(|s| *s = true);
            }
        }
    }

    tokens
        .windows(2)
        .enumerate()
        .filter(|(i, pair)| {
            !skip[*i] && pair[0].kind == TokenKind::Ident && pair[1].kind == TokenKind::LBracket
        })
        .map(|(_, pair)| {
            let tok = pair[0];
            TypeRef {
                name: tok.text(src).to_string(),
                span: tok.span,
                enclosing_holder: holders
                    .iter()
                    .find(|(_, body)| body.contains(tok.span.start))
                    .map(|(name, _)| (*name).to_string()),
            }
        })
        .collect()
}
