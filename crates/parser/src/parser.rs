//! Recursive-descent parser for the declaration level of Go source.
//!
//! Bodies of functions and initializers of `var`/`const` are skipped by
//! bracket balance; everything a type checker needs to see at package scope
//! (imports, type declarations, signatures) is built into the arena.

use crate::ast::*;
use crate::error::{Diag, ParseError, ParseFailure};
use crate::lexer::{tokenize, Tok};
use crate::parser_support::{resolve_param_list, ParamDecl};

type PResult<T> = Result<T, ParseError>;

/// A parsed Go source file together with the storage its nodes live in.
#[derive(Debug)]
pub struct ParsedFile {
    pub source: String,
    pub arena: AstArena,
    pub interner: Interner,
    pub file: SourceFile,
}

impl ParsedFile {
    #[inline]
    pub fn text(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub fn package_name(&self) -> &str {
        self.text(self.file.package.sym)
    }

    fn gen_specs(&self, kind: GenDeclKind) -> impl Iterator<Item = &Spec> + '_ {
        self.arena
            .top_decls(self.file.decls)
            .iter()
            .filter_map(move |decl| match decl {
                TopLevelDecl::Gen(g) if g.kind == kind => Some(self.arena.specs_list(g.specs)),
                _ => None,
            })
            .flatten()
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportSpec> + '_ {
        self.gen_specs(GenDeclKind::Import).filter_map(|s| match s {
            Spec::Import(i) => Some(i),
            _ => None,
        })
    }

    pub fn type_specs(&self) -> impl Iterator<Item = &TypeSpec> + '_ {
        self.gen_specs(GenDeclKind::Type).filter_map(|s| match s {
            Spec::Type(t) => Some(t),
            _ => None,
        })
    }

    pub fn const_specs(&self) -> impl Iterator<Item = &ConstSpec> + '_ {
        self.gen_specs(GenDeclKind::Const).filter_map(|s| match s {
            Spec::Const(c) => Some(c),
            _ => None,
        })
    }

    pub fn funcs(&self) -> impl Iterator<Item = &FuncDecl> + '_ {
        self.arena
            .top_decls(self.file.decls)
            .iter()
            .filter_map(|decl| match decl {
                TopLevelDecl::Func(id) => Some(&self.arena.funcs[*id]),
                _ => None,
            })
    }

    /// Finds a type declaration by name.
    pub fn find_type(&self, name: &str) -> Option<&TypeSpec> {
        let sym = self.interner.get(name)?;
        self.type_specs().find(|t| t.name.sym == sym)
    }
}

/// Parses a whole Go source file.
///
/// Fails if the lexer reported anything or the declaration structure is
/// malformed; the first syntax error stops parsing.
pub fn parse_file(src: &str) -> Result<ParsedFile, ParseFailure> {
    let (toks, mut diags) = tokenize(src);
    let mut p = Parser::new(src, toks);
    let result = p.source_file();

    match result {
        Ok(file) if diags.is_empty() => Ok(ParsedFile {
            source: src.to_owned(),
            arena: p.arena,
            interner: p.interner,
            file,
        }),
        Ok(_) => Err(ParseFailure { diags }),
        Err(err) => {
            diags.push(err.diag());
            diags.sort_by_key(|d: &Diag| d.span.start);
            Err(ParseFailure { diags })
        }
    }
}

/// Expression of the `//go:build` line in the file header, if any.
///
/// Only comment lines and blank lines before the package clause are
/// considered, matching where the go tool looks for constraints.
pub fn build_constraint(src: &str) -> Option<&str> {
    let mut in_block = false;
    for line in src.lines() {
        let line = line.trim();
        if in_block {
            in_block = !line.contains("*/");
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if let Some(expr) = line.strip_prefix("//go:build") {
            return Some(expr.trim());
        }
        if line.starts_with("//") {
            continue;
        }
        if line.starts_with("/*") {
            in_block = !line.contains("*/");
            continue;
        }
        break;
    }
    None
}

struct Parser<'src> {
    src: &'src str,
    toks: Vec<(usize, Tok<'src>, usize)>,
    pos: usize,
    prev_end: usize,
    arena: AstArena,
    interner: Interner,
}

impl<'src> Parser<'src> {
    fn new(src: &'src str, toks: Vec<(usize, Tok<'src>, usize)>) -> Self {
        Self {
            src,
            toks,
            pos: 0,
            prev_end: 0,
            arena: AstArena::default(),
            interner: Interner::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Token cursor
    // -------------------------------------------------------------------------

    #[inline]
    fn peek(&self) -> Option<Tok<'src>> {
        self.peek_at(0)
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<Tok<'src>> {
        self.toks.get(self.pos + n).map(|t| t.1)
    }

    #[inline]
    fn start(&self) -> usize {
        self.toks
            .get(self.pos)
            .map(|t| t.0)
            .unwrap_or(self.src.len())
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    fn bump(&mut self) -> Option<(usize, Tok<'src>, usize)> {
        let tok = self.toks.get(self.pos).copied();
        if let Some((_, _, end)) = tok {
            self.pos += 1;
            self.prev_end = end;
        }
        tok
    }

    fn eat(&mut self, want: Tok<'_>) -> Option<Span> {
        match self.toks.get(self.pos) {
            Some(&(s, tok, e)) if tok == want => {
                self.bump();
                Some(Span::new(s, e))
            }
            _ => None,
        }
    }

    fn expect(&mut self, want: Tok<'_>, expected: &'static str) -> PResult<Span> {
        self.eat(want).ok_or_else(|| self.unexpected(expected))
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.toks.get(self.pos) {
            Some(&(s, tok, e)) => ParseError::Unexpected {
                found: tok.describe(),
                expected,
                span: Span::new(s, e),
            },
            None => ParseError::UnexpectedEof {
                expected,
                span: Span::empty_at(self.src.len()),
            },
        }
    }

    fn ident(&mut self, expected: &'static str) -> PResult<IdentName> {
        match self.toks.get(self.pos) {
            Some(&(s, Tok::Ident(text), e)) => {
                self.bump();
                Ok(IdentName {
                    sym: self.interner.intern(text),
                    pos: Span::new(s, e),
                })
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn ident_list(&mut self) -> PResult<Vec<IdentName>> {
        let mut names = vec![self.ident("identifier")?];
        while self.peek() == Some(Tok::Comma) {
            self.bump();
            names.push(self.ident("identifier")?);
        }
        Ok(names)
    }

    /// Consumes a statement terminator. A closing `)` or `}` also ends the
    /// statement and is left for the caller.
    fn semi(&mut self) -> PResult<()> {
        match self.peek() {
            None | Some(Tok::RParen | Tok::RBrace) => Ok(()),
            Some(Tok::Semi) => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(self.unexpected("`;` or newline")),
        }
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    fn source_file(&mut self) -> PResult<SourceFile> {
        while self.eat(Tok::Semi).is_some() {}
        self.expect(Tok::Package, "`package`")?;
        let package = self.ident("package name")?;
        self.semi()?;

        let mut decls = Vec::new();
        loop {
            let decl = match self.peek() {
                None => break,
                Some(Tok::Semi) => {
                    self.bump();
                    continue;
                }
                Some(Tok::Import) => TopLevelDecl::Gen(self.gen_decl(GenDeclKind::Import)?),
                Some(Tok::Const) => TopLevelDecl::Gen(self.gen_decl(GenDeclKind::Const)?),
                Some(Tok::Type) => TopLevelDecl::Gen(self.gen_decl(GenDeclKind::Type)?),
                Some(Tok::Var) => TopLevelDecl::Gen(self.gen_decl(GenDeclKind::Var)?),
                Some(Tok::Func) => TopLevelDecl::Func(self.func_decl()?),
                Some(_) => return Err(self.unexpected("declaration")),
            };
            decls.push(decl);
            match self.peek() {
                None => break,
                Some(Tok::Semi) => {
                    self.bump();
                }
                Some(_) => return Err(self.unexpected("`;` after declaration")),
            }
        }

        Ok(SourceFile {
            package,
            decls: self.arena.list_top_decls(decls),
        })
    }

    fn gen_decl(&mut self, kind: GenDeclKind) -> PResult<GenDecl> {
        let kw_pos = self.bump().map(|(s, _, e)| Span::new(s, e)).unwrap_or_default();
        let mut specs = Vec::new();
        let mut consts = ConstGroup::default();

        let grouped = self.eat(Tok::LParen).is_some();
        if grouped {
            loop {
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.bump();
                        break;
                    }
                    Some(Tok::Semi) => {
                        self.bump();
                        continue;
                    }
                    None => {
                        return Err(ParseError::Unbalanced {
                            open: "(",
                            span: kw_pos,
                        })
                    }
                    Some(_) => {}
                }
                specs.push(self.spec(kind, &mut consts)?);
                self.semi()?;
            }
        } else {
            specs.push(self.spec(kind, &mut consts)?);
        }

        Ok(GenDecl {
            kw_pos,
            kind,
            grouped,
            specs: self.arena.list_specs(specs),
        })
    }

    fn spec(&mut self, kind: GenDeclKind, consts: &mut ConstGroup) -> PResult<Spec> {
        match kind {
            GenDeclKind::Import => self.import_spec().map(Spec::Import),
            GenDeclKind::Const => self.const_spec(consts).map(Spec::Const),
            GenDeclKind::Var => self.var_spec().map(Spec::Var),
            GenDeclKind::Type => self.type_spec().map(Spec::Type),
        }
    }

    fn import_spec(&mut self) -> PResult<ImportSpec> {
        let name = match self.toks.get(self.pos) {
            Some(&(s, Tok::Dot, e)) => {
                self.bump();
                Some(ImportName::Dot(Span::new(s, e)))
            }
            Some(&(s, Tok::Ident("_"), e)) => {
                self.bump();
                Some(ImportName::Blank(Span::new(s, e)))
            }
            Some(&(_, Tok::Ident(_), _)) => Some(ImportName::Name(self.ident("package name")?)),
            _ => None,
        };

        match self.toks.get(self.pos) {
            Some(&(s, Tok::Str(lit) | Tok::RawStr(lit), e)) => {
                self.bump();
                let unquoted = lit.get(1..lit.len().saturating_sub(1)).unwrap_or("");
                Ok(ImportSpec {
                    name,
                    path: self.interner.intern(unquoted),
                    path_pos: Span::new(s, e),
                })
            }
            _ => Err(self.unexpected("import path")),
        }
    }

    fn const_spec(&mut self, group: &mut ConstGroup) -> PResult<ConstSpec> {
        let names = self.ident_list()?;
        let typ = if self.at_type_start() {
            Some(self.parse_type()?)
        } else {
            None
        };

        let value = if self.eat(Tok::Assign).is_some() {
            self.const_value()?
        } else {
            ConstValue::Implicit
        };

        let iota = group.next;
        group.next += 1;

        Ok(ConstSpec {
            names: self.arena.list_ident_names(names),
            typ,
            value,
            iota,
        })
    }

    fn const_value(&mut self) -> PResult<ConstValue> {
        let start = self.start();
        let first = self.peek();
        let single = matches!(
            self.peek_at(1),
            None | Some(Tok::Semi | Tok::RParen)
        );

        let value = match first {
            Some(Tok::Int(lit)) if single => parse_int_lit(lit).map(ConstValue::Int),
            Some(Tok::Ident("iota")) if single => Some(ConstValue::Iota),
            _ => None,
        };
        if let Some(value) = value {
            self.bump();
            return Ok(value);
        }

        self.skip_expr()?;
        Ok(ConstValue::Expr(self.span_from(start)))
    }

    fn var_spec(&mut self) -> PResult<VarSpec> {
        let names = self.ident_list()?;
        let typ = if self.at_type_start() {
            Some(self.parse_type()?)
        } else {
            None
        };
        if self.eat(Tok::Assign).is_some() {
            self.skip_expr()?;
        }
        Ok(VarSpec {
            names: self.arena.list_ident_names(names),
            typ,
        })
    }

    fn type_spec(&mut self) -> PResult<TypeSpec> {
        let name = self.ident("type name")?;
        let type_params = if self.peek() == Some(Tok::LBrack) && self.at_type_params() {
            self.type_params()?
        } else {
            ListRef::EMPTY
        };
        let alias = self.eat(Tok::Assign).is_some();
        let typ = self.parse_type()?;

        Ok(TypeSpec {
            name,
            type_params,
            alias,
            typ,
        })
    }

    /// After `type Name`, decides whether `[` opens type parameters or an
    /// array length.
    fn at_type_params(&self) -> bool {
        match (self.peek_at(1), self.peek_at(2)) {
            (Some(Tok::Ident(_)), Some(next)) => matches!(
                next,
                Tok::Ident(_)
                    | Tok::Comma
                    | Tok::Star
                    | Tok::Tilde
                    | Tok::LBrack
                    | Tok::LParen
                    | Tok::Interface
                    | Tok::Func
                    | Tok::Map
                    | Tok::Chan
                    | Tok::Struct
                    | Tok::Arrow
            ),
            _ => false,
        }
    }

    fn type_params(&mut self) -> PResult<ListRef<TypeParamDeclId>> {
        self.expect(Tok::LBrack, "`[`")?;
        let mut decls = Vec::new();
        while self.peek() != Some(Tok::RBrack) {
            let start = self.start();
            let names = self.ident_list()?;
            let constraint = self.constraint()?;
            let decl = TypeParamDecl {
                names: self.arena.list_ident_names(names),
                constraint,
            };
            decls.push(self.arena.type_param_decls.alloc(decl, self.span_from(start)));
            if self.eat(Tok::Comma).is_none() {
                break;
            }
        }
        self.expect(Tok::RBrack, "`]` closing type parameters")?;
        Ok(self.arena.list_type_param_decls(decls))
    }

    fn func_decl(&mut self) -> PResult<FuncDeclId> {
        let start = self.start();
        self.expect(Tok::Func, "`func`")?;

        let recv = if self.peek() == Some(Tok::LParen) {
            let fields = self.params()?;
            let Some(&first) = fields.first() else {
                return Err(self.unexpected("receiver"));
            };
            let field = self.arena.fields[first];
            let name = self.arena.ident_names(field.names).first().copied();
            Some(Receiver {
                name,
                typ: field.typ,
            })
        } else {
            None
        };

        let name = self.ident("function name")?;
        let type_params = if self.peek() == Some(Tok::LBrack) {
            self.type_params()?
        } else {
            ListRef::EMPTY
        };
        let sig = self.signature()?;

        let body = if self.peek() == Some(Tok::LBrace) {
            let body_start = self.start();
            self.skip_balanced()?;
            Some(self.span_from(body_start))
        } else {
            None
        };

        let decl = FuncDecl {
            recv,
            name,
            type_params,
            sig,
            body,
        };
        Ok(self.arena.funcs.alloc(decl, self.span_from(start)))
    }

    // -------------------------------------------------------------------------
    // Signatures
    // -------------------------------------------------------------------------

    fn signature(&mut self) -> PResult<SignatureId> {
        let start = self.start();
        let params = self.params()?;
        let results = if self.peek() == Some(Tok::LParen) {
            self.params()?
        } else if self.at_type_start() {
            let rstart = self.start();
            let typ = self.parse_type()?;
            let field = Field {
                names: ListRef::EMPTY,
                ellipsis_pos: None,
                typ,
                tag: None,
            };
            vec![self.arena.fields.alloc(field, self.span_from(rstart))]
        } else {
            Vec::new()
        };

        let sig = Signature {
            params: self.arena.list_fields(params),
            results: self.arena.list_fields(results),
        };
        Ok(self.arena.signatures.alloc(sig, self.span_from(start)))
    }

    fn params(&mut self) -> PResult<Vec<FieldId>> {
        self.expect(Tok::LParen, "`(`")?;
        let mut entries = Vec::new();
        while self.peek() != Some(Tok::RParen) {
            entries.push(self.param_entry()?);
            if self.eat(Tok::Comma).is_none() {
                break;
            }
        }
        self.expect(Tok::RParen, "`)` closing parameters")?;
        Ok(resolve_param_list(&mut self.arena, entries))
    }

    fn param_entry(&mut self) -> PResult<ParamDecl> {
        let start = self.start();
        let mut names = Vec::new();

        if let Some(Tok::Ident(_)) = self.peek() {
            let named = match self.peek_at(1) {
                Some(Tok::Dot | Tok::Comma | Tok::RParen) | None => false,
                Some(Tok::LBrack) => self.name_before_bracket(),
                Some(Tok::Ellipsis) => true,
                Some(next) => is_type_start(next),
            };
            if named {
                names.push(self.ident("parameter name")?);
            } else if matches!(self.peek_at(1), Some(Tok::Comma | Tok::RParen)) {
                let name = self.ident("parameter")?;
                return Ok(ParamDecl {
                    names: vec![name],
                    ellipsis_pos: None,
                    typ: None,
                    span: name.pos,
                });
            }
        }

        let ellipsis_pos = self.eat(Tok::Ellipsis);
        let typ = self.parse_type()?;
        Ok(ParamDecl {
            names,
            ellipsis_pos,
            typ: Some(typ),
            span: self.span_from(start),
        })
    }

    /// `a []int` names a parameter; `List[int]` is an instantiated type. The
    /// token after the matching `]` tells them apart.
    fn name_before_bracket(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos + 1;
        while let Some(&(_, tok, _)) = self.toks.get(i) {
            match tok {
                Tok::LBrack | Tok::LParen | Tok::LBrace => depth += 1,
                Tok::RBrack | Tok::RParen | Tok::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.toks.get(i + 1).is_some_and(|t| is_type_start(t.1));
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn at_type_start(&self) -> bool {
        self.peek().is_some_and(is_type_start)
    }

    fn alloc_type(&mut self, typ: Type, start: usize) -> TypeId {
        let span = self.span_from(start);
        self.arena.types.alloc(typ, span)
    }

    fn parse_type(&mut self) -> PResult<TypeId> {
        let start = self.start();
        let typ = match self.peek() {
            Some(Tok::Ident(_)) => self.named_type()?,
            Some(Tok::Star) => {
                self.bump();
                Type::Pointer {
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::LBrack) => self.array_or_slice()?,
            Some(Tok::Map) => {
                self.bump();
                self.expect(Tok::LBrack, "`[` after map")?;
                let key = self.parse_type()?;
                self.expect(Tok::RBrack, "`]` after map key")?;
                let val = self.parse_type()?;
                Type::Map { key, val }
            }
            Some(Tok::Chan) => {
                self.bump();
                let dir = if self.eat(Tok::Arrow).is_some() {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Type::Chan {
                    dir,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::Arrow) => {
                self.bump();
                self.expect(Tok::Chan, "`chan` after `<-`")?;
                Type::Chan {
                    dir: ChanDir::Recv,
                    elem: self.parse_type()?,
                }
            }
            Some(Tok::Func) => {
                self.bump();
                Type::Func {
                    sig: self.signature()?,
                }
            }
            Some(Tok::Interface) => self.interface_type()?,
            Some(Tok::Struct) => self.struct_type()?,
            Some(Tok::LParen) => {
                self.bump();
                let typ = self.parse_type()?;
                self.expect(Tok::RParen, "`)`")?;
                Type::Paren { typ }
            }
            _ => return Err(self.unexpected("type")),
        };
        Ok(self.alloc_type(typ, start))
    }

    fn named_type(&mut self) -> PResult<Type> {
        let first = self.ident("type name")?;
        let (pkg, name) = if self.eat(Tok::Dot).is_some() {
            (Some(first), self.ident("qualified type name")?)
        } else {
            (None, first)
        };

        let args = if self.eat(Tok::LBrack).is_some() {
            let mut args = Vec::new();
            while self.peek() != Some(Tok::RBrack) {
                args.push(self.parse_type()?);
                if self.eat(Tok::Comma).is_none() {
                    break;
                }
            }
            self.expect(Tok::RBrack, "`]` closing type arguments")?;
            self.arena.list_types(args)
        } else {
            ListRef::EMPTY
        };

        Ok(Type::Named { pkg, name, args })
    }

    fn array_or_slice(&mut self) -> PResult<Type> {
        self.expect(Tok::LBrack, "`[`")?;
        if self.eat(Tok::RBrack).is_some() {
            return Ok(Type::Slice {
                elem: self.parse_type()?,
            });
        }

        let len_start = self.start();
        let len = match (self.peek(), self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (Some(Tok::Ellipsis), Some(Tok::RBrack), _, _) => {
                self.bump();
                ArrayLen::Ellipsis
            }
            (Some(Tok::Int(lit)), Some(Tok::RBrack), _, _) if parse_int_lit(lit).is_some() => {
                self.bump();
                ArrayLen::Int(parse_int_lit(lit).unwrap_or_default())
            }
            (Some(Tok::Ident(_)), Some(Tok::RBrack), _, _) => ArrayLen::Const {
                pkg: None,
                name: self.ident("array length")?,
            },
            (Some(Tok::Ident(_)), Some(Tok::Dot), Some(Tok::Ident(_)), Some(Tok::RBrack)) => {
                let pkg = self.ident("package name")?;
                self.bump();
                ArrayLen::Const {
                    pkg: Some(pkg),
                    name: self.ident("constant name")?,
                }
            }
            _ => {
                self.skip_until_rbrack()?;
                ArrayLen::Expr(self.span_from(len_start))
            }
        };

        self.expect(Tok::RBrack, "`]` after array length")?;
        Ok(Type::Array {
            len,
            elem: self.parse_type()?,
        })
    }

    fn interface_type(&mut self) -> PResult<Type> {
        self.expect(Tok::Interface, "`interface`")?;
        let open = self.expect(Tok::LBrace, "`{` after interface")?;
        let mut elems = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::RBrace) => {
                    self.bump();
                    break;
                }
                Some(Tok::Semi) => {
                    self.bump();
                    continue;
                }
                None => return Err(ParseError::Unbalanced { open: "{", span: open }),
                Some(Tok::Ident(_)) if self.peek_at(1) == Some(Tok::LParen) => {
                    let name = self.ident("method name")?;
                    let sig = self.signature()?;
                    elems.push(InterfaceElem::Method { name, sig });
                }
                Some(_) => elems.push(InterfaceElem::Embed(self.constraint()?)),
            }
            self.semi()?;
        }
        Ok(Type::Interface {
            elems: self.arena.list_interface_elems(elems),
        })
    }

    fn struct_type(&mut self) -> PResult<Type> {
        self.expect(Tok::Struct, "`struct`")?;
        let open = self.expect(Tok::LBrace, "`{` after struct")?;
        let mut fields = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::RBrace) => {
                    self.bump();
                    break;
                }
                Some(Tok::Semi) => {
                    self.bump();
                    continue;
                }
                None => return Err(ParseError::Unbalanced { open: "{", span: open }),
                Some(_) => {}
            }

            let start = self.start();
            let embedded = match (self.peek(), self.peek_at(1)) {
                (Some(Tok::Star), _) => true,
                (Some(Tok::Ident(_)), Some(next)) => matches!(
                    next,
                    Tok::Dot | Tok::Semi | Tok::RBrace | Tok::Str(_) | Tok::RawStr(_)
                ),
                (Some(Tok::Ident(_)), None) => true,
                _ => false,
            };
            let names = if embedded {
                ListRef::EMPTY
            } else {
                let names = self.ident_list()?;
                self.arena.list_ident_names(names)
            };
            let typ = self.parse_type()?;
            let tag = match self.toks.get(self.pos) {
                Some(&(s, Tok::Str(_) | Tok::RawStr(_), e)) => {
                    self.bump();
                    Some(Span::new(s, e))
                }
                _ => None,
            };
            let field = Field {
                names,
                ellipsis_pos: None,
                typ,
                tag,
            };
            fields.push(self.arena.fields.alloc(field, self.span_from(start)));
            self.semi()?;
        }
        Ok(Type::Struct {
            fields: self.arena.list_fields(fields),
        })
    }

    /// `Constraint = Term { "|" Term }`, `Term = [ "~" ] Type`.
    fn constraint(&mut self) -> PResult<TypeId> {
        let start = self.start();
        let mut terms = vec![self.type_term()?];
        while self.eat(Tok::Pipe).is_some() {
            terms.push(self.type_term()?);
        }
        if let [TypeTerm { tilde: false, typ }] = terms.as_slice() {
            return Ok(*typ);
        }
        let terms = self.arena.list_type_terms(terms);
        Ok(self.alloc_type(Type::Union { terms }, start))
    }

    fn type_term(&mut self) -> PResult<TypeTerm> {
        let tilde = self.eat(Tok::Tilde).is_some();
        Ok(TypeTerm {
            tilde,
            typ: self.parse_type()?,
        })
    }

    // -------------------------------------------------------------------------
    // Skipping
    // -------------------------------------------------------------------------

    /// Skips one `{ ... }` block, the opening brace included.
    fn skip_balanced(&mut self) -> PResult<()> {
        let open = self.expect(Tok::LBrace, "`{`")?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some((_, Tok::LBrace, _)) => depth += 1,
                Some((_, Tok::RBrace, _)) => depth -= 1,
                Some(_) => {}
                None => return Err(ParseError::Unbalanced { open: "{", span: open }),
            }
        }
        Ok(())
    }

    /// Skips an expression list up to a `;` or closing `)` at nesting depth 0.
    fn skip_expr(&mut self) -> PResult<()> {
        let mut stack: Vec<(Tok<'src>, Span)> = Vec::new();
        loop {
            let Some(&(s, tok, e)) = self.toks.get(self.pos) else {
                return match stack.pop() {
                    Some((_, span)) => Err(ParseError::Unbalanced {
                        open: "bracket",
                        span,
                    }),
                    None => Ok(()),
                };
            };
            match tok {
                Tok::Semi | Tok::RParen if stack.is_empty() => return Ok(()),
                Tok::LParen | Tok::LBrack | Tok::LBrace => stack.push((tok, Span::new(s, e))),
                Tok::RParen | Tok::RBrack | Tok::RBrace => {
                    stack.pop();
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Skips an array length expression, leaving the closing `]`.
    fn skip_until_rbrack(&mut self) -> PResult<()> {
        let start = self.start();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Some(Tok::RBrack) if depth == 0 => return Ok(()),
                Some(Tok::LBrack | Tok::LParen | Tok::LBrace) => depth += 1,
                Some(Tok::RBrack | Tok::RParen | Tok::RBrace) => depth = depth.saturating_sub(1),
                Some(_) => {}
                None => {
                    return Err(ParseError::Unbalanced {
                        open: "[",
                        span: Span::empty_at(start),
                    })
                }
            }
            self.bump();
        }
    }
}

#[derive(Default)]
struct ConstGroup {
    next: u32,
}

fn is_type_start(tok: Tok<'_>) -> bool {
    matches!(
        tok,
        Tok::Ident(_)
            | Tok::Star
            | Tok::LBrack
            | Tok::Map
            | Tok::Chan
            | Tok::Func
            | Tok::Interface
            | Tok::Struct
            | Tok::LParen
            | Tok::Arrow
    )
}

/// Value of a Go integer literal, or `None` on overflow.
pub fn parse_int_lit(lit: &str) -> Option<u64> {
    let digits: String = lit.chars().filter(|&c| c != '_').collect();
    let (radix, body) = match digits.as_bytes() {
        [b'0', b'x' | b'X', ..] => (16, &digits[2..]),
        [b'0', b'o' | b'O', ..] => (8, &digits[2..]),
        [b'0', b'b' | b'B', ..] => (2, &digits[2..]),
        [b'0', _, ..] => (8, &digits[1..]),
        _ => (10, digits.as_str()),
    };
    u64::from_str_radix(body, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParsedFile {
        match parse_file(src) {
            Ok(p) => p,
            Err(e) => panic!("parse failed: {e}\n{src}"),
        }
    }

    #[test]
    fn int_literals() {
        assert_eq!(parse_int_lit("42"), Some(42));
        assert_eq!(parse_int_lit("0x_ff"), Some(255));
        assert_eq!(parse_int_lit("0o17"), Some(15));
        assert_eq!(parse_int_lit("017"), Some(15));
        assert_eq!(parse_int_lit("0b101"), Some(5));
        assert_eq!(parse_int_lit("1_000"), Some(1000));
        assert_eq!(parse_int_lit("0"), Some(0));
        assert_eq!(parse_int_lit("99999999999999999999999"), None);
    }

    #[test]
    fn build_constraints_in_header() {
        assert_eq!(
            build_constraint("// Copyright\n\n//go:build ignore\n\npackage main\n"),
            Some("ignore")
        );
        assert_eq!(
            build_constraint("/* doc\n*/\n//go:build linux && amd64\npackage p\n"),
            Some("linux && amd64")
        );
        assert_eq!(build_constraint("package p\n//go:build ignore\n"), None);
    }

    #[test]
    fn package_and_imports() {
        let p = parse(
            "package calc\n\
             import \"fmt\"\n\
             import (\n\
                 \"context\"\n\
                 str \"strings\"\n\
                 _ \"embed\"\n\
                 . \"math\"\n\
             )\n",
        );
        assert_eq!(p.package_name(), "calc");
        let paths: Vec<_> = p.imports().map(|i| p.text(i.path)).collect();
        assert_eq!(paths, ["fmt", "context", "strings", "embed", "math"]);
        let names: Vec<_> = p
            .imports()
            .map(|i| match i.name {
                None => "-".to_string(),
                Some(ImportName::Dot(_)) => ".".to_string(),
                Some(ImportName::Blank(_)) => "_".to_string(),
                Some(ImportName::Name(n)) => p.text(n.sym).to_string(),
            })
            .collect();
        assert_eq!(names, ["-", "-", "str", "_", "."]);
    }

    #[test]
    fn grouped_params_share_a_field() {
        let p = parse("package p\ntype I interface { Add(a, b int) int }\n");
        let spec = p.find_type("I").expect("I declared");
        let Type::Interface { elems } = p.arena.types[spec.typ] else {
            panic!("not an interface");
        };
        let [InterfaceElem::Method { sig, .. }] = p.arena.interface_elems(elems) else {
            panic!("expected one method");
        };
        let sig = p.arena.signatures[*sig];
        let params = p.arena.fields_list(sig.params);
        assert_eq!(params.len(), 1);
        assert_eq!(p.arena.fields[params[0]].names.len(), 2);
        assert_eq!(p.arena.fields_list(sig.results).len(), 1);
    }

    #[test]
    fn unnamed_params_are_types() {
        let p = parse("package p\ntype F func(int, error, ...string) (x, y bool)\n");
        let spec = p.find_type("F").expect("F declared");
        let Type::Func { sig } = p.arena.types[spec.typ] else {
            panic!("not a func type");
        };
        let sig = p.arena.signatures[sig];
        let params = p.arena.fields_list(sig.params);
        assert_eq!(params.len(), 3);
        assert!(params.iter().all(|&f| p.arena.fields[f].names.is_empty()));
        assert!(p.arena.fields[params[2]].is_variadic());
        let results = p.arena.fields_list(sig.results);
        assert_eq!(results.len(), 1);
        assert_eq!(p.arena.fields[results[0]].names.len(), 2);
    }

    #[test]
    fn generic_type_params_vs_array_length() {
        let p = parse(
            "package p\n\
             const N = 4\n\
             type A [N]int\n\
             type S []byte\n\
             type G[T any, K comparable] interface { Get(k K) T }\n\
             type U[T ~int | ~string] struct{ v T }\n",
        );
        assert!(p.find_type("A").expect("A").type_params.is_empty());
        assert!(matches!(
            p.arena.types[p.find_type("A").expect("A").typ],
            Type::Array { len: ArrayLen::Const { pkg: None, .. }, .. }
        ));
        assert!(matches!(
            p.arena.types[p.find_type("S").expect("S").typ],
            Type::Slice { .. }
        ));
        assert_eq!(p.find_type("G").expect("G").type_params.len(), 2);

        let u = p.find_type("U").expect("U");
        let decl = p.arena.type_param_decl_ids(u.type_params)[0];
        let constraint = p.arena.type_param_decls[decl].constraint;
        let Type::Union { terms } = p.arena.types[constraint] else {
            panic!("expected a union constraint");
        };
        assert!(p.arena.type_terms(terms).iter().all(|t| t.tilde));
    }

    #[test]
    fn const_values_and_iota() {
        let p = parse(
            "package p\n\
             const (\n\
                 A = iota\n\
                 B\n\
                 C = 0x10\n\
                 D = 1 << 3\n\
             )\n",
        );
        let values: Vec<_> = p.const_specs().map(|c| (c.value, c.iota)).collect();
        assert_eq!(values[0], (ConstValue::Iota, 0));
        assert_eq!(values[1], (ConstValue::Implicit, 1));
        assert_eq!(values[2], (ConstValue::Int(16), 2));
        assert!(matches!(values[3].0, ConstValue::Expr(_)));
    }

    #[test]
    fn bodies_and_initializers_are_skipped() {
        let p = parse(
            "package p\n\
             var handlers = map[string]func(){\n\
                 \"a\": func() { if true { return } },\n\
             }\n\
             func (s *Server[T]) Run(ctx context.Context) error {\n\
                 for { select {} }\n\
             }\n\
             func helper(xs []int, m [2]string, l List[int]) {}\n",
        );
        let funcs: Vec<_> = p.funcs().collect();
        assert_eq!(funcs.len(), 2);
        let run = funcs[0];
        assert!(run.recv.is_some());
        assert!(run.body.is_some());
        let helper = p.arena.signatures[funcs[1].sig];
        let params = p.arena.fields_list(helper.params);
        assert_eq!(params.len(), 3);
        assert!(params.iter().all(|&f| p.arena.fields[f].names.len() == 1));
    }

    #[test]
    fn embedded_interfaces_and_channels() {
        let p = parse(
            "package p\n\
             type RW interface {\n\
                 io.Reader\n\
                 Writer\n\
                 Recv() <-chan int\n\
                 Send(c chan<- string)\n\
             }\n",
        );
        let Type::Interface { elems } = p.arena.types[p.find_type("RW").expect("RW").typ] else {
            panic!("not an interface");
        };
        let elems = p.arena.interface_elems(elems);
        assert_eq!(elems.len(), 4);
        assert!(matches!(elems[0], InterfaceElem::Embed(_)));
        assert!(matches!(elems[1], InterfaceElem::Embed(_)));
        assert!(matches!(elems[2], InterfaceElem::Method { .. }));
    }

    #[test]
    fn errors_carry_positions() {
        let err = parse_file("package p\ntype I interface { Do( }\n").expect_err("must fail");
        let diag = &err.diags[0];
        assert_eq!(diag.line_col("package p\ntype I interface { Do( }\n").0, 2);

        let err = parse_file("package p\nfunc f() {\n").expect_err("must fail");
        assert!(err.to_string().contains("unbalanced"));

        let err = parse_file("type T int\n").expect_err("must fail");
        assert!(err.to_string().contains("package"));
    }
}
