//! gofmt-style printing of the syntax model.
//!
//! The model carries no positions, so layout follows what `go/printer`
//! produces for a synthesized tree: tab indentation, struct fields aligned
//! into columns, imports sorted by path, and a blank line only where the
//! kind of top-level declaration changes.

use crate::error::StubError;
use crate::goast::{Decl, Expr, FieldExpr, File, FuncDecl, FuncTypeExpr, ImportSpec, Stmt, TypeSpec};
use crate::imports::is_identifier;
use crate::model::ChanDir;

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Renders `file` as Go source text.
///
/// Fails when the tree contains an identifier Go would reject, which means
/// the synthesizer produced it wrongly.
pub fn print_file(file: &File) -> Result<String, StubError> {
    Validator.file(file)?;
    let mut w = GoWriter::new();
    w.file(file);
    Ok(w.build())
}

// =============================================================================
// Validation
// =============================================================================

struct Validator;

impl Validator {
    fn ident(&self, name: &str, what: &str) -> Result<(), StubError> {
        if is_identifier(name) && !KEYWORDS.contains(&name) {
            Ok(())
        } else {
            Err(StubError::Render(format!("invalid {what} identifier {name:?}")))
        }
    }

    fn file(&self, file: &File) -> Result<(), StubError> {
        self.ident(&file.package, "package")?;
        for decl in &file.decls {
            match decl {
                Decl::Import(specs) => {
                    for spec in specs {
                        if let Some(name) = &spec.name {
                            self.ident(name, "import")?;
                        }
                        if spec.path.is_empty() || spec.path.contains(['"', '\\', '\n']) {
                            return Err(StubError::Render(format!(
                                "invalid import path {:?}",
                                spec.path
                            )));
                        }
                    }
                }
                Decl::Type(spec) => {
                    self.ident(&spec.name, "type")?;
                    self.fields(&spec.type_params)?;
                    self.expr(&spec.typ)?;
                }
                Decl::Func(func) => {
                    self.ident(&func.name, "function")?;
                    if let Some(recv) = &func.recv {
                        self.field(recv)?;
                    }
                    self.func_type(&func.typ)?;
                    self.stmts(&func.body)?;
                }
            }
        }
        Ok(())
    }

    fn fields(&self, fields: &[FieldExpr]) -> Result<(), StubError> {
        fields.iter().try_for_each(|f| self.field(f))
    }

    fn field(&self, field: &FieldExpr) -> Result<(), StubError> {
        for name in &field.names {
            self.ident(name, "field")?;
        }
        self.expr(&field.typ)
    }

    fn func_type(&self, f: &FuncTypeExpr) -> Result<(), StubError> {
        self.fields(&f.type_params)?;
        self.fields(&f.params)?;
        self.fields(&f.results)
    }

    fn stmts(&self, stmts: &[Stmt]) -> Result<(), StubError> {
        for stmt in stmts {
            match stmt {
                Stmt::Expr(e) | Stmt::Defer(e) => self.expr(e)?,
                Stmt::Assign(lhs, rhs) => {
                    lhs.iter().chain(rhs).try_for_each(|e| self.expr(e))?;
                }
                Stmt::Return(values) => values.iter().try_for_each(|e| self.expr(e))?,
                Stmt::If { cond, body, els } => {
                    self.expr(cond)?;
                    self.stmts(body)?;
                    if let Some(els) = els {
                        self.stmts(els)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn expr(&self, e: &Expr) -> Result<(), StubError> {
        match e {
            Expr::Ident(name) => self.ident(name, "name"),
            Expr::Selector(x, sel) => {
                self.expr(x)?;
                self.ident(sel, "selector")
            }
            Expr::Star(x) | Expr::AddrOf(x) | Expr::Ellipsis(x) => self.expr(x),
            Expr::Index(x, args) => {
                self.expr(x)?;
                args.iter().try_for_each(|a| self.expr(a))
            }
            Expr::ArrayType { elem, .. } | Expr::ChanType(_, elem) => self.expr(elem),
            Expr::MapType(k, v) | Expr::Binary(k, _, v) => {
                self.expr(k)?;
                self.expr(v)
            }
            Expr::FuncType(f) => self.func_type(f),
            Expr::InterfaceType(methods) => methods.iter().try_for_each(|(name, f)| {
                self.ident(name, "method")?;
                self.func_type(f)
            }),
            Expr::StructType(fields) => self.fields(fields),
            Expr::Union(terms) => terms.iter().try_for_each(|(_, t)| self.expr(t)),
            Expr::ConstraintInterface { terms, methods } => {
                terms.iter().try_for_each(|t| self.expr(t))?;
                methods.iter().try_for_each(|(name, f)| {
                    self.ident(name, "method")?;
                    self.func_type(f)
                })
            }
            Expr::Call { fun, args, .. } => {
                self.expr(fun)?;
                args.iter().try_for_each(|a| self.expr(a))
            }
            Expr::CompositeLit { typ, elts } => {
                self.expr(typ)?;
                elts.iter().try_for_each(|(key, value)| {
                    self.ident(key, "field")?;
                    self.expr(value)
                })
            }
        }
    }
}

// =============================================================================
// Writer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Import,
    Type,
    Func,
}

/// Incrementally built source text with tab indentation.
#[derive(Debug, Default)]
struct GoWriter {
    content: String,
    indent_level: usize,
}

impl GoWriter {
    fn new() -> Self {
        Self::default()
    }

    fn push_line(&mut self, line: &str) {
        if !line.is_empty() {
            for _ in 0..self.indent_level {
                self.content.push('\t');
            }
        }
        self.content.push_str(line);
        self.content.push('\n');
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn build(self) -> String {
        self.content
    }

    fn file(&mut self, file: &File) {
        self.push_line(&format!("package {}", file.package));
        let mut prev: Option<DeclKind> = None;
        for decl in &file.decls {
            let kind = match decl {
                Decl::Import(specs) if specs.is_empty() => continue,
                Decl::Import(_) => DeclKind::Import,
                Decl::Type(_) => DeclKind::Type,
                Decl::Func(_) => DeclKind::Func,
            };
            if prev != Some(kind) {
                self.push_line("");
            }
            prev = Some(kind);
            match decl {
                Decl::Import(specs) => self.imports(specs),
                Decl::Type(spec) => self.type_spec(spec),
                Decl::Func(func) => self.func_decl(func),
            }
        }
    }

    fn imports(&mut self, specs: &[ImportSpec]) {
        let mut sorted: Vec<&ImportSpec> = specs.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        let line = |spec: &ImportSpec| match &spec.name {
            Some(name) => format!("{name} {:?}", spec.path),
            None => format!("{:?}", spec.path),
        };
        if let [only] = sorted.as_slice() {
            self.push_line(&format!("import {}", line(only)));
            return;
        }
        self.push_line("import (");
        self.indent();
        for spec in sorted {
            self.push_line(&line(spec));
        }
        self.dedent();
        self.push_line(")");
    }

    fn type_spec(&mut self, spec: &TypeSpec) {
        let head = format!("type {}{}", spec.name, type_param_list(&spec.type_params));
        match &spec.typ {
            Expr::StructType(fields) => {
                self.push_line(&format!("{head} struct {{"));
                self.indent();
                self.aligned_fields(fields);
                self.dedent();
                self.push_line("}");
            }
            typ => self.push_line(&format!("{head} {}", expr(typ))),
        }
    }

    /// One field per line, types starting in a shared column.
    fn aligned_fields(&mut self, fields: &[FieldExpr]) {
        let width = fields
            .iter()
            .map(|f| f.names.join(", ").chars().count())
            .max()
            .unwrap_or(0);
        for field in fields {
            if field.names.is_empty() {
                self.push_line(&expr(&field.typ));
                continue;
            }
            let names = field.names.join(", ");
            let pad = width - names.chars().count() + 1;
            self.push_line(&format!("{names}{}{}", " ".repeat(pad), expr(&field.typ)));
        }
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        let recv = func
            .recv
            .as_ref()
            .map(|r| format!("({}) ", field_list(std::slice::from_ref(r))))
            .unwrap_or_default();
        self.push_line(&format!(
            "func {recv}{}{}{} {{",
            func.name,
            type_param_list(&func.typ.type_params),
            signature(&func.typ)
        ));
        self.indent();
        self.stmts(&func.body);
        self.dedent();
        self.push_line("}");
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::Expr(e) => self.push_line(&expr(e)),
                Stmt::Defer(e) => self.push_line(&format!("defer {}", expr(e))),
                Stmt::Assign(lhs, rhs) => {
                    self.push_line(&format!("{} = {}", expr_list(lhs), expr_list(rhs)))
                }
                Stmt::Return(values) if values.is_empty() => self.push_line("return"),
                Stmt::Return(values) => {
                    self.push_line(&format!("return {}", expr_list(values)))
                }
                Stmt::If { cond, body, els } => {
                    self.push_line(&format!("if {} {{", expr(cond)));
                    self.indent();
                    self.stmts(body);
                    self.dedent();
                    match els {
                        Some(els) => {
                            self.push_line("} else {");
                            self.indent();
                            self.stmts(els);
                            self.dedent();
                            self.push_line("}");
                        }
                        None => self.push_line("}"),
                    }
                }
            }
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

fn expr(e: &Expr) -> String {
    match e {
        Expr::Ident(name) => name.clone(),
        Expr::Selector(x, sel) => format!("{}.{sel}", expr(x)),
        Expr::Star(x) => format!("*{}", expr(x)),
        Expr::AddrOf(x) => format!("&{}", expr(x)),
        Expr::Ellipsis(x) => format!("...{}", expr(x)),
        Expr::Index(x, args) => format!("{}[{}]", expr(x), expr_list(args)),
        Expr::ArrayType { len: None, elem } => format!("[]{}", expr(elem)),
        Expr::ArrayType {
            len: Some(n),
            elem,
        } => format!("[{n}]{}", expr(elem)),
        Expr::MapType(k, v) => format!("map[{}]{}", expr(k), expr(v)),
        Expr::ChanType(ChanDir::Both, elem) => match elem.as_ref() {
            // `chan <-chan T` would parse as `chan<- chan T`.
            Expr::ChanType(ChanDir::Recv, _) => format!("chan ({})", expr(elem)),
            _ => format!("chan {}", expr(elem)),
        },
        Expr::ChanType(ChanDir::Send, elem) => format!("chan<- {}", expr(elem)),
        Expr::ChanType(ChanDir::Recv, elem) => format!("<-chan {}", expr(elem)),
        Expr::FuncType(f) => format!("func{}", signature(f)),
        Expr::InterfaceType(methods) if methods.is_empty() => "interface{}".to_owned(),
        Expr::InterfaceType(methods) => {
            let methods: Vec<String> = methods
                .iter()
                .map(|(name, f)| format!("{name}{}", signature(f)))
                .collect();
            format!("interface{{ {} }}", methods.join("; "))
        }
        Expr::StructType(fields) if fields.is_empty() => "struct{}".to_owned(),
        Expr::StructType(fields) => {
            let fields: Vec<String> = fields.iter().map(field).collect();
            format!("struct{{ {} }}", fields.join("; "))
        }
        Expr::Union(terms) => terms
            .iter()
            .map(|(tilde, t)| format!("{}{}", if *tilde { "~" } else { "" }, expr(t)))
            .collect::<Vec<_>>()
            .join(" | "),
        Expr::ConstraintInterface { terms, methods } => {
            let elems: Vec<String> = terms
                .iter()
                .map(expr)
                .chain(methods.iter().map(|(name, f)| format!("{name}{}", signature(f))))
                .collect();
            format!("interface{{ {} }}", elems.join("; "))
        }
        Expr::Call {
            fun,
            args,
            ellipsis,
        } => format!(
            "{}({}{})",
            expr(fun),
            expr_list(args),
            if *ellipsis && !args.is_empty() { "..." } else { "" }
        ),
        Expr::CompositeLit { typ, elts } => {
            let elts: Vec<String> = elts
                .iter()
                .map(|(key, value)| format!("{key}: {}", expr(value)))
                .collect();
            format!("{}{{{}}}", expr(typ), elts.join(", "))
        }
        Expr::Binary(x, op, y) => format!("{} {op} {}", expr(x), expr(y)),
    }
}

fn expr_list(exprs: &[Expr]) -> String {
    exprs.iter().map(expr).collect::<Vec<_>>().join(", ")
}

fn field(f: &FieldExpr) -> String {
    if f.names.is_empty() {
        expr(&f.typ)
    } else {
        format!("{} {}", f.names.join(", "), expr(&f.typ))
    }
}

fn field_list(fields: &[FieldExpr]) -> String {
    fields.iter().map(field).collect::<Vec<_>>().join(", ")
}

fn type_param_list(params: &[FieldExpr]) -> String {
    if params.is_empty() {
        return String::new();
    }
    // `[T *C]` and `[T *C | D]` would read as array length expressions
    // without the comma.
    let trailing = match params {
        [only] if only.names.len() == 1 && expr(&only.typ).starts_with('*') => ",",
        _ => "",
    };
    format!("[{}{trailing}]", field_list(params))
}

/// Parameters and results: `(a int) (int, error)`.
fn signature(f: &FuncTypeExpr) -> String {
    let params = format!("({})", field_list(&f.params));
    match f.results.as_slice() {
        [] => params,
        [only] if only.names.is_empty() => format!("{params} {}", expr(&only.typ)),
        results => format!("{params} ({})", field_list(results)),
    }
}
