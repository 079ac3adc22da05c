//! Syntax model of the generated Go file.
//!
//! Only the constructs a stub needs are representable. Nodes carry no
//! positions; layout is decided entirely by the printer.

use crate::model::ChanDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub package: String,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Import(Vec<ImportSpec>),
    Type(TypeSpec),
    Func(FuncDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub name: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    pub type_params: Vec<FieldExpr>,
    pub typ: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub recv: Option<FieldExpr>,
    pub name: String,
    pub typ: FuncTypeExpr,
    pub body: Vec<Stmt>,
}

/// Parameter, result, struct field or type parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExpr {
    pub names: Vec<String>,
    pub typ: Expr,
}

impl FieldExpr {
    pub fn named(name: impl Into<String>, typ: Expr) -> Self {
        Self {
            names: vec![name.into()],
            typ,
        }
    }

    pub fn anonymous(typ: Expr) -> Self {
        Self {
            names: Vec::new(),
            typ,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuncTypeExpr {
    pub type_params: Vec<FieldExpr>,
    pub params: Vec<FieldExpr>,
    pub results: Vec<FieldExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    /// `X.Sel`
    Selector(Box<Expr>, String),
    /// `*X`
    Star(Box<Expr>),
    /// `&X`
    AddrOf(Box<Expr>),
    /// `X[A]` or `X[A, B]`
    Index(Box<Expr>, Vec<Expr>),
    /// `[N]T`, or `[]T` without a length.
    ArrayType { len: Option<u64>, elem: Box<Expr> },
    MapType(Box<Expr>, Box<Expr>),
    ChanType(ChanDir, Box<Expr>),
    FuncType(FuncTypeExpr),
    /// Methods of an interface type literal, printed on one line.
    InterfaceType(Vec<(String, FuncTypeExpr)>),
    StructType(Vec<FieldExpr>),
    /// `...T` in the final parameter position.
    Ellipsis(Box<Expr>),
    /// `~T | U` in a constraint.
    Union(Vec<(bool, Expr)>),
    /// Constraint literal: type-set elements (each a `Union`), then methods.
    ConstraintInterface {
        terms: Vec<Expr>,
        methods: Vec<(String, FuncTypeExpr)>,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        /// Final argument spread with `...`.
        ellipsis: bool,
    },
    /// `T{Key: v, ...}`
    CompositeLit {
        typ: Box<Expr>,
        elts: Vec<(String, Expr)>,
    },
    /// Comparison `X op Y`.
    Binary(Box<Expr>, &'static str, Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn sel(self, name: impl Into<String>) -> Self {
        Expr::Selector(Box::new(self), name.into())
    }

    pub fn star(self) -> Self {
        Expr::Star(Box::new(self))
    }

    /// Instantiates with `args`; a no-op for an empty list.
    pub fn index(self, args: Vec<Expr>) -> Self {
        if args.is_empty() {
            self
        } else {
            Expr::Index(Box::new(self), args)
        }
    }

    pub fn call(self, args: Vec<Expr>) -> Self {
        Expr::Call {
            fun: Box::new(self),
            args,
            ellipsis: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Expr),
    Assign(Vec<Expr>, Vec<Expr>),
    Return(Vec<Expr>),
    If {
        cond: Expr,
        body: Vec<Stmt>,
        els: Option<Vec<Stmt>>,
    },
    Defer(Expr),
}
