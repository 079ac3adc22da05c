//! `TypeRef` to syntax, qualified as seen from the target package.

use crate::goast::{Expr, FieldExpr, FuncTypeExpr};
use crate::imports::ImportSet;
use crate::model::{Constraint, FuncType, InterfaceShape, TypeParam, TypeRef, UnionTerm};

#[derive(Debug, Clone, Copy)]
pub struct TypeRenderer<'a> {
    target_path: &'a str,
    imports: &'a ImportSet,
}

impl<'a> TypeRenderer<'a> {
    pub fn new(target_path: &'a str, imports: &'a ImportSet) -> Self {
        Self {
            target_path,
            imports,
        }
    }

    pub fn expr(&self, t: &TypeRef) -> Expr {
        match t {
            TypeRef::Basic(name) | TypeRef::TypeParam(name) => Expr::ident(name),
            TypeRef::Named(named) => {
                let base = if named.pkg_path.is_empty() || named.pkg_path == self.target_path {
                    Expr::ident(&named.name)
                } else {
                    let local = self
                        .imports
                        .local_name(&named.pkg_path)
                        .unwrap_or(&named.pkg_name);
                    Expr::ident(local).sel(&named.name)
                };
                base.index(named.type_args.iter().map(|a| self.expr(a)).collect())
            }
            TypeRef::Pointer(elem) => self.expr(elem).star(),
            TypeRef::Slice(elem) => Expr::ArrayType {
                len: None,
                elem: Box::new(self.expr(elem)),
            },
            TypeRef::Array(len, elem) => Expr::ArrayType {
                len: Some(*len),
                elem: Box::new(self.expr(elem)),
            },
            TypeRef::Map(key, val) => {
                Expr::MapType(Box::new(self.expr(key)), Box::new(self.expr(val)))
            }
            TypeRef::Chan(dir, elem) => Expr::ChanType(*dir, Box::new(self.expr(elem))),
            TypeRef::Func(sig) => Expr::FuncType(self.func_type(sig)),
            TypeRef::Interface(InterfaceShape::Empty) => Expr::InterfaceType(Vec::new()),
            TypeRef::Interface(InterfaceShape::NonEmpty(methods)) => Expr::InterfaceType(
                methods
                    .iter()
                    .map(|m| (m.name.clone(), self.func_type(&m.sig)))
                    .collect(),
            ),
        }
    }

    /// Function type with source names where present and `...T` for a
    /// variadic final parameter.
    pub fn func_type(&self, sig: &FuncType) -> FuncTypeExpr {
        let last = sig.params.len().saturating_sub(1);
        let params = sig
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let typ = match (&p.typ, sig.variadic && i == last) {
                    (TypeRef::Slice(elem), true) => Expr::Ellipsis(Box::new(self.expr(elem))),
                    (typ, _) => self.expr(typ),
                };
                match &p.name {
                    Some(name) => FieldExpr::named(name, typ),
                    None => FieldExpr::anonymous(typ),
                }
            })
            .collect();
        let results = sig
            .results
            .iter()
            .map(|r| match &r.name {
                Some(name) => FieldExpr::named(name, self.expr(&r.typ)),
                None => FieldExpr::anonymous(self.expr(&r.typ)),
            })
            .collect();
        FuncTypeExpr {
            type_params: Vec::new(),
            params,
            results,
        }
    }

    pub fn constraint(&self, c: &Constraint) -> Expr {
        match c {
            Constraint::Any => Expr::ident("any"),
            Constraint::Type(t) => self.expr(t),
            Constraint::Union(terms) => self.union(terms),
            Constraint::Interface(set) => Expr::ConstraintInterface {
                terms: set.terms.iter().map(|terms| self.union(terms)).collect(),
                methods: set
                    .methods
                    .iter()
                    .map(|m| (m.name.clone(), self.func_type(&m.sig)))
                    .collect(),
            },
        }
    }

    fn union(&self, terms: &[UnionTerm]) -> Expr {
        Expr::Union(
            terms
                .iter()
                .map(|term| (term.tilde, self.expr(&term.typ)))
                .collect(),
        )
    }

    /// Declaration list `[K comparable, V any]`.
    pub fn type_params(&self, params: &[TypeParam]) -> Vec<FieldExpr> {
        params
            .iter()
            .map(|tp| FieldExpr::named(&tp.name, self.constraint(&tp.constraint)))
            .collect()
    }
}

/// Type arguments instantiating a generic declaration with its own
/// parameters: `[K, V]`.
pub fn type_args(params: &[TypeParam]) -> Vec<Expr> {
    params.iter().map(|tp| Expr::ident(&tp.name)).collect()
}
