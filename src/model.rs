//! Typed view of an interface, as consumed by the synthesizer.
//!
//! `TypeRef` never embeds the underlying type of a named type, so every
//! recursive walk over it terminates.

use std::fmt;

use crate::imports::ImportSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Predeclared basic type (`int`, `string`, `byte`, ...).
    Basic(String),
    Named(NamedType),
    Pointer(Box<TypeRef>),
    Slice(Box<TypeRef>),
    Array(u64, Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Chan(ChanDir, Box<TypeRef>),
    Func(FuncType),
    Interface(InterfaceShape),
    TypeParam(String),
}

/// A declared type. Predeclared `error` and `comparable` have an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    pub pkg_path: String,
    pub pkg_name: String,
    pub name: String,
    pub type_args: Vec<TypeRef>,
}

impl NamedType {
    pub fn predeclared(name: &str) -> Self {
        NamedType {
            pkg_path: String::new(),
            pkg_name: String::new(),
            name: name.to_owned(),
            type_args: Vec::new(),
        }
    }

    pub fn is_predeclared(&self) -> bool {
        self.pkg_path.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    pub params: Vec<FuncField>,
    pub results: Vec<FuncField>,
    /// The final parameter is `...T`; its recorded type is `[]T`.
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncField {
    pub name: Option<String>,
    pub typ: TypeRef,
}

/// Anonymous interface type appearing in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceShape {
    Empty,
    /// Flattened method set, printed in single-line textual form.
    NonEmpty(Vec<InterfaceMethod>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceMethod {
    pub name: String,
    pub sig: FuncType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `any` / `interface{}`.
    Any,
    Type(TypeRef),
    /// `~int | string`
    Union(Vec<UnionTerm>),
    /// Interface literal mixing type-set elements with methods:
    /// `interface{ ~int; String() string }`.
    Interface(TypeSet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSet {
    /// One union per type-set element, in source order. A plain embedded
    /// type is a single term without `~`.
    pub terms: Vec<Vec<UnionTerm>>,
    pub methods: Vec<InterfaceMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionTerm {
    pub tilde: bool,
    pub typ: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Source name; `_` when the parameter is unnamed.
    pub name: String,
    pub typ: TypeRef,
    pub variadic: bool,
}

impl Param {
    /// Element type for a variadic parameter, the declared type otherwise.
    pub fn declared_type(&self) -> &TypeRef {
        match (&self.typ, self.variadic) {
            (TypeRef::Slice(elem), true) => elem,
            (typ, _) => typ,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultVar {
    pub name: Option<String>,
    pub typ: TypeRef,
}

impl ResultVar {
    /// Source name, or `R{i}` for unnamed (or blank) results.
    pub fn display_name(&self, i: usize) -> String {
        match self.name.as_deref() {
            Some(name) if name != "_" => name.to_owned(),
            _ => format!("R{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<ResultVar>,
}

impl Method {
    /// Signature as a function type. Names are kept only when at least one
    /// parameter (or result) is named, since Go forbids mixing the forms.
    pub fn func_type(&self) -> FuncType {
        let named_params = self.params.iter().any(|p| p.name != "_");
        let named_results = self
            .results
            .iter()
            .any(|r| r.name.as_deref().is_some_and(|n| n != "_"));
        FuncType {
            params: self
                .params
                .iter()
                .map(|p| FuncField {
                    name: named_params.then(|| p.name.clone()),
                    typ: p.typ.clone(),
                })
                .collect(),
            results: self
                .results
                .iter()
                .map(|r| FuncField {
                    name: named_results.then(|| r.name.clone().unwrap_or_else(|| "_".into())),
                    typ: r.typ.clone(),
                })
                .collect(),
            variadic: self.params.last().is_some_and(|p| p.variadic),
        }
    }

    /// Parameter and result types only; names are not part of a signature.
    pub fn same_signature(&self, other: &Method) -> bool {
        self.params.len() == other.params.len()
            && self.results.len() == other.results.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.typ == b.typ && a.variadic == b.variadic)
            && self
                .results
                .iter()
                .zip(&other.results)
                .all(|(a, b)| a.typ == b.typ)
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceModel {
    pub target_package_name: String,
    pub target_package_path: String,
    pub source_package_name: String,
    pub source_package_path: String,
    pub interface_name: String,
    pub type_params: Vec<TypeParam>,
    pub methods: Vec<Method>,
    pub imports: ImportSet,
}

impl InterfaceModel {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn type_param(&self, name: &str) -> Option<&TypeParam> {
        self.type_params.iter().find(|tp| tp.name == name)
    }
}

// Go-syntax text, qualified by package name. Used for diagnostics and
// identity keys; the generated file goes through `render`.

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Basic(name) | TypeRef::TypeParam(name) => f.write_str(name),
            TypeRef::Named(named) => named.fmt(f),
            TypeRef::Pointer(elem) => write!(f, "*{elem}"),
            TypeRef::Slice(elem) => write!(f, "[]{elem}"),
            TypeRef::Array(len, elem) => write!(f, "[{len}]{elem}"),
            TypeRef::Map(key, val) => write!(f, "map[{key}]{val}"),
            TypeRef::Chan(ChanDir::Both, elem) => write!(f, "chan {elem}"),
            TypeRef::Chan(ChanDir::Send, elem) => write!(f, "chan<- {elem}"),
            TypeRef::Chan(ChanDir::Recv, elem) => write!(f, "<-chan {elem}"),
            TypeRef::Func(sig) => write!(f, "func{sig}"),
            TypeRef::Interface(InterfaceShape::Empty) => f.write_str("interface{}"),
            TypeRef::Interface(InterfaceShape::NonEmpty(methods)) => {
                f.write_str("interface{ ")?;
                for (i, m) in methods.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}{}", m.name, m.sig)?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl fmt::Display for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.pkg_name.is_empty() {
            write!(f, "{}.", self.pkg_name)?;
        }
        f.write_str(&self.name)?;
        if !self.type_args.is_empty() {
            f.write_str("[")?;
            for (i, arg) in self.type_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let last = self.params.len().saturating_sub(1);
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(name) = &p.name {
                write!(f, "{name} ")?;
            }
            match (&p.typ, self.variadic && i == last) {
                (TypeRef::Slice(elem), true) => write!(f, "...{elem}")?,
                (typ, _) => write!(f, "{typ}")?,
            }
        }
        f.write_str(")")?;

        match self.results.as_slice() {
            [] => Ok(()),
            [FuncField { name: None, typ }] => write!(f, " {typ}"),
            results => {
                f.write_str(" (")?;
                for (i, r) in results.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if let Some(name) = &r.name {
                        write!(f, "{name} ")?;
                    }
                    write!(f, "{}", r.typ)?;
                }
                f.write_str(")")
            }
        }
    }
}
