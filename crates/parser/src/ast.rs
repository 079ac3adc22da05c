//! # Go declaration AST
//!
//! Arena-allocated syntax tree for the declaration level of Go source files:
//! package clause, imports, constants, variables, type declarations and
//! function/method signatures. Function bodies are recorded by span only.
//!
//! - **Nodes** live in typed arenas (`SpannedArena<T>`) with side-table spans.
//! - **Lists** are `ListRef<T>` windows into centralized buffers (`ExtraData`).
//! - **Identifiers** are interned `Symbol`s; text is recovered via [`Interner`].
//!
//! Traversal lives in `crate::walk`; `#[derive(WalkAst)]` generates the
//! per-node `Walk` impls.

use ast_derive::WalkAst;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher, RandomState};

pub use crate::error::Span;

// =============================================================================
// Core Foundation Types
// =============================================================================

/// Type-safe identifier for arena-allocated nodes.
#[derive(Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Id<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Id<T> {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn to_usize(self) -> usize {
        self.raw as usize
    }
}

/// Typed window into one of the `ExtraData` buffers.
#[derive(Debug, PartialEq, Eq)]
pub struct ListRef<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for ListRef<T> {}

impl<T> Clone for ListRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Default for ListRef<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> ListRef<T> {
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        _marker: PhantomData,
    };

    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self {
            start,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    const fn range(&self) -> core::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

// =============================================================================
// Symbol Interning
// =============================================================================

/// Interned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Symbol(u32);

/// Identifier occurrence: interned symbol plus its source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct IdentName {
    pub sym: Symbol,
    pub pos: Span,
}

/// Hash buckets are keyed by a precomputed `u64`, so the map hasher is the identity.
#[derive(Default)]
struct PrehashedKey(u64);

impl Hasher for PrehashedKey {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

/// String interner: every distinct identifier text is stored once.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    buckets: HashMap<u64, SmallVec<[Symbol; 1]>, BuildHasherDefault<PrehashedKey>>,
    state: RandomState,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        let h = self.state.hash_one(s);
        let bucket = self.buckets.entry(h).or_default();

        if let Some(&sym) = bucket
            .iter()
            .find(|sym| self.strings[sym.0 as usize].as_ref() == s)
        {
            return sym;
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.into());
        bucket.push(sym);
        sym
    }

    /// Looks up a symbol without interning.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        let h = self.state.hash_one(s);
        self.buckets
            .get(&h)?
            .iter()
            .copied()
            .find(|sym| self.strings[sym.0 as usize].as_ref() == s)
    }

    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

// =============================================================================
// Arena Allocation
// =============================================================================

/// Nodes and their spans stored in parallel vectors.
#[derive(Debug)]
pub struct SpannedArena<T> {
    data: Vec<T>,
    spans: Vec<Span>,
}

impl<T> Default for SpannedArena<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl<T> SpannedArena<T> {
    #[inline]
    pub fn alloc(&mut self, node: T, span: Span) -> Id<T> {
        let id = Id::from_raw(self.data.len() as u32);
        self.data.push(node);
        self.spans.push(span);
        id
    }

    #[inline]
    pub fn span(&self, id: Id<T>) -> Span {
        self.spans[id.to_usize()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Index<Id<T>> for SpannedArena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        &self.data[id.to_usize()]
    }
}

impl<T> IndexMut<Id<T>> for SpannedArena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.data[id.to_usize()]
    }
}

pub type TypeId = Id<Type>;
pub type FieldId = Id<Field>;
pub type SignatureId = Id<Signature>;
pub type FuncDeclId = Id<FuncDecl>;
pub type TypeParamDeclId = Id<TypeParamDecl>;

// =============================================================================
// Centralized List Storage
// =============================================================================

#[derive(Debug, Default)]
pub struct ExtraData {
    pub ident_names: Vec<IdentName>,
    pub types: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub specs: Vec<Spec>,
    pub top_decls: Vec<TopLevelDecl>,
    pub type_terms: Vec<TypeTerm>,
    pub interface_elems: Vec<InterfaceElem>,
    pub type_param_decls: Vec<TypeParamDeclId>,
}

/// Central arena holding all nodes and list buffers of one file.
#[derive(Debug, Default)]
pub struct AstArena {
    pub types: SpannedArena<Type>,
    pub signatures: SpannedArena<Signature>,
    pub funcs: SpannedArena<FuncDecl>,
    pub fields: SpannedArena<Field>,
    pub type_param_decls: SpannedArena<TypeParamDecl>,
    pub extras: ExtraData,
}

macro_rules! list_buffers {
    ($($item:ty => $buf:ident, $push:ident, $get:ident;)*) => {
        impl AstArena {
            $(
                pub fn $push(&mut self, items: impl IntoIterator<Item = $item>) -> ListRef<$item> {
                    let buf = &mut self.extras.$buf;
                    let start = buf.len();
                    buf.extend(items);
                    ListRef::new(start as u32, (buf.len() - start) as u32)
                }

                pub fn $get(&self, r: ListRef<$item>) -> &[$item] {
                    &self.extras.$buf[r.range()]
                }
            )*
        }
    };
}

list_buffers! {
    IdentName => ident_names, list_ident_names, ident_names;
    TypeId => types, list_types, types_list;
    FieldId => fields, list_fields, fields_list;
    Spec => specs, list_specs, specs_list;
    TopLevelDecl => top_decls, list_top_decls, top_decls;
    TypeTerm => type_terms, list_type_terms, type_terms;
    InterfaceElem => interface_elems, list_interface_elems, interface_elems;
    TypeParamDeclId => type_param_decls, list_type_param_decls, type_param_decl_ids;
}

// =============================================================================
// Source File and Declarations
// =============================================================================

/// ```text
/// SourceFile = PackageClause ";" { ImportDecl ";" } { TopLevelDecl ";" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct SourceFile {
    pub package: IdentName,
    /// All declarations in source order, imports included.
    pub decls: ListRef<TopLevelDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum TopLevelDecl {
    Gen(GenDecl),
    Func(FuncDeclId),
}

/// `import`, `const`, `type` or `var` declaration, grouped or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct GenDecl {
    pub kw_pos: Span,
    pub kind: GenDeclKind,
    pub grouped: bool,
    pub specs: ListRef<Spec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenDeclKind {
    Import,
    Const,
    Type,
    Var,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Spec {
    Import(ImportSpec),
    Const(ConstSpec),
    Var(VarSpec),
    Type(TypeSpec),
}

/// `ImportSpec = [ "." | PackageName ] ImportPath`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct ImportSpec {
    pub name: Option<ImportName>,
    /// Unquoted import path.
    pub path: Symbol,
    pub path_pos: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum ImportName {
    Dot(Span),
    Blank(Span),
    Name(IdentName),
}

/// One line of a `const` declaration. The initializer is only evaluated when
/// it is a single integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct ConstSpec {
    pub names: ListRef<IdentName>,
    pub typ: Option<TypeId>,
    #[walk(skip)]
    pub value: ConstValue,
    /// Position within its group (the value of `iota`).
    #[walk(skip)]
    pub iota: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstValue {
    /// No initializer: repeats the previous line's expression.
    Implicit,
    Int(u64),
    /// The bare identifier `iota`.
    Iota,
    /// Any other expression.
    Expr(Span),
}

/// `var` line; initializers are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct VarSpec {
    pub names: ListRef<IdentName>,
    pub typ: Option<TypeId>,
}

/// `TypeSpec = AliasDecl | TypeDef`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeSpec {
    pub name: IdentName,
    pub type_params: ListRef<TypeParamDeclId>,
    pub alias: bool,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct FuncDecl {
    pub recv: Option<Receiver>,
    pub name: IdentName,
    pub type_params: ListRef<TypeParamDeclId>,
    pub sig: SignatureId,
    /// Span of the `{ ... }` body; `None` for external declarations.
    #[walk(skip)]
    pub body: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Receiver {
    pub name: Option<IdentName>,
    pub typ: TypeId,
}

/// `TypeParamDecl = IdentifierList TypeConstraint`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeParamDecl {
    pub names: ListRef<IdentName>,
    pub constraint: TypeId,
}

// =============================================================================
// Signatures and Fields
// =============================================================================

/// `Signature = Parameters [ Result ]`; a bare result type is one unnamed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Signature {
    pub params: ListRef<FieldId>,
    pub results: ListRef<FieldId>,
}

/// Parameter, result or struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Field {
    /// Empty for anonymous parameters and embedded struct fields.
    pub names: ListRef<IdentName>,
    pub ellipsis_pos: Option<Span>,
    pub typ: TypeId,
    #[walk(skip)]
    pub tag: Option<Span>,
}

impl Field {
    #[inline]
    pub fn is_variadic(&self) -> bool {
        self.ellipsis_pos.is_some()
    }
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Type {
    /// `Name`, `pkg.Name`, `Name[A, B]`
    Named {
        pkg: Option<IdentName>,
        name: IdentName,
        args: ListRef<TypeId>,
    },
    Pointer {
        elem: TypeId,
    },
    Array {
        #[walk(skip)]
        len: ArrayLen,
        elem: TypeId,
    },
    Slice {
        elem: TypeId,
    },
    Map {
        key: TypeId,
        val: TypeId,
    },
    Chan {
        dir: ChanDir,
        elem: TypeId,
    },
    Struct {
        fields: ListRef<FieldId>,
    },
    Interface {
        elems: ListRef<InterfaceElem>,
    },
    Func {
        sig: SignatureId,
    },
    /// `~int | string` in constraint position.
    Union {
        terms: ListRef<TypeTerm>,
    },
    Paren {
        typ: TypeId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    Int(u64),
    /// A named constant, possibly qualified.
    Const {
        pkg: Option<IdentName>,
        name: IdentName,
    },
    /// `[...]T`
    Ellipsis,
    /// Any other constant expression.
    Expr(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeTerm {
    pub tilde: bool,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum InterfaceElem {
    Method { name: IdentName, sig: SignatureId },
    /// Embedded interface or type-set element (`io.Reader`, `~int | ~uint`).
    Embed(TypeId),
}
