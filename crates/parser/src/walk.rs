use crate::ast::*;

// Core traits
pub trait Walk<'ast> {
    fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V);
}

/// Hooks default to plain recursion; override one and call `walk` on the node
/// to keep descending.
pub trait Visitor<'ast> {
    #[inline(always)]
    fn visit_source_file(&mut self, a: &'ast AstArena, f: &'ast SourceFile) {
        f.walk(a, self);
    }

    #[inline(always)]
    fn visit_func_decl(&mut self, a: &'ast AstArena, id: FuncDeclId) {
        a.funcs[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_type(&mut self, a: &'ast AstArena, id: TypeId) {
        a.types[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_field(&mut self, a: &'ast AstArena, id: FieldId) {
        a.fields[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_signature(&mut self, a: &'ast AstArena, id: SignatureId) {
        a.signatures[id].walk(a, self);
    }

    #[inline(always)]
    fn visit_type_param_decl(&mut self, a: &'ast AstArena, id: TypeParamDeclId) {
        a.type_param_decls[id].walk(a, self);
    }
}

macro_rules! impl_walk_for_ids {
    ($($id:ty => $visit:ident),* $(,)?) => {
        $(
            impl<'ast> Walk<'ast> for $id {
                #[inline(always)]
                fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V) {
                    v.$visit(a, *self);
                }
            }
        )*
    };
}

impl_walk_for_ids! {
    FuncDeclId => visit_func_decl,
    TypeId => visit_type,
    FieldId => visit_field,
    SignatureId => visit_signature,
    TypeParamDeclId => visit_type_param_decl,
}

pub trait ListSlice<T> {
    fn slice(&self, r: ListRef<T>) -> &[T];
}

impl<'ast, T> Walk<'ast> for ListRef<T>
where
    AstArena: ListSlice<T>,
    T: Walk<'ast> + 'ast,
{
    #[inline(always)]
    fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V) {
        for item in a.slice(*self) {
            item.walk(a, v);
        }
    }
}

macro_rules! impl_list_slice {
    ($($t:ty => $getter:ident),* $(,)?) => {
        $(
            impl ListSlice<$t> for AstArena {
                #[inline(always)]
                fn slice(&self, r: ListRef<$t>) -> &[$t] {
                    self.$getter(r)
                }
            }
        )*
    };
}

impl_list_slice! {
    IdentName => ident_names,
    TypeId => types_list,
    FieldId => fields_list,
    Spec => specs_list,
    TopLevelDecl => top_decls,
    TypeTerm => type_terms,
    InterfaceElem => interface_elems,
    TypeParamDeclId => type_param_decl_ids,
}

impl<'ast, T: Walk<'ast>> Walk<'ast> for Option<T> {
    #[inline(always)]
    fn walk<V: Visitor<'ast> + ?Sized>(&self, a: &'ast AstArena, v: &mut V) {
        if let Some(x) = self {
            x.walk(a, v);
        }
    }
}

// Leaves
macro_rules! impl_walk_noop {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<'ast> Walk<'ast> for $ty {
                #[inline(always)]
                fn walk<V: Visitor<'ast> + ?Sized>(&self, _: &'ast AstArena, _: &mut V) {}
            }
        )*
    };
}

impl_walk_noop! {
    Span,
    Symbol,
    bool,
    GenDeclKind,
    ChanDir,
}
