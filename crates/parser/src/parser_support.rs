use crate::ast::{self, Span};

/// One comma-separated entry of a parameter list before grouping.
///
/// `a, b int` arrives as two entries: `a` (names only) and `b int`.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub names: Vec<ast::IdentName>,
    pub ellipsis_pos: Option<Span>,
    pub typ: Option<ast::TypeId>,
    pub span: Span,
}

impl ParamDecl {
    fn is_named_and_typed(&self) -> bool {
        !self.names.is_empty() && self.typ.is_some()
    }
}

/// Groups raw parameter entries into fields.
///
/// If any entry carries both a name and a type, the list is in named form and
/// bare names attach to the next typed entry (`a, b int`). Otherwise every
/// entry is a type and a bare identifier is a type name (`func(int, error)`).
pub fn resolve_param_list(
    arena: &mut ast::AstArena,
    params: Vec<ParamDecl>,
) -> Vec<ast::FieldId> {
    let named = params.iter().any(ParamDecl::is_named_and_typed);
    let mut out = Vec::with_capacity(params.len());

    if !named {
        for param in params {
            let typ = match param.typ {
                Some(typ) => typ,
                None => match param.names.first() {
                    Some(&name) => named_type_from_ident(arena, name),
                    None => continue,
                },
            };
            let field = ast::Field {
                names: ast::ListRef::EMPTY,
                ellipsis_pos: param.ellipsis_pos,
                typ,
                tag: None,
            };
            out.push(arena.fields.alloc(field, param.span));
        }
        return out;
    }

    let mut pending_names: Vec<ast::IdentName> = Vec::new();
    let mut pending_start: Option<u32> = None;

    for param in params {
        let Some(typ) = param.typ else {
            if pending_names.is_empty() {
                pending_start = Some(param.span.start);
            }
            pending_names.extend(param.names);
            continue;
        };

        let mut names = std::mem::take(&mut pending_names);
        names.extend(param.names);
        let names_ref = if names.is_empty() {
            ast::ListRef::EMPTY
        } else {
            arena.list_ident_names(names)
        };
        let span = Span {
            start: pending_start.take().unwrap_or(param.span.start),
            end: param.span.end,
        };
        let field = ast::Field {
            names: names_ref,
            ellipsis_pos: param.ellipsis_pos,
            typ,
            tag: None,
        };
        out.push(arena.fields.alloc(field, span));
    }

    // Trailing names without a type (`func(a, b)` mixed with named entries)
    // are treated as type names, like the unnamed form.
    for name in pending_names {
        let typ = named_type_from_ident(arena, name);
        let field = ast::Field {
            names: ast::ListRef::EMPTY,
            ellipsis_pos: None,
            typ,
            tag: None,
        };
        out.push(arena.fields.alloc(field, name.pos));
    }

    out
}

fn named_type_from_ident(arena: &mut ast::AstArena, name: ast::IdentName) -> ast::TypeId {
    arena.types.alloc(
        ast::Type::Named {
            pkg: None,
            name,
            args: ast::ListRef::EMPTY,
        },
        name.pos,
    )
}
