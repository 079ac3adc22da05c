//! Identifier choices for the generated code.
//!
//! Everything here is deterministic: the same method set always yields the
//! same names.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Method, TypeRef};

/// How fields of a `Returns` record are named when the result is unnamed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResultNaming {
    /// `R0`, `R1`, ...
    #[default]
    Positional,
    /// Title-cased base type name plus position: `Int0`, `Error1`.
    TypeBased,
}

/// Upper-cases the first character.
pub fn title(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Simple name of a type with pointers, slices, arrays and channels peeled
/// off.
pub fn base_type_name(t: &TypeRef) -> String {
    match t {
        TypeRef::Basic(name) | TypeRef::TypeParam(name) => name.clone(),
        TypeRef::Named(named) => named.name.clone(),
        TypeRef::Pointer(elem)
        | TypeRef::Slice(elem)
        | TypeRef::Array(_, elem)
        | TypeRef::Chan(_, elem) => base_type_name(elem),
        TypeRef::Map(..) => "Map".to_owned(),
        TypeRef::Interface(_) => "Interface".to_owned(),
        TypeRef::Func(_) => "Any".to_owned(),
    }
}

/// Names used inside one generated method and its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNames {
    /// Parameter names in the generated signature and body.
    pub params: Vec<String>,
    pub call_fields: Vec<String>,
    pub return_fields: Vec<String>,
}

/// Picks parameter and record field names for `method`.
///
/// `body_idents` are identifiers the method body refers to (type
/// parameters, the call record type); a parameter may not shadow them.
pub fn method_names(method: &Method, body_idents: &[&str], naming: ResultNaming) -> MethodNames {
    let reserved: HashSet<&str> = ["append", "nil"].iter().chain(body_idents).copied().collect();
    let mut taken: HashSet<String> = reserved.iter().map(|s| (*s).to_owned()).collect();

    let mut params = Vec::with_capacity(method.params.len());
    for (i, p) in method.params.iter().enumerate() {
        let base = if p.name.is_empty() || p.name == "_" {
            format!("arg{i}")
        } else if reserved.contains(p.name.as_str()) {
            format!("{}Arg", p.name)
        } else {
            p.name.clone()
        };
        let name = unique(&base, &taken);
        taken.insert(name.clone());
        params.push(name);
    }

    let call_fields = positional_unique(method.params.iter().enumerate().map(|(i, p)| {
        if p.name.is_empty() || p.name == "_" {
            format!("Arg{i}")
        } else {
            title(&p.name)
        }
    }));

    let return_fields = positional_unique(method.results.iter().enumerate().map(|(i, r)| {
        match (naming, r.name.as_deref()) {
            (ResultNaming::TypeBased, None | Some("_")) => {
                format!("{}{i}", title(&base_type_name(&r.typ)))
            }
            _ => title(&r.display_name(i)),
        }
    }));

    MethodNames {
        params,
        call_fields,
        return_fields,
    }
}

/// Receiver name that no parameter or type parameter uses.
pub fn receiver_name<'a>(
    param_names: impl IntoIterator<Item = &'a str>,
    type_params: &[&'a str],
) -> String {
    let used: HashSet<&str> = param_names.into_iter().chain(type_params.iter().copied()).collect();
    ["s", "stub"]
        .into_iter()
        .find(|c| !used.contains(c))
        .map(str::to_owned)
        .unwrap_or_else(|| unique("s", &used.iter().map(|s| (*s).to_owned()).collect()))
}

/// Constructor parameter holding the stub options. It shares a scope with
/// the type parameters and must not hide the options package.
pub fn options_param(type_params: &[&str], options_local: &str) -> String {
    let taken: HashSet<String> = type_params
        .iter()
        .copied()
        .chain([options_local])
        .map(str::to_owned)
        .collect();
    unique("opts", &taken)
}

/// Stub struct field names for one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubFields {
    pub func: String,
    pub calls: String,
    pub returns: String,
}

/// Every field of the stub struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubNames {
    pub mu: String,
    pub is_locked: String,
    /// Per-method fields, in method order.
    pub methods: Vec<StubFields>,
}

/// `mu`, `isLocked` and `{M}Func`, `{M}Calls`, `{M}Returns` for every
/// method. Fields and methods share one namespace, so any name already
/// claimed by a method or an earlier field gets a trailing `_`.
pub fn stub_fields(methods: &[Method]) -> StubNames {
    let mut taken: HashSet<String> = methods.iter().map(|m| m.name.clone()).collect();
    let mut claim = |base: String| {
        let mut name = base;
        while taken.contains(&name) {
            name.push('_');
        }
        taken.insert(name.clone());
        name
    };

    StubNames {
        mu: claim("mu".to_owned()),
        is_locked: claim("isLocked".to_owned()),
        methods: methods
            .iter()
            .map(|m| StubFields {
                func: claim(format!("{}Func", m.name)),
                calls: claim(format!("{}Calls", m.name)),
                returns: claim(format!("{}Returns", m.name)),
            })
            .collect(),
    }
}

fn unique(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_owned();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_owned())
}

/// Names that repeat an earlier one get their position appended.
fn positional_unique(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (i, name) in names.enumerate() {
        let mut name = if seen.contains(&name) {
            format!("{name}{i}")
        } else {
            name
        };
        while seen.contains(&name) {
            name.push('_');
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::is_identifier;
    use crate::model::{NamedType, Param, ResultVar};
    use proptest::prelude::*;

    fn basic(name: &str) -> TypeRef {
        TypeRef::Basic(name.into())
    }

    fn param(name: &str) -> Param {
        Param {
            name: name.into(),
            typ: basic("int"),
            variadic: false,
        }
    }

    #[test]
    fn titles_and_base_names() {
        assert_eq!(title("value"), "Value");
        assert_eq!(title("_x"), "_x");
        assert_eq!(title("ñu"), "Ñu");
        assert_eq!(title(""), "");

        let err = TypeRef::Named(NamedType::predeclared("error"));
        assert_eq!(base_type_name(&err), "error");
        assert_eq!(
            base_type_name(&TypeRef::Pointer(Box::new(TypeRef::Slice(Box::new(basic("int")))))),
            "int"
        );
        assert_eq!(
            base_type_name(&TypeRef::Map(Box::new(basic("string")), Box::new(basic("int")))),
            "Map"
        );
    }

    #[test]
    fn result_field_styles() {
        let method = Method {
            name: "Calculate".into(),
            params: vec![param("x"), param("y")],
            results: vec![
                ResultVar {
                    name: None,
                    typ: basic("int"),
                },
                ResultVar {
                    name: None,
                    typ: TypeRef::Named(NamedType::predeclared("error")),
                },
            ],
        };
        let positional = method_names(&method, &[], ResultNaming::Positional);
        assert_eq!(positional.call_fields, ["X", "Y"]);
        assert_eq!(positional.return_fields, ["R0", "R1"]);
        let typed = method_names(&method, &[], ResultNaming::TypeBased);
        assert_eq!(typed.return_fields, ["Int0", "Error1"]);
    }

    #[test]
    fn parameter_hygiene() {
        let method = Method {
            name: "Do".into(),
            params: vec![param("_"), param("append"), param("T"), param("arg0"), param("a"), param("A")],
            results: vec![],
        };
        let names = method_names(&method, &["T"], ResultNaming::Positional);
        assert_eq!(names.params, ["arg0", "appendArg", "TArg", "arg02", "a", "A"]);
        assert_eq!(names.call_fields, ["Arg0", "Append", "T", "Arg03", "A", "A5"]);
    }

    #[test]
    fn receivers_and_stub_fields() {
        assert_eq!(receiver_name(["x", "y"], &[]), "s");
        assert_eq!(receiver_name(["s"], &[]), "stub");
        assert_eq!(receiver_name(["s", "stub", "s2"], &[]), "s3");
        assert_eq!(receiver_name(["v"], &["s"]), "stub");

        let m = |name: &str| Method {
            name: name.into(),
            params: vec![],
            results: vec![],
        };
        let names = stub_fields(&[m("Do"), m("DoFunc"), m("muReturns")]);
        assert_eq!(names.mu, "mu");
        assert_eq!(names.is_locked, "isLocked");
        assert_eq!(names.methods[0].func, "DoFunc_");
        assert_eq!(names.methods[0].calls, "DoCalls");
        assert_eq!(names.methods[1].func, "DoFuncFunc");
        assert_eq!(names.methods[2].returns, "muReturnsReturns");
    }

    #[test]
    fn fixed_fields_yield_to_methods() {
        let m = |name: &str| Method {
            name: name.into(),
            params: vec![],
            results: vec![],
        };
        let names = stub_fields(&[m("isLocked"), m("mu"), m("mu_")]);
        assert_eq!(names.mu, "mu__");
        assert_eq!(names.is_locked, "isLocked_");
        assert_eq!(names.methods[1].func, "muFunc");

        assert_eq!(options_param(&["K", "V"], "options"), "opts");
        assert_eq!(options_param(&["opts"], "options"), "opts2");
        assert_eq!(options_param(&[], "opts"), "opts2");
    }

    proptest! {
        #[test]
        fn params_are_unique_identifiers(names in proptest::collection::vec("_|[a-c]{1,2}|arg[0-3]|append|nil", 0..8)) {
            let method = Method {
                name: "M".into(),
                params: names.iter().map(|n| param(n)).collect(),
                results: vec![],
            };
            let out = method_names(&method, &["T"], ResultNaming::Positional);
            let set: HashSet<_> = out.params.iter().collect();
            prop_assert_eq!(set.len(), out.params.len());
            prop_assert!(out.params.iter().all(|p| is_identifier(p) && p != "_" && p != "nil" && p != "append"));
            let fields: HashSet<_> = out.call_fields.iter().collect();
            prop_assert_eq!(fields.len(), out.call_fields.len());
        }
    }
}
