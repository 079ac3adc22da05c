//! Import set of the generated file and the collector that fills it.

use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use crate::model::{Constraint, FuncType, InterfaceModel, InterfaceShape, TypeParam, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    local: String,
    /// Imported unconditionally by the synthesizer.
    fixed: bool,
}

/// Import path → local name, ordered by path. Local names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    entries: BTreeMap<String, Entry>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pre-populated with imports the synthesizer always emits; their
    /// local names are claimed before any foreign package is seen.
    pub fn with_fixed<'a>(fixed: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::new();
        for path in fixed {
            let local = set.unique_local(&default_local_name(path));
            set.entries
                .insert(path.to_owned(), Entry { local, fixed: true });
        }
        set
    }

    /// Records `path` and returns the local name it is imported under.
    ///
    /// Re-inserting a known path is a no-op that returns the existing name.
    /// A preferred name already used by another path is suffixed `2`, `3`, ...
    pub fn insert(&mut self, path: &str, preferred: &str) -> &str {
        if !self.entries.contains_key(path) {
            let preferred = if is_identifier(preferred) {
                preferred.to_owned()
            } else {
                default_local_name(path)
            };
            let local = self.unique_local(&preferred);
            trace!(path, local = %local, "import");
            self.entries.insert(
                path.to_owned(),
                Entry {
                    local,
                    fixed: false,
                },
            );
        }
        self.entries
            .get(path)
            .map(|e| e.local.as_str())
            .unwrap_or_default()
    }

    fn unique_local(&self, preferred: &str) -> String {
        if !self.local_taken(preferred) {
            return preferred.to_owned();
        }
        (2..)
            .map(|n| format!("{preferred}{n}"))
            .find(|candidate| !self.local_taken(candidate))
            .unwrap_or_else(|| preferred.to_owned())
    }

    fn local_taken(&self, name: &str) -> bool {
        self.entries.values().any(|e| e.local == name)
    }

    pub fn local_name(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(|e| e.local.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// All entries, fixed ones included, ordered by path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(path, e)| (path.as_str(), e.local.as_str()))
    }

    /// Entries contributed by the interface's types.
    pub fn foreign(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .filter(|(_, e)| !e.fixed)
            .map(|(path, e)| (path.as_str(), e.local.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Alias to print for `path`, or `None` when the local name is the one
    /// Go tooling would assume anyway.
    pub fn alias(&self, path: &str) -> Option<&str> {
        let local = self.local_name(path)?;
        (local != default_local_name(path)).then_some(local)
    }
}

/// Package name Go tooling assumes for an import path: the last element,
/// skipping a `vN` major-version element, without a `go-` prefix, cut at
/// the first character that cannot appear in an identifier (`yaml.v3`).
pub fn default_local_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut base = segments.next().unwrap_or(path);
    if is_major_version(base) {
        if let Some(parent) = segments.next() {
            base = parent;
        }
    }
    let base = base.strip_prefix("go-").unwrap_or(base);
    let end = base
        .char_indices()
        .find(|&(_, c)| !(c == '_' || c.is_alphanumeric()))
        .map_or(base.len(), |(i, _)| i);
    base[..end].to_owned()
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

// =============================================================================
// Collector
// =============================================================================

/// Walks `TypeRef`s and records every package other than the target.
pub struct ImportCollector<'a> {
    target_path: &'a str,
    type_params: &'a [TypeParam],
    imports: &'a mut ImportSet,
    visited: HashSet<String>,
}

impl<'a> ImportCollector<'a> {
    pub fn new(
        target_path: &'a str,
        type_params: &'a [TypeParam],
        imports: &'a mut ImportSet,
    ) -> Self {
        Self {
            target_path,
            type_params,
            imports,
            visited: HashSet::new(),
        }
    }

    pub fn collect(&mut self, t: &TypeRef) {
        match t {
            TypeRef::Basic(_) | TypeRef::Interface(InterfaceShape::Empty) => {}
            TypeRef::Named(named) => {
                if !self.visited.insert(format!("{}\0{named}", named.pkg_path)) {
                    return;
                }
                if !named.pkg_path.is_empty() && named.pkg_path != self.target_path {
                    self.imports.insert(&named.pkg_path, &named.pkg_name);
                }
                for arg in &named.type_args {
                    self.collect(arg);
                }
            }
            TypeRef::Pointer(elem)
            | TypeRef::Slice(elem)
            | TypeRef::Array(_, elem)
            | TypeRef::Chan(_, elem) => self.collect(elem),
            TypeRef::Map(key, val) => {
                self.collect(key);
                self.collect(val);
            }
            TypeRef::Func(sig) => self.collect_func(sig),
            // Anonymous interfaces are printed from their method set, so the
            // packages their signatures mention must be imported too.
            TypeRef::Interface(InterfaceShape::NonEmpty(methods)) => {
                for m in methods {
                    self.collect_func(&m.sig);
                }
            }
            TypeRef::TypeParam(name) => {
                if !self.visited.insert(format!("\0tp\0{name}")) {
                    return;
                }
                let constraint = self
                    .type_params
                    .iter()
                    .find(|tp| &tp.name == name)
                    .map(|tp| &tp.constraint);
                if let Some(c) = constraint {
                    self.collect_constraint(c);
                }
            }
        }
    }

    pub fn collect_func(&mut self, sig: &FuncType) {
        for field in sig.params.iter().chain(&sig.results) {
            self.collect(&field.typ);
        }
    }

    pub fn collect_constraint(&mut self, c: &Constraint) {
        match c {
            Constraint::Any => {}
            Constraint::Type(t) => self.collect(t),
            Constraint::Union(terms) => {
                for term in terms {
                    self.collect(&term.typ);
                }
            }
            Constraint::Interface(set) => {
                for term in set.terms.iter().flatten() {
                    self.collect(&term.typ);
                }
                for m in &set.methods {
                    self.collect_func(&m.sig);
                }
            }
        }
    }
}

/// Fills `model.imports` from the constraints and method signatures.
pub fn collect_imports(model: &mut InterfaceModel) {
    let mut imports = std::mem::take(&mut model.imports);
    {
        let mut collector =
            ImportCollector::new(&model.target_package_path, &model.type_params, &mut imports);
        for tp in &model.type_params {
            collector.collect_constraint(&tp.constraint);
        }
        for method in &model.methods {
            for p in &method.params {
                collector.collect(&p.typ);
            }
            for r in &method.results {
                collector.collect(&r.typ);
            }
        }
    }
    model.imports = imports;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NamedType;
    use proptest::prelude::*;

    fn named(path: &str, name: &str) -> TypeRef {
        TypeRef::Named(NamedType {
            pkg_path: path.to_owned(),
            pkg_name: default_local_name(path),
            name: name.to_owned(),
            type_args: Vec::new(),
        })
    }

    #[test]
    fn default_names_follow_go_tooling() {
        assert_eq!(default_local_name("context"), "context");
        assert_eq!(default_local_name("net/http"), "http");
        assert_eq!(default_local_name("github.com/foo/bar/v2"), "bar");
        assert_eq!(default_local_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(default_local_name("github.com/mattn/go-sqlite3"), "sqlite3");
        assert_eq!(default_local_name("example.com/my-lib"), "my");
    }

    #[test]
    fn collisions_get_numbered_aliases() {
        let mut set = ImportSet::with_fixed(["sync", "github.com/phildrip/toe/options"]);
        assert_eq!(set.insert("math/rand", "rand"), "rand");
        assert_eq!(set.insert("crypto/rand", "rand"), "rand2");
        assert_eq!(set.insert("math/rand", "rand"), "rand");
        assert_eq!(set.insert("example.com/sync", "sync"), "sync2");
        assert_eq!(set.alias("crypto/rand"), Some("rand2"));
        assert_eq!(set.alias("math/rand"), None);
        let foreign: Vec<_> = set.foreign().map(|(p, _)| p).collect();
        assert_eq!(foreign, ["crypto/rand", "example.com/sync", "math/rand"]);
    }

    #[test]
    fn collector_skips_target_and_predeclared() {
        let mut set = ImportSet::new();
        let tps = [TypeParam {
            name: "T".into(),
            constraint: Constraint::Type(named("golang.org/x/exp/constraints", "Ordered")),
        }];
        let mut c = ImportCollector::new("example.com/app/stubs", &tps, &mut set);
        c.collect(&TypeRef::Map(
            Box::new(named("example.com/app/stubs", "Local")),
            Box::new(TypeRef::Chan(
                crate::model::ChanDir::Both,
                Box::new(TypeRef::Named(NamedType::predeclared("error"))),
            )),
        ));
        c.collect(&TypeRef::Slice(Box::new(TypeRef::TypeParam("T".into()))));
        c.collect(&TypeRef::Pointer(Box::new(named("net/http", "Request"))));
        let paths: Vec<_> = set.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["golang.org/x/exp/constraints", "net/http"]);
    }

    proptest! {
        #[test]
        fn locals_stay_unique(paths in proptest::collection::vec("[a-c]{1,2}(/[a-c]{1,2}){0,2}", 0..24)) {
            let mut set = ImportSet::with_fixed(["sync"]);
            for p in &paths {
                let preferred = default_local_name(p);
                set.insert(p, &preferred);
            }
            let locals: Vec<_> = set.iter().map(|(_, l)| l.to_owned()).collect();
            let unique: HashSet<_> = locals.iter().cloned().collect();
            prop_assert_eq!(locals.len(), unique.len());
            for (path, _) in set.iter() {
                prop_assert!(set.local_name(path).is_some_and(is_identifier));
            }
        }
    }
}
