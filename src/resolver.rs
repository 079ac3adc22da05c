//! Locates the requested interface among the loaded packages and builds the
//! `InterfaceModel` the synthesizer consumes.

use std::path::Path;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::StubError;
use crate::imports::{collect_imports, ImportSet};
use crate::loader::{LoadedPackage, Loader, TypeResolver};
use crate::model::{Constraint, InterfaceModel, InterfaceShape, TypeRef};

/// Package the generated file is declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPackage {
    pub name: String,
    pub path: String,
}

/// Looks `interface_name` up in every package of `input_dir`.
///
/// A package whose declaration of the name is not an interface is skipped,
/// so a name that only ever names other types is reported as not found.
pub fn resolve_interface(
    loader: &mut Loader,
    input_dir: &Path,
    interface_name: &str,
    target: &TargetPackage,
    options_package: &str,
) -> Result<InterfaceModel, StubError> {
    let packages = loader.load_dir(input_dir)?;
    let mut found: Option<(Rc<LoadedPackage>, InterfaceModel)> = None;

    for pkg in packages {
        let qualifiers = pkg.qualifiers_of(interface_name);
        let Some(iface) =
            TypeResolver::new(loader, Rc::clone(&pkg)).interface(interface_name)?
        else {
            if pkg.has_type(interface_name) {
                debug!(package = %pkg.name, name = interface_name, "not an interface, skipping");
            }
            continue;
        };

        if let Some((first, _)) = &found {
            return Err(StubError::Duplicate {
                name: interface_name.to_owned(),
                first: first.name.clone(),
                second: pkg.name.clone(),
            });
        }

        debug!(
            package = %pkg.name,
            qualifiers = ?qualifiers,
            "found interface {interface_name}"
        );
        let model = InterfaceModel {
            target_package_name: target.name.clone(),
            target_package_path: target.path.clone(),
            source_package_name: pkg.name.clone(),
            source_package_path: pkg.path.clone(),
            interface_name: interface_name.to_owned(),
            type_params: iface.type_params,
            methods: iface.methods,
            imports: ImportSet::with_fixed(["sync", options_package]),
        };
        found = Some((pkg, model));
    }

    let Some((_, mut model)) = found else {
        return Err(StubError::NotFound {
            name: interface_name.to_owned(),
            dir: input_dir.to_path_buf(),
        });
    };

    collect_imports(&mut model);
    warn_unexported(&model);
    Ok(model)
}

/// Unexported source types cannot be named from another package; the
/// generated file would not compile there.
fn warn_unexported(model: &InterfaceModel) {
    if model.source_package_path == model.target_package_path {
        return;
    }
    let mut names = Vec::new();
    let mut visit = |t: &TypeRef| unexported_in(t, &model.source_package_path, &mut names);
    for tp in &model.type_params {
        match &tp.constraint {
            Constraint::Any => {}
            Constraint::Type(t) => visit(t),
            Constraint::Union(terms) => terms.iter().for_each(|term| visit(&term.typ)),
            Constraint::Interface(set) => {
                set.terms.iter().flatten().for_each(|term| visit(&term.typ));
                for m in &set.methods {
                    let sig = &m.sig;
                    sig.params.iter().chain(&sig.results).for_each(|f| visit(&f.typ));
                }
            }
        }
    }
    for m in &model.methods {
        m.params.iter().for_each(|p| visit(&p.typ));
        m.results.iter().for_each(|r| visit(&r.typ));
    }
    names.sort();
    names.dedup();
    for name in names {
        warn!(
            "type {name} of package {} is unexported; the stub will not compile in {}",
            model.source_package_name, model.target_package_path
        );
    }
}

fn unexported_in(t: &TypeRef, source_path: &str, out: &mut Vec<String>) {
    match t {
        TypeRef::Basic(_) | TypeRef::TypeParam(_) | TypeRef::Interface(InterfaceShape::Empty) => {}
        TypeRef::Named(named) => {
            if named.pkg_path == source_path
                && named.name.starts_with(|c: char| !c.is_uppercase())
            {
                out.push(named.name.clone());
            }
            for arg in &named.type_args {
                unexported_in(arg, source_path, out);
            }
        }
        TypeRef::Pointer(elem)
        | TypeRef::Slice(elem)
        | TypeRef::Array(_, elem)
        | TypeRef::Chan(_, elem) => unexported_in(elem, source_path, out),
        TypeRef::Map(key, val) => {
            unexported_in(key, source_path, out);
            unexported_in(val, source_path, out);
        }
        TypeRef::Func(sig) => {
            for field in sig.params.iter().chain(&sig.results) {
                unexported_in(&field.typ, source_path, out);
            }
        }
        TypeRef::Interface(InterfaceShape::NonEmpty(methods)) => {
            for m in methods {
                for field in m.sig.params.iter().chain(&m.sig.results) {
                    unexported_in(&field.typ, source_path, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const OPTIONS: &str = "github.com/phildrip/toe/options";

    fn target() -> TargetPackage {
        TargetPackage {
            name: "stubs".into(),
            path: "example.com/app/stubs".into(),
        }
    }

    fn module_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("go.mod"), "module example.com/app\n").expect("go.mod");
        for (name, src) in files {
            fs::write(tmp.path().join(name), src).expect("write");
        }
        tmp
    }

    #[test]
    fn builds_model_with_imports() {
        let tmp = module_with(&[(
            "svc.go",
            "package app\n\
             import (\n\
                 \"context\"\n\
                 nethttp \"net/http\"\n\
             )\n\
             type Handler interface {\n\
                 Serve(ctx context.Context, r *nethttp.Request) (Result, error)\n\
             }\n\
             type Result struct{}\n",
        )]);
        let model = resolve_interface(&mut Loader::new(), tmp.path(), "Handler", &target(), OPTIONS)
            .expect("resolves");
        assert_eq!(model.source_package_path, "example.com/app");
        assert_eq!(model.source_package_name, "app");
        let foreign: Vec<_> = model.imports.foreign().collect();
        assert_eq!(
            foreign,
            [
                ("context", "context"),
                ("example.com/app", "app"),
                ("net/http", "http"),
            ]
        );
    }

    #[test]
    fn missing_and_non_interface_names_are_not_found() {
        let tmp = module_with(&[(
            "t.go",
            "package app\ntype Thing struct{}\ntype Doer interface{ Do() }\n",
        )]);
        for name in ["Thing", "Nope"] {
            let err = resolve_interface(&mut Loader::new(), tmp.path(), name, &target(), OPTIONS)
                .expect_err("not found");
            assert!(matches!(err, StubError::NotFound { .. }), "{err}");
        }
    }

    #[test]
    fn duplicates_across_packages_are_rejected() {
        let tmp = module_with(&[
            ("a.go", "package alpha\ntype Doer interface{ Do() }\n"),
            ("b.go", "package beta\ntype Doer interface{ Do() }\n"),
        ]);
        let err = resolve_interface(&mut Loader::new(), tmp.path(), "Doer", &target(), OPTIONS)
            .expect_err("duplicate");
        assert_eq!(
            err.to_string(),
            "found duplicate interface Doer in package alpha and beta"
        );
    }

    #[test]
    fn same_package_target_needs_no_source_import() {
        let tmp = module_with(&[(
            "t.go",
            "package app\ntype item struct{}\ntype Lister interface{ List() []item }\n",
        )]);
        let target = TargetPackage {
            name: "app".into(),
            path: "example.com/app".into(),
        };
        let model = resolve_interface(&mut Loader::new(), tmp.path(), "Lister", &target, OPTIONS)
            .expect("resolves");
        assert_eq!(model.imports.foreign().count(), 0);

        let mut names = Vec::new();
        unexported_in(&model.methods[0].results[0].typ, "example.com/app", &mut names);
        assert_eq!(names, ["item"]);
    }
}
