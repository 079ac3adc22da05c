//! Builds the stub's syntax tree from an `InterfaceModel`.

use tracing::debug;

use crate::config::DEFAULT_OPTIONS_PACKAGE;
use crate::error::StubError;
use crate::goast::{Decl, Expr, FieldExpr, File, FuncDecl, FuncTypeExpr, ImportSpec, Stmt, TypeSpec};
use crate::model::{InterfaceModel, Method};
use crate::naming::{
    method_names, options_param, receiver_name, stub_fields, MethodNames, ResultNaming, StubFields,
};
use crate::render::{type_args, TypeRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthOptions {
    /// Import path of the package declaring `StubOptions`.
    pub options_package: String,
    pub result_naming: ResultNaming,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            options_package: DEFAULT_OPTIONS_PACKAGE.to_owned(),
            result_naming: ResultNaming::default(),
        }
    }
}

/// `mu` and `isLocked` unless a method already uses the name.
struct LockFields {
    mu: String,
    is_locked: String,
}

/// Per-method names, computed once and shared by every emitted piece.
struct MethodPlan<'m> {
    method: &'m Method,
    call_type: String,
    returns_type: String,
    names: MethodNames,
    fields: StubFields,
}

pub fn synthesize(model: &InterfaceModel, opts: &SynthOptions) -> Result<File, StubError> {
    let options_local = model
        .imports
        .local_name(&opts.options_package)
        .ok_or_else(|| {
            StubError::Render(format!(
                "options package {} is not imported",
                opts.options_package
            ))
        })?;
    let sync_local = model.imports.local_name("sync").unwrap_or("sync");

    let r = TypeRenderer::new(&model.target_package_path, &model.imports);
    let stub = format!("Stub{}", model.interface_name);
    let tparams = r.type_params(&model.type_params);
    let targs = type_args(&model.type_params);
    let tparam_names: Vec<&str> = model.type_params.iter().map(|tp| tp.name.as_str()).collect();
    let fixed = stub_fields(&model.methods);

    let plans: Vec<MethodPlan<'_>> = model
        .methods
        .iter()
        .zip(fixed.methods)
        .map(|(method, fields)| {
            let call_type = format!("{stub}{}Call", method.name);
            let mut body_idents = tparam_names.clone();
            body_idents.push(&call_type);
            let names = method_names(method, &body_idents, opts.result_naming);
            MethodPlan {
                returns_type: format!("{stub}{}Returns", method.name),
                call_type,
                method,
                names,
                fields,
            }
        })
        .collect();
    let recv = receiver_name(
        plans
            .iter()
            .flat_map(|p| p.names.params.iter().map(String::as_str)),
        &tparam_names,
    );
    let locks = LockFields {
        mu: fixed.mu,
        is_locked: fixed.is_locked,
    };
    let opts_param = options_param(&tparam_names, options_local);

    let mut decls = vec![Decl::Import(
        model
            .imports
            .iter()
            .map(|(path, _)| ImportSpec {
                name: model.imports.alias(path).map(str::to_owned),
                path: path.to_owned(),
            })
            .collect(),
    )];

    // Records, then the stub struct.
    for plan in &plans {
        let call_fields = plan
            .names
            .call_fields
            .iter()
            .zip(&plan.method.params)
            .map(|(name, p)| FieldExpr::named(name, r.expr(&p.typ)))
            .collect();
        decls.push(Decl::Type(TypeSpec {
            name: plan.call_type.clone(),
            type_params: tparams.clone(),
            typ: Expr::StructType(call_fields),
        }));

        if !plan.method.results.is_empty() {
            let returns_fields = plan
                .names
                .return_fields
                .iter()
                .zip(&plan.method.results)
                .map(|(name, res)| FieldExpr::named(name, r.expr(&res.typ)))
                .collect();
            decls.push(Decl::Type(TypeSpec {
                name: plan.returns_type.clone(),
                type_params: tparams.clone(),
                typ: Expr::StructType(returns_fields),
            }));
        }
    }

    let mut members = vec![
        FieldExpr::named(&locks.mu, Expr::ident(sync_local).sel("Mutex")),
        FieldExpr::named(&locks.is_locked, Expr::ident("bool")),
    ];
    for plan in &plans {
        members.push(FieldExpr::named(
            &plan.fields.func,
            Expr::FuncType(signature(&r, plan)),
        ));
        members.push(FieldExpr::named(
            &plan.fields.calls,
            Expr::ArrayType {
                len: None,
                elem: Box::new(Expr::ident(&plan.call_type).index(targs.clone())),
            },
        ));
        if !plan.method.results.is_empty() {
            members.push(FieldExpr::named(
                &plan.fields.returns,
                Expr::ident(&plan.returns_type).index(targs.clone()),
            ));
        }
    }
    decls.push(Decl::Type(TypeSpec {
        name: stub.clone(),
        type_params: tparams.clone(),
        typ: Expr::StructType(members),
    }));

    let stub_type = Expr::ident(&stub).index(targs.clone());
    decls.push(Decl::Func(FuncDecl {
        recv: None,
        name: format!("New{stub}"),
        typ: FuncTypeExpr {
            type_params: tparams,
            params: vec![FieldExpr::named(
                &opts_param,
                Expr::ident(options_local).sel("StubOptions"),
            )],
            results: vec![FieldExpr::anonymous(stub_type.clone().star())],
        },
        body: vec![Stmt::Return(vec![Expr::AddrOf(Box::new(Expr::CompositeLit {
            typ: Box::new(stub_type.clone()),
            elts: vec![(
                locks.is_locked.clone(),
                Expr::ident(&opts_param).sel("WithLocking"),
            )],
        }))])],
    }));

    for plan in &plans {
        decls.push(Decl::Func(FuncDecl {
            recv: Some(FieldExpr::named(&recv, stub_type.clone().star())),
            name: plan.method.name.clone(),
            typ: signature(&r, plan),
            body: method_body(&recv, &locks, plan, &targs),
        }));
    }

    debug!(
        stub = %stub,
        methods = plans.len(),
        generic = model.is_generic(),
        "synthesized stub"
    );
    Ok(File {
        package: model.target_package_name.clone(),
        decls,
    })
}

/// The method's signature with the generated parameter names; results are
/// left unnamed.
fn signature(r: &TypeRenderer<'_>, plan: &MethodPlan<'_>) -> FuncTypeExpr {
    let params = plan
        .names
        .params
        .iter()
        .zip(&plan.method.params)
        .map(|(name, p)| {
            let typ = if p.variadic {
                Expr::Ellipsis(Box::new(r.expr(p.declared_type())))
            } else {
                r.expr(&p.typ)
            };
            FieldExpr::named(name, typ)
        })
        .collect();
    let results = plan
        .method
        .results
        .iter()
        .map(|res| FieldExpr::anonymous(r.expr(&res.typ)))
        .collect();
    FuncTypeExpr {
        type_params: Vec::new(),
        params,
        results,
    }
}

fn method_body(
    recv: &str,
    locks: &LockFields,
    plan: &MethodPlan<'_>,
    targs: &[Expr],
) -> Vec<Stmt> {
    let s = || Expr::ident(recv);
    let mu = || s().sel(&locks.mu);
    let calls = s().sel(&plan.fields.calls);

    let mut body = vec![
        Stmt::If {
            cond: s().sel(&locks.is_locked),
            body: vec![
                Stmt::Expr(mu().sel("Lock").call(Vec::new())),
                Stmt::Defer(mu().sel("Unlock").call(Vec::new())),
            ],
            els: None,
        },
        Stmt::Assign(
            vec![calls.clone()],
            vec![Expr::ident("append").call(vec![
                calls,
                Expr::CompositeLit {
                    typ: Box::new(Expr::ident(&plan.call_type).index(targs.to_vec())),
                    elts: plan
                        .names
                        .call_fields
                        .iter()
                        .zip(&plan.names.params)
                        .map(|(field, param)| (field.clone(), Expr::ident(param)))
                        .collect(),
                },
            ])],
        ),
    ];

    if plan.method.results.is_empty() {
        body.push(Stmt::Return(Vec::new()));
        return body;
    }

    let hook = s().sel(&plan.fields.func);
    let variadic = plan.method.params.last().is_some_and(|p| p.variadic);
    let returns = s().sel(&plan.fields.returns);
    body.push(Stmt::If {
        cond: Expr::Binary(Box::new(hook.clone()), "!=", Box::new(Expr::ident("nil"))),
        body: vec![Stmt::Return(vec![Expr::Call {
            fun: Box::new(hook),
            args: plan.names.params.iter().map(Expr::ident).collect(),
            ellipsis: variadic,
        }])],
        els: Some(vec![Stmt::Return(
            plan.names
                .return_fields
                .iter()
                .map(|f| returns.clone().sel(f))
                .collect(),
        )]),
    });
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::{collect_imports, ImportSet};
    use crate::model::{Constraint, NamedType, Param, ResultVar, TypeParam, TypeRef};
    use pretty_assertions::assert_eq;

    fn model(name: &str, type_params: Vec<TypeParam>, methods: Vec<Method>) -> InterfaceModel {
        let mut model = InterfaceModel {
            target_package_name: "stubs".into(),
            target_package_path: "example.com/app/stubs".into(),
            source_package_name: "app".into(),
            source_package_path: "example.com/app".into(),
            interface_name: name.into(),
            type_params,
            methods,
            imports: ImportSet::with_fixed(["sync", DEFAULT_OPTIONS_PACKAGE]),
        };
        collect_imports(&mut model);
        model
    }

    fn type_names(file: &File) -> Vec<&str> {
        file.decls
            .iter()
            .filter_map(|d| match d {
                Decl::Type(t) => Some(t.name.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_interface_has_only_lock_fields_and_constructor() {
        let file = synthesize(&model("Nothing", vec![], vec![]), &SynthOptions::default())
            .expect("synthesizes");
        assert_eq!(type_names(&file), ["StubNothing"]);
        let Decl::Type(stub) = &file.decls[1] else {
            panic!("stub struct expected");
        };
        let Expr::StructType(fields) = &stub.typ else {
            panic!("struct expected");
        };
        let names: Vec<_> = fields.iter().map(|f| f.names[0].as_str()).collect();
        assert_eq!(names, ["mu", "isLocked"]);
        let funcs: Vec<_> = file
            .decls
            .iter()
            .filter_map(|d| match d {
                Decl::Func(f) => Some(f.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(funcs, ["NewStubNothing"]);
    }

    #[test]
    fn records_follow_method_order_and_skip_empty_returns() {
        let m = model(
            "Svc",
            vec![],
            vec![
                Method {
                    name: "Get".into(),
                    params: vec![],
                    results: vec![ResultVar {
                        name: None,
                        typ: TypeRef::Basic("string".into()),
                    }],
                },
                Method {
                    name: "Set".into(),
                    params: vec![Param {
                        name: "v".into(),
                        typ: TypeRef::Basic("string".into()),
                        variadic: false,
                    }],
                    results: vec![],
                },
            ],
        );
        let file = synthesize(&m, &SynthOptions::default()).expect("synthesizes");
        assert_eq!(
            type_names(&file),
            ["StubSvcGetCall", "StubSvcGetReturns", "StubSvcSetCall", "StubSvc"]
        );
        let Some(Decl::Func(set)) = file.decls.last() else {
            panic!("method expected");
        };
        assert_eq!(set.body.last(), Some(&Stmt::Return(Vec::new())));
    }

    #[test]
    fn variadic_calls_forward_with_ellipsis() {
        let m = model(
            "Logger",
            vec![TypeParam {
                name: "T".into(),
                constraint: Constraint::Any,
            }],
            vec![Method {
                name: "Log".into(),
                params: vec![Param {
                    name: "args".into(),
                    typ: TypeRef::Slice(Box::new(TypeRef::TypeParam("T".into()))),
                    variadic: true,
                }],
                results: vec![ResultVar {
                    name: None,
                    typ: TypeRef::Named(NamedType::predeclared("error")),
                }],
            }],
        );
        let file = synthesize(&m, &SynthOptions::default()).expect("synthesizes");
        let Some(Decl::Func(log)) = file.decls.last() else {
            panic!("method expected");
        };
        assert_eq!(
            log.typ.params[0].typ,
            Expr::Ellipsis(Box::new(Expr::ident("T")))
        );
        let Stmt::If { body, .. } = &log.body[2] else {
            panic!("hook dispatch expected");
        };
        assert!(matches!(
            &body[0],
            Stmt::Return(values) if matches!(&values[0], Expr::Call { ellipsis: true, .. })
        ));
        assert!(log
            .recv
            .as_ref()
            .is_some_and(|r| r.typ == Expr::ident("StubLogger").index(vec![Expr::ident("T")]).star()));
    }

    #[test]
    fn missing_options_import_is_a_render_error() {
        let mut m = model("X", vec![], vec![]);
        m.imports = ImportSet::with_fixed(["sync"]);
        assert!(matches!(
            synthesize(&m, &SynthOptions::default()),
            Err(StubError::Render(_))
        ));
    }
}
