//! Package loading and type resolution.
//!
//! A directory's `.go` files are parsed with `goparser` and grouped by
//! package clause into [`LoadedPackage`]s. [`TypeResolver`] then turns the
//! syntax of an interface declaration into `TypeRef`s, following local
//! aliases and expanding embedded interfaces (including those of other
//! packages it can locate on disk).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use goparser::ast::{
    ArrayLen, ChanDir as AstChanDir, ConstValue, ImportName, InterfaceElem, ListRef, SignatureId,
    Type, TypeId, TypeParamDeclId, TypeSpec,
};
use goparser::walk::{Visitor, Walk};
use goparser::{build_constraint, parse_file, Lexer, ParseFailure, ParsedFile, Tok};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::StubError;
use crate::imports::default_local_name;
use crate::model::{
    ChanDir, Constraint, FuncType, InterfaceMethod, InterfaceShape, Method, NamedType, Param,
    ResultVar, TypeParam, TypeRef, TypeSet, UnionTerm,
};
use crate::module;

type Result<T, E = StubError> = std::result::Result<T, E>;

const BASIC_TYPES: &[&str] = &[
    "bool",
    "string",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
    "byte",
    "rune",
    "float32",
    "float64",
    "complex64",
    "complex128",
];

// =============================================================================
// Loaded packages
// =============================================================================

#[derive(Debug)]
struct FileImport {
    /// Explicit name: an identifier, `.` or `_`.
    alias: Option<String>,
    path: String,
}

#[derive(Debug)]
pub struct GoFile {
    pub path: PathBuf,
    pub parsed: ParsedFile,
    imports: Vec<FileImport>,
}

impl GoFile {
    fn new(path: PathBuf, parsed: ParsedFile) -> Self {
        let imports = parsed
            .imports()
            .map(|spec| FileImport {
                alias: spec.name.map(|name| match name {
                    ImportName::Dot(_) => ".".to_owned(),
                    ImportName::Blank(_) => "_".to_owned(),
                    ImportName::Name(ident) => parsed.text(ident.sym).to_owned(),
                }),
                path: parsed.text(spec.path).to_owned(),
            })
            .collect();
        Self {
            path,
            parsed,
            imports,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TypeDecl {
    file: usize,
    spec: TypeSpec,
}

/// One package of a directory with its package-level scope.
#[derive(Debug)]
pub struct LoadedPackage {
    pub name: String,
    pub path: String,
    pub dir: PathBuf,
    pub files: Vec<GoFile>,
    types: HashMap<String, TypeDecl>,
    consts: HashMap<String, u64>,
}

impl LoadedPackage {
    fn new(name: String, path: String, dir: PathBuf, files: Vec<GoFile>) -> Self {
        let mut types = HashMap::new();
        let mut consts = HashMap::new();

        for (idx, file) in files.iter().enumerate() {
            let parsed = &file.parsed;
            for spec in parsed.type_specs() {
                let name = parsed.text(spec.name.sym).to_owned();
                if types.contains_key(&name) {
                    debug!(file = %file.path.display(), %name, "type redeclared, keeping first");
                    continue;
                }
                types.insert(name, TypeDecl { file: idx, spec: *spec });
            }

            // An implicit line repeats the previous expression with the
            // current iota; a group starts over at iota 0.
            let mut last = None;
            for spec in parsed.const_specs() {
                if spec.iota == 0 {
                    last = None;
                }
                let expr = match spec.value {
                    ConstValue::Implicit => last,
                    value => {
                        last = Some(value);
                        Some(value)
                    }
                };
                let value = match expr {
                    Some(ConstValue::Int(n)) => Some(n),
                    Some(ConstValue::Iota) => Some(u64::from(spec.iota)),
                    _ => None,
                };
                if let (Some(value), [name]) = (value, parsed.arena.ident_names(spec.names)) {
                    consts.entry(parsed.text(name.sym).to_owned()).or_insert(value);
                }
            }
        }

        debug!(
            package = %name,
            path = %path,
            files = files.len(),
            types = types.len(),
            "loaded package"
        );
        Self {
            name,
            path,
            dir,
            files,
            types,
            consts,
        }
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.keys().map(String::as_str)
    }

    /// Value of an integer constant declared at package level.
    pub fn constant(&self, name: &str) -> Option<u64> {
        self.consts.get(name).copied()
    }

    fn type_decl(&self, name: &str) -> Option<TypeDecl> {
        self.types.get(name).copied()
    }

    /// Package qualifiers mentioned anywhere in the declaration of `name`.
    pub fn qualifiers_of(&self, name: &str) -> Vec<String> {
        let Some(decl) = self.type_decl(name) else {
            return Vec::new();
        };
        let parsed = &self.files[decl.file].parsed;
        let mut v = Qualifiers::default();
        decl.spec.walk(&parsed.arena, &mut v);
        let mut out: Vec<String> = v.0.into_iter().map(|s| parsed.text(s).to_owned()).collect();
        out.sort();
        out.dedup();
        out
    }
}

#[derive(Default)]
struct Qualifiers(Vec<goparser::ast::Symbol>);

impl<'ast> Visitor<'ast> for Qualifiers {
    fn visit_type(&mut self, a: &'ast goparser::ast::AstArena, id: TypeId) {
        if let Type::Named { pkg: Some(pkg), .. } = a.types[id] {
            self.0.push(pkg.sym);
        }
        a.types[id].walk(a, self);
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Loads packages and caches the ones reached through imports.
#[derive(Debug, Default)]
pub struct Loader {
    foreign: HashMap<String, Option<Rc<LoadedPackage>>>,
    names: HashMap<String, String>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every package declared by the `.go` files in `dir`.
    ///
    /// `_test.go` files and files constrained by `//go:build ignore` are
    /// left out. Any syntax error fails the load.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<Rc<LoadedPackage>>> {
        let mut by_package: BTreeMap<String, Vec<GoFile>> = BTreeMap::new();

        for path in go_files(dir)? {
            let src = fs::read_to_string(&path).map_err(|e| StubError::load(&path, e.to_string()))?;
            if build_constraint(&src) == Some("ignore") {
                debug!(file = %path.display(), "skipping ignored file");
                continue;
            }
            let parsed = parse_file(&src)
                .map_err(|failure| StubError::load(&path, describe_failure(&src, &failure)))?;
            let package = parsed.package_name().to_owned();
            if package.ends_with("_test") {
                continue;
            }
            trace!(file = %path.display(), %package, "parsed");
            by_package
                .entry(package)
                .or_default()
                .push(GoFile::new(path, parsed));
        }

        if by_package.is_empty() {
            return Err(StubError::load(dir, "no Go files"));
        }

        let import_path = module::package_path(dir);
        Ok(by_package
            .into_iter()
            .map(|(name, files)| {
                Rc::new(LoadedPackage::new(
                    name,
                    import_path.clone(),
                    dir.to_path_buf(),
                    files,
                ))
            })
            .collect())
    }

    /// Declared name of the package at `import_path`; the default name Go
    /// tooling would guess when the package cannot be found.
    pub fn package_name(&mut self, from: &Path, import_path: &str) -> String {
        if let Some(name) = self.names.get(import_path) {
            return name.clone();
        }
        let name = self
            .foreign
            .get(import_path)
            .and_then(|pkg| pkg.as_ref().map(|p| p.name.clone()))
            .or_else(|| module::locate_package(from, import_path).and_then(|d| clause_name(&d)))
            .unwrap_or_else(|| default_local_name(import_path));
        self.names.insert(import_path.to_owned(), name.clone());
        name
    }

    /// Loads an imported package, tolerating files it cannot parse.
    pub fn foreign_package(&mut self, from: &Path, import_path: &str) -> Option<Rc<LoadedPackage>> {
        if let Some(cached) = self.foreign.get(import_path) {
            return cached.clone();
        }
        let loaded = module::locate_package(from, import_path)
            .and_then(|dir| load_lenient(&dir, import_path))
            .map(Rc::new);
        if loaded.is_none() {
            debug!(path = import_path, "package not found");
        }
        self.foreign.insert(import_path.to_owned(), loaded.clone());
        loaded
    }
}

fn go_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| StubError::load(dir, e.to_string()))?;
        let path = entry.path();
        let is_go = path.extension().is_some_and(|ext| ext == "go");
        let is_test = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().ends_with("_test.go"));
        if entry.file_type().is_file() && is_go && !is_test {
            out.push(path.to_path_buf());
        }
    }
    Ok(out)
}

fn load_lenient(dir: &Path, import_path: &str) -> Option<LoadedPackage> {
    let mut by_package: BTreeMap<String, Vec<GoFile>> = BTreeMap::new();
    for path in go_files(dir).ok()? {
        let Ok(src) = fs::read_to_string(&path) else {
            continue;
        };
        if build_constraint(&src) == Some("ignore") {
            continue;
        }
        match parse_file(&src) {
            Ok(parsed) => by_package
                .entry(parsed.package_name().to_owned())
                .or_default()
                .push(GoFile::new(path, parsed)),
            Err(failure) => warn!(file = %path.display(), error = %failure, "skipping unparsable file"),
        }
    }
    by_package.retain(|name, _| !name.ends_with("_test") && name != "documentation");
    let (name, files) = by_package.into_iter().max_by_key(|(_, files)| files.len())?;
    Some(LoadedPackage::new(
        name,
        import_path.to_owned(),
        dir.to_path_buf(),
        files,
    ))
}

/// Name from the package clause of the first file in `dir` that has one.
fn clause_name(dir: &Path) -> Option<String> {
    go_files(dir).ok()?.iter().find_map(|path| {
        let src = fs::read_to_string(path).ok()?;
        let name = package_clause(&src)?;
        (!name.ends_with("_test")).then(|| name.to_owned())
    })
}

fn package_clause(src: &str) -> Option<&str> {
    let mut toks = Lexer::new(src).map(|(_, tok, _)| tok);
    toks.find(|tok| matches!(tok, Tok::Package))?;
    match toks.next()? {
        Tok::Ident(name) => Some(name),
        _ => None,
    }
}

fn describe_failure(src: &str, failure: &ParseFailure) -> String {
    failure
        .diags
        .iter()
        .take(3)
        .map(|d| {
            let (line, col) = d.line_col(src);
            format!("{line}:{col}: {}", d.message)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn predeclared(name: &str) -> Option<TypeRef> {
    if BASIC_TYPES.contains(&name) {
        return Some(TypeRef::Basic(name.to_owned()));
    }
    match name {
        "error" | "comparable" => Some(TypeRef::Named(NamedType::predeclared(name))),
        "any" => Some(TypeRef::Interface(InterfaceShape::Empty)),
        _ => None,
    }
}

fn error_method() -> Method {
    Method {
        name: "Error".to_owned(),
        params: Vec::new(),
        results: vec![ResultVar {
            name: None,
            typ: TypeRef::Basic("string".to_owned()),
        }],
    }
}

// =============================================================================
// Type resolution
// =============================================================================

/// Lexical position the resolver reads syntax from.
#[derive(Debug, Clone)]
struct Scope {
    pkg: Rc<LoadedPackage>,
    file: usize,
    type_params: Vec<String>,
    /// Type arguments bound to the parameters of an instantiated generic.
    subst: HashMap<String, TypeRef>,
}

enum InterfaceDecl {
    Literal {
        scope: Scope,
        elems: ListRef<InterfaceElem>,
    },
    /// The predeclared `error`.
    Error,
}

/// Resolved declaration of a named interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInterface {
    pub type_params: Vec<TypeParam>,
    /// Flattened method set, ordered by name.
    pub methods: Vec<Method>,
}

pub struct TypeResolver<'l> {
    loader: &'l mut Loader,
    scope: Scope,
    aliases: Vec<(String, String)>,
    embeds: Vec<(String, String)>,
    context: String,
}

impl<'l> TypeResolver<'l> {
    pub fn new(loader: &'l mut Loader, pkg: Rc<LoadedPackage>) -> Self {
        Self {
            loader,
            scope: Scope {
                pkg,
                file: 0,
                type_params: Vec::new(),
                subst: HashMap::new(),
            },
            aliases: Vec::new(),
            embeds: Vec::new(),
            context: String::new(),
        }
    }

    /// Resolves the interface declared as `name`, or `None` when the package
    /// declares no such type or its underlying type is not an interface.
    pub fn interface(&mut self, name: &str) -> Result<Option<ResolvedInterface>> {
        let pkg = Rc::clone(&self.scope.pkg);
        let Some(decl) = pkg.type_decl(name) else {
            return Ok(None);
        };
        self.context = format!("interface {name}");

        let Some(iface) = self.interface_decl(Rc::clone(&pkg), name, Vec::new())? else {
            return Ok(None);
        };

        let scope = Scope {
            pkg: Rc::clone(&pkg),
            file: decl.file,
            type_params: type_param_names(&pkg.files[decl.file].parsed, decl.spec.type_params),
            subst: HashMap::new(),
        };
        let type_params = self.with_scope(scope, |r| r.type_params(decl.spec.type_params))?;
        let methods = self.decl_methods(iface)?;
        debug!(
            interface = name,
            package = %pkg.name,
            methods = methods.len(),
            type_params = type_params.len(),
            "resolved interface"
        );
        Ok(Some(ResolvedInterface {
            type_params,
            methods,
        }))
    }

    fn with_scope<T>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.scope, scope);
        let out = f(self);
        self.scope = saved;
        out
    }

    fn file(&self) -> &GoFile {
        &self.scope.pkg.files[self.scope.file]
    }

    fn ty(&self, id: TypeId) -> Type {
        self.file().parsed.arena.types[id]
    }

    fn text(&self, sym: goparser::ast::Symbol) -> String {
        self.file().parsed.text(sym).to_owned()
    }

    fn load_error(&self, message: impl Into<String>) -> StubError {
        StubError::load(&self.file().path, message)
    }

    fn import_path(&mut self, qualifier: &str) -> Result<String> {
        let pkg = Rc::clone(&self.scope.pkg);
        let file = &pkg.files[self.scope.file];
        if let Some(import) = file
            .imports
            .iter()
            .find(|i| i.alias.as_deref() == Some(qualifier))
        {
            return Ok(import.path.clone());
        }
        for import in file.imports.iter().filter(|i| i.alias.is_none()) {
            if default_local_name(&import.path) == qualifier
                || self.loader.package_name(&pkg.dir, &import.path) == qualifier
            {
                return Ok(import.path.clone());
            }
        }
        Err(self.load_error(format!(
            "undefined: {qualifier} (no import provides it) in {}",
            self.context
        )))
    }

    /// Follows defined types and aliases from `name` down to an interface
    /// literal, binding `args` to the declaration's type parameters.
    fn interface_decl(
        &mut self,
        pkg: Rc<LoadedPackage>,
        name: &str,
        args: Vec<TypeRef>,
    ) -> Result<Option<InterfaceDecl>> {
        let mut pkg = pkg;
        let mut name = name.to_owned();
        let mut args = args;
        let mut seen: Vec<(String, String)> = Vec::new();

        loop {
            let key = (pkg.path.clone(), name.clone());
            if seen.contains(&key) {
                return Err(self.load_error(format!("invalid recursive type {name}")));
            }
            seen.push(key);

            let Some(decl) = pkg.type_decl(&name) else {
                return Ok(None);
            };
            let parsed = &pkg.files[decl.file].parsed;
            let params = type_param_names(parsed, decl.spec.type_params);
            let subst = params.iter().cloned().zip(args.iter().cloned()).collect();
            let scope = Scope {
                pkg: Rc::clone(&pkg),
                file: decl.file,
                type_params: params,
                subst,
            };

            let mut typ = parsed.arena.types[decl.spec.typ];
            while let Type::Paren { typ: inner } = typ {
                typ = parsed.arena.types[inner];
            }

            match typ {
                Type::Interface { elems } => return Ok(Some(InterfaceDecl::Literal { scope, elems })),
                Type::Named {
                    pkg: qualifier,
                    name: next,
                    args: next_args,
                } => {
                    let next_name = parsed.text(next.sym).to_owned();
                    let (next_pkg, resolved_args) = self.with_scope(scope, |r| {
                        let resolved = r.type_args(next_args)?;
                        let next_pkg = match qualifier {
                            Some(q) => {
                                let q = r.text(q.sym);
                                let path = r.import_path(&q)?;
                                let dir = r.scope.pkg.dir.clone();
                                r.loader.foreign_package(&dir, &path)
                            }
                            None if r.scope.type_params.contains(&next_name) => None,
                            None if r.scope.pkg.has_type(&next_name) => Some(Rc::clone(&r.scope.pkg)),
                            None => None,
                        };
                        Ok::<_, StubError>((next_pkg, resolved))
                    })?;
                    match next_pkg {
                        Some(p) => {
                            pkg = p;
                            name = next_name;
                            args = resolved_args;
                        }
                        None if qualifier.is_none() && next_name == "error" => {
                            return Ok(Some(InterfaceDecl::Error));
                        }
                        None if qualifier.is_none() && next_name == "any" => {
                            return Ok(Some(InterfaceDecl::Literal {
                                scope: self.scope.clone(),
                                elems: ListRef::EMPTY,
                            }));
                        }
                        None => return Ok(None),
                    }
                }
                _ => return Ok(None),
            }
        }
    }

    fn decl_methods(&mut self, decl: InterfaceDecl) -> Result<Vec<Method>> {
        match decl {
            InterfaceDecl::Error => Ok(vec![error_method()]),
            InterfaceDecl::Literal { scope, elems } => {
                let set = self.with_scope(scope, |r| r.method_set(elems))?;
                Ok(set.into_values().collect())
            }
        }
    }

    /// Explicit and embedded methods of an interface literal, keyed by name.
    fn method_set(&mut self, elems: ListRef<InterfaceElem>) -> Result<BTreeMap<String, Method>> {
        let elems = self.file().parsed.arena.interface_elems(elems).to_vec();
        let mut set: BTreeMap<String, Method> = BTreeMap::new();

        for elem in elems {
            let methods = match elem {
                InterfaceElem::Method { name, sig } => {
                    let name = self.text(name.sym);
                    let outer = std::mem::replace(&mut self.context, format!("method {name}"));
                    let resolved = self.signature(sig);
                    self.context = outer;
                    let (params, results) = resolved?;
                    vec![Method {
                        name,
                        params,
                        results,
                    }]
                }
                InterfaceElem::Embed(t) => self.embedded(t)?,
            };
            for method in methods {
                match set.get(&method.name) {
                    Some(existing) if existing.same_signature(&method) => {}
                    Some(_) => {
                        return Err(self.load_error(format!(
                            "duplicate method {} in {}",
                            method.name, self.context
                        )))
                    }
                    None => {
                        set.insert(method.name.clone(), method);
                    }
                }
            }
        }
        Ok(set)
    }

    fn embedded(&mut self, t: TypeId) -> Result<Vec<Method>> {
        match self.ty(t) {
            Type::Paren { typ } => self.embedded(typ),
            Type::Interface { elems } => Ok(self.method_set(elems)?.into_values().collect()),
            Type::Named { pkg, name, args } => {
                let name = self.text(name.sym);
                let type_args = self.type_args(args)?;

                let target = match pkg {
                    Some(q) => {
                        let q = self.text(q.sym);
                        let path = self.import_path(&q)?;
                        let dir = self.scope.pkg.dir.clone();
                        self.loader.foreign_package(&dir, &path).ok_or_else(|| {
                            self.load_error(format!(
                                "cannot locate package {path} for embedded interface {q}.{name}"
                            ))
                        })?
                    }
                    None if self.scope.type_params.contains(&name) => {
                        return Err(self.load_error(format!(
                            "cannot embed type parameter {name} in {}",
                            self.context
                        )))
                    }
                    None if self.scope.pkg.has_type(&name) => Rc::clone(&self.scope.pkg),
                    None => {
                        return match name.as_str() {
                            "error" => Ok(vec![error_method()]),
                            "any" => Ok(Vec::new()),
                            "comparable" => Err(self.load_error(format!(
                                "{} embeds comparable and has no stub implementation",
                                self.context
                            ))),
                            _ => Err(self.load_error(format!("undefined: {name}"))),
                        }
                    }
                };

                let key = (target.path.clone(), name.clone());
                if self.embeds.contains(&key) {
                    return Err(self.load_error(format!("invalid recursive embedding of {name}")));
                }
                let Some(decl) = self.interface_decl(target, &name, type_args)? else {
                    return Err(self.load_error(format!("embedded type {name} is not an interface")));
                };
                self.embeds.push(key);
                let methods = self.decl_methods(decl);
                self.embeds.pop();
                methods
            }
            Type::Union { .. } => Err(self.load_error(format!(
                "{} has a type-set element and cannot be implemented",
                self.context
            ))),
            other => Err(self.load_error(format!("cannot embed {other:?}"))),
        }
    }

    fn signature(&mut self, sig: SignatureId) -> Result<(Vec<Param>, Vec<ResultVar>)> {
        let pkg = Rc::clone(&self.scope.pkg);
        let parsed = &pkg.files[self.scope.file].parsed;
        let sig = parsed.arena.signatures[sig];

        let mut params = Vec::new();
        for &fid in parsed.arena.fields_list(sig.params) {
            let field = parsed.arena.fields[fid];
            let variadic = field.is_variadic();
            let elem = self.resolve(field.typ)?;
            let typ = if variadic {
                TypeRef::Slice(Box::new(elem))
            } else {
                elem
            };
            let names = parsed.arena.ident_names(field.names);
            if names.is_empty() {
                params.push(Param {
                    name: "_".to_owned(),
                    typ,
                    variadic,
                });
            } else {
                for n in names {
                    params.push(Param {
                        name: parsed.text(n.sym).to_owned(),
                        typ: typ.clone(),
                        variadic,
                    });
                }
            }
        }

        let mut results = Vec::new();
        for &fid in parsed.arena.fields_list(sig.results) {
            let field = parsed.arena.fields[fid];
            let typ = self.resolve(field.typ)?;
            let names = parsed.arena.ident_names(field.names);
            if names.is_empty() {
                results.push(ResultVar { name: None, typ });
            } else {
                for n in names {
                    results.push(ResultVar {
                        name: Some(parsed.text(n.sym).to_owned()),
                        typ: typ.clone(),
                    });
                }
            }
        }
        Ok((params, results))
    }

    fn func_type(&mut self, sig: SignatureId) -> Result<FuncType> {
        let (params, results) = self.signature(sig)?;
        Ok(Method {
            name: String::new(),
            params,
            results,
        }
        .func_type())
    }

    fn type_params(&mut self, list: ListRef<TypeParamDeclId>) -> Result<Vec<TypeParam>> {
        let pkg = Rc::clone(&self.scope.pkg);
        let arena = &pkg.files[self.scope.file].parsed.arena;
        let mut out = Vec::new();
        for &id in arena.type_param_decl_ids(list) {
            let decl = arena.type_param_decls[id];
            let names: Vec<String> = arena
                .ident_names(decl.names)
                .iter()
                .map(|n| self.text(n.sym))
                .collect();
            let context = format!("constraint of {} in {}", names.join(", "), self.context);
            let outer = std::mem::replace(&mut self.context, context);
            let constraint = self.constraint(decl.constraint);
            self.context = outer;
            let constraint = constraint?;
            for name in names {
                out.push(TypeParam {
                    name,
                    constraint: constraint.clone(),
                });
            }
        }
        Ok(out)
    }

    fn constraint(&mut self, t: TypeId) -> Result<Constraint> {
        match self.ty(t) {
            Type::Paren { typ } => self.constraint(typ),
            Type::Named {
                pkg: None, name, ..
            } if self.text(name.sym) == "any" && !self.shadows("any") => Ok(Constraint::Any),
            Type::Interface { elems } => {
                let list = self.file().parsed.arena.interface_elems(elems).to_vec();
                match list.as_slice() {
                    [] => Ok(Constraint::Any),
                    [InterfaceElem::Embed(inner)] => self.constraint(*inner),
                    elems if elems.iter().any(|e| self.is_type_set_elem(e)) => {
                        self.type_set(elems).map(Constraint::Interface)
                    }
                    _ => Ok(Constraint::Type(self.resolve(t)?)),
                }
            }
            Type::Union { terms } => {
                let terms = self.file().parsed.arena.type_terms(terms).to_vec();
                let mut out = Vec::with_capacity(terms.len());
                for term in terms {
                    out.push(UnionTerm {
                        tilde: term.tilde,
                        typ: self.resolve(term.typ)?,
                    });
                }
                Ok(Constraint::Union(out))
            }
            _ => Ok(Constraint::Type(self.resolve(t)?)),
        }
    }

    /// Unions and `comparable` only make sense in a constraint; an interface
    /// holding one is kept as written instead of flattened.
    fn is_type_set_elem(&self, elem: &InterfaceElem) -> bool {
        let InterfaceElem::Embed(mut t) = *elem else {
            return false;
        };
        while let Type::Paren { typ } = self.ty(t) {
            t = typ;
        }
        match self.ty(t) {
            Type::Union { .. } => true,
            Type::Named {
                pkg: None, name, ..
            } => self.text(name.sym) == "comparable" && !self.shadows("comparable"),
            _ => false,
        }
    }

    fn type_set(&mut self, elems: &[InterfaceElem]) -> Result<TypeSet> {
        let mut set = TypeSet {
            terms: Vec::new(),
            methods: Vec::new(),
        };
        for elem in elems {
            match *elem {
                InterfaceElem::Method { name, sig } => set.methods.push(InterfaceMethod {
                    name: self.text(name.sym),
                    sig: self.func_type(sig)?,
                }),
                InterfaceElem::Embed(t) => match self.constraint(t)? {
                    Constraint::Any => {}
                    Constraint::Union(terms) => set.terms.push(terms),
                    Constraint::Type(typ) => {
                        set.terms.push(vec![UnionTerm { tilde: false, typ }]);
                    }
                    Constraint::Interface(inner) => {
                        set.terms.extend(inner.terms);
                        set.methods.extend(inner.methods);
                    }
                },
            }
        }
        Ok(set)
    }

    fn shadows(&self, name: &str) -> bool {
        self.scope.subst.contains_key(name)
            || self.scope.type_params.iter().any(|p| p == name)
            || self.scope.pkg.has_type(name)
    }

    /// Resolves a type expression in the current scope.
    pub fn resolve(&mut self, t: TypeId) -> Result<TypeRef> {
        match self.ty(t) {
            Type::Paren { typ } => self.resolve(typ),
            Type::Named {
                pkg: None,
                name,
                args,
            } => {
                let name = self.text(name.sym);
                self.local_named(&name, args)
            }
            Type::Named {
                pkg: Some(q),
                name,
                args,
            } => {
                let q = self.text(q.sym);
                let path = self.import_path(&q)?;
                let dir = self.scope.pkg.dir.clone();
                let pkg_name = self.loader.package_name(&dir, &path);
                Ok(TypeRef::Named(NamedType {
                    pkg_path: path,
                    pkg_name,
                    name: self.text(name.sym),
                    type_args: self.type_args(args)?,
                }))
            }
            Type::Pointer { elem } => Ok(TypeRef::Pointer(Box::new(self.resolve(elem)?))),
            Type::Slice { elem } => Ok(TypeRef::Slice(Box::new(self.resolve(elem)?))),
            Type::Array { len, elem } => {
                let len = self.array_len(len)?;
                Ok(TypeRef::Array(len, Box::new(self.resolve(elem)?)))
            }
            Type::Map { key, val } => Ok(TypeRef::Map(
                Box::new(self.resolve(key)?),
                Box::new(self.resolve(val)?),
            )),
            Type::Chan { dir, elem } => {
                let dir = match dir {
                    AstChanDir::Both => ChanDir::Both,
                    AstChanDir::Send => ChanDir::Send,
                    AstChanDir::Recv => ChanDir::Recv,
                };
                Ok(TypeRef::Chan(dir, Box::new(self.resolve(elem)?)))
            }
            Type::Func { sig } => Ok(TypeRef::Func(self.func_type(sig)?)),
            Type::Interface { elems } => {
                let methods = self.method_set(elems)?;
                if methods.is_empty() {
                    return Ok(TypeRef::Interface(InterfaceShape::Empty));
                }
                Ok(TypeRef::Interface(InterfaceShape::NonEmpty(
                    methods
                        .into_values()
                        .map(|m| InterfaceMethod {
                            sig: m.func_type(),
                            name: m.name,
                        })
                        .collect(),
                )))
            }
            Type::Struct { .. } => Err(StubError::unsupported(
                "anonymous struct",
                self.context.clone(),
            )),
            Type::Union { .. } => Err(self.load_error(format!(
                "type set used as a type in {}",
                self.context
            ))),
        }
    }

    fn type_args(&mut self, args: ListRef<TypeId>) -> Result<Vec<TypeRef>> {
        let ids = self.file().parsed.arena.types_list(args).to_vec();
        ids.into_iter().map(|id| self.resolve(id)).collect()
    }

    fn local_named(&mut self, name: &str, args: ListRef<TypeId>) -> Result<TypeRef> {
        if let Some(bound) = self.scope.subst.get(name) {
            return Ok(bound.clone());
        }
        if self.scope.type_params.iter().any(|p| p == name) {
            return Ok(TypeRef::TypeParam(name.to_owned()));
        }

        let pkg = Rc::clone(&self.scope.pkg);
        if let Some(decl) = pkg.type_decl(name) {
            if decl.spec.alias && decl.spec.type_params.is_empty() {
                return self.follow_alias(pkg, name, decl);
            }
            return Ok(TypeRef::Named(NamedType {
                pkg_path: pkg.path.clone(),
                pkg_name: pkg.name.clone(),
                name: name.to_owned(),
                type_args: self.type_args(args)?,
            }));
        }

        predeclared(name)
            .ok_or_else(|| self.load_error(format!("undefined: {name} in {}", self.context)))
    }

    fn follow_alias(&mut self, pkg: Rc<LoadedPackage>, name: &str, decl: TypeDecl) -> Result<TypeRef> {
        let key = (pkg.path.clone(), name.to_owned());
        if self.aliases.contains(&key) {
            return Err(self.load_error(format!("invalid recursive alias {name}")));
        }
        trace!(alias = name, "following alias");
        self.aliases.push(key);
        let scope = Scope {
            pkg,
            file: decl.file,
            type_params: Vec::new(),
            subst: HashMap::new(),
        };
        let resolved = self.with_scope(scope, |r| r.resolve(decl.spec.typ));
        self.aliases.pop();
        resolved
    }

    fn array_len(&mut self, len: ArrayLen) -> Result<u64> {
        let value = match len {
            ArrayLen::Int(n) => return Ok(n),
            ArrayLen::Const { pkg: None, name } => {
                let name = self.text(name.sym);
                self.scope.pkg.constant(&name).ok_or(name)
            }
            ArrayLen::Const {
                pkg: Some(q),
                name,
            } => {
                let q = self.text(q.sym);
                let name = self.text(name.sym);
                let path = self.import_path(&q)?;
                let dir = self.scope.pkg.dir.clone();
                self.loader
                    .foreign_package(&dir, &path)
                    .and_then(|p| p.constant(&name))
                    .ok_or(format!("{q}.{name}"))
            }
            ArrayLen::Ellipsis => Err("...".to_owned()),
            ArrayLen::Expr(span) => Err(span.text(&self.file().parsed.source).to_owned()),
        };
        value.map_err(|expr| {
            StubError::unsupported(format!("array length {expr}"), self.context.clone())
        })
    }
}

fn type_param_names(parsed: &ParsedFile, list: ListRef<TypeParamDeclId>) -> Vec<String> {
    parsed
        .arena
        .type_param_decl_ids(list)
        .iter()
        .flat_map(|&id| parsed.arena.ident_names(parsed.arena.type_param_decls[id].names))
        .map(|n| parsed.text(n.sym).to_owned())
        .collect()
}
