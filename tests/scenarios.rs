use std::fs;
use std::path::{Path, PathBuf};

use goparser::ast::{InterfaceElem, SignatureId, Type};
use goparser::{parse_file, ParsedFile};
use toe::{generate, GenerateRequest, GeneratedStub, Phase, StubError};

fn testdata(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/input").join(rel)
}

fn stub_for(dir: &Path, interface: &str) -> GeneratedStub {
    let mut req = GenerateRequest::new(dir, interface);
    req.settings.stub_dir = PathBuf::from("stubs");
    generate(&req).unwrap_or_else(|e| panic!("{interface}: {e}"))
}

/// Method name, parameter types and result types, as written in the file.
type Shape = (String, Vec<String>, Vec<String>);

fn signature_shape(p: &ParsedFile, sig: SignatureId) -> (Vec<String>, Vec<String>) {
    let types = |list| -> Vec<String> {
        p.arena
            .fields_list(list)
            .iter()
            .flat_map(|&id| {
                let field = p.arena.fields[id];
                let span = p.arena.types.span(field.typ);
                let mut text = p.source[span.start as usize..span.end as usize].to_owned();
                if field.is_variadic() {
                    text.insert_str(0, "...");
                }
                std::iter::repeat(text).take(field.names.len().max(1) as usize)
            })
            .collect()
    };
    let sig = p.arena.signatures[sig];
    (types(sig.params), types(sig.results))
}

fn interface_shapes(src: &str, name: &str) -> Vec<Shape> {
    let p = parse_file(src).expect("input parses");
    let spec = p.find_type(name).expect("interface declared");
    let Type::Interface { elems } = p.arena.types[spec.typ] else {
        panic!("{name} is not an interface");
    };
    let mut shapes: Vec<Shape> = p
        .arena
        .interface_elems(elems)
        .iter()
        .filter_map(|e| match *e {
            InterfaceElem::Method { name, sig } => {
                let (params, results) = signature_shape(&p, sig);
                Some((p.text(name.sym).to_owned(), params, results))
            }
            InterfaceElem::Embed(_) => None,
        })
        .collect();
    shapes.sort();
    shapes
}

fn stub_shapes(src: &str) -> Vec<Shape> {
    let p = parse_file(src).unwrap_or_else(|f| panic!("stub does not parse: {:?}\n{src}", f.diags));
    let mut shapes: Vec<Shape> = p
        .funcs()
        .filter(|f| f.recv.is_some())
        .map(|f| {
            assert!(f.body.is_some());
            let (params, results) = signature_shape(&p, f.sig);
            (p.text(f.name.sym).to_owned(), params, results)
        })
        .collect();
    shapes.sort();
    shapes
}

fn assert_round_trip(dir: &Path, file: &str, interface: &str) {
    let src = fs::read_to_string(dir.join(file)).expect("input");
    let stub = stub_for(dir, interface);
    assert_eq!(stub_shapes(&stub.source), interface_shapes(&src, interface));
}

#[test]
fn scenario_a_mixed_signatures() {
    let stub = stub_for(&testdata("simple"), "MyInterface");
    let src = &stub.source;
    assert!(src.contains("type StubMyInterfaceCalculateCall struct {\n\tX int\n\tY int\n}\n"));
    assert!(src.contains("type StubMyInterfaceCalculateReturns struct {\n\tR0 int\n\tR1 error\n}\n"));
    assert!(src.contains("type StubMyInterfaceGetValueReturns struct {\n\tR0 string\n}\n"));
    assert!(!src.contains("StubMyInterfaceSetValueReturns"));
    assert!(src.contains("\tmu               sync.Mutex\n\tisLocked         bool\n\tCalculateFunc "));
    assert!(src.contains(
        "func NewStubMyInterface(opts options.StubOptions) *StubMyInterface {\n\treturn &StubMyInterface{isLocked: opts.WithLocking}\n}\n"
    ));
    assert!(src.contains("append(s.CalculateCalls, StubMyInterfaceCalculateCall{X: x, Y: y})"));
    assert_round_trip(&testdata("simple"), "simple.go", "MyInterface");
}

#[test]
fn scenario_b_single_type_parameter() {
    let stub = stub_for(&testdata("generic"), "GenericInterface");
    let src = &stub.source;
    assert!(src.contains("type StubGenericInterface[T any] struct {\n"));
    assert!(src.contains("\tDoCalls    []StubGenericInterfaceDoCall[T]\n"));
    assert!(src.contains("\tDoReturns  StubGenericInterfaceDoReturns[T]\n"));
    assert!(src.contains("\tGetReturns StubGenericInterfaceGetReturns[T]\n"));
    assert!(src.contains("func (s *StubGenericInterface[T]) Get() T {\n"));
    assert_round_trip(&testdata("generic"), "generic.go", "GenericInterface");
}

#[test]
fn multiple_type_parameters_use_multi_index_instantiation() {
    let stub = stub_for(&testdata("complex"), "Cache");
    let src = &stub.source;
    assert!(src.contains("type StubCacheGetCall[K comparable, V any] struct {\n\tKey K\n}\n"));
    assert!(src.contains("\tGetCalls   []StubCacheGetCall[K, V]\n"));
    assert!(src.contains(
        "func NewStubCache[K comparable, V any](opts options.StubOptions) *StubCache[K, V] {\n"
    ));
    assert!(src.contains("func (s *StubCache[K, V]) Set(key K, value V) {\n"));
    assert!(src.contains("StubCacheSetCall[K, V]{Key: key, Value: value}"));
    assert_round_trip(&testdata("complex"), "shapes.go", "Cache");
}

#[test]
fn scenario_c_hook_takes_priority_over_returns() {
    let stub = stub_for(&testdata("calculator"), "Calculator");
    assert!(stub.source.contains(
        "\tif s.AddFunc != nil {\n\t\treturn s.AddFunc(a, b)\n\t} else {\n\t\treturn s.AddReturns.R0\n\t}\n"
    ));
    assert!(stub
        .source
        .contains("\ts.AddCalls = append(s.AddCalls, StubCalculatorAddCall{A: a, B: b})\n"));
    assert_round_trip(&testdata("calculator"), "calculator.go", "Calculator");
}

#[test]
fn scenario_d_foreign_types_are_imported_once() {
    let root = tempfile::tempdir().expect("tempdir");
    let base = root.path();
    fs::write(base.join("go.mod"), "module example.com/svc\n\ngo 1.22\n").expect("go.mod");
    fs::create_dir_all(base.join("ctxpkg")).expect("mkdir");
    fs::write(
        base.join("ctxpkg/ctx.go"),
        "package ctxpkg\n\ntype Context interface {\n\tDeadline() (int64, bool)\n}\n",
    )
    .expect("ctx.go");
    fs::create_dir_all(base.join("processor")).expect("mkdir");
    fs::write(
        base.join("processor/processor.go"),
        "package processor\n\n\
         import \"example.com/svc/ctxpkg\"\n\n\
         type Processor interface {\n\
         \tProcess(ctx ctxpkg.Context, data string) ([]string, error)\n\
         \tCancel(ctx ctxpkg.Context)\n\
         }\n",
    )
    .expect("processor.go");

    let mut req = GenerateRequest::new(base.join("processor"), "Processor");
    req.settings.stub_dir = base.join("stubs");
    let stub = generate(&req).expect("generates");
    let src = &stub.source;

    assert_eq!(src.matches("\"example.com/svc/ctxpkg\"").count(), 1);
    assert!(src.contains(
        "import (\n\t\"example.com/svc/ctxpkg\"\n\t\"github.com/phildrip/toe/options\"\n\t\"sync\"\n)\n"
    ));
    assert!(src.contains("type StubProcessorProcessCall struct {\n\tCtx  ctxpkg.Context\n\tData string\n}\n"));
    assert!(src.contains("func (s *StubProcessor) Process(ctx ctxpkg.Context, data string) ([]string, error) {\n"));
    assert!(src.contains("StubProcessorProcessCall{Ctx: ctx, Data: data}"));
    assert!(src.contains("return s.ProcessFunc(ctx, data)"));
}

#[test]
fn scenario_e_every_method_locks_when_enabled() {
    let stub = stub_for(&testdata("complex"), "ComplexInterface");
    let lock = "\tif s.isLocked {\n\t\ts.mu.Lock()\n\t\tdefer s.mu.Unlock()\n\t}\n";
    let methods = stub.source.matches("func (s *StubComplexInterface)").count();
    assert_eq!(methods, 5);
    assert_eq!(stub.source.matches(lock).count(), methods);
    // The lock is taken before the call is recorded.
    for chunk in stub.source.split("func (s *StubComplexInterface)").skip(1) {
        let lock_at = chunk.find(lock).expect("lock block");
        let record_at = chunk.find("Calls = append(").expect("record");
        assert!(lock_at < record_at);
    }
}

#[test]
fn scenario_f_missing_and_non_interface_names() {
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(
        root.path().join("shapes.go"),
        "package shapes\n\ntype Circle struct{ R float64 }\n",
    )
    .expect("write");
    for name in ["Square", "Circle"] {
        let mut req = GenerateRequest::new(root.path(), name);
        req.settings.stub_dir = root.path().join("stubs");
        let err = generate(&req).expect_err("not an interface");
        assert_eq!(err.phase, Phase::Resolve);
        assert!(matches!(err.kind(), StubError::NotFound { .. }), "{err}");
        assert!(!root.path().join("stubs").exists());
    }
}

#[test]
fn complex_types_keep_their_shape() {
    let dir = testdata("complex");
    let stub = stub_for(&dir, "ComplexInterface");
    let src = &stub.source;
    assert!(src.contains("\t\"context\"\n"));
    assert!(src.contains(
        "func (s *StubComplexInterface) ProcessVariadic(prefix string, values ...interface{}) error {\n"
    ));
    assert!(src.contains("\t\treturn s.ProcessVariadicFunc(prefix, values...)\n"));
    assert!(src.contains("type StubComplexInterfaceProcessVariadicCall struct {\n\tPrefix string\n\tValues []interface{}\n}\n"));
    assert!(src.contains("\tWithCallbackFunc          func(callback func(string) error) error\n"));
    assert_round_trip(&dir, "complex_types.go", "ComplexInterface");
}

#[test]
fn empty_interface_and_bare_methods() {
    let dir = testdata("complex");
    let stub = stub_for(&dir, "EmptyInterface");
    assert!(stub
        .source
        .contains("type StubEmptyInterface struct {\n\tmu       sync.Mutex\n\tisLocked bool\n}\n"));
    assert!(!stub.source.contains("func (s *"));

    let stub = stub_for(&dir, "Interface");
    assert!(stub.source.contains("type StubInterfaceMethod1Call struct {\n}\n"));
    assert!(!stub.source.contains("StubInterfaceMethod1Returns"));
    assert!(stub.source.contains(
        "\ts.Method1Calls = append(s.Method1Calls, StubInterfaceMethod1Call{})\n\treturn\n}\n"
    ));
    assert_round_trip(&dir, "shapes.go", "Interface");
    assert_round_trip(&dir, "shapes.go", "InterfaceWithParam");
}

#[test]
fn colliding_package_names_get_aliases() {
    let root = tempfile::tempdir().expect("tempdir");
    let base = root.path();
    fs::write(base.join("go.mod"), "module example.com/m\n").expect("go.mod");
    for (dir, pkg) in [("a/util", "util"), ("b/util", "util"), ("api", "api")] {
        fs::create_dir_all(base.join(dir)).expect("mkdir");
        let body = if pkg == "api" {
            "package api\n\n\
             import (\n\tua \"example.com/m/a/util\"\n\tub \"example.com/m/b/util\"\n)\n\n\
             type Merger interface {\n\tMerge(x ua.Item, y ub.Item) ub.Item\n}\n"
                .to_owned()
        } else {
            format!("package {pkg}\n\ntype Item struct{{}}\n")
        };
        fs::write(base.join(dir).join("x.go"), body).expect("write");
    }

    let mut req = GenerateRequest::new(base.join("api"), "Merger");
    req.settings.stub_dir = base.join("stubs");
    let stub = generate(&req).expect("generates");
    assert!(stub.source.contains("\t\"example.com/m/a/util\"\n"));
    assert!(stub.source.contains("\tutil2 \"example.com/m/b/util\"\n"));
    assert!(stub
        .source
        .contains("func (s *StubMerger) Merge(x util.Item, y util2.Item) util2.Item {\n"));
}

#[test]
fn output_is_byte_identical_across_runs() {
    let dir = testdata("complex");
    assert_eq!(stub_for(&dir, "ComplexInterface"), stub_for(&dir, "ComplexInterface"));
}

fn stub_inline(src: &str, interface: &str) -> GeneratedStub {
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("go.mod"), "module example.com/x\n").expect("go.mod");
    fs::write(root.path().join("x.go"), src).expect("source");
    let mut req = GenerateRequest::new(root.path(), interface);
    req.settings.stub_dir = root.path().join("stubs");
    generate(&req).unwrap_or_else(|e| panic!("{interface}: {e}"))
}

#[test]
fn methods_named_like_lock_fields_push_the_fields_aside() {
    let src = "package x\n\ntype Locker interface {\n\tmu()\n\tisLocked() bool\n}\n";
    let stub = stub_inline(src, "Locker");
    let out = &stub.source;
    assert!(out.contains("\tmu_             sync.Mutex\n\tisLocked_       bool\n"), "{out}");
    assert!(out.contains("\treturn &StubLocker{isLocked_: opts.WithLocking}\n"));
    assert!(out.contains("\tif s.isLocked_ {\n\t\ts.mu_.Lock()\n\t\tdefer s.mu_.Unlock()\n\t}\n"));
    assert!(out.contains("func (s *StubLocker) mu() {\n"));
    assert!(!out.contains("s.mu.Lock()"));
    assert_eq!(stub_shapes(out), interface_shapes(src, "Locker"));
}

#[test]
fn type_parameters_named_like_receiver_or_options() {
    let src = "package x\n\ntype Odd[s any, opts comparable] interface {\n\tDo(v s) opts\n}\n";
    let stub = stub_inline(src, "Odd");
    let out = &stub.source;
    assert!(out.contains(
        "func NewStubOdd[s any, opts comparable](opts2 options.StubOptions) *StubOdd[s, opts] {\n\treturn &StubOdd[s, opts]{isLocked: opts2.WithLocking}\n}\n"
    ), "{out}");
    assert!(out.contains("func (stub *StubOdd[s, opts]) Do(v s) opts {\n"));
    assert!(out.contains("\t\treturn stub.DoFunc(v)\n"));
    assert_eq!(stub_shapes(out), interface_shapes(src, "Odd"));
}

#[test]
fn constraints_with_type_sets_and_methods() {
    let src = "package x\n\n\
               type Num[T interface{ ~int | ~int64; String() string }] interface {\n\
               \tDo(v T) T\n\
               }\n\n\
               type Ptr[P *int | *int64,] interface {\n\
               \tGet() P\n\
               }\n";
    let stub = stub_inline(src, "Num");
    assert!(stub.source.contains(
        "type StubNum[T interface{ ~int | ~int64; String() string }] struct {\n"
    ), "{}", stub.source);
    assert_eq!(stub_shapes(&stub.source), interface_shapes(src, "Num"));

    let stub = stub_inline(src, "Ptr");
    assert!(stub.source.contains("type StubPtr[P *int | *int64,] struct {\n"), "{}", stub.source);
    assert!(stub.source.contains("func NewStubPtr[P *int | *int64,](opts options.StubOptions) *StubPtr[P] {\n"));
    assert_eq!(stub_shapes(&stub.source), interface_shapes(src, "Ptr"));
}
