use std::collections::BTreeSet;
use std::path::PathBuf;

use goparser::ast::Type;
use goparser::parse_file;
use toe::{generate, GenerateRequest, StubError};
use walkdir::WalkDir;

/// Generates a stub for every interface found under `TOE_GO_CORPUS` and
/// checks each emitted file parses again.
#[test]
fn stubs_every_corpus_interface_if_configured() {
    let Some(root) = std::env::var_os("TOE_GO_CORPUS") else {
        eprintln!("TOE_GO_CORPUS not set; skipping corpus test");
        return;
    };

    let mut targets: BTreeSet<(PathBuf, String)> = BTreeSet::new();
    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some("go")
            || path.to_string_lossy().ends_with("_test.go")
            || path.to_string_lossy().contains("testdata")
        {
            continue;
        }
        let Ok(src) = std::fs::read_to_string(path) else {
            continue;
        };
        let Ok(parsed) = parse_file(&src) else {
            continue;
        };
        let Some(dir) = path.parent() else {
            continue;
        };
        for spec in parsed.type_specs() {
            if spec.alias {
                continue;
            }
            if let Type::Interface { .. } = parsed.arena.types[spec.typ] {
                targets.insert((dir.to_path_buf(), parsed.text(spec.name.sym).to_owned()));
            }
        }
    }

    let out = tempfile::tempdir().expect("tempdir");
    let (mut generated, mut skipped) = (0usize, 0usize);
    for (dir, name) in &targets {
        let mut req = GenerateRequest::new(dir, name);
        req.settings.stub_dir = out.path().join("stubs");
        match generate(&req) {
            Ok(stub) => {
                if let Err(failure) = parse_file(&stub.source) {
                    eprintln!("{}", stub.source);
                    panic!(
                        "stub for {name} in {} does not parse: {:?}",
                        dir.display(),
                        failure.diags
                    );
                }
                generated += 1;
            }
            Err(err) => match err.kind() {
                StubError::Render(_) => panic!("{name} in {}: {err}", dir.display()),
                _ => {
                    skipped += 1;
                    eprintln!("skipped {name} in {}: {err}", dir.display());
                }
            },
        }
    }

    eprintln!("Generated {generated} stubs, skipped {skipped}.");
}
