//! End-to-end generation: load, resolve, synthesize, print, write.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use crate::config::Settings;
use crate::error::{Phase, Result, StubError};
use crate::loader::Loader;
use crate::module::{absolute, package_path};
use crate::printer::print_file;
use crate::resolver::{resolve_interface, TargetPackage};
use crate::synth::{synthesize, SynthOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Directory holding the package that declares the interface.
    pub input_dir: PathBuf,
    pub interface: String,
    pub settings: Settings,
    /// Explicit output file; derived from the stub directory when absent.
    pub output: Option<PathBuf>,
}

impl GenerateRequest {
    pub fn new(input_dir: impl Into<PathBuf>, interface: impl Into<String>) -> Self {
        Self {
            input_dir: input_dir.into(),
            interface: interface.into(),
            settings: Settings::default(),
            output: None,
        }
    }

    /// `stub_{lower(I)}.go` in the stub directory, `_test.go` for test
    /// packages, unless an output file was given.
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let suffix = if self.settings.test_package { "_test" } else { "" };
        self.settings
            .stub_dir
            .join(format!("stub_{}{suffix}.go", self.interface.to_lowercase()))
    }

    /// Package the stub is declared in: named after the stub directory,
    /// with the import path of the directory the file lands in.
    pub fn target_package(&self) -> TargetPackage {
        let stub_dir = &self.settings.stub_dir;
        let mut name = stub_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .or_else(|| {
                absolute(stub_dir)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default();

        let output = self.output_path();
        let out_dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut path = package_path(&out_dir);

        if self.settings.test_package {
            name.push_str("_test");
            path.push_str("_test");
        }
        TargetPackage { name, path }
    }
}

/// Rendered stub, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStub {
    pub path: PathBuf,
    pub package: String,
    pub source: String,
}

pub fn generate(req: &GenerateRequest) -> Result<GeneratedStub> {
    let _span = info_span!("generate", interface = %req.interface).entered();
    let target = req.target_package();
    debug!(package = %target.name, path = %target.path, "target package");

    let mut loader = Loader::new();
    let model = resolve_interface(
        &mut loader,
        &req.input_dir,
        &req.interface,
        &target,
        &req.settings.options_package,
    )
    .map_err(|err| {
        let phase = match err {
            StubError::Load { .. } => Phase::Load,
            _ => Phase::Resolve,
        };
        err.at(phase)
    })?;
    debug!(
        methods = model.methods.len(),
        imports = model.imports.len(),
        "resolved {}",
        model.interface_name
    );

    let opts = SynthOptions {
        options_package: req.settings.options_package.clone(),
        result_naming: req.settings.result_naming,
    };
    let file = synthesize(&model, &opts).map_err(|err| err.at(Phase::Synthesize))?;
    let source = print_file(&file).map_err(|err| err.at(Phase::Render))?;

    Ok(GeneratedStub {
        path: req.output_path(),
        package: target.name,
        source,
    })
}

/// Writes the stub through a temporary file in the destination directory,
/// so an existing file is either fully replaced or left untouched.
pub fn write_stub(stub: &GeneratedStub) -> Result<()> {
    let write_err = |source: std::io::Error| {
        StubError::Write {
            path: stub.path.clone(),
            source,
        }
        .at(Phase::Write)
    };

    let dir = match stub.path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".toe-")
        .suffix(".go.tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(stub.source.as_bytes()).map_err(write_err)?;
    tmp.persist(&stub.path).map_err(|err| write_err(err.error))?;

    info!(path = %stub.path.display(), "stub written");
    Ok(())
}
