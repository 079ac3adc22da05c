//! Generator settings: built-in defaults, an optional `toe.toml`, and
//! command-line overrides, merged in that order of increasing priority.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StubError;
use crate::naming::ResultNaming;

/// Import path of the package declaring `StubOptions`.
pub const DEFAULT_OPTIONS_PACKAGE: &str = "github.com/phildrip/toe/options";
pub const DEFAULT_STUB_DIR: &str = "stubs";
pub const CONFIG_FILE_NAME: &str = "toe.toml";

/// Contents of a `toe.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub stub_dir: Option<PathBuf>,
    pub options_package: Option<String>,
    pub result_names: Option<ResultNaming>,
    pub test_package: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, StubError> {
        let contents = fs::read_to_string(path).map_err(|err| StubError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let config: FileConfig = toml::from_str(&contents).map_err(|err| StubError::Config {
            path: path.to_path_buf(),
            message: err.message().to_owned(),
        })?;
        if let Some(pkg) = &config.options_package {
            if pkg.trim().is_empty() {
                return Err(StubError::Config {
                    path: path.to_path_buf(),
                    message: "options_package must not be empty".into(),
                });
            }
        }
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `toe.toml` from `input_dir` when one exists.
    pub fn discover(input_dir: &Path) -> Result<Option<Self>, StubError> {
        let path = input_dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Values given on the command line; `None` leaves the decision to the
/// file or the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub stub_dir: Option<PathBuf>,
    pub options_package: Option<String>,
    pub result_names: Option<ResultNaming>,
    /// `--test-package` can only switch the toggle on.
    pub test_package: bool,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub stub_dir: PathBuf,
    pub options_package: String,
    pub result_naming: ResultNaming,
    pub test_package: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stub_dir: PathBuf::from(DEFAULT_STUB_DIR),
            options_package: DEFAULT_OPTIONS_PACKAGE.to_owned(),
            result_naming: ResultNaming::default(),
            test_package: false,
        }
    }
}

impl Settings {
    pub fn merge(file: Option<FileConfig>, cli: Overrides) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Settings::default();
        Self {
            stub_dir: cli.stub_dir.or(file.stub_dir).unwrap_or(defaults.stub_dir),
            options_package: cli
                .options_package
                .or(file.options_package)
                .unwrap_or(defaults.options_package),
            result_naming: cli
                .result_names
                .or(file.result_names)
                .unwrap_or(defaults.result_naming),
            test_package: cli.test_package || file.test_package.unwrap_or(defaults.test_package),
        }
    }
}
