//! Go module layout: `go.mod` discovery, import paths of directories and
//! locating the source directory of an imported package.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub root: PathBuf,
    pub path: String,
    /// `require` entries: module path and version.
    pub requires: Vec<(String, String)>,
}

impl Module {
    /// Nearest `go.mod` at or above `dir`.
    ///
    /// Directories that do not exist yet (an output directory about to be
    /// created) are skipped over.
    pub fn find(dir: &Path) -> Option<Module> {
        let dir = absolute(dir);
        for candidate in dir.ancestors() {
            let gomod = candidate.join("go.mod");
            let Ok(text) = fs::read_to_string(&gomod) else {
                continue;
            };
            let path = parse_module_path(&text)?;
            debug!(go_mod = %gomod.display(), module = %path, "found module");
            return Some(Module {
                root: candidate.to_path_buf(),
                path,
                requires: parse_requires(&text),
            });
        }
        None
    }

    /// Import path of `dir`, which must lie inside the module root.
    pub fn import_path_of(&self, dir: &Path) -> Option<String> {
        let rel = absolute(dir).strip_prefix(&self.root).ok()?.to_path_buf();
        let mut path = self.path.clone();
        for comp in rel.components() {
            if let Component::Normal(seg) = comp {
                path.push('/');
                path.push_str(&seg.to_string_lossy());
            }
        }
        Some(path)
    }

    /// Directory of `import_path` when it belongs to this module.
    pub fn dir_of(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(self.root.clone());
        }
        let rest = import_path.strip_prefix(&self.path)?.strip_prefix('/')?;
        Some(self.root.join(rest))
    }
}

/// Import path of the package in `dir`: module-relative inside a module,
/// the directory name otherwise.
pub fn package_path(dir: &Path) -> String {
    if let Some(path) = Module::find(dir).and_then(|m| m.import_path_of(dir)) {
        return path;
    }
    absolute(dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Finds the source directory of `import_path` as seen from `from_dir`:
/// the enclosing module, then `vendor/` directories up to the module root,
/// then the module cache for required modules, then `$GOROOT/src`.
pub fn locate_package(from_dir: &Path, import_path: &str) -> Option<PathBuf> {
    let module = Module::find(from_dir);

    if let Some(dir) = module.as_ref().and_then(|m| m.dir_of(import_path)) {
        if dir.is_dir() {
            return Some(dir);
        }
    }

    let from = absolute(from_dir);
    for ancestor in from.ancestors() {
        let vendored = ancestor.join("vendor").join(import_path);
        if vendored.is_dir() {
            return Some(vendored);
        }
        if module.as_ref().is_some_and(|m| m.root == ancestor) {
            break;
        }
    }

    if let Some(m) = &module {
        if let Some(dir) = module_cache_dir(m, import_path) {
            return Some(dir);
        }
    }

    goroot()
        .map(|root| root.join("src").join(import_path))
        .filter(|dir| dir.is_dir())
}

fn module_cache_dir(module: &Module, import_path: &str) -> Option<PathBuf> {
    let (mod_path, version) = module
        .requires
        .iter()
        .filter(|(p, _)| import_path == p || import_path.starts_with(&format!("{p}/")))
        .max_by_key(|(p, _)| p.len())?;
    let cache = mod_cache()?;
    let rest = &import_path[mod_path.len()..];
    let dir = cache.join(format!(
        "{}@{}{}",
        escape_module_path(mod_path),
        escape_module_path(version),
        rest
    ));
    dir.is_dir().then_some(dir)
}

/// Case-encoding used by the module cache: `A` becomes `!a`.
fn escape_module_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn mod_cache() -> Option<PathBuf> {
    if let Some(dir) = env::var_os("GOMODCACHE").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    let gopath = env::var_os("GOPATH")
        .filter(|v| !v.is_empty())
        .and_then(|v| env::split_paths(&v).next())
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join("go")))?;
    Some(gopath.join("pkg").join("mod"))
}

fn goroot() -> Option<PathBuf> {
    if let Some(root) = env::var_os("GOROOT").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(root));
    }
    ["/usr/local/go", "/usr/lib/go", "/opt/homebrew/opt/go/libexec"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.join("src").is_dir())
}

pub(crate) fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or("").trim()
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '`')
}

fn parse_module_path(gomod: &str) -> Option<String> {
    gomod.lines().find_map(|line| {
        let rest = strip_comment(line).strip_prefix("module")?;
        let path = unquote(rest.trim());
        (!path.is_empty()).then(|| path.to_owned())
    })
}

fn parse_requires(gomod: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut in_block = false;
    for line in gomod.lines() {
        let line = strip_comment(line);
        let entry = if in_block {
            if line == ")" {
                in_block = false;
                continue;
            }
            line
        } else if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
                continue;
            }
            rest
        } else {
            continue;
        };
        let mut parts = entry.split_whitespace();
        if let (Some(path), Some(version)) = (parts.next(), parts.next()) {
            out.push((unquote(path).to_owned(), version.to_owned()));
        }
    }
    out
}
