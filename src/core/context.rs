//! Execution context: the mutable state threaded through one run.
//!
//! Working directory and variables live here, never in the process itself,
//! so two runs in one process cannot see each other's changes.

use super::error::EnvironmentError;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};

/// Variables always carried over when environment inheritance is off.
const MINIMAL_ENV: &[&str] = &["PATH", "HOME"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    cwd: PathBuf,
    /// Snapshot of the launching process environment.
    inherited: IndexMap<String, String>,
    /// `ARG` declarations; `None` means declared without a value.
    build_args: IndexMap<String, Option<String>>,
    /// Values supplied from outside the recipe (`--build-arg`, config).
    arg_overrides: IndexMap<String, String>,
    /// `SET`/`ENV` variables.
    env: IndexMap<String, String>,
    last_exit_code: Option<i32>,
}

impl ExecutionContext {
    /// Empty context rooted at `cwd`: no inherited environment.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: normalize(&cwd.into()),
            inherited: IndexMap::new(),
            build_args: IndexMap::new(),
            arg_overrides: IndexMap::new(),
            env: IndexMap::new(),
            last_exit_code: None,
        }
    }

    /// Context rooted at `cwd` seeded from the current process environment.
    /// With `inherit_all` false only `PATH` and `HOME` are carried over.
    pub fn from_process(cwd: impl Into<PathBuf>, inherit_all: bool) -> Self {
        let mut ctx = Self::new(cwd);
        for (key, value) in std::env::vars() {
            if inherit_all || MINIMAL_ENV.contains(&key.as_str()) {
                ctx.inherited.insert(key, value);
            }
        }
        ctx
    }

    pub fn with_inherited(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inherited.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_build_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arg_overrides.insert(key.into(), value.into());
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn env(&self) -> &IndexMap<String, String> {
        &self.env
    }

    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit_code
    }

    pub(crate) fn record_exit(&mut self, code: i32) {
        self.last_exit_code = Some(code);
    }

    /// Resolve a variable: `SET` values, then build args, then the
    /// inherited environment.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.env.get(name) {
            return Some(v);
        }
        if let Some(Some(v)) = self.build_args.get(name) {
            return Some(v);
        }
        self.inherited.get(name).map(String::as_str)
    }

    pub fn set_env(&mut self, name: &str, value: String) {
        self.env.insert(name.to_string(), value);
    }

    /// Whether `name` was given a value from outside the recipe.
    pub fn has_override(&self, name: &str) -> bool {
        self.arg_overrides.contains_key(name)
    }

    /// Declare a build argument. An outside override wins over the recipe
    /// default. Returns the value the argument ended up with.
    pub fn declare_build_arg(&mut self, name: &str, default: Option<String>) -> Option<&str> {
        let value = self.arg_overrides.get(name).cloned().or(default);
        self.build_args.insert(name.to_string(), value);
        self.build_args.get(name).and_then(|v| v.as_deref())
    }

    /// Resolve `path` against the working directory without touching it.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            normalize(p)
        } else {
            normalize(&self.cwd.join(p))
        }
    }

    /// Change directory. The target must already exist.
    pub fn change_dir(&mut self, path: &str) -> Result<&Path, EnvironmentError> {
        let target = self.resolve_path(path);
        if !target.exists() {
            return Err(EnvironmentError::MissingDirectory(target));
        }
        if !target.is_dir() {
            return Err(EnvironmentError::NotADirectory(target));
        }
        self.cwd = target;
        Ok(&self.cwd)
    }

    /// Environment handed to subprocesses: inherited, then build args with
    /// values, then `SET` variables. Later layers win.
    pub fn command_env(&self) -> IndexMap<String, String> {
        let mut out = self.inherited.clone();
        for (k, v) in &self.build_args {
            if let Some(v) = v {
                out.insert(k.clone(), v.clone());
            }
        }
        for (k, v) in &self.env {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

/// Lexical normalization: drops `.` and folds `..` without hitting the
/// filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` of the root is the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/")), PathBuf::from("/a/b"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_normalize_parent_at_root_and_relative() {
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(normalize(Path::new("../..")), PathBuf::from("../.."));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("work/src/../../..")), PathBuf::from(".."));
    }

    #[test]
    fn test_change_dir_parent_of_root_stays_at_root() {
        let mut ctx = ExecutionContext::new("/");
        ctx.change_dir("..").unwrap();
        assert_eq!(ctx.cwd(), Path::new("/"));
        ctx.change_dir("../../tmp/..").unwrap();
        assert_eq!(ctx.cwd(), Path::new("/"));
    }

    #[test]
    fn test_change_dir_two_levels_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let mut ctx = ExecutionContext::new(&nested);
        ctx.change_dir("../..").unwrap();
        assert_eq!(ctx.cwd(), normalize(dir.path()));
    }

    #[test]
    fn test_lookup_precedence() {
        let mut ctx = ExecutionContext::new("/")
            .with_inherited("NAME", "inherited")
            .with_build_arg("NAME", "override");
        assert_eq!(ctx.lookup("NAME"), Some("inherited"));

        ctx.declare_build_arg("NAME", Some("default".into()));
        assert_eq!(ctx.lookup("NAME"), Some("override"));

        ctx.set_env("NAME", "set".into());
        assert_eq!(ctx.lookup("NAME"), Some("set"));
        assert_eq!(ctx.lookup("MISSING"), None);
    }

    #[test]
    fn test_declare_build_arg_default_and_unset() {
        let mut ctx = ExecutionContext::new("/");
        assert_eq!(ctx.declare_build_arg("A", Some("1".into())), Some("1"));
        assert_eq!(ctx.declare_build_arg("B", None), None);
        assert_eq!(ctx.lookup("B"), None);
        assert!(ctx.build_args.contains_key("B"));
    }

    #[test]
    fn test_change_dir_relative_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("repo")).unwrap();
        let mut ctx = ExecutionContext::new(dir.path());

        ctx.change_dir("repo").unwrap();
        assert!(ctx.cwd().ends_with("repo"));

        let before = ctx.cwd().to_path_buf();
        let err = ctx.change_dir("nope").unwrap_err();
        assert!(matches!(err, EnvironmentError::MissingDirectory(_)));
        assert_eq!(ctx.cwd(), before);

        ctx.change_dir("..").unwrap();
        assert_eq!(ctx.cwd(), normalize(dir.path()));
    }

    #[test]
    fn test_change_dir_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file"), "x").unwrap();
        let mut ctx = ExecutionContext::new(dir.path());
        let err = ctx.change_dir("file").unwrap_err();
        assert!(matches!(err, EnvironmentError::NotADirectory(_)));
    }

    #[test]
    fn test_command_env_layers() {
        let mut ctx = ExecutionContext::new("/")
            .with_inherited("PATH", "/bin")
            .with_inherited("SHARED", "inherited");
        ctx.declare_build_arg("SHARED", Some("arg".into()));
        ctx.declare_build_arg("EMPTY", None);
        ctx.set_env("ONLY_ENV", "yes".into());
        ctx.declare_build_arg("BOTH", Some("arg".into()));
        ctx.set_env("BOTH", "env".into());

        let env = ctx.command_env();
        assert_eq!(env["PATH"], "/bin");
        assert_eq!(env["SHARED"], "arg");
        assert_eq!(env["ONLY_ENV"], "yes");
        assert_eq!(env["BOTH"], "env");
        assert!(!env.contains_key("EMPTY"));
    }

    #[test]
    fn test_from_process_minimal() {
        let ctx = ExecutionContext::from_process("/", false);
        let env = ctx.command_env();
        assert!(env.keys().all(|k| MINIMAL_ENV.contains(&k.as_str())));
    }
}
