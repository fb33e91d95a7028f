//! Variable expansion for step arguments.
//!
//! Resolves `${NAME}` and `$NAME` against an [`ExecutionContext`]; `$$` is a
//! literal dollar. `RUN` commands are never expanded here; the shell does
//! its own expansion with the context's environment.

use super::context::ExecutionContext;
use super::error::EnvironmentError;
use super::types::Step;
use regex::Regex;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|\{([^}]*)\}|([A-Za-z_][A-Za-z0-9_]*)|(\{))").expect("static regex")
});

/// Whether `name` is a legal variable name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Expand every variable reference in `input`.
pub fn expand(input: &str, ctx: &ExecutionContext) -> Result<String, EnvironmentError> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in REF_RE.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&input[last..whole.start()]);
        last = whole.end();

        if caps.get(1).is_some() {
            out.push('$');
            continue;
        }
        if caps.get(4).is_some() {
            return Err(EnvironmentError::MalformedReference(input.to_string()));
        }
        let name = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if !is_valid_name(name) {
            return Err(EnvironmentError::MalformedReference(input.to_string()));
        }
        let value = ctx
            .lookup(name)
            .ok_or_else(|| EnvironmentError::UndefinedVariable(name.to_string()))?;
        out.push_str(value);
    }

    out.push_str(&input[last..]);
    Ok(out)
}

/// Expand the arguments of a step. `RUN` commands, variable names and `ARG`
/// defaults pass through untouched; an `ARG` default is expanded only when
/// no override replaces it.
pub fn resolve_step(step: &Step, ctx: &ExecutionContext) -> Result<Step, EnvironmentError> {
    let resolved = match step {
        Step::SetBuildArg { .. } | Step::RunShellCommand { .. } => step.clone(),
        Step::SetEnvironmentVariable { name, value } => Step::SetEnvironmentVariable {
            name: name.clone(),
            value: expand(value, ctx)?,
        },
        Step::CloneRepository {
            url,
            directory,
            branch,
            depth,
        } => Step::CloneRepository {
            url: expand(url, ctx)?,
            directory: expand(directory, ctx)?,
            branch: branch.as_deref().map(|b| expand(b, ctx)).transpose()?,
            depth: *depth,
        },
        Step::SetWorkingDirectory { path } => Step::SetWorkingDirectory {
            path: expand(path, ctx)?,
        },
        Step::InstallPackages { provider, packages } => Step::InstallPackages {
            provider: *provider,
            packages: packages
                .iter()
                .map(|p| expand(p, ctx))
                .collect::<Result<_, _>>()?,
        },
    };
    Ok(resolved)
}
