//! Recipe parsing.
//!
//! A recipe is line oriented: one instruction per line, keyword first.
//! - Blank lines and `#` comments produce no step
//! - A trailing `\` joins the next line; the instruction keeps the line
//!   number of its first physical line
//! - Keywords are case-insensitive
//!
//! Parsing stops at the first malformed instruction.

use super::error::{Error, ParseError};
use super::resolver::is_valid_name;
use super::types::{Instruction, PackageProvider, Plan, Step};
use std::path::Path;

/// Parse a recipe file from disk.
pub fn parse_recipe_file(path: &Path) -> Result<Plan, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::RecipeRead {
        path: path.to_path_buf(),
        source,
    })?;
    let plan = parse_recipe(&content)?;
    log::debug!("parsed {} step(s) from {}", plan.len(), path.display());
    Ok(plan)
}

/// Parse recipe text.
pub fn parse_recipe(text: &str) -> Result<Plan, ParseError> {
    parse_lines(text.lines())
}

/// Parse a recipe given as individual lines.
pub fn parse_lines<I, S>(lines: I) -> Result<Plan, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut instructions = Vec::new();
    for (line, text) in logical_lines(lines)? {
        let step = parse_instruction(line, &text)?;
        instructions.push(Instruction { line, step });
    }
    Ok(Plan::new(instructions))
}

/// Fold continuations and drop blanks/comments.
fn logical_lines<I, S>(lines: I) -> Result<Vec<(usize, String)>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (body, continues) = match trimmed.strip_suffix('\\') {
            Some(body) => (body.trim_end(), true),
            None => (trimmed, false),
        };

        let (start, mut text) = pending.take().unwrap_or((line_no, String::new()));
        if !text.is_empty() && !body.is_empty() {
            text.push(' ');
        }
        text.push_str(body);

        if continues {
            pending = Some((start, text));
        } else {
            out.push((start, text));
        }
    }

    if let Some((start, _)) = pending {
        return Err(ParseError::UnterminatedContinuation { line: start });
    }
    Ok(out)
}

fn parse_instruction(line: usize, text: &str) -> Result<Step, ParseError> {
    let (keyword, rest) = match text.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (text, ""),
    };

    match keyword.to_ascii_uppercase().as_str() {
        "ARG" => parse_arg(line, rest),
        "SET" | "ENV" => parse_set(line, rest),
        "RUN" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    line,
                    keyword: "RUN",
                    expected: "a command",
                });
            }
            Ok(Step::RunShellCommand {
                command: rest.to_string(),
            })
        }
        "CLONE" => parse_clone(line, rest),
        "CD" | "WORKDIR" => {
            let path = unquote(rest);
            if path.is_empty() {
                return Err(ParseError::MissingArgument {
                    line,
                    keyword: "CD",
                    expected: "a directory",
                });
            }
            Ok(Step::SetWorkingDirectory {
                path: path.to_string(),
            })
        }
        "INSTALL" => parse_install(line, rest),
        _ => Err(ParseError::UnknownInstruction {
            line,
            keyword: keyword.to_string(),
        }),
    }
}

fn parse_arg(line: usize, rest: &str) -> Result<Step, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::MissingArgument {
            line,
            keyword: "ARG",
            expected: "NAME or NAME=default",
        });
    }
    let (name, default) = match rest.split_once('=') {
        Some((n, v)) => (n.trim(), Some(unquote(v.trim()).to_string())),
        None => (rest, None),
    };
    check_name(line, name)?;
    Ok(Step::SetBuildArg {
        name: name.to_string(),
        default,
    })
}

fn parse_set(line: usize, rest: &str) -> Result<Step, ParseError> {
    let Some((name, value)) = rest.split_once('=') else {
        return Err(ParseError::MissingArgument {
            line,
            keyword: "SET",
            expected: "NAME=value",
        });
    };
    let name = name.trim();
    check_name(line, name)?;
    Ok(Step::SetEnvironmentVariable {
        name: name.to_string(),
        value: unquote(value.trim()).to_string(),
    })
}

fn parse_clone(line: usize, rest: &str) -> Result<Step, ParseError> {
    let tokens = split_words(line, "CLONE", rest)?;
    let mut branch = None;
    let mut depth = None;
    let mut positional = Vec::new();

    let mut iter = tokens.into_iter();
    while let Some(tok) = iter.next() {
        if tok == "--" {
            // end of options
            positional.extend(iter.by_ref());
            break;
        }
        if let Some(opt) = tok.strip_prefix("--") {
            let (name, inline) = match opt.split_once('=') {
                Some((n, v)) => (n.to_string(), Some(v.to_string())),
                None => (opt.to_string(), None),
            };
            let value = match inline.or_else(|| iter.next()) {
                Some(v) => v,
                None => {
                    return Err(invalid(line, "CLONE", format!("--{} needs a value", name)));
                }
            };
            match name.as_str() {
                "branch" => branch = Some(value),
                "depth" => match value.parse::<u32>() {
                    Ok(n) if n > 0 => depth = Some(n),
                    _ => {
                        return Err(invalid(
                            line,
                            "CLONE",
                            format!("--depth must be a positive integer, got '{}'", value),
                        ))
                    }
                },
                other => {
                    return Err(invalid(line, "CLONE", format!("unknown option --{}", other)));
                }
            }
        } else {
            positional.push(tok);
        }
    }

    let mut positional = positional.into_iter();
    let url = positional.next().ok_or(ParseError::MissingArgument {
        line,
        keyword: "CLONE",
        expected: "a repository URL",
    })?;
    let directory = match positional.next() {
        Some(dir) => dir,
        None => derive_clone_dir(&url).ok_or_else(|| ParseError::CloneDirectory {
            line,
            url: url.clone(),
        })?,
    };
    if let Some(extra) = positional.next() {
        return Err(invalid(line, "CLONE", format!("unexpected argument '{}'", extra)));
    }

    Ok(Step::CloneRepository {
        url,
        directory,
        branch,
        depth,
    })
}

fn parse_install(line: usize, rest: &str) -> Result<Step, ParseError> {
    let tokens = split_words(line, "INSTALL", rest)?;
    let mut provider = PackageProvider::default();
    let mut packages = Vec::new();

    let mut iter = tokens.into_iter();
    while let Some(tok) = iter.next() {
        let name = if let Some(v) = tok.strip_prefix("--provider=") {
            Some(v.to_string())
        } else if tok == "--provider" {
            Some(iter.next().ok_or_else(|| {
                invalid(line, "INSTALL", "--provider needs a value".to_string())
            })?)
        } else if tok.starts_with("--") {
            return Err(invalid(line, "INSTALL", format!("unknown option {}", tok)));
        } else {
            packages.push(tok);
            None
        };
        if let Some(name) = name {
            provider = PackageProvider::from_name(&name).ok_or_else(|| {
                invalid(line, "INSTALL", format!("unsupported provider '{}'", name))
            })?;
        }
    }

    if packages.is_empty() {
        return Err(ParseError::MissingArgument {
            line,
            keyword: "INSTALL",
            expected: "at least one package",
        });
    }
    Ok(Step::InstallPackages { provider, packages })
}

/// Directory `git clone` would create for `url`.
pub fn derive_clone_dir(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

fn check_name(line: usize, name: &str) -> Result<(), ParseError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ParseError::InvalidVariableName {
            line,
            name: name.to_string(),
        })
    }
}

fn split_words(line: usize, keyword: &'static str, rest: &str) -> Result<Vec<String>, ParseError> {
    shell_words::split(rest).map_err(|e| invalid(line, keyword, e.to_string()))
}

fn invalid(line: usize, keyword: &'static str, message: String) -> ParseError {
    ParseError::InvalidArgument {
        line,
        keyword,
        message,
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_apt_recipe() {
        let plan = parse_lines(["SET DEBIAN_FRONTEND=noninteractive", "RUN apt-get update"]).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan.instructions[0].step,
            Step::SetEnvironmentVariable {
                name: "DEBIAN_FRONTEND".into(),
                value: "noninteractive".into()
            }
        );
        assert_eq!(
            plan.instructions[1].step,
            Step::RunShellCommand {
                command: "apt-get update".into()
            }
        );
    }

    #[test]
    fn test_parse_clone_cd_run() {
        let plan = parse_lines([
            "CLONE https://example.com/repo.git",
            "CD repo",
            "RUN build.sh",
        ])
        .unwrap();
        let kinds: Vec<_> = plan.steps().map(Step::keyword).collect();
        assert_eq!(kinds, vec!["CLONE", "CD", "RUN"]);
        assert_eq!(
            plan.instructions[0].step,
            Step::CloneRepository {
                url: "https://example.com/repo.git".into(),
                directory: "repo".into(),
                branch: None,
                depth: None,
            }
        );
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        let text = "\n# base tools\nRUN true\n\n   # indented comment\nRUN false\n";
        let plan = parse_recipe(text).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.instructions[0].line, 3);
        assert_eq!(plan.instructions[1].line, 6);
    }

    #[test]
    fn test_parse_empty_recipe() {
        assert!(parse_recipe("").unwrap().is_empty());
        assert!(parse_recipe("# only a comment\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_continuation() {
        let text = "RUN apt-get update && \\\n    apt-get install -y curl\nCD /tmp";
        let plan = parse_recipe(text).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.instructions[0].line, 1);
        assert_eq!(
            plan.instructions[0].step,
            Step::RunShellCommand {
                command: "apt-get update && apt-get install -y curl".into()
            }
        );
        assert_eq!(plan.instructions[1].line, 3);
    }

    #[test]
    fn test_parse_unterminated_continuation() {
        let err = parse_recipe("RUN true\nRUN echo \\").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedContinuation { line: 2 });
    }

    #[test]
    fn test_parse_unknown_instruction() {
        let err = parse_recipe("RUN true\nFROM ubuntu:22.04").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownInstruction {
                line: 2,
                keyword: "FROM".into()
            }
        );
    }

    #[test]
    fn test_parse_keywords_case_insensitive_and_aliases() {
        let plan = parse_lines(["run true", "Env A=1", "workdir /tmp"]).unwrap();
        let kinds: Vec<_> = plan.steps().map(Step::keyword).collect();
        assert_eq!(kinds, vec!["RUN", "SET", "CD"]);
    }

    #[test]
    fn test_parse_run_requires_command() {
        let err = parse_recipe("RUN").unwrap_err();
        assert!(matches!(err, ParseError::MissingArgument { keyword: "RUN", .. }));
    }

    #[test]
    fn test_parse_set_requires_equals() {
        let err = parse_recipe("SET FOO bar").unwrap_err();
        assert!(matches!(err, ParseError::MissingArgument { keyword: "SET", .. }));
    }

    #[test]
    fn test_parse_set_quoted_value() {
        let plan = parse_recipe("SET GREETING=\"hello world\"").unwrap();
        assert_eq!(
            plan.instructions[0].step,
            Step::SetEnvironmentVariable {
                name: "GREETING".into(),
                value: "hello world".into()
            }
        );
    }

    #[test]
    fn test_parse_invalid_variable_name() {
        let err = parse_recipe("SET 9LIVES=cat").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidVariableName {
                line: 1,
                name: "9LIVES".into()
            }
        );
    }

    #[test]
    fn test_parse_arg_forms() {
        let plan = parse_lines(["ARG TOOLCHAIN=stable", "ARG TARGET"]).unwrap();
        assert_eq!(
            plan.instructions[0].step,
            Step::SetBuildArg {
                name: "TOOLCHAIN".into(),
                default: Some("stable".into())
            }
        );
        assert_eq!(
            plan.instructions[1].step,
            Step::SetBuildArg {
                name: "TARGET".into(),
                default: None
            }
        );
    }

    #[test]
    fn test_parse_clone_options() {
        let plan =
            parse_recipe("CLONE --branch release --depth=1 git@host.io:org/tool.git src/tool")
                .unwrap();
        assert_eq!(
            plan.instructions[0].step,
            Step::CloneRepository {
                url: "git@host.io:org/tool.git".into(),
                directory: "src/tool".into(),
                branch: Some("release".into()),
                depth: Some(1),
            }
        );
    }

    #[test]
    fn test_parse_clone_end_of_options() {
        let plan = parse_recipe("CLONE -- https://x/y.git").unwrap();
        assert_eq!(
            plan.instructions[0].step,
            Step::CloneRepository {
                url: "https://x/y.git".into(),
                directory: "y".into(),
                branch: None,
                depth: None,
            }
        );

        let plan = parse_recipe("CLONE --branch main -- https://x/y.git dest").unwrap();
        assert_eq!(
            plan.instructions[0].step,
            Step::CloneRepository {
                url: "https://x/y.git".into(),
                directory: "dest".into(),
                branch: Some("main".into()),
                depth: None,
            }
        );

        // after `--` a leading dash is a plain argument
        let plan = parse_recipe("CLONE -- https://x/y.git --odd").unwrap();
        match &plan.instructions[0].step {
            Step::CloneRepository { directory, .. } => assert_eq!(directory, "--odd"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_clone_errors() {
        assert!(matches!(
            parse_recipe("CLONE").unwrap_err(),
            ParseError::MissingArgument { keyword: "CLONE", .. }
        ));
        assert!(matches!(
            parse_recipe("CLONE --depth 0 https://x/y.git").unwrap_err(),
            ParseError::InvalidArgument { .. }
        ));
        assert!(matches!(
            parse_recipe("CLONE --mirror https://x/y.git").unwrap_err(),
            ParseError::InvalidArgument { .. }
        ));
        assert!(matches!(
            parse_recipe("CLONE https://x/y.git a b").unwrap_err(),
            ParseError::InvalidArgument { .. }
        ));
        assert!(matches!(
            parse_recipe("CLONE https://").unwrap_err(),
            ParseError::CloneDirectory { .. }
        ));
    }

    #[test]
    fn test_parse_install() {
        let plan = parse_lines(["INSTALL curl git build-essential", "INSTALL --provider cargo just"])
            .unwrap();
        assert_eq!(
            plan.instructions[0].step,
            Step::InstallPackages {
                provider: PackageProvider::Apt,
                packages: vec!["curl".into(), "git".into(), "build-essential".into()]
            }
        );
        assert_eq!(
            plan.instructions[1].step,
            Step::InstallPackages {
                provider: PackageProvider::Cargo,
                packages: vec!["just".into()]
            }
        );
    }

    #[test]
    fn test_parse_install_errors() {
        assert!(matches!(
            parse_recipe("INSTALL").unwrap_err(),
            ParseError::MissingArgument { keyword: "INSTALL", .. }
        ));
        assert!(matches!(
            parse_recipe("INSTALL --provider=brew wget").unwrap_err(),
            ParseError::InvalidArgument { .. }
        ));
        assert!(matches!(
            parse_recipe("INSTALL --provider").unwrap_err(),
            ParseError::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_derive_clone_dir() {
        assert_eq!(derive_clone_dir("https://example.com/repo.git").as_deref(), Some("repo"));
        assert_eq!(derive_clone_dir("https://example.com/org/tool/").as_deref(), Some("tool"));
        assert_eq!(derive_clone_dir("git@github.com:org/x.git").as_deref(), Some("x"));
        assert_eq!(derive_clone_dir("host:proj.git").as_deref(), Some("proj"));
        assert_eq!(derive_clone_dir("https://"), None);
        assert_eq!(derive_clone_dir(".git"), None);
    }

    #[test]
    fn test_parse_recipe_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Rigfile");
        std::fs::write(&path, "RUN echo hi\nCD /\n").unwrap();
        let plan = parse_recipe_file(&path).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_parse_recipe_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_recipe_file(&dir.path().join("Rigfile")).unwrap_err();
        assert!(matches!(err, Error::RecipeRead { .. }));
    }

    fn instruction_line() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,8}( [a-z0-9]{1,6}){0,3}".prop_map(|c| format!("RUN {}", c)),
            ("[A-Z_][A-Z0-9_]{0,6}", "[a-z0-9]{0,6}").prop_map(|(n, v)| format!("SET {}={}", n, v)),
            ("[A-Z_][A-Z0-9_]{0,6}", "[a-z0-9]{1,6}").prop_map(|(n, v)| format!("ARG {}={}", n, v)),
            "[a-z]{1,8}".prop_map(|d| format!("CD {}", d)),
            "[a-z]{1,8}".prop_map(|r| format!("CLONE https://example.com/{}.git", r)),
        ]
    }

    proptest! {
        #[test]
        fn prop_plan_length_and_order_match_input(lines in prop::collection::vec(instruction_line(), 0..24)) {
            let plan = parse_lines(&lines).unwrap();
            prop_assert_eq!(plan.len(), lines.len());
            for (i, instr) in plan.instructions.iter().enumerate() {
                prop_assert_eq!(instr.line, i + 1);
                let keyword = lines[i].split_whitespace().next().unwrap();
                prop_assert_eq!(instr.step.keyword(), keyword);
            }
        }
    }
}
