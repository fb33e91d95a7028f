//! Script generation: dispatch a resolved step to its generator.
//!
//! Only steps that spawn a command produce a script. Variable and directory
//! steps are applied to the context directly by the executor.

use super::types::Step;
use crate::steps;

/// Shell script for a resolved step, or `None` for context-only steps.
pub fn command_script(step: &Step) -> Option<String> {
    match step {
        Step::RunShellCommand { command } => Some(command.clone()),
        Step::CloneRepository {
            url,
            directory,
            branch,
            depth,
        } => Some(steps::clone::clone_script(
            url,
            directory,
            branch.as_deref(),
            *depth,
        )),
        Step::InstallPackages { provider, packages } => {
            Some(steps::package::install_script(*provider, packages))
        }
        Step::SetBuildArg { .. }
        | Step::SetEnvironmentVariable { .. }
        | Step::SetWorkingDirectory { .. } => None,
    }
}
