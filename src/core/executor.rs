//! Executor: applies a plan's steps in order, stopping at the first failure.
//!
//! For each step: resolve variables → apply to context or generate script →
//! runner → record exit status → journal event.

use super::codegen;
use super::context::ExecutionContext;
use super::error::StepError;
use super::resolver;
use super::types::*;
use crate::journal::{eventlog, Journal};
use crate::transport::{CommandRunner, Invocation};
use std::time::Instant;

/// Runs plans against a [`CommandRunner`].
pub struct Executor<'a> {
    runner: &'a mut dyn CommandRunner,
    journal: Option<&'a Journal>,
    state: RunState,
}

impl<'a> Executor<'a> {
    pub fn new(runner: &'a mut dyn CommandRunner) -> Self {
        Self {
            runner,
            journal: None,
            state: RunState::NotStarted,
        }
    }

    /// Record run and step events to `journal`.
    pub fn with_journal(mut self, journal: &'a Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// State of the current or most recent run.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute `plan` starting from `ctx`. The context comes back in the
    /// report with every effect applied up to the point the run stopped.
    pub fn run(&mut self, plan: &Plan, mut ctx: ExecutionContext) -> RunReport {
        let start = Instant::now();
        let run_id = eventlog::generate_run_id();
        self.state = RunState::NotStarted;

        self.log_event(RunEvent::RunStarted {
            run_id: run_id.clone(),
            recipe_digest: plan.digest(),
            steps: plan.len(),
            rigfile_version: env!("CARGO_PKG_VERSION").to_string(),
        });

        let total = plan.len();
        let mut outcome = RunOutcome::Succeeded;
        let mut steps_run = 0;

        for (step_index, instruction) in plan.instructions.iter().enumerate() {
            self.transition(RunState::Running { step_index });
            steps_run += 1;
            log::info!(
                "[{}/{}] line {}: {}",
                step_index + 1,
                total,
                instruction.line,
                instruction.step
            );
            self.log_event(RunEvent::StepStarted {
                run_id: run_id.clone(),
                step_index,
                line: instruction.line,
                step: instruction.step.to_string(),
            });

            let step_start = Instant::now();
            match self.apply_step(&instruction.step, &mut ctx) {
                Ok(()) => {
                    self.log_event(RunEvent::StepSucceeded {
                        run_id: run_id.clone(),
                        step_index,
                        duration_seconds: step_start.elapsed().as_secs_f64(),
                    });
                }
                Err(error) => {
                    let exit_code = error.exit_code();
                    log::error!(
                        "step {} (line {}) failed: {}",
                        step_index + 1,
                        instruction.line,
                        error
                    );
                    self.log_event(RunEvent::StepFailed {
                        run_id: run_id.clone(),
                        step_index,
                        exit_code,
                        error: error.to_string(),
                    });
                    self.transition(RunState::Failed {
                        step_index,
                        exit_code,
                    });
                    outcome = RunOutcome::Failed(StepFailure {
                        step_index,
                        line: instruction.line,
                        step: instruction.step.clone(),
                        error,
                    });
                    break;
                }
            }
        }

        if matches!(outcome, RunOutcome::Succeeded) {
            self.transition(RunState::Succeeded);
        }

        let total_duration = start.elapsed();
        self.log_event(RunEvent::RunCompleted {
            run_id: run_id.clone(),
            state: self.state,
            steps_run,
            total_seconds: total_duration.as_secs_f64(),
        });

        RunReport {
            run_id,
            outcome,
            state: self.state,
            context: ctx,
            steps_run,
            total_duration,
        }
    }

    /// Apply one step's effect to the context.
    fn apply_step(&mut self, step: &Step, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        if let Step::SetBuildArg { name, default } = step {
            // An override replaces the default unexpanded.
            let default = match default {
                Some(d) if !ctx.has_override(name) => Some(resolver::expand(d, ctx)?),
                _ => None,
            };
            let value = ctx.declare_build_arg(name, default);
            log::debug!("ARG {} = {:?}", name, value);
            return Ok(());
        }

        let resolved = resolver::resolve_step(step, ctx)?;
        if resolved.spawns_command() {
            return self.run_command(&resolved, ctx);
        }
        match resolved {
            Step::SetEnvironmentVariable { name, value } => ctx.set_env(&name, value),
            Step::SetWorkingDirectory { path } => {
                let cwd = ctx.change_dir(&path)?;
                log::debug!("cwd -> {}", cwd.display());
            }
            _ => {}
        }
        Ok(())
    }

    /// Generate and run the script for an already-resolved command step.
    fn run_command(&mut self, step: &Step, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        let Some(script) = codegen::command_script(step) else {
            return Ok(());
        };

        let env = ctx.command_env();
        let output = self.runner.run(&Invocation {
            script: &script,
            cwd: ctx.cwd(),
            env: &env,
        })?;
        ctx.record_exit(output.exit_code);

        if !output.stdout.is_empty() {
            log::debug!("stdout:\n{}", output.stdout.trim_end());
        }
        if !output.stderr.is_empty() {
            log::debug!("stderr:\n{}", output.stderr.trim_end());
        }

        if output.success() {
            Ok(())
        } else {
            Err(StepError::Execution {
                exit_code: output.exit_code,
            })
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        log::debug!("state {} -> {}", self.state, next);
        self.state = next;
    }

    fn log_event(&self, event: RunEvent) {
        if let Some(journal) = self.journal {
            journal.record(event);
        }
    }
}

/// Run `plan` once with `runner` and no journal.
pub fn execute(
    plan: &Plan,
    ctx: ExecutionContext,
    runner: &mut dyn CommandRunner,
) -> RunReport {
    Executor::new(runner).run(plan, ctx)
}
