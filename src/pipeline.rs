//! The seven-step evaluation pipeline: one [`CommandFragment`] in, one
//! [`FragmentVerdict`] out. Steps run in a fixed order and short-circuit on
//! the first one that isn't [`StepOutcome::Next`] — mirroring the
//! strictest-wins early-return shape the pack's own gate runners use, just
//! over a fixed step order instead of a configurable gate list.
//!
//! Nothing in here ever returns [`crate::fragment::HookDecision`] directly;
//! that whole-command type belongs to the orchestrator, one level up.

use crate::config::EffectiveConfig;
use crate::fragment::{CommandFragment, FragmentVerdict, HandlerOutcome, StepOutcome};

/// Capability that lets a handler recurse back into the full pipeline
/// (`find -exec`, `xargs cmd`) without `handlers` depending on `pipeline`
/// and `pipeline` depending on `handlers` at the same time.
pub trait Evaluator {
    fn evaluate(&self, fragment: &CommandFragment) -> FragmentVerdict;
}

/// git global flags that take their value as a separate following token,
/// so the subcommand lookup has to skip two tokens, not one.
const GIT_VALUE_FLAGS: &[&str] = &["-C", "-c", "--git-dir", "--work-tree", "--namespace"];

pub struct Pipeline<'a> {
    config: &'a EffectiveConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a EffectiveConfig) -> Self {
        Pipeline { config }
    }

    fn resolve_wrappers(&self, fragment: &CommandFragment) -> CommandFragment {
        let mut current = fragment.clone();
        loop {
            if !self.config.is_wrapper(current.basename()) {
                return current;
            }
            let Some(next) = unwrap_one(&current) else {
                return current;
            };
            current = next;
        }
    }

    fn step_never_approve(&self, fragment: &CommandFragment) -> StepOutcome {
        if self.config.is_never_approved(fragment.basename()) {
            StepOutcome::Reject
        } else {
            StepOutcome::Next
        }
    }

    fn step_output_redirect(&self, fragment: &CommandFragment) -> StepOutcome {
        if fragment.has_output_redirect {
            StepOutcome::Reject
        } else {
            StepOutcome::Next
        }
    }

    /// A handler's `Pass` only means "nothing dangerous found here" — the
    /// executable still has to clear the subcommand-whitelist/whitelist
    /// steps afterward, so `Pass` continues the pipeline rather than
    /// approving outright.
    fn step_handler(&self, fragment: &CommandFragment) -> StepOutcome {
        match self.config.handler_for(fragment.basename()) {
            Some(handler) => match handler(fragment, self.config, self) {
                HandlerOutcome::Pass => StepOutcome::Next,
                HandlerOutcome::Reject => StepOutcome::Reject,
            },
            None => StepOutcome::Next,
        }
    }

    fn step_subcommand_whitelist(&self, fragment: &CommandFragment) -> StepOutcome {
        let Some(subcommand) = extract_subcommand(fragment.basename(), &fragment.args) else {
            return StepOutcome::Next;
        };

        // `git config --global`/`--system` writes outside the project are
        // never approved via the subcommand path, even with local writes
        // enabled — `gitLocalWrites` only covers repo-local state.
        if fragment.basename() == "git"
            && subcommand == "config"
            && self.config.is_non_local_git_config_write(&fragment.args)
        {
            return StepOutcome::Next;
        }

        if self
            .config
            .subcommand_is_whitelisted(fragment.basename(), subcommand)
        {
            StepOutcome::Approve
        } else {
            StepOutcome::Next
        }
    }

    fn step_whitelist(&self, fragment: &CommandFragment) -> StepOutcome {
        if self.config.is_whitelisted(fragment.basename()) {
            StepOutcome::Approve
        } else {
            StepOutcome::Next
        }
    }

    fn step_default_deny(&self, _fragment: &CommandFragment) -> StepOutcome {
        StepOutcome::Reject
    }
}

impl<'a> Evaluator for Pipeline<'a> {
    /// Step 1 (output-redirect) runs on the fragment exactly as the parser
    /// built it, before any wrapper unwrapping: unwrapping builds a fresh
    /// inner fragment, and a redirect that sat on the wrapper invocation
    /// itself (`env cat secret.txt > stolen.txt`) would otherwise be lost
    /// the moment `env` is stripped away. Step 2 (wrapper resolution)
    /// always happens next; steps 3-7 run over the resolved fragment in
    /// order, short-circuiting on the first non-`Next`.
    fn evaluate(&self, fragment: &CommandFragment) -> FragmentVerdict {
        if let StepOutcome::Reject = self.step_output_redirect(fragment) {
            return FragmentVerdict::Reject;
        }

        let resolved = self.resolve_wrappers(fragment); // step 2

        let steps: [&dyn Fn(&CommandFragment) -> StepOutcome; 5] = [
            &|f| self.step_never_approve(f),        // step 3
            &|f| self.step_handler(f),              // step 4
            &|f| self.step_subcommand_whitelist(f), // step 5
            &|f| self.step_whitelist(f),             // step 6
            &|f| self.step_default_deny(f),         // step 7
        ];

        for step in steps {
            match step(&resolved) {
                StepOutcome::Approve => return FragmentVerdict::Approve,
                StepOutcome::Reject => return FragmentVerdict::Reject,
                StepOutcome::Next => continue,
            }
        }
        FragmentVerdict::Reject
    }
}

/// Strip one layer of wrapper: leading `VAR=value` assignments and
/// wrapper-specific flags, leaving the inner command as a fresh fragment.
/// Returns `None` if the wrapper has no discoverable inner command (bare
/// `env` with no arguments, say) — the caller then evaluates the wrapper
/// itself, which the never-approve/whitelist steps will reject as unknown.
///
/// The outer fragment's `has_output_redirect` is carried onto the inner
/// fragment as defense in depth; `evaluate` already checks it on the
/// unmodified original before this ever runs.
fn unwrap_one(fragment: &CommandFragment) -> Option<CommandFragment> {
    let wrapper = fragment.basename();
    let mut args = fragment.args.iter().peekable();

    match wrapper {
        "env" => {
            while let Some(arg) = args.peek() {
                if arg.contains('=') && !arg.starts_with('-') {
                    args.next();
                } else if arg.starts_with('-') {
                    args.next();
                } else {
                    break;
                }
            }
        }
        "nice" => {
            while let Some(arg) = args.peek() {
                if arg.starts_with('-') {
                    args.next();
                    if matches!(arg.as_str(), "-n") {
                        args.next(); // consume the niceness value
                    }
                } else {
                    break;
                }
            }
        }
        "time" | "command" | "nohup" => {
            while let Some(arg) = args.peek() {
                if arg.starts_with('-') {
                    args.next();
                } else {
                    break;
                }
            }
        }
        _ => return None,
    }

    let remaining: Vec<String> = args.cloned().collect();
    let (head, rest) = remaining.split_first()?;
    let mut inner = CommandFragment::new(head.clone(), rest.to_vec());
    inner.has_output_redirect = fragment.has_output_redirect;
    Some(inner)
}

/// Find the subcommand token, skipping leading flags. `git` gets its own
/// rule set because several of its global flags consume a following value
/// (`-C /repo`, `--git-dir=...`); every other executable just skips
/// contiguous leading `-`-prefixed tokens.
fn extract_subcommand<'a>(executable: &str, args: &'a [String]) -> Option<&'a str> {
    let mut i = 0;
    if executable == "git" {
        while i < args.len() && args[i].starts_with('-') {
            if GIT_VALUE_FLAGS.contains(&args[i].as_str()) {
                i += 2;
            } else {
                i += 1;
            }
        }
    } else {
        while i < args.len() && args[i].starts_with('-') {
            i += 1;
        }
    }
    args.get(i).map(|s| s.as_str())
}
