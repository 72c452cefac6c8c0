//! The shared data model: one shell command boiled down to a
//! `CommandFragment`, and the sentinel types each stage of the pipeline
//! hands back.
//!
//! Four separate enums instead of one shared boolean-ish type: a handler
//! can never return `Fallthrough`, a pipeline step can never return a bare
//! `Approve`/`Reject` without the option to keep going, and the
//! orchestrator's final word is never confused with a per-fragment
//! verdict. Mixing these up is the kind of bug a type should make
//! unreachable rather than one more unit test should catch.

use std::collections::HashSet;

/// One command, stripped of everything the pipeline doesn't need to reason
/// about: the resolved executable name, its argument tokens, and whether it
/// carries an output-write redirect.
///
/// `args` are raw token texts as they appeared in the source, after wrapper
/// unwrapping but before any further interpretation — the pipeline steps
/// are responsible for looking inside them (e.g. for `-i` on `sed`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFragment {
    pub executable: String,
    pub args: Vec<String>,
    pub has_output_redirect: bool,
}

impl CommandFragment {
    pub fn new(executable: impl Into<String>, args: Vec<String>) -> Self {
        CommandFragment {
            executable: executable.into(),
            args,
            has_output_redirect: false,
        }
    }

    /// Basename of `executable`, stripping any leading path components
    /// (`/usr/bin/git` and `git` both classify the same way).
    pub fn basename(&self) -> &str {
        self.executable
            .rsplit('/')
            .next()
            .unwrap_or(&self.executable)
    }

    pub fn has_any_flag(&self, flags: &HashSet<&str>) -> bool {
        self.args.iter().any(|a| flags.contains(a.as_str()))
    }
}

/// What one step of the evaluation pipeline decided about a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// This step is satisfied this fragment is read-only; stop here, approve.
    Approve,
    /// This step found a reason to reject; stop here, reject.
    Reject,
    /// This step has no opinion; fall through to the next one.
    Next,
}

/// What a dangerous-mode command handler (`sed`, `find`, `xargs`, `awk`)
/// decided. Handlers never get to say "approve" outright — only whether
/// the fragment is safe enough to keep evaluating (`Pass`) or must be
/// rejected immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Reject,
    Pass,
}

/// The end-of-pipeline verdict for a single fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentVerdict {
    Approve,
    Reject,
}

/// The whole-command decision the orchestrator emits. There is no "deny"
/// here — a rejected fragment turns into `Fallthrough`, never a hard stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    Approve,
    Fallthrough,
}
