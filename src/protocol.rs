//! Wire types for the hook's stdin/stdout JSON protocol.
//!
//! One JSON document in, one JSON document (or nothing) out, exit code
//! always 0. The two recognized `hook_event_name` values produce
//! differently-shaped approval output; fall-through is always empty
//! stdout regardless of event shape.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::HookError;
use crate::fragment::HookDecision;

const EVENT_PRE_TOOL_USE: &str = "PreToolUse";
const EVENT_PERMISSION_REQUEST: &str = "PermissionRequest";

#[derive(Debug, Deserialize)]
pub struct HookInput {
    pub hook_event_name: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Option<ToolInput>,
    #[serde(flatten)]
    pub _extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(flatten)]
    pub _extra: Map<String, Value>,
}

impl HookInput {
    /// Parse the raw stdin bytes and pull out the bash command string,
    /// rejecting anything that isn't a `Bash` tool call up front.
    pub fn parse_command(raw: &str) -> Result<(HookInput, String), HookError> {
        let input: HookInput = serde_json::from_str(raw)?;
        if input.tool_name != "Bash" {
            return Err(HookError::NotBashTool);
        }
        let command = input
            .tool_input
            .as_ref()
            .and_then(|t| t.command.clone())
            .ok_or(HookError::NotBashTool)?;
        Ok((input, command))
    }

    pub fn is_permission_request(&self) -> bool {
        self.hook_event_name == EVENT_PERMISSION_REQUEST
    }

    pub fn is_pre_tool_use(&self) -> bool {
        self.hook_event_name == EVENT_PRE_TOOL_USE
    }
}

/// Build the stdout payload for a given decision and input event shape.
/// `Fallthrough` is always `None` — empty stdout, exit 0.
pub fn render_decision(input: &HookInput, decision: HookDecision) -> Option<String> {
    match decision {
        HookDecision::Fallthrough => None,
        HookDecision::Approve => {
            if input.is_permission_request() {
                Some(render_permission_request_approval())
            } else {
                Some(render_pre_tool_use_approval())
            }
        }
    }
}

fn render_pre_tool_use_approval() -> String {
    let payload = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": "allow",
            "permissionDecisionReason": "read-only command auto-approved by readonly-bash-hook",
        }
    });
    payload.to_string()
}

fn render_permission_request_approval() -> String {
    let payload = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "PermissionRequest",
            "decision": {
                "behavior": "allow",
            },
        }
    });
    payload.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(event: &str, command: &str) -> String {
        format!(
            r#"{{"hook_event_name":"{event}","tool_name":"Bash","tool_input":{{"command":"{command}"}}}}"#
        )
    }

    #[test]
    fn parses_pre_tool_use_command() {
        let raw = input("PreToolUse", "ls -la");
        let (parsed, command) = HookInput::parse_command(&raw).unwrap();
        assert_eq!(command, "ls -la");
        assert!(parsed.is_pre_tool_use());
    }

    #[test]
    fn rejects_non_bash_tool() {
        let raw = r#"{"hook_event_name":"PreToolUse","tool_name":"Read","tool_input":{}}"#;
        let err = HookInput::parse_command(raw).unwrap_err();
        assert!(matches!(err, HookError::NotBashTool));
    }

    #[test]
    fn missing_command_is_not_bash_tool() {
        let raw = r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{}}"#;
        let err = HookInput::parse_command(raw).unwrap_err();
        assert!(matches!(err, HookError::NotBashTool));
    }

    #[test]
    fn fallthrough_never_emits_output() {
        let raw = input("PreToolUse", "rm -rf /");
        let (parsed, _) = HookInput::parse_command(&raw).unwrap();
        assert_eq!(render_decision(&parsed, HookDecision::Fallthrough), None);
    }

    #[test]
    fn approve_shape_differs_by_event() {
        let pre = input("PreToolUse", "ls");
        let (pre_input, _) = HookInput::parse_command(&pre).unwrap();
        let pre_out = render_decision(&pre_input, HookDecision::Approve).unwrap();
        assert!(pre_out.contains("permissionDecision"));

        let perm = input("PermissionRequest", "ls");
        let (perm_input, _) = HookInput::parse_command(&perm).unwrap();
        let perm_out = render_decision(&perm_input, HookDecision::Approve).unwrap();
        assert!(perm_out.contains("\"decision\":{\"behavior\":\"allow\"}"));
    }

    #[test]
    fn permission_request_approval_matches_documented_shape() {
        let raw = input("PermissionRequest", "ls");
        let (parsed, _) = HookInput::parse_command(&raw).unwrap();
        let out = render_decision(&parsed, HookDecision::Approve).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "hookSpecificOutput": {
                    "hookEventName": "PermissionRequest",
                    "decision": { "behavior": "allow" }
                }
            })
        );
    }
}
