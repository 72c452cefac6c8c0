//! Shell-AST parsing: pre-parse textual rewrites for tree-sitter-bash's
//! known grammar gaps, then a recursive walk over the parsed tree that
//! extracts [`CommandFragment`]s.
//!
//! The walk is conservative by construction: any node kind it doesn't
//! recognize, or any `ERROR`/`MISSING` node tree-sitter itself produces,
//! forces [`ParseOutcome::Unsupported`] rather than a best-effort guess.
//! The orchestrator treats that identically to a hard parse error —
//! fall through, never approve.

mod rewrite;

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::{Node, Parser, TreeCursor};

use crate::fragment::CommandFragment;

pub enum ParseOutcome {
    Fragments(Vec<CommandFragment>),
    Unsupported(String),
}

/// Parse `source` into a flat list of fragments, in the order their
/// commands would execute left-to-right (good enough for the AND-reduction
/// the orchestrator performs; no fragment's verdict depends on order).
pub fn parse(source: &str) -> ParseOutcome {
    let rewritten = rewrite::apply(source);

    let mut parser = Parser::new();
    if parser
        .set_language(&tree_sitter_bash::LANGUAGE.into())
        .is_err()
    {
        return ParseOutcome::Unsupported("failed to load bash grammar".to_string());
    }

    let Some(tree) = parser.parse(&rewritten, None) else {
        return ParseOutcome::Unsupported("tree-sitter produced no tree".to_string());
    };

    let root = tree.root_node();
    if root.has_error() {
        return ParseOutcome::Unsupported("syntax error in command".to_string());
    }

    let mut fragments = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if let Err(msg) = walk(child, rewritten.as_bytes(), false, &mut fragments) {
            return ParseOutcome::Unsupported(msg);
        }
    }

    ParseOutcome::Fragments(fragments)
}

/// Recursively walk `node`, appending any commands found to `fragments`.
/// `inherited_redirect` is set when an ancestor `redirected_statement`
/// attached an output redirect to a compound body; it propagates down to
/// every command produced underneath.
fn walk(
    node: Node,
    src: &[u8],
    inherited_redirect: bool,
    fragments: &mut Vec<CommandFragment>,
) -> Result<(), String> {
    match node.kind() {
        "program" | "list" | "pipeline" | "subshell" | "compound_statement" | "do_group"
        | "then_clause" | "else_clause" | "elif_clause" | "negated_command" | "case_item" => {
            recurse_children(node, src, inherited_redirect, fragments)
        }

        "if_statement" | "for_statement" | "c_style_for_statement" | "while_statement"
        | "case_statement" | "function_definition" => {
            recurse_children(node, src, inherited_redirect, fragments)
        }

        "redirected_statement" => {
            let mut redirect = inherited_redirect;
            if let Some(cursor_redirect) = node.child_by_field_name("redirect") {
                redirect = redirect || redirect_is_output(cursor_redirect, src);
            }
            if let Some(body) = node.child_by_field_name("body") {
                walk(body, src, redirect, fragments)?;
            }
            Ok(())
        }

        "variable_assignment" => {
            if let Some(value) = node.child_by_field_name("value") {
                walk_for_substitutions(value, src, fragments)?;
            }
            Ok(())
        }

        "command" => {
            let fragment = build_fragment(node, src, inherited_redirect)?;
            fragments.push(fragment);
            let enclosing_idx = fragments.len() - 1;
            // A command's own arguments may embed further substitutions
            // (`cat "$(hostname)"`); walk them for nested commands too.
            let mut cursor = node.walk();
            for arg in node.children_by_field_name("argument", &mut cursor) {
                walk_for_substitutions(arg, src, fragments, enclosing_idx)?;
            }
            Ok(())
        }

        "command_substitution" => recurse_children(node, src, false, fragments),

        // Reached only if a process substitution somehow shows up outside
        // an argument position; without an enclosing command to attribute
        // the redirect to, just walk its body normally.
        "process_substitution" => recurse_children(node, src, false, fragments),

        "comment" | "heredoc_start" | "heredoc_body" | "word" | "string" | "string_content"
        | "raw_string" | "number" | "concatenation" | "simple_expansion" | "expansion"
        | "command_name" | "file_descriptor" => Ok(()),

        "ERROR" | "MISSING" => Err(format!("unsupported shell construct: {}", node.kind())),

        other => Err(format!("unrecognized node kind: {other}")),
    }
}

fn recurse_children(
    node: Node,
    src: &[u8],
    inherited_redirect: bool,
    fragments: &mut Vec<CommandFragment>,
) -> Result<(), String> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, src, inherited_redirect, fragments)?;
    }
    Ok(())
}

/// Look inside a word/string/concatenation for embedded
/// `command_substitution`/`process_substitution` nodes without treating
/// the token itself as a command.
///
/// `enclosing_idx` identifies the fragment of the command these arguments
/// belong to. A `>(...)` output process substitution (`diff a >(tee log)`)
/// doesn't execute `diff`'s output through `tee` directly, but it does mean
/// `diff` is handed a write target — so the *enclosing* fragment gets
/// `has_output_redirect = true`, not the inner `tee` command, which is
/// walked and classified completely on its own.
fn walk_for_substitutions(
    node: Node,
    src: &[u8],
    fragments: &mut Vec<CommandFragment>,
    enclosing_idx: usize,
) -> Result<(), String> {
    match node.kind() {
        "command_substitution" => return walk(node, src, false, fragments),
        "process_substitution" => {
            let text = node.utf8_text(src).unwrap_or("");
            if text.trim_start().starts_with(">(") {
                fragments[enclosing_idx].has_output_redirect = true;
            }
            return recurse_children(node, src, false, fragments);
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_for_substitutions(child, src, fragments, enclosing_idx)?;
    }
    Ok(())
}

fn build_fragment(
    node: Node,
    src: &[u8],
    inherited_redirect: bool,
) -> Result<CommandFragment, String> {
    let name_node = node
        .child_by_field_name("name")
        .ok_or_else(|| "command with no name".to_string())?;
    let executable = name_node
        .utf8_text(src)
        .map_err(|e| e.to_string())?
        .to_string();

    let mut cursor = node.walk();
    let args: Vec<String> = node
        .children_by_field_name("argument", &mut cursor)
        .filter_map(|n| n.utf8_text(src).ok().map(str::to_string))
        .collect();

    let mut has_output_redirect = inherited_redirect;
    let mut redirect_cursor = node.walk();
    for redirect in node.children_by_field_name("redirect", &mut redirect_cursor) {
        if redirect_is_output(redirect, src) {
            has_output_redirect = true;
        }
    }

    let mut fragment = CommandFragment::new(executable, args);
    fragment.has_output_redirect = has_output_redirect;
    Ok(fragment)
}

static OUTPUT_OPERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r">{1,2}\|?").unwrap());

/// A redirect node counts as "output" if it isn't purely a heredoc/
/// herestring (those are always input) and its text contains a `>`
/// operator token. Good enough without re-deriving the grammar's operator
/// field structure; the pipeline only needs a boolean, not which fd.
fn redirect_is_output(node: Node, src: &[u8]) -> bool {
    match node.kind() {
        "heredoc_redirect" | "herestring_redirect" => false,
        _ => {
            let text = node.utf8_text(src).unwrap_or("");
            OUTPUT_OPERATOR.is_match(text)
        }
    }
}
