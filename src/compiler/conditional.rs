//! Conditional compilation over a file's lines
//!
//! The state is a single scalar: there is no stack, so an inner `@endif`
//! closes an outer block as well.

use crate::compiler::expression;
use crate::core::SourceFile;
use crate::error::{CompilerError, Result};
use crate::ConfigMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConditionState {
    /// Outside any conditional block.
    None,
    Active,
    Inactive,
}

/// Evaluate the file's `@if`/`@elseif`/`@else`/`@endif` directives against
/// `config` and delete every line that falls inside a false branch.
pub fn apply_conditionals(file: &mut SourceFile, config: &ConfigMap) -> Result<()> {
    let has_conditionals = ["if", "elseif", "else", "endif"]
        .iter()
        .any(|keyword| file.has_directive(keyword));
    if !has_conditionals {
        return Ok(());
    }

    let mut state = ConditionState::None;
    let mut doomed = BTreeSet::new();

    for number in 1..=file.lines.len() {
        let Some(directive) = file.directive_at(number) else {
            if state == ConditionState::Inactive {
                doomed.insert(number);
            }
            continue;
        };

        state = match directive.keyword.as_str() {
            "if" | "elseif" => {
                let source = directive.args.raw();
                let passed = expression::evaluate(&source, config)
                    .map_err(|message| CompilerError::condition(&file.path, number, message))?;
                log::trace!("{}:{} @{} {} -> {}", file.path, number, directive.keyword, source, passed);
                if passed {
                    ConditionState::Active
                } else {
                    ConditionState::Inactive
                }
            }
            "else" => match state {
                ConditionState::Active => ConditionState::Inactive,
                _ => ConditionState::Active,
            },
            "endif" => ConditionState::None,
            _ => {
                if state == ConditionState::Inactive {
                    doomed.insert(number);
                }
                state
            }
        };
    }

    if !doomed.is_empty() {
        log::debug!("{}: dropping {} lines in false branches", file.path, doomed.len());
    }
    file.remove_lines(&doomed);
    Ok(())
}
