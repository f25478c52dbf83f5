//! Structural checks on finished netlist text.
//!
//! Every failed check adds its own reason; a failed validation is a value,
//! not an error.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::GROUND_NET;
use crate::netlist::compiler::{CompiledNetlist, NetlistExpectations};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl ValidationReport {
    fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            valid: reasons.is_empty(),
            reasons,
        }
    }
}

pub struct NetlistValidator;

impl NetlistValidator {
    pub fn validate(text: &str, expectations: &NetlistExpectations) -> ValidationReport {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut reasons = Vec::new();

        let has_title = lines.iter().any(|l| is_directive(l, ".title"));
        if !has_title {
            reasons.push("missing .title directive".to_string());
        }

        match lines.iter().position(|l| is_directive(l, ".end")) {
            None => reasons.push("missing .end directive".to_string()),
            Some(pos) if pos + 1 != lines.len() => {
                reasons.push(format!(
                    ".end is followed by {} more statement(s)",
                    lines.len() - pos - 1
                ));
            }
            Some(_) => {}
        }

        let elements: Vec<Vec<&str>> = lines
            .iter()
            .filter(|l| is_element(l))
            .map(|l| l.split_whitespace().collect())
            .collect();

        if elements.is_empty() && expectations.expects_components {
            reasons.push("no component statements".to_string());
        }

        if expectations.ground_referenced {
            let ground_emitted = elements
                .iter()
                .any(|tokens| node_tokens(tokens).iter().any(|t| *t == GROUND_NET));
            if !ground_emitted {
                reasons.push(format!(
                    "ground node {} is referenced but never emitted",
                    GROUND_NET
                ));
            }
        }

        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for tokens in &elements {
            let Some(name) = tokens.first() else {
                continue;
            };
            let key = name.to_ascii_uppercase();
            if !seen.insert(key.clone()) && reported.insert(key) {
                reasons.push(format!("duplicate statement name {}", name));
            }
        }

        ValidationReport::from_reasons(reasons)
    }

    pub fn validate_compiled(netlist: &CompiledNetlist) -> ValidationReport {
        Self::validate(&netlist.render(), &netlist.expectations)
    }
}

fn is_directive(line: &str, directive: &str) -> bool {
    let head = line.split_whitespace().next().unwrap_or("");
    head.eq_ignore_ascii_case(directive)
}

/// Node fields of a tokenized element statement, by its prefix.
///
/// Values, model names and gains are excluded so a `0` value is never
/// mistaken for the ground node.
fn node_tokens<'a, 'b>(tokens: &'a [&'b str]) -> &'a [&'b str] {
    let Some((name, rest)) = tokens.split_first() else {
        return &[];
    };
    let fields = rest.len();
    let prefix = name.chars().next().map(|c| c.to_ascii_uppercase());
    let count = match prefix {
        Some('R' | 'C' | 'L' | 'V' | 'I' | 'D' | 'F' | 'H') => 2,
        Some('E' | 'G' | 'M') => 4,
        // collector, base, emitter and an optional substrate before the model
        Some('Q') => fields.saturating_sub(1).min(4),
        Some('K') => 0,
        _ => fields.saturating_sub(1),
    };
    &rest[..count.min(fields)]
}

/// Component statement: not a directive, comment or continuation line.
fn is_element(line: &str) -> bool {
    !(line.starts_with('.') || line.starts_with('*') || line.starts_with('+'))
}
