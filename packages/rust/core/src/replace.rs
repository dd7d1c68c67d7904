//! User-supplied regex replacement rules.
//!
//! Rule lists run in declaration order, each rule operating on the output of
//! the previous one. A rule whose expression does not compile is logged and
//! skipped, and the compile result is downgraded to [`ReturnCode::Warning`].

use regex::Regex;
use tracing::warn;

use docassembler_shared::{ReplacementRule, ReturnCode};

/// A compiled, ordered list of replacement rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(Regex, String)>,
}

impl RuleSet {
    /// Compile `rules`, skipping malformed expressions.
    pub fn compile(rules: &[ReplacementRule]) -> (Self, ReturnCode) {
        let mut code = ReturnCode::Normal;
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            match Regex::new(&rule.expression) {
                Ok(regex) => compiled.push((regex, rule.value.clone())),
                Err(e) => {
                    warn!(
                        expression = %rule.expression,
                        error = %e,
                        "skipping replacement rule with invalid expression"
                    );
                    code = ReturnCode::Warning;
                }
            }
        }

        (Self { rules: compiled }, code)
    }

    /// Whether there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule over `input`, in order.
    pub fn apply(&self, input: &str) -> String {
        let mut current = input.to_string();
        for (regex, value) in &self.rules {
            current = regex.replace_all(&current, value.as_str()).into_owned();
        }
        current
    }
}
