//! Interactive confirmation gate.
//!
//! Prompts on stdout and reads one line from stdin; anything but an
//! explicit yes holds the trade. A closed or failing stdin also holds;
//! an unattended terminal must never approve trades.

use std::io::{BufRead, Write};

use crate::ports::gate_port::{GateDecision, TradeContext, TradeGate};

pub struct ConfirmGate;

impl ConfirmGate {
    pub fn new() -> Self {
        ConfirmGate
    }

    fn decide_from(answer: Option<String>) -> GateDecision {
        match answer.as_deref().map(str::trim) {
            Some(a) if a.eq_ignore_ascii_case("yes") || a.eq_ignore_ascii_case("y") => {
                GateDecision::Proceed
            }
            _ => GateDecision::Hold,
        }
    }
}

impl Default for ConfirmGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeGate for ConfirmGate {
    fn name(&self) -> &str {
        "confirm"
    }

    fn review(&self, context: &TradeContext) -> GateDecision {
        print!(
            "Do you want to proceed with {} {} -> {}? (yes/no): ",
            context.action, context.from_asset, context.to_asset
        );
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        let answer = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .ok()
            .map(|_| line);
        Self::decide_from(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_variants_proceed() {
        assert_eq!(
            ConfirmGate::decide_from(Some("yes\n".into())),
            GateDecision::Proceed
        );
        assert_eq!(
            ConfirmGate::decide_from(Some("  Y  ".into())),
            GateDecision::Proceed
        );
        assert_eq!(
            ConfirmGate::decide_from(Some("YES".into())),
            GateDecision::Proceed
        );
    }

    #[test]
    fn everything_else_holds() {
        assert_eq!(
            ConfirmGate::decide_from(Some("no\n".into())),
            GateDecision::Hold
        );
        assert_eq!(
            ConfirmGate::decide_from(Some("".into())),
            GateDecision::Hold
        );
        assert_eq!(
            ConfirmGate::decide_from(Some("maybe".into())),
            GateDecision::Hold
        );
        assert_eq!(ConfirmGate::decide_from(None), GateDecision::Hold);
    }
}
