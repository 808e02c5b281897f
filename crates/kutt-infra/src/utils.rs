use colored::Colorize;
use kutt_infra_core::{Action, ActionType, Plan};
use std::path::Path;

/// Show which stack file was loaded
pub fn print_stack_file(stack: &str, stack_file: &Path) {
    println!("Stack: {}", stack.cyan());
    println!("📄 {}", stack_file.display().to_string().cyan());
}

fn symbol(action: &Action) -> colored::ColoredString {
    match action.action_type {
        ActionType::Create => "+".green(),
        ActionType::Update => "~".yellow(),
        ActionType::Delete => "-".red(),
        ActionType::NoOp => " ".normal(),
    }
}

/// Print a plan; unchanged resources only with `verbose`
pub fn print_plan(plan: &Plan, verbose: bool) {
    println!();
    for action in &plan.actions {
        if action.action_type == ActionType::NoOp && !verbose {
            continue;
        }
        let line = format!("{} {}", symbol(action), action.description);
        match action.action_type {
            ActionType::NoOp => println!("  {}", line.dimmed()),
            _ => println!("  {}", line),
        }
    }

    let summary = plan.summary();
    println!();
    if plan.has_changes {
        println!("{} {}", "Plan:".bold(), summary);
    } else {
        println!(
            "{} ({} resources)",
            "No changes.".green().bold(),
            summary.no_change
        );
    }
}

/// Render a JSON output value without quoting plain strings
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("brig.gs")), "brig.gs");
        assert_eq!(display_value(&json!(6379)), "6379");
        assert_eq!(display_value(&json!(["a"])), "[\"a\"]");
    }
}
