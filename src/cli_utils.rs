use std::process;

use serde_json::Value;

use crate::api::MutationResponse;

/// Exits the program with an error message
pub fn exit_with_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Exits the program with an error message and usage information
pub fn exit_with_usage_error(message: &str, usage: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!("{}", usage);
    process::exit(1);
}

/// Parses a JSON command-line argument or exits with error
pub fn parse_json_or_exit(arg: &str, context: &str) -> Value {
    match serde_json::from_str(arg) {
        Ok(value) => value,
        Err(e) => exit_with_error(&format!("Invalid {} JSON: {}", context, e)),
    }
}

/// Prints a formatted JSON value or exits with error
pub fn print_json_or_exit<T>(value: &T, context: &str)
where
    T: serde::Serialize,
{
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => exit_with_error(&format!("Failed to format {} JSON: {}", context, e)),
    }
}

/// Prints the content of a write followed by its notifications on stderr.
pub fn print_mutation(response: &MutationResponse) {
    if let Some(content) = &response.content {
        print_json_or_exit(content, "content");
    }
    for success in &response.notifications.successes {
        eprintln!("ok: {}", success);
    }
    for violation in &response.notifications.invariants {
        eprintln!("violated {}: {}", violation.rule, violation.message);
    }
    if !response.invariant_rules_hold {
        eprintln!("invariant rules do not hold; {} rolled back", response.request_type);
    }
}
