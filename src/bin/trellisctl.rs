use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use serde_json::Value;

use trellis::MutationResponse;
use trellis::{cli_utils, http_utils};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "Base URL of the trellis server")]
    base_url: String,
    #[arrrg(optional, "Comma-separated active roles")]
    roles: Option<String>,
    #[arrrg(optional, "Request type for writes: promise or feedback")]
    request_type: Option<String>,
    #[arrrg(optional, "Maximum expansion depth for reads")]
    depth: Option<u32>,
    #[arrrg(flag, "Leave out _id_, _label_, _path_ and _view_")]
    bare: bool,
}

const USAGE: &str = r#"Usage: trellisctl [options] <command> <concept> <id> [path] [json]

Options:
  --base-url <url>          Base URL of the trellis server (default: http://localhost:8080)
  --roles <r1,r2>           Comma-separated active roles
  --request-type <type>     promise (default) or feedback
  --depth <n>               Maximum expansion depth for reads
  --bare                    Leave out metadata in reads

Commands:
  get <concept> <id> [path]              Read a resource or list
  put <concept> <id> <path> <json>       Replace list content or resource fields
  patch <concept> <id> [path] <json>     Apply a patch document
  post <concept> <id> <path> [json]      Create a new target in a list
  delete <concept> <id> <path>           Delete or unlink the resource at path"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) =
        Options::from_command_line_relaxed("USAGE: trellisctl <command> <concept> <id> [path] [json]");

    if free.len() < 3 {
        cli_utils::exit_with_usage_error("Expected a command, a concept and an id", USAGE);
    }

    let base_url = if options.base_url.is_empty() {
        "http://localhost:8080".to_string()
    } else {
        options.base_url.clone()
    };
    let roles: Vec<String> = options
        .roles
        .as_deref()
        .map(|r| r.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();
    let client = http_utils::TrellisClient::new(base_url).with_roles(roles);

    let depth = options.depth.map(|d| d.to_string());
    let mut read_query: Vec<(&str, &str)> = Vec::new();
    if let Some(depth) = &depth {
        read_query.push(("depth", depth.as_str()));
    }
    if options.bare {
        read_query.push(("metaData", "false"));
        read_query.push(("navIfc", "false"));
    }
    let mut write_query: Vec<(&str, &str)> = read_query.clone();
    if let Some(request_type) = &options.request_type {
        write_query.push(("requestType", request_type.as_str()));
    }

    let (command, concept, id) = (free[0].as_str(), free[1].as_str(), free[2].as_str());
    let rest = &free[3..];

    match command {
        "get" => {
            let path = rest.first().map(String::as_str).unwrap_or("");
            let content: Value = http_utils::execute_or_exit(
                || client.get(concept, id, path, &read_query),
                "Failed to get resource",
            )
            .await;
            cli_utils::print_json_or_exit(&content, "resource");
        }
        "put" => {
            let (path, body) = path_and_body(rest, true);
            let response: MutationResponse = http_utils::execute_or_exit(
                || client.put(concept, id, path, &body, &write_query),
                "Failed to put resource",
            )
            .await;
            cli_utils::print_mutation(&response);
        }
        "patch" => {
            let (path, body) = path_and_body(rest, true);
            let response: MutationResponse = http_utils::execute_or_exit(
                || client.patch(concept, id, path, &body, &write_query),
                "Failed to patch resource",
            )
            .await;
            cli_utils::print_mutation(&response);
        }
        "post" => {
            let (path, body) = path_and_body(rest, false);
            if path.is_empty() {
                cli_utils::exit_with_usage_error("post needs a path", USAGE);
            }
            let response: MutationResponse = http_utils::execute_or_exit(
                || client.post(concept, id, path, &body, &write_query),
                "Failed to create resource",
            )
            .await;
            cli_utils::print_mutation(&response);
        }
        "delete" => {
            let path = match rest.first() {
                Some(path) => path.as_str(),
                None => cli_utils::exit_with_usage_error("delete needs a path", USAGE),
            };
            let response: MutationResponse = http_utils::execute_or_exit(
                || client.delete(concept, id, path, &write_query),
                "Failed to delete resource",
            )
            .await;
            cli_utils::print_mutation(&response);
        }
        _ => {
            cli_utils::exit_with_error(&format!(
                "Unknown command '{}'. Available commands: get, put, patch, post, delete",
                command
            ));
        }
    }

    Ok(())
}

/// Splits `[path] [json]`; the JSON is always the last argument.
fn path_and_body(rest: &[String], body_required: bool) -> (&str, Value) {
    match rest {
        [] if body_required => cli_utils::exit_with_usage_error("Missing JSON argument", USAGE),
        [] => ("", Value::Object(Default::default())),
        [only] if body_required => ("", cli_utils::parse_json_or_exit(only, "body")),
        [only] => (only.as_str(), Value::Object(Default::default())),
        [path, body, ..] => (path.as_str(), cli_utils::parse_json_or_exit(body, "body")),
    }
}
