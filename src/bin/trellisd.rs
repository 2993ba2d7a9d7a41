use std::path::PathBuf;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tokio::net::TcpListener;
use tokio::signal;

use trellis::{AppState, ServerConfig, create_resource_router, logging};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Path to the YAML configuration file")]
    config: Option<String>,
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const HELP_TEXT: &str = r#"trellisd - interface-driven resource server

USAGE:
    trellisd [OPTIONS]

OPTIONS:
    --config <PATH>      YAML configuration file [default: built-in defaults]
    --host <HOST>        Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>        Port to bind the HTTP server [default: 8080]
    --verbose            Enable verbose logging

DESCRIPTION:
    Loads the model, interfaces and population named by the configuration and
    serves them under /resource. RUST_LOG overrides the log level.

API ENDPOINTS:
    GET    /resource                          List concept names
    GET    /resource/{concept}                List atoms of a concept
    GET    /resource/{concept}/{id}           Get the entry resource
    PATCH  /resource/{concept}/{id}           Patch the entry resource
    GET    /resource/{concept}/{id}/{path}    Get the resource or list at path
    PUT    /resource/{concept}/{id}/{path}    Replace content at path
    PATCH  /resource/{concept}/{id}/{path}    Patch the resource at path
    POST   /resource/{concept}/{id}/{path}    Create a target in the list at path
    DELETE /resource/{concept}/{id}/{path}    Delete the resource at path"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line("USAGE: trellisd [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    logging::setup_logging(args.verbose);

    let config_path = args.config.as_ref().map(PathBuf::from);
    let config = ServerConfig::load_or_default(config_path.as_deref())
        .map_err(|e| format!("Failed to load configuration: {}", e))?
        .with_overrides(args.host.clone(), args.port);

    let state = AppState::from_config(&config)
        .map_err(|e| format!("Failed to load model: {}", e))?;
    tracing::info!(
        concepts = state.model().concept_names().len(),
        interfaces = state.model().interfaces().len(),
        "model loaded"
    );

    let app = create_resource_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;
    tracing::info!(address = %addr, "trellisd listening");

    let shutdown_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        () = shutdown_signal => {
            tracing::info!("shutdown signal received, stopping");
        }
    }

    Ok(())
}
