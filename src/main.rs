//! LLDB MCP Server — Main Entry Point

use clap::Parser;
use tracing::{info, error};
use rmcp::{ServiceExt, transport::stdio};

use lldb_mcp::logging::init_logging;
use lldb_mcp::{Args, Config, LldbToolHandler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    info!("Starting LLDB MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(&args);
    info!("Forwarding commands to {}:{}", config.host, config.port);

    let service = LldbToolHandler::new(config)
        .serve(stdio()).await.inspect_err(|e| {
            error!("Serving error: {:?}", e);
        })?;

    service.waiting().await?;
    Ok(())
}
