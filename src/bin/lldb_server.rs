//! LLDB bridge server — hosts an lldb process behind the TCP line protocol

use clap::Parser;
use tracing::{info, error};

use lldb_mcp::interpreter::LldbProcess;
use lldb_mcp::logging::init_logging;
use lldb_mcp::{BridgeServer, ServerArgs, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    info!("Starting LLDB bridge server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_args(&args);
    let lldb_path = config.find_lldb()?;
    let interpreter = LldbProcess::spawn(&lldb_path).await?;

    let server = BridgeServer::bind(&config, Box::new(interpreter)).await.inspect_err(|e| {
        error!("Startup failed: {}", e);
    })?;

    let addr = server.local_addr()?;
    info!("Bridge server listening on {}", addr);
    info!("Send LLDB commands by connecting, e.g.: echo 'thread list' | nc {} {}", addr.ip(), addr.port());
    if config.exclusive {
        info!("Exclusive mode: one client at a time");
    }

    server.serve().await;
    Ok(())
}
