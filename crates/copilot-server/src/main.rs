//! Trading copilot HTTP server
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! PORT=3000 UPLOADS_DIR=uploads/images copilot-server
//! ```

use copilot_graph::ChatService;
use copilot_server::{ApiState, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = copilot_utils::Config::from_env();
    copilot_utils::init_tracing_with(&app);

    let config = ServerConfig::from_env()?;
    info!(
        app = %app.app_name,
        environment = %app.environment,
        port = config.port,
        uploads_dir = %config.uploads_dir.display(),
        "Starting copilot server"
    );

    let service = ChatService::from_env()?;
    copilot_server::serve(ApiState::new(service, config.uploads_dir.clone()), config.bind_addr()).await
}
