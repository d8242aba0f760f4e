use std::sync::Arc;
use supagate_core::{LogContext, init_server_logging};
use supagate_server::{AppState, GatewayConfig, Specification, SupabaseClient, router};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    if let Err(e) = init_server_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let context = LogContext::new("server_startup", "supagate-server");
    context.info("Starting Supagate server");

    let config = GatewayConfig::load_and_validate()?;
    let client = SupabaseClient::from_config(&config.supabase);
    context.info(&format!(
        "Forwarding to Supabase at {} ({} environment)",
        client.base_url(),
        config.server.env
    ));

    let state = AppState::new(Arc::new(client), Arc::new(Specification::standard()));
    let app = router(state);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Supagate server listening on http://{}", address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
