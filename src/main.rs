//! Headless entry point: refresh the directory once and print it.

use std::sync::Arc;
use std::time::Duration;

use xaiflow::api::{HttpBackend, LogNavigator, MemorySession, MlBackend, Session};
use xaiflow::workflow::WorkbenchController;
use xaiflow::{config, logging};

const TOKEN_ENV: &str = "XAIFLOW_TOKEN";
const REFRESH_WAIT: Duration = Duration::from_secs(60);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_or_default()?;
    if let Err(err) = logging::init(config.log_filter.as_deref()) {
        eprintln!("Logging disabled: {err}");
    }
    tracing::info!(api = %config.api_base_url, "Starting xaiflow");

    let session: Arc<dyn Session> = Arc::new(MemorySession::new(std::env::var(TOKEN_ENV).ok()));
    let backend: Arc<dyn MlBackend> = Arc::new(HttpBackend::new(
        &config,
        Arc::clone(&session),
        Arc::new(LogNavigator),
    )?);
    let mut controller = WorkbenchController::new(backend, session, &config);

    controller.refresh();
    if !controller.wait_until_idle(REFRESH_WAIT) {
        return Err("Timed out waiting for the backend".into());
    }
    if controller.session_ended() {
        return Err(format!("Not authenticated; set {TOKEN_ENV} to a valid access token").into());
    }
    if let Some(err) = controller.directory().last_error() {
        return Err(err.to_string().into());
    }

    println!("Datasets:");
    for dataset in controller.directory().datasets() {
        let rows = dataset
            .row_count
            .map_or_else(|| "?".to_string(), |rows| rows.to_string());
        println!(
            "  [{}] {} ({} rows, {} columns)",
            dataset.id,
            dataset.file_name,
            rows,
            dataset.headers.len()
        );
    }
    println!("Models:");
    for model in controller.directory().models() {
        println!(
            "  [{}] {} {} -> {} (accuracy {})",
            model.id,
            model.model_name,
            model.model_type,
            model.target_variable,
            model.accuracy_label()
        );
    }
    Ok(())
}
