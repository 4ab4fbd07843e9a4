//! Client-side workflow for training, inspecting and querying explainable ML models.
/// Backend client: wire types, failures, message resolution and HTTP transport.
pub mod api;
/// Per-user application directories.
pub mod app_dirs;
/// Client configuration stored as TOML.
pub mod config;
pub(crate) mod http_client;
/// File logging setup.
pub mod logging;
/// Workflow controller and its components.
pub mod workflow;
