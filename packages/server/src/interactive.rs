//! Interactive mode for the server.
//!
//! Prompts the user for bind address, port and data directory before
//! starting the server.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Defaults come from the environment (see [`ServerConfig::from_env`]);
/// the answers are passed straight to [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("SoF Event Extractor Server");
    println!();

    let mut config = ServerConfig::from_env();

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or(config.bind_addr);

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(config.port);

    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(config.data_dir.display().to_string())
        .interact_text()
        .unwrap_or_else(|_| config.data_dir.display().to_string());
    config.data_dir = PathBuf::from(data_dir);

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(config).await
}
