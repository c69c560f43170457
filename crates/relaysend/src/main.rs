//! `relaysend` - send one email through an authenticated SMTP relay
//!
//! Settings come from `RELAYSEND_*` environment variables; see [`config`].

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaysend=info,relaysend_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => {
            println!("Email sent successfully!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    info!(
        host = %config.session.host,
        port = config.session.port,
        to = config.message.to(),
        "sending"
    );
    relaysend_smtp::send(&config.session, &config.credentials, &config.message).await?;
    Ok(())
}
