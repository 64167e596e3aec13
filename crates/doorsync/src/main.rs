mod settings;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use doorsync_api::{AccessClient, PcoClient};
use doorsync_core::{scheduler, SyncService};

use crate::settings::Settings;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "fatal");
        eprintln!("doorsync: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;

    let sync_config = settings.sync_config()?;
    let cadence = settings.cadence()?;
    let pco = PcoClient::new(settings.pco_config()?)?;
    let access = AccessClient::new(settings.access_config()?)?;

    let service = SyncService::new(sync_config, pco, access).with_telegram(settings.telegram());
    info!(
        apply = service.apply_mode(),
        zone = %service.config().display_zone,
        "doorsync starting"
    );

    let cancel = CancellationToken::new();
    let driver = scheduler::spawn(service.clone(), cadence, cancel.clone());

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    cancel.cancel();
    let _ = driver.await;

    Ok(())
}
