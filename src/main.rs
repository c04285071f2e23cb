use clap::{Parser, Subcommand};
use smartthings_energy_fix::{
    register_integration, setup_entry, Config, DeviceStateProvider, EntryStore,
    HomeAssistantAPI, Integration, SnapshotFileProvider, DOMAIN,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Accumulating energy sensors for SmartThings plugs stuck at energy=0")]
struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register the integration (only one instance is allowed)
    Register,
    /// Poll affected devices and publish their accumulated energy
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let arguments = Arguments::parse();
    let config = Config::from_env();
    let store = EntryStore::new(&config.entry_store_path);

    match arguments.command {
        Command::Register => {
            let entry = register_integration(&store).await?;
            println!("Registered '{}'", entry.title);
        }
        Command::Run => run(config, store).await?,
    }

    Ok(())
}

async fn run(config: Config, store: EntryStore) -> anyhow::Result<()> {
    let Some(entry) = store.entry(DOMAIN).await? else {
        anyhow::bail!(
            "integration is not registered in {}, run `register` first",
            store.path().display()
        );
    };

    let providers: Vec<Arc<dyn DeviceStateProvider>> = config
        .snapshot_paths
        .iter()
        .map(|path| Arc::new(SnapshotFileProvider::new(path)) as Arc<dyn DeviceStateProvider>)
        .collect();

    let devices = setup_entry(&entry, &providers).await;
    let ha_client = Arc::new(HomeAssistantAPI::new(&config.ha_url, &config.ha_token));
    let integration = Integration::start(devices, ha_client, config.scan_interval);

    tokio::signal::ctrl_c().await?;
    tracing::debug!("received ctrl-c, unloading");
    integration.unload().await;

    Ok(())
}
