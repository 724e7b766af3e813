use clap::Parser;
use log::{error, info};
use server::config::{SeedProfile, ServerConfig};
use server::network::Server;
use server::profile::{MemoryProfileStore, ProfileStore, DEFAULT_AVATAR};
use std::sync::Arc;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Maximum number of concurrent connections
    #[clap(long, default_value = "512")]
    max_connections: usize,
    /// Number of entries kept on the season leaderboard
    #[clap(long, default_value = "10")]
    leaderboard_size: usize,
    /// Seconds between leaderboard recomputations
    #[clap(long, default_value = "300")]
    leaderboard_refresh_secs: u64,
    /// Lifetime of a thrown item in milliseconds
    #[clap(long, default_value = "3000")]
    throwable_ttl_ms: u64,
    /// Events queued for a slow client before it is disconnected
    #[clap(long, default_value = "256")]
    outbound_queue: usize,
    /// Reject display names already held by another profile
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    display_name_check: bool,
    /// Development profile as uid:token:display name (repeatable)
    #[clap(long = "seed-profile")]
    seed_profiles: Vec<SeedProfile>,
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            max_connections: self.max_connections,
            throwable_ttl: Duration::from_millis(self.throwable_ttl_ms),
            leaderboard_size: self.leaderboard_size,
            leaderboard_refresh: Duration::from_secs(self.leaderboard_refresh_secs.max(1)),
            outbound_queue: self.outbound_queue.max(1),
            ..ServerConfig::default()
        }
    }
}

fn seed_store(args: &Args) -> Result<MemoryProfileStore, Box<dyn std::error::Error>> {
    let store = MemoryProfileStore::new();
    store.set_display_name_check(args.display_name_check);
    if !args.display_name_check {
        info!("Display name conflict checks disabled");
    }
    for seed in &args.seed_profiles {
        store.create_profile(&seed.uid, &seed.display_name, DEFAULT_AVATAR)?;
        store.issue_token(&seed.token, &seed.uid)?;
        info!("Seeded profile {} ({})", seed.display_name, seed.uid);
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let store = Arc::new(seed_store(&args)?);
    let server = Server::bind(args.config(), store).await?;
    let handle = server.handle();

    let mut server_task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    // Handle shutdown gracefully
    tokio::select! {
        result = &mut server_task => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
            if let Err(e) = server_task.await {
                error!("Server task panicked: {}", e);
            }
        }
    }

    Ok(())
}
