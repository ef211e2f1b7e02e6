use std::sync::Arc;

use depth_profiler::api::{BinanceMarketClient, MarketDataSource};
use depth_profiler::config::AppConfig;
use depth_profiler::logging::{cleanup_old_logs, init_dual_logging, log_system_info};
use depth_profiler::volume_profile::{ProfileActor, ProfileAsk, ProfileReply, ProfileTell};
use kameo::actor::ActorRef;
use kameo::request::MessageSend;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

const SUMMARY_INTERVAL_SECONDS: u64 = 30;

#[tokio::main]
async fn main() {
    let config_path = AppConfig::resolve_path();
    let config = match AppConfig::from_toml(&config_path) {
        Ok(config) => {
            println!("✅ Loaded configuration from {}", config_path.display());
            config
        }
        Err(e) => {
            println!("⚠️ Failed to load {}: {}. Using default configuration", config_path.display(), e);
            AppConfig::default()
        }
    };

    let _logging_guard = match init_dual_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("❌ Failed to initialize logging system: {}", e);
            tracing_subscriber::fmt()
                .with_env_filter("info,depth_profiler=info")
                .init();
            error!("⚠️ Using fallback console-only logging due to error: {}", e);
            None
        }
    };

    if let Err(e) = cleanup_old_logs(&config.logging.log_dir, config.logging.cleanup_days) {
        warn!("⚠️ Failed to clean up old log files: {}", e);
    }

    log_system_info();
    info!(
        symbols = ?config.application.symbols,
        base_url = %config.application.base_url,
        depth_limit = config.application.depth_limit,
        refresh_interval_seconds = config.application.refresh_interval_seconds,
        value_area_percentage = config.volume_profile.value_area_percentage,
        log_dir = %config.logging.log_dir,
        "🔧 Configuration loaded"
    );

    if let Err(e) = run(config).await {
        error!("💥 Depth profiler failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !config.volume_profile.enabled {
        info!("Volume profile calculation disabled, nothing to do");
        return Ok(());
    }

    let source: Arc<dyn MarketDataSource> = Arc::new(BinanceMarketClient::new(config.application.base_url.clone())?);
    let settings = config.application.refresh_settings();

    let actors: Vec<ActorRef<ProfileActor>> = config
        .application
        .symbols
        .iter()
        .map(|symbol| {
            let actor = ProfileActor::new(symbol.clone(), config.volume_profile.clone(), settings.clone(), source.clone());
            kameo::spawn(actor)
        })
        .collect();
    info!("🚀 Started {} profile actors", actors.len());

    // Without the periodic task nothing else would trigger a first computation
    if settings.refresh_interval.is_none() {
        for actor_ref in &actors {
            if let Err(e) = actor_ref.tell(ProfileTell::Refresh).send().await {
                error!("❌ Failed to request initial refresh: {}", e);
            }
        }
    }

    let mut summary_interval = interval(Duration::from_secs(SUMMARY_INTERVAL_SECONDS));
    loop {
        tokio::select! {
            _ = summary_interval.tick() => {
                for actor_ref in &actors {
                    log_profile_summary(actor_ref).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Ctrl-C received, shutting down");
                break;
            }
        }
    }

    drop(actors);
    info!("🏁 Graceful shutdown completed");
    Ok(())
}

async fn log_profile_summary(actor_ref: &ActorRef<ProfileActor>) {
    match actor_ref.ask(ProfileAsk::GetProfile).send().await {
        Ok(ProfileReply::Profile(Some(snapshot))) => {
            let profile = snapshot.profile();
            info!(
                symbol = %profile.symbol,
                source = snapshot.source_label(),
                levels = profile.levels.len(),
                poc = profile.poc,
                vah = profile.vah,
                val = profile.val,
                total_volume = profile.total_volume,
                hvn = profile.hvn_levels.len(),
                lvn = profile.lvn_levels.len(),
                "📊 Volume profile"
            );
        }
        Ok(ProfileReply::Profile(None)) => info!("No profile computed yet"),
        Ok(other) => warn!("Unexpected reply: {:?}", other),
        Err(e) => error!("❌ Failed to query profile actor: {}", e),
    }
}
