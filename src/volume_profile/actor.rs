use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::{ActorStopReason, BoxError};
use kameo::message::{Context, Message};
use kameo::request::MessageSend;
use kameo::{Actor, mailbox::unbounded::UnboundedMailbox};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::api::MarketDataSource;
use crate::common::constants::{DEFAULT_DEPTH_LIMIT, DEFAULT_REFRESH_INTERVAL_SECONDS, DEFAULT_TRADE_LIMIT};
use crate::market::{MarketStats, OrderBook, Trade, VolumeChangeTracker};

use super::analysis::ProfileAnalysis;
use super::calculator::VolumeProfileBuilder;
use super::structs::{ProfileSnapshot, VolumeProfile, VolumeProfileConfig};
use super::synthetic::{default_reference_price, generate_synthetic_profile_default};
use super::validation::ProfileValidator;

/// Profile Actor messages for telling
#[derive(Debug, Clone)]
pub enum ProfileTell {
    /// Re-fetch ticker and full depth snapshot, then recompute from scratch
    Refresh,
    /// Recompute from the recent trade tape
    RefreshTrades,
    /// Recompute from a supplied full snapshot
    ApplySnapshot {
        symbol: String,
        book: OrderBook,
    },
    /// Recompute from a supplied trade tape
    ApplyTrades {
        symbol: String,
        trades: Vec<Trade>,
    },
    /// Incremental book update; contents are ignored and a full refresh runs
    BookDelta {
        symbol: String,
    },
    /// Track a different symbol
    SwitchSymbol {
        symbol: String,
    },
}

/// Profile Actor messages for asking (request-response)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProfileAsk {
    GetProfile,
    GetMarketStats,
    /// Value area and node analysis relative to `current_price`
    GetAnalysis {
        current_price: f64,
    },
    GetHealthStatus,
}

/// Profile Actor responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProfileReply {
    Profile(Option<ProfileSnapshot>),
    MarketStats(Option<MarketStats>),
    Analysis(Option<ProfileAnalysis>),
    HealthStatus {
        is_healthy: bool,
        symbol: String,
        generation: u64,
        has_profile: bool,
        is_synthetic: bool,
        refresh_count: u64,
        fallback_count: u64,
        last_error: Option<String>,
    },
}

/// How the actor talks to its data source
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSettings {
    pub depth_limit: u32,
    pub trade_limit: u32,
    /// `None` disables the periodic refresh task
    pub refresh_interval: Option<Duration>,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
            trade_limit: DEFAULT_TRADE_LIMIT,
            refresh_interval: Some(Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECONDS)),
        }
    }
}

/// Keeps the volume profile of one symbol fresh
///
/// Every update replaces the profile wholesale. When the data source fails
/// a synthetic placeholder is installed instead, tagged as such.
pub struct ProfileActor {
    symbol: String,
    config: VolumeProfileConfig,
    settings: RefreshSettings,
    source: Arc<dyn MarketDataSource>,
    builder: VolumeProfileBuilder,
    snapshot: Option<ProfileSnapshot>,
    market_stats: Option<MarketStats>,
    volume_tracker: VolumeChangeTracker,
    last_price: Option<f64>,
    /// Bumped on every symbol switch
    generation: u64,
    refresh_count: u64,
    fallback_count: u64,
    last_error: Option<String>,
}

impl ProfileActor {
    pub fn new(
        symbol: impl Into<String>,
        config: VolumeProfileConfig,
        settings: RefreshSettings,
        source: Arc<dyn MarketDataSource>,
    ) -> Self {
        let symbol = symbol.into().to_uppercase();
        let builder = VolumeProfileBuilder::new(config.resolve_for_asset(&symbol));
        Self {
            symbol,
            config,
            settings,
            source,
            builder,
            snapshot: None,
            market_stats: None,
            volume_tracker: VolumeChangeTracker::new(),
            last_price: None,
            generation: 0,
            refresh_count: 0,
            fallback_count: 0,
            last_error: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn is_current(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }

    async fn refresh(&mut self) {
        let symbol = self.symbol.clone();
        self.refresh_count += 1;
        // Only failures from this round count toward health
        self.last_error = None;

        match self.source.fetch_ticker(&symbol).await {
            Ok(ticker) => {
                let stats = MarketStats::from_ticker(&ticker, &mut self.volume_tracker, Utc::now().timestamp_millis());
                if stats.current_price.is_finite() && stats.current_price > 0.0 {
                    self.last_price = Some(stats.current_price);
                }
                self.market_stats = Some(stats);
            }
            Err(e) => {
                warn!("Ticker fetch failed for {} via {}: {}", symbol, self.source.name(), e);
                self.last_error = Some(e.to_string());
            }
        }

        match self.source.fetch_depth(&symbol, self.settings.depth_limit).await {
            Ok(book) => self.apply_book(&book),
            Err(e) => {
                warn!("Depth fetch failed for {} via {}: {}", symbol, self.source.name(), e);
                self.last_error = Some(e.to_string());
                self.install_synthetic();
            }
        }
    }

    async fn refresh_trades(&mut self) {
        let symbol = self.symbol.clone();
        self.last_error = None;
        match self.source.fetch_recent_trades(&symbol, self.settings.trade_limit).await {
            Ok(trades) => self.apply_trades(&trades),
            Err(e) => {
                warn!("Trade fetch failed for {} via {}: {}", symbol, self.source.name(), e);
                self.last_error = Some(e.to_string());
                self.install_synthetic();
            }
        }
    }

    fn apply_book(&mut self, book: &OrderBook) {
        let reference_price = match book.mid_price() {
            Some(mid) => {
                self.last_price = Some(mid);
                mid
            }
            None => match self.last_price {
                Some(price) => {
                    debug!("No mid price for {}, using last known price {:.4}", self.symbol, price);
                    price
                }
                None => {
                    warn!("No mid price and no last price for {}", self.symbol);
                    self.install_synthetic();
                    return;
                }
            },
        };

        let profile = self.builder.build(&self.symbol, reference_price, &book.bids, &book.asks);
        self.install_real(profile);
    }

    fn apply_trades(&mut self, trades: &[Trade]) {
        let reference_price = self
            .last_price
            .or_else(|| trades.iter().rev().find(|t| t.is_usable()).map(|t| t.price));
        let Some(reference_price) = reference_price else {
            debug!("No reference price for {} trade profile, keeping previous", self.symbol);
            return;
        };

        let profile = self.builder.build_from_trades(&self.symbol, reference_price, trades);
        self.install_real(profile);
    }

    fn install_real(&mut self, profile: Option<VolumeProfile>) {
        let Some(profile) = profile else {
            debug!("Empty profile for {}, keeping previous", self.symbol);
            return;
        };

        let validation = ProfileValidator::validate(&profile);
        if !validation.is_valid {
            debug!("Profile for {} failed validation: {:?}", self.symbol, validation.errors);
        }

        debug!(
            "Profile for {}: {} levels, POC {:.4}, VA [{:.4}, {:.4}]",
            self.symbol,
            profile.levels.len(),
            profile.poc,
            profile.val,
            profile.vah
        );
        self.snapshot = Some(ProfileSnapshot::Real(profile));
    }

    fn install_synthetic(&mut self) {
        let center = self.last_price.unwrap_or_else(|| default_reference_price(&self.symbol));
        match generate_synthetic_profile_default(&self.symbol, center, self.builder.config()) {
            Some(profile) => {
                warn!("Using synthetic profile for {} around {:.4}", self.symbol, center);
                self.fallback_count += 1;
                self.snapshot = Some(ProfileSnapshot::Synthetic(profile));
            }
            None => error!("Failed to generate synthetic profile for {}", self.symbol),
        }
    }

    fn switch_symbol(&mut self, symbol: String) {
        let symbol = symbol.to_uppercase();
        info!("Switching profile symbol {} -> {}", self.symbol, symbol);
        self.builder = VolumeProfileBuilder::new(self.config.resolve_for_asset(&symbol));
        self.symbol = symbol;
        self.snapshot = None;
        self.market_stats = None;
        self.last_price = None;
        self.last_error = None;
        self.generation += 1;
    }

    fn get_health_status(&self) -> ProfileReply {
        ProfileReply::HealthStatus {
            is_healthy: self.last_error.is_none(),
            symbol: self.symbol.clone(),
            generation: self.generation,
            has_profile: self.snapshot.is_some(),
            is_synthetic: self.snapshot.as_ref().is_some_and(|s| s.is_synthetic()),
            refresh_count: self.refresh_count,
            fallback_count: self.fallback_count,
            last_error: self.last_error.clone(),
        }
    }
}

impl Actor for ProfileActor {
    type Mailbox = UnboundedMailbox<Self>;

    fn name() -> &'static str {
        "ProfileActor"
    }

    async fn on_start(&mut self, actor_ref: ActorRef<Self>) -> Result<(), BoxError> {
        info!("🚀 Starting Profile Actor for {}", self.symbol);
        info!("  Price range: ±{:.2}%", self.builder.config().price_range_percent * 100.0);
        info!("  Levels: {}", self.builder.config().level_count);
        info!("  Value area percentage: {:.1}%", self.builder.config().value_area_percentage);

        if let Some(period) = self.settings.refresh_interval {
            let weak_ref = actor_ref.downgrade();
            tokio::spawn(async move {
                let mut refresh_interval = tokio::time::interval(period);
                refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    refresh_interval.tick().await;
                    let Some(actor_ref) = weak_ref.upgrade() else {
                        break;
                    };
                    // Wait for the refresh to finish so a slow source never queues a backlog
                    if let Err(e) = actor_ref.ask(ProfileTell::Refresh).send().await {
                        debug!("Refresh loop stopping: {}", e);
                        break;
                    }
                }
            });
            info!("  Refresh interval: {:?}", period);
        }

        Ok(())
    }

    async fn on_stop(&mut self, _actor_ref: WeakActorRef<Self>, reason: ActorStopReason) -> Result<(), BoxError> {
        info!("🛑 Stopping Profile Actor for {}: {:?}", self.symbol, reason);
        info!("  Refreshes: {}, synthetic fallbacks: {}", self.refresh_count, self.fallback_count);
        Ok(())
    }
}

impl Message<ProfileTell> for ProfileActor {
    type Reply = ();

    async fn handle(&mut self, msg: ProfileTell, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            ProfileTell::Refresh => {
                debug!("Refreshing profile for {}", self.symbol);
                self.refresh().await;
            }
            ProfileTell::RefreshTrades => {
                debug!("Refreshing trade profile for {}", self.symbol);
                self.refresh_trades().await;
            }
            ProfileTell::ApplySnapshot { symbol, book } => {
                if self.is_current(&symbol) {
                    self.apply_book(&book);
                } else {
                    debug!("Discarding snapshot for {}: tracking {}", symbol, self.symbol);
                }
            }
            ProfileTell::ApplyTrades { symbol, trades } => {
                if self.is_current(&symbol) {
                    self.apply_trades(&trades);
                } else {
                    debug!("Discarding trades for {}: tracking {}", symbol, self.symbol);
                }
            }
            ProfileTell::BookDelta { symbol } => {
                if self.is_current(&symbol) {
                    self.refresh().await;
                }
            }
            ProfileTell::SwitchSymbol { symbol } => self.switch_symbol(symbol),
        }
    }
}

impl Message<ProfileAsk> for ProfileActor {
    type Reply = Result<ProfileReply, String>;

    async fn handle(&mut self, msg: ProfileAsk, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            ProfileAsk::GetProfile => Ok(ProfileReply::Profile(self.snapshot.clone())),
            ProfileAsk::GetMarketStats => Ok(ProfileReply::MarketStats(self.market_stats.clone())),
            ProfileAsk::GetAnalysis { current_price } => {
                if !current_price.is_finite() || current_price <= 0.0 {
                    return Err(format!("Invalid current price: {}", current_price));
                }
                let analysis = self
                    .snapshot
                    .as_ref()
                    .and_then(|snapshot| ProfileAnalysis::from_snapshot(snapshot, current_price));
                Ok(ProfileReply::Analysis(analysis))
            }
            ProfileAsk::GetHealthStatus => Ok(self.get_health_status()),
        }
    }
}
