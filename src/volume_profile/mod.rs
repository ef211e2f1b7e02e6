/// Volume Profile Module
///
/// Buckets order-book or trade notional into a fixed window around a
/// reference price and derives the Point of Control, Value Area and
/// high/low volume nodes. The actor keeps one profile per symbol fresh by
/// recomputing from full snapshots.
pub mod actor;
pub mod analysis;
pub mod calculator;
pub mod nodes;
pub mod structs;
pub mod synthetic;
pub mod validation;
pub mod value_area;

pub use actor::{ProfileActor, ProfileAsk, ProfileReply, ProfileTell, RefreshSettings};
pub use analysis::{
    CurrentNode, NodeAnalysis, NodeDirection, NodeDistance, NodeKind, ProfileAnalysis, TradingZone,
    ValueAreaAnalysis, ValueAreaPosition,
};
pub use calculator::{derive_profile, PriceWindow, VolumeProfileBuilder};
pub use nodes::{classify_nodes, VolumeNodes};
pub use structs::{
    AssetConfig, NodeThresholdMode, NodeThresholds, PriceLevel, ProfileSnapshot, ResolvedAssetConfig,
    ValueArea, ValueAreaCalculationMode, VolumeProfile, VolumeProfileConfig,
};
pub use synthetic::{default_reference_price, generate_synthetic_profile, generate_synthetic_profile_default};
pub use validation::{ProfileValidationResult, ProfileValidator};
pub use value_area::{calculate_value_area, find_poc_index};
