//! Read-only derivations of a profile relative to the current market price.

use serde::{Deserialize, Serialize};

use super::structs::{ProfileSnapshot, VolumeProfile};

/// Nodes within this distance (percent of price) count as the price's own node
const CURRENT_NODE_PERCENT: f64 = 0.5;
/// Nodes within this distance (percent of price) shape the trading zone
const TRADING_ZONE_PERCENT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueAreaPosition {
    Above,
    Inside,
    Below,
}

/// Where the current price sits relative to the value area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAreaAnalysis {
    pub position: ValueAreaPosition,
    /// (vah - price) / price * 100
    pub distance_to_vah_percent: f64,
    /// (price - val) / price * 100
    pub distance_to_val_percent: f64,
    /// (price - poc) / price * 100
    pub distance_to_poc_percent: f64,
    pub width: f64,
    pub width_percent_of_poc: f64,
    /// 0-100 inside the value area, pinned to 100 above and 0 below
    pub position_in_value_area: f64,
    pub buy_pressure: f64,
}

impl ValueAreaAnalysis {
    /// Returns `None` for a non-positive or non-finite price
    pub fn from_profile(profile: &VolumeProfile, current_price: f64) -> Option<Self> {
        if !current_price.is_finite() || current_price <= 0.0 {
            return None;
        }

        let position = if current_price > profile.vah {
            ValueAreaPosition::Above
        } else if current_price < profile.val {
            ValueAreaPosition::Below
        } else {
            ValueAreaPosition::Inside
        };

        let width = profile.vah - profile.val;
        let width_percent_of_poc = if profile.poc > 0.0 { width / profile.poc * 100.0 } else { 0.0 };

        let position_in_value_area = match position {
            ValueAreaPosition::Above => 100.0,
            ValueAreaPosition::Below => 0.0,
            // Collapsed value area: price sits on it
            ValueAreaPosition::Inside if width <= 0.0 => 50.0,
            ValueAreaPosition::Inside => (current_price - profile.val) / width * 100.0,
        };

        Some(Self {
            position,
            distance_to_vah_percent: (profile.vah - current_price) / current_price * 100.0,
            distance_to_val_percent: (current_price - profile.val) / current_price * 100.0,
            distance_to_poc_percent: (current_price - profile.poc) / current_price * 100.0,
            width,
            width_percent_of_poc,
            position_in_value_area,
            buy_pressure: profile.buy_pressure(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Hvn,
    Lvn,
}

/// Side of the current price on which a node lies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrentNode {
    Hvn,
    Lvn,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingZone {
    Support,
    Resistance,
    Breakout,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDistance {
    pub kind: NodeKind,
    pub price: f64,
    pub distance: f64,
    pub distance_percent: f64,
    pub direction: NodeDirection,
}

impl NodeDistance {
    fn measure(kind: NodeKind, price: f64, current_price: f64) -> Self {
        let distance = (current_price - price).abs();
        Self {
            kind,
            price,
            distance,
            distance_percent: distance / current_price * 100.0,
            // A node at the current price is treated as overhead
            direction: if current_price > price { NodeDirection::Below } else { NodeDirection::Above },
        }
    }
}

/// HVN/LVN layout around the current price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAnalysis {
    /// Sorted by distance, nearest first
    pub hvn: Vec<NodeDistance>,
    /// Sorted by distance, nearest first
    pub lvn: Vec<NodeDistance>,
    pub current_node: CurrentNode,
    pub trading_zone: TradingZone,
}

impl NodeAnalysis {
    /// Returns `None` for a non-positive or non-finite price
    pub fn from_profile(profile: &VolumeProfile, current_price: f64) -> Option<Self> {
        if !current_price.is_finite() || current_price <= 0.0 {
            return None;
        }

        let hvn = Self::measure_all(NodeKind::Hvn, &profile.hvn_levels, current_price);
        let lvn = Self::measure_all(NodeKind::Lvn, &profile.lvn_levels, current_price);

        let nearest_hvn = hvn.first();
        let nearest_lvn = lvn.first();
        let current_node = if Self::within(nearest_hvn, CURRENT_NODE_PERCENT).is_some() {
            CurrentNode::Hvn
        } else if Self::within(nearest_lvn, CURRENT_NODE_PERCENT).is_some() {
            CurrentNode::Lvn
        } else {
            CurrentNode::Normal
        };

        let trading_zone = match Self::within(nearest_hvn, TRADING_ZONE_PERCENT) {
            Some(node) if node.direction == NodeDirection::Below => TradingZone::Support,
            Some(_) => TradingZone::Resistance,
            None if Self::within(nearest_lvn, TRADING_ZONE_PERCENT).is_some() => TradingZone::Breakout,
            None => TradingZone::Neutral,
        };

        Some(Self {
            hvn,
            lvn,
            current_node,
            trading_zone,
        })
    }

    pub fn nearest_hvn(&self) -> Option<&NodeDistance> {
        self.hvn.first()
    }

    pub fn nearest_lvn(&self) -> Option<&NodeDistance> {
        self.lvn.first()
    }

    fn within(node: Option<&NodeDistance>, limit_percent: f64) -> Option<&NodeDistance> {
        node.filter(|n| n.distance_percent < limit_percent)
    }

    fn measure_all(kind: NodeKind, prices: &[f64], current_price: f64) -> Vec<NodeDistance> {
        let mut nodes: Vec<NodeDistance> = prices
            .iter()
            .map(|price| NodeDistance::measure(kind, *price, current_price))
            .collect();
        nodes.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        nodes
    }
}

/// Both analyses for one snapshot, carrying its data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAnalysis {
    pub symbol: String,
    pub current_price: f64,
    pub is_synthetic: bool,
    pub value_area: ValueAreaAnalysis,
    pub nodes: NodeAnalysis,
}

impl ProfileAnalysis {
    pub fn from_snapshot(snapshot: &ProfileSnapshot, current_price: f64) -> Option<Self> {
        let profile = snapshot.profile();
        Some(Self {
            symbol: profile.symbol.clone(),
            current_price,
            is_synthetic: snapshot.is_synthetic(),
            value_area: ValueAreaAnalysis::from_profile(profile, current_price)?,
            nodes: NodeAnalysis::from_profile(profile, current_price)?,
        })
    }
}
