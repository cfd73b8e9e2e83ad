use serde::{Deserialize, Serialize};

/// Visual sizing of cluster markers.
///
/// Size scales linearly with the share of all pins a cluster holds and
/// saturates at `max_size_px`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSymbology {
    pub min_size_px: f32,
    pub max_size_px: f32,
    pub size_range_px: f32,
}

impl Default for ClusterSymbology {
    fn default() -> Self {
        Self {
            min_size_px: 30.0,
            max_size_px: 80.0,
            size_range_px: 60.0,
        }
    }
}

impl ClusterSymbology {
    pub fn size_px(&self, member_count: usize, total_pin_count: usize) -> f32 {
        let share = member_count as f32 / total_pin_count.max(1) as f32;
        (self.min_size_px + share * self.size_range_px).min(self.max_size_px)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinSymbology {
    /// Shown when a pin has no avatar of its own.
    pub fallback_avatar_url: String,
    /// Tooltip text for pins without a location label.
    pub unknown_location: String,
}

impl Default for PinSymbology {
    fn default() -> Self {
        Self {
            fallback_avatar_url: "/avatars/default.svg".to_string(),
            unknown_location: "Unknown".to_string(),
        }
    }
}

/// Placeholder identity shown instead of the real one for anonymous pins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymityPolicy {
    pub display_name: String,
    pub avatar_url: String,
}

impl Default for AnonymityPolicy {
    fn default() -> Self {
        Self {
            display_name: "Anonymous".to_string(),
            avatar_url: "/avatars/anonymous.svg".to_string(),
        }
    }
}

/// Compact count label: `999`, `1.2k`, `12k`.
pub fn abbreviate_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}
