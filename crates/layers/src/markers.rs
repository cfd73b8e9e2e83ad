use foundation::bounds::LngLat;
use serde::{Deserialize, Serialize};
use spatial::{ClusterId, Clustered};

use crate::pins::{PinId, PointFeature};
use crate::symbology::{AnonymityPolicy, ClusterSymbology, PinSymbology, abbreviate_count};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMarker {
    pub cluster_id: ClusterId,
    pub position: LngLat,
    pub count: usize,
    pub size_px: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinMarker {
    pub pin_id: PinId,
    pub position: LngLat,
    pub display_name: String,
    pub avatar_url: String,
    /// Tooltip line under the name.
    pub location: String,
    pub anonymous: bool,
}

/// Renderer-facing description of one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerDescriptor {
    Cluster(ClusterMarker),
    Pin(PinMarker),
}

impl MarkerDescriptor {
    pub fn position(&self) -> LngLat {
        match self {
            MarkerDescriptor::Cluster(c) => c.position,
            MarkerDescriptor::Pin(p) => p.position,
        }
    }

    pub fn lat(&self) -> f64 {
        self.position().lat
    }

    pub fn lng(&self) -> f64 {
        self.position().lng
    }

    /// Number of pins the marker stands for.
    pub fn count(&self) -> usize {
        match self {
            MarkerDescriptor::Cluster(c) => c.count,
            MarkerDescriptor::Pin(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    pub cluster: ClusterSymbology,
    pub pin: PinSymbology,
    pub anonymity: AnonymityPolicy,
}

/// Turns index query results into marker descriptors.
///
/// Anonymous pins are masked here and nowhere else, so renderers only ever
/// see the placeholder identity.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLayer {
    pub config: MarkersConfig,
}

impl MarkerLayer {
    pub fn new(config: MarkersConfig) -> Self {
        Self { config }
    }

    /// `total_pin_count` scales cluster sizes against the whole pin set, not
    /// just what the query returned.
    pub fn project(
        &self,
        nodes: &[Clustered<'_, PointFeature>],
        total_pin_count: usize,
    ) -> Vec<MarkerDescriptor> {
        nodes
            .iter()
            .map(|node| match node {
                Clustered::Cluster(c) => MarkerDescriptor::Cluster(ClusterMarker {
                    cluster_id: c.id,
                    position: c.position,
                    count: c.count,
                    size_px: self.config.cluster.size_px(c.count, total_pin_count),
                    label: abbreviate_count(c.count),
                }),
                Clustered::Point(feature) => MarkerDescriptor::Pin(self.pin_marker(feature)),
            })
            .collect()
    }

    fn pin_marker(&self, feature: &PointFeature) -> PinMarker {
        let props = &feature.properties;
        let (display_name, avatar_url) = if props.anonymous {
            (
                self.config.anonymity.display_name.clone(),
                self.config.anonymity.avatar_url.clone(),
            )
        } else {
            (
                props.display_name.clone(),
                props
                    .avatar_url
                    .clone()
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| self.config.pin.fallback_avatar_url.clone()),
            )
        };

        let location = props
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.pin.unknown_location.as_str())
            .to_string();

        PinMarker {
            pin_id: props.pin_id.clone(),
            position: feature.geometry,
            display_name,
            avatar_url,
            location,
            anonymous: props.anonymous,
        }
    }
}

impl Default for MarkerLayer {
    fn default() -> Self {
        Self::new(MarkersConfig::default())
    }
}

/// `MarkerLayer::project` with the default symbology.
pub fn to_markers(
    nodes: &[Clustered<'_, PointFeature>],
    total_pin_count: usize,
) -> Vec<MarkerDescriptor> {
    MarkerLayer::default().project(nodes, total_pin_count)
}

#[cfg(test)]
mod tests {
    use super::{MarkerDescriptor, MarkerLayer, MarkersConfig, to_markers};
        use crate::pins::fixtures::{pin, sample_pins};
    use crate::pins::{PinId, to_features};
    use foundation::bounds::{LngLat, LngLatBounds};
    use pretty_assertions::assert_eq;
    use spatial::{ClusterId, ClusterIndex, ClusterNode, Clustered, IndexOptions};

    #[test]
    fn singletons_become_pin_markers_with_tooltip_fields() {
        let features = to_features(&sample_pins());
        let nodes: Vec<Clustered<'_, _>> = features.iter().map(Clustered::Point).collect();
        let markers = to_markers(&nodes, features.len());

        assert_eq!(markers.len(), 5);
        let MarkerDescriptor::Pin(first) = &markers[0] else {
            panic!("expected pin marker");
        };
        assert_eq!(first.pin_id, PinId::new("1"));
        assert_eq!(first.display_name, "Alice");
        assert_eq!(first.avatar_url, "https://avatars.example/Alice.svg");
        assert_eq!(first.location, "Alice's city");
        assert_eq!(first.position, LngLat::new(2.3522, 48.8566));
    }

    #[test]
    fn cluster_markers_scale_against_total_pin_count() {
        let node = |count: usize| {
            Clustered::Cluster(ClusterNode {
                id: ClusterId(100 + count as u64),
                position: LngLat::new(20.0, 10.0),
                count,
            })
        };
        let nodes = vec![node(10), node(2)];
        let markers = to_markers(&nodes, 10);

        let sizes: Vec<f32> = markers
            .iter()
            .map(|m| match m {
                MarkerDescriptor::Cluster(c) => c.size_px,
                MarkerDescriptor::Pin(_) => panic!("expected cluster"),
            })
            .collect();
        assert_eq!(sizes, vec![80.0, 42.0]);
        assert_eq!(markers[0].count(), 10);
        assert_eq!(markers[0].lat(), 10.0);
        assert_eq!(markers[0].lng(), 20.0);
    }

    #[test]
    fn anonymous_pins_never_leak_identity() {
        let mut secret = pin("7", "Secret Sam", 10.0, 10.0);
        secret.avatar_url = Some("https://private.example/sam.png".to_string());
        secret.location = Some("Berlin".to_string());
        secret.anonymous = true;
        let features = to_features(&[secret]);
        let nodes = vec![Clustered::Point(&features[0])];

        let markers = to_markers(&nodes, 1);
        let json = serde_json::to_string(&markers).unwrap();
        assert!(!json.contains("Secret Sam"));
        assert!(!json.contains("private.example"));

        let MarkerDescriptor::Pin(marker) = &markers[0] else {
            panic!("expected pin marker");
        };
        assert_eq!(marker.display_name, "Anonymous");
        assert_eq!(marker.avatar_url, "/avatars/anonymous.svg");
        assert!(marker.anonymous);
    }

    #[test]
    fn missing_avatar_and_location_fall_back() {
        let mut p = pin("8", "Nia", 0.0, 0.0);
        p.avatar_url = None;
        p.location = Some("   ".to_string());
        let features = to_features(&[p]);
        let markers = to_markers(&[Clustered::Point(&features[0])], 1);

        let MarkerDescriptor::Pin(marker) = &markers[0] else {
            panic!("expected pin marker");
        };
        assert_eq!(marker.avatar_url, "/avatars/default.svg");
        assert_eq!(marker.location, "Unknown");
    }

    #[test]
    fn index_results_project_with_counts_preserved() {
        let mut pins = Vec::new();
        for i in 0..8 {
            pins.push(pin(&i.to_string(), "p", 2.35 + i as f64 * 0.01, 48.85));
        }
        pins.push(pin("far", "q", -74.0, 40.7));

        let mut index = ClusterIndex::new(IndexOptions::default());
        index.load(to_features(&pins));
        let nodes = index.query(&LngLatBounds::WORLD, 1);
        let markers = to_markers(&nodes, pins.len());

        assert_eq!(markers.len(), 2);
        assert_eq!(markers.iter().map(|m| m.count()).sum::<usize>(), 9);
        let MarkerDescriptor::Cluster(c) = &markers[0] else {
            panic!("expected cluster first");
        };
        assert_eq!(c.label, "8");
    }

    #[test]
    fn pin_markers_serialize_tagged() {
        let layer = MarkerLayer::new(MarkersConfig::default());

        let features = to_features(&sample_pins()[..1]);
        let markers = layer.project(&[Clustered::Point(&features[0])], 1);
        let value = serde_json::to_value(&markers[0]).unwrap();
        assert_eq!(value["kind"], "pin");
        assert_eq!(value["pin_id"], "1");
    }
}
