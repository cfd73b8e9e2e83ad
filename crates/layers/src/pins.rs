use foundation::bounds::LngLat;
use serde::{Deserialize, Deserializer, Serialize};
use spatial::IndexedPoint;

/// Stable identifier of a persisted pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PinId(pub String);

impl PinId {
    pub fn new(id: impl Into<String>) -> Self {
        PinId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Row ids arrive either as strings or as integers depending on the backing table.
impl<'de> Deserialize<'de> for PinId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => PinId(s),
            Raw::Number(n) => PinId(n.to_string()),
        })
    }
}

/// A user's persisted location marker, as served by the pins endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    #[serde(rename = "username", default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "is_anonymous", default)]
    pub anonymous: bool,
}

impl Pin {
    pub fn position(&self) -> LngLat {
        LngLat::new(self.lng, self.lat)
    }
}

/// Display fields carried through the index so results render without a
/// second lookup against the pin set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    /// Always `false` for a feature; only index clusters are clusters.
    pub cluster: bool,
    pub pin_id: PinId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub anonymous: bool,
}

/// Geometry plus properties wrapper around one pin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFeature {
    pub geometry: LngLat,
    pub properties: FeatureProperties,
}

impl From<&Pin> for PointFeature {
    fn from(pin: &Pin) -> Self {
        PointFeature {
            geometry: pin.position(),
            properties: FeatureProperties {
                cluster: false,
                pin_id: pin.id.clone(),
                display_name: pin.display_name.clone(),
                avatar_url: pin.avatar_url.clone(),
                location: pin.location.clone(),
                anonymous: pin.anonymous,
            },
        }
    }
}

impl IndexedPoint for PointFeature {
    fn position(&self) -> LngLat {
        self.geometry
    }
}

/// One feature per pin, in pin order.
pub fn to_features(pins: &[Pin]) -> Vec<PointFeature> {
    pins.iter().map(PointFeature::from).collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_pins;
    use super::{Pin, PinId, to_features};
    use foundation::bounds::LngLat;
    use pretty_assertions::assert_eq;

    #[test]
    fn one_feature_per_pin_in_order() {
        let pins = sample_pins();
        let features = to_features(&pins);
        assert_eq!(features.len(), pins.len());
        for (pin, feature) in pins.iter().zip(&features) {
            assert_eq!(feature.properties.pin_id, pin.id);
            assert_eq!(feature.geometry, LngLat::new(pin.lng, pin.lat));
            assert!(!feature.properties.cluster);
        }
    }

    #[test]
    fn display_fields_carry_through() {
        let mut pins = sample_pins();
        pins[0].anonymous = true;
        pins[0].location = None;
        let features = to_features(&pins);
        let props = &features[0].properties;
        assert_eq!(props.display_name, "Alice");
        assert_eq!(props.avatar_url.as_deref(), Some("https://avatars.example/Alice.svg"));
        assert_eq!(props.location, None);
        assert!(props.anonymous);
    }

    #[test]
    fn empty_pins_give_empty_features() {
        assert!(to_features(&[]).is_empty());
    }

    #[test]
    fn deserializes_rest_rows() {
        let json = r#"[
            {"id": "1", "username": "Alice", "avatar_url": "a.svg", "lat": 48.8566, "lng": 2.3522, "location": "Paris, France"},
            {"id": 42, "username": "Bob", "avatar_url": null, "lat": 1.0, "lng": 2.0, "is_anonymous": true}
        ]"#;
        let pins: Vec<Pin> = serde_json::from_str(json).unwrap();
        assert_eq!(pins[0].id, PinId::new("1"));
        assert_eq!(pins[0].location.as_deref(), Some("Paris, France"));
        assert!(!pins[0].anonymous);
        assert_eq!(pins[1].id, PinId::new("42"));
        assert_eq!(pins[1].avatar_url, None);
        assert!(pins[1].anonymous);
    }
}
