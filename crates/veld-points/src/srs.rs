//! Spatial reference system holder

use serde::Serialize;
use serde_json::Value;

/// Coordinate reference system of a point buffer, carried as WKT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpatialReference {
    wkt: String,
}

impl SpatialReference {
    pub fn new(wkt: &str) -> Self {
        Self {
            wkt: wkt.to_string(),
        }
    }

    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    pub fn is_empty(&self) -> bool {
        self.wkt.is_empty()
    }

    /// The document published to scripts as the `spatialreference` global.
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "wkt": self.wkt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape() {
        let srs = SpatialReference::new("LOCAL_CS[\"test\"]");
        assert_eq!(srs.to_value()["wkt"], "LOCAL_CS[\"test\"]");
        assert!(!srs.is_empty());
        assert!(SpatialReference::default().is_empty());
    }
}
