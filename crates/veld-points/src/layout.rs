//! Dimension registry for one point table
//!
//! A layout is an ordered list of named, typed dimensions. Order matters only
//! for iteration (staging happens in registration order); lookup is by name.

use crate::dimension::DimType;
use serde::Serialize;

/// One named, typed column of per-point values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub dtype: DimType,
}

/// Ordered registry of the dimensions in a point table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointLayout {
    dims: Vec<Dimension>,
}

impl PointLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dimension. Re-registering a name replaces its type and
    /// keeps the original position.
    pub fn register(&mut self, name: &str, dtype: DimType) {
        if let Some(existing) = self.dims.iter_mut().find(|d| d.name == name) {
            existing.dtype = dtype;
        } else {
            self.dims.push(Dimension {
                name: name.to_string(),
                dtype,
            });
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Look up a dimension by name, returning its index and entry.
    pub fn find(&self, name: &str) -> Option<(usize, &Dimension)> {
        self.dims
            .iter()
            .enumerate()
            .find(|(_, d)| d.name == name)
    }

    /// The schema document published to scripts as the `schema` global.
    pub fn schema(&self) -> SchemaDocument {
        SchemaDocument {
            schema: SchemaBody {
                dimensions: self
                    .dims
                    .iter()
                    .map(|d| SchemaDimension {
                        name: d.name.clone(),
                        dtype: d.dtype,
                        size: d.dtype.size(),
                    })
                    .collect(),
            },
        }
    }
}

/// JSON shape: `{"schema": {"dimensions": [{"name", "type", "size"}, ...]}}`.
#[derive(Debug, Serialize)]
pub struct SchemaDocument {
    pub schema: SchemaBody,
}

#[derive(Debug, Serialize)]
pub struct SchemaBody {
    pub dimensions: Vec<SchemaDimension>,
}

#[derive(Debug, Serialize)]
pub struct SchemaDimension {
    pub name: String,
    #[serde(rename = "type")]
    pub dtype: DimType,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_find() {
        let mut layout = PointLayout::new();
        layout.register("X", DimType::F64);
        layout.register("Intensity", DimType::U16);

        let (idx, dim) = layout.find("Intensity").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(dim.dtype, DimType::U16);
        assert!(layout.find("Classification").is_none());
    }

    #[test]
    fn re_register_replaces_in_place() {
        let mut layout = PointLayout::new();
        layout.register("X", DimType::F32);
        layout.register("Y", DimType::F64);
        layout.register("X", DimType::F64);

        assert_eq!(layout.len(), 2);
        let (idx, dim) = layout.find("X").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(dim.dtype, DimType::F64);
    }

    #[test]
    fn schema_document_shape() {
        let mut layout = PointLayout::new();
        layout.register("Z", DimType::F64);
        layout.register("ReturnNumber", DimType::U8);

        let json = serde_json::to_value(layout.schema()).unwrap();
        let dims = json["schema"]["dimensions"].as_array().unwrap();
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0]["name"], "Z");
        assert_eq!(dims[0]["type"], "double");
        assert_eq!(dims[0]["size"], 8);
        assert_eq!(dims[1]["type"], "uint8");
        assert_eq!(dims[1]["size"], 1);
    }
}
