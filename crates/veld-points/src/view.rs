//! Columnar point storage
//!
//! A `PointView` owns one contiguous column per dimension. Raw accessors move
//! untyped bytes (the bridge's staging path); typed accessors go through
//! [`Scalar`] and check the dimension's declared type.

use crate::dimension::Scalar;
use crate::errors::PointError;
use crate::layout::PointLayout;
use crate::srs::SpatialReference;

/// One buffer's worth of points.
#[derive(Debug, Clone)]
pub struct PointView {
    layout: PointLayout,
    columns: Vec<Vec<u8>>,
    count: usize,
    srs: SpatialReference,
}

impl PointView {
    /// Allocate a zero-filled view of `count` points over `layout`.
    pub fn new(layout: PointLayout, count: usize) -> Self {
        let columns = layout
            .dims()
            .iter()
            .map(|d| vec![0u8; d.dtype.size() * count])
            .collect();
        Self {
            layout,
            columns,
            count,
            srs: SpatialReference::default(),
        }
    }

    pub fn layout(&self) -> &PointLayout {
        &self.layout
    }

    pub fn point_count(&self) -> usize {
        self.count
    }

    pub fn spatial_reference(&self) -> &SpatialReference {
        &self.srs
    }

    pub fn set_spatial_reference(&mut self, srs: SpatialReference) {
        self.srs = srs;
    }

    /// Raw bytes of one attribute value.
    pub fn raw(&self, dim: usize, index: usize) -> Result<&[u8], PointError> {
        let size = self.dim_size(dim)?;
        self.check_index(index)?;
        let column = &self.columns[dim];
        Ok(&column[index * size..(index + 1) * size])
    }

    /// Overwrite one attribute value from raw bytes.
    pub fn set_raw(&mut self, dim: usize, index: usize, value: &[u8]) -> Result<(), PointError> {
        let size = self.dim_size(dim)?;
        self.check_index(index)?;
        if value.len() != size {
            let name = self.layout.dims()[dim].name.clone();
            return Err(PointError::ValueSize {
                name,
                expected: size,
                actual: value.len(),
            });
        }
        self.columns[dim][index * size..(index + 1) * size].copy_from_slice(value);
        Ok(())
    }

    /// Typed read of one attribute value, checked against the layout.
    pub fn value<T: Scalar>(&self, name: &str, index: usize) -> Result<T, PointError> {
        let (dim, entry) = self
            .layout
            .find(name)
            .ok_or_else(|| PointError::UnknownDimension(name.to_string()))?;
        if entry.dtype != T::DIM {
            return Err(PointError::TypeMismatch {
                name: name.to_string(),
                stored: entry.dtype,
                requested: T::DIM,
            });
        }
        let raw = self.raw(dim, index)?;
        T::read_ne(raw).ok_or_else(|| PointError::ValueSize {
            name: name.to_string(),
            expected: T::DIM.size(),
            actual: raw.len(),
        })
    }

    /// Typed write of one attribute value, checked against the layout.
    pub fn set_value<T: Scalar>(
        &mut self,
        name: &str,
        index: usize,
        value: T,
    ) -> Result<(), PointError> {
        let (dim, entry) = self
            .layout
            .find(name)
            .ok_or_else(|| PointError::UnknownDimension(name.to_string()))?;
        if entry.dtype != T::DIM {
            return Err(PointError::TypeMismatch {
                name: name.to_string(),
                stored: entry.dtype,
                requested: T::DIM,
            });
        }
        let size = entry.dtype.size();
        self.check_index(index)?;
        let slot = &mut self.columns[dim][index * size..(index + 1) * size];
        let available = slot.len();
        value.write_ne(slot).ok_or_else(|| PointError::ValueSize {
            name: name.to_string(),
            expected: size,
            actual: available,
        })
    }

    fn dim_size(&self, dim: usize) -> Result<usize, PointError> {
        self.layout
            .dims()
            .get(dim)
            .map(|d| d.dtype.size())
            .ok_or(PointError::DimensionIndex(dim))
    }

    fn check_index(&self, index: usize) -> Result<(), PointError> {
        if index >= self.count {
            return Err(PointError::PointIndex {
                index,
                count: self.count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::DimType;

    fn xyz_layout() -> PointLayout {
        let mut layout = PointLayout::new();
        layout.register("X", DimType::F64);
        layout.register("Y", DimType::F64);
        layout.register("Intensity", DimType::U16);
        layout
    }

    #[test]
    fn typed_round_trip() {
        let mut view = PointView::new(xyz_layout(), 3);
        view.set_value("X", 0, 1.5f64).unwrap();
        view.set_value("Intensity", 2, 700u16).unwrap();

        assert_eq!(view.value::<f64>("X", 0).unwrap(), 1.5);
        assert_eq!(view.value::<u16>("Intensity", 2).unwrap(), 700);
        assert_eq!(view.value::<f64>("Y", 1).unwrap(), 0.0);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut view = PointView::new(xyz_layout(), 1);
        let err = view.set_value("X", 0, 5u16).unwrap_err();
        assert!(matches!(err, PointError::TypeMismatch { .. }));
        let err = view.value::<u16>("X", 0).unwrap_err();
        assert!(matches!(err, PointError::TypeMismatch { .. }));
    }

    #[test]
    fn raw_access_bounds() {
        let mut view = PointView::new(xyz_layout(), 2);
        assert!(matches!(
            view.raw(0, 2),
            Err(PointError::PointIndex { index: 2, count: 2 })
        ));
        assert!(matches!(view.raw(9, 0), Err(PointError::DimensionIndex(9))));
        assert!(matches!(
            view.set_raw(2, 0, &[0u8; 3]),
            Err(PointError::ValueSize { .. })
        ));
    }

    #[test]
    fn raw_matches_typed() {
        let mut view = PointView::new(xyz_layout(), 1);
        view.set_value("Y", 0, -2.25f64).unwrap();
        let raw = view.raw(1, 0).unwrap();
        assert_eq!(raw, (-2.25f64).to_ne_bytes());
    }
}
