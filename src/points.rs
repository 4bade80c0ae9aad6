use std::fmt;

use gdal::vector::{FieldValue, LayerAccess};
use gdal::Dataset;
use log::{debug, info};

use crate::error::{Result, SampleError};

/// A point coordinate as declared by the source. Degenerate 3D points are
/// kept tagged so the z drop is an explicit step, not an unpacking accident.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointGeometry {
    TwoD { x: f64, y: f64 },
    ThreeD { x: f64, y: f64, z: f64 },
}

impl PointGeometry {
    /// Collapse to the 2D coordinate, discarding z if present.
    pub fn xy(&self) -> (f64, f64) {
        match *self {
            PointGeometry::TwoD { x, y } => (x, y),
            PointGeometry::ThreeD { x, y, .. } => (x, y),
        }
    }
}

/// A scalar attribute value in the source's native type. No coercion:
/// a string field stays text all the way into the output table.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Real(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => write!(f, "{}", v),
            AttributeValue::Null => Ok(()),
        }
    }
}

/// One input point: a coordinate plus named attributes in the source's
/// declared field order.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub geometry: PointGeometry,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl PointFeature {
    pub fn new(geometry: PointGeometry, attributes: Vec<(String, AttributeValue)>) -> Self {
        Self { geometry, attributes }
    }

    pub fn attribute_keys(&self) -> Vec<String> {
        self.attributes.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn attribute_values(&self) -> Vec<AttributeValue> {
        self.attributes.iter().map(|(_, v)| v.clone()).collect()
    }
}

/// An ordered collection of point features.
pub trait PointSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// CRS descriptor of the layer, if it declares one.
    fn crs(&self) -> Option<String>;

    /// All features in declaration order. Geometry faults are fatal and
    /// carry the offending feature index.
    fn features(&mut self) -> Result<Vec<PointFeature>>;
}

/// Point features read from the first layer of an OGR vector dataset
/// (shapefile, GeoPackage, GeoJSON). Owns the dataset handle; closed on
/// drop.
pub struct GdalPointSource {
    dataset: Dataset,
}

impl GdalPointSource {
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening point dataset: {}", path);
        let dataset = Dataset::open(path)?;
        Ok(Self { dataset })
    }
}

impl PointSource for GdalPointSource {
    fn len(&self) -> usize {
        self.dataset
            .layer(0)
            .map(|l| l.feature_count() as usize)
            .unwrap_or(0)
    }

    fn crs(&self) -> Option<String> {
        let layer = self.dataset.layer(0).ok()?;
        layer.spatial_ref().and_then(|sr| sr.to_wkt().ok())
    }

    fn features(&mut self) -> Result<Vec<PointFeature>> {
        let mut layer = self.dataset.layer(0)?;
        let mut features = Vec::with_capacity(layer.feature_count() as usize);

        for (index, feature) in layer.features().enumerate() {
            let geometry = match feature.geometry() {
                Some(g) => g,
                None => {
                    return Err(SampleError::InvalidGeometry {
                        feature: index,
                        reason: "feature has no geometry".to_string(),
                    })
                }
            };

            let n_points = geometry.point_count();
            if n_points == 0 {
                return Err(SampleError::InvalidGeometry {
                    feature: index,
                    reason: "geometry is empty".to_string(),
                });
            }
            if n_points != 1 {
                return Err(SampleError::InvalidGeometry {
                    feature: index,
                    reason: format!("expected a single point, found {} vertices", n_points),
                });
            }

            let (x, y, z) = geometry.get_point(0);
            let geometry = if geometry.coordinate_dimension() >= 3 {
                PointGeometry::ThreeD { x, y, z }
            } else {
                PointGeometry::TwoD { x, y }
            };

            let attributes = feature
                .fields()
                .map(|(name, value)| (name, convert_field(value)))
                .collect();

            features.push(PointFeature { geometry, attributes });
        }

        Ok(features)
    }
}

fn convert_field(value: Option<FieldValue>) -> AttributeValue {
    match value {
        None => AttributeValue::Null,
        Some(FieldValue::IntegerValue(v)) => AttributeValue::Integer(i64::from(v)),
        Some(FieldValue::Integer64Value(v)) => AttributeValue::Integer(v),
        Some(FieldValue::RealValue(v)) => AttributeValue::Real(v),
        Some(FieldValue::StringValue(v)) => AttributeValue::Text(v),
        Some(other) => {
            // Non-scalar field types (lists, dates) are not part of the
            // sampling contract; carry their printed form through.
            debug!("Coercing non-scalar field value {:?} to text", other);
            AttributeValue::Text(format!("{:?}", other))
        }
    }
}

/// Fixed in-memory point collection, for embedding and tests.
pub struct MemoryPointSource {
    features: Vec<PointFeature>,
    crs: Option<String>,
}

impl MemoryPointSource {
    pub fn new(features: Vec<PointFeature>) -> Self {
        Self { features, crs: None }
    }

    pub fn with_crs(mut self, crs: &str) -> Self {
        self.crs = Some(crs.to_string());
        self
    }
}

impl PointSource for MemoryPointSource {
    fn len(&self) -> usize {
        self.features.len()
    }

    fn crs(&self) -> Option<String> {
        self.crs.clone()
    }

    fn features(&mut self) -> Result<Vec<PointFeature>> {
        Ok(self.features.clone())
    }
}
