//! Boundary-file (shapefile) reading and writing.
//!
//! A [`FeatureSet`] holds the geometries from the `.shp`, the attribute
//! table from the `.dbf` (column order preserved), and the projection text
//! from the optional `.prj` sidecar so it can be carried to the output.
//!
//! **Attribute mapping:**
//! - Character/Memo/Date → [`Value::Text`] (empty → [`Value::Missing`])
//! - Numeric/Float/Double/Integer/Currency → [`Value::Number`]
//! - Logical → [`Value::Bool`]

mod dbf;

use std::fmt;
use std::path::Path;

use shapefile::dbase;
use tracing::{debug, info, instrument};

use gridmerge_shared::{GridMergeError, Result, Value};

pub use shapefile::{Point, Polygon, PolygonRing, Shape};

// ---------------------------------------------------------------------------
// Feature types
// ---------------------------------------------------------------------------

/// One boundary feature: a geometry plus attribute values aligned with
/// [`FeatureSet::fields`].
pub struct Feature {
    pub shape: Shape,
    pub attributes: Vec<Value>,
}

// `Shape` implements neither `Clone` nor `Debug`; its variants do.
impl Clone for Feature {
    fn clone(&self) -> Self {
        Self {
            shape: clone_shape(&self.shape),
            attributes: self.attributes.clone(),
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("shape", &format_args!("{}", self.shape))
            .field("attributes", &self.attributes)
            .finish()
    }
}

fn clone_shape(shape: &Shape) -> Shape {
    match shape {
        Shape::NullShape => Shape::NullShape,
        Shape::Point(s) => Shape::Point(*s),
        Shape::PointM(s) => Shape::PointM(*s),
        Shape::PointZ(s) => Shape::PointZ(*s),
        Shape::Polyline(s) => Shape::Polyline(s.clone()),
        Shape::PolylineM(s) => Shape::PolylineM(s.clone()),
        Shape::PolylineZ(s) => Shape::PolylineZ(s.clone()),
        Shape::Polygon(s) => Shape::Polygon(s.clone()),
        Shape::PolygonM(s) => Shape::PolygonM(s.clone()),
        Shape::PolygonZ(s) => Shape::PolygonZ(s.clone()),
        Shape::Multipoint(s) => Shape::Multipoint(s.clone()),
        Shape::MultipointM(s) => Shape::MultipointM(s.clone()),
        Shape::MultipointZ(s) => Shape::MultipointZ(s.clone()),
        Shape::Multipatch(s) => Shape::Multipatch(s.clone()),
    }
}

/// An ordered set of features sharing one attribute schema.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    /// Attribute field names in table order.
    pub fields: Vec<String>,
    /// Features in file order.
    pub features: Vec<Feature>,
    /// WKT from the `.prj` sidecar, if one was present.
    pub projection: Option<String>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Values of one attribute field, in feature order.
    pub fn field_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.field_index(name)?;
        Some(self.features.iter().map(|f| &f.attributes[idx]).collect())
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read a shapefile and its attribute table.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_feature_set(path: &Path) -> Result<FeatureSet> {
    if !path.exists() {
        return Err(GridMergeError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "shapefile not found"),
        ));
    }

    let shapes = shapefile::read_shapes(path).map_err(|e| shp_error(path, e))?;

    let dbf_path = path.with_extension("dbf");
    let mut table = dbase::Reader::from_path(&dbf_path).map_err(|e| dbf_error(&dbf_path, e))?;
    let fields: Vec<String> = table
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    let records = table.read().map_err(|e| dbf_error(&dbf_path, e))?;

    if records.len() != shapes.len() {
        return Err(GridMergeError::parse(format!(
            "{}: {} shapes but {} attribute records",
            path.display(),
            shapes.len(),
            records.len()
        )));
    }

    let features = shapes
        .into_iter()
        .zip(records)
        .map(|(shape, record)| Feature {
            attributes: fields
                .iter()
                .map(|name| record.get(name).map(dbf::to_value).unwrap_or_default())
                .collect(),
            shape,
        })
        .collect::<Vec<_>>();

    let projection = read_projection(path)?;

    info!(
        features = features.len(),
        fields = fields.len(),
        has_projection = projection.is_some(),
        "boundary file loaded"
    );

    Ok(FeatureSet {
        fields,
        features,
        projection,
    })
}

fn read_projection(shp_path: &Path) -> Result<Option<String>> {
    let prj = shp_path.with_extension("prj");
    if !prj.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(&prj)
        .map(Some)
        .map_err(|e| GridMergeError::io(prj, e))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Serialize `set` to `path` (`.shp`, `.shx`, `.dbf`, and `.prj` if carried).
///
/// Existing files are overwritten. The parent directory must already exist.
#[instrument(skip_all, fields(path = %path.display(), features = set.len()))]
pub fn write_feature_set(set: &FeatureSet, path: &Path) -> Result<()> {
    let layout = dbf::TableLayout::plan(set)?;
    let builder = layout.builder()?;

    {
        let mut writer =
            shapefile::Writer::from_path(path, builder).map_err(|e| shp_error(path, e))?;

        for feature in &set.features {
            let record = layout.record(&feature.attributes);
            let written = match &feature.shape {
                Shape::Point(s) => writer.write_shape_and_record(s, &record),
                Shape::PointM(s) => writer.write_shape_and_record(s, &record),
                Shape::PointZ(s) => writer.write_shape_and_record(s, &record),
                Shape::Polyline(s) => writer.write_shape_and_record(s, &record),
                Shape::PolylineM(s) => writer.write_shape_and_record(s, &record),
                Shape::PolylineZ(s) => writer.write_shape_and_record(s, &record),
                Shape::Polygon(s) => writer.write_shape_and_record(s, &record),
                Shape::PolygonM(s) => writer.write_shape_and_record(s, &record),
                Shape::PolygonZ(s) => writer.write_shape_and_record(s, &record),
                Shape::Multipoint(s) => writer.write_shape_and_record(s, &record),
                Shape::MultipointM(s) => writer.write_shape_and_record(s, &record),
                Shape::MultipointZ(s) => writer.write_shape_and_record(s, &record),
                Shape::Multipatch(s) => writer.write_shape_and_record(s, &record),
                Shape::NullShape => {
                    return Err(GridMergeError::Shapefile(format!(
                        "{}: features without geometry cannot be written",
                        path.display()
                    )));
                }
            };
            written.map_err(|e| shp_error(path, e))?;
        }
        // Headers are finalized when the writer drops.
    }

    write_projection(path, set.projection.as_deref())?;

    debug!(fields = layout.len(), "boundary file written");
    Ok(())
}

fn write_projection(shp_path: &Path, projection: Option<&str>) -> Result<()> {
    let prj = shp_path.with_extension("prj");
    match projection {
        Some(wkt) => std::fs::write(&prj, wkt).map_err(|e| GridMergeError::io(prj, e)),
        None if prj.exists() => {
            // Drop a stale sidecar from a previous run at the same path.
            std::fs::remove_file(&prj).map_err(|e| GridMergeError::io(prj, e))
        }
        None => Ok(()),
    }
}

fn shp_error(path: &Path, err: shapefile::Error) -> GridMergeError {
    GridMergeError::Shapefile(format!("{}: {err}", path.display()))
}

fn dbf_error(path: &Path, err: dbase::Error) -> GridMergeError {
    GridMergeError::Shapefile(format!("{}: {err}", path.display()))
}
