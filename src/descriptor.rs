use geo::{LineString, Polygon};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::bands::BandRef;
use crate::model::MetadataValue;
use crate::valid_region::CrsPolygon;

/// Catalog descriptor of one prepared scene, written as a YAML document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub id: String,
    pub label: String,
    pub checksum_sha1: String,
    pub data_provider: String,
    pub lpgs_metadata_file: String,
    pub platform: Platform,
    pub product_type: String,
    pub instrument: Instrument,
    pub level1_production_date: String,
    pub solar_angles: SolarAngles,
    pub earth_sun_distance: String,
    pub orientation_angle: String,
    pub wrs: Wrs,
    pub extent: Extent,
    pub format: Format,
    pub grid_spatial: GridSpatial,
    pub image: Image,
    pub lineage: Lineage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Platform {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrument {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolarAngles {
    pub unit: String,
    pub azimuth: String,
    pub zenith: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wrs {
    pub row: String,
    pub path: String,
    pub system: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extent {
    pub from_dt: String,
    pub to_dt: String,
    pub center_dt: String,
    pub coord: Corners<LatLon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Corners<T> {
    pub ul: T,
    pub ur: T,
    pub ll: T,
    pub lr: T,
}

impl<T: Copy> Corners<T> {
    /// Expands the upper-left and lower-right corners of a north-up
    /// rectangle into all four corners.
    pub fn from_diagonal(ul: T, lr: T, combine: impl Fn(&T, &T) -> T) -> Self {
        Self {
            ul,
            ur: combine(&ul, &lr),
            ll: combine(&lr, &ul),
            lr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Format {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSpatial {
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub geo_ref_points: Corners<Xy>,
    pub spatial_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_data: Option<ValidData>,
}

/// GeoJSON-style geometry of the valid-data region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidData {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Coordinates,
}

type Ring = Vec<[f64; 2]>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coordinates {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl From<&CrsPolygon> for ValidData {
    fn from(polygon: &CrsPolygon) -> Self {
        let parts = &polygon.geometry().0;
        if parts.len() == 1 {
            ValidData {
                kind: "Polygon".to_string(),
                coordinates: Coordinates::Polygon(polygon_rings(&parts[0])),
            }
        } else {
            ValidData {
                kind: "MultiPolygon".to_string(),
                coordinates: Coordinates::MultiPolygon(parts.iter().map(polygon_rings).collect()),
            }
        }
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Ring> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_coords)
        .collect()
}

fn ring_coords(ring: &LineString<f64>) -> Ring {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub bands: BTreeMap<String, BandRef>,
    pub bands_info: BTreeMap<String, MetadataValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Lineage {
    pub source_datasets: BTreeMap<String, MetadataValue>,
}
