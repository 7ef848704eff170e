use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bands::collect_bands;
use crate::checksum::sha1_hex;
use crate::crs::{epsg_to_wkt, utm_epsg};
use crate::descriptor::{
    Corners, Descriptor, Extent, Format, GridSpatial, Image, Instrument, LatLon, Lineage, Platform,
    Projection, SolarAngles, ValidData, Wrs, Xy,
};
use crate::error::{Result, SceneError};
use crate::model::MetadataValue;
use crate::parser::{load_metadata, ConvertOptions};
use crate::raster::RasterMaskReader;
use crate::scene::SceneSource;
use crate::valid_region::{ValidRegion, ValidRegionService};

pub const PRODUCT_TYPE: &str = "LS_USGS_L2C1";
pub const FORMAT_NAME: &str = "GeoTiff";

#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    pub convert: ConvertOptions,
    /// Bit mask for the valid-region test; `None` tests for nonzero samples.
    pub mask_value: Option<i64>,
}

/// Builds the descriptor of one scene from its XML sidecar and band files.
pub fn prepare_dataset<R: RasterMaskReader>(
    xml_path: &Path,
    source: &SceneSource,
    service: &ValidRegionService<R>,
    options: &PrepareOptions,
) -> Result<Descriptor> {
    let checksum_sha1 = sha1_hex(xml_path).map_err(|source| SceneError::Io {
        path: xml_path.to_path_buf(),
        source,
    })?;
    let meta = load_metadata(xml_path, &options.convert).map_err(|source| SceneError::Metadata {
        path: xml_path.to_path_buf(),
        source,
    })?;

    let global = field(&meta, &["global_metadata"])?;
    let sensing_time = format!(
        "{}T{}",
        text(global, &["acquisition_date"])?,
        text(global, &["scene_center_time"])?
    );

    let projection_info = field(global, &["projection_information"])?;
    let epsg = utm_epsg(text(projection_info, &["utm_proj_params", "zone_code"])?)?;
    let spatial_reference = epsg_to_wkt(epsg)?;

    let bands = collect_bands(field(&meta, &["bands"])?, source)?;
    let valid_data = match service.derive(bands.reflectance_paths.as_slice(), options.mask_value)? {
        ValidRegion::Region(polygon) => Some(ValidData::from(&polygon)),
        ValidRegion::Unavailable => {
            warn!("No valid_data for {}", xml_path.display());
            None
        }
    };

    let descriptor = Descriptor {
        id: Uuid::new_v5(&Uuid::NAMESPACE_URL, xml_path.to_string_lossy().as_bytes()).to_string(),
        label: owned(global, &["product_id"])?,
        checksum_sha1,
        data_provider: owned(global, &["data_provider"])?,
        lpgs_metadata_file: owned(global, &["lpgs_metadata_file"])?,
        platform: Platform {
            code: owned(global, &["satellite"])?,
        },
        product_type: PRODUCT_TYPE.to_string(),
        instrument: Instrument {
            name: owned(global, &["instrument"])?,
        },
        level1_production_date: owned(global, &["level1_production_date"])?,
        solar_angles: SolarAngles {
            unit: owned(global, &["solar_angles", "@units"])?,
            azimuth: owned(global, &["solar_angles", "@azimuth"])?,
            zenith: owned(global, &["solar_angles", "@zenith"])?,
        },
        earth_sun_distance: owned(global, &["earth_sun_distance"])?,
        orientation_angle: owned(global, &["orientation_angle"])?,
        wrs: Wrs {
            row: owned(global, &["wrs", "@row"])?,
            path: owned(global, &["wrs", "@path"])?,
            system: owned(global, &["wrs", "@system"])?,
        },
        extent: Extent {
            from_dt: sensing_time.clone(),
            to_dt: sensing_time.clone(),
            center_dt: sensing_time,
            coord: geo_ref(global)?,
        },
        format: Format {
            name: FORMAT_NAME.to_string(),
        },
        grid_spatial: GridSpatial {
            projection: Projection {
                geo_ref_points: geo_ref_points(projection_info)?,
                spatial_reference,
                valid_data,
            },
        },
        image: Image {
            bands: bands.bands,
            bands_info: bands.bands_info,
        },
        lineage: Lineage {
            source_datasets: BTreeMap::new(),
        },
    };

    info!("Prepared {} (EPSG:{})", descriptor.label, epsg);
    Ok(descriptor)
}

fn field<'a>(meta: &'a MetadataValue, path: &[&str]) -> Result<&'a MetadataValue> {
    path.iter()
        .try_fold(meta, |node, key| node.get(key))
        .ok_or_else(|| SceneError::MissingField(path.join(".")))
}

fn text<'a>(meta: &'a MetadataValue, path: &[&str]) -> Result<&'a str> {
    field(meta, path)?
        .as_str()
        .ok_or_else(|| SceneError::MissingField(path.join(".")))
}

fn owned(meta: &MetadataValue, path: &[&str]) -> Result<String> {
    text(meta, path).map(str::to_string)
}

fn number(meta: &MetadataValue, key: &str) -> Result<f64> {
    let value = text(meta, &[key])?;
    value.trim().parse().map_err(|_| SceneError::InvalidField {
        field: key.to_string(),
        value: value.to_string(),
    })
}

/// Finds the `UL` and `LR` entries among repeated `tag` elements.
fn diagonal<'a>(
    meta: &'a MetadataValue,
    tag: &str,
) -> Result<(&'a MetadataValue, &'a MetadataValue)> {
    let corners = field(meta, &[tag])?;
    let find = |location: &str| {
        corners
            .items()
            .find(|corner| corner.get("@location").and_then(MetadataValue::as_str) == Some(location))
            .ok_or_else(|| SceneError::MissingField(format!("{}[@location={}]", tag, location)))
    };
    Ok((find("UL")?, find("LR")?))
}

fn geo_ref_points(projection_info: &MetadataValue) -> Result<Corners<Xy>> {
    let (ul, lr) = diagonal(projection_info, "corner_point")?;
    let point = |corner: &MetadataValue| -> Result<Xy> {
        Ok(Xy {
            x: number(corner, "@x")?,
            y: number(corner, "@y")?,
        })
    };
    Ok(Corners::from_diagonal(point(ul)?, point(lr)?, |a, b| Xy {
        x: b.x,
        y: a.y,
    }))
}

fn geo_ref(global: &MetadataValue) -> Result<Corners<LatLon>> {
    let (ul, lr) = diagonal(global, "corner")?;
    let point = |corner: &MetadataValue| -> Result<LatLon> {
        Ok(LatLon {
            lat: number(corner, "@latitude")?,
            lon: number(corner, "@longitude")?,
        })
    };
    Ok(Corners::from_diagonal(point(ul)?, point(lr)?, |a, b| LatLon {
        lat: a.lat,
        lon: b.lon,
    }))
}
