use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, SceneError};
use crate::model::MetadataValue;
use crate::scene::SceneSource;

/// Aliases shared by the TM and ETM+ level-2 products.
const TM_ETM_ALIASES: &[(&str, &str)] = &[
    ("pixel_qa", "quality"),
    ("solar_zenith_band4", "solar_zenith_band4"),
    ("solar_azimuth_band4", "solar_azimuth_band4"),
    ("sensor_zenith_band4", "sensor_zenith_band4"),
    ("sensor_azimuth_band4", "sensor_azimuth_band4"),
    ("radsat_qa", "radsat_qa"),
    ("bt_band6", "lwir1"),
    ("sr_band1", "blue"),
    ("sr_band2", "green"),
    ("sr_band3", "red"),
    ("sr_band4", "nir"),
    ("sr_band5", "swir1"),
    ("sr_band7", "swir2"),
    ("sr_atmos_opacity", "sr_atmos_opacity"),
    ("sr_cloud_qa", "sr_cloud_qa"),
];

const OLI_TIRS_ALIASES: &[(&str, &str)] = &[
    ("pixel_qa", "quality"),
    ("solar_zenith_band4", "solar_zenith_band4"),
    ("solar_azimuth_band4", "solar_azimuth_band4"),
    ("sensor_zenith_band4", "sensor_zenith_band4"),
    ("sensor_azimuth_band4", "sensor_azimuth_band4"),
    ("radsat_qa", "radsat_qa"),
    ("bt_band10", "lwir1"),
    ("bt_band11", "lwir2"),
    ("sr_band1", "coastal_aerosol"),
    ("sr_band2", "blue"),
    ("sr_band3", "green"),
    ("sr_band4", "red"),
    ("sr_band5", "nir"),
    ("sr_band6", "swir1"),
    ("sr_band7", "swir2"),
    ("sr_aerosol", "sr_aerosol"),
];

fn alias_table(sensor: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match sensor {
        "LT04" | "LT05" | "LE07" => Some(TM_ETM_ALIASES),
        "LC08" => Some(OLI_TIRS_ALIASES),
        _ => None,
    }
}

/// Sensor code is the first four characters of the scene name, e.g. `LC08`.
pub fn sensor_code(scene_name: &str) -> &str {
    match scene_name.char_indices().nth(4) {
        Some((end, _)) => &scene_name[..end],
        None => scene_name,
    }
}

/// Canonical alias of a raw band name such as `sr_band1`.
pub fn band_alias(sensor: &str, band: &str) -> Result<&'static str> {
    let table = alias_table(sensor).ok_or_else(|| SceneError::UnknownSensor(sensor.to_string()))?;
    table
        .iter()
        .find(|(raw, _)| *raw == band)
        .map(|(_, alias)| *alias)
        .ok_or_else(|| SceneError::UnknownBand {
            sensor: sensor.to_string(),
            band: band.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandRef {
    pub path: String,
    pub layer: u32,
}

/// Bands of one scene keyed by alias.
#[derive(Debug, Clone, Default)]
pub struct SceneBands {
    /// GDAL paths of the surface-reflectance bands.
    pub reflectance_paths: Vec<String>,
    pub bands: BTreeMap<String, BandRef>,
    pub bands_info: BTreeMap<String, MetadataValue>,
}

/// Builds band references and normalized band metadata from the `bands`
/// element of the sidecar.
pub fn collect_bands(bands_meta: &MetadataValue, source: &SceneSource) -> Result<SceneBands> {
    let sensor = sensor_code(source.name());
    let band_list = bands_meta
        .get("band")
        .ok_or_else(|| SceneError::MissingField("bands.band".to_string()))?;

    let mut scene_bands = SceneBands::default();
    for band in band_list.items() {
        let entries = band
            .as_map()
            .ok_or_else(|| SceneError::MissingField("bands.band.@name".to_string()))?;
        let raw_name = band
            .get("@name")
            .and_then(MetadataValue::as_str)
            .ok_or_else(|| SceneError::MissingField("bands.band.@name".to_string()))?;
        let alias = band_alias(sensor, raw_name)?;

        let mut info = normalize_band_info(entries);
        let file_name = match info.remove("file_name") {
            Some(MetadataValue::Text(name)) => name,
            _ => return Err(SceneError::MissingField(format!("band {}: file_name", raw_name))),
        };

        let location = source.band_location(&file_name);
        if file_name.contains("sr_band") {
            scene_bands.reflectance_paths.push(location.gdal_path());
        }
        scene_bands.bands.insert(
            alias.to_string(),
            BandRef {
                path: location.descriptor_path(),
                layer: 1,
            },
        );
        scene_bands
            .bands_info
            .insert(alias.to_string(), MetadataValue::Map(info));
        debug!("Band {} -> {} ({})", raw_name, alias, file_name);
    }

    Ok(scene_bands)
}

fn normalize_band_info(entries: &BTreeMap<String, MetadataValue>) -> BTreeMap<String, MetadataValue> {
    let mut info = BTreeMap::new();
    for (key, value) in entries {
        let value = match key.as_str() {
            "@data_type" => match value {
                MetadataValue::Text(t) => MetadataValue::Text(t.to_lowercase()),
                other => other.clone(),
            },
            "pixel_size" | "valid_range" => match value {
                MetadataValue::Map(sub) => MetadataValue::Map(
                    sub.iter()
                        .map(|(k, v)| (strip_attr(k).to_string(), v.clone()))
                        .collect(),
                ),
                other => other.clone(),
            },
            "bitmap_description" => bit_descriptions(value),
            _ => value.clone(),
        };
        info.insert(strip_attr(key).to_string(), value);
    }
    info
}

/// `<bit num="0">Fill</bit>...` -> `{"0": "Fill", ...}`
fn bit_descriptions(value: &MetadataValue) -> MetadataValue {
    let bits = value
        .get("bit")
        .map(|bits| {
            bits.items()
                .filter_map(|bit| {
                    let num = bit.get("@num")?.as_str()?;
                    let text = bit.get("#text").cloned().unwrap_or(MetadataValue::Null);
                    Some((num.to_string(), text))
                })
                .collect()
        })
        .unwrap_or_default();
    MetadataValue::Map(bits)
}

fn strip_attr(key: &str) -> &str {
    key.strip_prefix('@').unwrap_or(key)
}
