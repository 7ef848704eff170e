use gdal::spatial_ref::SpatialRef;

use crate::error::{Result, SceneError};

const WGS84_UTM_NORTH_BASE: u32 = 32600;

/// EPSG code of the WGS 84 / UTM zone given by the sidecar's `zone_code`.
pub fn utm_epsg(zone_code: &str) -> Result<u32> {
    let invalid = || SceneError::InvalidField {
        field: "projection_information.utm_proj_params.zone_code".to_string(),
        value: zone_code.to_string(),
    };
    let zone: u32 = zone_code.trim().parse().map_err(|_| invalid())?;
    if !(1..=60).contains(&zone) {
        return Err(invalid());
    }
    Ok(WGS84_UTM_NORTH_BASE + zone)
}

pub fn epsg_to_wkt(epsg: u32) -> Result<String> {
    SpatialRef::from_epsg(epsg)
        .and_then(|srs| srs.to_wkt())
        .map_err(|source| SceneError::Crs { epsg, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_epsg() {
        assert_eq!(utm_epsg("55").unwrap(), 32655);
        assert_eq!(utm_epsg(" 1 ").unwrap(), 32601);
        assert!(utm_epsg("0").is_err());
        assert!(utm_epsg("61").is_err());
        assert!(utm_epsg("-55").is_err());
        assert!(utm_epsg("abc").is_err());
    }

    #[test]
    fn test_epsg_to_wkt() {
        // needs the PROJ database at runtime
        match epsg_to_wkt(32655) {
            Ok(wkt) => assert!(wkt.contains("UTM zone 55N"), "unexpected WKT: {wkt}"),
            Err(e) => eprintln!("Skipping test: {e}"),
        }
    }
}
