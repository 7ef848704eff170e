use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use usgs_l2_prep::{
    process_scene, BatchOptions, GdalRasterReader, SceneOutcome, ValidRegion, ValidRegionService,
};

const SCENE: &str = "LC08_L1TP_091084_20160902_20170321_01_T1";
const SIZE: usize = 20;

fn gtiff_available() -> bool {
    DriverManager::get_driver_by_name("GTiff").is_ok()
}

/// 20x20 UINT16 band, valid samples in the 5..15 square, 30 m pixels.
fn write_band(path: &Path, value: u16) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<u16, _>(path, SIZE, SIZE, 1)
        .unwrap();
    dataset
        .set_geo_transform(&[268200.0, 30.0, 0.0, -3742200.0, 0.0, -30.0])
        .unwrap();
    if let Ok(srs) = SpatialRef::from_epsg(32656) {
        dataset.set_projection(&srs.to_wkt().unwrap()).unwrap();
    }

    let mut samples = vec![0u16; SIZE * SIZE];
    for row in 5..15 {
        for col in 5..15 {
            samples[row * SIZE + col] = value;
        }
    }
    let mut band = dataset.rasterband(1).unwrap();
    let mut buffer = Buffer::new((SIZE, SIZE), samples);
    band.write((0, 0), (SIZE, SIZE), &mut buffer).unwrap();
}

fn sidecar() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<espa_metadata version="2.0" xmlns="http://espa.cr.usgs.gov/v2" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <global_metadata>
    <data_provider>USGS/EROS</data_provider>
    <satellite>LANDSAT_8</satellite>
    <instrument>OLI/TIRS_Combined</instrument>
    <acquisition_date>2016-09-02</acquisition_date>
    <scene_center_time>23:52:38.6760510Z</scene_center_time>
    <level1_production_date>2017-03-21T02:34:17Z</level1_production_date>
    <solar_angles zenith="49.13" azimuth="44.52" units="degrees"/>
    <earth_sun_distance>1.0093</earth_sun_distance>
    <wrs system="2" path="91" row="84"/>
    <product_id>{scene}</product_id>
    <lpgs_metadata_file>{scene}_MTL.txt</lpgs_metadata_file>
    <corner location="UL" latitude="-33.80" longitude="148.50"/>
    <corner location="LR" latitude="-33.81" longitude="148.51"/>
    <projection_information projection="UTM" datum="WGS84" units="meters">
      <corner_point location="UL" x="268200.0" y="-3742200.0"/>
      <corner_point location="LR" x="268800.0" y="-3742800.0"/>
      <utm_proj_params>
        <zone_code>56</zone_code>
      </utm_proj_params>
    </projection_information>
    <orientation_angle>0.0</orientation_angle>
  </global_metadata>
  <bands>
    <band product="sr_refl" name="sr_band2" category="image" data_type="INT16">
      <file_name>{scene}_sr_band2.tif</file_name>
    </band>
    <band product="sr_refl" name="sr_band3" category="image" data_type="INT16">
      <file_name>{scene}_sr_band3.tif</file_name>
    </band>
    <band product="level2_qa" name="pixel_qa" category="qa" data_type="UINT16">
      <file_name>{scene}_pixel_qa.tif</file_name>
    </band>
  </bands>
</espa_metadata>
"#,
        scene = SCENE
    )
}

#[test]
fn test_valid_region_from_geotiffs() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let band2 = temp_dir.path().join("sr_band2.tif");
    let qa = temp_dir.path().join("pixel_qa.tif");
    write_band(&band2, 812);
    write_band(&qa, 322);

    let service = ValidRegionService::<GdalRasterReader>::default();
    let paths = [band2.to_str().unwrap()];
    let region = service.derive(&paths, None).unwrap();
    let polygon = match region {
        ValidRegion::Region(polygon) => polygon,
        ValidRegion::Unavailable => panic!("bands should be readable"),
    };

    use geo::{BoundingRect, Contains, Point};
    let geometry = polygon.geometry();
    let bounds = geometry.bounding_rect().unwrap();
    // pixels 5..15 grow to at most 4..16
    assert!(bounds.min().x >= 268200.0 + 4.0 * 30.0 - 1e-6);
    assert!(bounds.max().x <= 268200.0 + 16.0 * 30.0 + 1e-6);
    assert!(bounds.min().y >= -3742200.0 - 16.0 * 30.0 - 1e-6);
    assert!(bounds.max().y <= -3742200.0 - 4.0 * 30.0 + 1e-6);
    for (col, row) in [(5, 5), (14, 5), (5, 14), (14, 14), (10, 10)] {
        let center = Point::new(
            268200.0 + 30.0 * (col as f64 + 0.5),
            -3742200.0 - 30.0 * (row as f64 + 0.5),
        );
        assert!(geometry.contains(&center), "pixel ({col}, {row}) not covered");
    }

    // 322 has bit 64 set, the fill samples do not
    let masked = service
        .derive(&[qa.to_str().unwrap()], Some(64))
        .unwrap();
    assert!(masked.polygon().is_some());
}

#[test]
fn test_scene_directory_end_to_end() {
    if !gtiff_available() || SpatialRef::from_epsg(32656).is_err() {
        eprintln!("Skipping test: GTiff driver or EPSG database not available");
        return;
    }
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let scene = input.path().join(SCENE);
    fs::create_dir(&scene).unwrap();
    fs::write(scene.join(format!("{}.xml", SCENE)), sidecar()).unwrap();
    write_band(&scene.join(format!("{}_sr_band2.tif", SCENE)), 812);
    write_band(&scene.join(format!("{}_sr_band3.tif", SCENE)), 640);
    write_band(&scene.join(format!("{}_pixel_qa.tif", SCENE)), 322);

    let service = ValidRegionService::<GdalRasterReader>::default();
    let options = BatchOptions {
        output_dir: output.path().to_path_buf(),
        ..Default::default()
    };

    let outcome = process_scene(&scene, &service, &options).unwrap();
    let yaml_path = output.path().join(format!("{}.yaml", SCENE));
    assert_eq!(outcome, SceneOutcome::Written(yaml_path.clone()));

    let yaml: serde_yaml::Value = serde_yaml::from_str(&fs::read_to_string(&yaml_path).unwrap()).unwrap();
    assert_eq!(yaml["label"].as_str(), Some(SCENE));
    assert_eq!(yaml["platform"]["code"].as_str(), Some("LANDSAT_8"));
    assert_eq!(yaml["image"]["bands"]["green"]["layer"].as_u64(), Some(1));
    assert!(yaml["image"]["bands"]["quality"]["path"]
        .as_str()
        .unwrap()
        .ends_with("_pixel_qa.tif"));
    assert!(yaml["grid_spatial"]["projection"]["spatial_reference"]
        .as_str()
        .unwrap()
        .contains("UTM zone 56N"));
    let valid_data = &yaml["grid_spatial"]["projection"]["valid_data"];
    assert_eq!(valid_data["type"].as_str(), Some("Polygon"));
    assert!(valid_data["coordinates"][0].as_sequence().unwrap().len() >= 4);

    // a second run leaves the output alone
    let again = process_scene(&scene, &service, &options).unwrap();
    assert_eq!(again, SceneOutcome::SkippedExisting(yaml_path));
}
