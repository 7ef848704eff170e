use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, SceneError};

/// Where the files of one scene live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneSource {
    Directory(PathBuf),
    TarGz(PathBuf),
    Zip(PathBuf),
}

/// Location of one band file, readable through GDAL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandLocation {
    File(PathBuf),
    InTar { archive: PathBuf, member: String },
    InZip { archive: PathBuf, member: String },
}

impl BandLocation {
    /// Path handed to GDAL, using its virtual file systems for archives.
    pub fn gdal_path(&self) -> String {
        match self {
            BandLocation::File(path) => path.to_string_lossy().into_owned(),
            BandLocation::InTar { archive, member } => {
                format!("/vsitar/{}/{}", archive.display(), member)
            }
            BandLocation::InZip { archive, member } => {
                format!("/vsizip/{}/{}", archive.display(), member)
            }
        }
    }

    /// Path written to the descriptor (`tar:<archive>!<member>` for archives).
    pub fn descriptor_path(&self) -> String {
        match self {
            BandLocation::File(path) => path.to_string_lossy().into_owned(),
            BandLocation::InTar { archive, member } => {
                format!("tar:{}!{}", archive.display(), member)
            }
            BandLocation::InZip { archive, member } => {
                format!("zip:{}!{}", archive.display(), member)
            }
        }
    }
}

/// The metadata sidecar of a scene. Copies extracted from archives are
/// removed when this value is dropped.
#[derive(Debug)]
pub struct MetadataFile {
    path: PathBuf,
    extracted: bool,
}

impl MetadataFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_extracted(&self) -> bool {
        self.extracted
    }
}

impl Drop for MetadataFile {
    fn drop(&mut self) {
        if self.extracted && self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Failed to remove extracted {}: {}", self.path.display(), e);
            }
        }
    }
}

impl SceneSource {
    /// Directories are unpacked scenes, `.gz`/`.tgz` files are tar archives.
    pub fn classify(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(SceneSource::Directory(path.to_path_buf()));
        }
        match path.extension().and_then(|s| s.to_str()) {
            Some("gz") | Some("tgz") => Ok(SceneSource::TarGz(path.to_path_buf())),
            Some("zip") => Ok(SceneSource::Zip(path.to_path_buf())),
            _ => Err(SceneError::Archive {
                path: path.to_path_buf(),
                reason: "not a directory, .tar.gz or .zip".to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SceneSource::Directory(path) | SceneSource::TarGz(path) | SceneSource::Zip(path) => path,
        }
    }

    /// File name of the scene directory or archive.
    pub fn name(&self) -> &str {
        self.path()
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }

    pub fn band_location(&self, file_name: &str) -> BandLocation {
        match self {
            SceneSource::Directory(dir) => BandLocation::File(dir.join(file_name)),
            SceneSource::TarGz(archive) => BandLocation::InTar {
                archive: archive.clone(),
                member: file_name.to_string(),
            },
            SceneSource::Zip(archive) => BandLocation::InZip {
                archive: archive.clone(),
                member: file_name.to_string(),
            },
        }
    }

    /// Finds the `.xml` sidecar. Archived sidecars are extracted into
    /// `scratch_dir`.
    pub fn find_metadata(&self, scratch_dir: &Path) -> Result<MetadataFile> {
        match self {
            SceneSource::Directory(dir) => find_in_directory(dir),
            SceneSource::TarGz(archive) => extract_from_tar(archive, scratch_dir),
            SceneSource::Zip(archive) => extract_from_zip(archive, scratch_dir),
        }
    }
}

fn is_xml(name: &str) -> bool {
    name.ends_with(".xml")
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SceneError + '_ {
    move |source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn find_in_directory(dir: &Path) -> Result<MetadataFile> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .is_some_and(is_xml)
        })
        .collect();
    candidates.sort();

    let path = candidates
        .into_iter()
        .next()
        .ok_or_else(|| SceneError::NoMetadataFile(dir.to_path_buf()))?;
    debug!("Found metadata {}", path.display());
    Ok(MetadataFile {
        path,
        extracted: false,
    })
}

fn extracted_path(scratch_dir: &Path, member: &str) -> PathBuf {
    let file_name = Path::new(member)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(member));
    scratch_dir.join(file_name)
}

fn extract_from_tar(archive_path: &Path, scratch_dir: &Path) -> Result<MetadataFile> {
    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let archive_error = |e: io::Error| SceneError::Archive {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    };

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let member = entry.path().map_err(archive_error)?.to_string_lossy().into_owned();
        if !is_xml(&member) {
            continue;
        }

        let target = extracted_path(scratch_dir, &member);
        entry.unpack(&target).map_err(archive_error)?;
        info!("Extracted {} from {}", member, archive_path.display());
        return Ok(MetadataFile {
            path: target,
            extracted: true,
        });
    }

    Err(SceneError::NoMetadataFile(archive_path.to_path_buf()))
}

fn extract_from_zip(archive_path: &Path, scratch_dir: &Path) -> Result<MetadataFile> {
    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    let archive_error = |e: zip::result::ZipError| SceneError::Archive {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut archive = zip::ZipArchive::new(file).map_err(archive_error)?;

    let mut members: Vec<String> = archive
        .file_names()
        .filter(|name| is_xml(name))
        .map(String::from)
        .collect();
    members.sort();
    let member = members
        .into_iter()
        .next()
        .ok_or_else(|| SceneError::NoMetadataFile(archive_path.to_path_buf()))?;

    let mut zip_file = archive.by_name(&member).map_err(archive_error)?;
    let target = extracted_path(scratch_dir, &member);
    let mut out = File::create(&target).map_err(io_error(&target))?;
    io::copy(&mut zip_file, &mut out).map_err(io_error(&target))?;
    info!("Extracted {} from {}", member, archive_path.display());

    Ok(MetadataFile {
        path: target,
        extracted: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const XML: &[u8] = b"<espa_metadata><global_metadata/></espa_metadata>";

    #[test]
    fn test_classify() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            SceneSource::classify(dir.path()).unwrap(),
            SceneSource::Directory(dir.path().to_path_buf())
        );
        assert!(matches!(
            SceneSource::classify(Path::new("/data/LC08_scene.tar.gz")).unwrap(),
            SceneSource::TarGz(_)
        ));
        assert!(matches!(
            SceneSource::classify(Path::new("/data/LC08_scene.zip")).unwrap(),
            SceneSource::Zip(_)
        ));
        assert!(SceneSource::classify(Path::new("/data/notes.txt")).is_err());
    }

    #[test]
    fn test_band_location_paths() {
        let source = SceneSource::Zip(PathBuf::from("/data/LE07_scene.zip"));
        let location = source.band_location("LE07_sr_band3.tif");
        assert_eq!(location.gdal_path(), "/vsizip//data/LE07_scene.zip/LE07_sr_band3.tif");
        assert_eq!(location.descriptor_path(), "zip:/data/LE07_scene.zip!LE07_sr_band3.tif");
        assert_eq!(source.name(), "LE07_scene.zip");
    }

    #[test]
    fn test_directory_without_xml_is_typed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("band.tif"), b"").unwrap();
        let source = SceneSource::Directory(dir.path().to_path_buf());
        let err = source.find_metadata(dir.path()).unwrap_err();
        assert!(matches!(err, SceneError::NoMetadataFile(_)));
    }

    #[test]
    fn test_directory_metadata_is_not_removed() {
        let dir = TempDir::new().unwrap();
        let xml = dir.path().join("LC08_scene.xml");
        fs::write(&xml, XML).unwrap();

        let source = SceneSource::Directory(dir.path().to_path_buf());
        let metadata = source.find_metadata(dir.path()).unwrap();
        assert_eq!(metadata.path(), xml);
        assert!(!metadata.is_extracted());
        drop(metadata);
        assert!(xml.exists());
    }

    #[test]
    fn test_extract_from_tar_and_cleanup() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("LC08_scene.tar.gz");
        {
            let encoder = GzEncoder::new(File::create(&archive_path).unwrap(), Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_size(XML.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "LC08_scene.xml", XML).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let scratch = TempDir::new().unwrap();
        let source = SceneSource::classify(&archive_path).unwrap();
        let metadata = source.find_metadata(scratch.path()).unwrap();
        let extracted = metadata.path().to_path_buf();
        assert_eq!(extracted, scratch.path().join("LC08_scene.xml"));
        assert_eq!(fs::read(&extracted).unwrap(), XML);

        drop(metadata);
        assert!(!extracted.exists());
    }

    #[test]
    fn test_extract_from_zip() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("LT05_scene.zip");
        {
            let mut writer = zip::ZipWriter::new(File::create(&archive_path).unwrap());
            writer
                .start_file("LT05_scene/LT05_scene.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(XML).unwrap();
            writer.finish().unwrap();
        }

        let scratch = TempDir::new().unwrap();
        let source = SceneSource::classify(&archive_path).unwrap();
        let metadata = source.find_metadata(scratch.path()).unwrap();
        assert_eq!(metadata.path(), scratch.path().join("LT05_scene.xml"));
        assert!(metadata.is_extracted());
    }
}
