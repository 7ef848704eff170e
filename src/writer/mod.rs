use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::descriptor::Descriptor;

/// Output file of a scene: `<output_dir>/<xml stem>.yaml`.
pub fn output_path(output_dir: &Path, xml_path: &Path) -> PathBuf {
    let stem = xml_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("descriptor");
    output_dir.join(format!("{}.yaml", stem))
}

#[derive(Default)]
pub struct DescriptorWriter {}

impl DescriptorWriter {
    pub fn new() -> Self {
        Self {}
    }

    /// Writes one YAML document via a `.yaml.partial` sibling that is renamed
    /// into place.
    pub fn write(&self, descriptor: &Descriptor, output_path: &Path) -> Result<()> {
        let partial = output_path.with_extension("yaml.partial");

        {
            let file = File::create(&partial)
                .with_context(|| format!("Failed to create {}", partial.display()))?;
            let mut out = BufWriter::new(file);
            serde_yaml::to_writer(&mut out, descriptor)
                .context("Failed to serialize descriptor")?;
            out.flush()
                .with_context(|| format!("Failed to write {}", partial.display()))?;
        }

        fs::rename(&partial, output_path).with_context(|| {
            format!(
                "Failed to move {} to {}",
                partial.display(),
                output_path.display()
            )
        })?;

        tracing::info!("Written descriptor: {}", output_path.display());
        Ok(())
    }
}
