//! HTML artifact assembly.
//!
//! An artifact is one self-contained HTML file: the stylesheet, the banner
//! assets and a script bundle whose data module is the analysis output.
//! Everything is streamed into a temporary file next to the destination,
//! which replaces the destination only once the whole page was written.

pub mod bundle;
pub mod serialize;
pub mod template;

// Re-export main types and functions
pub use bundle::Bundle;
pub use serialize::{write_records, ScriptSafeWriter};

use crate::utils::config::{default_assets_dir, ARTIFACT_TITLE};
use crate::utils::error::{AnalysisError, AssemblyError};
use log::{debug, info};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Input files of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSources {
    /// Entry module of the visualizer script
    pub script_entry: PathBuf,

    /// Path the entry requires for its data; never read from disk
    pub data_module: PathBuf,

    pub style: PathBuf,

    /// Copied into the banner in order
    pub assets: Vec<PathBuf>,
}

impl ArtifactSources {
    /// Standard layout of an asset directory
    ///
    /// ```text
    /// <dir>/visualizer/main.js
    /// <dir>/visualizer/data.json   (generated)
    /// <dir>/visualizer/style.css
    /// <dir>/visualizer/logo.svg
    /// ```
    pub fn from_assets_dir(dir: impl AsRef<Path>) -> Self {
        let visualizer = dir.as_ref().join("visualizer");
        Self {
            script_entry: visualizer.join("main.js"),
            data_module: visualizer.join("data.json"),
            style: visualizer.join("style.css"),
            assets: vec![visualizer.join("logo.svg")],
        }
    }
}

impl Default for ArtifactSources {
    fn default() -> Self {
        Self::from_assets_dir(default_assets_dir())
    }
}

/// Outcome of a successful assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub output: PathBuf,
    pub bytes: u64,
    pub records: usize,
}

/// Stream `records` into a new artifact at `output`
///
/// **Public** - final stage of the visualize pipeline
///
/// # Arguments
/// * `records` - analysis output, consumed lazily in order
/// * `sources` - stylesheet, assets and script entry
/// * `output` - destination file; replaced only on success
///
/// # Returns
/// The written path, its size and the number of embedded records
///
/// # Errors
/// * `AssemblyError::InvalidPath` - `output` is empty or a directory
/// * `AssemblyError::UnresolvedModule` / `ReadAsset` - broken script tree or asset
/// * `AssemblyError::MissingDataModule` - the script entry never requires the data module
/// * `AssemblyError::Analysis` - the record stream failed
/// * `AssemblyError::Write` / `Persist` - the file could not be written or moved
pub fn assemble<T, I>(
    records: I,
    sources: &ArtifactSources,
    output: impl AsRef<Path>,
) -> Result<ArtifactSummary, AssemblyError>
where
    T: Serialize,
    I: IntoIterator<Item = Result<T, AnalysisError>>,
{
    let output = output.as_ref();
    info!("Assembling artifact: {}", output.display());

    validate_path(output)?;
    let parent = output_dir(output);
    if !parent.exists() {
        debug!("Creating parent directories: {}", parent.display());
        std::fs::create_dir_all(&parent).map_err(|e| {
            AssemblyError::InvalidPath(format!(
                "Cannot create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let bundle = Bundle::resolve(&sources.script_entry, &sources.data_module)?;
    // The records are only pulled while the data module is written
    if !bundle.includes_generated() {
        return Err(AssemblyError::MissingDataModule {
            entry: sources.script_entry.clone(),
            data: sources.data_module.clone(),
        });
    }

    let temp = NamedTempFile::new_in(&parent)?;
    let mut count = 0;
    {
        let mut writer = BufWriter::new(temp.as_file());
        template::render(
            &mut writer,
            ARTIFACT_TITLE,
            &sources.style,
            &sources.assets,
            |out| {
                bundle.write(out, |data| {
                    count = write_records(data, records)?;
                    Ok(())
                })
            },
        )?;
        writer.flush()?;
    }

    let bytes = temp.as_file().metadata()?.len();
    publish_permissions(&temp)?;
    temp.persist(output).map_err(|e| AssemblyError::Persist {
        path: output.to_path_buf(),
        source: e.error,
    })?;

    info!(
        "Artifact written successfully ({} records, {:.2} KB)",
        count,
        bytes as f64 / 1024.0
    );

    Ok(ArtifactSummary {
        output: output.to_path_buf(),
        bytes,
        records: count,
    })
}

fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Temp files are created owner-only; the artifact is meant to be shared
#[cfg(unix)]
fn publish_permissions(temp: &NamedTempFile) -> Result<(), AssemblyError> {
    use std::os::unix::fs::PermissionsExt;
    temp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn publish_permissions(_temp: &NamedTempFile) -> Result<(), AssemblyError> {
    Ok(())
}

/// Validate the artifact destination
///
/// **Private** - internal validation
fn validate_path(path: &Path) -> Result<(), AssemblyError> {
    if path.as_os_str().is_empty() {
        return Err(AssemblyError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(AssemblyError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if path.extension().map_or(true, |ext| ext != "html") {
        debug!("Warning: File does not have .html extension: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::fs;

    fn sources(dir: &Path) -> ArtifactSources {
        let visualizer = dir.join("visualizer");
        fs::create_dir_all(&visualizer).unwrap();
        fs::write(
            visualizer.join("main.js"),
            "var data = require('./data.json')\ndocument.title = data.length\n",
        )
        .unwrap();
        fs::write(visualizer.join("style.css"), "body{}").unwrap();
        fs::write(visualizer.join("logo.svg"), "<svg/>").unwrap();
        ArtifactSources::from_assets_dir(dir)
    }

    #[test]
    fn test_assemble_writes_artifact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sources = sources(temp_dir.path());
        let output = temp_dir.path().join("out/run.html");

        let records: Vec<Result<Value, AnalysisError>> = vec![Ok(json!({"a": 1})), Ok(json!(2))];
        let summary = assemble(records, &sources, &output).unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.output, output);
        let html = fs::read_to_string(&output).unwrap();
        assert_eq!(summary.bytes, html.len() as u64);
        assert!(html.contains("module.exports = [\n{\"a\":1},\n2\n]\n;"));
    }

    #[test]
    fn test_failure_leaves_no_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sources = sources(temp_dir.path());
        let output = temp_dir.path().join("run.html");

        let records: Vec<Result<Value, AnalysisError>> =
            vec![Ok(json!(1)), Err(AnalysisError::MissingSystemInfo)];
        let err = assemble(records, &sources, &output).unwrap_err();

        assert!(matches!(err, AssemblyError::Analysis(_)));
        assert!(!output.exists());
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_entry_without_data_module_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sources = sources(temp_dir.path());
        fs::write(&sources.script_entry, "console.log('no data')\n").unwrap();
        let output = temp_dir.path().join("run.html");

        let records: Vec<Result<Value, AnalysisError>> =
            vec![Err(AnalysisError::MissingSystemInfo)];
        let err = assemble(records, &sources, &output).unwrap_err();

        assert!(matches!(err, AssemblyError::MissingDataModule { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_directory_output_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sources = sources(temp_dir.path());

        let err = assemble(Vec::<Result<Value, AnalysisError>>::new(), &sources, temp_dir.path())
            .unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidPath(_)));
    }

    #[test]
    fn test_from_assets_dir_layout() {
        let sources = ArtifactSources::from_assets_dir("/opt/assets");
        assert_eq!(sources.script_entry, PathBuf::from("/opt/assets/visualizer/main.js"));
        assert_eq!(sources.data_module, PathBuf::from("/opt/assets/visualizer/data.json"));
        assert_eq!(sources.assets, vec![PathBuf::from("/opt/assets/visualizer/logo.svg")]);
    }
}
