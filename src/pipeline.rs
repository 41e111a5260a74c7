//! Visualize phase: decode a run's logs, analyze them and assemble the
//! HTML artifact in one streaming pass.

use crate::analysis::{Analysis, AsyncGraphAnalysis};
use crate::artifact::{assemble, ArtifactSources, ArtifactSummary};
use crate::collect::LoggingPaths;
use crate::decoder::open_streams;
use crate::utils::error::VisualizeError;
use log::debug;
use std::path::Path;

/// Options for the visualize phase
#[derive(Debug, Clone, Default)]
pub struct VisualizeOptions {
    pub sources: ArtifactSources,
}

/// Build the artifact for the run stored in `data_dir` with the default engine
///
/// **Public** - main entry point of the visualize phase
///
/// # Arguments
/// * `data_dir` - log directory written by `collect`
/// * `output` - HTML file to write
/// * `options` - artifact sources
///
/// # Errors
/// * `VisualizeError::Paths` - `data_dir` is not a log directory
/// * `VisualizeError::Assembly` - decoding, analysis or writing failed; no
///   artifact is left behind
pub fn visualize(
    data_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &VisualizeOptions,
) -> Result<ArtifactSummary, VisualizeError> {
    visualize_with(AsyncGraphAnalysis, data_dir, output, options)
}

/// Same as [`visualize`], with a caller-chosen analysis engine
pub fn visualize_with<A: Analysis>(
    analysis: A,
    data_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &VisualizeOptions,
) -> Result<ArtifactSummary, VisualizeError> {
    let paths = LoggingPaths::from_directory(data_dir)?;
    debug!("Decoding logs of run {}", paths.identifier);

    let streams = open_streams(&paths);
    let records = analysis.analyze(streams);

    Ok(assemble(records, &options.sources, output)?)
}
