//! Fixed HTML skeleton of the artifact.
//!
//! Slots are filled strictly in document order, each by copying its source
//! straight into the output.

use crate::utils::error::AssemblyError;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Render the page into `out`
///
/// **Public** - called once per artifact by `assemble`
///
/// # Arguments
/// * `out` - destination writer
/// * `title` - page title
/// * `style` - stylesheet copied into `<style>`
/// * `assets` - files copied, in order, into the banner
/// * `script` - writes the `<script>` body
///
/// # Errors
/// * `AssemblyError::ReadAsset` - the stylesheet or an asset could not be read
/// * `AssemblyError::Write` - the output rejected a write
/// * any error returned by `script`
pub fn render<W, F>(
    out: &mut W,
    title: &str,
    style: &Path,
    assets: &[PathBuf],
    script: F,
) -> Result<(), AssemblyError>
where
    W: Write,
    F: FnOnce(&mut W) -> Result<(), AssemblyError>,
{
    out.write_all(b"<!DOCTYPE html>\n<meta charset=\"utf8\">\n")?;
    writeln!(out, "<title>{}</title>", escape_text(title))?;

    out.write_all(b"<style>")?;
    copy_file(style, out)?;
    out.write_all(b"</style>\n")?;

    out.write_all(b"<div id=\"banner\">")?;
    for asset in assets {
        copy_file(asset, out)?;
    }
    out.write_all(b"</div>\n")?;

    out.write_all(b"<script>")?;
    script(out)?;
    out.write_all(b"</script>\n")?;

    Ok(())
}

fn copy_file<W: Write>(path: &Path, out: &mut W) -> Result<u64, AssemblyError> {
    let read_error = |source| AssemblyError::ReadAsset {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_error)?;

    // io::copy cannot tell a failed read from a failed write
    let mut buf = [0u8; 8192];
    let mut copied = 0u64;
    loop {
        let n = match io::Read::read(&mut file, &mut buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        out.write_all(&buf[..n])?;
        copied += n as u64;
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
