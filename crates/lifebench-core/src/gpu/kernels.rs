//! Kernel image preparation.
//!
//! The CUDA source is compiled to a PTX image stored next to it, with the
//! extension replaced by `ptx`. An existing image is reused according to
//! [`ImageCachePolicy`]:
//!
//! - `ReuseExisting` reuses any image found, without checking whether the
//!   source changed since it was built.
//! - `SourceHash` records the SHA-256 of the source in a `<image>.sha256`
//!   sidecar and rebuilds when it no longer matches.
//!
//! The compiler is invoked as
//! `<compiler> <extra args> -m<pointer width> -ptx <source> -o <image>`.

use crate::config::{ImageCachePolicy, KernelConfig};
use crate::core::error::{EngineError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Module name under which the image is loaded.
pub const MODULE_NAME: &str = "lifebench";

/// Entry point of the flat-layout step kernel.
pub const FLAT_ENTRY: &str = "life_step_flat";

/// Entry point of the row-indirect step kernel.
pub const ROWS_ENTRY: &str = "life_step_rows";

/// Path of the image compiled from `source`.
pub fn image_path_for(source: &Path) -> PathBuf {
    source.with_extension("ptx")
}

/// Path of the hash sidecar of `image`.
pub fn hash_path_for(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn hash_source(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Returns the path of a loadable image for `config.source`, compiling it
/// if needed.
pub fn prepare_image(config: &KernelConfig) -> Result<PathBuf> {
    let source = config.source.as_path();
    let image = image_path_for(source);

    match config.cache_policy {
        ImageCachePolicy::ReuseExisting => {
            if image.is_file() {
                debug!(image = %image.display(), "reusing kernel image");
                return Ok(image);
            }
            compile(config, source, &image)?;
        }
        ImageCachePolicy::SourceHash => {
            let digest = hash_source(&read_source(source)?);
            let sidecar = hash_path_for(&image);
            let recorded = fs::read_to_string(&sidecar).ok();
            if image.is_file() && recorded.as_deref().map(str::trim) == Some(digest.as_str()) {
                debug!(image = %image.display(), "kernel image matches source hash");
                return Ok(image);
            }
            compile(config, source, &image)?;
            fs::write(&sidecar, &digest).map_err(|e| {
                EngineError::backend_unavailable(format!(
                    "cannot record kernel hash in {}: {}",
                    sidecar.display(),
                    e
                ))
            })?;
        }
    }

    Ok(image)
}

fn read_source(source: &Path) -> Result<Vec<u8>> {
    fs::read(source).map_err(|e| {
        EngineError::backend_unavailable(format!(
            "cannot read kernel source {}: {}",
            source.display(),
            e
        ))
    })
}

fn compile(config: &KernelConfig, source: &Path, image: &Path) -> Result<()> {
    if !source.is_file() {
        return Err(EngineError::backend_unavailable(format!(
            "kernel source {} not found",
            source.display()
        )));
    }

    let mut command = Command::new(&config.compiler);
    command
        .args(&config.compiler_args)
        .arg(format!("-m{}", usize::BITS))
        .arg("-ptx")
        .arg(source)
        .arg("-o")
        .arg(image);
    info!(compiler = %config.compiler, source = %source.display(), "compiling kernel image");

    let output = command.output().map_err(|e| {
        EngineError::backend_unavailable(format!("cannot run {}: {}", config.compiler, e))
    })?;

    if !output.status.success() {
        return Err(EngineError::backend_unavailable(format!(
            "{} exited with {}: {}",
            config.compiler,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    if !image.is_file() {
        return Err(EngineError::backend_unavailable(format!(
            "{} produced no image at {}",
            config.compiler,
            image.display()
        )));
    }

    Ok(())
}
