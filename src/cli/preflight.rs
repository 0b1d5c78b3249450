//! Pre-flight checks before starting the pipeline.
//!
//! Validates that the working folder exists before any model call is made,
//! and warns about media tools the roles are likely to reach for.

use crate::config::Settings;
use crate::error::{CutroomError, Result};
use std::process::Command;
use tracing::warn;

/// Media tools the stage prompts advertise to the model.
pub const MEDIA_TOOLS: [&str; 3] = ["ffmpeg", "ffprobe", "magick"];

/// Run pre-flight checks for a pipeline run.
///
/// Missing media tools are only warned about: the model may work around them.
pub fn check(settings: &Settings) -> Result<()> {
    check_working_dir(settings)?;
    for tool in MEDIA_TOOLS {
        if let Err(e) = check_tool(tool) {
            warn!("{}", e);
        }
    }
    Ok(())
}

/// Check that the working folder exists and is a directory.
pub fn check_working_dir(settings: &Settings) -> Result<()> {
    let dir = settings.working_dir();
    if dir.is_dir() {
        Ok(())
    } else {
        Err(CutroomError::Config(format!(
            "Working folder {} not found. Put the input assets and the requirements document there, \
            or set workspace.working_dir in the config file.",
            dir.display()
        )))
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<String> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("installed")
            .trim()
            .to_string()),
        Ok(_) => Err(CutroomError::Config(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CutroomError::Config(format!(
            "External tool not found: {}. Please install it and ensure it's in your PATH.",
            name
        ))),
        Err(e) => Err(CutroomError::Config(format!("{}: {}", name, e))),
    }
}
