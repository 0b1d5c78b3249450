//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::{self, MEDIA_TOOLS};
use crate::cli::Output;
use crate::config::{ApiKey, Settings};
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks. Returns false when any check errored.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<bool> {
    Output::header("Cutroom Doctor");
    println!();

    let mut checks = Vec::new();

    // Media tools are advisory: the roles choose their own commands.
    println!("{}", style("Media Tools").bold());
    for tool in MEDIA_TOOLS {
        let check = check_media_tool(tool);
        check.print();
        checks.push(check);
    }

    println!();

    println!("{}", style("Model").bold());
    let api_check = check_api_key(settings);
    api_check.print();
    checks.push(api_check);
    Output::kv("model", &settings.model.name);
    if let Some(base_url) = &settings.model.base_url {
        Output::kv("base_url", base_url);
    }

    println!();

    println!("{}", style("Workspace").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running the pipeline.",
            errors
        ));
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Cutroom is ready to use.");
    }

    Ok(errors == 0)
}

fn check_media_tool(name: &str) -> CheckResult {
    match preflight::check_tool(name) {
        Ok(version) => CheckResult::ok(name, &shorten(&version, 50)),
        Err(e) => CheckResult::warning(name, &e.to_string(), install_hint(name)),
    }
}

fn check_api_key(settings: &Settings) -> CheckResult {
    let var = &settings.model.api_key_env;
    match ApiKey::from_env(&settings.model) {
        Ok(key) => CheckResult::ok(var, &format!("configured ({})", key.masked())),
        Err(_) => CheckResult::error(
            var,
            "not set",
            &format!("Set with: export {}='...' or add it to a .env file", var),
        ),
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let working_dir = settings.working_dir();
    if working_dir.is_dir() {
        results.push(CheckResult::ok(
            "Working folder",
            &working_dir.display().to_string(),
        ));
    } else {
        results.push(CheckResult::error(
            "Working folder",
            &format!("{} not found", working_dir.display()),
            "Create it and put the input assets and requirements document inside",
        ));
    }

    let scratch_dir = settings.scratch_dir();
    if scratch_dir.is_dir() {
        results.push(CheckResult::ok(
            "Scratch directory",
            &scratch_dir.display().to_string(),
        ));
    } else {
        results.push(CheckResult::warning(
            "Scratch directory",
            &format!("{} (not created yet)", scratch_dir.display()),
            "The roles create it when they need intermediate files",
        ));
    }

    results
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        match std::fs::read_to_string(config_path)
            .map_err(|e| e.to_string())
            .and_then(|c| toml::from_str::<Settings>(&c).map_err(|e| e.to_string()))
        {
            Ok(_) => CheckResult::ok("Config file", &config_path.display().to_string()),
            Err(e) => CheckResult::error(
                "Config file",
                &format!("invalid: {}", e),
                "Fix the TOML or remove the file to use defaults",
            ),
        }
    } else {
        CheckResult::ok("Config file", "using defaults (no config file)")
    }
}

fn shorten(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Platform-specific install hint for a media tool.
fn install_hint(name: &str) -> &'static str {
    let imagemagick = name == "magick";
    if cfg!(target_os = "macos") {
        if imagemagick {
            "Install with: brew install imagemagick"
        } else {
            "Install with: brew install ffmpeg"
        }
    } else if cfg!(target_os = "linux") {
        if imagemagick {
            "Install with: sudo apt install imagemagick (or your package manager)"
        } else {
            "Install with: sudo apt install ffmpeg (or your package manager)"
        }
    } else if imagemagick {
        "Install from: https://imagemagick.org/script/download.php"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_working_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.workspace.working_dir = dir.path().join("nope").display().to_string();
        let checks = check_directories(&settings);
        assert_eq!(checks[0].status, CheckStatus::Error);
        assert_eq!(checks[1].status, CheckStatus::Warning);
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runner\nmax_tool_iterations = ").unwrap();
        assert_eq!(check_config_file(&path).status, CheckStatus::Error);
        assert_eq!(
            check_config_file(&dir.path().join("absent.toml")).status,
            CheckStatus::Ok
        );
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("ffmpeg version 6.1", 50), "ffmpeg version 6.1");
        assert_eq!(shorten("abcdef", 3), "abc...");
    }
}
