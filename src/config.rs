//! Editor configuration module.
//!
//! Handles loading, validating, and merging `retouch.toml`. Stock defaults are
//! the base layer; a user config file overrides any subset of keys on top.
//!
//! ## Config File Location
//!
//! `retouch` looks for `retouch.toml` in the working directory, or uses the
//! file passed with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [upload]
//! max_bytes = 10485760        # Largest accepted upload (10 MiB)
//!
//! [preview]
//! blur_scale = 10.0           # Blur radius in px at 100% intensity
//!
//! [export]
//! filename_prefix = "edited-" # Exported file is <prefix><name>
//!
//! [services]
//! # timeout_secs = 60         # Omit for no timeout
//!
//! [services.remove_bg]
//! endpoint = "https://api.remove.bg/v1.0/removebg"
//! size = "auto"
//!
//! [services.inpaint]
//! endpoint = "https://fal.run/fal-ai/flux-lora-fill"
//! max_width = 1024
//! max_height = 1024
//! jpeg_quality = 80
//!
//! [processing]
//! max_threads = 4             # Omit for auto = CPU cores
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! # Reproduce the cheaper legacy preview blur
//! [preview]
//! blur_scale = 5.0
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, UploadPrep};
use crate::services::{fal, remove_bg};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "retouch.toml";

/// Output sizes the remove.bg API accepts.
const REMOVE_BG_SIZES: &[&str] = &[
    "auto", "preview", "small", "regular", "medium", "hd", "full", "4k", "50MP",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `retouch.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Upload validation.
    pub upload: UploadConfig,
    /// Live preview settings.
    pub preview: PreviewConfig,
    /// Export naming.
    pub export: ExportConfig,
    /// External AI services.
    pub services: ServicesConfig,
    /// Parallel pixel processing.
    pub processing: ProcessingConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "upload.max_bytes must be greater than zero".into(),
            ));
        }
        if !self.preview.blur_scale.is_finite() || self.preview.blur_scale < 0.0 {
            return Err(ConfigError::Validation(
                "preview.blur_scale must be a non-negative number".into(),
            ));
        }
        if self.export.filename_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "export.filename_prefix must not contain path separators".into(),
            ));
        }
        if self.services.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "services.timeout_secs must be greater than zero".into(),
            ));
        }
        check_endpoint("services.remove_bg.endpoint", &self.services.remove_bg.endpoint)?;
        check_endpoint("services.inpaint.endpoint", &self.services.inpaint.endpoint)?;
        if !REMOVE_BG_SIZES.contains(&self.services.remove_bg.size.as_str()) {
            return Err(ConfigError::Validation(format!(
                "services.remove_bg.size must be one of: {}",
                REMOVE_BG_SIZES.join(", ")
            )));
        }
        let inpaint = &self.services.inpaint;
        if inpaint.max_width == 0 || inpaint.max_height == 0 {
            return Err(ConfigError::Validation(
                "services.inpaint max_width/max_height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&inpaint.jpeg_quality) {
            return Err(ConfigError::Validation(
                "services.inpaint.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

fn check_endpoint(key: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must be an http(s) URL")))
    }
}

/// Upload validation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Uploads larger than this many bytes are rejected.
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Live preview settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Blur radius in pixels at 100% intensity. Export always uses 10.
    pub blur_scale: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            blur_scale: crate::imaging::calculations::EXPORT_BLUR_SCALE,
        }
    }
}

/// Export naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub filename_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename_prefix: "edited-".to_string(),
        }
    }
}

/// External service settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesConfig {
    /// Overall per-request timeout. When absent, requests never time out.
    pub timeout_secs: Option<u64>,
    pub remove_bg: RemoveBgConfig,
    pub inpaint: InpaintConfig,
}

impl ServicesConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoveBgConfig {
    pub endpoint: String,
    /// Requested output size, `auto` picks the largest the plan allows.
    pub size: String,
}

impl Default for RemoveBgConfig {
    fn default() -> Self {
        Self {
            endpoint: remove_bg::DEFAULT_ENDPOINT.to_string(),
            size: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InpaintConfig {
    pub endpoint: String,
    /// Images are shrunk to fit these bounds before upload.
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality of the uploaded image.
    pub jpeg_quality: u32,
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            endpoint: fal::DEFAULT_ENDPOINT.to_string(),
            max_width: 1024,
            max_height: 1024,
            jpeg_quality: 80,
        }
    }
}

impl InpaintConfig {
    pub fn upload_prep(&self) -> UploadPrep {
        UploadPrep {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: Quality::new(self.jpeg_quality),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of threads for pixel passes.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EditorConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config.
///
/// An explicit `path` must exist. Without one, `retouch.toml` in `cwd` is
/// used when present, otherwise the stock defaults.
pub fn load_config(path: Option<&Path>, cwd: &Path) -> Result<EditorConfig, ConfigError> {
    let overlay = match path {
        Some(explicit) => {
            let content = fs::read_to_string(explicit)?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(&cwd.join(CONFIG_FILE_NAME))?,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `retouch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# retouch configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# Largest accepted upload in bytes (10 MiB).
max_bytes = 10485760

# ---------------------------------------------------------------------------
# Live preview
# ---------------------------------------------------------------------------
[preview]
# Blur radius in pixels at 100% intensity. Export always uses 10.0, so the
# default keeps preview and export identical. 5.0 gives the cheaper legacy
# preview.
blur_scale = 10.0

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# The exported PNG is written as <filename_prefix><image name>.
filename_prefix = "edited-"

# ---------------------------------------------------------------------------
# External services
# ---------------------------------------------------------------------------
[services]
# Overall timeout per request, in seconds. Omit for no timeout.
# timeout_secs = 60

[services.remove_bg]
endpoint = "https://api.remove.bg/v1.0/removebg"
# One of: auto, preview, small, regular, medium, hd, full, 4k, 50MP
size = "auto"

[services.inpaint]
endpoint = "https://fal.run/fal-ai/flux-lora-fill"
# The image is shrunk to fit these bounds and re-encoded as JPEG before upload.
max_width = 1024
max_height = 1024
jpeg_quality = 80

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum threads for filter passes.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = EditorConfig::default();
        assert_eq!(config.upload.max_bytes, 10_485_760);
        assert_eq!(config.preview.blur_scale, 10.0);
        assert_eq!(config.export.filename_prefix, "edited-");
        assert_eq!(config.services.remove_bg.size, "auto");
        assert_eq!(config.services.inpaint.max_width, 1024);
        assert_eq!(config.services.inpaint.jpeg_quality, 80);
        assert_eq!(config.services.timeout_secs, None);
        assert_eq!(config.processing.max_threads, None);
    }

    #[test]
    fn parse_partial_config() {
        let config: EditorConfig = toml::from_str(
            r#"
[preview]
blur_scale = 5.0
"#,
        )
        .unwrap();
        assert_eq!(config.preview.blur_scale, 5.0);
        assert_eq!(config.upload.max_bytes, 10_485_760);
    }

    #[test]
    fn inpaint_upload_prep() {
        let prep = InpaintConfig::default().upload_prep();
        assert_eq!(prep, UploadPrep::default());
    }

    #[test]
    fn services_timeout() {
        let mut services = ServicesConfig::default();
        assert_eq!(services.timeout(), None);
        services.timeout_secs = Some(30);
        assert_eq!(services.timeout(), Some(Duration::from_secs(30)));
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_threads: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_threads: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_threads: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"max_bytes = 10"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"max_bytes = 20"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("max_bytes").unwrap().as_integer(), Some(20));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str(
            r#"
[services.inpaint]
max_width = 1024
jpeg_quality = 80
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[services.inpaint]
jpeg_quality = 60
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let inpaint = merged.get("services").unwrap().get("inpaint").unwrap();
        assert_eq!(inpaint.get("jpeg_quality").unwrap().as_integer(), Some(60));
        assert_eq!(inpaint.get("max_width").unwrap().as_integer(), Some(1024));
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<EditorConfig, _> = toml::from_str(
            r#"
[preview]
blur_scael = 5.0
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<EditorConfig, _> = toml::from_str("[uploads]\nmax_bytes = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<EditorConfig, _> =
            toml::from_str("[services.remove_bg]\napi_key = \"x\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_upload_cap() {
        let mut config = EditorConfig::default();
        config.upload.max_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_blur_scale() {
        let mut config = EditorConfig::default();
        config.preview.blur_scale = -1.0;
        assert!(config.validate().is_err());
        config.preview.blur_scale = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_prefix_with_separator() {
        let mut config = EditorConfig::default();
        config.export.filename_prefix = "../".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("filename_prefix"));
    }

    #[test]
    fn validate_jpeg_quality_range() {
        let mut config = EditorConfig::default();
        config.services.inpaint.jpeg_quality = 100;
        assert!(config.validate().is_ok());
        config.services.inpaint.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.services.inpaint.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_remove_bg_size() {
        let mut config = EditorConfig::default();
        config.services.remove_bg.size = "hd".to_string();
        assert!(config.validate().is_ok());
        config.services.remove_bg.size = "huge".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_endpoints_are_urls() {
        let mut config = EditorConfig::default();
        config.services.inpaint.endpoint = "fal-ai/flux-lora-fill".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("services.inpaint.endpoint"));
    }

    #[test]
    fn validate_zero_timeout() {
        let mut config = EditorConfig::default();
        config.services.timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn load_config_reads_cwd_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[export]
filename_prefix = "retouched-"
"#,
        )
        .unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config.export.filename_prefix, "retouched-");
        assert_eq!(config.preview.blur_scale, 10.0);
    }

    #[test]
    fn load_config_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[upload]\nmax_bytes = 2048\n").unwrap();
        let config = load_config(Some(&path), tmp.path()).unwrap();
        assert_eq!(config.upload.max_bytes, 2048);
    }

    #[test]
    fn load_config_missing_explicit_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")), tmp.path());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "not valid toml [[[").unwrap();
        assert!(matches!(
            load_config(None, tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[services.inpaint]\njpeg_quality = 200\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(None, tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(&tmp.path().join(CONFIG_FILE_NAME)).unwrap().is_none());
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: EditorConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[upload]",
            "[preview]",
            "[export]",
            "[services]",
            "[services.remove_bg]",
            "[services.inpaint]",
            "[processing]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for key in ["upload", "preview", "export", "services", "processing"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn resolve_config_with_overlay() {
        let overlay: toml::Value = toml::from_str("[preview]\nblur_scale = 5.0\n").unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.preview.blur_scale, 5.0);
        assert_eq!(config.export.filename_prefix, "edited-");
    }
}
