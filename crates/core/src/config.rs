//! Operational settings, loaded once at startup and threaded through
//! constructors as an immutable value.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick a format from the file extension (`.yaml`/`.yml`, `.json`, `.toml`).
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ── Tesseract options ────────────────────────────────────────────────────────

/// Options for plain text extraction (`config_string`).
///
/// Every string field is optional; an empty string is treated the same as an
/// absent key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub language: String,
    #[serde(deserialize_with = "string_or_number")]
    pub oem: String,
    #[serde(deserialize_with = "string_or_number")]
    pub psm: String,
    /// Run orientation/script detection and correction before recognition.
    pub correct_osd: bool,
    /// Accepted for compatibility with existing config files; has no effect.
    pub landetect: bool,
    #[serde(deserialize_with = "string_or_number")]
    pub tessdata_dir: String,
    #[serde(deserialize_with = "string_or_number")]
    pub char_whitelist: String,
    #[serde(deserialize_with = "string_or_number")]
    pub char_blacklist: String,
    pub preserve_interword_spaces: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: String::new(),
            oem: String::new(),
            psm: String::new(),
            correct_osd: true,
            landetect: false,
            tessdata_dir: String::new(),
            char_whitelist: String::new(),
            char_blacklist: String::new(),
            preserve_interword_spaces: false,
        }
    }
}

/// Options for word-level confidence/box extraction (`config_data`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub language: String,
    #[serde(deserialize_with = "string_or_number")]
    pub oem: String,
    #[serde(deserialize_with = "string_or_number")]
    pub psm: String,
}

/// Rotation parameters used when correcting page orientation (`config_osd`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrientationConfig {
    /// Rotation centre in pixels; `None` means the image centre.
    pub center: Option<[f32; 2]>,
    pub scale: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self { center: None, scale: 1.0 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TesseractSettings {
    pub config_string: RecognitionConfig,
    pub config_data: MetadataConfig,
    pub config_osd: OrientationConfig,
}

// ── Scratch paths ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    /// Where searchable / force-OCR'd PDFs are materialized.
    pub searchable_pdf_temp: PathBuf,
    /// Where recognized text files are materialized.
    pub text_file_temp: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            searchable_pdf_temp: tmp.join("scanline").join("pdf"),
            text_file_temp: tmp.join("scanline").join("text"),
        }
    }
}

// ── Document-level delegates ─────────────────────────────────────────────────

/// Options forwarded to `ocrmypdf`. `None` leaves the tool's own default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrMyPdfOptions {
    #[serde(deserialize_with = "one_or_many")]
    pub language: Vec<String>,
    pub output_type: Option<String>,
    pub sidecar: Option<PathBuf>,
    pub jobs: Option<u32>,
    pub use_threads: Option<bool>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub rotate_pages: Option<bool>,
    pub image_dpi: Option<u32>,
    pub remove_background: Option<bool>,
    pub deskew: Option<bool>,
    pub clean: Option<bool>,
    pub clean_final: Option<bool>,
    pub unpaper_args: Option<String>,
    pub oversample: Option<u32>,
    pub remove_vectors: Option<bool>,
    pub threshold: Option<bool>,
    pub force_ocr: Option<bool>,
    pub skip_text: Option<bool>,
    pub redo_ocr: Option<bool>,
    pub skip_big: Option<f32>,
    pub optimize: Option<u8>,
    pub jpg_quality: Option<u8>,
    pub png_quality: Option<u8>,
    pub jbig2_lossy: Option<bool>,
    pub jbig2_page_group_size: Option<u32>,
    pub pages: Option<String>,
    pub max_image_mpixels: Option<f32>,
    #[serde(deserialize_with = "one_or_many")]
    pub tesseract_config: Vec<String>,
    pub tesseract_pagesegmode: Option<u8>,
    pub tesseract_oem: Option<u8>,
    pub pdf_renderer: Option<String>,
    pub tesseract_timeout: Option<f32>,
    pub rotate_pages_threshold: Option<f32>,
    pub pdfa_image_compression: Option<String>,
    pub user_words: Option<PathBuf>,
    pub user_patterns: Option<PathBuf>,
    pub fast_web_view: Option<f32>,
    #[serde(deserialize_with = "one_or_many")]
    pub plugins: Vec<String>,
    pub keep_temporary_files: Option<bool>,
    pub progress_bar: Option<bool>,
}

/// Options forwarded to `camelot`. The parsing flavor is always `stream`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CamelotOptions {
    /// Page selection in camelot syntax (`"1"`, `"1,3-5"`, `"all"`).
    pub pages: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub ocrmypdf: OcrMyPdfOptions,
    pub camelot: CamelotOptions,
}

/// External programs, resolved on `PATH` unless given as paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineBinaries {
    pub tesseract: PathBuf,
    pub ocrmypdf: PathBuf,
    pub camelot: PathBuf,
}

impl Default for EngineBinaries {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            ocrmypdf: PathBuf::from("ocrmypdf"),
            camelot: PathBuf::from("camelot"),
        }
    }
}

// ── HTTP boundary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Uploaded files land here, keyed by their (sanitized) client filename.
    pub upload_dir: PathBuf,
    /// Root that the read-config endpoint resolves relative paths against.
    pub config_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("uploads"),
            config_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Bunyan,
}

// ── Top level ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub tesseract: TesseractSettings,
    pub paths: PathConfig,
    pub extraction: ExtractionConfig,
    pub engines: EngineBinaries,
    pub server: ServerConfig,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read and parse a settings file; the format follows the extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        let text = read(path)?;
        Self::parse(&text, format)
    }

    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        Ok(match format {
            ConfigFormat::Yaml => serde_yaml::from_str(text)?,
            ConfigFormat::Json => serde_json::from_str(text)?,
            ConfigFormat::Toml => toml::from_str(text)?,
        })
    }
}

/// Load an arbitrary YAML document as a JSON value.
pub fn read_yaml_value(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let text = read(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Lenient field decoding ───────────────────────────────────────────────────

/// Config files commonly write `psm: 3` rather than `psm: "3"`.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
        Null(()),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

/// Accepts `"eng+deu"`, `["eng", "deu"]` or null.
fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::One(s) if s.is_empty() => vec![],
        Raw::One(s) => s.split('+').map(str::to_string).collect(),
        Raw::Many(v) => v,
        Raw::Null(()) => vec![],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
tesseract:
  config_string:
    oem: ""
    psm: 3
    correct_osd: true
    language: eng
    landetect: false
    tessdata_dir: ""
    char_whitelist: ""
    char_blacklist: ""
    preserve_interword_spaces: false
  config_data:
    oem: "1"
    psm: "6"
    language: eng
  config_osd:
    center: null
    scale: 1.0
paths:
  searchable_pdf_temp: /tmp/pdf
  text_file_temp: /tmp/text
extraction:
  ocrmypdf:
    language: eng+deu
    jobs: 2
    deskew: true
    sidecar: null
    tesseract_timeout: 180
  camelot:
    pages: "1-end"
"#;

    #[test]
    fn yaml_settings_with_original_layout() {
        let s = Settings::parse(YAML, ConfigFormat::Yaml).unwrap();
        assert_eq!(s.tesseract.config_string.language, "eng");
        assert_eq!(s.tesseract.config_string.psm, "3");
        assert_eq!(s.tesseract.config_data.oem, "1");
        assert_eq!(s.tesseract.config_osd.center, None);
        assert_eq!(s.paths.text_file_temp, PathBuf::from("/tmp/text"));
        assert_eq!(s.extraction.ocrmypdf.language, vec!["eng", "deu"]);
        assert_eq!(s.extraction.ocrmypdf.jobs, Some(2));
        assert_eq!(s.extraction.ocrmypdf.deskew, Some(true));
        assert_eq!(s.extraction.ocrmypdf.sidecar, None);
        assert_eq!(s.extraction.ocrmypdf.tesseract_timeout, Some(180.0));
        assert_eq!(s.extraction.camelot.pages.as_deref(), Some("1-end"));
        // Untouched sections fall back to defaults.
        assert_eq!(s.server, ServerConfig::default());
        assert_eq!(s.engines, EngineBinaries::default());
    }

    #[test]
    fn json_settings_partial() {
        let json = r#"{"tesseract": {"config_osd": {"center": [10, 20], "scale": 0.5}}, "log_format": "bunyan"}"#;
        let s = Settings::parse(json, ConfigFormat::Json).unwrap();
        assert_eq!(s.tesseract.config_osd.center, Some([10.0, 20.0]));
        assert_eq!(s.tesseract.config_osd.scale, 0.5);
        assert_eq!(s.log_format, LogFormat::Bunyan);
        assert!(s.tesseract.config_string.correct_osd);
    }

    #[test]
    fn toml_settings() {
        let toml = r#"
[server]
port = 9100
upload_dir = "/srv/uploads"

[extraction.ocrmypdf]
language = ["eng", "fra"]
optimize = 1
"#;
        let s = Settings::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(s.server.port, 9100);
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.extraction.ocrmypdf.language, vec!["eng", "fra"]);
        assert_eq!(s.extraction.ocrmypdf.optimize, Some(1));
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let s = Settings::parse("{}", ConfigFormat::Json).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("a.ini")),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, YAML).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.tesseract.config_string.psm, "3");

        let value = read_yaml_value(&path).unwrap();
        assert_eq!(value["tesseract"]["config_data"]["psm"], "6");
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = Settings::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }
}
