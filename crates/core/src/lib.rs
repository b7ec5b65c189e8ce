pub mod config;
pub mod digest;

pub use config::{
    CamelotOptions, ConfigError, ConfigFormat, EngineBinaries, ExtractionConfig, LogFormat,
    MetadataConfig, OcrMyPdfOptions, OrientationConfig, PathConfig, RecognitionConfig,
    ServerConfig, Settings, TesseractSettings,
};
pub use digest::{sha256_file_hex, sha256_hex};
