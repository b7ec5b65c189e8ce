pub mod args;
pub mod codec;
pub mod engine;
pub mod orientation;
pub mod pipeline;
pub mod recognize;
pub mod searchable;
pub mod structure;
pub mod types;

pub use args::{metadata_args, text_args, EngineArgs, EngineFlag};
pub use engine::{MockEngine, OcrEngine, OcrError, TesseractCli};
pub use pipeline::{PageExtraction, PagePipeline, Step};
pub use structure::structure_lines;
pub use types::{LineMap, Orientation, WordBox, WordMetadata};
