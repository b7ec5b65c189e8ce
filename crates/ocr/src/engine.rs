use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::args::EngineArgs;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image encode error: {0}")]
    ImageEncode(String),
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Unexpected engine output: {0}")]
    Parse(String),
    #[error("Orientation detection failed: {0}")]
    Osd(String),
    #[error("{0} not found; install it or point `engines` at it")]
    NotAvailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstraction over the text-recognition engine.
///
/// Every call takes an encoded image (PNG, JPEG, TIFF, ...) and the flags to
/// pass through. Implementations run the engine once; they never retry.
pub trait OcrEngine: Send + Sync {
    /// Orientation and script detection report.
    fn osd(&self, image: &[u8]) -> Result<String, OcrError>;
    fn image_to_string(&self, image: &[u8], args: &EngineArgs) -> Result<String, OcrError>;
    /// Word table in the engine's tab-separated layout.
    fn image_to_data(&self, image: &[u8], args: &EngineArgs) -> Result<String, OcrError>;
    /// Single-page PDF with the image and an invisible text layer.
    fn image_to_pdf(&self, image: &[u8], args: &EngineArgs) -> Result<Vec<u8>, OcrError>;
}

// ── Tesseract command-line engine ─────────────────────────────────────────────

/// Runs the `tesseract` executable, feeding the image on stdin and reading the
/// result from stdout.
pub struct TesseractCli {
    program: PathBuf,
}

impl TesseractCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn run(&self, image: &[u8], args: &[String], output: Option<&str>) -> Result<Vec<u8>, OcrError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("stdin").arg("stdout").args(args);
        if let Some(config) = output {
            cmd.arg(config);
        }
        debug!(program = %self.program.display(), ?args, ?output, "invoking tesseract");

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    OcrError::NotAvailable(self.program.display().to_string())
                }
                _ => OcrError::Io(e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // The engine may exit before draining stdin (e.g. on a bad flag);
            // its exit status and stderr are the useful signal then.
            if let Err(e) = stdin.write_all(image) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(OcrError::Io(e));
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl OcrEngine for TesseractCli {
    fn osd(&self, image: &[u8]) -> Result<String, OcrError> {
        let out = self.run(image, &["--psm".to_string(), "0".to_string()], None)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn image_to_string(&self, image: &[u8], args: &EngineArgs) -> Result<String, OcrError> {
        let out = self.run(image, &args.to_argv(), None)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn image_to_data(&self, image: &[u8], args: &EngineArgs) -> Result<String, OcrError> {
        let out = self.run(image, &args.to_argv(), Some("tsv"))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn image_to_pdf(&self, image: &[u8], args: &EngineArgs) -> Result<Vec<u8>, OcrError> {
        self.run(image, &args.to_argv(), Some("pdf"))
    }
}

// ── Mock engine (always available, used for tests) ────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Osd,
    Text,
    Data,
    Pdf,
}

/// One recorded engine call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub op: MockOp,
    pub argv: Vec<String>,
    pub input: Vec<u8>,
}

/// Returns preset responses and records every call. A response that was never
/// set makes the corresponding call fail, as does any call whose flags contain
/// the rejected token.
#[derive(Debug, Default)]
pub struct MockEngine {
    osd: Option<String>,
    text: Option<String>,
    data: Option<String>,
    pdf: Option<Vec<u8>>,
    rejected_flag: Option<String>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_osd(mut self, report: impl Into<String>) -> Self {
        self.osd = Some(report.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_data(mut self, tsv: impl Into<String>) -> Self {
        self.data = Some(tsv.into());
        self
    }

    pub fn with_pdf(mut self, pdf: impl Into<Vec<u8>>) -> Self {
        self.pdf = Some(pdf.into());
        self
    }

    /// Fail any call whose argv contains `token`, like an engine rejecting an
    /// unsupported option.
    pub fn rejecting(mut self, token: impl Into<String>) -> Self {
        self.rejected_flag = Some(token.into());
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record<T: Clone>(
        &self,
        op: MockOp,
        image: &[u8],
        argv: Vec<String>,
        preset: &Option<T>,
    ) -> Result<T, OcrError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(MockCall { op, argv: argv.clone(), input: image.to_vec() });
        }
        if let Some(bad) = &self.rejected_flag {
            if argv.iter().any(|a| a.contains(bad.as_str())) {
                return Err(OcrError::Engine(format!("unsupported option: {bad}")));
            }
        }
        preset
            .clone()
            .ok_or_else(|| OcrError::Engine(format!("no mock response for {op:?}")))
    }
}

impl OcrEngine for MockEngine {
    fn osd(&self, image: &[u8]) -> Result<String, OcrError> {
        self.record(MockOp::Osd, image, vec!["--psm".into(), "0".into()], &self.osd)
    }

    fn image_to_string(&self, image: &[u8], args: &EngineArgs) -> Result<String, OcrError> {
        self.record(MockOp::Text, image, args.to_argv(), &self.text)
    }

    fn image_to_data(&self, image: &[u8], args: &EngineArgs) -> Result<String, OcrError> {
        self.record(MockOp::Data, image, args.to_argv(), &self.data)
    }

    fn image_to_pdf(&self, image: &[u8], args: &EngineArgs) -> Result<Vec<u8>, OcrError> {
        self.record(MockOp::Pdf, image, args.to_argv(), &self.pdf)
    }
}
