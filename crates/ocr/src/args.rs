//! Translation of named recognition options into engine flags.
//!
//! Flags are kept as typed values in a fixed order and only turned into argv
//! entries at invocation time, so option values are never re-split or quoted.

use std::fmt;

use scanline_core::{MetadataConfig, RecognitionConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineFlag {
    Language(String),
    PageSegMode(String),
    EngineMode(String),
    PreserveInterwordSpaces,
    Whitelist(String),
    Blacklist(String),
    TessdataDir(String),
}

impl EngineFlag {
    fn push_argv(&self, out: &mut Vec<String>) {
        let (flag, value) = match self {
            EngineFlag::Language(v) => ("-l", v.clone()),
            EngineFlag::PageSegMode(v) => ("--psm", v.clone()),
            EngineFlag::EngineMode(v) => ("--oem", v.clone()),
            EngineFlag::PreserveInterwordSpaces => ("-c", "preserve_interword_spaces=1".to_string()),
            EngineFlag::Whitelist(v) => ("-c", format!("tessedit_char_whitelist={v}")),
            EngineFlag::Blacklist(v) => ("-c", format!("tessedit_char_blacklist={v}")),
            EngineFlag::TessdataDir(v) => ("--tessdata-dir", v.clone()),
        };
        out.push(flag.to_string());
        out.push(value);
    }
}

impl fmt::Display for EngineFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut argv = Vec::with_capacity(2);
        self.push_argv(&mut argv);
        for part in argv {
            write!(f, " {part}")?;
        }
        Ok(())
    }
}

/// An ordered set of engine flags.
///
/// `Display` renders the space-prefixed flag string (`" -l eng --psm 3"`);
/// [`EngineArgs::to_argv`] gives the argument vector actually passed to the
/// engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineArgs {
    flags: Vec<EngineFlag>,
}

impl EngineArgs {
    pub fn flags(&self) -> &[EngineFlag] {
        &self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn to_argv(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.flags.len() * 2);
        for flag in &self.flags {
            flag.push_argv(&mut out);
        }
        out
    }

    fn push_if(&mut self, value: &str, make: impl FnOnce(String) -> EngineFlag) {
        if !value.is_empty() {
            self.flags.push(make(value.to_string()));
        }
    }
}

impl fmt::Display for EngineArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.flags.iter().try_for_each(|flag| write!(f, "{flag}"))
    }
}

/// Flags for plain text extraction.
///
/// Order: language, page segmentation, engine mode, interword spacing,
/// whitelist, blacklist, tessdata directory.
pub fn text_args(cfg: &RecognitionConfig) -> EngineArgs {
    let mut args = EngineArgs::default();
    args.push_if(&cfg.language, EngineFlag::Language);
    args.push_if(&cfg.psm, EngineFlag::PageSegMode);
    args.push_if(&cfg.oem, EngineFlag::EngineMode);
    if cfg.preserve_interword_spaces {
        args.flags.push(EngineFlag::PreserveInterwordSpaces);
    }
    args.push_if(&cfg.char_whitelist, EngineFlag::Whitelist);
    args.push_if(&cfg.char_blacklist, EngineFlag::Blacklist);
    args.push_if(&cfg.tessdata_dir, EngineFlag::TessdataDir);
    args
}

/// Flags for word confidence/box extraction: language, page segmentation,
/// engine mode.
pub fn metadata_args(cfg: &MetadataConfig) -> EngineArgs {
    let mut args = EngineArgs::default();
    args.push_if(&cfg.language, EngineFlag::Language);
    args.push_if(&cfg.psm, EngineFlag::PageSegMode);
    args.push_if(&cfg.oem, EngineFlag::EngineMode);
    args
}
