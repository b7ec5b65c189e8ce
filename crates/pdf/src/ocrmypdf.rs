//! Command line for the `ocrmypdf` force-OCR tool.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::Path;

use scanline_core::OcrMyPdfOptions;

#[derive(Default)]
struct Argv(Vec<OsString>);

impl Argv {
    fn flag(&mut self, name: &str, on: Option<bool>) {
        if on == Some(true) {
            self.0.push(name.into());
        }
    }

    fn toggle(&mut self, on: &str, off: &str, value: Option<bool>) {
        match value {
            Some(true) => self.0.push(on.into()),
            Some(false) => self.0.push(off.into()),
            None => {}
        }
    }

    fn value<T: Display>(&mut self, name: &str, value: Option<T>) {
        if let Some(v) = value {
            self.0.push(name.into());
            self.0.push(v.to_string().into());
        }
    }

    fn path(&mut self, name: &str, value: Option<&Path>) {
        if let Some(p) = value {
            self.0.push(name.into());
            self.0.push(p.as_os_str().to_owned());
        }
    }

    fn repeated(&mut self, name: &str, values: &[String]) {
        for v in values {
            self.0.push(name.into());
            self.0.push(v.into());
        }
    }
}

/// Arguments for `ocrmypdf [options] <input> <output>`. Unset options are
/// left to the tool's defaults; set ones are forwarded as given.
pub fn ocrmypdf_argv(opts: &OcrMyPdfOptions, input: &Path, output: &Path) -> Vec<OsString> {
    let mut a = Argv::default();

    if !opts.language.is_empty() {
        a.value("--language", Some(opts.language.join("+")));
    }
    a.value("--output-type", opts.output_type.as_deref());
    a.path("--sidecar", opts.sidecar.as_deref());
    a.value("--jobs", opts.jobs);
    a.toggle("--use-threads", "--no-use-threads", opts.use_threads);

    a.value("--title", opts.title.as_deref());
    a.value("--author", opts.author.as_deref());
    a.value("--subject", opts.subject.as_deref());
    a.value("--keywords", opts.keywords.as_deref());

    a.flag("--rotate-pages", opts.rotate_pages);
    a.value("--rotate-pages-threshold", opts.rotate_pages_threshold);
    a.value("--image-dpi", opts.image_dpi);
    a.flag("--remove-background", opts.remove_background);
    a.flag("--deskew", opts.deskew);
    a.flag("--clean", opts.clean);
    a.flag("--clean-final", opts.clean_final);
    a.value("--unpaper-args", opts.unpaper_args.as_deref());
    a.value("--oversample", opts.oversample);
    a.flag("--remove-vectors", opts.remove_vectors);
    a.flag("--threshold", opts.threshold);

    a.flag("--force-ocr", opts.force_ocr);
    a.flag("--skip-text", opts.skip_text);
    a.flag("--redo-ocr", opts.redo_ocr);
    a.value("--skip-big", opts.skip_big);
    a.value("--pages", opts.pages.as_deref());
    a.value("--max-image-mpixels", opts.max_image_mpixels);

    a.value("--optimize", opts.optimize);
    a.value("--jpeg-quality", opts.jpg_quality);
    a.value("--png-quality", opts.png_quality);
    a.flag("--jbig2-lossy", opts.jbig2_lossy);
    a.value("--jbig2-page-group-size", opts.jbig2_page_group_size);
    a.value("--pdfa-image-compression", opts.pdfa_image_compression.as_deref());
    a.value("--fast-web-view", opts.fast_web_view);

    a.repeated("--tesseract-config", &opts.tesseract_config);
    a.value("--tesseract-pagesegmode", opts.tesseract_pagesegmode);
    a.value("--tesseract-oem", opts.tesseract_oem);
    a.value("--tesseract-timeout", opts.tesseract_timeout);
    a.value("--pdf-renderer", opts.pdf_renderer.as_deref());
    a.path("--user-words", opts.user_words.as_deref());
    a.path("--user-patterns", opts.user_patterns.as_deref());

    a.repeated("--plugin", &opts.plugins);
    a.flag("--keep-temporary-files", opts.keep_temporary_files);
    if opts.progress_bar == Some(false) {
        a.0.push("--no-progress-bar".into());
    }

    a.0.push(input.as_os_str().to_owned());
    a.0.push(output.as_os_str().to_owned());
    a.0
}
