//! PNG output for composed captures

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use image::RgbaImage;

use crate::session::{ActionHandler, CapturedRegion};

/// Action handler that saves every export and confirm as a PNG file
pub struct PngExporter {
    dir: PathBuf,
    saved: Rc<RefCell<Vec<PathBuf>>>,
}

impl PngExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            saved: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Save into the user's pictures folder
    pub fn in_pictures() -> Option<Self> {
        let dir = dirs::picture_dir().or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))?;
        Some(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, oldest first
    pub fn saved(&self) -> Vec<PathBuf> {
        self.saved.borrow().clone()
    }

    fn deliver(&self, region: CapturedRegion) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        let dir = self.dir.clone();
        let saved = self.saved.clone();
        let CapturedRegion { screen, image, .. } = region;
        async move {
            let path = tokio::task::spawn_blocking(move || save_png(&dir, &image)).await??;
            log::debug!("Saved {} capture to {}", screen, path.display());
            saved.borrow_mut().push(path);
            Ok(())
        }
        .boxed_local()
    }
}

impl ActionHandler for PngExporter {
    fn handle_export(&self, region: CapturedRegion) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        self.deliver(region)
    }

    fn handle_confirm(&self, region: CapturedRegion) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        self.deliver(region)
    }

    fn handle_cancel(&self, reason: &str) {
        log::debug!("Nothing saved, session cancelled: {}", reason);
    }
}

/// Write `image` to a new timestamped file in `dir`
pub fn save_png(dir: &Path, image: &RgbaImage) -> anyhow::Result<PathBuf> {
    let prefix = chrono::Local::now()
        .format("Screenshot_%Y-%m-%d_%H-%M-%S_")
        .to_string();
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".png")
        .tempfile_in(dir)?;
    write_png(&mut file, image)?;
    let (_, path) = file.keep()?;
    Ok(path)
}

pub fn encode_png(image: &RgbaImage) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_png(&mut buffer, image)?;
    Ok(buffer)
}

fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}
