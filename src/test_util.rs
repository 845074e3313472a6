use std::io::Cursor;

use crate::source::SourceImage;

/// Width of `text` when every character advances by `advance`.
pub(crate) fn fixed_advance(text: &str, advance: f32) -> f32 {
    text.chars().count() as f32 * advance
}

pub(crate) fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub(crate) fn solid_source(width: u32, height: u32, rgba: [u8; 4]) -> SourceImage {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    SourceImage::from_rgba(&image).expect("source image")
}

/// Runs `func` with `HOME` pointing at an empty scratch directory, so no personal
/// settings leak into the test.
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: every test that touches HOME holds HOME_MUTEX.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| func(dir.path())));
    match old_home {
        Some(old) => unsafe { std::env::set_var("HOME", old) },
        None => unsafe { std::env::remove_var("HOME") },
    }
    result.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
