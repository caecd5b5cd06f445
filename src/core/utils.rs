use std::sync::OnceLock;

use regex::Regex;

pub trait ToJpegName {
    fn to_jpeg_name(&self) -> String;
}

// IMG_0001.HEIC -> IMG_0001.jpg AND scan.png -> scan.png.jpg
impl ToJpegName for str {
    fn to_jpeg_name(&self) -> String {
        static HEIF_EXTENSION: OnceLock<Regex> = OnceLock::new();
        let re = HEIF_EXTENSION.get_or_init(|| {
            Regex::new(r"(?i)\.(heic|heif)$").expect("extension pattern is valid")
        });

        format!("{}.jpg", re.replace(self, ""))
    }
}

/// Implement the trait for `String` by forwarding the method to `str`
impl ToJpegName for String {
    fn to_jpeg_name(&self) -> String {
        self.as_str().to_jpeg_name()
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    // Two decimals at most, trailing zeros dropped
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}

pub fn calculate_progress_fraction(current: usize, total: usize) -> f32 {
    if total > 0 {
        current as f32 / total as f32
    } else {
        0.0
    }
}

/// "12.5% smaller" / "3.0% larger" relative to `original`.
pub fn describe_size_change(original: u64, converted: u64) -> String {
    if original == 0 {
        return "of unknown relative size".to_string();
    }

    let ratio = (original as f64 - converted as f64) / original as f64 * 100.0;
    let direction = if converted > original { "larger" } else { "smaller" };
    format!("{:.1}% {}", ratio.abs(), direction)
}
