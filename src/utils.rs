use std::path::{Component, Path};

use rand::Rng;

/// Extensions that the file listing treats as previewable images.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp"];

/// Extracts the file extension from a filename, keeping its original case.
///
/// Extensions containing anything other than ASCII letters and digits are
/// dropped so a client-supplied name can never smuggle path syntax into a
/// generated filename.
pub fn get_file_extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Checks if a declared MIME type represents an image.
pub fn is_image_mime_type(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Checks if a filename carries one of the image extensions (case-insensitive).
pub fn is_image_extension(filename: &str) -> bool {
    get_file_extension(filename)
        .map(|ext| ext.to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Builds a stored filename: `<field>-<millis>-<random>[.<ext>]`.
pub fn generate_filename(field_name: &str, original_filename: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);

    match get_file_extension(original_filename) {
        Some(ext) => format!("{}-{}-{}.{}", field_name, millis, suffix, ext),
        None => format!("{}-{}-{}", field_name, millis, suffix),
    }
}

/// Returns true when `name` is exactly one normal path component.
///
/// Rejects empty names, `.` and `..`, separators, NUL bytes and anything the
/// platform would read as a root or drive prefix.
pub fn is_safe_path_segment(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Builds a `Content-Disposition` value that forces a download.
///
/// `filename` carries an ASCII rendition for older clients; `filename*`
/// carries the exact name as RFC 5987 UTF-8.
pub fn attachment_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(file_name)
    )
}
