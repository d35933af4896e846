// path.rs - Path canonicalization shared by encode, decode, and restore.
//
// Every path that crosses the bundle boundary goes through `normalize_path`.
// On the encode side the result is the logical path written into headers; on
// the decode side it is the only form ever joined onto a project root, so
// traversal segments and absolute prefixes must never survive it.

use crate::error::BundleError;

/// Characters that most filesystems reject in a file or directory name.
/// Square brackets are deliberately absent: route-style names such as
/// `app/[slug]/page.tsx` must survive.
pub const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Canonicalize an arbitrary path string into a safe, slash-separated,
/// relative path.
///
/// - A leading `X:` drive prefix followed by a separator is removed.
/// - Backslashes become forward slashes.
/// - Empty, `.` and `..` segments are dropped (not rejected).
/// - Segments containing any of [`RESERVED_CHARS`] are dropped.
///
/// The result is empty only when the input held nothing usable; callers treat
/// that as invalid input.
pub fn normalize_path(input: &str) -> String {
    let without_drive = strip_drive_prefix(input);
    let slashed = without_drive.replace('\\', "/");
    let relative = slashed.strip_prefix('/').unwrap_or(&slashed);

    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| *segment != "." && *segment != "..")
        .filter(|segment| !segment.contains(RESERVED_CHARS))
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a path string is absolute in either POSIX or Windows form.
pub fn is_absolute_like(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path)
}

/// Validate the final segment of an already-normalized path.
///
/// The name must be non-empty and free of reserved characters. A path that
/// normalized to the empty string fails with [`BundleError::InvalidPath`].
pub fn validate_file_name(normalized: &str) -> Result<(), BundleError> {
    if normalized.is_empty() {
        return Err(BundleError::InvalidPath {
            path: normalized.to_string(),
        });
    }
    let name = normalized.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        return Err(BundleError::InvalidFileName {
            name: name.to_string(),
            reason: "file name is empty".to_string(),
        });
    }
    if let Some(bad) = name.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(BundleError::InvalidFileName {
            name: name.to_string(),
            reason: format!("contains reserved character '{}'", bad),
        });
    }
    Ok(())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

fn strip_drive_prefix(path: &str) -> &str {
    if has_drive_prefix(path) {
        &path[2..]
    } else {
        path
    }
}
