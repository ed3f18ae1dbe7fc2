//! Shared helper functions for CLI commands.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Sniff a file's MIME type from its magic bytes.
fn sniff_mime(path: &Path) -> Option<String> {
    // Read first 8KB for magic byte detection
    let mut file = File::open(path).ok()?;
    let mut buffer = [0u8; 8192];
    let bytes_read = file.read(&mut buffer).ok()?;

    if bytes_read == 0 {
        return None;
    }

    infer::get(&buffer[..bytes_read]).map(|t| t.mime_type().to_string())
}

/// MIME type of `path`: content first, then extension.
pub fn detect_mime(path: &Path) -> String {
    sniff_mime(path).unwrap_or_else(|| {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string()
    })
}

/// Truncate a string for table display.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", head)
}
