//! Input safety validation and content type detection.
//!
//! Multi-layer protection for loaded sources:
//! 1. Size limit
//! 2. Extension blocklist
//! 3. Magic byte detection for executables

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Magic byte signatures for executable files
pub const MAGIC_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),           // MZ header
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),         // Linux ELF
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),   // macOS 32-bit
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),   // macOS 64-bit
    ("Mach-O Fat", &[0xCA, 0xFE, 0xBA, 0xBE]),  // Universal binary (also Java)
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]), // WASM
];

/// Blocked file extensions (case-insensitive)
static BLOCKED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "exe", "dll", "scr", "pif", "com", "msi", "so", "dylib", "jar", "class", "deb", "rpm",
        "apk", "dmg", "pkg", "lnk", "hta",
    ]
    .into_iter()
    .collect()
});

/// Check a loaded payload before it becomes an input.
///
/// Returns the reason the input is rejected, or `None` when it is acceptable.
pub fn validate_input(name: &str, data: &[u8], max_size_bytes: usize) -> Option<String> {
    if data.len() > max_size_bytes {
        return Some(format!(
            "Input of {} bytes exceeds maximum size of {} bytes",
            data.len(),
            max_size_bytes
        ));
    }

    if let Some((_, ext)) = name.rsplit_once('.') {
        if BLOCKED_EXTENSIONS.contains(ext.to_lowercase().as_str()) {
            return Some(format!("File extension .{} is not allowed", ext));
        }
    }

    for (kind, magic) in MAGIC_SIGNATURES {
        if data.len() >= magic.len() && &data[..magic.len()] == *magic {
            return Some(format!("Executable content detected: {}", kind));
        }
    }

    None
}

/// Strip parameters from a mime type and lowercase it (`Text/HTML; charset=utf-8` → `text/html`).
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}

/// Detect actual content type from magic bytes.
///
/// Returns the detected MIME type if magic bytes match a known format,
/// falling back to extension-based detection, then to the claimed type.
pub fn detect_content_type(name: &str, data: &[u8], claimed: Option<&str>) -> String {
    // 1. Magic bytes are authoritative for binary formats
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    // 2. Text formats have no magic bytes, trust the extension
    if let Some((_, ext)) = name.rsplit_once('.') {
        if let Some(mime) = mime_from_extension(ext) {
            return mime.to_string();
        }
    }

    // 3. A binary claim that infer could not confirm does not match the data
    let claimed = claimed.map(normalize_mime).filter(|m| !m.is_empty());
    match claimed {
        Some(mime) if claimed_is_binary(&mime) => "application/octet-stream".to_string(),
        Some(mime) => mime,
        // 4. Unnamed, unclaimed content: text if it decodes, opaque otherwise
        None if !data.is_empty() && std::str::from_utf8(data).is_ok() => "text/plain".to_string(),
        None => "application/octet-stream".to_string(),
    }
}

/// True for mime types whose payload should be decoded as text.
pub fn is_text_mime(mime: &str) -> bool {
    let mime = normalize_mime(mime);
    mime.starts_with("text/")
        || matches!(
            mime.as_str(),
            "application/json"
                | "application/xml"
                | "application/yaml"
                | "application/toml"
                | "application/sql"
                | "application/x-tex"
                | "application/javascript"
                | "image/svg+xml"
        )
}

/// Binary formats that always carry recognizable magic bytes.
fn claimed_is_binary(claimed: &str) -> bool {
    if claimed.starts_with("audio/") || claimed.starts_with("video/") {
        return true;
    }
    if claimed.starts_with("image/") {
        return claimed != "image/svg+xml";
    }
    matches!(
        claimed,
        "application/pdf"
            | "application/zip"
            | "application/gzip"
            | "application/x-tar"
            | "application/x-7z-compressed"
            | "application/wasm"
    )
}

/// Map text-only extensions to MIME types (formats that lack magic bytes).
///
/// Binary media formats are intentionally excluded: if `infer::get()` does not
/// recognize them, the data does not match the extension.
fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        // Plain text
        "txt" | "log" | "ini" | "cfg" | "conf" | "env" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "tsv" => Some("text/tab-separated-values"),
        // Markup
        "html" | "htm" => Some("text/html"),
        "xml" => Some("application/xml"),
        "json" => Some("application/json"),
        "yaml" | "yml" => Some("application/yaml"),
        "toml" => Some("application/toml"),
        "md" | "markdown" => Some("text/markdown"),
        "rst" => Some("text/x-rst"),
        "tex" | "latex" => Some("application/x-tex"),
        // Code
        "rs" => Some("text/x-rust"),
        "py" => Some("text/x-python"),
        "js" | "mjs" | "cjs" => Some("text/javascript"),
        "ts" | "tsx" => Some("text/typescript"),
        "go" => Some("text/x-go"),
        "java" => Some("text/x-java"),
        "c" | "h" => Some("text/x-c"),
        "cpp" | "cc" | "hpp" => Some("text/x-c++"),
        "rb" => Some("text/x-ruby"),
        "sh" => Some("text/x-shellscript"),
        "sql" => Some("application/sql"),
        // SVG is text-based XML
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_detect_png_magic_bytes() {
        assert_eq!(detect_content_type("fake.txt", &PNG, Some("text/plain")), "image/png");
    }

    #[test]
    fn test_detect_pdf_magic_bytes() {
        let pdf = b"%PDF-1.4 fake content";
        assert_eq!(detect_content_type("doc", pdf, None), "application/pdf");
    }

    #[test]
    fn test_detect_falls_back_to_extension_for_text() {
        let result = detect_content_type("notes.md", b"# Hello world", None);
        assert_eq!(result, "text/markdown");
    }

    #[test]
    fn test_detect_binary_claim_without_magic_is_downgraded() {
        let result = detect_content_type("photo", b"random garbage", Some("image/jpeg"));
        assert_eq!(result, "application/octet-stream");
    }

    #[test]
    fn test_detect_trusts_textual_claim() {
        let result = detect_content_type("page", b"<p>hi</p>", Some("text/html; charset=utf-8"));
        assert_eq!(result, "text/html");
    }

    #[test]
    fn test_detect_unclaimed_utf8_is_text() {
        assert_eq!(detect_content_type("blob", b"just words", None), "text/plain");
        assert_eq!(
            detect_content_type("blob", &[0xC3, 0x28, 0xA0], None),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let reason = validate_input("a.txt", &[b'a'; 11], 10).unwrap();
        assert!(reason.contains("exceeds maximum size"));
        assert!(validate_input("a.txt", &[b'a'; 10], 10).is_none());
    }

    #[test]
    fn test_validate_rejects_executables() {
        assert!(validate_input("tool", &[0x7F, 0x45, 0x4C, 0x46, 0x02], 1024).is_some());
        assert!(validate_input("setup.EXE", b"harmless", 1024).is_some());
        assert!(validate_input("notes.txt", b"harmless", 1024).is_none());
    }

    #[test]
    fn test_is_text_mime() {
        assert!(is_text_mime("text/plain"));
        assert!(is_text_mime("Application/JSON; charset=utf-8"));
        assert!(is_text_mime("image/svg+xml"));
        assert!(!is_text_mime("image/png"));
        assert!(!is_text_mime("application/pdf"));
    }
}
