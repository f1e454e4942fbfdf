//! Rendering converted outputs as composer text.

use attache_core::{Attachment, Error, OutputPart, Result};

/// Fence long enough that no backtick run inside `text` can close it.
fn fence_for(text: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Render an attachment's text outputs for inlining into the composer.
///
/// Each text block becomes a fenced block headed by the attachment label.
/// Image parts are skipped. Fails with [`Error::InlineUnavailable`] when the
/// attachment has no converters, no outputs, or no text outputs; the result is
/// never an empty string.
pub fn inline_text(attachment: &Attachment) -> Result<String> {
    if attachment.input().is_none() {
        return Err(Error::InlineUnavailable(
            "attachment input is not loaded".to_string(),
        ));
    }
    if attachment.converters.is_empty() {
        return Err(Error::InlineUnavailable(
            "attachment is unconvertible".to_string(),
        ));
    }
    if attachment.outputs_converting {
        return Err(Error::InlineUnavailable(
            "conversion in progress".to_string(),
        ));
    }
    if attachment.outputs.is_empty() {
        return Err(Error::InlineUnavailable("attachment has no outputs".to_string()));
    }

    let blocks: Vec<String> = attachment
        .outputs
        .iter()
        .filter_map(OutputPart::as_text)
        .map(|text| {
            let fence = fence_for(text);
            format!("{}\n{}\n{}\n{}", attachment.label, fence, text, fence)
        })
        .collect();

    if blocks.is_empty() {
        return Err(Error::InlineUnavailable(
            "attachment has no text outputs".to_string(),
        ));
    }
    Ok(blocks.join("\n\n"))
}

/// One-line summary of an attachment's input and outputs, for debugging.
///
/// Returns `None` until the input is loaded.
pub fn describe_io(attachment: &Attachment) -> Option<String> {
    let input = attachment.input()?;
    let outputs = if attachment.outputs.is_empty() {
        "empty".to_string()
    } else {
        attachment
            .outputs
            .iter()
            .map(|output| match output {
                OutputPart::TextBlock { text } => {
                    format!("{}, {} bytes", output.part_type(), text.len())
                }
                OutputPart::ImagePart { .. } => format!("{}, (base64 image)", output.part_type()),
            })
            .collect::<Vec<_>>()
            .join(" · ")
    };
    Some(format!(
        "{}, {} bytes → {}",
        input.mime_type, input.data_size, outputs
    ))
}

/// Text copied to the clipboard for raw outputs: text blocks and image URLs
/// joined by blank lines. `None` for empty outputs.
pub fn clipboard_text(outputs: &[OutputPart]) -> Option<String> {
    if outputs.is_empty() {
        return None;
    }
    let joined = outputs
        .iter()
        .map(|output| match output {
            OutputPart::TextBlock { text } => text.as_str(),
            OutputPart::ImagePart { base64_url } => base64_url.as_str(),
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(joined)
}
