//! PdfText converter: extracts the text layer of a PDF using `pdftotext` (poppler-utils).

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use attache_core::{ConverterType, Error, Input, OutputConverter, OutputPart, Result};

use super::command::{binary_available, run_cmd_with_timeout, write_temp_file};
use crate::config::PipelineConfig;

/// Converter for extracting text from PDF files using `pdftotext`.
///
/// For PDFs above the configured page threshold (100 by default), extraction
/// is batched (50 pages per run by default) to bound memory usage. Each
/// `pdftotext` invocation is guarded by the configured command timeout.
pub struct PdfTextConverter {
    timeout_secs: u64,
    large_pdf_page_threshold: usize,
    batch_pages: usize,
}

impl PdfTextConverter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            timeout_secs: config.converter_cmd_timeout_secs,
            large_pdf_page_threshold: config.large_pdf_page_threshold,
            batch_pages: config.pdf_batch_pages.max(1),
        }
    }
}

/// Page count from `pdfinfo` output, if present.
fn parse_page_count(pdfinfo_output: &str) -> Option<usize> {
    pdfinfo_output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("pages") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Reject empty payloads and data without a `%PDF` header.
pub(crate) fn ensure_pdf(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::Conversion("Cannot convert empty PDF data".to_string()));
    }
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::Conversion(
            "Input is not a valid PDF (missing %PDF header)".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl OutputConverter for PdfTextConverter {
    fn converter_type(&self) -> ConverterType {
        ConverterType::PdfText
    }

    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>> {
        let data = input.data.as_bytes();
        ensure_pdf(data)?;

        // pdftotext reads from a file path
        let tmpfile = write_temp_file(data)?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        let pages = match run_cmd_with_timeout(
            Command::new("pdfinfo").arg(&tmp_path),
            self.timeout_secs,
        )
        .await
        {
            Ok(output) => parse_page_count(&output).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "pdfinfo failed, extracting without page count");
                0
            }
        };

        let text = if pages > self.large_pdf_page_threshold {
            debug!(pages, "Large PDF detected, extracting in batches");
            let mut chunks = Vec::new();
            let mut start = 1usize;
            while start <= pages {
                let end = start.saturating_add(self.batch_pages - 1).min(pages);
                let chunk = run_cmd_with_timeout(
                    Command::new("pdftotext")
                        .arg("-f")
                        .arg(start.to_string())
                        .arg("-l")
                        .arg(end.to_string())
                        .arg(&tmp_path)
                        .arg("-"),
                    self.timeout_secs,
                )
                .await?;
                chunks.push(chunk);
                start = end + 1;
            }
            chunks.join("")
        } else {
            run_cmd_with_timeout(
                Command::new("pdftotext").arg(&tmp_path).arg("-"),
                self.timeout_secs,
            )
            .await?
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(Error::Conversion(
                "PDF has no text layer; try PDF To Images".to_string(),
            ));
        }
        Ok(vec![OutputPart::text(text)])
    }

    async fn health_check(&self) -> Result<bool> {
        // pdftotext -v exits with 0 or 99 depending on the version
        Ok(binary_available("pdftotext", "-v").await)
    }

    fn name(&self) -> &str {
        "pdf_text"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal single-page PDF containing the text "Hello World".
    pub(crate) const HELLO_PDF: &[u8] = b"%PDF-1.0
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj

2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj

3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792]
   /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>
endobj

4 0 obj
<< /Length 44 >>
stream
BT /F1 12 Tf 100 700 Td (Hello World) Tj ET
endstream
endobj

5 0 obj
<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>
endobj

xref
0 6
0000000000 65535 f
0000000009 00000 n
0000000058 00000 n
0000000115 00000 n
0000000266 00000 n
0000000360 00000 n

trailer
<< /Size 6 /Root 1 0 R >>
startxref
434
%%EOF";

    fn converter() -> PdfTextConverter {
        PdfTextConverter::new(&PipelineConfig::default())
    }

    #[test]
    fn test_pdf_text_converter_type() {
        assert_eq!(converter().converter_type(), ConverterType::PdfText);
        assert_eq!(converter().name(), "pdf_text");
    }

    #[tokio::test]
    async fn test_pdf_text_empty_input() {
        let err = converter()
            .convert(&Input::bytes("application/pdf", vec![]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"), "{}", err);
    }

    #[tokio::test]
    async fn test_pdf_text_invalid_pdf() {
        let err = converter()
            .convert(&Input::bytes("application/pdf", b"not a pdf at all".to_vec()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a valid PDF"), "{}", err);
    }

    #[tokio::test]
    async fn test_pdf_text_extraction() {
        let converter = converter();
        if !converter.health_check().await.unwrap_or(false) {
            eprintln!("Skipping test_pdf_text_extraction: pdftotext not installed");
            return;
        }

        let outputs = converter
            .convert(&Input::bytes("application/pdf", HELLO_PDF.to_vec()))
            .await
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(
            outputs[0].as_text().unwrap_or("").contains("Hello World"),
            "got: {:?}",
            outputs
        );
    }

    #[tokio::test]
    async fn test_pdf_text_batched_extraction() {
        let converter =
            PdfTextConverter::new(&PipelineConfig::default().with_pdf_batching(0, 1));
        if !converter.health_check().await.unwrap_or(false) {
            eprintln!("Skipping test_pdf_text_batched_extraction: pdftotext not installed");
            return;
        }

        let outputs = converter
            .convert(&Input::bytes("application/pdf", HELLO_PDF.to_vec()))
            .await
            .unwrap();
        assert!(outputs[0].as_text().unwrap_or("").contains("Hello World"));
    }

    #[test]
    fn test_parse_page_count() {
        let pdfinfo_output = "\
Title:          Test Document
Producer:       pdfTeX-1.40.25
Pages:          42
Page size:      612 x 792 pts (letter)
";
        assert_eq!(parse_page_count(pdfinfo_output), Some(42));
        assert_eq!(parse_page_count(""), None);
        assert_eq!(parse_page_count("Pages: many"), None);
    }
}
