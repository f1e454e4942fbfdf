//! Data model for attachments flowing through the ingestion pipeline.
//!
//! An [`Attachment`] is created from an [`AttachmentSource`], loaded into an
//! [`Input`], offered a list of [`Converter`]s, and finally carries the
//! [`OutputPart`]s produced by the selected converter.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compat::all_outputs_supported;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque, immutable identifier of an attachment within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(Uuid);

impl AttachmentId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AttachmentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AttachmentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// How a text source reached the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextMethod {
    /// Explicit "attach from clipboard" action.
    ClipboardRead,
    /// Paste into the composer.
    Paste,
    /// Drag and drop of a text selection.
    Drop,
}

/// Immutable description of where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "media", rename_all = "snake_case")]
pub enum AttachmentSource {
    /// Text handed over directly (clipboard, paste, drop). HTML wins when present.
    Text {
        method: TextMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_plain: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_html: Option<String>,
    },
    /// A file on the local filesystem.
    File { path: PathBuf, ref_name: String },
    /// An in-memory file, e.g. a dropped blob. The claimed mime type is verified.
    Blob {
        ref_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(skip)]
        data: Vec<u8>,
    },
    /// A remote document fetched over HTTP(S).
    Url { url: String, ref_name: String },
}

/// Coarse media family of a source, used for labels and tooltips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMedia {
    Text,
    File,
    Url,
}

impl fmt::Display for SourceMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::File => write!(f, "file"),
            Self::Url => write!(f, "url"),
        }
    }
}

impl AttachmentSource {
    /// Convenience constructor for a plain-text source.
    pub fn text(method: TextMethod, text: impl Into<String>) -> Self {
        Self::Text {
            method,
            text_plain: Some(text.into()),
            text_html: None,
        }
    }

    /// Convenience constructor for a file source named after its path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ref_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self::File { path, ref_name }
    }

    /// Convenience constructor for a URL source.
    pub fn url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Url {
            ref_name: url.clone(),
            url,
        }
    }

    pub fn media(&self) -> SourceMedia {
        match self {
            Self::Text { .. } => SourceMedia::Text,
            Self::File { .. } | Self::Blob { .. } => SourceMedia::File,
            Self::Url { .. } => SourceMedia::Url,
        }
    }

    /// Label shown for a freshly created attachment.
    pub fn default_label(&self) -> String {
        match self {
            Self::Text { method, .. } => match method {
                TextMethod::ClipboardRead => "Clipboard".to_string(),
                TextMethod::Paste => "Pasted Text".to_string(),
                TextMethod::Drop => "Dropped Text".to_string(),
            },
            Self::File { ref_name, .. } | Self::Blob { ref_name, .. } => ref_name.clone(),
            Self::Url { url, ref_name } => {
                if ref_name.is_empty() {
                    url.clone()
                } else {
                    ref_name.clone()
                }
            }
        }
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// Decoded payload of an input. Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputData {
    /// Text-like content, already decoded.
    Text(Arc<str>),
    /// Binary content.
    Bytes(Arc<[u8]>),
}

impl InputData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => &bytes[..],
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(&text[..]),
            Self::Bytes(_) => None,
        }
    }

    /// Text view of the payload, replacing invalid UTF-8 sequences.
    pub fn to_text_lossy(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(&text[..]),
            Self::Bytes(bytes) => String::from_utf8_lossy(&bytes[..]),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw input resolved from a source: mime type, byte size, and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Input {
    pub mime_type: String,
    pub data_size: usize,
    #[serde(skip)]
    pub data: InputData,
}

impl Input {
    pub fn new(mime_type: impl Into<String>, data: InputData) -> Self {
        Self {
            mime_type: mime_type.into(),
            data_size: data.len(),
            data,
        }
    }

    pub fn text(mime_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(mime_type, InputData::Text(Arc::from(text.into())))
    }

    pub fn bytes(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(mime_type, InputData::Bytes(Arc::from(bytes)))
    }
}

/// Load status of an attachment. Exactly one state holds at any instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum InputState {
    /// Created, loader not started yet.
    #[default]
    Pending,
    Loading,
    Loaded(Input),
    Failed(String),
}

// =============================================================================
// CONVERTERS
// =============================================================================

/// Closed set of converter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConverterType {
    /// Plain text passthrough.
    Text,
    /// HTML reduced to readable text.
    RichText,
    /// HTML tables rendered as Markdown tables.
    RichTextTable,
    /// Text layer of a PDF.
    PdfText,
    /// PDF pages rendered to images.
    PdfImages,
    /// Image passed through as an image part.
    Image,
    /// Image text recognized through OCR.
    ImageOcr,
    /// Known media family with no conversion available.
    Unhandled,
}

impl ConverterType {
    pub const ALL: [ConverterType; 8] = [
        Self::Text,
        Self::RichText,
        Self::RichTextTable,
        Self::PdfText,
        Self::PdfImages,
        Self::Image,
        Self::ImageOcr,
        Self::Unhandled,
    ];

    /// Stable tag used in serialized form and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::RichText => "rich-text",
            Self::RichTextTable => "rich-text-table",
            Self::PdfText => "pdf-text",
            Self::PdfImages => "pdf-images",
            Self::Image => "image",
            Self::ImageOcr => "image-ocr",
            Self::Unhandled => "unhandled",
        }
    }

    /// Output part types this converter can emit.
    pub fn produces(&self) -> &'static [OutputPartType] {
        match self {
            Self::Text | Self::RichText | Self::RichTextTable | Self::PdfText | Self::ImageOcr => {
                &[OutputPartType::TextBlock]
            }
            Self::PdfImages | Self::Image => &[OutputPartType::ImagePart],
            Self::Unhandled => &[],
        }
    }
}

impl fmt::Display for ConverterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConverterType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Invalid converter type: {}", s))
    }
}

/// One selectable conversion option for a loaded input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Converter {
    pub id: ConverterType,
    pub name: String,
    /// Not selectable right now (size limits, or unsupported).
    #[serde(default)]
    pub disabled: bool,
    /// The environment cannot run this converter; it is listed for discoverability.
    #[serde(default)]
    pub unsupported: bool,
}

impl Converter {
    pub fn new(id: ConverterType, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            disabled: false,
            unsupported: false,
        }
    }
}

// =============================================================================
// OUTPUTS
// =============================================================================

/// Tag of an output part, as declared by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputPartType {
    TextBlock,
    ImagePart,
}

impl fmt::Display for OutputPartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextBlock => write!(f, "text-block"),
            Self::ImagePart => write!(f, "image-part"),
        }
    }
}

impl FromStr for OutputPartType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text-block" | "text_block" | "text" => Ok(Self::TextBlock),
            "image-part" | "image_part" | "image" => Ok(Self::ImagePart),
            _ => Err(format!("Invalid output part type: {}", s)),
        }
    }
}

/// A typed unit of converted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutputPart {
    TextBlock { text: String },
    ImagePart { base64_url: String },
}

impl OutputPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextBlock { text: text.into() }
    }

    pub fn image(base64_url: impl Into<String>) -> Self {
        Self::ImagePart {
            base64_url: base64_url.into(),
        }
    }

    pub fn part_type(&self) -> OutputPartType {
        match self {
            Self::TextBlock { .. } => OutputPartType::TextBlock,
            Self::ImagePart { .. } => OutputPartType::ImagePart,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::TextBlock { text } => Some(text),
            Self::ImagePart { .. } => None,
        }
    }
}

// =============================================================================
// ATTACHMENT
// =============================================================================

/// One ingested artifact tracked through load, convert, and output.
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub label: String,
    pub source: AttachmentSource,
    pub input_state: InputState,
    pub converters: Vec<Converter>,
    pub converter_idx: Option<usize>,
    pub outputs: Vec<OutputPart>,
    pub outputs_converting: bool,
    /// Message of the last failed conversion, cleared when a new one starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    /// Create a pending attachment for a source.
    pub fn new(source: AttachmentSource) -> Self {
        Self {
            id: AttachmentId::new(),
            label: source.default_label(),
            source,
            input_state: InputState::Pending,
            converters: Vec::new(),
            converter_idx: None,
            outputs: Vec::new(),
            outputs_converting: false,
            conversion_error: None,
            created_at: Utc::now(),
        }
    }

    pub fn input(&self) -> Option<&Input> {
        match &self.input_state {
            InputState::Loaded(input) => Some(input),
            _ => None,
        }
    }

    pub fn input_loading(&self) -> bool {
        matches!(self.input_state, InputState::Loading)
    }

    pub fn input_error(&self) -> Option<&str> {
        match &self.input_state {
            InputState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// The converter currently selected, if the index is set and valid.
    pub fn selected_converter(&self) -> Option<&Converter> {
        self.converter_idx.and_then(|idx| self.converters.get(idx))
    }

    /// Loaded, but no converter applies to the input's mime type.
    pub fn is_unconvertible(&self) -> bool {
        self.input().is_some() && self.converters.is_empty()
    }

    /// Derive the presentation status against the consumer's accepted part types.
    pub fn status(&self, accepted: &[OutputPartType]) -> AttachmentStatus {
        match &self.input_state {
            InputState::Pending | InputState::Loading => return AttachmentStatus::Loading,
            InputState::Failed(message) => return AttachmentStatus::InputError(message.clone()),
            InputState::Loaded(_) => {}
        }
        if self.outputs_converting {
            return AttachmentStatus::Converting;
        }
        if let Some(input) = self.input() {
            if self.converters.is_empty() {
                return AttachmentStatus::Unconvertible {
                    mime_type: input.mime_type.clone(),
                };
            }
        }
        if let Some(message) = &self.conversion_error {
            return AttachmentStatus::ConversionFailed(message.clone());
        }
        if self.outputs.is_empty() {
            return AttachmentStatus::OutputMissing;
        }
        if !all_outputs_supported(&self.outputs, accepted) {
            return AttachmentStatus::Incompatible;
        }
        AttachmentStatus::Ready
    }
}

/// Distinguishable presentation state of one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttachmentStatus {
    Loading,
    InputError(String),
    Unconvertible { mime_type: String },
    Converting,
    ConversionFailed(String),
    /// No outputs and no error, e.g. no converter selected.
    OutputMissing,
    /// Outputs exist but not all of them are accepted by the consumer.
    Incompatible,
    Ready,
}

impl AttachmentStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::Converting)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::InputError(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::Unconvertible { .. }
                | Self::ConversionFailed(_)
                | Self::OutputMissing
                | Self::Incompatible
        )
    }
}
