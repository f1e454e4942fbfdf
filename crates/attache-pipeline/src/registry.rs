//! Converter registry for dispatching conversions by converter type.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;

use attache_core::{ConverterType, Error, Input, OutputConverter, OutputPart, Result};

use crate::config::PipelineConfig;
use crate::converters::{
    ImageConverter, ImageOcrConverter, PdfImagesConverter, PdfTextConverter, RichTextConverter,
    RichTextTableConverter, TextConverter,
};

/// Registry mapping converter types to their implementations.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<ConverterType, Arc<dyn OutputConverter>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Registry with every reference converter registered.
    pub fn with_defaults(config: &PipelineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextConverter));
        registry.register(Arc::new(RichTextConverter));
        registry.register(Arc::new(RichTextTableConverter));
        registry.register(Arc::new(PdfTextConverter::new(config)));
        registry.register(Arc::new(PdfImagesConverter::new(config)));
        registry.register(Arc::new(ImageConverter));
        registry.register(Arc::new(ImageOcrConverter::new(config)));
        registry
    }

    /// Register a converter. Replaces any existing converter for the same type.
    pub fn register(&mut self, converter: Arc<dyn OutputConverter>) {
        self.converters.insert(converter.converter_type(), converter);
    }

    /// Convert an input with the converter registered for the given type.
    pub async fn convert(
        &self,
        converter_type: ConverterType,
        input: &Input,
    ) -> Result<Vec<OutputPart>> {
        let converter = self.converters.get(&converter_type).ok_or_else(|| {
            Error::Conversion(format!(
                "No converter registered for type: {}",
                converter_type
            ))
        })?;
        converter.convert(input).await
    }

    /// List all converter types that have registered implementations.
    pub fn available_types(&self) -> HashSet<ConverterType> {
        self.converters.keys().copied().collect()
    }

    pub fn has_converter(&self, converter_type: ConverterType) -> bool {
        self.converters.contains_key(&converter_type)
    }

    /// Run health checks on all registered converters concurrently.
    pub async fn health_check_all(&self) -> HashMap<ConverterType, bool> {
        let checks = self.converters.iter().map(|(converter_type, converter)| {
            let converter = Arc::clone(converter);
            let converter_type = *converter_type;
            async move {
                let healthy = converter.health_check().await.unwrap_or(false);
                (converter_type, healthy)
            }
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Converter types that are registered and pass their health check.
    pub async fn healthy_types(&self) -> HashSet<ConverterType> {
        self.health_check_all()
            .await
            .into_iter()
            .filter_map(|(converter_type, healthy)| healthy.then_some(converter_type))
            .collect()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.converters.keys().collect();
        types.sort();
        f.debug_struct("ConverterRegistry")
            .field("converters", &types)
            .finish()
    }
}
