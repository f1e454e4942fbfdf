//! Attachment collection manager.
//!
//! Owns the ordered collection of attachments and drives each one through
//! load, converter selection, and conversion. Loads and conversions run in
//! spawned tasks; when one finishes, it re-acquires the write lock and applies
//! its result only if the attachment still exists and the run is still the
//! latest one for that attachment (per-attachment tokens, last writer wins).

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};

use attache_core::{
    Attachment, AttachmentEvent, AttachmentId, AttachmentSource, AttachmentStatus, ClipboardSink,
    Converter, ConverterType, Error, EventBus, EventEnvelope, Input, InputState, Result,
    SourceLoader,
};

use crate::catalog::{reconcile_selection, ConverterCatalog};
use crate::config::PipelineConfig;
use crate::inline::{clipboard_text, describe_io, inline_text};
use crate::loader::DefaultSourceLoader;
use crate::registry::ConverterRegistry;

/// Direction for [`AttachmentManager::move_attachment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    /// Towards the front of the collection.
    Up,
    /// Towards the back of the collection.
    Down,
}

impl TryFrom<i32> for MoveDirection {
    type Error = Error;

    fn try_from(delta: i32) -> Result<Self> {
        match delta {
            -1 => Ok(Self::Up),
            1 => Ok(Self::Down),
            other => Err(Error::InvalidInput(format!(
                "Move delta must be -1 or 1, got {}",
                other
            ))),
        }
    }
}

/// Inlined text of one attachment, from [`AttachmentManager::inline_all_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinedText {
    pub attachment_id: AttachmentId,
    pub label: String,
    pub text: String,
}

struct Slot {
    attachment: Attachment,
    load_token: u64,
    convert_token: u64,
    /// Selection to restore once a reload finishes.
    reselect: Option<ConverterType>,
}

struct State {
    slots: Vec<Slot>,
    catalog: ConverterCatalog,
}

impl State {
    fn index_of(&self, id: AttachmentId) -> Option<usize> {
        self.slots.iter().position(|s| s.attachment.id == id)
    }

    fn slot(&self, id: AttachmentId) -> Result<&Slot> {
        self.slots
            .iter()
            .find(|s| s.attachment.id == id)
            .ok_or(Error::AttachmentNotFound(id))
    }

    fn slot_mut(&mut self, id: AttachmentId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.attachment.id == id)
    }
}

/// A conversion run started under the lock, executed outside it.
struct ConversionJob {
    id: AttachmentId,
    token: u64,
    converter: ConverterType,
    input: Input,
}

struct Inner {
    state: RwLock<State>,
    loader: Arc<dyn SourceLoader>,
    registry: ConverterRegistry,
    config: PipelineConfig,
    events: EventBus,
    revision: watch::Sender<u64>,
}

/// Handle to an attachment collection. Cloning shares the collection.
#[derive(Clone)]
pub struct AttachmentManager {
    inner: Arc<Inner>,
}

fn panic_message<'a>(panic: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::Input(message) | Error::Conversion(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Clear outputs and, if a usable converter is selected, mark the attachment
/// converting and return the job to run. Always invalidates earlier runs.
fn begin_conversion(slot: &mut Slot, events: &EventBus) -> Option<ConversionJob> {
    slot.convert_token += 1;
    let token = slot.convert_token;
    let attachment = &mut slot.attachment;
    let id = attachment.id;

    attachment.outputs.clear();
    attachment.conversion_error = None;
    attachment.outputs_converting = false;

    let input = attachment.input()?.clone();
    let converter = match attachment.selected_converter() {
        Some(converter) => converter.clone(),
        None => {
            events.emit(AttachmentEvent::OutputsCleared { attachment_id: id });
            return None;
        }
    };

    if converter.disabled {
        let message = if converter.unsupported {
            format!("Converter '{}' is not supported here", converter.name)
        } else {
            format!("Input is too large for converter '{}'", converter.name)
        };
        debug!(attachment_id = %id, converter = %converter.id, "Selected converter is disabled");
        attachment.conversion_error = Some(message.clone());
        events.emit(AttachmentEvent::ConversionFailed {
            attachment_id: id,
            converter: converter.id,
            error: message,
        });
        return None;
    }

    attachment.outputs_converting = true;
    events.emit(AttachmentEvent::ConversionStarted {
        attachment_id: id,
        converter: converter.id,
    });
    Some(ConversionJob {
        id,
        token,
        converter: converter.id,
        input,
    })
}

/// Recompute the converter list of a loaded attachment, preserving the
/// selection by converter type. Starts a conversion when `force` is set or the
/// selected converter changed (including becoming disabled).
fn recompute_converters(
    slot: &mut Slot,
    catalog: &ConverterCatalog,
    events: &EventBus,
    force: bool,
) -> Option<ConversionJob> {
    let input = slot.attachment.input()?.clone();
    let previous = slot
        .attachment
        .selected_converter()
        .map(|c| (c.id, c.disabled));
    let reselect = slot.reselect.take();

    let converters = catalog.compute_converters(&input);
    let converter_idx = reconcile_selection(previous.map(|(id, _)| id).or(reselect), &converters);
    let changed =
        converters != slot.attachment.converters || converter_idx != slot.attachment.converter_idx;
    slot.attachment.converters = converters;
    slot.attachment.converter_idx = converter_idx;

    if changed {
        debug!(
            attachment_id = %slot.attachment.id,
            converter_count = slot.attachment.converters.len(),
            converter_idx = ?converter_idx,
            "Converters recomputed"
        );
        events.emit(AttachmentEvent::ConvertersChanged {
            attachment_id: slot.attachment.id,
            converter_count: slot.attachment.converters.len(),
            converter_idx,
        });
    }

    let current = slot
        .attachment
        .selected_converter()
        .map(|c| (c.id, c.disabled));
    if force || current != previous {
        begin_conversion(slot, events)
    } else {
        None
    }
}

impl AttachmentManager {
    /// Create a manager with injected loader and converters.
    ///
    /// Every registered converter type starts out available; call
    /// [`refresh_capabilities`](Self::refresh_capabilities) to narrow the set
    /// to converters that pass their health check.
    pub fn new(
        loader: Arc<dyn SourceLoader>,
        registry: ConverterRegistry,
        config: PipelineConfig,
    ) -> Self {
        let catalog = ConverterCatalog::new(&config, registry.available_types());
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State {
                    slots: Vec::new(),
                    catalog,
                }),
                loader,
                registry,
                events: EventBus::new(config.event_bus_capacity),
                config,
                revision,
            }),
        }
    }

    /// Manager with the default loader and the reference converters.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let loader = DefaultSourceLoader::new(&config)?;
        let registry = ConverterRegistry::with_defaults(&config);
        Ok(Self::new(Arc::new(loader), registry, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Subscribe to attachment events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.inner.events.subscribe()
    }

    fn bump_revision(&self) {
        self.inner.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    fn spawn_load(&self, id: AttachmentId, token: u64, source: AttachmentSource) {
        let manager = self.clone();
        tokio::spawn(async move { manager.run_load(id, token, source).await });
    }

    fn spawn_conversion(&self, job: ConversionJob) {
        let manager = self.clone();
        tokio::spawn(async move { manager.run_conversion(job).await });
    }

    async fn run_load(&self, id: AttachmentId, token: u64, source: AttachmentSource) {
        let started = Instant::now();
        let result = AssertUnwindSafe(self.inner.loader.load(&source))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(Error::Input(format!(
                    "Loader panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
        let duration_ms = started.elapsed().as_millis() as u64;

        let job = {
            let mut state = self.inner.state.write().await;
            let State { slots, catalog } = &mut *state;
            let Some(slot) = slots.iter_mut().find(|s| s.attachment.id == id) else {
                debug!(attachment_id = %id, "Attachment removed before load finished");
                return;
            };
            if slot.load_token != token {
                debug!(attachment_id = %id, "Dropping superseded load result");
                return;
            }

            match result {
                Ok(input) => {
                    debug!(
                        attachment_id = %id,
                        mime_type = %input.mime_type,
                        data_size = input.data_size,
                        duration_ms,
                        "Attachment input loaded"
                    );
                    self.inner.events.emit(AttachmentEvent::InputLoaded {
                        attachment_id: id,
                        mime_type: input.mime_type.clone(),
                        data_size: input.data_size,
                    });
                    slot.attachment.input_state = InputState::Loaded(input);
                    recompute_converters(slot, catalog, &self.inner.events, true)
                }
                Err(e) => {
                    let message = failure_message(&e);
                    warn!(
                        attachment_id = %id,
                        error = %message,
                        duration_ms,
                        "Failed to load attachment"
                    );
                    slot.attachment.input_state = InputState::Failed(message.clone());
                    slot.attachment.converters.clear();
                    slot.attachment.converter_idx = None;
                    self.inner.events.emit(AttachmentEvent::InputFailed {
                        attachment_id: id,
                        error: message,
                    });
                    None
                }
            }
        };

        if let Some(job) = job {
            self.spawn_conversion(job);
        }
        self.bump_revision();
    }

    async fn run_conversion(&self, job: ConversionJob) {
        let started = Instant::now();
        let result = AssertUnwindSafe(self.inner.registry.convert(job.converter, &job.input))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(Error::Conversion(format!(
                    "Converter '{}' panicked: {}",
                    job.converter,
                    panic_message(panic.as_ref())
                )))
            });
        let duration_ms = started.elapsed().as_millis() as u64;

        {
            let mut state = self.inner.state.write().await;
            let Some(slot) = state.slot_mut(job.id) else {
                debug!(attachment_id = %job.id, "Attachment removed before conversion finished");
                return;
            };
            if slot.convert_token != job.token {
                debug!(
                    attachment_id = %job.id,
                    converter = %job.converter,
                    "Dropping stale conversion result"
                );
                return;
            }

            let attachment = &mut slot.attachment;
            attachment.outputs_converting = false;
            let result = result.and_then(|outputs| {
                if outputs.is_empty() {
                    Err(Error::Conversion("Converter produced no outputs".to_string()))
                } else {
                    Ok(outputs)
                }
            });
            match result {
                Ok(outputs) => {
                    debug!(
                        attachment_id = %job.id,
                        converter = %job.converter,
                        output_count = outputs.len(),
                        duration_ms,
                        "Conversion finished"
                    );
                    self.inner.events.emit(AttachmentEvent::OutputsReady {
                        attachment_id: job.id,
                        converter: job.converter,
                        output_count: outputs.len(),
                    });
                    attachment.outputs = outputs;
                }
                Err(e) => {
                    let message = failure_message(&e);
                    warn!(
                        attachment_id = %job.id,
                        converter = %job.converter,
                        error = %message,
                        duration_ms,
                        "Conversion failed"
                    );
                    attachment.outputs.clear();
                    attachment.conversion_error = Some(message.clone());
                    self.inner.events.emit(AttachmentEvent::ConversionFailed {
                        attachment_id: job.id,
                        converter: job.converter,
                        error: message,
                    });
                }
            }
        }
        self.bump_revision();
    }

    // =========================================================================
    // COLLECTION MUTATIONS
    // =========================================================================

    /// Append an attachment for `source` and start loading it.
    ///
    /// Returns immediately; the attachment is in the loading state until the
    /// loader finishes.
    pub async fn add_from_source(&self, source: AttachmentSource) -> AttachmentId {
        let mut attachment = Attachment::new(source.clone());
        attachment.input_state = InputState::Loading;
        let id = attachment.id;
        let label = attachment.label.clone();

        {
            let mut state = self.inner.state.write().await;
            state.slots.push(Slot {
                attachment,
                load_token: 1,
                convert_token: 0,
                reselect: None,
            });
            info!(attachment_id = %id, source_media = %source.media(), "Attachment added");
            self.inner.events.emit(AttachmentEvent::Added {
                attachment_id: id,
                label,
            });
            self.inner
                .events
                .emit(AttachmentEvent::InputLoading { attachment_id: id });
        }
        self.bump_revision();
        self.spawn_load(id, 1, source);
        id
    }

    /// Re-run the loader for an attachment, e.g. after an input error.
    ///
    /// In-flight loads and conversions for the attachment are orphaned. The
    /// converter list is cleared until the new input arrives; the selection is
    /// restored by type if it still applies.
    pub async fn reload_attachment(&self, id: AttachmentId) -> Result<()> {
        let (token, source) = {
            let mut state = self.inner.state.write().await;
            let slot = state.slot_mut(id).ok_or(Error::AttachmentNotFound(id))?;
            slot.load_token += 1;
            slot.convert_token += 1;
            if let Some(converter) = slot.attachment.selected_converter() {
                slot.reselect = Some(converter.id);
            }
            let attachment = &mut slot.attachment;
            attachment.input_state = InputState::Loading;
            attachment.converters.clear();
            attachment.converter_idx = None;
            attachment.outputs.clear();
            attachment.outputs_converting = false;
            attachment.conversion_error = None;
            info!(attachment_id = %id, "Reloading attachment");
            self.inner
                .events
                .emit(AttachmentEvent::InputLoading { attachment_id: id });
            (slot.load_token, attachment.source.clone())
        };
        self.bump_revision();
        self.spawn_load(id, token, source);
        Ok(())
    }

    /// Move an attachment one position. Moving past either end is a no-op.
    pub async fn move_attachment(&self, id: AttachmentId, direction: MoveDirection) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            let from = state.index_of(id).ok_or(Error::AttachmentNotFound(id))?;
            let to = match direction {
                MoveDirection::Up if from > 0 => from - 1,
                MoveDirection::Down if from + 1 < state.slots.len() => from + 1,
                _ => return Ok(()),
            };
            state.slots.swap(from, to);
            self.inner.events.emit(AttachmentEvent::Moved {
                attachment_id: id,
                from,
                to,
            });
        }
        self.bump_revision();
        Ok(())
    }

    /// Remove an attachment. Its in-flight load or conversion is discarded
    /// when it completes.
    pub async fn remove_attachment(&self, id: AttachmentId) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            let index = state.index_of(id).ok_or(Error::AttachmentNotFound(id))?;
            state.slots.remove(index);
            info!(attachment_id = %id, "Attachment removed");
            self.inner
                .events
                .emit(AttachmentEvent::Removed { attachment_id: id });
        }
        self.bump_revision();
        Ok(())
    }

    /// Remove every attachment. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let count = {
            let mut state = self.inner.state.write().await;
            let count = state.slots.len();
            state.slots.clear();
            count
        };
        info!(count, "Attachments cleared");
        self.inner.events.emit(AttachmentEvent::Cleared { count });
        self.bump_revision();
        count
    }

    pub async fn rename_attachment(
        &self,
        id: AttachmentId,
        label: impl Into<String>,
    ) -> Result<()> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(Error::InvalidInput("Label cannot be empty".to_string()));
        }
        {
            let mut state = self.inner.state.write().await;
            let slot = state.slot_mut(id).ok_or(Error::AttachmentNotFound(id))?;
            slot.attachment.label = label.clone();
            self.inner.events.emit(AttachmentEvent::Renamed {
                attachment_id: id,
                label,
            });
        }
        self.bump_revision();
        Ok(())
    }

    /// Select a converter (or none) and run it.
    ///
    /// An index that is out of range or points at a disabled converter is
    /// rejected without touching the attachment. Selecting `None` clears the
    /// outputs. Any conversion still running for the attachment is orphaned.
    pub async fn set_converter_idx(
        &self,
        id: AttachmentId,
        converter_idx: Option<usize>,
    ) -> Result<()> {
        let job = {
            let mut state = self.inner.state.write().await;
            let slot = state.slot_mut(id).ok_or(Error::AttachmentNotFound(id))?;

            if let Some(idx) = converter_idx {
                let converters = &slot.attachment.converters;
                let converter = converters.get(idx).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "Converter index {} out of range ({} converters)",
                        idx,
                        converters.len()
                    ))
                })?;
                if converter.disabled {
                    return Err(Error::InvalidInput(format!(
                        "Converter '{}' is disabled",
                        converter.name
                    )));
                }
            }

            slot.attachment.converter_idx = converter_idx;
            debug!(attachment_id = %id, converter_idx = ?converter_idx, "Converter selected");
            self.inner.events.emit(AttachmentEvent::ConvertersChanged {
                attachment_id: id,
                converter_count: slot.attachment.converters.len(),
                converter_idx,
            });
            begin_conversion(slot, &self.inner.events)
        };

        if let Some(job) = job {
            self.spawn_conversion(job);
        }
        self.bump_revision();
        Ok(())
    }

    /// Replace the set of runnable converter types and recompute every loaded
    /// attachment's converters.
    pub async fn set_capabilities(&self, available: HashSet<ConverterType>) {
        let jobs: Vec<ConversionJob> = {
            let mut state = self.inner.state.write().await;
            let State { slots, catalog } = &mut *state;
            catalog.set_available(available);
            slots
                .iter_mut()
                .filter_map(|slot| recompute_converters(slot, catalog, &self.inner.events, false))
                .collect()
        };
        for job in jobs {
            self.spawn_conversion(job);
        }
        self.bump_revision();
    }

    /// Health-check the registered converters and use the healthy ones as
    /// the capability set.
    pub async fn refresh_capabilities(&self) -> HashSet<ConverterType> {
        let healthy = self.inner.registry.healthy_types().await;
        debug!(available = ?healthy, "Converter capabilities refreshed");
        self.set_capabilities(healthy.clone()).await;
        healthy
    }

    // =========================================================================
    // INLINING
    // =========================================================================

    /// Render an attachment's text outputs for the composer. The attachment
    /// stays in the collection.
    pub async fn inline_attachment(&self, id: AttachmentId) -> Result<String> {
        let state = self.inner.state.read().await;
        inline_text(&state.slot(id)?.attachment)
    }

    /// Inline every attachment that has text outputs, in collection order.
    pub async fn inline_all_text(&self) -> Vec<InlinedText> {
        let state = self.inner.state.read().await;
        state
            .slots
            .iter()
            .filter_map(|slot| {
                let attachment = &slot.attachment;
                inline_text(attachment).ok().map(|text| InlinedText {
                    attachment_id: attachment.id,
                    label: attachment.label.clone(),
                    text,
                })
            })
            .collect()
    }

    /// Debug summary of input and outputs; `None` until the input is loaded.
    pub async fn describe_io(&self, id: AttachmentId) -> Result<Option<String>> {
        let state = self.inner.state.read().await;
        Ok(describe_io(&state.slot(id)?.attachment))
    }

    /// Copy the raw outputs to a clipboard. Returns `false` when there is
    /// nothing to copy.
    pub async fn copy_outputs_to_clipboard(
        &self,
        id: AttachmentId,
        sink: &dyn ClipboardSink,
    ) -> Result<bool> {
        let text = {
            let state = self.inner.state.read().await;
            clipboard_text(&state.slot(id)?.attachment.outputs)
        };
        match text {
            Some(text) => {
                sink.copy(&text, "Converted attachment");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub async fn get(&self, id: AttachmentId) -> Option<Attachment> {
        let state = self.inner.state.read().await;
        state.slot(id).ok().map(|slot| slot.attachment.clone())
    }

    /// Clones of every attachment, in collection order.
    pub async fn snapshot(&self) -> Vec<Attachment> {
        let state = self.inner.state.read().await;
        state.slots.iter().map(|s| s.attachment.clone()).collect()
    }

    pub async fn get_converters(&self, id: AttachmentId) -> Result<Vec<Converter>> {
        let state = self.inner.state.read().await;
        Ok(state.slot(id)?.attachment.converters.clone())
    }

    pub async fn position(&self, id: AttachmentId) -> Option<usize> {
        self.inner.state.read().await.index_of(id)
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Status against the configured accepted output part types.
    pub async fn status(&self, id: AttachmentId) -> Option<AttachmentStatus> {
        let state = self.inner.state.read().await;
        state
            .slot(id)
            .ok()
            .map(|slot| slot.attachment.status(&self.inner.config.accepted_output_part_types))
    }

    async fn any_busy(&self) -> bool {
        let state = self.inner.state.read().await;
        state
            .slots
            .iter()
            .any(|slot| slot.attachment.status(&[]).is_busy())
    }

    /// Wait until no attachment is loading or converting.
    pub async fn settled(&self) {
        let mut revision = self.inner.revision.subscribe();
        loop {
            if !self.any_busy().await {
                return;
            }
            if revision.changed().await.is_err() {
                return;
            }
        }
    }
}
