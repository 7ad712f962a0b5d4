//! Editor session
//!
//! Holds everything one editing session needs: the processing context,
//! the original upload, the current rendered buffer, the active
//! parameters, and the playback transport. Every render starts from the
//! original upload, never from the previous result.

use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::config::StudioConfig;
use crate::dsp::{EffectParams, Preset};
use crate::engine::buffer::SampleBuffer;
use crate::engine::context::RenderContext;
use crate::engine::playback::PlaybackCoordinator;
use crate::engine::upload::{AudioDecoder, UploadedAudio};
use crate::error::{Result, StudioError};
use crate::export::{export_buffer, ExportFormat, ExportedFile};
use crate::render::AudioProcessor;

/// One editing session, from upload to download
#[derive(Debug)]
pub struct EditorSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: StudioConfig,
    processor: AudioProcessor,
    source: Option<UploadedAudio>,
    current: Option<SampleBuffer>,
    params: EffectParams,
    last_rendered: Option<EffectParams>,
    playback: PlaybackCoordinator,
}

impl EditorSession {
    /// Start a session, acquiring its processing context
    pub fn new(config: StudioConfig) -> Self {
        let processor =
            AudioProcessor::new(RenderContext::acquire()).with_impulse_seed(config.impulse_seed);
        let playback = PlaybackCoordinator::new(config.recovery_delay());
        let id = Uuid::new_v4();

        info!("Session {} started", id);

        Self {
            id,
            created_at: Utc::now(),
            config,
            processor,
            source: None,
            current: None,
            params: EffectParams::default(),
            last_rendered: None,
            playback,
        }
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Accept an uploaded file as the session's original
    ///
    /// On any error the session is left exactly as it was.
    pub fn upload(
        &mut self,
        file_name: &str,
        media_type: Option<&str>,
        bytes: &[u8],
        decoder: &dyn AudioDecoder,
    ) -> Result<&UploadedAudio> {
        self.processor.context().ensure_open()?;

        let upload = UploadedAudio::accept(
            file_name,
            media_type,
            bytes,
            self.config.max_upload_bytes,
            decoder,
        )?;

        // The identity render of the original is the original itself
        self.current = Some(upload.buffer.clone());
        self.params = EffectParams::default();
        self.last_rendered = Some(self.params);
        self.playback.load(&upload.buffer);

        Ok(&*self.source.insert(upload))
    }

    // ========================================================================
    // Effects
    // ========================================================================

    /// Render `params` against the original and make the result current
    ///
    /// Parameters within `param_epsilon` of the last render reuse the
    /// current buffer. On failure the current buffer and parameters stay
    /// as they were.
    pub fn apply_params(&mut self, params: EffectParams) -> Result<&SampleBuffer> {
        params.validate()?;
        let source = self.source.as_ref().ok_or(StudioError::NoAudioLoaded)?;

        let cached = self
            .last_rendered
            .is_some_and(|last| last.approx_eq(&params, self.config.param_epsilon));

        if cached && self.current.is_some() {
            debug!("[SESSION] Parameters unchanged; reusing current buffer");
            self.params = params;
        } else {
            let rendered = self.processor.process(&source.buffer, &params)?;
            self.playback.swap_buffer(&rendered);
            self.current = Some(rendered);
            self.params = params;
            self.last_rendered = Some(params);
        }

        self.current.as_ref().ok_or(StudioError::NoAudioLoaded)
    }

    /// Apply a preset's parameters
    pub fn apply_preset(&mut self, preset: Preset) -> Result<&SampleBuffer> {
        self.apply_params(preset.params())
    }

    /// Encode the current buffer for download
    ///
    /// Uses the configured format when `format` is `None`.
    pub fn export(&self, format: Option<ExportFormat>) -> Result<ExportedFile> {
        let source = self.source.as_ref().ok_or(StudioError::NoAudioLoaded)?;
        let current = self.current.as_ref().ok_or(StudioError::NoAudioLoaded)?;

        export_buffer(
            current,
            &source.file_name,
            &self.params,
            format.unwrap_or(self.config.export_format),
        )
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Drop the upload and return to the pre-upload state
    pub fn reset(&mut self) {
        self.source = None;
        self.current = None;
        self.params = EffectParams::default();
        self.last_rendered = None;
        self.playback.reset();
        debug!("[SESSION] Reset {}", self.id);
    }

    /// End the session and release its processing context
    pub fn close(&mut self) {
        self.reset();
        self.processor.close();
    }

    pub fn is_closed(&self) -> bool {
        !self.processor.context().is_open()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&UploadedAudio> {
        self.source.as_ref()
    }

    /// The original decoded upload
    pub fn original(&self) -> Option<&SampleBuffer> {
        self.source.as_ref().map(|source| &source.buffer)
    }

    /// The buffer playback and export use
    pub fn current(&self) -> Option<&SampleBuffer> {
        self.current.as_ref()
    }

    /// Parameters of the current buffer
    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    /// True when any parameter differs from its default
    pub fn is_modified(&self) -> bool {
        self.params.is_modified()
    }

    /// True while a render is in flight
    pub fn is_processing(&self) -> bool {
        self.processor.is_processing()
    }

    pub fn processor(&self) -> &AudioProcessor {
        &self.processor
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackCoordinator {
        &mut self.playback
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(StudioConfig::default())
    }
}
