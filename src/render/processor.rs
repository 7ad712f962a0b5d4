//! Audio processor
//!
//! Owns the session context and lets at most one render run at a time.
//! A second request while one is in flight is rejected, never queued.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};

use crate::dsp::EffectParams;
use crate::engine::{RenderContext, SampleBuffer};
use crate::error::{Result, StudioError};
use crate::render::builder::GraphBuilder;
use crate::render::offline::OfflineRenderer;

/// Renders effect parameters against an original buffer
#[derive(Debug)]
pub struct AudioProcessor {
    context: RenderContext,
    processing: AtomicBool,
    impulse_seed: Option<u64>,
}

impl AudioProcessor {
    /// Processor owning `context`
    pub fn new(context: RenderContext) -> Self {
        Self {
            context,
            processing: AtomicBool::new(false),
            impulse_seed: None,
        }
    }

    /// Generate reverb impulses from a fixed seed, making renders reproducible
    pub fn with_impulse_seed(mut self, seed: Option<u64>) -> Self {
        self.impulse_seed = seed;
        self
    }

    pub fn impulse_seed(&self) -> Option<u64> {
        self.impulse_seed
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// True while a render ticket is held
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Claim the processor for one render
    ///
    /// The claim is released when the returned ticket is dropped.
    ///
    /// # Errors
    /// * `ContextClosed` - if the context has been released
    /// * `AlreadyProcessing` - if another ticket is alive
    pub fn begin_render(&self) -> Result<RenderTicket<'_>> {
        self.context.ensure_open()?;

        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Render rejected: already processing");
            return Err(StudioError::AlreadyProcessing);
        }

        Ok(RenderTicket { processor: self })
    }

    /// Render `params` over `original` in one step
    pub fn process(&self, original: &SampleBuffer, params: &EffectParams) -> Result<SampleBuffer> {
        self.begin_render()?.render(original, params)
    }

    /// Release the context; later renders fail with `ContextClosed`
    pub fn close(&self) {
        self.context.close();
    }
}

/// Exclusive right to run one render on an `AudioProcessor`
#[derive(Debug)]
pub struct RenderTicket<'p> {
    processor: &'p AudioProcessor,
}

impl RenderTicket<'_> {
    /// Build and render the graph for `params`
    ///
    /// The original is only read; the result is a new buffer with the
    /// original's channel count and sample rate.
    pub fn render(&self, original: &SampleBuffer, params: &EffectParams) -> Result<SampleBuffer> {
        let processor = self.processor;

        let result = GraphBuilder::from_seed(processor.impulse_seed)
            .build(original, params)
            .and_then(|(graph, length)| {
                OfflineRenderer::new(&processor.context).render(
                    &graph,
                    length,
                    original.num_channels(),
                    original.sample_rate,
                )
            });

        match &result {
            Ok(buffer) => info!(
                "Applied speed {:.2} pitch {:.2} volume {:.2} reverb {:.2} echo {:.2}: {:.2}s -> {:.2}s",
                params.speed,
                params.pitch,
                params.volume,
                params.reverb,
                params.echo,
                original.duration_secs(),
                buffer.duration_secs()
            ),
            Err(e) => error!("Error processing audio: {}", e),
        }

        result
    }
}

impl Drop for RenderTicket<'_> {
    fn drop(&mut self) {
        self.processor.processing.store(false, Ordering::Release);
    }
}
