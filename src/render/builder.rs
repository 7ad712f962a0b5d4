//! Effect graph builder
//!
//! Turns an original buffer and a parameter set into a render graph:
//!
//! ```text
//! source -> gain -> [reverb: dry/wet mix] -> [echo: dry/wet mix] -> sink
//! ```
//!
//! Reverb and echo stages are only instantiated when their wet fraction
//! is above zero, so gain-only changes render bit-identically.

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dsp::reverb::generate_impulse_response;
use crate::dsp::{EffectParams, FeedbackDelay, Gain, SourceSettings};
use crate::engine::SampleBuffer;
use crate::error::{Result, StudioError};
use crate::render::graph::{NodeId, RenderGraph, RenderNode};

/// Frames a render produces for a source length and speed
///
/// `ceil(frames / speed)`; speeding up shortens the result, slowing down
/// lengthens it.
pub fn output_length(frames: usize, speed: f64) -> usize {
    (frames as f64 / speed).ceil() as usize
}

/// Builds one render graph per call
#[derive(Debug)]
pub struct GraphBuilder {
    rng: StdRng,
}

impl GraphBuilder {
    /// Builder whose impulse responses are fresh noise on every build
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Builder whose impulse responses are generated from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is set, random otherwise
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::with_seed)
    }

    /// Build the graph for `params` over `original`
    ///
    /// Returns the graph and the number of frames to render.
    ///
    /// # Errors
    /// * `InvalidParameter` - if a parameter is outside its range
    /// * `RenderFailure` - if `original` breaks the buffer invariant
    pub fn build<'a>(
        &mut self,
        original: &'a SampleBuffer,
        params: &EffectParams,
    ) -> Result<(RenderGraph<'a>, usize)> {
        params.validate()?;
        original.validate().map_err(|e| StudioError::RenderFailure {
            reason: e.to_string(),
        })?;

        let length = output_length(original.frames(), params.speed);
        let mut graph = RenderGraph::new(original);

        let source = graph.add_node(RenderNode::Source {
            settings: SourceSettings {
                playback_rate: params.speed,
                detune_cents: params.detune_cents(),
            },
        })?;

        let mut tail = graph.add_node(RenderNode::Gain {
            input: source,
            gain: Gain::new(params.volume as f32),
        })?;

        if params.reverb > 0.0 {
            tail = self.add_reverb(&mut graph, tail, params.reverb, original.sample_rate)?;
        }

        if params.echo > 0.0 {
            tail = add_echo(&mut graph, tail, params.echo, original.sample_rate)?;
        }

        graph.connect_sink(tail)?;

        debug!(
            "[GRAPH] Built {:?} for {} -> {} frames",
            graph.kinds(),
            original.frames(),
            length
        );

        Ok((graph, length))
    }

    fn add_reverb(
        &mut self,
        graph: &mut RenderGraph<'_>,
        input: NodeId,
        reverb: f64,
        sample_rate: u32,
    ) -> Result<NodeId> {
        let impulse = generate_impulse_response(sample_rate, &mut self.rng);
        let wet = graph.add_node(RenderNode::Convolver { input, impulse })?;

        graph.add_node(RenderNode::Mix {
            inputs: vec![(input, (1.0 - reverb) as f32), (wet, reverb as f32)],
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn add_echo(
    graph: &mut RenderGraph<'_>,
    input: NodeId,
    echo: f64,
    sample_rate: u32,
) -> Result<NodeId> {
    let delay = FeedbackDelay::for_echo(echo, sample_rate);
    let wet = graph.add_node(RenderNode::FeedbackDelay { input, delay })?;

    graph.add_node(RenderNode::Mix {
        inputs: vec![(input, (1.0 - echo) as f32), (wet, echo as f32)],
    })
}
