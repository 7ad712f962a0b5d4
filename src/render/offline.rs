//! Offline render engine
//!
//! Executes a render graph once over the full signal, node by node in
//! graph order. A node's output is freed as soon as its last reader has
//! run, and a sole reader takes its input over instead of copying it.

use std::time::Instant;

use log::{debug, info};

use crate::dsp::{convolve, mix_channels, play_source, weighted_sum, SourceSettings};
use crate::engine::{RenderContext, SampleBuffer};
use crate::error::{Result, StudioError};
use crate::render::graph::{NodeId, RenderGraph, RenderNode};

/// Lowest sample rate a render accepts
pub const MIN_SAMPLE_RATE: u32 = 3_000;
/// Highest sample rate a render accepts
pub const MAX_SAMPLE_RATE: u32 = 768_000;
/// Highest channel count a render accepts
pub const MAX_CHANNELS: usize = 32;

type Channels = Vec<Vec<f32>>;

/// Runs render graphs against a session context
#[derive(Debug, Clone, Copy)]
pub struct OfflineRenderer<'c> {
    context: &'c RenderContext,
}

impl<'c> OfflineRenderer<'c> {
    pub fn new(context: &'c RenderContext) -> Self {
        Self { context }
    }

    /// Render `graph` into a new buffer of exactly `output_length` frames
    ///
    /// # Errors
    /// * `ContextClosed` - if the session context has been released
    /// * `RenderFailure` - if the sample rate, channel count, or length is
    ///   out of range, or the graph has no sink
    pub fn render(
        &self,
        graph: &RenderGraph<'_>,
        output_length: usize,
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<SampleBuffer> {
        self.context.ensure_open()?;
        validate_render(output_length, channel_count, sample_rate)?;

        let sink = graph.sink().ok_or_else(|| StudioError::RenderFailure {
            reason: "graph has no sink".to_string(),
        })?;

        let start = Instant::now();
        let last_uses = graph.last_uses();
        let mut outputs: Vec<Option<Channels>> = vec![None; graph.len()];

        for (id, node) in graph.nodes().iter().enumerate() {
            let output = self.run_node(
                graph,
                id,
                node,
                &mut outputs,
                &last_uses,
                output_length,
                sample_rate,
            )?;
            debug!("[RENDER] {} node {} done", node.kind(), id);

            for input in node.inputs() {
                if last_uses[input] == Some(id) {
                    outputs[input] = None;
                }
            }
            outputs[id] = Some(output);
        }

        let result = outputs[sink].take().ok_or_else(|| StudioError::RenderFailure {
            reason: format!("sink node {} produced no output", sink),
        })?;

        let channels = if result.len() == channel_count {
            result
        } else {
            mix_channels(&result, channel_count)
        };

        let buffer = SampleBuffer::from_channels(channels, sample_rate)
            .map_err(|e| StudioError::RenderFailure {
                reason: e.to_string(),
            })?;

        info!(
            "Rendered {} frames x {} ch at {} Hz in {:.1} ms",
            buffer.frames(),
            buffer.num_channels(),
            sample_rate,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(buffer)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_node(
        &self,
        graph: &RenderGraph<'_>,
        id: NodeId,
        node: &RenderNode,
        outputs: &mut [Option<Channels>],
        last_uses: &[Option<usize>],
        frames: usize,
        sample_rate: u32,
    ) -> Result<Channels> {
        let output = match node {
            RenderNode::Source { settings } => {
                let source = graph.source();
                // Source frames are consumed at the context rate
                let ratio = source.sample_rate as f64 / sample_rate as f64;
                let settings = SourceSettings {
                    playback_rate: settings.playback_rate * ratio,
                    ..*settings
                };
                play_source(source, settings, frames)
            }
            RenderNode::Gain { input, gain } => {
                let mut channels = take_input(outputs, last_uses, *input, id)?;
                gain.process(&mut channels);
                channels
            }
            RenderNode::Convolver { input, impulse } => {
                convolve(self.context, input_ref(outputs, *input)?, impulse, frames)?
            }
            RenderNode::FeedbackDelay { input, delay } => {
                delay.process(input_ref(outputs, *input)?)
            }
            RenderNode::Mix { inputs } => {
                let outputs: &[Option<Channels>] = outputs;
                let sources = inputs
                    .iter()
                    .map(|&(input, weight)| Ok((input_ref(outputs, input)?.as_slice(), weight)))
                    .collect::<Result<Vec<_>>>()?;
                weighted_sum(&sources, frames)
            }
        };

        Ok(output)
    }
}

fn validate_render(output_length: usize, channel_count: usize, sample_rate: u32) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(StudioError::RenderFailure {
            reason: format!(
                "sample rate {} Hz outside {}-{} Hz",
                sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            ),
        });
    }

    if channel_count == 0 || channel_count > MAX_CHANNELS {
        return Err(StudioError::RenderFailure {
            reason: format!("channel count {} outside 1-{}", channel_count, MAX_CHANNELS),
        });
    }

    if output_length == 0 {
        return Err(StudioError::RenderFailure {
            reason: "render length is zero frames".to_string(),
        });
    }

    Ok(())
}

fn input_ref(outputs: &[Option<Channels>], input: NodeId) -> Result<&Channels> {
    outputs
        .get(input)
        .and_then(Option::as_ref)
        .ok_or_else(|| StudioError::RenderFailure {
            reason: format!("output of node {} is not available", input),
        })
}

/// Move the input out when `reader` is its last user, copy it otherwise
fn take_input(
    outputs: &mut [Option<Channels>],
    last_uses: &[Option<usize>],
    input: NodeId,
    reader: NodeId,
) -> Result<Channels> {
    if last_uses.get(input).copied().flatten() == Some(reader) {
        if let Some(channels) = outputs.get_mut(input).and_then(Option::take) {
            return Ok(channels);
        }
    }
    input_ref(outputs, input).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{EffectParams, Gain};
    use crate::render::builder::GraphBuilder;

    fn ramp(frames: usize) -> SampleBuffer {
        let samples = (0..frames).map(|i| i as f32 / frames as f32).collect();
        SampleBuffer::from_channels(vec![samples], 44100).unwrap()
    }

    fn render_params(original: &SampleBuffer, params: EffectParams) -> Result<SampleBuffer> {
        let context = RenderContext::acquire();
        let (graph, length) = GraphBuilder::with_seed(5).build(original, &params)?;
        OfflineRenderer::new(&context).render(
            &graph,
            length,
            original.num_channels(),
            original.sample_rate,
        )
    }

    #[test]
    fn test_identity_render() {
        let original = ramp(1000);
        let rendered = render_params(&original, EffectParams::default()).unwrap();
        assert_eq!(rendered, original);
    }

    #[test]
    fn test_gain_only_render() {
        let original = ramp(64);
        let params = EffectParams {
            volume: 0.5,
            ..EffectParams::default()
        };
        let rendered = render_params(&original, params).unwrap();
        for (out, inp) in rendered.channel(0).iter().zip(original.channel(0)) {
            assert_eq!(*out, inp * 0.5);
        }
    }

    #[test]
    fn test_mono_reverb_stays_mono() {
        let original = ramp(4410);
        let params = EffectParams {
            reverb: 0.5,
            ..EffectParams::default()
        };
        let rendered = render_params(&original, params).unwrap();
        assert_eq!(rendered.num_channels(), 1);
        assert_eq!(rendered.frames(), 4410);
        assert_ne!(rendered, original);
    }

    #[test]
    fn test_echo_mix() {
        let mut samples = vec![0.0; 22050];
        samples[0] = 1.0;
        let original = SampleBuffer::from_channels(vec![samples], 44100).unwrap();
        let params = EffectParams {
            echo: 0.5,
            ..EffectParams::default()
        };
        let rendered = render_params(&original, params).unwrap();

        // dry * 0.5 at 0, wet * 0.5 at 250 ms, feedback 0.3 at 500 ms is past the end
        assert_eq!(rendered.channel(0)[0], 0.5);
        assert_eq!(rendered.channel(0)[11025], 0.5);
        assert_eq!(rendered.channel(0)[11024], 0.0);
    }

    #[test]
    fn test_render_validation() {
        let context = RenderContext::acquire();
        let original = ramp(10);
        let (graph, length) = GraphBuilder::new()
            .build(&original, &EffectParams::default())
            .unwrap();
        let renderer = OfflineRenderer::new(&context);

        let cases = [
            (length, 1, 2_000),
            (length, 1, 800_000),
            (length, 0, 44100),
            (length, 33, 44100),
            (0, 1, 44100),
        ];
        for (len, ch, rate) in cases {
            assert!(
                matches!(
                    renderer.render(&graph, len, ch, rate),
                    Err(StudioError::RenderFailure { .. })
                ),
                "len {} ch {} rate {}",
                len,
                ch,
                rate
            );
        }
    }

    #[test]
    fn test_empty_source_fails() {
        let original = SampleBuffer::silent(1, 0, 44100);
        let result = render_params(&original, EffectParams::default());
        assert!(matches!(result, Err(StudioError::RenderFailure { .. })));
    }

    #[test]
    fn test_missing_sink_fails() {
        let context = RenderContext::acquire();
        let original = ramp(10);
        let mut graph = RenderGraph::new(&original);
        graph
            .add_node(RenderNode::Source {
                settings: SourceSettings::default(),
            })
            .unwrap();
        let result = OfflineRenderer::new(&context).render(&graph, 10, 1, 44100);
        assert!(matches!(result, Err(StudioError::RenderFailure { .. })));
    }

    #[test]
    fn test_shared_input_is_copied() {
        let context = RenderContext::acquire();
        let original = SampleBuffer::from_channels(vec![vec![1.0; 4]], 44100).unwrap();
        let mut graph = RenderGraph::new(&original);
        let source = graph
            .add_node(RenderNode::Source {
                settings: SourceSettings::default(),
            })
            .unwrap();
        let half = graph
            .add_node(RenderNode::Gain {
                input: source,
                gain: Gain::new(0.5),
            })
            .unwrap();
        let mix = graph
            .add_node(RenderNode::Mix {
                inputs: vec![(source, 1.0), (half, 1.0)],
            })
            .unwrap();
        graph.connect_sink(mix).unwrap();

        let rendered = OfflineRenderer::new(&context).render(&graph, 4, 2, 44100).unwrap();
        assert_eq!(rendered.channels, vec![vec![1.5; 4], vec![1.5; 4]]);
    }

    #[test]
    fn test_closed_context() {
        let context = RenderContext::acquire();
        context.close();
        let original = ramp(10);
        let (graph, length) = GraphBuilder::new()
            .build(&original, &EffectParams::default())
            .unwrap();
        let result = OfflineRenderer::new(&context).render(&graph, length, 1, 44100);
        assert!(matches!(result, Err(StudioError::ContextClosed)));
    }
}
