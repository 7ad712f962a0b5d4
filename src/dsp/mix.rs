//! Channel mixing
//!
//! Up/down-mixing between channel counts and weighted summing of
//! several signals, as done at every node input that has more than one
//! connection.
//!
//! Mono and stereo convert with speaker rules: mono is copied to both
//! sides, stereo is averaged to mono. Every other combination is
//! discrete: missing channels are silent, extra channels are dropped.

/// Convert `input` to `target_channels` channels
pub fn mix_channels(input: &[Vec<f32>], target_channels: usize) -> Vec<Vec<f32>> {
    let source_channels = input.len();
    let frames = input.first().map_or(0, Vec::len);

    if source_channels == target_channels {
        return input.to_vec();
    }

    match (source_channels, target_channels) {
        (1, 2) => vec![input[0].clone(), input[0].clone()],
        (2, 1) => vec![input[0]
            .iter()
            .zip(&input[1])
            .map(|(&l, &r)| 0.5 * (l + r))
            .collect()],
        _ => (0..target_channels)
            .map(|ch| input.get(ch).cloned().unwrap_or_else(|| vec![0.0; frames]))
            .collect(),
    }
}

/// Sum `inputs`, each scaled by its weight
///
/// The result has as many channels as the widest input; narrower inputs
/// are up-mixed first. Every input must hold `frames` frames.
pub fn weighted_sum(inputs: &[(&[Vec<f32>], f32)], frames: usize) -> Vec<Vec<f32>> {
    let width = inputs
        .iter()
        .map(|(channels, _)| channels.len())
        .max()
        .unwrap_or(0);

    let mut output = vec![vec![0.0_f32; frames]; width];

    for &(channels, weight) in inputs {
        let upmixed;
        let channels = if channels.len() == width {
            channels
        } else {
            upmixed = mix_channels(channels, width);
            upmixed.as_slice()
        };

        for (out, input) in output.iter_mut().zip(channels) {
            for (o, &s) in out.iter_mut().zip(input) {
                *o += s * weight;
            }
        }
    }

    output
}
