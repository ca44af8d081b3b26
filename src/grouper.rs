//! Groups (possibly packed) values into textures, and textures into passes
//!.

use crate::error::PlanError;
use crate::value::Value;

/// The `buffersMax` configuration knob: either a positive limit on color
/// attachments per pass, or "no output, run the pass once for side
/// effects".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffersMax {
    Limit(usize),
    NoOutput,
}

/// Forward and inverse maps produced by [`group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrouperOutput {
    /// Ordered lists of value indices, one per texture.
    pub textures: Vec<Vec<usize>>,
    /// Ordered lists of texture indices, one per pass.
    pub passes: Vec<Vec<usize>>,
    /// `value_to_texture[v]` is the texture containing value `v`.
    pub value_to_texture: Vec<usize>,
    /// `value_to_pass[v]` is the pass that writes value `v`.
    pub value_to_pass: Vec<usize>,
    /// `texture_to_pass[t]` is the pass containing texture `t`.
    pub texture_to_pass: Vec<usize>,
}

/// Walks `values` in `packed` order, packing them into textures of at most
/// `channels_max` channels and grouping textures into passes of at most
/// `buffers_max` textures.
pub fn group(
    values: &[Value],
    packed: &[usize],
    channels_max: u8,
    buffers_max: BuffersMax,
) -> Result<GrouperOutput, PlanError> {
    if channels_max == 0 {
        return Err(PlanError::CapabilityMismatch {
            reason: "channels_max must be >= 1".to_string(),
        });
    }
    if let BuffersMax::Limit(0) = buffers_max {
        return Err(PlanError::CapabilityMismatch {
            reason: "buffers_max must be >= 1 when outputs are demanded".to_string(),
        });
    }
    for (i, v) in values.iter().enumerate() {
        v.validate(i, channels_max)?;
    }

    let mut textures: Vec<Vec<usize>> = Vec::new();
    let mut passes: Vec<Vec<usize>> = Vec::new();
    let mut texture_to_pass: Vec<usize> = Vec::new();
    let mut value_to_texture = vec![0usize; values.len()];

    let mut cur_tex: Vec<usize> = Vec::new();
    let mut cur_tex_channels: u8 = 0;
    let mut cur_pass: Vec<usize> = Vec::new();

    for &vi in packed {
        let c = values[vi].channels;
        let fits = cur_tex_channels.checked_add(c).map_or(false, |sum| sum <= channels_max);
        if cur_tex.is_empty() || !fits {
            if !cur_tex.is_empty() {
                textures.push(std::mem::take(&mut cur_tex));
                cur_tex_channels = 0;
            }
            if let BuffersMax::Limit(n) = buffers_max {
                if cur_pass.len() >= n {
                    passes.push(std::mem::take(&mut cur_pass));
                }
            }
            let texture_index = textures.len();
            cur_pass.push(texture_index);
            texture_to_pass.push(passes.len());
        }
        value_to_texture[vi] = textures.len();
        cur_tex.push(vi);
        cur_tex_channels += c;
    }
    if !cur_tex.is_empty() {
        textures.push(cur_tex);
    }
    if !cur_pass.is_empty() {
        passes.push(cur_pass);
    }

    let mut value_to_pass = vec![0usize; values.len()];
    for (vi, &ti) in value_to_texture.iter().enumerate() {
        value_to_pass[vi] = texture_to_pass[ti];
    }

    log::debug!(
        "grouped {} values into {} textures, {} passes",
        values.len(),
        textures.len(),
        passes.len()
    );

    Ok(GrouperOutput {
        textures,
        passes,
        value_to_texture,
        value_to_pass,
        texture_to_pass,
    })
}
