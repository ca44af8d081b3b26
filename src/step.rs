//! The step driver: advances `stepNow`, rotates each
//! texture's `steps`-deep ring, and drives one backend command per pass
//! per frame. Grounded on `compute::multipass::MultiPassManager`'s
//! ping-pong `(texture0, texture1)` pairs, generalized here from two
//! slots to an N-slot ring so `stepAgo` can reach further back than one
//! frame.

use crate::backend::{
    CommandDesc, DrawContext, FramebufferDesc, GpgpuBackend, TextureDesc, UniformValue, Viewport,
};
use crate::config::DEFAULT_VERT;
use crate::error::BackendError;
use crate::grouper::GrouperOutput;
use crate::value::Value;

/// Name the atlas-copy command binds its source texture under. Namespaced
/// the same way the macro generator namespaces everything else, since
/// this uniform name can collide with user shader identifiers just like
/// any other generated one.
const ATLAS_COPY_SRC_UNIFORM: &str = "gpgpu_copy_src";

/// Fragment shader for the merged-atlas tile copy: samples the
/// newly-written step texture and writes it straight through. Paired
/// with [`DEFAULT_VERT`] and a [`crate::backend::Viewport`] restricting
/// the draw to the destination tile.
const ATLAS_COPY_FRAG: &str = r#"#version 300 es
precision highp float;
uniform sampler2D gpgpu_copy_src;
in vec2 uv;
out vec4 gpgpu_copy_out;
void main() {
    gpgpu_copy_out = texture(gpgpu_copy_src, uv);
}
"#;

/// Computes the ring slot `steps_back` positions behind `step_now`, for a
/// ring of length `steps`. `steps_back = bound + stepAgo` converts a
/// derive's `(stepAgo)` into a physical slot: `bound`
/// steps are reserved so nothing reads what this frame is about to
/// write.
pub fn ring_slot(step_now: u32, steps: u32, steps_back: u32) -> usize {
    let s = steps.max(1);
    (((step_now % s) + s - (steps_back % s)) % s) as usize
}

/// What a per-pass command builder needs to address the ring and target
/// the right framebuffer for this frame.
pub struct PassContext<'a, Tex, Fb> {
    pub pass_index: usize,
    pub framebuffer: &'a Fb,
    /// `ring[texture_index][slot]`, the full texture ring.
    pub ring: &'a [Vec<Tex>],
    pub step_now: u32,
    pub steps: u32,
}

impl<'a, Tex, Fb> PassContext<'a, Tex, Fb> {
    /// The texture holding `texture_index` as of `steps_back` slots
    /// behind the current step.
    pub fn sample(&self, texture_index: usize, steps_back: u32) -> &Tex {
        &self.ring[texture_index][ring_slot(self.step_now, self.steps, steps_back)]
    }
}

/// Owns the texture ring and per-pass, per-slot framebuffers, and
/// advances `stepNow` one frame at a time.
pub struct StepDriver<Tex, Fb> {
    pub step_now: u32,
    step_max: Option<u32>,
    steps: u32,
    width: u32,
    height: u32,
    /// `ring[texture_index][slot]`.
    ring: Vec<Vec<Tex>>,
    /// `framebuffers[pass_index][slot]`.
    framebuffers: Vec<Vec<Fb>>,
    /// `passes[pass_index]`, the texture indices written by that pass —
    /// kept so the atlas copy knows which ring textures to read per pass
    /// without borrowing the grouper back in.
    passes: Vec<Vec<usize>>,
    /// The merged-atlas texture and its framebuffer, present only when
    /// the atlas addressing strategy is active.
    atlas: Option<(Tex, Fb)>,
    clear_before_draw: bool,
}

impl<Tex: Clone, Fb: Clone> StepDriver<Tex, Fb> {
    /// Allocates the texture ring and per-pass framebuffers for every
    /// slot up front, plus an atlas texture/framebuffer when `merge` is
    /// set.
    pub fn build<B: GpgpuBackend<Texture = Tex, Framebuffer = Fb>>(
        backend: &mut B,
        grouper: &GrouperOutput,
        values: &[Value],
        width: u32,
        height: u32,
        steps: u32,
        step_max: Option<u32>,
        merge: bool,
        clear_before_draw: bool,
    ) -> Result<Self, BackendError> {
        let mut ring: Vec<Vec<Tex>> = Vec::with_capacity(grouper.textures.len());
        for value_indices in &grouper.textures {
            let channels = value_indices.iter().map(|&v| values[v].channels).sum();
            let mut slots = Vec::with_capacity(steps as usize);
            for _ in 0..steps {
                let tex = backend
                    .texture(TextureDesc {
                        kind: crate::backend::TextureType::Float,
                        min: crate::backend::Filter::Nearest,
                        mag: crate::backend::Filter::Nearest,
                        wrap: crate::backend::Wrap::Clamp,
                        width,
                        height,
                        channels,
                    })
                    .map_err(|e| BackendError::BackendResourceFailure(Box::new(e)))?;
                slots.push(tex);
            }
            ring.push(slots);
        }

        let mut framebuffers: Vec<Vec<Fb>> = Vec::with_capacity(grouper.passes.len());
        for texture_indices in &grouper.passes {
            let mut slots = Vec::with_capacity(steps as usize);
            for slot in 0..steps as usize {
                let color = texture_indices
                    .iter()
                    .map(|&ti| ring[ti][slot].clone())
                    .collect();
                let fb = backend
                    .framebuffer(FramebufferDesc {
                        depth: false,
                        stencil: false,
                        width,
                        height,
                        color,
                    })
                    .map_err(|e| BackendError::BackendResourceFailure(Box::new(e)))?;
                slots.push(fb);
            }
            framebuffers.push(slots);
        }

        let atlas = if merge {
            let total_channels: u8 = values.iter().map(|v| v.channels).max().unwrap_or(4);
            let atlas_tex = backend
                .texture(TextureDesc {
                    kind: crate::backend::TextureType::Float,
                    min: crate::backend::Filter::Nearest,
                    mag: crate::backend::Filter::Nearest,
                    wrap: crate::backend::Wrap::Clamp,
                    width: width * grouper.textures.len().max(1) as u32,
                    height: height * steps.max(1),
                    channels: total_channels,
                })
                .map_err(|e| BackendError::BackendResourceFailure(Box::new(e)))?;
            let atlas_fb = backend
                .framebuffer(FramebufferDesc {
                    depth: false,
                    stencil: false,
                    width: width * grouper.textures.len().max(1) as u32,
                    height: height * steps.max(1),
                    color: vec![atlas_tex.clone()],
                })
                .map_err(|e| BackendError::BackendResourceFailure(Box::new(e)))?;
            Some((atlas_tex, atlas_fb))
        } else {
            None
        };

        Ok(Self {
            step_now: 0,
            step_max,
            steps,
            width,
            height,
            ring,
            framebuffers,
            passes: grouper.passes.clone(),
            atlas,
            clear_before_draw,
        })
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn ring(&self) -> &[Vec<Tex>] {
        &self.ring
    }

    pub fn atlas_texture(&self) -> Option<&Tex> {
        self.atlas.as_ref().map(|(tex, _)| tex)
    }

    /// Advances to the next frame. `stepNow` is incremented *before* the
    /// frame's passes run, so `current_slot()` already reflects the slot
    /// this frame writes into. Wraps to zero once `step_max` (if set) is
    /// exceeded, so the counter never overflows in a long-running
    /// driver. [`Self::step`] calls this itself; it is only exposed
    /// separately so a caller can inspect `current_slot()`/`step_now`
    /// ahead of building its per-pass commands.
    pub fn advance(&mut self) {
        self.step_now = self.step_now.wrapping_add(1);
        if let Some(max) = self.step_max {
            if self.step_now > max {
                self.step_now = 0;
            }
        }
    }

    pub fn current_slot(&self) -> usize {
        ring_slot(self.step_now, self.steps, 0)
    }

    /// Runs one frame: advances `stepNow`, then for each pass optionally
    /// clears its current-slot framebuffer, asks `build_command` for a
    /// [`CommandDesc`] targeting that framebuffer, and issues it to
    /// `backend`. When a merged atlas is in use, each pass's newly
    /// written textures are copied into their atlas tile immediately
    /// after that pass's command, so any later pass (in this step or a
    /// future one) sees up-to-date atlas data. Returns every backend
    /// command handle issued, draws and atlas copies interleaved in
    /// issue order.
    pub fn step<B, F>(
        &mut self,
        backend: &mut B,
        mut build_command: F,
    ) -> Result<Vec<B::Command>, BackendError>
    where
        B: GpgpuBackend<Texture = Tex, Framebuffer = Fb>,
        F: FnMut(PassContext<'_, Tex, Fb>) -> CommandDesc<Tex, Fb>,
    {
        self.advance();
        let slot = self.current_slot();
        let mut issued = Vec::with_capacity(self.framebuffers.len());
        for pass_index in 0..self.framebuffers.len() {
            let framebuffer = self.framebuffers[pass_index][slot].clone();
            if self.clear_before_draw {
                backend
                    .clear(&framebuffer)
                    .map_err(|e| BackendError::BackendResourceFailure(Box::new(e)))?;
            }
            let ctx = PassContext {
                pass_index,
                framebuffer: &framebuffer,
                ring: &self.ring,
                step_now: self.step_now,
                steps: self.steps,
            };
            let desc = build_command(ctx);
            let command = backend
                .command(desc)
                .map_err(|e| BackendError::BackendResourceFailure(Box::new(e)))?;
            issued.push(command);

            if let Some((_, atlas_fb)) = &self.atlas {
                for &texture_index in &self.passes[pass_index] {
                    let src = self.ring[texture_index][slot].clone();
                    let copy_desc = CommandDesc::new(
                        DEFAULT_VERT.to_string(),
                        ATLAS_COPY_FRAG.to_string(),
                        3,
                        atlas_fb.clone(),
                    )
                    .with_viewport(Viewport {
                        x: texture_index as u32 * self.width,
                        y: (self.step_now % self.steps) * self.height,
                        width: self.width,
                        height: self.height,
                    })
                    .with_uniform(ATLAS_COPY_SRC_UNIFORM, move |_: &DrawContext| {
                        UniformValue::Texture(src.clone())
                    });
                    let copy_command = backend
                        .command(copy_desc)
                        .map_err(|e| BackendError::BackendResourceFailure(Box::new(e)))?;
                    issued.push(copy_command);
                }
            }
        }
        Ok(issued)
    }
}
