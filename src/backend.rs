//! The backend capability set: a small trait any GL-like
//! rasterization API can implement so the core never touches pixels
//! directly. A `StubBackend` test double lives here too, for exercising
//! [`crate::step`] without a real GPU.

use std::collections::HashMap;

/// Texel storage type for a data texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureType {
    Float,
    HalfFloat,
    Uint8,
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Texture edge-wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Clamp,
    Repeat,
}

/// Parameters for allocating a 2D data texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub kind: TextureType,
    pub min: Filter,
    pub mag: Filter,
    pub wrap: Wrap,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

/// Parameters for allocating a framebuffer with up to `buffers_max` color
/// attachments.
#[derive(Debug, Clone)]
pub struct FramebufferDesc<Tex> {
    pub depth: bool,
    pub stencil: bool,
    pub width: u32,
    pub height: u32,
    pub color: Vec<Tex>,
}

/// A value that is either fixed at build time or recomputed every pass
/// from `(context, state)` — the source's "constant or callback" uniform
/// convention.
pub enum Dynamic<T, Ctx, State> {
    Const(T),
    Callback(Box<dyn Fn(&Ctx, &State) -> T>),
}

impl<T, Ctx, State> Dynamic<T, Ctx, State> {
    pub fn resolve(&self, ctx: &Ctx, state: &State) -> T
    where
        T: Clone,
    {
        match self {
            Dynamic::Const(v) => v.clone(),
            Dynamic::Callback(f) => f(ctx, state),
        }
    }
}

/// Drawing-context dimensions passed to every uniform callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawContext {
    pub drawing_buffer_width: u32,
    pub drawing_buffer_height: u32,
}

/// A sub-rectangle of a framebuffer a command draws into, in pixels.
/// `None` on a [`CommandDesc`] means "the whole framebuffer", matching a
/// backend's default viewport; this is only ever set to a sub-rectangle
/// for the merged-atlas tile copy (see [`crate::step`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Parameters for compiling one render pass.
pub struct CommandDesc<Tex, Fb> {
    pub vert: String,
    pub frag: String,
    pub uniforms: HashMap<String, Box<dyn Fn(&DrawContext) -> UniformValue<Tex>>>,
    pub count: u32,
    pub depth: bool,
    pub blend: bool,
    pub framebuffer: Fb,
    /// Restricts the draw to a sub-rectangle of `framebuffer`; `None`
    /// draws to the whole thing.
    pub viewport: Option<Viewport>,
}

impl<Tex, Fb> CommandDesc<Tex, Fb> {
    pub fn new(vert: String, frag: String, count: u32, framebuffer: Fb) -> Self {
        Self {
            vert,
            frag,
            uniforms: HashMap::new(),
            count,
            depth: false,
            blend: false,
            framebuffer,
            viewport: None,
        }
    }

    pub fn with_uniform(
        mut self,
        name: impl Into<String>,
        value: impl Fn(&DrawContext) -> UniformValue<Tex> + 'static,
    ) -> Self {
        self.uniforms.insert(name.into(), Box::new(value));
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

/// A uniform value resolved from a callback. `Texture` binds a sampler
/// input (e.g. `<pre>states[i]`) the way the rest of `UniformValue`
/// binds scalar/vector uniforms.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue<Tex> {
    Float(f32),
    Int(i32),
    FloatVec(Vec<f32>),
    IntVec(Vec<i32>),
    Texture(Tex),
}

/// Hard platform limits the planner must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_draw_buffers: u32,
    /// Parsed numeric shading-language version (e.g. `3` for GLSL ES 3.0).
    pub glsl_version: u32,
    /// Max texture units bindable to a single command, the budget
    /// [`crate::plan::Plan::merge_for`] checks `steps * textures`
    /// against when `merge` is `Auto`.
    pub max_texture_units: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_draw_buffers: 4,
            glsl_version: 3,
            max_texture_units: 16,
        }
    }
}

/// The six-operation capability set a GL-like rasterization API must
/// expose for this crate's planner and step driver to operate.
/// Implementations own real GPU resources; this crate never constructs
/// one — the concrete backend is explicitly out of scope.
pub trait GpgpuBackend {
    type Texture: Clone;
    type Framebuffer: Clone;
    type Buffer: Clone;
    type Command;
    type Error: std::error::Error + Send + Sync + 'static;

    fn texture(&mut self, desc: TextureDesc) -> Result<Self::Texture, Self::Error>;

    fn framebuffer(
        &mut self,
        desc: FramebufferDesc<Self::Texture>,
    ) -> Result<Self::Framebuffer, Self::Error>;

    fn buffer(&mut self, data: &[f32]) -> Result<Self::Buffer, Self::Error>;

    fn clear(&mut self, framebuffer: &Self::Framebuffer) -> Result<(), Self::Error>;

    fn command(
        &mut self,
        desc: CommandDesc<Self::Texture, Self::Framebuffer>,
    ) -> Result<Self::Command, Self::Error>;

    fn limits(&self) -> Limits;
}

/// A recorded call, for asserting what the driver did against a
/// [`StubBackend`] without a real GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubCall {
    Texture,
    Framebuffer { color_count: usize },
    Buffer,
    Clear,
    Command { viewport: Option<Viewport> },
}

/// Opaque-token test double implementing [`GpgpuBackend`]. Every factory
/// call returns a monotonically increasing integer token and is recorded
/// in `calls`, so a test can assert both the shape of what the driver
/// requested and the order it requested it in.
#[derive(Debug, Default)]
pub struct StubBackend {
    pub calls: Vec<StubCall>,
    next_token: u64,
    limits: Limits,
}

impl StubBackend {
    pub fn new(limits: Limits) -> Self {
        Self {
            calls: Vec::new(),
            next_token: 0,
            limits,
        }
    }

    fn next(&mut self) -> u64 {
        let t = self.next_token;
        self.next_token += 1;
        t
    }
}

/// An opaque handle minted by [`StubBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubToken(pub u64);

#[derive(Debug)]
pub struct StubError(pub String);

impl std::fmt::Display for StubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for StubError {}

impl GpgpuBackend for StubBackend {
    type Texture = StubToken;
    type Framebuffer = StubToken;
    type Buffer = StubToken;
    type Command = StubToken;
    type Error = StubError;

    fn texture(&mut self, _desc: TextureDesc) -> Result<Self::Texture, Self::Error> {
        self.calls.push(StubCall::Texture);
        Ok(StubToken(self.next()))
    }

    fn framebuffer(
        &mut self,
        desc: FramebufferDesc<Self::Texture>,
    ) -> Result<Self::Framebuffer, Self::Error> {
        self.calls.push(StubCall::Framebuffer {
            color_count: desc.color.len(),
        });
        if desc.color.len() > self.limits.max_draw_buffers as usize {
            return Err(StubError(format!(
                "{} color attachments exceeds max_draw_buffers {}",
                desc.color.len(),
                self.limits.max_draw_buffers
            )));
        }
        Ok(StubToken(self.next()))
    }

    fn buffer(&mut self, _data: &[f32]) -> Result<Self::Buffer, Self::Error> {
        self.calls.push(StubCall::Buffer);
        Ok(StubToken(self.next()))
    }

    fn clear(&mut self, _framebuffer: &Self::Framebuffer) -> Result<(), Self::Error> {
        self.calls.push(StubCall::Clear);
        Ok(())
    }

    fn command(
        &mut self,
        desc: CommandDesc<Self::Texture, Self::Framebuffer>,
    ) -> Result<Self::Command, Self::Error> {
        self.calls.push(StubCall::Command {
            viewport: desc.viewport,
        });
        Ok(StubToken(self.next()))
    }

    fn limits(&self) -> Limits {
        self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_mints_monotonic_tokens_and_records_calls() {
        let mut backend = StubBackend::new(Limits {
            max_draw_buffers: 4,
            glsl_version: 3,
            max_texture_units: 16,
        });
        let t0 = backend.texture(TextureDesc {
            kind: TextureType::Float,
            min: Filter::Nearest,
            mag: Filter::Nearest,
            wrap: Wrap::Clamp,
            width: 4,
            height: 4,
            channels: 4,
        }).unwrap();
        let t1 = backend.texture(TextureDesc {
            kind: TextureType::Float,
            min: Filter::Nearest,
            mag: Filter::Nearest,
            wrap: Wrap::Clamp,
            width: 4,
            height: 4,
            channels: 4,
        }).unwrap();
        assert_ne!(t0, t1);
        assert_eq!(backend.calls, vec![StubCall::Texture, StubCall::Texture]);
    }

    #[test]
    fn stub_rejects_framebuffers_over_draw_buffer_limit() {
        let mut backend = StubBackend::new(Limits {
            max_draw_buffers: 1,
            glsl_version: 3,
            max_texture_units: 16,
        });
        let tex = backend.texture(TextureDesc {
            kind: TextureType::Float,
            min: Filter::Nearest,
            mag: Filter::Nearest,
            wrap: Wrap::Clamp,
            width: 4,
            height: 4,
            channels: 4,
        }).unwrap();
        let err = backend
            .framebuffer(FramebufferDesc {
                depth: false,
                stencil: false,
                width: 4,
                height: 4,
                color: vec![tex, tex],
            })
            .unwrap_err();
        assert!(err.0.contains("exceeds max_draw_buffers"));
    }
}
