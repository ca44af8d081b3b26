//! Declarative builder for assembling a [`crate::plan::Plan`], in the
//! manner of `cuneus`'s `ComputeShaderBuilder`/`ComputeConfiguration`:
//! one `with_*` method per recognized configuration key, a
//! plain data struct at the end of the chain.

use std::collections::HashMap;

use crate::derive::Derives;
use crate::grouper::BuffersMax;
use crate::macros_gen::MacroOverride;
use crate::value::Value;

/// Texture dimension resolution, in the precedence requires:
/// `width`/`height` first, then `side` (square), then `scale` (`2^scale`
/// per side), then `shape`, then `size` (total texel budget, square-root
/// to a side length).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimensions {
    WidthHeight { width: u32, height: u32 },
    Side(u32),
    Scale(u32),
    Shape { width: u32, height: u32 },
    Size(u32),
}

impl Dimensions {
    /// Resolves to concrete `(width, height)`.
    pub fn resolve(&self) -> (u32, u32) {
        match *self {
            Dimensions::WidthHeight { width, height } => (width, height),
            Dimensions::Side(side) => (side, side),
            Dimensions::Scale(scale) => {
                let side = 1u32 << scale;
                (side, side)
            }
            Dimensions::Shape { width, height } => (width, height),
            Dimensions::Size(size) => {
                let side = (size as f64).sqrt().ceil() as u32;
                (side, side)
            }
        }
    }
}

/// Whether the merged-atlas addressing strategy is forced on, forced off,
/// or chosen automatically from `steps * textures`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Auto,
    Forced(bool),
}

/// Everything [`crate::plan::Plan::build`] needs, assembled by
/// [`PlanConfigBuilder`].
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub values: Vec<Value>,
    pub channels_max: u8,
    pub buffers_max: BuffersMax,
    pub packed: Option<Vec<usize>>,
    pub derives: Derives,
    pub steps: u32,
    pub bound: u32,
    pub step_max: Option<u32>,
    pub merge: MergeMode,
    pub dimensions: Dimensions,
    pub prefix: String,
    pub macros: HashMap<String, MacroOverride>,
    pub vert: Option<String>,
    pub frag: Option<String>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            channels_max: 4,
            buffers_max: BuffersMax::Limit(1),
            packed: None,
            derives: Vec::new(),
            steps: 2,
            bound: 1,
            step_max: None,
            merge: MergeMode::Auto,
            dimensions: Dimensions::Side(256),
            prefix: "gpgpu_".to_string(),
            macros: HashMap::new(),
            vert: None,
            frag: None,
        }
    }
}

/// Consuming builder over [`PlanConfig`].
///
/// # Example
///
/// ```
/// use gpgpu_plan::config::PlanConfigBuilder;
/// use gpgpu_plan::value::Value;
///
/// let config = PlanConfigBuilder::new()
///     .with_values(vec![Value::new(2), Value::new(4), Value::new(1)])
///     .with_channels_max(4)
///     .with_steps(2)
///     .build();
/// assert_eq!(config.values.len(), 3);
/// ```
pub struct PlanConfigBuilder {
    config: PlanConfig,
}

impl PlanConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PlanConfig::default(),
        }
    }

    /// `maps.values`: channel counts per value.
    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.config.values = values;
        self
    }

    /// `maps.channelsMax`: channel limit per texture (default 4).
    pub fn with_channels_max(mut self, channels_max: u8) -> Self {
        self.config.channels_max = channels_max;
        self
    }

    /// `maps.buffersMax`: color-attachment limit per pass, or `NoOutput`.
    pub fn with_buffers_max(mut self, buffers_max: BuffersMax) -> Self {
        self.config.buffers_max = buffers_max;
        self
    }

    /// `maps.packed`: explicit packing permutation. Omit (don't call this)
    /// to auto-pack via [`crate::packer::pack`].
    pub fn with_packed(mut self, packed: Vec<usize>) -> Self {
        self.config.packed = Some(packed);
        self
    }

    /// `maps.derives`: per-value past-dependency declarations.
    pub fn with_derives(mut self, derives: Derives) -> Self {
        self.config.derives = derives;
        self
    }

    /// `steps`: ring length (integer >= 2).
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.config.steps = steps;
        self
    }

    /// `bound`: steps reserved for output (default 1).
    pub fn with_bound(mut self, bound: u32) -> Self {
        self.config.bound = bound;
        self
    }

    /// `stepMax`: overflow bound for `stepNow`. Omit for unbounded growth.
    pub fn with_step_max(mut self, step_max: u32) -> Self {
        self.config.step_max = Some(step_max);
        self
    }

    /// `merge`: force/disable the atlas strategy (default: auto).
    pub fn with_merge(mut self, merge: MergeMode) -> Self {
        self.config.merge = merge;
        self
    }

    /// `width`/`height`/`side`/`scale`/`shape`/`size`.
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.config.dimensions = dimensions;
        self
    }

    /// `pre`: macro namespace prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// `macros`: per-key override hook. Insert `key` (or `key_vert`/
    /// `key_frag`) entries; see [`crate::macros_gen`].
    pub fn with_macro_override(mut self, key: impl Into<String>, value: MacroOverride) -> Self {
        self.config.macros.insert(key.into(), value);
        self
    }

    /// `vert`/`frag`: shader text. A default full-screen-triangle vertex
    /// shader is used when `vert` is left unset.
    pub fn with_vert(mut self, vert: impl Into<String>) -> Self {
        self.config.vert = Some(vert.into());
        self
    }

    pub fn with_frag(mut self, frag: impl Into<String>) -> Self {
        self.config.frag = Some(frag.into());
        self
    }

    pub fn build(self) -> PlanConfig {
        self.config
    }
}

impl Default for PlanConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The default full-screen-triangle vertex shader.
pub const DEFAULT_VERT: &str = r#"#version 300 es
out vec2 uv;
void main() {
    uv = vec2((gl_VertexID << 1) & 2, gl_VertexID & 2);
    gl_Position = vec4(uv * 2.0 - 1.0, 0.0, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_precedence_resolves_each_variant() {
        assert_eq!(
            Dimensions::WidthHeight {
                width: 10,
                height: 20
            }
            .resolve(),
            (10, 20)
        );
        assert_eq!(Dimensions::Side(64).resolve(), (64, 64));
        assert_eq!(Dimensions::Scale(4).resolve(), (16, 16));
        assert_eq!(
            Dimensions::Shape {
                width: 8,
                height: 4
            }
            .resolve(),
            (8, 4)
        );
        assert_eq!(Dimensions::Size(256).resolve(), (16, 16));
    }

    #[test]
    fn builder_applies_documented_defaults() {
        let config = PlanConfigBuilder::new().build();
        assert_eq!(config.channels_max, 4);
        assert_eq!(config.bound, 1);
        assert_eq!(config.prefix, "gpgpu_");
        assert_eq!(config.merge, MergeMode::Auto);
    }
}
