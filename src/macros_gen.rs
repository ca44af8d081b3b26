//! Shader preprocessor macro generation: five emitters
//! composed by [`macro_pass`], each consulting the user's override hook
//! and a per-[`crate::plan::Plan`] cache before falling back to
//! generation.

use std::collections::HashMap;

use crate::grouper::GrouperOutput;
use crate::sampler::SamplerOutput;
use crate::value::{swizzle, Value};

/// Which shader stage a macro block is being generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vert,
    Frag,
}

impl Stage {
    fn suffix(self) -> &'static str {
        match self {
            Stage::Vert => "vert",
            Stage::Frag => "frag",
        }
    }
}

/// A user override for one macro-generation key: either a fixed block of
/// text, or suppressed output entirely. This crate keeps the two outcomes
/// that are representable without duck-typed callback plumbing; see
/// DESIGN.md for why a function-valued override isn't supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroOverride {
    /// Output for this key is replaced verbatim with this text.
    Text(String),
    /// Output for this key is the empty string (the literal `false` case).
    Disabled,
}

fn lookup_override<'a>(
    macros: &'a HashMap<String, MacroOverride>,
    key: &str,
    stage: Stage,
) -> Option<&'a MacroOverride> {
    let scoped = format!("{key}_{}", stage.suffix());
    macros.get(&scoped).or_else(|| macros.get(key))
}

/// Applies the override hook for `key`, or runs `generate` if no override
/// applies.
fn with_override(
    macros: &HashMap<String, MacroOverride>,
    key: &str,
    stage: Stage,
    generate: impl FnOnce() -> String,
) -> String {
    match lookup_override(macros, key, stage) {
        Some(MacroOverride::Text(text)) => text.clone(),
        Some(MacroOverride::Disabled) => String::new(),
        None => generate(),
    }
}

/// Per-value texture placement used by the macro generator: which
/// texture a value lives in, and its channel offset within that texture
/// (for swizzle generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueBinding {
    pub texture_index: usize,
    pub offset: u8,
    pub channels: u8,
}

/// Computes each value's `(textureIndex, offset, channels)` from the
/// grouper's texture lists.
pub fn value_bindings(values: &[Value], grouper: &GrouperOutput) -> Vec<ValueBinding> {
    let mut bindings = vec![
        ValueBinding {
            texture_index: 0,
            offset: 0,
            channels: 0
        };
        values.len()
    ];
    for (texture_index, value_indices) in grouper.textures.iter().enumerate() {
        let mut offset = 0u8;
        for &vi in value_indices {
            let channels = values[vi].channels;
            bindings[vi] = ValueBinding {
                texture_index,
                offset,
                channels,
            };
            offset += channels;
        }
    }
    bindings
}

/// Everything the five emitters need: the plan's shape plus generation
/// options. Borrowed, not owned, so [`crate::plan::Plan`] can build one
/// per call without cloning its data.
pub struct MacroPlanView<'a> {
    pub values: &'a [Value],
    pub bindings: &'a [ValueBinding],
    pub grouper: &'a GrouperOutput,
    pub sampler: &'a SamplerOutput,
    pub steps: u32,
    pub bound: u32,
    pub glsl_version: u32,
    pub merge: bool,
    pub prefix: &'a str,
    pub macros: &'a HashMap<String, MacroOverride>,
}

/// 1. Value bindings: `texture_<v>` / `channels_<v>` plus totals.
pub fn emit_values(view: &MacroPlanView, stage: Stage) -> String {
    with_override(view.macros, "values", stage, || {
        let pre = view.prefix;
        let mut out = String::new();
        for (v, binding) in view.bindings.iter().enumerate() {
            out.push_str(&format!("#define {pre}texture_{v} {}\n", binding.texture_index));
            out.push_str(&format!(
                "#define {pre}channels_{v} {}\n",
                swizzle(binding.offset, binding.channels)
            ));
        }
        out.push_str(&format!("#define {pre}textures {}\n", view.grouper.textures.len()));
        out.push_str(&format!("#define {pre}passes {}\n", view.grouper.passes.len()));
        out.push_str(&format!("#define {pre}stepsPast {}\n", view.steps.saturating_sub(view.bound)));
        out.push_str(&format!("#define {pre}steps {}\n", view.steps));
        out.push_str(&format!("#define {pre}bound {}\n", view.bound));
        out.push_str(&format!("#define {pre}count {}\n", view.values.len()));
        out
    })
}

/// 2. Output bindings for the active pass: `bound_<v>` / `attach_<v>` /
/// `output_<v>` plus `passNow`.
pub fn emit_output(view: &MacroPlanView, pass_index: usize, stage: Stage) -> String {
    with_override(view.macros, "output", stage, || {
        let pre = view.prefix;
        let mut out = String::new();
        for &texture_index in &view.grouper.passes[pass_index] {
            let attach = view.grouper.passes[pass_index]
                .iter()
                .position(|&t| t == texture_index)
                .unwrap();
            for (v, binding) in view.bindings.iter().enumerate() {
                if binding.texture_index != texture_index {
                    continue;
                }
                out.push_str(&format!("#define {pre}bound_{v}\n"));
                out.push_str(&format!("#define {pre}attach_{v} {attach}\n"));
                out.push_str(&format!(
                    "#define {pre}output_{v} gl_FragData[{pre}attach_{v}].{}\n",
                    swizzle(binding.offset, binding.channels)
                ));
            }
        }
        out.push_str(&format!("#define {pre}passNow {pass_index}\n"));
        out
    })
}

/// 3. The sample list: `samples_0..samples_{n-1}`, `samples_l`, and the
/// `samples_i(i)` indexing macro. Const arrays need GLSL ES 3.0+; below
/// that, a nested-ternary indexer over individually-declared constants
/// stands in.
pub fn emit_samples(view: &MacroPlanView, pass_index: usize, stage: Stage) -> String {
    with_override(view.macros, "useSamples", stage, || {
        let pre = view.prefix;
        let samples = &view.sampler.samples[pass_index];
        let n = samples.len();
        let mut out = format!("#define {pre}useSamples\n");
        out.push_str(&format!("#define {pre}samples_l {n}\n"));

        if view.glsl_version >= 3 {
            out.push_str(&format!("const ivec2 {pre}samples_a[{pre}samples_l] = ivec2[](\n"));
            for (i, (step_ago, tex)) in samples.iter().enumerate() {
                let comma = if i + 1 < n { "," } else { "" };
                out.push_str(&format!("    ivec2({step_ago}, {tex}){comma}\n"));
            }
            out.push_str(");\n");
            out.push_str(&format!(
                "#define {pre}samples_i(i) {pre}samples_a[i]\n"
            ));
        } else {
            for (i, (step_ago, tex)) in samples.iter().enumerate() {
                out.push_str(&format!(
                    "const ivec2 {pre}samples_{i} = ivec2({step_ago}, {tex});\n"
                ));
            }
            out.push_str(&format!("#define {pre}samples_i(i) "));
            if n == 0 {
                out.push_str("ivec2(0)\n");
            } else {
                for i in 0..n {
                    if i + 1 < n {
                        out.push_str(&format!("((i) == {i} ? {pre}samples_{i} : "));
                    } else {
                        out.push_str(&format!("{pre}samples_{i}"));
                    }
                }
                for _ in 1..n {
                    out.push(')');
                }
                out.push('\n');
            }
        }
        out
    })
}

/// 4. Per-value read lists: `useReads_<v>` expanding to `reads_<v>_*`.
pub fn emit_reads(view: &MacroPlanView, pass_index: usize, stage: Stage) -> String {
    with_override(view.macros, "useReads", stage, || {
        let pre = view.prefix;
        let mut out = String::new();
        for (v, reads) in view.sampler.reads[pass_index].iter().enumerate() {
            let Some(reads) = reads else { continue };
            out.push_str(&format!("#define {pre}useReads_{v}\n"));
            out.push_str(&format!("#define {pre}reads_{v}_l {}\n", reads.len()));
            for (k, sample_index) in reads.iter().enumerate() {
                out.push_str(&format!("#define {pre}reads_{v}_{k} {sample_index}\n"));
            }
        }
        out
    })
}

/// 5. The `tap` function: declares `<pre>data[samples_l]` and fills it by
/// sampling either an array of textures (constant indices) or a single
/// merged atlas (dynamic `uv` offsets), per the addressing mode in effect
/// for this plan.
pub fn emit_taps(view: &MacroPlanView, pass_index: usize, stage: Stage) -> String {
    with_override(view.macros, "tapState", stage, || {
        let pre = view.prefix;
        let samples = &view.sampler.samples[pass_index];
        let n = samples.len();
        let textures = view.grouper.textures.len() as u32;
        let steps = view.steps;
        let mut out = String::new();

        if view.merge {
            out.push_str(&format!(
                "#define {pre}tapStateBy(uv, stepBy, textureBy) vec4[{n}](\n"
            ));
            for (i, (step_ago, tex)) in samples.iter().enumerate() {
                let comma = if i + 1 < n { "," } else { "" };
                out.push_str(&format!(
                    "    texture({pre}states, vec3(\n        fract((uv) / vec2({textures}.0, {steps}.0) + fract(vec2(float({tex}) + (textureBy), float(-{step_ago}) + 1.0 - float(stepBy)) * vec2(1.0 / {textures}.0, -1.0 / {steps}.0))),\n        0.0))\n    {comma}\n"
                ));
            }
            out.push_str(")\n");
            out.push_str(&format!(
                "#define {pre}tapState(uv) vec4 {pre}data[{pre}samples_l] = {pre}tapStateBy(uv, 0, 0)\n"
            ));
        } else {
            out.push_str(&format!(
                "#define {pre}tapStateBy(uv, stepBy, textureBy) vec4[{n}](\n"
            ));
            for (i, (step_ago, tex)) in samples.iter().enumerate() {
                let comma = if i + 1 < n { "," } else { "" };
                out.push_str(&format!(
                    "    texture({pre}states[(({step_ago} + (stepBy)) * {textures}) + {tex} + (textureBy)], uv){comma}\n"
                ));
            }
            out.push_str(")\n");
            out.push_str(&format!(
                "#define {pre}tapState(uv) vec4 {pre}data[{pre}samples_l] = {pre}tapStateBy(uv, 0, 0)\n"
            ));
        }

        out
    })
}

/// Composes all five emitters for one pass/stage into a single macro
/// block.
pub fn macro_pass(view: &MacroPlanView, pass_index: usize, stage: Stage) -> String {
    let mut out = String::new();
    out.push_str(&emit_values(view, stage));
    out.push_str(&emit_output(view, pass_index, stage));
    out.push_str(&emit_samples(view, pass_index, stage));
    out.push_str(&emit_reads(view, pass_index, stage));
    out.push_str(&emit_taps(view, pass_index, stage));
    out
}

/// Cache key for one generated macro block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    prefix: String,
    pass_index: usize,
    glsl_version: u32,
    merge: bool,
    stage: Stage,
}

/// Per-[`crate::plan::Plan`] cache of generated macro text, scoped to the
/// owning plan rather than global. Invalidates itself
/// whenever any key component changes, by simply never reusing a stale
/// key — there is no explicit invalidation call, the key space is the
/// invalidation rule.
#[derive(Debug, Default)]
pub struct MacroCache {
    entries: HashMap<CacheKey, String>,
}

impl MacroCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached macro block for `(pass_index, stage)` under the
    /// view's current prefix/glsl_version/merge, generating and caching
    /// it on a miss. Two calls with unchanged key components return the
    /// same (and byte-identical) `String`.
    pub fn get_or_generate(
        &mut self,
        view: &MacroPlanView,
        pass_index: usize,
        stage: Stage,
    ) -> &str {
        let key = CacheKey {
            prefix: view.prefix.to_string(),
            pass_index,
            glsl_version: view.glsl_version,
            merge: view.merge,
            stage,
        };
        self.entries
            .entry(key)
            .or_insert_with(|| macro_pass(view, pass_index, stage))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
