//! Top-level entry point: [`Plan::build`] runs the packer,
//! grouper and sampler over a [`PlanConfig`] once, then hands out
//! macro-generated shader text and a ready-to-drive [`StepDriver`] from
//! the result.

use crate::backend::{GpgpuBackend, Limits};
use crate::config::{Dimensions, MergeMode, PlanConfig, DEFAULT_VERT};
use crate::error::{BackendError, PlanError};
use crate::grouper::{group, GrouperOutput};
use crate::macros_gen::{value_bindings, MacroCache, MacroPlanView, Stage, ValueBinding};
use crate::packer::pack;
use crate::sampler::{plan_samples, SamplerOutput};
use crate::step::StepDriver;

/// The fully-resolved plan: packing permutation, texture/pass grouping,
/// sample plan, and value-to-texture bindings, plus a macro cache scoped
/// to this instance.
pub struct Plan {
    config: PlanConfig,
    packed: Vec<usize>,
    grouper: GrouperOutput,
    sampler: SamplerOutput,
    bindings: Vec<ValueBinding>,
    macro_cache: MacroCache,
}

impl Plan {
    /// Runs packer → grouper → sampler over `config` and returns the
    /// resolved plan, or the first [`PlanError`] encountered.
    pub fn build(config: PlanConfig) -> Result<Self, PlanError> {
        let packed = match &config.packed {
            Some(p) => p.clone(),
            None => pack(&config.values, config.channels_max)?,
        };
        let grouper = group(&config.values, &packed, config.channels_max, config.buffers_max)?;
        let sampler = plan_samples(
            &grouper,
            config.values.len(),
            &config.derives,
            config.steps,
            config.bound,
        )?;
        let bindings = value_bindings(&config.values, &grouper);

        Ok(Self {
            config,
            packed,
            grouper,
            sampler,
            bindings,
            macro_cache: MacroCache::new(),
        })
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub fn packed(&self) -> &[usize] {
        &self.packed
    }

    pub fn grouper(&self) -> &GrouperOutput {
        &self.grouper
    }

    pub fn sampler(&self) -> &SamplerOutput {
        &self.sampler
    }

    pub fn texture_count(&self) -> usize {
        self.grouper.textures.len()
    }

    pub fn pass_count(&self) -> usize {
        self.grouper.passes.len()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.config.dimensions.resolve()
    }

    /// Resolves the `merge` configuration knob to a concrete yes/no,
    /// given the backend's texture-unit budget. `Auto` merges once a
    /// single pass would otherwise need to bind more texture units than
    /// the backend offers.
    pub fn merge_for(&self, max_texture_units: u32) -> bool {
        match self.config.merge {
            MergeMode::Forced(on) => on,
            MergeMode::Auto => {
                let worst_case = self.config.steps as usize * self.grouper.textures.len();
                worst_case > max_texture_units as usize
            }
        }
    }

    /// Generates (or returns the cached) macro block for `pass_index`
    /// under `stage`, given the backend's GLSL version and the resolved
    /// merge mode.
    pub fn macros(
        &mut self,
        pass_index: usize,
        stage: Stage,
        glsl_version: u32,
        merge: bool,
    ) -> &str {
        let view = MacroPlanView {
            values: &self.config.values,
            bindings: &self.bindings,
            grouper: &self.grouper,
            sampler: &self.sampler,
            steps: self.config.steps,
            bound: self.config.bound,
            glsl_version,
            merge,
            prefix: &self.config.prefix,
            macros: &self.config.macros,
        };
        self.macro_cache.get_or_generate(&view, pass_index, stage)
    }

    /// The full vertex shader source for `pass_index`: generated macros
    /// followed by the configured body, or [`DEFAULT_VERT`] if none was
    /// supplied.
    pub fn vert_source(&mut self, pass_index: usize, glsl_version: u32, merge: bool) -> String {
        let body = self
            .config
            .vert
            .clone()
            .unwrap_or_else(|| DEFAULT_VERT.to_string());
        let macros = self.macros(pass_index, Stage::Vert, glsl_version, merge);
        format!("{macros}{body}")
    }

    /// The full fragment shader source for `pass_index`.
    pub fn frag_source(&mut self, pass_index: usize, glsl_version: u32, merge: bool) -> String {
        let body = self.config.frag.clone().unwrap_or_default();
        let macros = self.macros(pass_index, Stage::Frag, glsl_version, merge);
        format!("{macros}{body}")
    }

    /// Allocates the texture ring, per-pass framebuffers, and (if
    /// `merge` is on) the atlas for a fresh [`StepDriver`].
    pub fn build_step_driver<B: GpgpuBackend>(
        &self,
        backend: &mut B,
        merge: bool,
        clear_before_draw: bool,
    ) -> Result<StepDriver<B::Texture, B::Framebuffer>, BackendError> {
        let (width, height) = self.dimensions();
        StepDriver::build(
            backend,
            &self.grouper,
            &self.config.values,
            width,
            height,
            self.config.steps,
            self.config.step_max,
            merge,
            clear_before_draw,
        )
    }

    /// Convenience: resolves `merge` from the backend's own reported
    /// limits, then builds the step driver.
    pub fn build_step_driver_auto<B: GpgpuBackend>(
        &self,
        backend: &mut B,
    ) -> Result<StepDriver<B::Texture, B::Framebuffer>, BackendError> {
        let Limits {
            max_texture_units, ..
        } = backend.limits();
        let merge = self.merge_for(max_texture_units);
        self.build_step_driver(backend, merge, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Limits, StubBackend};
    use crate::config::PlanConfigBuilder;
    use crate::value::Value;

    fn sample_config() -> PlanConfig {
        PlanConfigBuilder::new()
            .with_values(vec![Value::new(2), Value::new(4), Value::new(1)])
            .with_channels_max(4)
            .with_buffers_max(crate::grouper::BuffersMax::Limit(1))
            .with_steps(2)
            .with_bound(1)
            .with_dimensions(Dimensions::Side(16))
            .build()
    }

    #[test]
    fn build_auto_packs_values_and_groups_textures_into_passes() {
        let plan = Plan::build(sample_config()).unwrap();
        assert_eq!(plan.packed(), &[1, 0, 2]);
        assert_eq!(plan.texture_count(), 2);
        assert_eq!(plan.pass_count(), 2);
    }

    #[test]
    fn explicit_packed_permutation_is_honored() {
        let config = PlanConfigBuilder::new()
            .with_values(vec![Value::new(2), Value::new(4), Value::new(1)])
            .with_packed(vec![0, 1, 2])
            .build();
        let plan = Plan::build(config).unwrap();
        assert_eq!(plan.packed(), &[0, 1, 2]);
    }

    #[test]
    fn macro_generation_is_cached_across_calls() {
        let mut plan = Plan::build(sample_config()).unwrap();
        let first = plan.frag_source(0, 3, false);
        let second = plan.frag_source(0, 3, false);
        assert_eq!(first, second);
    }

    #[test]
    fn merge_auto_forces_atlas_when_textures_exceed_unit_budget() {
        let plan = Plan::build(sample_config()).unwrap();
        assert!(!plan.merge_for(16));
        assert!(plan.merge_for(1));
    }

    #[test]
    fn build_step_driver_allocates_per_texture_ring() {
        let plan = Plan::build(sample_config()).unwrap();
        let mut backend = StubBackend::new(Limits {
            max_draw_buffers: 4,
            glsl_version: 3,
            max_texture_units: 16,
        });
        let driver = plan.build_step_driver(&mut backend, false, false).unwrap();
        assert_eq!(driver.ring().len(), plan.texture_count());
    }
}
