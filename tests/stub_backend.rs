//! End-to-end check: build a [`Plan`] from a small config, drive two
//! frames through a [`StubBackend`], and assert the framebuffer rotation
//! and recorded call shape match what the planner promised.

use gpgpu_plan::backend::{CommandDesc, Limits, StubBackend};
use gpgpu_plan::config::{Dimensions, PlanConfigBuilder};
use gpgpu_plan::grouper::BuffersMax;
use gpgpu_plan::plan::Plan;
use gpgpu_plan::value::Value;

#[test]
fn two_steps_rotate_through_every_ring_slot() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = PlanConfigBuilder::new()
        .with_values(vec![Value::new(2), Value::new(4), Value::new(1)])
        .with_channels_max(4)
        .with_buffers_max(BuffersMax::Limit(1))
        .with_steps(2)
        .with_bound(1)
        .with_dimensions(Dimensions::Side(32))
        .build();
    let mut plan = Plan::build(config)?;

    let mut backend = StubBackend::new(Limits {
        max_draw_buffers: 4,
        glsl_version: 3,
        max_texture_units: 16,
    });
    let mut driver = plan.build_step_driver(&mut backend, false, true)?;

    let mut write_slots = Vec::new();
    for _ in 0..2 {
        let frag = plan.frag_source(0, 3, false);
        assert!(frag.contains("gpgpu_textures"));
        driver.step(&mut backend, |ctx| {
            CommandDesc::new(
                "vert".to_string(),
                plan_frag_placeholder(ctx.pass_index),
                3,
                ctx.framebuffer.clone(),
            )
        })?;
        write_slots.push(driver.current_slot());
    }

    assert_ne!(write_slots[0], write_slots[1], "a 2-step ring alternates slots");
    assert_eq!(
        backend.calls.iter().filter(|c| matches!(c, gpgpu_plan::backend::StubCall::Clear)).count(),
        plan.pass_count() * 2
    );
    assert_eq!(
        backend
            .calls
            .iter()
            .filter(|c| matches!(c, gpgpu_plan::backend::StubCall::Command { .. }))
            .count(),
        plan.pass_count() * 2
    );

    Ok(())
}

fn plan_frag_placeholder(pass_index: usize) -> String {
    format!("// pass {pass_index}\nvoid main() {{ discard; }}\n")
}

#[test]
fn merge_mode_allocates_a_single_atlas_texture_and_framebuffer() {
    let config = PlanConfigBuilder::new()
        .with_values(vec![Value::new(4), Value::new(4), Value::new(4)])
        .with_channels_max(4)
        .with_buffers_max(BuffersMax::Limit(1))
        .with_steps(4)
        .with_bound(1)
        .with_dimensions(Dimensions::Side(16))
        .build();
    let plan = Plan::build(config).unwrap();

    let mut backend = StubBackend::new(Limits {
        max_draw_buffers: 1,
        glsl_version: 3,
        max_texture_units: 16,
    });
    assert!(plan.merge_for(2));
    let driver = plan.build_step_driver(&mut backend, true, false).unwrap();
    assert!(driver.atlas_texture().is_some());
}
