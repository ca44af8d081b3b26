//! Declarative planning and shader-macro generation for GPGPU
//! state-stepping on a GL-like rasterization API.
//!
//! This crate answers one question: given a set of logical *values*
//! (each a small fixed-width channel group) and a `derives` relation
//! describing which past steps each value reads, how should those
//! values be packed into textures, the textures grouped into render
//! passes, and what preprocessor macros should the shaders for each
//! pass receive so they can address the right samples?
//!
//! It does not touch a GPU. [`backend::GpgpuBackend`] is the seam: any
//! caller wires a concrete rasterization API (WebGL, a software
//! rasterizer, a test double) in behind it, and [`step::StepDriver`]
//! drives that backend one pass at a time.
//!
//! ```
//! use gpgpu_plan::config::PlanConfigBuilder;
//! use gpgpu_plan::plan::Plan;
//! use gpgpu_plan::value::Value;
//!
//! let config = PlanConfigBuilder::new()
//!     .with_values(vec![Value::new(2), Value::new(4), Value::new(1)])
//!     .with_steps(2)
//!     .with_bound(1)
//!     .build();
//! let plan = Plan::build(config).unwrap();
//! assert_eq!(plan.texture_count(), plan.grouper().textures.len());
//! ```

pub mod backend;
pub mod config;
pub mod derive;
pub mod error;
pub mod grouper;
pub mod macros_gen;
pub mod packer;
pub mod plan;
pub mod sampler;
pub mod step;
pub mod value;

pub use config::{PlanConfig, PlanConfigBuilder};
pub use error::{BackendError, PlanError};
pub use plan::Plan;
