pub mod pipeline;

pub use pipeline::{Pipeline, PipelineBuilder, build_backend};
