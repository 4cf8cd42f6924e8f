mod pipeline;
mod plan;

pub use pipeline::build_distributions;
pub use plan::DistRequest;
