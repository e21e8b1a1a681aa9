pub mod features;
pub mod plan;

pub use plan::PlanOptions;
