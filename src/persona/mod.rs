pub mod product;
pub mod types;

pub use product::{
    product_agent, RecordingSink, ResultSink, EXPLORATION_STAGE, INTRO_STAGE, METRICS_STAGE,
    OBJECTIVE_STAGE, PRODUCT_FACTS_STAGE,
};
pub use types::{Metric, Objective, ProductFact};
