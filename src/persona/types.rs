use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// 用户想了解或改进的目标
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub description: String,
}

/// 关于产品的一条事实
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFact {
    pub description: String,
}

/// 与用户商定的一个指标
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
}

impl Objective {
    pub fn schema() -> Schema {
        described_items("objective")
    }
}

impl ProductFact {
    pub fn schema() -> Schema {
        described_items("product_fact")
    }
}

impl Metric {
    pub fn schema() -> Schema {
        Schema::array(
            Schema::object([
                (
                    "name",
                    Schema::string().with_description("short metric name"),
                ),
                (
                    "description",
                    Schema::string().with_description("what is measured and why"),
                ),
            ])
            .with_name("metric"),
        )
    }
}

fn described_items(name: &str) -> Schema {
    Schema::array(Schema::object([("description", Schema::string())]).with_name(name))
}
