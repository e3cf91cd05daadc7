use serde::Serialize;
use serde_json::Value;

use crate::actuator::ComputerAction;
use crate::flow::gathering::envelope_schema;
use crate::flow::{Assets, Collection, Contexts};
use crate::persona::{Metric, Objective, ProductFact};
use crate::schema::Schema;

#[derive(Clone, Debug, Serialize)]
pub struct SchemaExportEntry {
    pub name: String,
    /// 承载数据的块标签；工具输入则为工具名
    pub carrier: String,
    pub schema: Value,
}

/// 内置阶段期望的数据结构，以及 computer 工具的输入
pub fn schema_exports() -> Vec<SchemaExportEntry> {
    vec![
        envelope::<Contexts<Objective>>("objective", Objective::schema()),
        envelope::<Contexts<ProductFact>>("product_fact", ProductFact::schema()),
        envelope::<Assets<Metric>>("metric", Metric::schema()),
        SchemaExportEntry {
            name: "computer_action".to_string(),
            carrier: crate::flow::constants::computer::TOOL_NAME.to_string(),
            schema: ComputerAction::tool_schema(),
        },
    ]
}

fn envelope<C: Collection>(name: &str, items: Schema) -> SchemaExportEntry {
    SchemaExportEntry {
        name: name.to_string(),
        carrier: C::BLOCK_TAG.to_string(),
        schema: envelope_schema::<C>(items.to_json_schema()),
    }
}
