//! Synthetic org charts for load testing and demo seeding.

use serde_json::{json, Value};
use tracing::info;

use crate::record::{Record, ID_FIELD, PARENT_ID_FIELD};

/// Generate a balanced org chart: one root plus `levels` levels below it,
/// every team having `sub_teams` children. Ids are assigned breadth-first from 1.
pub fn generate_teams(levels: usize, sub_teams: usize) -> Vec<Record> {
    let mut teams = vec![team(
        1,
        Value::Null,
        "🍓",
        "Land of Nice and Competent People".to_string(),
    )];
    let mut next_id: i64 = 2;
    let mut previous_level = vec![1i64];

    for _ in 0..levels {
        let mut this_level = Vec::with_capacity(previous_level.len() * sub_teams);
        for &parent_id in &previous_level {
            for _ in 0..sub_teams {
                let id = next_id;
                next_id += 1;
                teams.push(team(
                    id,
                    json!(parent_id),
                    "👋",
                    format!("Respected Group 🍉 ({})", id),
                ));
                this_level.push(id);
            }
        }
        previous_level = this_level;
    }

    info!(
        "Generated {} teams ({} levels, {} sub-teams each)",
        teams.len(),
        levels,
        sub_teams
    );
    teams
}

fn team(id: i64, parent_id: Value, emoji: &str, name: String) -> Record {
    let mut record = Record::new();
    record.insert(ID_FIELD.to_string(), json!(id));
    record.insert(PARENT_ID_FIELD.to_string(), parent_id);
    record.insert("emoji".to_string(), json!(emoji));
    record.insert("name".to_string(), json!(name));
    record
}
