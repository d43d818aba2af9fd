//! Data bags: create every bag first, then upload all items as one batch.

use super::outcome::{classify, ComponentReport, JobResult, Outcome};
use super::Restorer;
use crate::api::{ApiError, ChefApi};
use crate::backup::Artifact;
use crate::component::ComponentKind;
use crate::loader::{load_document, string_field, LoadOptions};
use crate::utils::errors::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub(super) async fn restore<A: ChefApi>(restorer: &Restorer<A>) -> Result<ComponentReport> {
    info!("=== Restoring data bags ===");

    let bags = restorer.backup.data_bags()?;

    // Every container must exist before any item upload starts.
    let api = Arc::clone(&restorer.api);
    let mut results = restorer
        .pool
        .run(bags.iter().map(|bag| bag.name.clone()), move |bag| {
            let api = Arc::clone(&api);
            async move { Ok(create_bag(api.as_ref(), &bag).await) }
        })
        .await?;

    let mut items = Vec::new();
    for bag in &bags {
        for item in restorer.backup.data_bag_items(bag)? {
            items.push((bag.name.clone(), item));
        }
    }

    let api = Arc::clone(&restorer.api);
    let item_results = restorer
        .pool
        .run(items, move |(bag, item)| {
            let api = Arc::clone(&api);
            async move { Ok(restore_item(api.as_ref(), &bag, item).await) }
        })
        .await?;

    results.extend(item_results);
    Ok(ComponentReport::new(ComponentKind::DataBags, results))
}

async fn create_bag<A: ChefApi>(api: &A, bag: &str) -> JobResult {
    let thing = format!("data_bag[{bag}]");
    info!("Restoring {}", thing);

    let outcome = match api.create_data_bag(bag).await {
        Ok(()) => Outcome::Created,
        Err(e) => classify(&thing, &e.into()),
    };

    JobResult::new(thing, outcome)
}

async fn restore_item<A: ChefApi>(api: &A, bag: &str, item: Artifact) -> JobResult {
    let thing = format!("data_bag_item[{}::{}]", bag, item.name);
    info!("Restoring {}", thing);

    let outcome = match save_item(api, bag, &item).await {
        Ok(outcome) => outcome,
        Err(e) => classify(&thing, &e),
    };

    JobResult::new(thing, outcome)
}

async fn save_item<A: ChefApi>(api: &A, bag: &str, item: &Artifact) -> Result<Outcome> {
    let document = load_document(&item.path, LoadOptions::raw()).await?;
    let body = item_body(document, &item.name);
    let id = string_field(&body, "id").unwrap_or(&item.name);

    match api.update_data_bag_item(bag, id, &body).await {
        Ok(()) => Ok(Outcome::Updated),
        Err(ApiError::NotFound(_)) => {
            api.create_data_bag_item(bag, &body).await?;
            Ok(Outcome::Created)
        }
        Err(e) => Err(e.into()),
    }
}

/// The item's own data: a wrapped export keeps it under `raw_data`.
/// A missing `id` is taken from the file name.
fn item_body(document: Value, file_stem: &str) -> Value {
    let mut body = match document {
        Value::Object(mut wrapper) if wrapper.get("raw_data").is_some_and(Value::is_object) => wrapper
            .remove("raw_data")
            .unwrap_or_else(|| Value::Object(Default::default())),
        other => other,
    };

    if let Value::Object(fields) = &mut body {
        if string_field_missing(fields.get("id")) {
            fields.insert("id".to_string(), Value::String(file_stem.to_string()));
        }
    }

    body
}

fn string_field_missing(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).map_or(true, str::is_empty)
}
