use serde_json::Value;
use tracing::{error, trace};

use crate::EventRecord;
use crate::config::ResolvedQuery;
use crate::error::{AutomatonError, AutomatonResult};

/// Turn the buckets of `response[container][group]["buckets"]` into event
/// records.
///
/// Keys found in the rename map are renamed, all other keys pass through.
/// Values are never touched. Records keep bucket order.
pub fn map_response(response: &Value, query: &ResolvedQuery) -> AutomatonResult<Vec<EventRecord>> {
    let buckets = buckets(response, query).inspect_err(|e| error!("{e}"))?;

    let records = buckets
        .iter()
        .enumerate()
        .map(|(index, bucket)| {
            let fields = bucket.as_object().ok_or_else(|| {
                AutomatonError::Lookup(format!("bucket {index} is not an object"))
            })?;

            Ok(fields
                .iter()
                .map(|(key, value)| {
                    let key = query.field_rename_map.get(key).unwrap_or(key);
                    (key.clone(), value.clone())
                })
                .collect::<EventRecord>())
        })
        .collect::<AutomatonResult<Vec<_>>>()
        .inspect_err(|e| error!("{e}"))?;

    trace!("mapped {} bucket(s)", records.len());
    Ok(records)
}

fn buckets<'a>(response: &'a Value, query: &ResolvedQuery) -> AutomatonResult<&'a Vec<Value>> {
    let container = lookup(response, &query.result_container_key)?;
    let group = lookup(container, &query.result_group_key)?;

    lookup(group, "buckets")?.as_array().ok_or_else(|| {
        AutomatonError::Lookup(format!(
            "{}.{}.buckets is not an array",
            query.result_container_key, query.result_group_key
        ))
    })
}

fn lookup<'a>(value: &'a Value, key: &str) -> AutomatonResult<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| AutomatonError::Lookup(format!("missing key '{key}'")))
}
