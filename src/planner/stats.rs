//! Reading `min`/`max` identifier statistics out of a statistics response.
//!
//! Servers disagree on the attribute names they return: some echo the
//! requested `min_<field>`, some upper-case it, some use bare `MIN`/`MAX` or an
//! alias of their own. Matching is therefore tolerant, but a response that
//! cannot be matched is an error for the caller to fall back on, not a panic.

use serde_json::{Map, Value};

use super::descriptor::{IdRange, record_id};

/// Extracts the identifier range from a statistics response.
///
/// Returns `Ok(None)` for a well-formed empty result (no statistics feature,
/// or both values null), which means the layer has no records to range over.
///
/// # Errors
///
/// Returns a description of the problem when the response has no
/// `features`, or the minimum and maximum cannot be identified.
pub fn find_min_max(response: &Value, field: &str) -> Result<Option<IdRange>, String> {
    let features = response
        .get("features")
        .and_then(Value::as_array)
        .ok_or("statistics response has no features")?;

    let Some(first) = features.first() else {
        return Ok(None);
    };

    let attributes = first
        .get("attributes")
        .and_then(Value::as_object)
        .ok_or("statistics feature has no attributes")?;

    let (min, max) = match_by_name(attributes, field)
        .or_else(|| match_by_order(attributes))
        .ok_or("unable to identify min and max in statistics response")?;

    match (record_id(min), record_id(max)) {
        (None, None) if min.is_null() && max.is_null() => Ok(None),
        (Some(min), Some(max)) => IdRange::new(min, max)
            .map(Some)
            .ok_or_else(|| format!("statistics minimum {min} exceeds maximum {max}")),
        _ => Err(format!("non-numeric statistics values: {min}, {max}")),
    }
}

fn match_by_name<'a>(
    attributes: &'a Map<String, Value>,
    field: &str,
) -> Option<(&'a Value, &'a Value)> {
    let (min_key, min) = find_key(attributes, "min", field)?;
    let (max_key, max) = find_key(attributes, "max", field)?;
    if min_key == max_key {
        return None;
    }
    Some((min, max))
}

/// Finds `<stat>_<field>` case-insensitively, else a key that is `<stat>` or
/// carries it as a `_`-separated prefix or suffix.
fn find_key<'a>(
    attributes: &'a Map<String, Value>,
    stat: &str,
    field: &str,
) -> Option<(&'a String, &'a Value)> {
    let exact = format!("{stat}_{field}").to_ascii_lowercase();
    let prefix = format!("{stat}_");
    let suffix = format!("_{stat}");
    attributes
        .iter()
        .find(|(key, _)| key.to_ascii_lowercase() == exact)
        .or_else(|| {
            attributes.iter().find(|(key, _)| {
                let key = key.to_ascii_lowercase();
                key == stat || key.starts_with(&prefix) || key.ends_with(&suffix)
            })
        })
}

/// Falls back to "exactly two numeric values: the smaller is the minimum".
fn match_by_order(attributes: &Map<String, Value>) -> Option<(&Value, &Value)> {
    let numeric: Vec<&Value> = attributes.values().filter(|v| record_id(v).is_some()).collect();
    let [a, b] = numeric.as_slice() else {
        return None;
    };
    if record_id(a)? <= record_id(b)? {
        Some((*a, *b))
    } else {
        Some((*b, *a))
    }
}
