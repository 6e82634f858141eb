//! Small helpers shared by the clients.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::model::Attribute;

/// Maximum length of an attribute value accepted by the server.
pub const ATTRIBUTE_LENGTH_LIMIT: usize = 128;

/// The current time in epoch milliseconds, as ReportPortal expects timestamps.
pub fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis())
        .unwrap_or_default()
        .to_string()
}

/// Join URI parts with `/`, dropping leading and trailing slashes from each part.
///
/// ```
/// use reportportal_client::helpers::uri_join;
///
/// assert_eq!(uri_join(["http://rp/", "/api/v2/", "demo"]), "http://rp/api/v2/demo");
/// ```
pub fn uri_join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|part| part.as_ref().trim_matches('/').to_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse `key:value` and bare `value` strings into attributes.
///
/// Entries with an empty value are dropped.
pub fn gen_attributes<I, S>(raw: I) -> Vec<Attribute>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            let attribute = match entry.split_once(':') {
                Some((key, value)) if !key.is_empty() => Attribute::new(Some(key), value),
                Some((_, value)) => Attribute::new(None, value),
                None => Attribute::new(None, entry),
            };
            (!attribute.value.is_empty()).then_some(attribute)
        })
        .collect()
}

/// Truncate attribute keys and values to [`ATTRIBUTE_LENGTH_LIMIT`] characters.
pub fn verify_value_length(attributes: Vec<Attribute>) -> Vec<Attribute> {
    attributes
        .into_iter()
        .map(|mut attribute| {
            attribute.key = attribute.key.map(|key| truncate(&key));
            attribute.value = truncate(&attribute.value);
            attribute
        })
        .collect()
}

fn truncate(value: &str) -> String {
    value.chars().take(ATTRIBUTE_LENGTH_LIMIT).collect()
}

/// Convert a map into attributes, ordered by key, optionally flagged as system attributes.
pub fn dict_to_payload(map: &BTreeMap<String, String>, system: bool) -> Vec<Attribute> {
    map.iter()
        .map(|(key, value)| {
            let mut attribute = Attribute::new(Some(key.as_str()), value);
            attribute.system = system.then_some(true);
            attribute
        })
        .collect()
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
