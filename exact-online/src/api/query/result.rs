//! Response envelopes and pages of hydrated entities

use serde_json::Value as Json;

use crate::api::errors::{Error, Result};
use crate::api::hydration::Entity;

/// One page of a collection response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Entity>,
    /// Absolute URL of the following page, if the server reported one
    pub next: Option<String>,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Page {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

fn parse(body: &str) -> Result<Json> {
    serde_json::from_str(body).map_err(|e| Error::Decode(format!("response is not JSON: {}", e)))
}

fn unwrap_d(json: Json) -> Result<Json> {
    match json {
        Json::Object(mut map) => map
            .remove("d")
            .ok_or_else(|| Error::Decode("response has no `d` envelope".into())),
        _ => Err(Error::Decode("response is not a JSON object".into())),
    }
}

/// Records and next link of `{"d": {"results": [..], "__next": ".."}}`
///
/// A bare `{"d": [..]}` array is accepted as a single, final page.
pub(crate) fn unwrap_collection(body: &str) -> Result<(Vec<Json>, Option<String>)> {
    match unwrap_d(parse(body)?)? {
        Json::Array(items) => Ok((items, None)),
        Json::Object(mut map) => {
            let next = match map.remove("__next") {
                Some(Json::String(url)) if !url.is_empty() => Some(url),
                _ => None,
            };
            match map.remove("results") {
                Some(Json::Array(items)) => Ok((items, next)),
                _ => Err(Error::Decode("collection response has no `results` array".into())),
            }
        }
        _ => Err(Error::Decode("unexpected collection envelope".into())),
    }
}

/// The single record of `{"d": {..}}`
///
/// Create responses wrap the record directly; some single-record reads
/// answer with a one-element `results` array instead.
pub(crate) fn unwrap_single(body: &str) -> Result<Option<Json>> {
    match unwrap_d(parse(body)?)? {
        Json::Object(mut map) => match map.remove("results") {
            Some(Json::Array(items)) => Ok(items.into_iter().next()),
            Some(other) => {
                map.insert("results".into(), other);
                Ok(Some(Json::Object(map)))
            }
            None => Ok(Some(Json::Object(map))),
        },
        Json::Array(items) => Ok(items.into_iter().next()),
        _ => Err(Error::Decode("unexpected record envelope".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_collection() {
        let body = json!({"d": {
            "results": [{"Code": 1}, {"Code": 2}],
            "__next": "https://start.exactonline.nl/api/v1/1/hrm/Divisions?$skiptoken=2"
        }})
        .to_string();
        let (items, next) = unwrap_collection(&body).unwrap();
        assert_eq!(items.len(), 2);
        assert!(next.unwrap().ends_with("$skiptoken=2"));

        let (items, next) = unwrap_collection(r#"{"d": {"results": []}}"#).unwrap();
        assert!(items.is_empty());
        assert!(next.is_none());

        let (items, _) = unwrap_collection(r#"{"d": [{"Code": 1}]}"#).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_unwrap_single() {
        let record = unwrap_single(r#"{"d": {"Code": 1, "__metadata": {}}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record["Code"], json!(1));

        let record = unwrap_single(r#"{"d": {"results": [{"Code": 7}]}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record["Code"], json!(7));

        assert!(unwrap_single(r#"{"d": {"results": []}}"#).unwrap().is_none());
    }

    #[test]
    fn test_bad_envelopes() {
        assert!(matches!(unwrap_single("<html>"), Err(Error::Decode(_))));
        assert!(matches!(unwrap_single(r#"{"value": []}"#), Err(Error::Decode(_))));
        assert!(matches!(unwrap_collection(r#"{"d": {"Code": 1}}"#), Err(Error::Decode(_))));
    }
}
