//! Resources and page metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata attached to resources by page declarations.
///
/// `options` holds rendering options such as `layout`; `locals` are values
/// made available to the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMetadata {
    /// Rendering options.
    pub options: Map<String, Value>,
    /// Template locals.
    pub locals: Map<String, Value>,
}

impl PageMetadata {
    /// Returns `true` if there is nothing to attach.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.locals.is_empty()
    }

    /// Merges `other` into `self`; nested objects merge key by key and
    /// `other` wins on conflicts.
    pub fn merge(&mut self, other: &Self) {
        deep_merge(&mut self.options, &other.options);
        deep_merge(&mut self.locals, &other.locals);
    }
}

/// One path that will be built.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sg_sitemap::{PageMetadata, Resource};
///
/// let mut resource = Resource::new("about.html");
/// let mut metadata = PageMetadata::default();
/// metadata.locals.insert("title".into(), json!("About"));
/// resource.add_metadata(&metadata);
///
/// assert_eq!(resource.metadata.locals["title"], json!("About"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Logical path.
    pub path: String,
    /// Path of the resource this one renders, for proxies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied_to: Option<String>,
    /// Accumulated metadata.
    #[serde(default, skip_serializing_if = "PageMetadata::is_empty")]
    pub metadata: PageMetadata,
}

impl Resource {
    /// Creates a resource that renders its own source.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            proxied_to: None,
            metadata: PageMetadata::default(),
        }
    }

    /// Creates a resource that renders `target` instead.
    #[must_use]
    pub fn proxy(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            proxied_to: Some(target.into()),
            ..Self::new(path)
        }
    }

    /// Returns `true` for proxies.
    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        self.proxied_to.is_some()
    }

    /// Merges page metadata into this resource.
    pub fn add_metadata(&mut self, metadata: &PageMetadata) {
        self.metadata.merge(metadata);
    }
}

fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(options: Value, locals: Value) -> PageMetadata {
        serde_json::from_value(json!({ "options": options, "locals": locals })).unwrap()
    }

    #[test]
    fn test_add_metadata_merges_and_overrides() {
        let mut resource = Resource::new("blog/post.html");
        resource.add_metadata(&metadata(
            json!({ "layout": "blog", "seo": { "index": true, "follow": true } }),
            json!({ "author": "ana" }),
        ));
        resource.add_metadata(&metadata(
            json!({ "layout": false, "seo": { "index": false } }),
            json!({ "tags": ["rust"] }),
        ));

        assert_eq!(resource.metadata.options["layout"], json!(false));
        assert_eq!(
            resource.metadata.options["seo"],
            json!({ "index": false, "follow": true })
        );
        assert_eq!(resource.metadata.locals["author"], json!("ana"));
        assert_eq!(resource.metadata.locals["tags"], json!(["rust"]));
    }

    #[test]
    fn test_serialization_skips_empty_parts() {
        let plain = serde_json::to_value(Resource::new("a.html")).unwrap();
        assert_eq!(plain, json!({ "path": "a.html" }));

        let proxy = Resource::proxy("team", "about.html");
        assert!(proxy.is_proxy());
        let value = serde_json::to_value(&proxy).unwrap();
        assert_eq!(value, json!({ "path": "team", "proxied_to": "about.html" }));
    }

    #[test]
    fn test_metadata_defaults() {
        let parsed: PageMetadata = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.is_empty());
    }
}
