//! Bidirectional tag registry.
//!
//! Tracks which cache entries provide which tags, so an invalidated tag can
//! be resolved to the entries it affects. The registry lives inside the
//! client's cache state and shares its lock.

use std::collections::{HashMap, HashSet};

use super::keys::{CacheKey, Tag};

/// Tracks tag → cache keys and cache key → tags mappings.
#[derive(Debug, Default)]
pub struct TagRegistry {
    /// Maps provided tags to the entries providing them
    tag_to_keys: HashMap<Tag, HashSet<CacheKey>>,
    /// Maps entries to the tags they currently provide
    key_to_tags: HashMap<CacheKey, HashSet<Tag>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tags provided by `cache_key`, replacing any earlier set.
    pub fn register(&mut self, cache_key: &CacheKey, tags: impl IntoIterator<Item = Tag>) {
        self.unregister(cache_key);

        let tags: HashSet<Tag> = tags.into_iter().collect();
        if tags.is_empty() {
            return;
        }
        for tag in &tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(cache_key.clone());
        }
        self.key_to_tags.insert(cache_key.clone(), tags);
    }

    /// All cache keys providing a tag matched by `invalidated`.
    pub fn keys_matching(&self, invalidated: &Tag) -> HashSet<CacheKey> {
        match invalidated.id {
            Some(_) => self
                .tag_to_keys
                .get(invalidated)
                .cloned()
                .unwrap_or_default(),
            None => self
                .tag_to_keys
                .iter()
                .filter(|(provided, _)| invalidated.matches(provided))
                .flat_map(|(_, keys)| keys.iter().cloned())
                .collect(),
        }
    }

    /// Union of [`keys_matching`](Self::keys_matching) over several tags.
    pub fn keys_matching_any<'a>(
        &self,
        invalidated: impl IntoIterator<Item = &'a Tag>,
    ) -> HashSet<CacheKey> {
        invalidated
            .into_iter()
            .flat_map(|tag| self.keys_matching(tag))
            .collect()
    }

    pub fn tags_for_key(&self, cache_key: &CacheKey) -> HashSet<Tag> {
        self.key_to_tags
            .get(cache_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a cache key and clean up its tag mappings.
    pub fn unregister(&mut self, cache_key: &CacheKey) {
        if let Some(tags) = self.key_to_tags.remove(cache_key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(cache_key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.tag_to_keys.clear();
        self.key_to_tags.clear();
    }

    /// Number of distinct provided tags.
    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }

    /// Number of entries providing at least one tag.
    pub fn key_count(&self) -> usize {
        self.key_to_tags.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn key(endpoint: &str, args: serde_json::Value) -> CacheKey {
        CacheKey::new(endpoint, &args)
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = TagRegistry::new();
        let detail = key("getCourse", json!(3));

        registry.register(&detail, [Tag::id("Course", 3)]);

        assert!(
            registry
                .keys_matching(&Tag::id("Course", 3))
                .contains(&detail)
        );
        assert!(
            registry
                .tags_for_key(&detail)
                .contains(&Tag::id("Course", 3))
        );
    }

    #[test]
    fn kind_invalidation_reaches_lists_and_details() {
        let mut registry = TagRegistry::new();
        let list = key("getCourses", json!({ "page": 1 }));
        let detail = key("getCourse", json!(3));
        let other = key("getUsers", json!({}));

        registry.register(&list, [Tag::list("Course"), Tag::id("Course", 3)]);
        registry.register(&detail, [Tag::id("Course", 3)]);
        registry.register(&other, [Tag::list("User")]);

        let affected = registry.keys_matching(&Tag::kind("Course"));
        assert_eq!(affected.len(), 2);
        assert!(affected.contains(&list));
        assert!(affected.contains(&detail));
    }

    #[test]
    fn id_invalidation_skips_unrelated_entities() {
        let mut registry = TagRegistry::new();
        let three = key("getCourse", json!(3));
        let four = key("getCourse", json!(4));

        registry.register(&three, [Tag::id("Course", 3)]);
        registry.register(&four, [Tag::id("Course", 4)]);

        let affected = registry.keys_matching(&Tag::id("Course", 4));
        assert_eq!(affected.len(), 1);
        assert!(affected.contains(&four));
    }

    #[test]
    fn re_registering_replaces_tags() {
        let mut registry = TagRegistry::new();
        let list = key("getCourses", json!({}));

        registry.register(&list, [Tag::list("Course"), Tag::id("Course", 1)]);
        registry.register(&list, [Tag::list("Course"), Tag::id("Course", 2)]);

        assert!(registry.keys_matching(&Tag::id("Course", 1)).is_empty());
        assert!(
            registry
                .keys_matching(&Tag::id("Course", 2))
                .contains(&list)
        );
        assert_eq!(registry.tag_count(), 2);
    }

    #[test]
    fn unregister_cleans_up_mappings() {
        let mut registry = TagRegistry::new();
        let detail = key("getDocument", json!(42));

        registry.register(&detail, [Tag::id("Document", 42)]);
        assert_eq!(registry.key_count(), 1);
        assert_eq!(registry.tag_count(), 1);

        registry.unregister(&detail);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }

    #[test]
    fn matching_any_unions_results() {
        let mut registry = TagRegistry::new();
        let courses = key("getCourses", json!({}));
        let overview = key("getAnalyticsOverview", json!({ "range": "30d" }));

        registry.register(&courses, [Tag::list("Course")]);
        registry.register(&overview, [Tag::kind("Analytics")]);

        let affected =
            registry.keys_matching_any(&[Tag::list("Course"), Tag::kind("Analytics")]);
        assert_eq!(affected.len(), 2);
    }

    #[test]
    fn clear_removes_all_mappings() {
        let mut registry = TagRegistry::new();
        registry.register(&key("getCities", json!(null)), [Tag::list("City")]);

        registry.clear();
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }
}
