//! Resource model.
//!
//! A resource is an href plus a bag of JSON properties. Concrete resource types
//! are thin wrappers around [`ResourceData`] and describe themselves through a
//! static [`ResourceType`] descriptor, which tells the converter, the cache
//! filters and the API-key filters everything they need to know about the
//! type's properties.
//!
//! # Identity
//!
//! Instance resources loaded through the data store are backed by a shared
//! [`Enlistment`]: every instance obtained for the same href reads and writes
//! the same property map, so a change made through one is visible through all
//! of them. Each instance additionally remembers which properties *it* changed
//! (its dirty set) so that `save` can send a partial update.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::ds::enlistment::Enlistment;
use crate::http::QueryString;

/// An ordered JSON property map.
pub type PropertyMap = serde_json::Map<String, Value>;

/// The identity property.
pub const HREF: &str = "href";
/// Collection page items.
pub const ITEMS: &str = "items";
/// Collection page offset.
pub const OFFSET: &str = "offset";
/// Collection page limit.
pub const LIMIT: &str = "limit";
/// Total collection size.
pub const SIZE: &str = "size";
/// Nested custom data of extendable resources.
pub const CUSTOM_DATA: &str = "customData";
/// Synthetic href of collections built from a bare JSON array.
pub const LOCAL_HREF: &str = "local";

/// Behavioural markers used by the filter chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceTag {
    /// No special handling.
    Generic,
    /// Accounts (evicted after email verification).
    Account,
    /// API keys and API key collections (secret encryption).
    ApiKey,
    /// Free-form custom data, never sanitized.
    CustomData,
    /// Login attempts always go to the server.
    LoginAttempt,
    /// Provider account requests always go to the server.
    ProviderAccountAccess,
    /// Provider account results are never cached.
    ProviderAccountResult,
    /// Email verification tokens.
    EmailVerificationToken,
    /// Password reset tokens are never cached.
    PasswordResetToken,
    /// OAuth access tokens are never cached.
    AccessToken,
}

/// Whether a type is a single instance or a paged collection.
#[derive(Clone, Copy, Debug)]
pub enum ResourceKind {
    /// A single resource.
    Instance,
    /// A collection page whose `items` are of the given type.
    Collection {
        /// The item type.
        item: &'static ResourceType,
    },
}

/// Static description of a resource type.
///
/// Descriptors are declared as `static` items so that types can reference each
/// other (an account references its directory, a directory its account list).
///
/// # Example
///
/// ```rust
/// use idm_sdk::ds::{ResourceTag, ResourceType};
///
/// static WIDGET: ResourceType = ResourceType::instance("Widget")
///     .with_raw_maps(&["settings"])
///     .with_sensitive(&["pin"]);
/// static WIDGET_LIST: ResourceType = ResourceType::collection("WidgetList", &WIDGET);
///
/// assert!(WIDGET.is_raw_map("settings"));
/// assert!(WIDGET_LIST.is_collection());
/// assert_eq!(WIDGET_LIST.item_type().unwrap().name(), "Widget");
/// assert_eq!(WIDGET.tag(), ResourceTag::Generic);
/// ```
pub struct ResourceType {
    name: &'static str,
    kind: ResourceKind,
    tag: ResourceTag,
    references: &'static [(&'static str, &'static ResourceType)],
    raw_map_properties: &'static [&'static str],
    embedded_properties: &'static [&'static str],
    rule_set_properties: &'static [&'static str],
    sensitive_properties: &'static [&'static str],
    extendable: bool,
}

impl ResourceType {
    /// Declares an instance type.
    #[must_use]
    pub const fn instance(name: &'static str) -> Self {
        Self {
            name,
            kind: ResourceKind::Instance,
            tag: ResourceTag::Generic,
            references: &[],
            raw_map_properties: &[],
            embedded_properties: &[],
            rule_set_properties: &[],
            sensitive_properties: &[],
            extendable: false,
        }
    }

    /// Declares a collection type with items of type `item`.
    #[must_use]
    pub const fn collection(name: &'static str, item: &'static Self) -> Self {
        let mut collection = Self::instance(name);
        collection.kind = ResourceKind::Collection { item };
        collection
    }

    /// Sets the behavioural tag.
    #[must_use]
    pub const fn tagged(mut self, tag: ResourceTag) -> Self {
        self.tag = tag;
        self
    }

    /// Declares nested resource references by property name.
    #[must_use]
    pub const fn with_references(
        mut self,
        references: &'static [(&'static str, &'static ResourceType)],
    ) -> Self {
        self.references = references;
        self
    }

    /// Declares map-valued properties that are plain data, not references.
    #[must_use]
    pub const fn with_raw_maps(mut self, properties: &'static [&'static str]) -> Self {
        self.raw_map_properties = properties;
        self
    }

    /// Declares nested maps submitted verbatim with their owner.
    #[must_use]
    pub const fn with_embedded(mut self, properties: &'static [&'static str]) -> Self {
        self.embedded_properties = properties;
        self
    }

    /// Declares set-valued properties submitted as `{"items": [...]}`.
    #[must_use]
    pub const fn with_rule_sets(mut self, properties: &'static [&'static str]) -> Self {
        self.rule_set_properties = properties;
        self
    }

    /// Declares properties that must never be cached.
    #[must_use]
    pub const fn with_sensitive(mut self, properties: &'static [&'static str]) -> Self {
        self.sensitive_properties = properties;
        self
    }

    /// Marks the type as carrying nested `customData`.
    #[must_use]
    pub const fn extendable(mut self) -> Self {
        self.extendable = true;
        self
    }

    /// Returns the public type name, also the default cache region name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the behavioural tag.
    #[must_use]
    pub const fn tag(&self) -> ResourceTag {
        self.tag
    }

    /// Returns `true` for collection types.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.kind, ResourceKind::Collection { .. })
    }

    /// Returns the item type of a collection.
    #[must_use]
    pub const fn item_type(&self) -> Option<&'static Self> {
        match self.kind {
            ResourceKind::Collection { item } => Some(item),
            ResourceKind::Instance => None,
        }
    }

    /// Returns `true` if the type has nested custom data.
    #[must_use]
    pub const fn is_extendable(&self) -> bool {
        self.extendable
    }

    /// Returns the declared type of a nested reference.
    #[must_use]
    pub fn reference_type(&self, property: &str) -> Option<&'static Self> {
        self.references
            .iter()
            .find(|(name, _)| *name == property)
            .map(|(_, resource_type)| *resource_type)
    }

    /// Returns `true` if `property` holds plain map data.
    #[must_use]
    pub fn is_raw_map(&self, property: &str) -> bool {
        self.raw_map_properties.contains(&property)
    }

    /// Returns `true` if `property` is submitted verbatim.
    #[must_use]
    pub fn is_embedded(&self, property: &str) -> bool {
        self.embedded_properties.contains(&property)
    }

    /// Returns `true` if `property` is a rule set.
    #[must_use]
    pub fn is_rule_set(&self, property: &str) -> bool {
        self.rule_set_properties.contains(&property)
    }

    /// Returns `true` if `property` must never be cached.
    #[must_use]
    pub fn is_sensitive(&self, property: &str) -> bool {
        self.sensitive_properties.contains(&property)
    }

    /// Returns `true` if reads of this type may be served from cache.
    #[must_use]
    pub const fn reads_from_cache(&self) -> bool {
        !matches!(
            self.tag,
            ResourceTag::LoginAttempt | ResourceTag::ProviderAccountAccess
        )
    }

    /// Returns `true` if results of this type may be written to cache.
    #[must_use]
    pub const fn writes_to_cache(&self) -> bool {
        !matches!(
            self.tag,
            ResourceTag::PasswordResetToken
                | ResourceTag::ProviderAccountResult
                | ResourceTag::AccessToken
        )
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ResourceType {}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("collection", &self.is_collection())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Returns `true` if `map` has an href and at least one other property.
#[must_use]
pub fn is_materialized(map: &PropertyMap) -> bool {
    map.get(HREF).and_then(Value::as_str).is_some() && map.len() > 1
}

/// Returns `true` if `map` is a materialized single resource with a real href.
#[must_use]
pub fn is_instance_shaped(map: &PropertyMap) -> bool {
    is_materialized(map)
        && !map.contains_key(ITEMS)
        && map.get(HREF).and_then(Value::as_str) != Some(LOCAL_HREF)
}

/// Builds an href-only reference value.
#[must_use]
pub fn reference(href: &str) -> Value {
    let mut map = PropertyMap::new();
    map.insert(HREF.to_string(), Value::from(href));
    Value::Object(map)
}

/// A typed resource backed by [`ResourceData`].
pub trait Resource: Send + Sync + 'static {
    /// Returns the runtime type descriptor.
    fn resource_type(&self) -> &'static ResourceType;

    /// Returns the backing data.
    fn data(&self) -> &ResourceData;

    /// Returns the backing data for modification.
    fn data_mut(&mut self) -> &mut ResourceData;

    /// Returns the href, if the resource has been persisted.
    fn href(&self) -> Option<String> {
        self.data().href()
    }
}

/// A resource type known at compile time.
pub trait TypedResource: Resource + Sized {
    /// Returns the descriptor of the type itself.
    fn declared_type() -> &'static ResourceType;
}

/// A resource that can be built directly from data.
pub trait FromResourceData: TypedResource {
    /// Wraps `data`.
    fn from_data(data: ResourceData) -> Self;
}

/// A paged collection resource.
pub trait CollectionResource: TypedResource {
    /// The item type.
    type Item: TypedResource;

    /// Returns the page offset.
    fn offset(&self) -> u64 {
        self.data().get_u64(OFFSET).unwrap_or(0)
    }

    /// Returns the page limit.
    fn limit(&self) -> u64 {
        self.data()
            .get_u64(LIMIT)
            .unwrap_or(crate::ds::marshal::DEFAULT_LIMIT)
    }

    /// Returns the total number of items across all pages.
    fn size(&self) -> u64 {
        self.data().get_u64(SIZE).unwrap_or(0)
    }

    /// Returns `true` if a page follows this one.
    fn has_next_page(&self) -> bool {
        self.limit() > 0 && self.offset().saturating_add(self.limit()) < self.size()
    }
}

#[derive(Clone, Debug)]
enum Backing {
    Local(PropertyMap),
    Enlisted(Arc<Enlistment>),
}

impl Default for Backing {
    fn default() -> Self {
        Self::Local(PropertyMap::new())
    }
}

/// The property state of one resource instance.
///
/// Reads and writes go to the backing map, which is either private to this
/// instance or a shared [`Enlistment`]. Writes are also recorded in the
/// instance's dirty set.
#[derive(Clone, Debug, Default)]
pub struct ResourceData {
    backing: Backing,
    dirty: PropertyMap,
    query: Option<QueryString>,
}

impl ResourceData {
    /// Creates empty, unpersisted data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates clean data over a private copy of `properties`.
    #[must_use]
    pub fn from_properties(properties: PropertyMap) -> Self {
        Self {
            backing: Backing::Local(properties),
            dirty: PropertyMap::new(),
            query: None,
        }
    }

    /// Creates clean data over a shared enlistment.
    #[must_use]
    pub fn enlisted(enlistment: Arc<Enlistment>) -> Self {
        Self {
            backing: Backing::Enlisted(enlistment),
            dirty: PropertyMap::new(),
            query: None,
        }
    }

    /// Attaches the query the data was obtained with.
    #[must_use]
    pub fn with_query(mut self, query: Option<QueryString>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    /// Returns the query the data was obtained with.
    #[must_use]
    pub const fn query(&self) -> Option<&QueryString> {
        self.query.as_ref()
    }

    /// Returns a copy of the property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        match &self.backing {
            Backing::Local(map) => map.get(name).cloned(),
            Backing::Enlisted(enlistment) => enlistment.get(name),
        }
    }

    /// Returns a string property.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns an integer property.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).as_ref().and_then(Value::as_i64)
    }

    /// Returns a non-negative integer property.
    #[must_use]
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).as_ref().and_then(Value::as_u64)
    }

    /// Returns a boolean property.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).as_ref().and_then(Value::as_bool)
    }

    /// Returns an ISO-8601 date property.
    #[must_use]
    pub fn get_date(&self, name: &str) -> Option<DateTime<Utc>> {
        let raw = self.get_str(name)?;
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }

    /// Returns a map-valued property.
    #[must_use]
    pub fn get_map(&self, name: &str) -> Option<PropertyMap> {
        match self.get(name)? {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the href.
    #[must_use]
    pub fn href(&self) -> Option<String> {
        self.get_str(HREF)
    }

    /// Returns `true` if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match &self.backing {
            Backing::Local(map) => map.contains_key(name),
            Backing::Enlisted(enlistment) => enlistment.contains_key(name),
        }
    }

    /// Sets a property and marks it dirty.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match &mut self.backing {
            Backing::Local(map) => {
                map.insert(name.to_string(), value.clone());
            }
            Backing::Enlisted(enlistment) => {
                enlistment.insert(name, value.clone());
            }
        }
        self.dirty.insert(name.to_string(), value);
    }

    /// Sets a property to an href-only reference.
    pub fn set_reference(&mut self, name: &str, href: &str) {
        self.set(name, reference(href));
    }

    /// Sets a date property in ISO-8601 form with millisecond precision.
    pub fn set_date(&mut self, name: &str, date: DateTime<Utc>) {
        self.set(name, date.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    /// Removes a property from the backing map and the dirty set.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.dirty.shift_remove(name);
        match &mut self.backing {
            Backing::Local(map) => map.shift_remove(name),
            Backing::Enlisted(enlistment) => enlistment.remove(name),
        }
    }

    /// Returns the property names in order.
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        match &self.backing {
            Backing::Local(map) => map.keys().cloned().collect(),
            Backing::Enlisted(enlistment) => enlistment.keys(),
        }
    }

    /// Returns a copy of all properties, with this instance's own changes on top.
    #[must_use]
    pub fn snapshot(&self) -> PropertyMap {
        let mut snapshot = match &self.backing {
            Backing::Local(map) => map.clone(),
            Backing::Enlisted(enlistment) => enlistment.snapshot(),
        };
        for (name, value) in &self.dirty {
            snapshot.insert(name.clone(), value.clone());
        }
        snapshot
    }

    /// Returns the properties changed through this instance since load or save.
    #[must_use]
    pub const fn dirty_properties(&self) -> &PropertyMap {
        &self.dirty
    }

    /// Returns `true` if any property was changed through this instance.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Returns `true` if the data holds more than a bare href.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.href().is_some() && self.len() > 1
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Local(map) => map.len(),
            Backing::Enlisted(enlistment) => enlistment.len(),
        }
    }

    /// Returns `true` if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the shared enlistment, if the data is enlisted.
    #[must_use]
    pub const fn enlistment(&self) -> Option<&Arc<Enlistment>> {
        match &self.backing {
            Backing::Enlisted(enlistment) => Some(enlistment),
            Backing::Local(_) => None,
        }
    }

    /// Returns `true` if both instances read and write the same enlistment.
    #[must_use]
    pub fn shares_state_with(&self, other: &Self) -> bool {
        match (self.enlistment(), other.enlistment()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Replaces the backing state with server data and clears the dirty set.
    pub(crate) fn refresh(&mut self, properties: PropertyMap, enlistment: Option<Arc<Enlistment>>) {
        self.backing = enlistment.map_or(Backing::Local(properties), Backing::Enlisted);
        self.dirty.clear();
    }

    /// Replaces the backing state but keeps and re-applies this instance's changes.
    pub(crate) fn rebase(&mut self, properties: PropertyMap, enlistment: Option<Arc<Enlistment>>) {
        let dirty = std::mem::take(&mut self.dirty);
        self.refresh(properties, enlistment);
        for (name, value) in dirty {
            self.set(&name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static LEAF: ResourceType = ResourceType::instance("Leaf").with_sensitive(&["secret"]);
    static LEAF_LIST: ResourceType = ResourceType::collection("LeafList", &LEAF);
    static TREE: ResourceType = ResourceType::instance("Tree")
        .with_references(&[("leaves", &LEAF_LIST), ("favorite", &LEAF)])
        .tagged(ResourceTag::Account)
        .extendable();

    fn props(value: Value) -> PropertyMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_descriptor_lookups() {
        assert_eq!(TREE.reference_type("favorite"), Some(&LEAF));
        assert_eq!(TREE.reference_type("leaves").unwrap().name(), "LeafList");
        assert!(TREE.reference_type("unknown").is_none());
        assert!(LEAF.is_sensitive("secret"));
        assert!(TREE.is_extendable());
        assert!(LEAF_LIST.is_collection());
        assert_eq!(LEAF_LIST.item_type(), Some(&LEAF));
    }

    #[test]
    fn test_cache_policy_by_tag() {
        static LOGIN: ResourceType =
            ResourceType::instance("LoginAttempt").tagged(ResourceTag::LoginAttempt);
        static TOKEN: ResourceType =
            ResourceType::instance("AccessToken").tagged(ResourceTag::AccessToken);

        assert!(!LOGIN.reads_from_cache());
        assert!(LOGIN.writes_to_cache());
        assert!(TOKEN.reads_from_cache());
        assert!(!TOKEN.writes_to_cache());
    }

    #[test]
    fn test_materialization_helpers() {
        assert!(!is_materialized(&props(json!({"href": "h"}))));
        assert!(is_materialized(&props(json!({"href": "h", "name": "n"}))));
        assert!(!is_materialized(&props(json!({"name": "n"}))));
        assert!(!is_instance_shaped(&props(
            json!({"href": "h", "items": [], "size": 0})
        )));
        assert!(!is_instance_shaped(&props(
            json!({"href": "local", "name": "n"})
        )));
    }

    #[test]
    fn test_set_marks_dirty_and_updates_backing() {
        let mut data = ResourceData::from_properties(props(json!({"href": "h", "a": 1})));
        assert!(!data.is_dirty());

        data.set("b", 2);
        assert!(data.is_dirty());
        assert_eq!(data.get("b"), Some(json!(2)));
        assert_eq!(data.dirty_properties().len(), 1);
        assert_eq!(data.snapshot().len(), 3);
    }

    #[test]
    fn test_dates_round_trip_as_iso_strings() {
        let mut data = ResourceData::new();
        let date = DateTime::parse_from_rfc3339("2015-03-01T10:20:30.123Z")
            .unwrap()
            .with_timezone(&Utc);
        data.set_date("createdAt", date);

        assert_eq!(data.get_str("createdAt").unwrap(), "2015-03-01T10:20:30.123Z");
        assert_eq!(data.get_date("createdAt"), Some(date));
    }

    #[test]
    fn test_remove_clears_dirty_entry() {
        let mut data = ResourceData::new();
        data.set("a", 1);
        assert_eq!(data.remove("a"), Some(json!(1)));
        assert!(!data.is_dirty());
        assert!(data.is_empty());
    }

    #[test]
    fn test_rebase_keeps_local_changes() {
        let mut data = ResourceData::from_properties(props(json!({"href": "h"})));
        data.set("name", "mine");
        data.rebase(props(json!({"href": "h", "name": "server", "other": 1})), None);

        assert_eq!(data.get_str("name").unwrap(), "mine");
        assert_eq!(data.get_i64("other"), Some(1));
        assert!(data.is_dirty());
    }

    #[test]
    fn test_query_is_dropped_when_empty() {
        let data = ResourceData::new().with_query(Some(QueryString::new()));
        assert!(data.query().is_none());
    }
}
