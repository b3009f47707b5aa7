use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::{Device, Flow, Node, Receiver, Sender, Source};
use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{ResourceType, Tags, Version};

/// Tag carrying the caller's internal id on senders and receivers.
pub const INTERNAL_ID_TAG: &str = "urn:x-nvnmos:id";
pub const GROUP_HINT_TAG: &str = "urn:x-nmos:tag:grouphint/v1.0";

/// Attributes every resource carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceCore {
    pub id: Uuid,
    pub version: Version,
    pub label: String,
    pub description: String,
    pub tags: Tags,
}

impl ResourceCore {
    pub fn new(id: Uuid, label: &str, description: &str) -> Self {
        Self {
            id,
            version: Version::now(),
            label: label.to_string(),
            description: description.to_string(),
            tags: Tags::new(),
        }
    }

    pub fn bump_version(&mut self) {
        self.version = Version::now();
    }

    pub fn set_internal_id(&mut self, internal_id: &str) {
        self.tags
            .insert(INTERNAL_ID_TAG.to_string(), vec![internal_id.to_string()]);
    }

    pub fn internal_id(&self) -> Option<&str> {
        first_tag(&self.tags, INTERNAL_ID_TAG)
    }

    pub fn set_group_hint(&mut self, group_hint: &str) {
        self.tags
            .insert(GROUP_HINT_TAG.to_string(), vec![group_hint.to_string()]);
    }

    pub fn group_hint(&self) -> Option<&str> {
        first_tag(&self.tags, GROUP_HINT_TAG)
    }
}

fn first_tag<'a>(tags: &'a Tags, key: &str) -> Option<&'a str> {
    tags.get(key)
        .and_then(|values| values.first())
        .map(String::as_str)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Resource {
    Node(Node),
    Device(Device),
    Source(Source),
    Flow(Flow),
    Sender(Sender),
    Receiver(Receiver),
}

impl Resource {
    pub fn core(&self) -> &ResourceCore {
        match self {
            Resource::Node(r) => &r.core,
            Resource::Device(r) => &r.core,
            Resource::Source(r) => &r.core,
            Resource::Flow(r) => &r.core,
            Resource::Sender(r) => &r.core,
            Resource::Receiver(r) => &r.core,
        }
    }

    pub fn id(&self) -> Uuid {
        self.core().id
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Node(_) => ResourceType::Node,
            Resource::Device(_) => ResourceType::Device,
            Resource::Source(_) => ResourceType::Source,
            Resource::Flow(_) => ResourceType::Flow,
            Resource::Sender(_) => ResourceType::Sender,
            Resource::Receiver(_) => ResourceType::Receiver,
        }
    }
}

/// Typed access to one kind of [`Resource`].
pub trait TypedResource: Sized {
    const TYPE: ResourceType;

    fn from_resource(resource: &Resource) -> Option<&Self>;
    fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self>;
    fn into_resource(self) -> Resource;
}

macro_rules! typed_resource {
    ($($kind:ident),* $(,)?) => {
        $(
            impl TypedResource for $kind {
                const TYPE: ResourceType = ResourceType::$kind;

                fn from_resource(resource: &Resource) -> Option<&Self> {
                    match resource {
                        Resource::$kind(r) => Some(r),
                        _ => None,
                    }
                }

                fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self> {
                    match resource {
                        Resource::$kind(r) => Some(r),
                        _ => None,
                    }
                }

                fn into_resource(self) -> Resource {
                    Resource::$kind(self)
                }
            }
        )*
    };
}

typed_resource!(Node, Device, Source, Flow, Sender, Receiver);

/// Arena of resources keyed by id; lookups also check the kind.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    items: BTreeMap<Uuid, Resource>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the id is already taken.
    pub fn insert<R: TypedResource>(&mut self, resource: R) -> bool {
        let resource = resource.into_resource();
        let id = resource.id();
        if self.items.contains_key(&id) {
            return false;
        }
        self.items.insert(id, resource);
        true
    }

    /// Insert every resource, or none of them when any id is already taken.
    pub fn insert_all(&mut self, resources: Vec<Resource>) -> Result<()> {
        for (index, resource) in resources.iter().enumerate() {
            let id = resource.id();
            if self.items.contains_key(&id) || resources[..index].iter().any(|r| r.id() == id) {
                return Err(DomainError::DuplicateResource(format!(
                    "{} {}",
                    resource.resource_type(),
                    id
                )));
            }
        }
        for resource in resources {
            self.items.insert(resource.id(), resource);
        }
        Ok(())
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.items.contains_key(id)
    }

    pub fn find<R: TypedResource>(&self, id: &Uuid) -> Option<&R> {
        self.items.get(id).and_then(R::from_resource)
    }

    /// Apply `mutator` to the resource; false when there is no such resource of this kind.
    pub fn modify<R: TypedResource>(&mut self, id: &Uuid, mutator: impl FnOnce(&mut R)) -> bool {
        match self.items.get_mut(id).and_then(R::from_resource_mut) {
            Some(resource) => {
                mutator(resource);
                true
            }
            None => false,
        }
    }

    pub fn erase(&mut self, id: &Uuid) -> Option<Resource> {
        self.items.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.items.values()
    }

    pub fn iter_of<'a, R: TypedResource + 'a>(&'a self) -> impl Iterator<Item = &'a R> {
        self.items.values().filter_map(R::from_resource)
    }

    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.items
            .values()
            .filter(|r| r.resource_type() == resource_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
