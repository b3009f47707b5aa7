use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Namespace under which a configured seed string becomes the seed id.
const SEED_NAMESPACE: Uuid = Uuid::from_u128(0x18daddcf_a234_4f59_808a_dbf6a42e17bb);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Node,
    Device,
    Source,
    Flow,
    Sender,
    Receiver,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Node => "node",
            ResourceType::Device => "device",
            ResourceType::Source => "source",
            ResourceType::Flow => "flow",
            ResourceType::Sender => "sender",
            ResourceType::Receiver => "receiver",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a configured seed string onto the seed id used by [`make_id`].
pub fn make_seed_id(seed: &str) -> Uuid {
    Uuid::new_v5(&SEED_NAMESPACE, seed.as_bytes())
}

/// Repeatable id for a resource: the same seed, type and internal id always
/// give the same id, across restarts too. Node and device use an empty internal id.
pub fn make_id(seed_id: &Uuid, resource_type: ResourceType, internal_id: &str) -> Uuid {
    let name = format!("/x-nmos/node/{}/{}", resource_type.as_str(), internal_id);
    Uuid::new_v5(seed_id, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_id_is_repeatable() {
        let seed_id = make_seed_id("nmos-node.local:80");
        let first = make_id(&seed_id, ResourceType::Sender, "sink-0");
        let second = make_id(&seed_id, ResourceType::Sender, "sink-0");
        assert_eq!(first, second);
    }

    #[test]
    fn test_make_id_differs_by_internal_id() {
        let seed_id = make_seed_id("seed");
        let ids: std::collections::HashSet<Uuid> = (0..256)
            .map(|i| make_id(&seed_id, ResourceType::Receiver, &format!("source-{}", i)))
            .collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn test_make_id_differs_by_type_and_seed() {
        let seed_id = make_seed_id("seed");
        let sender = make_id(&seed_id, ResourceType::Sender, "x");
        let flow = make_id(&seed_id, ResourceType::Flow, "x");
        let source = make_id(&seed_id, ResourceType::Source, "x");
        assert_ne!(sender, flow);
        assert_ne!(flow, source);

        let other_seed = make_seed_id("other");
        assert_ne!(sender, make_id(&other_seed, ResourceType::Sender, "x"));
    }

    #[test]
    fn test_seed_id_is_name_based() {
        assert_eq!(make_seed_id("a"), make_seed_id("a"));
        assert_eq!(make_seed_id("a").get_version_num(), 5);
    }
}
