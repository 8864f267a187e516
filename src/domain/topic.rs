use serde::Serialize;

/// A single topic-level config override, e.g. `retention.ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub name: &'static str,
    pub value: &'static str,
}

/// A topic the tool knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopicSpec {
    pub name: &'static str,
    pub num_partitions: i32,
    pub replication_factor: i32,
    pub config_entries: &'static [ConfigEntry],
}

/// Topics managed by `create`.
pub const TOPICS: &[TopicSpec] = &[
    TopicSpec {
        name: "user-registrations",
        num_partitions: 3,
        replication_factor: 1,
        config_entries: &[
            ConfigEntry {
                name: "retention.ms",
                value: "604800000", // 7 days
            },
            ConfigEntry {
                name: "cleanup.policy",
                value: "delete",
            },
        ],
    },
    TopicSpec {
        name: "order-events",
        num_partitions: 5,
        replication_factor: 1,
        config_entries: &[
            ConfigEntry {
                name: "retention.ms",
                value: "2592000000", // 30 days
            },
            ConfigEntry {
                name: "cleanup.policy",
                value: "compact,delete",
            },
        ],
    },
    TopicSpec {
        name: "payment-transactions",
        num_partitions: 2,
        replication_factor: 1,
        config_entries: &[ConfigEntry {
            name: "retention.ms",
            value: "86400000", // 1 day
        }],
    },
    TopicSpec {
        name: "inventory-updates",
        num_partitions: 3,
        replication_factor: 1,
        config_entries: &[ConfigEntry {
            name: "retention.bytes",
            value: "1073741824", // 1 GB
        }],
    },
    TopicSpec {
        name: "notification-events",
        num_partitions: 2,
        replication_factor: 1,
        config_entries: &[],
    },
];

/// Returns the catalog entries whose names are not in `existing`, preserving catalog order.
pub fn missing_topics<'a>(catalog: &'a [TopicSpec], existing: &[String]) -> Vec<&'a TopicSpec> {
    catalog
        .iter()
        .filter(|spec| !existing.iter().any(|name| name == spec.name))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionMetadata {
    pub id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicMetadata {
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}
