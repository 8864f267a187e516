use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::{PartitionMetadata, TopicMetadata, TopicSpec};
use crate::infrastructure::kafka_abstraction::{TopicAdminError, TopicAdminTrait, TopicFailure};

const TOPIC_ALREADY_EXISTS: &str = "Broker: Topic already exists";
const UNKNOWN_TOPIC: &str = "Broker: Unknown topic or partition";
const INVALID_PARTITIONS: &str = "Broker: Invalid number of partitions";
const INVALID_REPLICATION_FACTOR: &str = "Broker: Invalid replication factor";

/// Number of times each admin operation reached the simulated cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminCallCounts {
    pub connect: usize,
    pub disconnect: usize,
    pub list_topics: usize,
    pub create_topics: usize,
    pub fetch_topic_metadata: usize,
    pub delete_topic: usize,
}

impl AdminCallCounts {
    /// Calls that needed a live cluster, i.e. everything except `disconnect`.
    pub fn broker_calls(&self) -> usize {
        self.connect
            + self.list_topics
            + self.create_topics
            + self.fetch_topic_metadata
            + self.delete_topic
    }
}

#[derive(Debug)]
struct ClusterState {
    reachable: bool,
    connected: bool,
    broker_ids: Vec<i32>,
    topics: BTreeMap<String, TopicMetadata>,
    calls: AdminCallCounts,
}

impl ClusterState {
    fn ensure_connected(&self) -> Result<(), TopicAdminError> {
        if self.connected {
            Ok(())
        } else {
            Err(TopicAdminError::NotConnected)
        }
    }

    fn build_topic(&self, name: &str, partitions: i32, replication_factor: i32) -> TopicMetadata {
        let brokers = self.broker_ids.len();
        let partitions = (0..partitions)
            .map(|id| {
                let start = id as usize % brokers;
                let replicas: Vec<i32> = (0..replication_factor as usize)
                    .map(|offset| self.broker_ids[(start + offset) % brokers])
                    .collect();
                PartitionMetadata {
                    id,
                    leader: replicas[0],
                    isr: replicas.clone(),
                    replicas,
                }
            })
            .collect();

        TopicMetadata {
            name: name.to_string(),
            partitions,
        }
    }
}

/// A [`TopicAdminTrait`] that simulates a small cluster in memory.
#[derive(Debug)]
pub struct InMemoryTopicAdmin {
    state: Mutex<ClusterState>,
}

impl InMemoryTopicAdmin {
    /// A reachable cluster with brokers numbered `1..=broker_count`.
    pub fn new(broker_count: i32) -> Self {
        Self::build(broker_count, true)
    }

    /// A cluster that refuses every connection attempt.
    pub fn unreachable() -> Self {
        Self::build(1, false)
    }

    fn build(broker_count: i32, reachable: bool) -> Self {
        Self {
            state: Mutex::new(ClusterState {
                reachable,
                connected: false,
                broker_ids: (1..=broker_count.max(1)).collect(),
                topics: BTreeMap::new(),
                calls: AdminCallCounts::default(),
            }),
        }
    }

    /// Seeds an existing topic with replication factor 1.
    pub fn with_topic(mut self, name: &str, partitions: i32) -> Self {
        let state = self.state.get_mut();
        let topic = state.build_topic(name, partitions, 1);
        state.topics.insert(name.to_string(), topic);
        self
    }

    pub async fn topic_names(&self) -> Vec<String> {
        self.state.lock().await.topics.keys().cloned().collect()
    }

    pub async fn topic(&self, name: &str) -> Option<TopicMetadata> {
        self.state.lock().await.topics.get(name).cloned()
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }

    pub async fn call_counts(&self) -> AdminCallCounts {
        self.state.lock().await.calls.clone()
    }
}

impl Default for InMemoryTopicAdmin {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl TopicAdminTrait for InMemoryTopicAdmin {
    async fn connect(&self) -> Result<(), TopicAdminError> {
        let mut state = self.state.lock().await;
        state.calls.connect += 1;
        if !state.reachable {
            return Err(TopicAdminError::Connection(
                "in-memory cluster unreachable".to_string(),
            ));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TopicAdminError> {
        let mut state = self.state.lock().await;
        state.calls.disconnect += 1;
        state.connected = false;
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<String>, TopicAdminError> {
        let mut state = self.state.lock().await;
        state.calls.list_topics += 1;
        state.ensure_connected()?;
        Ok(state.topics.keys().cloned().collect())
    }

    async fn create_topics(
        &self,
        topics: &[TopicSpec],
        _timeout: Duration,
    ) -> Result<Vec<String>, TopicAdminError> {
        let mut state = self.state.lock().await;
        state.calls.create_topics += 1;
        state.ensure_connected()?;

        let mut created = Vec::new();
        let mut failures = Vec::new();
        for spec in topics {
            let reason = if state.topics.contains_key(spec.name) {
                tracing::warn!("Topic {}: {}, skipping", spec.name, TOPIC_ALREADY_EXISTS);
                continue;
            } else if spec.num_partitions <= 0 {
                Some(INVALID_PARTITIONS)
            } else if spec.replication_factor <= 0
                || spec.replication_factor as usize > state.broker_ids.len()
            {
                Some(INVALID_REPLICATION_FACTOR)
            } else {
                None
            };

            match reason {
                Some(reason) => failures.push(TopicFailure {
                    topic: spec.name.to_string(),
                    reason: reason.to_string(),
                }),
                None => {
                    let topic =
                        state.build_topic(spec.name, spec.num_partitions, spec.replication_factor);
                    state.topics.insert(spec.name.to_string(), topic);
                    created.push(spec.name.to_string());
                }
            }
        }

        if failures.is_empty() {
            Ok(created)
        } else {
            Err(TopicAdminError::TopicFailures(failures))
        }
    }

    async fn fetch_topic_metadata(
        &self,
        topics: &[String],
    ) -> Result<Vec<TopicMetadata>, TopicAdminError> {
        let mut state = self.state.lock().await;
        state.calls.fetch_topic_metadata += 1;
        state.ensure_connected()?;

        Ok(state
            .topics
            .values()
            .filter(|t| topics.is_empty() || topics.contains(&t.name))
            .cloned()
            .collect())
    }

    async fn delete_topic(&self, topic: &str, _timeout: Duration) -> Result<(), TopicAdminError> {
        let mut state = self.state.lock().await;
        state.calls.delete_topic += 1;
        state.ensure_connected()?;

        match state.topics.remove(topic) {
            Some(_) => Ok(()),
            None => Err(TopicAdminError::TopicFailures(vec![TopicFailure {
                topic: topic.to_string(),
                reason: UNKNOWN_TOPIC.to_string(),
            }])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigEntry;

    const WIDE: TopicSpec = TopicSpec {
        name: "wide",
        num_partitions: 4,
        replication_factor: 3,
        config_entries: &[],
    };

    #[tokio::test]
    async fn test_requires_connect() {
        let admin = InMemoryTopicAdmin::new(1);
        assert!(matches!(
            admin.list_topics().await,
            Err(TopicAdminError::NotConnected)
        ));
        admin.connect().await.unwrap();
        assert!(admin.list_topics().await.unwrap().is_empty());
        admin.disconnect().await.unwrap();
        assert!(!admin.is_connected().await);
    }

    #[tokio::test]
    async fn test_unreachable_cluster() {
        let admin = InMemoryTopicAdmin::unreachable();
        let err = admin.connect().await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(!admin.is_connected().await);
    }

    #[tokio::test]
    async fn test_partitions_spread_across_brokers() {
        let admin = InMemoryTopicAdmin::new(3);
        admin.connect().await.unwrap();
        admin
            .create_topics(&[WIDE], Duration::from_secs(1))
            .await
            .unwrap();

        let topic = admin.topic("wide").await.unwrap();
        let leaders: Vec<i32> = topic.partitions.iter().map(|p| p.leader).collect();
        assert_eq!(leaders, vec![1, 2, 3, 1]);
        assert!(topic.partitions.iter().all(|p| p.replicas.len() == 3));
    }

    #[tokio::test]
    async fn test_rejects_replication_factor_above_broker_count() {
        let admin = InMemoryTopicAdmin::new(1);
        admin.connect().await.unwrap();
        let ok = TopicSpec {
            name: "narrow",
            num_partitions: 1,
            replication_factor: 1,
            config_entries: &[ConfigEntry {
                name: "retention.ms",
                value: "1000",
            }],
        };

        let err = admin
            .create_topics(&[WIDE, ok], Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            TopicAdminError::TopicFailures(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].topic, "wide");
                assert_eq!(failures[0].reason, INVALID_REPLICATION_FACTOR);
            }
            other => panic!("unexpected error {:?}", other),
        }
        // Per-topic failures do not roll back the rest of the request.
        assert_eq!(admin.topic_names().await, vec!["narrow"]);
    }

    #[tokio::test]
    async fn test_delete_unknown_topic() {
        let admin = InMemoryTopicAdmin::new(1).with_topic("orders", 2);
        admin.connect().await.unwrap();
        let err = admin
            .delete_topic("missing", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(admin.topic_names().await, vec!["orders"]);
    }
}
