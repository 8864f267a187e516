use async_trait::async_trait;
use rdkafka::{
    admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult},
    client::DefaultClientContext,
    error::{KafkaError, RDKafkaErrorCode},
    metadata::{Metadata, MetadataTopic},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::{PartitionMetadata, TopicMetadata, TopicSpec};
use crate::infrastructure::kafka_config::KafkaAdminConfig;

/// Cluster administration operations used by the topic flows.
///
/// Implementations hold at most one live connection. Every operation other than
/// `connect`/`disconnect` fails with [`TopicAdminError::NotConnected`] when called
/// outside a connected session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopicAdminTrait: Send + Sync {
    async fn connect(&self) -> Result<(), TopicAdminError>;

    async fn disconnect(&self) -> Result<(), TopicAdminError>;

    /// Names of every topic in the cluster, sorted.
    async fn list_topics(&self) -> Result<Vec<String>, TopicAdminError>;

    /// Creates `topics` in one request and returns the names the broker created.
    async fn create_topics(
        &self,
        topics: &[TopicSpec],
        timeout: Duration,
    ) -> Result<Vec<String>, TopicAdminError>;

    /// Metadata for the named topics; an empty slice means every topic.
    async fn fetch_topic_metadata(
        &self,
        topics: &[String],
    ) -> Result<Vec<TopicMetadata>, TopicAdminError>;

    async fn delete_topic(&self, topic: &str, timeout: Duration) -> Result<(), TopicAdminError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFailure {
    pub topic: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TopicAdminError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Admin client is not connected")]
    NotConnected,
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("Topic operation failed: {}", describe_failures(.0))]
    TopicFailures(Vec<TopicFailure>),
    #[error("Background task failed: {0}")]
    Task(String),
}

impl TopicAdminError {
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TopicAdminError::Connection(_) | TopicAdminError::NotConnected
        )
    }

    /// Process exit status for this failure: 2 when the cluster was never reached, 3 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_connection_error() {
            2
        } else {
            3
        }
    }
}

fn describe_failures(failures: &[TopicFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.topic, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Splits per-topic admin results into succeeded names, failing on any error except `tolerated`.
fn collect_topic_results(
    results: Vec<TopicResult>,
    tolerated: Option<RDKafkaErrorCode>,
) -> Result<Vec<String>, TopicAdminError> {
    let mut succeeded = Vec::new();
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(topic) => succeeded.push(topic),
            Err((topic, code)) if Some(code) == tolerated => {
                tracing::warn!("Topic {}: {}, skipping", topic, code);
            }
            Err((topic, code)) => failures.push(TopicFailure {
                topic,
                reason: code.to_string(),
            }),
        }
    }

    if failures.is_empty() {
        Ok(succeeded)
    } else {
        Err(TopicAdminError::TopicFailures(failures))
    }
}

fn to_topic_metadata(topic: &MetadataTopic) -> TopicMetadata {
    let mut partitions: Vec<PartitionMetadata> = topic
        .partitions()
        .iter()
        .map(|partition| PartitionMetadata {
            id: partition.id(),
            leader: partition.leader(),
            replicas: partition.replicas().to_vec(),
            isr: partition.isr().to_vec(),
        })
        .collect();
    partitions.sort_by_key(|p| p.id);

    TopicMetadata {
        name: topic.name().to_string(),
        partitions,
    }
}

type RdAdminClient = AdminClient<DefaultClientContext>;

/// [`TopicAdminTrait`] backed by an `rdkafka` admin client.
pub struct KafkaAdmin {
    client: RwLock<Option<Arc<RdAdminClient>>>,
    config: KafkaAdminConfig,
}

impl KafkaAdmin {
    pub fn new(config: KafkaAdminConfig) -> Self {
        Self {
            client: RwLock::new(None),
            config,
        }
    }

    async fn client(&self) -> Result<Arc<RdAdminClient>, TopicAdminError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(TopicAdminError::NotConnected)
    }

}

/// Cluster-wide metadata request. librdkafka blocks the calling thread for up to
/// `timeout`, so the call runs on the blocking pool.
async fn fetch_cluster_metadata(
    client: Arc<RdAdminClient>,
    timeout: Duration,
) -> Result<Metadata, TopicAdminError> {
    tokio::task::spawn_blocking(move || client.inner().fetch_metadata(None, timeout))
        .await
        .map_err(|e| TopicAdminError::Task(e.to_string()))?
        .map_err(TopicAdminError::from)
}

#[async_trait]
impl TopicAdminTrait for KafkaAdmin {
    async fn connect(&self) -> Result<(), TopicAdminError> {
        let mut guard = self.client.write().await;
        if guard.is_some() {
            return Ok(());
        }

        tracing::info!("Connecting to Kafka at {}...", self.config.bootstrap_servers);

        let client: Arc<RdAdminClient> = Arc::new(
            self.config
                .to_client_config()
                .create()
                .map_err(|e| TopicAdminError::Connection(e.to_string()))?,
        );

        // librdkafka connects lazily; a metadata round trip proves the cluster answers.
        let metadata = fetch_cluster_metadata(client.clone(), self.config.connect_timeout)
            .await
            .map_err(|e| match e {
                TopicAdminError::Kafka(e) => TopicAdminError::Connection(format!(
                    "{} unreachable: {}",
                    self.config.bootstrap_servers, e
                )),
                other => other,
            })?;

        tracing::info!(
            "Connected successfully! {} broker(s) in cluster",
            metadata.brokers().len()
        );
        *guard = Some(client);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TopicAdminError> {
        if let Some(client) = self.client.write().await.take() {
            drop(client);
            tracing::debug!("Admin client for {} released", self.config.bootstrap_servers);
        }
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<String>, TopicAdminError> {
        let client = self.client().await?;
        let metadata = fetch_cluster_metadata(client, self.config.operation_timeout).await?;

        let mut names: Vec<String> = metadata
            .topics()
            .iter()
            .map(|topic| topic.name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_topics(
        &self,
        topics: &[TopicSpec],
        timeout: Duration,
    ) -> Result<Vec<String>, TopicAdminError> {
        let client = self.client().await?;

        let new_topics: Vec<NewTopic> = topics
            .iter()
            .map(|spec| {
                spec.config_entries.iter().fold(
                    NewTopic::new(
                        spec.name,
                        spec.num_partitions,
                        TopicReplication::Fixed(spec.replication_factor),
                    ),
                    |topic, entry| topic.set(entry.name, entry.value),
                )
            })
            .collect();

        let options = AdminOptions::new().operation_timeout(Some(timeout));
        let results = client.create_topics(&new_topics, &options).await?;

        collect_topic_results(results, Some(RDKafkaErrorCode::TopicAlreadyExists))
    }

    async fn fetch_topic_metadata(
        &self,
        topics: &[String],
    ) -> Result<Vec<TopicMetadata>, TopicAdminError> {
        let client = self.client().await?;
        let metadata = fetch_cluster_metadata(client, self.config.operation_timeout).await?;

        let mut result = Vec::new();
        for topic in metadata.topics() {
            if !topics.is_empty() && !topics.iter().any(|name| name == topic.name()) {
                continue;
            }
            if let Some(err) = topic.error() {
                tracing::warn!("Metadata for topic {} has error: {:?}", topic.name(), err);
                continue;
            }
            result.push(to_topic_metadata(topic));
        }

        for requested in topics {
            if !result.iter().any(|t| &t.name == requested) {
                tracing::warn!("No metadata returned for topic {}", requested);
            }
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn delete_topic(&self, topic: &str, timeout: Duration) -> Result<(), TopicAdminError> {
        let client = self.client().await?;

        let options = AdminOptions::new().operation_timeout(Some(timeout));
        let results = client.delete_topics(&[topic], &options).await?;

        collect_topic_results(results, None).map(|_| ())
    }
}
