use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::domain::{missing_topics, TopicMetadata, TopicSpec};
use crate::infrastructure::kafka_abstraction::{TopicAdminError, TopicAdminTrait};

/// Outcome of a `create` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReport {
    pub existing: Vec<String>,
    /// Topics this run created. A topic another client created first is not listed.
    pub created: Vec<String>,
    /// Metadata of every catalog topic. `None` when no create request was sent.
    pub metadata: Option<Vec<TopicMetadata>>,
}

impl CreateReport {
    pub fn create_requested(&self) -> bool {
        self.metadata.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListing {
    pub names: Vec<String>,
    pub metadata: Vec<TopicMetadata>,
}

/// Runs the create / list / delete flows against a cluster.
///
/// Each flow opens its own session and disconnects on every exit path, including a failed
/// connect. Failures are logged here and handed back so the caller can pick an exit status.
pub struct TopicService<A: TopicAdminTrait> {
    admin: Arc<A>,
    catalog: &'static [TopicSpec],
    operation_timeout: Duration,
}

impl<A: TopicAdminTrait> TopicService<A> {
    pub fn new(admin: Arc<A>, catalog: &'static [TopicSpec], operation_timeout: Duration) -> Self {
        Self {
            admin,
            catalog,
            operation_timeout,
        }
    }

    pub async fn create_topics(&self) -> Result<CreateReport, TopicAdminError> {
        let result = self.try_create_topics().await;
        if let Err(e) = &result {
            error!("Error creating topics: {}", e);
        }
        self.disconnect().await;
        result
    }

    pub async fn list_topics(&self) -> Result<TopicListing, TopicAdminError> {
        let result = self.try_list_topics().await;
        if let Err(e) = &result {
            error!("Error listing topics: {}", e);
        }
        self.disconnect().await;
        result
    }

    pub async fn delete_topic(&self, topic_name: &str) -> Result<(), TopicAdminError> {
        let result = self.try_delete_topic(topic_name).await;
        match &result {
            Ok(()) => info!("Topic \"{}\" deleted successfully.", topic_name),
            Err(e) => error!("Error deleting topic {}: {}", topic_name, e),
        }
        self.disconnect().await;
        result
    }

    async fn try_create_topics(&self) -> Result<CreateReport, TopicAdminError> {
        self.admin.connect().await?;

        let existing = self.admin.list_topics().await?;
        info!("Existing topics: {:?}", existing);

        let to_create: Vec<TopicSpec> = missing_topics(self.catalog, &existing)
            .into_iter()
            .copied()
            .collect();

        if to_create.is_empty() {
            info!("All topics already exist.");
            return Ok(CreateReport {
                existing,
                created: Vec::new(),
                metadata: None,
            });
        }

        info!("Creating {} topics...", to_create.len());
        let created = self
            .admin
            .create_topics(&to_create, self.operation_timeout)
            .await?;
        info!("Topics created successfully!");

        let names: Vec<String> = self.catalog.iter().map(|t| t.name.to_string()).collect();
        let metadata = self.admin.fetch_topic_metadata(&names).await?;

        Ok(CreateReport {
            existing,
            created,
            metadata: Some(metadata),
        })
    }

    async fn try_list_topics(&self) -> Result<TopicListing, TopicAdminError> {
        self.admin.connect().await?;
        let names = self.admin.list_topics().await?;
        let metadata = self.admin.fetch_topic_metadata(&[]).await?;
        Ok(TopicListing { names, metadata })
    }

    async fn try_delete_topic(&self, topic_name: &str) -> Result<(), TopicAdminError> {
        self.admin.connect().await?;
        info!("Deleting topic: {}", topic_name);
        self.admin
            .delete_topic(topic_name, self.operation_timeout)
            .await
    }

    async fn disconnect(&self) {
        match self.admin.disconnect().await {
            Ok(()) => info!("Disconnected from Kafka."),
            Err(e) => warn!("Error disconnecting from Kafka: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::render_create_report;
    use crate::domain::{PartitionMetadata, TOPICS};
    use crate::infrastructure::kafka_abstraction::{MockTopicAdminTrait, TopicFailure};
    use mockall::predicate::eq;

    fn service(mock: MockTopicAdminTrait) -> TopicService<MockTopicAdminTrait> {
        TopicService::new(Arc::new(mock), TOPICS, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_create_skips_request_when_all_topics_exist() {
        let mut mock = MockTopicAdminTrait::new();
        mock.expect_connect().times(1).returning(|| Ok(()));
        mock.expect_list_topics()
            .times(1)
            .returning(|| Ok(TOPICS.iter().map(|t| t.name.to_string()).collect()));
        mock.expect_create_topics().never();
        mock.expect_fetch_topic_metadata().never();
        mock.expect_disconnect().times(1).returning(|| Ok(()));

        let report = service(mock).create_topics().await.unwrap();
        assert!(!report.create_requested());
        assert_eq!(report.existing.len(), TOPICS.len());
    }

    #[tokio::test]
    async fn test_create_sends_only_missing_topics() {
        let mut mock = MockTopicAdminTrait::new();
        mock.expect_connect().returning(|| Ok(()));
        mock.expect_list_topics().returning(|| {
            Ok(vec![
                "user-registrations".to_string(),
                "order-events".to_string(),
            ])
        });
        mock.expect_create_topics()
            .times(1)
            .withf(|topics, timeout| {
                let names: Vec<_> = topics.iter().map(|t| t.name).collect();
                names
                    == vec![
                        "payment-transactions",
                        "inventory-updates",
                        "notification-events",
                    ]
                    && *timeout == Duration::from_secs(30)
            })
            .returning(|topics, _| Ok(topics.iter().map(|t| t.name.to_string()).collect()));
        mock.expect_fetch_topic_metadata()
            .times(1)
            .withf(|names| names.len() == TOPICS.len())
            .returning(|_| Ok(Vec::new()));
        mock.expect_disconnect().times(1).returning(|| Ok(()));

        let report = service(mock).create_topics().await.unwrap();
        assert_eq!(report.created.len(), 3);
        assert!(report.create_requested());
    }

    #[tokio::test]
    async fn test_create_reports_metadata_when_another_client_won_the_race() {
        let mut mock = MockTopicAdminTrait::new();
        mock.expect_connect().returning(|| Ok(()));
        mock.expect_list_topics().returning(|| Ok(Vec::new()));
        // Every topic came back as TopicAlreadyExists, which is tolerated.
        mock.expect_create_topics()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        mock.expect_fetch_topic_metadata().times(1).returning(|_| {
            Ok(TOPICS
                .iter()
                .map(|t| TopicMetadata {
                    name: t.name.to_string(),
                    partitions: (0..t.num_partitions)
                        .map(|id| PartitionMetadata {
                            id,
                            leader: 1,
                            replicas: vec![1],
                            isr: vec![1],
                        })
                        .collect(),
                })
                .collect())
        });
        mock.expect_disconnect().times(1).returning(|| Ok(()));

        let report = service(mock).create_topics().await.unwrap();
        assert!(report.created.is_empty());
        assert!(report.create_requested());

        let mut out = Vec::new();
        render_create_report(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\nCreated Topics:\n"));
        for spec in TOPICS {
            assert!(text.contains(&format!(
                "- {} (Partitions: {})\n",
                spec.name, spec.num_partitions
            )));
        }
    }

    #[tokio::test]
    async fn test_disconnects_after_failed_connect() {
        let mut mock = MockTopicAdminTrait::new();
        mock.expect_connect()
            .times(1)
            .returning(|| Err(TopicAdminError::Connection("refused".to_string())));
        mock.expect_list_topics().never();
        mock.expect_disconnect().times(1).returning(|| Ok(()));

        let err = service(mock).list_topics().await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_disconnects_after_failed_delete() {
        let mut mock = MockTopicAdminTrait::new();
        mock.expect_connect().returning(|| Ok(()));
        mock.expect_delete_topic()
            .with(eq("ghost"), eq(Duration::from_secs(30)))
            .times(1)
            .returning(|topic, _| {
                Err(TopicAdminError::TopicFailures(vec![TopicFailure {
                    topic: topic.to_string(),
                    reason: "Broker: Unknown topic or partition".to_string(),
                }]))
            });
        mock.expect_disconnect().times(1).returning(|| Ok(()));

        let err = service(mock).delete_topic("ghost").await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_disconnect_error_does_not_mask_result() {
        let mut mock = MockTopicAdminTrait::new();
        mock.expect_connect().returning(|| Ok(()));
        mock.expect_list_topics()
            .returning(|| Ok(vec!["orders".to_string()]));
        mock.expect_fetch_topic_metadata()
            .with(eq(Vec::<String>::new()))
            .returning(|_| Ok(Vec::new()));
        mock.expect_disconnect()
            .returning(|| Err(TopicAdminError::NotConnected));

        let listing = service(mock).list_topics().await.unwrap();
        assert_eq!(listing.names, vec!["orders"]);
    }
}
