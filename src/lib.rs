pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{CreateReport, TopicListing, TopicService};
pub use domain::{ConfigEntry, PartitionMetadata, TopicMetadata, TopicSpec, TOPICS};
pub use infrastructure::{
    InMemoryTopicAdmin, KafkaAdmin, KafkaAdminConfig, TopicAdminError, TopicAdminTrait,
};
