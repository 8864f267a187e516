pub mod kafka_abstraction;
pub mod kafka_config;
pub mod logging;
pub mod memory_admin;

pub use kafka_abstraction::{KafkaAdmin, TopicAdminError, TopicAdminTrait, TopicFailure};
pub use kafka_config::KafkaAdminConfig;
pub use memory_admin::{AdminCallCounts, InMemoryTopicAdmin};
