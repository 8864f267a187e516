//! Command-line surface: argument model, dispatch, output rendering and exit codes.
//!
//! Command results go to stdout. Progress and failures are logged through `tracing`,
//! which writes to stderr.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, Level};

use crate::application::{CreateReport, TopicListing, TopicService};
use crate::domain::TOPICS;
use crate::infrastructure::kafka_abstraction::{KafkaAdmin, TopicAdminTrait};
use crate::infrastructure::kafka_config::KafkaAdminConfig;
use crate::infrastructure::logging::LoggingConfig;

pub const EXIT_SUCCESS: u8 = 0;
/// A required argument was missing.
pub const EXIT_USAGE: u8 = 1;
/// Output could not be written.
const EXIT_OUTPUT: u8 = 3;

pub const USAGE: &str = "
Kafka Admin Tool
Usage:
  kafka-admin create              - Create all predefined topics
  kafka-admin list                - List all topics
  kafka-admin delete <topicName>  - Delete a specific topic

Example:
  kafka-admin create
  kafka-admin list
  kafka-admin delete user-registrations
";

#[derive(Parser, Debug)]
#[command(
    name = "kafka-admin",
    version,
    about = "Create, list and delete the predefined Kafka topics",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Kafka bootstrap servers (overrides KAFKA_BOOTSTRAP_SERVERS)
    #[arg(long, global = true, value_name = "HOST:PORT[,HOST:PORT]")]
    pub brokers: Option<String>,

    /// Client id reported to the brokers (overrides KAFKA_CLIENT_ID)
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Timeout for create/delete operations in milliseconds (overrides KAFKA_ADMIN_TIMEOUT_MS)
    #[arg(
        long,
        global = true,
        value_name = "MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_ms: Option<u64>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Level,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create all predefined topics
    Create,
    /// List all topics
    List,
    /// Delete a specific topic
    Delete {
        /// Topic to delete
        topic_name: Option<String>,
    },
    #[command(external_subcommand)]
    Other(Vec<String>),
}

impl Cli {
    /// Applies command-line overrides on top of `base`.
    pub fn admin_config(&self, base: KafkaAdminConfig) -> KafkaAdminConfig {
        let mut config = base;
        if let Some(brokers) = &self.brokers {
            config.bootstrap_servers = brokers.clone();
        }
        if let Some(client_id) = &self.client_id {
            config.client_id = client_id.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.operation_timeout = Duration::from_millis(ms);
        }
        config
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            log_level: self.log_level,
            enable_json: self.json_logs,
            log_dir: self.log_dir.clone(),
            ..Default::default()
        }
    }
}

/// Runs the parsed command against the configured cluster.
pub async fn run(cli: Cli) -> ExitCode {
    let config = cli.admin_config(KafkaAdminConfig::from_env());
    let operation_timeout = config.operation_timeout;
    let service = TopicService::new(Arc::new(KafkaAdmin::new(config)), TOPICS, operation_timeout);

    let mut out = io::stdout();
    ExitCode::from(execute(cli.command, &service, &mut out).await)
}

/// Dispatches one command and returns the process exit status.
pub async fn execute<A, W>(command: Option<Command>, service: &TopicService<A>, out: &mut W) -> u8
where
    A: TopicAdminTrait,
    W: Write,
{
    let rendered = match command {
        Some(Command::Create) => match service.create_topics().await {
            Ok(report) => render_create_report(&report, out),
            Err(e) => return e.exit_code(),
        },
        Some(Command::List) => match service.list_topics().await {
            Ok(listing) => render_listing(&listing, out),
            Err(e) => return e.exit_code(),
        },
        Some(Command::Delete { topic_name }) => {
            let Some(topic_name) = topic_name.filter(|name| !name.trim().is_empty()) else {
                error!("Please provide a topic name to delete");
                return EXIT_USAGE;
            };
            match service.delete_topic(&topic_name).await {
                Ok(()) => Ok(()),
                Err(e) => return e.exit_code(),
            }
        }
        Some(Command::Other(_)) | None => out.write_all(USAGE.as_bytes()),
    };

    match rendered.and_then(|_| out.flush()) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!("Failed to write output: {}", e);
            EXIT_OUTPUT
        }
    }
}

pub fn render_create_report<W: Write>(report: &CreateReport, out: &mut W) -> io::Result<()> {
    let Some(metadata) = &report.metadata else {
        return Ok(());
    };

    writeln!(out, "\nCreated Topics:")?;
    for topic in metadata {
        writeln!(
            out,
            "- {} (Partitions: {})",
            topic.name,
            topic.partition_count()
        )?;
    }
    Ok(())
}

pub fn render_listing<W: Write>(listing: &TopicListing, out: &mut W) -> io::Result<()> {
    writeln!(out, "\nAll Topics:")?;
    for (index, name) in listing.names.iter().enumerate() {
        writeln!(out, "{}. {}", index + 1, name)?;
    }

    writeln!(out, "\nTopic Details:")?;
    for topic in &listing.metadata {
        writeln!(out, "\nTopic: {}", topic.name)?;
        writeln!(out, "  Partitions: {}", topic.partition_count())?;
        for partition in &topic.partitions {
            writeln!(
                out,
                "    Partition {}: Leader: {}",
                partition.id, partition.leader
            )?;
        }
    }
    Ok(())
}
