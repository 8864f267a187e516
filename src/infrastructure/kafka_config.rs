use rdkafka::config::ClientConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Range librdkafka accepts for `socket.timeout.ms`.
const SOCKET_TIMEOUT_MS_MIN: u128 = 10;
const SOCKET_TIMEOUT_MS_MAX: u128 = 300_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaAdminConfig {
    pub bootstrap_servers: String,
    pub client_id: String,
    /// Forwarded to every create/delete call; the broker waits this long for the change to apply.
    pub operation_timeout: Duration,
    /// Bound on the metadata round trip used to verify the cluster is reachable.
    pub connect_timeout: Duration,
    pub security_protocol: String,
    pub sasl_mechanism: Option<String>,
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
    pub ssl_ca_location: Option<String>,
}

impl Default for KafkaAdminConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            client_id: "kafka-admin".to_string(),
            operation_timeout: Duration::from_millis(30000), // 30 seconds
            connect_timeout: Duration::from_millis(10000),
            security_protocol: "PLAINTEXT".to_string(),
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
            ssl_ca_location: None,
        }
    }
}

impl KafkaAdminConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, falling back to defaults per field.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bootstrap_servers: non_empty("KAFKA_BOOTSTRAP_SERVERS")
                .unwrap_or(defaults.bootstrap_servers),
            client_id: non_empty("KAFKA_CLIENT_ID").unwrap_or(defaults.client_id),
            operation_timeout: parse_millis(
                "KAFKA_ADMIN_TIMEOUT_MS",
                non_empty("KAFKA_ADMIN_TIMEOUT_MS"),
                defaults.operation_timeout,
            ),
            connect_timeout: parse_millis(
                "KAFKA_CONNECT_TIMEOUT_MS",
                non_empty("KAFKA_CONNECT_TIMEOUT_MS"),
                defaults.connect_timeout,
            ),
            security_protocol: non_empty("KAFKA_SECURITY_PROTOCOL")
                .unwrap_or(defaults.security_protocol),
            sasl_mechanism: non_empty("KAFKA_SASL_MECHANISM"),
            sasl_username: non_empty("KAFKA_SASL_USERNAME"),
            sasl_password: non_empty("KAFKA_SASL_PASSWORD"),
            ssl_ca_location: non_empty("KAFKA_SSL_CA_LOCATION"),
        }
    }

    pub fn to_client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("client.id", &self.client_id)
            .set("security.protocol", &self.security_protocol)
            .set("socket.timeout.ms", self.socket_timeout_ms().to_string());

        if let Some(mechanism) = &self.sasl_mechanism {
            client_config.set("sasl.mechanism", mechanism);
        }
        if let Some(username) = &self.sasl_username {
            client_config.set("sasl.username", username);
        }
        if let Some(password) = &self.sasl_password {
            client_config.set("sasl.password", password);
        }
        if let Some(ca_location) = &self.ssl_ca_location {
            client_config.set("ssl.ca.location", ca_location);
        }

        client_config
    }

    /// Socket timeout follows the operation timeout, kept inside the range librdkafka accepts.
    fn socket_timeout_ms(&self) -> u128 {
        self.operation_timeout
            .as_millis()
            .clamp(SOCKET_TIMEOUT_MS_MIN, SOCKET_TIMEOUT_MS_MAX)
    }
}

fn parse_millis(key: &str, raw: Option<String>, default: Duration) -> Duration {
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Duration::from_millis(ms),
            _ => {
                tracing::warn!(
                    "Ignoring invalid {}={:?}, using {}ms",
                    key,
                    value,
                    default.as_millis()
                );
                default
            }
        },
    }
}
