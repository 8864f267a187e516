use assert_cmd::Command;
use predicates::prelude::*;

fn kafka_admin() -> Command {
    let mut cmd = Command::cargo_bin("kafka-admin").unwrap();
    // Keep the caller's shell settings out of the way.
    cmd.env_remove("RUST_LOG")
        .env_remove("KAFKA_BOOTSTRAP_SERVERS")
        .env_remove("KAFKA_ADMIN_TIMEOUT_MS");
    cmd
}

#[test]
fn prints_usage_without_command() {
    kafka_admin()
        .assert()
        .success()
        .stdout(predicate::str::contains("Kafka Admin Tool"))
        .stdout(predicate::str::contains("kafka-admin create"));
}

#[test]
fn prints_usage_for_unknown_command() {
    kafka_admin()
        .arg("rebalance")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn delete_without_topic_name_exits_with_one() {
    kafka_admin()
        // Unroutable address: any broker call would fail with a different status.
        .args(["--brokers", "127.0.0.1:1", "delete"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Please provide a topic name to delete",
        ));
}

#[test]
fn unreachable_broker_exits_with_connection_status() {
    kafka_admin()
        .env("KAFKA_CONNECT_TIMEOUT_MS", "1000")
        .args(["--brokers", "127.0.0.1:1", "list"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error listing topics"));
}
