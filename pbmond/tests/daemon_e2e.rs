//! End-to-end tests over the real file adapters.
//!
//! The collector snapshot, instance configs and activation requests live in
//! a temporary state directory; messaging is stubbed.

use std::sync::Arc;
use std::time::Duration;

use pbmon_connectors::FileRemoteStatus;
use pbmon_domain::{ErrorKind, InstanceName, TelegramCredentials};
use pbmon_ports::{InboundCommand, StaticCredentials, StubCommandSource, StubMessenger};
use pbmon_store::InstanceConfigStore;
use pbmond::{CommandChannel, Config, Daemon, PollLoop};
use tempfile::TempDir;

fn credentials() -> Arc<StaticCredentials> {
    Arc::new(StaticCredentials::new(
        TelegramCredentials::new("123:abc", "42").unwrap(),
    ))
}

fn remote(config: &Config) -> Arc<FileRemoteStatus> {
    Arc::new(FileRemoteStatus::new(
        &config.remote_errors_file,
        config.command_dir(),
    ))
}

fn write_errors(config: &Config, json: &str) {
    std::fs::create_dir_all(config.remote_errors_file.parent().unwrap()).unwrap();
    std::fs::write(&config.remote_errors_file, json).unwrap();
}

fn write_instance(config: &Config, name: &str) {
    let dir = config.instances_dir().join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("instance.cfg"),
        r#"{"user": "alice", "_long_mode": "normal", "_short_mode": "normal", "leverage": 5}"#,
    )
    .unwrap();
}

fn alice() -> InstanceName {
    InstanceName::from_parts("alice", "BTC", "binance").unwrap()
}

#[tokio::test]
async fn test_alert_lifecycle_from_collector_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = Config::test(dir.path());
    let messenger = Arc::new(StubMessenger::new());
    let mut poll = PollLoop::new(
        remote(&config),
        messenger.clone(),
        credentials(),
        config.poll_interval,
    );

    let snapshot = r#"[
        {"name": "offline", "server": "vps1"},
        {"name": "system", "server": "vps2", "mem": ":red[95%]", "cpu": ":green[3%]", "swap": "0%", "disk": ":orange[81%]"},
        {"name": "alice_BTC_binance", "server": "vps3", "mem": "10%", "cpu": "2%", "error": ":blue[Exception]", "traceback": "Traceback"}
    ]"#;
    write_errors(&config, snapshot);

    let sent = poll.tick().await.unwrap().unwrap();
    assert_eq!(
        sent,
        "Server: *vps1* is offline\n\
         Server: vps2 Instance: system Mem: *95%* CPU: 3% Swap: 0% Disk: 81%\n\
         Server: vps3 Instance: alice_BTC_binance Mem: 10% CPU: 2% Error: *Exception* Traceback: Traceback\n"
    );

    // Unchanged snapshot: nothing new
    assert_eq!(poll.tick().await.unwrap(), None);

    // Everything cleared
    write_errors(&config, "[]");
    assert_eq!(poll.tick().await.unwrap(), None);
    assert!(poll.alert_state().is_empty());

    // Recurrence is announced again
    write_errors(&config, r#"[{"name": "offline", "server": "vps1"}]"#);
    assert_eq!(
        poll.tick().await.unwrap().as_deref(),
        Some("Server: *vps1* is offline\n")
    );
    assert_eq!(poll.alert_state().identities(ErrorKind::Offline), vec!["vps1"]);
    assert_eq!(messenger.sent().len(), 2);
}

#[tokio::test]
async fn test_missing_snapshot_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let config = Config::test(dir.path());
    let messenger = Arc::new(StubMessenger::new());
    let mut poll = PollLoop::new(
        remote(&config),
        messenger.clone(),
        credentials(),
        config.poll_interval,
    );

    assert_eq!(poll.tick().await.unwrap(), None);
    assert!(messenger.sent().is_empty());
}

#[tokio::test]
async fn test_panic_command_rewrites_config_and_requests_activation() {
    let dir = TempDir::new().unwrap();
    let config = Config::test(dir.path());
    write_instance(&config, "alice_BTC_binance");

    let source = Arc::new(StubCommandSource::new());
    let remote = remote(&config);
    let store = InstanceConfigStore::new(config.instances_dir());
    let channel = CommandChannel::new(source.clone(), remote.clone(), credentials(), store.clone());

    source.push(vec![
        InboundCommand::parse("42", 10, "/panic alice BTC binance").unwrap(),
        InboundCommand::parse("42", 11, "/panic bob ETH bybit").unwrap(),
    ]);
    assert_eq!(channel.poll_once().await.unwrap(), 2);

    let replies: Vec<String> = source.replies().into_iter().map(|(_, text)| text).collect();
    assert_eq!(
        replies,
        vec!["alice_BTC_binance set to panic", "Instance bob_ETH_bybit not found"]
    );

    let cfg = store.load(&alice()).await.unwrap();
    assert_eq!(cfg["_long_mode"], "panic");
    assert_eq!(cfg["_short_mode"], "panic");
    assert_eq!(cfg["leverage"], 5);

    let written = std::fs::read_to_string(store.config_path(&alice())).unwrap();
    assert!(written.starts_with("{\n    \"user\": \"alice\",\n    \"_long_mode\": \"panic\""));

    assert!(remote.activation_path(&alice()).exists());
    assert!(!config.instances_dir().join("bob_ETH_bybit").exists());
}

#[tokio::test]
async fn test_daemon_runs_both_tasks() {
    let dir = TempDir::new().unwrap();
    let config = Config::test(dir.path());
    write_instance(&config, "alice_BTC_binance");
    write_errors(&config, r#"[{"name": "offline", "server": "vps1"}]"#);

    let remote = remote(&config);
    let messenger = Arc::new(StubMessenger::new());
    let source = Arc::new(StubCommandSource::new());
    source.push(vec![
        InboundCommand::parse("42", 1, "/graceful_stop alice BTC binance").unwrap(),
    ]);

    let poll = PollLoop::new(
        remote.clone(),
        messenger.clone(),
        credentials(),
        Duration::from_millis(5),
    );
    let commands = CommandChannel::new(
        source.clone(),
        remote.clone(),
        credentials(),
        InstanceConfigStore::new(config.instances_dir()),
    );
    let daemon = Daemon::new(poll, commands, credentials());

    // Never returns on its own
    let result = tokio::time::timeout(Duration::from_millis(200), daemon.run()).await;
    assert!(result.is_err());

    // Several cycles ran, the alert went out once
    assert_eq!(messenger.sent(), vec!["Server: *vps1* is offline\n"]);
    assert_eq!(source.replies().len(), 1);
    assert_eq!(source.replies()[0].1, "alice_BTC_binance set to graceful_stop");
}

#[tokio::test]
async fn test_unconfigured_daemon_stays_quiet() {
    let dir = TempDir::new().unwrap();
    let config = Config::test(dir.path());
    write_errors(&config, r#"[{"name": "offline", "server": "vps1"}]"#);

    let remote = remote(&config);
    let messenger = Arc::new(StubMessenger::new());
    let source = Arc::new(StubCommandSource::new());
    source.push(vec![InboundCommand::parse("42", 1, "/help").unwrap()]);
    let none = Arc::new(StaticCredentials::none());

    let poll = PollLoop::new(remote.clone(), messenger.clone(), none.clone(), Duration::from_millis(5));
    let commands = CommandChannel::new(
        source.clone(),
        remote,
        none.clone(),
        InstanceConfigStore::new(config.instances_dir()),
    );

    let result = tokio::time::timeout(
        Duration::from_millis(100),
        Daemon::new(poll, commands, none).run(),
    )
    .await;
    assert!(result.is_err());

    assert!(messenger.sent().is_empty());
    assert!(source.replies().is_empty());
}
