mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;

use common::{
    BASE_CONFIG, FailingMailer, RecordingMailer, closed_port, mail_section, spawn_media_host,
};
use rf_alert::config::AppConfig;
use rf_alert::domain::AlertCode;
use rf_alert::notification::{AlertDispatcher, ChannelStatus};

fn media_hosts_section(hosts: &[&str], port: u16) -> String {
    let hosts: Vec<String> = hosts.iter().map(|h| format!("{h:?}")).collect();
    format!(
        r#"
[media_hosts]
hosts = [{}]
port = {port}
probe_timeout_secs = 1
request_timeout_secs = 5

[notification]
title = "Alert"
text = "{{description}} triggered"
"#,
        hosts.join(", ")
    )
}

fn config(sections: &[String]) -> Arc<AppConfig> {
    let mut text = BASE_CONFIG.to_string();
    for section in sections {
        text.push_str(section);
    }
    Arc::new(AppConfig::from_toml_str(&text).unwrap())
}

#[tokio::test]
async fn reachable_host_gets_one_notification_and_one_addon() {
    let (addr, log) = spawn_media_host().await;
    let config = config(&[media_hosts_section(&["127.0.0.1"], addr.port())]);
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = AlertDispatcher::with_mail_transport(config, mailer.clone());

    let report = dispatcher.dispatch(Local::now(), AlertCode(42)).await;

    assert!(report.is_success());
    assert_eq!(
        log.methods(),
        vec!["GUI.ShowNotification", "Addons.ExecuteAddon"]
    );
    let calls = log.calls();
    assert_eq!(calls[0]["params"]["message"], "garage triggered");
    assert_eq!(calls[0]["params"]["title"], "Alert");
    assert_eq!(calls[1]["params"]["addonid"], "script.securitycam");
    assert!(mailer.sent.lock().is_empty());
}

#[tokio::test]
async fn every_host_is_tried_in_order() {
    let (addr, log) = spawn_media_host().await;
    let config = config(&[media_hosts_section(&["localhost", "127.0.0.1"], addr.port())]);
    let dispatcher = AlertDispatcher::new(config);

    let report = dispatcher.dispatch(Local::now(), AlertCode(17)).await;

    assert_eq!(report.by_channel("media_host").count(), 2);
    assert_eq!(log.calls().len(), 4);
}

#[tokio::test]
async fn failures_are_isolated_per_channel() {
    let port = closed_port().await;
    let config = config(&[
        media_hosts_section(&["127.0.0.1"], port),
        mail_section(None, 0),
        "[local]\ncommand = \"false\"\n".to_string(),
    ]);
    let mailer = Arc::new(FailingMailer::default());
    let dispatcher = AlertDispatcher::with_mail_transport(config, mailer.clone());

    let report = dispatcher.dispatch(Local::now(), AlertCode(42)).await;

    let channels: Vec<_> = report.outcomes.iter().map(|o| o.channel).collect();
    assert_eq!(channels, ["local", "media_host", "email"]);
    assert!(report.outcomes[0].status.is_failed());
    assert!(matches!(report.outcomes[1].status, ChannelStatus::Skipped(_)));
    assert!(report.outcomes[2].status.is_failed());
    assert_eq!(*mailer.attempts.lock(), 1);
    assert!(!report.is_success());
}

#[tokio::test]
async fn mail_is_sent_without_attachment_after_bounded_wait() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&[mail_section(Some(dir.path()), 1)]);
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = AlertDispatcher::with_mail_transport(config, mailer.clone());

    let started = Instant::now();
    let report = dispatcher.dispatch(Local::now(), AlertCode(42)).await;

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(report.is_success());
    let sent = mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].attachments.is_empty());
    assert_eq!(sent[0].subject, "Alert: garage");
    assert!(sent[0].body.ends_with(": garage was triggered"));
}

#[tokio::test]
async fn late_snapshot_is_attached() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&[mail_section(Some(dir.path()), 10)]);
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = AlertDispatcher::with_mail_transport(config, mailer.clone());

    let snapshot = dir.path().join("snapshot.jpg");
    let writer = snapshot.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::fs::write(writer, b"jpeg").await.unwrap();
    });

    let started = Instant::now();
    dispatcher.dispatch(Local::now(), AlertCode(42)).await;

    assert!(started.elapsed() <= Duration::from_secs(3) + Duration::from_millis(500));
    let sent = mailer.sent.lock();
    assert_eq!(sent[0].attachments.len(), 1);
    assert_eq!(sent[0].attachments[0].filename, "snapshot.jpg");
}

#[tokio::test]
async fn unknown_code_uses_literal_templates() {
    let (addr, log) = spawn_media_host().await;
    let config = config(&[
        media_hosts_section(&["127.0.0.1"], addr.port()),
        mail_section(None, 0),
    ]);
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = AlertDispatcher::with_mail_transport(config, mailer.clone());

    dispatcher.dispatch(Local::now(), AlertCode(99)).await;

    assert_eq!(log.calls()[0]["params"]["message"], "{description} triggered");
    let sent = mailer.sent.lock();
    assert_eq!(sent[0].subject, "Alert: {description}");
    assert_eq!(sent[0].body, "{description} was triggered");
}
