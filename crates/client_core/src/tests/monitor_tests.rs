use super::*;
use shared::domain::ConnectionState;

fn monitor() -> (ConnectionMonitor, broadcast::Receiver<ClientEvent>) {
    let (events, rx) = broadcast::channel(16);
    (ConnectionMonitor::new(events), rx)
}

#[tokio::test]
async fn starts_unknown_until_the_first_signal() {
    let (monitor, _rx) = monitor();
    let status = monitor.status().await;
    assert_eq!(status.state, ConnectionState::Unknown);
    assert_eq!(status.label, "waiting for first contact");
}

#[tokio::test]
async fn first_success_marks_connected() {
    let (monitor, _rx) = monitor();
    monitor.record_success().await;
    let status = monitor.status().await;
    assert_eq!(status.state, ConnectionState::Connected);
    assert_eq!(status.label, "connected");
}

#[tokio::test]
async fn failure_marks_disconnected_and_success_recovers() {
    let (monitor, _rx) = monitor();
    monitor.record_failure().await;
    assert_eq!(monitor.status().await.state, ConnectionState::Disconnected);

    monitor.record_success().await;
    assert_eq!(monitor.status().await.state, ConnectionState::Connected);

    monitor.record_failure().await;
    assert_eq!(monitor.status().await.state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn channel_events_drive_the_same_state() {
    let (monitor, _rx) = monitor();
    monitor.channel_connected().await;
    assert_eq!(monitor.status().await.state, ConnectionState::Connected);
    monitor.channel_disconnected().await;
    assert_eq!(monitor.status().await.state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn emits_only_on_actual_transitions() {
    let (monitor, mut rx) = monitor();
    monitor.record_success().await;
    monitor.record_success().await;
    monitor.record_success().await;

    match rx.try_recv().expect("one transition event") {
        ClientEvent::ConnectionChanged(status) => {
            assert_eq!(status.state, ConnectionState::Connected);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(rx.try_recv().is_err(), "repeat signals must not re-emit");
}
