// Whole-cycle scenarios: scripted pages in, notifications and state
// file out.

use super::*;
use tempfile::tempdir;

fn page(value: &str) -> String {
    format!("<html><body><p id=\"dateModified\">  {value}</p></body></html>")
}

const LABEL: &str = "dateModified\">";

#[tokio::test]
async fn unchanged_page_stays_silent() {
    let dir = tempdir().unwrap();
    seed_state(&dir, "PreviousValue0=Jan 23, 2019\r\n").await;

    let settings = settings_for(&[("https://example.com/a", LABEL, 2, 12)]);
    let fetcher = ScriptedFetcher::new(&[("https://example.com/a", &page("Jan 23, 2019"))]);
    let notifier = Arc::new(RecordingNotifier::new());

    let outcome = runner_with(settings, fetcher, Arc::clone(&notifier), &dir)
        .run(STATE_FILE)
        .await
        .unwrap();

    assert!(!outcome.changed);
    assert!(!outcome.error_notified);
    assert!(outcome.persisted);
    assert!(notifier.messages().is_empty());
    assert_eq!(read_state(&dir).await, "PreviousValue0=Jan 23, 2019\r\n");
}

#[tokio::test]
async fn changed_page_notifies_once_and_updates_state() {
    let dir = tempdir().unwrap();
    seed_state(&dir, "PreviousValue0=Jan 2, 2019\r\n").await;

    let settings = settings_for(&[("https://example.com/a", LABEL, 2, 12)]);
    let fetcher = ScriptedFetcher::new(&[("https://example.com/a", &page("Jan 13, 2019"))]);
    let notifier = Arc::new(RecordingNotifier::new());

    let outcome = runner_with(settings, fetcher, Arc::clone(&notifier), &dir)
        .run(STATE_FILE)
        .await
        .unwrap();

    assert!(outcome.changed);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    let (topic, message) = &messages[0];
    assert_eq!(topic, "page-changes");
    assert!(message.contains("https://example.com/a"));
    assert!(message.contains("new value is Jan 13, 2019"));
    assert_eq!(read_state(&dir).await, "PreviousValue0=Jan 13, 2019\r\n");
}

#[tokio::test]
async fn first_run_with_no_state_counts_as_changed() {
    let dir = tempdir().unwrap();

    let settings = settings_for(&[("https://example.com/a", LABEL, 2, 12)]);
    let fetcher = ScriptedFetcher::new(&[("https://example.com/a", &page("Jan 13, 2019"))]);
    let notifier = Arc::new(RecordingNotifier::new());

    let outcome = runner_with(settings, fetcher, Arc::clone(&notifier), &dir)
        .run(STATE_FILE)
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(read_state(&dir).await, "PreviousValue0=Jan 13, 2019\r\n");
}

#[tokio::test]
async fn second_cycle_after_change_is_silent() {
    let dir = tempdir().unwrap();

    let settings = settings_for(&[("https://example.com/a", LABEL, 2, 12)]);
    let notifier = Arc::new(RecordingNotifier::new());

    let first = runner_with(
        Arc::clone(&settings),
        ScriptedFetcher::new(&[("https://example.com/a", &page("Jan 13, 2019"))]),
        Arc::clone(&notifier),
        &dir,
    );
    assert!(first.run(STATE_FILE).await.unwrap().changed);

    let second = runner_with(
        settings,
        ScriptedFetcher::new(&[("https://example.com/a", &page("Jan 13, 2019"))]),
        Arc::clone(&notifier),
        &dir,
    );
    assert!(!second.run(STATE_FILE).await.unwrap().changed);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn missing_marker_sends_error_and_other_targets_proceed() {
    let dir = tempdir().unwrap();
    seed_state(&dir, "PreviousValue0=whatever\r\nPreviousValue1=Jan 2, 2019\r\n").await;

    let settings = settings_for(&[
        ("https://example.com/broken", "vanishedMarker\">", 2, 12),
        ("https://example.com/b", LABEL, 2, 12),
    ]);
    let fetcher = ScriptedFetcher::new(&[
        ("https://example.com/broken", "<html>redesigned page</html>"),
        ("https://example.com/b", &page("Jan 13, 2019")),
    ]);
    let notifier = Arc::new(RecordingNotifier::new());

    let outcome = runner_with(settings, fetcher, Arc::clone(&notifier), &dir)
        .run(STATE_FILE)
        .await
        .unwrap();

    assert!(outcome.changed);
    assert!(outcome.error_notified);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    // Error notification names the missing label and its URL.
    assert!(messages[0].1.contains("vanishedMarker"));
    assert!(messages[0].1.contains("https://example.com/broken"));
    // Change notification covers only the healthy target.
    assert!(messages[1].1.contains("Jan 13, 2019"));
    assert!(!messages[1].1.contains("broken"));

    // The broken target keeps its old saved value.
    assert_eq!(
        read_state(&dir).await,
        "PreviousValue0=whatever\r\nPreviousValue1=Jan 13, 2019\r\n"
    );
}

#[tokio::test]
async fn unreachable_url_sends_error_notification() {
    let dir = tempdir().unwrap();

    let settings = settings_for(&[("https://example.com/down", LABEL, 2, 12)]);
    let fetcher = ScriptedFetcher::new(&[]);
    let notifier = Arc::new(RecordingNotifier::new());

    let outcome = runner_with(settings, fetcher, Arc::clone(&notifier), &dir)
        .run(STATE_FILE)
        .await
        .unwrap();

    assert!(!outcome.changed);
    assert!(outcome.error_notified);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("problem retrieving the url"));
    assert!(messages[0].1.contains("https://example.com/down"));
    // Nothing was staged, so nothing was written.
    assert_eq!(read_state(&dir).await, "");
}

#[tokio::test]
async fn failed_delivery_still_persists_new_state() {
    let dir = tempdir().unwrap();

    let settings = settings_for(&[("https://example.com/a", LABEL, 2, 12)]);
    let fetcher = ScriptedFetcher::new(&[("https://example.com/a", &page("Jan 13, 2019"))]);
    let notifier = Arc::new(RecordingNotifier::failing());

    let outcome = runner_with(settings, fetcher, Arc::clone(&notifier), &dir)
        .run(STATE_FILE)
        .await
        .unwrap();

    // The run itself succeeds; the missed delivery is logged only.
    assert!(outcome.changed);
    assert!(outcome.persisted);
    assert_eq!(read_state(&dir).await, "PreviousValue0=Jan 13, 2019\r\n");
}

#[tokio::test]
async fn two_changed_targets_share_one_notification() {
    let dir = tempdir().unwrap();

    let settings = settings_for(&[
        ("https://example.com/a", LABEL, 2, 12),
        ("https://example.com/b", LABEL, 2, 12),
    ]);
    let fetcher = ScriptedFetcher::new(&[
        ("https://example.com/a", &page("Jan 13, 2019")),
        ("https://example.com/b", &page("Feb 14, 2020")),
    ]);
    let notifier = Arc::new(RecordingNotifier::new());

    let outcome = runner_with(settings, fetcher, Arc::clone(&notifier), &dir)
        .run(STATE_FILE)
        .await
        .unwrap();

    assert!(outcome.changed);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("Jan 13, 2019"));
    assert!(messages[0].1.contains("Feb 14, 2020"));
}
