use super::*;
use match_watcher::{config::SchedulerConfig, MatchPhase};

#[tokio::test]
async fn test_firing_refreshes_every_match() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::new();
    fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "10", "12", "1st Quarter"));
    fetcher.serve(OTHER_URL, score_page("Real", "Barca", "0", "0", ""));
    let app = create_test_app(AppConfig::default(), fetcher).await?;

    let efes = app.tracker.register(MATCH_URL).await?;
    let real = app.tracker.register(OTHER_URL).await?;

    app.fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "25", "27", "2nd Quarter"));
    app.fetcher.serve(OTHER_URL, score_page("Real", "Barca", "3", "2", "1st Quarter"));
    app.clock.advance(chrono::Duration::minutes(1));

    let report = app.scheduler_run().await.expect("firing should run");
    assert_eq!(report.checked, 2);
    assert_eq!(report.refreshed, 2);
    assert_eq!(report.failed, 0);

    let efes_now = app.tracker.status(&efes.match_id).await;
    assert_eq!(efes_now.status, "2nd Quarter");
    assert_eq!(efes_now.data.unwrap().home_score, "25");
    assert_eq!(efes_now.checked_at, app.clock.now());

    let real_now = app.tracker.status(&real.match_id).await;
    assert_eq!(real_now.status, "1st Quarter");

    assert_eq!(app.fetcher.calls(MATCH_URL), 2);
    assert_eq!(app.fetcher.calls(OTHER_URL), 2);

    Ok(())
}

#[tokio::test]
async fn test_failing_match_does_not_block_others() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::new();
    fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "40", "41", "3rd Quarter"));
    fetcher.serve(OTHER_URL, score_page("Real", "Barca", "70", "65", "4th Quarter"));
    let app = create_test_app(AppConfig::default(), fetcher).await?;

    let efes = app.tracker.register(MATCH_URL).await?;
    let real = app.tracker.register(OTHER_URL).await?;

    app.fetcher.fail(MATCH_URL, FetchError::Content("target closed".to_string()));
    app.fetcher.serve(OTHER_URL, score_page("Real", "Barca", "75", "70", "4th Quarter"));

    let report = app.scheduler_run().await.expect("firing should run");
    assert_eq!(report.refreshed, 1);
    assert_eq!(report.failed, 1);

    assert_eq!(app.tracker.status(&efes.match_id).await, efes.snapshot);
    assert_eq!(
        app.tracker.status(&real.match_id).await.data.unwrap().home_score,
        "75"
    );

    let stats = app.state.scheduler.lock().await.get_stats().await;
    assert_eq!(stats.firings, 1);
    assert_eq!(stats.failed_refreshes, 1);
    assert_eq!(stats.matches_refreshed, 1);

    Ok(())
}

#[tokio::test]
async fn test_concluded_matches_are_not_refetched() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::new();
    fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "90", "84", "Finished"));
    let app = create_test_app(AppConfig::default(), fetcher).await?;

    let registration = app.tracker.register(MATCH_URL).await?;
    assert_eq!(registration.snapshot.phase, MatchPhase::Concluded);

    let report = app.scheduler_run().await.expect("firing should run");
    assert_eq!(report.skipped_concluded, 1);
    assert_eq!(report.checked, 0);
    assert_eq!(app.fetcher.calls(MATCH_URL), 1);

    Ok(())
}

#[tokio::test]
async fn test_expired_matches_are_pruned() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::new();
    fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "1", "0", "1st Quarter"));
    fetcher.serve(OTHER_URL, score_page("Real", "Barca", "1", "0", "1st Quarter"));
    let mut config = AppConfig::default();
    config.registry.ttl_hours = Some(3);
    let app = create_test_app(config, fetcher).await?;

    let old = app.tracker.register(MATCH_URL).await?;
    app.clock.advance(chrono::Duration::hours(4));
    let recent = app.tracker.register(OTHER_URL).await?;

    let report = app.scheduler_run().await.expect("firing should run");
    assert_eq!(report.pruned, 1);
    assert_eq!(report.checked, 1);

    assert!(!app.tracker.registry().contains(&old.match_id).await);
    assert!(app.tracker.registry().contains(&recent.match_id).await);

    Ok(())
}

#[tokio::test]
async fn test_disabled_scheduler_starts_without_job() -> anyhow::Result<()> {
    let mut config = AppConfig::default();
    config.scheduler = SchedulerConfig {
        enabled: false,
        ..SchedulerConfig::default()
    };
    let app = create_test_app(config, ScriptedFetcher::new()).await?;

    let mut scheduler = app.state.scheduler.lock().await;
    scheduler.start().await?;
    scheduler.shutdown().await?;

    Ok(())
}

#[tokio::test]
async fn test_firing_with_no_matches() -> anyhow::Result<()> {
    let app = create_test_app(AppConfig::default(), ScriptedFetcher::new()).await?;

    let report = app.scheduler_run().await.expect("firing should run");
    assert_eq!(report.checked, 0);
    assert_eq!(app.fetcher.total_calls(), 0);

    Ok(())
}
