//! End-to-end playback scenarios on the simulated element
//!
//! These tests drive the controller the way the session loop does and check
//! what reaches the media element and the progress sink.

use anyhow::{Context, Result};
use onflix_player::api::ContentIdentity;
use onflix_player::player::{FailureKind, InputEvent, Key, LoadOptions, PlayerCommand, PlayerEvent};
use onflix_player::utils::StreamUnavailable;
use onflix_player::{PlaybackPhase, Quality};
use onflix_player_integration_tests::{ScriptedResolver, TestFixture};
use std::time::Duration;

fn autoplay() -> LoadOptions {
    LoadOptions {
        auto_play: Some(true),
        ..LoadOptions::default()
    }
}

#[tokio::test]
async fn test_start_time_applied_before_ready() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    let options = LoadOptions {
        start_time: 42.0,
        ..LoadOptions::default()
    };
    fx.controller.load(ContentIdentity::new("m1"), options)?;
    assert_eq!(fx.controller.state().phase, PlaybackPhase::Loading);

    fx.controller.settle().await;

    let state = fx.controller.state();
    assert_eq!(state.phase, PlaybackPhase::Ready);
    assert_eq!(state.duration, 100.0);
    assert_eq!(state.current_time, 42.0);
    assert!(!state.playing);
    assert_eq!(fx.media.current_time(), 42.0);
    assert!(fx.events().contains(&PlayerEvent::Ready { duration: 100.0 }));

    Ok(())
}

#[tokio::test]
async fn test_seek_is_exact_and_clamped() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;

    fx.controller.seek(42.5)?;
    assert_eq!(fx.controller.state().current_time, 42.5);
    assert_eq!(fx.media.current_time(), 42.5);

    fx.controller.seek(500.0)?;
    assert_eq!(fx.controller.state().current_time, 100.0);

    fx.controller.seek(-5.0)?;
    assert_eq!(fx.controller.state().current_time, 0.0);
    assert_eq!(fx.media.current_time(), 0.0);

    Ok(())
}

#[tokio::test]
async fn test_arrow_keys_step_ten_seconds() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;

    for _ in 0..3 {
        fx.controller.handle_input(InputEvent::KeyPressed(Key::ArrowRight))?;
    }
    assert_eq!(fx.controller.state().current_time, 30.0);

    fx.controller.handle_input(InputEvent::KeyPressed(Key::ArrowLeft))?;
    assert_eq!(fx.controller.state().current_time, 20.0);

    Ok(())
}

#[tokio::test]
async fn test_arrow_keys_stop_at_duration() -> Result<()> {
    let mut fx = TestFixture::new(25.0);
    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;

    for _ in 0..3 {
        fx.controller.handle_input(InputEvent::KeyPressed(Key::ArrowRight))?;
    }
    assert_eq!(fx.controller.state().current_time, 25.0);

    Ok(())
}

#[tokio::test]
async fn test_volume_stays_in_range() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;

    for _ in 0..5 {
        fx.controller.handle_input(InputEvent::KeyPressed(Key::ArrowUp))?;
        assert!(fx.controller.state().volume <= 1.0);
    }
    for _ in 0..15 {
        fx.controller.handle_input(InputEvent::KeyPressed(Key::ArrowDown))?;
        let volume = fx.controller.state().volume;
        assert!((0.0..=1.0).contains(&volume));
    }
    assert_eq!(fx.controller.state().volume, 0.0);

    fx.controller.execute(PlayerCommand::SetVolume(7.0))?;
    assert_eq!(fx.controller.state().volume, 1.0);
    assert_eq!(fx.media.volume(), 1.0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_quality_switch_while_playing_resumes_in_place() -> Result<()> {
    let mut fx = TestFixture::new(300.0);
    fx.controller.load(ContentIdentity::new("m1"), autoplay())?;
    fx.controller.settle().await;
    assert!(fx.controller.state().playing);

    fx.play_for(30).await;
    assert_eq!(fx.controller.state().current_time, 30.0);

    let hd = Quality::from_label("720p");
    fx.controller.set_quality(hd.clone())?;
    fx.controller.settle().await;

    let state = fx.controller.state();
    assert!(state.playing);
    assert_eq!(state.phase, PlaybackPhase::Playing);
    assert!((state.current_time - 30.0).abs() < 1e-9);
    assert_eq!(state.quality, hd);
    assert!((fx.media.current_time() - 30.0).abs() < 1e-9);
    assert_eq!(fx.media.source(), Some(ScriptedResolver::url_for("m1", &hd)));
    assert!(fx.events().contains(&PlayerEvent::QualityChanged { quality: hd }));

    Ok(())
}

#[tokio::test]
async fn test_quality_switch_while_paused_stays_paused() -> Result<()> {
    let mut fx = TestFixture::new(300.0);
    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;
    fx.controller.seek(12.0)?;

    fx.controller.set_quality(Quality::from_label("1080p"))?;
    fx.controller.settle().await;

    let state = fx.controller.state();
    assert!(!state.playing);
    assert_eq!(state.phase, PlaybackPhase::Ready);
    assert_eq!(state.current_time, 12.0);
    assert_eq!(fx.media.current_time(), 12.0);
    assert!(fx.media.is_paused());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pause_during_quality_switch_is_kept() -> Result<()> {
    let mut fx = TestFixture::new(300.0);
    fx.controller.load(ContentIdentity::new("m1"), autoplay())?;
    fx.controller.settle().await;
    fx.play_for(10).await;

    let hd = Quality::from_label("720p");
    fx.resolver.delay_quality("m1", hd.clone(), Duration::from_millis(500));
    fx.controller.set_quality(hd.clone())?;
    fx.controller.pause()?;
    fx.controller.settle().await;

    let state = fx.controller.state();
    assert!(!state.playing);
    assert_eq!(state.phase, PlaybackPhase::Ready);
    assert_eq!(state.current_time, 10.0);
    assert!(fx.media.is_paused());
    assert_eq!(fx.media.source(), Some(ScriptedResolver::url_for("m1", &hd)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_play_during_quality_switch_starts_new_stream() -> Result<()> {
    let mut fx = TestFixture::new(300.0);
    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;
    fx.controller.seek(12.0)?;

    let full_hd = Quality::from_label("1080p");
    fx.resolver.delay_quality("m1", full_hd.clone(), Duration::from_millis(500));
    fx.controller.set_quality(full_hd)?;
    fx.controller.handle_input(InputEvent::KeyPressed(Key::Space))?;
    assert!(fx.media.is_paused(), "old source is not started");
    fx.controller.settle().await;

    let state = fx.controller.state();
    assert!(state.playing);
    assert_eq!(state.phase, PlaybackPhase::Playing);
    assert_eq!(state.current_time, 12.0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_quality_switch_keeps_previous_stream() -> Result<()> {
    let mut fx = TestFixture::new(300.0);
    let full_hd = Quality::from_label("1080p");
    fx.resolver
        .fail("m1", full_hd.clone(), StreamUnavailable::Network("timeout".to_string()));

    fx.controller.load(ContentIdentity::new("m1"), autoplay())?;
    fx.controller.settle().await;
    fx.play_for(5).await;

    fx.controller.set_quality(full_hd)?;
    fx.controller.settle().await;

    let state = fx.controller.state();
    let failure = state.error.as_ref().context("switch failure recorded")?;
    assert_eq!(failure.kind, FailureKind::QualitySwitch);
    assert!(!failure.retryable);
    assert_eq!(state.quality, Quality::Auto);
    assert!(state.playing, "playback resumes on the old stream");
    assert_eq!(fx.media.bound_sources(), vec![ScriptedResolver::url_for("m1", &Quality::Auto)]);
    assert_eq!(
        fx.controller.descriptor().map(|d| d.stream_url.clone()),
        Some(ScriptedResolver::url_for("m1", &Quality::Auto))
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stale_descriptor_is_discarded() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    fx.resolver.delay("b", Duration::from_millis(500));
    fx.resolver.delay("c", Duration::from_millis(10));

    fx.controller.load(ContentIdentity::new("b"), LoadOptions::default())?;
    fx.controller.load(ContentIdentity::new("c"), LoadOptions::default())?;
    fx.controller.settle().await;

    // Let the slow answer for "b" arrive.
    tokio::time::sleep(Duration::from_secs(1)).await;
    fx.controller.process_pending();

    let c_url = ScriptedResolver::url_for("c", &Quality::Auto);
    assert_eq!(fx.resolver.calls().len(), 2);
    assert_eq!(fx.media.bound_sources(), vec![c_url.clone()]);
    assert_eq!(fx.media.source(), Some(c_url));
    assert_eq!(fx.controller.identity(), Some(&ContentIdentity::new("c")));
    assert_eq!(fx.controller.state().phase, PlaybackPhase::Ready);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pending_switch_dropped_on_identity_change() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    let hd = Quality::from_label("720p");
    fx.resolver.delay_quality("b", hd.clone(), Duration::from_millis(500));

    fx.controller.load(ContentIdentity::new("b"), LoadOptions::default())?;
    fx.controller.settle().await;
    fx.controller.set_quality(hd)?;
    fx.controller.load(ContentIdentity::new("c"), LoadOptions::default())?;
    fx.controller.settle().await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    fx.controller.process_pending();

    let c_url = ScriptedResolver::url_for("c", &Quality::Auto);
    assert_eq!(
        fx.media.bound_sources(),
        vec![ScriptedResolver::url_for("b", &Quality::Auto), c_url.clone()]
    );
    assert_eq!(fx.media.source(), Some(c_url));
    assert_eq!(fx.controller.state().quality, Quality::Auto);
    assert_eq!(fx.controller.state().phase, PlaybackPhase::Ready);
    assert!(!fx
        .events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::QualityChanged { .. })));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_later_quality_request_wins() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    let hd = Quality::from_label("720p");
    let full_hd = Quality::from_label("1080p");
    fx.resolver.delay_quality("m1", hd.clone(), Duration::from_millis(500));

    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;
    fx.controller.set_quality(hd)?;
    fx.controller.set_quality(full_hd.clone())?;
    fx.controller.settle().await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    fx.controller.process_pending();

    assert_eq!(fx.resolver.calls().len(), 3);
    assert_eq!(
        fx.media.bound_sources(),
        vec![
            ScriptedResolver::url_for("m1", &Quality::Auto),
            ScriptedResolver::url_for("m1", &full_hd)
        ]
    );
    assert_eq!(fx.controller.state().quality, full_hd);
    let switches: Vec<PlayerEvent> = fx
        .events()
        .into_iter()
        .filter(|e| matches!(e, PlayerEvent::QualityChanged { .. }))
        .collect();
    assert_eq!(switches, vec![PlayerEvent::QualityChanged { quality: full_hd }]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_identity_change_resets_session() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    fx.controller.load(ContentIdentity::new("m1"), autoplay())?;
    fx.controller.settle().await;
    fx.play_for(10).await;
    fx.controller.set_volume(0.5)?;
    fx.controller.toggle_fullscreen();

    fx.controller.load(ContentIdentity::new("m2"), LoadOptions::default())?;
    assert_eq!(fx.controller.state().current_time, 0.0);
    assert!(!fx.controller.state().playing);
    assert!(fx.controller.descriptor().is_none());
    fx.controller.settle().await;

    let state = fx.controller.state();
    assert_eq!(state.phase, PlaybackPhase::Ready);
    assert_eq!(state.current_time, 0.0);
    assert_eq!(state.volume, 0.5);
    assert!(state.fullscreen);
    assert_eq!(fx.media.source(), Some(ScriptedResolver::url_for("m2", &Quality::Auto)));
    assert!(fx.events().contains(&PlayerEvent::Reset {
        identity: ContentIdentity::new("m2")
    }));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_throttled_and_completion_reported() -> Result<()> {
    let mut fx = TestFixture::new(35.0);
    fx.controller.load(ContentIdentity::new("m1"), autoplay())?;
    fx.controller.settle().await;

    fx.play_for(40).await;
    fx.flush().await;

    assert_eq!(fx.controller.state().phase, PlaybackPhase::Ended);
    let mut positions: Vec<f64> = fx.sink.reports().iter().map(|r| r.position_seconds).collect();
    positions.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(positions, vec![1.0, 11.0, 21.0, 31.0, 35.0]);

    let finals = fx.sink.reports().iter().filter(|r| r.position_seconds == 35.0).count();
    assert_eq!(finals, 1);
    assert!(fx.sink.reports().iter().all(|r| r.duration_seconds == 35.0));
    assert_eq!(fx.sink.watched(), vec![ContentIdentity::new("m1")]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_episode_identity_reaches_backend() -> Result<()> {
    let mut fx = TestFixture::new(60.0);
    let identity = ContentIdentity::episode("show", "s01e02");
    fx.controller.load(identity.clone(), autoplay())?;
    fx.controller.settle().await;
    fx.play_for(2).await;
    fx.flush().await;

    let calls = fx.resolver.calls();
    let first = calls.first().context("resolver was called")?;
    assert_eq!(first.identity, identity);
    let reports = fx.sink.reports();
    let report = reports.first().context("a progress report was sent")?;
    assert_eq!(report.episode_id.as_deref(), Some("s01e02"));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_no_reports_after_teardown() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    fx.controller.load(ContentIdentity::new("m1"), autoplay())?;
    fx.controller.settle().await;
    fx.play_for(5).await;
    fx.flush().await;
    let before = fx.sink.reports().len();

    fx.controller.teardown();
    assert!(fx.media.is_released());

    fx.play_for(30).await;
    fx.flush().await;
    assert_eq!(fx.sink.reports().len(), before);
    assert!(fx.controller.play().is_err());

    Ok(())
}

#[tokio::test]
async fn test_retry_after_stream_unavailable() -> Result<()> {
    let mut fx = TestFixture::new(100.0);
    fx.resolver
        .fail("m1", Quality::Auto, StreamUnavailable::NotFound("no such title".to_string()));

    fx.controller.load(ContentIdentity::new("m1"), LoadOptions::default())?;
    fx.controller.settle().await;

    let failure = fx.controller.state().error.clone().context("load failure recorded")?;
    assert_eq!(failure.kind, FailureKind::StreamUnavailable);
    assert!(failure.retryable);
    assert_eq!(fx.resolver.calls().len(), 1);

    fx.resolver.heal();
    fx.controller.execute(PlayerCommand::Retry)?;
    fx.controller.settle().await;
    assert_eq!(fx.controller.state().phase, PlaybackPhase::Ready);
    assert!(fx.controller.state().error.is_none());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_play_after_end_restarts() -> Result<()> {
    let mut fx = TestFixture::new(5.0);
    fx.controller.load(ContentIdentity::new("m1"), autoplay())?;
    fx.controller.settle().await;
    fx.play_for(6).await;
    assert_eq!(fx.controller.state().phase, PlaybackPhase::Ended);

    fx.controller.handle_input(InputEvent::KeyPressed(Key::Space))?;
    fx.controller.process_pending();

    assert_eq!(fx.controller.state().phase, PlaybackPhase::Playing);
    assert_eq!(fx.controller.state().current_time, 0.0);

    Ok(())
}
