//! Progress event guarantees observed across a whole job.

use crate::integration::support::{fast_config, sample_units, AcceptAllValidator};
use parking_lot::Mutex;
use relic::backend::TemplateBackend;
use relic::pipeline::{GenerationPipeline, JobProfile};
use relic::progress::{ProgressEvent, ProgressTracker};
use relic::types::Stage;
use std::sync::Arc;

#[tokio::test]
async fn job_transcript_covers_every_stage_in_order() {
    let pipeline = GenerationPipeline::new(fast_config());
    let units = sample_units(&["a", "b", "c"]);

    let report = pipeline
        .run_job(
            &units,
            Arc::new(TemplateBackend::new()),
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::test_suite(),
        )
        .await;

    let stages: Vec<Stage> = report.progress.iter().map(|e| e.stage).collect();
    let expected = [
        Stage::Analyzing,
        Stage::Planning,
        Stage::Generating,
        Stage::Validating,
        Stage::Complete,
    ];
    let mut first_seen = Vec::new();
    for stage in &stages {
        if !first_seen.contains(stage) {
            first_seen.push(*stage);
        }
    }
    assert_eq!(first_seen, expected);

    // Stage boundaries: every stage's first event is current=0 and its last
    // event is current=total.
    for stage in expected.iter().take(4) {
        let events: Vec<&ProgressEvent> = report
            .progress
            .iter()
            .filter(|e| e.stage == *stage)
            .collect();
        assert!(events.len() >= 2, "stage {stage} emitted fewer than 2 events");
        assert_eq!(events.first().unwrap().current, 0);
        let last = events.last().unwrap();
        assert_eq!(last.current, last.total);
        assert!(events.windows(2).all(|w| w[1].current >= w[0].current));
    }

    // The generating stage fanned out over 3 units x 3 cases.
    let generating_last = report
        .progress
        .iter()
        .filter(|e| e.stage == Stage::Generating)
        .last()
        .unwrap();
    assert_eq!(generating_last.total, 9);
}

#[tokio::test]
async fn external_subscribers_see_the_same_events_as_the_report() {
    let pipeline = GenerationPipeline::new(fast_config());
    let units = sample_units(&["a"]);

    let seen: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = pipeline
        .tracker()
        .on_progress(move |event| sink.lock().push(event.clone()));

    let report = pipeline
        .run_job(
            &units,
            Arc::new(TemplateBackend::new()),
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::documentation(),
        )
        .await;
    pipeline.tracker().off_progress(subscription);

    let seen = seen.lock();
    assert_eq!(seen.len(), report.progress.len());
    assert_eq!(seen.first().unwrap().stage, Stage::Analyzing);
    assert_eq!(seen.last().unwrap().stage, Stage::Complete);
}

#[test]
fn rapid_updates_are_throttled_but_boundaries_survive() {
    let tracker = ProgressTracker::new();
    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    tracker.on_progress(move |event| sink.lock().push(event.clone()));

    tracker.start_stage(Stage::Generating, 100, "generating");
    for i in 1..100 {
        tracker.update_progress(i, None);
    }
    tracker.complete_stage(None);

    let events = events.lock();
    assert!(events.len() >= 2);
    assert!(events.len() < 100);
    assert_eq!(events.first().unwrap().current, 0);
    assert_eq!(events.last().unwrap().current, 100);
}
