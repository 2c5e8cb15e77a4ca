//! End-to-end runs against a real Chrome.
//!
//! These tests require Chrome to be installed and available.
//! Run with: cargo test --test browser -- --ignored

use repro_runner::{
    BrowserConfig, EngineSettings, EokaDriver, FsArtifactStore, Runner, Step, StepStatus,
};

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

/// Two Bootstrap-style tabs. Completing a card moves it to the Completed pane
/// unless `moves` is false, in which case it stays in the (soon hidden) Active pane.
fn todo_page(moves: bool) -> String {
    format!(
        r##"data:text/html,<!doctype html><html><body>
<ul class="nav nav-tabs">
  <li class="nav-item"><a class="nav-link active" data-pane="active-pane" href="javascript:void(0)">Active</a></li>
  <li class="nav-item"><a class="nav-link" data-pane="completed-pane" href="javascript:void(0)">Completed</a></li>
</ul>
<div class="tab-content">
  <div id="active-pane" class="tab-pane active">
    <div class="card"><div class="card-body"><h5>The Idea Jar</h5><button class="btn">Complete</button></div></div>
  </div>
  <div id="completed-pane" class="tab-pane" style="display: none"></div>
</div>
<script>
const MOVES = {moves};
document.querySelectorAll('.nav-link').forEach(link => link.addEventListener('click', () => {{
  document.querySelectorAll('.nav-link').forEach(l => l.classList.remove('active'));
  document.querySelectorAll('.tab-pane').forEach(p => {{ p.classList.remove('active'); p.style.display = 'none'; }});
  link.classList.add('active');
  const pane = document.getElementById(link.dataset.pane);
  pane.classList.add('active');
  pane.style.display = '';
}}));
document.querySelectorAll('.card button').forEach(btn => btn.addEventListener('click', () => {{
  const card = btn.closest('.card');
  btn.remove();
  if (MOVES) document.getElementById('completed-pane').appendChild(card);
}}));
</script></body></html>"##
    )
}

fn plan(url: String) -> Vec<Step> {
    vec![
        Step::navigate(1, url),
        Step::click(2, "'The Idea Jar' complete button"),
        Step::wait(3, 500),
        Step::click(4, "Completed tab"),
        Step::wait(5, 500),
        Step::verify(6, "'The Idea Jar' in the Completed tab"),
    ]
}

async fn run(moves: bool) -> repro_runner::RunReport {
    let config = BrowserConfig {
        headless: true,
        ..Default::default()
    };
    let driver = EokaDriver::launch(&config)
        .await
        .expect("Failed to launch browser");

    let mut settings = EngineSettings::default();
    settings.timing.click_probe_ms = 500;
    settings.timing.tab_probe_ms = 500;
    settings.timing.idle_timeout_ms = 1_000;

    let artifacts = tempfile::tempdir().unwrap();
    let runner =
        Runner::new(driver, settings).with_artifacts(FsArtifactStore::new(artifacts.path()));
    let report = runner.run(&plan(todo_page(moves))).await;

    runner
        .into_driver()
        .close()
        .await
        .expect("Failed to close browser");
    report
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_completed_item_found_in_active_tab() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let report = run(true).await;

    for result in &report.results {
        assert_eq!(result.status, StepStatus::Success, "{}", result.message);
    }
    assert_eq!(report.results.len(), 6);
    assert_eq!(report.results[5].location_verified, Some(true));
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_item_left_in_hidden_tab_is_location_mismatch() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let report = run(false).await;

    let last = report.results.last().unwrap();
    assert_eq!(last.status, StepStatus::Failed);
    assert_eq!(last.location_verified, Some(false));
    assert!(last.message.contains("LOCATION MISMATCH"), "{}", last.message);
}
