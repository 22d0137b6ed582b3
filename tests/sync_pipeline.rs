//! End-to-end pipeline tests driven against an in-memory remote source

mod common;

use common::{test_config, FixtureDimensions, FixtureSource};
use std::sync::Arc;
use tempfile::TempDir;

use assetsentry::category::AssetCategory;
use assetsentry::manifest::{Manifest, MasterManifest};
use assetsentry::rules::{AspectRatio, Rule, RuleMatch};
use assetsentry::state::SyncState;
use assetsentry::sync::{ActionKind, SyncEngine};
use assetsentry::Config;

fn scenario_rules() -> Vec<Rule> {
    let png = Some(vec![".png".to_string()]);
    vec![
        Rule {
            priority: 1,
            destination: AssetCategory::Icons,
            matcher: RuleMatch {
                extensions: png.clone(),
                aspect_ratio: Some(AspectRatio::Square),
                ..Default::default()
            },
        },
        Rule {
            priority: 5,
            destination: AssetCategory::Images,
            matcher: RuleMatch {
                extensions: png,
                ..Default::default()
            },
        },
    ]
}

fn engine_with(config: Config, source: Arc<FixtureSource>) -> SyncEngine {
    SyncEngine::new(config, source)
}

#[tokio::test]
async fn test_end_to_end_square_logo_becomes_icon() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.rules = scenario_rules();

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "logo.png", "sha-logo", b"PNGDATA");
    source.add_file("hakcer", "", "script.py", "sha-py", b"print('hi')");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source.clone()).with_dimensions(Arc::new(
        FixtureDimensions::default().with("hakcer", "logo.png", 128, 128),
    ));

    // Scan + classify: square PNG wins the priority-1 icons rule; the
    // script matches nothing and is dropped.
    let outcome = engine.scan(None).await.unwrap();
    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(outcome.assets[0].category, AssetCategory::Icons);
    assert_eq!(outcome.assets[0].key(), "icons/hakcer/logo.png");

    // No prior state: needs_sync
    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.actions[0].kind, ActionKind::New);

    // Apply: fetch, record, manifest row
    let summary = engine.apply(plan, &mut state).await.unwrap();
    assert_eq!(summary.synced, vec!["icons/hakcer/logo.png"]);
    assert!(summary.failed.is_empty());

    let local = config.repos_dir().join("icons/hakcer/logo.png");
    assert_eq!(std::fs::read(&local).unwrap(), b"PNGDATA");

    assert_eq!(
        state.stored_sha("icons/hakcer/logo.png"),
        Some("sha-logo")
    );

    let manifest = Manifest::load(&config.repos_dir(), AssetCategory::Icons);
    let entry = manifest.get("logo.png").expect("manifest row written");
    assert_eq!(entry.source_repo, "hakcer");
    assert_eq!(entry.sha, "sha-logo");

    let master = MasterManifest::load(&config.repos_dir()).expect("master manifest written");
    assert_eq!(master.total_assets, 1);
    assert_eq!(master.by_repo["hakcer"]["icons"], vec!["logo.png"]);
}

#[tokio::test]
async fn test_second_apply_run_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "photo.jpg", "sha-1", b"JPG");
    source.add_dir("hakcer", "media");
    source.add_file("hakcer", "media", "clip.mp4", "sha-2", b"MP4");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source.clone());

    // First run fetches everything
    let outcome = engine.scan(None).await.unwrap();
    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    let summary = engine.apply(plan, &mut state).await.unwrap();
    assert_eq!(summary.synced.len(), 2);
    assert_eq!(source.download_count(), 2);

    let manifest_path = Manifest::path_for(&config.repos_dir(), AssetCategory::Images);
    let manifest_before = std::fs::read(&manifest_path).unwrap();
    let state_before = std::fs::read(config.state_file()).unwrap();

    // Second run with unchanged remote state: zero fetches, manifests and
    // state byte-identical.
    let outcome = engine.scan(None).await.unwrap();
    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    assert!(plan.is_empty());

    let summary = engine.apply(plan, &mut state).await.unwrap();
    assert!(summary.synced.is_empty());
    assert_eq!(source.download_count(), 2);

    assert_eq!(std::fs::read(&manifest_path).unwrap(), manifest_before);
    assert_eq!(std::fs::read(config.state_file()).unwrap(), state_before);
}

#[tokio::test]
async fn test_changed_hash_triggers_update() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "photo.jpg", "sha-old", b"V1");
    let source = Arc::new(source);
    let engine = engine_with(config.clone(), source);

    let outcome = engine.scan(None).await.unwrap();
    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    engine.apply(plan, &mut state).await.unwrap();

    // Same file, new content hash
    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "photo.jpg", "sha-new", b"V2");
    let source = Arc::new(source);
    let engine = engine_with(config.clone(), source);

    let outcome = engine.scan(None).await.unwrap();
    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.actions[0].kind, ActionKind::Update);

    engine.apply(plan, &mut state).await.unwrap();
    assert_eq!(
        std::fs::read(config.repos_dir().join("images/hakcer/photo.jpg")).unwrap(),
        b"V2"
    );
    assert_eq!(state.stored_sha("images/hakcer/photo.jpg"), Some("sha-new"));
}

#[tokio::test]
async fn test_readme_banners_become_synthetic_assets() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let readme = "\
# hakcer

```
╔══════════════════════════╗
║  H A K C E R             ║
╚══════════════════════════╝
```

Install:

```bash
pip install hakcer
```

```
████████████████████████████
█  SECOND PIECE            █
████████████████████████████
```
";

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_readme("hakcer", "sha-rm", readme);
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source.clone());

    let outcome = engine.scan(None).await.unwrap();
    let banners: Vec<_> = outcome
        .assets
        .iter()
        .filter(|a| a.category == AssetCategory::Banners)
        .collect();
    assert_eq!(banners.len(), 2);
    assert_eq!(banners[0].name, "readme_banner.txt");
    assert_eq!(banners[1].name, "readme_banner_2.txt");
    assert_eq!(banners[0].sha, "sha-rm_readme_banner.txt");

    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    let summary = engine.apply(plan, &mut state).await.unwrap();
    assert_eq!(summary.synced.len(), 2);

    // Inline content is written directly - nothing was downloaded
    assert_eq!(source.download_count(), 0);

    let first = std::fs::read_to_string(
        config.repos_dir().join("banners/hakcer/readme_banner.txt"),
    )
    .unwrap();
    assert!(first.contains("H A K C E R"));

    let manifest = Manifest::load(&config.repos_dir(), AssetCategory::Banners);
    let entry = manifest.get("readme_banner.txt").unwrap();
    assert_eq!(entry.download_url, "(extracted from README)");
}

#[tokio::test]
async fn test_small_text_files_are_sniffed_for_art() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    // No banner hint in the name; only the content gives it away
    source.add_text_file("hakcer", "", "piece.txt", "sha-a", "██ art ██ long enough");
    source.add_text_file("hakcer", "", "notes.txt", "sha-b", "just words");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(None).await.unwrap();

    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(outcome.assets[0].name, "piece.txt");
    assert_eq!(outcome.assets[0].category, AssetCategory::Banners);
}

#[tokio::test]
async fn test_oversized_text_is_never_sniffed() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    // Art content, but above the sniff ceiling: classified by name alone,
    // which resolves to nothing worth syncing.
    let mut big = "x".repeat(60_000);
    big.push('█');

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_text_file("hakcer", "", "dump.txt", "sha-big", &big);
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(None).await.unwrap();
    assert!(outcome.assets.is_empty());
}

#[tokio::test]
async fn test_fetch_failure_is_isolated_and_retried() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "good.jpg", "sha-good", b"GOOD");
    let bad_url = source.add_file("hakcer", "", "bad.jpg", "sha-bad", b"BAD");
    source.fail_url(&bad_url);
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);

    let outcome = engine.scan(None).await.unwrap();
    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    assert_eq!(plan.len(), 2);

    let summary = engine.apply(plan, &mut state).await.unwrap();
    assert_eq!(summary.synced, vec!["images/hakcer/good.jpg"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].key, "images/hakcer/bad.jpg");

    // The failed asset left no trace in state or manifest
    assert!(state.stored_sha("images/hakcer/bad.jpg").is_none());
    let manifest = Manifest::load(&config.repos_dir(), AssetCategory::Images);
    assert!(manifest.get("bad.jpg").is_none());
    assert!(manifest.get("good.jpg").is_some());

    // Next run: the remote recovered, only the failed asset is re-planned
    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "good.jpg", "sha-good", b"GOOD");
    source.add_file("hakcer", "", "bad.jpg", "sha-bad", b"BAD");
    let source = Arc::new(source);
    let engine = engine_with(config.clone(), source);

    let outcome = engine.scan(None).await.unwrap();
    let state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.actions[0].descriptor.name, "bad.jpg");
}

#[tokio::test]
async fn test_dry_run_performs_no_writes() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "photo.jpg", "sha-1", b"JPG");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source.clone());

    let outcome = engine.scan(None).await.unwrap();
    let state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    assert_eq!(plan.len(), 1);

    // Scan + diff alone touched nothing
    assert!(!config.state_file().exists());
    assert!(!config.repos_dir().exists());
    assert_eq!(source.download_count(), 0);
}

#[tokio::test]
async fn test_master_manifest_self_heals_after_deletion() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "a.jpg", "sha-a", b"A");
    source.add_file("hakcer", "", "talk.pdf", "sha-t", b"PDF");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(None).await.unwrap();
    let mut state = SyncState::load(&config.state_file());
    let plan = engine.plan(&outcome.assets, &state);
    engine.apply(plan, &mut state).await.unwrap();

    let before = MasterManifest::load(&config.repos_dir()).unwrap();
    std::fs::remove_file(MasterManifest::path_for(&config.repos_dir())).unwrap();

    // Rebuild without any sync: identical content from the category manifests
    let rebuilt = MasterManifest::rebuild(&config.repos_dir(), &config.organization);
    assert_eq!(before.types, rebuilt.types);
    assert_eq!(before.by_repo, rebuilt.by_repo);
    assert_eq!(before.total_assets, rebuilt.total_assets);
    assert_eq!(rebuilt.total_assets, 2);
}

#[tokio::test]
async fn test_ignore_list_precedes_rules() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.ignore.push("secret.png".to_string());

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "secret.png", "sha-s", b"S");
    source.add_file("hakcer", "", "public.png", "sha-p", b"P");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(None).await.unwrap();

    let names: Vec<_> = outcome.assets.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["public.png"]);
}

#[tokio::test]
async fn test_self_and_excluded_repos_are_skipped() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.sync.exclude_repos = vec!["sandbox".to_string()];

    let mut source = FixtureSource::new();
    source.add_repo("AssetSentry"); // the mirror itself
    source.add_repo("sandbox");
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "a.jpg", "sha-a", b"A");
    source.add_file("sandbox", "", "b.jpg", "sha-b", b"B");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(None).await.unwrap();

    assert_eq!(outcome.repos_scanned, 1);
    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(outcome.assets[0].repo, "hakcer");
}

#[tokio::test]
async fn test_repo_scan_failure_does_not_abort_run() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_broken_repo("ghost");
    source.add_repo("hakcer");
    source.add_file("hakcer", "", "a.jpg", "sha-a", b"A");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(None).await.unwrap();

    assert_eq!(outcome.repos_scanned, 1);
    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].repo, "ghost");
}

#[tokio::test]
async fn test_single_repo_scan_only_touches_that_repo() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("alpha");
    source.add_repo("beta");
    source.add_file("alpha", "", "a.jpg", "sha-a", b"A");
    source.add_file("beta", "", "b.jpg", "sha-b", b"B");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(Some("alpha")).await.unwrap();

    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(outcome.assets[0].repo, "alpha");
}

#[tokio::test]
async fn test_asset_directories_are_scanned() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let mut source = FixtureSource::new();
    source.add_repo("hakcer");
    source.add_dir("hakcer", "media");
    source.add_dir("hakcer", "src"); // not a whitelisted asset directory
    source.add_file("hakcer", "media", "clip.mp4", "sha-c", b"MP4");
    source.add_file("hakcer", "src", "diagram.png", "sha-d", b"PNG");
    let source = Arc::new(source);

    let engine = engine_with(config.clone(), source);
    let outcome = engine.scan(None).await.unwrap();

    assert_eq!(outcome.assets.len(), 1);
    assert_eq!(outcome.assets[0].path, "media/clip.mp4");
    assert_eq!(outcome.assets[0].category, AssetCategory::Media);
}
