//! Exercises the Engine Process handshake and search cycle end to end
//! against the fixture USI engine, through the `Orchestrator` facade (the
//! only public entry point into a live process).

mod common;

use shogi_orchestrator::{GoParams, Orchestrator};

#[tokio::test]
async fn engine_completes_handshake_and_returns_a_move() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "fixture", 1, 10);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);
    let descriptors = orchestrator.discover_engines();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].id, "fixture");

    orchestrator
        .set_engine("black", Some("fixture".to_string()), 10, Default::default(), None)
        .await
        .unwrap();

    let params = GoParams {
        byoyomi: Some(1000),
        ..Default::default()
    };
    let (best_move, ponder, info) = orchestrator
        .get_move("black", &params, None)
        .await
        .unwrap()
        .expect("an engine is assigned to black");

    assert_eq!(best_move, "7g7f");
    assert_eq!(ponder, Some("3c3d".to_string()));
    assert_eq!(info.score_cp, Some(50));

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn unassigned_role_returns_no_move_without_erroring() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "fixture", 1, 10);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);
    let params = GoParams::default();
    let result = orchestrator.get_move("white", &params, None).await.unwrap();
    assert!(result.is_none());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn inspect_options_starts_and_stops_a_transient_handle() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "fixture", 1, 10);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);
    let options = orchestrator.inspect_options("fixture").await.unwrap();
    let names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
    assert!(names.contains(&"USI_Hash"));
    assert!(names.contains(&"USI_Elo"));
}
