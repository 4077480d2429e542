//! Exercises role assignment, hot-swapping, and shared-engine refcounting
//! through the `Orchestrator` facade against two fixture engines.

mod common;

use shogi_orchestrator::{GoParams, Orchestrator};

#[tokio::test]
async fn hot_swap_to_a_new_engine_leaves_the_other_role_unaffected() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "alpha", 1, 10);
    common::write_engine_descriptor(engines_dir.path(), "beta", 1, 10);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);

    orchestrator
        .set_engine("black", Some("alpha".to_string()), 10, Default::default(), None)
        .await
        .unwrap();
    orchestrator
        .set_engine("white", Some("alpha".to_string()), 10, Default::default(), None)
        .await
        .unwrap();

    // Swap black to a different engine; white must still get a move from alpha.
    orchestrator
        .set_engine("black", Some("beta".to_string()), 10, Default::default(), None)
        .await
        .unwrap();

    let params = GoParams { byoyomi: Some(1000), ..Default::default() };
    let white_move = orchestrator.get_move("white", &params, None).await.unwrap();
    assert!(white_move.is_some());
    let black_move = orchestrator.get_move("black", &params, None).await.unwrap();
    assert!(black_move.is_some());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn setting_an_unknown_engine_id_does_not_disturb_the_existing_assignment() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "alpha", 1, 10);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);
    orchestrator
        .set_engine("black", Some("alpha".to_string()), 10, Default::default(), None)
        .await
        .unwrap();

    let err = orchestrator
        .set_engine("black", Some("does-not-exist".to_string()), 10, Default::default(), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does-not-exist"));

    let params = GoParams { byoyomi: Some(1000), ..Default::default() };
    let result = orchestrator.get_move("black", &params, None).await.unwrap();
    assert!(result.is_some(), "alpha should still be assigned to black");

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn clearing_a_role_releases_its_handle_once_unreferenced() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "alpha", 1, 10);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);
    orchestrator
        .set_engine("black", Some("alpha".to_string()), 10, Default::default(), None)
        .await
        .unwrap();
    orchestrator
        .set_engine("black", None, 10, Default::default(), None)
        .await
        .unwrap();

    let params = GoParams::default();
    let result = orchestrator.get_move("black", &params, None).await.unwrap();
    assert!(result.is_none());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn analysis_restores_the_shared_position_after_a_one_off_search() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "alpha", 1, 10);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);
    orchestrator
        .set_engine("black", Some("alpha".to_string()), 10, Default::default(), None)
        .await
        .unwrap();
    orchestrator.update_position("startpos", &[]).await.unwrap();

    let moves = vec!["7g7f".to_string(), "3c3d".to_string()];
    let analysis = orchestrator
        .analyze_position("startpos", &moves, Some("alpha".to_string()), 100, None)
        .await
        .unwrap();
    assert!(analysis.is_some());

    // The role's own game view is unaffected by the one-off analysis.
    let params = GoParams { byoyomi: Some(1000), ..Default::default() };
    let move_after = orchestrator.get_move("black", &params, None).await.unwrap();
    assert!(move_after.is_some());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn strength_clamping_applies_the_descriptors_bounds() {
    let engines_dir = tempfile::tempdir().unwrap();
    let prefs_path = engines_dir.path().join("prefs.json");
    common::write_engine_descriptor(engines_dir.path(), "capped", 3, 7);

    let orchestrator = Orchestrator::new(engines_dir.path(), prefs_path);
    orchestrator
        .set_engine("analysis", Some("capped".to_string()), 10, Default::default(), Some(true))
        .await
        .unwrap();

    let params = GoParams { byoyomi: Some(1000), ..Default::default() };
    let result = orchestrator.get_move("analysis", &params, None).await.unwrap();
    assert!(result.is_some());

    orchestrator.shutdown().await;
}
