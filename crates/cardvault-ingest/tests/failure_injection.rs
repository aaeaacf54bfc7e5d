//! Storage failures at every step of the write paths.
//!
//! A failed operation must leave either no trace or the previous state; a
//! failed compensation must be reported as such.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use cardvault_ingest::{CharacterStore, DefinitionSource, IngestionError, Visibility};
use cardvault_test_utils::{
    ArtifactOp, ArtifactOpKind, TestContext, TxStep, blank_png, blank_png_variant, card_upload,
    legacy_definition, v2_definition,
};

fn assert_clean_persistence_failure(err: &IngestionError) {
    assert!(
        matches!(err, IngestionError::Persistence { .. }),
        "expected persistence error, got {err:?}"
    );
    assert!(!err.compensation_failed(), "unexpected compensation failure: {err:?}");
}

#[tokio::test]
async fn ingest_row_failures_leave_no_trace() {
    for step in [
        TxStep::Begin,
        TxStep::InsertCharacter,
        TxStep::InsertOriginal,
        TxStep::InsertDefinition,
        TxStep::SetTokenMetrics,
        TxStep::Commit,
    ] {
        let ctx = TestContext::new();
        ctx.store.fail_at(step);

        let err = ctx
            .ingest(card_upload("a.png", &v2_definition("Fragile")))
            .await
            .unwrap_err();

        assert_clean_persistence_failure(&err);
        assert_eq!(ctx.rows().character_count().unwrap(), 0, "rows left after {step:?}");
        assert_eq!(ctx.rows().original_count().unwrap(), 0);
        assert_eq!(ctx.rows().definition_count().unwrap(), 0);
        assert!(ctx.artifacts.keys().is_empty(), "image written after {step:?}");
        assert!(ctx.hook.calls().is_empty());
    }
}

#[tokio::test]
async fn image_write_failure_writes_no_rows() {
    let ctx = TestContext::new();
    ctx.artifacts.inject_failure(ArtifactOpKind::Put, "images/");

    let err = ctx
        .ingest(card_upload("a.png", &legacy_definition("Ada")))
        .await
        .unwrap_err();

    assert_clean_persistence_failure(&err);
    assert_eq!(ctx.rows().character_count().unwrap(), 0);
    assert_eq!(ctx.rows().original_count().unwrap(), 0);
    assert!(ctx.artifacts.keys().is_empty());

    let kinds: Vec<_> = ctx.artifacts.operations().iter().map(|op| op.kind).collect();
    assert_eq!(kinds, vec![ArtifactOpKind::Put]);
    assert!(ctx.hook.calls().is_empty());
}

#[tokio::test]
async fn commit_failure_deletes_the_written_image() {
    let ctx = TestContext::new();
    ctx.store.fail_at(TxStep::Commit);

    let err = ctx
        .ingest(card_upload("a.png", &v2_definition("Undone")))
        .await
        .unwrap_err();

    assert_clean_persistence_failure(&err);
    let ops = ctx.artifacts.operations();
    let kinds: Vec<_> = ops.iter().map(|op| op.kind).collect();
    assert_eq!(kinds, vec![ArtifactOpKind::Put, ArtifactOpKind::Delete]);
    assert_eq!(ops[0].key, ops[1].key);
    assert!(ctx.artifacts.keys().is_empty());
    assert_eq!(ctx.rows().character_count().unwrap(), 0);
}

#[tokio::test]
async fn failed_compensation_is_reported() {
    let ctx = TestContext::new();
    ctx.store.fail_at(TxStep::Commit);
    ctx.artifacts.inject_failure(ArtifactOpKind::Delete, "images/");

    let err = ctx
        .ingest(card_upload("a.png", &legacy_definition("Ada")))
        .await
        .unwrap_err();

    assert!(err.compensation_failed(), "got {err:?}");
    match &err {
        IngestionError::Persistence { compensation, source, .. } => {
            assert!(compensation.as_deref().unwrap().contains("image delete failed"));
            assert!(source.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The orphaned image is what the report is about; no rows reference it.
    assert_eq!(ctx.rows().character_count().unwrap(), 0);
    assert_eq!(ctx.artifacts.keys().len(), 1);
}

#[tokio::test]
async fn retry_after_transient_failure_succeeds() {
    let ctx = TestContext::new();
    let upload = card_upload("a.png", &v2_definition("Retry"));

    ctx.store.fail_at(TxStep::Commit);
    ctx.ingest(upload.clone()).await.unwrap_err();

    ctx.store.clear_failures();
    let record = ctx.ingest(upload).await.unwrap();
    assert_eq!(ctx.rows().character_count().unwrap(), 1);
    assert_eq!(ctx.artifacts.keys(), vec![format!("images/{}.png", record.id())]);
}

#[tokio::test]
async fn second_commit_failure_only_affects_second_ingest() {
    let ctx = TestContext::new();
    ctx.store.fail_at_after(TxStep::Commit, 1);

    let first = ctx.ingest(card_upload("a.png", &v2_definition("First"))).await.unwrap();
    let err = ctx
        .ingest(card_upload("b.png", &v2_definition("Second")))
        .await
        .unwrap_err();

    assert_clean_persistence_failure(&err);
    assert_eq!(ctx.rows().character_count().unwrap(), 1);
    assert_eq!(ctx.artifacts.keys(), vec![format!("images/{}.png", first.id())]);
}

#[tokio::test]
async fn delete_commit_failure_restores_image() {
    let ctx = TestContext::new();
    let record = ctx.ingest(card_upload("a.png", &v2_definition("Stay"))).await.unwrap();
    let id = record.id();
    ctx.store.fail_at(TxStep::Commit);

    let err = ctx.pipeline.delete(id).await.unwrap_err();
    assert_clean_persistence_failure(&err);

    ctx.store.clear_failures();
    let loaded = ctx.pipeline.load(id).await.unwrap().unwrap();
    assert_eq!(loaded.image, record.image);

    ctx.pipeline.delete(id).await.unwrap();
    assert!(ctx.pipeline.load(id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_image_failure_keeps_everything() {
    let ctx = TestContext::new();
    let id = ctx.ingest(card_upload("a.png", &v2_definition("Stay"))).await.unwrap().id();
    ctx.artifacts.inject_failure(ArtifactOpKind::Delete, "images/");

    let err = ctx.pipeline.delete(id).await.unwrap_err();
    assert_clean_persistence_failure(&err);
    assert!(ctx.rows().character(&id).await.unwrap().is_some());
    assert_eq!(ctx.artifacts.keys().len(), 1);
}

#[tokio::test]
async fn delete_with_failed_restore_is_reported() {
    let ctx = TestContext::new();
    let id = ctx.ingest(card_upload("a.png", &v2_definition("Lost"))).await.unwrap().id();
    ctx.store.fail_at(TxStep::Commit);
    ctx.artifacts.inject_failure(ArtifactOpKind::Put, "images/");

    let err = ctx.pipeline.delete(id).await.unwrap_err();
    assert!(err.compensation_failed(), "got {err:?}");
    assert!(ctx.rows().character(&id).await.unwrap().is_some());
    assert!(ctx.artifacts.keys().is_empty());
}

#[tokio::test]
async fn replace_image_commit_failure_restores_previous() {
    let ctx = TestContext::new();
    let record = ctx.ingest(card_upload("a.png", &v2_definition("Pic"))).await.unwrap();
    let id = record.id();
    ctx.store.fail_at(TxStep::Commit);

    let err = ctx
        .pipeline
        .replace_image(id, blank_png_variant(3))
        .await
        .unwrap_err();
    assert_clean_persistence_failure(&err);

    let loaded = ctx.pipeline.load(id).await.unwrap().unwrap();
    assert_eq!(loaded.image, blank_png());
    assert_eq!(loaded.character.image_etag, record.character.image_etag);

    let key = format!("images/{id}.png");
    let puts: Vec<_> = ctx
        .artifacts
        .operations()
        .into_iter()
        .filter(|op| op.kind == ArtifactOpKind::Put)
        .collect();
    assert_eq!(
        puts,
        vec![
            ArtifactOp { kind: ArtifactOpKind::Put, key: key.clone() },
            ArtifactOp { kind: ArtifactOpKind::Put, key: key.clone() },
            ArtifactOp { kind: ArtifactOpKind::Put, key },
        ]
    );
}

#[tokio::test]
async fn re_ingest_failure_keeps_previous_definition() {
    let ctx = TestContext::new();
    let id = ctx.ingest(card_upload("a.png", &v2_definition("Before"))).await.unwrap().id();
    ctx.store.fail_at(TxStep::SetName);

    let err = ctx
        .pipeline
        .re_ingest_definition(id, DefinitionSource::Text(v2_definition("After")))
        .await
        .unwrap_err();
    assert_clean_persistence_failure(&err);

    assert_eq!(ctx.rows().definition_history(&id).await.unwrap().len(), 1);
    assert_eq!(ctx.rows().character(&id).await.unwrap().unwrap().name, "Before");
    let current = ctx.rows().current_definition(&id).await.unwrap().unwrap();
    assert_eq!(current.card.data.name, "Before");

    // The failed content was never claimed.
    ctx.store.clear_failures();
    ctx.ingest(card_upload("b.png", &v2_definition("After"))).await.unwrap();
}

#[tokio::test]
async fn visibility_failure_keeps_previous_value() {
    let ctx = TestContext::new();
    let id = ctx.ingest(card_upload("a.png", &v2_definition("Shy"))).await.unwrap().id();
    ctx.store.fail_at(TxStep::SetVisibility);

    let err = ctx
        .pipeline
        .set_visibility(id, Visibility::Public)
        .await
        .unwrap_err();
    assert_clean_persistence_failure(&err);
    let row = ctx.rows().character(&id).await.unwrap().unwrap();
    assert_eq!(row.visibility, Visibility::Private);
}
