//! Concurrent ingestion: the commit-time constraint picks exactly one winner.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::collections::HashSet;

use cardvault_ingest::{CharacterStore, DefinitionSource, DuplicateKind, IngestionError};
use cardvault_test_utils::{TestContext, card_upload, v2_definition};

const WORKERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identical_content_races_to_a_single_winner() {
    let ctx = TestContext::new();
    // Skip the advisory lookups so every worker reaches the commit.
    ctx.store.blind_lookups();

    let tasks: Vec<_> = (0..WORKERS)
        .map(|i| {
            let pipeline = ctx.pipeline.clone();
            let owner = ctx.owner;
            let upload = card_upload(&format!("copy-{i}.png"), &v2_definition("Contested"));
            tokio::spawn(async move {
                pipeline
                    .ingest(upload, owner, cardvault_ingest::Visibility::Private)
                    .await
            })
        })
        .collect();

    let mut winners = Vec::new();
    let mut losers = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(record) => winners.push(record.id()),
            Err(error) => losers.push(error),
        }
    }

    assert_eq!(winners.len(), 1, "losers: {losers:?}");
    let winner = winners[0];
    for error in &losers {
        assert!(
            matches!(
                error,
                IngestionError::DuplicateContent { existing, kind: DuplicateKind::Content }
                    if *existing == winner
            ),
            "unexpected error: {error:?}"
        );
    }

    assert_eq!(ctx.rows().character_count().unwrap(), 1);
    assert_eq!(ctx.artifacts.keys(), vec![format!("images/{winner}.png")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unrelated_uploads_all_succeed() {
    let ctx = TestContext::new();

    let tasks: Vec<_> = (0..WORKERS)
        .map(|i| {
            let pipeline = ctx.pipeline.clone();
            let owner = ctx.owner;
            let upload = card_upload(&format!("c{i}.png"), &v2_definition(&format!("Character {i}")));
            tokio::spawn(async move {
                pipeline
                    .ingest(upload, owner, cardvault_ingest::Visibility::Private)
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap().unwrap().id());
    }

    assert_eq!(ids.len(), WORKERS);
    assert_eq!(ctx.rows().character_count().unwrap(), WORKERS);
    assert_eq!(ctx.artifacts.keys().len(), WORKERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn updates_to_one_character_are_serialized() {
    let ctx = TestContext::new();
    let id = ctx.ingest(card_upload("a.png", &v2_definition("Rev 0"))).await.unwrap().id();

    let tasks: Vec<_> = (1..=WORKERS)
        .map(|i| {
            let pipeline = ctx.pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .re_ingest_definition(id, DefinitionSource::Text(v2_definition(&format!("Rev {i}"))))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let history = ctx.rows().definition_history(&id).await.unwrap();
    let revisions: Vec<_> = history.iter().map(|d| d.revision).collect();
    let expected: Vec<u32> = (1..=u32::try_from(WORKERS).unwrap() + 1).collect();
    assert_eq!(revisions, expected);

    let current = ctx.rows().current_definition(&id).await.unwrap().unwrap();
    let row = ctx.rows().character(&id).await.unwrap().unwrap();
    assert_eq!(row.name, current.card.data.name);
}
