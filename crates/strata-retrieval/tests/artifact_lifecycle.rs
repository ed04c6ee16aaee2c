//! End-to-end coverage of the build → query → tombstone → reload lifecycle,
//! plus the cross-file invariants a single unit test can't exercise.

use std::fs;
use std::path::Path;

use strata_config::BuildConfig;
use strata_retrieval::builder::ArtifactBuilder;
use strata_retrieval::manifest::Manifest;
use strata_retrieval::pipeline::normalize_scores_for_display;

fn write_corpus(dir: &Path) {
    fs::write(
        dir.join("alpha.txt"),
        "Strata keeps a local chunk store and a BM25 index. \
         The chunk store is append-only and compressed with zstd.",
    )
    .unwrap();
    fs::write(
        dir.join("beta.txt"),
        "BM25 ranks chunks by term frequency and inverse document frequency. \
         Scores can be negative for queries dominated by common terms.",
    )
    .unwrap();
    fs::write(
        dir.join("gamma.pdf"),
        "pretend pdf bytes, routed but not decoded",
    )
    .unwrap();
}

fn small_chunk_config() -> BuildConfig {
    BuildConfig {
        chunk_size: 8,
        chunk_overlap: 2,
        ..Default::default()
    }
}

#[test]
fn s1_build_then_query_finds_relevant_chunks() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());

    let builder = ArtifactBuilder::new(small_chunk_config());
    let (artifact, metrics) = builder.build(corpus.path(), artifact_dir.path()).unwrap();

    // alpha.txt and beta.txt parse; gamma.pdf is routed but unsupported, so it's
    // skipped rather than decoded.
    assert_eq!(metrics.documents_parsed, 2);
    assert_eq!(metrics.documents_skipped, 1);
    assert!(metrics.chunks_written > 0);

    let pipeline = artifact.pipeline();
    let results = pipeline.retrieve("bm25 index", 5).unwrap();
    assert!(!results.is_empty());
    assert!(results
        .iter()
        .any(|r| r.matched_terms.contains(&"bm25".to_string())));
}

#[test]
fn s2_build_then_reload_round_trips_manifest_and_scores() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());

    let builder = ArtifactBuilder::new(small_chunk_config());
    let (built, _) = builder.build(corpus.path(), artifact_dir.path()).unwrap();
    let expected = built.pipeline().retrieve_ids("negative scores", 5);

    let reloaded = builder.load(artifact_dir.path(), true).unwrap();
    let actual = reloaded.pipeline().retrieve_ids("negative scores", 5);

    assert_eq!(expected, actual);
}

#[test]
fn s3_tombstoned_document_disappears_after_reload() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());

    let builder = ArtifactBuilder::new(small_chunk_config());
    let (mut artifact, _) = builder.build(corpus.path(), artifact_dir.path()).unwrap();

    let live_before = artifact.store().live_chunk_ids();
    assert!(!live_before.is_empty());

    // Tombstone every chunk belonging to the first document we see.
    let doc_uid = {
        let chunk = artifact
            .store()
            .read_chunk(&live_before[0])
            .unwrap()
            .unwrap();
        chunk.doc_uid
    };
    artifact.store_mut().tombstone_document(&doc_uid).unwrap();
    artifact.store_mut().flush_docs_meta().unwrap();

    let reloaded = builder.load(artifact_dir.path(), false).unwrap();
    let live_after = reloaded.store().live_chunk_ids();
    assert!(live_after.len() < live_before.len());
    for chunk_id in &live_after {
        let chunk = reloaded.store().read_chunk(chunk_id).unwrap().unwrap();
        assert_ne!(chunk.doc_uid, doc_uid);
    }
}

#[test]
fn s4_strict_load_rejects_a_tampered_artifact_directory() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());

    let builder = ArtifactBuilder::new(small_chunk_config());
    builder.build(corpus.path(), artifact_dir.path()).unwrap();

    let manifest = Manifest::load(&artifact_dir.path().join("manifest.json")).unwrap();
    manifest.verify(artifact_dir.path()).unwrap();

    fs::write(artifact_dir.path().join("docs.meta"), b"{}").unwrap();
    assert!(manifest.verify(artifact_dir.path()).is_err());
    assert!(builder.load(artifact_dir.path(), true).is_err());
}

#[test]
fn s5_normalization_is_idempotent_across_the_whole_pipeline() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    fs::write(
        corpus.path().join("messy.txt"),
        "Weird   spacing\t\tand\r\nline endings\r\n\r\nacross   pages.",
    )
    .unwrap();

    let builder = ArtifactBuilder::new(small_chunk_config());
    let (artifact, _) = builder.build(corpus.path(), artifact_dir.path()).unwrap();

    for chunk_id in artifact.store().live_chunk_ids() {
        let chunk = artifact.store().read_chunk(&chunk_id).unwrap().unwrap();
        assert!(!chunk.text.contains('\r'));
        assert!(!chunk.text.contains("  "));
        assert!(!chunk.text.contains('\t'));
    }
}

#[test]
fn s6_display_normalization_never_changes_relative_order() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());

    let builder = ArtifactBuilder::new(small_chunk_config());
    let (artifact, _) = builder.build(corpus.path(), artifact_dir.path()).unwrap();

    let results = artifact.pipeline().retrieve("bm25 common terms", 10).unwrap();
    assert!(results.len() > 1);

    let raw_scores: Vec<f32> = results.iter().map(|r| r.score.value()).collect();
    let display_scores = normalize_scores_for_display(&results);

    assert!(display_scores.iter().all(|&s| s >= 0.0));
    for pair in raw_scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
    for pair in display_scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[test]
fn fetch_chunks_silently_skips_unknown_ids() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());

    let builder = ArtifactBuilder::new(small_chunk_config());
    let (artifact, _) = builder.build(corpus.path(), artifact_dir.path()).unwrap();

    let mut ids = artifact.store().live_chunk_ids();
    ids.push("0000000000000000".to_string());

    let chunks = artifact.pipeline().fetch_chunks(&ids).unwrap();
    assert_eq!(chunks.len(), ids.len() - 1);
}

#[test]
fn concurrent_builds_against_the_same_directory_are_serialized() {
    let corpus = tempfile::tempdir().unwrap();
    let artifact_dir = tempfile::tempdir().unwrap();
    write_corpus(corpus.path());
    fs::create_dir_all(artifact_dir.path()).unwrap();

    let lock = strata_retrieval::lock::ArtifactLock::acquire(artifact_dir.path()).unwrap();
    let builder = ArtifactBuilder::new(small_chunk_config());
    assert!(builder.build(corpus.path(), artifact_dir.path()).is_err());
    drop(lock);

    assert!(builder.build(corpus.path(), artifact_dir.path()).is_ok());
}
