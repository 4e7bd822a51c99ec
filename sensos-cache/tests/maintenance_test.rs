//! End-to-end maintenance scenarios against the in-memory store.

use chrono::{DateTime, TimeZone, Utc};
use sensos_cache::{ConsistencyEngine, MemoryStore, MetadataCache};
use sensos_core::{
    FeatureId, Observation, ObservationValue, OfferingId, PhenomenonTime, ProcedureId,
    SamplingGeometry, Scope, TimeInstant,
};
use std::sync::Arc;

fn ts(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
}

fn obs(id: &str, hour: u32) -> Observation {
    Observation::new(
        id,
        PhenomenonTime::instant(ts(hour)),
        TimeInstant::at(ts(hour)),
        ObservationValue::Quantity {
            value: 20.0,
            unit: Some("degC".to_string()),
        },
    )
    .with_procedure("proc-a")
    .with_feature("feat-1")
    .with_offering("off-a")
}

fn setup() -> (Arc<MemoryStore>, ConsistencyEngine) {
    let store = Arc::new(MemoryStore::new());
    let engine = ConsistencyEngine::new(Arc::new(MetadataCache::new()), store.clone());
    (store, engine)
}

/// Insert into the store and run insert-path maintenance.
async fn ingest(store: &MemoryStore, engine: &ConsistencyEngine, observation: Observation) {
    store.insert(observation.clone());
    let warnings = engine.observation_inserted(&observation).await;
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
}

/// Remove from the store first, then run deletion-path maintenance, so the
/// recompute queries observe post-deletion state.
async fn delete(store: &MemoryStore, engine: &ConsistencyEngine, id: &str) -> Observation {
    let removed = store
        .remove(&id.into())
        .expect("observation to delete must exist");
    engine
        .observation_deleted(&removed)
        .await
        .expect("deletion maintenance failed");
    removed
}

#[tokio::test]
async fn exact_aggregation_after_inserts_only() {
    let (store, engine) = setup();
    for (id, hour, x, y) in [("o1", 11, 2.0, 3.0), ("o2", 9, 7.0, 1.0), ("o3", 14, 4.0, 6.0)] {
        ingest(
            &store,
            &engine,
            obs(id, hour).with_sampling_geometry(SamplingGeometry::point(x, y)),
        )
        .await;
    }

    for scope in [
        Scope::Global,
        Scope::Offering(OfferingId::new("off-a")),
        Scope::Procedure(ProcedureId::new("proc-a")),
        Scope::Feature(FeatureId::new("feat-1")),
    ] {
        let extrema = engine.cache().temporal_extrema(&scope).unwrap();
        assert_eq!(extrema.phenomenon_min, Some(ts(9)), "scope {}", scope);
        assert_eq!(extrema.phenomenon_max, Some(ts(14)), "scope {}", scope);
        assert_eq!(extrema.result_min, Some(ts(9)), "scope {}", scope);
        assert_eq!(extrema.result_max, Some(ts(14)), "scope {}", scope);

        let env = engine.cache().envelope(&scope).unwrap();
        assert_eq!(
            (env.min_x, env.min_y, env.max_x, env.max_y),
            (2.0, 1.0, 7.0, 6.0),
            "scope {}",
            scope
        );
    }
}

#[tokio::test]
async fn boundary_delete_triggers_exact_recompute() {
    let (store, engine) = setup();
    for (id, hour) in [("o1", 10), ("o2", 11), ("o3", 12)] {
        ingest(&store, &engine, obs(id, hour)).await;
    }
    let offering = Scope::Offering(OfferingId::new("off-a"));

    // Deleting the 12:00 observation: cached max equals it, recompute
    // must land on 11:00.
    delete(&store, &engine, "o3").await;
    for scope in [Scope::Global, offering.clone()] {
        let extrema = engine.cache().temporal_extrema(&scope).unwrap();
        assert_eq!(extrema.phenomenon_max, Some(ts(11)), "scope {}", scope);
        assert_eq!(extrema.phenomenon_min, Some(ts(10)), "scope {}", scope);
        assert_eq!(extrema.result_max, Some(ts(11)), "scope {}", scope);
    }

    // Deleting the 10:00 observation afterward: now equal to cached min.
    delete(&store, &engine, "o1").await;
    for scope in [Scope::Global, offering] {
        let extrema = engine.cache().temporal_extrema(&scope).unwrap();
        assert_eq!(extrema.phenomenon_min, Some(ts(11)), "scope {}", scope);
        assert_eq!(extrema.phenomenon_max, Some(ts(11)), "scope {}", scope);
    }
}

#[tokio::test]
async fn non_boundary_delete_is_a_noop_on_the_cache() {
    let (store, engine) = setup();
    ingest(
        &store,
        &engine,
        obs("o1", 10).with_sampling_geometry(SamplingGeometry::point(0.0, 0.0)),
    )
    .await;
    ingest(
        &store,
        &engine,
        obs("o2", 11).with_sampling_geometry(SamplingGeometry::point(5.0, 5.0)),
    )
    .await;
    ingest(
        &store,
        &engine,
        obs("o3", 12).with_sampling_geometry(SamplingGeometry::point(10.0, 10.0)),
    )
    .await;

    let before = engine.cache().snapshot();
    let stats_before = engine.cache().stats();

    // o2 witnesses no extremum and sits strictly inside the envelope.
    delete(&store, &engine, "o2").await;

    assert_eq!(engine.cache().snapshot(), before);
    let stats = engine.cache().stats();
    assert_eq!(stats.field_recomputes, stats_before.field_recomputes);
    assert_eq!(stats.envelope_recomputes, stats_before.envelope_recomputes);
    assert!(stats.envelope_checks_skipped > stats_before.envelope_checks_skipped);
}

#[tokio::test]
async fn envelope_contraction_on_boundary_witness_delete() {
    let (store, engine) = setup();
    ingest(
        &store,
        &engine,
        obs("o1", 10)
            .with_feature("feat-1")
            .with_sampling_geometry(SamplingGeometry::point(0.0, 0.0)),
    )
    .await;
    ingest(
        &store,
        &engine,
        Observation::new(
            "o2",
            PhenomenonTime::instant(ts(11)),
            TimeInstant::at(ts(11)),
            ObservationValue::Count(1),
        )
        .with_procedure("proc-a")
        .with_feature("feat-2")
        .with_offering("off-a")
        .with_sampling_geometry(SamplingGeometry::point(7.0, 8.0)),
    )
    .await;
    ingest(
        &store,
        &engine,
        Observation::new(
            "o3",
            PhenomenonTime::instant(ts(12)),
            TimeInstant::at(ts(12)),
            ObservationValue::Count(1),
        )
        .with_procedure("proc-a")
        .with_feature("feat-3")
        .with_offering("off-a")
        .with_sampling_geometry(SamplingGeometry::point(10.0, 10.0)),
    )
    .await;

    let global = engine.cache().envelope(&Scope::Global).unwrap();
    assert_eq!((global.min_x, global.min_y, global.max_x, global.max_y), (0.0, 0.0, 10.0, 10.0));

    // feat-3 is the only feature touching x = 10; removing its last
    // witnessing observation must shrink the envelope to the remainder.
    delete(&store, &engine, "o3").await;

    for scope in [Scope::Global, Scope::Offering(OfferingId::new("off-a"))] {
        let env = engine.cache().envelope(&scope).unwrap();
        assert_eq!(
            (env.min_x, env.min_y, env.max_x, env.max_y),
            (0.0, 0.0, 7.0, 8.0),
            "scope {}",
            scope
        );
    }
}

#[tokio::test]
async fn association_cleanup_on_last_witness_only() {
    let (store, engine) = setup();
    ingest(&store, &engine, obs("o1", 10)).await;
    ingest(&store, &engine, obs("o2", 11)).await;

    let feature = FeatureId::new("feat-1");
    let offering = OfferingId::new("off-a");
    let procedure = ProcedureId::new("proc-a");

    // A non-last delete preserves the pairing.
    delete(&store, &engine, "o1").await;
    assert!(engine.cache().has_offering_association(&feature, &offering));
    assert!(engine.cache().has_procedure_association(&feature, &procedure));

    // The last witness going away removes it.
    delete(&store, &engine, "o2").await;
    assert!(!engine.cache().has_offering_association(&feature, &offering));
    assert!(!engine.cache().has_procedure_association(&feature, &procedure));
}

#[tokio::test]
async fn deletion_pass_is_idempotent_against_unchanged_store() {
    let (store, engine) = setup();
    for (id, hour, x, y) in [("o1", 10, 0.0, 0.0), ("o2", 11, 5.0, 5.0), ("o3", 12, 10.0, 10.0)] {
        ingest(
            &store,
            &engine,
            obs(id, hour).with_sampling_geometry(SamplingGeometry::point(x, y)),
        )
        .await;
    }

    let removed = delete(&store, &engine, "o3").await;
    let after_first = engine.cache().snapshot();

    // Replay the same pass, as after a crash before the cache write was
    // considered durable. The store is unchanged.
    engine.observation_deleted(&removed).await.unwrap();
    assert_eq!(engine.cache().snapshot(), after_first);
}

#[tokio::test]
async fn cached_bounds_are_never_tighter_than_truth() {
    let (store, engine) = setup();
    let points = [
        ("o1", 10, 0.0, 0.0),
        ("o2", 11, 5.0, 5.0),
        ("o3", 12, 10.0, 10.0),
        ("o4", 9, 3.0, 9.0),
        ("o5", 13, 8.0, 2.0),
    ];
    let mut live: Vec<Observation> = Vec::new();
    for (id, hour, x, y) in points {
        let observation = obs(id, hour).with_sampling_geometry(SamplingGeometry::point(x, y));
        live.push(observation.clone());
        ingest(&store, &engine, observation).await;
        assert_conservative(&engine, &live);
    }

    for id in ["o5", "o2", "o4"] {
        let removed = delete(&store, &engine, id).await;
        live.retain(|o| o.id != removed.id);
        assert_conservative(&engine, &live);
    }
}

fn assert_conservative(engine: &ConsistencyEngine, live: &[Observation]) {
    let truth_min = live.iter().filter_map(|o| o.phenomenon_time.min_position()).min();
    let truth_max = live.iter().filter_map(|o| o.phenomenon_time.max_position()).max();
    let extrema = engine.cache().temporal_extrema(&Scope::Global).unwrap_or_default();
    if let (Some(cached), Some(truth)) = (extrema.phenomenon_min, truth_min) {
        assert!(cached <= truth, "cached min {} tighter than truth {}", cached, truth);
    }
    if let (Some(cached), Some(truth)) = (extrema.phenomenon_max, truth_max) {
        assert!(cached >= truth, "cached max {} tighter than truth {}", cached, truth);
    }

    let truth_env = live
        .iter()
        .filter_map(|o| o.sampling_geometry.as_ref().and_then(|g| g.envelope()))
        .reduce(|acc, e| acc.union(&e));
    if let Some(truth) = truth_env {
        let cached = engine
            .cache()
            .envelope(&Scope::Global)
            .expect("cached envelope missing while observations have geometry");
        assert!(cached.contains(&truth), "cached {} does not cover truth {}", cached, truth);
    }
}

#[tokio::test]
async fn delete_without_identity_fields_is_fatal() {
    let (store, engine) = setup();
    ingest(&store, &engine, obs("o1", 10)).await;

    let orphan = Observation::new(
        "o-x",
        PhenomenonTime::instant(ts(10)),
        TimeInstant::at(ts(10)),
        ObservationValue::Count(1),
    );
    let err = engine.observation_deleted(&orphan).await.unwrap_err();
    assert!(
        matches!(err, sensos_cache::CacheError::InconsistentState(_)),
        "unexpected error: {}",
        err
    );
}

#[tokio::test]
async fn indeterminate_times_never_witness_extrema() {
    let (store, engine) = setup();
    ingest(&store, &engine, obs("o1", 10)).await;

    let indeterminate = Observation::new(
        "o2",
        PhenomenonTime::Instant(TimeInstant::indeterminate(
            sensos_core::IndeterminateTime::Now,
        )),
        TimeInstant::indeterminate(sensos_core::IndeterminateTime::Unknown),
        ObservationValue::Count(1),
    )
    .with_procedure("proc-a")
    .with_feature("feat-1")
    .with_offering("off-a");
    store.insert(indeterminate.clone());
    engine.observation_inserted(&indeterminate).await;

    let before = engine.cache().temporal_extrema(&Scope::Global).unwrap();
    assert_eq!(before.phenomenon_min, Some(ts(10)));

    store.remove(&indeterminate.id);
    engine.observation_deleted(&indeterminate).await.unwrap();
    assert_eq!(engine.cache().temporal_extrema(&Scope::Global).unwrap(), before);
}

#[tokio::test]
async fn rebuild_matches_incrementally_built_cache() {
    let observations = [
        obs("o1", 10).with_sampling_geometry(SamplingGeometry::point(1.0, 2.0)),
        obs("o2", 12).with_sampling_geometry(SamplingGeometry::point(6.0, 3.0)),
        Observation::new(
            "o3",
            PhenomenonTime::period(ts(8), ts(9)),
            TimeInstant::at(ts(9)),
            ObservationValue::Text("calm".to_string()),
        )
        .with_procedure("proc-b")
        .with_feature("feat-2")
        .with_offering("off-b"),
    ];

    let (store_a, incremental) = setup();
    for observation in &observations {
        ingest(&store_a, &incremental, observation.clone()).await;
    }

    let store_b = Arc::new(MemoryStore::new());
    for observation in &observations {
        store_b.insert(observation.clone());
    }
    let cold = ConsistencyEngine::new(Arc::new(MetadataCache::new()), store_b);
    let warnings = cold.rebuild().await.unwrap();
    assert!(warnings.is_empty());

    assert_eq!(cold.cache().snapshot(), incremental.cache().snapshot());
}
