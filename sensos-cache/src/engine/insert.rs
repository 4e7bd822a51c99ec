//! Insertion-path expansion

use crate::cache::MetadataCache;
use crate::error::MaintenanceWarning;
use crate::store::TimeField;
use sensos_core::{Observation, Scope};

/// Expand every scope touched by a newly committed observation.
///
/// Associations are created optimistically: a fresh insert is itself the
/// witness, so no existence query is issued (unlike deletion-time pruning).
pub(crate) fn apply(cache: &MetadataCache, observation: &Observation) -> Vec<MaintenanceWarning> {
    let mut warnings = Vec::new();

    let mut scopes = vec![Scope::Global];
    match &observation.procedure {
        Some(procedure) => scopes.push(Scope::Procedure(procedure.clone())),
        None => warnings.push(MaintenanceWarning::MissingIdentity {
            observation: observation.id.clone(),
            message: "no procedure; procedure scope skipped".to_string(),
        }),
    }
    match &observation.feature {
        Some(feature) => scopes.push(Scope::Feature(feature.clone())),
        None => warnings.push(MaintenanceWarning::MissingIdentity {
            observation: observation.id.clone(),
            message: "no feature of interest; feature scope and associations skipped".to_string(),
        }),
    }
    scopes.extend(observation.offerings.iter().cloned().map(Scope::Offering));

    let envelope = match observation.sampling_geometry.as_ref() {
        Some(geometry) => {
            let envelope = geometry.envelope();
            if envelope.is_none() {
                warnings.push(MaintenanceWarning::UnsupportedGeometry {
                    observation: observation.id.clone(),
                    message: "sampling geometry has no bounding envelope".to_string(),
                });
            }
            envelope
        }
        None => None,
    };

    for scope in &scopes {
        for field in TimeField::ALL {
            if let Some(candidate) = field.candidate_from(observation) {
                cache.expand_time_field(scope, field, candidate);
            }
        }
        if let Some(envelope) = &envelope {
            cache.expand_envelope(scope, envelope);
        }
    }

    if let Some(feature) = &observation.feature {
        if let Some(procedure) = &observation.procedure {
            cache.add_procedure_association(feature, procedure);
        }
        for offering in &observation.offerings {
            cache.add_offering_association(feature, offering);
        }
    }

    tracing::debug!(
        observation = %observation.id,
        scopes = scopes.len(),
        "cache expanded for insert"
    );

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use sensos_core::{
        FeatureId, ObservationValue, OfferingId, PhenomenonTime, ProcedureId, SamplingGeometry,
        TimeInstant,
    };

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
    }

    fn obs(id: &str, hour: u32) -> Observation {
        Observation::new(
            id,
            PhenomenonTime::instant(ts(hour)),
            TimeInstant::at(ts(hour)),
            ObservationValue::Count(1),
        )
        .with_procedure("proc-a")
        .with_feature("feat-1")
        .with_offering("off-a")
    }

    #[test]
    fn test_expands_all_touched_scopes() {
        let cache = MetadataCache::new();
        let warnings = apply(&cache, &obs("o1", 10));
        assert!(warnings.is_empty());

        for scope in [
            Scope::Global,
            Scope::Procedure(ProcedureId::new("proc-a")),
            Scope::Feature(FeatureId::new("feat-1")),
            Scope::Offering(OfferingId::new("off-a")),
        ] {
            let extrema = cache.temporal_extrema(&scope).unwrap();
            assert_eq!(extrema.phenomenon_min, Some(ts(10)), "scope {}", scope);
            assert_eq!(extrema.phenomenon_max, Some(ts(10)), "scope {}", scope);
        }
        assert!(cache.has_procedure_association(
            &FeatureId::new("feat-1"),
            &ProcedureId::new("proc-a")
        ));
    }

    #[test]
    fn test_period_expands_min_and_max() {
        let cache = MetadataCache::new();
        let observation = Observation::new(
            "o1",
            PhenomenonTime::period(ts(9), ts(13)),
            TimeInstant::at(ts(13)),
            ObservationValue::Count(1),
        )
        .with_procedure("proc-a")
        .with_feature("feat-1");
        apply(&cache, &observation);

        let extrema = cache.temporal_extrema(&Scope::Global).unwrap();
        assert_eq!(extrema.phenomenon_min, Some(ts(9)));
        assert_eq!(extrema.phenomenon_max, Some(ts(13)));
    }

    #[test]
    fn test_missing_identity_skips_scope_with_warning() {
        let cache = MetadataCache::new();
        let observation = Observation::new(
            "o1",
            PhenomenonTime::instant(ts(10)),
            TimeInstant::at(ts(10)),
            ObservationValue::Count(1),
        )
        .with_offering("off-a");
        let warnings = apply(&cache, &observation);

        assert_eq!(warnings.len(), 2);
        // Global and offering scopes are still expanded.
        assert!(cache.temporal_extrema(&Scope::Global).is_some());
        assert!(cache
            .temporal_extrema(&Scope::Offering(OfferingId::new("off-a")))
            .is_some());
    }

    #[test]
    fn test_geometry_expands_envelope() {
        let cache = MetadataCache::new();
        let observation = obs("o1", 10).with_sampling_geometry(SamplingGeometry::point(3.0, 4.0));
        apply(&cache, &observation);
        let observation = obs("o2", 11).with_sampling_geometry(SamplingGeometry::point(7.0, 2.0));
        apply(&cache, &observation);

        let env = cache.envelope(&Scope::Global).unwrap();
        assert_eq!((env.min_x, env.min_y, env.max_x, env.max_y), (3.0, 2.0, 7.0, 4.0));
    }
}
