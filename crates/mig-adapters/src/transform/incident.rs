//! Issues de origen → incidents destino.

use mig_core::{render_rich_text, CustomPropertyEncoder};
use mig_domain::{ArtifactKind, ArtifactPayload, IncidentPayload, SourceRecord, StagedArtifact};

use super::{component_ids, custom_field_date, custom_properties, hierarchy_links,
            incident_release_ids, person_id, product_eligible, resolve_priority, resolve_status,
            resolve_type, RecordTransformer, TransformContext};

const KIND_KEY: &str = "incidents";

pub struct IncidentTransformer<'a> {
    tc: &'a TransformContext<'a>,
    encoder: CustomPropertyEncoder<'a>,
    current_type: &'a str,
}

impl<'a> IncidentTransformer<'a> {
    pub fn new(tc: &'a TransformContext<'a>, current_type: &'a str) -> Self {
        let kind = ArtifactKind::Incident;
        let encoder = CustomPropertyEncoder::new(tc.ctx.property_definitions(kind),
                                                 tc.ctx.template_for(kind),
                                                 tc.renderer);
        Self { tc,
               encoder,
               current_type }
    }
}

impl RecordTransformer for IncidentTransformer<'_> {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Incident
    }

    fn eligible(&self, record: &SourceRecord) -> bool {
        product_eligible(self.tc, KIND_KEY, self.current_type, record)
    }

    fn transform(&mut self, record: &SourceRecord) -> StagedArtifact {
        let tc = self.tc;
        let kind = ArtifactKind::Incident;
        let (detected, resolved, verified) = incident_release_ids(tc, record);

        let payload = IncidentPayload {
            incident_status_id:   resolve_status(tc, KIND_KEY, kind, record),
            incident_type_id:     resolve_type(tc, KIND_KEY, kind, record),
            priority_id:          resolve_priority(tc, KIND_KEY, kind, record),
            opener_id:            person_id(tc, record, "reporter"),
            owner_id:             person_id(tc, record, "assignee"),
            detected_release_id:  detected,
            resolved_release_id:  resolved,
            verified_release_id:  verified,
            name:                 record.summary().unwrap_or_default().to_string(),
            description:          render_rich_text(tc.renderer, record.description()),
            start_date:           custom_field_date(tc, record, "Target start"),
            end_date:             custom_field_date(tc, record, "Target end"),
            component_ids:        component_ids(tc, record),
            custom_properties:    custom_properties(tc, &mut self.encoder, KIND_KEY, record),
        };

        let (parentlink, epiclink) = hierarchy_links(tc, record);
        StagedArtifact::with_links(ArtifactPayload::Incident(payload), parentlink, epiclink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::run_pass;
    use crate::transform::tests::{fixture_context, issue, FixtureBundle};
    use serde_json::json;

    #[test]
    fn bug_becomes_incident_with_release_split() {
        let bundle = FixtureBundle::standard();
        let tc = fixture_context(&bundle);
        let mut transformer = IncidentTransformer::new(&tc, "Bug");

        let records = vec![issue("PROJ-20", "Bug", json!({
            "status": {"name": "In Progress"},
            "priority": {"name": "Highest"},
            "summary": "Crash al guardar",
            "versions": [{"name": "1.2"}],
            "fixVersions": [{"name": "1.2.3"}],
            "resolution": null,
            "components": [{"name": "UI"}, {"name": "Backend"}]
        }))];

        let staged = run_pass(&mut transformer, &records);
        let ArtifactPayload::Incident(payload) = &staged[0].payload else {
            panic!("expected incident payload");
        };
        assert_eq!(payload.incident_type_id, 8);
        assert_eq!(payload.detected_release_id, Some(11));
        assert_eq!(payload.resolved_release_id, Some(12));
        assert_eq!(payload.verified_release_id, None);
        // incidents llevan todos los componentes, no solo el primero
        assert_eq!(payload.component_ids, vec![21, 22]);
    }
}
