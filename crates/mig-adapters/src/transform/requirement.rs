//! Issues de origen → requirements destino.

use mig_core::{render_rich_text, CustomPropertyEncoder};
use mig_domain::{ArtifactKind, ArtifactPayload, RequirementPayload, SourceRecord, StagedArtifact};

use super::{custom_field_date, custom_properties, estimate_points, first_component_id,
            fix_release_id, hierarchy_links, person_id, product_eligible, resolve_priority,
            resolve_status, resolve_type, RecordTransformer, TransformContext};

const KIND_KEY: &str = "requirements";

pub struct RequirementTransformer<'a> {
    tc: &'a TransformContext<'a>,
    encoder: CustomPropertyEncoder<'a>,
    current_type: &'a str,
}

impl<'a> RequirementTransformer<'a> {
    pub fn new(tc: &'a TransformContext<'a>, current_type: &'a str) -> Self {
        let kind = ArtifactKind::Requirement;
        let encoder = CustomPropertyEncoder::new(tc.ctx.property_definitions(kind),
                                                 tc.ctx.template_for(kind),
                                                 tc.renderer);
        Self { tc,
               encoder,
               current_type }
    }
}

impl RecordTransformer for RequirementTransformer<'_> {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Requirement
    }

    fn eligible(&self, record: &SourceRecord) -> bool {
        product_eligible(self.tc, KIND_KEY, self.current_type, record)
    }

    fn transform(&mut self, record: &SourceRecord) -> StagedArtifact {
        let tc = self.tc;
        let kind = ArtifactKind::Requirement;

        let payload = RequirementPayload {
            status_id:            resolve_status(tc, KIND_KEY, kind, record),
            requirement_type_id:  resolve_type(tc, KIND_KEY, kind, record),
            author_id:            person_id(tc, record, "reporter"),
            owner_id:             person_id(tc, record, "assignee"),
            importance_id:        resolve_priority(tc, KIND_KEY, kind, record),
            release_id:           fix_release_id(tc, record),
            component_id:         first_component_id(tc, record),
            name:                 record.summary().unwrap_or_default().to_string(),
            description:          render_rich_text(tc.renderer, record.description()),
            estimate_points:      estimate_points(record.aggregate_time_estimate()),
            start_date:           custom_field_date(tc, record, "Target start"),
            end_date:             custom_field_date(tc, record, "Target end"),
            percent_complete:     None,
            goal_id:              None,
            is_suspect:           false,
            custom_properties:    custom_properties(tc, &mut self.encoder, KIND_KEY, record),
        };

        let (parentlink, epiclink) = hierarchy_links(tc, record);
        StagedArtifact::with_links(ArtifactPayload::Requirement(payload), parentlink, epiclink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::run_pass;
    use crate::transform::tests::{fixture_context, issue, FixtureBundle};

    #[test]
    fn story_becomes_feature_requirement() {
        let bundle = FixtureBundle::standard();
        let tc = fixture_context(&bundle);
        let mut transformer = RequirementTransformer::new(&tc, "Story");

        let records = vec![issue("PROJ-1", "Story", serde_json::json!({
            "status": {"name": "In Progress"},
            "priority": {"name": "Highest"},
            "summary": "Login page",
            "description": "As a user...",
            "assignee": {"emailAddress": "dev@example.com"},
            "reporter": {"emailAddress": "po@example.com"},
            "aggregatetimeoriginalestimate": 28_800,
            "fixVersions": [{"name": "1.2"}],
            "components": [{"name": "UI"}],
            "customfield_200": "EPIC-1"
        }))];

        let staged = run_pass(&mut transformer, &records);
        assert_eq!(staged.len(), 1);
        let ArtifactPayload::Requirement(payload) = &staged[0].payload else {
            panic!("expected requirement payload");
        };
        assert_eq!(payload.requirement_type_id, 4);
        assert_eq!(payload.status_id, 2);
        assert_eq!(payload.importance_id, 1);
        assert_eq!(payload.release_id, Some(11));
        assert_eq!(payload.component_id, Some(21));
        assert_eq!(payload.estimate_points, Some(1.0));
        assert_eq!(payload.owner_id, Some(501));
        assert_eq!(payload.author_id, Some(502));
        // la clave de correlación viaja en las propiedades configurables
        assert!(payload.custom_properties
                       .iter()
                       .any(|p| p.string_value.as_deref() == Some("PROJ-1")));
        assert_eq!(staged[0].epiclink.as_deref(), Some("EPIC-1"));
    }

    #[test]
    fn records_of_other_types_or_captured_as_capabilities_are_skipped() {
        let bundle = FixtureBundle::with_capability("CAP-1");
        let tc = fixture_context(&bundle);
        let mut transformer = RequirementTransformer::new(&tc, "Story");

        let records = vec![issue("PROJ-1", "Bug", serde_json::json!({})),
                           issue("CAP-1", "Story", serde_json::json!({})),
                           issue("PROJ-2", "Story", serde_json::json!({}))];
        let staged = run_pass(&mut transformer, &records);
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].payload.display_name(), "");
    }

    #[test]
    fn null_priority_still_migrates_with_zero_importance() {
        let bundle = FixtureBundle::standard();
        let tc = fixture_context(&bundle);
        let mut transformer = RequirementTransformer::new(&tc, "Story");

        let records = vec![issue("PROJ-3", "Story", serde_json::json!({
            "priority": null,
            "summary": "Sin prioridad"
        }))];
        let staged = run_pass(&mut transformer, &records);
        assert_eq!(staged.len(), 1);
        let ArtifactPayload::Requirement(payload) = &staged[0].payload else {
            panic!("expected requirement payload");
        };
        assert_eq!(payload.importance_id, 0);
        assert_eq!(payload.name, "Sin prioridad");
    }
}
