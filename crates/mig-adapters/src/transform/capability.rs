//! Issues de origen → capabilities a nivel de programa.
//!
//! La pasada de capabilities corre antes que las de producto: lo que captura
//! queda excluido de requirements/tasks/incidents en las pasadas siguientes.

use log::warn;
use mig_core::{render_rich_text, CustomPropertyEncoder, TypeMappingResolver};
use mig_domain::{ArtifactKind, ArtifactPayload, CapabilityPayload, SourceRecord, StagedArtifact};

use super::{custom_properties, hierarchy_links, person_id, resolve_priority, resolve_status,
            resolve_type, version_name, RecordTransformer, TransformContext};

const KIND_KEY: &str = "capabilities";

pub struct CapabilityTransformer<'a> {
    tc: &'a TransformContext<'a>,
    encoder: CustomPropertyEncoder<'a>,
    current_type: &'a str,
}

impl<'a> CapabilityTransformer<'a> {
    pub fn new(tc: &'a TransformContext<'a>, current_type: &'a str) -> Self {
        let kind = ArtifactKind::Capability;
        let encoder = CustomPropertyEncoder::new(tc.ctx.property_definitions(kind),
                                                 tc.ctx.template_for(kind),
                                                 tc.renderer);
        Self { tc,
               encoder,
               current_type }
    }

    /// Milestone destino desde la primera fix version del registro.
    fn milestone_id(&self, record: &SourceRecord) -> Option<i64> {
        let affected = record.affected_versions();
        if !affected.is_empty() {
            let names: Vec<&str> = affected.iter().filter_map(|v| version_name(v)).collect();
            warn!("{}: affected versions are not migrated for capabilities: {names:?}",
                  record.key().unwrap_or("(no key)"));
        }
        let fixes = record.fix_versions();
        if fixes.len() > 1 {
            let names: Vec<&str> = fixes[1..].iter().filter_map(|v| version_name(v)).collect();
            warn!("{}: only one fix version is supported, not handled: {names:?}",
                  record.key().unwrap_or("(no key)"));
        }
        self.tc.ctx.milestone_id_by_name(version_name(fixes.first()?)?)
    }
}

impl RecordTransformer for CapabilityTransformer<'_> {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Capability
    }

    /// A diferencia de las pasadas de producto, acá no hay exclusión por
    /// captura previa: esta pasada es la que captura.
    fn eligible(&self, record: &SourceRecord) -> bool {
        let Some(issue_type) = record.issue_type() else {
            return false;
        };
        if issue_type != self.current_type {
            return false;
        }
        self.tc
            .config
            .types_for(KIND_KEY)
            .map(|table| TypeMappingResolver::mapped_target_type_name(table, issue_type).is_some())
            .unwrap_or(false)
    }

    fn transform(&mut self, record: &SourceRecord) -> StagedArtifact {
        let tc = self.tc;
        let kind = ArtifactKind::Capability;

        let payload = CapabilityPayload {
            milestone_id:      self.milestone_id(record),
            status_id:         resolve_status(tc, KIND_KEY, kind, record),
            type_id:           resolve_type(tc, KIND_KEY, kind, record),
            priority_id:       resolve_priority(tc, KIND_KEY, kind, record),
            name:              record.summary().unwrap_or_default().to_string(),
            description:       render_rich_text(tc.renderer, record.description()),
            creator_id:        person_id(tc, record, "reporter"),
            owner_id:          person_id(tc, record, "assignee"),
            custom_properties: custom_properties(tc, &mut self.encoder, KIND_KEY, record),
        };

        let (parentlink, epiclink) = hierarchy_links(tc, record);
        StagedArtifact::with_links(ArtifactPayload::Capability(payload), parentlink, epiclink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::run_pass;
    use crate::transform::tests::{fixture_context, issue, FixtureBundle};
    use serde_json::json;

    #[test]
    fn initiative_becomes_capability_with_milestone() {
        let bundle = FixtureBundle::standard();
        let tc = fixture_context(&bundle);
        let mut transformer = CapabilityTransformer::new(&tc, "Initiative");

        let records = vec![issue("INIT-1", "Initiative", json!({
                               "status": {"name": "In Progress"},
                               "priority": {"name": "Highest"},
                               "summary": "Plataforma de pagos",
                               "fixVersions": [{"name": "1.2"}]
                           })),
                           issue("PROJ-1", "Story", json!({}))];

        let staged = run_pass(&mut transformer, &records);
        assert_eq!(staged.len(), 1);
        let ArtifactPayload::Capability(payload) = &staged[0].payload else {
            panic!("expected capability payload");
        };
        assert_eq!(payload.type_id, 9);
        assert_eq!(payload.milestone_id, Some(31));
        assert_eq!(payload.status_id, 2);
    }

    #[test]
    fn capability_custom_properties_skip_product_template() {
        let bundle = FixtureBundle::standard();
        let tc = fixture_context(&bundle);
        let mut transformer = CapabilityTransformer::new(&tc, "Initiative");

        let records = vec![issue("INIT-2", "Initiative", json!({"summary": "x"}))];
        let staged = run_pass(&mut transformer, &records);
        let properties = staged[0].payload.custom_properties().unwrap();
        // la correlación viaja igual, pero sin template de producto
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].definition.project_template_id, None);
    }
}
