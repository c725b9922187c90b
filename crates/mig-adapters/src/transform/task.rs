//! Subtareas de origen → tasks destino.

use mig_core::{render_rich_text, CustomPropertyEncoder};
use mig_domain::{ArtifactKind, ArtifactPayload, SourceRecord, StagedArtifact, TaskPayload};

use super::{custom_field_date, custom_properties, fix_release_id, person_id, product_eligible,
            resolve_priority, resolve_status, resolve_type, RecordTransformer, TransformContext};

const KIND_KEY: &str = "tasks";

pub struct TaskTransformer<'a> {
    tc: &'a TransformContext<'a>,
    encoder: CustomPropertyEncoder<'a>,
    current_type: &'a str,
}

impl<'a> TaskTransformer<'a> {
    pub fn new(tc: &'a TransformContext<'a>, current_type: &'a str) -> Self {
        let kind = ArtifactKind::Task;
        let encoder = CustomPropertyEncoder::new(tc.ctx.property_definitions(kind),
                                                 tc.ctx.template_for(kind),
                                                 tc.renderer);
        Self { tc,
               encoder,
               current_type }
    }

    /// Requirement padre: 0 cuando el origen no tiene padre, `None` cuando
    /// lo tiene pero todavía no está correlacionado en destino.
    fn parent_requirement_id(&self, record: &SourceRecord) -> Option<i64> {
        match record.parent_key() {
            Some(parent_key) => {
                self.tc.requirement_index.find(parent_key).map(|a| a.primary_id)
            }
            None => Some(0),
        }
    }
}

impl RecordTransformer for TaskTransformer<'_> {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Task
    }

    fn eligible(&self, record: &SourceRecord) -> bool {
        product_eligible(self.tc, KIND_KEY, self.current_type, record)
    }

    fn transform(&mut self, record: &SourceRecord) -> StagedArtifact {
        let tc = self.tc;
        let kind = ArtifactKind::Task;

        let payload = TaskPayload {
            task_status_id:     resolve_status(tc, KIND_KEY, kind, record),
            task_type_id:       resolve_type(tc, KIND_KEY, kind, record),
            requirement_id:     self.parent_requirement_id(record),
            release_id:         fix_release_id(tc, record),
            creator_id:         person_id(tc, record, "reporter"),
            owner_id:           person_id(tc, record, "assignee"),
            task_priority_id:   resolve_priority(tc, KIND_KEY, kind, record),
            name:               record.summary().unwrap_or_default().to_string(),
            description:        render_rich_text(tc.renderer, record.description()),
            start_date:         custom_field_date(tc, record, "Target start"),
            end_date:           custom_field_date(tc, record, "Target end"),
            completion_percent: 0,
            estimated_effort:   None,
            actual_effort:      None,
            remaining_effort:   None,
            custom_properties:  custom_properties(tc, &mut self.encoder, KIND_KEY, record),
        };

        StagedArtifact::new(ArtifactPayload::Task(payload))
    }
}
