//! Aplicador por lotes: del documento de staging al destino, en orden, con
//! aislamiento de fallos por registro.
//!
//! Una escritura rechazada descuenta el éxito, guarda diagnóstico con el
//! payload completo y sigue con el registro siguiente. Solo un fallo de
//! setup (antes del lote) aborta la corrida.

use log::{debug, info, warn};
use serde_json::Value;

use crate::clients::ArtifactWriter;
use crate::correlate::CorrelationIndex;
use crate::hierarchy::{classify, HierarchyResolver, ReleaseRole, ReleaseTable};
use mig_domain::{ArtifactPayload, FailureDiagnostic, MigrationResult, StagedArtifact};

/// Carpeta de documentos donde se cuelgan los adjuntos migrados.
pub const ATTACHMENTS_FOLDER: &str = "Attachments";

/// Aplicador de una pasada. Los índices vienen del snapshot tomado al inicio
/// de la pasada; las escrituras de esta misma pasada no los actualizan.
pub struct BatchApplier<'a> {
    index: &'a CorrelationIndex,
    capability_index: &'a CorrelationIndex,
    correlation_property: &'a str,
}

impl<'a> BatchApplier<'a> {
    pub fn new(index: &'a CorrelationIndex,
               capability_index: &'a CorrelationIndex,
               correlation_property: &'a str)
               -> Self {
        Self { index,
               capability_index,
               correlation_property }
    }

    /// Clave de correlación embebida en el payload de un artefacto staged.
    fn staged_key(&self, staged: &StagedArtifact) -> Option<String> {
        staged.payload
              .custom_properties()?
              .iter()
              .find(|p| p.definition.name == self.correlation_property)
              .and_then(|p| p.string_value.clone())
    }

    fn payload_value(staged: &StagedArtifact) -> Value {
        serde_json::to_value(staged).unwrap_or(Value::Null)
    }

    /// Aplica el lote en orden. Los registros cuya clave ya existe en el
    /// destino se saltan antes de contar el intento: una segunda corrida
    /// sobre el mismo export no crea nada.
    pub fn apply(&self, writer: &mut dyn ArtifactWriter, staged: &[StagedArtifact]) -> MigrationResult {
        let eligible: Vec<&StagedArtifact> =
            staged.iter()
                  .filter(|s| match self.staged_key(s) {
                              Some(key) if self.index.contains(&key) => {
                                  debug!("'{key}' already present in target, skipping");
                                  false
                              }
                              _ => true,
                          })
                  .collect();
        let skipped = staged.len() - eligible.len();
        if skipped > 0 {
            info!("{skipped} record(s) already migrated, skipped");
        }

        let resolver = HierarchyResolver::new(self.index);
        let capability_resolver = HierarchyResolver::new(self.capability_index);
        let mut result = MigrationResult::new(eligible.len());
        let mut attachments_folder: Option<i64> = None;

        for artifact in eligible {
            let key = self.staged_key(artifact);
            let parent_id = match &artifact.payload {
                ArtifactPayload::Requirement(_) => {
                    resolver.resolve_requirement_parent(artifact.epiclink.as_deref(),
                                                        artifact.parentlink.as_deref())
                }
                _ => None,
            };

            // Documento staged sin carpeta resuelta: la carpeta de adjuntos
            // no existía en el snapshot y se crea la primera vez que hace
            // falta, una sola vez por lote.
            let mut patched = None;
            if let ArtifactPayload::Document(doc) = &artifact.payload {
                if doc.folder_id == 0 {
                    let folder_id = match attachments_folder {
                        Some(id) => id,
                        None => match writer.create_document_folder(ATTACHMENTS_FOLDER) {
                            Ok(id) => {
                                attachments_folder = Some(id);
                                id
                            }
                            Err(err) => {
                                warn!("folder creation failed for '{}': {err}",
                                      artifact.payload.display_name());
                                result.record_failure(FailureDiagnostic {
                                    stage:   "folder".into(),
                                    key,
                                    message: err.to_string(),
                                    payload: Self::payload_value(artifact),
                                });
                                continue;
                            }
                        },
                    };
                    let mut staged_doc = artifact.clone();
                    if let ArtifactPayload::Document(doc) = &mut staged_doc.payload {
                        doc.folder_id = folder_id;
                    }
                    patched = Some(staged_doc);
                }
            }

            let created = match writer.create(patched.as_ref().unwrap_or(artifact), parent_id) {
                Ok(created) => created,
                Err(err) => {
                    warn!("create failed for '{}': {err}", artifact.payload.display_name());
                    result.record_failure(FailureDiagnostic { stage: "create".into(),
                                                              key,
                                                              message: err.to_string(),
                                                              payload:
                                                                  Self::payload_value(artifact) });
                    continue;
                }
            };

            // Vínculo a capability: solo requirements, post-creación, con el
            // padre directo por delante del epic.
            if matches!(artifact.payload, ArtifactPayload::Requirement(_)) {
                let capability_id =
                    capability_resolver.resolve_capability_link(artifact.epiclink.as_deref(),
                                                                artifact.parentlink.as_deref());
                if let Some(capability_id) = capability_id {
                    if let Err(err) = writer.associate_capability(capability_id, created.id) {
                        warn!("capability association failed for '{}': {err}",
                              artifact.payload.display_name());
                        result.record_side_failure(FailureDiagnostic {
                            stage:   "associate".into(),
                            key,
                            message: err.to_string(),
                            payload: Self::payload_value(artifact),
                        });
                    }
                }
            }
        }
        result
    }

    /// Aplica releases en dos fases: primero las raíces según la convención
    /// de nombres, después los hijos colgados de la raíz que comparte sus
    /// dos primeros componentes numéricos.
    pub fn apply_releases(&self,
                          writer: &mut dyn ArtifactWriter,
                          staged: &[StagedArtifact])
                          -> MigrationResult {
        let mut result = MigrationResult::new(staged.len());
        let mut roots = ReleaseTable::default();

        let role_of = |artifact: &StagedArtifact| match &artifact.payload {
            ArtifactPayload::Release(release) => classify(&release.name),
            _ => ReleaseRole::Child,
        };

        for artifact in staged.iter().filter(|a| role_of(a) == ReleaseRole::Parent) {
            match writer.create(artifact, None) {
                Ok(created) => roots.insert(artifact.payload.display_name(), created.id),
                Err(err) => {
                    warn!("release create failed for '{}': {err}",
                          artifact.payload.display_name());
                    result.record_failure(FailureDiagnostic { stage: "create".into(),
                                                              key: None,
                                                              message: err.to_string(),
                                                              payload:
                                                                  Self::payload_value(artifact) });
                }
            }
        }

        for artifact in staged.iter().filter(|a| role_of(a) == ReleaseRole::Child) {
            // Sin raíz que matchee, el hijo queda en el nivel superior
            let parent_id = roots.find_parent(artifact.payload.display_name());
            if let Err(err) = writer.create(artifact, parent_id) {
                warn!("release create failed for '{}': {err}",
                      artifact.payload.display_name());
                result.record_failure(FailureDiagnostic { stage: "create".into(),
                                                          key: None,
                                                          message: err.to_string(),
                                                          payload: Self::payload_value(artifact) });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::CreatedArtifact;
    use crate::errors::EngineError;
    use mig_domain::{CustomPropertyDefinition, DocumentPayload, PropertyDefinitionRef,
                     PropertyKind, PropertyValue, ReleasePayload, RequirementPayload};
    use serde_json::json;

    struct RecordingWriter {
        next_id: i64,
        fail_names: Vec<String>,
        fail_associations: bool,
        fail_folder: bool,
        created: Vec<(String, Option<i64>)>,
        associations: Vec<(i64, i64)>,
        folders: Vec<String>,
        document_folder_ids: Vec<i64>,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self { next_id: 100,
                   fail_names: Vec::new(),
                   fail_associations: false,
                   fail_folder: false,
                   created: Vec::new(),
                   associations: Vec::new(),
                   folders: Vec::new(),
                   document_folder_ids: Vec::new() }
        }
    }

    impl ArtifactWriter for RecordingWriter {
        fn create(&mut self,
                  staged: &StagedArtifact,
                  parent_id: Option<i64>)
                  -> Result<CreatedArtifact, EngineError> {
            let name = staged.payload.display_name().to_string();
            if self.fail_names.contains(&name) {
                return Err(EngineError::Write(format!("rejected {name}")));
            }
            if let ArtifactPayload::Document(doc) = &staged.payload {
                self.document_folder_ids.push(doc.folder_id);
            }
            self.next_id += 1;
            self.created.push((name, parent_id));
            Ok(CreatedArtifact { id: self.next_id,
                                 raw: json!({}) })
        }

        fn associate_capability(&mut self,
                                capability_id: i64,
                                requirement_id: i64)
                                -> Result<(), EngineError> {
            if self.fail_associations {
                return Err(EngineError::Write("link rejected".into()));
            }
            self.associations.push((capability_id, requirement_id));
            Ok(())
        }

        fn create_document_folder(&mut self, name: &str) -> Result<i64, EngineError> {
            if self.fail_folder {
                return Err(EngineError::Write("folder rejected".into()));
            }
            self.folders.push(name.to_string());
            Ok(900)
        }
    }

    fn correlation_value(key: &str) -> PropertyValue {
        let def = CustomPropertyDefinition { name: "Jira Id".into(),
                                             property_number: 1,
                                             custom_property_id: 1,
                                             artifact_type_id: 1,
                                             field_name: "Custom_01".into(),
                                             type_id: 1,
                                             custom_list: None };
        PropertyValue::text(PropertyDefinitionRef::from_definition(&def,
                                                                   PropertyKind::Text,
                                                                   Some(9)),
                            Some(key.to_string()))
    }

    fn requirement(key: &str, epiclink: Option<&str>, parentlink: Option<&str>) -> StagedArtifact {
        let payload = RequirementPayload { status_id: 1,
                                           requirement_type_id: 4,
                                           author_id: None,
                                           owner_id: None,
                                           importance_id: 0,
                                           release_id: None,
                                           component_id: None,
                                           name: key.to_string(),
                                           description: "d".into(),
                                           estimate_points: None,
                                           start_date: None,
                                           end_date: None,
                                           percent_complete: None,
                                           goal_id: None,
                                           is_suspect: false,
                                           custom_properties: vec![correlation_value(key)] };
        StagedArtifact::with_links(ArtifactPayload::Requirement(payload),
                                   parentlink.map(str::to_string),
                                   epiclink.map(str::to_string))
    }

    fn document(filename: &str) -> StagedArtifact {
        StagedArtifact::new(ArtifactPayload::Document(DocumentPayload {
            attachment_type_id: 1,
            folder_id:          0,
            attached_artifacts: Vec::new(),
            author_id:          None,
            filename_or_url:    filename.to_string(),
            custom_properties:  Vec::new(),
        }))
    }

    fn release(name: &str) -> StagedArtifact {
        StagedArtifact::new(ArtifactPayload::Release(ReleasePayload {
            name:              name.to_string(),
            description:       String::new(),
            version_number:    name.to_string(),
            release_status_id: 1,
            release_type_id:   1,
            start_date:        "2023-01-01T00:00:00".into(),
            end_date:          "2023-06-01T00:00:00".into(),
        }))
    }

    fn index_with(entries: &[(&str, i64)]) -> CorrelationIndex {
        let snapshot: Vec<_> =
            entries.iter()
                   .map(|(key, id)| {
                       json!({
                           "RequirementId": id,
                           "CustomProperties": [
                               {"Definition": {"Name": "Jira Id"}, "StringValue": key}
                           ]
                       })
                   })
                   .collect();
        CorrelationIndex::build(&snapshot, "Jira Id")
    }

    #[test]
    fn one_rejected_record_does_not_stop_the_batch() {
        let index = index_with(&[]);
        let capabilities = index_with(&[]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![requirement("PROJ-1", None, None),
                          requirement("PROJ-2", None, None),
                          requirement("PROJ-3", None, None)];
        let mut writer = RecordingWriter::new();
        writer.fail_names.push("PROJ-2".into());

        let result = applier.apply(&mut writer, &staged);
        assert_eq!(result.attempted, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].key.as_deref(), Some("PROJ-2"));
        // los registros posteriores al fallo igual se crean
        assert_eq!(writer.created.len(), 2);
        assert_eq!(writer.created[1].0, "PROJ-3");
    }

    #[test]
    fn already_migrated_records_are_skipped_before_writing() {
        let index = index_with(&[("PROJ-1", 10), ("PROJ-2", 11)]);
        let capabilities = index_with(&[]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![requirement("PROJ-1", None, None),
                          requirement("PROJ-2", None, None)];
        let mut writer = RecordingWriter::new();

        let result = applier.apply(&mut writer, &staged);
        assert_eq!(result.attempted, 0);
        assert_eq!(result.succeeded, 0);
        assert!(writer.created.is_empty());
    }

    #[test]
    fn epic_link_wins_for_requirement_parent() {
        let index = index_with(&[("EPIC-1", 50), ("PROJ-9", 60)]);
        let capabilities = index_with(&[]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![requirement("PROJ-10", Some("EPIC-1"), Some("PROJ-9"))];
        let mut writer = RecordingWriter::new();

        applier.apply(&mut writer, &staged);
        assert_eq!(writer.created[0].1, Some(50));
    }

    #[test]
    fn capability_association_failure_is_a_side_failure() {
        let index = index_with(&[]);
        let capabilities = index_with(&[("CAP-1", 70)]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![requirement("PROJ-1", Some("CAP-1"), None)];
        let mut writer = RecordingWriter::new();
        writer.fail_associations = true;

        let result = applier.apply(&mut writer, &staged);
        // el requirement se creó; solo el vínculo falló
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].stage, "associate");
        assert_eq!(writer.created.len(), 1);
    }

    #[test]
    fn successful_capability_association_is_recorded() {
        let index = index_with(&[]);
        let capabilities = index_with(&[("CAP-1", 70)]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![requirement("PROJ-1", None, Some("CAP-1"))];
        let mut writer = RecordingWriter::new();

        let result = applier.apply(&mut writer, &staged);
        assert_eq!(result.succeeded, 1);
        assert_eq!(writer.associations, vec![(70, 101)]);
    }

    #[test]
    fn missing_attachments_folder_is_created_once_for_the_batch() {
        let index = index_with(&[]);
        let capabilities = index_with(&[]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![document("captura.png"), document("log.txt")];
        let mut writer = RecordingWriter::new();

        let result = applier.apply(&mut writer, &staged);
        assert_eq!(result.succeeded, 2);
        // una sola creación de carpeta, ambos documentos con el id nuevo
        assert_eq!(writer.folders, vec!["Attachments".to_string()]);
        assert_eq!(writer.document_folder_ids, vec![900, 900]);
    }

    #[test]
    fn rejected_folder_creation_fails_the_document_only() {
        let index = index_with(&[]);
        let capabilities = index_with(&[]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![document("captura.png"), requirement("PROJ-1", None, None)];
        let mut writer = RecordingWriter::new();
        writer.fail_folder = true;

        let result = applier.apply(&mut writer, &staged);
        assert_eq!(result.attempted, 2);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failures[0].stage, "folder");
        assert_eq!(writer.created, vec![("PROJ-1".to_string(), None)]);
    }

    #[test]
    fn releases_go_in_two_phases_with_prefix_matching() {
        let index = index_with(&[]);
        let capabilities = index_with(&[]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![release("1.2.3"), release("1.2"), release("Release-X"), release("2")];
        let mut writer = RecordingWriter::new();

        let result = applier.apply_releases(&mut writer, &staged);
        assert_eq!(result.succeeded, 4);
        // raíces primero, en orden de staging
        assert_eq!(writer.created[0], ("1.2".into(), None));
        assert_eq!(writer.created[1], ("2".into(), None));
        // el hijo cuelga de la raíz con el mismo prefijo de dos componentes
        assert_eq!(writer.created[2], ("1.2.3".into(), Some(101)));
        assert_eq!(writer.created[3], ("Release-X".into(), None));
    }

    #[test]
    fn failed_root_release_leaves_children_at_top_level() {
        let index = index_with(&[]);
        let capabilities = index_with(&[]);
        let applier = BatchApplier::new(&index, &capabilities, "Jira Id");
        let staged = vec![release("1.2"), release("1.2.3")];
        let mut writer = RecordingWriter::new();
        writer.fail_names.push("1.2".into());

        let result = applier.apply_releases(&mut writer, &staged);
        assert_eq!(result.attempted, 2);
        assert_eq!(result.succeeded, 1);
        assert_eq!(writer.created, vec![("1.2.3".into(), None)]);
    }
}
