//! Pasadas de limpieza: vacían un contenedor destino de lo que una
//! migración insertó, para poder correr de cero.
//!
//! Mismo aislamiento por registro que el aplicador: un borrado rechazado se
//! registra como diagnóstico y la pasada sigue con el registro siguiente.
//! El inventario viene de un snapshot crudo del destino.

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::clients::ArtifactRemover;
use mig_domain::{ArtifactKind, FailureDiagnostic, MigrationResult};

/// Inventario crudo del destino, una lista de registros por clase de objeto.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TargetInventory {
    pub requirements: Vec<Value>,
    pub incidents: Vec<Value>,
    pub tasks: Vec<Value>,
    pub components: Vec<Value>,
    pub releases: Vec<Value>,
    pub capabilities: Vec<Value>,
    pub milestones: Vec<Value>,
    pub documents: Vec<Value>,
    pub document_folders: Vec<Value>,
}

/// Clave de id primario de cada clase en el wire format del destino.
fn primary_id_key(kind: ArtifactKind) -> Option<&'static str> {
    match kind {
        ArtifactKind::Requirement => Some("RequirementId"),
        ArtifactKind::Task => Some("TaskId"),
        ArtifactKind::Incident => Some("IncidentId"),
        ArtifactKind::Capability => Some("CapabilityId"),
        ArtifactKind::Milestone => Some("MilestoneId"),
        ArtifactKind::Release => Some("ReleaseId"),
        ArtifactKind::Component => Some("ComponentId"),
        ArtifactKind::Document => Some("AttachmentId"),
        // comentarios, asociaciones y listas caen junto con su artefacto
        _ => None,
    }
}

pub struct BatchCleaner;

impl BatchCleaner {
    /// Borra todos los registros de una clase. Un registro sin id conocido
    /// cuenta como fallo y no corta la pasada.
    pub fn clean_kind(remover: &mut dyn ArtifactRemover,
                      kind: ArtifactKind,
                      existing: &[Value])
                      -> MigrationResult {
        let Some(id_key) = primary_id_key(kind) else {
            warn!("no standalone delete for {kind:?} records, skipping");
            return MigrationResult::new(0);
        };
        info!("cleaning {} {kind:?} record(s)", existing.len());
        let mut result = MigrationResult::new(existing.len());
        for record in existing {
            let Some(id) = record.get(id_key).and_then(Value::as_i64) else {
                result.record_failure(FailureDiagnostic { stage: "delete".into(),
                                                          key: None,
                                                          message:
                                                              format!("record without {id_key}"),
                                                          payload: record.clone() });
                continue;
            };
            if let Err(err) = remover.delete(kind, id) {
                warn!("delete failed for {id_key} {id}: {err}");
                result.record_failure(FailureDiagnostic { stage: "delete".into(),
                                                          key: None,
                                                          message: err.to_string(),
                                                          payload: record.clone() });
            }
        }
        result
    }

    /// Desvincula los documentos de sus artefactos. Corre antes de borrar
    /// los artefactos del producto: un documento con asociaciones vivas no
    /// puede borrarse.
    pub fn clean_document_associations(remover: &mut dyn ArtifactRemover,
                                       documents: &[Value])
                                       -> MigrationResult {
        let mut result = MigrationResult::new(0);
        for doc in documents {
            let Some(doc_id) = doc.get("AttachmentId").and_then(Value::as_i64) else {
                continue;
            };
            let Some(attached) = doc.get("AttachedArtifacts").and_then(Value::as_array) else {
                continue;
            };
            for artifact in attached {
                let type_id = artifact.get("ArtifactTypeId").and_then(Value::as_i64);
                let artifact_id = artifact.get("ArtifactId").and_then(Value::as_i64);
                let (Some(type_id), Some(artifact_id)) = (type_id, artifact_id) else {
                    continue;
                };
                if let Err(err) =
                    remover.remove_document_association(type_id, artifact_id, doc_id)
                {
                    warn!("unlink failed for document {doc_id}: {err}");
                    result.record_side_failure(FailureDiagnostic { stage: "unlink".into(),
                                                                   key: None,
                                                                   message: err.to_string(),
                                                                   payload: artifact.clone() });
                }
            }
        }
        result
    }

    /// Limpieza de producto: desvincula los documentos y borra requirements,
    /// incidents, tasks, components y releases, en ese orden.
    pub fn clean_product(remover: &mut dyn ArtifactRemover,
                         inventory: &TargetInventory)
                         -> MigrationResult {
        let mut result = Self::clean_document_associations(remover, &inventory.documents);
        let passes = [(ArtifactKind::Requirement, &inventory.requirements),
                      (ArtifactKind::Incident, &inventory.incidents),
                      (ArtifactKind::Task, &inventory.tasks),
                      (ArtifactKind::Component, &inventory.components),
                      (ArtifactKind::Release, &inventory.releases)];
        for (kind, records) in passes {
            result.merge(Self::clean_kind(remover, kind, records));
        }
        result
    }

    /// Limpieza de programa: capabilities y milestones.
    pub fn clean_program(remover: &mut dyn ArtifactRemover,
                         inventory: &TargetInventory)
                         -> MigrationResult {
        let mut result =
            Self::clean_kind(remover, ArtifactKind::Capability, &inventory.capabilities);
        result.merge(Self::clean_kind(remover, ArtifactKind::Milestone, &inventory.milestones));
        result
    }

    /// Limpieza de documentos del producto: los documentos primero, después
    /// sus carpetas.
    pub fn clean_documents(remover: &mut dyn ArtifactRemover,
                           inventory: &TargetInventory)
                           -> MigrationResult {
        let mut result = Self::clean_kind(remover, ArtifactKind::Document, &inventory.documents);
        info!("cleaning {} document folder(s)", inventory.document_folders.len());
        let mut folders = MigrationResult::new(inventory.document_folders.len());
        for folder in &inventory.document_folders {
            let Some(id) = folder.get("ProjectAttachmentFolderId").and_then(Value::as_i64)
            else {
                folders.record_failure(FailureDiagnostic {
                    stage:   "delete".into(),
                    key:     None,
                    message: "folder without ProjectAttachmentFolderId".into(),
                    payload: folder.clone(),
                });
                continue;
            };
            if let Err(err) = remover.delete_document_folder(id) {
                warn!("folder delete failed for {id}: {err}");
                folders.record_failure(FailureDiagnostic { stage: "delete".into(),
                                                           key: None,
                                                           message: err.to_string(),
                                                           payload: folder.clone() });
            }
        }
        result.merge(folders);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingRemover {
        fail_ids: Vec<i64>,
        deleted: Vec<(ArtifactKind, i64)>,
        unlinked: Vec<(i64, i64, i64)>,
        folders_deleted: Vec<i64>,
    }

    impl ArtifactRemover for RecordingRemover {
        fn delete(&mut self, kind: ArtifactKind, id: i64) -> Result<(), EngineError> {
            if self.fail_ids.contains(&id) {
                return Err(EngineError::Write(format!("delete rejected for {id}")));
            }
            self.deleted.push((kind, id));
            Ok(())
        }

        fn remove_document_association(&mut self,
                                       artifact_type_id: i64,
                                       artifact_id: i64,
                                       document_id: i64)
                                       -> Result<(), EngineError> {
            self.unlinked.push((artifact_type_id, artifact_id, document_id));
            Ok(())
        }

        fn delete_document_folder(&mut self, folder_id: i64) -> Result<(), EngineError> {
            self.folders_deleted.push(folder_id);
            Ok(())
        }
    }

    fn inventory() -> TargetInventory {
        serde_json::from_value(json!({
            "requirements": [{"RequirementId": 10}, {"RequirementId": 11}],
            "incidents": [{"IncidentId": 20}],
            "tasks": [{"TaskId": 30}],
            "components": [{"ComponentId": 40}],
            "releases": [{"ReleaseId": 50}],
            "capabilities": [{"CapabilityId": 60}],
            "milestones": [{"MilestoneId": 70}],
            "documents": [{
                "AttachmentId": 80,
                "AttachedArtifacts": [{"ArtifactTypeId": 1, "ArtifactId": 10}]
            }],
            "document_folders": [{"ProjectAttachmentFolderId": 90}]
        })).expect("inventario")
    }

    #[test]
    fn product_clean_unlinks_documents_then_deletes_in_order() {
        let inv = inventory();
        let mut remover = RecordingRemover::default();

        let result = BatchCleaner::clean_product(&mut remover, &inv);
        assert_eq!(result.attempted, 6);
        assert_eq!(result.succeeded, 6);
        assert_eq!(remover.unlinked, vec![(1, 10, 80)]);
        assert_eq!(remover.deleted,
                   vec![(ArtifactKind::Requirement, 10),
                        (ArtifactKind::Requirement, 11),
                        (ArtifactKind::Incident, 20),
                        (ArtifactKind::Task, 30),
                        (ArtifactKind::Component, 40),
                        (ArtifactKind::Release, 50)]);
    }

    #[test]
    fn rejected_delete_does_not_stop_the_clean() {
        let inv = inventory();
        let mut remover = RecordingRemover { fail_ids: vec![10],
                                             ..Default::default() };

        let result = BatchCleaner::clean_product(&mut remover, &inv);
        assert_eq!(result.attempted, 6);
        assert_eq!(result.succeeded, 5);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].stage, "delete");
        // el segundo requirement igual se borra
        assert!(remover.deleted.contains(&(ArtifactKind::Requirement, 11)));
    }

    #[test]
    fn program_clean_covers_capabilities_and_milestones() {
        let inv = inventory();
        let mut remover = RecordingRemover::default();

        let result = BatchCleaner::clean_program(&mut remover, &inv);
        assert_eq!(result.succeeded, 2);
        assert_eq!(remover.deleted,
                   vec![(ArtifactKind::Capability, 60), (ArtifactKind::Milestone, 70)]);
    }

    #[test]
    fn document_clean_removes_folders_after_documents() {
        let inv = inventory();
        let mut remover = RecordingRemover::default();

        let result = BatchCleaner::clean_documents(&mut remover, &inv);
        assert_eq!(result.attempted, 2);
        assert_eq!(result.succeeded, 2);
        assert_eq!(remover.deleted, vec![(ArtifactKind::Document, 80)]);
        assert_eq!(remover.folders_deleted, vec![90]);
    }
}
