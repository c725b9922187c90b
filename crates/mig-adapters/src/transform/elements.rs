//! Elementos de issues ya migrados: comentarios, asociaciones y documentos.
//!
//! Estas pasadas corren al final, cuando todos los artefactos ya existen en
//! destino: cada elemento se cuelga del id destino resuelto por correlación.
//! Un issue sin correlacionar pierde sus elementos con warning, nunca corta
//! la pasada.

use log::warn;
use serde_json::Value;

use mig_core::{render_rich_text, CorrelationIndex, CustomPropertyEncoder, MarkupRenderer,
               MigrationContext};
use mig_domain::{ArtifactKind, ArtifactPayload, AssociationPayload, AttachedArtifactRef,
                 CommentPayload, DocumentPayload, SourceRecord, StagedArtifact};

/// Todos los vínculos se crean como "relates to".
const RELATES_TO_LINK_TYPE: i64 = 1;
/// 1 = archivo, 2 = url.
const FILE_ATTACHMENT_TYPE: i64 = 1;

fn author_email(element: &Value) -> Option<&str> {
    element.get("author")?.get("emailAddress")?.as_str()
}

/// Comentarios de los registros de origen, colgados del artefacto destino.
pub fn comments_pass(ctx: &MigrationContext,
                     renderer: Option<&dyn MarkupRenderer>,
                     records: &[SourceRecord],
                     artifact_index: &CorrelationIndex)
                     -> Vec<StagedArtifact> {
    let mut staged = Vec::new();
    for record in records {
        let comments = record.comments();
        if comments.is_empty() {
            continue;
        }
        let Some(existing) = record.key().and_then(|k| artifact_index.find(k)) else {
            warn!("{}: artifact not found in target, its comments are not migrated",
                  record.key().unwrap_or("(no key)"));
            continue;
        };
        for comment in comments {
            let user = author_email(comment).and_then(|email| ctx.user_by_email(email));
            let payload = CommentPayload {
                artifact_id: existing.primary_id,
                user_id:     user.map(|u| u.user_id),
                user_name:   user.map(|u| u.display_name()),
                text:        render_rich_text(renderer,
                                              comment.get("body").and_then(Value::as_str)),
            };
            staged.push(StagedArtifact::new(ArtifactPayload::Comment(payload)));
        }
    }
    staged
}

/// Vínculos salientes entre issues ya migrados. Un vínculo con cualquiera de
/// las dos puntas sin correlacionar se descarta con warning.
pub fn associations_pass(records: &[SourceRecord],
                         artifact_index: &CorrelationIndex)
                         -> Vec<StagedArtifact> {
    let mut staged = Vec::new();
    for record in records {
        for link in record.issue_links() {
            let Some(outward_key) = link.get("outwardIssue")
                                        .and_then(|i| i.get("key"))
                                        .and_then(Value::as_str)
            else {
                // los inward son el reflejo de un outward de otro issue
                continue;
            };
            let source = record.key().and_then(|k| artifact_index.find(k));
            let dest = artifact_index.find(outward_key);
            let (Some(source), Some(dest)) = (source, dest) else {
                warn!("link {} -> {outward_key} dropped, one side is not in target",
                      record.key().unwrap_or("(no key)"));
                continue;
            };
            let comment = link.get("type")
                              .and_then(|t| t.get("outward"))
                              .and_then(Value::as_str)
                              .unwrap_or_default()
                              .to_string();
            let payload = AssociationPayload {
                source_artifact_id:      source.primary_id,
                source_artifact_type_id: source.artifact_type_id.unwrap_or(0),
                dest_artifact_id:        dest.primary_id,
                dest_artifact_type_id:   dest.artifact_type_id.unwrap_or(0),
                artifact_link_type_id:   RELATES_TO_LINK_TYPE,
                comment,
            };
            staged.push(StagedArtifact::new(ArtifactPayload::Association(payload)));
        }
    }
    staged
}

/// Adjuntos de los registros de origen, como documentos en la carpeta de
/// adjuntos del producto. El binario lo baja y sube el escritor; acá viaja
/// la referencia.
pub fn documents_pass(ctx: &MigrationContext,
                      records: &[SourceRecord],
                      artifact_index: &CorrelationIndex,
                      correlation_property: &str,
                      folder_id: i64)
                      -> Vec<StagedArtifact> {
    let kind = ArtifactKind::Document;
    let encoder = CustomPropertyEncoder::new(ctx.property_definitions(kind),
                                             ctx.template_for(kind),
                                             None);
    let mut staged = Vec::new();
    for record in records {
        let attachments = record.attachments();
        if attachments.is_empty() {
            continue;
        }
        let Some(existing) = record.key().and_then(|k| artifact_index.find(k)) else {
            warn!("{}: artifact not found in target, its attachments are not migrated",
                  record.key().unwrap_or("(no key)"));
            continue;
        };
        for attachment in attachments {
            let Some(filename) = attachment.get("filename").and_then(Value::as_str) else {
                continue;
            };
            let mut custom_properties = Vec::new();
            if let Some(key) = record.key() {
                custom_properties.extend(encoder.correlation_value(correlation_property, key));
            }
            // la fecha de creación en origen no se puede escribir directo
            if let Some(created) = attachment.get("created").and_then(Value::as_str) {
                custom_properties.extend(encoder.date_time_value("Created", created));
            }
            let author = author_email(attachment).and_then(|email| ctx.user_by_email(email));
            let payload = DocumentPayload {
                attachment_type_id: FILE_ATTACHMENT_TYPE,
                folder_id,
                attached_artifacts: vec![AttachedArtifactRef {
                    artifact_id:      existing.primary_id,
                    artifact_type_id: existing.artifact_type_id.unwrap_or(0),
                }],
                author_id:          author.map(|u| u.user_id),
                filename_or_url:    filename.to_string(),
                custom_properties,
            };
            staged.push(StagedArtifact::new(ArtifactPayload::Document(payload)));
        }
    }
    staged
}
