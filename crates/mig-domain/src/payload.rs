//! Payloads destino, una variante por clase de artefacto.
//!
//! Cada struct refleja el wire format del sistema destino (PascalCase). Los
//! campos de solo lectura del destino (ids propios, fechas de concurrencia,
//! contadores) no se modelan: el destino los asigna al crear.

use serde::{Deserialize, Serialize};

use crate::property::PropertyValue;

/// Clase de artefacto destino. El tag snake_case es el que viaja en el
/// documento de staging (`artifact_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Requirement,
    Task,
    Incident,
    Capability,
    Milestone,
    Release,
    Component,
    Document,
    Comment,
    Association,
    CustomList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementPayload {
    #[serde(rename = "StatusId")]
    pub status_id: i64,
    #[serde(rename = "RequirementTypeId")]
    pub requirement_type_id: i64,
    #[serde(rename = "AuthorId")]
    pub author_id: Option<i64>,
    #[serde(rename = "OwnerId")]
    pub owner_id: Option<i64>,
    #[serde(rename = "ImportanceId")]
    pub importance_id: i64,
    #[serde(rename = "ReleaseId")]
    pub release_id: Option<i64>,
    #[serde(rename = "ComponentId")]
    pub component_id: Option<i64>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "EstimatePoints")]
    pub estimate_points: Option<f64>,
    #[serde(rename = "StartDate")]
    pub start_date: Option<String>,
    #[serde(rename = "EndDate")]
    pub end_date: Option<String>,
    #[serde(rename = "PercentComplete")]
    pub percent_complete: Option<i64>,
    #[serde(rename = "GoalId")]
    pub goal_id: Option<i64>,
    #[serde(rename = "IsSuspect")]
    pub is_suspect: bool,
    #[serde(rename = "CustomProperties")]
    pub custom_properties: Vec<PropertyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(rename = "TaskStatusId")]
    pub task_status_id: i64,
    #[serde(rename = "TaskTypeId")]
    pub task_type_id: i64,
    /// Id del requirement padre; 0 cuando el origen no tenía padre, null
    /// cuando el padre no pudo correlacionarse.
    #[serde(rename = "RequirementId")]
    pub requirement_id: Option<i64>,
    #[serde(rename = "ReleaseId")]
    pub release_id: Option<i64>,
    #[serde(rename = "CreatorId")]
    pub creator_id: Option<i64>,
    #[serde(rename = "OwnerId")]
    pub owner_id: Option<i64>,
    #[serde(rename = "TaskPriorityId")]
    pub task_priority_id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "StartDate")]
    pub start_date: Option<String>,
    #[serde(rename = "EndDate")]
    pub end_date: Option<String>,
    #[serde(rename = "CompletionPercent")]
    pub completion_percent: i64,
    #[serde(rename = "EstimatedEffort")]
    pub estimated_effort: Option<i64>,
    #[serde(rename = "ActualEffort")]
    pub actual_effort: Option<i64>,
    #[serde(rename = "RemainingEffort")]
    pub remaining_effort: Option<i64>,
    #[serde(rename = "CustomProperties")]
    pub custom_properties: Vec<PropertyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentPayload {
    #[serde(rename = "IncidentStatusId")]
    pub incident_status_id: i64,
    #[serde(rename = "IncidentTypeId")]
    pub incident_type_id: i64,
    #[serde(rename = "PriorityId")]
    pub priority_id: i64,
    #[serde(rename = "OpenerId")]
    pub opener_id: Option<i64>,
    #[serde(rename = "OwnerId")]
    pub owner_id: Option<i64>,
    #[serde(rename = "DetectedReleaseId")]
    pub detected_release_id: Option<i64>,
    #[serde(rename = "ResolvedReleaseId")]
    pub resolved_release_id: Option<i64>,
    #[serde(rename = "VerifiedReleaseId")]
    pub verified_release_id: Option<i64>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "StartDate")]
    pub start_date: Option<String>,
    #[serde(rename = "EndDate")]
    pub end_date: Option<String>,
    #[serde(rename = "ComponentIds")]
    pub component_ids: Vec<i64>,
    #[serde(rename = "CustomProperties")]
    pub custom_properties: Vec<PropertyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityPayload {
    #[serde(rename = "MilestoneId")]
    pub milestone_id: Option<i64>,
    #[serde(rename = "StatusId")]
    pub status_id: i64,
    #[serde(rename = "TypeId")]
    pub type_id: i64,
    #[serde(rename = "PriorityId")]
    pub priority_id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "CreatorId")]
    pub creator_id: Option<i64>,
    #[serde(rename = "OwnerId")]
    pub owner_id: Option<i64>,
    #[serde(rename = "CustomProperties")]
    pub custom_properties: Vec<PropertyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestonePayload {
    #[serde(rename = "StatusId")]
    pub status_id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "StartDate")]
    pub start_date: String,
    #[serde(rename = "EndDate")]
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "VersionNumber")]
    pub version_number: String,
    #[serde(rename = "ReleaseStatusId")]
    pub release_status_id: i64,
    /// Todas las versiones de origen se tratan como release mayor.
    #[serde(rename = "ReleaseTypeId")]
    pub release_type_id: i64,
    #[serde(rename = "StartDate")]
    pub start_date: String,
    #[serde(rename = "EndDate")]
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentPayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "IsActive")]
    pub is_active: bool,
    #[serde(rename = "IsDeleted")]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomListValuePayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Active")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomListPayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Active")]
    pub active: bool,
    #[serde(rename = "Values")]
    pub values: Vec<CustomListValuePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPayload {
    #[serde(rename = "ArtifactId")]
    pub artifact_id: i64,
    #[serde(rename = "UserId")]
    pub user_id: Option<i64>,
    #[serde(rename = "UserName")]
    pub user_name: Option<String>,
    #[serde(rename = "Text")]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationPayload {
    #[serde(rename = "SourceArtifactId")]
    pub source_artifact_id: i64,
    #[serde(rename = "SourceArtifactTypeId")]
    pub source_artifact_type_id: i64,
    #[serde(rename = "DestArtifactId")]
    pub dest_artifact_id: i64,
    #[serde(rename = "DestArtifactTypeId")]
    pub dest_artifact_type_id: i64,
    /// Por ahora todos los vínculos se crean como "relates to".
    #[serde(rename = "ArtifactLinkTypeId")]
    pub artifact_link_type_id: i64,
    #[serde(rename = "Comment")]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedArtifactRef {
    #[serde(rename = "ArtifactId")]
    pub artifact_id: i64,
    #[serde(rename = "ArtifactTypeId")]
    pub artifact_type_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPayload {
    /// 1 = archivo, 2 = url.
    #[serde(rename = "AttachmentTypeId")]
    pub attachment_type_id: i64,
    #[serde(rename = "ProjectAttachmentFolderId")]
    pub folder_id: i64,
    #[serde(rename = "AttachedArtifacts")]
    pub attached_artifacts: Vec<AttachedArtifactRef>,
    #[serde(rename = "AuthorId")]
    pub author_id: Option<i64>,
    #[serde(rename = "FilenameOrUrl")]
    pub filename_or_url: String,
    #[serde(rename = "CustomProperties")]
    pub custom_properties: Vec<PropertyValue>,
}

/// Payload destino etiquetado por clase. El tag/content coincide con el
/// formato de staging: `{"artifact_type": ..., "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "artifact_type", content = "payload", rename_all = "snake_case")]
pub enum ArtifactPayload {
    Requirement(RequirementPayload),
    Task(TaskPayload),
    Incident(IncidentPayload),
    Capability(CapabilityPayload),
    Milestone(MilestonePayload),
    Release(ReleasePayload),
    Component(ComponentPayload),
    Document(DocumentPayload),
    Comment(CommentPayload),
    Association(AssociationPayload),
    CustomList(CustomListPayload),
}

impl ArtifactPayload {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactPayload::Requirement(_) => ArtifactKind::Requirement,
            ArtifactPayload::Task(_) => ArtifactKind::Task,
            ArtifactPayload::Incident(_) => ArtifactKind::Incident,
            ArtifactPayload::Capability(_) => ArtifactKind::Capability,
            ArtifactPayload::Milestone(_) => ArtifactKind::Milestone,
            ArtifactPayload::Release(_) => ArtifactKind::Release,
            ArtifactPayload::Component(_) => ArtifactKind::Component,
            ArtifactPayload::Document(_) => ArtifactKind::Document,
            ArtifactPayload::Comment(_) => ArtifactKind::Comment,
            ArtifactPayload::Association(_) => ArtifactKind::Association,
            ArtifactPayload::CustomList(_) => ArtifactKind::CustomList,
        }
    }

    /// Nombre legible del artefacto, para diagnósticos.
    pub fn display_name(&self) -> &str {
        match self {
            ArtifactPayload::Requirement(p) => &p.name,
            ArtifactPayload::Task(p) => &p.name,
            ArtifactPayload::Incident(p) => &p.name,
            ArtifactPayload::Capability(p) => &p.name,
            ArtifactPayload::Milestone(p) => &p.name,
            ArtifactPayload::Release(p) => &p.name,
            ArtifactPayload::Component(p) => &p.name,
            ArtifactPayload::Document(p) => &p.filename_or_url,
            ArtifactPayload::Comment(_) => "(comment)",
            ArtifactPayload::Association(_) => "(association)",
            ArtifactPayload::CustomList(p) => &p.name,
        }
    }

    /// Propiedades configurables del payload, si la clase las lleva.
    pub fn custom_properties(&self) -> Option<&[PropertyValue]> {
        match self {
            ArtifactPayload::Requirement(p) => Some(&p.custom_properties),
            ArtifactPayload::Task(p) => Some(&p.custom_properties),
            ArtifactPayload::Incident(p) => Some(&p.custom_properties),
            ArtifactPayload::Capability(p) => Some(&p.custom_properties),
            ArtifactPayload::Document(p) => Some(&p.custom_properties),
            _ => None,
        }
    }
}
