//! Contexto inmutable de una pasada y configuración de mapeo del operador.
//!
//! El `MigrationContext` se construye una vez al inicio de cada pasada
//! leyendo el estado actual del destino, y no se muta hasta la pasada
//! siguiente; una nueva pasada relee el destino para que lo creado en la
//! pasada anterior sea resoluble como padre.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use mig_domain::{ArtifactKind, CustomPropertyDefinition, FieldDescriptor, PropertyKind};

/// Claves candidatas de id primario en la metadata del destino. El wire
/// format usa un nombre distinto por clase de objeto.
const ID_KEYS: &[&str] = &["StatusId",
                           "RequirementStatusId",
                           "IncidentStatusId",
                           "TaskStatusId",
                           "CapabilityStatusId",
                           "RequirementTypeId",
                           "TaskTypeId",
                           "IncidentTypeId",
                           "CapabilityTypeId",
                           "ImportanceId",
                           "PriorityId",
                           "TaskPriorityId",
                           "IncidentPriorityId",
                           "CapabilityPriorityId",
                           "ReleaseId",
                           "ComponentId",
                           "MilestoneId",
                           "ProjectAttachmentFolderId"];

/// Par {id, nombre} normalizado desde un objeto de metadata destino.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedId {
    pub id: i64,
    pub name: String,
}

impl NamedId {
    pub fn new(id: i64, name: &str) -> Self {
        Self { id,
               name: name.to_string() }
    }

    /// Normaliza un objeto de metadata: toma `Name` y la primera clave de id
    /// conocida presente. `None` si falta alguno.
    pub fn from_metadata(value: &Value) -> Option<Self> {
        let name = value.get("Name")?.as_str()?.to_string();
        let id = ID_KEYS.iter().find_map(|k| value.get(*k).and_then(Value::as_i64))?;
        Some(Self { id, name })
    }
}

/// Usuario del destino, para resolución autor/responsable por email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetUser {
    #[serde(rename = "UserId")]
    pub user_id: i64,
    #[serde(rename = "EmailAddress")]
    pub email: String,
    #[serde(rename = "FirstName", default)]
    pub first_name: String,
    #[serde(rename = "LastName", default)]
    pub last_name: String,
}

impl TargetUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Identidad del contenedor destino (producto y programa).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_id: i64,
    pub project_template_id: Option<i64>,
    pub project_group_id: Option<i64>,
    pub program_id: Option<i64>,
}

/// Snapshot de solo lectura del destino más los descriptores de campos
/// configurables del origen. Se pasa por referencia a cada transformación.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationContext {
    pub project: ProjectInfo,
    pub statuses: HashMap<ArtifactKind, Vec<NamedId>>,
    pub types: HashMap<ArtifactKind, Vec<NamedId>>,
    pub priorities: HashMap<ArtifactKind, Vec<NamedId>>,
    pub users: Vec<TargetUser>,
    pub releases: Vec<NamedId>,
    pub components: Vec<NamedId>,
    pub milestones: Vec<NamedId>,
    pub document_folders: Vec<NamedId>,
    pub custom_properties: HashMap<ArtifactKind, Vec<CustomPropertyDefinition>>,
    /// Snapshot crudo de capabilities existentes (para el filtro de captura
    /// y la asociación post-creación).
    pub capabilities: Vec<Value>,
    pub source_fields: Vec<FieldDescriptor>,
}

impl MigrationContext {
    pub fn statuses_for(&self, kind: ArtifactKind) -> &[NamedId] {
        self.statuses.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn types_for(&self, kind: ArtifactKind) -> &[NamedId] {
        self.types.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn priorities_for(&self, kind: ArtifactKind) -> &[NamedId] {
        self.priorities.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn property_definitions(&self, kind: ArtifactKind) -> &[CustomPropertyDefinition] {
        self.custom_properties
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Template a usar en el bloque Definition: a nivel de programa
    /// (capability, milestone) no hay template de producto.
    pub fn template_for(&self, kind: ArtifactKind) -> Option<i64> {
        match kind {
            ArtifactKind::Capability | ArtifactKind::Milestone => None,
            _ => self.project.project_template_id,
        }
    }

    pub fn user_by_email(&self, email: &str) -> Option<&TargetUser> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn release_id_by_name(&self, name: &str) -> Option<i64> {
        self.releases.iter().find(|r| r.name == name).map(|r| r.id)
    }

    pub fn component_id_by_name(&self, name: &str) -> Option<i64> {
        self.components.iter().find(|c| c.name == name).map(|c| c.id)
    }

    pub fn milestone_id_by_name(&self, name: &str) -> Option<i64> {
        self.milestones.iter().find(|m| m.name == name).map(|m| m.id)
    }

    pub fn folder_id_by_name(&self, name: &str) -> Option<i64> {
        self.document_folders
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.id)
    }
}

/// Nombre(s) de tipo de origen mapeados a un nombre de tipo destino. El
/// archivo de mapeo admite un string o una lista.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceNames {
    One(String),
    Many(Vec<String>),
}

impl SourceNames {
    pub fn contains(&self, name: &str) -> bool {
        match self {
            SourceNames::One(s) => s == name,
            SourceNames::Many(v) => v.iter().any(|s| s == name),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            SourceNames::One(s) => Box::new(std::iter::once(s.as_str())),
            SourceNames::Many(v) => Box::new(v.iter().map(String::as_str)),
        }
    }
}

/// Tabla nombre destino → nombre(s) origen para una clase de artefacto.
pub type TypeTable = IndexMap<String, SourceNames>;

/// Mapeo de una propiedad configurable del archivo del operador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPropMapping {
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    /// Campo estándar del origen, si el valor no vive en un campo custom.
    #[serde(default)]
    pub source_key: Option<String>,
    /// Nombre visible del campo custom de origen, en caso contrario.
    #[serde(default)]
    pub source_field_name: Option<String>,
    /// Nombre de la propiedad configurable destino.
    pub target_name: String,
}

/// Estado destino según los flags archived/released de la versión origen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionStatusTable {
    pub not_archived_and_not_released: String,
    pub not_archived_and_released: String,
    pub archived_and_not_released: String,
    pub archived_and_released: String,
}

impl VersionStatusTable {
    pub fn status_name(&self, archived: bool, released: bool) -> &str {
        match (archived, released) {
            (false, false) => &self.not_archived_and_not_released,
            (false, true) => &self.not_archived_and_released,
            (true, false) => &self.archived_and_not_released,
            (true, true) => &self.archived_and_released,
        }
    }
}

fn default_correlation_property() -> String {
    "Jira Id".to_string()
}

/// Configuración de mapeo provista por el operador (documento JSON).
/// Cargarla es parte del setup: si falla, la corrida aborta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Propiedad configurable destino que persiste la clave de correlación.
    #[serde(default = "default_correlation_property")]
    pub correlation_property: String,
    /// Orden de tipos de origen a procesar, una pasada por tipo.
    #[serde(default)]
    pub artifact_type_order: Vec<String>,
    #[serde(default)]
    pub capability_type_order: Vec<String>,
    #[serde(default)]
    pub types: HashMap<String, TypeTable>,
    #[serde(default)]
    pub statuses: HashMap<String, IndexMap<String, String>>,
    #[serde(default)]
    pub priorities: HashMap<String, IndexMap<String, String>>,
    #[serde(default)]
    pub custom_props: HashMap<String, Vec<CustomPropMapping>>,
    pub release_statuses: Option<VersionStatusTable>,
    pub milestone_statuses: Option<VersionStatusTable>,
}

impl MappingConfig {
    pub fn types_for(&self, kind_key: &str) -> Option<&TypeTable> {
        self.types.get(kind_key)
    }

    pub fn statuses_for(&self, kind_key: &str) -> Option<&IndexMap<String, String>> {
        self.statuses.get(kind_key)
    }

    pub fn priorities_for(&self, kind_key: &str) -> Option<&IndexMap<String, String>> {
        self.priorities.get(kind_key)
    }

    pub fn custom_props_for(&self, kind_key: &str) -> &[CustomPropMapping] {
        self.custom_props
            .get(kind_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Todos los nombres de origen de una tabla, aplanados (para decidir a
    /// qué clase destino pertenece la pasada actual).
    pub fn combined_source_names(&self, kind_key: &str) -> Vec<&str> {
        self.types_for(kind_key)
            .map(|t| t.values().flat_map(|v| v.iter()).collect())
            .unwrap_or_default()
    }
}
