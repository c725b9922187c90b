//! Registros de origen (solo lectura).
//!
//! Un `SourceRecord` envuelve el JSON crudo de un issue exportado del sistema
//! de origen y expone accesores tipados sobre los campos que la migración
//! necesita. Nunca se muta: toda transformación produce payloads nuevos.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Clave de correlación: el identificador natural del registro de origen.
/// Se persiste como propiedad configurable en el artefacto destino y es el
/// único mecanismo de identidad entre corridas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey(pub String);

impl CorrelationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationKey {
    fn from(s: &str) -> Self {
        CorrelationKey(s.to_string())
    }
}

/// Descriptor de un campo configurable del sistema de origen ({id, nombre}).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
}

/// Issue de origen envuelto. El payload interno es el JSON tal cual lo
/// entrega el export; los accesores navegan `fields` sin copiar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    raw: Value,
}

impl SourceRecord {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Identificador natural del registro (p.ej. "PROJ-123").
    pub fn key(&self) -> Option<&str> {
        self.raw.get("key").and_then(Value::as_str)
    }

    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        self.key().map(CorrelationKey::from)
    }

    fn fields(&self) -> Option<&Value> {
        self.raw.get("fields")
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields().and_then(|f| f.get(name))
    }

    /// Nombre del tipo de issue de origen.
    pub fn issue_type(&self) -> Option<&str> {
        self.field("issuetype")
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
    }

    pub fn status_name(&self) -> Option<&str> {
        self.field("status")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
    }

    /// Nombre de prioridad; `None` cuando el campo es null en origen.
    pub fn priority_name(&self) -> Option<&str> {
        self.field("priority")
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.field("summary").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.field("description").and_then(Value::as_str)
    }

    pub fn resolution(&self) -> Option<&Value> {
        self.field("resolution").filter(|v| !v.is_null())
    }

    /// Email de la persona en un campo de persona ("assignee", "reporter").
    pub fn person_email(&self, person_field: &str) -> Option<&str> {
        self.field(person_field)
            .and_then(|p| p.get("emailAddress"))
            .and_then(Value::as_str)
    }

    /// Estimación agregada en segundos, si existe.
    pub fn aggregate_time_estimate(&self) -> Option<i64> {
        self.field("aggregatetimeoriginalestimate")
            .and_then(Value::as_i64)
    }

    /// Clave del issue padre directo (subtareas), si existe.
    pub fn parent_key(&self) -> Option<&str> {
        self.field("parent")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
    }

    fn named_array(&self, field: &str) -> Vec<&Value> {
        self.field(field)
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default()
    }

    /// Versiones "fix" del registro, en orden de origen.
    pub fn fix_versions(&self) -> Vec<&Value> {
        self.named_array("fixVersions")
    }

    /// Versiones afectadas del registro, en orden de origen.
    pub fn affected_versions(&self) -> Vec<&Value> {
        self.named_array("versions")
    }

    pub fn components(&self) -> Vec<&Value> {
        self.named_array("components")
    }

    pub fn issue_links(&self) -> Vec<&Value> {
        self.named_array("issuelinks")
    }

    pub fn comments(&self) -> Vec<&Value> {
        self.field("comment")
            .and_then(|c| c.get("comments"))
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default()
    }

    pub fn attachments(&self) -> Vec<&Value> {
        self.named_array("attachment")
    }

    /// Resuelve un campo configurable de origen por nombre visible: busca el
    /// descriptor con ese nombre y lee `fields[id]`. `None` si el descriptor
    /// no existe o el valor es null.
    pub fn custom_field<'a>(
        &'a self,
        descriptors: &[FieldDescriptor],
        display_name: &str,
    ) -> Option<&'a Value> {
        let descriptor = descriptors.iter().find(|d| d.name == display_name)?;
        self.field(&descriptor.id).filter(|v| !v.is_null())
    }
}

/// Versión del sistema de origen (candidata a release o milestone destino).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, rename = "releaseDate")]
    pub release_date: Option<String>,
}

/// Componente del sistema de origen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub deleted: bool,
}
