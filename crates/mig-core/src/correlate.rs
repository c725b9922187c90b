//! Índice de correlación: clave de origen → artefacto ya creado en destino.
//!
//! Se construye una vez por pasada desde el snapshot del destino y no ve las
//! escrituras de la pasada en curso: dos registros hermanos creados en la
//! misma pasada no se resuelven entre sí hasta la pasada siguiente.

use indexmap::IndexMap;
use serde_json::Value;

/// Claves candidatas de id primario de un artefacto destino existente.
const ARTIFACT_ID_KEYS: &[&str] = &["RequirementId",
                                    "TaskId",
                                    "IncidentId",
                                    "CapabilityId",
                                    "ReleaseId",
                                    "MilestoneId",
                                    "ComponentId",
                                    "AttachmentId"];

/// Artefacto destino existente, normalizado a lo que la correlación usa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingArtifact {
    pub primary_id: i64,
    pub artifact_type_id: Option<i64>,
}

impl ExistingArtifact {
    fn from_snapshot(value: &Value) -> Option<Self> {
        let primary_id = ARTIFACT_ID_KEYS.iter()
                                         .find_map(|k| value.get(*k).and_then(Value::as_i64))?;
        Some(Self { primary_id,
                    artifact_type_id: value.get("ArtifactTypeId").and_then(Value::as_i64) })
    }
}

/// Valor de la propiedad de correlación dentro del snapshot crudo de un
/// artefacto destino.
pub fn correlation_key_of(value: &Value, correlation_property: &str) -> Option<String> {
    let properties = value.get("CustomProperties")?.as_array()?;
    properties.iter().find_map(|p| {
                         let name = p.get("Definition")?.get("Name")?.as_str()?;
                         if name != correlation_property {
                             return None;
                         }
                         p.get("StringValue")?.as_str().map(str::to_string)
                     })
}

/// Índice inmutable durante la pasada. El orden de inserción se preserva
/// para que los diagnósticos sean reproducibles.
#[derive(Debug, Clone, Default)]
pub struct CorrelationIndex {
    entries: IndexMap<String, ExistingArtifact>,
}

impl CorrelationIndex {
    /// Construye el índice desde el snapshot de artefactos existentes. Un
    /// artefacto sin la propiedad de correlación (creado a mano en destino)
    /// simplemente no participa.
    pub fn build(snapshot: &[Value], correlation_property: &str) -> Self {
        let mut entries = IndexMap::new();
        for artifact in snapshot {
            let Some(key) = correlation_key_of(artifact, correlation_property) else {
                continue;
            };
            if let Some(existing) = ExistingArtifact::from_snapshot(artifact) {
                entries.insert(key, existing);
            }
        }
        Self { entries }
    }

    pub fn find(&self, key: &str) -> Option<&ExistingArtifact> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExistingArtifact)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requirement(id: i64, key: &str) -> Value {
        json!({
            "RequirementId": id,
            "ArtifactTypeId": 1,
            "Name": "algo",
            "CustomProperties": [
                {"Definition": {"Name": "Jira Id"}, "StringValue": key},
                {"Definition": {"Name": "Otra"}, "StringValue": "ruido"}
            ]
        })
    }

    #[test]
    fn builds_index_from_correlation_property() {
        let snapshot = vec![requirement(10, "PROJ-1"),
                            requirement(11, "PROJ-2"),
                            json!({"RequirementId": 12, "CustomProperties": []})];
        let index = CorrelationIndex::build(&snapshot, "Jira Id");
        assert_eq!(index.len(), 2);
        assert_eq!(index.find("PROJ-1").unwrap().primary_id, 10);
        assert_eq!(index.find("PROJ-2").unwrap().artifact_type_id, Some(1));
        // sin propiedad de correlación, no participa
        assert!(!index.contains("PROJ-3"));
    }

    #[test]
    fn recognizes_varied_primary_id_keys() {
        let task = json!({
            "TaskId": 77,
            "CustomProperties": [{"Definition": {"Name": "Jira Id"}, "StringValue": "PROJ-5"}]
        });
        let index = CorrelationIndex::build(&[task], "Jira Id");
        assert_eq!(index.find("PROJ-5").unwrap().primary_id, 77);
        assert_eq!(index.find("PROJ-5").unwrap().artifact_type_id, None);
    }
}
