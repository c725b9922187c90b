//! Opciones de campos de selección de origen → listas configurables destino.

use serde_json::Value;

use mig_domain::{ArtifactPayload, CustomListPayload, CustomListValuePayload, StagedArtifact};

/// Arma las listas configurables desde el export de campos de origen. Cada
/// entrada trae `Name` y `Values` con objetos `{"value": ...}`.
pub fn customlists_from_source(lists: &[Value]) -> Vec<StagedArtifact> {
    lists.iter()
         .filter_map(|list| {
             let name = list.get("Name")?.as_str()?.to_string();
             let values = list.get("Values")
                              .and_then(Value::as_array)
                              .map(|items| {
                                  items.iter()
                                       .filter_map(|item| item.get("value")?.as_str())
                                       .map(|value| CustomListValuePayload { name:   value.into(),
                                                                             active: true })
                                       .collect()
                              })
                              .unwrap_or_default();
             let payload = CustomListPayload { name,
                                               active: true,
                                               values };
             Some(StagedArtifact::new(ArtifactPayload::CustomList(payload)))
         })
         .collect()
}
