//! Resolución de valores categóricos de origen a ids del destino.
//!
//! Nunca falla: la ausencia de mapeo o de objeto destino degrada a id 0 con
//! un warning ("must be set manually"), para no bloquear la migración.

use indexmap::IndexMap;
use log::warn;

use crate::context::{NamedId, TypeTable};

pub struct TypeMappingResolver;

impl TypeMappingResolver {
    /// Nombre de tipo destino mapeado a un tipo de origen, si existe.
    pub fn mapped_target_type_name<'a>(table: &'a TypeTable, source_type: &str) -> Option<&'a str> {
        table.iter()
             .find(|(_, sources)| sources.contains(source_type))
             .map(|(target, _)| target.as_str())
    }

    /// Estado origen → id de estado destino vía tabla nombre→nombre.
    pub fn resolve_status(mapping: &IndexMap<String, String>,
                          target_statuses: &[NamedId],
                          source_status: &str)
                          -> i64 {
        let Some(mapped_name) = mapping.get(source_status) else {
            warn!("status '{source_status}' has no configured mapping, must be set manually");
            return 0;
        };
        match target_statuses.iter().find(|s| &s.name == mapped_name) {
            Some(status) => status.id,
            None => {
                warn!("mapped status '{mapped_name}' not found in target, must be set manually");
                0
            }
        }
    }

    /// Tipo de issue origen → id de tipo destino.
    pub fn resolve_type(table: &TypeTable, target_types: &[NamedId], source_type: Option<&str>) -> i64 {
        let Some(source_type) = source_type else {
            warn!("issue type is null, artifact type will have to be set manually in target");
            return 0;
        };
        let Some(target_name) = Self::mapped_target_type_name(table, source_type) else {
            warn!("type '{source_type}' has no configured mapping, must be set manually");
            return 0;
        };
        match target_types.iter().find(|t| t.name == target_name) {
            Some(target) => target.id,
            None => {
                warn!("mapped type '{target_name}' not found in target, must be set manually");
                0
            }
        }
    }

    /// Prioridad origen → id de prioridad/importancia destino. Un origen con
    /// prioridad null se migra igual, con id 0.
    pub fn resolve_priority(mapping: &IndexMap<String, String>,
                            target_priorities: &[NamedId],
                            source_priority: Option<&str>)
                            -> i64 {
        let Some(source_priority) = source_priority else {
            warn!("priority is null, artifact priority will have to be set manually in target");
            return 0;
        };
        let Some(mapped_name) = mapping.get(source_priority) else {
            warn!("priority '{source_priority}' has no configured mapping, must be set manually");
            return 0;
        };
        target_priorities.iter()
                         .find(|p| &p.name == mapped_name)
                         .map(|p| p.id)
                         .unwrap_or(0)
    }
}
