//! Encoder de propiedades configurables, con dispatch por tipo declarado.
//!
//! Cada mapeo del operador produce a lo sumo un `PropertyValue` con un único
//! slot poblado según el tipo. Las fallas de texto degradan a strings
//! centinela visibles en el destino, nunca a un skip silencioso del
//! artefacto completo.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::warn;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::clients::MarkupRenderer;
use crate::context::CustomPropMapping;
use mig_domain::{CustomPropertyDefinition, FieldDescriptor, PropertyDefinitionRef, PropertyKind,
                 PropertyValue, SourceRecord};

/// El valor de texto no sobrevivió la validación JSON.
pub const TEXT_JSON_FAILURE: &str =
    "--MIGRATION OF TEXT FAILED because of error during JSON validation--";
/// El colaborador de renderizado respondió no-éxito.
pub const TEXT_RENDER_FAILURE: &str =
    "--MIGRATION OF TEXT FAILED because of jira renderer error--";
/// Rich text vacío o null en origen.
pub const TEXT_EMPTY: &str = "--EMPTY--";

/// Formatos de fecha del origen, en orden de precedencia. Gana el primero
/// que parsea.
static SOURCE_DATE_FORMATS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["%Y-%m-%d", "%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S%.f%z"]);

/// Normaliza una fecha de origen al formato canónico del destino
/// (`YYYY-MM-DDTHH:MM:SS`). Si ningún formato matchea, el valor viaja tal
/// cual: el destino decide si lo acepta.
pub fn normalize_datetime(raw: &str) -> String {
    for format in SOURCE_DATE_FORMATS.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0)
                       .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
                       .unwrap_or_else(|| raw.to_string());
        }
        // Con offset primero: el parse naive aceptaría el string ignorando
        // el offset y correría la hora.
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string();
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return dt.format("%Y-%m-%dT%H:%M:%S").to_string();
        }
    }
    raw.to_string()
}

/// Encoder atado a las definiciones de una clase de artefacto. Vive lo que
/// dura la pasada; acumula el conteo de propiedades descartadas para
/// reportarlo una sola vez al final.
pub struct CustomPropertyEncoder<'a> {
    definitions: &'a [CustomPropertyDefinition],
    project_template_id: Option<i64>,
    renderer: Option<&'a dyn MarkupRenderer>,
    dropped: usize,
}

impl<'a> CustomPropertyEncoder<'a> {
    pub fn new(definitions: &'a [CustomPropertyDefinition],
               project_template_id: Option<i64>,
               renderer: Option<&'a dyn MarkupRenderer>)
               -> Self {
        Self { definitions,
               project_template_id,
               renderer,
               dropped: 0 }
    }

    fn definition_for(&self, target_name: &str) -> Option<&'a CustomPropertyDefinition> {
        self.definitions.iter().find(|d| d.name == target_name)
    }

    /// Propiedades descartadas hasta ahora (mapeadas por el operador pero
    /// inexistentes en el destino).
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// Codifica todos los mapeos configurados para un registro, en el orden
    /// del archivo de mapeo. Un mapeo sin definición destino se descarta con
    /// warning y cuenta en `dropped_count`.
    pub fn encode_all(&mut self,
                      mappings: &[CustomPropMapping],
                      record: &SourceRecord,
                      source_fields: &[FieldDescriptor])
                      -> Vec<PropertyValue> {
        let mut values = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            // Sin colaborador de renderizado no hay conversión posible: el
            // mapeo rich text se saltea entero.
            if mapping.kind == PropertyKind::RichText && self.renderer.is_none() {
                warn!("no markup renderer available, rich text property '{}' skipped",
                      mapping.target_name);
                continue;
            }
            let raw = self.extract(mapping, record, source_fields);
            match self.definition_for(&mapping.target_name) {
                Some(definition) => {
                    values.push(self.encode_value(mapping.kind, definition, raw));
                }
                None => {
                    self.dropped += 1;
                    warn!("custom property '{}' not found in target, value dropped",
                          mapping.target_name);
                }
            }
        }
        values
    }

    /// Valor de la propiedad de correlación para un registro. `None` si la
    /// propiedad no existe en el destino (la correlación queda rota para
    /// este artefacto, se avisa).
    pub fn correlation_value(&self,
                             property_name: &str,
                             key: &str)
                             -> Option<PropertyValue> {
        match self.definition_for(property_name) {
            Some(definition) => {
                let definition_ref = PropertyDefinitionRef::from_definition(
                    definition, PropertyKind::Text, self.project_template_id);
                Some(PropertyValue::text(definition_ref, Some(key.to_string())))
            }
            None => {
                warn!("correlation property '{property_name}' not found in target, \
                       artifact for '{key}' will not be re-identifiable");
                None
            }
        }
    }

    /// Valor fecha-hora para una propiedad nombrada (p.ej. la fecha de
    /// creación en origen, que el destino no deja escribir directo).
    pub fn date_time_value(&self, property_name: &str, raw: &str) -> Option<PropertyValue> {
        let definition = self.definition_for(property_name)?;
        let definition_ref = PropertyDefinitionRef::from_definition(definition,
                                                                    PropertyKind::DateTime,
                                                                    self.project_template_id);
        Some(PropertyValue::date_time(definition_ref, Some(normalize_datetime(raw))))
    }

    fn extract<'r>(&self,
                   mapping: &CustomPropMapping,
                   record: &'r SourceRecord,
                   source_fields: &[FieldDescriptor])
                   -> Option<&'r Value> {
        if let Some(source_key) = &mapping.source_key {
            return record.field(source_key).filter(|v| !v.is_null());
        }
        if let Some(field_name) = &mapping.source_field_name {
            return record.custom_field(source_fields, field_name);
        }
        None
    }

    fn encode_value(&self,
                    kind: PropertyKind,
                    definition: &CustomPropertyDefinition,
                    raw: Option<&Value>)
                    -> PropertyValue {
        let definition_ref =
            PropertyDefinitionRef::from_definition(definition, kind, self.project_template_id);
        match kind {
            PropertyKind::Text => {
                PropertyValue::text(definition_ref, raw.map(text_repr))
            }
            PropertyKind::RichText => {
                PropertyValue::text(definition_ref, Some(self.rich_text_repr(raw)))
            }
            PropertyKind::Date | PropertyKind::DateTime => {
                let normalized = raw.and_then(Value::as_str).map(normalize_datetime);
                PropertyValue::date_time(definition_ref, normalized)
            }
            PropertyKind::Decimal => {
                PropertyValue::decimal(definition_ref, raw.and_then(Value::as_f64))
            }
            PropertyKind::List => {
                let id = raw.and_then(|v| self.resolve_list_value(definition, v));
                PropertyValue::integer(definition_ref, id)
            }
            PropertyKind::MultiselectList => {
                let ids = raw.and_then(Value::as_array).map(|items| {
                              items.iter()
                                   .filter_map(|item| self.resolve_list_value(definition, item))
                                   .collect()
                          });
                PropertyValue::integer_list(definition_ref, ids)
            }
        }
    }

    fn rich_text_repr(&self, raw: Option<&Value>) -> String {
        render_rich_text(self.renderer, raw.and_then(Value::as_str))
    }

    /// Nombre de un item de lista de origen → id de valor permitido destino.
    /// Sin match es `None` con warning; los demás items del multiselect
    /// siguen resolviéndose.
    fn resolve_list_value(&self, definition: &CustomPropertyDefinition, item: &Value) -> Option<i64> {
        let name = item.get("value")
                       .and_then(Value::as_str)
                       .or_else(|| item.as_str())?;
        let list = definition.custom_list.as_ref()?;
        match list.value_ids().get(name) {
            Some(id) => Some(*id),
            None => {
                warn!("list value '{}' not found in target list '{}', value dropped",
                      name, list.name);
                None
            }
        }
    }
}

/// Rich text pasa por el colaborador de renderizado. Vacío o null en origen
/// se marca explícito en lugar de omitirse; un render fallido degrada a
/// centinela sin descartar el artefacto.
pub fn render_rich_text(renderer: Option<&dyn MarkupRenderer>, raw: Option<&str>) -> String {
    let markup = match raw {
        Some(s) if !s.is_empty() => s,
        _ => return TEXT_EMPTY.to_string(),
    };
    match renderer {
        Some(renderer) => match renderer.render(markup) {
            Ok(html) => html,
            Err(err) => {
                warn!("rich text render failed: {err}");
                TEXT_RENDER_FAILURE.to_string()
            }
        },
        None => markup.to_string(),
    }
}

/// Representación de texto plano de un valor de origen. Un valor compuesto
/// viaja como su serialización JSON; si esa serialización falla, centinela.
fn text_repr(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| TEXT_JSON_FAILURE.to_string()),
    }
}
