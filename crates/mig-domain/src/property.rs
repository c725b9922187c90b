//! Propiedades configurables del sistema destino.
//!
//! `CustomPropertyDefinition` es metadata leída del destino; `PropertyValue`
//! es el valor serializado que viaja en un payload. El invariante central es
//! la exclusividad: cada `PropertyValue` lleva exactamente un slot poblado y
//! ese slot coincide con el tipo declarado de su definición. Los
//! constructores de este módulo hacen el invariante imposible de violar por
//! construcción y `populated_slots()` lo deja verificable en tests.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tipo declarado de una propiedad configurable, con los tags snake_case del
/// archivo de mapeo del operador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Text,
    RichText,
    Date,
    DateTime,
    Decimal,
    List,
    MultiselectList,
}

impl PropertyKind {
    /// Nombre del tipo tal como lo reporta el destino en su metadata.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyKind::Text | PropertyKind::RichText => "Text",
            PropertyKind::Date | PropertyKind::DateTime => "Date & Time",
            PropertyKind::Decimal => "Decimal",
            PropertyKind::List => "List",
            PropertyKind::MultiselectList => "Multiselect List",
        }
    }

    pub fn system_data_type(&self) -> &'static str {
        match self {
            PropertyKind::Text | PropertyKind::RichText => "System.String",
            PropertyKind::Date | PropertyKind::DateTime => "System.DateTime",
            PropertyKind::Decimal => "System.Decimal",
            PropertyKind::List => "System.Int32",
            PropertyKind::MultiselectList => "System.Collections.Generic.List`1[System.Int32]",
        }
    }
}

/// Valor permitido de una lista configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomListValue {
    #[serde(rename = "CustomPropertyValueId")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Lista configurable del destino con sus valores permitidos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomListDefinition {
    #[serde(rename = "CustomPropertyListId")]
    pub list_id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Values", default)]
    pub values: Vec<CustomListValue>,
}

impl CustomListDefinition {
    /// Mapa nombre → id construido una vez por pasada (lookup O(1) en lugar
    /// de escaneo lineal por cada valor).
    pub fn value_ids(&self) -> IndexMap<&str, i64> {
        self.values.iter().map(|v| (v.name.as_str(), v.id)).collect()
    }
}

/// Metadata de una propiedad configurable en el destino, leída al inicio de
/// cada pasada. Solo lectura durante la pasada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPropertyDefinition {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "PropertyNumber")]
    pub property_number: i64,
    #[serde(rename = "CustomPropertyId")]
    pub custom_property_id: i64,
    #[serde(rename = "ArtifactTypeId")]
    pub artifact_type_id: i64,
    #[serde(rename = "CustomPropertyFieldName")]
    pub field_name: String,
    #[serde(rename = "CustomPropertyTypeId")]
    pub type_id: i64,
    #[serde(rename = "CustomList", default)]
    pub custom_list: Option<CustomListDefinition>,
}

/// Referencia a la lista dentro del bloque `Definition` del wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomListRef {
    #[serde(rename = "CustomPropertyListId")]
    pub list_id: i64,
    #[serde(rename = "ProjectTemplateId")]
    pub project_template_id: Option<i64>,
}

/// Bloque `Definition` que el destino exige junto a cada valor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDefinitionRef {
    #[serde(rename = "CustomPropertyId")]
    pub custom_property_id: i64,
    #[serde(rename = "ProjectTemplateId")]
    pub project_template_id: Option<i64>,
    #[serde(rename = "ArtifactTypeId")]
    pub artifact_type_id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CustomList")]
    pub custom_list: Option<CustomListRef>,
    #[serde(rename = "CustomPropertyFieldName")]
    pub field_name: String,
    #[serde(rename = "CustomPropertyTypeId")]
    pub type_id: i64,
    #[serde(rename = "CustomPropertyTypeName")]
    pub type_name: String,
    #[serde(rename = "PropertyNumber")]
    pub property_number: i64,
    #[serde(rename = "SystemDataType")]
    pub system_data_type: String,
}

impl PropertyDefinitionRef {
    /// Construye el bloque wire desde la metadata. `project_template_id` es
    /// `None` a nivel de programa (capabilities), el id de template a nivel
    /// de producto.
    pub fn from_definition(def: &CustomPropertyDefinition,
                           kind: PropertyKind,
                           project_template_id: Option<i64>)
                           -> Self {
        let (name, custom_list) = match &def.custom_list {
            Some(list) => (list.name.clone(),
                           Some(CustomListRef { list_id: list.list_id,
                                                project_template_id })),
            None => (def.field_name.clone(), None),
        };
        Self { custom_property_id: def.custom_property_id,
               project_template_id,
               artifact_type_id: def.artifact_type_id,
               name,
               custom_list,
               field_name: def.field_name.clone(),
               type_id: def.type_id,
               type_name: kind.type_name().to_string(),
               property_number: def.property_number,
               system_data_type: kind.system_data_type().to_string() }
    }
}

/// Valor de propiedad listo para el wire. Exactamente un slot no nulo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "PropertyNumber")]
    pub property_number: i64,
    #[serde(rename = "StringValue")]
    pub string_value: Option<String>,
    #[serde(rename = "IntegerValue")]
    pub integer_value: Option<i64>,
    #[serde(rename = "BooleanValue")]
    pub boolean_value: Option<bool>,
    #[serde(rename = "DateTimeValue")]
    pub date_time_value: Option<String>,
    #[serde(rename = "DecimalValue")]
    pub decimal_value: Option<f64>,
    #[serde(rename = "IntegerListValue")]
    pub integer_list_value: Option<Vec<i64>>,
    #[serde(rename = "Definition")]
    pub definition: PropertyDefinitionRef,
}

impl PropertyValue {
    fn blank(definition: PropertyDefinitionRef) -> Self {
        Self { property_number: definition.property_number,
               string_value: None,
               integer_value: None,
               boolean_value: None,
               date_time_value: None,
               decimal_value: None,
               integer_list_value: None,
               definition }
    }

    pub fn text(definition: PropertyDefinitionRef, value: Option<String>) -> Self {
        let mut p = Self::blank(definition);
        p.string_value = value;
        p
    }

    pub fn integer(definition: PropertyDefinitionRef, value: Option<i64>) -> Self {
        let mut p = Self::blank(definition);
        p.integer_value = value;
        p
    }

    pub fn boolean(definition: PropertyDefinitionRef, value: Option<bool>) -> Self {
        let mut p = Self::blank(definition);
        p.boolean_value = value;
        p
    }

    pub fn date_time(definition: PropertyDefinitionRef, value: Option<String>) -> Self {
        let mut p = Self::blank(definition);
        p.date_time_value = value;
        p
    }

    pub fn decimal(definition: PropertyDefinitionRef, value: Option<f64>) -> Self {
        let mut p = Self::blank(definition);
        p.decimal_value = value;
        p
    }

    pub fn integer_list(definition: PropertyDefinitionRef, value: Option<Vec<i64>>) -> Self {
        let mut p = Self::blank(definition);
        p.integer_list_value = value;
        p
    }

    /// Cantidad de slots de valor poblados. Un valor bien formado tiene a lo
    /// sumo uno (cero cuando el origen era null o la lista no matcheó).
    pub fn populated_slots(&self) -> usize {
        usize::from(self.string_value.is_some())
        + usize::from(self.integer_value.is_some())
        + usize::from(self.boolean_value.is_some())
        + usize::from(self.date_time_value.is_some())
        + usize::from(self.decimal_value.is_some())
        + usize::from(self.integer_list_value.is_some())
    }

    /// El invariante de exclusividad, verificable directo en asserts.
    pub fn is_exclusive(&self) -> bool {
        self.populated_slots() <= 1
    }
}
