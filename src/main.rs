/// Validación 1: normalización de fechas de origen al formato destino.
fn run_datetime_validation() {
    use mig_core::normalize_datetime;

    assert_eq!(normalize_datetime("2023-05-10"), "2023-05-10T00:00:00");
    assert_eq!(normalize_datetime("2023-05-10T08:30:00.000Z"), "2023-05-10T08:30:00");
    // con offset, la hora se normaliza a UTC
    assert_eq!(normalize_datetime("2023-05-10T10:30:00.000+0200"), "2023-05-10T08:30:00");
    // lo no parseable pasa intacto, el destino decide
    assert_eq!(normalize_datetime("mañana"), "mañana");

    println!("!Validación 1: OK (normalización de fechas)");
}

/// Validación 2: clasificación de releases y matching padre/hija.
fn run_hierarchy_validation() {
    use mig_core::{classify, ReleaseRole, ReleaseTable};

    assert_eq!(classify("2"), ReleaseRole::Parent);
    assert_eq!(classify("2.1"), ReleaseRole::Parent);
    assert_eq!(classify("1.2.3"), ReleaseRole::Child);
    assert_eq!(classify("Release-X"), ReleaseRole::Child);

    let mut table = ReleaseTable::default();
    table.insert("1.2", 101);
    table.insert("2.0", 102);
    assert_eq!(table.find_parent("1.2.3"), Some(101));
    assert_eq!(table.find_parent("3.0.1"), None);

    println!("!Validación 2: OK (clasificación de releases)");
}

/// Escritor en memoria que asigna ids secuenciales y devuelve un artefacto
/// crudo con las mismas CustomProperties, para poder reconstruir el índice
/// de correlación como lo haría un snapshot real del destino.
struct EchoWriter {
    next_id: i64,
    snapshot: Vec<serde_json::Value>,
    associations: Vec<(i64, i64)>,
}

impl EchoWriter {
    fn new() -> Self {
        Self { next_id: 100,
               snapshot: Vec::new(),
               associations: Vec::new() }
    }
}

impl mig_core::ArtifactWriter for EchoWriter {
    fn create(&mut self,
              staged: &mig_domain::StagedArtifact,
              _parent_id: Option<i64>)
              -> Result<mig_core::CreatedArtifact, mig_core::EngineError> {
        self.next_id += 1;
        let key = staged.payload
                        .custom_properties()
                        .and_then(|props| {
                            props.iter()
                                 .find(|p| p.definition.name == "Jira Id")
                                 .and_then(|p| p.string_value.clone())
                        });
        let raw = serde_json::json!({
            "RequirementId": self.next_id,
            "ArtifactTypeId": 1,
            "CustomProperties": [
                {"Definition": {"Name": "Jira Id"}, "StringValue": key}
            ]
        });
        self.snapshot.push(raw.clone());
        Ok(mig_core::CreatedArtifact { id: self.next_id,
                                       raw })
    }

    fn associate_capability(&mut self,
                            capability_id: i64,
                            requirement_id: i64)
                            -> Result<(), mig_core::EngineError> {
        self.associations.push((capability_id, requirement_id));
        Ok(())
    }

    fn create_document_folder(&mut self, _name: &str) -> Result<i64, mig_core::EngineError> {
        self.next_id += 1;
        Ok(self.next_id)
    }
}

fn staged_requirement(key: &str, name: &str) -> mig_domain::StagedArtifact {
    use mig_domain::{ArtifactPayload, CustomPropertyDefinition, PropertyDefinitionRef,
                     PropertyKind, PropertyValue, RequirementPayload, StagedArtifact};

    let def: CustomPropertyDefinition = serde_json::from_value(serde_json::json!({
        "Name": "Jira Id",
        "PropertyNumber": 1,
        "CustomPropertyId": 42,
        "ArtifactTypeId": 1,
        "CustomPropertyFieldName": "Custom_01",
        "CustomPropertyTypeId": 1
    })).expect("definición de propiedad");
    let correlation = PropertyValue::text(
        PropertyDefinitionRef::from_definition(&def, PropertyKind::Text, Some(9)),
        Some(key.to_string()));

    let payload = RequirementPayload { status_id:            1,
                                       requirement_type_id:  4,
                                       author_id:            None,
                                       owner_id:             None,
                                       importance_id:        0,
                                       release_id:           None,
                                       component_id:         None,
                                       name:                 name.to_string(),
                                       description:          "--EMPTY--".to_string(),
                                       estimate_points:      None,
                                       start_date:           None,
                                       end_date:             None,
                                       percent_complete:     None,
                                       goal_id:              None,
                                       is_suspect:           false,
                                       custom_properties:    vec![correlation] };
    StagedArtifact::new(ArtifactPayload::Requirement(payload))
}

/// Validación 3: aplicación por lote idempotente. La segunda corrida, con el
/// índice reconstruido desde lo creado, no vuelve a escribir nada.
fn run_apply_validation() {
    use mig_core::{BatchApplier, CorrelationIndex};

    let staged = vec![staged_requirement("PROJ-1", "Login"),
                      staged_requirement("PROJ-2", "Logout")];

    let empty = CorrelationIndex::build(&[], "Jira Id");
    let empty_caps = CorrelationIndex::build(&[], "Jira Id");
    let applier = BatchApplier::new(&empty, &empty_caps, "Jira Id");

    let mut writer = EchoWriter::new();
    let result = applier.apply(&mut writer, &staged);
    assert_eq!(result.attempted, 2, "primera corrida: dos intentos");
    assert_eq!(result.succeeded, 2, "primera corrida: dos creados");
    assert_eq!(writer.snapshot.len(), 2);
    println!("primera corrida: {result}");

    // Segunda corrida sobre el snapshot que dejó la primera
    let rebuilt = CorrelationIndex::build(&writer.snapshot, "Jira Id");
    assert_eq!(rebuilt.len(), 2, "el índice reconstruido ve los dos creados");
    let applier = BatchApplier::new(&rebuilt, &empty_caps, "Jira Id");
    let mut writer2 = EchoWriter::new();
    let result2 = applier.apply(&mut writer2, &staged);
    assert_eq!(result2.attempted, 0, "segunda corrida: nada que hacer");
    assert!(writer2.snapshot.is_empty(), "segunda corrida: cero escrituras");
    println!("segunda corrida: {result2}");

    println!("!Validación 3: OK (aplicación idempotente)");
}

/// Validación 4: resolución de jerarquía desde las pistas de staging. Para
/// requirements gana el epic link; la asociación a capability prefiere el
/// parent link.
fn run_hints_validation() {
    use mig_core::{CorrelationIndex, HierarchyResolver};

    let snapshot = vec![serde_json::json!({
                            "RequirementId": 50,
                            "CustomProperties": [
                                {"Definition": {"Name": "Jira Id"}, "StringValue": "EPIC-1"}
                            ]
                        }),
                        serde_json::json!({
                            "RequirementId": 60,
                            "CustomProperties": [
                                {"Definition": {"Name": "Jira Id"}, "StringValue": "INIT-1"}
                            ]
                        })];
    let index = CorrelationIndex::build(&snapshot, "Jira Id");
    let resolver = HierarchyResolver::new(&index);

    let epic = Some("EPIC-1".to_string());
    let parent = Some("INIT-1".to_string());
    assert_eq!(resolver.resolve_requirement_parent(epic.as_deref(), parent.as_deref()),
               Some(50));
    assert_eq!(resolver.resolve_capability_link(epic.as_deref(), parent.as_deref()),
               Some(60));
    // sin pistas no hay padre
    assert_eq!(resolver.resolve_requirement_parent(None, None), None);

    println!("!Validación 4: OK (jerarquía desde pistas)");
}

fn main() {
    // Cargar variables de entorno desde .env si existe
    let _ = dotenvy::dotenv();

    run_datetime_validation();
    run_hierarchy_validation();
    run_apply_validation();
    run_hints_validation();

    println!("Todas las validaciones pasaron");
}
