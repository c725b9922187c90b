use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use mig_adapters::transform::{self, capability::CapabilityTransformer,
                              incident::IncidentTransformer,
                              requirement::RequirementTransformer, task::TaskTransformer,
                              TransformContext};
use mig_core::{ArtifactRemover, ArtifactWriter, BatchApplier, BatchCleaner, CorrelationIndex,
               CreatedArtifact, EngineError, MappingConfig, MigrationContext, TargetInventory,
               ATTACHMENTS_FOLDER};
use mig_domain::{ArtifactKind, ComponentRecord, SourceRecord, StagedArtifact, StagingDocument,
                 VersionRecord};

/// Export del sistema de origen, tal como lo deja la etapa de extracción.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceExport {
    issues: Vec<Value>,
    versions: Vec<VersionRecord>,
    components: Vec<ComponentRecord>,
    customfields: Vec<mig_domain::FieldDescriptor>,
    customlists: Vec<Value>,
}

/// Snapshot del destino tomado antes de la corrida: contexto de metadata más
/// los artefactos existentes para el índice de correlación.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TargetSnapshot {
    context: MigrationContext,
    artifacts: Vec<Value>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, EngineError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| EngineError::Setup(format!("cannot read {path}: {e}")))?;
    serde_json::from_str(&raw).map_err(|e| EngineError::Setup(format!("cannot parse {path}: {e}")))
}

fn write_text(path: &str, raw: &str) -> Result<(), EngineError> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)
            .map_err(|e| EngineError::Setup(format!("cannot create {}: {e}", parent.display())))?;
    }
    fs::write(path, raw).map_err(|e| EngineError::Setup(format!("cannot write {path}: {e}")))
}

fn write_json<T: serde::Serialize>(path: &str, value: &T) -> Result<(), EngineError> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::Serialization(e.to_string()))?;
    write_text(path, &raw)
}

/// Recolecta `--flag valor` del estilo de siempre; lo no reconocido se ignora.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn usage() -> ! {
    eprintln!("Uso: mig-cli transform --export <FILE> --snapshot <FILE> --mapping <FILE> [--out <FILE>]");
    eprintln!("     mig-cli apply --staged <FILE> --snapshot <FILE> --mapping <FILE> [--report <FILE>]");
    eprintln!("     mig-cli clean --scope <product|program|documents> --inventory <FILE> [--report <FILE>]");
    std::process::exit(2);
}

fn main() {
    // Cargar .env si existe
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        Some("transform") => run_transform(&args[2..]),
        Some("apply") => run_apply(&args[2..]),
        Some("clean") => run_clean(&args[2..]),
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("[mig-cli] {e}");
        std::process::exit(3);
    }
}

fn run_transform(args: &[String]) -> Result<(), EngineError> {
    let (Some(export_path), Some(snapshot_path), Some(mapping_path)) =
        (flag_value(args, "--export"), flag_value(args, "--snapshot"), flag_value(args, "--mapping"))
    else {
        usage();
    };
    let out_path = flag_value(args, "--out").unwrap_or_else(|| "temp/to_spira.json".to_string());

    let export: SourceExport = read_json(&export_path)?;
    let snapshot: TargetSnapshot = read_json(&snapshot_path)?;
    let config: MappingConfig = read_json(&mapping_path)?;

    let mut ctx = snapshot.context;
    if ctx.source_fields.is_empty() {
        ctx.source_fields = export.customfields.clone();
    }

    let records: Vec<SourceRecord> =
        export.issues.iter().cloned().map(SourceRecord::new).collect();
    let requirement_index =
        CorrelationIndex::build(&snapshot.artifacts, &config.correlation_property);
    let capability_index =
        CorrelationIndex::build(&ctx.capabilities, &config.correlation_property);

    let tc = TransformContext { ctx: &ctx,
                                config: &config,
                                renderer: None,
                                requirement_index: &requirement_index,
                                capability_index: &capability_index };

    let mut staged: Vec<StagedArtifact> = Vec::new();

    // Objetos de programa primero: capabilities y sus milestones
    for current_type in &config.capability_type_order {
        let mut transformer = CapabilityTransformer::new(&tc, current_type);
        staged.extend(transform::run_pass(&mut transformer, &records));
    }
    let capability_records: Vec<SourceRecord> =
        records.iter()
               .filter(|r| {
                   r.issue_type()
                    .map(|t| config.capability_type_order.iter().any(|c| c == t))
                    .unwrap_or(false)
               })
               .cloned()
               .collect();
    staged.extend(transform::milestone::milestones_from_versions(
        &ctx, config.milestone_statuses.as_ref(), &capability_records, &export.versions));

    // Objetos de producto sin jerarquía de issues
    staged.extend(transform::release::releases_from_versions(
        &ctx, config.release_statuses.as_ref(), &export.versions));
    staged.extend(transform::component::components_from_source(&ctx, &export.components));
    staged.extend(transform::customlist::customlists_from_source(&export.customlists));

    // Una pasada por tipo de origen, en el orden configurado
    for current_type in &config.artifact_type_order {
        for kind_key in ["requirements", "tasks", "incidents"] {
            if !config.combined_source_names(kind_key).contains(&current_type.as_str()) {
                continue;
            }
            match kind_key {
                "requirements" => {
                    let mut t = RequirementTransformer::new(&tc, current_type);
                    staged.extend(transform::run_pass(&mut t, &records));
                }
                "tasks" => {
                    let mut t = TaskTransformer::new(&tc, current_type);
                    staged.extend(transform::run_pass(&mut t, &records));
                }
                "incidents" => {
                    let mut t = IncidentTransformer::new(&tc, current_type);
                    staged.extend(transform::run_pass(&mut t, &records));
                }
                _ => unreachable!(),
            }
        }
    }

    // Elementos de issues ya presentes en destino. Carpeta ausente: los
    // documentos viajan con id 0 y el aplicador la crea en el destino.
    let folder_id = match ctx.folder_id_by_name(ATTACHMENTS_FOLDER) {
        Some(id) => id,
        None => {
            println!("folder '{ATTACHMENTS_FOLDER}' not found in target, it will be created \
                      during apply");
            0
        }
    };
    staged.extend(transform::elements::comments_pass(&ctx, None, &records, &requirement_index));
    staged.extend(transform::elements::associations_pass(&records, &requirement_index));
    staged.extend(transform::elements::documents_pass(&ctx,
                                                      &records,
                                                      &requirement_index,
                                                      &config.correlation_property,
                                                      folder_id));

    let document = StagingDocument::new(staged);
    let raw = document.to_json()
                      .map_err(|e| EngineError::Serialization(e.to_string()))?;
    write_text(&out_path, &raw)?;
    println!("staged {} artifact(s) into {out_path} (run {})",
             document.len(),
             document.run_id);
    Ok(())
}

/// Escritor de plan: registra cada creación con un id local secuencial. El
/// transporte real contra el destino queda fuera de este binario; el plan
/// resultante es auditable y reutilizable por esa capa.
struct PlanWriter {
    next_id: i64,
    operations: Vec<Value>,
}

impl PlanWriter {
    fn new() -> Self {
        Self { next_id: 0,
               operations: Vec::new() }
    }
}

impl ArtifactWriter for PlanWriter {
    fn create(&mut self,
              staged: &StagedArtifact,
              parent_id: Option<i64>)
              -> Result<CreatedArtifact, EngineError> {
        self.next_id += 1;
        let raw = serde_json::to_value(staged)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        self.operations.push(serde_json::json!({
            "op": "create",
            "local_id": self.next_id,
            "parent_id": parent_id,
            "artifact": raw,
        }));
        Ok(CreatedArtifact { id: self.next_id,
                             raw: Value::Null })
    }

    fn associate_capability(&mut self,
                            capability_id: i64,
                            requirement_id: i64)
                            -> Result<(), EngineError> {
        self.operations.push(serde_json::json!({
            "op": "associate_capability",
            "capability_id": capability_id,
            "requirement_id": requirement_id,
        }));
        Ok(())
    }

    fn create_document_folder(&mut self, name: &str) -> Result<i64, EngineError> {
        self.next_id += 1;
        self.operations.push(serde_json::json!({
            "op": "create_document_folder",
            "local_id": self.next_id,
            "name": name,
        }));
        Ok(self.next_id)
    }
}

impl ArtifactRemover for PlanWriter {
    fn delete(&mut self, kind: ArtifactKind, id: i64) -> Result<(), EngineError> {
        self.operations.push(serde_json::json!({
            "op": "delete",
            "artifact_type": kind,
            "id": id,
        }));
        Ok(())
    }

    fn remove_document_association(&mut self,
                                   artifact_type_id: i64,
                                   artifact_id: i64,
                                   document_id: i64)
                                   -> Result<(), EngineError> {
        self.operations.push(serde_json::json!({
            "op": "remove_document_association",
            "artifact_type_id": artifact_type_id,
            "artifact_id": artifact_id,
            "document_id": document_id,
        }));
        Ok(())
    }

    fn delete_document_folder(&mut self, folder_id: i64) -> Result<(), EngineError> {
        self.operations.push(serde_json::json!({
            "op": "delete_document_folder",
            "folder_id": folder_id,
        }));
        Ok(())
    }
}

fn run_apply(args: &[String]) -> Result<(), EngineError> {
    let (Some(staged_path), Some(snapshot_path), Some(mapping_path)) =
        (flag_value(args, "--staged"), flag_value(args, "--snapshot"), flag_value(args, "--mapping"))
    else {
        usage();
    };
    let report_path =
        flag_value(args, "--report").unwrap_or_else(|| "temp/apply_report.json".to_string());

    let raw = fs::read_to_string(&staged_path)
        .map_err(|e| EngineError::Setup(format!("cannot read {staged_path}: {e}")))?;
    let document = StagingDocument::from_json(&raw)
        .map_err(|e| EngineError::Setup(format!("cannot parse {staged_path}: {e}")))?;
    let snapshot: TargetSnapshot = read_json(&snapshot_path)?;
    let config: MappingConfig = read_json(&mapping_path)?;

    let index = CorrelationIndex::build(&snapshot.artifacts, &config.correlation_property);
    let capability_index =
        CorrelationIndex::build(&snapshot.context.capabilities, &config.correlation_property);
    let applier = BatchApplier::new(&index, &capability_index, &config.correlation_property);

    let (releases, rest): (Vec<StagedArtifact>, Vec<StagedArtifact>) =
        document.product
                .into_iter()
                .partition(|s| s.payload.kind() == ArtifactKind::Release);

    let mut writer = PlanWriter::new();
    let mut result = applier.apply_releases(&mut writer, &releases);
    result.merge(applier.apply(&mut writer, &rest));

    write_json(&report_path, &serde_json::json!({
        "summary": result.to_string(),
        "attempted": result.attempted,
        "succeeded": result.succeeded,
        "failures": result.failures,
        "operations": writer.operations,
    }))?;

    println!("{result}");
    if !result.failures.is_empty() {
        println!("{} diagnostic(s) written to {report_path}", result.failures.len());
    }
    Ok(())
}

fn run_clean(args: &[String]) -> Result<(), EngineError> {
    let (Some(scope), Some(inventory_path)) =
        (flag_value(args, "--scope"), flag_value(args, "--inventory"))
    else {
        usage();
    };
    let report_path =
        flag_value(args, "--report").unwrap_or_else(|| "temp/clean_report.json".to_string());

    let inventory: TargetInventory = read_json(&inventory_path)?;
    let mut remover = PlanWriter::new();
    let result = match scope.as_str() {
        "product" => BatchCleaner::clean_product(&mut remover, &inventory),
        "program" => BatchCleaner::clean_program(&mut remover, &inventory),
        "documents" => BatchCleaner::clean_documents(&mut remover, &inventory),
        _ => usage(),
    };

    write_json(&report_path, &serde_json::json!({
        "summary": result.to_string(),
        "attempted": result.attempted,
        "succeeded": result.succeeded,
        "failures": result.failures,
        "operations": remover.operations,
    }))?;

    println!("{result}");
    Ok(())
}
