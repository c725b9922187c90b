//! Resultado agregado de una pasada de migración.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Entrada de diagnóstico de un registro que no pudo aplicarse. Lleva el
/// payload completo para inspección manual posterior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDiagnostic {
    /// Etapa donde ocurrió el fallo ("create", "associate", "upload"...).
    pub stage: String,
    /// Clave de correlación del registro, si se conoce.
    pub key: Option<String>,
    pub message: String,
    pub payload: Value,
}

/// Conteo de una pasada: intentados, exitosos y diagnósticos por fallo.
/// La señal operativa es el desbalance `succeeded < attempted`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<FailureDiagnostic>,
}

impl MigrationResult {
    pub fn new(attempted: usize) -> Self {
        Self { attempted,
               succeeded: attempted,
               failures: Vec::new() }
    }

    /// Registra un fallo de creación: descuenta el éxito y guarda diagnóstico.
    pub fn record_failure(&mut self, diagnostic: FailureDiagnostic) {
        self.succeeded = self.succeeded.saturating_sub(1);
        self.failures.push(diagnostic);
    }

    /// Registra un fallo que no descuenta éxito (p.ej. vínculo post-creación).
    pub fn record_side_failure(&mut self, diagnostic: FailureDiagnostic) {
        self.failures.push(diagnostic);
    }

    pub fn merge(&mut self, other: MigrationResult) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for MigrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processed {} of {} found", self.succeeded, self.attempted)
    }
}
