//! Errores del motor.
//!
//! Solo `Setup` es fatal (aborta la corrida completa). El resto se captura
//! en el alcance más angosto posible y se convierte en skip + diagnóstico.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    /// No se pudo construir el contexto de la corrida (contenedor destino,
    /// configuración de mapeo, autenticación). Aborta con exit != 0.
    #[error("setup failed: {0}")]
    Setup(String),
    /// El destino rechazó una creación/actualización. Se aísla por registro.
    #[error("write rejected: {0}")]
    Write(String),
    /// El colaborador de renderizado de markup respondió no-éxito.
    #[error("markup render failed: {0}")]
    Render(String),
    /// Un valor no pudo serializarse de forma estructurada.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
