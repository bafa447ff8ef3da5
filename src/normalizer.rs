use crate::types::{MotionSample, NUM_AXES};
use thiserror::Error;

/// Media por canal calibrada offline sobre el dataset de entrenamiento
pub const MEAN: [f32; NUM_AXES] = [0.9115, -0.0792, -0.2418, 2.3791, -10.2013, -1.6355];

/// Desviación estándar por canal calibrada offline
pub const STD: [f32; NUM_AXES] = [0.2704, 0.2168, 0.3940, 61.2469, 98.9243, 28.8040];

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("STD del canal {axis} es cero, no se puede normalizar")]
    ZeroStd { axis: usize },

    #[error("Constante no finita en el canal {axis}")]
    NotFinite { axis: usize },
}

/// Normalización z-score por canal: (x - mean) / std.
/// Función pura; las constantes se validan una sola vez al construir,
/// nunca por muestra.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    mean: [f32; NUM_AXES],
    std: [f32; NUM_AXES],
}

impl Normalizer {
    pub fn new(mean: [f32; NUM_AXES], std: [f32; NUM_AXES]) -> Result<Self, NormalizerError> {
        for axis in 0..NUM_AXES {
            if !mean[axis].is_finite() || !std[axis].is_finite() {
                return Err(NormalizerError::NotFinite { axis });
            }
            if std[axis] == 0.0 {
                return Err(NormalizerError::ZeroStd { axis });
            }
        }
        Ok(Self { mean, std })
    }

    /// Normalizador con las constantes de calibración del modelo
    pub fn calibrated() -> Self {
        // MEAN/STD son constantes en tiempo de compilación, todas no nulas
        Self { mean: MEAN, std: STD }
    }

    /// Convierte una muestra cruda en su vector de características
    pub fn normalize(&self, sample: &MotionSample) -> [f32; NUM_AXES] {
        let raw = sample.channels();
        let mut out = [0.0f32; NUM_AXES];
        for i in 0..NUM_AXES {
            out[i] = (raw[i] - self.mean[i]) / self.std[i];
        }
        out
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::calibrated()
    }
}
