use crate::types::{NUM_AXES, SAMPLE_COUNT_PER_GESTURE, WINDOW_FEATURES};

/// Ventana de gesto: exactamente SAMPLE_COUNT_PER_GESTURE vectores de
/// características en un buffer plano [muestra * 6 + canal], el layout que
/// espera la entrada del modelo.
///
/// Invariante: contiene entre 0 y N muestras válidas; solo se clasifica
/// cuando el contador es exactamente N. El reset conserva la capacidad,
/// no hay realocación por gesto.
pub struct WindowBuffer {
    data: Vec<f32>,
}

impl WindowBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(WINDOW_FEATURES),
        }
    }

    /// Añade un vector de características en la siguiente posición libre.
    /// Retorna `true` si la ventana quedó completa con esta muestra.
    /// Con la ventana ya completa la muestra se descarta (el buffer es de
    /// solo lectura hasta que la clasificación lo consuma).
    pub fn push(&mut self, features: &[f32; NUM_AXES]) -> bool {
        if self.is_complete() {
            return true;
        }
        self.data.extend_from_slice(features);
        self.is_complete()
    }

    /// Número de muestras acumuladas
    pub fn len(&self) -> usize {
        self.data.len() / NUM_AXES
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.data.len() == WINDOW_FEATURES
    }

    /// Ventana aplanada lista para inferencia; `None` si está incompleta
    pub fn as_slice(&self) -> Option<&[f32]> {
        if self.is_complete() {
            Some(&self.data)
        } else {
            None
        }
    }

    /// Vacía la ventana conservando la capacidad reservada
    pub fn reset(&mut self) {
        self.data.clear();
    }
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new()
    }
}
