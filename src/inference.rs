use crate::types::{ClassScores, NUM_CLASSES, WINDOW_FEATURES};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::ValueType;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("ONNX Runtime error: {0}")]
    OnnxError(#[from] ort::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid window size: expected {expected}, got {actual}")]
    InvalidWindowSize { expected: usize, actual: usize },

    #[error("Invalid score count: expected {expected}, got {actual}")]
    InvalidScoreCount { expected: usize, actual: usize },

    #[error("Missing ONNX {kind}")]
    MissingIo { kind: &'static str },
}

/// Backend de inferencia visto desde el clasificador por votación.
///
/// Sin estado entre llamadas desde el punto de vista del caller: pasadas
/// repetidas sobre la misma ventana pueden devolver puntuaciones distintas
/// (cuantización, no determinismo de operadores), y justamente de esa
/// variación se alimenta el sistema de votación.
pub trait InferenceBackend {
    /// Una pasada de inferencia sobre la ventana aplanada [N*6]
    fn classify(&mut self, window: &[f32]) -> Result<ClassScores, InferenceError>;
}

#[derive(Debug, Deserialize)]
struct ClassesJson {
    index_to_class: HashMap<String, String>,
}

/// Backend ONNX: posee la sesión, construido una sola vez en el arranque.
/// Un fallo aquí es fatal; un fallo en `classify` es transitorio y lo
/// gestiona el votante.
pub struct OnnxBackend {
    session: Session,
    labels: Vec<String>,
    input_name: String,
    prob_output_name: String,
}

impl OnnxBackend {
    pub fn new(model_path: &str, classes_path: &str) -> Result<Self, InferenceError> {
        // Cargar clases
        let labels = Self::load_classes(classes_path)?;

        // Cargar modelo ONNX
        let session = Session::builder()?.commit_from_file(model_path)?;

        let input_name = session
            .inputs
            .get(0)
            .map(|input| input.name.clone())
            .ok_or(InferenceError::MissingIo { kind: "input" })?;

        let prob_output_name = session
            .outputs
            .iter()
            .find(|output| {
                matches!(
                    output.output_type,
                    ValueType::Tensor {
                        ty: TensorElementType::Float32,
                        ..
                    }
                )
            })
            .or_else(|| session.outputs.get(0))
            .map(|output| output.name.clone())
            .ok_or(InferenceError::MissingIo { kind: "output" })?;

        println!("[ONNX] Modelo cargado: {}", model_path);
        println!("[ONNX] Clases: {:?}", labels);
        println!("[ONNX] Input: {}", input_name);
        println!("[ONNX] Output: {}", prob_output_name);

        Ok(Self {
            session,
            labels,
            input_name,
            prob_output_name,
        })
    }

    fn load_classes(path: &str) -> Result<Vec<String>, InferenceError> {
        let content = fs::read_to_string(path)?;
        let data: ClassesJson = serde_json::from_str(&content)?;

        // Convertir HashMap a Vec ordenado por índice
        let mut pairs: Vec<(usize, String)> = data
            .index_to_class
            .into_iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|idx| (idx, v)))
            .collect();

        pairs.sort_by_key(|(idx, _)| *idx);
        Ok(pairs.into_iter().map(|(_, name)| name).collect())
    }

    /// Etiqueta legible de una clase; el índice si no hay etiqueta cargada
    pub fn label_of(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl InferenceBackend for OnnxBackend {
    fn classify(&mut self, window: &[f32]) -> Result<ClassScores, InferenceError> {
        if window.len() != WINDOW_FEATURES {
            return Err(InferenceError::InvalidWindowSize {
                expected: WINDOW_FEATURES,
                actual: window.len(),
            });
        }

        // Preparar tensor de entrada [1, 600]
        // ort 2.x requiere OwnedTensorArrayData: (shape, data)
        let shape_vec = vec![1_usize, WINDOW_FEATURES];
        let input_value = ort::value::Value::from_array((shape_vec, window.to_vec()))?;

        // Ejecutar inferencia
        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => &input_value,
        ])?;

        // Extraer probabilidades del output dinámico
        let (prob_shape, prob_data) =
            outputs[self.prob_output_name.as_str()].try_extract_tensor::<f32>()?;

        let num_classes = if prob_shape.len() >= 2 {
            prob_shape[1] as usize
        } else {
            prob_shape[0] as usize
        };

        if num_classes < NUM_CLASSES || prob_data.len() < NUM_CLASSES {
            return Err(InferenceError::InvalidScoreCount {
                expected: NUM_CLASSES,
                actual: num_classes.min(prob_data.len()),
            });
        }

        let mut scores: ClassScores = [0.0; NUM_CLASSES];
        scores.copy_from_slice(&prob_data[..NUM_CLASSES]);
        Ok(scores)
    }
}
