use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use csv::ReaderBuilder;

use crate::normalizer::Normalizer;
use crate::types::{MotionSample, SAMPLE_COUNT_PER_GESTURE, WINDOW_FEATURES};

/// Carga una secuencia de muestras desde un CSV en el formato
/// sample,ax,ay,az,gx,gy,gz ordenado por sample.
pub fn load_samples_from_csv(path: impl AsRef<Path>) -> Result<Vec<MotionSample>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let mut samples: BTreeMap<usize, MotionSample> = BTreeMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;
        if record.len() < 7 {
            bail!("La fila {} no tiene 7 columnas", row_idx + 1);
        }

        let sample: usize = record[0]
            .parse()
            .with_context(|| format!("sample inválido en fila {}", row_idx + 1))?;

        let ax: f32 = record[1].parse()?;
        let ay: f32 = record[2].parse()?;
        let az: f32 = record[3].parse()?;
        let gx: f32 = record[4].parse()?;
        let gy: f32 = record[5].parse()?;
        let gz: f32 = record[6].parse()?;

        samples.insert(sample, MotionSample::new(ax, ay, az, gx, gy, gz));
    }

    if samples.is_empty() {
        return Err(anyhow!("El CSV {:?} no contiene datos", path));
    }

    let (&min_sample, _) = samples.iter().next().unwrap();
    ensure!(
        min_sample == 0,
        "El CSV debe iniciar en sample=0 (encontrado sample={})",
        min_sample
    );
    let max_sample = *samples.keys().max().unwrap();

    let mut frames = Vec::with_capacity(max_sample + 1);
    let mut last_sample = MotionSample::default();
    for sample_idx in 0..=max_sample {
        if let Some(sample) = samples.get(&sample_idx) {
            last_sample = *sample;
            frames.push(*sample);
        } else {
            // Rellenar huecos repitiendo la última muestra válida
            frames.push(last_sample);
        }
    }

    Ok(frames)
}

/// Reconstruye exactamente una ventana de N muestras desde un CSV:
/// rellena ventanas cortas con la última muestra y trunca las largas.
pub fn load_window_samples(path: impl AsRef<Path>) -> Result<Vec<MotionSample>> {
    let mut samples = load_samples_from_csv(path)?;
    if samples.len() < SAMPLE_COUNT_PER_GESTURE {
        let pad = *samples.last().unwrap_or(&MotionSample::default());
        samples.resize(SAMPLE_COUNT_PER_GESTURE, pad);
    } else if samples.len() > SAMPLE_COUNT_PER_GESTURE {
        samples.truncate(SAMPLE_COUNT_PER_GESTURE);
    }
    Ok(samples)
}

/// Normaliza y aplana una ventana al layout del modelo [muestra * 6 + canal]
pub fn flatten_normalized(samples: &[MotionSample], normalizer: &Normalizer) -> Vec<f32> {
    let mut flat = Vec::with_capacity(WINDOW_FEATURES);
    for sample in samples {
        flat.extend_from_slice(&normalizer.normalize(sample));
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(rows: &[(usize, [f32; 6])]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sample,ax,ay,az,gx,gy,gz").unwrap();
        for (idx, v) in rows {
            writeln!(
                file,
                "{},{},{},{},{},{},{}",
                idx, v[0], v[1], v[2], v[3], v[4], v[5]
            )
            .unwrap();
        }
        file
    }

    #[test]
    fn test_load_basic() {
        let file = write_csv(&[
            (0, [0.1, 0.2, 0.3, 1.0, 2.0, 3.0]),
            (1, [0.4, 0.5, 0.6, 4.0, 5.0, 6.0]),
        ]);

        let samples = load_samples_from_csv(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].ax, 0.1);
        assert_eq!(samples[1].gz, 6.0);
    }

    #[test]
    fn test_gaps_filled_with_last_sample() {
        // Falta el sample 1: se repite el 0
        let file = write_csv(&[
            (0, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            (2, [2.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ]);

        let samples = load_samples_from_csv(file.path()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].ax, 1.0);
        assert_eq!(samples[2].ax, 2.0);
    }

    #[test]
    fn test_must_start_at_zero() {
        let file = write_csv(&[(3, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0])]);
        assert!(load_samples_from_csv(file.path()).is_err());
    }

    #[test]
    fn test_empty_csv_is_error() {
        let file = write_csv(&[]);
        assert!(load_samples_from_csv(file.path()).is_err());
    }

    #[test]
    fn test_short_window_padded() {
        let file = write_csv(&[
            (0, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            (1, [2.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ]);

        let window = load_window_samples(file.path()).unwrap();
        assert_eq!(window.len(), SAMPLE_COUNT_PER_GESTURE);
        // Relleno con la última muestra
        assert_eq!(window[SAMPLE_COUNT_PER_GESTURE - 1].ax, 2.0);
    }

    #[test]
    fn test_long_window_truncated() {
        let rows: Vec<(usize, [f32; 6])> = (0..150)
            .map(|i| (i, [i as f32, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .collect();
        let file = write_csv(&rows);

        let window = load_window_samples(file.path()).unwrap();
        assert_eq!(window.len(), SAMPLE_COUNT_PER_GESTURE);
        assert_eq!(window[SAMPLE_COUNT_PER_GESTURE - 1].ax, 99.0);
    }

    #[test]
    fn test_flatten_matches_model_layout() {
        let file = write_csv(&[(0, [0.5, -0.5, 1.0, 10.0, -10.0, 5.0])]);
        let window = load_window_samples(file.path()).unwrap();

        let normalizer = Normalizer::calibrated();
        let flat = flatten_normalized(&window, &normalizer);

        assert_eq!(flat.len(), WINDOW_FEATURES);
        let expected = normalizer.normalize(&window[0]);
        assert_eq!(&flat[..6], &expected);
    }
}
