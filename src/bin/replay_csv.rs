use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use numeroscopio::csv_loader::{flatten_normalized, load_window_samples};
use numeroscopio::digit_classifier::{
    VotingClassifier, CONFIDENCE_THRESHOLD, INFERENCE_ROUNDS, VALID_NUMBER_PREDICTION,
};
use numeroscopio::inference::{InferenceBackend, OnnxBackend};
use numeroscopio::normalizer::Normalizer;

struct ReplayOptions {
    dump_flat: bool,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut dump_flat = false;
    let mut csv_path: Option<PathBuf> = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--dump-flat" => dump_flat = true,
            _ => {
                if csv_path.is_some() {
                    bail!("Uso: replay_csv [--dump-flat] <archivo.csv>");
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar un archivo CSV"))?;
    Ok((csv_path, ReplayOptions { dump_flat }))
}

fn main() -> Result<()> {
    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo gesto desde {:?}", csv_path);

    let window = load_window_samples(&csv_path)?;
    let normalizer = Normalizer::calibrated();
    let flat = flatten_normalized(&window, &normalizer);

    let mut backend = OnnxBackend::new("modelo_digitos.onnx", "classes.json")?;

    // Una pasada individual, con las probabilidades ordenadas
    let raw_scores = backend.classify(&flat)?;
    let mut scores: Vec<(usize, f32)> = raw_scores.iter().copied().enumerate().collect();
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let (best_class, best_conf) = scores[0];

    // La decisión completa por votación
    let mut voter =
        VotingClassifier::new(INFERENCE_ROUNDS, CONFIDENCE_THRESHOLD, VALID_NUMBER_PREDICTION);
    let result = voter.decide(&mut backend, &flat);

    println!(
        "\n🥇 Pasada individual: {} ({:.1}%)",
        backend.label_of(best_class),
        best_conf * 100.0
    );
    match result.label {
        Some(label) if result.decided => {
            println!(
                "🗳️  Votación: {} ({} de {} votos)",
                backend.label_of(label),
                result.votes,
                INFERENCE_ROUNDS
            );
        }
        _ => {
            println!(
                "🗳️  Votación: sin decisión (votos máximos: {})",
                result.votes
            );
        }
    }

    println!("\nTop-5 probabilidades:");
    for (idx, (class, score)) in scores.iter().take(5).enumerate() {
        println!(
            "  {:>2}. {:<10} {:>6.2}%",
            idx + 1,
            backend.label_of(*class),
            score * 100.0
        );
    }

    if opts.dump_flat {
        println!("\n🧱 Tensor plano ({} valores):", flat.len());
        for (idx, value) in flat.iter().enumerate() {
            println!("  {:03}: {:>12.6}", idx, value);
        }
    }

    Ok(())
}
