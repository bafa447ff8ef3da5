/*
Reconocimiento de Dígitos en el Aire - Rust Puro + ONNX

Sistema que:
1. Lee un MPU6050 (acelerómetro + giroscopio) por I2C a 50 Hz
2. Detecta el inicio del gesto por umbral de aceleración
3. Captura una ventana de 100 muestras normalizadas (z-score)
4. Clasifica con 10 pasadas de inferencia ONNX y votación por mayoría
5. Escribe el dígito decidido por HID virtual (/dev/uinput)

Antes de todo, asegurarse de tener onnxruntime instalado.
wget https://github.com/microsoft/onnxruntime/releases/download/v1.22.0/onnxruntime-linux-x64-1.22.0.tgz
tar -xzf onnxruntime-linux-x64-1.22.0.tgz

Para compilar y ejecutar:
set -x LD_LIBRARY_PATH (pwd)/onnxruntime-linux-x64-1.22.0/lib $LD_LIBRARY_PATH
     ./target/release/numeroscopio /dev/i2c-1

Para debug con teclado:
sg input -c './target/debug/numeroscopio'
*/

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use std::env;
use std::thread;
use std::time::Duration;

use numeroscopio::csv_loader::{flatten_normalized, load_window_samples};
use numeroscopio::digit_classifier::{RoundEvent, VotingClassifier};
use numeroscopio::gesture_capture::{CaptureParams, GestureCapture, TickEvent};
use numeroscopio::hid::HidOutput;
use numeroscopio::inference::OnnxBackend;
use numeroscopio::normalizer::Normalizer;
use numeroscopio::sensor::{Mpu6050, Sensor};
use numeroscopio::types::SAMPLE_DELAY_MS;

const MODEL_PATH: &str = "modelo_digitos.onnx";
const CLASSES_PATH: &str = "classes.json";

/// Impresora de progreso por ronda de votación
fn print_round(event: &RoundEvent) {
    match event {
        RoundEvent::Vote {
            round,
            label,
            score,
        } => {
            println!(
                "Ronda {:>2}: dígito {} (confianza: {:.1}%)",
                round + 1,
                label,
                score * 100.0
            );
        }
        RoundEvent::NoVote { round } => {
            println!("Ronda {:>2}: sin predicción válida", round + 1);
        }
        RoundEvent::Failed { round } => {
            eprintln!("❌ Error de inferencia en la ronda {}", round + 1);
        }
    }
}

fn print_result(result: &numeroscopio::types::GestureResult) {
    println!("--------------------------------");
    match result.label {
        Some(label) if result.decided => {
            println!("🎯 Resultado final: dígito {} ({} votos)", label, result.votes);
        }
        _ => {
            println!("🤷 Gesto no reconocido (votos máximos: {})", result.votes);
        }
    }
    println!("--------------------------------");
}

fn main() -> Result<()> {
    println!("🔢 Numeroscopio - Dígitos en el Aire - Rust + ONNX\n");

    // Bus I2C desde argumentos (opcional)
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("🔧 Modo: DEBUG - Teclado Interactivo\n");
        return debug_mode();
    }

    let bus_path = &args[1];
    println!("🔧 Modo: Captura en Tiempo Real");
    println!("🎯 Bus I2C: {}\n", bus_path);

    // Inicializar el sensor; un fallo aquí es fatal
    let mut sensor =
        Mpu6050::open(bus_path).with_context(|| format!("No se pudo abrir {}", bus_path))?;
    sensor.init().context("No se pudo inicializar el MPU6050")?;
    println!("✅ MPU6050 inicializado");

    // Inicializar clasificador ONNX
    println!("🔧 Inicializando backend ONNX...");
    let mut backend = OnnxBackend::new(MODEL_PATH, CLASSES_PATH)?;
    println!("✅ Modelo cargado\n");

    // Canal y hilo HID
    let (tx_digit, rx_digit) = unbounded::<usize>();

    thread::spawn(move || {
        let mut hid = match HidOutput::new() {
            Ok(h) => {
                println!("✅ HID inicializado (/dev/uinput)");
                h
            }
            Err(e) => {
                eprintln!("❌ No se pudo inicializar HID: {}", e);
                return;
            }
        };

        while let Ok(digit) = rx_digit.recv() {
            if let Err(e) = hid.send_digit(digit) {
                eprintln!("❌ Error enviando dígito {} por HID: {}", digit, e);
            }
        }
    });

    // Máquina de captura con volcado de dataset activado
    let params = CaptureParams {
        out_dir: Some("digitos_auto".to_string()),
        ..CaptureParams::default()
    };
    let mut capture = GestureCapture::new(params, Normalizer::calibrated());
    capture.set_round_observer(print_round);

    println!("\n✅ Sistema listo, haz un gesto\n");

    loop {
        let sample = match sensor.read_motion() {
            Ok(sample) => Some(sample),
            Err(e) => {
                // Fallo transitorio: se salta el tick sin abortar nada
                eprintln!("⚠️  Lectura fallida del sensor: {}", e);
                None
            }
        };

        match capture.tick(&mut backend, sample.as_ref()) {
            Some(TickEvent::RecordingStarted) => {
                println!("\n>>> GRABANDO GESTO...");
            }
            Some(TickEvent::Decided(result)) => {
                print_result(&result);
                if let Some(label) = result.label {
                    let _ = tx_digit.send(label);
                }
                println!("Esperando cooldown...");
            }
            Some(TickEvent::Rearmed) => {
                println!("--> LISTO!");
            }
            Some(TickEvent::RearmedAfterTimeout) => {
                println!("⚠️  Cooldown agotado por timeout, rearmando");
            }
            None => {}
        }

        thread::sleep(Duration::from_millis(SAMPLE_DELAY_MS));
    }
}

/// Modo DEBUG: lee teclas 0-9 y clasifica CSVs grabados del dígito
fn debug_mode() -> Result<()> {
    use evdev::{Device, InputEventKind, Key};
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    println!("🔍 Buscando teclado...");

    let mut keyboard_device: Option<Device> = None;

    for entry in fs::read_dir("/dev/input")? {
        if let Ok(entry) = entry {
            let path = entry.path();
            if let Some(name) = path.file_name() {
                if name.to_string_lossy().starts_with("event") {
                    if let Ok(device) = Device::open(&path) {
                        if let Some(dev_name) = device.name() {
                            let dev_name_lc = dev_name.to_lowercase();
                            if dev_name_lc.contains("keyboard")
                                || dev_name_lc.contains("at translated")
                            {
                                println!(
                                    "✅ Teclado encontrado: {} ({})",
                                    dev_name,
                                    path.display()
                                );
                                keyboard_device = Some(device);
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    let mut device = keyboard_device.ok_or_else(|| {
        anyhow::anyhow!("No se encontró ningún dispositivo de teclado en /dev/input")
    })?;

    println!("✅ Captura de teclado global activada\n");

    let mut backend = OnnxBackend::new(MODEL_PATH, CLASSES_PATH)?;
    println!("✅ Backend ONNX cargado\n");

    let (tx_digit, rx_digit) = unbounded::<usize>();

    thread::spawn(move || {
        let mut hid = match HidOutput::new() {
            Ok(h) => {
                println!("✅ HID inicializado (/dev/uinput)");
                h
            }
            Err(e) => {
                eprintln!("❌ No se pudo inicializar HID: {}", e);
                return;
            }
        };

        while let Ok(digit) = rx_digit.recv() {
            println!("🎮 Enviando dígito por HID: {}", digit);
            if let Err(e) = hid.send_digit(digit) {
                eprintln!("❌ Error enviando dígito {} por HID: {}", digit, e);
            }
        }
    });

    let normalizer = Normalizer::calibrated();
    let mut voter = VotingClassifier::new(
        numeroscopio::digit_classifier::INFERENCE_ROUNDS,
        numeroscopio::digit_classifier::CONFIDENCE_THRESHOLD,
        numeroscopio::digit_classifier::VALID_NUMBER_PREDICTION,
    );
    voter.set_observer(print_round);

    println!("✅ Sistema listo\n");
    println!("Presiona una tecla 0-9 para clasificar un CSV grabado de ese dígito");
    println!("  q → salir\n");

    let key_to_digit: HashMap<Key, usize> = [
        (Key::KEY_0, 0),
        (Key::KEY_1, 1),
        (Key::KEY_2, 2),
        (Key::KEY_3, 3),
        (Key::KEY_4, 4),
        (Key::KEY_5, 5),
        (Key::KEY_6, 6),
        (Key::KEY_7, 7),
        (Key::KEY_8, 8),
        (Key::KEY_9, 9),
    ]
    .iter()
    .cloned()
    .collect();

    println!("🎧 Escuchando teclas globales...\n");

    loop {
        for ev in device.fetch_events()? {
            if let InputEventKind::Key(key) = ev.kind() {
                if ev.value() == 1 {
                    if key == Key::KEY_Q {
                        println!("\n👋 Saliendo...");
                        return Ok(());
                    }

                    if let Some(&digit) = key_to_digit.get(&key) {
                        let folder_name = format!("digitos/{}", digit);
                        println!("\n🔑 Tecla presionada: '{}'", digit);
                        println!("📂 Buscando CSV en: {}/", folder_name);

                        let folder_path = PathBuf::from(&folder_name);

                        if !folder_path.exists() {
                            eprintln!("❌ Carpeta no existe: {}", folder_name);
                            continue;
                        }

                        let csv_files: Vec<PathBuf> = fs::read_dir(&folder_path)?
                            .filter_map(|entry| entry.ok())
                            .map(|entry| entry.path())
                            .filter(|path| {
                                path.extension()
                                    .and_then(|ext| ext.to_str())
                                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                                    .unwrap_or(false)
                            })
                            .collect();

                        if csv_files.is_empty() {
                            eprintln!("❌ No hay archivos CSV en {}", folder_name);
                            continue;
                        }

                        use rand::Rng;
                        let random_idx = rand::thread_rng().gen_range(0..csv_files.len());
                        let csv_path = &csv_files[random_idx];
                        let file_name = csv_path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown.csv");

                        println!("📄 Archivo: {}", file_name);

                        match load_window_samples(csv_path) {
                            Ok(window) => {
                                let flat = flatten_normalized(&window, &normalizer);
                                let result = voter.decide(&mut backend, &flat);
                                print_result(&result);

                                match result.label {
                                    Some(label) => {
                                        let _ = tx_digit.send(label);
                                    }
                                    None => {
                                        println!("⚠️  Sin decisión, no se envía HID");
                                    }
                                }
                            }
                            Err(e) => {
                                eprintln!("❌ Error cargando CSV: {}", e);
                            }
                        }
                    }
                }
            }
        }

        thread::sleep(Duration::from_millis(10));
    }
}
