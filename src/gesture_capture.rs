use crate::digit_classifier::{
    RoundEvent, VotingClassifier, CONFIDENCE_THRESHOLD, INFERENCE_ROUNDS, VALID_NUMBER_PREDICTION,
};
use crate::inference::InferenceBackend;
use crate::normalizer::Normalizer;
use crate::trigger::{
    CooldownGate, CooldownStatus, TriggerDetector, ACCEL_THRESHOLD, QUIET_MAX_G, QUIET_MIN_G,
};
use crate::types::{GestureResult, MotionSample, SAMPLE_COUNT_PER_GESTURE, SAMPLE_DELAY_MS};
use crate::window::WindowBuffer;
use std::fs::{self, File};
use std::io::Write;

/// Parámetros de configuración del ciclo de captura
#[derive(Debug, Clone)]
pub struct CaptureParams {
    /// Umbral de disparo de grabación en g (default: 1.25)
    pub accel_threshold: f32,
    /// Umbral de confianza por ronda (default: 0.8)
    pub confidence_threshold: f32,
    /// Pasadas de inferencia por decisión (default: 10)
    pub rounds: usize,
    /// Votos mínimos para decidir (default: 4)
    pub min_votes: u32,
    /// Banda de reposo del cooldown en g (default: 0.85..1.15, exclusiva)
    pub quiet_min_g: f32,
    pub quiet_max_g: f32,
    /// Debounce tras estabilizarse, en ms (default: 500)
    pub debounce_ms: u64,
    /// Tiempo límite del cooldown en ms; con `None` espera indefinidamente
    /// a que el sensor se estabilice
    pub cooldown_timeout_ms: Option<u64>,
    /// Directorio donde volcar cada ventana cruda como CSV; `None` desactiva
    pub out_dir: Option<String>,
    /// Prefijo de los CSV volcados (default: "digito_")
    pub prefix: String,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            accel_threshold: ACCEL_THRESHOLD,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            rounds: INFERENCE_ROUNDS,
            min_votes: VALID_NUMBER_PREDICTION,
            quiet_min_g: QUIET_MIN_G,
            quiet_max_g: QUIET_MAX_G,
            debounce_ms: 500,
            cooldown_timeout_ms: None,
            out_dir: None,
            prefix: "digito_".to_string(),
        }
    }
}

/// Fases de la máquina de estados (cíclica, sin estado terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Armado, esperando disparo
    Idle,
    /// Acumulando la ventana
    Recording,
    /// Ráfaga de votación en curso
    Deciding,
    /// Esperando que el sensor se estabilice
    Cooldown,
}

/// Qué produjo un tick, para la capa de presentación
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEvent {
    /// El disparador arrancó una grabación (esta muestra ya es la primera)
    RecordingStarted,
    /// Ventana completa clasificada; comienza el cooldown
    Decided(GestureResult),
    /// Cooldown terminado, disparador rearmado
    Rearmed,
    /// Cooldown abortado por timeout, disparador rearmado igualmente
    RearmedAfterTimeout,
}

/// Máquina de estados de captura: Idle → Recording → Deciding → Cooldown →
/// Idle, un `tick` por periodo de muestreo.
///
/// El tick que dispara ya graba su muestra como la primera de la ventana.
/// Una lectura fallida del sensor (`sample = None`) salta el tick: en
/// Recording no aporta muestra pero no aborta la captura, en Cooldown se
/// ignora. Toda la transición Recording → Deciding → Cooldown ocurre de
/// forma síncrona dentro de un solo tick.
pub struct GestureCapture {
    params: CaptureParams,
    phase: Phase,
    normalizer: Normalizer,
    window: WindowBuffer,
    trigger: TriggerDetector,
    cooldown: CooldownGate,
    voter: VotingClassifier,

    /// Muestras crudas de la ventana en curso, para el volcado CSV
    raw_capture: Vec<MotionSample>,
    file_idx: u64,
}

impl GestureCapture {
    pub fn new(params: CaptureParams, normalizer: Normalizer) -> Self {
        if let Some(ref dir) = params.out_dir {
            let _ = fs::create_dir_all(dir);
        }

        let ticks = |ms: u64| (ms / SAMPLE_DELAY_MS) as u32;
        let cooldown = CooldownGate::new(
            params.quiet_min_g,
            params.quiet_max_g,
            ticks(params.debounce_ms),
            params.cooldown_timeout_ms.map(ticks),
        );
        let voter = VotingClassifier::new(
            params.rounds,
            params.confidence_threshold,
            params.min_votes,
        );

        Self {
            trigger: TriggerDetector::new(params.accel_threshold),
            cooldown,
            voter,
            phase: Phase::Idle,
            normalizer,
            window: WindowBuffer::new(),
            raw_capture: Vec::with_capacity(SAMPLE_COUNT_PER_GESTURE),
            file_idx: 0,
            params,
        }
    }

    /// Callback de progreso por ronda de votación
    pub fn set_round_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&RoundEvent) + Send + 'static,
    {
        self.voter.set_observer(observer);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Muestras acumuladas de la ventana en curso
    pub fn samples_taken(&self) -> usize {
        self.window.len()
    }

    /// Procesa un tick del lazo de control. `sample` es `None` cuando la
    /// lectura del sensor falló en este tick.
    pub fn tick(
        &mut self,
        backend: &mut dyn InferenceBackend,
        sample: Option<&MotionSample>,
    ) -> Option<TickEvent> {
        match self.phase {
            Phase::Idle => {
                let sample = sample?;
                if !self.trigger.poll(sample.magnitude()) {
                    return None;
                }
                self.phase = Phase::Recording;
                self.window.reset();
                self.raw_capture.clear();
                // La muestra que dispara es la primera de la ventana
                self.record(backend, sample)
                    .or(Some(TickEvent::RecordingStarted))
            }
            Phase::Recording => {
                let sample = sample?;
                self.record(backend, sample)
            }
            Phase::Deciding => {
                // La decisión corre síncrona dentro del tick que completa
                // la ventana; esta fase nunca persiste entre ticks
                None
            }
            Phase::Cooldown => match self.cooldown.poll(sample.map(MotionSample::magnitude)) {
                CooldownStatus::Holding => None,
                CooldownStatus::Settled => {
                    self.phase = Phase::Idle;
                    self.trigger.rearm();
                    Some(TickEvent::Rearmed)
                }
                CooldownStatus::TimedOut => {
                    self.phase = Phase::Idle;
                    self.trigger.rearm();
                    Some(TickEvent::RearmedAfterTimeout)
                }
            },
        }
    }

    /// Acumula una muestra; con la ventana completa clasifica y pasa a
    /// Cooldown. Retorna el evento de decisión si lo hubo.
    fn record(
        &mut self,
        backend: &mut dyn InferenceBackend,
        sample: &MotionSample,
    ) -> Option<TickEvent> {
        self.raw_capture.push(*sample);
        let features = self.normalizer.normalize(sample);
        if !self.window.push(&features) {
            return None;
        }

        self.phase = Phase::Deciding;
        self.dump_capture();

        // Ráfaga de R pasadas seguidas, sin esperar ticks intermedios
        let flat = self
            .window
            .as_slice()
            .expect("la ventana completa siempre expone su contenido");
        let result = self.voter.decide(backend, flat);

        self.phase = Phase::Cooldown;
        self.cooldown.begin();
        Some(TickEvent::Decided(result))
    }

    /// Vuelca la ventana cruda a un CSV de dataset, si está configurado
    fn dump_capture(&mut self) {
        let Some(ref out_dir) = self.params.out_dir else {
            return;
        };

        let filename = format!("{}/{}{:05}.csv", out_dir, self.params.prefix, self.file_idx);
        self.file_idx += 1;

        if let Err(e) = write_csv(&filename, &self.raw_capture) {
            eprintln!("Error escribiendo CSV {}: {}", filename, e);
        }
    }
}

/// Escribe una secuencia de muestras crudas en formato
/// `sample,ax,ay,az,gx,gy,gz`
fn write_csv(path: &str, samples: &[MotionSample]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "sample,ax,ay,az,gx,gy,gz")?;

    for (t, s) in samples.iter().enumerate() {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            t, s.ax, s.ay, s.az, s.gx, s.gy, s.gz
        )?;
    }

    Ok(())
}
