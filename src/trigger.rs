/// Umbral de aceleración que dispara la grabación (en g)
pub const ACCEL_THRESHOLD: f32 = 1.25;

/// Banda de reposo del cooldown, centrada en la gravedad (en g)
pub const QUIET_MIN_G: f32 = 0.85;
pub const QUIET_MAX_G: f32 = 1.15;

/// Detector de disparo: arranca la grabación con una sola muestra por
/// encima del umbral mientras esté armado. Sin histéresis en el flanco de
/// subida: se prefiere la respuesta inmediata a suprimir falsos disparos.
#[derive(Debug)]
pub struct TriggerDetector {
    threshold: f32,
    armed: bool,
}

impl TriggerDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            armed: true,
        }
    }

    /// Evalúa la magnitud del tick actual. Retorna `true` exactamente una
    /// vez por flanco: al disparar queda desarmado hasta que el cooldown
    /// vuelva a armarlo.
    pub fn poll(&mut self, magnitude: f32) -> bool {
        if self.armed && magnitude > self.threshold {
            self.armed = false;
            return true;
        }
        false
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn rearm(&mut self) {
        self.armed = true;
    }
}

/// Estado del cooldown tras evaluar un tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    /// El sensor todavía no se estabilizó
    Holding,
    /// Banda de reposo alcanzada y debounce cumplido
    Settled,
    /// Tiempo límite agotado sin estabilizarse (solo con timeout configurado)
    TimedOut,
}

/// Compuerta de cooldown: tras una decisión bloquea nuevos disparos hasta
/// que la magnitud entra en la banda de reposo durante un tick, y después
/// mantiene un debounce (contado en ticks) antes de rearmar.
///
/// Durante el debounce la magnitud ya no se consulta. Los fallos de lectura
/// del sensor se ignoran: el poll continúa en el siguiente tick.
#[derive(Debug)]
pub struct CooldownGate {
    min_g: f32,
    max_g: f32,
    debounce_ticks: u32,
    timeout_ticks: Option<u32>,

    debounce_left: Option<u32>,
    elapsed: u32,
}

impl CooldownGate {
    pub fn new(min_g: f32, max_g: f32, debounce_ticks: u32, timeout_ticks: Option<u32>) -> Self {
        Self {
            min_g,
            max_g,
            debounce_ticks,
            timeout_ticks,
            debounce_left: None,
            elapsed: 0,
        }
    }

    /// Reinicia la compuerta al entrar en Cooldown
    pub fn begin(&mut self) {
        self.debounce_left = None;
        self.elapsed = 0;
    }

    /// Evalúa un tick. `magnitude` es `None` cuando la lectura del sensor
    /// falló en este tick.
    pub fn poll(&mut self, magnitude: Option<f32>) -> CooldownStatus {
        self.elapsed = self.elapsed.saturating_add(1);

        if let Some(left) = self.debounce_left {
            if left <= 1 {
                return CooldownStatus::Settled;
            }
            self.debounce_left = Some(left - 1);
        } else if let Some(m) = magnitude {
            if m > self.min_g && m < self.max_g {
                if self.debounce_ticks == 0 {
                    return CooldownStatus::Settled;
                }
                self.debounce_left = Some(self.debounce_ticks);
            }
        }

        if let Some(limit) = self.timeout_ticks {
            if self.elapsed >= limit {
                return CooldownStatus::TimedOut;
            }
        }

        CooldownStatus::Holding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_fires_once_per_edge() {
        let mut trigger = TriggerDetector::new(ACCEL_THRESHOLD);

        assert!(!trigger.poll(1.0));
        assert!(trigger.poll(1.5));
        // Sigue por encima del umbral pero ya está desarmado
        assert!(!trigger.poll(1.8));
        assert!(!trigger.poll(2.0));

        trigger.rearm();
        assert!(trigger.poll(1.3));
    }

    #[test]
    fn test_trigger_exact_threshold_does_not_fire() {
        // Comparación estricta: m > umbral
        let mut trigger = TriggerDetector::new(ACCEL_THRESHOLD);
        assert!(!trigger.poll(ACCEL_THRESHOLD));
    }

    #[test]
    fn test_disarmed_ignores_spikes() {
        let mut trigger = TriggerDetector::new(ACCEL_THRESHOLD);
        assert!(trigger.poll(2.0));
        for _ in 0..50 {
            assert!(!trigger.poll(3.0));
        }
        assert!(!trigger.is_armed());
    }

    #[test]
    fn test_cooldown_holds_out_of_band() {
        let mut gate = CooldownGate::new(QUIET_MIN_G, QUIET_MAX_G, 25, None);
        gate.begin();

        // Magnitud alta sostenida: nunca se estabiliza
        for _ in 0..500 {
            assert_eq!(gate.poll(Some(1.6)), CooldownStatus::Holding);
        }
        // Por debajo de la banda tampoco
        assert_eq!(gate.poll(Some(0.5)), CooldownStatus::Holding);
    }

    #[test]
    fn test_cooldown_settles_after_debounce() {
        let mut gate = CooldownGate::new(QUIET_MIN_G, QUIET_MAX_G, 25, None);
        gate.begin();

        assert_eq!(gate.poll(Some(1.5)), CooldownStatus::Holding);
        // Tick en banda: arranca el debounce
        assert_eq!(gate.poll(Some(1.0)), CooldownStatus::Holding);

        // Durante el debounce la magnitud se ignora
        for _ in 0..24 {
            assert_eq!(gate.poll(Some(2.0)), CooldownStatus::Holding);
        }
        assert_eq!(gate.poll(Some(2.0)), CooldownStatus::Settled);
    }

    #[test]
    fn test_cooldown_band_is_exclusive() {
        let mut gate = CooldownGate::new(QUIET_MIN_G, QUIET_MAX_G, 0, None);
        gate.begin();

        assert_eq!(gate.poll(Some(QUIET_MAX_G)), CooldownStatus::Holding);
        assert_eq!(gate.poll(Some(QUIET_MIN_G)), CooldownStatus::Holding);
        assert_eq!(gate.poll(Some(1.0)), CooldownStatus::Settled);
    }

    #[test]
    fn test_cooldown_ignores_failed_reads() {
        let mut gate = CooldownGate::new(QUIET_MIN_G, QUIET_MAX_G, 2, None);
        gate.begin();

        assert_eq!(gate.poll(None), CooldownStatus::Holding);
        assert_eq!(gate.poll(None), CooldownStatus::Holding);
        assert_eq!(gate.poll(Some(1.0)), CooldownStatus::Holding);
        assert_eq!(gate.poll(None), CooldownStatus::Holding);
        assert_eq!(gate.poll(None), CooldownStatus::Settled);
    }

    #[test]
    fn test_cooldown_without_timeout_waits_indefinitely() {
        let mut gate = CooldownGate::new(QUIET_MIN_G, QUIET_MAX_G, 25, None);
        gate.begin();

        for _ in 0..100_000 {
            assert_eq!(gate.poll(Some(1.4)), CooldownStatus::Holding);
        }
    }

    #[test]
    fn test_cooldown_timeout_forces_exit() {
        let mut gate = CooldownGate::new(QUIET_MIN_G, QUIET_MAX_G, 25, Some(10));
        gate.begin();

        for _ in 0..9 {
            assert_eq!(gate.poll(Some(1.4)), CooldownStatus::Holding);
        }
        assert_eq!(gate.poll(Some(1.4)), CooldownStatus::TimedOut);
    }

    #[test]
    fn test_begin_resets_state() {
        let mut gate = CooldownGate::new(QUIET_MIN_G, QUIET_MAX_G, 2, Some(100));
        gate.begin();

        // Entra en banda y avanza parte del debounce
        gate.poll(Some(1.0));
        gate.poll(Some(1.0));

        gate.begin();
        // Tras el reinicio vuelve a exigir un tick en banda
        assert_eq!(gate.poll(Some(1.5)), CooldownStatus::Holding);
        assert_eq!(gate.poll(Some(1.0)), CooldownStatus::Holding);
        assert_eq!(gate.poll(Some(1.5)), CooldownStatus::Holding);
        assert_eq!(gate.poll(Some(1.5)), CooldownStatus::Settled);
    }
}
