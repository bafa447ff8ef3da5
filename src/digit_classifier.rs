use crate::inference::InferenceBackend;
use crate::types::{GestureResult, NUM_CLASSES};

/// Umbral mínimo de confianza para que una pasada emita voto
pub const CONFIDENCE_THRESHOLD: f32 = 0.8;
/// Pasadas de inferencia por decisión
pub const INFERENCE_ROUNDS: usize = 10;
/// Votos mínimos de la clase ganadora para dar el gesto por decidido
pub const VALID_NUMBER_PREDICTION: u32 = 4;

/// Evento de progreso de una ronda de votación, para la capa de
/// presentación. La lógica de decisión no imprime nada.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundEvent {
    /// La ronda emitió un voto por `label` con puntuación `score`
    Vote {
        round: usize,
        label: usize,
        score: f32,
    },
    /// Ninguna clase superó el umbral de confianza en esta ronda
    NoVote { round: usize },
    /// El backend falló en esta ronda; se pierde solo su voto
    Failed { round: usize },
}

/// Clasificador por votación: convierte una ventana completa en un
/// `GestureResult` con R pasadas de inferencia seguidas (sin pausa entre
/// ellas) sobre la misma ventana.
///
/// Regla por ronda: gana la clase con puntuación estrictamente mayor que
/// el resto y que el umbral de confianza. La comparación estricta hace el
/// desempate determinista: a igual puntuación gana el índice menor.
pub struct VotingClassifier {
    rounds: usize,
    confidence_threshold: f32,
    min_votes: u32,
    tally: [u32; NUM_CLASSES],
    observer: Option<Box<dyn FnMut(&RoundEvent) + Send>>,
}

impl VotingClassifier {
    pub fn new(rounds: usize, confidence_threshold: f32, min_votes: u32) -> Self {
        Self {
            rounds,
            confidence_threshold,
            min_votes,
            tally: [0; NUM_CLASSES],
            observer: None,
        }
    }

    /// Callback de progreso por ronda
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&RoundEvent) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    fn emit(&mut self, event: RoundEvent) {
        if let Some(ref mut observer) = self.observer {
            observer(&event);
        }
    }

    /// Ejecuta la decisión completa sobre una ventana ya llena.
    ///
    /// Un error del backend aborta solo esa ronda (sin voto); nunca escala.
    /// `decided` exige que la clase ganadora junte al menos `min_votes`.
    pub fn decide(
        &mut self,
        backend: &mut dyn InferenceBackend,
        window: &[f32],
    ) -> GestureResult {
        // El conteo se reinicia por decisión, sin realocar
        self.tally = [0; NUM_CLASSES];
        let mut best_label: Option<usize> = None;
        let mut best_votes: u32 = 0;

        for round in 0..self.rounds {
            let scores = match backend.classify(window) {
                Ok(scores) => scores,
                Err(_) => {
                    self.emit(RoundEvent::Failed { round });
                    continue;
                }
            };

            // Argmax con compuerta de confianza; `>` estricto en ambas
            // comparaciones, así el empate lo gana el índice menor
            let mut winner: Option<(usize, f32)> = None;
            for (class, &score) in scores.iter().enumerate() {
                if score > self.confidence_threshold
                    && winner.map_or(true, |(_, best)| score > best)
                {
                    winner = Some((class, score));
                }
            }

            match winner {
                Some((class, score)) => {
                    self.tally[class] += 1;
                    if self.tally[class] > best_votes {
                        best_votes = self.tally[class];
                        best_label = Some(class);
                    }
                    self.emit(RoundEvent::Vote {
                        round,
                        label: class,
                        score,
                    });
                }
                None => self.emit(RoundEvent::NoVote { round }),
            }
        }

        match best_label {
            Some(label) if best_votes >= self.min_votes => GestureResult {
                label: Some(label),
                votes: best_votes,
                decided: true,
            },
            _ => GestureResult::undecided(best_votes),
        }
    }

    /// Conteo de la última decisión (para inspección y tests)
    pub fn tally(&self) -> &[u32; NUM_CLASSES] {
        &self.tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceError;
    use crate::types::ClassScores;
    use std::sync::{Arc, Mutex};

    /// Backend de prueba: devuelve una secuencia fija de puntuaciones
    struct ScriptedBackend {
        rounds: Vec<Result<ClassScores, ()>>,
        next: usize,
    }

    impl ScriptedBackend {
        fn new(rounds: Vec<Result<ClassScores, ()>>) -> Self {
            Self { rounds, next: 0 }
        }
    }

    impl InferenceBackend for ScriptedBackend {
        fn classify(&mut self, _window: &[f32]) -> Result<ClassScores, InferenceError> {
            let result = self.rounds[self.next % self.rounds.len()];
            self.next += 1;
            result.map_err(|_| InferenceError::MissingIo { kind: "output" })
        }
    }

    fn scores_with(class: usize, score: f32) -> ClassScores {
        let mut scores = [0.01; NUM_CLASSES];
        scores[class] = score;
        scores
    }

    fn dummy_window() -> Vec<f32> {
        vec![0.0; crate::types::WINDOW_FEATURES]
    }

    #[test]
    fn test_majority_vote_decides() {
        // 4 rondas votan la clase 3 por encima del umbral, el resto no vota
        let mut rounds = vec![
            Ok(scores_with(3, 0.9)),
            Ok(scores_with(3, 0.85)),
            Ok(scores_with(3, 0.81)),
            Ok(scores_with(3, 0.95)),
            Ok(scores_with(5, 0.99)),
        ];
        rounds.extend(std::iter::repeat(Ok(scores_with(7, 0.5))).take(5));

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 4);
        let result = voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        assert!(result.decided);
        assert_eq!(result.label, Some(3));
        assert_eq!(result.votes, 4);
        assert_eq!(voter.tally()[3], 4);
        assert_eq!(voter.tally()[5], 1);
    }

    #[test]
    fn test_no_confident_round_is_undecided() {
        // Nadie supera el umbral: resultado indeciso aunque haya máximos claros
        let rounds = vec![Ok(scores_with(2, 0.79)); 10];

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 4);
        let result = voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        assert!(!result.decided);
        assert_eq!(result.label, None);
        assert_eq!(result.votes, 0);
    }

    #[test]
    fn test_exact_threshold_casts_no_vote() {
        // Comparación estricta: score == umbral no vota
        let rounds = vec![Ok(scores_with(4, CONFIDENCE_THRESHOLD)); 10];

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 1);
        let result = voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        assert!(!result.decided);
    }

    #[test]
    fn test_insufficient_votes_is_undecided() {
        // Solo 3 votos válidos con mínimo de 4
        let mut rounds = vec![Ok(scores_with(6, 0.9)); 3];
        rounds.extend(std::iter::repeat(Ok(scores_with(6, 0.1))).take(7));

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 4);
        let result = voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        assert!(!result.decided);
        assert_eq!(result.label, None);
        assert_eq!(result.votes, 3);
    }

    #[test]
    fn test_tie_goes_to_lower_index() {
        // Clases 2 y 6 empatadas en cada ronda: debe ganar la 2
        let mut scores = [0.01; NUM_CLASSES];
        scores[2] = 0.9;
        scores[6] = 0.9;
        let rounds = vec![Ok(scores); 10];

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 4);
        let result = voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        assert!(result.decided);
        assert_eq!(result.label, Some(2));
        assert_eq!(result.votes, 10);
    }

    #[test]
    fn test_backend_failure_skips_round_only() {
        // 2 rondas fallan; las 8 restantes votan la clase 1
        let rounds = vec![
            Err(()),
            Ok(scores_with(1, 0.9)),
            Err(()),
            Ok(scores_with(1, 0.9)),
            Ok(scores_with(1, 0.9)),
            Ok(scores_with(1, 0.9)),
            Ok(scores_with(1, 0.9)),
            Ok(scores_with(1, 0.9)),
            Ok(scores_with(1, 0.9)),
            Ok(scores_with(1, 0.9)),
        ];

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 4);
        let result = voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        assert!(result.decided);
        assert_eq!(result.label, Some(1));
        assert_eq!(result.votes, 8);
    }

    #[test]
    fn test_votes_never_exceed_rounds() {
        let rounds = vec![Ok(scores_with(9, 0.99)); 10];

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 4);
        let result = voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        assert_eq!(result.votes, 10);
        assert!(voter.tally().iter().all(|&v| v <= 10));
    }

    #[test]
    fn test_one_event_per_round() {
        let rounds = vec![
            Ok(scores_with(0, 0.9)),
            Ok(scores_with(0, 0.5)),
            Err(()),
        ];

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);

        let mut voter = VotingClassifier::new(3, CONFIDENCE_THRESHOLD, 1);
        voter.set_observer(move |event| {
            events_clone.lock().unwrap().push(*event);
        });

        voter.decide(&mut ScriptedBackend::new(rounds), &dummy_window());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RoundEvent::Vote { round: 0, label: 0, .. }));
        assert!(matches!(events[1], RoundEvent::NoVote { round: 1 }));
        assert!(matches!(events[2], RoundEvent::Failed { round: 2 }));
    }

    #[test]
    fn test_tally_resets_between_decisions() {
        let rounds = vec![Ok(scores_with(8, 0.9)); 10];
        let mut backend = ScriptedBackend::new(rounds);

        let mut voter = VotingClassifier::new(10, CONFIDENCE_THRESHOLD, 4);
        let first = voter.decide(&mut backend, &dummy_window());
        let second = voter.decide(&mut backend, &dummy_window());

        assert_eq!(first.votes, 10);
        // Sin reinicio el segundo conteo acumularía 20
        assert_eq!(second.votes, 10);
    }
}
