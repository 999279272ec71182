// Epoch scheduling: transaction injection interleaved with clock advances.

use log::debug;

use crate::gn_interface::{EpochDriver, SimError, SimTime};
use crate::gn_transactions::TransactionBatchSpec;

/// Partitions the total simulated duration into epochs and drives them
/// strictly in order. Each epoch injects one randomized transaction batch
/// at the epoch's start, then advances the shared clock to the epoch's
/// time boundary, running every pending event up to and including it.
///
/// All parameters are validated at construction, before any simulated time
/// advances.
pub struct EpochScheduler {
    duration: SimTime,
    epochs: usize,
    batch: TransactionBatchSpec,
}

impl EpochScheduler {
    pub fn new(
        duration: SimTime,
        epochs: usize,
        batch: TransactionBatchSpec,
    ) -> Result<Self, SimError> {
        if duration == 0 {
            return Err(SimError::Configuration(
                "simulation duration must be positive".to_string(),
            ));
        }
        if epochs == 0 {
            return Err(SimError::Configuration(
                "epoch count must be positive".to_string(),
            ));
        }
        batch.validate()?;

        Ok(Self {
            duration,
            epochs,
            batch,
        })
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Virtual-time boundary epoch `e` advances the clock to. The final
    /// epoch lands exactly on the total duration.
    pub fn boundary(&self, epoch: usize) -> SimTime {
        self.duration * (epoch as SimTime + 1) / self.epochs as SimTime
    }

    /// Run all epochs against `driver`. Synchronous: each advance returns
    /// only once the clock has reached that epoch's boundary, so a batch's
    /// effects due within the epoch complete before the next batch goes
    /// out.
    pub fn run<D: EpochDriver>(&self, driver: &mut D) {
        for epoch in 0..self.epochs {
            let injected = driver.broadcast_transactions(&self.batch);
            let boundary = self.boundary(epoch);
            debug!(
                "epoch {}/{}: {} transactions injected, advancing to t={}",
                epoch + 1,
                self.epochs,
                injected,
                boundary
            );
            driver.advance_clock(boundary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Broadcast,
        Advance(SimTime),
    }

    struct RecordingDriver {
        calls: Vec<Call>,
    }

    impl EpochDriver for RecordingDriver {
        fn broadcast_transactions(&mut self, _spec: &TransactionBatchSpec) -> usize {
            self.calls.push(Call::Broadcast);
            0
        }

        fn advance_clock(&mut self, bound: SimTime) {
            self.calls.push(Call::Advance(bound));
        }
    }

    #[test]
    fn test_broadcasts_interleave_with_ordered_advances() {
        let scheduler =
            EpochScheduler::new(36000, 10, TransactionBatchSpec::default()).unwrap();
        let mut driver = RecordingDriver { calls: Vec::new() };

        scheduler.run(&mut driver);

        assert_eq!(driver.calls.len(), 20);

        let mut boundaries = Vec::new();
        for (i, call) in driver.calls.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(*call, Call::Broadcast, "call {} out of order", i);
            } else if let Call::Advance(bound) = call {
                boundaries.push(*bound);
            } else {
                panic!("call {} out of order", i);
            }
        }

        let expected: Vec<SimTime> = (1..=10).map(|e| e * 3600).collect();
        assert_eq!(boundaries, expected);
        assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*boundaries.last().unwrap(), 36000);
    }

    #[test]
    fn test_final_boundary_is_exact_with_uneven_division() {
        let scheduler = EpochScheduler::new(100, 3, TransactionBatchSpec::default()).unwrap();

        assert_eq!(scheduler.boundary(0), 33);
        assert_eq!(scheduler.boundary(1), 66);
        assert_eq!(scheduler.boundary(2), 100);
    }

    #[test]
    fn test_invalid_parameters_fail_before_any_run() {
        let batch = TransactionBatchSpec::default();
        assert!(matches!(
            EpochScheduler::new(0, 10, batch.clone()),
            Err(SimError::Configuration(_))
        ));
        assert!(matches!(
            EpochScheduler::new(36000, 0, batch.clone()),
            Err(SimError::Configuration(_))
        ));

        let inverted = TransactionBatchSpec {
            min_count: 9,
            max_count: 3,
            ..batch
        };
        assert!(matches!(
            EpochScheduler::new(36000, 10, inverted),
            Err(SimError::Configuration(_))
        ));
    }
}
