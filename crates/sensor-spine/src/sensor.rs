use crate::error::SampleError;
use crate::measurement::MeasurementType;

/// A device that can be interrogated for one reading at a time.
///
/// `sample` runs on the engine's sampling thread and may take arbitrarily
/// long; it is never called concurrently with itself.
pub trait Sensor: Send {
    fn sample(&mut self) -> Result<f64, SampleError>;

    fn measurement(&self) -> MeasurementType {
        MeasurementType::None
    }
}

impl<F> Sensor for F
where
    F: FnMut() -> Result<f64, SampleError> + Send,
{
    fn sample(&mut self) -> Result<f64, SampleError> {
        self()
    }
}

/// Attaches a measurement type to a sensor that does not report one.
pub struct Tagged<S> {
    inner: S,
    kind: MeasurementType,
}

impl<S: Sensor> Tagged<S> {
    pub fn new(inner: S, kind: MeasurementType) -> Self {
        Self { inner, kind }
    }
}

impl<S: Sensor> Sensor for Tagged<S> {
    fn sample(&mut self) -> Result<f64, SampleError> {
        self.inner.sample()
    }

    fn measurement(&self) -> MeasurementType {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sensors() {
        let mut n = 0.0;
        let mut sensor = move || {
            n += 0.5;
            Ok::<_, SampleError>(n)
        };
        assert_eq!(Sensor::sample(&mut sensor), Ok(0.5));
        assert_eq!(Sensor::sample(&mut sensor), Ok(1.0));
        assert_eq!(Sensor::measurement(&sensor), MeasurementType::None);
    }

    #[test]
    fn tagged_reports_kind() {
        let sensor = Tagged::new(|| Ok::<_, SampleError>(3.3), MeasurementType::Voltage);
        let mut boxed: Box<dyn Sensor> = Box::new(sensor);
        assert_eq!(boxed.measurement(), MeasurementType::Voltage);
        assert_eq!(boxed.sample(), Ok(3.3));
    }
}
