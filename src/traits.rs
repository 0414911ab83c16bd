/// Receives the locator's current-versus-distance curve as it is swept.
pub trait CurveSink {
    fn sample(&self, i: usize, miles: f64, amps: f64);
}
