pub mod device;
pub mod synthetic;

pub use device::{DeviceChannel, MinMaxNormalizer, PayloadError, PayloadLayout};
pub use synthetic::{EcgGenerator, RateWalk, RespirationGenerator, SineGenerator};

/// Produces one scalar sample per tick at a channel's nominal rate.
pub trait SampleSource {
    /// Next sample; `now` is the tick time in seconds since the session started.
    fn next_sample(&mut self, now: f64) -> f64;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_sample(&mut self, now: f64) -> f64 {
        (**self).next_sample(now)
    }
}
