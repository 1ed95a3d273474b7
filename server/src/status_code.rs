//! Flight status codes understood by the ledger-side consensus.

use rand::Rng;

pub const STATUS_CODE_UNKNOWN: u8 = 0;
pub const STATUS_CODE_ON_TIME: u8 = 10;
pub const STATUS_CODE_LATE_AIRLINE: u8 = 20;
pub const STATUS_CODE_LATE_WEATHER: u8 = 30;
pub const STATUS_CODE_LATE_TECHNICAL: u8 = 40;
pub const STATUS_CODE_LATE_OTHER: u8 = 50;

pub const STATUS_CODES: [u8; 6] = [
    STATUS_CODE_UNKNOWN,
    STATUS_CODE_ON_TIME,
    STATUS_CODE_LATE_AIRLINE,
    STATUS_CODE_LATE_WEATHER,
    STATUS_CODE_LATE_TECHNICAL,
    STATUS_CODE_LATE_OTHER,
];

/// Picks the status code an oracle reports.
pub trait StatusCodeSource: Send + Sync + 'static {
    fn draw(&self) -> u8;
}

/// Uniform draw from [`STATUS_CODES`] using the thread-local, OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropyStatusCode;

impl StatusCodeSource for EntropyStatusCode {
    fn draw(&self) -> u8 {
        draw_from(&mut rand::thread_rng())
    }
}

pub fn draw_from<R: Rng>(rng: &mut R) -> u8 {
    STATUS_CODES[rng.gen_range(0..STATUS_CODES.len())]
}
