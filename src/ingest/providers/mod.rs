pub mod apple_health;
pub mod oura;
pub mod strava;

pub use apple_health::AppleHealthNormalizer;
pub use oura::OuraNormalizer;
pub use strava::StravaNormalizer;
