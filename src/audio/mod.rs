pub mod decode;
pub mod energy;
pub mod waveform;
