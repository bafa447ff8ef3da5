pub mod csv_loader;
pub mod digit_classifier;
pub mod gesture_capture;
pub mod hid;
pub mod inference;
pub mod normalizer;
pub mod sensor;
pub mod trigger;
pub mod types;
pub mod window;
