pub mod screenshot;

pub use screenshot::{save_gbuffer_json, save_png};
