mod layer;

pub use layer::{IntegrityLayer, memory_store};
