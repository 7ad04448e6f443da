pub mod memory_sink;

pub use memory_sink::InMemoryLogSink;
