pub mod flow;

pub use flow::ReadingFlow;
