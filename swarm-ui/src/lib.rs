pub mod api;
pub mod components;
pub mod console;
pub mod flow_canvas;
pub mod flow_node;
pub mod interop;
pub mod poll;
pub mod shortcuts;
pub mod storage;
pub mod theme;

pub use console::ConsoleView;
