mod app;
mod dom;
mod gesture;
mod net;
mod palette;
mod persistence;
mod render;
mod state;
mod ws;

pub use app::run;
