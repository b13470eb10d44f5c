pub mod canvas;
pub mod font;
pub mod history_plot;

pub use canvas::Canvas;
pub use history_plot::{render_history, save_history_png};
