pub mod editor;
pub mod highlight;
pub mod theme;

pub use editor::Editor;
pub use highlight::highlight_card;
pub use theme::Theme;
