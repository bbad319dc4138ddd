pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{answer, error, header, info, muted, status, success};
pub use progress::Spinner;
pub use table::{stats_table, TableBuilder};
pub use theme::{theme, Theme};
