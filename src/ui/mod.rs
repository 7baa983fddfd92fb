pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, info, success};
pub use table::{certificate_table, CertificateRow};
pub use theme::{theme, Theme};
