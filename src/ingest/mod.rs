pub mod csv_source;
pub mod normalizer;
pub mod schema;

pub use csv_source::{keyword_from_file_name, parse_csv_text, read_csv_file};
pub use normalizer::{normalize_rows, NormalizeStats};
