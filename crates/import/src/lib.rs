pub mod amount;
pub mod date;
pub mod detect;
pub mod dialect;
pub mod generic;
pub mod mapper;
pub mod normalize;
pub mod pipeline;
pub mod record;

pub use amount::parse_amount;
pub use date::{parse_date, parse_date_or, try_parse_date};
pub use detect::{detect, BankFormat};
pub use dialect::{Dialect, DialectMapper};
pub use generic::GenericMapper;
pub use mapper::{mapper_for, ColumnRole, MapError, StatementMapper};
pub use normalize::{normalize, normalize_with_today};
pub use pipeline::{import_file, parse_statement, ImportError, ParsedStatement};
pub use record::{RawDate, RawRecord};
