pub mod categories;
pub mod dates;
pub mod money;
pub mod report;
pub mod validate;

pub use categories::{BudgetIndex, CategoryMapping, CategoryRule, StatementRecord};
pub use dates::normalize_date;
pub use money::{parse_decimal, parse_money, ParsedAmount};
pub use report::NormalizedTransaction;
