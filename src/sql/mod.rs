//! SQL safety gateway: parsing, read-only validation, explanations and
//! correction tips for generated SQL.

pub mod correction;
pub mod explain;
pub mod gateway;
pub mod parser;

pub use correction::suggest_correction;
pub use explain::explain;
pub use gateway::{
    find_forbidden_keyword, GatewayError, SqlGateway, ValidationResult, ValidationVerdict,
    FORBIDDEN_KEYWORDS,
};
pub use parser::{
    is_faithful_rewrite, parse, ParseError, ParsedStatement, SqlDialect, StatementKind, SyntaxTree,
};
