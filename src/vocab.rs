//! Reserved IRIs understood by the engine.

/// The SWAP `log:` namespace.
pub const LOG_NS: &str = "http://www.w3.org/2000/10/swap/log#";
/// The SWAP `math:` namespace.
pub const MATH_NS: &str = "http://www.w3.org/2000/10/swap/math#";
/// The SWAP `string:` namespace.
pub const STRING_NS: &str = "http://www.w3.org/2000/10/swap/string#";
/// The XML Schema datatypes namespace.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// Forward implication (`=>`).
pub const LOG_IMPLIES: &str = "http://www.w3.org/2000/10/swap/log#implies";
/// Backward implication (`<=`).
pub const LOG_IMPLIED_BY: &str = "http://www.w3.org/2000/10/swap/log#impliedBy";
/// Formula inclusion.
pub const LOG_INCLUDES: &str = "http://www.w3.org/2000/10/swap/log#includes";
/// Negated formula inclusion; with a variable subject it marks a negated head clause.
pub const LOG_NOT_INCLUDES: &str = "http://www.w3.org/2000/10/swap/log#notIncludes";

/// `math:greaterThan`
pub const MATH_GREATER_THAN: &str = "http://www.w3.org/2000/10/swap/math#greaterThan";
/// `math:lessThan`
pub const MATH_LESS_THAN: &str = "http://www.w3.org/2000/10/swap/math#lessThan";
/// `math:notLessThan`
pub const MATH_NOT_LESS_THAN: &str = "http://www.w3.org/2000/10/swap/math#notLessThan";
/// `math:notGreaterThan`
pub const MATH_NOT_GREATER_THAN: &str = "http://www.w3.org/2000/10/swap/math#notGreaterThan";

/// `string:notLessThan`
pub const STRING_NOT_LESS_THAN: &str = "http://www.w3.org/2000/10/swap/string#notLessThan";
/// `string:notGreaterThan`
pub const STRING_NOT_GREATER_THAN: &str = "http://www.w3.org/2000/10/swap/string#notGreaterThan";
/// `string:ord`
pub const STRING_ORD: &str = "http://www.w3.org/2000/10/swap/string#ord";

/// `xsd:string`
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `xsd:integer`
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// `xsd:decimal`
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
/// `xsd:double`
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
/// `xsd:float`
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";

/// Datatypes whose lexical forms are read as numbers by the math builtins.
pub const NUMERIC_DATATYPES: [&str; 4] = [XSD_INTEGER, XSD_DECIMAL, XSD_DOUBLE, XSD_FLOAT];
