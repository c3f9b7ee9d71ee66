/// WHERE-clause evaluation over a split row.
///
/// The hot path is a single comparison against a pre-resolved column
/// index: one slice lookup, one parse when the literal was numeric, one
/// compare. Compound AND/OR/NOT trees recurse over the same field array.
/// Nothing here raises — a row that cannot satisfy the predicate (parse
/// failure, missing column) simply evaluates to false.

/// Comparison operator of a simple predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Parse the operator spellings accepted by the query surfaces.
    pub fn parse(s: &str) -> Option<CompareOp> {
        match s {
            "=" | "==" => Some(CompareOp::Eq),
            "!=" | "<>" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }
}

/// A resolved simple comparison. `threshold` is present exactly when the
/// literal parsed as a base-10 floating value; its presence switches the
/// evaluator between numeric and byte-exact comparison.
#[derive(Clone, Debug)]
pub struct Compare {
    pub column: usize,
    pub op: CompareOp,
    pub literal: Vec<u8>,
    pub threshold: Option<f64>,
}

impl Compare {
    pub fn new(column: usize, op: CompareOp, literal: Vec<u8>) -> Compare {
        let threshold = parse_f64(&literal);
        Compare {
            column,
            op,
            literal,
            threshold,
        }
    }
}

/// A resolved predicate tree. The single-comparison case is the hot
/// path; connectives are the fallback for compound WHERE clauses.
#[derive(Clone, Debug)]
pub enum Predicate {
    Compare(Compare),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

/// Strict f64 parse of an entire field: optional sign, digits with an
/// optional fractional part, optional decimal exponent. No whitespace
/// trimming (the scanner emits fields verbatim) and no inf/nan words, so
/// a None here reliably means "not a number in this CSV's sense".
pub fn parse_f64(s: &[u8]) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let mut i = 0;
    if s[0] == b'+' || s[0] == b'-' {
        i += 1;
    }
    let mut digits = false;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
        digits = true;
    }
    if i < s.len() && s[i] == b'.' {
        i += 1;
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
            digits = true;
        }
    }
    if !digits {
        return None;
    }
    if i < s.len() && (s[i] == b'e' || s[i] == b'E') {
        i += 1;
        if i < s.len() && (s[i] == b'+' || s[i] == b'-') {
            i += 1;
        }
        let mut exp_digits = false;
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
            exp_digits = true;
        }
        if !exp_digits {
            return None;
        }
    }
    if i != s.len() {
        return None;
    }
    // The validated subset is pure ASCII.
    std::str::from_utf8(s).ok()?.parse::<f64>().ok()
}

/// Evaluate a simple comparison against a split row.
#[inline]
pub fn matches_compare(fields: &[&[u8]], cmp: &Compare) -> bool {
    let field = match fields.get(cmp.column) {
        Some(f) => *f,
        None => return false,
    };
    if let Some(t) = cmp.threshold {
        let v = match parse_f64(field) {
            Some(v) => v,
            None => return false,
        };
        match cmp.op {
            CompareOp::Eq => v == t,
            CompareOp::Ne => v != t,
            CompareOp::Lt => v < t,
            CompareOp::Le => v <= t,
            CompareOp::Gt => v > t,
            CompareOp::Ge => v >= t,
        }
    } else {
        // Ordered comparison is undefined for string literals.
        match cmp.op {
            CompareOp::Eq => field == &cmp.literal[..],
            CompareOp::Ne => field != &cmp.literal[..],
            _ => false,
        }
    }
}

/// Evaluate a predicate tree against a split row.
#[inline]
pub fn matches(fields: &[&[u8]], predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare(c) => matches_compare(fields, c),
        Predicate::And(l, r) => matches(fields, l) && matches(fields, r),
        Predicate::Or(l, r) => matches(fields, l) || matches(fields, r),
        Predicate::Not(p) => !matches(fields, p),
    }
}
