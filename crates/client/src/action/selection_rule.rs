use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid selection rule '{0}'")]
pub struct SelectionRuleError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Comparison {
    operator: Operator,
    operand: usize,
}

impl Comparison {
    fn holds(&self, count: usize) -> bool {
        match self.operator {
            Operator::Eq => count == self.operand,
            Operator::NotEq => count != self.operand,
            Operator::Gt => count > self.operand,
            Operator::GtEq => count >= self.operand,
            Operator::Lt => count < self.operand,
            Operator::LtEq => count <= self.operand,
        }
    }
}

/// Predicate over the number of selected items, e.g. `>0`, `=1` or
/// `>=1 and <=10`. `and` binds tighter than `or`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRule {
    source: String,
    // any of these groups must fully hold; empty means always
    any_of: Vec<Vec<Comparison>>,
}

impl SelectionRule {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn is_always(&self) -> bool {
        self.any_of.is_empty()
    }

    pub fn is_satisfied(&self, count: usize) -> bool {
        self.is_always()
            || self
                .any_of
                .iter()
                .any(|group| group.iter().all(|comparison| comparison.holds(count)))
    }
}

fn parse_comparison(token: &str) -> Option<Comparison> {
    // the rule may name its operand, as in `x > 0`
    let token = token.trim().trim_start_matches(['x', 'X']).trim();
    let (operator, rest) = [
        (">=", Operator::GtEq),
        ("<=", Operator::LtEq),
        ("!=", Operator::NotEq),
        ("==", Operator::Eq),
        ("=", Operator::Eq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ]
    .iter()
    .find_map(|(prefix, operator)| token.strip_prefix(prefix).map(|rest| (*operator, rest)))
    .unwrap_or((Operator::Eq, token));
    let operand = rest.trim().parse().ok()?;
    Some(Comparison { operator, operand })
}

impl FromStr for SelectionRule {
    type Err = SelectionRuleError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let normalized = source.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Ok(Self::always());
        }

        let mut any_of = Vec::new();
        for alternative in normalized.split(" or ") {
            let group = alternative
                .split(" and ")
                .map(parse_comparison)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| SelectionRuleError(source.to_string()))?;
            any_of.push(group);
        }
        Ok(Self {
            source: source.trim().to_string(),
            any_of,
        })
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(source: &str) -> SelectionRule {
        source.parse().unwrap()
    }

    #[test]
    fn test_single_comparisons() {
        assert!(rule("").is_satisfied(0));
        assert!(rule("").is_always());

        let exactly_one = rule("=1");
        assert!(!exactly_one.is_satisfied(0));
        assert!(exactly_one.is_satisfied(1));
        assert!(!exactly_one.is_satisfied(2));

        assert!(rule(">0").is_satisfied(3));
        assert!(!rule(">0").is_satisfied(0));
        assert!(rule("<= 2").is_satisfied(2));
        assert!(rule("!=1").is_satisfied(0));
        assert!(rule("1").is_satisfied(1));
    }

    #[test]
    fn test_combined_rules() {
        let range = rule(">=1 and <=3");
        assert!(!range.is_satisfied(0));
        assert!(range.is_satisfied(2));
        assert!(!range.is_satisfied(4));

        let none_or_many = rule("=0 OR >1");
        assert!(none_or_many.is_satisfied(0));
        assert!(!none_or_many.is_satisfied(1));
        assert!(none_or_many.is_satisfied(5));

        assert!(rule("x > 0").is_satisfied(1));
    }

    #[test]
    fn test_invalid_rule() {
        assert_eq!(
            ">one".parse::<SelectionRule>(),
            Err(SelectionRuleError(">one".to_string()))
        );
    }
}
