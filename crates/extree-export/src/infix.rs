//! Prefix-to-infix printing of rendered constraints.
//!
//! Constraints arrive as prefix S-expressions such as
//! `(Eq false (Slt (ReadLSB w32 0 y) 5))`. Tokens are evaluated right to
//! left on an operand stack, so the top of the stack is always the leftmost
//! operand of the operator being applied. The transform is for display
//! only: malformed input yields whatever is on top of the stack when
//! evaluation gets stuck, or an empty string.

/// Operator spellings for two-operand nodes.
fn binary_op(token: &str) -> Option<(&'static str, bool)> {
    // (symbol, parenthesized)
    Some(match token {
        "Ne" => ("!=", false),
        "Slt" | "Ult" => ("<", false),
        "Sle" | "Ule" => ("<=", false),
        "Sgt" | "Ugt" => (">", false),
        "Sge" | "Uge" => (">=", false),
        "Add" => ("+", false),
        "Sub" => ("-", false),
        "Mul" => ("*", false),
        "UDiv" | "SDiv" => ("/", false),
        "URem" | "SRem" => ("%", false),
        "And" => ("&", true),
        "Or" => ("|", true),
        "Xor" => ("^", true),
        "Shl" => ("<<", true),
        "LShr" | "AShr" => (">>", true),
        _ => return None,
    })
}

fn negate(op: &str) -> Option<&'static str> {
    Some(match op {
        "<" => ">=",
        "<=" => ">",
        ">" => "<=",
        ">=" => "<",
        "==" => "!=",
        "!=" => "==",
        _ => return None,
    })
}

fn is_relational_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '!')
}

/// Split `expr` around its rightmost ` op ` whose operator is negatable,
/// returning `(lhs, op, rhs)`.
fn split_relation(expr: &str) -> Option<(&str, &str, &str)> {
    let mut end = expr.len();
    while end > 0 {
        let space = expr[..end].rfind(' ')?;
        let op_start = space + 1;
        let op_end = expr[op_start..]
            .find(|c: char| !is_relational_char(c))
            .map_or(expr.len(), |i| op_start + i);
        let op = &expr[op_start..op_end];
        if space > 0 && expr[op_end..].starts_with(' ') && negate(op).is_some() {
            return Some((&expr[..space], op, &expr[op_end + 1..]));
        }
        end = space;
    }
    None
}

fn tokenize(expr: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in expr.char_indices() {
        let delimiter = c == '(' || c == ')' || c.is_whitespace();
        if delimiter {
            if let Some(s) = start.take() {
                tokens.push(&expr[s..i]);
            }
            if c == '(' || c == ')' {
                tokens.push(&expr[i..i + 1]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&expr[s..]);
    }
    tokens
}

/// Render a prefix constraint in infix form. Never fails.
pub fn to_infix(expr: &str) -> String {
    let tokens = tokenize(expr);
    let mut stack: Vec<String> = Vec::new();
    let mut negate_next_eq = false;

    for &token in tokens.iter().rev() {
        match token {
            "(" | ")" => {}
            "false" => negate_next_eq = true,
            "ReadLSB" | "ReadMSB" | "Read" => {
                // width, index, array: keep only the array name
                if stack.len() < 3 {
                    break;
                }
                stack.pop();
                stack.pop();
                if let Some(array) = stack.pop() {
                    stack.push(array);
                }
            }
            "Not" => {
                let Some(operand) = stack.pop() else {
                    break;
                };
                stack.push(format!("~({operand})"));
            }
            "Eq" if negate_next_eq => {
                negate_next_eq = false;
                let Some(lhs) = stack.pop() else {
                    break;
                };
                // `false` itself is never pushed, so this Eq has one operand.
                let negated = split_relation(&lhs)
                    .and_then(|(l, op, r)| negate(op).map(|n| format!("{l} {n} {r}")))
                    .unwrap_or_else(|| format!("!({lhs})"));
                stack.push(negated);
            }
            "Eq" => {
                if stack.len() < 2 {
                    break;
                }
                if let (Some(lhs), Some(rhs)) = (stack.pop(), stack.pop()) {
                    stack.push(format!("{lhs} == {rhs}"));
                }
            }
            other => match binary_op(other) {
                Some((sym, parenthesized)) => {
                    if stack.len() < 2 {
                        break;
                    }
                    if let (Some(lhs), Some(rhs)) = (stack.pop(), stack.pop()) {
                        if parenthesized {
                            stack.push(format!("({lhs} {sym} {rhs})"));
                        } else {
                            stack.push(format!("{lhs} {sym} {rhs}"));
                        }
                    }
                }
                None => stack.push(other.to_string()),
            },
        }
    }

    stack.pop().unwrap_or_default()
}

/// Drop newlines and collapse each run of whitespace to its first
/// character.
pub fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_space = false;
    for c in s.chars().filter(|&c| c != '\n') {
        if c.is_whitespace() {
            if previous_space {
                continue;
            }
            previous_space = true;
        } else {
            previous_space = false;
        }
        out.push(c);
    }
    out
}
