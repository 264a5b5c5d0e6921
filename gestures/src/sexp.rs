//! S-expression helpers shared by the config and trace loaders.
//!
//! Documents are parsed with `lexpr`'s default parser, which reads `:key` as
//! `Value::Symbol(":key")`; the elisp parser reads it as `Value::Keyword`.
//! Both forms are accepted everywhere.

use lexpr::Value;

/// Raw value following `:key` in a plist.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Atom following `:key`, rendered as a string with any leading `:` removed.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    get_value(value, key).and_then(atom_to_string)
}

/// String value of `:key`, e.g. a gesture or action `:name`.
pub fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Integer value of `:key`.  Floats and symbols yield `None`.
pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_value(value, key).and_then(as_float)
}

/// Treats "nil" as false, anything else present as true.
pub fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil" && s != "#f" && s != "false")
}

/// Render an atom.  Lists yield `None`.
pub fn atom_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Keyword(v) => Some(v.to_string()),
        Value::Symbol(v) => {
            let s: &str = v;
            Some(s.strip_prefix(':').unwrap_or(s).to_string())
        }
        Value::String(v) => Some(v.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "t" } else { "nil" }.to_string()),
        Value::Nil | Value::Null => Some("nil".to_string()),
        _ => None,
    }
}

pub fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Elements of a proper list.  `nil` and `()` are empty.
pub fn list_items(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        items.push(pair.car());
        current = pair.cdr();
    }
    items
}

/// Escape a gesture name for a quoted s-expression string.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// One line of replay output: `(:type :event :event :<kind> :<key> <value> ...)`.
/// Values are inserted verbatim, so strings must already be quoted.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_keyword_from_plist() {
        let v = lexpr::from_str("(:type swipe :fingers 3 :name \"ws\")").unwrap();
        assert_eq!(get_keyword(&v, "type"), Some("swipe".to_string()));
        assert_eq!(get_int(&v, "fingers"), Some(3));
        assert_eq!(get_string(&v, "name"), Some("ws".to_string()));
        assert_eq!(get_keyword(&v, "missing"), None);
    }

    #[test]
    fn test_get_keyword_keyword_value() {
        let v = lexpr::from_str("(:event :begin)").unwrap();
        assert_eq!(get_keyword(&v, "event"), Some("begin".to_string()));
    }

    #[test]
    fn test_get_keyword_trailing_key() {
        let v = lexpr::from_str("(:name)").unwrap();
        assert_eq!(get_keyword(&v, "name"), None);
    }

    #[test]
    fn test_get_float() {
        let v = lexpr::from_str("(:scale 1.25 :angle -3 :bad :x)").unwrap();
        assert_eq!(get_float(&v, "scale"), Some(1.25));
        assert_eq!(get_float(&v, "angle"), Some(-3.0));
        assert_eq!(get_float(&v, "bad"), None);
    }

    #[test]
    fn test_get_bool() {
        let v = lexpr::from_str("(:on t :off nil)").unwrap();
        assert_eq!(get_bool(&v, "on"), Some(true));
        assert_eq!(get_bool(&v, "off"), Some(false));
        assert_eq!(get_bool(&v, "missing"), None);
    }

    #[test]
    fn test_get_int_non_numeric() {
        let v = lexpr::from_str("(:fingers :three)").unwrap();
        assert_eq!(get_int(&v, "fingers"), None);
    }

    #[test]
    fn test_list_items() {
        let v = lexpr::from_str("(:fingers (2 4))").unwrap();
        let fingers = get_value(&v, "fingers").unwrap();
        let items: Vec<i64> = list_items(fingers)
            .iter()
            .filter_map(|v| v.as_i64())
            .collect();
        assert_eq!(items, vec![2, 4]);
        assert!(list_items(&lexpr::from_str("()").unwrap()).is_empty());
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b\\c"), "a\\\"b\\\\c");
    }

    #[test]
    fn test_format_event() {
        let s = format_event("gesture-ended", &[("name", "\"ws\""), ("premature", "nil")]);
        assert_eq!(
            s,
            "(:type :event :event :gesture-ended :name \"ws\" :premature nil)"
        );
    }
}
