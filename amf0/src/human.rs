//! Human readable rendering of AMF0 values for diagnostics.  The output is a
//! JSON-like tree and is not designed to be parsed back.

use crate::{Amf0Object, Amf0Value};
use std::fmt::Write;

/// Renders a value as an indented multi-line tree.  Every line is terminated
/// by a newline, including the last one.
pub fn human_print(value: &Amf0Value) -> String {
    let mut output = String::new();
    print_value(value, 0, &mut output);
    output
}

fn print_value(value: &Amf0Value, level: usize, output: &mut String) {
    match value {
        Amf0Value::Number(x) => {
            let _ = writeln!(output, "Number {:?}", x);
        }
        Amf0Value::Boolean(x) => {
            let _ = writeln!(output, "Boolean {}", x);
        }
        Amf0Value::Utf8String(x) => {
            let _ = writeln!(output, "String {:?}", x);
        }
        Amf0Value::LongString(x) => {
            let _ = writeln!(output, "LongString {:?}", x);
        }
        Amf0Value::Null => {
            let _ = writeln!(output, "Null");
        }
        Amf0Value::Undefined => {
            let _ = writeln!(output, "Undefined");
        }
        Amf0Value::Date { unix_ms, time_zone } => {
            let _ = writeln!(output, "Date {:?} tz={}", unix_ms, time_zone);
        }
        Amf0Value::Object(properties) => {
            let _ = writeln!(output, "Object ({} items)", properties.count());
            print_properties(properties, level + 1, output);
        }
        Amf0Value::EcmaArray(properties) => {
            let _ = writeln!(output, "EcmaArray ({} items)", properties.count());
            print_properties(properties, level + 1, output);
        }
        Amf0Value::StrictArray(values) => {
            let _ = writeln!(output, "StrictArray ({} items)", values.len());
            for item in values {
                indent(level + 1, output);
                print_value(item, level + 1, output);
            }
        }
    }
}

fn print_properties(properties: &Amf0Object, level: usize, output: &mut String) {
    for (name, value) in properties.iter() {
        indent(level, output);
        let _ = write!(output, "{:<16} ", name);
        print_value(value, level, output);
    }
}

fn indent(level: usize, output: &mut String) {
    for _ in 0..level {
        output.push_str("    ");
    }
}

#[cfg(test)]
mod tests {
    use super::human_print;
    use crate::{Amf0Object, Amf0Value};

    #[test]
    fn prints_scalars_on_one_line() {
        assert_eq!(human_print(&Amf0Value::Number(31.0)), "Number 31.0\n");
        assert_eq!(human_print(&Amf0Value::Boolean(false)), "Boolean false\n");
        assert_eq!(human_print(&Amf0Value::Null), "Null\n");
    }

    #[test]
    fn prints_nested_object_tree() {
        let mut inner = Amf0Object::new();
        inner.set("code", Amf0Value::Utf8String("NetConnection.Connect.Success".to_string()));

        let mut outer = Amf0Object::new();
        outer.set("level", Amf0Value::Utf8String("status".to_string()));
        outer.set("info", Amf0Value::Object(inner));

        let text = human_print(&Amf0Value::Object(outer));

        assert!(text.starts_with("Object (2 items)\n"), "Got: {}", text);
        assert!(text.contains("level"), "Got: {}", text);
        assert!(
            text.contains("NetConnection.Connect.Success"),
            "Got: {}",
            text
        );
    }
}
