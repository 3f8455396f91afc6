//! Rendering of the VM state for the `debug-vm` builtin.

use crate::common::expr::Value;
use crate::vm::machine::Frame;

/// Render both stacks, top of stack first.
pub fn show(valuestack: &[Value], framestack: &[Frame]) -> String {
    let mut rendered = stack(valuestack, "Value", value_line);
    rendered.push('\n');
    rendered.push_str(&stack(framestack, "Frame", frame_line));
    rendered
}

fn value_line(value: &Value) -> String {
    match value {
        Value::Closure(closure) => format!("| Closure <{}>", closure.code.name),
        Value::Builtin(builtin) => format!("| BuiltinProcedure <{}>", builtin.name),
        other => format!("| {}", other),
    }
}

fn frame_line(frame: &Frame) -> String {
    format!("Code: <{}> [PC={}]", frame.code.name, frame.pc)
}

fn stack<T>(items: &[T], name: &str, line: impl Fn(&T) -> String) -> String {
    let head = "-".repeat(8 + name.len());
    let mut rendered = format!("+{}+\n| {} stack |\n+{}+\n\n", head, name, head);

    for (position, item) in items.iter().rev().enumerate() {
        rendered.push_str("      |--------\n");
        let label = if position == 0 { "TOS:  " } else { "      " };
        rendered.push_str(&format!("{}{}\n", label, line(item)));
    }
    rendered.push_str("      |--------\n");
    rendered
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shows_both_stacks() {
        let values = vec![Value::Number(1), Value::Boolean(true)];
        let rendered = show(&values, &[]);

        assert!(rendered.contains("| Value stack |"));
        assert!(rendered.contains("| Frame stack |"));
        assert!(rendered.contains("TOS:  | #t"));
        assert!(rendered.contains("      | 1"));
    }
}
