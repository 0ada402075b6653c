//! Text writer.
//!
//! Compact by default. Records are written through their text mapping after
//! a cycle check; a record or document that would be revisited on the current
//! path is written as its display string instead, with a warning.

use crate::{Context, Document, Options, Value, WireFormat};
use chrono::SecondsFormat;

pub struct Writer<'a> {
    out: String,
    ctx: &'a Context,
    pretty: bool,
    indent: usize,
    depth: usize,
    path: Vec<usize>,
}

impl<'a> Writer<'a> {
    pub fn new(ctx: &'a Context, options: &Options) -> Self {
        Writer {
            out: String::new(),
            ctx,
            pretty: options.pretty,
            indent: options.indent,
            depth: 0,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    pub fn write_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Int32(i) => self.out.push_str(&i.to_string()),
            Value::Int64(i) => self.out.push_str(&i.to_string()),
            Value::Double(f) => self.write_double(*f),
            Value::Decimal(d) => self.out.push_str(&d.to_string()),
            Value::String(s) => self.write_string(s),
            Value::Array(items) => self.write_array(items),
            Value::Object(doc) => self.write_document(doc),
            Value::Date(dt) => self.write_string(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::ObjectId(oid) => self.write_string(&oid.to_hex()),
            Value::Record(handle) => {
                if handle.has_cycle(self.ctx) {
                    self.ctx.warn(
                        "Record refers back to itself; writing its display text instead.",
                        Some(Value::from(handle.type_name())),
                    );
                    self.write_string(&handle.display());
                } else {
                    let doc = handle.to_document(WireFormat::Text, self.ctx);
                    self.write_document(&doc);
                }
            }
        }
    }

    fn write_double(&mut self, f: f64) {
        if f.is_nan() {
            self.write_string("NaN");
        } else if f.is_infinite() {
            self.write_string(if f > 0.0 { "Infinity" } else { "-Infinity" });
        } else {
            self.out.push_str(&f.to_string());
        }
    }

    pub fn write_document(&mut self, doc: &Document) {
        let id = doc.id();
        if self.path.contains(&id) {
            self.ctx.warn(
                "Document contains itself; writing a placeholder instead.",
                None,
            );
            self.write_string("[circular document]");
            return;
        }

        let entries = doc.entries();
        if entries.is_empty() {
            self.out.push_str("{}");
            return;
        }

        self.path.push(id);
        self.out.push('{');
        self.depth += 1;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline();
            self.write_string(key);
            self.out.push(':');
            if self.pretty {
                self.out.push(' ');
            }
            self.write_value(value);
        }
        self.depth -= 1;
        self.newline();
        self.out.push('}');
        self.path.pop();
    }

    fn write_array(&mut self, items: &[Value]) {
        if items.is_empty() {
            self.out.push_str("[]");
            return;
        }
        self.out.push('[');
        self.depth += 1;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline();
            self.write_value(item);
        }
        self.depth -= 1;
        self.newline();
        self.out.push(']');
    }

    fn newline(&mut self) {
        if self.pretty {
            self.out.push('\n');
            for _ in 0..self.depth * self.indent {
                self.out.push(' ');
            }
        }
    }

    fn write_string(&mut self, s: &str) {
        self.out.push('"');
        for ch in s.chars() {
            match ch {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\u{0008}' => self.out.push_str("\\b"),
                '\u{000C}' => self.out.push_str("\\f"),
                ch if (ch as u32) < 0x20 => {
                    self.out.push_str(&format!("\\u{:04x}", ch as u32));
                }
                ch => self.out.push(ch),
            }
        }
        self.out.push('"');
    }
}
