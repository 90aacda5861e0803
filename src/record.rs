// resource-analyzer compares live cloud resources against IaC declarations
// Copyright (C) 2025  Peoples Grocers LLC
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// To purchase a license under different terms contact admin@peoplesgrocers.com
// To request changes, report bugs, or give user feedback contact
// marxism@peoplesgrocers.com
//

use serde_json::{Map, Number, Value};

/// One resource: a JSON object as it appeared in the input.
pub type Record = Map<String, Value>;

pub trait ValueTypeExt {
    fn type_name(&self) -> &'static str;
}

impl ValueTypeExt for Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// A JSON number classified by how it was written in the source text.
///
/// Integers keep every digit, so values past the 64-bit range still compare
/// exactly. Anything written with a fraction or exponent is a float. `-0` is
/// the integer zero.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonNumber {
    /// Canonical decimal digits with an optional leading `-`.
    Integer(String),
    Float(f64),
}

impl JsonNumber {
    pub fn of(number: &Number) -> Self {
        let text = number.to_string();
        if text.contains(['.', 'e', 'E']) {
            // Out of range exponents parse to infinity, never fail
            return JsonNumber::Float(text.parse().unwrap_or(f64::INFINITY));
        }
        JsonNumber::Integer(canonical_integer(&text))
    }

    /// The exact integer an integral float stands for, if it is one.
    pub fn integral(&self) -> Option<String> {
        match self {
            JsonNumber::Integer(digits) => Some(digits.clone()),
            JsonNumber::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                Some(canonical_integer(&format!("{:.0}", f)))
            }
            JsonNumber::Float(_) => None,
        }
    }
}

fn canonical_integer(text: &str) -> String {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        "0".to_string()
    } else if text.starts_with('-') {
        format!("-{}", digits)
    } else {
        digits.to_string()
    }
}
