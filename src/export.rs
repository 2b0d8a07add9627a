use serde_json::Value;

use crate::supabase::Row;

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
    }
}

/// Renders rows as RFC 4180 CSV with a header line, CRLF line endings.
pub fn rows_to_csv(columns: &[&str], rows: &[Row]) -> String {
    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|column| escape_field(column))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push_str("\r\n");

    for row in rows {
        let line = columns
            .iter()
            .map(|column| escape_field(&cell(row.get(*column))))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push_str("\r\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_quotes_commas_and_newlines() {
        let row = match json!({
            "name": "Asha \"AK\" Kulkarni",
            "message": "Call after 6pm,\nweekdays only",
            "phone": "+919800000000",
            "budget": 25000,
            "localities": ["Baner", "Aundh"],
            "notes": null
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let csv = rows_to_csv(&["name", "message", "phone", "budget", "localities", "notes", "missing"], &[row]);
        let expected = "name,message,phone,budget,localities,notes,missing\r\n\
                        \"Asha \"\"AK\"\" Kulkarni\",\"Call after 6pm,\nweekdays only\",+919800000000,25000,Baner; Aundh,,\r\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn header_only_for_empty_rows() {
        assert_eq!(rows_to_csv(&["id", "title"], &[]), "id,title\r\n");
    }
}
