//! Plain-text rendering of responses.
//!
//! Commands with a `formatting` section render block by block; everything else is
//! printed as pretty JSON, narrowed to `default_response_field` when one is set.

use oaish_types::{CommandConfig, FieldFormat, FieldSpec, FormatBlock, LayoutKind, ResponseFormatting};
use oaish_util::{resolve_data, to_plain_string};
use serde_json::{Map, Value};
use unicode_width::UnicodeWidthStr;

use crate::commands::select_response;

const DEFAULT_TITLE: &str = "Response";
const COLUMN_GAP: &str = "  ";

/// Renders `response` the way `command` asks for, or as pretty JSON without one.
pub fn render_response(response: &Value, command: Option<&CommandConfig>) -> String {
    match command.and_then(|command| command.formatting.as_ref()) {
        Some(formatting) => render_formatted(response, formatting),
        None => pretty_json(select_response(command, response)),
    }
}

/// Renders each block under the formatting title.
///
/// A block whose `path` does not resolve is skipped when optional and otherwise
/// rendered against an empty object.
pub fn render_formatted(response: &Value, formatting: &ResponseFormatting) -> String {
    let empty = Value::Object(Map::new());
    let mut lines = vec![formatting.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string())];
    lines.push(String::new());

    for block in &formatting.blocks {
        let data = match resolve_data(response, &block.path) {
            Some(data) => data,
            None if block.optional => continue,
            None => &empty,
        };
        if let Some(title) = &block.title {
            lines.push(title.clone());
            lines.push("-".repeat(UnicodeWidthStr::width(title.as_str())));
        }
        render_block(block, data, &mut lines);
        lines.push(String::new());
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}

fn render_block(block: &FormatBlock, data: &Value, lines: &mut Vec<String>) {
    match block.layout {
        LayoutKind::List => render_list(&block.fields, data, lines),
        LayoutKind::Table => render_table(&block.fields, data, lines),
        LayoutKind::Markdown => lines.push(to_plain_string(data)),
        LayoutKind::Json => lines.push(pretty_json(data)),
    }
}

fn render_list(fields: &[FieldSpec], data: &Value, lines: &mut Vec<String>) {
    for field in fields {
        let value = resolve_data(data, &field.path);
        if value.is_none() && field.optional {
            continue;
        }
        let rendered = match value {
            None | Some(Value::Null) => "null".to_string(),
            Some(value) => match field.format {
                FieldFormat::Json => pretty_json(value),
                FieldFormat::Text | FieldFormat::Markdown => to_plain_string(value),
            },
        };
        match field.format {
            FieldFormat::Text => lines.push(format!("{}: {rendered}", field.label())),
            FieldFormat::Json | FieldFormat::Markdown => {
                lines.push(format!("{}:", field.label()));
                lines.push(rendered);
            }
        }
    }
}

/// One row per array element (or a single row for any other value), one column per field.
fn render_table(fields: &[FieldSpec], data: &Value, lines: &mut Vec<String>) {
    let rows: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let header: Vec<String> = fields.iter().map(|field| field.label().to_string()).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            fields
                .iter()
                .map(|field| resolve_data(row, &field.path).map(to_plain_string).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..fields.len())
        .map(|column| {
            std::iter::once(&header)
                .chain(cells.iter())
                .map(|row| UnicodeWidthStr::width(row[column].as_str()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    lines.push(format_row(&header, &widths));
    lines.push(widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>().join(COLUMN_GAP));
    for row in &cells {
        lines.push(format_row(row, &widths));
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let fill = width.saturating_sub(UnicodeWidthStr::width(cell.as_str()));
            format!("{cell}{}", " ".repeat(fill))
        })
        .collect();
    padded.join(COLUMN_GAP).trim_end().to_string()
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(path: &str, label: Option<&str>) -> FieldSpec {
        FieldSpec {
            path: path.into(),
            label: label.map(str::to_string),
            ..FieldSpec::default()
        }
    }

    #[test]
    fn renders_table_with_aligned_columns() {
        let formatting = ResponseFormatting {
            title: Some("Items".into()),
            blocks: vec![FormatBlock {
                path: "items".into(),
                layout: LayoutKind::Table,
                fields: vec![field("name", Some("Name")), field("price", None)],
                ..FormatBlock::default()
            }],
        };
        let response = json!({ "items": [{ "name": "Tea", "price": 3 }, { "name": "Café au lait" }] });

        let text = render_formatted(&response, &formatting);

        assert_eq!(
            text,
            ["Items", "", "Name          price", "------------  -----", "Tea           3", "Café au lait"].join("\n")
        );
    }

    #[test]
    fn renders_list_fields_and_skips_optional_blocks() {
        let formatting = ResponseFormatting {
            title: None,
            blocks: vec![
                FormatBlock {
                    path: "missing".into(),
                    optional: true,
                    ..FormatBlock::default()
                },
                FormatBlock {
                    title: Some("User".into()),
                    path: "user".into(),
                    fields: vec![
                        field("name", None),
                        FieldSpec {
                            path: "nickname".into(),
                            optional: true,
                            ..FieldSpec::default()
                        },
                        field("email", Some("E-mail")),
                        FieldSpec {
                            path: "roles".into(),
                            format: FieldFormat::Json,
                            ..FieldSpec::default()
                        },
                    ],
                    ..FormatBlock::default()
                },
            ],
        };
        let response = json!({ "user": { "name": "Ada", "roles": ["admin"] } });

        let text = render_formatted(&response, &formatting);

        assert_eq!(
            text,
            ["Response", "", "User", "----", "name: Ada", "E-mail: null", "roles:", "[\n  \"admin\"\n]"].join("\n")
        );
    }

    #[test]
    fn markdown_and_json_blocks() {
        let formatting = ResponseFormatting {
            title: Some("Doc".into()),
            blocks: vec![
                FormatBlock {
                    path: "body".into(),
                    layout: LayoutKind::Markdown,
                    ..FormatBlock::default()
                },
                FormatBlock {
                    path: "meta".into(),
                    layout: LayoutKind::Json,
                    ..FormatBlock::default()
                },
            ],
        };
        let response = json!({ "body": "# Hello", "meta": { "v": 1 } });

        assert_eq!(render_formatted(&response, &formatting), "Doc\n\n# Hello\n\n{\n  \"v\": 1\n}");
    }

    #[test]
    fn falls_back_to_default_field_or_whole_body() {
        let response = json!({ "data": { "id": 1 }, "meta": {} });
        let command = CommandConfig {
            operation_id: "get".into(),
            default_response_field: Some("data.id".into()),
            ..CommandConfig::default()
        };
        assert_eq!(render_response(&response, Some(&command)), "1");
        assert_eq!(render_response(&json!([]), None), "[]");
    }
}
