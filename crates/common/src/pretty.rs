use crate::{RecordId, Tuple, TupleDesc};
use tabled::{Table, Tabled, builder::Builder, settings};
use types::Field;

/// Predefined output styles that map to `tabled` styles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TableStyleKind {
    #[default]
    Modern,
    Ascii,
    Plain,
}

impl TableStyleKind {
    fn render(self, mut table: Table) -> String {
        match self {
            Self::Modern => table.with(settings::Style::modern()),
            Self::Ascii => table.with(settings::Style::ascii()),
            Self::Plain => table.with(settings::Style::empty()),
        };
        table.to_string()
    }
}

/// Render tuples under a header row built from the schema's field names.
pub fn render_tuples(desc: &TupleDesc, tuples: &[Tuple], style: TableStyleKind) -> String {
    if tuples.is_empty() {
        return "<empty>".into();
    }
    let mut builder = Builder::default();
    builder.push_record(desc.items().map(|item| item.name.as_deref().unwrap_or("null")));
    for tuple in tuples {
        builder.push_record(tuple.fields().iter().map(format_field));
    }
    style.render(builder.build())
}

/// Render a header row followed by preformatted cells.
pub fn render_string_table(
    headers: &[&str],
    rows: Vec<Vec<String>>,
    style: TableStyleKind,
) -> String {
    if headers.is_empty() && rows.is_empty() {
        return "<empty>".into();
    }
    let mut builder = Builder::default();
    if !headers.is_empty() {
        builder.push_record(headers.iter().copied());
    }
    rows.into_iter().for_each(|row| builder.push_record(row));
    style.render(builder.build())
}

/// Render `Tabled` records, one row each.
pub fn render_structured_rows<T>(rows: &[T], style: TableStyleKind) -> String
where
    T: Tabled + Clone,
{
    match rows {
        [] => "<empty>".into(),
        rows => style.render(Table::new(rows.to_vec())),
    }
}

/// Format a single field for display.
pub fn format_field(field: &Field) -> String {
    match field {
        Field::Int(v) => v.to_string(),
        Field::String(text) => format!("'{}'", text),
    }
}

/// Format a `RecordId` as `(page_no, slot)`.
pub fn format_record_id(rid: &RecordId) -> String {
    format!("({}, {})", rid.page_id.page_no, rid.slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use types::Type;

    #[test]
    fn tuples_render_with_headers() {
        let desc = Arc::new(
            TupleDesc::try_new(vec![Type::Int, Type::String], vec![Some("id".into()), None])
                .unwrap(),
        );
        let tuple = Tuple::new(desc.clone(), vec![Field::Int(1), Field::from("Ada")]).unwrap();

        let rendered = render_tuples(&desc, &[tuple], TableStyleKind::Modern);
        assert!(rendered.contains("id"));
        assert!(rendered.contains("null"));
        assert!(rendered.contains("'Ada'"));
    }

    #[test]
    fn empty_inputs_render_placeholder() {
        let desc = TupleDesc::from_types(vec![Type::Int]).unwrap();
        assert_eq!(render_tuples(&desc, &[], TableStyleKind::Plain), "<empty>");
        assert_eq!(
            render_string_table(&[], vec![], TableStyleKind::Plain),
            "<empty>"
        );
    }
}
