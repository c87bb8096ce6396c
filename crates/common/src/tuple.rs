use crate::{DbError, DbResult, RecordId, TupleDesc};
use std::{fmt, sync::Arc};
use types::Field;

/// One record: a schema, one field per schema position, and the page slot
/// it was read from (if any).
///
/// Field types are checked against the schema whenever fields are written.
#[derive(Clone, Debug, PartialEq)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    rid: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Field>) -> DbResult<Self> {
        if fields.len() != desc.num_fields() {
            return Err(DbError::InvalidSchema(format!(
                "tuple has {} fields, schema expects {}",
                fields.len(),
                desc.num_fields()
            )));
        }
        for (idx, field) in fields.iter().enumerate() {
            check_type(&desc, idx, field)?;
        }
        Ok(Self {
            desc,
            fields,
            rid: None,
        })
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn field(&self, index: usize) -> DbResult<&Field> {
        self.fields.get(index).ok_or(DbError::IndexOutOfRange {
            index,
            len: self.fields.len(),
        })
    }

    pub fn set_field(&mut self, index: usize, field: Field) -> DbResult<()> {
        check_type(&self.desc, index, &field)?;
        self.fields[index] = field;
        Ok(())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    pub fn with_record_id(mut self, rid: RecordId) -> Self {
        self.rid = Some(rid);
        self
    }
}

fn check_type(desc: &TupleDesc, index: usize, field: &Field) -> DbResult<()> {
    let expected = desc.field_type(index)?;
    if field.field_type() != expected {
        return Err(DbError::InvalidSchema(format!(
            "field {index} is {}, schema expects {expected}",
            field.field_type()
        )));
    }
    Ok(())
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, field) in self.fields.iter().enumerate() {
            if idx > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}
